use async_trait::async_trait;
use chrono::Utc;
use domains::{AccountUpdate, DomainResult, NewUser, User, UserRepository};
use sqlx::sqlite::SqliteRow;
use sqlx::Row;
use uuid::Uuid;

use super::{db_err, SqliteStore};

const USER_COLUMNS: &str =
    "id, username, email, first_name, last_name, password_hash, is_staff, created_at, last_login_at";

fn user_from_row(row: SqliteRow) -> Result<User, sqlx::Error> {
    Ok(User {
        id: row.try_get("id")?,
        username: row.try_get("username")?,
        email: row.try_get("email")?,
        first_name: row.try_get("first_name")?,
        last_name: row.try_get("last_name")?,
        password_hash: row.try_get("password_hash")?,
        is_staff: row.try_get("is_staff")?,
        created_at: row.try_get("created_at")?,
        last_login_at: row.try_get("last_login_at")?,
    })
}

#[async_trait]
impl UserRepository for SqliteStore {
    async fn create_user(&self, user: NewUser) -> DomainResult<User> {
        let created = User {
            id: Uuid::now_v7(),
            username: user.username,
            email: user.email,
            first_name: user.first_name,
            last_name: user.last_name,
            password_hash: user.password_hash,
            is_staff: user.is_staff,
            created_at: Utc::now(),
            last_login_at: None,
        };
        sqlx::query(
            "INSERT INTO users (id, username, email, first_name, last_name, password_hash, is_staff, created_at) \
             VALUES (?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(created.id)
        .bind(&created.username)
        .bind(&created.email)
        .bind(&created.first_name)
        .bind(&created.last_name)
        .bind(&created.password_hash)
        .bind(created.is_staff)
        .bind(created.created_at)
        .execute(&self.pool)
        .await
        .map_err(db_err)?;
        Ok(created)
    }

    async fn find_user(&self, id: Uuid) -> DomainResult<Option<User>> {
        sqlx::query(&format!("SELECT {USER_COLUMNS} FROM users WHERE id = ?"))
            .bind(id)
            .try_map(user_from_row)
            .fetch_optional(&self.pool)
            .await
            .map_err(db_err)
    }

    async fn find_user_by_username(&self, username: &str) -> DomainResult<Option<User>> {
        sqlx::query(&format!("SELECT {USER_COLUMNS} FROM users WHERE username = ?"))
            .bind(username)
            .try_map(user_from_row)
            .fetch_optional(&self.pool)
            .await
            .map_err(db_err)
    }

    async fn find_user_by_login(&self, login: &str) -> DomainResult<Option<User>> {
        // A username match wins over an email match.
        sqlx::query(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE username = ? OR email = ? \
             ORDER BY CASE WHEN username = ? THEN 0 ELSE 1 END LIMIT 1"
        ))
        .bind(login)
        .bind(login)
        .bind(login)
        .try_map(user_from_row)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_err)
    }

    async fn username_taken(&self, username: &str) -> DomainResult<bool> {
        sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM users WHERE username = ?)")
            .bind(username)
            .fetch_one(&self.pool)
            .await
            .map_err(db_err)
    }

    async fn email_taken(&self, email: &str, except: Option<Uuid>) -> DomainResult<bool> {
        sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM users WHERE email = ? AND (? IS NULL OR id <> ?))")
            .bind(email)
            .bind(except)
            .bind(except)
            .fetch_one(&self.pool)
            .await
            .map_err(db_err)
    }

    async fn update_account(&self, id: Uuid, update: AccountUpdate) -> DomainResult<Option<User>> {
        sqlx::query(&format!(
            "UPDATE users SET first_name = ?, last_name = ?, email = ? WHERE id = ? RETURNING {USER_COLUMNS}"
        ))
        .bind(&update.first_name)
        .bind(&update.last_name)
        .bind(&update.email)
        .bind(id)
        .try_map(user_from_row)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_err)
    }

    async fn touch_last_login(&self, id: Uuid) -> DomainResult<()> {
        sqlx::query("UPDATE users SET last_login_at = ? WHERE id = ?")
            .bind(Utc::now())
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(db_err)?;
        Ok(())
    }
}
