use async_trait::async_trait;
use chrono::Utc;
use domains::{DomainResult, NewTheme, Theme, ThemeChanges, ThemeRepository, ThemeVariable};
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, Sqlite, Transaction};
use uuid::Uuid;

use super::{db_err, SqliteStore};

const THEME_COLUMNS: &str = "id, name, identifier, is_active, created_at, updated_at";

fn theme_from_row(row: SqliteRow) -> Result<Theme, sqlx::Error> {
    Ok(Theme {
        id: row.try_get("id")?,
        name: row.try_get("name")?,
        identifier: row.try_get("identifier")?,
        is_active: row.try_get("is_active")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

async fn insert_variables(
    tx: &mut Transaction<'_, Sqlite>,
    theme_id: Uuid,
    variables: &[(String, String)],
) -> Result<(), sqlx::Error> {
    for (name, value) in variables {
        sqlx::query("INSERT INTO theme_variables (theme_id, name, value) VALUES (?, ?, ?)")
            .bind(theme_id)
            .bind(name)
            .bind(value)
            .execute(&mut **tx)
            .await?;
    }
    Ok(())
}

#[async_trait]
impl ThemeRepository for SqliteStore {
    async fn list_themes(&self) -> DomainResult<Vec<Theme>> {
        sqlx::query(&format!("SELECT {THEME_COLUMNS} FROM themes ORDER BY name, identifier"))
            .try_map(theme_from_row)
            .fetch_all(&self.pool)
            .await
            .map_err(db_err)
    }

    async fn find_theme(&self, id: Uuid) -> DomainResult<Option<Theme>> {
        sqlx::query(&format!("SELECT {THEME_COLUMNS} FROM themes WHERE id = ?"))
            .bind(id)
            .try_map(theme_from_row)
            .fetch_optional(&self.pool)
            .await
            .map_err(db_err)
    }

    async fn find_theme_by_identifier(&self, identifier: &str) -> DomainResult<Option<Theme>> {
        sqlx::query(&format!("SELECT {THEME_COLUMNS} FROM themes WHERE identifier = ?"))
            .bind(identifier)
            .try_map(theme_from_row)
            .fetch_optional(&self.pool)
            .await
            .map_err(db_err)
    }

    async fn find_active_theme(&self) -> DomainResult<Option<Theme>> {
        sqlx::query(&format!("SELECT {THEME_COLUMNS} FROM themes WHERE is_active = 1"))
            .try_map(theme_from_row)
            .fetch_optional(&self.pool)
            .await
            .map_err(db_err)
    }

    async fn theme_variables(&self, theme_id: Uuid) -> DomainResult<Vec<ThemeVariable>> {
        sqlx::query("SELECT theme_id, name, value FROM theme_variables WHERE theme_id = ? ORDER BY name")
            .bind(theme_id)
            .try_map(|row: SqliteRow| {
                Ok(ThemeVariable {
                    theme_id: row.try_get("theme_id")?,
                    name: row.try_get("name")?,
                    value: row.try_get("value")?,
                })
            })
            .fetch_all(&self.pool)
            .await
            .map_err(db_err)
    }

    async fn create_theme(&self, theme: NewTheme) -> DomainResult<Theme> {
        let now = Utc::now();
        let created = Theme {
            id: Uuid::now_v7(),
            name: theme.name,
            identifier: theme.identifier,
            is_active: false,
            created_at: now,
            updated_at: now,
        };

        let mut tx = self.pool.begin().await.map_err(db_err)?;
        sqlx::query(
            "INSERT INTO themes (id, name, identifier, is_active, created_at, updated_at) VALUES (?, ?, ?, 0, ?, ?)",
        )
        .bind(created.id)
        .bind(&created.name)
        .bind(&created.identifier)
        .bind(created.created_at)
        .bind(created.updated_at)
        .execute(&mut *tx)
        .await
        .map_err(db_err)?;
        insert_variables(&mut tx, created.id, &theme.variables)
            .await
            .map_err(db_err)?;
        tx.commit().await.map_err(db_err)?;
        Ok(created)
    }

    async fn update_theme(&self, id: Uuid, changes: ThemeChanges) -> DomainResult<Option<Theme>> {
        let mut tx = self.pool.begin().await.map_err(db_err)?;
        let updated = sqlx::query(&format!(
            "UPDATE themes SET name = ?, identifier = ?, updated_at = ? WHERE id = ? RETURNING {THEME_COLUMNS}"
        ))
        .bind(&changes.name)
        .bind(&changes.identifier)
        .bind(Utc::now())
        .bind(id)
        .try_map(theme_from_row)
        .fetch_optional(&mut *tx)
        .await
        .map_err(db_err)?;

        let Some(theme) = updated else {
            return Ok(None);
        };
        if let Some(variables) = &changes.variables {
            sqlx::query("DELETE FROM theme_variables WHERE theme_id = ?")
                .bind(id)
                .execute(&mut *tx)
                .await
                .map_err(db_err)?;
            insert_variables(&mut tx, id, variables).await.map_err(db_err)?;
        }
        tx.commit().await.map_err(db_err)?;
        Ok(Some(theme))
    }

    async fn delete_inactive_theme(&self, id: Uuid) -> DomainResult<bool> {
        let result = sqlx::query("DELETE FROM themes WHERE id = ? AND is_active = 0")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(db_err)?;
        Ok(result.rows_affected() == 1)
    }

    async fn activate_theme(&self, id: Uuid) -> DomainResult<bool> {
        let now = Utc::now();
        let mut tx = self.pool.begin().await.map_err(db_err)?;
        sqlx::query("UPDATE themes SET is_active = 0, updated_at = ? WHERE is_active = 1")
            .bind(now)
            .execute(&mut *tx)
            .await
            .map_err(db_err)?;
        let activated = sqlx::query("UPDATE themes SET is_active = 1, updated_at = ? WHERE id = ?")
            .bind(now)
            .bind(id)
            .execute(&mut *tx)
            .await
            .map_err(db_err)?;

        if activated.rows_affected() == 0 {
            tx.rollback().await.map_err(db_err)?;
            return Ok(false);
        }
        tx.commit().await.map_err(db_err)?;
        Ok(true)
    }

    async fn deactivate_theme(&self, id: Uuid) -> DomainResult<bool> {
        let result = sqlx::query("UPDATE themes SET is_active = 0, updated_at = ? WHERE id = ?")
            .bind(Utc::now())
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(db_err)?;
        Ok(result.rows_affected() == 1)
    }
}
