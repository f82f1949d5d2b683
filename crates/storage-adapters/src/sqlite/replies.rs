use async_trait::async_trait;
use chrono::Utc;
use domains::{DomainError, DomainResult, NewReply, Reply, ReplyRepository};
use sqlx::sqlite::SqliteRow;
use sqlx::Row;
use uuid::Uuid;

use super::{db_err, SqliteStore};

const REPLY_SELECT: &str = "SELECT r.id, r.post_id, r.author_id, u.username AS author_username, \
     r.content, r.parent_reply_id, r.is_deleted, r.created_at, r.updated_at \
     FROM replies r JOIN users u ON u.id = r.author_id";

fn reply_from_row(row: SqliteRow) -> Result<Reply, sqlx::Error> {
    Ok(Reply {
        id: row.try_get("id")?,
        post_id: row.try_get("post_id")?,
        author_id: row.try_get("author_id")?,
        author_username: row.try_get("author_username")?,
        content: row.try_get("content")?,
        parent_reply_id: row.try_get("parent_reply_id")?,
        is_deleted: row.try_get("is_deleted")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

#[async_trait]
impl ReplyRepository for SqliteStore {
    async fn create_reply(&self, reply: NewReply) -> DomainResult<Reply> {
        let id = Uuid::now_v7();
        let now = Utc::now();
        sqlx::query(
            "INSERT INTO replies (id, post_id, author_id, content, parent_reply_id, created_at, updated_at) \
             VALUES (?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(id)
        .bind(reply.post_id)
        .bind(reply.author_id)
        .bind(&reply.content)
        .bind(reply.parent_reply_id)
        .bind(now)
        .bind(now)
        .execute(&self.pool)
        .await
        .map_err(db_err)?;

        self.find_reply(id)
            .await?
            .ok_or_else(|| DomainError::Internal(format!("reply {} vanished after insert", id)))
    }

    async fn find_reply(&self, id: Uuid) -> DomainResult<Option<Reply>> {
        sqlx::query(&format!("{REPLY_SELECT} WHERE r.id = ?"))
            .bind(id)
            .try_map(reply_from_row)
            .fetch_optional(&self.pool)
            .await
            .map_err(db_err)
    }

    async fn list_replies(&self, post_id: Uuid) -> DomainResult<Vec<Reply>> {
        sqlx::query(&format!(
            "{REPLY_SELECT} WHERE r.post_id = ? AND r.is_deleted = 0 ORDER BY r.created_at, r.id"
        ))
        .bind(post_id)
        .try_map(reply_from_row)
        .fetch_all(&self.pool)
        .await
        .map_err(db_err)
    }

    async fn soft_delete_reply(&self, id: Uuid) -> DomainResult<bool> {
        let result = sqlx::query("UPDATE replies SET is_deleted = 1, updated_at = ? WHERE id = ? AND is_deleted = 0")
            .bind(Utc::now())
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(db_err)?;
        Ok(result.rows_affected() == 1)
    }

    async fn count_replies_by_author(&self, author_id: Uuid) -> DomainResult<i64> {
        sqlx::query_scalar("SELECT COUNT(*) FROM replies WHERE author_id = ? AND is_deleted = 0")
            .bind(author_id)
            .fetch_one(&self.pool)
            .await
            .map_err(db_err)
    }
}
