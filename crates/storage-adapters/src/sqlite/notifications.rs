use async_trait::async_trait;
use chrono::Utc;
use domains::{
    DomainResult, NewNotification, Notification, NotificationKind, NotificationRepository,
};
use sqlx::sqlite::SqliteRow;
use sqlx::{QueryBuilder, Row, Sqlite};
use uuid::Uuid;

use super::{db_err, decode_err, SqliteStore};

const NOTIFICATION_COLUMNS: &str =
    "id, recipient_id, sender_id, kind, title, content, url, is_read, created_at";

fn notification_from_row(row: SqliteRow) -> Result<Notification, sqlx::Error> {
    let kind: String = row.try_get("kind")?;
    Ok(Notification {
        id: row.try_get("id")?,
        recipient_id: row.try_get("recipient_id")?,
        sender_id: row.try_get("sender_id")?,
        kind: kind.parse::<NotificationKind>().map_err(decode_err)?,
        title: row.try_get("title")?,
        content: row.try_get("content")?,
        url: row.try_get("url")?,
        is_read: row.try_get("is_read")?,
        created_at: row.try_get("created_at")?,
    })
}

#[async_trait]
impl NotificationRepository for SqliteStore {
    async fn create_notification(&self, notification: NewNotification) -> DomainResult<Notification> {
        let created = Notification {
            id: Uuid::now_v7(),
            recipient_id: notification.recipient_id,
            sender_id: notification.sender_id,
            kind: notification.kind,
            title: notification.title,
            content: notification.content,
            url: notification.url,
            is_read: false,
            created_at: Utc::now(),
        };
        sqlx::query(&format!(
            "INSERT INTO notifications ({NOTIFICATION_COLUMNS}) VALUES (?, ?, ?, ?, ?, ?, ?, 0, ?)"
        ))
        .bind(created.id)
        .bind(created.recipient_id)
        .bind(created.sender_id)
        .bind(created.kind.as_str())
        .bind(&created.title)
        .bind(&created.content)
        .bind(&created.url)
        .bind(created.created_at)
        .execute(&self.pool)
        .await
        .map_err(db_err)?;
        Ok(created)
    }

    async fn list_notifications(&self, recipient_id: Uuid) -> DomainResult<Vec<Notification>> {
        sqlx::query(&format!(
            "SELECT {NOTIFICATION_COLUMNS} FROM notifications WHERE recipient_id = ? \
             ORDER BY created_at DESC, id DESC"
        ))
        .bind(recipient_id)
        .try_map(notification_from_row)
        .fetch_all(&self.pool)
        .await
        .map_err(db_err)
    }

    async fn mark_all_read(&self, recipient_id: Uuid) -> DomainResult<u64> {
        let result = sqlx::query("UPDATE notifications SET is_read = 1 WHERE recipient_id = ? AND is_read = 0")
            .bind(recipient_id)
            .execute(&self.pool)
            .await
            .map_err(db_err)?;
        Ok(result.rows_affected())
    }

    async fn mark_many_read(&self, recipient_id: Uuid, ids: Vec<Uuid>) -> DomainResult<u64> {
        if ids.is_empty() {
            return Ok(0);
        }
        let mut qb = QueryBuilder::<Sqlite>::new("UPDATE notifications SET is_read = 1 WHERE recipient_id = ");
        qb.push_bind(recipient_id);
        qb.push(" AND is_read = 0 AND id IN (");
        let mut listed = qb.separated(", ");
        for id in ids {
            listed.push_bind(id);
        }
        listed.push_unseparated(")");
        let result = qb.build().execute(&self.pool).await.map_err(db_err)?;
        Ok(result.rows_affected())
    }

    async fn mark_read(&self, id: Uuid, recipient_id: Uuid) -> DomainResult<bool> {
        let result = sqlx::query("UPDATE notifications SET is_read = 1 WHERE id = ? AND recipient_id = ?")
            .bind(id)
            .bind(recipient_id)
            .execute(&self.pool)
            .await
            .map_err(db_err)?;
        Ok(result.rows_affected() == 1)
    }

    async fn unread_count(&self, recipient_id: Uuid) -> DomainResult<i64> {
        sqlx::query_scalar("SELECT COUNT(*) FROM notifications WHERE recipient_id = ? AND is_read = 0")
            .bind(recipient_id)
            .fetch_one(&self.pool)
            .await
            .map_err(db_err)
    }
}

#[cfg(test)]
mod tests {
    use super::super::test_support::{store, user};
    use super::*;

    fn reply_notice(recipient_id: Uuid, sender_id: Uuid, title: &str) -> NewNotification {
        NewNotification {
            recipient_id,
            sender_id: Some(sender_id),
            kind: NotificationKind::Reply,
            title: title.to_string(),
            content: "Hello".into(),
            url: "/post/1/".into(),
        }
    }

    #[tokio::test]
    async fn newest_first_and_read_tracking() {
        let store = store().await;
        let alice = user(&store, "alice").await;
        let bob = user(&store, "bob").await;
        store.create_notification(reply_notice(alice.id, bob.id, "first")).await.unwrap();
        let second = store.create_notification(reply_notice(alice.id, bob.id, "second")).await.unwrap();

        let listed = store.list_notifications(alice.id).await.unwrap();
        assert_eq!(listed[0].title, "second");
        assert_eq!(listed[0].kind, NotificationKind::Reply);
        assert_eq!(store.unread_count(alice.id).await.unwrap(), 2);

        // Only the recipient may mark it.
        assert!(!store.mark_read(second.id, bob.id).await.unwrap());
        assert!(store.mark_read(second.id, alice.id).await.unwrap());
        assert_eq!(store.unread_count(alice.id).await.unwrap(), 1);

        assert_eq!(store.mark_all_read(alice.id).await.unwrap(), 1);
        assert_eq!(store.unread_count(alice.id).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn marking_listed_ids_leaves_later_arrivals_unread() {
        let store = store().await;
        let alice = user(&store, "alice").await;
        let bob = user(&store, "bob").await;
        let seen = store.create_notification(reply_notice(alice.id, bob.id, "seen")).await.unwrap();
        let bobs = store.create_notification(reply_notice(bob.id, alice.id, "not hers")).await.unwrap();
        let later = store.create_notification(reply_notice(alice.id, bob.id, "later")).await.unwrap();

        assert_eq!(store.mark_many_read(alice.id, vec![seen.id, bobs.id]).await.unwrap(), 1);
        assert_eq!(store.mark_many_read(alice.id, Vec::new()).await.unwrap(), 0);

        let listed = store.list_notifications(alice.id).await.unwrap();
        let unread: Vec<Uuid> = listed.iter().filter(|n| !n.is_read).map(|n| n.id).collect();
        assert_eq!(unread, vec![later.id]);
        assert_eq!(store.unread_count(bob.id).await.unwrap(), 1);
    }
}
