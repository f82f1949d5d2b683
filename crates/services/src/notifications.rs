//! Notifications center.

use std::sync::Arc;

use domains::{DomainError, DomainResult, Notification, NotificationRepository};
use uuid::Uuid;

#[derive(Clone)]
pub struct NotificationService {
    repo: Arc<dyn NotificationRepository>,
}

impl NotificationService {
    pub fn new(repo: Arc<dyn NotificationRepository>) -> Self {
        Self { repo }
    }

    /// Newest first. Viewing marks the listed items read; anything that
    /// arrives after the list was read stays unread. The returned items keep
    /// the read flags they had before this call so new ones can be highlighted.
    pub async fn view_notifications(&self, user_id: Uuid) -> DomainResult<Vec<Notification>> {
        let notifications = self.repo.list_notifications(user_id).await?;
        let unread: Vec<Uuid> = notifications.iter().filter(|n| !n.is_read).map(|n| n.id).collect();
        if !unread.is_empty() {
            let marked = self.repo.mark_many_read(user_id, unread).await?;
            tracing::debug!(%user_id, marked, "notifications marked read on view");
        }
        Ok(notifications)
    }

    pub async fn mark_all_read(&self, user_id: Uuid) -> DomainResult<u64> {
        self.repo.mark_all_read(user_id).await
    }

    /// Only the recipient may mark a notification.
    pub async fn mark_read(&self, user_id: Uuid, id: Uuid) -> DomainResult<()> {
        if !self.repo.mark_read(id, user_id).await? {
            return Err(DomainError::not_found("Notification", id));
        }
        Ok(())
    }

    pub async fn unread_count(&self, user_id: Uuid) -> DomainResult<i64> {
        self.repo.unread_count(user_id).await
    }

    /// Badge count for page chrome; failures render as zero.
    pub async fn unread_badge(&self, user_id: Uuid) -> i64 {
        self.unread_count(user_id).await.unwrap_or_else(|e| {
            tracing::warn!(%user_id, error = %e, "unread count unavailable");
            0
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use domains::{MockNotificationRepository, NotificationKind};

    fn notification(recipient_id: Uuid, is_read: bool) -> Notification {
        Notification {
            id: Uuid::now_v7(),
            recipient_id,
            sender_id: None,
            kind: NotificationKind::System,
            title: "t".into(),
            content: "c".into(),
            url: String::new(),
            is_read,
            created_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn viewing_marks_only_the_listed_unread_items() {
        let user_id = Uuid::now_v7();
        let items = vec![notification(user_id, false), notification(user_id, true)];
        let unread_id = items[0].id;
        let mut repo = MockNotificationRepository::new();
        repo.expect_list_notifications().returning(move |_| Ok(items.clone()));
        repo.expect_mark_many_read()
            .withf(move |recipient, ids| *recipient == user_id && ids == &vec![unread_id])
            .times(1)
            .returning(|_, _| Ok(1));
        repo.expect_mark_all_read().never();

        let service = NotificationService::new(Arc::new(repo));
        let seen = service.view_notifications(user_id).await.unwrap();
        assert_eq!(seen.len(), 2);
        assert!(!seen[0].is_read);
    }

    #[tokio::test]
    async fn nothing_to_mark_skips_the_update() {
        let user_id = Uuid::now_v7();
        let items = vec![notification(user_id, true)];
        let mut repo = MockNotificationRepository::new();
        repo.expect_list_notifications().returning(move |_| Ok(items.clone()));
        repo.expect_mark_many_read().never();

        let service = NotificationService::new(Arc::new(repo));
        service.view_notifications(user_id).await.unwrap();
    }

    #[tokio::test]
    async fn marking_someone_elses_notification_is_not_found() {
        let mut repo = MockNotificationRepository::new();
        repo.expect_mark_read().returning(|_, _| Ok(false));

        let service = NotificationService::new(Arc::new(repo));
        let err = service.mark_read(Uuid::now_v7(), Uuid::now_v7()).await.unwrap_err();
        assert!(matches!(err, DomainError::NotFound(..)));
    }
}
