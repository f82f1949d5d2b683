//! Denormalized per-user counters and reputation.
//!
//! Every post/reply mutation calls one of these synchronously after it
//! succeeds. The adapter applies the delta and recomputes reputation in a
//! single transaction, so re-running a zero delta always converges on
//! `reputation(post_count, reply_count, live featured posts)`.

use std::sync::Arc;

use domains::{CounterDelta, DomainResult, ProfileRepository, UserProfile};
use uuid::Uuid;

#[derive(Clone)]
pub struct CounterService {
    profiles: Arc<dyn ProfileRepository>,
}

impl CounterService {
    pub fn new(profiles: Arc<dyn ProfileRepository>) -> Self {
        Self { profiles }
    }

    pub async fn recompute_counters(&self, user_id: Uuid, delta: CounterDelta) -> DomainResult<UserProfile> {
        let profile = self.profiles.recompute_counters(user_id, delta).await?;
        tracing::debug!(
            %user_id,
            posts = profile.post_count,
            replies = profile.reply_count,
            reputation = profile.reputation,
            "counters recomputed"
        );
        Ok(profile)
    }

    pub async fn post_created(&self, author_id: Uuid) -> DomainResult<UserProfile> {
        self.recompute_counters(author_id, CounterDelta::POST_CREATED).await
    }

    pub async fn post_deleted(&self, author_id: Uuid) -> DomainResult<UserProfile> {
        self.recompute_counters(author_id, CounterDelta::POST_DELETED).await
    }

    pub async fn reply_created(&self, author_id: Uuid) -> DomainResult<UserProfile> {
        self.recompute_counters(author_id, CounterDelta::REPLY_CREATED).await
    }

    pub async fn reply_deleted(&self, author_id: Uuid) -> DomainResult<UserProfile> {
        self.recompute_counters(author_id, CounterDelta::REPLY_DELETED).await
    }

    /// Refreshes reputation only, e.g. after a post was (un)featured.
    pub async fn refresh_reputation(&self, user_id: Uuid) -> DomainResult<UserProfile> {
        self.recompute_counters(user_id, CounterDelta::NONE).await
    }
}
