use async_trait::async_trait;
use chrono::Utc;
use domains::{
    reputation, CounterDelta, DomainError, DomainResult, ProfileRepository, ProfileUpdate,
    UserProfile,
};
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqliteConnection};
use uuid::Uuid;

use super::{db_err, SqliteStore};

const PROFILE_COLUMNS: &str = "user_id, avatar, bio, signature, post_count, reply_count, reputation, \
     last_login_ip, created_at, updated_at";

fn profile_from_row(row: SqliteRow) -> Result<UserProfile, sqlx::Error> {
    Ok(UserProfile {
        user_id: row.try_get("user_id")?,
        avatar: row.try_get("avatar")?,
        bio: row.try_get("bio")?,
        signature: row.try_get("signature")?,
        post_count: row.try_get("post_count")?,
        reply_count: row.try_get("reply_count")?,
        reputation: row.try_get("reputation")?,
        last_login_ip: row.try_get("last_login_ip")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

async fn insert_missing(conn: &mut SqliteConnection, user_id: Uuid) -> Result<(), sqlx::Error> {
    let now = Utc::now();
    sqlx::query("INSERT OR IGNORE INTO user_profiles (user_id, created_at, updated_at) VALUES (?, ?, ?)")
        .bind(user_id)
        .bind(now)
        .bind(now)
        .execute(conn)
        .await?;
    Ok(())
}

async fn fetch_profile(conn: &mut SqliteConnection, user_id: Uuid) -> Result<Option<UserProfile>, sqlx::Error> {
    sqlx::query(&format!("SELECT {PROFILE_COLUMNS} FROM user_profiles WHERE user_id = ?"))
        .bind(user_id)
        .try_map(profile_from_row)
        .fetch_optional(conn)
        .await
}

fn missing(user_id: Uuid) -> DomainError {
    DomainError::not_found("Profile", user_id)
}

#[async_trait]
impl ProfileRepository for SqliteStore {
    async fn ensure_profile(&self, user_id: Uuid) -> DomainResult<UserProfile> {
        let mut conn = self.pool.acquire().await.map_err(db_err)?;
        insert_missing(&mut conn, user_id).await.map_err(db_err)?;
        fetch_profile(&mut conn, user_id)
            .await
            .map_err(db_err)?
            .ok_or_else(|| missing(user_id))
    }

    async fn find_profile(&self, user_id: Uuid) -> DomainResult<Option<UserProfile>> {
        let mut conn = self.pool.acquire().await.map_err(db_err)?;
        fetch_profile(&mut conn, user_id).await.map_err(db_err)
    }

    async fn update_profile(&self, user_id: Uuid, update: ProfileUpdate) -> DomainResult<UserProfile> {
        sqlx::query(&format!(
            "UPDATE user_profiles SET avatar = ?, bio = ?, signature = ?, updated_at = ? \
             WHERE user_id = ? RETURNING {PROFILE_COLUMNS}"
        ))
        .bind(&update.avatar)
        .bind(&update.bio)
        .bind(&update.signature)
        .bind(Utc::now())
        .bind(user_id)
        .try_map(profile_from_row)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_err)?
        .ok_or_else(|| missing(user_id))
    }

    async fn record_login_ip(&self, user_id: Uuid, ip: &str) -> DomainResult<()> {
        let mut conn = self.pool.acquire().await.map_err(db_err)?;
        insert_missing(&mut conn, user_id).await.map_err(db_err)?;
        sqlx::query("UPDATE user_profiles SET last_login_ip = ?, updated_at = ? WHERE user_id = ?")
            .bind(ip)
            .bind(Utc::now())
            .bind(user_id)
            .execute(&mut *conn)
            .await
            .map_err(db_err)?;
        Ok(())
    }

    async fn recompute_counters(&self, user_id: Uuid, delta: CounterDelta) -> DomainResult<UserProfile> {
        let mut tx = self.pool.begin().await.map_err(db_err)?;
        insert_missing(&mut tx, user_id).await.map_err(db_err)?;

        let (post_count, reply_count): (i64, i64) = sqlx::query_as(
            "UPDATE user_profiles SET \
             post_count = MAX(0, post_count + ?), \
             reply_count = MAX(0, reply_count + ?) \
             WHERE user_id = ? RETURNING post_count, reply_count",
        )
        .bind(delta.posts)
        .bind(delta.replies)
        .bind(user_id)
        .fetch_one(&mut *tx)
        .await
        .map_err(db_err)?;

        let essence_count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM posts WHERE author_id = ? AND is_essence = 1 AND is_deleted = 0",
        )
        .bind(user_id)
        .fetch_one(&mut *tx)
        .await
        .map_err(db_err)?;

        let profile = sqlx::query(&format!(
            "UPDATE user_profiles SET reputation = ?, updated_at = ? WHERE user_id = ? RETURNING {PROFILE_COLUMNS}"
        ))
        .bind(reputation(post_count, reply_count, essence_count))
        .bind(Utc::now())
        .bind(user_id)
        .try_map(profile_from_row)
        .fetch_one(&mut *tx)
        .await
        .map_err(db_err)?;

        tx.commit().await.map_err(db_err)?;
        Ok(profile)
    }
}

#[cfg(test)]
mod tests {
    use super::super::test_support::{forum, store, user};
    use super::*;
    use domains::{NewPost, PostRepository, PostStatus};

    #[tokio::test]
    async fn ensure_profile_is_idempotent() {
        let store = store().await;
        let alice = user(&store, "alice").await;

        let first = store.ensure_profile(alice.id).await.unwrap();
        let second = store.ensure_profile(alice.id).await.unwrap();
        assert_eq!(first.created_at, second.created_at);
        assert_eq!(second.reputation, 0);
    }

    #[tokio::test]
    async fn counters_never_go_negative() {
        let store = store().await;
        let alice = user(&store, "alice").await;

        let profile = store
            .recompute_counters(alice.id, CounterDelta::POST_DELETED)
            .await
            .unwrap();
        assert_eq!(profile.post_count, 0);
        assert_eq!(profile.reputation, 0);
    }

    #[tokio::test]
    async fn reputation_counts_live_featured_posts() {
        let store = store().await;
        let alice = user(&store, "alice").await;
        let board = forum(&store, "General").await;
        let post = store
            .create_post(NewPost {
                forum_id: board,
                author_id: alice.id,
                title: "t".into(),
                content: "c".into(),
                status: PostStatus::Published,
            })
            .await
            .unwrap();
        store.recompute_counters(alice.id, CounterDelta::POST_CREATED).await.unwrap();
        store.recompute_counters(alice.id, CounterDelta::REPLY_CREATED).await.unwrap();
        store.toggle_essence(post.id).await.unwrap();

        let profile = store.recompute_counters(alice.id, CounterDelta::NONE).await.unwrap();
        assert_eq!((profile.post_count, profile.reply_count), (1, 1));
        assert_eq!(profile.reputation, 2 + 1 + 10);

        store.soft_delete_post(post.id).await.unwrap();
        let profile = store.recompute_counters(alice.id, CounterDelta::POST_DELETED).await.unwrap();
        assert_eq!(profile.reputation, 1);
    }

    #[tokio::test]
    async fn login_ip_and_profile_fields() {
        let store = store().await;
        let alice = user(&store, "alice").await;

        store.record_login_ip(alice.id, "10.0.0.7").await.unwrap();
        let updated = store
            .update_profile(
                alice.id,
                ProfileUpdate { avatar: None, bio: "hi".into(), signature: "-- a".into() },
            )
            .await
            .unwrap();
        assert_eq!(updated.last_login_ip.as_deref(), Some("10.0.0.7"));
        assert_eq!(updated.signature, "-- a");

        let bob = Uuid::now_v7();
        assert!(matches!(
            store.update_profile(bob, ProfileUpdate::default()).await,
            Err(DomainError::NotFound(..))
        ));
    }
}
