use std::collections::HashMap;

use async_trait::async_trait;
use chrono::Utc;
use domains::{DomainResult, Forum, ForumRepository, ForumSummary, NewForum, Post};
use sqlx::sqlite::SqliteRow;
use sqlx::{QueryBuilder, Row, Sqlite};
use uuid::Uuid;

use super::posts::{post_from_row, POST_SELECT};
use super::{db_err, SqliteStore};

/// Board totals count every post that has not been soft-deleted, drafts and hidden posts included.
const BOARD_POST: &str = "p.is_deleted = 0";

const FORUM_COLUMNS: &str =
    "f.id, f.name, f.description, f.icon, f.sort_order, f.is_active, f.moderator_only, f.created_at, f.updated_at";

fn forum_from_row(row: &SqliteRow) -> Result<Forum, sqlx::Error> {
    Ok(Forum {
        id: row.try_get("id")?,
        name: row.try_get("name")?,
        description: row.try_get("description")?,
        icon: row.try_get("icon")?,
        sort_order: row.try_get("sort_order")?,
        is_active: row.try_get("is_active")?,
        moderator_only: row.try_get("moderator_only")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

#[async_trait]
impl ForumRepository for SqliteStore {
    async fn list_forums(&self, include_moderator_only: bool) -> DomainResult<Vec<ForumSummary>> {
        let rows = sqlx::query(&format!(
            "SELECT {FORUM_COLUMNS}, \
             (SELECT COUNT(*) FROM posts p WHERE p.forum_id = f.id AND {BOARD_POST}) AS post_count, \
             (SELECT p.id FROM posts p WHERE p.forum_id = f.id AND {BOARD_POST} \
              ORDER BY p.created_at DESC, p.id DESC LIMIT 1) AS last_post_id \
             FROM forums f \
             WHERE f.is_active = 1 AND (? OR f.moderator_only = 0) \
             ORDER BY f.sort_order, f.name"
        ))
        .bind(include_moderator_only)
        .try_map(|row: SqliteRow| {
            Ok((
                forum_from_row(&row)?,
                row.try_get::<i64, _>("post_count")?,
                row.try_get::<Option<Uuid>, _>("last_post_id")?,
            ))
        })
        .fetch_all(&self.pool)
        .await
        .map_err(db_err)?;

        let latest_ids: Vec<Uuid> = rows.iter().filter_map(|(_, _, id)| *id).collect();
        let mut latest: HashMap<Uuid, Post> = HashMap::with_capacity(latest_ids.len());
        if !latest_ids.is_empty() {
            let mut qb = QueryBuilder::<Sqlite>::new(POST_SELECT);
            qb.push(" WHERE p.id IN (");
            let mut ids = qb.separated(", ");
            for id in &latest_ids {
                ids.push_bind(*id);
            }
            ids.push_unseparated(")");
            let posts = qb
                .build()
                .try_map(post_from_row)
                .fetch_all(&self.pool)
                .await
                .map_err(db_err)?;
            latest.extend(posts.into_iter().map(|post| (post.id, post)));
        }

        Ok(rows
            .into_iter()
            .map(|(forum, post_count, last_post_id)| ForumSummary {
                forum,
                post_count,
                last_post: last_post_id.and_then(|id| latest.remove(&id)),
            })
            .collect())
    }

    async fn find_forum(&self, id: Uuid) -> DomainResult<Option<Forum>> {
        sqlx::query(&format!("SELECT {FORUM_COLUMNS} FROM forums f WHERE f.id = ?"))
            .bind(id)
            .try_map(|row: SqliteRow| forum_from_row(&row))
            .fetch_optional(&self.pool)
            .await
            .map_err(db_err)
    }

    async fn find_forum_by_name(&self, name: &str) -> DomainResult<Option<Forum>> {
        sqlx::query(&format!("SELECT {FORUM_COLUMNS} FROM forums f WHERE f.name = ?"))
            .bind(name)
            .try_map(|row: SqliteRow| forum_from_row(&row))
            .fetch_optional(&self.pool)
            .await
            .map_err(db_err)
    }

    async fn create_forum(&self, forum: NewForum) -> DomainResult<Forum> {
        let now = Utc::now();
        let created = Forum {
            id: Uuid::now_v7(),
            name: forum.name,
            description: forum.description,
            icon: forum.icon,
            sort_order: forum.sort_order,
            is_active: true,
            moderator_only: forum.moderator_only,
            created_at: now,
            updated_at: now,
        };
        sqlx::query(
            "INSERT INTO forums (id, name, description, icon, sort_order, is_active, moderator_only, created_at, updated_at) \
             VALUES (?, ?, ?, ?, ?, 1, ?, ?, ?)",
        )
        .bind(created.id)
        .bind(&created.name)
        .bind(&created.description)
        .bind(&created.icon)
        .bind(created.sort_order)
        .bind(created.moderator_only)
        .bind(created.created_at)
        .bind(created.updated_at)
        .execute(&self.pool)
        .await
        .map_err(db_err)?;
        Ok(created)
    }
}

#[cfg(test)]
mod tests {
    use super::super::test_support::{store, user};
    use super::*;
    use domains::{NewPost, PostEdit, PostRepository, PostStatus};

    fn board(name: &str, sort_order: i32, moderator_only: bool) -> NewForum {
        NewForum {
            name: name.to_string(),
            description: String::new(),
            icon: String::new(),
            sort_order,
            moderator_only,
        }
    }

    #[tokio::test]
    async fn boards_are_ordered_and_moderator_boards_filtered() {
        let store = store().await;
        store.create_forum(board("Zeta", 1, false)).await.unwrap();
        store.create_forum(board("Alpha", 2, false)).await.unwrap();
        store.create_forum(board("Beta", 1, false)).await.unwrap();
        store.create_forum(board("Staff", 0, true)).await.unwrap();

        let public: Vec<_> = store
            .list_forums(false)
            .await
            .unwrap()
            .into_iter()
            .map(|s| s.forum.name)
            .collect();
        assert_eq!(public, vec!["Beta", "Zeta", "Alpha"]);

        let staff = store.list_forums(true).await.unwrap();
        assert_eq!(staff.len(), 4);
        assert_eq!(staff[0].forum.name, "Staff");
    }

    async fn seed_post(store: &SqliteStore, forum_id: Uuid, author_id: Uuid, title: &str) -> Post {
        store
            .create_post(NewPost {
                forum_id,
                author_id,
                title: title.to_string(),
                content: "x".into(),
                status: PostStatus::Published,
            })
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn summary_skips_soft_deleted_posts_and_shows_latest() {
        let store = store().await;
        let alice = user(&store, "alice").await;
        let general = store.create_forum(board("General", 0, false)).await.unwrap();
        seed_post(&store, general.id, alice.id, "first").await;
        seed_post(&store, general.id, alice.id, "second").await;
        let third = seed_post(&store, general.id, alice.id, "third").await;
        store.soft_delete_post(third.id).await.unwrap();

        let summaries = store.list_forums(false).await.unwrap();
        assert_eq!(summaries[0].post_count, 2);
        assert_eq!(summaries[0].last_post.as_ref().unwrap().title, "second");
    }

    #[tokio::test]
    async fn hidden_and_draft_posts_still_count_toward_the_board() {
        let store = store().await;
        let alice = user(&store, "alice").await;
        let general = store.create_forum(board("General", 0, false)).await.unwrap();
        let quiet = store.create_forum(board("Quiet", 1, false)).await.unwrap();
        let empty = store.create_forum(board("Empty", 2, false)).await.unwrap();

        seed_post(&store, general.id, alice.id, "published").await;
        let hidden = seed_post(&store, general.id, alice.id, "hidden").await;
        store
            .update_post(
                hidden.id,
                PostEdit { title: "hidden".into(), content: "x".into(), status: PostStatus::Hidden },
            )
            .await
            .unwrap();
        store
            .create_post(NewPost {
                forum_id: quiet.id,
                author_id: alice.id,
                title: "draft".into(),
                content: "x".into(),
                status: PostStatus::Draft,
            })
            .await
            .unwrap();

        let summaries = store.list_forums(false).await.unwrap();
        let by_id = |id: Uuid| summaries.iter().find(|s| s.forum.id == id).unwrap();

        assert_eq!(by_id(general.id).post_count, 2);
        assert_eq!(by_id(general.id).last_post.as_ref().unwrap().title, "hidden");
        assert_eq!(by_id(quiet.id).post_count, 1);
        assert_eq!(by_id(quiet.id).last_post.as_ref().unwrap().title, "draft");
        assert_eq!(by_id(empty.id).post_count, 0);
        assert!(by_id(empty.id).last_post.is_none());
    }

    #[tokio::test]
    async fn lookup_by_name() {
        let store = store().await;
        let created = store.create_forum(board("General", 0, false)).await.unwrap();
        let found = store.find_forum_by_name("General").await.unwrap().unwrap();
        assert_eq!(found, created);
        assert!(store.find_forum_by_name("general-chat").await.unwrap().is_none());
    }
}
