use async_trait::async_trait;
use chrono::Utc;
use domains::{
    clamp_page, DomainResult, NewPost, Page, Post, PostEdit, PostQuery, PostRepository, PostSort,
    PostStatus,
};
use sqlx::sqlite::SqliteRow;
use sqlx::{QueryBuilder, Row, Sqlite};
use uuid::Uuid;

use super::{contains_pattern, db_err, decode_err, SqliteStore};

/// Posts joined with their author's username.
pub(super) const POST_SELECT: &str = "SELECT p.id, p.forum_id, p.author_id, u.username AS author_username, \
     p.title, p.content, p.status, p.is_top, p.is_essence, p.is_deleted, p.view_count, \
     p.reply_count, p.last_reply_at, p.created_at, p.updated_at \
     FROM posts p JOIN users u ON u.id = p.author_id";

/// Filter for rows that may appear in listings and counts.
const LIVE_POST: &str = "p.is_deleted = 0 AND p.status = 'published'";

pub(super) fn post_from_row(row: SqliteRow) -> Result<Post, sqlx::Error> {
    let status: String = row.try_get("status")?;
    Ok(Post {
        id: row.try_get("id")?,
        forum_id: row.try_get("forum_id")?,
        author_id: row.try_get("author_id")?,
        author_username: row.try_get("author_username")?,
        title: row.try_get("title")?,
        content: row.try_get("content")?,
        status: status.parse::<PostStatus>().map_err(decode_err)?,
        is_top: row.try_get("is_top")?,
        is_essence: row.try_get("is_essence")?,
        is_deleted: row.try_get("is_deleted")?,
        view_count: row.try_get("view_count")?,
        reply_count: row.try_get("reply_count")?,
        last_reply_at: row.try_get("last_reply_at")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

fn push_listing_filters(qb: &mut QueryBuilder<'_, Sqlite>, query: &PostQuery) {
    qb.push(" WHERE p.forum_id = ");
    qb.push_bind(query.forum_id);
    qb.push(" AND ");
    qb.push(LIVE_POST);
    if query.sort == PostSort::Essence {
        qb.push(" AND p.is_essence = 1");
    }
    if let Some(search) = query.search.as_deref() {
        let pattern = contains_pattern(search);
        qb.push(" AND (LOWER(p.title) LIKE ");
        qb.push_bind(pattern.clone());
        qb.push(" ESCAPE '\\' OR LOWER(p.content) LIKE ");
        qb.push_bind(pattern);
        qb.push(" ESCAPE '\\')");
    }
}

fn order_clause(sort: PostSort) -> &'static str {
    match sort {
        // NULL last_reply_at sorts after any timestamp in descending order.
        PostSort::Latest | PostSort::Essence => {
            " ORDER BY p.is_top DESC, p.last_reply_at DESC, p.created_at DESC"
        }
        PostSort::Hot => " ORDER BY p.reply_count DESC, p.view_count DESC, p.created_at DESC",
    }
}

#[async_trait]
impl PostRepository for SqliteStore {
    async fn create_post(&self, post: NewPost) -> DomainResult<Post> {
        let id = Uuid::now_v7();
        let now = Utc::now();
        sqlx::query(
            "INSERT INTO posts (id, forum_id, author_id, title, content, status, created_at, updated_at) \
             VALUES (?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(id)
        .bind(post.forum_id)
        .bind(post.author_id)
        .bind(&post.title)
        .bind(&post.content)
        .bind(post.status.as_str())
        .bind(now)
        .bind(now)
        .execute(&self.pool)
        .await
        .map_err(db_err)?;

        self.find_post(id)
            .await?
            .ok_or_else(|| domains::DomainError::Internal(format!("post {} vanished after insert", id)))
    }

    async fn find_post(&self, id: Uuid) -> DomainResult<Option<Post>> {
        sqlx::query(&format!("{POST_SELECT} WHERE p.id = ?"))
            .bind(id)
            .try_map(post_from_row)
            .fetch_optional(&self.pool)
            .await
            .map_err(db_err)
    }

    async fn list_posts(&self, query: PostQuery) -> DomainResult<Page<Post>> {
        let mut count = QueryBuilder::<Sqlite>::new("SELECT COUNT(*) FROM posts p");
        push_listing_filters(&mut count, &query);
        let total: i64 = count
            .build_query_scalar()
            .fetch_one(&self.pool)
            .await
            .map_err(db_err)?;

        let per_page = query.per_page.max(1);
        let page = clamp_page(query.page, total, per_page);
        let offset = i64::from(page - 1) * i64::from(per_page);

        let mut list = QueryBuilder::<Sqlite>::new(POST_SELECT);
        push_listing_filters(&mut list, &query);
        list.push(order_clause(query.sort));
        list.push(" LIMIT ");
        list.push_bind(i64::from(per_page));
        list.push(" OFFSET ");
        list.push_bind(offset);
        let items = list
            .build()
            .try_map(post_from_row)
            .fetch_all(&self.pool)
            .await
            .map_err(db_err)?;

        Ok(Page { items, page, per_page, total })
    }

    async fn update_post(&self, id: Uuid, edit: PostEdit) -> DomainResult<Option<Post>> {
        let result = sqlx::query("UPDATE posts SET title = ?, content = ?, status = ?, updated_at = ? WHERE id = ?")
            .bind(&edit.title)
            .bind(&edit.content)
            .bind(edit.status.as_str())
            .bind(Utc::now())
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(db_err)?;
        if result.rows_affected() == 0 {
            return Ok(None);
        }
        self.find_post(id).await
    }

    async fn soft_delete_post(&self, id: Uuid) -> DomainResult<bool> {
        let result = sqlx::query("UPDATE posts SET is_deleted = 1, updated_at = ? WHERE id = ? AND is_deleted = 0")
            .bind(Utc::now())
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(db_err)?;
        Ok(result.rows_affected() == 1)
    }

    async fn increment_views(&self, id: Uuid) -> DomainResult<()> {
        sqlx::query("UPDATE posts SET view_count = view_count + 1 WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(db_err)?;
        Ok(())
    }

    async fn toggle_essence(&self, id: Uuid) -> DomainResult<Option<bool>> {
        sqlx::query_scalar("UPDATE posts SET is_essence = NOT is_essence, updated_at = ? WHERE id = ? RETURNING is_essence")
            .bind(Utc::now())
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(db_err)
    }

    async fn toggle_top(&self, id: Uuid) -> DomainResult<Option<bool>> {
        sqlx::query_scalar("UPDATE posts SET is_top = NOT is_top, updated_at = ? WHERE id = ? RETURNING is_top")
            .bind(Utc::now())
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(db_err)
    }

    async fn refresh_reply_stats(&self, post_id: Uuid) -> DomainResult<()> {
        sqlx::query(
            "UPDATE posts SET \
             reply_count = (SELECT COUNT(*) FROM replies r WHERE r.post_id = posts.id AND r.is_deleted = 0), \
             last_reply_at = (SELECT MAX(r.created_at) FROM replies r WHERE r.post_id = posts.id AND r.is_deleted = 0) \
             WHERE id = ?",
        )
        .bind(post_id)
        .execute(&self.pool)
        .await
        .map_err(db_err)?;
        Ok(())
    }

    async fn recent_posts_by_author(&self, author_id: Uuid, limit: u32) -> DomainResult<Vec<Post>> {
        sqlx::query(&format!(
            "{POST_SELECT} WHERE p.author_id = ? AND {LIVE_POST} ORDER BY p.created_at DESC LIMIT ?"
        ))
        .bind(author_id)
        .bind(i64::from(limit))
        .try_map(post_from_row)
        .fetch_all(&self.pool)
        .await
        .map_err(db_err)
    }

    async fn count_posts_by_author(&self, author_id: Uuid) -> DomainResult<i64> {
        sqlx::query_scalar("SELECT COUNT(*) FROM posts WHERE author_id = ? AND is_deleted = 0")
            .bind(author_id)
            .fetch_one(&self.pool)
            .await
            .map_err(db_err)
    }
}

#[cfg(test)]
mod tests {
    use super::super::test_support::{forum, store, user};
    use super::*;

    async fn seed_post(store: &SqliteStore, forum_id: Uuid, author_id: Uuid, title: &str, content: &str) -> Post {
        store
            .create_post(NewPost {
                forum_id,
                author_id,
                title: title.to_string(),
                content: content.to_string(),
                status: PostStatus::Published,
            })
            .await
            .unwrap()
    }

    fn query(forum_id: Uuid) -> PostQuery {
        PostQuery { forum_id, search: None, sort: PostSort::Latest, page: 1, per_page: 20 }
    }

    #[tokio::test]
    async fn created_post_carries_author_name() {
        let store = store().await;
        let alice = user(&store, "alice").await;
        let board = forum(&store, "General").await;

        let post = seed_post(&store, board, alice.id, "Hello", "World").await;
        assert_eq!(post.author_username, "alice");
        assert_eq!(post.reply_count, 0);
        assert!(post.last_reply_at.is_none());
    }

    #[tokio::test]
    async fn soft_deleted_posts_leave_listings_but_stay_fetchable() {
        let store = store().await;
        let alice = user(&store, "alice").await;
        let board = forum(&store, "General").await;
        let keep = seed_post(&store, board, alice.id, "Keep", "x").await;
        let gone = seed_post(&store, board, alice.id, "Gone", "x").await;

        assert!(store.soft_delete_post(gone.id).await.unwrap());
        assert!(!store.soft_delete_post(gone.id).await.unwrap());

        let page = store.list_posts(query(board)).await.unwrap();
        assert_eq!(page.total, 1);
        assert_eq!(page.items[0].id, keep.id);
        assert!(store.find_post(gone.id).await.unwrap().unwrap().is_deleted);
        assert_eq!(store.count_posts_by_author(alice.id).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn search_is_case_insensitive_and_literal() {
        let store = store().await;
        let alice = user(&store, "alice").await;
        let board = forum(&store, "General").await;
        seed_post(&store, board, alice.id, "Learning RUST", "ownership").await;
        seed_post(&store, board, alice.id, "Cooking", "100% butter").await;
        seed_post(&store, board, alice.id, "Gardening", "1000 seeds").await;

        let found = store
            .list_posts(PostQuery { search: Some("rust".into()), ..query(board) })
            .await
            .unwrap();
        assert_eq!(found.total, 1);
        assert_eq!(found.items[0].title, "Learning RUST");

        let percent = store
            .list_posts(PostQuery { search: Some("100%".into()), ..query(board) })
            .await
            .unwrap();
        assert_eq!(percent.total, 1);
        assert_eq!(percent.items[0].title, "Cooking");
    }

    #[tokio::test]
    async fn pinned_posts_lead_and_essence_filters() {
        let store = store().await;
        let alice = user(&store, "alice").await;
        let board = forum(&store, "General").await;
        let older = seed_post(&store, board, alice.id, "Older", "x").await;
        let newer = seed_post(&store, board, alice.id, "Newer", "x").await;

        let page = store.list_posts(query(board)).await.unwrap();
        assert_eq!(page.items[0].id, newer.id);

        assert_eq!(store.toggle_top(older.id).await.unwrap(), Some(true));
        assert_eq!(store.toggle_essence(older.id).await.unwrap(), Some(true));
        let page = store.list_posts(query(board)).await.unwrap();
        assert_eq!(page.items[0].id, older.id);

        let featured = store
            .list_posts(PostQuery { sort: PostSort::Essence, ..query(board) })
            .await
            .unwrap();
        assert_eq!(featured.total, 1);
        assert_eq!(store.toggle_essence(older.id).await.unwrap(), Some(false));
        assert_eq!(store.toggle_top(Uuid::now_v7()).await.unwrap(), None);
    }

    #[tokio::test]
    async fn hot_orders_by_views_when_replies_tie() {
        let store = store().await;
        let alice = user(&store, "alice").await;
        let board = forum(&store, "General").await;
        let quiet = seed_post(&store, board, alice.id, "Quiet", "x").await;
        let busy = seed_post(&store, board, alice.id, "Busy", "x").await;
        for _ in 0..3 {
            store.increment_views(quiet.id).await.unwrap();
        }
        store.increment_views(busy.id).await.unwrap();

        let hot = store
            .list_posts(PostQuery { sort: PostSort::Hot, ..query(board) })
            .await
            .unwrap();
        assert_eq!(hot.items[0].id, quiet.id);
        assert_eq!(hot.items[0].view_count, 3);
    }

    #[tokio::test]
    async fn out_of_range_page_is_clamped() {
        let store = store().await;
        let alice = user(&store, "alice").await;
        let board = forum(&store, "General").await;
        for i in 0..3 {
            seed_post(&store, board, alice.id, &format!("Post {}", i), "x").await;
        }

        let page = store
            .list_posts(PostQuery { page: 7, per_page: 2, ..query(board) })
            .await
            .unwrap();
        assert_eq!(page.page, 2);
        assert_eq!(page.items.len(), 1);
        assert_eq!(page.num_pages(), 2);
    }
}
