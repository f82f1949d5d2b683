use std::time::Duration;

use domains::{DomainError, PostSort, PostStatus};
use integration_tests::Harness;

#[tokio::test]
async fn title_length_limit_is_two_hundred_characters() {
    let h = Harness::new().await;
    let alice = h.member("alice").await.actor();
    let board = h.board("General", false).await;

    let exact = "t".repeat(200);
    let post = h.services.posts.create_post(&alice, board.id, &exact, "body").await.unwrap();
    assert_eq!(post.title.chars().count(), 200);

    let long = "t".repeat(201);
    let err = h.services.posts.create_post(&alice, board.id, &long, "body").await.unwrap_err();
    assert!(matches!(err, DomainError::Validation(_)));
}

#[tokio::test]
async fn soft_deleted_post_leaves_listing_and_search() {
    let h = Harness::new().await;
    let alice = h.member("alice").await.actor();
    let staff = h.staff("moderator").await.actor();
    let board = h.board("General", false).await;
    let keep = h.post(&alice, &board, "Keep me", "rust is fun").await;
    let gone = h.post(&alice, &board, "Remove me", "rust is also fun").await;

    h.services.posts.delete_post(&alice, gone.id).await.unwrap();

    let (_, page) = h
        .services
        .boards
        .list_posts(board.id, None, Some("rust"), PostSort::Latest, 1)
        .await
        .unwrap();
    assert_eq!(page.total, 1);
    assert_eq!(page.items[0].id, keep.id);

    let summaries = h.services.boards.list_boards(None).await.unwrap();
    assert_eq!(summaries[0].post_count, 1);

    assert!(matches!(h.services.posts.view_post(gone.id).await, Err(DomainError::NotFound(..))));
    assert!(h.services.posts.lookup_post(Some(&alice), gone.id).await.is_err());
    let seen_by_staff = h.services.posts.lookup_post(Some(&staff), gone.id).await.unwrap();
    assert!(seen_by_staff.is_deleted);
}

#[tokio::test]
async fn search_matches_title_or_content_case_insensitively() {
    let h = Harness::new().await;
    let alice = h.member("alice").await.actor();
    let board = h.board("General", false).await;
    h.post(&alice, &board, "Tokio tips", "select! in loops").await;
    h.post(&alice, &board, "Cooking", "Use a TOKIO runtime for pancakes").await;
    h.post(&alice, &board, "Weather", "sunny").await;

    let (_, page) = h
        .services
        .boards
        .list_posts(board.id, None, Some("tokio"), PostSort::Latest, 1)
        .await
        .unwrap();
    assert_eq!(page.total, 2);

    let (_, page) = h
        .services
        .boards
        .list_posts(board.id, None, Some("100%"), PostSort::Latest, 1)
        .await
        .unwrap();
    assert_eq!(page.total, 0);
}

#[tokio::test]
async fn pinned_posts_lead_and_essence_filters() {
    let h = Harness::new().await;
    let alice = h.member("alice").await.actor();
    let staff = h.staff("moderator").await.actor();
    let board = h.board("General", false).await;

    let older = h.post(&alice, &board, "Older", "a").await;
    tokio::time::sleep(Duration::from_millis(5)).await;
    let newer = h.post(&alice, &board, "Newer", "b").await;

    let (_, page) = h.services.boards.list_posts(board.id, None, None, PostSort::Latest, 1).await.unwrap();
    assert_eq!(page.items[0].id, newer.id);

    assert!(h.services.posts.toggle_top(&staff, older.id).await.unwrap());
    let (_, page) = h.services.boards.list_posts(board.id, None, None, PostSort::Latest, 1).await.unwrap();
    assert_eq!(page.items[0].id, older.id);
    assert!(page.items[0].is_top);

    assert!(h.services.posts.toggle_essence(&staff, newer.id).await.unwrap());
    let (_, page) = h.services.boards.list_posts(board.id, None, None, PostSort::Essence, 1).await.unwrap();
    assert_eq!(page.total, 1);
    assert_eq!(page.items[0].id, newer.id);

    // Toggling again unfeatures.
    assert!(!h.services.posts.toggle_essence(&staff, newer.id).await.unwrap());
}

#[tokio::test]
async fn hot_sort_prefers_replies_then_views() {
    let h = Harness::new().await;
    let alice = h.member("alice").await.actor();
    let bob = h.member("bob").await.actor();
    let board = h.board("General", false).await;

    let quiet = h.post(&alice, &board, "Quiet", "a").await;
    let viewed = h.post(&alice, &board, "Viewed", "b").await;
    let discussed = h.post(&alice, &board, "Discussed", "c").await;
    h.services.posts.view_post(viewed.id).await.unwrap();
    h.services.replies.add_reply(&bob, discussed.id, "me too", None).await.unwrap();

    let (_, page) = h.services.boards.list_posts(board.id, None, None, PostSort::Hot, 1).await.unwrap();
    let order: Vec<_> = page.items.iter().map(|p| p.id).collect();
    assert_eq!(order, [discussed.id, viewed.id, quiet.id]);
}

#[tokio::test]
async fn every_view_counts() {
    let h = Harness::new().await;
    let alice = h.member("alice").await.actor();
    let board = h.board("General", false).await;
    let post = h.post(&alice, &board, "Hello", "world").await;

    h.services.posts.view_post(post.id).await.unwrap();
    let detail = h.services.posts.view_post(post.id).await.unwrap();
    assert_eq!(detail.post.view_count, 2);
}

#[tokio::test]
async fn drafts_are_hidden_until_published() {
    let h = Harness::new().await;
    let alice = h.member("alice").await.actor();
    let board = h.board("General", false).await;
    let post = h.post(&alice, &board, "Hello", "world").await;

    h.services
        .posts
        .edit_post(&alice, post.id, "Hello", "world", Some(PostStatus::Draft))
        .await
        .unwrap();
    assert!(h.services.posts.view_post(post.id).await.is_err());
    let (_, page) = h.services.boards.list_posts(board.id, None, None, PostSort::Latest, 1).await.unwrap();
    assert_eq!(page.total, 0);

    // The author can still reach the edit form.
    assert!(h.services.posts.post_for_edit(&alice, post.id).await.is_ok());
}

#[tokio::test]
async fn hidden_post_still_counts_on_the_board_index() {
    let h = Harness::new().await;
    let alice = h.member("alice").await.actor();
    let board = h.board("General", false).await;
    let post = h.post(&alice, &board, "Hello", "world").await;

    h.services
        .posts
        .edit_post(&alice, post.id, "Hello", "world", Some(PostStatus::Hidden))
        .await
        .unwrap();

    let summaries = h.services.boards.list_boards(None).await.unwrap();
    assert_eq!(summaries[0].post_count, 1);
    assert_eq!(summaries[0].last_post.as_ref().unwrap().id, post.id);
}

#[tokio::test]
async fn only_author_or_staff_may_edit() {
    let h = Harness::new().await;
    let alice = h.member("alice").await.actor();
    let bob = h.member("bob").await.actor();
    let staff = h.staff("moderator").await.actor();
    let board = h.board("General", false).await;
    let post = h.post(&alice, &board, "Hello", "world").await;

    let err = h.services.posts.edit_post(&bob, post.id, "Hijacked", "x", None).await.unwrap_err();
    assert!(matches!(err, DomainError::Forbidden(_)));

    let edited = h.services.posts.edit_post(&staff, post.id, "Hello again", "world", None).await.unwrap();
    assert_eq!(edited.title, "Hello again");
    assert_eq!(edited.status, PostStatus::Published);
}

#[tokio::test]
async fn moderator_boards_are_hidden_from_members() {
    let h = Harness::new().await;
    let alice = h.member("alice").await.actor();
    let staff = h.staff("moderator").await.actor();
    h.board("General", false).await;
    let private = h.board("Moderators", true).await;

    assert_eq!(h.services.boards.list_boards(Some(&alice)).await.unwrap().len(), 1);
    assert_eq!(h.services.boards.list_boards(Some(&staff)).await.unwrap().len(), 2);

    let err = h.services.posts.create_post(&alice, private.id, "Hi", "there").await.unwrap_err();
    assert!(matches!(err, DomainError::Forbidden(_)));
}
