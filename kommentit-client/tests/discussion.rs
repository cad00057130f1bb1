use chrono::{Duration, TimeZone, Utc};
use kommentit_client::{
    api::{ArticleId, Comment, CommentId, CommentService, Error, Time},
    fetch_page, Discussion, LoadConfig, LoadState, MemoryStore,
};
use kommentit_mock_server::MockServer;

fn t(ms: i64) -> Time {
    Utc.with_ymd_and_hms(2024, 3, 1, 10, 0, 0).unwrap() + Duration::milliseconds(ms)
}

fn article() -> ArticleId {
    ArticleId::from("74-20194923")
}

fn id(s: &str) -> CommentId {
    CommentId::from(s)
}

/// Listing order: a, b, then a reply to a
fn server() -> MockServer {
    let server = MockServer::new();
    server.add_article(&article(), "Kunnat karsivat");
    server.add_comment(&article(), Comment::new("a", "Alice", "first", t(0)));
    server.add_comment(&article(), Comment::new("b", "Bob", "second", t(1)));
    server.add_comment(
        &article(),
        Comment::new("c", "Kalle", "reply", t(2)).reply_to("a"),
    );
    server
}

fn discussion(server: &MockServer) -> Discussion<&MockServer, MemoryStore> {
    let mut d = Discussion::new(
        server,
        MemoryStore::new(),
        LoadConfig {
            page_size: 2,
            min_loading: Duration::milliseconds(500),
        },
    );
    d.set_article(article());
    d
}

fn root_ids(d: &Discussion<&MockServer, MemoryStore>) -> Vec<String> {
    let f = d.forest();
    f.roots()
        .iter()
        .map(|r| f.node(*r).comment.id.0.clone())
        .collect()
}

#[tokio::test]
async fn pages_through_article() {
    let server = server();
    let mut d = discussion(&server);

    assert!(d.load(true).await);
    assert_eq!(root_ids(&d), vec!["a", "b"]);
    assert!(d.has_more());
    assert_eq!(d.controller().offset(), 2);
    assert_eq!(d.topic().unwrap().title, "Kunnat karsivat");

    assert!(d.load_more().await);
    assert_eq!(root_ids(&d), vec!["a", "b"]);
    let a = d.forest().get(&id("a")).unwrap();
    assert_eq!(a.children.len(), 1);
    assert_eq!(d.forest().node(a.children[0]).comment.id, id("c"));
    assert!(!d.has_more());
    assert_eq!(d.state(), LoadState::Loaded);

    let requests = server.test_num_requests();
    assert!(!d.load_more().await);
    assert_eq!(server.test_num_requests(), requests);
}

#[tokio::test]
async fn reset_failure_clears_everything() {
    let server = server();
    let mut d = discussion(&server);
    assert!(d.load(true).await);
    d.set_nickname_filter("ali");
    assert!(d.set_hide_unmarked(true));

    server.fail_next(Error::Status(500));
    assert!(!d.load(true).await);
    assert!(d.failed());
    assert!(!d.has_more());
    assert!(d.forest().is_empty());
    assert_eq!(d.controller().offset(), 0);
    assert!(d.topic().is_none());
    assert!(!d.filter_found_matches());
    assert!(!d.hide_unmarked());
    assert!(!d.is_loading());

    assert!(d.load(true).await);
    assert!(!d.failed());
    assert_eq!(d.forest().len(), 2);
}

#[tokio::test]
async fn incremental_failure_keeps_loaded_comments() {
    let server = server();
    let mut d = discussion(&server);
    assert!(d.load(true).await);
    server.fail_next(Error::Network(String::from("connection reset")));
    assert!(!d.load_more().await);
    assert!(d.failed());
    assert!(!d.has_more());
    assert_eq!(d.forest().len(), 2);
}

#[tokio::test]
async fn only_one_load_at_a_time() {
    let server = server();
    let mut d = discussion(&server);
    let ticket = d.begin_load(true, t(0)).unwrap();
    assert_eq!(d.begin_load(true, t(10)), None);
    assert_eq!(d.begin_load(false, t(10)), None);

    let result = fetch_page(&server, &ticket).await;
    assert!(d.complete_load(&ticket, result, t(100)));
    // data is there, the indicator is held for the minimum duration
    assert_eq!(d.forest().len(), 2);
    assert!(d.is_loading_at(t(100)));
    assert!(d.is_loading_at(t(499)));
    assert!(!d.is_loading_at(t(500)));
    assert!(d.begin_load(false, t(150)).is_some());
}

#[tokio::test]
async fn switching_article_drops_load_in_flight() {
    let server = server();
    let other = ArticleId::from("74-20000000");
    server.add_article(&other, "Other");
    server.add_comment(&other, Comment::new("x", "Xavier", "elsewhere", t(0)));
    let mut d = discussion(&server);

    let ticket = d.begin_load(true, t(0)).unwrap();
    let result = fetch_page(&server, &ticket).await;
    assert!(d.set_article(other.clone()));
    assert!(!d.complete_load(&ticket, result, t(10)));
    assert!(d.forest().is_empty());

    assert!(d.load(true).await);
    assert_eq!(root_ids(&d), vec!["x"]);
}

#[tokio::test]
async fn empty_article_loads_nothing() {
    let server = server();
    let mut d = discussion(&server);
    assert!(d.load(true).await);
    d.set_article(ArticleId::default());
    assert_eq!(d.begin_load(true, t(0)), None);
    assert!(d.forest().is_empty());
    assert!(d.topic().is_none());
    assert!(!d.load(true).await);
}

#[tokio::test]
async fn likes_apply_after_success() {
    let server = server();
    let mut d = discussion(&server);
    assert!(d.load(true).await);
    let state = |d: &Discussion<&MockServer, MemoryStore>| d.forest().state(&id("b")).unwrap();
    assert!(!state(&d).liked);
    assert_eq!(state(&d).likes, 0);

    assert!(d.like(&id("b")).await);
    assert!(state(&d).liked);
    assert_eq!(state(&d).likes, 1);
    assert_eq!(server.test_likes(&article(), &id("b")), Some(1));

    // liking twice does not count twice
    assert!(d.like(&id("b")).await);
    assert_eq!(state(&d).likes, 1);

    assert!(d.unlike(&id("b")).await);
    assert!(!state(&d).liked);
    assert_eq!(state(&d).likes, 0);
    assert!(d.unlike(&id("b")).await);
    assert_eq!(state(&d).likes, 0);

    server.fail_next(Error::Status(500));
    assert!(!d.like(&id("b")).await);
    assert!(!state(&d).liked);
}

#[tokio::test]
async fn liked_comments_come_with_the_page() {
    let server = server();
    let mut d = discussion(&server);
    assert!(d.load(true).await);
    assert!(d.like(&id("a")).await);

    let mut fresh = discussion(&server);
    assert!(fresh.load(true).await);
    let a = fresh.forest().state(&id("a")).unwrap();
    assert!(a.liked);
    assert_eq!(a.likes, 1);
    assert!(!fresh.forest().state(&id("b")).unwrap().liked);
}

#[tokio::test]
async fn logged_out_session_still_reads() {
    let server = server();
    server.set_logged_in(false);
    let mut d = discussion(&server);
    assert!(d.load(true).await);
    assert_eq!(d.forest().len(), 2);
    assert!(!d.like(&id("a")).await);
    assert!(d.reply(&id("a"), "hello").await.is_none());
}

#[tokio::test]
async fn like_for_previous_article_is_dropped() {
    let server = server();
    let mut d = discussion(&server);
    assert!(d.load(true).await);
    let previous = d.article().clone();
    d.set_article(ArticleId::from("74-20000000"));
    assert!(!d.apply_like(&previous, &id("a"), true));

    d.set_article(previous.clone());
    assert!(d.load(true).await);
    assert!(!d.apply_like(&previous, &id("gone"), true));
    assert!(d.apply_like(&previous, &id("a"), true));
    assert_eq!(d.forest().state(&id("a")).unwrap().likes, 1);
}

#[tokio::test]
async fn like_survives_reset_by_id() {
    let server = server();
    let mut d = discussion(&server);
    assert!(d.load(true).await);
    assert!(d.load(true).await);
    assert!(d.apply_like(&article(), &id("b"), true));
    assert!(d.forest().state(&id("b")).unwrap().liked);
}

#[tokio::test]
async fn liking_unknown_comment_changes_nothing() {
    let server = server();
    assert_eq!(
        server.like(&article(), &id("nope")).await,
        Err(Error::Status(404))
    );
    assert!(server.fetch_liked(&article()).await.unwrap().is_empty());

    server.like(&article(), &id("a")).await.unwrap();
    assert_eq!(
        server.unlike(&article(), &id("nope")).await,
        Err(Error::Status(404))
    );
    assert_eq!(server.fetch_liked(&article()).await.unwrap(), vec![id("a")]);
    assert_eq!(server.test_likes(&article(), &id("a")), Some(1));
}

#[tokio::test]
async fn pending_reply_until_approved() {
    let server = server();
    let mut d = discussion(&server);
    assert!(d.load(true).await);

    assert!(d.reply(&id("a"), "   ").await.is_none());
    let reply = d.reply(&id("a"), "me too").await.unwrap();
    assert_eq!(reply.parent_id, id("a"));
    assert_eq!(reply.article_id, article());
    assert!(reply.reply_id.0.starts_with("33-"));
    assert_eq!(d.pending_replies(), vec![reply.clone()]);
    assert_eq!(d.pending_replies_to(&id("a")), vec![reply.clone()]);
    assert!(d.pending_replies_to(&id("b")).is_empty());
    assert_eq!(server.test_num_awaiting_moderation(&article()), 1);

    assert!(d.load(true).await);
    assert_eq!(d.pending_replies(), vec![reply.clone()]);

    assert_eq!(server.approve_replies(&article()), vec![reply.reply_id.clone()]);
    assert!(d.load(true).await);
    while d.load_more().await {}
    assert!(d.forest().contains(&reply.reply_id));
    assert!(d.pending_replies().is_empty());
}

#[tokio::test]
async fn reply_to_locked_article_fails() {
    let server = server();
    server.lock_article(&article());
    let mut d = discussion(&server);
    assert!(d.load(true).await);
    assert!(d.topic().unwrap().is_locked);
    let requests = server.test_num_requests();
    assert!(d.reply(&id("a"), "hello").await.is_none());
    assert!(d.pending_replies().is_empty());
    // refused locally, the server never saw it
    assert_eq!(server.test_num_requests(), requests);
    assert_eq!(server.test_num_awaiting_moderation(&article()), 0);
}

#[tokio::test]
async fn nickname_flags_follow_loads() {
    let server = server();
    let mut d = discussion(&server);
    assert!(d.load(true).await);

    // c, by Kalle, is not loaded yet
    assert!(!d.set_nickname_filter("kal"));
    assert!(!d.set_hide_unmarked(true));
    assert_eq!(d.visible_roots().len(), 2);

    assert!(d.load_more().await);
    assert!(d.filter_found_matches());
    assert!(d.forest().state(&id("a")).unwrap().has_nickname);
    assert!(d.set_hide_unmarked(true));
    let visible = d.visible_roots();
    assert_eq!(visible.len(), 1);
    assert_eq!(d.forest().node(visible[0]).comment.id, id("a"));

    assert!(!d.set_nickname_filter(""));
    assert!(!d.hide_unmarked());
    assert_eq!(d.visible_roots().len(), 2);
}

#[tokio::test]
async fn expanded_state_survives_reload() {
    let server = server();
    let mut d = discussion(&server);
    assert!(d.load(true).await);
    assert!(d.toggle_expanded(&id("a")));
    assert_eq!(d.forest().state(&id("a")).unwrap().expanded, Some(true));
    assert!(!d.toggle_expanded(&id("nope")));

    assert!(d.load(true).await);
    assert_eq!(d.forest().state(&id("a")).unwrap().expanded, Some(true));
    assert_eq!(d.forest().state(&id("b")).unwrap().expanded, None);
    assert!(d.toggle_expanded(&id("a")));
    assert_eq!(d.forest().state(&id("a")).unwrap().expanded, Some(false));
}

#[tokio::test]
async fn reading_history() {
    let server = server();
    let untitled = ArticleId::from("74-20000000");
    server.add_article(&untitled, "");
    let mut d = discussion(&server);
    assert!(d.load(true).await);
    d.set_article(untitled.clone());
    assert!(d.load(true).await);

    let history = d.history().get();
    assert_eq!(history.len(), 2);
    assert_eq!(history[0].id, untitled);
    assert_eq!(history[0].title, "74-20000000");
    assert_eq!(history[1].title, "Kunnat karsivat");

    // incremental loads do not touch history
    d.set_article(article());
    assert!(d.load(true).await);
    assert!(d.load_more().await);
    assert_eq!(d.history().latest().unwrap().id, article());

    let store = d.history().store().clone();
    let mut reopened = Discussion::new(&server, store, LoadConfig::default());
    assert_eq!(reopened.open_latest_from_history(), Some(article()));
    assert_eq!(reopened.open_latest_from_history(), None);
}
