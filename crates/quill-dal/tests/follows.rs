use futures::TryStreamExt as _;
use sqlx::Executor;

const TEST_DATA: &str = r#"
INSERT INTO users (id, username) VALUES (1, 'alice');
INSERT INTO users (id, username) VALUES (2, 'bob');
INSERT INTO users (id, username) VALUES (3, 'cyril');
"#;

async fn init_db() -> sqlx::Pool<sqlx::Sqlite> {
    const DB_URL: &str = "sqlite::memory:";
    let conn = sqlx::sqlite::SqlitePoolOptions::new()
        .max_connections(1)
        .min_connections(1)
        .connect(DB_URL)
        .await
        .unwrap();
    conn.execute("PRAGMA foreign_keys = ON").await.unwrap();
    sqlx::migrate!("../../migrations").run(&conn).await.unwrap();

    conn.execute_many(TEST_DATA)
        .try_collect::<Vec<_>>()
        .await
        .unwrap();

    conn
}

#[tokio::test]
async fn test_self_follow_rejected() {
    let conn = init_db().await;
    let repo = quill_dal::follow::FollowRepositoryImpl::new(conn);

    let res = repo.follow(1, 1).await;
    assert!(matches!(res, Err(quill_dal::Error::SelfFollow)));
    assert_eq!(repo.follower_count(1).await.unwrap(), 0);
}

#[tokio::test]
async fn test_follow_is_idempotent() {
    let conn = init_db().await;
    let repo = quill_dal::follow::FollowRepositoryImpl::new(conn);

    repo.follow(2, 1).await.unwrap();
    repo.follow(2, 1).await.unwrap();

    assert_eq!(repo.follower_count(1).await.unwrap(), 1);
    assert!(repo.is_following(2, 1).await.unwrap());
    // direction matters
    assert!(!repo.is_following(1, 2).await.unwrap());
}

#[tokio::test]
async fn test_unfollow_missing_edge_is_noop() {
    let conn = init_db().await;
    let repo = quill_dal::follow::FollowRepositoryImpl::new(conn);

    repo.unfollow(2, 1).await.unwrap();
    assert_eq!(repo.follower_count(1).await.unwrap(), 0);
}

#[tokio::test]
async fn test_follow_counts() {
    let conn = init_db().await;
    let repo = quill_dal::follow::FollowRepositoryImpl::new(conn);

    repo.follow(2, 1).await.unwrap();
    repo.follow(3, 1).await.unwrap();
    repo.follow(2, 3).await.unwrap();

    assert_eq!(repo.follower_count(1).await.unwrap(), 2);
    assert_eq!(repo.follower_count(2).await.unwrap(), 0);
    assert_eq!(repo.following_count(2).await.unwrap(), 2);

    repo.unfollow(2, 1).await.unwrap();
    assert_eq!(repo.follower_count(1).await.unwrap(), 1);
    assert!(!repo.is_following(2, 1).await.unwrap());
    assert!(repo.is_following(3, 1).await.unwrap());
}
