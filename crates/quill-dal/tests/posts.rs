use futures::TryStreamExt as _;
use quill_dal::{
    comment::{CommentRepositoryImpl, CreateComment},
    post::{CreatePost, PostRepositoryImpl, UpdatePost},
    rating::RatingRepositoryImpl,
};
use sqlx::Executor;

const TEST_DATA: &str = r#"
INSERT INTO users (id, username) VALUES (1, 'alice');
INSERT INTO users (id, username) VALUES (2, 'bob');

INSERT INTO groups (id, title, slug, description) VALUES (1, 'Rust Users', 'rust-users', 'All things Rust');
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
async fn test_post_create_and_get() {
    let conn = init_db().await;
    let repo = PostRepositoryImpl::new(conn);

    let post = repo
        .create(
            1,
            CreatePost {
                text: "hello".to_string(),
                group_id: Some(1),
            },
        )
        .await
        .unwrap();

    assert_eq!(post.text, "hello");
    assert_eq!(post.author.username, "alice");
    assert_eq!(post.group.as_ref().unwrap().slug, "rust-users");
    assert_eq!(post.avg_rating, None);
    assert_eq!(post.version, 1);

    let fetched = repo.get(post.id).await.unwrap();
    assert_eq!(fetched.text, "hello");
    assert_eq!(fetched.created, post.created);

    let missing = repo.get(42).await;
    assert!(matches!(missing, Err(quill_dal::Error::RecordNotFound(_))));
}

#[tokio::test]
async fn test_post_update_optimistic() {
    let conn = init_db().await;
    let repo = PostRepositoryImpl::new(conn);

    let post = repo
        .create(
            1,
            CreatePost {
                text: "draft".to_string(),
                group_id: None,
            },
        )
        .await
        .unwrap();

    let updated = repo
        .update(
            post.id,
            UpdatePost {
                text: "final".to_string(),
                group_id: Some(1),
                version: Some(post.version),
            },
        )
        .await
        .unwrap();
    assert_eq!(updated.text, "final");
    assert_eq!(updated.version, post.version + 1);
    assert_eq!(updated.group.as_ref().unwrap().id, 1);
    // creation time survives edits
    assert_eq!(updated.created, post.created);

    // stale version is rejected
    let stale = repo
        .update(
            post.id,
            UpdatePost {
                text: "other".to_string(),
                group_id: None,
                version: Some(post.version),
            },
        )
        .await;
    assert!(matches!(
        stale,
        Err(quill_dal::Error::FailedUpdate { .. })
    ));

    let missing_version = repo
        .update(
            post.id,
            UpdatePost {
                text: "other".to_string(),
                group_id: None,
                version: None,
            },
        )
        .await;
    assert!(matches!(
        missing_version,
        Err(quill_dal::Error::MissingVersion)
    ));
}

#[tokio::test]
async fn test_comments() {
    let conn = init_db().await;
    let posts = PostRepositoryImpl::new(conn.clone());
    let comments = CommentRepositoryImpl::new(conn);

    let post = posts
        .create(
            1,
            CreatePost {
                text: "hello".to_string(),
                group_id: None,
            },
        )
        .await
        .unwrap();

    let first = comments
        .create(
            post.id,
            2,
            CreateComment {
                text: "first!".to_string(),
            },
        )
        .await
        .unwrap();
    comments
        .create(
            post.id,
            1,
            CreateComment {
                text: "thanks".to_string(),
            },
        )
        .await
        .unwrap();

    assert_eq!(first.author.username, "bob");
    let listed = comments.list_for_post(post.id).await.unwrap();
    assert_eq!(listed.len(), 2);
    // oldest first
    assert_eq!(listed[0].text, "first!");
    assert_eq!(listed[1].text, "thanks");
    assert_eq!(comments.count_for_post(post.id).await.unwrap(), 2);

    let missing = comments
        .create(
            42,
            1,
            CreateComment {
                text: "into the void".to_string(),
            },
        )
        .await;
    assert!(matches!(missing, Err(quill_dal::Error::RecordNotFound(_))));
}

#[tokio::test]
async fn test_delete_cascades_comments_and_ratings() {
    let conn = init_db().await;
    let posts = PostRepositoryImpl::new(conn.clone());
    let comments = CommentRepositoryImpl::new(conn.clone());
    let ratings = RatingRepositoryImpl::new(conn.clone());

    let post = posts
        .create(
            1,
            CreatePost {
                text: "ephemeral".to_string(),
                group_id: None,
            },
        )
        .await
        .unwrap();
    comments
        .create(
            post.id,
            2,
            CreateComment {
                text: "soon gone".to_string(),
            },
        )
        .await
        .unwrap();
    ratings.rate(post.id, 2, 5).await.unwrap();

    posts.delete(post.id).await.unwrap();

    assert!(matches!(
        posts.get(post.id).await,
        Err(quill_dal::Error::RecordNotFound(_))
    ));
    let comments_left: u64 = sqlx::query_scalar("SELECT count(*) FROM comment")
        .fetch_one(&conn)
        .await
        .unwrap();
    assert_eq!(comments_left, 0);
    let ratings_left: u64 = sqlx::query_scalar("SELECT count(*) FROM post_rating")
        .fetch_one(&conn)
        .await
        .unwrap();
    assert_eq!(ratings_left, 0);

    // deleting again reports the miss
    assert!(matches!(
        posts.delete(post.id).await,
        Err(quill_dal::Error::RecordNotFound(_))
    ));
}
