use quill_dal::group::{CreateGroup, GroupRepositoryImpl};
use sqlx::Executor;

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
    conn
}

#[tokio::test]
async fn test_group_slug_is_derived() {
    let conn = init_db().await;
    let repo = GroupRepositoryImpl::new(conn);

    let group = repo
        .create(CreateGroup {
            title: "Rust Users!".to_string(),
            slug: None,
            description: "All things Rust".to_string(),
        })
        .await
        .unwrap();
    assert_eq!(group.slug, "rust-users");

    let by_slug = repo.get_by_slug("rust-users").await.unwrap();
    assert_eq!(by_slug.id, group.id);

    let missing = repo.get_by_slug("no-such-group").await;
    assert!(matches!(missing, Err(quill_dal::Error::RecordNotFound(_))));
}

#[tokio::test]
async fn test_group_slug_must_be_unique() {
    let conn = init_db().await;
    let repo = GroupRepositoryImpl::new(conn);

    repo.create(CreateGroup {
        title: "First".to_string(),
        slug: Some("shared".to_string()),
        description: String::new(),
    })
    .await
    .unwrap();

    let duplicate = repo
        .create(CreateGroup {
            title: "Second".to_string(),
            slug: Some("shared".to_string()),
            description: String::new(),
        })
        .await;
    assert!(matches!(
        duplicate,
        Err(quill_dal::Error::AlreadyExists(_))
    ));
}

#[tokio::test]
async fn test_unsluggable_title() {
    let conn = init_db().await;
    let repo = GroupRepositoryImpl::new(conn);

    let res = repo
        .create(CreateGroup {
            title: "***".to_string(),
            slug: None,
            description: String::new(),
        })
        .await;
    assert!(matches!(res, Err(quill_dal::Error::InvalidSlug(_))));

    let listed = repo.list(100).await.unwrap();
    assert!(listed.is_empty());
}
