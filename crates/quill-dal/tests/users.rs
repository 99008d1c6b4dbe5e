use std::str::FromStr as _;

use quill_dal::user::{CreateUser, UserRepositoryImpl};
use quill_types::general::ValidEmail;
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

fn new_user(username: &str) -> CreateUser {
    CreateUser {
        username: username.to_string(),
        email: Some(ValidEmail::from_str(&format!("{username}@example.com")).unwrap()),
        password: Some("secret-password".to_string()),
        roles: None,
    }
}

#[tokio::test]
async fn test_user_roundtrip() {
    let conn = init_db().await;
    let repo = UserRepositoryImpl::new(conn);

    let user = repo.create(new_user("alice")).await.unwrap();
    assert_eq!(user.username, "alice");
    assert_eq!(user.email.as_deref(), Some("alice@example.com"));

    let found = repo.find_by_username("alice").await.unwrap();
    assert_eq!(found.id, user.id);

    let missing = repo.find_by_username("nobody").await;
    assert!(matches!(missing, Err(quill_dal::Error::RecordNotFound(_))));
}

#[tokio::test]
async fn test_duplicate_username() {
    let conn = init_db().await;
    let repo = UserRepositoryImpl::new(conn);

    repo.create(new_user("alice")).await.unwrap();
    let duplicate = repo.create(new_user("alice")).await;
    assert!(matches!(
        duplicate,
        Err(quill_dal::Error::AlreadyExists(_))
    ));
}

#[tokio::test]
async fn test_check_password() {
    let conn = init_db().await;
    let repo = UserRepositoryImpl::new(conn);

    repo.create(new_user("alice")).await.unwrap();

    let user = repo
        .check_password("alice", "secret-password")
        .await
        .unwrap();
    assert_eq!(user.username, "alice");

    let bad = repo.check_password("alice", "wrong").await;
    assert!(matches!(bad, Err(quill_dal::Error::InvalidCredentials)));
    let unknown = repo.check_password("nobody", "secret-password").await;
    assert!(matches!(
        unknown,
        Err(quill_dal::Error::InvalidCredentials)
    ));
}

#[tokio::test]
async fn test_roles_roundtrip() {
    let conn = init_db().await;
    let repo = UserRepositoryImpl::new(conn);

    let user = repo
        .create(CreateUser {
            username: "admin".to_string(),
            email: None,
            password: Some("admin-password".to_string()),
            roles: Some(vec!["admin".to_string(), "user".to_string()]),
        })
        .await
        .unwrap();

    assert_eq!(
        user.roles,
        Some(vec!["admin".to_string(), "user".to_string()])
    );
}
