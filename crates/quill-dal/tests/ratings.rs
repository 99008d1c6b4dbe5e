use futures::TryStreamExt as _;
use quill_dal::rating::{RATING_MAX, RATING_MIN, RatingRepositoryImpl};
use sqlx::Executor;

const TEST_DATA: &str = r#"
INSERT INTO users (id, username) VALUES (1, 'alice');
INSERT INTO users (id, username) VALUES (2, 'bob');
INSERT INTO users (id, username) VALUES (3, 'cyril');

INSERT INTO post (id, text, author_id, version) VALUES (1, 'hello', 1, 1);
INSERT INTO post (id, text, author_id, version) VALUES (2, 'second', 1, 1);
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
async fn test_accepted_range_is_pinned() {
    // The accepted bounds are part of the public contract.
    assert_eq!(RATING_MIN, 0);
    assert_eq!(RATING_MAX, 5);

    let conn = init_db().await;
    let repo = RatingRepositoryImpl::new(conn);

    let res = repo.rate(1, 2, RATING_MAX + 1).await;
    assert!(matches!(
        res,
        Err(quill_dal::Error::RatingOutOfRange(6))
    ));
    let res = repo.rate(1, 2, RATING_MIN - 1).await;
    assert!(matches!(
        res,
        Err(quill_dal::Error::RatingOutOfRange(-1))
    ));

    // rejected ratings leave nothing behind
    assert_eq!(repo.count_for_post(1).await.unwrap(), 0);
}

#[tokio::test]
async fn test_rerate_replaces_previous_row() {
    let conn = init_db().await;
    let repo = RatingRepositoryImpl::new(conn.clone());

    let avg = repo.rate(1, 2, 4).await.unwrap();
    assert_eq!(avg, Some(4.0));

    let avg = repo.rate(1, 2, 2).await.unwrap();
    assert_eq!(avg, Some(2.0));

    assert_eq!(repo.count_for_post(1).await.unwrap(), 1);
    assert_eq!(repo.user_rating(1, 2).await.unwrap(), Some(2));

    let stored: Option<f64> = sqlx::query_scalar("SELECT avg_rating FROM post WHERE id = 1")
        .fetch_one(&conn)
        .await
        .unwrap();
    assert_eq!(stored, Some(2.0));
}

#[tokio::test]
async fn test_average_rounds_half_to_even() {
    let conn = init_db().await;
    let repo = RatingRepositoryImpl::new(conn);

    // mean 4.5 rounds down to the even neighbour
    repo.rate(1, 2, 4).await.unwrap();
    let avg = repo.rate(1, 3, 5).await.unwrap();
    assert_eq!(avg, Some(4.0));

    // mean 2.5 rounds to 2, not 3
    repo.rate(2, 2, 2).await.unwrap();
    let avg = repo.rate(2, 3, 3).await.unwrap();
    assert_eq!(avg, Some(2.0));

    // mean 3.5 rounds up to the even neighbour 4
    repo.rate(2, 2, 4).await.unwrap();
    let avg = repo.rate(2, 3, 3).await.unwrap();
    assert_eq!(avg, Some(4.0));
}

#[tokio::test]
async fn test_each_user_rates_independently() {
    let conn = init_db().await;
    let repo = RatingRepositoryImpl::new(conn);

    repo.rate(1, 1, 1).await.unwrap();
    repo.rate(1, 2, 3).await.unwrap();
    let avg = repo.rate(1, 3, 5).await.unwrap();

    assert_eq!(repo.count_for_post(1).await.unwrap(), 3);
    assert_eq!(avg, Some(3.0));
    assert_eq!(repo.user_rating(1, 1).await.unwrap(), Some(1));
    assert_eq!(repo.user_rating(1, 2).await.unwrap(), Some(3));
    // the other post is untouched
    assert_eq!(repo.count_for_post(2).await.unwrap(), 0);
    assert_eq!(repo.user_rating(2, 1).await.unwrap(), None);
}

#[tokio::test]
async fn test_rate_missing_post() {
    let conn = init_db().await;
    let repo = RatingRepositoryImpl::new(conn);

    let res = repo.rate(42, 1, 3).await;
    assert!(matches!(res, Err(quill_dal::Error::RecordNotFound(_))));
}
