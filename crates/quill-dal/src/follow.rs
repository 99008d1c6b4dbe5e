use sqlx::Pool;

use crate::{Error, error::Result};

pub type FollowRepository = FollowRepositoryImpl<Pool<crate::ChosenDB>>;

/// Directed follow edges between users. The (user, author) pair is unique at
/// the storage level, both operations are idempotent.
pub struct FollowRepositoryImpl<E> {
    executor: E,
}

impl<'c, E> FollowRepositoryImpl<E>
where
    for<'a> &'a E: sqlx::Executor<'c, Database = crate::ChosenDB>,
{
    pub fn new(executor: E) -> Self {
        Self { executor }
    }

    /// Ensures the user -> author edge exists. Self-follow is rejected here,
    /// the single place that invariant lives.
    pub async fn follow(&self, user_id: i64, author_id: i64) -> Result<()> {
        if user_id == author_id {
            return Err(Error::SelfFollow);
        }
        sqlx::query("INSERT OR IGNORE INTO follow (user_id, author_id) VALUES (?, ?)")
            .bind(user_id)
            .bind(author_id)
            .execute(&self.executor)
            .await?;
        Ok(())
    }

    /// Removes the edge if present, absence is not an error.
    pub async fn unfollow(&self, user_id: i64, author_id: i64) -> Result<()> {
        sqlx::query("DELETE FROM follow WHERE user_id = ? AND author_id = ?")
            .bind(user_id)
            .bind(author_id)
            .execute(&self.executor)
            .await?;
        Ok(())
    }

    pub async fn is_following(&self, user_id: i64, author_id: i64) -> Result<bool> {
        let exists: i64 = sqlx::query_scalar(
            "SELECT EXISTS (SELECT 1 FROM follow WHERE user_id = ? AND author_id = ?)",
        )
        .bind(user_id)
        .bind(author_id)
        .fetch_one(&self.executor)
        .await?;
        Ok(exists != 0)
    }

    pub async fn follower_count(&self, author_id: i64) -> Result<u64> {
        let count: u64 = sqlx::query_scalar("SELECT count(*) FROM follow WHERE author_id = ?")
            .bind(author_id)
            .fetch_one(&self.executor)
            .await?;
        Ok(count)
    }

    pub async fn following_count(&self, user_id: i64) -> Result<u64> {
        let count: u64 = sqlx::query_scalar("SELECT count(*) FROM follow WHERE user_id = ?")
            .bind(user_id)
            .fetch_one(&self.executor)
            .await?;
        Ok(count)
    }
}
