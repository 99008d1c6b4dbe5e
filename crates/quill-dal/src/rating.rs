use sqlx::Acquire as _;

use crate::{Error, error::Result};

/// Accepted rating range. The range is deliberately a pair of constants so
/// the accepted bounds are pinned in one place (and by the test suite).
pub const RATING_MIN: i64 = 0;
pub const RATING_MAX: i64 = 5;

pub type RatingRepository = RatingRepositoryImpl<sqlx::Pool<crate::ChosenDB>>;

pub struct RatingRepositoryImpl<E> {
    executor: E,
}

impl<'c, E> RatingRepositoryImpl<E>
where
    for<'a> &'a E:
        sqlx::Executor<'c, Database = crate::ChosenDB> + sqlx::Acquire<'c, Database = crate::ChosenDB>,
{
    pub fn new(executor: E) -> Self {
        Self { executor }
    }

    /// Records the user's rating of a post and refreshes the post's stored
    /// average.
    ///
    /// A re-rate replaces the previous row, there is never more than one
    /// rating per (post, user). The replace and the average recompute run in
    /// one transaction so concurrent raters cannot recompute from a stale
    /// rating set. Returns the new average, rounded half-to-even to whole
    /// numbers.
    pub async fn rate(&self, post_id: i64, user_id: i64, rating: i64) -> Result<Option<f64>> {
        if !(RATING_MIN..=RATING_MAX).contains(&rating) {
            return Err(Error::RatingOutOfRange(rating));
        }

        let mut conn = self.executor.acquire().await?;
        let mut transaction = conn.begin().await?;

        match sqlx::query_scalar::<_, i64>("SELECT id FROM post WHERE id = ?")
            .bind(post_id)
            .fetch_optional(&mut *transaction)
            .await?
        {
            Some(_) => (),
            None => return Err(Error::RecordNotFound("Post".to_string())),
        }

        sqlx::query("DELETE FROM post_rating WHERE post_id = ? AND user_id = ?")
            .bind(post_id)
            .bind(user_id)
            .execute(&mut *transaction)
            .await?;
        sqlx::query("INSERT INTO post_rating (post_id, user_id, rating) VALUES (?, ?, ?)")
            .bind(post_id)
            .bind(user_id)
            .bind(rating)
            .execute(&mut *transaction)
            .await?;

        let avg: Option<f64> =
            sqlx::query_scalar("SELECT AVG(rating) FROM post_rating WHERE post_id = ?")
                .bind(post_id)
                .fetch_one(&mut *transaction)
                .await?;
        let avg = avg.map(f64::round_ties_even);

        sqlx::query("UPDATE post SET avg_rating = ? WHERE id = ?")
            .bind(avg)
            .bind(post_id)
            .execute(&mut *transaction)
            .await?;

        transaction.commit().await?;
        Ok(avg)
    }

    pub async fn user_rating(&self, post_id: i64, user_id: i64) -> Result<Option<i64>> {
        let rating = sqlx::query_scalar::<_, i64>(
            "SELECT rating FROM post_rating WHERE post_id = ? AND user_id = ?",
        )
        .bind(post_id)
        .bind(user_id)
        .fetch_optional(&self.executor)
        .await?;
        Ok(rating)
    }

    pub async fn count_for_post(&self, post_id: i64) -> Result<u64> {
        let count: u64 = sqlx::query_scalar("SELECT count(*) FROM post_rating WHERE post_id = ?")
            .bind(post_id)
            .fetch_one(&self.executor)
            .await?;
        Ok(count)
    }
}
