use futures::{StreamExt as _, TryStreamExt as _};
use garde::Validate;
use serde::{Deserialize, Serialize};
use sqlx::{Pool, Row as _};

use crate::{ChosenRow, Error, error::Result, user::UserShort};

#[derive(Debug, Serialize, Deserialize, Clone, Validate)]
pub struct CreateComment {
    #[garde(length(min = 1, max = 5000))]
    pub text: String,
}

#[derive(Debug, Serialize, Clone)]
pub struct Comment {
    pub id: i64,
    pub post_id: i64,
    pub author: UserShort,
    pub text: String,
    pub created: time::PrimitiveDateTime,
}

impl sqlx::FromRow<'_, ChosenRow> for Comment {
    fn from_row(row: &ChosenRow) -> Result<Self, sqlx::Error> {
        Ok(Comment {
            id: row.try_get("id")?,
            post_id: row.try_get("post_id")?,
            author: UserShort {
                id: row.try_get("author_id")?,
                username: row.try_get("author_username")?,
            },
            text: row.try_get("text")?,
            created: row.try_get("created")?,
        })
    }
}

const COMMENT_SELECT: &str = r#"
SELECT c.id, c.post_id, c.text, c.created,
c.author_id, u.username AS author_username
FROM comment c
JOIN users u ON c.author_id = u.id
"#;

pub type CommentRepository = CommentRepositoryImpl<Pool<crate::ChosenDB>>;

pub struct CommentRepositoryImpl<E> {
    executor: E,
}

impl<'c, E> CommentRepositoryImpl<E>
where
    for<'a> &'a E: sqlx::Executor<'c, Database = crate::ChosenDB>,
{
    pub fn new(executor: E) -> Self {
        Self { executor }
    }

    /// Comments have no edit or delete surface, they live and die with their
    /// post.
    pub async fn create(
        &self,
        post_id: i64,
        author_id: i64,
        payload: CreateComment,
    ) -> Result<Comment> {
        match sqlx::query_scalar::<_, i64>("SELECT id FROM post WHERE id = ?")
            .bind(post_id)
            .fetch_optional(&self.executor)
            .await?
        {
            Some(_) => (),
            None => return Err(Error::RecordNotFound("Post".to_string())),
        }

        let result = sqlx::query("INSERT INTO comment (post_id, author_id, text) VALUES (?, ?, ?)")
            .bind(post_id)
            .bind(author_id)
            .bind(&payload.text)
            .execute(&self.executor)
            .await?;

        let id = result.last_insert_rowid();
        self.get(id).await
    }

    pub async fn get(&self, id: i64) -> Result<Comment> {
        let sql = format!("{COMMENT_SELECT} WHERE c.id = ?");
        sqlx::query_as::<_, Comment>(&sql)
            .bind(id)
            .fetch_optional(&self.executor)
            .await?
            .ok_or_else(|| Error::RecordNotFound("Comment".to_string()))
    }

    /// All comments of a post, oldest first.
    pub async fn list_for_post(&self, post_id: i64) -> Result<Vec<Comment>> {
        let sql = format!("{COMMENT_SELECT} WHERE c.post_id = ? ORDER BY c.created, c.id");
        let records = sqlx::query_as::<_, Comment>(&sql)
            .bind(post_id)
            .fetch(&self.executor)
            .take(crate::MAX_LIMIT)
            .try_collect::<Vec<_>>()
            .await?;
        Ok(records)
    }

    pub async fn count_for_post(&self, post_id: i64) -> Result<u64> {
        let count: u64 = sqlx::query_scalar("SELECT count(*) FROM comment WHERE post_id = ?")
            .bind(post_id)
            .fetch_one(&self.executor)
            .await?;
        Ok(count)
    }
}
