use futures::{StreamExt as _, TryStreamExt as _};
use garde::Validate;
use serde::{Deserialize, Serialize};
use sqlx::{Acquire as _, Row as _};

use crate::{
    Batch, ChosenRow, Error, ListingParams, error::Result, group::GroupShort, user::UserShort,
};

// Unqualified names must stay unambiguous in the joined select.
const VALID_ORDER_FIELDS: &[&str] = &["created", "avg_rating"];

/// Default feed order: newest first, id as tie breaker for posts created
/// within the same second.
const DEFAULT_ORDER: &str = "created DESC, p.id DESC";

const POST_SELECT: &str = r#"
SELECT p.id, p.text, p.created, p.image, p.avg_rating, p.version,
p.author_id, u.username AS author_username,
p.group_id, g.title AS group_title, g.slug AS group_slug
FROM post p
JOIN users u ON p.author_id = u.id
LEFT JOIN groups g ON p.group_id = g.id
"#;

#[derive(Debug, Serialize, Deserialize, Clone, Validate)]
pub struct CreatePost {
    #[garde(length(min = 1))]
    pub text: String,
    #[garde(range(min = 0))]
    pub group_id: Option<i64>,
}

#[derive(Debug, Serialize, Deserialize, Clone, Validate)]
pub struct UpdatePost {
    #[garde(length(min = 1))]
    pub text: String,
    #[garde(range(min = 0))]
    pub group_id: Option<i64>,
    #[garde(range(min = 0))]
    pub version: Option<i64>,
}

#[derive(Debug, Serialize, Clone)]
pub struct Post {
    pub id: i64,
    pub text: String,
    pub created: time::PrimitiveDateTime,
    pub author: UserShort,
    pub group: Option<GroupShort>,
    pub image: Option<String>,
    pub avg_rating: Option<f64>,
    pub version: i64,
}

impl sqlx::FromRow<'_, ChosenRow> for Post {
    fn from_row(row: &ChosenRow) -> Result<Self, sqlx::Error> {
        let author = UserShort {
            id: row.try_get("author_id")?,
            username: row.try_get("author_username")?,
        };
        let group = match row.try_get::<Option<i64>, _>("group_id")? {
            Some(id) => Some(GroupShort {
                id,
                title: row.try_get("group_title")?,
                slug: row.try_get("group_slug")?,
            }),
            None => None,
        };
        Ok(Post {
            id: row.try_get("id")?,
            text: row.try_get("text")?,
            created: row.try_get("created")?,
            author,
            group,
            image: row.try_get("image")?,
            avg_rating: row.try_get("avg_rating")?,
            version: row.try_get("version")?,
        })
    }
}

pub type PostRepository = PostRepositoryImpl<sqlx::Pool<crate::ChosenDB>>;

pub struct PostRepositoryImpl<E> {
    executor: E,
}

impl<'c, E> PostRepositoryImpl<E>
where
    for<'a> &'a E:
        sqlx::Executor<'c, Database = crate::ChosenDB> + sqlx::Acquire<'c, Database = crate::ChosenDB>,
{
    pub fn new(executor: E) -> Self {
        Self { executor }
    }

    /// Author always comes from the authenticated caller, never from the
    /// payload.
    pub async fn create(&self, author_id: i64, payload: CreatePost) -> Result<Post> {
        let result =
            sqlx::query("INSERT INTO post (text, author_id, group_id, version) VALUES (?, ?, ?, 1)")
                .bind(&payload.text)
                .bind(author_id)
                .bind(payload.group_id)
                .execute(&self.executor)
                .await?;

        let id = result.last_insert_rowid();
        self.get(id).await
    }

    pub async fn get(&self, id: i64) -> Result<Post> {
        let sql = format!("{POST_SELECT} WHERE p.id = ?");
        sqlx::query_as::<_, Post>(&sql)
            .bind(id)
            .fetch_optional(&self.executor)
            .await?
            .ok_or_else(|| Error::RecordNotFound("Post".to_string()))
    }

    /// Optimistic update of the mutable fields. Creation time and author are
    /// immutable, the derived average is owned by the rating repository.
    pub async fn update(&self, id: i64, payload: UpdatePost) -> Result<Post> {
        let version = payload.version.ok_or_else(|| {
            tracing::debug!("No version provided");
            Error::MissingVersion
        })?;
        let mut conn = self.executor.acquire().await?;
        let mut transaction = conn.begin().await?;
        let result =
            sqlx::query("UPDATE post SET text = ?, group_id = ?, version = ? WHERE id = ? AND version = ?")
                .bind(&payload.text)
                .bind(payload.group_id)
                .bind(version + 1)
                .bind(id)
                .bind(version)
                .execute(&mut *transaction)
                .await?;

        if result.rows_affected() == 0 {
            Err(Error::FailedUpdate { id, version })
        } else {
            let record = get(id, &mut *transaction).await?;
            transaction.commit().await?;
            Ok(record)
        }
    }

    pub async fn delete(&self, id: i64) -> Result<()> {
        let res = sqlx::query("DELETE FROM post WHERE id = ?")
            .bind(id)
            .execute(&self.executor)
            .await?;

        if res.rows_affected() == 0 {
            Err(Error::RecordNotFound("Post".to_string()))
        } else {
            Ok(())
        }
    }

    /// Records the stored image path of a post.
    pub async fn set_image(&self, id: i64, image: &str) -> Result<()> {
        let res = sqlx::query("UPDATE post SET image = ? WHERE id = ?")
            .bind(image)
            .bind(id)
            .execute(&self.executor)
            .await?;

        if res.rows_affected() == 0 {
            Err(Error::RecordNotFound("Post".to_string()))
        } else {
            Ok(())
        }
    }

    /// Global feed: every post, newest first.
    pub async fn list(&self, params: ListingParams) -> Result<Batch<Post>> {
        let total: u64 = sqlx::query_scalar("SELECT count(*) FROM post")
            .fetch_one(&self.executor)
            .await?;
        let sql = format!(
            "{POST_SELECT} ORDER BY {} LIMIT ? OFFSET ?",
            ordering(&params)?
        );
        let rows = sqlx::query_as::<_, Post>(&sql)
            .bind(params.limit)
            .bind(params.offset)
            .fetch(&self.executor)
            .take(crate::MAX_LIMIT)
            .try_collect::<Vec<_>>()
            .await?;
        Ok(Batch {
            offset: params.offset,
            total,
            rows,
        })
    }

    pub async fn list_by_group(&self, params: ListingParams, group_id: i64) -> Result<Batch<Post>> {
        let total: u64 = sqlx::query_scalar("SELECT count(*) FROM post WHERE group_id = ?")
            .bind(group_id)
            .fetch_one(&self.executor)
            .await?;
        let sql = format!(
            "{POST_SELECT} WHERE p.group_id = ? ORDER BY {} LIMIT ? OFFSET ?",
            ordering(&params)?
        );
        let rows = sqlx::query_as::<_, Post>(&sql)
            .bind(group_id)
            .bind(params.limit)
            .bind(params.offset)
            .fetch(&self.executor)
            .take(crate::MAX_LIMIT)
            .try_collect::<Vec<_>>()
            .await?;
        Ok(Batch {
            offset: params.offset,
            total,
            rows,
        })
    }

    pub async fn list_by_author(
        &self,
        params: ListingParams,
        author_id: i64,
    ) -> Result<Batch<Post>> {
        let total: u64 = sqlx::query_scalar("SELECT count(*) FROM post WHERE author_id = ?")
            .bind(author_id)
            .fetch_one(&self.executor)
            .await?;
        let sql = format!(
            "{POST_SELECT} WHERE p.author_id = ? ORDER BY {} LIMIT ? OFFSET ?",
            ordering(&params)?
        );
        let rows = sqlx::query_as::<_, Post>(&sql)
            .bind(author_id)
            .bind(params.limit)
            .bind(params.offset)
            .fetch(&self.executor)
            .take(crate::MAX_LIMIT)
            .try_collect::<Vec<_>>()
            .await?;
        Ok(Batch {
            offset: params.offset,
            total,
            rows,
        })
    }

    /// Subscription feed: posts whose author the viewer follows.
    pub async fn list_followed(&self, params: ListingParams, user_id: i64) -> Result<Batch<Post>> {
        let total: u64 = sqlx::query_scalar(
            "SELECT count(*) FROM post p JOIN follow f ON f.author_id = p.author_id AND f.user_id = ?",
        )
        .bind(user_id)
        .fetch_one(&self.executor)
        .await?;
        let sql = format!(
            r#"
SELECT p.id, p.text, p.created, p.image, p.avg_rating, p.version,
p.author_id, u.username AS author_username,
p.group_id, g.title AS group_title, g.slug AS group_slug
FROM post p
JOIN follow f ON f.author_id = p.author_id AND f.user_id = ?
JOIN users u ON p.author_id = u.id
LEFT JOIN groups g ON p.group_id = g.id
ORDER BY {} LIMIT ? OFFSET ?"#,
            ordering(&params)?
        );
        let rows = sqlx::query_as::<_, Post>(&sql)
            .bind(user_id)
            .bind(params.limit)
            .bind(params.offset)
            .fetch(&self.executor)
            .take(crate::MAX_LIMIT)
            .try_collect::<Vec<_>>()
            .await?;
        Ok(Batch {
            offset: params.offset,
            total,
            rows,
        })
    }

    pub async fn count_by_author(&self, author_id: i64) -> Result<u64> {
        let count: u64 = sqlx::query_scalar("SELECT count(*) FROM post WHERE author_id = ?")
            .bind(author_id)
            .fetch_one(&self.executor)
            .await?;
        Ok(count)
    }
}

fn ordering(params: &ListingParams) -> Result<String> {
    let order = params.ordering(VALID_ORDER_FIELDS)?;
    if order.is_empty() {
        Ok(DEFAULT_ORDER.to_string())
    } else {
        Ok(order)
    }
}

async fn get<'c, E>(id: i64, executor: E) -> Result<Post>
where
    E: sqlx::Executor<'c, Database = crate::ChosenDB>,
{
    let sql = format!("{POST_SELECT} WHERE p.id = ?");
    sqlx::query_as::<_, Post>(&sql)
        .bind(id)
        .fetch_optional(executor)
        .await?
        .ok_or_else(|| Error::RecordNotFound("Post".to_string()))
}
