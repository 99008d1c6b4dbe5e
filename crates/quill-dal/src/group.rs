use futures::{StreamExt as _, TryStreamExt as _};
use garde::Validate;
use quill_types::utils::naming::slugify;
use serde::{Deserialize, Serialize};
use sqlx::Pool;

use crate::{Error, error::Result};

fn is_valid_slug(slug: &str, _ctx: &()) -> garde::Result {
    if slug
        .chars()
        .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-')
    {
        Ok(())
    } else {
        Err(garde::Error::new(
            "slug may contain only lowercase letters, digits and dashes",
        ))
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, Validate)]
pub struct CreateGroup {
    #[garde(length(min = 1, max = 200))]
    pub title: String,
    /// Derived from the title when not provided.
    #[garde(inner(length(min = 1, max = 255), custom(is_valid_slug)))]
    pub slug: Option<String>,
    #[garde(length(max = 5000))]
    #[serde(default)]
    pub description: String,
}

#[derive(Debug, Serialize, Deserialize, Clone, sqlx::FromRow)]
pub struct Group {
    pub id: i64,
    pub title: String,
    pub slug: String,
    pub description: String,
}

/// Group reference embedded in posts.
#[derive(Debug, Serialize, Deserialize, Clone, sqlx::FromRow)]
pub struct GroupShort {
    pub id: i64,
    pub title: String,
    pub slug: String,
}

pub type GroupRepository = GroupRepositoryImpl<Pool<crate::ChosenDB>>;

pub struct GroupRepositoryImpl<E> {
    executor: E,
}

impl<'c, E> GroupRepositoryImpl<E>
where
    for<'a> &'a E: sqlx::Executor<'c, Database = crate::ChosenDB>,
{
    pub fn new(executor: E) -> Self {
        Self { executor }
    }

    pub async fn create(&self, payload: CreateGroup) -> Result<Group> {
        let slug = match payload.slug {
            Some(slug) => slug,
            None => {
                let slug = slugify(&payload.title);
                if slug.is_empty() {
                    return Err(Error::InvalidSlug(payload.title));
                }
                slug
            }
        };
        let result =
            sqlx::query("INSERT INTO groups (title, slug, description) VALUES (?, ?, ?)")
                .bind(&payload.title)
                .bind(&slug)
                .bind(&payload.description)
                .execute(&self.executor)
                .await
                .map_err(|e| Error::on_unique(e, "Group"))?;

        let id = result.last_insert_rowid();
        self.get(id).await
    }

    pub async fn get(&self, id: i64) -> Result<Group> {
        sqlx::query_as::<_, Group>("SELECT id, title, slug, description FROM groups WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.executor)
            .await?
            .ok_or_else(|| Error::RecordNotFound("Group".to_string()))
    }

    pub async fn get_by_slug(&self, slug: &str) -> Result<Group> {
        sqlx::query_as::<_, Group>(
            "SELECT id, title, slug, description FROM groups WHERE slug = ?",
        )
        .bind(slug)
        .fetch_optional(&self.executor)
        .await?
        .ok_or_else(|| Error::RecordNotFound("Group".to_string()))
    }

    pub async fn list(&self, limit: usize) -> Result<Vec<GroupShort>> {
        let records = sqlx::query_as::<_, GroupShort>(
            "SELECT id, title, slug FROM groups ORDER BY title",
        )
        .fetch(&self.executor)
        .take(limit)
        .try_collect::<Vec<_>>()
        .await?;
        Ok(records)
    }

    pub async fn delete(&self, id: i64) -> Result<()> {
        let res = sqlx::query("DELETE FROM groups WHERE id = ?")
            .bind(id)
            .execute(&self.executor)
            .await?;

        if res.rows_affected() == 0 {
            Err(Error::RecordNotFound("Group".to_string()))
        } else {
            Ok(())
        }
    }
}
