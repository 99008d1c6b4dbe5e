pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Database error: {0}")]
    DatabaseError(#[from] sqlx::Error),

    #[error("User password error: {0}")]
    UserPasswordError(#[from] argon2::password_hash::Error),

    #[error("Record not found: {0}")]
    RecordNotFound(String),

    #[error("Record already exists: {0}")]
    AlreadyExists(String),

    #[error("Invalid credentials")]
    InvalidCredentials,

    #[error("Users cannot follow themselves")]
    SelfFollow,

    #[error("Rating {0} is out of accepted range")]
    RatingOutOfRange(i64),

    #[error("No version provided for update")]
    MissingVersion,

    #[error("Failed to update record {id} with version {version}")]
    FailedUpdate { id: i64, version: i64 },

    #[error("Invalid order by field: {0}")]
    InvalidOrderByField(String),

    #[error("Cannot derive a valid slug from: {0}")]
    InvalidSlug(String),
}

impl Error {
    /// Maps a unique constraint violation to [`Error::AlreadyExists`],
    /// anything else stays a database error.
    pub(crate) fn on_unique(e: sqlx::Error, entity: &str) -> Error {
        match &e {
            sqlx::Error::Database(db) if db.is_unique_violation() => {
                Error::AlreadyExists(entity.to_string())
            }
            _ => Error::DatabaseError(e),
        }
    }
}
