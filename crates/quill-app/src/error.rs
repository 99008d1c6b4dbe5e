use axum::response::{IntoResponse, Redirect, Response};
use http::StatusCode;
use quill_types::claim::ApiClaim;
use tracing::error;

pub type Error = anyhow::Error;
pub type Result<T, E = Error> = std::result::Result<T, E>;

pub type ApiResult<T, E = ApiError> = std::result::Result<T, E>;

/// View unauthenticated callers of mutating endpoints are sent to.
pub const LOGIN_VIEW: &str = "/auth/login";

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Invalid query: {0}")]
    InvalidQuery(String),

    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Authentication required")]
    AuthenticationRequired,

    #[error("Access denied")]
    Forbidden,

    #[error("Internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl From<quill_dal::Error> for ApiError {
    fn from(e: quill_dal::Error) -> Self {
        use quill_dal::Error as DalError;
        match e {
            DalError::RecordNotFound(what) => ApiError::NotFound(what),
            DalError::AlreadyExists(what) => ApiError::Conflict(what),
            DalError::FailedUpdate { id, version } => {
                ApiError::Conflict(format!("record {id} changed since version {version}"))
            }
            DalError::SelfFollow
            | DalError::RatingOutOfRange(_)
            | DalError::InvalidSlug(_)
            | DalError::MissingVersion => ApiError::Validation(e.to_string()),
            DalError::InvalidOrderByField(field) => ApiError::InvalidQuery(field),
            DalError::InvalidCredentials => ApiError::AuthenticationRequired,
            other => ApiError::Internal(other.into()),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self {
            ApiError::NotFound(what) => {
                (StatusCode::NOT_FOUND, format!("Not found: {what}")).into_response()
            }
            ApiError::InvalidQuery(msg) => (StatusCode::BAD_REQUEST, msg).into_response(),
            ApiError::Validation(msg) => (StatusCode::UNPROCESSABLE_ENTITY, msg).into_response(),
            ApiError::Conflict(what) => (StatusCode::CONFLICT, what).into_response(),
            ApiError::AuthenticationRequired => Redirect::to(LOGIN_VIEW).into_response(),
            ApiError::Forbidden => StatusCode::FORBIDDEN.into_response(),
            ApiError::Internal(e) => {
                error!("Internal error: {e:#}");
                StatusCode::INTERNAL_SERVER_ERROR.into_response()
            }
        }
    }
}

/// Outcome of an ownership check.
///
/// Denial is deliberately not an error: the caller is redirected to the
/// read-only view of the resource instead of receiving a rejection page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthorizationOutcome {
    Allowed,
    RedirectTo(String),
}

pub fn authorize_owner(
    claim: &ApiClaim,
    owner_id: i64,
    read_only_view: impl Into<String>,
) -> AuthorizationOutcome {
    match claim.user_id() {
        Some(id) if id == owner_id => AuthorizationOutcome::Allowed,
        _ => AuthorizationOutcome::RedirectTo(read_only_view.into()),
    }
}
