use crate::{error::ApiError, error::ApiResult, repository_from_request};
use axum_valid::Garde;
use quill_dal::user::{CreateUser, UserRepository};

use axum::{
    extract::Path,
    response::IntoResponse,
    routing::{delete, post},
    Json,
};
use http::StatusCode;
use quill_types::claim::{ApiClaim, Authorization as _};

use crate::state::AppState;

repository_from_request!(UserRepository);

fn require_admin(claim: &ApiClaim) -> ApiResult<()> {
    if claim.has_role("admin") {
        Ok(())
    } else {
        Err(ApiError::Forbidden)
    }
}

pub async fn create_user(
    user_registry: UserRepository,
    claim: ApiClaim,
    Garde(Json(payload)): Garde<Json<CreateUser>>,
) -> ApiResult<impl IntoResponse> {
    require_admin(&claim)?;
    let user = user_registry.create(payload).await?;

    Ok((StatusCode::CREATED, Json(user)))
}

async fn list_users(
    user_registry: UserRepository,
    claim: ApiClaim,
) -> ApiResult<impl IntoResponse> {
    require_admin(&claim)?;
    let users = user_registry.list(100).await?;
    Ok((StatusCode::OK, Json(users)))
}

async fn delete_user(
    Path(id): Path<i64>,
    user_registry: UserRepository,
    claim: ApiClaim,
) -> ApiResult<impl IntoResponse> {
    require_admin(&claim)?;
    user_registry.delete(id).await?;

    Ok((StatusCode::NO_CONTENT, ()))
}

pub fn users_router() -> axum::Router<AppState> {
    axum::Router::new()
        .route("/", post(create_user).get(list_users))
        .route("/{id}", delete(delete_user))
}
