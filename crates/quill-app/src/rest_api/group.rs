use axum::{
    extract::{Path, Query, State},
    response::IntoResponse,
    routing::get,
    Json,
};
use axum_valid::Garde;
use http::StatusCode;
use quill_dal::{
    group::{CreateGroup, GroupRepository},
    post::PostRepository,
};
use quill_types::claim::ApiClaim;

use crate::{
    error::ApiResult,
    rest_api::{Page, Paging},
    state::AppState,
};

pub async fn create(
    repository: GroupRepository,
    _claim: ApiClaim,
    Garde(Json(payload)): Garde<Json<CreateGroup>>,
) -> ApiResult<impl IntoResponse> {
    let record = repository.create(payload).await?;
    Ok((StatusCode::CREATED, Json(record)))
}

pub async fn list(repository: GroupRepository) -> ApiResult<impl IntoResponse> {
    let records = repository.list(100).await?;
    Ok((StatusCode::OK, Json(records)))
}

pub async fn get_by_slug(
    Path(slug): Path<String>,
    repository: GroupRepository,
) -> ApiResult<impl IntoResponse> {
    let record = repository.get_by_slug(&slug).await?;
    Ok((StatusCode::OK, Json(record)))
}

/// Posts tagged to the group, newest first.
pub async fn group_posts(
    Path(slug): Path<String>,
    State(state): State<AppState>,
    groups: GroupRepository,
    posts: PostRepository,
    Garde(Query(paging)): Garde<Query<Paging>>,
) -> ApiResult<impl IntoResponse> {
    let group = groups.get_by_slug(&slug).await?;

    let default_page_size = state.config().default_page_size;
    let page_size = paging.page_size(default_page_size);
    let params = paging.into_listing_params(default_page_size)?;
    let batch = posts.list_by_group(params, group.id).await?;

    Ok((StatusCode::OK, Json(Page::from_batch(batch, page_size))))
}

pub fn router() -> axum::Router<AppState> {
    axum::Router::new()
        .route("/", axum::routing::post(create).get(list))
        .route("/{slug}", get(get_by_slug))
        .route("/{slug}/posts", get(group_posts))
}
