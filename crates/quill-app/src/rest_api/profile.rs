use axum::{
    extract::{Path, Query, State},
    response::IntoResponse,
    routing::{get, put},
    Json,
};
use axum_valid::Garde;
use http::StatusCode;
use quill_dal::{
    follow::FollowRepository,
    post::PostRepository,
    user::{UserRepository, UserShort},
};
use quill_types::claim::ApiClaim;
use serde::Serialize;

use crate::{
    auth::claim_user_id,
    error::ApiResult,
    rest_api::{Page, Paging},
    state::AppState,
};

#[derive(Debug, Serialize)]
pub struct Profile {
    pub author: UserShort,
    pub posts_count: u64,
    pub follower_count: u64,
    pub following_count: u64,
    /// Whether the current viewer follows this author, false for anonymous
    /// viewers.
    pub is_following: bool,
}

pub async fn profile(
    Path(username): Path<String>,
    users: UserRepository,
    posts: PostRepository,
    follows: FollowRepository,
    claim: Option<ApiClaim>,
) -> ApiResult<impl IntoResponse> {
    let author = users.find_by_username(&username).await?;

    let is_following = match claim.as_ref().and_then(|c| c.user_id()) {
        Some(viewer_id) => follows.is_following(viewer_id, author.id).await?,
        None => false,
    };

    let profile = Profile {
        posts_count: posts.count_by_author(author.id).await?,
        follower_count: follows.follower_count(author.id).await?,
        following_count: follows.following_count(author.id).await?,
        is_following,
        author: UserShort {
            id: author.id,
            username: author.username,
        },
    };

    Ok((StatusCode::OK, Json(profile)))
}

pub async fn author_posts(
    Path(username): Path<String>,
    State(state): State<AppState>,
    users: UserRepository,
    posts: PostRepository,
    Garde(Query(paging)): Garde<Query<Paging>>,
) -> ApiResult<impl IntoResponse> {
    let author = users.find_by_username(&username).await?;

    let default_page_size = state.config().default_page_size;
    let page_size = paging.page_size(default_page_size);
    let params = paging.into_listing_params(default_page_size)?;
    let batch = posts.list_by_author(params, author.id).await?;

    Ok((StatusCode::OK, Json(Page::from_batch(batch, page_size))))
}

pub async fn follow(
    Path(username): Path<String>,
    users: UserRepository,
    follows: FollowRepository,
    claim: ApiClaim,
) -> ApiResult<impl IntoResponse> {
    let viewer_id = claim_user_id(&claim)?;
    let author = users.find_by_username(&username).await?;
    follows.follow(viewer_id, author.id).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn unfollow(
    Path(username): Path<String>,
    users: UserRepository,
    follows: FollowRepository,
    claim: ApiClaim,
) -> ApiResult<impl IntoResponse> {
    let viewer_id = claim_user_id(&claim)?;
    let author = users.find_by_username(&username).await?;
    follows.unfollow(viewer_id, author.id).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub fn router() -> axum::Router<AppState> {
    axum::Router::new()
        .route("/{username}", get(profile))
        .route("/{username}/posts", get(author_posts))
        .route("/{username}/follow", put(follow).delete(unfollow))
}
