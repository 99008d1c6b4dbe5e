use axum::{
    body::Body,
    extract::{OriginalUri, Path, Query, State},
    response::{IntoResponse, Redirect, Response},
    routing::{get, put},
    Json,
};
use axum_valid::Garde;
use bytes::Bytes;
use garde::Validate;
use http::{header, HeaderMap, StatusCode};
use quill_dal::{
    comment::{CommentRepository, CreateComment},
    post::{CreatePost, PostRepository, UpdatePost},
    rating::{RatingRepository, RATING_MAX, RATING_MIN},
};
use quill_types::claim::ApiClaim;
use serde::{Deserialize, Serialize};
use tokio_util::io::ReaderStream;
use uuid::Uuid;

use crate::{
    auth::claim_user_id,
    error::{authorize_owner, ApiError, ApiResult, AuthorizationOutcome},
    rest_api::{Page, Paging},
    state::AppState,
};

/// Global feed. The only cached route: responses are keyed by the full
/// request URI and served stale for the cache TTL.
pub async fn global_feed(
    State(state): State<AppState>,
    repository: PostRepository,
    OriginalUri(uri): OriginalUri,
    Garde(Query(paging)): Garde<Query<Paging>>,
) -> ApiResult<Response> {
    let key = uri.to_string();
    if let Some(cached) = state.page_cache().get(&key).await {
        return Ok(json_body(cached));
    }

    let default_page_size = state.config().default_page_size;
    let page_size = paging.page_size(default_page_size);
    let params = paging.into_listing_params(default_page_size)?;
    let batch = repository.list(params).await?;
    let page = Page::from_batch(batch, page_size);

    let body = serde_json::to_string(&page).map_err(|e| ApiError::Internal(e.into()))?;
    state.page_cache().put(key, body.clone()).await;
    Ok(json_body(body))
}

/// Subscription feed of the viewer. Anonymous viewers get an empty page, not
/// an error.
pub async fn following_feed(
    State(state): State<AppState>,
    repository: PostRepository,
    claim: Option<ApiClaim>,
    Garde(Query(paging)): Garde<Query<Paging>>,
) -> ApiResult<impl IntoResponse> {
    let default_page_size = state.config().default_page_size;
    let page_size = paging.page_size(default_page_size);
    let params = paging.into_listing_params(default_page_size)?;

    let page = match claim.as_ref().and_then(|c| c.user_id()) {
        Some(user_id) => {
            let batch = repository.list_followed(params, user_id).await?;
            Page::from_batch(batch, page_size)
        }
        None => Page::empty(params.offset, page_size),
    };

    Ok((StatusCode::OK, Json(page)))
}

pub async fn create(
    State(state): State<AppState>,
    repository: PostRepository,
    claim: ApiClaim,
    Garde(Json(payload)): Garde<Json<CreatePost>>,
) -> ApiResult<impl IntoResponse> {
    let author_id = claim_user_id(&claim)?;
    let record = repository.create(author_id, payload).await?;
    state.page_cache().purge().await;

    Ok((StatusCode::CREATED, Json(record)))
}

pub async fn get_post(
    Path(id): Path<i64>,
    repository: PostRepository,
) -> ApiResult<impl IntoResponse> {
    let record = repository.get(id).await?;
    Ok((StatusCode::OK, Json(record)))
}

pub async fn update(
    Path(id): Path<i64>,
    State(state): State<AppState>,
    repository: PostRepository,
    claim: ApiClaim,
    Garde(Json(payload)): Garde<Json<UpdatePost>>,
) -> ApiResult<Response> {
    let post = repository.get(id).await?;
    match authorize_owner(&claim, post.author.id, post_view(id)) {
        AuthorizationOutcome::RedirectTo(view) => Ok(Redirect::to(&view).into_response()),
        AuthorizationOutcome::Allowed => {
            let record = repository.update(id, payload).await?;
            state.page_cache().purge().await;
            Ok((StatusCode::OK, Json(record)).into_response())
        }
    }
}

pub async fn delete_post(
    Path(id): Path<i64>,
    State(state): State<AppState>,
    repository: PostRepository,
    claim: ApiClaim,
) -> ApiResult<Response> {
    let post = repository.get(id).await?;
    match authorize_owner(&claim, post.author.id, post_view(id)) {
        AuthorizationOutcome::RedirectTo(view) => Ok(Redirect::to(&view).into_response()),
        AuthorizationOutcome::Allowed => {
            repository.delete(id).await?;
            state.page_cache().purge().await;
            Ok(StatusCode::NO_CONTENT.into_response())
        }
    }
}

pub async fn list_comments(
    Path(id): Path<i64>,
    posts: PostRepository,
    comments: CommentRepository,
) -> ApiResult<impl IntoResponse> {
    // 404 for a missing post rather than an empty list
    posts.get(id).await?;
    let records = comments.list_for_post(id).await?;
    Ok((StatusCode::OK, Json(records)))
}

pub async fn add_comment(
    Path(id): Path<i64>,
    comments: CommentRepository,
    claim: ApiClaim,
    Garde(Json(payload)): Garde<Json<CreateComment>>,
) -> ApiResult<impl IntoResponse> {
    let author_id = claim_user_id(&claim)?;
    let record = comments.create(id, author_id, payload).await?;
    Ok((StatusCode::CREATED, Json(record)))
}

#[derive(Debug, Deserialize, Validate)]
pub struct RateRequest {
    #[garde(range(min = RATING_MIN, max = RATING_MAX))]
    pub rating: i64,
}

#[derive(Debug, Serialize)]
pub struct RatingResponse {
    pub avg_rating: Option<f64>,
}

pub async fn rate(
    Path(id): Path<i64>,
    ratings: RatingRepository,
    claim: ApiClaim,
    Garde(Json(payload)): Garde<Json<RateRequest>>,
) -> ApiResult<impl IntoResponse> {
    let user_id = claim_user_id(&claim)?;
    let avg_rating = ratings.rate(id, user_id, payload.rating).await?;
    Ok((StatusCode::OK, Json(RatingResponse { avg_rating })))
}

pub async fn put_image(
    Path(id): Path<i64>,
    State(state): State<AppState>,
    repository: PostRepository,
    claim: ApiClaim,
    headers: HeaderMap,
    body: Bytes,
) -> ApiResult<Response> {
    let post = repository.get(id).await?;
    match authorize_owner(&claim, post.author.id, post_view(id)) {
        AuthorizationOutcome::RedirectTo(view) => Ok(Redirect::to(&view).into_response()),
        AuthorizationOutcome::Allowed => {
            let content_type = headers
                .get(header::CONTENT_TYPE)
                .and_then(|v| v.to_str().ok())
                .unwrap_or_default();
            let ext = crate::media::ext_for_mime(content_type).ok_or_else(|| {
                ApiError::Validation(format!("unsupported image type: {content_type}"))
            })?;
            let file_name = format!("{}.{}", Uuid::new_v4(), ext);
            let image = state
                .media()
                .save("posts", &file_name, body)
                .await
                .map_err(|e| ApiError::Internal(e.into()))?;
            repository.set_image(id, &image).await?;
            state.page_cache().purge().await;

            Ok((StatusCode::OK, Json(ImageResponse { image })).into_response())
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ImageResponse {
    pub image: String,
}

pub async fn get_image(
    Path(id): Path<i64>,
    State(state): State<AppState>,
    repository: PostRepository,
) -> ApiResult<Response> {
    let post = repository.get(id).await?;
    let image = post
        .image
        .ok_or_else(|| ApiError::NotFound("Image".to_string()))?;
    let file = state.media().open(&image).await.map_err(|e| {
        if e.kind() == std::io::ErrorKind::NotFound {
            ApiError::NotFound("Image".to_string())
        } else {
            ApiError::Internal(e.into())
        }
    })?;

    let mime = new_mime_guess::from_path(&image).first_or_octet_stream();
    let stream = ReaderStream::new(file);
    let response = Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, mime.as_ref())
        .body(Body::from_stream(stream))
        .map_err(|e| ApiError::Internal(e.into()))?;
    Ok(response)
}

fn post_view(id: i64) -> String {
    format!("/api/post/{id}")
}

fn json_body(body: String) -> Response {
    ([(header::CONTENT_TYPE, "application/json")], body).into_response()
}

pub fn router() -> axum::Router<AppState> {
    axum::Router::new()
        .route("/", get(global_feed).post(create))
        .route("/feed", get(following_feed))
        .route(
            "/{id}",
            get(get_post).put(update).delete(delete_post),
        )
        .route("/{id}/comment", get(list_comments).post(add_comment))
        .route("/{id}/rate", put(rate))
        .route("/{id}/image", put(put_image).get(get_image))
}
