use std::convert::Infallible;

use crate::{error::ApiError, state::AppState};
use axum::{
    extract::{FromRequestParts, OptionalFromRequestParts, State},
    response::IntoResponse,
    RequestPartsExt,
};
use axum_extra::TypedHeader;
use cookie::{Cookie, Expiration, SameSite};
use headers::{authorization::Bearer, Authorization};
use http::{request::Parts, StatusCode};
use quill_dal::user::User;
use quill_types::claim::ApiClaim;
use time::OffsetDateTime;
use tower_cookies::Cookies;
use tower_sessions::Session;
use tracing::{debug, error};

use super::{SESSION_USER_KEY, TOKEN_COOKIE_NAME};

impl FromRequestParts<AppState> for ApiClaim {
    // Callers without a valid identity are sent to the login view.
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let mut header_token = parts
            .extract::<TypedHeader<Authorization<Bearer>>>()
            .await
            .ok()
            .map(|h| h.0.token().to_string());

        if header_token.is_none() {
            let cookies = parts.extract::<Cookies>().await.map_err(|e| {
                error!("Cannot get cookies: {}", e.1);
                ApiError::AuthenticationRequired
            })?;
            header_token = cookies.get(TOKEN_COOKIE_NAME).map(|t| t.value().to_string());
        }

        match header_token {
            Some(token) => {
                let claim = state.tokens().validate::<ApiClaim>(&token).map_err(|e| {
                    error!("Failed to validate token: {}", e);
                    ApiError::AuthenticationRequired
                })?;
                Ok(claim)
            }
            None => {
                debug!("No token found");
                Err(ApiError::AuthenticationRequired)
            }
        }
    }
}

impl OptionalFromRequestParts<AppState> for ApiClaim {
    type Rejection = Infallible;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Option<Self>, Self::Rejection> {
        Ok(
            <ApiClaim as FromRequestParts<AppState>>::from_request_parts(parts, state)
                .await
                .ok(),
        )
    }
}

pub async fn token(
    session: Session,
    cookies: Cookies,
    State(state): State<AppState>,
) -> Result<impl IntoResponse, StatusCode> {
    let user = session.get::<User>(SESSION_USER_KEY).await.map_err(|e| {
        error!("Failed to get user from session: {e}");
        StatusCode::INTERNAL_SERVER_ERROR
    })?;

    if let Some(known_user) = user {
        let signed_token = state
            .tokens()
            .issue_for_user(
                known_user.id,
                &known_user.username,
                known_user.roles.iter().flatten(),
            )
            .map_err(|e| {
                error!("Failed to issue token: {e}");
                StatusCode::INTERNAL_SERVER_ERROR
            })?;

        let cookie = Cookie::build((TOKEN_COOKIE_NAME, signed_token.clone()))
            .http_only(true)
            .secure(false)
            .path("/")
            .same_site(SameSite::Lax)
            .expires(Expiration::DateTime(
                OffsetDateTime::now_utc() + state.tokens().default_validity(),
            ));

        cookies.add(cookie.into());

        Ok(signed_token)
    } else {
        Err(StatusCode::UNAUTHORIZED)
    }
}
