use async_trait::async_trait;
use axum::{
    extract::{FromRequestParts, Request, State},
    http::{header::AUTHORIZATION, request::Parts, HeaderMap},
    middleware::Next,
    response::Response,
};
use sha2::{Digest, Sha256};
use sqlx::FromRow;
use tracing::debug;

use crate::{error::AppError, state::AppState};

#[derive(Debug, Clone, FromRow)]
pub struct AuthenticatedUser {
    pub id: i64,
    pub username: String,
}

#[derive(Debug, Clone, Default)]
pub struct CurrentUser(pub Option<AuthenticatedUser>);

#[async_trait]
impl<S> FromRequestParts<S> for CurrentUser
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(Self(parts.extensions.get::<AuthenticatedUser>().cloned()))
    }
}

impl CurrentUser {
    pub fn require_user(&self) -> Result<&AuthenticatedUser, AppError> {
        self.0.as_ref().ok_or(AppError::Unauthorized)
    }
}

/// Tokens are stored as hex SHA-256 digests, never in the clear.
pub fn token_digest(token: &str) -> String {
    format!("{:x}", Sha256::digest(token.as_bytes()))
}

/// Accepts `Token <key>` (the frontend's scheme) and `Bearer <key>`.
fn presented_token(headers: &HeaderMap) -> Result<Option<&str>, AppError> {
    let Some(value) = headers.get(AUTHORIZATION) else {
        return Ok(None);
    };
    let value = value.to_str().map_err(|_| AppError::Unauthorized)?;
    let (scheme, token) = value.split_once(' ').ok_or(AppError::Unauthorized)?;
    if !(scheme.eq_ignore_ascii_case("token") || scheme.eq_ignore_ascii_case("bearer")) {
        return Err(AppError::Unauthorized);
    }
    let token = token.trim();
    if token.is_empty() {
        return Err(AppError::Unauthorized);
    }
    Ok(Some(token))
}

pub async fn resolve_token(
    state: &AppState,
    token: &str,
) -> Result<Option<AuthenticatedUser>, AppError> {
    let user = sqlx::query_as::<_, AuthenticatedUser>(
        r#"SELECT u.id, u.username FROM auth_tokens t JOIN users u ON u.id = t.user_id
           WHERE t.key_digest = ?1"#,
    )
    .bind(token_digest(token))
    .fetch_optional(&state.db)
    .await?;
    Ok(user)
}

/// Attaches the [`AuthenticatedUser`] for a valid token. Anonymous requests
/// pass through; a malformed or unknown token is rejected outright.
pub async fn authenticate(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    if let Some(token) = presented_token(request.headers())? {
        let user = resolve_token(&state, token)
            .await?
            .ok_or(AppError::Unauthorized)?;
        debug!(user_id = user.id, "token authenticated");
        request.extensions_mut().insert(user);
    }
    Ok(next.run(request).await)
}
