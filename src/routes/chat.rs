use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};
use serde::Deserialize;

use crate::{
    auth::CurrentUser, error::AppError, models::chat::ChatMessageView, state::AppState,
};

pub fn router() -> Router<AppState> {
    Router::new().route("/trips/:id/chat/", get(history).post(post_message))
}

async fn history(
    State(state): State<AppState>,
    current: CurrentUser,
    Path(trip_id): Path<i64>,
) -> Result<Json<Vec<ChatMessageView>>, AppError> {
    let user = current.require_user()?;
    let messages = state.chat.history(trip_id, user.id).await?;
    Ok(Json(state.chat.views(messages).await?))
}

#[derive(Deserialize)]
struct NewMessage {
    message: String,
}

async fn post_message(
    State(state): State<AppState>,
    current: CurrentUser,
    Path(trip_id): Path<i64>,
    Json(body): Json<NewMessage>,
) -> Result<(StatusCode, Json<ChatMessageView>), AppError> {
    let user = current.require_user()?;
    let message = state.chat.post(trip_id, user.id, &body.message).await?;
    let mut views = state.chat.views(vec![message]).await?;
    let view = views.pop().ok_or(AppError::NotFound)?;
    Ok((StatusCode::CREATED, Json(view)))
}
