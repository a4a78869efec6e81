use axum::{
    extract::{Path, Query, State},
    routing::{get, patch},
    Json, Router,
};
use serde::Deserialize;

use crate::{
    auth::CurrentUser,
    error::AppError,
    models::join_request::{Decision, JoinRequestStatus, JoinRequestView},
    state::AppState,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/join-requests/", get(inbox))
        .route("/join-requests/:id/", patch(decide))
}

#[derive(Deserialize)]
struct InboxFilter {
    status: Option<String>,
}

async fn inbox(
    State(state): State<AppState>,
    current: CurrentUser,
    Query(filter): Query<InboxFilter>,
) -> Result<Json<Vec<JoinRequestView>>, AppError> {
    let user = current.require_user()?;
    let status = filter
        .status
        .as_deref()
        .map(str::parse::<JoinRequestStatus>)
        .transpose()?;
    let requests = state.membership.list_for_host(user.id, status).await?;
    Ok(Json(state.membership.views(requests).await?))
}

#[derive(Deserialize)]
struct DecisionBody {
    status: String,
}

async fn decide(
    State(state): State<AppState>,
    current: CurrentUser,
    Path(request_id): Path<i64>,
    Json(body): Json<DecisionBody>,
) -> Result<Json<JoinRequestView>, AppError> {
    let user = current.require_user()?;
    let decision = Decision::from_status(&body.status)?;
    let request = state.membership.decide(request_id, user.id, decision).await?;
    Ok(Json(state.membership.view(request).await?))
}
