use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};

use crate::{
    auth::CurrentUser,
    error::AppError,
    models::{
        join_request::JoinRequestView,
        trip::{NewTrip, TripView},
    },
    state::AppState,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/trips/", get(list_trips).post(create_trip))
        .route("/trips/:id/", get(trip_detail).delete(delete_trip))
        .route("/trips/:id/join/", post(join_trip))
        .route("/trips/:id/join-requests/", get(trip_join_requests))
}

#[derive(Deserialize)]
struct TripFilter {
    destination: Option<i64>,
}

async fn list_trips(
    State(state): State<AppState>,
    Query(filter): Query<TripFilter>,
) -> Result<Json<Vec<TripView>>, AppError> {
    let trips = state.trips.list(filter.destination).await?;
    let mut views = Vec::with_capacity(trips.len());
    for trip in trips {
        views.push(state.trips.view(trip).await?);
    }
    Ok(Json(views))
}

async fn create_trip(
    State(state): State<AppState>,
    current: CurrentUser,
    Json(input): Json<NewTrip>,
) -> Result<(StatusCode, Json<TripView>), AppError> {
    let user = current.require_user()?;
    let trip = state.trips.create(user.id, input).await?;
    Ok((StatusCode::CREATED, Json(state.trips.view(trip).await?)))
}

async fn trip_detail(
    State(state): State<AppState>,
    Path(trip_id): Path<i64>,
) -> Result<Json<TripView>, AppError> {
    let trip = state.trips.get(trip_id).await?;
    Ok(Json(state.trips.view(trip).await?))
}

async fn delete_trip(
    State(state): State<AppState>,
    current: CurrentUser,
    Path(trip_id): Path<i64>,
) -> Result<StatusCode, AppError> {
    let user = current.require_user()?;
    state.trips.delete(trip_id, user.id).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[derive(Serialize)]
struct JoinResponse {
    message: &'static str,
    join_request: JoinRequestView,
}

async fn join_trip(
    State(state): State<AppState>,
    current: CurrentUser,
    Path(trip_id): Path<i64>,
) -> Result<(StatusCode, Json<JoinResponse>), AppError> {
    let user = current.require_user()?;
    let request = state.membership.request_to_join(trip_id, user.id).await?;
    let join_request = state.membership.view(request).await?;
    Ok((
        StatusCode::CREATED,
        Json(JoinResponse {
            message: "Join request sent successfully",
            join_request,
        }),
    ))
}

async fn trip_join_requests(
    State(state): State<AppState>,
    current: CurrentUser,
    Path(trip_id): Path<i64>,
) -> Result<Json<Vec<JoinRequestView>>, AppError> {
    let user = current.require_user()?;
    let requests = state.membership.list_for_trip(trip_id, user.id).await?;
    Ok(Json(state.membership.views(requests).await?))
}
