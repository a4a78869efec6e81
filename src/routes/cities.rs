use axum::{extract::State, routing::get, Json, Router};

use crate::{error::AppError, models::trip::City, state::AppState};

pub fn router() -> Router<AppState> {
    Router::new().route("/cities/", get(list_cities))
}

async fn list_cities(State(state): State<AppState>) -> Result<Json<Vec<City>>, AppError> {
    Ok(Json(state.trips.list_cities().await?))
}
