use axum::{extract::State, routing::get, Json, Router};
use serde::Serialize;

use crate::{
    auth::CurrentUser,
    error::AppError,
    models::user::{Profile, UserView},
    services::profiles::ProfileUpdate,
    state::AppState,
};

pub fn router() -> Router<AppState> {
    Router::new().route("/profile/", get(show_profile).patch(update_profile))
}

#[derive(Serialize)]
struct ProfileResponse {
    user: UserView,
    #[serde(flatten)]
    profile: Profile,
}

async fn show_profile(
    State(state): State<AppState>,
    current: CurrentUser,
) -> Result<Json<ProfileResponse>, AppError> {
    let user = current.require_user()?;
    let profile = state.profiles.profile(user.id).await?.unwrap_or_default();
    Ok(Json(ProfileResponse {
        user: state.profiles.user_view(user.id).await?,
        profile,
    }))
}

async fn update_profile(
    State(state): State<AppState>,
    current: CurrentUser,
    Json(update): Json<ProfileUpdate>,
) -> Result<Json<ProfileResponse>, AppError> {
    let user = current.require_user()?;
    let profile = state.profiles.update_profile(user.id, update).await?;
    Ok(Json(ProfileResponse {
        user: state.profiles.user_view(user.id).await?,
        profile,
    }))
}
