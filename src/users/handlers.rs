use axum::{extract::State, routing::get, Json, Router};
use tracing::instrument;

use crate::{
    auth::{dto::ProfileResponse, jwt::AuthUser, services},
    error::AppError,
    state::AppState,
};

pub fn user_routes() -> Router<AppState> {
    Router::new().route("/users/me", get(me))
}

#[instrument(skip(state))]
pub async fn me(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
) -> Result<Json<ProfileResponse>, AppError> {
    let user = services::profile(&state, user_id).await?;
    Ok(Json(ProfileResponse::from(user)))
}
