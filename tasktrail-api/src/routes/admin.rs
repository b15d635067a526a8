/// Admin endpoints
///
/// Mounted under `/api/v1/admin` behind a gate requiring the `admin` role.

use crate::{app::AppState, error::ApiResult, routes::auth::UserResponse};
use axum::{extract::State, Json};

/// Lists every account (`GET /api/v1/admin/users`)
pub async fn list_users(State(state): State<AppState>) -> ApiResult<Json<Vec<UserResponse>>> {
    let users = state.repo.list_users().await?;
    Ok(Json(users.into_iter().map(UserResponse::from).collect()))
}
