/// Authentication endpoints
///
/// - `POST /signup` - Create an account
/// - `POST /login` - Exchange credentials for a bearer token
///
/// Password hashing and verification are CPU-heavy and run on the blocking
/// thread pool.

use crate::{app::AppState, error::ApiResult, extract::ValidatedJson};
use anyhow::Context;
use axum::{extract::State, http::StatusCode, Json};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tasktrail_shared::{
    auth::password::MIN_PASSWORD_LENGTH,
    models::user::{Role, User},
    repository::RepoError,
};
use tracing::info;
use validator::Validate;

// `validator`'s length bounds are `u64`
const MIN_PASSWORD_LENGTH_U64: u64 = MIN_PASSWORD_LENGTH as u64;

/// Signup request
///
/// Unknown fields (such as `role`) are ignored; new accounts always get the
/// default role.
#[derive(Deserialize, Validate)]
pub struct SignupRequest {
    #[validate(email(message = "Invalid email format"))]
    pub email: String,

    #[validate(length(
        min = MIN_PASSWORD_LENGTH_U64,
        message = "Password must be at least 8 characters"
    ))]
    pub password: String,
}

/// Login request
#[derive(Deserialize, Validate)]
pub struct LoginRequest {
    #[validate(email(message = "Invalid email format"))]
    pub email: String,

    #[validate(length(min = 1, message = "Password is required"))]
    pub password: String,
}

/// Public view of a user
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserResponse {
    pub id: i64,
    pub email: String,
    pub role: Role,
    pub created_at: DateTime<Utc>,
}

impl From<User> for UserResponse {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            email: user.email,
            role: user.role,
            created_at: user.created_at,
        }
    }
}

/// Login response
#[derive(Debug, Serialize, Deserialize)]
pub struct LoginResponse {
    /// Bearer token, valid for 24 hours
    pub token: String,
}

/// Creates a user account
///
/// # Endpoint
///
/// ```text
/// POST /signup
/// Content-Type: application/json
///
/// {
///   "email": "user@example.com",
///   "password": "correct horse"
/// }
/// ```
///
/// # Response
///
/// `201 Created`
///
/// ```json
/// {
///   "id": 1,
///   "email": "user@example.com",
///   "role": "user",
///   "created_at": "2025-01-01T00:00:00Z"
/// }
/// ```
///
/// # Errors
///
/// - `400 Bad Request`: Invalid email or short password
/// - `409 Conflict`: Email already registered
pub async fn signup(
    State(state): State<AppState>,
    ValidatedJson(req): ValidatedJson<SignupRequest>,
) -> ApiResult<(StatusCode, Json<UserResponse>)> {
    let credentials = state.credentials.clone();
    let password = req.password;
    let password_hash = tokio::task::spawn_blocking(move || credentials.hash(&password))
        .await
        .context("password hashing task failed")??;

    let user = state.repo.create_user(&req.email, &password_hash).await?;

    info!(user_id = user.id, "User signed up");
    Ok((StatusCode::CREATED, Json(user.into())))
}

/// Issues a bearer token for valid credentials
///
/// # Endpoint
///
/// ```text
/// POST /login
/// Content-Type: application/json
///
/// {
///   "email": "user@example.com",
///   "password": "correct horse"
/// }
/// ```
///
/// # Response
///
/// ```json
/// { "token": "eyJ..." }
/// ```
///
/// # Errors
///
/// - `400 Bad Request`: Malformed request
/// - `401 Unauthorized`: Unknown email or wrong password (indistinguishable)
pub async fn login(
    State(state): State<AppState>,
    ValidatedJson(req): ValidatedJson<LoginRequest>,
) -> ApiResult<Json<LoginResponse>> {
    let credentials = state.credentials.clone();
    let password = req.password;

    let user = match state.repo.find_user_by_email(&req.email).await {
        Ok(user) => user,
        Err(RepoError::UserNotFound) => {
            tokio::task::spawn_blocking(move || credentials.verify_dummy(&password))
                .await
                .context("password verification task failed")?;
            return Err(RepoError::UserNotFound.into());
        }
        Err(e) => return Err(e.into()),
    };

    let password_hash = user.password_hash.clone();
    tokio::task::spawn_blocking(move || credentials.verify(&password, &password_hash))
        .await
        .context("password verification task failed")??;

    let token = state.tokens.issue(user.id, user.role, Utc::now())?;

    info!(user_id = user.id, role = %user.role, "User logged in");
    Ok(Json(LoginResponse { token }))
}
