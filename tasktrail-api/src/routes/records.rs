/// Record endpoints
///
/// Mounted under `/api/v1` behind the authenticate gate. The owner is always
/// the authenticated caller; an `owner_id` in a request body is ignored.
///
/// - `GET /api/v1/records` - The caller's records, oldest first
/// - `POST /api/v1/records` - Create a record (writes an audit entry)

use crate::{app::AppState, error::ApiResult, extract::ValidatedJson};
use axum::{extract::State, http::StatusCode, Extension, Json};
use serde::Deserialize;
use tasktrail_shared::{auth::middleware::AuthContext, models::record::Record};
use validator::Validate;

/// Create record request
#[derive(Debug, Deserialize, Validate)]
pub struct CreateRecordRequest {
    #[validate(length(min = 1, max = 200, message = "Name must be 1-200 characters"))]
    pub name: String,
}

pub async fn list_records(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
) -> ApiResult<Json<Vec<Record>>> {
    let records = state.repo.find_all_by_owner(auth.user_id).await?;
    Ok(Json(records))
}

/// # Response
///
/// `201 Created` with the new record:
///
/// ```json
/// { "id": 7, "name": "write report", "owner_id": 1 }
/// ```
pub async fn create_record(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    ValidatedJson(req): ValidatedJson<CreateRecordRequest>,
) -> ApiResult<(StatusCode, Json<Record>)> {
    let record = state.repo.create_with_audit(auth.user_id, &req.name).await?;

    tracing::info!(record_id = record.id, owner_id = auth.user_id, "Record created");
    Ok((StatusCode::CREATED, Json(record)))
}
