/// Error handling for the API server
///
/// Handlers return `ApiResult<T>` and propagate any error with `?`. The
/// underlying error is kept intact inside [`ApiError`]; the response is decided
/// once, by [`tasktrail_shared::error::classify`], when the error is turned
/// into a response.
///
/// # Example
///
/// ```
/// use anyhow::Context;
/// use axum::Json;
/// use tasktrail_api::error::ApiResult;
/// use tasktrail_shared::{models::record::Record, repository::RecordRepository};
///
/// async fn list(repo: &dyn RecordRepository, owner_id: i64) -> ApiResult<Json<Vec<Record>>> {
///     let records = repo
///         .find_all_by_owner(owner_id)
///         .await
///         .context("listing records")?;
///     Ok(Json(records))
/// }
/// ```

use axum::response::{IntoResponse, Response};
use tasktrail_shared::error::classify;

/// API result type alias
pub type ApiResult<T> = Result<T, ApiError>;

/// Any error raised while handling a request
#[derive(Debug)]
pub struct ApiError(anyhow::Error);

impl<E> From<E> for ApiError
where
    E: Into<anyhow::Error>,
{
    fn from(err: E) -> Self {
        Self(err.into())
    }
}

impl std::fmt::Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:#}", self.0)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let classification = classify(&*self.0);
        classification.log();
        classification.into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Context;
    use axum::{body::to_bytes, http::StatusCode};
    use tasktrail_shared::{auth::password::PasswordError, repository::RepoError};

    async fn body_json(response: Response) -> serde_json::Value {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_context_does_not_hide_kind() {
        let result: Result<(), RepoError> = Err(RepoError::UniqueViolation { constraint: None });
        let err: ApiError = result.context("creating user").unwrap_err().into();

        let response = err.into_response();
        assert_eq!(response.status(), StatusCode::CONFLICT);
        assert_eq!(body_json(response).await["error"], "conflict");
    }

    #[tokio::test]
    async fn test_login_failures_share_a_body() {
        let not_found = ApiError::from(RepoError::UserNotFound).into_response();
        let mismatch = ApiError::from(PasswordError::Mismatch).into_response();

        assert_eq!(not_found.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(mismatch.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(body_json(not_found).await, body_json(mismatch).await);
    }

    #[tokio::test]
    async fn test_unclassified_error_is_internal() {
        let response = ApiError::from(anyhow::anyhow!("disk on fire")).into_response();

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let body = body_json(response).await;
        assert_eq!(body["error"], "internal_error");
        assert!(!body.to_string().contains("disk on fire"));
    }

    #[test]
    fn test_display_includes_chain() {
        let result: Result<(), RepoError> = Err(RepoError::UserNotFound);
        let err: ApiError = result.context("logging in").unwrap_err().into();
        assert_eq!(err.to_string(), "logging in: user not found");
    }
}
