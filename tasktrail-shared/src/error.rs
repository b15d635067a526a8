/// Error classification
///
/// Lower layers return their own typed errors untranslated. [`classify`] is
/// the single place that decides what a caller sees: it walks the error's
/// `source()` chain, downcasting each link, and picks the first matching
/// category in this order:
///
/// 1. `ValidationFailed`: `validator::ValidationErrors`, JSON body rejections
/// 2. `Conflict`: unique constraint violations
/// 3. `Unauthorized`: password mismatch, unknown login email, token and
///    bearer-header failures
/// 4. `Forbidden`: role check failures
/// 5. `InternalError`: everything else
///
/// Unknown email and wrong password produce an identical public result. The
/// full chain is kept in [`Classification::log_message`] for the server log
/// only.
///
/// # Example
///
/// ```
/// use tasktrail_shared::auth::password::PasswordError;
/// use tasktrail_shared::error::{classify, ErrorCategory};
///
/// let classification = classify(&PasswordError::Mismatch);
/// assert_eq!(classification.category, ErrorCategory::Unauthorized);
/// assert_eq!(classification.message, "Invalid email or password");
/// ```

use std::error::Error as StdError;

use axum::{
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use validator::ValidationErrors;

use crate::auth::{jwt::TokenError, middleware::GateRejection, password::PasswordError};
use crate::repository::RepoError;

/// Public message for any login failure
pub const INVALID_CREDENTIALS: &str = "Invalid email or password";

const INTERNAL_MESSAGE: &str = "An internal error occurred";

/// External error categories
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCategory {
    /// Malformed or missing required input (400)
    ValidationFailed,

    /// Unique constraint violation (409)
    Conflict,

    /// Bad credentials or invalid token (401)
    Unauthorized,

    /// Authenticated but not permitted (403)
    Forbidden,

    /// Anything unclassified (500)
    InternalError,
}

impl ErrorCategory {
    /// HTTP status for the category
    pub fn status_code(&self) -> StatusCode {
        match self {
            ErrorCategory::ValidationFailed => StatusCode::BAD_REQUEST,
            ErrorCategory::Conflict => StatusCode::CONFLICT,
            ErrorCategory::Unauthorized => StatusCode::UNAUTHORIZED,
            ErrorCategory::Forbidden => StatusCode::FORBIDDEN,
            ErrorCategory::InternalError => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Stable machine-readable code
    pub fn code(&self) -> &'static str {
        match self {
            ErrorCategory::ValidationFailed => "validation_failed",
            ErrorCategory::Conflict => "conflict",
            ErrorCategory::Unauthorized => "unauthorized",
            ErrorCategory::Forbidden => "forbidden",
            ErrorCategory::InternalError => "internal_error",
        }
    }
}

/// One violated input constraint
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldViolation {
    /// Field that failed validation
    pub field: String,

    /// Constraint description
    pub message: String,
}

/// Error response format
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    /// Category code (e.g., "unauthorized")
    pub error: String,

    /// Human-readable message, safe to show
    pub message: String,

    /// Machine-readable reason for auth failures
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,

    /// Violated constraints for validation failures
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<Vec<FieldViolation>>,
}

/// Outcome of [`classify`]
#[derive(Debug, Clone)]
pub struct Classification {
    /// Category deciding the status code
    pub category: ErrorCategory,

    /// Message returned to the caller
    pub message: String,

    /// Machine-readable reason for auth failures (e.g., "invalid_token")
    pub reason: Option<&'static str>,

    /// Field violations, set only for validation failures
    pub details: Option<Vec<FieldViolation>>,

    /// Full error chain, for server-side logs only
    pub log_message: String,
}

impl Classification {
    fn new(category: ErrorCategory, message: impl Into<String>, log_message: String) -> Self {
        Self {
            category,
            message: message.into(),
            reason: None,
            details: None,
            log_message,
        }
    }

    fn with_reason(mut self, reason: &'static str) -> Self {
        self.reason = Some(reason);
        self
    }

    /// Emits the server-side log line for this failure
    pub fn log(&self) {
        match self.category {
            ErrorCategory::InternalError => {
                tracing::error!(error = %self.log_message, "Request failed with internal error");
            }
            ErrorCategory::Unauthorized | ErrorCategory::Forbidden => {
                tracing::warn!(
                    category = self.category.code(),
                    reason = self.reason.unwrap_or("-"),
                    error = %self.log_message,
                    "Request rejected"
                );
            }
            ErrorCategory::ValidationFailed | ErrorCategory::Conflict => {
                tracing::debug!(
                    category = self.category.code(),
                    error = %self.log_message,
                    "Request rejected"
                );
            }
        }
    }

    /// Body sent to the caller
    pub fn to_body(&self) -> ErrorResponse {
        ErrorResponse {
            error: self.category.code().to_string(),
            message: self.message.clone(),
            reason: self.reason.map(str::to_string),
            details: self.details.clone(),
        }
    }
}

impl IntoResponse for Classification {
    fn into_response(self) -> Response {
        (self.category.status_code(), Json(self.to_body())).into_response()
    }
}

/// Maps a propagated error to its external category
pub fn classify(err: &(dyn StdError + 'static)) -> Classification {
    let log_message = chain_message(err);

    classify_validation(err, &log_message)
        .or_else(|| classify_conflict(err, &log_message))
        .or_else(|| classify_unauthenticated(err, &log_message))
        .or_else(|| classify_forbidden(err, &log_message))
        .unwrap_or_else(|| {
            Classification::new(ErrorCategory::InternalError, INTERNAL_MESSAGE, log_message)
        })
}

fn chain<'a>(
    err: &'a (dyn StdError + 'static),
) -> impl Iterator<Item = &'a (dyn StdError + 'static)> {
    std::iter::successors(Some(err), |e: &&'a (dyn StdError + 'static)| (*e).source())
}

fn chain_message(err: &(dyn StdError + 'static)) -> String {
    chain(err)
        .map(|e| e.to_string())
        .collect::<Vec<_>>()
        .join(": ")
}

fn classify_validation(err: &(dyn StdError + 'static), log: &str) -> Option<Classification> {
    chain(err).find_map(|e| {
        if let Some(errors) = e.downcast_ref::<ValidationErrors>() {
            let mut details: Vec<FieldViolation> = errors
                .field_errors()
                .iter()
                .flat_map(|(field, errors)| {
                    errors.iter().map(move |error| FieldViolation {
                        field: field.to_string(),
                        message: error
                            .message
                            .as_ref()
                            .map(|m| m.to_string())
                            .unwrap_or_else(|| format!("failed '{}' check", error.code)),
                    })
                })
                .collect();
            details.sort_by(|a, b| a.field.cmp(&b.field).then(a.message.cmp(&b.message)));

            let mut classification =
                Classification::new(ErrorCategory::ValidationFailed, "Validation failed", log.to_string());
            classification.details = Some(details);
            return Some(classification);
        }

        e.downcast_ref::<JsonRejection>().map(|rejection| {
            Classification::new(
                ErrorCategory::ValidationFailed,
                rejection.body_text(),
                log.to_string(),
            )
        })
    })
}

fn classify_conflict(err: &(dyn StdError + 'static), log: &str) -> Option<Classification> {
    chain(err).find_map(|e| {
        let is_unique = match e.downcast_ref::<RepoError>() {
            Some(RepoError::UniqueViolation { .. }) => true,
            _ => matches!(
                e.downcast_ref::<sqlx::Error>(),
                Some(sqlx::Error::Database(db_err)) if db_err.is_unique_violation()
            ),
        };

        is_unique.then(|| {
            Classification::new(
                ErrorCategory::Conflict,
                "This resource already exists",
                log.to_string(),
            )
        })
    })
}

fn classify_unauthenticated(err: &(dyn StdError + 'static), log: &str) -> Option<Classification> {
    chain(err).find_map(|e| {
        let invalid_credentials = || {
            Classification::new(ErrorCategory::Unauthorized, INVALID_CREDENTIALS, log.to_string())
                .with_reason("invalid_credentials")
        };

        if let Some(PasswordError::Mismatch) = e.downcast_ref::<PasswordError>() {
            return Some(invalid_credentials());
        }
        if let Some(RepoError::UserNotFound) = e.downcast_ref::<RepoError>() {
            return Some(invalid_credentials());
        }
        if let Some(rejection) = e.downcast_ref::<GateRejection>() {
            if rejection.is_unauthenticated() {
                return Some(
                    Classification::new(
                        ErrorCategory::Unauthorized,
                        "Authentication required",
                        log.to_string(),
                    )
                    .with_reason(rejection.reason()),
                );
            }
            return None;
        }
        match e.downcast_ref::<TokenError>() {
            Some(token_err) if token_err.is_rejection() => Some(
                Classification::new(
                    ErrorCategory::Unauthorized,
                    "Authentication required",
                    log.to_string(),
                )
                .with_reason("invalid_token"),
            ),
            _ => None,
        }
    })
}

fn classify_forbidden(err: &(dyn StdError + 'static), log: &str) -> Option<Classification> {
    chain(err).find_map(|e| match e.downcast_ref::<GateRejection>() {
        Some(rejection) if !rejection.is_unauthenticated() => Some(
            Classification::new(
                ErrorCategory::Forbidden,
                "Insufficient permissions",
                log.to_string(),
            )
            .with_reason(rejection.reason()),
        ),
        _ => None,
    })
}
