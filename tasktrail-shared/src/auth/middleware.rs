/// Request authorization gate for Axum
///
/// A [`Gate`] is an ordered list of [`Stage`]s run before a handler. The
/// first stage to fail short-circuits the request; the handler is never
/// invoked.
///
/// - [`Stage::Authenticate`]: requires `Authorization: Bearer <token>`,
///   validates the token and attaches an [`AuthContext`] to the request
///   extensions
/// - [`Stage::Authorize`]: requires an [`AuthContext`] whose role equals the
///   required role
///
/// Handlers read identity only from the [`AuthContext`]; owner fields in
/// request bodies are never trusted.
///
/// # Example
///
/// ```no_run
/// use std::sync::Arc;
/// use axum::{middleware, routing::get, Extension, Router};
/// use tasktrail_shared::auth::jwt::TokenService;
/// use tasktrail_shared::auth::middleware::{gate_middleware, AuthContext, Gate};
/// use tasktrail_shared::models::user::Role;
///
/// async fn whoami(Extension(auth): Extension<AuthContext>) -> String {
///     format!("user {} ({})", auth.user_id, auth.role)
/// }
///
/// let tokens = Arc::new(TokenService::new(b"your-secret-key-at-least-32-bytes"));
/// let admin_only = Gate::new(tokens).authenticate().authorize(Role::Admin);
///
/// let app: Router = Router::new()
///     .route("/whoami", get(whoami))
///     .route_layer(middleware::from_fn_with_state(admin_only, gate_middleware));
/// ```

use std::sync::Arc;

use axum::{
    extract::{Request, State},
    http::{header, HeaderMap},
    middleware::Next,
    response::{IntoResponse, Response},
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::jwt::{Claims, TokenError, TokenService};
use crate::error::classify;
use crate::models::user::Role;

/// Validated identity attached to the request by [`Stage::Authenticate`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthContext {
    /// Authenticated user ID (token subject)
    pub user_id: i64,

    /// Role carried by the token
    pub role: Role,

    /// Token expiry (Unix timestamp)
    pub expires_at: i64,
}

impl AuthContext {
    /// Creates auth context from validated claims
    pub fn from_claims(claims: &Claims) -> Result<Self, TokenError> {
        Ok(Self {
            user_id: claims.user_id()?,
            role: claims.role,
            expires_at: claims.exp,
        })
    }
}

/// Why the gate stopped a request
#[derive(Debug, thiserror::Error)]
pub enum GateRejection {
    /// No `Authorization` header
    #[error("Authorization header is missing")]
    MissingHeader,

    /// Header present but not exactly `Bearer <token>`
    #[error("Authorization header is malformed")]
    MalformedHeader,

    /// Token failed validation
    #[error("Invalid token")]
    InvalidToken(#[source] TokenError),

    /// Authorize ran without a preceding Authenticate
    #[error("No authenticated identity on request")]
    MissingClaims,

    /// Authenticated, but with the wrong role
    #[error("Role {actual} does not satisfy required role {required}")]
    InsufficientRole { required: Role, actual: Role },
}

impl GateRejection {
    /// True when the request lacks a valid identity (as opposed to lacking permission)
    pub fn is_unauthenticated(&self) -> bool {
        matches!(
            self,
            GateRejection::MissingHeader
                | GateRejection::MalformedHeader
                | GateRejection::InvalidToken(_)
        )
    }

    /// Machine-readable reason returned to the caller
    ///
    /// All token failures share one reason so callers cannot probe which check failed.
    pub fn reason(&self) -> &'static str {
        match self {
            GateRejection::MissingHeader => "missing_authorization",
            GateRejection::MalformedHeader => "malformed_authorization",
            GateRejection::InvalidToken(_) => "invalid_token",
            GateRejection::MissingClaims => "missing_identity",
            GateRejection::InsufficientRole { .. } => "insufficient_role",
        }
    }
}

impl IntoResponse for GateRejection {
    fn into_response(self) -> Response {
        let classification = classify(&self);
        classification.log();
        classification.into_response()
    }
}

/// One step of the gate pipeline
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    /// Validate the bearer token and attach [`AuthContext`]
    Authenticate,

    /// Require the attached [`AuthContext`] to carry this role
    Authorize(Role),
}

impl Stage {
    fn apply(
        &self,
        tokens: &TokenService,
        req: &mut Request,
        now: DateTime<Utc>,
    ) -> Result<(), GateRejection> {
        match self {
            Stage::Authenticate => {
                let token = bearer_token(req.headers())?;
                let claims = tokens
                    .validate(token, now)
                    .map_err(GateRejection::InvalidToken)?;
                let context = AuthContext::from_claims(&claims).map_err(GateRejection::InvalidToken)?;

                tracing::debug!(user_id = context.user_id, role = %context.role, "Request authenticated");
                req.extensions_mut().insert(context);
                Ok(())
            }
            Stage::Authorize(required) => {
                let context = req
                    .extensions()
                    .get::<AuthContext>()
                    .ok_or(GateRejection::MissingClaims)?;

                if context.role != *required {
                    return Err(GateRejection::InsufficientRole {
                        required: *required,
                        actual: context.role,
                    });
                }
                Ok(())
            }
        }
    }
}

/// Ordered authorization pipeline
#[derive(Debug, Clone)]
pub struct Gate {
    tokens: Arc<TokenService>,
    stages: Vec<Stage>,
}

impl Gate {
    /// Creates an empty gate that validates tokens with `tokens`
    pub fn new(tokens: Arc<TokenService>) -> Self {
        Self {
            tokens,
            stages: Vec::new(),
        }
    }

    /// Appends the authenticate stage
    pub fn authenticate(mut self) -> Self {
        self.stages.push(Stage::Authenticate);
        self
    }

    /// Appends an authorize stage requiring `role`
    pub fn authorize(mut self, role: Role) -> Self {
        self.stages.push(Stage::Authorize(role));
        self
    }

    /// Stages in execution order
    pub fn stages(&self) -> &[Stage] {
        &self.stages
    }

    /// Runs every stage against `req`, stopping at the first rejection
    pub fn check(&self, req: &mut Request, now: DateTime<Utc>) -> Result<(), GateRejection> {
        for stage in &self.stages {
            stage.apply(&self.tokens, req, now)?;
        }
        Ok(())
    }
}

/// Extracts the token from an `Authorization: Bearer <token>` header
///
/// The header must split on single spaces into exactly two parts, the first
/// being the literal `Bearer` and the second non-empty.
pub fn bearer_token(headers: &HeaderMap) -> Result<&str, GateRejection> {
    let value = headers
        .get(header::AUTHORIZATION)
        .ok_or(GateRejection::MissingHeader)?
        .to_str()
        .map_err(|_| GateRejection::MalformedHeader)?;

    let parts: Vec<&str> = value.split(' ').collect();
    match parts.as_slice() {
        ["Bearer", token] if !token.is_empty() => Ok(token),
        _ => Err(GateRejection::MalformedHeader),
    }
}

/// Axum middleware running a [`Gate`]
///
/// Use with `axum::middleware::from_fn_with_state(gate, gate_middleware)`.
pub async fn gate_middleware(
    State(gate): State<Gate>,
    mut req: Request,
    next: Next,
) -> Result<Response, GateRejection> {
    gate.check(&mut req, Utc::now())?;
    Ok(next.run(req).await)
}
