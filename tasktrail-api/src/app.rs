/// Application state and router builder
///
/// # Example
///
/// ```no_run
/// use std::sync::Arc;
/// use tasktrail_api::{app::{build_router, AppState}, config::Config};
/// use tasktrail_shared::{db::pool::{create_pool, DatabaseConfig}, repository::PgRecordRepository};
///
/// # async fn example() -> anyhow::Result<()> {
/// let config = Config::from_env()?;
/// let pool = create_pool(DatabaseConfig::new(config.database.url.clone())).await?;
/// let state = AppState::new(Arc::new(PgRecordRepository::new(pool)), config);
///
/// let app = build_router(state);
/// let listener = tokio::net::TcpListener::bind("0.0.0.0:8080").await?;
/// axum::serve(listener, app).await?;
/// # Ok(())
/// # }
/// ```

use crate::{config::Config, routes};
use axum::{
    extract::Request,
    http::{header, HeaderName, HeaderValue, Method},
    middleware,
    routing::{get, post},
    Router,
};
use std::{sync::Arc, time::Duration};
use tasktrail_shared::{
    auth::{
        jwt::TokenService,
        middleware::{gate_middleware, Gate},
        password::CredentialStore,
    },
    models::user::Role,
    repository::RecordRepository,
};
use tower::ServiceBuilder;
use tower_http::{
    cors::CorsLayer,
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::{DefaultOnResponse, TraceLayer},
};
use tracing::Level;

/// Header carrying the per-request id
pub const REQUEST_ID_HEADER: &str = "x-request-id";

/// Shared application state
///
/// Cloned for each request handler via Axum's `State` extractor; every field
/// is behind an `Arc`.
#[derive(Clone)]
pub struct AppState {
    /// Persistence backend
    pub repo: Arc<dyn RecordRepository>,

    /// Token issuing and validation, keyed by `JWT_SECRET`
    pub tokens: Arc<TokenService>,

    pub credentials: Arc<CredentialStore>,

    pub config: Arc<Config>,
}

impl AppState {
    /// Creates state with the default password hashing cost
    pub fn new(repo: Arc<dyn RecordRepository>, config: Config) -> Self {
        Self {
            repo,
            tokens: Arc::new(TokenService::new(config.jwt.secret.as_bytes())),
            credentials: Arc::new(CredentialStore::new()),
            config: Arc::new(config),
        }
    }

    /// Replaces the credential store (tests use a cheaper hash cost)
    pub fn with_credentials(mut self, credentials: CredentialStore) -> Self {
        self.credentials = Arc::new(credentials);
        self
    }
}

/// Builds the complete Axum router with all routes and middleware
///
/// # Architecture
///
/// ```text
/// /
/// ├── GET  /health              # Health check (public)
/// ├── POST /signup              # Create account (public)
/// ├── POST /login               # Get bearer token (public)
/// └── /api/v1/                  # Authenticate gate
///     ├── GET  /records         # Caller's records
///     ├── POST /records         # Create record + audit entry
///     └── /admin/               # Authenticate + Authorize(admin) gate
///         └── GET /users        # All users
/// ```
///
/// # Middleware Stack
///
/// Outermost first:
/// 1. Request id (set on the way in, copied to the response)
/// 2. Logging (tower-http TraceLayer, span tagged with the request id)
/// 3. CORS
/// 4. Authorization gate (per route group)
pub fn build_router(state: AppState) -> Router {
    let authenticated = Gate::new(state.tokens.clone()).authenticate();
    let admin_only = authenticated.clone().authorize(Role::Admin);

    let admin_routes = Router::new()
        .route("/users", get(routes::admin::list_users))
        .route_layer(middleware::from_fn_with_state(admin_only, gate_middleware));

    let record_routes = Router::new()
        .route(
            "/records",
            get(routes::records::list_records).post(routes::records::create_record),
        )
        .route_layer(middleware::from_fn_with_state(
            authenticated,
            gate_middleware,
        ));

    let v1_routes = Router::new()
        .merge(record_routes)
        .nest("/admin", admin_routes);

    let request_id = HeaderName::from_static(REQUEST_ID_HEADER);

    Router::new()
        .route("/health", get(routes::health::health_check))
        .route("/signup", post(routes::auth::signup))
        .route("/login", post(routes::auth::login))
        .nest("/api/v1", v1_routes)
        .layer(cors_layer(&state.config))
        .layer(
            ServiceBuilder::new()
                .layer(SetRequestIdLayer::new(request_id.clone(), MakeRequestUuid))
                .layer(
                    TraceLayer::new_for_http()
                        .make_span_with(|request: &Request| {
                            let request_id = request
                                .headers()
                                .get(REQUEST_ID_HEADER)
                                .and_then(|v| v.to_str().ok())
                                .unwrap_or("-");

                            tracing::info_span!(
                                "request",
                                method = %request.method(),
                                uri = %request.uri(),
                                request_id = %request_id
                            )
                        })
                        .on_response(DefaultOnResponse::new().level(Level::INFO)),
                )
                .layer(PropagateRequestIdLayer::new(request_id)),
        )
        .with_state(state)
}

/// CORS from `CORS_ORIGINS`; `*` means permissive
fn cors_layer(config: &Config) -> CorsLayer {
    if config.allows_any_origin() {
        return CorsLayer::permissive();
    }

    let origins: Vec<HeaderValue> = config
        .api
        .cors_origins
        .iter()
        .filter_map(|origin| match origin.parse() {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!(origin = %origin, "Ignoring invalid CORS origin");
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE])
        .max_age(Duration::from_secs(3600))
}
