//! # Bagtrack HTTP API Module
//!
//! This module implements the HTTP REST API server using axum.
//!
//! ## Endpoints
//!
//! - `GET /health` - Health check with record counts
//! - `GET /checkpoints` - Checkpoint stages in sequence order
//! - `POST /registerBag` - Register a bag
//! - `POST /scanCheckpoint` - Record a checkpoint scan
//! - `GET /getStatus/{bag_id}` - Bag status with derived operational state
//! - `POST /scan/auto` - Scan with inferred checkpoint (query parameters)
//! - `POST /scan/batch` - Scan many bags at once
//! - `POST /scanners` - Register a scanner device
//! - `GET /scanners` - List scanners
//! - `GET /scanners/{scanner_id}` - Scanner detail
//!
//! ## Security Configuration (Environment Variables)
//!
//! - `BAGTRACK_CORS_ORIGINS`: Comma-separated list of allowed origins, or "*" for all (default: localhost only)
//! - `BAGTRACK_RATE_LIMIT`: Requests per second (default: 100, 0 to disable)
//! - `BAGTRACK_API_KEY`: If set, requires Bearer token authentication

mod auth;
mod handlers;
mod middleware;
mod types;

pub use auth::{API_KEY_ENV, get_api_key_from_env};
pub use middleware::{
    DEFAULT_RATE_LIMIT, GlobalRateLimiter, RATE_LIMIT_ENV, create_rate_limiter,
    get_rate_limit_from_env,
};
pub use types::{
    AutoScanQuery, BagResponse, BagStatusResponse, BatchScanBody, BatchScanResponse,
    CheckpointResponse, ErrorResponse, HealthResponse, RegisterScannerRequest, ScanRequest,
    ScannerListQuery, ScannerListResponse, ScannerResponse, error_status,
};

use axum::{
    Router,
    http::{HeaderValue, Method, header},
    middleware as axum_middleware,
    routing::{get, post},
};
use bagtrack_core::{Tracker, TrackerError};
use std::sync::Arc;
use tokio::sync::RwLock;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

/// Environment variable holding allowed CORS origins.
pub const CORS_ORIGINS_ENV: &str = "BAGTRACK_CORS_ORIGINS";

/// Request body limit.
const MAX_BODY_BYTES: usize = 1024 * 1024;

// =============================================================================
// SERVER STATE
// =============================================================================

/// Shared server state containing the tracker.
#[derive(Clone)]
pub struct AppState {
    pub tracker: Arc<RwLock<Tracker>>,
}

impl AppState {
    #[must_use]
    pub fn new(tracker: Tracker) -> Self {
        Self {
            tracker: Arc::new(RwLock::new(tracker)),
        }
    }
}

// =============================================================================
// SECURITY SETTINGS
// =============================================================================

/// Authentication, rate limiting and CORS settings for the router.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ApiSecurity {
    /// Required API key; `None` disables authentication.
    pub api_key: Option<String>,
    /// Requests per second; 0 disables limiting.
    pub rate_limit: u32,
    /// Raw `BAGTRACK_CORS_ORIGINS` value.
    pub cors_origins: Option<String>,
}

impl ApiSecurity {
    /// Read all settings from the environment.
    #[must_use]
    pub fn from_env() -> Self {
        Self {
            api_key: get_api_key_from_env(),
            rate_limit: get_rate_limit_from_env(),
            cors_origins: std::env::var(CORS_ORIGINS_ENV).ok(),
        }
    }
}

// =============================================================================
// CORS CONFIGURATION
// =============================================================================

/// Build the CORS layer.
///
/// - `*`: allow every origin
/// - a comma-separated list: allow those origins
/// - unset, or a list with no valid entry: localhost only
fn build_cors_layer(origins: Option<&str>) -> CorsLayer {
    match origins {
        Some("*") => {
            tracing::warn!(
                "CORS: Allowing ALL origins ({}=*). This is insecure for production!",
                CORS_ORIGINS_ENV
            );
            CorsLayer::permissive()
        }
        Some(origins) => {
            let allowed_origins: Vec<HeaderValue> = origins
                .split(',')
                .filter_map(|s| {
                    let trimmed = s.trim();
                    match trimmed.parse::<HeaderValue>() {
                        Ok(hv) => {
                            tracing::info!("CORS: Allowing origin: {}", trimmed);
                            Some(hv)
                        }
                        Err(e) => {
                            tracing::warn!("CORS: Invalid origin '{}': {}", trimmed, e);
                            None
                        }
                    }
                })
                .collect();

            if allowed_origins.is_empty() {
                tracing::warn!("CORS: No valid origins configured, defaulting to localhost only");
                build_localhost_cors()
            } else {
                CorsLayer::new()
                    .allow_origin(allowed_origins)
                    .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
                    .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION])
            }
        }
        None => {
            tracing::info!("CORS: No origins configured, defaulting to localhost only");
            build_localhost_cors()
        }
    }
}

/// Restrictive CORS layer for the usual local dashboard ports.
fn build_localhost_cors() -> CorsLayer {
    let origins: Vec<HeaderValue> = [
        "http://localhost:3000",
        "http://localhost:5173",
        "http://localhost:8080",
        "http://127.0.0.1:3000",
        "http://127.0.0.1:8080",
    ]
    .into_iter()
    .filter_map(|o| o.parse::<HeaderValue>().ok())
    .collect();

    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION])
}

// =============================================================================
// ROUTER CREATION
// =============================================================================

/// Create the router with security settings read from the environment.
pub fn create_router(state: AppState) -> Router {
    create_router_with(state, &ApiSecurity::from_env())
}

/// Create the router with explicit security settings.
///
/// Middleware stack (outer to inner):
/// 1. Tracing - logs all requests
/// 2. CORS - handles preflight requests
/// 3. Body limit
/// 4. Rate Limiting (if enabled)
/// 5. Authentication (if configured)
pub fn create_router_with(state: AppState, security: &ApiSecurity) -> Router {
    let cors = build_cors_layer(security.cors_origins.as_deref());

    let rate_limiter = create_rate_limiter(security.rate_limit);
    match rate_limiter {
        Some(_) => tracing::info!("Rate limiting enabled: {} requests/second", security.rate_limit),
        None => tracing::info!("Rate limiting disabled"),
    }

    let mut router = Router::new()
        .route("/health", get(handlers::health_handler))
        .route("/checkpoints", get(handlers::checkpoints_handler))
        .route("/registerBag", post(handlers::register_bag_handler))
        .route("/scanCheckpoint", post(handlers::scan_handler))
        .route("/getStatus/{bag_id}", get(handlers::status_handler))
        .route("/scan/auto", post(handlers::auto_scan_handler))
        .route("/scan/batch", post(handlers::batch_scan_handler))
        .route(
            "/scanners",
            get(handlers::list_scanners_handler).post(handlers::register_scanner_handler),
        )
        .route("/scanners/{scanner_id}", get(handlers::get_scanner_handler));

    match &security.api_key {
        Some(key) => {
            tracing::info!("API key authentication enabled");
            let key: Arc<str> = Arc::from(key.as_str());
            router = router.layer(axum_middleware::from_fn_with_state(
                key,
                auth::api_key_auth_middleware,
            ));
        }
        None => {
            tracing::warn!(
                "API key authentication DISABLED - all endpoints are publicly accessible! \
                 Set {} to enable authentication.",
                API_KEY_ENV
            );
        }
    }

    if let Some(limiter) = rate_limiter {
        router = router.layer(axum_middleware::from_fn_with_state(
            limiter,
            middleware::rate_limit_middleware,
        ));
    }

    router
        .layer(axum::extract::DefaultBodyLimit::max(MAX_BODY_BYTES))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

// =============================================================================
// SERVER STARTUP
// =============================================================================

/// Start the HTTP server and serve until interrupted.
pub async fn run_server(addr: &str, tracker: Tracker) -> Result<(), TrackerError> {
    let state = AppState::new(tracker);
    let router = create_router(state);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(|e| TrackerError::IoError(format!("Bind failed: {}", e)))?;

    tracing::info!("Bagtrack HTTP server listening on {}", addr);

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|e| TrackerError::IoError(format!("Server error: {}", e)))
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}
