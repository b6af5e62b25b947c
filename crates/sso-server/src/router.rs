//! Router configuration.
//!
//! This module creates the main Axum router that combines all endpoints.

use axum::{
    extract::State,
    http::{HeaderValue, StatusCode},
    response::{IntoResponse, Json, Response},
    routing::get,
    Router,
};
use serde::Serialize;
use sso_protocol_oidc::endpoints::{oidc_router, DEFAULT_LOGIN_PATH};
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::state::AppState;
use crate::ui;

/// Plain-text greeting served at `/`.
pub const WELCOME_MESSAGE: &str = "欢迎来到授权中心，可联系管理员提供技术支持";

/// Creates the main application router.
pub fn create_router(state: AppState) -> Router {
    let oidc = oidc_router().with_state(state.oidc.clone());

    let health = Router::new()
        .route("/health", get(health_check))
        .route("/health/live", get(liveness_check))
        .route("/health/ready", get(readiness_check))
        .with_state(state.clone());

    let ui_routes = Router::new()
        .route(DEFAULT_LOGIN_PATH, get(ui::login_page).post(ui::login_submit))
        .with_state(state.clone());

    let cors = cors_layer(&state.config.cors_origins);

    Router::new()
        .merge(oidc)
        .merge(health)
        .merge(ui_routes)
        .route("/", get(root))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
}

fn cors_layer(origins: &[String]) -> CorsLayer {
    let cors = CorsLayer::new().allow_methods(Any).allow_headers(Any);
    if origins.is_empty() || origins.iter().any(|o| o == "*") {
        return cors.allow_origin(Any);
    }
    let origins: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|o| match o.parse() {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!(origin = %o, "Ignoring malformed CORS origin");
                None
            }
        })
        .collect();
    cors.allow_origin(AllowOrigin::list(origins))
}

/// Root endpoint handler.
async fn root() -> &'static str {
    WELCOME_MESSAGE
}

/// Health check response.
#[derive(Serialize)]
pub struct HealthResponse {
    status: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    version: Option<String>,
}

/// Health check endpoint.
async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy",
        version: Some(env!("CARGO_PKG_VERSION").to_string()),
    })
}

/// Liveness check endpoint.
async fn liveness_check() -> StatusCode {
    StatusCode::OK
}

/// Readiness check: the resource registry must answer.
async fn readiness_check(State(state): State<AppState>) -> Response {
    match state.oidc.resources.scope_names().await {
        Ok(_) => (
            StatusCode::OK,
            Json(HealthResponse {
                status: "ready",
                version: None,
            }),
        )
            .into_response(),
        Err(e) => {
            tracing::error!(error = %e, "Readiness check failed");
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(HealthResponse {
                    status: "unavailable",
                    version: None,
                }),
            )
                .into_response()
        }
    }
}
