//! Top-level router: API routes, health check and tower-http layers.

use std::time::Duration;

use axum::http::{header, HeaderName, HeaderValue, Method};
use axum::routing::get;
use axum::{Json, Router};
use serde_json::{json, Value};
use tower_http::cors::{Any, CorsLayer};
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

use super::middleware::AuthState;
use super::payment::{payment_router, PaymentAppState};

const REQUEST_ID_HEADER: &str = "x-request-id";

/// Cross-cutting HTTP settings.
#[derive(Debug, Clone)]
pub struct RouterConfig {
    pub request_timeout: Duration,
    /// Allowed browser origins; `*` allows any.
    pub cors_origins: Vec<String>,
}

impl Default for RouterConfig {
    fn default() -> Self {
        Self {
            request_timeout: Duration::from_secs(30),
            cors_origins: Vec::new(),
        }
    }
}

/// GET /health
async fn health() -> Json<Value> {
    Json(json!({"status": "ok"}))
}

fn cors_layer(origins: &[String]) -> CorsLayer {
    let layer = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE]);

    if origins.iter().any(|o| o == "*") {
        return layer.allow_origin(Any);
    }

    let allowed: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!(origin = %origin, "Ignoring invalid CORS origin");
                None
            }
        })
        .collect();
    layer.allow_origin(allowed)
}

/// Builds the complete application router.
pub fn app_router(state: PaymentAppState, auth: AuthState, config: &RouterConfig) -> Router {
    let request_id = HeaderName::from_static(REQUEST_ID_HEADER);

    Router::new()
        .route("/health", get(health))
        .nest("/api", payment_router(auth).with_state(state))
        .layer(TimeoutLayer::new(config.request_timeout))
        .layer(cors_layer(&config.cors_origins))
        .layer(PropagateRequestIdLayer::new(request_id.clone()))
        .layer(TraceLayer::new_for_http())
        .layer(SetRequestIdLayer::new(request_id, MakeRequestUuid))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wildcard_and_listed_origins_build_layers() {
        let _ = cors_layer(&["*".to_string()]);
        let _ = cors_layer(&["https://app.tapcard.app".to_string(), "bad\norigin".to_string()]);
    }

    #[test]
    fn default_timeout_is_thirty_seconds() {
        assert_eq!(RouterConfig::default().request_timeout, Duration::from_secs(30));
    }
}
