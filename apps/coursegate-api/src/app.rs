//! Router assembly: top-level routes, purchase routes and the middleware
//! stack.

use axum::http::{header, HeaderValue, Method};
use axum::routing::get;
use axum::Router;
use std::time::Duration;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

use coursegate_api_purchases::purchases_router;

use crate::config::Config;
use crate::health::health_handler;
use crate::openapi::openapi_json;
use crate::state::AppState;

pub fn build_router(state: AppState, config: &Config) -> Router {
    let purchases = purchases_router(state.purchases.clone());

    Router::new()
        .route("/health", get(health_handler))
        .route("/api-docs/openapi.json", get(openapi_json))
        .with_state(state)
        .merge(purchases)
        .layer(RequestBodyLimitLayer::new(config.max_body_bytes))
        .layer(TimeoutLayer::new(config.request_timeout))
        .layer(build_cors_layer(&config.cors_origins))
        .layer(TraceLayer::new_for_http())
}

fn build_cors_layer(origins: &[String]) -> CorsLayer {
    let is_wildcard = origins.len() == 1 && origins[0] == "*";

    let layer = CorsLayer::new().max_age(Duration::from_secs(3600));
    if is_wildcard {
        return layer
            .allow_origin(AllowOrigin::any())
            .allow_methods(Any)
            .allow_headers(Any);
    }

    let allowed: Vec<HeaderValue> = origins.iter().filter_map(|o| o.parse().ok()).collect();
    layer
        .allow_origin(AllowOrigin::predicate(
            move |origin: &HeaderValue, _req: &axum::http::request::Parts| {
                let is_allowed = allowed.contains(origin);
                if !is_allowed {
                    tracing::warn!(
                        origin = %origin.to_str().unwrap_or("<non-utf8>"),
                        "CORS origin rejected"
                    );
                }
                is_allowed
            },
        ))
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE])
        .allow_credentials(true)
}
