use std::sync::Arc;

use axum::{
    http::{header, HeaderName, Method, StatusCode},
    middleware,
    routing::{get, post},
    Json, Router,
};
use reqwest::Client as HttpClient;
use serde_json::{json, Value};
use tower::ServiceBuilder;
use tower_http::{
    cors::{AllowOrigin, CorsLayer},
    trace::TraceLayer,
};
use url::Url;

use crate::{
    cache::ResultCache,
    config::Config,
    error::{AppError, AppResult},
    middleware::{make_request_span, request_id_middleware},
    services::RatingResolver,
};

pub mod proxy;
pub mod ratings;

/// Shared state handed to every handler
pub struct AppState {
    pub resolver: RatingResolver,
    /// Client used by the `/proxy` relay to reach the upstream site
    pub relay_client: HttpClient,
    /// The only origin `/proxy` will forward to
    pub upstream: Url,
}

impl AppState {
    pub fn new(resolver: RatingResolver, relay_client: HttpClient, upstream: Url) -> Self {
        Self {
            resolver,
            relay_client,
            upstream,
        }
    }

    pub fn from_config(config: &Config, cache: ResultCache) -> AppResult<Self> {
        let resolver = RatingResolver::from_config(config, cache)?;

        let upstream = Url::parse(&config.upstream_base_url).map_err(|e| {
            AppError::InvalidInput(format!(
                "Invalid upstream base URL {}: {}",
                config.upstream_base_url, e
            ))
        })?;

        let relay_client = HttpClient::builder()
            .timeout(config.scrape_timeout())
            .redirect(proxy::redirect_policy(upstream.clone()))
            .build()?;

        Ok(Self::new(resolver, relay_client, upstream))
    }
}

/// Creates the application router with all routes
pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .route("/proxy", get(proxy::relay).options(proxy::options))
        .nest("/api/v1", api_routes())
        .with_state(state)
        .layer(
            ServiceBuilder::new()
                .layer(middleware::from_fn(request_id_middleware))
                .layer(TraceLayer::new_for_http().make_span_with(make_request_span))
                .layer(cors_layer()),
        )
}

/// API routes under /api/v1
fn api_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/ratings", get(ratings::get_rating))
        .route("/ratings/batch", post(ratings::get_ratings_batch))
        .route("/ratings/cache", get(ratings::cache_stats))
        .route("/ratings/cache/sweep", post(ratings::sweep_cache))
}

/// Browser callers are allowed from any origin; the origin is echoed back rather than `*`
fn cors_layer() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(AllowOrigin::mirror_request())
        .allow_methods([Method::GET, Method::OPTIONS])
        .allow_headers([
            header::CONTENT_TYPE,
            header::AUTHORIZATION,
            HeaderName::from_static("apikey"),
        ])
}

/// Health check endpoint
async fn health_check() -> (StatusCode, Json<Value>) {
    (StatusCode::OK, Json(json!({ "status": "healthy" })))
}
