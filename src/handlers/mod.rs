pub mod portfolio;

use crate::portfolio::PortfolioAggregator;
use axum::http::HeaderValue;
use axum::{
    routing::{get, post},
    Router,
};
use reqwest::Method;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::{self, TraceLayer};
use tracing::Level;

/// Build the HTTP surface over one aggregator.
pub fn router(aggregator: Arc<PortfolioAggregator>, frontend_url: &str) -> Router {
    let mut cors = CorsLayer::new().allow_methods(vec![Method::GET, Method::POST]);
    match frontend_url.parse::<HeaderValue>() {
        Ok(origin) => cors = cors.allow_origin(origin),
        Err(e) => tracing::warn!("Ignoring invalid FRONTEND_URL {:?}: {}", frontend_url, e),
    }

    Router::new()
        .route("/health", get(|| async { "ok" }))
        .route("/portfolio", get(portfolio::get_portfolio))
        .route("/portfolio/refresh", post(portfolio::refresh_portfolio))
        .route("/portfolio/stream", get(portfolio::stream_portfolio))
        .with_state(aggregator)
        .layer(cors)
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(trace::DefaultMakeSpan::new().level(Level::INFO))
                .on_response(trace::DefaultOnResponse::new().level(Level::INFO)),
        )
}
