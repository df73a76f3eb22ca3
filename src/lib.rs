//! # Waypoint - travel planning router
//!
//! Waypoint routes natural-language travel requests to domain specialists
//! (airline, hotel, car rental). Each specialist reaches its backend only
//! through a tool host speaking session-based JSON-RPC, and only for the
//! tools in its own catalog.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use waypoint::config::Settings;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     // Load configuration
//!     let settings = Settings::new()?;
//!
//!     // Server will start on configured host:port
//!     Ok(())
//! }
//! ```
//!
//! ## Architecture
//!
//! - **Domain**: trip and itinerary shapes, ports for tool hosts and context
//! - **Agents**: catalog, specialists, registry, router
//! - **Adapters**: protocol client, context providers, HTTP handlers
//! - **Config**: layered settings and validation

pub mod adapters;
pub mod agents;
pub mod cli;
pub mod config;
pub mod domain;

use crate::adapters::api_handler::{self, ApiState};
use crate::adapters::health_handler::HealthHandler;
use crate::adapters::metrics_handler::MetricsHandler;
use axum::{
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use std::time::Duration;
use tower_http::trace::TraceLayer;

/// Creates the Axum application router with all endpoints configured.
///
/// # Arguments
///
/// * `router` - Request router over the registered specialists
/// * `health_handler` - Health check handler
/// * `metrics_handler` - Metrics collection handler
/// * `probe_timeout` - Budget for each specialist probe in agent listings
pub fn create_app(
    router: Arc<agents::router::Router>,
    health_handler: Arc<HealthHandler>,
    metrics_handler: Arc<MetricsHandler>,
    probe_timeout: Duration,
) -> Router {
    let ops_router = Router::new()
        .route("/health", get({
            let handler = health_handler.clone();
            move || {
                let h = handler.clone();
                async move { h.health().await }
            }
        }))
        .route("/health/live", get({
            let handler = health_handler.clone();
            move || {
                let h = handler.clone();
                async move { h.live().await }
            }
        }))
        .route("/metrics", get({
            let handler = metrics_handler.clone();
            move || {
                let h = handler.clone();
                async move { h.metrics().await }
            }
        }));

    let api_state = ApiState {
        router,
        probe_timeout,
    };

    let api_router = Router::new()
        .route("/chat", post(api_handler::chat))
        .route("/agents", get(api_handler::list_agents))
        .route("/agents/:domain/invoke", post(api_handler::invoke_agent))
        .route("/agents/:domain/tools", get(api_handler::agent_tools))
        .route("/agents/:domain/identity", get(api_handler::agent_identity))
        .route("/agents/:domain/health", get(api_handler::agent_health))
        .with_state(api_state);

    ops_router
        .merge(api_router)
        .layer(TraceLayer::new_for_http())
        .layer(
            tower_http::cors::CorsLayer::new()
                .allow_origin(tower_http::cors::Any)
                .allow_methods(tower_http::cors::Any)
                .allow_headers(tower_http::cors::Any),
        )
}
