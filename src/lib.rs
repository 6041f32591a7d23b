//! # Formsmith - Form Builder Backend
//!
//! Formsmith stores form definitions built from typed fields, derives a
//! validation schema for each form and accepts submissions only when they
//! pass it.
//!
//! ## Features
//!
//! - **Six field types**: text, number, email, textarea, checkbox, radio
//! - **Schema validation**: per-field constraints with readable error messages
//! - **Pluggable storage**: SQLite, PostgreSQL or MySQL through SQLx
//! - **Metrics**: Prometheus metrics for monitoring
//! - **Health Checks**: Kubernetes-ready health endpoints
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use formsmith::config::Settings;
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
//! - **Domain**: Field model, validation schema, forms and submissions
//! - **Application**: Form and submission use cases
//! - **Persistence**: SQLx repositories and migrations
//! - **Adapters**: HTTP handlers, health, metrics, rate limiting
//! - **Config**: Configuration management

pub mod adapters;
pub mod application;
pub mod cli;
pub mod config;
pub mod domain;
pub mod persistence;

use crate::adapters::api_handler::{self, ApiState};
use crate::adapters::health_handler::HealthHandler;
use crate::adapters::metrics_handler::{track_requests, MetricsCollector, MetricsHandler};
use crate::application::FormService;
use crate::config::Settings;
use axum::{routing::get, Router};
use std::sync::Arc;

/// Creates the Axum application router with all endpoints configured.
///
/// # Arguments
///
/// * `service` - Form and submission use cases
/// * `health_handler` - Health check handler
/// * `metrics` - Shared Prometheus collector
/// * `settings` - Application settings
///
/// # Returns
///
/// Configured Axum Router
pub fn create_app(
    service: Arc<FormService>,
    health_handler: Arc<HealthHandler>,
    metrics: Arc<MetricsCollector>,
    settings: &Settings,
) -> Router {
    let metrics_handler = Arc::new(MetricsHandler::new(metrics.clone()));

    // Operational routes, never rate limited
    let public_router = Router::new()
        .route("/health", get({
            let handler = health_handler.clone();
            move || {
                let h = handler.clone();
                async move { h.health().await }
            }
        }))
        .route("/health/ready", get({
            let handler = health_handler.clone();
            move || {
                let h = handler.clone();
                async move { h.ready().await }
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
        service,
        metrics: metrics.clone(),
    };

    let api_router = Router::new()
        .route("/forms", get(api_handler::list_forms).post(api_handler::create_form))
        .route(
            "/forms/:id",
            get(api_handler::get_form)
                .put(api_handler::update_form)
                .delete(api_handler::delete_form),
        )
        .route("/forms/:id/schema", get(api_handler::get_form_schema))
        .route(
            "/forms/:id/submissions/:submission_id",
            get(api_handler::get_submission),
        )
        .route(
            "/submissions",
            get(api_handler::list_submissions).post(api_handler::create_submission),
        )
        .with_state(api_state);

    let mut protected_router = Router::new().nest("/api", api_router);

    // Apply Rate Limiting to API routes if enabled
    if let Some(rate_limit) = &settings.rate_limit {
        if rate_limit.enabled {
            let limiter = crate::adapters::rate_limit::create_limiter(
                rate_limit.requests_per_second,
                rate_limit.burst_size,
            );

            protected_router = protected_router.layer(axum::middleware::from_fn_with_state(
                limiter,
                crate::adapters::rate_limit::rate_limit_middleware,
            ));
        }
    }

    public_router
        .merge(protected_router)
        .layer(axum::middleware::from_fn_with_state(metrics, track_requests))
        .layer(
            tower_http::cors::CorsLayer::new()
                .allow_origin(tower_http::cors::Any)
                .allow_methods(tower_http::cors::Any)
                .allow_headers(tower_http::cors::Any),
        )
}
