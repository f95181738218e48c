//! HTTP API server with observability for the checkout service.
//!
//! Provides REST endpoints for placing, paying, cancelling and tracking
//! orders, plus the catalog calls sellers need, with structured logging
//! (tracing) and Prometheus metrics.

pub mod config;
pub mod error;
pub mod extract;
pub mod routes;
pub mod validation;

use std::sync::Arc;

use axum::Router;
use axum::routing::{get, post, put};
use checkout::{InMemoryPaymentGateway, OrderWorkflow, PaymentGateway};
use metrics_exporter_prometheus::PrometheusHandle;
use sqlx::PgPool;
use store::{CatalogStore, InMemoryCatalog, InMemoryOrderStore, OrderStore};
use store::{PostgresCatalog, PostgresOrderStore};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use validation::RequestValidator;

pub use routes::AppState;

/// The workflow as the server runs it, with its backends chosen at startup.
pub type Workflow =
    OrderWorkflow<Arc<dyn CatalogStore>, Arc<dyn OrderStore>, Arc<dyn PaymentGateway>>;

impl AppState {
    /// Wires a workflow over the given backends with default field limits.
    pub fn new(
        catalog: Arc<dyn CatalogStore>,
        orders: Arc<dyn OrderStore>,
        payments: Arc<dyn PaymentGateway>,
        currency: &str,
    ) -> Self {
        Self {
            workflow: OrderWorkflow::new(catalog, orders, payments).with_currency(currency),
            validator: RequestValidator::default(),
        }
    }

    /// Replaces the request validator.
    pub fn with_validator(mut self, validator: RequestValidator) -> Self {
        self.validator = validator;
        self
    }
}

/// Creates the Axum application router with all routes and shared state.
pub fn create_app(state: Arc<AppState>, metrics_handle: PrometheusHandle) -> Router {
    let metrics_router = Router::new()
        .route("/metrics", get(routes::metrics::get))
        .with_state(metrics_handle);

    Router::new()
        .route("/health", get(routes::health::check))
        .route("/orders", post(routes::orders::create))
        .route("/orders/my", get(routes::orders::my_orders))
        .route("/orders/analytics", get(routes::orders::analytics))
        .route("/orders/status/{status}", get(routes::orders::by_status))
        .route(
            "/orders/{id}",
            get(routes::orders::get).put(routes::orders::update_details),
        )
        .route("/orders/{id}/status", put(routes::orders::update_status))
        .route("/orders/{id}/payment", post(routes::orders::pay))
        .route("/orders/{id}/cancel", put(routes::orders::cancel))
        .route("/seller/orders", get(routes::orders::seller_orders))
        .route("/admin/orders", get(routes::orders::all_orders))
        .route("/products", post(routes::products::create))
        .route("/products/{id}", get(routes::products::get))
        .route("/products/{id}/stock", put(routes::products::update_stock))
        .with_state(state)
        .merge(metrics_router)
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(TraceLayer::new_for_http())
}

/// Application state over in-memory stores and the in-memory payment
/// gateway. Used by tests and when no database is configured.
pub fn create_in_memory_state(currency: &str) -> Arc<AppState> {
    Arc::new(AppState::new(
        Arc::new(InMemoryCatalog::new()),
        Arc::new(InMemoryOrderStore::new()),
        Arc::new(InMemoryPaymentGateway::new()),
        currency,
    ))
}

/// Application state over PostgreSQL. Payments still go through `payments`,
/// since the provider is external to the database.
pub fn create_postgres_state(
    pool: PgPool,
    payments: Arc<dyn PaymentGateway>,
    currency: &str,
) -> Arc<AppState> {
    Arc::new(AppState::new(
        Arc::new(PostgresCatalog::new(pool.clone())),
        Arc::new(PostgresOrderStore::new(pool)),
        payments,
        currency,
    ))
}
