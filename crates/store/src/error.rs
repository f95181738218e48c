use common::{OrderId, ProductId};
use domain::OrderStatus;
use thiserror::Error;

/// Errors that can occur when interacting with the catalog or order store.
#[derive(Debug, Error)]
pub enum StoreError {
    /// A targeted update named a product that doesn't exist.
    #[error("Product not found: {0}")]
    ProductNotFound(ProductId),

    /// A targeted update named an order that doesn't exist.
    #[error("Order not found: {0}")]
    OrderNotFound(OrderId),

    /// A unique column (SKU, order number) already holds this value.
    #[error("Duplicate {field}: {value}")]
    Duplicate { field: &'static str, value: String },

    /// A database error occurred.
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// A database migration error occurred.
    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    /// A stored value couldn't be mapped back into the domain model.
    #[error("Corrupt row: {0}")]
    Corrupt(String),

    /// A write guarded on a pending order found it in another status.
    #[error("Order {id} is no longer pending (current: {status})")]
    NotPending { id: OrderId, status: OrderStatus },
}

/// Result type for store operations.
pub type Result<T> = std::result::Result<T, StoreError>;
