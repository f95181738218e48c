//! Domain error types.

use common::{OrderId, ProductId};
use thiserror::Error;

use crate::order::{Money, OrderStatus};
use crate::policy::Action;

/// Business rule violations raised by checkout and order management.
#[derive(Debug, Error)]
pub enum OrderError {
    /// The checkout request had no lines.
    #[error("order must contain at least one item")]
    EmptyCart,

    /// A requested line had a zero quantity.
    #[error("invalid quantity {quantity} for product {product_id} (must be at least 1)")]
    InvalidQuantity { product_id: ProductId, quantity: u32 },

    /// A tax, shipping or discount amount was out of range.
    #[error("invalid {field} amount: {amount}")]
    InvalidAmount { field: &'static str, amount: Money },

    #[error("product {0} not found")]
    ProductNotFound(ProductId),

    #[error("product {name} is not available")]
    ProductInactive { product_id: ProductId, name: String },

    #[error(
        "insufficient stock for product {name} (available: {available}, requested: {requested})"
    )]
    InsufficientStock {
        product_id: ProductId,
        name: String,
        available: u32,
        requested: u32,
    },

    #[error("order {0} not found")]
    OrderNotFound(OrderId),

    /// The actor lacks the relationship to the order the action requires.
    #[error("unauthorized to {action}")]
    Unauthorized { action: Action },

    #[error("invalid status transition from {from} to {to}")]
    InvalidTransition { from: OrderStatus, to: OrderStatus },

    #[error("order cannot be cancelled in its current status ({status})")]
    NotCancellable { status: OrderStatus },

    #[error("order is not in pending status (current: {status})")]
    OrderNotPending { status: OrderStatus },
}
