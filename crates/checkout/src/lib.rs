//! Order checkout workflow.
//!
//! [`OrderWorkflow`] places orders against the catalog, moves them through
//! the status table, cancels them with stock restoration and hands payment
//! off to a [`PaymentGateway`]. Stock changes made after an order is written
//! are best-effort and reported in a [`StockReport`].

pub mod error;
pub mod services;
pub mod stock;
pub mod workflow;

pub use error::{CheckoutError, PaymentError, Result};
pub use services::{InMemoryPaymentGateway, IntentStatus, PaymentGateway, PaymentIntent};
pub use stock::{AdjustmentOutcome, StockAdjustment, StockReport};
pub use workflow::{
    Cancelled, DEFAULT_CURRENCY, OrderWorkflow, PaymentReceipt, Placed, StatusChanged,
};
