//! Checkout error types.

use domain::OrderError;
use store::StoreError;
use thiserror::Error;

/// Errors raised by a payment gateway.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PaymentError {
    /// The provider refused the charge.
    #[error("payment declined: {0}")]
    Declined(String),

    /// The provider couldn't be reached or answered with a server error.
    #[error("payment gateway unavailable: {0}")]
    Unavailable(String),

    /// A confirm call named an intent the provider doesn't know.
    #[error("unknown payment intent: {0}")]
    UnknownIntent(String),
}

/// Errors that can occur during checkout workflow operations.
#[derive(Debug, Error)]
pub enum CheckoutError {
    /// A business rule rejected the operation.
    #[error(transparent)]
    Order(#[from] OrderError),

    /// The catalog or order store failed.
    #[error("{context}: {source}")]
    Store {
        context: String,
        #[source]
        source: StoreError,
    },

    /// The payment gateway failed; the order was left untouched.
    #[error("{context}: {source}")]
    Payment {
        context: String,
        #[source]
        source: PaymentError,
    },
}

impl CheckoutError {
    pub(crate) fn store(context: impl Into<String>) -> impl FnOnce(StoreError) -> Self {
        let context = context.into();
        move |source| CheckoutError::Store { context, source }
    }

    pub(crate) fn payment(context: impl Into<String>) -> impl FnOnce(PaymentError) -> Self {
        let context = context.into();
        move |source| CheckoutError::Payment { context, source }
    }
}

/// Convenience type alias for checkout results.
pub type Result<T> = std::result::Result<T, CheckoutError>;
