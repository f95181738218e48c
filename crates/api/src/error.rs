//! API error types with HTTP response mapping.

use axum::extract::rejection::{JsonRejection, PathRejection, QueryRejection};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use checkout::{CheckoutError, PaymentError};
use domain::OrderError;
use store::StoreError;
use thiserror::Error;

/// API-level error type that maps to HTTP responses.
#[derive(Debug, Error)]
pub enum ApiError {
    /// The request carried no usable identity.
    #[error("{0}")]
    Unauthenticated(String),

    /// Malformed path, query or body.
    #[error("{0}")]
    BadRequest(String),

    /// Well-formed input that fails field rules.
    #[error("{0}")]
    Validation(String),

    /// Workflow failure.
    #[error(transparent)]
    Checkout(#[from] CheckoutError),
}

impl ApiError {
    /// HTTP status and client-facing message for this error.
    fn status_and_message(&self) -> (StatusCode, String) {
        match self {
            ApiError::Unauthenticated(msg) => (StatusCode::UNAUTHORIZED, msg.clone()),
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            ApiError::Validation(msg) => (StatusCode::UNPROCESSABLE_ENTITY, msg.clone()),
            ApiError::Checkout(err) => checkout_error_to_response(err),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = self.status_and_message();
        let body = serde_json::json!({ "success": false, "error": message });
        (status, axum::Json(body)).into_response()
    }
}

fn checkout_error_to_response(err: &CheckoutError) -> (StatusCode, String) {
    match err {
        CheckoutError::Order(order_err) => (order_error_status(order_err), err.to_string()),
        CheckoutError::Store { source, .. } => match source {
            StoreError::Duplicate { .. } | StoreError::NotPending { .. } => {
                (StatusCode::CONFLICT, err.to_string())
            }
            StoreError::ProductNotFound(_) | StoreError::OrderNotFound(_) => {
                (StatusCode::NOT_FOUND, err.to_string())
            }
            _ => {
                tracing::error!(error = %err, "internal server error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "internal server error".to_string(),
                )
            }
        },
        CheckoutError::Payment { source, .. } => match source {
            PaymentError::Declined(_) => (StatusCode::PAYMENT_REQUIRED, err.to_string()),
            PaymentError::Unavailable(_) | PaymentError::UnknownIntent(_) => {
                tracing::warn!(error = %err, "payment gateway failure");
                (StatusCode::BAD_GATEWAY, err.to_string())
            }
        },
    }
}

fn order_error_status(err: &OrderError) -> StatusCode {
    match err {
        OrderError::EmptyCart
        | OrderError::InvalidQuantity { .. }
        | OrderError::InvalidAmount { .. } => StatusCode::BAD_REQUEST,
        OrderError::ProductInactive { .. } | OrderError::InsufficientStock { .. } => {
            StatusCode::UNPROCESSABLE_ENTITY
        }
        OrderError::ProductNotFound(_) | OrderError::OrderNotFound(_) => StatusCode::NOT_FOUND,
        OrderError::Unauthorized { .. } => StatusCode::FORBIDDEN,
        OrderError::InvalidTransition { .. }
        | OrderError::NotCancellable { .. }
        | OrderError::OrderNotPending { .. } => StatusCode::CONFLICT,
    }
}

impl From<OrderError> for ApiError {
    fn from(err: OrderError) -> Self {
        ApiError::Checkout(err.into())
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}

impl From<PathRejection> for ApiError {
    fn from(rejection: PathRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}
