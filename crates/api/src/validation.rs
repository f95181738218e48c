//! Field rules for request bodies.
//!
//! Business rules (stock, quantities, transitions) belong to the workflow.
//! [`RequestValidator`] only checks shape: required text present, lengths
//! bounded, currency codes well formed. One instance lives in the
//! application state.

use domain::{
    Address, CreateOrderRequest, CreateProductRequest, Money, OrderDetailsUpdate, PaymentRequest,
};

use crate::error::ApiError;

/// Length limits for validated fields.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Limits {
    pub max_name_length: usize,
    pub max_street_length: usize,
    pub min_postal_code_length: usize,
    pub max_postal_code_length: usize,
    pub max_notes_length: usize,
    pub max_tracking_number_length: usize,
    pub max_order_lines: usize,
    pub min_product_name_length: usize,
    pub max_product_name_length: usize,
    pub max_sku_length: usize,
    pub max_price: Money,
}

impl Default for Limits {
    fn default() -> Self {
        Self {
            max_name_length: 100,
            max_street_length: 255,
            min_postal_code_length: 3,
            max_postal_code_length: 20,
            max_notes_length: 1000,
            max_tracking_number_length: 100,
            max_order_lines: 100,
            min_product_name_length: 3,
            max_product_name_length: 255,
            max_sku_length: 100,
            max_price: Money::from_cents(100_000_000),
        }
    }
}

const CURRENCY_CODE_LENGTH: usize = 3;

fn required(field: &str, value: &str, max: usize) -> Result<(), ApiError> {
    let len = value.trim().chars().count();
    if len == 0 {
        return Err(ApiError::Validation(format!("{field} is required")));
    }
    if len > max {
        return Err(ApiError::Validation(format!(
            "{field} exceeds maximum length (max: {max}, got: {len})"
        )));
    }
    Ok(())
}

fn optional(field: &str, value: Option<&str>, max: usize) -> Result<(), ApiError> {
    match value {
        Some(value) if value.chars().count() > max => Err(ApiError::Validation(format!(
            "{field} exceeds maximum length (max: {max}, got: {})",
            value.chars().count()
        ))),
        _ => Ok(()),
    }
}

/// Checks request bodies against a set of [`Limits`].
#[derive(Debug, Clone, Default)]
pub struct RequestValidator {
    limits: Limits,
}

impl RequestValidator {
    pub fn new(limits: Limits) -> Self {
        Self { limits }
    }

    /// Validates a shipping or billing address. `prefix` names it in messages.
    pub fn address(&self, prefix: &str, address: &Address) -> Result<(), ApiError> {
        let limits = &self.limits;
        let field = |name: &str| format!("{prefix}.{name}");

        required(&field("first_name"), &address.first_name, limits.max_name_length)?;
        required(&field("last_name"), &address.last_name, limits.max_name_length)?;
        required(&field("street"), &address.street, limits.max_street_length)?;
        required(&field("city"), &address.city, limits.max_name_length)?;
        required(&field("state"), &address.state, limits.max_name_length)?;
        required(&field("country"), &address.country, limits.max_name_length)?;
        required(
            &field("postal_code"),
            &address.postal_code,
            limits.max_postal_code_length,
        )?;

        if address.postal_code.trim().chars().count() < limits.min_postal_code_length {
            return Err(ApiError::Validation(format!(
                "{} must be at least {} characters",
                field("postal_code"),
                limits.min_postal_code_length
            )));
        }
        if address.email.as_deref().is_some_and(|email| !email.contains('@')) {
            return Err(ApiError::Validation(format!(
                "{} is not a valid email address",
                field("email")
            )));
        }
        Ok(())
    }

    /// Validates a checkout request body.
    pub fn create_order(&self, request: &CreateOrderRequest) -> Result<(), ApiError> {
        if request.items.len() > self.limits.max_order_lines {
            return Err(ApiError::Validation(format!(
                "too many order lines (max: {}, got: {})",
                self.limits.max_order_lines,
                request.items.len()
            )));
        }
        self.address("shipping_address", &request.shipping_address)?;
        if let Some(billing) = &request.billing_address {
            self.address("billing_address", billing)?;
        }
        optional(
            "notes",
            request.notes.as_deref(),
            self.limits.max_notes_length,
        )
    }

    /// Validates a payment request. An empty currency means the service default.
    pub fn payment(&self, request: &PaymentRequest) -> Result<(), ApiError> {
        let currency = request.currency.as_str();
        if currency.is_empty() {
            return Ok(());
        }
        if currency.len() != CURRENCY_CODE_LENGTH
            || !currency.chars().all(|c| c.is_ascii_alphabetic())
        {
            return Err(ApiError::Validation(format!(
                "currency must be a 3-letter ISO 4217 code, got {currency:?}"
            )));
        }
        Ok(())
    }

    pub fn details(&self, update: &OrderDetailsUpdate) -> Result<(), ApiError> {
        optional(
            "tracking_number",
            update.tracking_number.as_deref(),
            self.limits.max_tracking_number_length,
        )?;
        optional(
            "internal_notes",
            update.internal_notes.as_deref(),
            self.limits.max_notes_length,
        )
    }

    pub fn product(&self, request: &CreateProductRequest) -> Result<(), ApiError> {
        required("name", &request.name, self.limits.max_product_name_length)?;
        if request.name.trim().chars().count() < self.limits.min_product_name_length {
            return Err(ApiError::Validation(format!(
                "name must be at least {} characters",
                self.limits.min_product_name_length
            )));
        }
        required("sku", &request.sku, self.limits.max_sku_length)?;
        if request.price.is_negative() {
            return Err(ApiError::Validation(
                "price must not be negative".to_string(),
            ));
        }
        if request.price > self.limits.max_price {
            return Err(ApiError::Validation(format!(
                "price exceeds maximum (max: {}, got: {})",
                self.limits.max_price, request.price
            )));
        }
        Ok(())
    }
}
