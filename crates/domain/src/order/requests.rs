//! Inputs accepted by the order workflow.

use common::ProductId;
use serde::{Deserialize, Serialize};

use super::{Address, Money, PaymentMethod};

/// One requested `(product, quantity)` pair. Prices are never taken from
/// the client.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderLine {
    pub product_id: ProductId,
    pub quantity: u32,
}

/// Checkout request: lines plus the snapshot fields copied onto the order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateOrderRequest {
    pub items: Vec<OrderLine>,
    pub shipping_address: Address,
    #[serde(default)]
    pub billing_address: Option<Address>,
    pub payment_method: PaymentMethod,
    #[serde(default)]
    pub tax: Money,
    #[serde(default)]
    pub shipping: Money,
    #[serde(default)]
    pub discount: Money,
    #[serde(default)]
    pub notes: Option<String>,
}

/// Payment handoff parameters. The amount always comes from the stored
/// order total.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentRequest {
    /// ISO 4217 currency code, e.g. `usd`. Empty means the service default.
    #[serde(default)]
    pub currency: String,

    /// Provider-side payment method reference, if the client already
    /// collected one.
    #[serde(default)]
    pub payment_method_id: Option<String>,
}

/// Field-specific order updates that don't go through the status table.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderDetailsUpdate {
    #[serde(default)]
    pub tracking_number: Option<String>,
    #[serde(default)]
    pub internal_notes: Option<String>,
}

impl OrderDetailsUpdate {
    pub fn is_empty(&self) -> bool {
        self.tracking_number.is_none() && self.internal_notes.is_none()
    }
}

/// Limit/offset pagination.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Page {
    pub limit: u32,
    pub offset: u32,
}

impl Page {
    pub const DEFAULT_LIMIT: u32 = 20;
    pub const MAX_LIMIT: u32 = 100;

    /// Creates a page, clamping `limit` into `1..=MAX_LIMIT`.
    pub fn new(limit: u32, offset: u32) -> Self {
        Self {
            limit: limit.clamp(1, Self::MAX_LIMIT),
            offset,
        }
    }

    /// Page from 1-based page number and size, as the HTTP layer receives it.
    pub fn numbered(number: u32, limit: u32) -> Self {
        let page = Self::new(limit, 0);
        Self {
            offset: page.limit.saturating_mul(number.max(1) - 1),
            ..page
        }
    }
}

impl Default for Page {
    fn default() -> Self {
        Self::new(Self::DEFAULT_LIMIT, 0)
    }
}
