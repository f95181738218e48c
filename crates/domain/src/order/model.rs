//! Persisted order and line item records.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use common::{OrderId, ProductId, UserId};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::OrderError;
use crate::product::Product;

use super::requests::{CreateOrderRequest, OrderLine};
use super::{Address, Money, OrderStatus, PaymentMethod, PaymentStatus};

/// One line of an order.
///
/// Product details are copied at checkout so historic orders stay stable
/// when the catalog changes. `total_price` is computed once and never
/// re-derived.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderItem {
    pub product_id: ProductId,
    /// Seller that owned the product when the order was placed.
    pub seller_id: UserId,
    pub quantity: u32,
    pub unit_price: Money,
    pub total_price: Money,
    pub product_name: String,
    pub product_sku: String,
    pub product_description: Option<String>,
    pub product_image: Option<String>,
}

impl OrderItem {
    /// Snapshots `product` at its current catalog price.
    pub fn snapshot(product: &Product, quantity: u32) -> Result<Self, OrderError> {
        let total_price =
            product
                .price
                .checked_multiply(quantity)
                .ok_or(OrderError::InvalidAmount {
                    field: "total_price",
                    amount: product.price,
                })?;

        Ok(Self {
            product_id: product.id,
            seller_id: product.seller_id,
            quantity,
            unit_price: product.price,
            total_price,
            product_name: product.name.clone(),
            product_sku: product.sku.clone(),
            product_description: product.description.clone(),
            product_image: product.image.clone(),
        })
    }

    /// Checks a requested line against the catalog and prices it.
    ///
    /// The price always comes from the catalog, never from the client.
    pub fn price_line(line: &OrderLine, product: Option<&Product>) -> Result<Self, OrderError> {
        Self::check_line(line, product, line.quantity)
    }

    /// Prices every line of a request. `products[i]` is the catalog entry for
    /// `lines[i]`.
    ///
    /// Stock is checked against the units requested for a product across
    /// all of its lines, so repeating a product can't exceed what's on hand.
    /// Lines are checked in order and the first failure wins.
    pub fn price_lines(
        lines: &[OrderLine],
        products: &[Option<Product>],
    ) -> Result<Vec<Self>, OrderError> {
        let mut demand: HashMap<ProductId, u32> = HashMap::new();
        for line in lines {
            let units = demand.entry(line.product_id).or_default();
            *units = units.saturating_add(line.quantity);
        }

        lines
            .iter()
            .zip(products)
            .map(|(line, product)| {
                let requested = demand
                    .get(&line.product_id)
                    .copied()
                    .unwrap_or(line.quantity);
                Self::check_line(line, product.as_ref(), requested)
            })
            .collect()
    }

    fn check_line(
        line: &OrderLine,
        product: Option<&Product>,
        requested: u32,
    ) -> Result<Self, OrderError> {
        if line.quantity == 0 {
            return Err(OrderError::InvalidQuantity {
                product_id: line.product_id,
                quantity: line.quantity,
            });
        }

        let product = product.ok_or(OrderError::ProductNotFound(line.product_id))?;

        if !product.is_active {
            return Err(OrderError::ProductInactive {
                product_id: product.id,
                name: product.name.clone(),
            });
        }

        if product.stock < requested {
            return Err(OrderError::InsufficientStock {
                product_id: product.id,
                name: product.name.clone(),
                available: product.stock,
                requested,
            });
        }

        Self::snapshot(product, line.quantity)
    }
}

/// A checkout transaction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Order {
    pub id: OrderId,
    pub order_number: String,
    pub customer_id: UserId,
    pub status: OrderStatus,
    pub payment_status: PaymentStatus,
    pub payment_method: PaymentMethod,
    pub payment_id: Option<String>,
    pub paid_at: Option<DateTime<Utc>>,
    pub subtotal: Money,
    pub tax: Money,
    pub shipping: Money,
    pub discount: Money,
    pub total: Money,
    pub shipping_address: Address,
    pub billing_address: Option<Address>,
    pub tracking_number: Option<String>,
    pub notes: Option<String>,
    pub internal_notes: Option<String>,
    pub items: Vec<OrderItem>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Order {
    /// Total number of units across all lines.
    pub fn item_count(&self) -> u32 {
        self.items.iter().map(|item| item.quantity).sum()
    }

    pub fn is_owned_by(&self, user_id: UserId) -> bool {
        self.customer_id == user_id
    }

    /// Returns true if at least one line belongs to `seller_id`.
    pub fn has_seller(&self, seller_id: UserId) -> bool {
        self.items.iter().any(|item| item.seller_id == seller_id)
    }

    /// Sum of the line totals that belong to `seller_id`.
    pub fn seller_total(&self, seller_id: UserId) -> Money {
        self.items
            .iter()
            .filter(|item| item.seller_id == seller_id)
            .map(|item| item.total_price)
            .sum()
    }
}

/// An order ready to be written; the store assigns the id and timestamps.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewOrder {
    pub order_number: String,
    pub customer_id: UserId,
    pub payment_method: PaymentMethod,
    pub subtotal: Money,
    pub tax: Money,
    pub shipping: Money,
    pub discount: Money,
    pub total: Money,
    pub shipping_address: Address,
    pub billing_address: Option<Address>,
    pub notes: Option<String>,
    pub items: Vec<OrderItem>,
}

impl NewOrder {
    /// Builds a pending order from priced lines.
    ///
    /// `total = subtotal + tax + shipping - discount`, fixed at creation.
    pub fn build(
        customer_id: UserId,
        request: &CreateOrderRequest,
        items: Vec<OrderItem>,
        now: DateTime<Utc>,
    ) -> Result<Self, OrderError> {
        if items.is_empty() {
            return Err(OrderError::EmptyCart);
        }

        for (field, amount) in [
            ("tax", request.tax),
            ("shipping", request.shipping),
            ("discount", request.discount),
        ] {
            if amount.is_negative() {
                return Err(OrderError::InvalidAmount { field, amount });
            }
        }

        let subtotal = items
            .iter()
            .try_fold(Money::zero(), |acc, item| acc.checked_add(item.total_price))
            .ok_or(OrderError::InvalidAmount {
                field: "subtotal",
                amount: Money::from_cents(i64::MAX),
            })?;
        let total = subtotal
            .checked_add(request.tax)
            .and_then(|sum| sum.checked_add(request.shipping))
            .ok_or(OrderError::InvalidAmount {
                field: "total",
                amount: subtotal,
            })?
            .checked_sub(request.discount)
            .filter(|total| !total.is_negative())
            .ok_or(OrderError::InvalidAmount {
                field: "discount",
                amount: request.discount,
            })?;

        Ok(Self {
            order_number: generate_order_number(now),
            customer_id,
            payment_method: request.payment_method,
            subtotal,
            tax: request.tax,
            shipping: request.shipping,
            discount: request.discount,
            total,
            shipping_address: request.shipping_address.clone(),
            billing_address: request.billing_address.clone(),
            notes: request.notes.clone(),
            items,
        })
    }
}

/// Generates a human-readable order number, `ORD-YYYYMMDD-HHMMSS-XXXXXXXX`.
///
/// The suffix is random and independent of the row id, which is not known
/// until after insert.
pub fn generate_order_number(now: DateTime<Utc>) -> String {
    let suffix = Uuid::new_v4().simple().to_string();
    format!(
        "ORD-{}-{}",
        now.format("%Y%m%d-%H%M%S"),
        suffix[..8].to_uppercase()
    )
}
