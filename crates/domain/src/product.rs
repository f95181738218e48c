//! Catalog product as seen by checkout.

use chrono::{DateTime, Utc};
use common::{ProductId, UserId};
use serde::{Deserialize, Serialize};

use crate::order::Money;

/// A purchasable product.
///
/// Stock is a plain counter: decremented when an order is placed and
/// incremented when it is cancelled. There is no hold window.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Product {
    pub id: ProductId,
    pub seller_id: UserId,
    pub name: String,
    pub sku: String,
    pub description: Option<String>,
    pub image: Option<String>,
    pub price: Money,
    pub stock: u32,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Product fields supplied when listing a new product.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewProduct {
    pub seller_id: UserId,
    pub name: String,
    pub sku: String,
    pub description: Option<String>,
    pub image: Option<String>,
    pub price: Money,
    pub stock: u32,
    pub is_active: bool,
}

/// Body of a product listing request. Admins may list on behalf of a seller;
/// sellers always list as themselves.
#[derive(Debug, Clone, Deserialize)]
pub struct CreateProductRequest {
    #[serde(default)]
    pub seller_id: Option<UserId>,
    pub name: String,
    pub sku: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub image: Option<String>,
    pub price: Money,
    #[serde(default)]
    pub stock: u32,
    #[serde(default = "default_active")]
    pub is_active: bool,
}

fn default_active() -> bool {
    true
}

impl CreateProductRequest {
    /// Resolves the request into a product owned by `seller_id`.
    pub fn into_new_product(self, seller_id: UserId) -> NewProduct {
        NewProduct {
            seller_id,
            name: self.name,
            sku: self.sku,
            description: self.description,
            image: self.image,
            price: self.price,
            stock: self.stock,
            is_active: self.is_active,
        }
    }
}
