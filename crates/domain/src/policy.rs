//! Authorization policy shared by every order and catalog operation.
//!
//! Role rules live here and nowhere else:
//! - admins may do anything;
//! - sellers act on orders that contain at least one of their lines, and on
//!   products they own;
//! - customers act on their own orders, but never drive the status table.

use common::UserId;
use serde::{Deserialize, Serialize};

use crate::error::OrderError;
use crate::order::Order;
use crate::product::Product;

/// Role attached to an authenticated user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Customer,
    Seller,
    Admin,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Customer => "customer",
            Role::Seller => "seller",
            Role::Admin => "admin",
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when parsing an unknown role name.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown role: {0}")]
pub struct ParseRoleError(pub String);

impl std::str::FromStr for Role {
    type Err = ParseRoleError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "customer" => Ok(Role::Customer),
            "seller" => Ok(Role::Seller),
            "admin" => Ok(Role::Admin),
            other => Err(ParseRoleError(other.to_string())),
        }
    }
}

/// The user on whose behalf an operation runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Actor {
    pub user_id: UserId,
    pub role: Role,
}

impl Actor {
    pub fn new(user_id: UserId, role: Role) -> Self {
        Self { user_id, role }
    }

    pub fn customer(user_id: impl Into<UserId>) -> Self {
        Self::new(user_id.into(), Role::Customer)
    }

    pub fn seller(user_id: impl Into<UserId>) -> Self {
        Self::new(user_id.into(), Role::Seller)
    }

    pub fn admin(user_id: impl Into<UserId>) -> Self {
        Self::new(user_id.into(), Role::Admin)
    }

    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }
}

/// Operations subject to authorization.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Action {
    PlaceOrder,
    ViewOrder,
    UpdateStatus,
    UpdateDetails,
    CancelOrder,
    PayOrder,
    ListAllOrders,
    ListSellerOrders,
    ListOrdersByStatus,
    ViewAnalytics,
    ManageProduct,
}

impl std::fmt::Display for Action {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let text = match self {
            Action::PlaceOrder => "place orders",
            Action::ViewOrder => "view this order",
            Action::UpdateStatus => "update this order's status",
            Action::UpdateDetails => "update this order",
            Action::CancelOrder => "cancel this order",
            Action::PayOrder => "pay for this order",
            Action::ListAllOrders => "list all orders",
            Action::ListSellerOrders => "list seller orders",
            Action::ListOrdersByStatus => "list orders by status",
            Action::ViewAnalytics => "view order analytics",
            Action::ManageProduct => "manage this product",
        };
        f.write_str(text)
    }
}

fn deny(action: Action) -> OrderError {
    OrderError::Unauthorized { action }
}

/// Checks an action that isn't scoped to a particular order or product.
pub fn authorize(actor: &Actor, action: Action) -> Result<(), OrderError> {
    let allowed = match actor.role {
        Role::Admin => true,
        Role::Seller => matches!(
            action,
            Action::PlaceOrder
                | Action::ListSellerOrders
                | Action::ListOrdersByStatus
                | Action::ViewAnalytics
                | Action::ManageProduct
        ),
        Role::Customer => matches!(action, Action::PlaceOrder),
    };

    if allowed { Ok(()) } else { Err(deny(action)) }
}

/// Checks an action against a specific order.
pub fn authorize_order(actor: &Actor, action: Action, order: &Order) -> Result<(), OrderError> {
    let owner = order.is_owned_by(actor.user_id);
    let seller = actor.role == Role::Seller && order.has_seller(actor.user_id);

    let allowed = match (actor.role, action) {
        (Role::Admin, _) => true,
        (_, Action::ViewOrder) => owner || seller,
        (Role::Seller, Action::UpdateStatus | Action::UpdateDetails) => seller,
        (_, Action::CancelOrder | Action::PayOrder) => owner,
        _ => false,
    };

    if allowed { Ok(()) } else { Err(deny(action)) }
}

/// Checks a catalog mutation against the product's owner.
pub fn authorize_product(actor: &Actor, product: &Product) -> Result<(), OrderError> {
    match actor.role {
        Role::Admin => Ok(()),
        Role::Seller if product.seller_id == actor.user_id => Ok(()),
        _ => Err(deny(Action::ManageProduct)),
    }
}

/// Seller filter applied to order listings. Admins see everything; sellers
/// only orders containing their lines.
pub fn seller_scope(actor: &Actor, action: Action) -> Result<Option<UserId>, OrderError> {
    authorize(actor, action)?;
    Ok(match actor.role {
        Role::Seller => Some(actor.user_id),
        _ => None,
    })
}

/// Resolves the seller an analytics request may see.
///
/// Sellers are pinned to themselves; asking for another seller is refused.
/// Admins get whatever they asked for, including the unscoped view.
pub fn analytics_scope(
    actor: &Actor,
    requested: Option<UserId>,
) -> Result<Option<UserId>, OrderError> {
    authorize(actor, Action::ViewAnalytics)?;
    match actor.role {
        Role::Admin => Ok(requested),
        _ => match requested {
            Some(other) if other != actor.user_id => Err(deny(Action::ViewAnalytics)),
            _ => Ok(Some(actor.user_id)),
        },
    }
}

/// Resolves which seller owns a product being listed.
pub fn listing_seller(actor: &Actor, requested: Option<UserId>) -> Result<UserId, OrderError> {
    authorize(actor, Action::ManageProduct)?;
    match (actor.role, requested) {
        (Role::Admin, Some(seller)) => Ok(seller),
        (Role::Seller, Some(seller)) if seller != actor.user_id => {
            Err(deny(Action::ManageProduct))
        }
        _ => Ok(actor.user_id),
    }
}
