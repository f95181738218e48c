//! Domain layer for the checkout service.
//!
//! This crate holds the pure parts of the order workflow:
//! - the order and line item model with point-in-time product snapshots
//! - the order status transition table
//! - the authorization policy shared by every operation
//! - analytics filter and result types

pub mod analytics;
pub mod error;
pub mod order;
pub mod policy;
pub mod product;

pub use analytics::{AnalyticsQuery, DateRange, OrderAnalytics};
pub use common::{OrderId, ProductId, UserId};
pub use error::OrderError;
pub use order::{
    Address, CreateOrderRequest, Money, NewOrder, Order, OrderDetailsUpdate, OrderItem, OrderLine,
    OrderStatus, Page, ParseStatusError, PaymentMethod, PaymentRequest, PaymentStatus,
    generate_order_number,
};
pub use policy::{Action, Actor, ParseRoleError, Role};
pub use product::{CreateProductRequest, NewProduct, Product};
