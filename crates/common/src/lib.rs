//! Identifier types shared by every crate in the checkout service.

pub mod types;

pub use types::{OrderId, ProductId, UserId};
