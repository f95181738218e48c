//! External services the checkout workflow hands off to.

pub mod payment;

pub use payment::{InMemoryPaymentGateway, IntentStatus, PaymentGateway, PaymentIntent};
