//! Persistence for the checkout service.
//!
//! Two narrow contracts, [`CatalogStore`] and [`OrderStore`], each with an
//! in-memory implementation for tests and local runs and a PostgreSQL
//! implementation backed by `sqlx`.

pub mod error;
pub mod memory;
pub mod postgres;
pub mod query;
pub mod store;

pub use error::{Result, StoreError};
pub use memory::{InMemoryCatalog, InMemoryOrderStore};
pub use postgres::{PostgresCatalog, PostgresOrderStore, run_migrations};
pub use query::OrderQuery;
pub use store::{CatalogStore, OrderStore, OrderStoreExt, PaymentRecord};
