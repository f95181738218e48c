use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use common::{OrderId, ProductId, UserId};
use domain::{
    DateRange, Money, NewOrder, NewProduct, Order, OrderDetailsUpdate, OrderStatus, Page, Product,
};

use crate::{OrderQuery, Result};

/// A successful payment to attach to an order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaymentRecord {
    /// Provider-side payment intent id.
    pub payment_id: String,
    pub paid_at: DateTime<Utc>,
}

/// Persistence contract for products and their stock counters.
///
/// All implementations must be thread-safe (Send + Sync).
#[async_trait]
pub trait CatalogStore: Send + Sync {
    /// Inserts a product and returns it with its assigned id.
    async fn create_product(&self, product: NewProduct) -> Result<Product>;

    /// Retrieves a product. Returns None if it doesn't exist.
    async fn get_product(&self, id: ProductId) -> Result<Option<Product>>;

    /// Overwrites the stock counter.
    ///
    /// Paired with a prior [`get_product`](Self::get_product) this is an
    /// unguarded read-modify-write; two writers can lose an update. Use
    /// [`adjust_stock`](Self::adjust_stock) for relative changes.
    async fn update_stock(&self, id: ProductId, new_stock: u32) -> Result<()>;

    /// Adds `delta` to the stock counter in a single conditional update.
    ///
    /// Returns the new stock, or `None` when the result would be negative
    /// (the counter is left unchanged). Fails with `ProductNotFound` for an
    /// unknown product.
    async fn adjust_stock(&self, id: ProductId, delta: i64) -> Result<Option<u32>>;
}

/// Persistence contract for orders and their line items.
#[async_trait]
pub trait OrderStore: Send + Sync {
    /// Writes an order and all of its items in one logical write.
    ///
    /// Returns the stored order with its id and timestamps.
    async fn create_order(&self, order: NewOrder) -> Result<Order>;

    /// Retrieves an order with its items. Returns None if it doesn't exist.
    async fn get_order(&self, id: OrderId) -> Result<Option<Order>>;

    /// Sets the status column only.
    async fn update_status(&self, id: OrderId, status: OrderStatus) -> Result<()>;

    /// Sets whichever of tracking number and internal notes are present.
    async fn update_details(&self, id: OrderId, update: OrderDetailsUpdate) -> Result<()>;

    /// Marks the order confirmed and paid.
    async fn record_payment(&self, id: OrderId, payment: PaymentRecord) -> Result<()>;

    /// Retrieves orders matching a query, newest first.
    async fn list_orders(&self, query: OrderQuery) -> Result<Vec<Order>>;

    /// Counts orders matching a query. Pagination is ignored.
    async fn count_orders(&self, query: OrderQuery) -> Result<u64>;

    /// Counts orders matching a query per status. Pagination and the
    /// status filter are ignored.
    async fn count_by_status(&self, query: OrderQuery) -> Result<BTreeMap<OrderStatus, u64>>;

    /// Sum of totals of delivered orders created within `range`.
    async fn total_revenue(&self, range: DateRange) -> Result<Money>;

    /// Sum of `seller_id`'s line totals on delivered orders created within
    /// `range`.
    async fn revenue_by_seller(&self, seller_id: UserId, range: DateRange) -> Result<Money>;
}

/// Extension trait providing convenience queries for order stores.
#[async_trait]
pub trait OrderStoreExt: OrderStore {
    /// Orders placed by a customer.
    async fn orders_by_customer(&self, customer_id: UserId, page: Page) -> Result<Vec<Order>> {
        self.list_orders(OrderQuery::new().customer(customer_id).page(page))
            .await
    }

    /// Orders containing at least one line from a seller.
    async fn orders_by_seller(&self, seller_id: UserId, page: Page) -> Result<Vec<Order>> {
        self.list_orders(OrderQuery::new().seller(seller_id).page(page))
            .await
    }

    /// Orders currently in a status.
    async fn orders_by_status(&self, status: OrderStatus, page: Page) -> Result<Vec<Order>> {
        self.list_orders(OrderQuery::new().status(status).page(page))
            .await
    }

    /// Orders created within a date range.
    async fn orders_by_date_range(&self, range: DateRange, page: Page) -> Result<Vec<Order>> {
        self.list_orders(OrderQuery::new().range(range).page(page))
            .await
    }
}

// Blanket implementation for all OrderStore implementations
impl<T: OrderStore + ?Sized> OrderStoreExt for T {}

#[async_trait]
impl<T: CatalogStore + ?Sized> CatalogStore for Arc<T> {
    async fn create_product(&self, product: NewProduct) -> Result<Product> {
        (**self).create_product(product).await
    }

    async fn get_product(&self, id: ProductId) -> Result<Option<Product>> {
        (**self).get_product(id).await
    }

    async fn update_stock(&self, id: ProductId, new_stock: u32) -> Result<()> {
        (**self).update_stock(id, new_stock).await
    }

    async fn adjust_stock(&self, id: ProductId, delta: i64) -> Result<Option<u32>> {
        (**self).adjust_stock(id, delta).await
    }
}

#[async_trait]
impl<T: OrderStore + ?Sized> OrderStore for Arc<T> {
    async fn create_order(&self, order: NewOrder) -> Result<Order> {
        (**self).create_order(order).await
    }

    async fn get_order(&self, id: OrderId) -> Result<Option<Order>> {
        (**self).get_order(id).await
    }

    async fn update_status(&self, id: OrderId, status: OrderStatus) -> Result<()> {
        (**self).update_status(id, status).await
    }

    async fn update_details(&self, id: OrderId, update: OrderDetailsUpdate) -> Result<()> {
        (**self).update_details(id, update).await
    }

    async fn record_payment(&self, id: OrderId, payment: PaymentRecord) -> Result<()> {
        (**self).record_payment(id, payment).await
    }

    async fn list_orders(&self, query: OrderQuery) -> Result<Vec<Order>> {
        (**self).list_orders(query).await
    }

    async fn count_orders(&self, query: OrderQuery) -> Result<u64> {
        (**self).count_orders(query).await
    }

    async fn count_by_status(&self, query: OrderQuery) -> Result<BTreeMap<OrderStatus, u64>> {
        (**self).count_by_status(query).await
    }

    async fn total_revenue(&self, range: DateRange) -> Result<Money> {
        (**self).total_revenue(range).await
    }

    async fn revenue_by_seller(&self, seller_id: UserId, range: DateRange) -> Result<Money> {
        (**self).revenue_by_seller(seller_id, range).await
    }
}
