use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use common::{OrderId, ProductId, UserId};
use domain::{
    DateRange, Money, NewOrder, NewProduct, Order, OrderDetailsUpdate, OrderStatus, PaymentStatus,
    Product,
};
use tokio::sync::RwLock;

use crate::{
    OrderQuery, Result, StoreError,
    store::{CatalogStore, OrderStore, PaymentRecord},
};

#[derive(Default)]
struct CatalogState {
    products: HashMap<ProductId, Product>,
    next_id: i64,
    failing_products: HashSet<ProductId>,
}

/// In-memory catalog for tests and local runs.
///
/// Stock adjustments can be made to fail per product to exercise the
/// best-effort paths of checkout and cancellation.
#[derive(Clone, Default)]
pub struct InMemoryCatalog {
    state: Arc<RwLock<CatalogState>>,
}

impl InMemoryCatalog {
    /// Creates a new empty catalog.
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes every stock write for `product_id` fail until cleared.
    pub async fn fail_stock_writes(&self, product_id: ProductId, fail: bool) {
        let mut state = self.state.write().await;
        if fail {
            state.failing_products.insert(product_id);
        } else {
            state.failing_products.remove(&product_id);
        }
    }

    /// Returns the number of products stored.
    pub async fn product_count(&self) -> usize {
        self.state.read().await.products.len()
    }

    fn injected_failure(id: ProductId) -> StoreError {
        StoreError::Database(sqlx::Error::Protocol(format!(
            "injected stock write failure for product {id}"
        )))
    }
}

#[async_trait]
impl CatalogStore for InMemoryCatalog {
    async fn create_product(&self, product: NewProduct) -> Result<Product> {
        let mut state = self.state.write().await;

        if state.products.values().any(|p| p.sku == product.sku) {
            return Err(StoreError::Duplicate {
                field: "sku",
                value: product.sku,
            });
        }

        state.next_id += 1;
        let now = Utc::now();
        let stored = Product {
            id: ProductId::new(state.next_id),
            seller_id: product.seller_id,
            name: product.name,
            sku: product.sku,
            description: product.description,
            image: product.image,
            price: product.price,
            stock: product.stock,
            is_active: product.is_active,
            created_at: now,
            updated_at: now,
        };
        state.products.insert(stored.id, stored.clone());
        Ok(stored)
    }

    async fn get_product(&self, id: ProductId) -> Result<Option<Product>> {
        Ok(self.state.read().await.products.get(&id).cloned())
    }

    async fn update_stock(&self, id: ProductId, new_stock: u32) -> Result<()> {
        let mut state = self.state.write().await;
        if state.failing_products.contains(&id) {
            return Err(Self::injected_failure(id));
        }

        let product = state
            .products
            .get_mut(&id)
            .ok_or(StoreError::ProductNotFound(id))?;
        product.stock = new_stock;
        product.updated_at = Utc::now();
        Ok(())
    }

    async fn adjust_stock(&self, id: ProductId, delta: i64) -> Result<Option<u32>> {
        let mut state = self.state.write().await;
        if state.failing_products.contains(&id) {
            return Err(Self::injected_failure(id));
        }

        let product = state
            .products
            .get_mut(&id)
            .ok_or(StoreError::ProductNotFound(id))?;

        let Ok(next) = u32::try_from(i64::from(product.stock) + delta) else {
            return Ok(None);
        };
        product.stock = next;
        product.updated_at = Utc::now();
        Ok(Some(next))
    }
}

#[derive(Default)]
struct OrderState {
    orders: BTreeMap<OrderId, Order>,
    next_id: i64,
}

/// In-memory order store for tests and local runs.
#[derive(Clone, Default)]
pub struct InMemoryOrderStore {
    state: Arc<RwLock<OrderState>>,
}

impl InMemoryOrderStore {
    /// Creates a new empty order store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number of orders stored.
    pub async fn order_count(&self) -> usize {
        self.state.read().await.orders.len()
    }

    /// Backdates an order, for exercising date-range queries.
    pub async fn set_created_at(&self, id: OrderId, created_at: DateTime<Utc>) -> Result<()> {
        let mut state = self.state.write().await;
        let order = state
            .orders
            .get_mut(&id)
            .ok_or(StoreError::OrderNotFound(id))?;
        order.created_at = created_at;
        Ok(())
    }

    async fn modify<F>(&self, id: OrderId, change: F) -> Result<()>
    where
        F: FnOnce(&mut Order) + Send,
    {
        let mut state = self.state.write().await;
        let order = state
            .orders
            .get_mut(&id)
            .ok_or(StoreError::OrderNotFound(id))?;
        change(order);
        order.updated_at = Utc::now();
        Ok(())
    }

    async fn delivered_in(&self, range: DateRange) -> Vec<Order> {
        let query = OrderQuery::new()
            .status(OrderStatus::Delivered)
            .range(range);
        self.state
            .read()
            .await
            .orders
            .values()
            .filter(|order| query.matches(order))
            .cloned()
            .collect()
    }
}

#[async_trait]
impl OrderStore for InMemoryOrderStore {
    async fn create_order(&self, order: NewOrder) -> Result<Order> {
        let mut state = self.state.write().await;

        if state
            .orders
            .values()
            .any(|o| o.order_number == order.order_number)
        {
            return Err(StoreError::Duplicate {
                field: "order_number",
                value: order.order_number,
            });
        }

        state.next_id += 1;
        let now = Utc::now();
        let stored = Order {
            id: OrderId::new(state.next_id),
            order_number: order.order_number,
            customer_id: order.customer_id,
            status: OrderStatus::Pending,
            payment_status: PaymentStatus::Pending,
            payment_method: order.payment_method,
            payment_id: None,
            paid_at: None,
            subtotal: order.subtotal,
            tax: order.tax,
            shipping: order.shipping,
            discount: order.discount,
            total: order.total,
            shipping_address: order.shipping_address,
            billing_address: order.billing_address,
            tracking_number: None,
            notes: order.notes,
            internal_notes: None,
            items: order.items,
            created_at: now,
            updated_at: now,
        };
        state.orders.insert(stored.id, stored.clone());
        Ok(stored)
    }

    async fn get_order(&self, id: OrderId) -> Result<Option<Order>> {
        Ok(self.state.read().await.orders.get(&id).cloned())
    }

    async fn update_status(&self, id: OrderId, status: OrderStatus) -> Result<()> {
        self.modify(id, |order| order.status = status).await
    }

    async fn update_details(&self, id: OrderId, update: OrderDetailsUpdate) -> Result<()> {
        self.modify(id, |order| {
            if let Some(tracking_number) = update.tracking_number {
                order.tracking_number = Some(tracking_number);
            }
            if let Some(internal_notes) = update.internal_notes {
                order.internal_notes = Some(internal_notes);
            }
        })
        .await
    }

    async fn record_payment(&self, id: OrderId, payment: PaymentRecord) -> Result<()> {
        let mut state = self.state.write().await;
        let order = state
            .orders
            .get_mut(&id)
            .ok_or(StoreError::OrderNotFound(id))?;
        if order.status != OrderStatus::Pending {
            return Err(StoreError::NotPending {
                id,
                status: order.status,
            });
        }

        order.status = OrderStatus::Confirmed;
        order.payment_status = PaymentStatus::Paid;
        order.payment_id = Some(payment.payment_id);
        order.paid_at = Some(payment.paid_at);
        order.updated_at = Utc::now();
        Ok(())
    }

    async fn list_orders(&self, query: OrderQuery) -> Result<Vec<Order>> {
        let state = self.state.read().await;
        let mut orders: Vec<_> = state
            .orders
            .values()
            .filter(|order| query.matches(order))
            .cloned()
            .collect();

        // Newest first, id breaks ties
        orders.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));

        let offset = query.offset.unwrap_or(0) as usize;
        let limit = query.limit.map_or(usize::MAX, |l| l as usize);
        Ok(orders.into_iter().skip(offset).take(limit).collect())
    }

    async fn count_orders(&self, query: OrderQuery) -> Result<u64> {
        let state = self.state.read().await;
        Ok(state
            .orders
            .values()
            .filter(|order| query.matches(order))
            .count() as u64)
    }

    async fn count_by_status(&self, query: OrderQuery) -> Result<BTreeMap<OrderStatus, u64>> {
        let query = OrderQuery {
            status: None,
            ..query
        };
        let state = self.state.read().await;
        let mut counts = BTreeMap::new();
        for order in state.orders.values().filter(|order| query.matches(order)) {
            *counts.entry(order.status).or_insert(0) += 1;
        }
        Ok(counts)
    }

    async fn total_revenue(&self, range: DateRange) -> Result<Money> {
        Ok(self
            .delivered_in(range)
            .await
            .iter()
            .map(|order| order.total)
            .sum())
    }

    async fn revenue_by_seller(&self, seller_id: UserId, range: DateRange) -> Result<Money> {
        Ok(self
            .delivered_in(range)
            .await
            .iter()
            .map(|order| order.seller_total(seller_id))
            .sum())
    }
}
