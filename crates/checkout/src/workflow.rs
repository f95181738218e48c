//! Order workflow: checkout, status changes, cancellation, payment and
//! analytics on top of the catalog, order store and payment gateway.

use std::collections::HashMap;

use chrono::Utc;
use common::{OrderId, ProductId};
use domain::{
    Action, Actor, AnalyticsQuery, CreateOrderRequest, CreateProductRequest, Money, NewOrder,
    Order, OrderAnalytics, OrderDetailsUpdate, OrderError, OrderItem, OrderStatus, Page,
    PaymentRequest, Product, policy,
};
use futures_util::future::try_join_all;
use serde::Serialize;
use store::{CatalogStore, OrderQuery, OrderStore, OrderStoreExt, PaymentRecord, StoreError};

use crate::error::{CheckoutError, Result};
use crate::services::PaymentGateway;
use crate::stock::{AdjustmentOutcome, StockAdjustment, StockReport};

/// Currency used when a payment request doesn't name one.
pub const DEFAULT_CURRENCY: &str = "usd";

/// A newly placed order and the stock decrements made for it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Placed {
    pub order: Order,
    pub stock: StockReport,
}

/// A status change. `stock` is only populated when the order was cancelled.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StatusChanged {
    pub order: Order,
    pub previous: OrderStatus,
    pub stock: StockReport,
}

/// A cancelled order and the stock restored for it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Cancelled {
    pub order: Order,
    pub stock: StockReport,
}

/// Outcome of a successful payment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PaymentReceipt {
    /// Payment intent id from the gateway.
    pub transaction_id: String,
    pub status: OrderStatus,
    pub amount: Money,
}

/// Drives every order operation.
///
/// Holds no mutable state of its own, so one instance is shared behind an
/// `Arc` by all request handlers. Every operation authorizes through
/// [`domain::policy`] before touching a store.
pub struct OrderWorkflow<C, O, P>
where
    C: CatalogStore,
    O: OrderStore,
    P: PaymentGateway,
{
    catalog: C,
    orders: O,
    payments: P,
    default_currency: String,
}

impl<C, O, P> OrderWorkflow<C, O, P>
where
    C: CatalogStore,
    O: OrderStore,
    P: PaymentGateway,
{
    /// Creates a new workflow.
    pub fn new(catalog: C, orders: O, payments: P) -> Self {
        Self {
            catalog,
            orders,
            payments,
            default_currency: DEFAULT_CURRENCY.to_string(),
        }
    }

    /// Sets the currency used when a payment request leaves it empty.
    pub fn with_currency(mut self, currency: impl Into<String>) -> Self {
        self.default_currency = currency.into();
        self
    }

    pub fn catalog(&self) -> &C {
        &self.catalog
    }

    pub fn orders(&self) -> &O {
        &self.orders
    }

    pub fn payments(&self) -> &P {
        &self.payments
    }

    /// Places an order for `actor`.
    ///
    /// Lines are validated in request order and the first failure wins.
    /// A product listed on several lines is checked against its combined
    /// quantity. Nothing is written until every line passes. Stock is decremented
    /// after the order is stored; those decrements are best-effort and
    /// reported, never rolled back.
    #[tracing::instrument(
        skip(self, request),
        fields(customer_id = %actor.user_id, lines = request.items.len())
    )]
    pub async fn create_order(&self, actor: &Actor, request: CreateOrderRequest) -> Result<Placed> {
        let started = std::time::Instant::now();
        policy::authorize(actor, Action::PlaceOrder)?;

        if request.items.is_empty() {
            return Err(OrderError::EmptyCart.into());
        }
        if let Some(line) = request.items.iter().find(|line| line.quantity == 0) {
            return Err(OrderError::InvalidQuantity {
                product_id: line.product_id,
                quantity: line.quantity,
            }
            .into());
        }

        let products = try_join_all(
            request
                .items
                .iter()
                .map(|line| self.fetch_product(line.product_id)),
        )
        .await?;

        let items = OrderItem::price_lines(&request.items, &products)?;

        let new_order = NewOrder::build(actor.user_id, &request, items, Utc::now())?;
        let order = self
            .orders
            .create_order(new_order)
            .await
            .map_err(CheckoutError::store("failed to create order"))?;

        let stock = self.adjust_stock(order.id, &order.items, -1).await;

        metrics::counter!("orders_created_total").increment(1);
        metrics::histogram!("checkout_duration_seconds").record(started.elapsed().as_secs_f64());
        tracing::info!(
            order_id = %order.id,
            order_number = %order.order_number,
            total = %order.total,
            "order placed"
        );

        Ok(Placed { order, stock })
    }

    /// Moves an order along the status table.
    ///
    /// Only the status column is written. A move to `cancelled` also
    /// restores stock the same way [`cancel_order`](Self::cancel_order) does.
    #[tracing::instrument(skip(self))]
    pub async fn update_order_status(
        &self,
        order_id: OrderId,
        requested: OrderStatus,
        actor: &Actor,
    ) -> Result<StatusChanged> {
        let mut order = self.load_order(order_id).await?;
        policy::authorize_order(actor, Action::UpdateStatus, &order)?;

        let previous = order.status;
        if !previous.can_transition_to(requested) {
            return Err(OrderError::InvalidTransition {
                from: previous,
                to: requested,
            }
            .into());
        }

        self.orders
            .update_status(order_id, requested)
            .await
            .map_err(CheckoutError::store("failed to update order status"))?;

        order.status = requested;
        order.updated_at = Utc::now();

        let stock = if requested == OrderStatus::Cancelled {
            metrics::counter!("orders_cancelled_total").increment(1);
            self.adjust_stock(order_id, &order.items, 1).await
        } else {
            StockReport::new()
        };

        metrics::counter!(
            "order_status_transitions_total",
            "from" => previous.as_str(),
            "to" => requested.as_str()
        )
        .increment(1);
        tracing::info!(%order_id, from = %previous, to = %requested, "order status updated");

        Ok(StatusChanged {
            order,
            previous,
            stock,
        })
    }

    /// Cancels a pending or confirmed order and puts its stock back.
    #[tracing::instrument(skip(self))]
    pub async fn cancel_order(&self, order_id: OrderId, actor: &Actor) -> Result<Cancelled> {
        let mut order = self.load_order(order_id).await?;
        policy::authorize_order(actor, Action::CancelOrder, &order)?;

        if !order.status.can_cancel() {
            return Err(OrderError::NotCancellable {
                status: order.status,
            }
            .into());
        }

        let previous = order.status;
        self.orders
            .update_status(order_id, OrderStatus::Cancelled)
            .await
            .map_err(CheckoutError::store("failed to cancel order"))?;

        order.status = OrderStatus::Cancelled;
        order.updated_at = Utc::now();

        let stock = self.adjust_stock(order_id, &order.items, 1).await;

        metrics::counter!("orders_cancelled_total").increment(1);
        metrics::counter!(
            "order_status_transitions_total",
            "from" => previous.as_str(),
            "to" => OrderStatus::Cancelled.as_str()
        )
        .increment(1);
        tracing::info!(%order_id, "order cancelled");

        Ok(Cancelled { order, stock })
    }

    /// Charges a pending order's stored total through the gateway.
    ///
    /// Creates an intent, confirms it, then marks the order confirmed and
    /// paid. A gateway failure surfaces as-is and leaves the order
    /// untouched; nothing is retried.
    #[tracing::instrument(skip(self, request))]
    pub async fn process_payment(
        &self,
        order_id: OrderId,
        request: PaymentRequest,
        actor: &Actor,
    ) -> Result<PaymentReceipt> {
        let order = self.load_order(order_id).await?;
        policy::authorize_order(actor, Action::PayOrder, &order)?;

        if order.status != OrderStatus::Pending {
            return Err(OrderError::OrderNotPending {
                status: order.status,
            }
            .into());
        }

        let currency = if request.currency.trim().is_empty() {
            self.default_currency.clone()
        } else {
            request.currency.to_lowercase()
        };

        let mut metadata = HashMap::from([
            ("order_id".to_string(), order.id.to_string()),
            ("order_number".to_string(), order.order_number.clone()),
            ("customer_id".to_string(), order.customer_id.to_string()),
        ]);
        if let Some(method) = request.payment_method_id {
            metadata.insert("payment_method_id".to_string(), method);
        }

        let intent = match self
            .payments
            .create_payment_intent(order.total, &currency, metadata)
            .await
        {
            Ok(intent) => intent,
            Err(e) => {
                metrics::counter!("payments_total", "outcome" => "failed").increment(1);
                tracing::warn!(%order_id, error = %e, "payment intent creation failed");
                return Err(CheckoutError::payment("payment processing failed")(e));
            }
        };

        if let Err(e) = self.payments.confirm_payment(&intent.id).await {
            metrics::counter!("payments_total", "outcome" => "failed").increment(1);
            tracing::warn!(%order_id, intent_id = %intent.id, error = %e, "payment confirmation failed");
            return Err(CheckoutError::payment("payment confirmation failed")(e));
        }

        self.orders
            .record_payment(
                order_id,
                PaymentRecord {
                    payment_id: intent.id.clone(),
                    paid_at: Utc::now(),
                },
            )
            .await
            .map_err(|e| match e {
                StoreError::NotPending { status, .. } => {
                    tracing::warn!(
                        %order_id,
                        intent_id = %intent.id,
                        %status,
                        "order changed during payment"
                    );
                    OrderError::OrderNotPending { status }.into()
                }
                e => CheckoutError::store("failed to update order status after payment")(e),
            })?;

        metrics::counter!("payments_total", "outcome" => "succeeded").increment(1);
        tracing::info!(%order_id, intent_id = %intent.id, amount = %order.total, "payment captured");

        Ok(PaymentReceipt {
            transaction_id: intent.id,
            status: OrderStatus::Confirmed,
            amount: order.total,
        })
    }

    /// Revenue and order counts, scoped by the actor's role.
    ///
    /// Revenue counts delivered orders only. A seller-scoped view sums that
    /// seller's line totals rather than whole order totals; the counts cover
    /// every order containing one of the seller's lines.
    #[tracing::instrument(skip(self))]
    pub async fn order_analytics(
        &self,
        actor: &Actor,
        query: AnalyticsQuery,
    ) -> Result<OrderAnalytics> {
        let seller_id = policy::analytics_scope(actor, query.seller_id)?;

        let total_revenue = match seller_id {
            Some(seller_id) => self.orders.revenue_by_seller(seller_id, query.range).await,
            None => self.orders.total_revenue(query.range).await,
        }
        .map_err(CheckoutError::store("failed to compute revenue"))?;

        let scope = OrderQuery::new()
            .maybe_seller(seller_id)
            .range(query.range);
        let total_orders = self
            .orders
            .count_orders(scope.clone())
            .await
            .map_err(CheckoutError::store("failed to count orders"))?;
        let orders_by_status = self
            .orders
            .count_by_status(scope)
            .await
            .map_err(CheckoutError::store("failed to count orders by status"))?;

        Ok(OrderAnalytics {
            seller_id,
            total_revenue,
            total_orders,
            orders_by_status,
        })
    }

    /// Loads an order the actor is allowed to see.
    #[tracing::instrument(skip(self))]
    pub async fn get_order(&self, order_id: OrderId, actor: &Actor) -> Result<Order> {
        let order = self.load_order(order_id).await?;
        policy::authorize_order(actor, Action::ViewOrder, &order)?;
        Ok(order)
    }

    /// The actor's own orders, newest first.
    pub async fn customer_orders(&self, actor: &Actor, page: Page) -> Result<Vec<Order>> {
        self.orders
            .orders_by_customer(actor.user_id, page)
            .await
            .map_err(CheckoutError::store("failed to list customer orders"))
    }

    /// Orders in `status`. Sellers only see orders containing their lines.
    pub async fn orders_by_status(
        &self,
        status: OrderStatus,
        actor: &Actor,
        page: Page,
    ) -> Result<Vec<Order>> {
        let seller_id = policy::seller_scope(actor, Action::ListOrdersByStatus)?;
        self.orders
            .list_orders(
                OrderQuery::new()
                    .status(status)
                    .maybe_seller(seller_id)
                    .page(page),
            )
            .await
            .map_err(CheckoutError::store("failed to list orders by status"))
    }

    /// Orders containing at least one of the seller's lines.
    pub async fn seller_orders(&self, actor: &Actor, page: Page) -> Result<Vec<Order>> {
        let seller_id = policy::seller_scope(actor, Action::ListSellerOrders)?;
        self.orders
            .list_orders(OrderQuery::new().maybe_seller(seller_id).page(page))
            .await
            .map_err(CheckoutError::store("failed to list seller orders"))
    }

    /// Every order. Admin only.
    pub async fn all_orders(&self, actor: &Actor, page: Page) -> Result<Vec<Order>> {
        policy::authorize(actor, Action::ListAllOrders)?;
        self.orders
            .list_orders(OrderQuery::new().page(page))
            .await
            .map_err(CheckoutError::store("failed to list orders"))
    }

    /// Sets tracking number and/or internal notes without touching status.
    #[tracing::instrument(skip(self, update))]
    pub async fn update_order_details(
        &self,
        order_id: OrderId,
        update: OrderDetailsUpdate,
        actor: &Actor,
    ) -> Result<Order> {
        let mut order = self.load_order(order_id).await?;
        policy::authorize_order(actor, Action::UpdateDetails, &order)?;

        if update.is_empty() {
            return Ok(order);
        }

        self.orders
            .update_details(order_id, update.clone())
            .await
            .map_err(CheckoutError::store("failed to update order"))?;

        if let Some(tracking_number) = update.tracking_number {
            order.tracking_number = Some(tracking_number);
        }
        if let Some(internal_notes) = update.internal_notes {
            order.internal_notes = Some(internal_notes);
        }
        order.updated_at = Utc::now();

        Ok(order)
    }

    /// Lists a product. Sellers list as themselves; admins may list for any
    /// seller.
    #[tracing::instrument(skip(self, request), fields(sku = %request.sku))]
    pub async fn create_product(
        &self,
        actor: &Actor,
        request: CreateProductRequest,
    ) -> Result<Product> {
        let seller_id = policy::listing_seller(actor, request.seller_id)?;
        let product = self
            .catalog
            .create_product(request.into_new_product(seller_id))
            .await
            .map_err(CheckoutError::store("failed to create product"))?;

        tracing::info!(product_id = %product.id, %seller_id, "product listed");
        Ok(product)
    }

    pub async fn get_product(&self, product_id: ProductId) -> Result<Product> {
        self.fetch_product(product_id)
            .await?
            .ok_or_else(|| OrderError::ProductNotFound(product_id).into())
    }

    /// Overwrites a product's stock counter. Owning seller or admin only.
    #[tracing::instrument(skip(self))]
    pub async fn restock(
        &self,
        product_id: ProductId,
        new_stock: u32,
        actor: &Actor,
    ) -> Result<Product> {
        let mut product = self.get_product(product_id).await?;
        policy::authorize_product(actor, &product)?;

        self.catalog
            .update_stock(product_id, new_stock)
            .await
            .map_err(CheckoutError::store(format!(
                "failed to update stock for product {product_id}"
            )))?;

        product.stock = new_stock;
        product.updated_at = Utc::now();
        Ok(product)
    }

    async fn fetch_product(&self, product_id: ProductId) -> Result<Option<Product>> {
        self.catalog
            .get_product(product_id)
            .await
            .map_err(CheckoutError::store(format!(
                "failed to get product {product_id}"
            )))
    }

    async fn load_order(&self, order_id: OrderId) -> Result<Order> {
        self.orders
            .get_order(order_id)
            .await
            .map_err(CheckoutError::store(format!("failed to get order {order_id}")))?
            .ok_or_else(|| OrderError::OrderNotFound(order_id).into())
    }

    /// Applies `sign * quantity` to each line's product, one call per line.
    ///
    /// Failures are logged and recorded; they never abort the caller.
    async fn adjust_stock(&self, order_id: OrderId, items: &[OrderItem], sign: i64) -> StockReport {
        let mut report = StockReport::new();

        for item in items {
            let delta = sign * i64::from(item.quantity);
            let outcome = match self.catalog.adjust_stock(item.product_id, delta).await {
                Ok(Some(stock)) => AdjustmentOutcome::Applied { stock },
                Ok(None) => {
                    tracing::warn!(
                        %order_id,
                        product_id = %item.product_id,
                        delta,
                        "stock adjustment refused: counter would go negative"
                    );
                    AdjustmentOutcome::Refused
                }
                Err(e) => {
                    tracing::warn!(
                        %order_id,
                        product_id = %item.product_id,
                        delta,
                        error = %e,
                        "stock adjustment failed"
                    );
                    AdjustmentOutcome::Failed {
                        reason: e.to_string(),
                    }
                }
            };

            if !matches!(outcome, AdjustmentOutcome::Applied { .. }) {
                metrics::counter!("stock_adjustment_failures_total").increment(1);
            }

            report.push(StockAdjustment {
                product_id: item.product_id,
                delta,
                outcome,
            });
        }

        report
    }
}
