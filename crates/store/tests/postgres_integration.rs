//! PostgreSQL integration tests
//!
//! These tests use a shared PostgreSQL container for efficiency.
//! Run with:
//!
//! ```bash
//! cargo test -p store --test postgres_integration -- --test-threads=1
//! ```

use std::sync::Arc;

use chrono::{Duration, Utc};
use common::{OrderId, ProductId, UserId};
use domain::{
    Address, DateRange, Money, NewOrder, NewProduct, OrderDetailsUpdate, OrderItem, OrderStatus,
    Page, PaymentMethod, PaymentStatus, generate_order_number,
};
use sqlx::PgPool;
use store::{
    CatalogStore, OrderQuery, OrderStore, OrderStoreExt, PaymentRecord, PostgresCatalog,
    PostgresOrderStore, StoreError,
};
use testcontainers::{ContainerAsync, runners::AsyncRunner};
use testcontainers_modules::postgres::Postgres;
use tokio::sync::OnceCell;

/// Shared container info - container stays alive for all tests
struct ContainerInfo {
    #[allow(dead_code)] // Container must stay alive for tests
    container: ContainerAsync<Postgres>,
    connection_string: String,
}

/// Global shared container
static CONTAINER: OnceCell<Arc<ContainerInfo>> = OnceCell::const_new();

async fn get_container_info() -> Arc<ContainerInfo> {
    CONTAINER
        .get_or_init(|| async {
            let container = Postgres::default().start().await.unwrap();

            let host = container.get_host().await.unwrap();
            let port = container.get_host_port_ipv4(5432).await.unwrap();

            let connection_string =
                format!("postgres://postgres:postgres@{}:{}/postgres", host, port);

            let temp_pool = PgPool::connect(&connection_string).await.unwrap();

            sqlx::raw_sql(include_str!(
                "../../../migrations/001_create_catalog_and_orders.sql"
            ))
            .execute(&temp_pool)
            .await
            .unwrap();

            temp_pool.close().await;

            Arc::new(ContainerInfo {
                container,
                connection_string,
            })
        })
        .await
        .clone()
}

/// Get fresh stores sharing one pool, with cleared tables
async fn get_test_stores() -> (PostgresCatalog, PostgresOrderStore) {
    let info = get_container_info().await;

    let pool = sqlx::postgres::PgPoolOptions::new()
        .max_connections(5)
        .connect(&info.connection_string)
        .await
        .unwrap();

    sqlx::query("TRUNCATE TABLE order_items, orders, products RESTART IDENTITY")
        .execute(&pool)
        .await
        .unwrap();

    (
        PostgresCatalog::new(pool.clone()),
        PostgresOrderStore::new(pool),
    )
}

fn new_product(seller: i64, sku: &str, stock: u32) -> NewProduct {
    NewProduct {
        seller_id: UserId::new(seller),
        name: format!("Product {sku}"),
        sku: sku.to_string(),
        description: Some("Integration test product".into()),
        image: None,
        price: Money::from_cents(2500),
        stock,
        is_active: true,
    }
}

fn address() -> Address {
    Address {
        first_name: "Ada".into(),
        last_name: "Lovelace".into(),
        email: Some("ada@example.com".into()),
        phone: None,
        street: "12 St James's Square".into(),
        city: "London".into(),
        state: "LDN".into(),
        country: "GB".into(),
        postal_code: "SW1Y 4JH".into(),
    }
}

fn item(product: i64, seller: i64, quantity: u32, unit_cents: i64) -> OrderItem {
    OrderItem {
        product_id: ProductId::new(product),
        seller_id: UserId::new(seller),
        quantity,
        unit_price: Money::from_cents(unit_cents),
        total_price: Money::from_cents(unit_cents * i64::from(quantity)),
        product_name: format!("Product {product}"),
        product_sku: format!("SKU-{product}"),
        product_description: None,
        product_image: None,
    }
}

fn new_order(customer: i64, items: Vec<OrderItem>) -> NewOrder {
    let subtotal: Money = items.iter().map(|i| i.total_price).sum();
    let tax = Money::from_cents(100);
    NewOrder {
        order_number: generate_order_number(Utc::now()),
        customer_id: UserId::new(customer),
        payment_method: PaymentMethod::Card,
        subtotal,
        tax,
        shipping: Money::zero(),
        discount: Money::zero(),
        total: subtotal + tax,
        shipping_address: address(),
        billing_address: None,
        notes: Some("leave at the door".into()),
        items,
    }
}

async fn backdate(store: &PostgresOrderStore, id: OrderId, days: i64) {
    sqlx::query("UPDATE orders SET created_at = NOW() - make_interval(days => $2) WHERE id = $1")
        .bind(id.get())
        .bind(days as i32)
        .execute(store.pool())
        .await
        .unwrap();
}

#[tokio::test]
async fn create_and_get_product() {
    let (catalog, _) = get_test_stores().await;

    let product = catalog
        .create_product(new_product(7, "PG-SKU-1", 10))
        .await
        .unwrap();
    let loaded = catalog.get_product(product.id).await.unwrap().unwrap();

    assert_eq!(loaded.name, "Product PG-SKU-1");
    assert_eq!(loaded.seller_id, UserId::new(7));
    assert_eq!(loaded.price, Money::from_cents(2500));
    assert_eq!(loaded.stock, 10);
    assert!(loaded.is_active);
}

#[tokio::test]
async fn missing_product_is_none() {
    let (catalog, _) = get_test_stores().await;
    assert!(catalog.get_product(ProductId::new(404)).await.unwrap().is_none());
}

#[tokio::test]
async fn duplicate_sku_is_rejected() {
    let (catalog, _) = get_test_stores().await;

    catalog
        .create_product(new_product(1, "PG-DUP", 1))
        .await
        .unwrap();
    let result = catalog.create_product(new_product(2, "PG-DUP", 1)).await;

    assert!(matches!(
        result,
        Err(StoreError::Duplicate { field: "sku", .. })
    ));
}

#[tokio::test]
async fn adjust_stock_is_conditional() {
    let (catalog, _) = get_test_stores().await;
    let product = catalog
        .create_product(new_product(1, "PG-STOCK", 3))
        .await
        .unwrap();

    assert_eq!(catalog.adjust_stock(product.id, -2).await.unwrap(), Some(1));
    assert_eq!(catalog.adjust_stock(product.id, -2).await.unwrap(), None);
    assert_eq!(
        catalog.get_product(product.id).await.unwrap().unwrap().stock,
        1
    );
    assert_eq!(catalog.adjust_stock(product.id, 4).await.unwrap(), Some(5));

    let missing = catalog.adjust_stock(ProductId::new(999), 1).await;
    assert!(matches!(missing, Err(StoreError::ProductNotFound(_))));
}

#[tokio::test]
async fn concurrent_decrements_never_oversell() {
    let (catalog, _) = get_test_stores().await;
    let product = catalog
        .create_product(new_product(1, "PG-RACE", 5))
        .await
        .unwrap();

    let mut handles = Vec::new();
    for _ in 0..10 {
        let catalog = catalog.clone();
        handles.push(tokio::spawn(async move {
            catalog.adjust_stock(product.id, -1).await.unwrap()
        }));
    }

    let mut applied = 0;
    for handle in handles {
        if handle.await.unwrap().is_some() {
            applied += 1;
        }
    }

    assert_eq!(applied, 5);
    assert_eq!(
        catalog.get_product(product.id).await.unwrap().unwrap().stock,
        0
    );
}

#[tokio::test]
async fn update_stock_overwrites() {
    let (catalog, _) = get_test_stores().await;
    let product = catalog
        .create_product(new_product(1, "PG-RESTOCK", 3))
        .await
        .unwrap();

    catalog.update_stock(product.id, 40).await.unwrap();
    assert_eq!(
        catalog.get_product(product.id).await.unwrap().unwrap().stock,
        40
    );

    let missing = catalog.update_stock(ProductId::new(999), 1).await;
    assert!(matches!(missing, Err(StoreError::ProductNotFound(_))));
}

#[tokio::test]
async fn create_order_writes_items_in_order() {
    let (_, orders) = get_test_stores().await;

    let created = orders
        .create_order(new_order(
            1,
            vec![item(3, 10, 2, 1500), item(1, 11, 1, 999)],
        ))
        .await
        .unwrap();

    assert_eq!(created.status, OrderStatus::Pending);
    assert_eq!(created.payment_status, PaymentStatus::Pending);
    assert_eq!(created.subtotal, Money::from_cents(3999));
    assert_eq!(created.total, Money::from_cents(4099));

    let loaded = orders.get_order(created.id).await.unwrap().unwrap();
    assert_eq!(loaded.items.len(), 2);
    assert_eq!(loaded.items[0].product_id, ProductId::new(3));
    assert_eq!(loaded.items[1].seller_id, UserId::new(11));
    assert_eq!(loaded.shipping_address, address());
    assert_eq!(loaded.notes.as_deref(), Some("leave at the door"));
    assert_eq!(loaded.order_number, created.order_number);
}

#[tokio::test]
async fn duplicate_order_number_is_rejected() {
    let (_, orders) = get_test_stores().await;

    let first = new_order(1, vec![item(1, 10, 1, 100)]);
    let mut second = new_order(2, vec![item(1, 10, 1, 100)]);
    second.order_number = first.order_number.clone();

    orders.create_order(first).await.unwrap();
    let result = orders.create_order(second).await;

    assert!(matches!(
        result,
        Err(StoreError::Duplicate {
            field: "order_number",
            ..
        })
    ));
    assert_eq!(orders.count_orders(OrderQuery::new()).await.unwrap(), 1);
}

#[tokio::test]
async fn update_status_and_details() {
    let (_, orders) = get_test_stores().await;
    let created = orders
        .create_order(new_order(1, vec![item(1, 10, 1, 100)]))
        .await
        .unwrap();

    orders
        .update_status(created.id, OrderStatus::Confirmed)
        .await
        .unwrap();
    orders
        .update_details(
            created.id,
            OrderDetailsUpdate {
                tracking_number: Some("TRACK-1".into()),
                internal_notes: None,
            },
        )
        .await
        .unwrap();

    let loaded = orders.get_order(created.id).await.unwrap().unwrap();
    assert_eq!(loaded.status, OrderStatus::Confirmed);
    assert_eq!(loaded.tracking_number.as_deref(), Some("TRACK-1"));
    assert_eq!(loaded.internal_notes, None);
    assert_eq!(loaded.total, created.total);

    let missing = orders
        .update_status(OrderId::new(999), OrderStatus::Shipped)
        .await;
    assert!(matches!(missing, Err(StoreError::OrderNotFound(_))));
}

#[tokio::test]
async fn record_payment_marks_paid() {
    let (_, orders) = get_test_stores().await;
    let created = orders
        .create_order(new_order(1, vec![item(1, 10, 1, 100)]))
        .await
        .unwrap();

    orders
        .record_payment(
            created.id,
            PaymentRecord {
                payment_id: "pi_test_1".into(),
                paid_at: Utc::now(),
            },
        )
        .await
        .unwrap();

    let loaded = orders.get_order(created.id).await.unwrap().unwrap();
    assert_eq!(loaded.status, OrderStatus::Confirmed);
    assert_eq!(loaded.payment_status, PaymentStatus::Paid);
    assert_eq!(loaded.payment_id.as_deref(), Some("pi_test_1"));
    assert!(loaded.paid_at.is_some());
}

#[tokio::test]
async fn record_payment_requires_pending_order() {
    let (_, orders) = get_test_stores().await;
    let created = orders
        .create_order(new_order(1, vec![item(1, 10, 1, 100)]))
        .await
        .unwrap();
    orders
        .update_status(created.id, OrderStatus::Cancelled)
        .await
        .unwrap();

    let payment = || PaymentRecord {
        payment_id: "pi_late".into(),
        paid_at: Utc::now(),
    };
    let result = orders.record_payment(created.id, payment()).await;
    assert!(matches!(
        result,
        Err(StoreError::NotPending {
            status: OrderStatus::Cancelled,
            ..
        })
    ));

    let loaded = orders.get_order(created.id).await.unwrap().unwrap();
    assert_eq!(loaded.status, OrderStatus::Cancelled);
    assert_eq!(loaded.payment_id, None);

    let missing = orders.record_payment(OrderId::new(999), payment()).await;
    assert!(matches!(missing, Err(StoreError::OrderNotFound(_))));
}

#[tokio::test]
async fn quantities_above_i32_round_trip() {
    let (_, orders) = get_test_stores().await;
    let quantity = u32::MAX;

    let created = orders
        .create_order(new_order(1, vec![item(1, 10, quantity, 1)]))
        .await
        .unwrap();

    let loaded = orders.get_order(created.id).await.unwrap().unwrap();
    assert_eq!(loaded.items[0].quantity, quantity);
}

#[tokio::test]
async fn orders_by_date_range_filters_on_created_at() {
    let (_, orders) = get_test_stores().await;
    let old = orders
        .create_order(new_order(1, vec![item(1, 10, 1, 100)]))
        .await
        .unwrap();
    let fresh = orders
        .create_order(new_order(2, vec![item(1, 10, 1, 100)]))
        .await
        .unwrap();
    backdate(&orders, old.id, 60).await;

    let recent = DateRange::new(Some(Utc::now() - Duration::days(7)), None);
    let found = orders
        .orders_by_date_range(recent, Page::default())
        .await
        .unwrap();
    assert_eq!(found.len(), 1);
    assert_eq!(found[0].id, fresh.id);
}

#[tokio::test]
async fn listing_filters_and_pages() {
    let (_, orders) = get_test_stores().await;

    for customer in [1, 1, 1, 2] {
        orders
            .create_order(new_order(customer, vec![item(1, 10, 1, 100)]))
            .await
            .unwrap();
    }
    let other_seller = orders
        .create_order(new_order(2, vec![item(2, 20, 1, 100), item(1, 10, 1, 100)]))
        .await
        .unwrap();
    orders
        .update_status(other_seller.id, OrderStatus::Confirmed)
        .await
        .unwrap();

    let mine = orders
        .orders_by_customer(UserId::new(1), Page::default())
        .await
        .unwrap();
    assert_eq!(mine.len(), 3);
    assert!(mine.windows(2).all(|w| w[0].created_at >= w[1].created_at));

    let seller_20 = orders
        .orders_by_seller(UserId::new(20), Page::default())
        .await
        .unwrap();
    assert_eq!(seller_20.len(), 1);
    assert_eq!(seller_20[0].items.len(), 2);

    let confirmed = orders
        .orders_by_status(OrderStatus::Confirmed, Page::default())
        .await
        .unwrap();
    assert_eq!(confirmed.len(), 1);

    let page = orders
        .list_orders(OrderQuery::new().page(Page::numbered(2, 2)))
        .await
        .unwrap();
    assert_eq!(page.len(), 2);

    assert_eq!(orders.count_orders(OrderQuery::new()).await.unwrap(), 5);
    assert_eq!(
        orders
            .count_orders(OrderQuery::new().seller(UserId::new(10)))
            .await
            .unwrap(),
        5
    );
}

#[tokio::test]
async fn count_by_status_groups() {
    let (_, orders) = get_test_stores().await;

    let a = orders
        .create_order(new_order(1, vec![item(1, 10, 1, 100)]))
        .await
        .unwrap();
    orders
        .create_order(new_order(1, vec![item(1, 10, 1, 100)]))
        .await
        .unwrap();
    orders
        .update_status(a.id, OrderStatus::Cancelled)
        .await
        .unwrap();

    let counts = orders
        .count_by_status(OrderQuery::new().status(OrderStatus::Pending))
        .await
        .unwrap();
    assert_eq!(counts.get(&OrderStatus::Pending), Some(&1));
    assert_eq!(counts.get(&OrderStatus::Cancelled), Some(&1));
}

#[tokio::test]
async fn revenue_uses_delivered_orders_in_range() {
    let (_, orders) = get_test_stores().await;

    let recent = orders
        .create_order(new_order(1, vec![item(1, 10, 2, 1000), item(2, 20, 1, 500)]))
        .await
        .unwrap();
    let old = orders
        .create_order(new_order(1, vec![item(1, 10, 1, 1000)]))
        .await
        .unwrap();
    orders
        .create_order(new_order(1, vec![item(1, 10, 5, 1000)]))
        .await
        .unwrap();

    for id in [recent.id, old.id] {
        orders
            .update_status(id, OrderStatus::Delivered)
            .await
            .unwrap();
    }
    backdate(&orders, old.id, 90).await;

    // recent: 2500 + 100 tax, old: 1000 + 100 tax
    let all = orders.total_revenue(DateRange::all()).await.unwrap();
    assert_eq!(all, Money::from_cents(3700));

    let last_month = DateRange::new(Some(Utc::now() - Duration::days(30)), None);
    assert_eq!(
        orders.total_revenue(last_month).await.unwrap(),
        Money::from_cents(2600)
    );

    assert_eq!(
        orders
            .revenue_by_seller(UserId::new(10), DateRange::all())
            .await
            .unwrap(),
        Money::from_cents(3000)
    );
    assert_eq!(
        orders
            .revenue_by_seller(UserId::new(20), last_month)
            .await
            .unwrap(),
        Money::from_cents(500)
    );
    assert_eq!(
        orders
            .revenue_by_seller(UserId::new(99), DateRange::all())
            .await
            .unwrap(),
        Money::zero()
    );
}
