use std::collections::{BTreeMap, HashMap};

use async_trait::async_trait;
use common::{OrderId, ProductId, UserId};
use domain::{
    Address, DateRange, Money, NewOrder, NewProduct, Order, OrderDetailsUpdate, OrderItem,
    OrderStatus, Product,
};
use sqlx::{
    PgPool, Postgres, Row,
    postgres::{PgArguments, PgRow},
    query::Query,
    types::Json,
};

use crate::{
    OrderQuery, Result, StoreError,
    store::{CatalogStore, OrderStore, PaymentRecord},
};

/// Runs the database migrations.
pub async fn run_migrations(pool: &PgPool) -> Result<()> {
    sqlx::migrate!("../../migrations").run(pool).await?;
    Ok(())
}

const PRODUCT_COLUMNS: &str = "id, seller_id, name, sku, description, image, price_cents, stock, \
     is_active, created_at, updated_at";

const ORDER_COLUMNS: &str = "o.id, o.order_number, o.customer_id, o.status, o.payment_status, \
     o.payment_method, o.payment_id, o.paid_at, o.subtotal_cents, o.tax_cents, o.shipping_cents, \
     o.discount_cents, o.total_cents, o.shipping_address, o.billing_address, o.tracking_number, \
     o.notes, o.internal_notes, o.created_at, o.updated_at";

fn corrupt(column: &str, detail: impl std::fmt::Display) -> StoreError {
    StoreError::Corrupt(format!("{column}: {detail}"))
}

fn to_u32(column: &str, value: i64) -> Result<u32> {
    u32::try_from(value).map_err(|_| corrupt(column, format!("{value} out of range")))
}

fn parse_column<T>(row: &PgRow, column: &str) -> Result<T>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    let raw: String = row.try_get(column)?;
    raw.parse().map_err(|e| corrupt(column, e))
}

/// Maps a unique violation on `constraint` to a duplicate error.
fn unique_violation(
    e: sqlx::Error,
    constraint: &str,
    field: &'static str,
    value: &str,
) -> StoreError {
    if let sqlx::Error::Database(ref db_err) = e
        && db_err.constraint() == Some(constraint)
    {
        return StoreError::Duplicate {
            field,
            value: value.to_string(),
        };
    }
    StoreError::Database(e)
}

/// PostgreSQL-backed catalog.
#[derive(Clone)]
pub struct PostgresCatalog {
    pool: PgPool,
}

impl PostgresCatalog {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Gets a reference to the underlying connection pool.
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    fn row_to_product(row: PgRow) -> Result<Product> {
        Ok(Product {
            id: ProductId::new(row.try_get("id")?),
            seller_id: UserId::new(row.try_get("seller_id")?),
            name: row.try_get("name")?,
            sku: row.try_get("sku")?,
            description: row.try_get("description")?,
            image: row.try_get("image")?,
            price: Money::from_cents(row.try_get("price_cents")?),
            stock: to_u32("stock", row.try_get("stock")?)?,
            is_active: row.try_get("is_active")?,
            created_at: row.try_get("created_at")?,
            updated_at: row.try_get("updated_at")?,
        })
    }

    async fn product_exists(&self, id: ProductId) -> Result<bool> {
        let exists: bool = sqlx::query_scalar(
            "SELECT EXISTS(SELECT 1 FROM products WHERE id = $1 AND deleted_at IS NULL)",
        )
        .bind(id.get())
        .fetch_one(&self.pool)
        .await?;
        Ok(exists)
    }
}

#[async_trait]
impl CatalogStore for PostgresCatalog {
    async fn create_product(&self, product: NewProduct) -> Result<Product> {
        let sql = format!(
            r#"
            INSERT INTO products (seller_id, name, sku, description, image, price_cents, stock, is_active)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING {PRODUCT_COLUMNS}
            "#
        );

        let row = sqlx::query(&sql)
            .bind(product.seller_id.get())
            .bind(&product.name)
            .bind(&product.sku)
            .bind(&product.description)
            .bind(&product.image)
            .bind(product.price.cents())
            .bind(i64::from(product.stock))
            .bind(product.is_active)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| unique_violation(e, "unique_product_sku", "sku", &product.sku))?;

        Self::row_to_product(row)
    }

    async fn get_product(&self, id: ProductId) -> Result<Option<Product>> {
        let sql = format!(
            "SELECT {PRODUCT_COLUMNS} FROM products WHERE id = $1 AND deleted_at IS NULL"
        );
        let row = sqlx::query(&sql)
            .bind(id.get())
            .fetch_optional(&self.pool)
            .await?;

        row.map(Self::row_to_product).transpose()
    }

    async fn update_stock(&self, id: ProductId, new_stock: u32) -> Result<()> {
        let result = sqlx::query(
            r#"
            UPDATE products SET stock = $2, updated_at = NOW()
            WHERE id = $1 AND deleted_at IS NULL
            "#,
        )
        .bind(id.get())
        .bind(i64::from(new_stock))
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::ProductNotFound(id));
        }
        Ok(())
    }

    async fn adjust_stock(&self, id: ProductId, delta: i64) -> Result<Option<u32>> {
        let stock: Option<i64> = sqlx::query_scalar(
            r#"
            UPDATE products SET stock = stock + $2, updated_at = NOW()
            WHERE id = $1 AND deleted_at IS NULL AND stock + $2 >= 0
            RETURNING stock
            "#,
        )
        .bind(id.get())
        .bind(delta)
        .fetch_optional(&self.pool)
        .await?;

        match stock {
            Some(stock) => Ok(Some(to_u32("stock", stock)?)),
            // No row updated: either the guard refused or the product is gone
            None if self.product_exists(id).await? => Ok(None),
            None => Err(StoreError::ProductNotFound(id)),
        }
    }
}

/// PostgreSQL-backed order store.
#[derive(Clone)]
pub struct PostgresOrderStore {
    pool: PgPool,
}

impl PostgresOrderStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Gets a reference to the underlying connection pool.
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    fn row_to_item(row: &PgRow) -> Result<OrderItem> {
        Ok(OrderItem {
            product_id: ProductId::new(row.try_get("product_id")?),
            seller_id: UserId::new(row.try_get("seller_id")?),
            quantity: to_u32("quantity", row.try_get("quantity")?)?,
            unit_price: Money::from_cents(row.try_get("unit_price_cents")?),
            total_price: Money::from_cents(row.try_get("total_price_cents")?),
            product_name: row.try_get("product_name")?,
            product_sku: row.try_get("product_sku")?,
            product_description: row.try_get("product_description")?,
            product_image: row.try_get("product_image")?,
        })
    }

    fn row_to_order(row: &PgRow, items: Vec<OrderItem>) -> Result<Order> {
        let shipping_address: Json<Address> = row.try_get("shipping_address")?;
        let billing_address: Option<Json<Address>> = row.try_get("billing_address")?;

        Ok(Order {
            id: OrderId::new(row.try_get("id")?),
            order_number: row.try_get("order_number")?,
            customer_id: UserId::new(row.try_get("customer_id")?),
            status: parse_column(row, "status")?,
            payment_status: parse_column(row, "payment_status")?,
            payment_method: parse_column(row, "payment_method")?,
            payment_id: row.try_get("payment_id")?,
            paid_at: row.try_get("paid_at")?,
            subtotal: Money::from_cents(row.try_get("subtotal_cents")?),
            tax: Money::from_cents(row.try_get("tax_cents")?),
            shipping: Money::from_cents(row.try_get("shipping_cents")?),
            discount: Money::from_cents(row.try_get("discount_cents")?),
            total: Money::from_cents(row.try_get("total_cents")?),
            shipping_address: shipping_address.0,
            billing_address: billing_address.map(|json| json.0),
            tracking_number: row.try_get("tracking_number")?,
            notes: row.try_get("notes")?,
            internal_notes: row.try_get("internal_notes")?,
            items,
            created_at: row.try_get("created_at")?,
            updated_at: row.try_get("updated_at")?,
        })
    }

    /// Loads the lines of every order in `ids`, keyed by order id.
    async fn load_items(&self, ids: &[i64]) -> Result<HashMap<i64, Vec<OrderItem>>> {
        let rows = sqlx::query(
            r#"
            SELECT order_id, product_id, seller_id, quantity, unit_price_cents, total_price_cents,
                   product_name, product_sku, product_description, product_image
            FROM order_items
            WHERE order_id = ANY($1)
            ORDER BY order_id ASC, position ASC
            "#,
        )
        .bind(ids)
        .fetch_all(&self.pool)
        .await?;

        let mut items: HashMap<i64, Vec<OrderItem>> = HashMap::new();
        for row in &rows {
            let order_id: i64 = row.try_get("order_id")?;
            items
                .entry(order_id)
                .or_default()
                .push(Self::row_to_item(row)?);
        }
        Ok(items)
    }

    async fn rows_to_orders(&self, rows: Vec<PgRow>) -> Result<Vec<Order>> {
        let ids = rows
            .iter()
            .map(|row| row.try_get::<i64, _>("id"))
            .collect::<std::result::Result<Vec<_>, _>>()?;
        let mut items = self.load_items(&ids).await?;

        rows.iter()
            .zip(ids)
            .map(|(row, id)| Self::row_to_order(row, items.remove(&id).unwrap_or_default()))
            .collect()
    }

    /// Appends the WHERE clause for `query`'s filters.
    fn push_filters(sql: &mut String, query: &OrderQuery, param_count: &mut usize) {
        sql.push_str(" WHERE o.deleted_at IS NULL");

        if query.customer_id.is_some() {
            *param_count += 1;
            sql.push_str(&format!(" AND o.customer_id = ${param_count}"));
        }
        if query.seller_id.is_some() {
            *param_count += 1;
            sql.push_str(&format!(
                " AND EXISTS (SELECT 1 FROM order_items i WHERE i.order_id = o.id AND i.seller_id = ${param_count})"
            ));
        }
        if query.status.is_some() {
            *param_count += 1;
            sql.push_str(&format!(" AND o.status = ${param_count}"));
        }
        if query.range.start.is_some() {
            *param_count += 1;
            sql.push_str(&format!(" AND o.created_at >= ${param_count}"));
        }
        if query.range.end.is_some() {
            *param_count += 1;
            sql.push_str(&format!(" AND o.created_at <= ${param_count}"));
        }
    }

    /// Binds `query`'s filters in the order [`push_filters`](Self::push_filters) numbered them.
    fn bind_filters<'q>(
        mut sqlx_query: Query<'q, Postgres, PgArguments>,
        query: &OrderQuery,
    ) -> Query<'q, Postgres, PgArguments> {
        if let Some(customer_id) = query.customer_id {
            sqlx_query = sqlx_query.bind(customer_id.get());
        }
        if let Some(seller_id) = query.seller_id {
            sqlx_query = sqlx_query.bind(seller_id.get());
        }
        if let Some(status) = query.status {
            sqlx_query = sqlx_query.bind(status.as_str());
        }
        if let Some(start) = query.range.start {
            sqlx_query = sqlx_query.bind(start);
        }
        if let Some(end) = query.range.end {
            sqlx_query = sqlx_query.bind(end);
        }
        sqlx_query
    }

    /// Runs a single-row update, failing when no live order matched.
    async fn execute_update(
        &self,
        id: OrderId,
        sqlx_query: Query<'_, Postgres, PgArguments>,
    ) -> Result<()> {
        let result = sqlx_query.execute(&self.pool).await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::OrderNotFound(id));
        }
        Ok(())
    }
}

#[async_trait]
impl OrderStore for PostgresOrderStore {
    async fn create_order(&self, order: NewOrder) -> Result<Order> {
        // Order row and lines land together or not at all
        let mut tx = self.pool.begin().await?;

        let sql = format!(
            r#"
            INSERT INTO orders AS o (
                order_number, customer_id, payment_method, subtotal_cents, tax_cents,
                shipping_cents, discount_cents, total_cents, shipping_address, billing_address, notes
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            RETURNING {ORDER_COLUMNS}
            "#
        );

        let row = sqlx::query(&sql)
            .bind(&order.order_number)
            .bind(order.customer_id.get())
            .bind(order.payment_method.as_str())
            .bind(order.subtotal.cents())
            .bind(order.tax.cents())
            .bind(order.shipping.cents())
            .bind(order.discount.cents())
            .bind(order.total.cents())
            .bind(Json(&order.shipping_address))
            .bind(order.billing_address.as_ref().map(Json))
            .bind(&order.notes)
            .fetch_one(&mut *tx)
            .await
            .map_err(|e| {
                unique_violation(e, "unique_order_number", "order_number", &order.order_number)
            })?;

        let order_id: i64 = row.try_get("id")?;

        for (position, item) in (0_i64..).zip(&order.items) {
            sqlx::query(
                r#"
                INSERT INTO order_items (
                    order_id, position, product_id, seller_id, quantity, unit_price_cents,
                    total_price_cents, product_name, product_sku, product_description, product_image
                )
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
                "#,
            )
            .bind(order_id)
            .bind(position)
            .bind(item.product_id.get())
            .bind(item.seller_id.get())
            .bind(i64::from(item.quantity))
            .bind(item.unit_price.cents())
            .bind(item.total_price.cents())
            .bind(&item.product_name)
            .bind(&item.product_sku)
            .bind(&item.product_description)
            .bind(&item.product_image)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;

        tracing::debug!(order_id, items = order.items.len(), "order row written");
        Self::row_to_order(&row, order.items)
    }

    async fn get_order(&self, id: OrderId) -> Result<Option<Order>> {
        let sql = format!(
            "SELECT {ORDER_COLUMNS} FROM orders o WHERE o.id = $1 AND o.deleted_at IS NULL"
        );
        let row = sqlx::query(&sql)
            .bind(id.get())
            .fetch_optional(&self.pool)
            .await?;

        match row {
            Some(row) => Ok(self.rows_to_orders(vec![row]).await?.pop()),
            None => Ok(None),
        }
    }

    async fn update_status(&self, id: OrderId, status: OrderStatus) -> Result<()> {
        let sqlx_query = sqlx::query(
            r#"
            UPDATE orders SET status = $2, updated_at = NOW()
            WHERE id = $1 AND deleted_at IS NULL
            "#,
        )
        .bind(id.get())
        .bind(status.as_str());

        self.execute_update(id, sqlx_query).await
    }

    async fn update_details(&self, id: OrderId, update: OrderDetailsUpdate) -> Result<()> {
        let sqlx_query = sqlx::query(
            r#"
            UPDATE orders SET
                tracking_number = COALESCE($2, tracking_number),
                internal_notes = COALESCE($3, internal_notes),
                updated_at = NOW()
            WHERE id = $1 AND deleted_at IS NULL
            "#,
        )
        .bind(id.get())
        .bind(update.tracking_number)
        .bind(update.internal_notes);

        self.execute_update(id, sqlx_query).await
    }

    async fn record_payment(&self, id: OrderId, payment: PaymentRecord) -> Result<()> {
        let result = sqlx::query(
            r#"
            UPDATE orders SET
                status = 'confirmed',
                payment_status = 'paid',
                payment_id = $2,
                paid_at = $3,
                updated_at = NOW()
            WHERE id = $1 AND deleted_at IS NULL AND status = 'pending'
            "#,
        )
        .bind(id.get())
        .bind(payment.payment_id)
        .bind(payment.paid_at)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() > 0 {
            return Ok(());
        }

        // Nothing written: tell a missing order from one that moved on
        let row = sqlx::query("SELECT status FROM orders WHERE id = $1 AND deleted_at IS NULL")
            .bind(id.get())
            .fetch_optional(&self.pool)
            .await?;
        match row {
            Some(row) => Err(StoreError::NotPending {
                id,
                status: parse_column(&row, "status")?,
            }),
            None => Err(StoreError::OrderNotFound(id)),
        }
    }

    async fn list_orders(&self, query: OrderQuery) -> Result<Vec<Order>> {
        let mut sql = format!("SELECT {ORDER_COLUMNS} FROM orders o");
        let mut param_count = 0;
        Self::push_filters(&mut sql, &query, &mut param_count);

        sql.push_str(" ORDER BY o.created_at DESC, o.id DESC");

        if query.limit.is_some() {
            param_count += 1;
            sql.push_str(&format!(" LIMIT ${param_count}"));
        }
        if query.offset.is_some() {
            param_count += 1;
            sql.push_str(&format!(" OFFSET ${param_count}"));
        }

        let mut sqlx_query = Self::bind_filters(sqlx::query(&sql), &query);
        if let Some(limit) = query.limit {
            sqlx_query = sqlx_query.bind(i64::from(limit));
        }
        if let Some(offset) = query.offset {
            sqlx_query = sqlx_query.bind(i64::from(offset));
        }

        let rows = sqlx_query.fetch_all(&self.pool).await?;
        self.rows_to_orders(rows).await
    }

    async fn count_orders(&self, query: OrderQuery) -> Result<u64> {
        let mut sql = String::from("SELECT COUNT(*) AS count FROM orders o");
        Self::push_filters(&mut sql, &query, &mut 0);

        let row = Self::bind_filters(sqlx::query(&sql), &query)
            .fetch_one(&self.pool)
            .await?;
        let count: i64 = row.try_get("count")?;
        Ok(count.max(0) as u64)
    }

    async fn count_by_status(&self, query: OrderQuery) -> Result<BTreeMap<OrderStatus, u64>> {
        let query = OrderQuery {
            status: None,
            ..query
        };
        let mut sql = String::from("SELECT o.status, COUNT(*) AS count FROM orders o");
        Self::push_filters(&mut sql, &query, &mut 0);
        sql.push_str(" GROUP BY o.status");

        let rows = Self::bind_filters(sqlx::query(&sql), &query)
            .fetch_all(&self.pool)
            .await?;

        let mut counts = BTreeMap::new();
        for row in &rows {
            let status: OrderStatus = parse_column(row, "status")?;
            let count: i64 = row.try_get("count")?;
            counts.insert(status, count.max(0) as u64);
        }
        Ok(counts)
    }

    async fn total_revenue(&self, range: DateRange) -> Result<Money> {
        let cents: i64 = sqlx::query_scalar(
            r#"
            SELECT COALESCE(SUM(total_cents), 0)::BIGINT
            FROM orders
            WHERE status = 'delivered' AND deleted_at IS NULL
              AND ($1::TIMESTAMPTZ IS NULL OR created_at >= $1)
              AND ($2::TIMESTAMPTZ IS NULL OR created_at <= $2)
            "#,
        )
        .bind(range.start)
        .bind(range.end)
        .fetch_one(&self.pool)
        .await?;

        Ok(Money::from_cents(cents))
    }

    async fn revenue_by_seller(&self, seller_id: UserId, range: DateRange) -> Result<Money> {
        let cents: i64 = sqlx::query_scalar(
            r#"
            SELECT COALESCE(SUM(i.total_price_cents), 0)::BIGINT
            FROM order_items i
            JOIN orders o ON o.id = i.order_id
            WHERE i.seller_id = $1 AND o.status = 'delivered' AND o.deleted_at IS NULL
              AND ($2::TIMESTAMPTZ IS NULL OR o.created_at >= $2)
              AND ($3::TIMESTAMPTZ IS NULL OR o.created_at <= $3)
            "#,
        )
        .bind(seller_id.get())
        .bind(range.start)
        .bind(range.end)
        .fetch_one(&self.pool)
        .await?;

        Ok(Money::from_cents(cents))
    }
}
