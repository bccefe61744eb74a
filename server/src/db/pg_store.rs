// orderflow_server/src/db/pg_store.rs

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use orderflow::{Order, OrderError, OrderFilter, OrderResult, OrderStatus, OrderStore, Page, PageRequest, Product};
use rust_decimal::Decimal;
use sqlx::postgres::{PgPool, PgPoolOptions};
use sqlx::{FromRow, Postgres, QueryBuilder};
use std::collections::HashMap;
use tracing::{debug, info, instrument};
use uuid::Uuid;

const ORDER_COLUMNS: &str = "SELECT id, external_id, status, total_amount, created_at, updated_at FROM orders";

#[derive(Debug, FromRow)]
struct OrderRow {
  id: Uuid,
  external_id: String,
  status: String,
  total_amount: Decimal,
  created_at: DateTime<Utc>,
  updated_at: DateTime<Utc>,
}

#[derive(Debug, FromRow)]
struct ProductRow {
  order_id: Uuid,
  name: String,
  price: Decimal,
  quantity: i32,
}

impl OrderRow {
  fn into_order(self, products: Vec<Product>) -> OrderResult<Order> {
    let status = self.status.parse::<OrderStatus>().map_err(|_| {
      OrderError::store(anyhow::anyhow!(
        "Order {} has unknown status '{}' in the database",
        self.id,
        self.status
      ))
    })?;
    Ok(Order {
      id: self.id,
      external_id: self.external_id,
      status,
      products,
      total_amount: self.total_amount,
      created_at: self.created_at,
      updated_at: self.updated_at,
    })
  }
}

/// Appends the filter as `AND`-ed conditions. The query must already end in a `WHERE` clause.
fn push_filter(builder: &mut QueryBuilder<'_, Postgres>, filter: &OrderFilter) {
  if let Some(status) = filter.status {
    builder.push(" AND status = ").push_bind(status.as_str());
  }
  if let Some(from) = filter.created_from() {
    builder.push(" AND created_at >= ").push_bind(from);
  }
  if let Some(before) = filter.created_before() {
    builder.push(" AND created_at < ").push_bind(before);
  }
}

fn map_insert_error(err: sqlx::Error, external_id: &str) -> OrderError {
  if let sqlx::Error::Database(db_err) = &err {
    if db_err.is_unique_violation() {
      return OrderError::DuplicateExternalId(external_id.to_string());
    }
  }
  OrderError::store(err)
}

/// `OrderStore` over Postgres. Line items live in `products`, ordered by `position`.
#[derive(Clone)]
pub struct PgOrderStore {
  pool: PgPool,
}

impl PgOrderStore {
  pub fn new(pool: PgPool) -> Self {
    Self { pool }
  }

  pub async fn connect(database_url: &str, max_connections: u32) -> Result<Self, sqlx::Error> {
    let pool = PgPoolOptions::new()
      .max_connections(max_connections)
      .connect(database_url)
      .await?;
    info!(max_connections, "Successfully connected to the database.");
    Ok(Self::new(pool))
  }

  pub async fn migrate(&self) -> anyhow::Result<()> {
    sqlx::migrate!("./migrations").run(&self.pool).await?;
    info!("Database migrations applied.");
    Ok(())
  }

  /// Attaches line items to the rows in one query, keeping the row order.
  async fn with_products(&self, rows: Vec<OrderRow>) -> OrderResult<Vec<Order>> {
    if rows.is_empty() {
      return Ok(Vec::new());
    }
    let ids: Vec<Uuid> = rows.iter().map(|row| row.id).collect();
    let product_rows: Vec<ProductRow> = sqlx::query_as(
      "SELECT order_id, name, price, quantity FROM products WHERE order_id = ANY($1) ORDER BY order_id, position",
    )
    .bind(&ids)
    .fetch_all(&self.pool)
    .await
    .map_err(OrderError::store)?;

    let mut by_order: HashMap<Uuid, Vec<Product>> = HashMap::with_capacity(rows.len());
    for row in product_rows {
      by_order
        .entry(row.order_id)
        .or_default()
        .push(Product::new(row.name, row.price, row.quantity));
    }

    rows
      .into_iter()
      .map(|row| {
        let products = by_order.remove(&row.id).unwrap_or_default();
        row.into_order(products)
      })
      .collect()
  }
}

#[async_trait]
impl OrderStore for PgOrderStore {
  #[instrument(name = "pg_store::insert", skip(self, order), fields(external_id = %order.external_id))]
  async fn insert(&self, order: &Order) -> OrderResult<Order> {
    let mut tx = self.pool.begin().await.map_err(OrderError::store)?;

    sqlx::query(
      "INSERT INTO orders (id, external_id, status, total_amount, created_at, updated_at) VALUES ($1, $2, $3, $4, $5, $6)",
    )
    .bind(order.id)
    .bind(&order.external_id)
    .bind(order.status.as_str())
    .bind(order.total_amount)
    .bind(order.created_at)
    .bind(order.updated_at)
    .execute(&mut *tx)
    .await
    .map_err(|e| map_insert_error(e, &order.external_id))?;

    if !order.products.is_empty() {
      let mut builder: QueryBuilder<Postgres> =
        QueryBuilder::new("INSERT INTO products (id, order_id, position, name, price, quantity) ");
      builder.push_values(order.products.iter().enumerate(), |mut row, (position, product)| {
        row
          .push_bind(Uuid::new_v4())
          .push_bind(order.id)
          .push_bind(position as i32)
          .push_bind(product.name.as_str())
          .push_bind(product.price)
          .push_bind(product.quantity);
      });
      builder.build().execute(&mut *tx).await.map_err(OrderError::store)?;
    }

    tx.commit().await.map_err(OrderError::store)?;
    debug!(products = order.products.len(), "Order row and line items inserted.");
    Ok(order.clone())
  }

  async fn find_by_id_and_external_id(&self, id: Uuid, external_id: &str) -> OrderResult<Option<Order>> {
    let row: Option<OrderRow> = sqlx::query_as(&format!("{} WHERE id = $1 AND external_id = $2", ORDER_COLUMNS))
      .bind(id)
      .bind(external_id)
      .fetch_optional(&self.pool)
      .await
      .map_err(OrderError::store)?;

    match row {
      Some(row) => Ok(self.with_products(vec![row]).await?.pop()),
      None => Ok(None),
    }
  }

  #[instrument(name = "pg_store::update_status", skip(self, order), fields(order_id = %order.id, status = %order.status))]
  async fn update_status(&self, order: &Order) -> OrderResult<Order> {
    let result = sqlx::query("UPDATE orders SET status = $1, updated_at = $2 WHERE id = $3")
      .bind(order.status.as_str())
      .bind(order.updated_at)
      .bind(order.id)
      .execute(&self.pool)
      .await
      .map_err(OrderError::store)?;

    if result.rows_affected() == 0 {
      return Err(OrderError::OrderNotFound(format!("Order not found: {}", order.id)));
    }
    Ok(order.clone())
  }

  #[instrument(name = "pg_store::find_page", skip(self))]
  async fn find_page(&self, filter: &OrderFilter, request: PageRequest) -> OrderResult<Page<Order>> {
    let mut count: QueryBuilder<Postgres> = QueryBuilder::new("SELECT COUNT(*) FROM orders WHERE TRUE");
    push_filter(&mut count, filter);
    let total: i64 = count
      .build_query_scalar()
      .fetch_one(&self.pool)
      .await
      .map_err(OrderError::store)?;

    if total == 0 {
      return Ok(Page::empty(request));
    }

    let mut select: QueryBuilder<Postgres> = QueryBuilder::new(ORDER_COLUMNS);
    select.push(" WHERE TRUE");
    push_filter(&mut select, filter);
    select
      .push(" ORDER BY created_at DESC, id LIMIT ")
      .push_bind(i64::from(request.size()))
      .push(" OFFSET ")
      .push_bind(request.offset() as i64);
    let rows: Vec<OrderRow> = select
      .build_query_as()
      .fetch_all(&self.pool)
      .await
      .map_err(OrderError::store)?;

    let content = self.with_products(rows).await?;
    Ok(Page::new(content, request, total as u64))
  }

  async fn find_by_status(&self, status: OrderStatus) -> OrderResult<Vec<Order>> {
    let rows: Vec<OrderRow> = sqlx::query_as(&format!("{} WHERE status = $1 ORDER BY created_at, id", ORDER_COLUMNS))
      .bind(status.as_str())
      .fetch_all(&self.pool)
      .await
      .map_err(OrderError::store)?;
    self.with_products(rows).await
  }
}
