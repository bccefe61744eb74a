// orderflow/src/store/memory.rs

use super::{OrderFilter, OrderStore};
use crate::error::{OrderError, OrderResult};
use crate::model::{Order, OrderStatus, Page, PageRequest};
use async_trait::async_trait;
use parking_lot::RwLock;
use std::collections::HashMap;
use tracing::{debug, instrument};
use uuid::Uuid;

#[derive(Debug, Default)]
struct Tables {
  orders: HashMap<Uuid, Order>,
  // external id -> id, the unique index
  by_external_id: HashMap<String, Uuid>,
}

/// `OrderStore` kept in process memory. Used by tests and by the `memory` store backend.
///
/// Lock guards are never held across an `.await`.
#[derive(Debug, Default)]
pub struct InMemoryOrderStore {
  tables: RwLock<Tables>,
}

impl InMemoryOrderStore {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn len(&self) -> usize {
    self.tables.read().orders.len()
  }

  pub fn is_empty(&self) -> bool {
    self.len() == 0
  }

  /// Every stored order, newest first.
  pub fn snapshot(&self) -> Vec<Order> {
    let mut orders: Vec<Order> = self.tables.read().orders.values().cloned().collect();
    sort_newest_first(&mut orders);
    orders
  }
}

fn sort_newest_first(orders: &mut [Order]) {
  orders.sort_by(|a, b| b.created_at.cmp(&a.created_at).then_with(|| a.id.cmp(&b.id)));
}

#[async_trait]
impl OrderStore for InMemoryOrderStore {
  #[instrument(name = "memory_store::insert", skip(self, order), fields(external_id = %order.external_id))]
  async fn insert(&self, order: &Order) -> OrderResult<Order> {
    let mut tables = self.tables.write();
    if tables.by_external_id.contains_key(&order.external_id) {
      return Err(OrderError::DuplicateExternalId(order.external_id.clone()));
    }
    tables.by_external_id.insert(order.external_id.clone(), order.id);
    tables.orders.insert(order.id, order.clone());
    debug!(order_id = %order.id, "Order stored in memory.");
    Ok(order.clone())
  }

  async fn find_by_id_and_external_id(&self, id: Uuid, external_id: &str) -> OrderResult<Option<Order>> {
    let tables = self.tables.read();
    Ok(
      tables
        .orders
        .get(&id)
        .filter(|order| order.external_id == external_id)
        .cloned(),
    )
  }

  async fn update_status(&self, order: &Order) -> OrderResult<Order> {
    let mut tables = self.tables.write();
    let stored = tables
      .orders
      .get_mut(&order.id)
      .ok_or_else(|| OrderError::OrderNotFound(format!("Order not found: {}", order.id)))?;
    stored.status = order.status;
    stored.updated_at = order.updated_at;
    Ok(stored.clone())
  }

  async fn find_page(&self, filter: &OrderFilter, request: PageRequest) -> OrderResult<Page<Order>> {
    let mut matching: Vec<Order> = {
      let tables = self.tables.read();
      tables
        .orders
        .values()
        .filter(|order| filter.matches(order))
        .cloned()
        .collect()
    };
    sort_newest_first(&mut matching);

    let total = matching.len() as u64;
    let content = matching
      .into_iter()
      .skip(request.offset() as usize)
      .take(request.size() as usize)
      .collect();
    Ok(Page::new(content, request, total))
  }

  async fn find_by_status(&self, status: OrderStatus) -> OrderResult<Vec<Order>> {
    let filter = OrderFilter {
      status: Some(status),
      ..Default::default()
    };
    let mut orders: Vec<Order> = self
      .tables
      .read()
      .orders
      .values()
      .filter(|order| filter.matches(order))
      .cloned()
      .collect();
    orders.sort_by(|a, b| a.created_at.cmp(&b.created_at).then_with(|| a.id.cmp(&b.id)));
    Ok(orders)
  }
}
