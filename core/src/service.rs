// orderflow/src/service.rs

//! `OrderService`: the only component holding business rules. It runs the lifecycle checks,
//! talks to the store and hands orders to the dispatch channel.

use crate::dispatch::{OrderProcessor, OrderPublisher};
use crate::error::{OrderError, OrderResult};
use crate::external_id::ExternalIdGenerator;
use crate::lifecycle;
use crate::model::{Order, OrderDraft, OrderStatus, Page, PageRequest, Product};
use crate::store::{OrderFilter, OrderStore};
use async_trait::async_trait;
use chrono::Utc;
use std::sync::Arc;
use tracing::{info, instrument, warn};
use uuid::Uuid;

pub struct OrderService {
  store: Arc<dyn OrderStore>,
  publisher: OrderPublisher,
  external_ids: ExternalIdGenerator,
}

impl OrderService {
  pub fn new(store: Arc<dyn OrderStore>, publisher: OrderPublisher) -> Self {
    Self {
      store,
      publisher,
      external_ids: ExternalIdGenerator::new(),
    }
  }

  /// Validates the draft and persists it as a new PENDING order with a fresh identity,
  /// external id and total. Nothing is written when validation fails.
  ///
  /// Identity, status and total sent by the caller are ignored. The same draft submitted
  /// twice produces two orders.
  #[instrument(name = "service::create_order", skip(self, draft), fields(products = draft.products.len()))]
  pub async fn create_order(&self, draft: OrderDraft) -> OrderResult<Order> {
    let total_amount = lifecycle::validate_for_creation(&draft.products)
      .and_then(|()| lifecycle::compute_total(&draft.products))
      .map_err(|e| {
        warn!(error = %e, "Rejected order draft.");
        e
      })?;

    let now = Utc::now();
    let order = Order {
      id: Uuid::new_v4(),
      external_id: self.external_ids.next_id(),
      status: lifecycle::INITIAL_STATUS,
      total_amount,
      products: draft.products,
      created_at: now,
      updated_at: now,
    };

    let saved = self.store.insert(&order).await?;
    info!(
      order_id = %saved.id,
      external_id = %saved.external_id,
      total_amount = %saved.total_amount,
      "Order created."
    );
    Ok(saved)
  }

  /// Moves the order identified by both `id` and `external_id` to `requested`.
  #[instrument(name = "service::update_status", skip_all, fields(%external_id, %id, %requested))]
  pub async fn update_status(&self, external_id: &str, id: Uuid, requested: OrderStatus) -> OrderResult<Order> {
    let mut order = self
      .store
      .find_by_id_and_external_id(id, external_id)
      .await?
      .ok_or_else(|| {
        warn!("Order not found for status update.");
        OrderError::OrderNotFound(format!("Order not found: {}", id))
      })?;

    let previous = order.status;
    order.status = lifecycle::transition(previous, requested).map_err(|e| {
      warn!(current = %previous, error = %e, "Rejected status transition.");
      e
    })?;
    order.updated_at = Utc::now();

    let updated = self.store.update_status(&order).await?;
    info!(from = %previous, to = %updated.status, "Order status updated.");
    Ok(updated)
  }

  /// Orders matching every filter that is set, newest first.
  #[instrument(name = "service::list_orders", skip(self))]
  pub async fn list_orders(&self, filter: &OrderFilter, request: PageRequest) -> OrderResult<Page<Order>> {
    self.store.find_page(filter, request).await
  }

  /// Publishes the order to the broker for asynchronous creation. No local state changes.
  #[instrument(name = "service::process_order", skip(self, order), fields(external_id = ?order.external_id))]
  pub async fn process_order(&self, order: &OrderDraft) -> OrderResult<()> {
    self.publisher.publish(order).await.map_err(|e| match e {
      OrderError::DispatchFailure(_) => e,
      other => OrderError::DispatchFailure(other.to_string()),
    })?;
    info!("Order dispatched to the broker.");
    Ok(())
  }

  /// Every line item of every COMPLETED order.
  #[instrument(name = "service::completed_products", skip(self))]
  pub async fn completed_products(&self) -> OrderResult<Vec<Product>> {
    let orders = self.store.find_by_status(OrderStatus::Completed).await?;
    Ok(orders.into_iter().flat_map(|order| order.products).collect())
  }

  /// Product feed of the external catalog integration. There is no such integration
  /// configured, so the feed is always empty.
  pub fn external_products(&self) -> Vec<Product> {
    Vec::new()
  }
}

#[async_trait]
impl OrderProcessor for OrderService {
  async fn process(&self, order: OrderDraft) -> OrderResult<()> {
    self.process_order(&order).await
  }
}
