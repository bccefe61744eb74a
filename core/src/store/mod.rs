// orderflow/src/store/mod.rs

//! The order store port and its in-memory implementation.

pub mod memory;

pub use memory::InMemoryOrderStore;

use crate::error::OrderResult;
use crate::model::{Order, OrderStatus, Page, PageRequest};
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use uuid::Uuid;

/// Durable storage of orders and their owned line items.
///
/// Implementations are shared between HTTP handlers and the dispatch workers, so every
/// method takes `&self` and must be safe to call concurrently.
#[async_trait]
pub trait OrderStore: Send + Sync + 'static {
  /// Persists a new order with its products. Fails with `DuplicateExternalId` when the
  /// external id is already taken.
  async fn insert(&self, order: &Order) -> OrderResult<Order>;

  /// Looks an order up by the (identity, external id) pair; both must match.
  async fn find_by_id_and_external_id(&self, id: Uuid, external_id: &str) -> OrderResult<Option<Order>>;

  /// Writes `status` and `updated_at` of an existing order. Last writer wins.
  async fn update_status(&self, order: &Order) -> OrderResult<Order>;

  /// Filtered page of orders, newest first.
  async fn find_page(&self, filter: &OrderFilter, request: PageRequest) -> OrderResult<Page<Order>>;

  async fn find_by_status(&self, status: OrderStatus) -> OrderResult<Vec<Order>>;
}

/// Optional, AND-combined predicates for listing orders. An empty filter matches everything.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OrderFilter {
  pub status: Option<OrderStatus>,
  /// Inclusive: orders created at or after the start of this day (UTC).
  pub start_date: Option<NaiveDate>,
  /// Inclusive: orders created up to the end of this day (UTC).
  pub end_date: Option<NaiveDate>,
}

impl OrderFilter {
  pub fn is_empty(&self) -> bool {
    self.status.is_none() && self.start_date.is_none() && self.end_date.is_none()
  }

  /// Lower bound on `created_at`, inclusive.
  pub fn created_from(&self) -> Option<DateTime<Utc>> {
    self
      .start_date
      .map(|date| date.and_time(NaiveTime::MIN).and_utc())
  }

  /// Upper bound on `created_at`, exclusive: midnight after `end_date`.
  /// `None` also when `end_date` is the last representable day.
  pub fn created_before(&self) -> Option<DateTime<Utc>> {
    self
      .end_date
      .and_then(|date| date.succ_opt())
      .map(|next_day| next_day.and_time(NaiveTime::MIN).and_utc())
  }

  pub fn matches(&self, order: &Order) -> bool {
    if let Some(status) = self.status {
      if order.status != status {
        return false;
      }
    }
    if let Some(from) = self.created_from() {
      if order.created_at < from {
        return false;
      }
    }
    if let Some(before) = self.created_before() {
      if order.created_at >= before {
        return false;
      }
    }
    true
  }
}
