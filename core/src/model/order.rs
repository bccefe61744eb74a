// orderflow/src/model/order.rs

use crate::error::OrderError;
use crate::model::product::Product;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderStatus {
  Pending,
  Completed,
  Cancelled,
}

impl OrderStatus {
  pub const ALL: [OrderStatus; 3] = [OrderStatus::Pending, OrderStatus::Completed, OrderStatus::Cancelled];

  /// The representation used on the wire and in the `orders.status` column.
  pub fn as_str(&self) -> &'static str {
    match self {
      OrderStatus::Pending => "PENDING",
      OrderStatus::Completed => "COMPLETED",
      OrderStatus::Cancelled => "CANCELLED",
    }
  }
}

impl fmt::Display for OrderStatus {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

impl FromStr for OrderStatus {
  type Err = OrderError;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    OrderStatus::ALL
      .into_iter()
      .find(|status| status.as_str().eq_ignore_ascii_case(s.trim()))
      .ok_or_else(|| OrderError::UnknownStatus(s.to_string()))
  }
}

/// A persisted order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Order {
  pub id: Uuid,
  pub external_id: String,
  pub status: OrderStatus,
  pub products: Vec<Product>,
  /// Snapshot taken at creation; later price changes do not touch it.
  pub total_amount: Decimal,
  pub created_at: DateTime<Utc>,
  pub updated_at: DateTime<Utc>,
}

/// The order representation accepted for creation and carried by dispatch messages.
///
/// Only `products` is meaningful for creation: identity, status, total and timestamps are
/// assigned by the service and whatever the caller sent for them is ignored. A value of the
/// wrong shape in one of those fields reads as absent rather than failing the whole draft.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderDraft {
  #[serde(default, deserialize_with = "lenient")]
  pub id: Option<Uuid>,
  #[serde(default, deserialize_with = "lenient")]
  pub external_id: Option<String>,
  #[serde(default, deserialize_with = "lenient")]
  pub status: Option<OrderStatus>,
  #[serde(default)]
  pub products: Vec<Product>,
  #[serde(default, deserialize_with = "lenient")]
  pub total_amount: Option<Decimal>,
  #[serde(default, deserialize_with = "lenient")]
  pub created_at: Option<DateTime<Utc>>,
  #[serde(default, deserialize_with = "lenient")]
  pub updated_at: Option<DateTime<Utc>>,
}

fn lenient<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
  D: Deserializer<'de>,
  T: DeserializeOwned,
{
  let raw = Option::<serde_json::Value>::deserialize(deserializer)?;
  Ok(raw.and_then(|value| serde_json::from_value(value).ok()))
}

impl OrderDraft {
  pub fn with_products(products: Vec<Product>) -> Self {
    Self {
      products,
      ..Default::default()
    }
  }
}

impl From<&Order> for OrderDraft {
  fn from(order: &Order) -> Self {
    Self {
      id: Some(order.id),
      external_id: Some(order.external_id.clone()),
      status: Some(order.status),
      products: order.products.clone(),
      total_amount: Some(order.total_amount),
      created_at: Some(order.created_at),
      updated_at: Some(order.updated_at),
    }
  }
}
