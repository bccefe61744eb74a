// orderflow/src/dispatch/publisher.rs

use super::broker::{ExchangeKind, MessageBroker};
use crate::error::{OrderError, OrderResult};
use crate::model::OrderDraft;
use std::sync::Arc;
use tracing::{debug, instrument};

pub const ORDER_EXCHANGE: &str = "order-exchange";
pub const ORDER_QUEUE: &str = "order-queue";
pub const ORDER_ROUTING_KEY: &str = "order.routing.key";

/// Names of the exchange, queue and routing key orders travel through.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BrokerTopology {
  pub exchange: String,
  pub queue: String,
  pub routing_key: String,
}

impl Default for BrokerTopology {
  fn default() -> Self {
    Self {
      exchange: ORDER_EXCHANGE.to_string(),
      queue: ORDER_QUEUE.to_string(),
      routing_key: ORDER_ROUTING_KEY.to_string(),
    }
  }
}

/// Declares the topic exchange and the durable queue, and binds them with the routing key.
/// Safe to call more than once.
pub async fn declare_topology(broker: &dyn MessageBroker, topology: &BrokerTopology) -> OrderResult<()> {
  broker.declare_exchange(&topology.exchange, ExchangeKind::Topic).await?;
  broker.declare_queue(&topology.queue, true).await?;
  broker
    .bind_queue(&topology.queue, &topology.exchange, &topology.routing_key)
    .await?;
  debug!(?topology, "Order broker topology declared.");
  Ok(())
}

/// Serializes orders to JSON and publishes them under the fixed exchange and routing key.
#[derive(Clone)]
pub struct OrderPublisher {
  broker: Arc<dyn MessageBroker>,
  exchange: String,
  routing_key: String,
}

impl OrderPublisher {
  pub fn new(broker: Arc<dyn MessageBroker>, topology: &BrokerTopology) -> Self {
    Self {
      broker,
      exchange: topology.exchange.clone(),
      routing_key: topology.routing_key.clone(),
    }
  }

  #[instrument(
    name = "publisher::publish_order",
    skip(self, order),
    fields(exchange = %self.exchange, routing_key = %self.routing_key, external_id = ?order.external_id)
  )]
  pub async fn publish(&self, order: &OrderDraft) -> OrderResult<()> {
    let payload = serde_json::to_vec(order)
      .map_err(|e| OrderError::DispatchFailure(format!("Order could not be serialized: {}", e)))?;
    self.broker.publish(&self.exchange, &self.routing_key, payload).await
  }
}
