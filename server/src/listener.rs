// orderflow_server/src/listener.rs

//! Broker listener: a consumer pool on the order queue that creates every received order.

use async_trait::async_trait;
use orderflow::dispatch::{ConsumerPool, MessageBroker, MessageHandler, PoolSettings};
use orderflow::{OrderDraft, OrderResult, OrderService};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{info, instrument};

use crate::config::AppConfig;

/// Decodes the JSON order carried by a message and creates it. Every delivery creates a new
/// order, so a redelivered message yields a second order.
pub struct OrderCreationHandler {
  service: Arc<OrderService>,
}

impl OrderCreationHandler {
  pub fn new(service: Arc<OrderService>) -> Self {
    Self { service }
  }
}

#[async_trait]
impl MessageHandler for OrderCreationHandler {
  #[instrument(name = "listener::order_received", skip_all, fields(payload_len = payload.len()))]
  async fn handle(&self, payload: &[u8]) -> OrderResult<()> {
    let draft: OrderDraft = serde_json::from_slice(payload)?;
    let order = self.service.create_order(draft).await?;
    info!(order_id = %order.id, external_id = %order.external_id, "Order received from the broker and created.");
    Ok(())
  }
}

/// Subscribes to the configured order queue and starts the consumer pool.
pub async fn start_order_listener(
  broker: &dyn MessageBroker,
  service: Arc<OrderService>,
  config: &AppConfig,
  shutdown: CancellationToken,
) -> OrderResult<ConsumerPool> {
  let stream = broker.consume(&config.topology.queue).await?;
  let settings = PoolSettings {
    bounds: config.listener_concurrency,
    requeue_rejected: config.listener_requeue_rejected,
    ..PoolSettings::default()
  };
  info!(queue = %config.topology.queue, "Starting order listener.");
  Ok(ConsumerPool::start(
    stream,
    Arc::new(OrderCreationHandler::new(service)),
    settings,
    shutdown,
  ))
}
