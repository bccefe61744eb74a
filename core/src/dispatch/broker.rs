// orderflow/src/dispatch/broker.rs

use crate::error::OrderResult;
use async_trait::async_trait;
use std::fmt;
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExchangeKind {
  /// Routing key must equal the binding key.
  Direct,
  /// Binding keys are patterns, see `dispatch::topic`.
  Topic,
}

/// A message sitting in (or taken from) a queue.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
  pub routing_key: String,
  pub payload: Vec<u8>,
  /// Set once the message has been handed out before and came back unacknowledged.
  pub redelivered: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Settlement {
  Ack,
  Requeue,
  Discard,
}

/// Broker side of a delivery: told what happened to the message once the consumer is done.
pub trait Settle: Send + Sync {
  fn settle(&self, message: Message, settlement: Settlement);
}

/// A message handed to a consumer.
///
/// Exactly one of `ack` / `reject` should be called. A delivery dropped without either goes
/// back to its queue, so a worker that dies mid-message does not lose it.
pub struct Delivery {
  message: Option<Message>,
  settle: Arc<dyn Settle>,
}

impl Delivery {
  pub fn new(message: Message, settle: Arc<dyn Settle>) -> Self {
    Self {
      message: Some(message),
      settle,
    }
  }

  pub fn payload(&self) -> &[u8] {
    self.message.as_ref().map(|m| m.payload.as_slice()).unwrap_or_default()
  }

  pub fn routing_key(&self) -> &str {
    self.message.as_ref().map(|m| m.routing_key.as_str()).unwrap_or_default()
  }

  pub fn redelivered(&self) -> bool {
    self.message.as_ref().is_some_and(|m| m.redelivered)
  }

  /// Commits the message; it will not be delivered again.
  pub fn ack(mut self) {
    self.finish(Settlement::Ack);
  }

  /// Gives the message back to the queue (`requeue`) or drops it.
  pub fn reject(mut self, requeue: bool) {
    self.finish(if requeue { Settlement::Requeue } else { Settlement::Discard });
  }

  fn finish(&mut self, settlement: Settlement) {
    if let Some(message) = self.message.take() {
      self.settle.settle(message, settlement);
    }
  }
}

impl Drop for Delivery {
  fn drop(&mut self) {
    self.finish(Settlement::Requeue);
  }
}

impl fmt::Debug for Delivery {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("Delivery").field("message", &self.message).finish()
  }
}

/// Consumer end of a queue. Shared by all workers of a pool; each call hands out a
/// different message.
#[async_trait]
pub trait DeliveryStream: Send + Sync + 'static {
  /// Waits until a message is available.
  async fn next_delivery(&self) -> OrderResult<Delivery>;

  /// Messages waiting in the queue, not counting ones currently handed out.
  fn backlog(&self) -> usize;
}

/// Publish/subscribe transport. Treated as an opaque channel by the rest of the crate.
#[async_trait]
pub trait MessageBroker: Send + Sync + 'static {
  async fn declare_exchange(&self, name: &str, kind: ExchangeKind) -> OrderResult<()>;

  async fn declare_queue(&self, name: &str, durable: bool) -> OrderResult<()>;

  async fn bind_queue(&self, queue: &str, exchange: &str, binding_key: &str) -> OrderResult<()>;

  /// Routes `payload` through `exchange`. Fails with `DispatchFailure` when the exchange
  /// does not exist or the transport is unavailable.
  async fn publish(&self, exchange: &str, routing_key: &str, payload: Vec<u8>) -> OrderResult<()>;

  async fn consume(&self, queue: &str) -> OrderResult<Arc<dyn DeliveryStream>>;
}
