// orderflow/src/dispatch/memory_broker.rs

use super::broker::{Delivery, DeliveryStream, ExchangeKind, Message, MessageBroker, Settle, Settlement};
use super::topic;
use crate::error::{OrderError, OrderResult};
use async_trait::async_trait;
use parking_lot::{Mutex, RwLock};
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::Notify;
use tracing::{debug, instrument, trace};

#[derive(Debug)]
struct Binding {
  queue: String,
  key: String,
}

#[derive(Debug)]
struct Exchange {
  kind: ExchangeKind,
  bindings: Vec<Binding>,
}

impl Exchange {
  fn routes_to<'a>(&'a self, routing_key: &'a str) -> impl Iterator<Item = &'a str> + 'a {
    self
      .bindings
      .iter()
      .filter(move |binding| match self.kind {
        ExchangeKind::Direct => binding.key == routing_key,
        ExchangeKind::Topic => topic::matches(&binding.key, routing_key),
      })
      .map(|binding| binding.queue.as_str())
  }
}

#[derive(Debug)]
struct QueueState {
  name: String,
  durable: bool,
  ready: Mutex<VecDeque<Message>>,
  in_flight: AtomicUsize,
  available: Notify,
}

impl QueueState {
  fn new(name: &str, durable: bool) -> Self {
    Self {
      name: name.to_string(),
      durable,
      ready: Mutex::new(VecDeque::new()),
      in_flight: AtomicUsize::new(0),
      available: Notify::new(),
    }
  }

  fn push_back(&self, message: Message) {
    self.ready.lock().push_back(message);
    self.available.notify_one();
  }

  fn take(&self) -> Option<(Message, bool)> {
    let mut ready = self.ready.lock();
    let message = ready.pop_front()?;
    self.in_flight.fetch_add(1, Ordering::AcqRel);
    Some((message, !ready.is_empty()))
  }
}

impl Settle for QueueState {
  fn settle(&self, mut message: Message, settlement: Settlement) {
    self.in_flight.fetch_sub(1, Ordering::AcqRel);
    match settlement {
      Settlement::Ack => trace!(queue = %self.name, "Message acknowledged."),
      Settlement::Discard => debug!(queue = %self.name, "Message rejected without requeue, dropping it."),
      Settlement::Requeue => {
        debug!(queue = %self.name, "Message returned to the queue.");
        message.redelivered = true;
        self.ready.lock().push_front(message);
        self.available.notify_one();
      }
    }
  }
}

struct QueueConsumer {
  state: Arc<QueueState>,
}

#[async_trait]
impl DeliveryStream for QueueConsumer {
  async fn next_delivery(&self) -> OrderResult<Delivery> {
    loop {
      if let Some((message, more_waiting)) = self.state.take() {
        if more_waiting {
          // let an idle sibling worker pick up the rest
          self.state.available.notify_one();
        }
        return Ok(Delivery::new(message, self.state.clone()));
      }
      self.state.available.notified().await;
    }
  }

  fn backlog(&self) -> usize {
    self.state.ready.lock().len()
  }
}

/// A broker living in process memory, with AMQP-like exchanges, queues and bindings.
///
/// Messages are not persisted: `durable` is recorded but a process restart loses every queue.
#[derive(Debug, Default)]
pub struct InMemoryBroker {
  exchanges: RwLock<HashMap<String, Exchange>>,
  queues: RwLock<HashMap<String, Arc<QueueState>>>,
  published: AtomicU64,
}

impl InMemoryBroker {
  pub fn new() -> Self {
    Self::default()
  }

  /// Messages waiting in `queue`, `None` if it was never declared.
  pub fn queue_depth(&self, queue: &str) -> Option<usize> {
    self.queues.read().get(queue).map(|state| state.ready.lock().len())
  }

  /// Messages handed to consumers and not yet settled.
  pub fn in_flight(&self, queue: &str) -> Option<usize> {
    self
      .queues
      .read()
      .get(queue)
      .map(|state| state.in_flight.load(Ordering::Acquire))
  }

  pub fn is_durable(&self, queue: &str) -> Option<bool> {
    self.queues.read().get(queue).map(|state| state.durable)
  }

  /// Number of successful `publish` calls, routed or not.
  pub fn published(&self) -> u64 {
    self.published.load(Ordering::Acquire)
  }

  fn queue(&self, name: &str) -> OrderResult<Arc<QueueState>> {
    self
      .queues
      .read()
      .get(name)
      .cloned()
      .ok_or_else(|| OrderError::DispatchFailure(format!("Queue '{}' not found", name)))
  }
}

#[async_trait]
impl MessageBroker for InMemoryBroker {
  async fn declare_exchange(&self, name: &str, kind: ExchangeKind) -> OrderResult<()> {
    let mut exchanges = self.exchanges.write();
    match exchanges.get(name) {
      Some(existing) if existing.kind != kind => Err(OrderError::DispatchFailure(format!(
        "Exchange '{}' already declared as {:?}",
        name, existing.kind
      ))),
      Some(_) => Ok(()),
      None => {
        exchanges.insert(
          name.to_string(),
          Exchange {
            kind,
            bindings: Vec::new(),
          },
        );
        debug!(exchange = %name, ?kind, "Exchange declared.");
        Ok(())
      }
    }
  }

  async fn declare_queue(&self, name: &str, durable: bool) -> OrderResult<()> {
    self
      .queues
      .write()
      .entry(name.to_string())
      .or_insert_with(|| Arc::new(QueueState::new(name, durable)));
    debug!(queue = %name, durable, "Queue declared.");
    Ok(())
  }

  async fn bind_queue(&self, queue: &str, exchange: &str, binding_key: &str) -> OrderResult<()> {
    self.queue(queue)?;
    let mut exchanges = self.exchanges.write();
    let target = exchanges
      .get_mut(exchange)
      .ok_or_else(|| OrderError::DispatchFailure(format!("Exchange '{}' not found", exchange)))?;
    let already_bound = target
      .bindings
      .iter()
      .any(|binding| binding.queue == queue && binding.key == binding_key);
    if !already_bound {
      target.bindings.push(Binding {
        queue: queue.to_string(),
        key: binding_key.to_string(),
      });
    }
    debug!(%queue, %exchange, %binding_key, "Queue bound.");
    Ok(())
  }

  #[instrument(name = "memory_broker::publish", skip(self, payload), fields(payload_len = payload.len()))]
  async fn publish(&self, exchange: &str, routing_key: &str, payload: Vec<u8>) -> OrderResult<()> {
    let mut targets: Vec<String> = {
      let exchanges = self.exchanges.read();
      let source = exchanges
        .get(exchange)
        .ok_or_else(|| OrderError::DispatchFailure(format!("Exchange '{}' not found", exchange)))?;
      source.routes_to(routing_key).map(str::to_string).collect()
    };
    targets.sort();
    targets.dedup();

    if targets.is_empty() {
      debug!("No queue bound for routing key, message dropped.");
    }

    for queue in targets {
      self.queue(&queue)?.push_back(Message {
        routing_key: routing_key.to_string(),
        payload: payload.clone(),
        redelivered: false,
      });
      trace!(%queue, "Message enqueued.");
    }
    self.published.fetch_add(1, Ordering::AcqRel);
    Ok(())
  }

  async fn consume(&self, queue: &str) -> OrderResult<Arc<dyn DeliveryStream>> {
    let state = self.queue(queue)?;
    Ok(Arc::new(QueueConsumer { state }))
  }
}
