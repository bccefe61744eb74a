// orderflow/src/dispatch/pool.rs

use super::broker::DeliveryStream;
use crate::error::OrderResult;
use async_trait::async_trait;
use parking_lot::Mutex;
use std::fmt;
use std::str::FromStr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::task::{JoinHandle, JoinSet};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// Pause after the stream itself fails, before asking it again.
const RECEIVE_ERROR_PAUSE: Duration = Duration::from_millis(250);

/// Processes the payload of one delivery. `Ok` acknowledges the message, `Err` rejects it.
#[async_trait]
pub trait MessageHandler: Send + Sync + 'static {
  async fn handle(&self, payload: &[u8]) -> OrderResult<()>;
}

#[derive(Debug, Error, PartialEq, Eq)]
#[error("Invalid consumer concurrency '{0}': expected '<min>-<max>' or '<n>' with 1 <= min <= max")]
pub struct InvalidConcurrency(pub String);

/// Lower and upper bound on the number of concurrent consumers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConcurrencyBounds {
  min: usize,
  max: usize,
}

impl ConcurrencyBounds {
  pub fn new(min: usize, max: usize) -> Result<Self, InvalidConcurrency> {
    if min == 0 || min > max {
      return Err(InvalidConcurrency(format!("{}-{}", min, max)));
    }
    Ok(Self { min, max })
  }

  pub fn fixed(count: usize) -> Result<Self, InvalidConcurrency> {
    Self::new(count, count)
  }

  pub fn min(&self) -> usize {
    self.min
  }

  pub fn max(&self) -> usize {
    self.max
  }
}

impl Default for ConcurrencyBounds {
  fn default() -> Self {
    Self { min: 5, max: 10 }
  }
}

impl FromStr for ConcurrencyBounds {
  type Err = InvalidConcurrency;

  /// Accepts `"5-10"` or `"5"`.
  fn from_str(s: &str) -> Result<Self, Self::Err> {
    let invalid = || InvalidConcurrency(s.to_string());
    let parse = |part: &str| part.trim().parse::<usize>().map_err(|_| invalid());
    match s.split_once('-') {
      Some((min, max)) => Self::new(parse(min)?, parse(max)?).map_err(|_| invalid()),
      None => Self::fixed(parse(s)?).map_err(|_| invalid()),
    }
  }
}

impl fmt::Display for ConcurrencyBounds {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}-{}", self.min, self.max)
  }
}

#[derive(Debug, Clone)]
pub struct PoolSettings {
  pub bounds: ConcurrencyBounds,
  /// Put a message back on its queue when the handler fails, instead of dropping it.
  pub requeue_rejected: bool,
  /// How often the pool checks whether it needs another consumer.
  pub scale_check_interval: Duration,
  /// Consumers above `bounds.min` retire after being idle this long.
  pub idle_timeout: Duration,
}

impl Default for PoolSettings {
  fn default() -> Self {
    Self {
      bounds: ConcurrencyBounds::default(),
      requeue_rejected: false,
      scale_check_interval: Duration::from_millis(100),
      idle_timeout: Duration::from_secs(60),
    }
  }
}

struct PoolShared {
  stream: Arc<dyn DeliveryStream>,
  handler: Arc<dyn MessageHandler>,
  settings: PoolSettings,
  workers: AtomicUsize,
  busy: AtomicUsize,
}

/// Decrements the busy counter when the handler call ends.
struct BusyGuard<'a>(&'a AtomicUsize);

impl<'a> BusyGuard<'a> {
  fn enter(counter: &'a AtomicUsize) -> Self {
    counter.fetch_add(1, Ordering::AcqRel);
    Self(counter)
  }
}

impl Drop for BusyGuard<'_> {
  fn drop(&mut self) {
    self.0.fetch_sub(1, Ordering::AcqRel);
  }
}

/// A bounded pool of consumers pulling from one delivery stream.
///
/// Starts `bounds.min` consumers. When every consumer is busy and messages are waiting, one
/// more is added per check, up to `bounds.max`; extra consumers retire once idle. Consumers
/// pull independently, so there is no ordering across them. A message is acknowledged only
/// after its handler succeeded; a handler error or panic rejects it.
pub struct ConsumerPool {
  shared: Arc<PoolShared>,
  shutdown: CancellationToken,
  supervisor: Mutex<Option<JoinHandle<()>>>,
}

impl ConsumerPool {
  pub fn start(
    stream: Arc<dyn DeliveryStream>,
    handler: Arc<dyn MessageHandler>,
    settings: PoolSettings,
    shutdown: CancellationToken,
  ) -> Self {
    info!(concurrency = %settings.bounds, requeue_rejected = settings.requeue_rejected, "Starting consumer pool.");
    let shared = Arc::new(PoolShared {
      stream,
      handler,
      settings,
      workers: AtomicUsize::new(0),
      busy: AtomicUsize::new(0),
    });
    let supervisor = tokio::spawn(supervise(shared.clone(), shutdown.clone()));
    Self {
      shared,
      shutdown,
      supervisor: Mutex::new(Some(supervisor)),
    }
  }

  /// Consumers currently running.
  pub fn worker_count(&self) -> usize {
    self.shared.workers.load(Ordering::Acquire)
  }

  /// Consumers currently inside the handler.
  pub fn busy_count(&self) -> usize {
    self.shared.busy.load(Ordering::Acquire)
  }

  pub fn bounds(&self) -> ConcurrencyBounds {
    self.shared.settings.bounds
  }

  /// Cancels every consumer and waits for in-progress messages to finish.
  pub async fn shutdown(&self) {
    self.shutdown.cancel();
    let handle = self.supervisor.lock().take();
    if let Some(handle) = handle {
      if let Err(join_err) = handle.await {
        error!(error = %join_err, "Consumer pool supervisor ended abnormally.");
      }
      info!("Consumer pool stopped.");
    }
  }
}

async fn supervise(shared: Arc<PoolShared>, shutdown: CancellationToken) {
  let bounds = shared.settings.bounds;
  let mut workers = JoinSet::new();
  let mut next_worker_id = 0usize;

  let mut spawn_worker = |workers: &mut JoinSet<()>, elastic: bool| {
    next_worker_id += 1;
    shared.workers.fetch_add(1, Ordering::AcqRel);
    workers.spawn(run_worker(shared.clone(), next_worker_id, elastic, shutdown.clone()));
  };

  for _ in 0..bounds.min() {
    spawn_worker(&mut workers, false);
  }

  let mut ticker = tokio::time::interval(shared.settings.scale_check_interval);
  ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

  loop {
    tokio::select! {
      biased;
      _ = shutdown.cancelled() => break,
      Some(joined) = workers.join_next() => {
        shared.workers.fetch_sub(1, Ordering::AcqRel);
        if let Err(join_err) = joined {
          error!(error = %join_err, "Consumer worker died.");
        }
        if workers.len() < bounds.min() {
          warn!("Consumer pool below its minimum, replacing a worker.");
          spawn_worker(&mut workers, false);
        }
      }
      _ = ticker.tick() => {
        let running = workers.len();
        let saturated = shared.busy.load(Ordering::Acquire) >= running;
        if running < bounds.max() && saturated && shared.stream.backlog() > 0 {
          spawn_worker(&mut workers, true);
          debug!(workers = running + 1, "Consumer pool scaled up.");
        }
      }
    }
  }

  while let Some(joined) = workers.join_next().await {
    shared.workers.fetch_sub(1, Ordering::AcqRel);
    if let Err(join_err) = joined {
      error!(error = %join_err, "Consumer worker died during shutdown.");
    }
  }
}

async fn run_worker(shared: Arc<PoolShared>, worker_id: usize, elastic: bool, shutdown: CancellationToken) {
  debug!(worker_id, elastic, "Consumer worker started.");
  let idle_timeout = shared.settings.idle_timeout;

  loop {
    let next = tokio::select! {
      biased;
      _ = shutdown.cancelled() => break,
      _ = tokio::time::sleep(idle_timeout), if elastic => {
        debug!(worker_id, "Idle consumer worker retiring.");
        break;
      }
      next = shared.stream.next_delivery() => next,
    };

    let delivery = match next {
      Ok(delivery) => delivery,
      Err(e) => {
        error!(worker_id, error = %e, "Failed to receive a delivery.");
        tokio::select! {
          _ = shutdown.cancelled() => {}
          _ = tokio::time::sleep(RECEIVE_ERROR_PAUSE) => {}
        }
        continue;
      }
    };

    let result = {
      let _busy = BusyGuard::enter(&shared.busy);
      let handler = shared.handler.clone();
      let payload = delivery.payload().to_vec();
      // Own task per message so a panicking handler settles its delivery like a failure.
      tokio::spawn(async move { handler.handle(&payload).await }).await
    };

    match result {
      Ok(Ok(())) => delivery.ack(),
      Ok(Err(e)) => {
        error!(
          worker_id,
          error = %e,
          redelivered = delivery.redelivered(),
          requeue = shared.settings.requeue_rejected,
          "Message handling failed, rejecting the delivery."
        );
        delivery.reject(shared.settings.requeue_rejected);
      }
      Err(join_err) => {
        error!(
          worker_id,
          error = %join_err,
          redelivered = delivery.redelivered(),
          requeue = shared.settings.requeue_rejected,
          "Message handler panicked, rejecting the delivery."
        );
        delivery.reject(shared.settings.requeue_rejected);
      }
    }
  }
  debug!(worker_id, "Consumer worker stopped.");
}
