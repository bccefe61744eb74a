// orderflow/src/dispatch/queue.rs

use crate::error::{OrderError, OrderResult};
use crate::model::OrderDraft;
use async_trait::async_trait;
use parking_lot::Mutex;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// Whatever the in-process queue feeds its orders to.
#[async_trait]
pub trait OrderProcessor: Send + Sync + 'static {
  async fn process(&self, order: OrderDraft) -> OrderResult<()>;
}

/// Unbounded in-memory hand-off with exactly one background worker.
///
/// Orders are processed strictly in submission order. A failing (or panicking) item is logged
/// and the worker moves on to the next one. The worker stops when the shutdown token is
/// cancelled; orders still waiting at that point are dropped.
pub struct OrderQueue {
  sender: mpsc::UnboundedSender<OrderDraft>,
  shutdown: CancellationToken,
  worker: Mutex<Option<JoinHandle<()>>>,
}

impl OrderQueue {
  /// Spawns the worker on the current tokio runtime.
  pub fn start(processor: Arc<dyn OrderProcessor>, shutdown: CancellationToken) -> Self {
    let (sender, receiver) = mpsc::unbounded_channel();
    let worker = tokio::spawn(run_worker(processor, receiver, shutdown.clone()));
    info!("In-process order queue worker started.");
    Self {
      sender,
      shutdown,
      worker: Mutex::new(Some(worker)),
    }
  }

  /// Never blocks. Fails only once the worker has stopped.
  pub fn enqueue(&self, order: OrderDraft) -> OrderResult<()> {
    self
      .sender
      .send(order)
      .map_err(|_| OrderError::DispatchFailure("Order queue is closed".to_string()))
  }

  pub fn is_running(&self) -> bool {
    !self.sender.is_closed()
  }

  /// Cancels the worker and waits for it to finish the item it is working on.
  pub async fn shutdown(&self) {
    self.shutdown.cancel();
    let handle = self.worker.lock().take();
    if let Some(handle) = handle {
      if let Err(join_err) = handle.await {
        error!(error = %join_err, "In-process order queue worker ended abnormally.");
      }
      info!("In-process order queue worker stopped.");
    }
  }
}

async fn run_worker(
  processor: Arc<dyn OrderProcessor>,
  mut receiver: mpsc::UnboundedReceiver<OrderDraft>,
  shutdown: CancellationToken,
) {
  loop {
    let order = tokio::select! {
      biased;
      _ = shutdown.cancelled() => break,
      next = receiver.recv() => match next {
        Some(order) => order,
        None => break,
      },
    };

    let external_id = order.external_id.clone();
    let processor = processor.clone();
    // Own task per item so a panic stays contained to that item.
    match tokio::spawn(async move { processor.process(order).await }).await {
      Ok(Ok(())) => debug!(?external_id, "Queued order processed."),
      Ok(Err(e)) => error!(error = %e, ?external_id, "Failed to process queued order, continuing with the next one."),
      Err(join_err) => error!(error = %join_err, ?external_id, "Queued order processing panicked, continuing with the next one."),
    }
  }

  receiver.close();
  let mut dropped = 0usize;
  while receiver.try_recv().is_ok() {
    dropped += 1;
  }
  if dropped > 0 {
    warn!(dropped, "Order queue stopped with unprocessed orders.");
  }
}
