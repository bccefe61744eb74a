// tests/common/mod.rs
#![allow(dead_code)] // Allow unused code in this common test module

use async_trait::async_trait;
use orderflow::dispatch::{declare_topology, BrokerTopology, InMemoryBroker, OrderPublisher};
use orderflow::{
  InMemoryOrderStore, Order, OrderError, OrderFilter, OrderResult, OrderService, OrderStatus, OrderStore, Page,
  PageRequest, Product,
};
use rust_decimal::Decimal;
use std::str::FromStr;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use tracing::Level;
use uuid::Uuid;

// --- Helper for Tracing Setup (call once per test run if needed) ---
use once_cell::sync::Lazy;
static TRACING_INIT: Lazy<()> = Lazy::new(|| {
  tracing_subscriber::fmt()
    .with_max_level(Level::DEBUG)
    .with_test_writer()
    .try_init()
    .ok();
});

pub fn setup_tracing() {
  Lazy::force(&TRACING_INIT);
}

// --- Builders ---
pub fn decimal(value: &str) -> Decimal {
  Decimal::from_str(value).unwrap()
}

pub fn product(name: &str, price: &str, quantity: i32) -> Product {
  Product::new(name, decimal(price), quantity)
}

// --- Store double that records every call ---
#[derive(Default)]
pub struct RecordingStore {
  pub inner: InMemoryOrderStore,
  pub inserts: AtomicUsize,
  pub lookups: AtomicUsize,
  pub status_updates: AtomicUsize,
  pub page_queries: AtomicUsize,
  pub fail_inserts: AtomicBool,
}

impl RecordingStore {
  pub fn writes(&self) -> usize {
    self.inserts.load(Ordering::SeqCst) + self.status_updates.load(Ordering::SeqCst)
  }
}

#[async_trait]
impl OrderStore for RecordingStore {
  async fn insert(&self, order: &Order) -> OrderResult<Order> {
    self.inserts.fetch_add(1, Ordering::SeqCst);
    if self.fail_inserts.load(Ordering::SeqCst) {
      return Err(OrderError::store(anyhow::anyhow!("simulated store outage")));
    }
    self.inner.insert(order).await
  }

  async fn find_by_id_and_external_id(&self, id: Uuid, external_id: &str) -> OrderResult<Option<Order>> {
    self.lookups.fetch_add(1, Ordering::SeqCst);
    self.inner.find_by_id_and_external_id(id, external_id).await
  }

  async fn update_status(&self, order: &Order) -> OrderResult<Order> {
    self.status_updates.fetch_add(1, Ordering::SeqCst);
    self.inner.update_status(order).await
  }

  async fn find_page(&self, filter: &OrderFilter, request: PageRequest) -> OrderResult<Page<Order>> {
    self.page_queries.fetch_add(1, Ordering::SeqCst);
    self.inner.find_page(filter, request).await
  }

  async fn find_by_status(&self, status: OrderStatus) -> OrderResult<Vec<Order>> {
    self.inner.find_by_status(status).await
  }
}

// --- Fully wired service over in-memory infrastructure ---
pub struct Harness {
  pub store: Arc<RecordingStore>,
  pub broker: Arc<InMemoryBroker>,
  pub topology: BrokerTopology,
  pub service: Arc<OrderService>,
}

pub async fn harness() -> Harness {
  setup_tracing();
  let store = Arc::new(RecordingStore::default());
  let broker = Arc::new(InMemoryBroker::new());
  let topology = BrokerTopology::default();
  declare_topology(broker.as_ref(), &topology).await.unwrap();
  let publisher = OrderPublisher::new(broker.clone(), &topology);
  let service = Arc::new(OrderService::new(store.clone(), publisher));
  Harness {
    store,
    broker,
    topology,
    service,
  }
}
