// tests/common/mod.rs
#![allow(dead_code)] // Allow unused code in this common test module

use once_cell::sync::Lazy;
use orderflow::dispatch::InMemoryBroker;
use orderflow::InMemoryOrderStore;
use orderflow_server::app::Application;
use orderflow_server::config::AppConfig;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tracing::Level;

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

pub fn test_config(start_listener: bool) -> AppConfig {
  let vars: HashMap<&str, &str> = HashMap::from([
    ("ORDER_STORE", "memory"),
    ("LISTENER_CONCURRENCY", "1-2"),
    ("START_LISTENER", if start_listener { "true" } else { "false" }),
  ]);
  AppConfig::from_lookup(|name| vars.get(name).map(|v| v.to_string())).unwrap()
}

pub struct TestApp {
  pub application: Application,
  pub store: Arc<InMemoryOrderStore>,
  pub broker: Arc<InMemoryBroker>,
}

/// Application over the in-memory store and broker.
pub async fn spawn_app(start_listener: bool) -> TestApp {
  setup_tracing();
  let store = Arc::new(InMemoryOrderStore::new());
  let broker = Arc::new(InMemoryBroker::new());
  let application = Application::start(Arc::new(test_config(start_listener)), store.clone(), broker.clone())
    .await
    .unwrap();
  TestApp {
    application,
    store,
    broker,
  }
}

/// Initialises the routed actix service around an `AppState`.
#[macro_export]
macro_rules! init_app {
  ($state:expr) => {
    actix_web::test::init_service(
      actix_web::App::new()
        .app_data(actix_web::web::Data::new($state))
        .configure(orderflow_server::web::configure_app_routes),
    )
    .await
  };
}

pub fn order_body() -> Value {
  json!({
    "products": [
      { "name": "Keyboard", "price": "50.00", "quantity": 2 },
      { "name": "Monitor", "price": "100.00", "quantity": 1 }
    ]
  })
}

/// Polls `condition` until it holds, failing the test after two seconds.
pub async fn eventually<F, Fut>(mut condition: F)
where
  F: FnMut() -> Fut,
  Fut: std::future::Future<Output = bool>,
{
  for _ in 0..100 {
    if condition().await {
      return;
    }
    tokio::time::sleep(Duration::from_millis(20)).await;
  }
  panic!("condition not reached in time");
}
