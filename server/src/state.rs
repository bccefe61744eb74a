// orderflow_server/src/state.rs
use crate::config::AppConfig;
use orderflow::dispatch::OrderQueue;
use orderflow::OrderService;
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
  pub service: Arc<OrderService>,
  pub order_queue: Arc<OrderQueue>,
  pub config: Arc<AppConfig>, // Share loaded config
}
