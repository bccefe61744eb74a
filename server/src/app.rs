// orderflow_server/src/app.rs

use crate::config::{AppConfig, StoreBackend};
use crate::db::PgOrderStore;
use crate::errors::Result;
use crate::listener;
use crate::state::AppState;
use futures_util::future;
use orderflow::dispatch::{declare_topology, ConsumerPool, MessageBroker, OrderPublisher, OrderQueue};
use orderflow::{InMemoryOrderStore, OrderService, OrderStore};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::info;

/// Builds the order store selected by the configuration, running migrations when asked to.
pub async fn connect_store(config: &AppConfig) -> Result<Arc<dyn OrderStore>> {
  match &config.store {
    StoreBackend::Postgres {
      database_url,
      max_connections,
      run_migrations,
    } => {
      let store = PgOrderStore::connect(database_url, *max_connections).await?;
      if *run_migrations {
        store.migrate().await?;
      }
      Ok(Arc::new(store))
    }
    StoreBackend::Memory => {
      info!("Using the in-memory order store; orders are lost on restart.");
      Ok(Arc::new(InMemoryOrderStore::new()))
    }
  }
}

/// The running services behind the HTTP surface: the order service plus its two background
/// dispatch workers, all stopped by one cancellation token.
pub struct Application {
  pub state: AppState,
  listener: Option<ConsumerPool>,
  shutdown: CancellationToken,
}

impl Application {
  pub async fn start(
    config: Arc<AppConfig>,
    store: Arc<dyn OrderStore>,
    broker: Arc<dyn MessageBroker>,
  ) -> Result<Self> {
    declare_topology(broker.as_ref(), &config.topology).await?;

    let publisher = OrderPublisher::new(broker.clone(), &config.topology);
    let service = Arc::new(OrderService::new(store, publisher));
    let shutdown = CancellationToken::new();

    let order_queue = Arc::new(OrderQueue::start(service.clone(), shutdown.clone()));
    let listener = if config.start_listener {
      Some(listener::start_order_listener(broker.as_ref(), service.clone(), &config, shutdown.clone()).await?)
    } else {
      info!("Order listener disabled by configuration.");
      None
    };

    Ok(Self {
      state: AppState {
        service,
        order_queue,
        config,
      },
      listener,
      shutdown,
    })
  }

  pub fn listener(&self) -> Option<&ConsumerPool> {
    self.listener.as_ref()
  }

  /// Stops both dispatch workers and waits for the items they are working on.
  pub async fn shutdown(&self) {
    self.shutdown.cancel();
    let listener = async {
      if let Some(pool) = &self.listener {
        pool.shutdown().await;
      }
    };
    future::join(self.state.order_queue.shutdown(), listener).await;
    info!("Dispatch workers stopped.");
  }
}
