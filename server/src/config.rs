// orderflow_server/src/config.rs

use crate::errors::{AppError, Result};
use dotenvy::dotenv;
use orderflow::dispatch::{BrokerTopology, ConcurrencyBounds, ORDER_EXCHANGE, ORDER_QUEUE, ORDER_ROUTING_KEY};
use std::env;
use std::str::FromStr;

/// Where orders are persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreBackend {
  Postgres {
    database_url: String,
    max_connections: u32,
    run_migrations: bool,
  },
  /// Process memory only, lost on restart.
  Memory,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
  pub server_host: String,
  pub server_port: u16,
  pub store: StoreBackend,
  pub topology: BrokerTopology,
  pub listener_concurrency: ConcurrencyBounds,
  pub listener_requeue_rejected: bool,
  /// Start the consumer pool that turns broker messages into orders.
  pub start_listener: bool,
}

impl AppConfig {
  pub fn from_env() -> Result<Self> {
    dotenv().ok(); // Load .env file if present
    Self::from_lookup(|var_name| env::var(var_name).ok())
  }

  /// Builds the configuration from any variable source. `lookup` returns `None` for unset
  /// variables.
  pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
    let get_env = |var_name: &str| {
      lookup(var_name).ok_or_else(|| AppError::Config(format!("Missing environment variable '{}'", var_name)))
    };
    let get_or = |var_name: &str, default: &str| lookup(var_name).unwrap_or_else(|| default.to_string());

    let server_host = get_or("SERVER_HOST", "127.0.0.1");
    let server_port = parse_var::<u16>("SERVER_PORT", &get_or("SERVER_PORT", "8080"))?;

    let store = match get_or("ORDER_STORE", "postgres").to_ascii_lowercase().as_str() {
      "postgres" => StoreBackend::Postgres {
        database_url: get_env("DATABASE_URL")?,
        max_connections: parse_var("DB_MAX_CONNECTIONS", &get_or("DB_MAX_CONNECTIONS", "10"))?,
        run_migrations: parse_var("RUN_MIGRATIONS", &get_or("RUN_MIGRATIONS", "true"))?,
      },
      "memory" => StoreBackend::Memory,
      other => {
        return Err(AppError::Config(format!(
          "Invalid ORDER_STORE value '{}': expected 'postgres' or 'memory'",
          other
        )))
      }
    };

    let topology = BrokerTopology {
      exchange: get_or("ORDER_EXCHANGE", ORDER_EXCHANGE),
      queue: get_or("ORDER_QUEUE", ORDER_QUEUE),
      routing_key: get_or("ORDER_ROUTING_KEY", ORDER_ROUTING_KEY),
    };

    let listener_concurrency = get_or("LISTENER_CONCURRENCY", "5-10")
      .parse::<ConcurrencyBounds>()
      .map_err(|e| AppError::Config(e.to_string()))?;
    let listener_requeue_rejected = parse_var(
      "LISTENER_REQUEUE_REJECTED",
      &get_or("LISTENER_REQUEUE_REJECTED", "false"),
    )?;
    let start_listener = parse_var("START_LISTENER", &get_or("START_LISTENER", "true"))?;

    tracing::info!("Application configuration loaded successfully.");
    // DATABASE_URL is never logged.
    tracing::debug!(
      store = if store == StoreBackend::Memory { "memory" } else { "postgres" },
      %listener_concurrency,
      ?topology,
      "Loaded config details"
    );

    Ok(Self {
      server_host,
      server_port,
      store,
      topology,
      listener_concurrency,
      listener_requeue_rejected,
      start_listener,
    })
  }

  pub fn bind_address(&self) -> String {
    format!("{}:{}", self.server_host, self.server_port)
  }
}

fn parse_var<T>(var_name: &str, raw: &str) -> Result<T>
where
  T: FromStr,
  T::Err: std::fmt::Display,
{
  raw
    .trim()
    .parse::<T>()
    .map_err(|e| AppError::Config(format!("Invalid {} value '{}': {}", var_name, raw, e)))
}
