// orderflow_server/src/main.rs

use actix_web::{web as actix_data, App, HttpServer};
use anyhow::Context;
use orderflow::dispatch::InMemoryBroker;
use orderflow_server::app::{self, Application};
use orderflow_server::config::AppConfig;
use orderflow_server::web::configure_app_routes;
use std::sync::Arc;
use tracing::Level;
use tracing_subscriber::fmt::format::FmtSpan; // For span events in tracing

fn init_tracing() {
  let filter = tracing_subscriber::EnvFilter::builder()
    .with_default_directive(Level::INFO.into())
    .from_env_lossy(); // Allow RUST_LOG override
  let builder = tracing_subscriber::fmt()
    .with_env_filter(filter)
    .with_span_events(FmtSpan::CLOSE); // Log when spans close, showing duration

  // LOG_FORMAT=json switches to one JSON object per line.
  if std::env::var("LOG_FORMAT").is_ok_and(|format| format.eq_ignore_ascii_case("json")) {
    builder.json().init();
  } else {
    builder.init();
  }
}

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
  dotenvy::dotenv().ok();
  init_tracing();

  tracing::info!("Starting order service...");

  let app_config = Arc::new(AppConfig::from_env().context("Failed to load application configuration")?);
  let store = app::connect_store(&app_config)
    .await
    .context("Failed to initialise the order store")?;
  let broker = Arc::new(InMemoryBroker::new());

  let application = Application::start(app_config.clone(), store, broker)
    .await
    .context("Failed to start the dispatch workers")?;

  let server_address = app_config.bind_address();
  tracing::info!("Attempting to bind server to {}...", server_address);

  let app_state = application.state.clone();
  let server = HttpServer::new(move || {
    App::new()
      .app_data(actix_data::Data::new(app_state.clone())) // Share AppState with handlers
      .wrap(tracing_actix_web::TracingLogger::default()) // Actix middleware for tracing requests
      .configure(configure_app_routes)
  })
  .bind(&server_address)
  .with_context(|| format!("Failed to bind {}", server_address))?
  .run();

  let served = server.await;
  tracing::info!("HTTP server stopped, shutting down dispatch workers.");
  application.shutdown().await;
  served.context("HTTP server failed")
}
