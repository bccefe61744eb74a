// orderflow_server/src/web/handlers/product_handlers.rs

use actix_web::{web, HttpResponse};
use tracing::{info, instrument};

use crate::errors::AppError;
use crate::state::AppState;

#[instrument(name = "handler::service_a_products", skip(app_state))]
pub async fn service_a_products_handler(app_state: web::Data<AppState>) -> Result<HttpResponse, AppError> {
  let products = app_state.service.external_products();
  Ok(HttpResponse::Ok().json(products))
}

#[instrument(name = "handler::service_b_products", skip(app_state))]
pub async fn service_b_products_handler(app_state: web::Data<AppState>) -> Result<HttpResponse, AppError> {
  let products = app_state.service.completed_products().await?;
  info!("Fetched {} products of completed orders.", products.len());
  Ok(HttpResponse::Ok().json(products))
}
