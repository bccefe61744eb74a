// orderflow_server/src/web/handlers/order_handlers.rs

use actix_web::{web, HttpResponse};
use chrono::NaiveDate;
use orderflow::{OrderDraft, OrderFilter, OrderStatus, PageRequest};
use serde::Deserialize;
use serde_json::json;
use tracing::{error, info, instrument};
use uuid::Uuid;

use crate::errors::AppError;
use crate::state::AppState;

pub const ORDER_PROCESSED: &str = "Order processed successfully.";
pub const ORDER_QUEUED: &str = "Order queued for processing.";

#[derive(Deserialize, Debug)]
pub struct StatusUpdateRequest {
  pub id: Uuid,
  pub status: OrderStatus,
}

#[derive(Deserialize, Debug, Default)]
#[serde(rename_all = "camelCase")]
pub struct ListOrdersQuery {
  pub status: Option<String>,
  pub start_date: Option<NaiveDate>,
  pub end_date: Option<NaiveDate>,
  pub page: Option<u32>,
  pub size: Option<u32>,
}

impl ListOrdersQuery {
  fn into_parts(self) -> Result<(OrderFilter, PageRequest), AppError> {
    let status = self.status.map(|raw| raw.parse::<OrderStatus>()).transpose()?;
    let defaults = PageRequest::default();
    let request = PageRequest::new(
      self.page.unwrap_or(defaults.page()),
      self.size.unwrap_or(defaults.size()),
    );
    let filter = OrderFilter {
      status,
      start_date: self.start_date,
      end_date: self.end_date,
    };
    Ok((filter, request))
  }
}

#[instrument(name = "handler::create_order", skip(app_state, payload), fields(products = payload.products.len()))]
pub async fn create_order_handler(
  app_state: web::Data<AppState>,
  payload: web::Json<OrderDraft>,
) -> Result<HttpResponse, AppError> {
  let order = app_state.service.create_order(payload.into_inner()).await?;
  Ok(HttpResponse::Created().json(order))
}

/// Publishes the order to the broker. Failures answer 500 with a plain-text explanation.
#[instrument(name = "handler::process_order", skip(app_state, payload))]
pub async fn process_order_handler(app_state: web::Data<AppState>, payload: web::Json<OrderDraft>) -> HttpResponse {
  match app_state.service.process_order(&payload).await {
    Ok(()) => HttpResponse::Ok().content_type("text/plain; charset=utf-8").body(ORDER_PROCESSED),
    Err(e) => {
      error!(error = %e, "Failed to dispatch order.");
      HttpResponse::InternalServerError()
        .content_type("text/plain; charset=utf-8")
        .body(format!("Error processing order: {}", e))
    }
  }
}

/// Hands the order to the in-process queue and returns before it is published.
#[instrument(name = "handler::queue_order", skip(app_state, payload))]
pub async fn queue_order_handler(
  app_state: web::Data<AppState>,
  payload: web::Json<OrderDraft>,
) -> Result<HttpResponse, AppError> {
  app_state.order_queue.enqueue(payload.into_inner())?;
  info!("Order accepted by the in-process queue.");
  Ok(HttpResponse::Accepted().json(json!({ "message": ORDER_QUEUED })))
}

#[instrument(
  name = "handler::update_order_status",
  skip(app_state, path, payload),
  fields(external_id = %path.as_str(), order_id = %payload.id, requested = %payload.status)
)]
pub async fn update_order_status_handler(
  app_state: web::Data<AppState>,
  path: web::Path<String>,
  payload: web::Json<StatusUpdateRequest>,
) -> Result<HttpResponse, AppError> {
  let external_id = path.into_inner();
  let StatusUpdateRequest { id, status } = payload.into_inner();
  let order = app_state.service.update_status(&external_id, id, status).await?;
  Ok(HttpResponse::Ok().json(order))
}

#[instrument(name = "handler::list_orders", skip(app_state))]
pub async fn list_orders_handler(
  app_state: web::Data<AppState>,
  query: web::Query<ListOrdersQuery>,
) -> Result<HttpResponse, AppError> {
  let (filter, request) = query.into_inner().into_parts()?;
  let page = app_state.service.list_orders(&filter, request).await?;
  info!(returned = page.content.len(), total = page.total_elements, "Orders listed.");
  Ok(HttpResponse::Ok().json(page))
}
