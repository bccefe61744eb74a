// orderflow_server/src/web/routes.rs

use crate::errors::AppError;
use crate::web::handlers::{order_handlers, product_handlers};
use actix_web::web;

async fn health_check_handler() -> actix_web::HttpResponse {
  actix_web::HttpResponse::Ok().json(serde_json::json!({ "status": "ok" }))
}

pub fn configure_app_routes(cfg: &mut web::ServiceConfig) {
  // Malformed bodies, query strings and path segments answer with the same JSON error shape
  // as every other client error.
  cfg
    .app_data(web::JsonConfig::default().error_handler(|err, _req| AppError::Validation(err.to_string()).into()))
    .app_data(web::QueryConfig::default().error_handler(|err, _req| AppError::Validation(err.to_string()).into()))
    .app_data(web::PathConfig::default().error_handler(|err, _req| AppError::Validation(err.to_string()).into()))
    .route("/health", web::get().to(health_check_handler))
    .service(
      web::scope("/api")
        .service(
          web::scope("/orders")
            .service(
              web::resource("")
                .route(web::post().to(order_handlers::create_order_handler))
                .route(web::get().to(order_handlers::list_orders_handler)),
            )
            .route("/process", web::post().to(order_handlers::process_order_handler))
            .route("/queue", web::post().to(order_handlers::queue_order_handler))
            .route(
              "/{external_id}/status",
              web::put().to(order_handlers::update_order_status_handler),
            ),
        )
        .service(
          web::scope("/products")
            .route("/service-a", web::get().to(product_handlers::service_a_products_handler))
            .route("/service-b", web::get().to(product_handlers::service_b_products_handler)),
        ),
    );
}
