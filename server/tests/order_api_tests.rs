// tests/order_api_tests.rs
mod common;

use actix_web::http::StatusCode;
use actix_web::test;
use common::*;
use orderflow::dispatch::{BrokerTopology, InMemoryBroker, OrderPublisher, OrderQueue};
use orderflow::{InMemoryOrderStore, OrderService};
use orderflow_server::state::AppState;
use rust_decimal::Decimal;
use serde_json::{json, Value};
use serial_test::serial;
use std::str::FromStr;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

fn decimal_field(value: &Value) -> Decimal {
  Decimal::from_str(value.as_str().unwrap()).unwrap()
}

#[actix_web::test]
#[serial]
async fn health_check_reports_ok() {
  let t = spawn_app(false).await;
  let app = init_app!(t.application.state.clone());

  let body: Value = test::call_and_read_body_json(&app, test::TestRequest::get().uri("/health").to_request()).await;

  assert_eq!(body, json!({"status": "ok"}));
  t.application.shutdown().await;
}

#[actix_web::test]
#[serial]
async fn create_order_returns_created_pending_order() {
  let t = spawn_app(false).await;
  let app = init_app!(t.application.state.clone());

  let req = test::TestRequest::post().uri("/api/orders").set_json(order_body()).to_request();
  let resp = test::call_service(&app, req).await;

  assert_eq!(resp.status(), StatusCode::CREATED);
  let body: Value = test::read_body_json(resp).await;
  assert_eq!(body["status"], "PENDING");
  assert_eq!(decimal_field(&body["totalAmount"]), Decimal::from(200));
  assert!(body["externalId"].as_str().unwrap().starts_with("ORD-"));
  assert!(Uuid::parse_str(body["id"].as_str().unwrap()).is_ok());
  assert_eq!(body["products"].as_array().unwrap().len(), 2);
  assert!(body["createdAt"].is_string());
  assert_eq!(t.store.len(), 1);
  t.application.shutdown().await;
}

#[actix_web::test]
#[serial]
async fn create_order_without_products_is_bad_request() {
  let t = spawn_app(false).await;
  let app = init_app!(t.application.state.clone());

  let req = test::TestRequest::post()
    .uri("/api/orders")
    .set_json(json!({"products": []}))
    .to_request();
  let resp = test::call_service(&app, req).await;

  assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
  let body: Value = test::read_body_json(resp).await;
  assert_eq!(body["message"], "The order must contain at least one product.");
  assert!(t.store.is_empty());
  t.application.shutdown().await;
}

#[actix_web::test]
#[serial]
async fn malformed_body_is_bad_request_with_json_error() {
  let t = spawn_app(false).await;
  let app = init_app!(t.application.state.clone());

  let req = test::TestRequest::post()
    .uri("/api/orders")
    .insert_header(("content-type", "application/json"))
    .set_payload("{\"products\": [")
    .to_request();
  let resp = test::call_service(&app, req).await;

  assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
  let body: Value = test::read_body_json(resp).await;
  assert_eq!(body["error"], "Validation failed");
  t.application.shutdown().await;
}

#[actix_web::test]
#[serial]
async fn status_updates_follow_lifecycle_rules() {
  let t = spawn_app(false).await;
  let app = init_app!(t.application.state.clone());
  let created: Value = test::call_and_read_body_json(
    &app,
    test::TestRequest::post().uri("/api/orders").set_json(order_body()).to_request(),
  )
  .await;
  let id = created["id"].as_str().unwrap().to_string();
  let uri = format!("/api/orders/{}/status", created["externalId"].as_str().unwrap());

  let put = |status: &str| {
    test::TestRequest::put()
      .uri(&uri)
      .set_json(json!({"id": id, "status": status}))
      .to_request()
  };

  let resp = test::call_service(&app, put("COMPLETED")).await;
  assert_eq!(resp.status(), StatusCode::OK);
  let body: Value = test::read_body_json(resp).await;
  assert_eq!(body["status"], "COMPLETED");

  let resp = test::call_service(&app, put("COMPLETED")).await;
  assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
  let body: Value = test::read_body_json(resp).await;
  assert_eq!(body["message"], "Only PENDING orders can be marked as COMPLETED.");

  let resp = test::call_service(&app, put("PENDING")).await;
  assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
  let body: Value = test::read_body_json(resp).await;
  assert_eq!(body["message"], "It is not possible to change to PENDING.");

  let resp = test::call_service(&app, put("CANCELLED")).await;
  assert_eq!(resp.status(), StatusCode::OK);
  t.application.shutdown().await;
}

#[actix_web::test]
#[serial]
async fn status_update_of_unknown_order_is_not_found() {
  let t = spawn_app(false).await;
  let app = init_app!(t.application.state.clone());
  let missing = Uuid::new_v4();

  let req = test::TestRequest::put()
    .uri("/api/orders/ORD-1/status")
    .set_json(json!({"id": missing, "status": "COMPLETED"}))
    .to_request();
  let resp = test::call_service(&app, req).await;

  assert_eq!(resp.status(), StatusCode::NOT_FOUND);
  let body: Value = test::read_body_json(resp).await;
  assert_eq!(body["message"], format!("Order not found: {}", missing));
  t.application.shutdown().await;
}

#[actix_web::test]
#[serial]
async fn list_orders_filters_and_pages() {
  let t = spawn_app(false).await;
  let app = init_app!(t.application.state.clone());
  let mut created = Vec::new();
  for _ in 0..3 {
    let order: Value = test::call_and_read_body_json(
      &app,
      test::TestRequest::post().uri("/api/orders").set_json(order_body()).to_request(),
    )
    .await;
    created.push(order);
  }
  let first = &created[0];
  let req = test::TestRequest::put()
    .uri(&format!("/api/orders/{}/status", first["externalId"].as_str().unwrap()))
    .set_json(json!({"id": first["id"], "status": "COMPLETED"}))
    .to_request();
  assert_eq!(test::call_service(&app, req).await.status(), StatusCode::OK);

  let get = |uri: &str| test::TestRequest::get().uri(uri).to_request();

  let page: Value = test::call_and_read_body_json(&app, get("/api/orders")).await;
  assert_eq!(page["totalElements"], 3);
  assert_eq!(page["size"], 20);
  assert_eq!(page["page"], 0);

  let page: Value = test::call_and_read_body_json(&app, get("/api/orders?status=COMPLETED")).await;
  assert_eq!(page["totalElements"], 1);
  assert_eq!(page["content"][0]["id"], first["id"]);

  let page: Value = test::call_and_read_body_json(&app, get("/api/orders?page=1&size=2")).await;
  assert_eq!(page["content"].as_array().unwrap().len(), 1);
  assert_eq!(page["totalPages"], 2);

  let page: Value =
    test::call_and_read_body_json(&app, get("/api/orders?startDate=2000-01-01&endDate=2000-01-31")).await;
  assert_eq!(page["content"], json!([]));
  assert_eq!(page["totalElements"], 0);

  for bad in [
    "/api/orders?startDate=yesterday",
    "/api/orders?status=SHIPPED",
    "/api/orders?size=-1",
  ] {
    let resp = test::call_service(&app, get(bad)).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST, "{}", bad);
  }
  t.application.shutdown().await;
}

#[actix_web::test]
#[serial]
async fn processed_order_is_created_by_the_listener() {
  let t = spawn_app(true).await;
  assert!(t.application.listener().is_some());
  let app = init_app!(t.application.state.clone());

  let req = test::TestRequest::post()
    .uri("/api/orders/process")
    .set_json(order_body())
    .to_request();
  let resp = test::call_service(&app, req).await;

  assert_eq!(resp.status(), StatusCode::OK);
  let body = test::read_body(resp).await;
  assert_eq!(body, "Order processed successfully.");

  let store = t.store.clone();
  eventually(|| {
    let store = store.clone();
    async move { store.len() == 1 }
  })
  .await;
  let snapshot = t.store.snapshot();
  assert_eq!(snapshot[0].total_amount, Decimal::from(200));
  t.application.shutdown().await;
}

#[actix_web::test]
#[serial]
async fn same_order_processed_twice_creates_two_orders() {
  let t = spawn_app(true).await;
  let app = init_app!(t.application.state.clone());

  for _ in 0..2 {
    let req = test::TestRequest::post()
      .uri("/api/orders/process")
      .set_json(order_body())
      .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::OK);
  }

  let store = t.store.clone();
  eventually(|| {
    let store = store.clone();
    async move { store.len() == 2 }
  })
  .await;
  let snapshot = t.store.snapshot();
  assert_ne!(snapshot[0].external_id, snapshot[1].external_id);
  t.application.shutdown().await;
}

#[actix_web::test]
#[serial]
async fn invalid_message_is_rejected_without_creating_an_order() {
  let t = spawn_app(true).await;
  let app = init_app!(t.application.state.clone());

  let req = test::TestRequest::post()
    .uri("/api/orders/process")
    .set_json(json!({"products": []}))
    .to_request();
  assert_eq!(test::call_service(&app, req).await.status(), StatusCode::OK);

  let broker = t.broker.clone();
  eventually(|| {
    let broker = broker.clone();
    async move { broker.queue_depth("order-queue") == Some(0) && broker.in_flight("order-queue") == Some(0) }
  })
  .await;
  assert!(t.store.is_empty());
  t.application.shutdown().await;
}

#[actix_web::test]
#[serial]
async fn overflowing_message_is_rejected_once_and_the_listener_keeps_working() {
  let t = spawn_app(true).await;
  let app = init_app!(t.application.state.clone());
  let overflowing = json!({
    "products": [{ "name": "huge", "price": Decimal::MAX.to_string(), "quantity": 2 }]
  });

  for body in [overflowing, order_body()] {
    let req = test::TestRequest::post()
      .uri("/api/orders/process")
      .set_json(body)
      .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::OK);
  }

  let store = t.store.clone();
  eventually(|| {
    let store = store.clone();
    async move { store.len() == 1 }
  })
  .await;
  let broker = t.broker.clone();
  eventually(|| {
    let broker = broker.clone();
    async move { broker.queue_depth("order-queue") == Some(0) && broker.in_flight("order-queue") == Some(0) }
  })
  .await;
  let snapshot = t.store.snapshot();
  assert_eq!(snapshot[0].total_amount, Decimal::from(200));
  t.application.shutdown().await;
}

#[actix_web::test]
#[serial]
async fn create_order_with_unrepresentable_price_is_bad_request() {
  let t = spawn_app(false).await;
  let app = init_app!(t.application.state.clone());

  for price in [Decimal::MAX.to_string(), "0.005".to_string(), "100000000".to_string()] {
    let req = test::TestRequest::post()
      .uri("/api/orders")
      .set_json(json!({"products": [{ "name": "X", "price": price, "quantity": 2 }]}))
      .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST, "{}", price);
  }
  assert!(t.store.is_empty());
  t.application.shutdown().await;
}

#[actix_web::test]
#[serial]
async fn create_order_ignores_an_unknown_status_in_the_body() {
  let t = spawn_app(false).await;
  let app = init_app!(t.application.state.clone());
  let mut body = order_body();
  body["status"] = json!("SHIPPED");
  body["id"] = json!("not-a-uuid");

  let req = test::TestRequest::post().uri("/api/orders").set_json(body).to_request();
  let resp = test::call_service(&app, req).await;

  assert_eq!(resp.status(), StatusCode::CREATED);
  let created: Value = test::read_body_json(resp).await;
  assert_eq!(created["status"], "PENDING");
  t.application.shutdown().await;
}

#[actix_web::test]
#[serial]
async fn dispatch_failure_answers_500_with_reason() {
  setup_tracing();
  // nothing declares the exchange on this broker
  let broker = Arc::new(InMemoryBroker::new());
  let publisher = OrderPublisher::new(broker, &BrokerTopology::default());
  let service = Arc::new(OrderService::new(Arc::new(InMemoryOrderStore::new()), publisher));
  let shutdown = CancellationToken::new();
  let state = AppState {
    service: service.clone(),
    order_queue: Arc::new(OrderQueue::start(service, shutdown.clone())),
    config: Arc::new(test_config(false)),
  };
  let app = init_app!(state.clone());

  let req = test::TestRequest::post()
    .uri("/api/orders/process")
    .set_json(order_body())
    .to_request();
  let resp = test::call_service(&app, req).await;

  assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
  let body = test::read_body(resp).await;
  assert_eq!(
    body,
    "Error processing order: Dispatch failure: Exchange 'order-exchange' not found"
  );
  state.order_queue.shutdown().await;
}

#[actix_web::test]
#[serial]
async fn queued_order_reaches_the_broker_and_is_created() {
  let t = spawn_app(true).await;
  let app = init_app!(t.application.state.clone());

  let req = test::TestRequest::post()
    .uri("/api/orders/queue")
    .set_json(order_body())
    .to_request();
  let resp = test::call_service(&app, req).await;

  assert_eq!(resp.status(), StatusCode::ACCEPTED);
  let body: Value = test::read_body_json(resp).await;
  assert_eq!(body["message"], "Order queued for processing.");

  let store = t.store.clone();
  eventually(|| {
    let store = store.clone();
    async move { store.len() == 1 }
  })
  .await;
  t.application.shutdown().await;
}

#[actix_web::test]
#[serial]
async fn product_feeds() {
  let t = spawn_app(false).await;
  let app = init_app!(t.application.state.clone());

  let service_a: Value = test::call_and_read_body_json(
    &app,
    test::TestRequest::get().uri("/api/products/service-a").to_request(),
  )
  .await;
  assert_eq!(service_a, json!([]));

  let order: Value = test::call_and_read_body_json(
    &app,
    test::TestRequest::post().uri("/api/orders").set_json(order_body()).to_request(),
  )
  .await;
  let service_b: Value = test::call_and_read_body_json(
    &app,
    test::TestRequest::get().uri("/api/products/service-b").to_request(),
  )
  .await;
  assert_eq!(service_b, json!([]));

  let req = test::TestRequest::put()
    .uri(&format!("/api/orders/{}/status", order["externalId"].as_str().unwrap()))
    .set_json(json!({"id": order["id"], "status": "COMPLETED"}))
    .to_request();
  assert_eq!(test::call_service(&app, req).await.status(), StatusCode::OK);

  let service_b: Value = test::call_and_read_body_json(
    &app,
    test::TestRequest::get().uri("/api/products/service-b").to_request(),
  )
  .await;
  let names: Vec<&str> = service_b
    .as_array()
    .unwrap()
    .iter()
    .map(|p| p["name"].as_str().unwrap())
    .collect();
  assert_eq!(names, vec!["Keyboard", "Monitor"]);
  t.application.shutdown().await;
}
