// orderflow_server/src/errors.rs

use actix_web::http::StatusCode;
use actix_web::{HttpResponse, ResponseError};
use orderflow::OrderError;
use serde_json::json;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
  #[error("Validation Error: {0}")]
  Validation(String),

  #[error("Resource Not Found: {0}")]
  NotFound(String),

  #[error("Conflict: {0}")]
  Conflict(String),

  #[error("Dispatch Error: {0}")]
  Dispatch(String),

  #[error("Configuration Error: {0}")]
  Config(String),

  #[error("Database Error: {0}")]
  Sqlx(#[from] sqlx::Error),

  #[error(transparent)]
  Order(#[from] OrderError),

  #[error("Internal Server Error: {0}")]
  Internal(String),
}

// Recover the typed error when one was wrapped in anyhow along the way.
impl From<anyhow::Error> for AppError {
  fn from(err: anyhow::Error) -> Self {
    let err = match err.downcast::<OrderError>() {
      Ok(order_err) => return AppError::Order(order_err),
      Err(err) => err,
    };
    match err.downcast::<sqlx::Error>() {
      Ok(sqlx_err) => AppError::Sqlx(sqlx_err),
      Err(err) => AppError::Internal(format!("{:#}", err)),
    }
  }
}

fn body(error: &str, message: impl std::fmt::Display) -> serde_json::Value {
  json!({"error": error, "message": message.to_string()})
}

impl ResponseError for AppError {
  fn status_code(&self) -> StatusCode {
    match self {
      AppError::Validation(_) => StatusCode::BAD_REQUEST,
      AppError::NotFound(_) => StatusCode::NOT_FOUND,
      AppError::Conflict(_) => StatusCode::CONFLICT,
      AppError::Order(e) => match e {
        OrderError::InvalidOrder(_)
        | OrderError::InvalidTransition(_)
        | OrderError::UnknownStatus(_)
        | OrderError::Serialization(_) => StatusCode::BAD_REQUEST,
        OrderError::OrderNotFound(_) => StatusCode::NOT_FOUND,
        OrderError::DuplicateExternalId(_) => StatusCode::CONFLICT,
        OrderError::DispatchFailure(_) | OrderError::Store { .. } => StatusCode::INTERNAL_SERVER_ERROR,
      },
      AppError::Dispatch(_) | AppError::Config(_) | AppError::Sqlx(_) | AppError::Internal(_) => {
        StatusCode::INTERNAL_SERVER_ERROR
      }
    }
  }

  fn error_response(&self) -> HttpResponse {
    let status = self.status_code();
    if status.is_server_error() {
      tracing::error!(application_error = %self, "Responding with error");
    } else {
      tracing::warn!(application_error = %self, "Rejecting request");
    }
    let payload = match self {
      AppError::Validation(m) => body("Validation failed", m),
      AppError::NotFound(m) => body("Not found", m),
      AppError::Conflict(m) => body("Conflict", m),
      AppError::Dispatch(m) => body("Dispatch failed", m),
      AppError::Config(m) => body("Configuration issue", m),
      AppError::Sqlx(_) => body("Database operation failed", "The order store is unavailable."),
      AppError::Order(e) => match e {
        OrderError::InvalidOrder(m) | OrderError::InvalidTransition(m) => body("Invalid request", m),
        OrderError::UnknownStatus(_) | OrderError::Serialization(_) => body("Invalid request", e),
        OrderError::OrderNotFound(m) => body("Not found", m),
        OrderError::DuplicateExternalId(_) => body("Conflict", e),
        OrderError::DispatchFailure(m) => body("Dispatch failed", m),
        OrderError::Store { .. } => body("Database operation failed", "The order store is unavailable."),
      },
      AppError::Internal(m) => body("An internal error occurred", m),
    };
    HttpResponse::build(status).json(payload)
  }
}

pub type Result<T, E = AppError> = std::result::Result<T, E>;
