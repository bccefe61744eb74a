// orderflow/src/error.rs
use anyhow::Error as AnyhowError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum OrderError {
  /// Creation was attempted with a draft that can never become a valid order.
  #[error("{0}")]
  InvalidOrder(String),

  #[error("{0}")]
  OrderNotFound(String),

  /// The requested status is not reachable from the current one.
  #[error("{0}")]
  InvalidTransition(String),

  #[error("Unknown order status: {0}")]
  UnknownStatus(String),

  #[error("Order with external id {0} already exists")]
  DuplicateExternalId(String),

  #[error("Dispatch failure: {0}")]
  DispatchFailure(String),

  #[error("Order payload could not be (de)serialized: {0}")]
  Serialization(#[from] serde_json::Error),

  #[error("Order store error. Source: {source}")]
  Store {
    #[source]
    source: AnyhowError,
  },
}

impl OrderError {
  /// Wraps a backend error (database driver, I/O, ...) raised by an `OrderStore` implementation.
  pub fn store<E>(err: E) -> Self
  where
    E: Into<AnyhowError>,
  {
    OrderError::Store { source: err.into() }
  }

  /// True for the errors caused by the caller's input rather than by infrastructure.
  pub fn is_client_error(&self) -> bool {
    matches!(
      self,
      OrderError::InvalidOrder(_)
        | OrderError::OrderNotFound(_)
        | OrderError::InvalidTransition(_)
        | OrderError::UnknownStatus(_)
        | OrderError::DuplicateExternalId(_)
        | OrderError::Serialization(_)
    )
  }
}

pub type OrderResult<T, E = OrderError> = std::result::Result<T, E>;
