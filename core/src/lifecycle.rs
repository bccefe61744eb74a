// orderflow/src/lifecycle.rs

//! Order lifecycle rules: creation validation, total computation and status transitions.
//!
//! Everything here is pure. The service decides what gets persisted based on the outcome.
//!
//! ```text
//!   (create) ──> PENDING ──> COMPLETED
//!                   │
//!                   └──────> CANCELLED ──> ... (any status except PENDING / COMPLETED)
//! ```

use crate::error::{OrderError, OrderResult};
use crate::model::{OrderStatus, Product};
use rust_decimal::Decimal;

pub const ORDER_MUST_CONTAIN_PRODUCTS: &str = "The order must contain at least one product.";
pub const ONLY_PENDING_ORDERS_CAN_BE_COMPLETED: &str = "Only PENDING orders can be marked as COMPLETED.";
pub const CANNOT_CHANGE_TO_PENDING: &str = "It is not possible to change to PENDING.";

/// Status every new order starts in.
pub const INITIAL_STATUS: OrderStatus = OrderStatus::Pending;

/// Fractional digits a price or total may carry.
pub const MONEY_SCALE: u32 = 2;

/// Largest price or total an order may carry: 99,999,999.99, the range of `NUMERIC(10, 2)`.
pub const MAX_AMOUNT: Decimal = Decimal::from_parts(1_410_065_407, 2, 0, false, 2);

/// Checks that a set of line items may become an order, including that its total is
/// representable.
pub fn validate_for_creation(products: &[Product]) -> OrderResult<()> {
  if products.is_empty() {
    return Err(OrderError::InvalidOrder(ORDER_MUST_CONTAIN_PRODUCTS.to_string()));
  }

  for product in products {
    if product.price < Decimal::ZERO {
      return Err(OrderError::InvalidOrder(format!(
        "Product '{}' has a negative price: {}",
        product.name, product.price
      )));
    }
    if product.price.normalize().scale() > MONEY_SCALE {
      return Err(OrderError::InvalidOrder(format!(
        "Product '{}' has a price with more than {} decimal places: {}",
        product.name, MONEY_SCALE, product.price
      )));
    }
    if product.price > MAX_AMOUNT {
      return Err(OrderError::InvalidOrder(format!(
        "Product '{}' has a price above {}: {}",
        product.name, MAX_AMOUNT, product.price
      )));
    }
    if product.quantity <= 0 {
      return Err(OrderError::InvalidOrder(format!(
        "Product '{}' must have a positive quantity, got {}",
        product.name, product.quantity
      )));
    }
  }

  let total = compute_total(products)?;
  if total > MAX_AMOUNT {
    return Err(OrderError::InvalidOrder(format!(
      "Order total {} exceeds the maximum of {}",
      total, MAX_AMOUNT
    )));
  }
  Ok(())
}

/// Sum of unit price times quantity over all items. Zero for an empty slice.
///
/// Fails with `InvalidOrder` when a line total or the sum does not fit in a `Decimal`.
pub fn compute_total(products: &[Product]) -> OrderResult<Decimal> {
  products.iter().try_fold(Decimal::ZERO, |total, product| {
    product
      .line_total()
      .and_then(|line| total.checked_add(line))
      .ok_or_else(|| OrderError::InvalidOrder(format!("Order total overflows at product '{}'", product.name)))
  })
}

/// Returns the status an order moves to, or `InvalidTransition`.
pub fn transition(current: OrderStatus, requested: OrderStatus) -> OrderResult<OrderStatus> {
  if requested == OrderStatus::Completed && current != OrderStatus::Pending {
    return Err(OrderError::InvalidTransition(
      ONLY_PENDING_ORDERS_CAN_BE_COMPLETED.to_string(),
    ));
  }

  if requested == OrderStatus::Pending {
    return Err(OrderError::InvalidTransition(CANNOT_CHANGE_TO_PENDING.to_string()));
  }

  Ok(requested)
}
