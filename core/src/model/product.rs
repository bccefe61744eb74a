// orderflow/src/model/product.rs

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// A line item of an order. Owned by exactly one order and stored with it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Product {
  pub name: String,
  pub price: Decimal,
  pub quantity: i32,
}

impl Product {
  pub fn new(name: impl Into<String>, price: Decimal, quantity: i32) -> Self {
    Self {
      name: name.into(),
      price,
      quantity,
    }
  }

  /// Unit price times quantity, `None` on overflow.
  pub fn line_total(&self) -> Option<Decimal> {
    self.price.checked_mul(Decimal::from(self.quantity))
  }
}
