// orderflow/src/external_id.rs

use chrono::Utc;
use std::sync::atomic::{AtomicI64, Ordering};

pub const EXTERNAL_ID_PREFIX: &str = "ORD-";

/// Generates `ORD-<epoch millis>` identifiers.
///
/// The numeric part never repeats within one generator: when two calls land in the same
/// millisecond (or the clock steps back) the value is bumped past the last one handed out.
/// Uniqueness across processes is left to the store's unique constraint.
#[derive(Debug, Default)]
pub struct ExternalIdGenerator {
  last: AtomicI64,
}

impl ExternalIdGenerator {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn next_id(&self) -> String {
    let now = Utc::now().timestamp_millis();
    let previous = self
      .last
      .fetch_update(Ordering::AcqRel, Ordering::Acquire, |last| Some(now.max(last + 1)))
      .unwrap_or_else(|last| last);
    format!("{}{}", EXTERNAL_ID_PREFIX, now.max(previous + 1))
  }
}
