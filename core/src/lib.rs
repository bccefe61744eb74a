// orderflow/src/lib.rs

//! Orderflow: order lifecycle rules plus the asynchronous dispatch path around them.
//!
//!  - `lifecycle`: pure validation, total computation and status transitions.
//!  - `store`: the `OrderStore` port and an in-memory implementation.
//!  - `dispatch`: broker port, in-memory topic broker, in-process queue worker and a bounded
//!    consumer pool.
//!  - `service`: `OrderService`, which ties the three together.

pub mod dispatch;
pub mod error;
pub mod external_id;
pub mod lifecycle;
pub mod model;
pub mod service;
pub mod store;

pub use crate::error::{OrderError, OrderResult};
pub use crate::model::{Order, OrderDraft, OrderStatus, Page, PageRequest, Product};
pub use crate::service::OrderService;
pub use crate::store::{InMemoryOrderStore, OrderFilter, OrderStore};
