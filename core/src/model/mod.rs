// orderflow/src/model/mod.rs

//! Data structures shared by the lifecycle rules, the stores and the dispatch channel.

pub mod order;
pub mod page;
pub mod product;

pub use order::{Order, OrderDraft, OrderStatus};
pub use page::{Page, PageRequest};
pub use product::Product;
