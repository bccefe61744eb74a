// orderflow/src/dispatch/mod.rs

//! Asynchronous hand-off of orders.
//!
//! Two independent paths:
//!  - Broker path: `OrderPublisher` publishes the order to a topic exchange, the bound durable
//!    queue buffers it and a `ConsumerPool` of workers hands every delivery to a `MessageHandler`.
//!  - In-process path: `OrderQueue` buffers orders in memory and a single worker feeds them,
//!    in submission order, to an `OrderProcessor`.
//!
//! Both paths stop on a `CancellationToken` and survive failures of individual items.

pub mod broker;
pub mod memory_broker;
pub mod pool;
pub mod publisher;
pub mod queue;
pub mod topic;

pub use broker::{Delivery, DeliveryStream, ExchangeKind, Message, MessageBroker, Settle, Settlement};
pub use memory_broker::InMemoryBroker;
pub use pool::{ConcurrencyBounds, ConsumerPool, MessageHandler, PoolSettings};
pub use publisher::{declare_topology, BrokerTopology, OrderPublisher, ORDER_EXCHANGE, ORDER_QUEUE, ORDER_ROUTING_KEY};
pub use queue::{OrderProcessor, OrderQueue};
