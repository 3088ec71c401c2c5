//! Persistence for the order aggregate family.
//!
//! The store owns Order, OrderLine, AppliedPromotion, and StatusHistory
//! exclusively; the saga orchestrator and the status state machine are
//! its only writers. Two guarantees matter here:
//!
//! - `insert_order` and `apply_transition` each run in one transaction,
//!   so no reader ever observes a partially written order graph.
//! - The store emits a change notification on commit (`order-created`,
//!   `order-approved`, `order-delivered`), which the listener crate
//!   consumes through the [`NotificationSource`] abstraction.
//!
//! [`PostgresOrderStore`] is the production implementation (sqlx, with
//! LISTEN/NOTIFY for the channel). [`InMemoryOrderStore`] backs tests
//! and pairs with [`InMemoryNotificationBus`] for end-to-end listener
//! tests without a database.

pub mod error;
pub mod memory;
pub mod notify;
pub mod postgres;
pub mod store;

pub use error::{Result, StoreError};
pub use memory::InMemoryOrderStore;
pub use notify::{
    InMemoryNotificationBus, Notification, NotificationSource, NotificationStream,
    PgNotificationSource, channels,
};
pub use postgres::PostgresOrderStore;
pub use store::OrderStore;
