//! Domain model for the order fulfillment core.
//!
//! This crate provides the plain data records persisted by the order
//! store (Order, OrderLine, AppliedPromotion, StatusHistory), the
//! order status state machine, and the totals computation applied at
//! order creation. No I/O happens here; persistence and collaborator
//! access live in the `order-store` and `saga` crates.

pub mod order;

pub use order::{
    AppliedPromotion, GeoPoint, Money, Order, OrderLine, OrderStatus, OrderTotals, StatusHistory,
    UnknownStatus, tax_rate,
};
