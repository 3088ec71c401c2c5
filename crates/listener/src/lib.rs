//! Background listener bridging store notifications into order and
//! warehouse operations.
//!
//! The listener is the asynchronous half of order/warehouse
//! consistency: it reacts to commit-time notifications (`order-approved`,
//! `picking-completed`, ...) so the warehouse never needs to know about
//! orders directly. It runs as a single supervised task per service
//! instance, reconnecting with a fixed backoff for as long as the
//! process lives.

mod listener;

pub use listener::{EventListener, ListenerHandle, RECONNECT_DELAY};
