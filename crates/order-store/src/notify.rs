//! Change-notification channels emitted by the order store on commit.
//!
//! The abstraction is deliberately narrow: subscribe to a set of named
//! channels and get back a stream of (channel, payload) pairs, ordered
//! within each channel relative to the committing transaction. Any
//! transport with those properties satisfies the contract; this module
//! ships Postgres LISTEN/NOTIFY for production and a broadcast-based
//! in-process bus for tests.

use std::collections::HashMap;
use std::pin::Pin;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use futures_core::Stream;
use futures_util::{StreamExt, stream};
use sqlx::PgPool;
use sqlx::postgres::PgListener;
use tokio::sync::broadcast;

use crate::{Result, StoreError};

/// Notification channel names.
pub mod channels {
    use domain::OrderStatus;

    /// Emitted after an order graph is committed.
    pub const ORDER_CREATED: &str = "order-created";
    /// Emitted when a transition lands in `APROBADO`.
    pub const ORDER_APPROVED: &str = "order-approved";
    /// Emitted when a transition lands in `ENTREGADO`.
    pub const ORDER_DELIVERED: &str = "order-delivered";
    /// Emitted by the warehouse side when picking finishes.
    pub const PICKING_COMPLETED: &str = "picking-completed";

    /// Every channel the listener subscribes to.
    pub const ALL: [&str; 4] = [
        ORDER_CREATED,
        ORDER_APPROVED,
        ORDER_DELIVERED,
        PICKING_COMPLETED,
    ];

    /// Returns the channel announced when a transition lands in
    /// `status`, if any.
    pub fn for_status(status: OrderStatus) -> Option<&'static str> {
        match status {
            OrderStatus::Aprobado => Some(ORDER_APPROVED),
            OrderStatus::Entregado => Some(ORDER_DELIVERED),
            _ => None,
        }
    }
}

/// One notification delivered to a subscriber.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    /// The channel the notification arrived on.
    pub channel: String,
    /// The payload: an order or picking identifier as plain text.
    pub payload: String,
}

/// Stream of notifications for a subscription.
pub type NotificationStream = Pin<Box<dyn Stream<Item = Result<Notification>> + Send>>;

/// A subscribable source of change notifications.
#[async_trait]
pub trait NotificationSource: Send + Sync {
    /// Opens a subscription covering the given channels.
    ///
    /// Each call opens an independent subscription; dropping the
    /// stream closes it. A stream item of `Err` means the underlying
    /// connection failed and the caller should resubscribe.
    async fn subscribe(&self, channels: &[&str]) -> Result<NotificationStream>;
}

/// Postgres LISTEN/NOTIFY notification source.
///
/// Each subscription owns a fresh [`PgListener`] connection so a
/// failed subscriber never affects the pool or other subscribers.
#[derive(Clone)]
pub struct PgNotificationSource {
    pool: PgPool,
}

impl PgNotificationSource {
    /// Creates a notification source over the given pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl NotificationSource for PgNotificationSource {
    async fn subscribe(&self, channels: &[&str]) -> Result<NotificationStream> {
        let mut listener = PgListener::connect_with(&self.pool).await?;
        listener.listen_all(channels.iter().copied()).await?;

        let stream = stream::unfold(listener, |mut listener| async move {
            match listener.recv().await {
                Ok(notification) => {
                    let item = Notification {
                        channel: notification.channel().to_string(),
                        payload: notification.payload().to_string(),
                    };
                    Some((Ok(item), listener))
                }
                Err(e) => Some((Err(StoreError::Database(e)), listener)),
            }
        });

        Ok(stream.boxed())
    }
}

/// In-process notification bus for tests.
///
/// Backed by one broadcast channel per named channel, which preserves
/// per-channel ordering. Lagged receivers skip missed messages rather
/// than erroring.
#[derive(Clone, Default)]
pub struct InMemoryNotificationBus {
    senders: Arc<Mutex<HashMap<String, broadcast::Sender<String>>>>,
}

impl InMemoryNotificationBus {
    /// Creates a new empty bus.
    pub fn new() -> Self {
        Self::default()
    }

    fn sender(&self, channel: &str) -> broadcast::Sender<String> {
        self.senders
            .lock()
            .unwrap()
            .entry(channel.to_string())
            .or_insert_with(|| broadcast::channel(256).0)
            .clone()
    }

    /// Publishes a payload on a channel.
    ///
    /// Publishing with no active subscribers is not an error; the
    /// notification is simply dropped, matching NOTIFY semantics.
    pub fn publish(&self, channel: &str, payload: impl Into<String>) {
        let _ = self.sender(channel).send(payload.into());
    }

    /// Returns the number of active receivers on a channel.
    pub fn receiver_count(&self, channel: &str) -> usize {
        self.sender(channel).receiver_count()
    }
}

#[async_trait]
impl NotificationSource for InMemoryNotificationBus {
    async fn subscribe(&self, channels: &[&str]) -> Result<NotificationStream> {
        let mut streams = Vec::with_capacity(channels.len());

        for &channel in channels {
            let receiver = self.sender(channel).subscribe();
            let name = channel.to_string();

            let stream = stream::unfold((name, receiver), |(name, mut receiver)| async move {
                loop {
                    match receiver.recv().await {
                        Ok(payload) => {
                            let item = Notification {
                                channel: name.clone(),
                                payload,
                            };
                            return Some((Ok(item), (name, receiver)));
                        }
                        Err(broadcast::error::RecvError::Lagged(skipped)) => {
                            tracing::warn!(channel = %name, skipped, "notification receiver lagged");
                            continue;
                        }
                        Err(broadcast::error::RecvError::Closed) => return None,
                    }
                }
            })
            .boxed();

            streams.push(stream);
        }

        Ok(stream::select_all(streams).boxed())
    }
}
