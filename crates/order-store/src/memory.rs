//! In-memory order store implementation for testing.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use common::OrderId;
use domain::{AppliedPromotion, Order, OrderLine, OrderStatus, StatusHistory};
use tokio::sync::RwLock;

use crate::notify::{InMemoryNotificationBus, channels};
use crate::store::OrderStore;
use crate::{Result, StoreError};

#[derive(Default)]
struct StoreState {
    orders: HashMap<OrderId, Order>,
    lines: HashMap<OrderId, Vec<OrderLine>>,
    promotions: HashMap<OrderId, Vec<AppliedPromotion>>,
    history: HashMap<OrderId, Vec<StatusHistory>>,
}

/// In-memory order store.
///
/// Provides the same interface and notification behavior as the
/// PostgreSQL implementation. When constructed with
/// [`with_notifications`], commit-time notifications are published to
/// the attached bus so listener flows can be tested end-to-end
/// in-process.
///
/// [`with_notifications`]: InMemoryOrderStore::with_notifications
#[derive(Clone, Default)]
pub struct InMemoryOrderStore {
    state: Arc<RwLock<StoreState>>,
    notifications: Option<InMemoryNotificationBus>,
}

impl InMemoryOrderStore {
    /// Creates a new empty store with no notification bus attached.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a new empty store publishing to the given bus.
    pub fn with_notifications(bus: InMemoryNotificationBus) -> Self {
        Self {
            state: Arc::default(),
            notifications: Some(bus),
        }
    }

    /// Returns the number of stored orders.
    pub async fn order_count(&self) -> usize {
        self.state.read().await.orders.len()
    }

    fn publish(&self, channel: &str, order_id: OrderId) {
        if let Some(bus) = &self.notifications {
            bus.publish(channel, order_id.to_string());
        }
    }
}

#[async_trait]
impl OrderStore for InMemoryOrderStore {
    async fn insert_order(
        &self,
        order: &Order,
        lines: &[OrderLine],
        promotions: &[AppliedPromotion],
    ) -> Result<()> {
        {
            let mut state = self.state.write().await;
            state.orders.insert(order.id, order.clone());
            state.lines.insert(order.id, lines.to_vec());
            state.promotions.insert(order.id, promotions.to_vec());
            state.history.insert(order.id, Vec::new());
        }

        self.publish(channels::ORDER_CREATED, order.id);
        Ok(())
    }

    async fn get_order(&self, id: OrderId) -> Result<Option<Order>> {
        Ok(self.state.read().await.orders.get(&id).cloned())
    }

    async fn get_lines(&self, id: OrderId) -> Result<Vec<OrderLine>> {
        Ok(self
            .state
            .read()
            .await
            .lines
            .get(&id)
            .cloned()
            .unwrap_or_default())
    }

    async fn get_applied_promotions(&self, id: OrderId) -> Result<Vec<AppliedPromotion>> {
        Ok(self
            .state
            .read()
            .await
            .promotions
            .get(&id)
            .cloned()
            .unwrap_or_default())
    }

    async fn apply_transition(
        &self,
        id: OrderId,
        new_status: OrderStatus,
        history: &StatusHistory,
    ) -> Result<Order> {
        let updated = {
            let mut state = self.state.write().await;
            let order = state.orders.get_mut(&id).ok_or(StoreError::NotFound(id))?;

            order.status = new_status;
            order.updated_at = history.created_at;
            let updated = order.clone();

            state.history.entry(id).or_default().push(history.clone());
            updated
        };

        if let Some(channel) = channels::for_status(new_status) {
            self.publish(channel, id);
        }

        Ok(updated)
    }

    async fn get_history(&self, id: OrderId) -> Result<Vec<StatusHistory>> {
        Ok(self
            .state
            .read()
            .await
            .history
            .get(&id)
            .cloned()
            .unwrap_or_default())
    }
}
