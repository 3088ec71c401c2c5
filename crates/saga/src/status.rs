//! Order status state machine.

use common::{OrderId, UserId};
use domain::{Order, OrderStatus, StatusHistory};
use order_store::OrderStore;

use crate::compensation::release_reservation;
use crate::error::{Result, SagaError};
use crate::services::inventory::InventoryService;

/// Validates and executes order status transitions.
///
/// Each transition writes the status change and its history row in one
/// store transaction. Entering a cancelling status additionally
/// releases the order's stock reservation after commit; that release
/// is best-effort and never undoes the committed status change.
pub struct StatusMachine<S, I>
where
    S: OrderStore,
    I: InventoryService,
{
    store: S,
    inventory: I,
}

impl<S, I> StatusMachine<S, I>
where
    S: OrderStore,
    I: InventoryService,
{
    /// Creates a new status machine over the given store and inventory
    /// client.
    pub fn new(store: S, inventory: I) -> Self {
        Self { store, inventory }
    }

    /// Transitions an order to a new status.
    ///
    /// Re-requesting the current status is a legal no-op: the order is
    /// returned unchanged and no history row is written. This is what
    /// makes redelivered notifications harmless.
    #[tracing::instrument(skip(self, comment), fields(%order_id, to = %new_status))]
    pub async fn change_status(
        &self,
        order_id: OrderId,
        new_status: OrderStatus,
        actor_id: Option<UserId>,
        comment: Option<String>,
    ) -> Result<Order> {
        let order = self
            .store
            .get_order(order_id)
            .await?
            .ok_or(SagaError::OrderNotFound(order_id))?;

        if order.status == new_status {
            tracing::debug!(%order_id, status = %new_status, "order already in requested status");
            return Ok(order);
        }

        if !order.status.can_transition_to(new_status) {
            return Err(SagaError::IllegalTransition {
                from: order.status,
                to: new_status,
            });
        }

        let comment = comment
            .unwrap_or_else(|| format!("transition from {} to {}", order.status, new_status));
        let history =
            StatusHistory::transition(order_id, order.status, new_status, actor_id, comment);

        let updated = self
            .store
            .apply_transition(order_id, new_status, &history)
            .await?;

        metrics::counter!("order_status_transitions_total").increment(1);
        tracing::info!(%order_id, from = %order.status, to = %new_status, "order status changed");

        // The status change is committed; releasing the reservation is
        // best-effort from here on.
        if new_status.is_cancelling() {
            if let Some(token) = updated.reservation_token.as_deref() {
                release_reservation(&self.inventory, token).await;
            }
        }

        Ok(updated)
    }

    /// Cancels an order.
    ///
    /// Only legal while the order is `PENDIENTE` or `APROBADO`; once
    /// the warehouse has prepared it, cancellation moves to an
    /// operational process outside this state machine.
    #[tracing::instrument(skip(self, reason), fields(%order_id))]
    pub async fn cancel_order(
        &self,
        order_id: OrderId,
        actor_id: Option<UserId>,
        reason: Option<String>,
    ) -> Result<Order> {
        let order = self
            .store
            .get_order(order_id)
            .await?
            .ok_or(SagaError::OrderNotFound(order_id))?;

        if !order.status.can_cancel() {
            return Err(SagaError::NotCancellable {
                current: order.status,
            });
        }

        self.change_status(order_id, OrderStatus::Anulado, actor_id, reason)
            .await
    }
}
