//! The order store repository trait.

use async_trait::async_trait;
use common::OrderId;
use domain::{AppliedPromotion, Order, OrderLine, OrderStatus, StatusHistory};

use crate::Result;

/// Repository for the order aggregate family.
///
/// Implementations must make the two write operations transactional:
/// a reader either sees the whole order graph or none of it, and a
/// status change is never visible without its history row.
#[async_trait]
pub trait OrderStore: Send + Sync {
    /// Persists an order together with its lines and applied
    /// promotions in a single transaction, then emits an
    /// `order-created` notification.
    async fn insert_order(
        &self,
        order: &Order,
        lines: &[OrderLine],
        promotions: &[AppliedPromotion],
    ) -> Result<()>;

    /// Fetches an order by id.
    async fn get_order(&self, id: OrderId) -> Result<Option<Order>>;

    /// Fetches the lines of an order.
    async fn get_lines(&self, id: OrderId) -> Result<Vec<OrderLine>>;

    /// Fetches the applied promotion audit rows of an order.
    async fn get_applied_promotions(&self, id: OrderId) -> Result<Vec<AppliedPromotion>>;

    /// Updates the order's status and inserts the history row in a
    /// single transaction, returning the updated order.
    ///
    /// Emits `order-approved` or `order-delivered` on commit when the
    /// new status warrants it. Fails with [`StoreError::NotFound`] if
    /// the order does not exist.
    ///
    /// [`StoreError::NotFound`]: crate::StoreError::NotFound
    async fn apply_transition(
        &self,
        id: OrderId,
        new_status: OrderStatus,
        history: &StatusHistory,
    ) -> Result<Order>;

    /// Fetches the status history of an order in commit order.
    async fn get_history(&self, id: OrderId) -> Result<Vec<StatusHistory>>;
}
