//! Persistent order records.
//!
//! These are plain data structs; the transaction boundary around them
//! is owned by the order store, and the orchestrator/state machine are
//! the only writers.

use chrono::{DateTime, NaiveDate, Utc};
use common::{
    BranchId, CampaignId, ClientId, LineId, OrderId, ProductId, ReservationToken, SellerId, UserId,
};
use serde::{Deserialize, Serialize};

use super::status::OrderStatus;
use super::value_objects::{GeoPoint, Money};

/// One customer purchase.
///
/// Totals are computed once at creation and never recomputed; the
/// invariant `grand_total == subtotal - discount_total + tax_total`
/// holds for every persisted order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Order {
    pub id: OrderId,
    pub client_id: ClientId,
    /// Assigned seller; None for self-service client orders.
    pub seller_id: Option<SellerId>,
    pub branch_id: Option<BranchId>,
    pub payment_method: String,
    pub delivery_date: Option<NaiveDate>,
    /// Origin tag recording which surface created the order.
    pub origin: Option<String>,
    pub subtotal: Money,
    pub discount_total: Money,
    pub tax_total: Money,
    pub grand_total: Money,
    pub delivery_point: Option<GeoPoint>,
    pub notes: Option<String>,
    pub status: OrderStatus,
    /// Stock reservation held by the inventory collaborator. Present
    /// while the order is in any non-terminal, non-released state.
    pub reservation_token: Option<ReservationToken>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// One product line within an order.
///
/// Lines are created in the same transaction as the owning order and
/// are immutable thereafter; corrections require a new order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderLine {
    pub id: LineId,
    pub order_id: OrderId,
    pub product_id: ProductId,
    pub sku: Option<String>,
    pub name: Option<String>,
    pub quantity: u32,
    pub unit: String,
    /// Catalog list price snapshot at creation time.
    pub list_price: Money,
    /// Post-discount price snapshot at creation time.
    pub final_price: Money,
    pub campaign_id: Option<CampaignId>,
    pub discount_reason: Option<String>,
}

impl OrderLine {
    /// Returns the line total (final price times quantity).
    pub fn line_total(&self) -> Money {
        self.final_price.multiply(self.quantity)
    }

    /// Returns the realized discount for the line, clamped at zero.
    pub fn discount(&self) -> Money {
        self.list_price
            .saturating_sub(self.final_price)
            .multiply(self.quantity)
    }

    /// Returns true if the snapshot prices show an actual discount.
    ///
    /// The discount is inferred from the snapshots rather than derived
    /// from the promotion record; a line can carry a campaign id with
    /// no realized discount.
    pub fn has_realized_discount(&self) -> bool {
        self.final_price < self.list_price
    }
}

/// Audit record of a discount actually applied to a line.
///
/// Created alongside the owning line when it carries a promotion id;
/// never updated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AppliedPromotion {
    pub order_id: OrderId,
    pub order_line_id: LineId,
    pub campaign_id: CampaignId,
    pub discount_type: String,
    pub discount_value: Money,
    /// The realized amount: (list price - final price) * quantity.
    pub applied_amount: Money,
}

/// Append-only audit trail of status transitions.
///
/// Exactly one row is created per transition, inside the same
/// transaction that updates the order's status.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatusHistory {
    pub order_id: OrderId,
    pub previous_status: OrderStatus,
    pub new_status: OrderStatus,
    /// None for system-driven transitions.
    pub actor_id: Option<UserId>,
    pub comment: String,
    pub created_at: DateTime<Utc>,
}

impl StatusHistory {
    /// Creates a history row for a transition happening now.
    pub fn transition(
        order_id: OrderId,
        previous_status: OrderStatus,
        new_status: OrderStatus,
        actor_id: Option<UserId>,
        comment: impl Into<String>,
    ) -> Self {
        Self {
            order_id,
            previous_status,
            new_status,
            actor_id,
            comment: comment.into(),
            created_at: Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn line(quantity: u32, list_cents: i64, final_cents: i64) -> OrderLine {
        OrderLine {
            id: LineId::new(),
            order_id: OrderId::new(),
            product_id: ProductId::new(),
            sku: Some("SKU-001".to_string()),
            name: Some("Widget".to_string()),
            quantity,
            unit: "unit".to_string(),
            list_price: Money::from_cents(list_cents),
            final_price: Money::from_cents(final_cents),
            campaign_id: None,
            discount_reason: None,
        }
    }

    #[test]
    fn test_line_total() {
        assert_eq!(line(3, 1000, 800).line_total(), Money::from_cents(2400));
    }

    #[test]
    fn test_line_discount() {
        assert_eq!(line(3, 1000, 800).discount(), Money::from_cents(600));
        assert_eq!(line(3, 1000, 1000).discount(), Money::zero());
    }

    #[test]
    fn test_discount_clamped_when_final_exceeds_list() {
        assert_eq!(line(2, 1000, 1100).discount(), Money::zero());
        assert!(!line(2, 1000, 1100).has_realized_discount());
    }

    #[test]
    fn test_has_realized_discount() {
        assert!(line(1, 1000, 800).has_realized_discount());
        assert!(!line(1, 1000, 1000).has_realized_discount());
    }

    #[test]
    fn test_history_transition_records_both_statuses() {
        let order_id = OrderId::new();
        let history = StatusHistory::transition(
            order_id,
            OrderStatus::Pendiente,
            OrderStatus::Aprobado,
            None,
            "approved by review",
        );

        assert_eq!(history.order_id, order_id);
        assert_eq!(history.previous_status, OrderStatus::Pendiente);
        assert_eq!(history.new_status, OrderStatus::Aprobado);
        assert!(history.actor_id.is_none());
        assert_eq!(history.comment, "approved by review");
    }
}
