//! Saga error types.

use common::{CampaignId, OrderId, ProductId};
use domain::OrderStatus;
use order_store::StoreError;
use thiserror::Error;

/// Failure reported by an external collaborator call.
///
/// Transport failures carry transport-specific detail for operators
/// but are treated like the business failure of the same step when
/// deciding whether to abort and compensate.
#[derive(Debug, Error)]
pub enum CollaboratorError {
    /// The collaborator rejected the request for a business reason.
    #[error("{0}")]
    Business(String),

    /// The collaborator was unreachable or timed out.
    #[error("transport failure: {0}")]
    Transport(String),
}

/// Errors that can occur during order creation and status changes.
#[derive(Debug, Error)]
pub enum SagaError {
    /// The resolved cart has no lines; nothing was reserved or priced.
    #[error("Cart is empty")]
    EmptyCart,

    /// The inventory collaborator rejected the reservation: the
    /// requested stock is not available.
    #[error("Insufficient stock: {0}")]
    InsufficientStock(String),

    /// The inventory collaborator could not be reached; the stock
    /// level is unknown.
    #[error("Inventory service error: {0}")]
    Inventory(CollaboratorError),

    /// Neither a promotion nor a price-list entry yielded a price.
    #[error("No price available for product {0}")]
    PricingUnavailable(ProductId),

    /// A cart line carried a promotion the catalog no longer honors.
    #[error("Promotion {campaign_id} is no longer valid for product {product_id}")]
    ExpiredPromotion {
        campaign_id: CampaignId,
        product_id: ProductId,
    },

    /// The requested status transition is not in the transition graph.
    #[error("Illegal status transition from {from} to {to}")]
    IllegalTransition {
        from: OrderStatus,
        to: OrderStatus,
    },

    /// Cancellation requested outside the cancellable statuses.
    #[error("Order in {current} cannot be cancelled; allowed from PENDIENTE or APROBADO")]
    NotCancellable { current: OrderStatus },

    /// Order not found.
    #[error("Order not found: {0}")]
    OrderNotFound(OrderId),

    /// The cart collaborator failed before any side effect happened.
    #[error("Cart service error: {0}")]
    Cart(CollaboratorError),

    /// Order store error.
    #[error("Store error: {0}")]
    Store(#[from] StoreError),
}

/// Convenience type alias for saga results.
pub type Result<T> = std::result::Result<T, SagaError>;
