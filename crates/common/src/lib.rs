//! Shared identifier newtypes used across the order fulfillment crates.

pub mod types;

pub use types::{
    BranchId, CampaignId, CartId, ClientId, LineId, OrderId, PickingId, ProductId,
    ReservationToken, SellerId, UserId,
};
