use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Defines a UUID-backed identifier newtype.
///
/// Each identifier wraps a UUID to provide type safety and prevent
/// mixing up IDs from different aggregates or collaborators.
macro_rules! uuid_id {
    ($(#[$doc:meta])* $name:ident) => {
        $(#[$doc])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(Uuid);

        impl $name {
            /// Creates a new random identifier.
            pub fn new() -> Self {
                Self(Uuid::new_v4())
            }

            /// Creates an identifier from an existing UUID.
            pub fn from_uuid(uuid: Uuid) -> Self {
                Self(uuid)
            }

            /// Returns the underlying UUID.
            pub fn as_uuid(&self) -> Uuid {
                self.0
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<Uuid> for $name {
            fn from(uuid: Uuid) -> Self {
                Self(uuid)
            }
        }

        impl From<$name> for Uuid {
            fn from(id: $name) -> Self {
                id.0
            }
        }
    };
}

uuid_id! {
    /// Unique identifier for an order.
    OrderId
}

uuid_id! {
    /// Unique identifier for an order line.
    LineId
}

uuid_id! {
    /// Unique identifier for a client (the purchasing customer).
    ClientId
}

uuid_id! {
    /// Unique identifier for a seller assigned to an order.
    SellerId
}

uuid_id! {
    /// Unique identifier for an acting user (client, seller, or operator).
    UserId
}

uuid_id! {
    /// Unique identifier for a branch office.
    BranchId
}

uuid_id! {
    /// Unique identifier for a cart held by the cart collaborator.
    CartId
}

uuid_id! {
    /// Unique identifier for a catalog product.
    ProductId
}

uuid_id! {
    /// Unique identifier for a promotion campaign.
    CampaignId
}

uuid_id! {
    /// Unique identifier for a warehouse picking record.
    PickingId
}

/// Opaque reservation token issued by the inventory collaborator.
///
/// The token format is owned by the inventory service; the core only
/// stores and echoes it back on release.
pub type ReservationToken = String;
