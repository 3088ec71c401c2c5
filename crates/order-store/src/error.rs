use common::OrderId;
use thiserror::Error;

/// Errors that can occur when interacting with the order store.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The order was not found in the store.
    #[error("Order not found: {0}")]
    NotFound(OrderId),

    /// A database error occurred.
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// A database migration error occurred.
    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    /// A stored value could not be decoded into a domain type.
    #[error("Decode error: {0}")]
    Decode(String),
}

impl From<domain::UnknownStatus> for StoreError {
    fn from(err: domain::UnknownStatus) -> Self {
        StoreError::Decode(err.to_string())
    }
}

/// Result type for order store operations.
pub type Result<T> = std::result::Result<T, StoreError>;
