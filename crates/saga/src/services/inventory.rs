//! Inventory reservation client contract and in-memory fake.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use common::{ProductId, ReservationToken};
use uuid::Uuid;

use crate::error::CollaboratorError;

/// An item to reserve in inventory.
#[derive(Debug, Clone)]
pub struct ReservationItem {
    /// The product to hold stock for.
    pub product_id: ProductId,
    /// Quantity to reserve.
    pub quantity: u32,
    /// Unit of measure.
    pub unit: String,
}

/// External inventory reservation client.
#[async_trait]
pub trait InventoryService: Send + Sync {
    /// Creates a stock reservation.
    ///
    /// The idempotency key is caller-generated so a retried request
    /// does not double-hold stock on the inventory side.
    async fn reserve(
        &self,
        items: Vec<ReservationItem>,
        idempotency_key: Uuid,
    ) -> Result<ReservationToken, CollaboratorError>;

    /// Releases a previously created reservation.
    async fn release(&self, token: &str) -> Result<(), CollaboratorError>;
}

#[derive(Debug, Default)]
struct InMemoryInventoryState {
    reservations: HashMap<String, Vec<ReservationItem>>,
    next_id: u32,
    last_idempotency_key: Option<Uuid>,
    release_calls: usize,
    fail_on_reserve: bool,
    transport_fail_on_reserve: bool,
    fail_on_release: bool,
}

/// In-memory inventory service for testing.
#[derive(Debug, Clone, Default)]
pub struct InMemoryInventoryService {
    state: Arc<RwLock<InMemoryInventoryState>>,
}

impl InMemoryInventoryService {
    /// Creates a new in-memory inventory service.
    pub fn new() -> Self {
        Self::default()
    }

    /// Configures the service to reject the next reserve call with a
    /// business "insufficient stock" error.
    pub fn set_fail_on_reserve(&self, fail: bool) {
        self.state.write().unwrap().fail_on_reserve = fail;
    }

    /// Configures the service to fail the next reserve call with a
    /// transport error.
    pub fn set_transport_fail_on_reserve(&self, fail: bool) {
        self.state.write().unwrap().transport_fail_on_reserve = fail;
    }

    /// Configures the service to fail release calls.
    pub fn set_fail_on_release(&self, fail: bool) {
        self.state.write().unwrap().fail_on_release = fail;
    }

    /// Returns the number of active reservations.
    pub fn reservation_count(&self) -> usize {
        self.state.read().unwrap().reservations.len()
    }

    /// Returns true if a reservation exists with the given token.
    pub fn has_reservation(&self, token: &str) -> bool {
        self.state
            .read()
            .unwrap()
            .reservations
            .contains_key(token)
    }

    /// Returns how many times release was called, including failures.
    pub fn release_call_count(&self) -> usize {
        self.state.read().unwrap().release_calls
    }

    /// Returns the idempotency key of the most recent reserve call.
    pub fn last_idempotency_key(&self) -> Option<Uuid> {
        self.state.read().unwrap().last_idempotency_key
    }
}

#[async_trait]
impl InventoryService for InMemoryInventoryService {
    async fn reserve(
        &self,
        items: Vec<ReservationItem>,
        idempotency_key: Uuid,
    ) -> Result<ReservationToken, CollaboratorError> {
        let mut state = self.state.write().unwrap();
        state.last_idempotency_key = Some(idempotency_key);

        if state.transport_fail_on_reserve {
            return Err(CollaboratorError::Transport(
                "inventory service unreachable".to_string(),
            ));
        }
        if state.fail_on_reserve {
            return Err(CollaboratorError::Business(
                "insufficient stock".to_string(),
            ));
        }

        state.next_id += 1;
        let token = format!("RES-{:04}", state.next_id);
        state.reservations.insert(token.clone(), items);

        Ok(token)
    }

    async fn release(&self, token: &str) -> Result<(), CollaboratorError> {
        let mut state = self.state.write().unwrap();
        state.release_calls += 1;

        if state.fail_on_release {
            return Err(CollaboratorError::Transport(
                "inventory service unreachable".to_string(),
            ));
        }

        state.reservations.remove(token);
        Ok(())
    }
}
