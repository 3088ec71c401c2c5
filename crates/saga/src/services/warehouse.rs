//! Warehouse collaborator contract and in-memory fake.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use common::{OrderId, PickingId};

use crate::error::CollaboratorError;

/// A warehouse picking record.
#[derive(Debug, Clone)]
pub struct Picking {
    pub id: PickingId,
    /// The order the picking was prepared for, when known.
    pub order_id: Option<OrderId>,
}

/// External warehouse collaborator.
#[async_trait]
pub trait WarehouseService: Send + Sync {
    /// Asks the warehouse to start picking for an approved order.
    async fn confirm_picking(
        &self,
        order_id: OrderId,
        reservation_token: Option<&str>,
    ) -> Result<(), CollaboratorError>;

    /// Fetches a picking record by id.
    async fn get_picking(
        &self,
        picking_id: PickingId,
    ) -> Result<Option<Picking>, CollaboratorError>;
}

#[derive(Debug, Default)]
struct InMemoryWarehouseState {
    pickings: HashMap<PickingId, Picking>,
    confirmed: Vec<(OrderId, Option<String>)>,
    fail_on_confirm: bool,
    fail_on_get: bool,
}

/// In-memory warehouse service for testing.
#[derive(Debug, Clone, Default)]
pub struct InMemoryWarehouseService {
    state: Arc<RwLock<InMemoryWarehouseState>>,
}

impl InMemoryWarehouseService {
    /// Creates a new in-memory warehouse service.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a picking record.
    pub fn put_picking(&self, picking: Picking) {
        self.state
            .write()
            .unwrap()
            .pickings
            .insert(picking.id, picking);
    }

    /// Configures confirm calls to fail with a transport error.
    pub fn set_fail_on_confirm(&self, fail: bool) {
        self.state.write().unwrap().fail_on_confirm = fail;
    }

    /// Configures picking lookups to fail with a transport error.
    pub fn set_fail_on_get(&self, fail: bool) {
        self.state.write().unwrap().fail_on_get = fail;
    }

    /// Returns the confirmed pickings, in call order.
    pub fn confirmed_pickings(&self) -> Vec<(OrderId, Option<String>)> {
        self.state.read().unwrap().confirmed.clone()
    }
}

#[async_trait]
impl WarehouseService for InMemoryWarehouseService {
    async fn confirm_picking(
        &self,
        order_id: OrderId,
        reservation_token: Option<&str>,
    ) -> Result<(), CollaboratorError> {
        let mut state = self.state.write().unwrap();
        if state.fail_on_confirm {
            return Err(CollaboratorError::Transport(
                "warehouse service unreachable".to_string(),
            ));
        }
        state
            .confirmed
            .push((order_id, reservation_token.map(str::to_string)));
        Ok(())
    }

    async fn get_picking(
        &self,
        picking_id: PickingId,
    ) -> Result<Option<Picking>, CollaboratorError> {
        let state = self.state.read().unwrap();
        if state.fail_on_get {
            return Err(CollaboratorError::Transport(
                "warehouse service unreachable".to_string(),
            ));
        }
        Ok(state.pickings.get(&picking_id).cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_confirm_picking_records_call() {
        let service = InMemoryWarehouseService::new();
        let order_id = OrderId::new();

        service
            .confirm_picking(order_id, Some("RES-0001"))
            .await
            .unwrap();

        let confirmed = service.confirmed_pickings();
        assert_eq!(confirmed.len(), 1);
        assert_eq!(confirmed[0].0, order_id);
        assert_eq!(confirmed[0].1.as_deref(), Some("RES-0001"));
    }

    #[tokio::test]
    async fn test_get_picking() {
        let service = InMemoryWarehouseService::new();
        let picking = Picking {
            id: PickingId::new(),
            order_id: Some(OrderId::new()),
        };
        service.put_picking(picking.clone());

        let found = service.get_picking(picking.id).await.unwrap().unwrap();
        assert_eq!(found.order_id, picking.order_id);

        assert!(service.get_picking(PickingId::new()).await.unwrap().is_none());
    }
}
