//! Catalog lookup contract (locations, assigned sellers) and in-memory fake.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use common::{BranchId, ClientId, SellerId};
use domain::GeoPoint;

use crate::error::CollaboratorError;

/// External catalog lookups used to enrich an order.
///
/// Every operation can legitimately return `None`; absence of a
/// location or an assigned seller is not an error.
#[async_trait]
pub trait CatalogService: Send + Sync {
    /// Returns the geographic location of a branch.
    async fn branch_location(
        &self,
        branch_id: BranchId,
    ) -> Result<Option<GeoPoint>, CollaboratorError>;

    /// Returns the registered location of a client.
    async fn client_location(
        &self,
        client_id: ClientId,
    ) -> Result<Option<GeoPoint>, CollaboratorError>;

    /// Returns the seller assigned to a client, if any.
    async fn assigned_seller(
        &self,
        client_id: ClientId,
    ) -> Result<Option<SellerId>, CollaboratorError>;
}

#[derive(Debug, Default)]
struct InMemoryCatalogState {
    branch_locations: HashMap<BranchId, GeoPoint>,
    client_locations: HashMap<ClientId, GeoPoint>,
    assigned_sellers: HashMap<ClientId, SellerId>,
    fail_on_lookup: bool,
}

/// In-memory catalog service for testing.
#[derive(Debug, Clone, Default)]
pub struct InMemoryCatalogService {
    state: Arc<RwLock<InMemoryCatalogState>>,
}

impl InMemoryCatalogService {
    /// Creates a new in-memory catalog service.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a branch location.
    pub fn set_branch_location(&self, branch_id: BranchId, point: GeoPoint) {
        self.state
            .write()
            .unwrap()
            .branch_locations
            .insert(branch_id, point);
    }

    /// Registers a client location.
    pub fn set_client_location(&self, client_id: ClientId, point: GeoPoint) {
        self.state
            .write()
            .unwrap()
            .client_locations
            .insert(client_id, point);
    }

    /// Registers the seller assigned to a client.
    pub fn set_assigned_seller(&self, client_id: ClientId, seller_id: SellerId) {
        self.state
            .write()
            .unwrap()
            .assigned_sellers
            .insert(client_id, seller_id);
    }

    /// Configures every lookup to fail with a transport error.
    pub fn set_fail_on_lookup(&self, fail: bool) {
        self.state.write().unwrap().fail_on_lookup = fail;
    }

    fn check_transport(&self) -> Result<(), CollaboratorError> {
        if self.state.read().unwrap().fail_on_lookup {
            Err(CollaboratorError::Transport(
                "catalog service unreachable".to_string(),
            ))
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl CatalogService for InMemoryCatalogService {
    async fn branch_location(
        &self,
        branch_id: BranchId,
    ) -> Result<Option<GeoPoint>, CollaboratorError> {
        self.check_transport()?;
        Ok(self
            .state
            .read()
            .unwrap()
            .branch_locations
            .get(&branch_id)
            .copied())
    }

    async fn client_location(
        &self,
        client_id: ClientId,
    ) -> Result<Option<GeoPoint>, CollaboratorError> {
        self.check_transport()?;
        Ok(self
            .state
            .read()
            .unwrap()
            .client_locations
            .get(&client_id)
            .copied())
    }

    async fn assigned_seller(
        &self,
        client_id: ClientId,
    ) -> Result<Option<SellerId>, CollaboratorError> {
        self.check_transport()?;
        Ok(self
            .state
            .read()
            .unwrap()
            .assigned_sellers
            .get(&client_id)
            .copied())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_lookups_return_registered_values() {
        let service = InMemoryCatalogService::new();
        let branch_id = BranchId::new();
        let client_id = ClientId::new();
        let seller_id = SellerId::new();
        let point = GeoPoint::new(-0.18, -78.46);

        service.set_branch_location(branch_id, point);
        service.set_assigned_seller(client_id, seller_id);

        assert_eq!(
            service.branch_location(branch_id).await.unwrap(),
            Some(point)
        );
        assert_eq!(
            service.assigned_seller(client_id).await.unwrap(),
            Some(seller_id)
        );
        assert!(service.client_location(client_id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_transport_failure() {
        let service = InMemoryCatalogService::new();
        service.set_fail_on_lookup(true);

        let result = service.assigned_seller(ClientId::new()).await;
        assert!(matches!(result, Err(CollaboratorError::Transport(_))));
    }
}
