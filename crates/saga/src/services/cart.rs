//! Cart read/clear contract and in-memory fake.
//!
//! The orchestrator depends only on this narrow interface, not the
//! full cart service, which keeps the cart and order services free of
//! a mutual dependency.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use common::{CartId, ClientId, ProductId, SellerId};

use crate::error::CollaboratorError;

/// One line in a cart, as supplied by the cart collaborator.
#[derive(Debug, Clone)]
pub struct CartLine {
    pub product_id: ProductId,
    pub sku: Option<String>,
    pub name: Option<String>,
    pub quantity: u32,
    pub unit: String,
}

/// A cart resolved for an owner/seller pair.
#[derive(Debug, Clone)]
pub struct Cart {
    pub id: CartId,
    /// The purchasing client the cart was built for.
    pub client_id: ClientId,
    pub lines: Vec<CartLine>,
}

/// External cart collaborator, reduced to read and clear.
#[async_trait]
pub trait CartService: Send + Sync {
    /// Resolves the cart for an owner/seller pair. `None` when no cart
    /// exists for the pair.
    async fn get_cart(
        &self,
        owner_id: ClientId,
        seller_id: Option<SellerId>,
    ) -> Result<Option<Cart>, CollaboratorError>;

    /// Clears a cart by its identifier.
    ///
    /// Clearing by id rather than by owner/seller avoids racing with
    /// concurrent cart edits: only the exact cart the order was built
    /// from is emptied.
    async fn clear_cart(&self, cart_id: CartId) -> Result<(), CollaboratorError>;
}

#[derive(Debug, Default)]
struct InMemoryCartState {
    carts: HashMap<(ClientId, Option<SellerId>), Cart>,
    cleared: Vec<CartId>,
    fail_on_get: bool,
    fail_on_clear: bool,
}

/// In-memory cart service for testing.
#[derive(Debug, Clone, Default)]
pub struct InMemoryCartService {
    state: Arc<RwLock<InMemoryCartState>>,
}

impl InMemoryCartService {
    /// Creates a new in-memory cart service.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers the cart resolved for an owner/seller pair.
    pub fn put_cart(&self, owner_id: ClientId, seller_id: Option<SellerId>, cart: Cart) {
        self.state
            .write()
            .unwrap()
            .carts
            .insert((owner_id, seller_id), cart);
    }

    /// Configures cart reads to fail with a transport error.
    pub fn set_fail_on_get(&self, fail: bool) {
        self.state.write().unwrap().fail_on_get = fail;
    }

    /// Configures cart clears to fail with a transport error.
    pub fn set_fail_on_clear(&self, fail: bool) {
        self.state.write().unwrap().fail_on_clear = fail;
    }

    /// Returns the ids of carts cleared so far, in call order.
    pub fn cleared_carts(&self) -> Vec<CartId> {
        self.state.read().unwrap().cleared.clone()
    }
}

#[async_trait]
impl CartService for InMemoryCartService {
    async fn get_cart(
        &self,
        owner_id: ClientId,
        seller_id: Option<SellerId>,
    ) -> Result<Option<Cart>, CollaboratorError> {
        let state = self.state.read().unwrap();
        if state.fail_on_get {
            return Err(CollaboratorError::Transport(
                "cart service unreachable".to_string(),
            ));
        }
        Ok(state.carts.get(&(owner_id, seller_id)).cloned())
    }

    async fn clear_cart(&self, cart_id: CartId) -> Result<(), CollaboratorError> {
        let mut state = self.state.write().unwrap();
        if state.fail_on_clear {
            return Err(CollaboratorError::Transport(
                "cart service unreachable".to_string(),
            ));
        }
        state.cleared.push(cart_id);
        state.carts.retain(|_, cart| cart.id != cart_id);
        Ok(())
    }
}
