//! Order fulfillment saga.
//!
//! Creating an order spans a local transactional store and three
//! external collaborators (inventory, pricing/catalog, cart). Instead
//! of a distributed commit, the saga runs the steps in a fixed order:
//!
//! 1. Read the cart
//! 2. Reserve stock (idempotency-keyed)
//! 3. Resolve a price per line
//! 4. Persist the order graph in one transaction
//! 5. Clear the cart (post-commit, best effort)
//!
//! Any failure after step 2 releases the reservation before the error
//! reaches the caller. The status state machine lives here too: it
//! validates transitions, writes the history trail, and releases the
//! reservation when an order enters a cancelling status.

pub mod compensation;
pub mod error;
pub mod orchestrator;
pub mod services;
pub mod status;

pub use compensation::release_reservation;
pub use error::{CollaboratorError, Result, SagaError};
pub use orchestrator::{ActorRole, CreateOrderRequest, OrderOrchestrator};
pub use services::{
    Cart, CartLine, CartService, CatalogService, InMemoryCartService, InMemoryCatalogService,
    InMemoryInventoryService, InMemoryPricingService, InMemoryWarehouseService, InventoryService,
    Picking, PricingService, PromotionQuote, ReservationItem, WarehouseService,
};
pub use status::StatusMachine;
