//! Order creation saga.

use chrono::{NaiveDate, Utc};
use common::{BranchId, ClientId, LineId, OrderId, SellerId, UserId};
use domain::{AppliedPromotion, GeoPoint, Money, Order, OrderLine, OrderStatus, OrderTotals};
use order_store::OrderStore;
use uuid::Uuid;

use crate::compensation::release_reservation;
use crate::error::{CollaboratorError, Result, SagaError};
use crate::services::cart::{Cart, CartLine, CartService};
use crate::services::catalog::CatalogService;
use crate::services::inventory::{InventoryService, ReservationItem};
use crate::services::pricing::{PricingService, PromotionQuote};

/// The role under which the acting user creates the order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActorRole {
    /// The actor is the purchasing client.
    Client,
    /// The actor is a seller buying on behalf of the cart's client.
    Seller,
}

/// Input for [`OrderOrchestrator::create_from_cart`].
#[derive(Debug, Clone)]
pub struct CreateOrderRequest {
    /// The acting user.
    pub actor_id: UserId,
    /// The cart owner (the purchasing client).
    pub owner_id: ClientId,
    pub actor_role: ActorRole,
    /// Pre-assigned seller, if any; also keys the cart lookup.
    pub seller_id: Option<SellerId>,
    pub branch_id: Option<BranchId>,
    pub payment_method: String,
    pub delivery_date: Option<NaiveDate>,
    /// Explicit delivery coordinates; takes priority over catalog
    /// lookups.
    pub delivery_point: Option<GeoPoint>,
    /// Explicit order-level discount on top of per-line discounts.
    pub order_discount: Money,
    pub notes: Option<String>,
    pub origin: Option<String>,
}

impl CreateOrderRequest {
    /// Creates a request with the required fields; the rest default to
    /// unset.
    pub fn new(
        actor_id: UserId,
        owner_id: ClientId,
        actor_role: ActorRole,
        payment_method: impl Into<String>,
    ) -> Self {
        Self {
            actor_id,
            owner_id,
            actor_role,
            seller_id: None,
            branch_id: None,
            payment_method: payment_method.into(),
            delivery_date: None,
            delivery_point: None,
            order_discount: Money::zero(),
            notes: None,
            origin: None,
        }
    }
}

/// Coordinates order creation from a cart.
///
/// The saga reserves stock, resolves authoritative prices, persists
/// the order graph in one transaction, then clears the source cart.
/// There is no distributed commit: any failure after the reservation
/// succeeded releases it before the error reaches the caller.
pub struct OrderOrchestrator<S, I, P, C, K>
where
    S: OrderStore,
    I: InventoryService,
    P: PricingService,
    C: CatalogService,
    K: CartService,
{
    store: S,
    inventory: I,
    pricing: P,
    catalog: C,
    cart: K,
}

impl<S, I, P, C, K> OrderOrchestrator<S, I, P, C, K>
where
    S: OrderStore,
    I: InventoryService,
    P: PricingService,
    C: CatalogService,
    K: CartService + Clone + Send + Sync + 'static,
{
    /// Creates a new orchestrator over the given store and collaborators.
    pub fn new(store: S, inventory: I, pricing: P, catalog: C, cart: K) -> Self {
        Self {
            store,
            inventory,
            pricing,
            catalog,
            cart,
        }
    }

    /// Creates an order from the cart resolved for the request's
    /// owner/seller pair.
    #[tracing::instrument(
        skip(self, request),
        fields(owner_id = %request.owner_id, actor_role = ?request.actor_role)
    )]
    pub async fn create_from_cart(&self, request: CreateOrderRequest) -> Result<Order> {
        metrics::counter!("order_creations_total").increment(1);
        let start = std::time::Instant::now();

        // 1. Resolve the exact cart for the owner/seller pair. Nothing
        // is reserved or priced for an empty cart.
        let cart = match self.cart.get_cart(request.owner_id, request.seller_id).await {
            Ok(Some(cart)) if !cart.lines.is_empty() => cart,
            Ok(_) => return Err(SagaError::EmptyCart),
            Err(e) => {
                tracing::warn!(owner_id = %request.owner_id, error = %e, "cart lookup failed");
                return Err(SagaError::Cart(e));
            }
        };

        // 2. Resolve the order's parties from the actor's role.
        let (client_id, seller_id) = self.resolve_parties(&request, &cart).await;

        // 3. Reserve stock before any pricing or persistence work. No
        // transaction is open yet, so failure needs no compensation.
        let idempotency_key = Uuid::new_v4();
        let items = cart
            .lines
            .iter()
            .map(|line| ReservationItem {
                product_id: line.product_id,
                quantity: line.quantity,
                unit: line.unit.clone(),
            })
            .collect();

        let token = match self.inventory.reserve(items, idempotency_key).await {
            Ok(token) => token,
            Err(e) => {
                metrics::counter!("order_creation_failures_total").increment(1);
                return Err(match e {
                    CollaboratorError::Business(reason) => SagaError::InsufficientStock(reason),
                    CollaboratorError::Transport(_) => {
                        tracing::warn!(%idempotency_key, error = %e, "inventory reservation transport failure");
                        SagaError::Inventory(e)
                    }
                });
            }
        };
        tracing::info!(%idempotency_key, token = %token, "stock reserved");

        // 4-8. Every failure past this point must release the
        // reservation before the error reaches the caller.
        match self
            .price_and_persist(&request, &cart, client_id, seller_id, &token)
            .await
        {
            Ok(order) => {
                // Clear the exact cart the order was built from,
                // off the request path. The order is already durable;
                // a failed clear is logged only.
                let cart_service = self.cart.clone();
                let cart_id = cart.id;
                tokio::spawn(async move {
                    if let Err(e) = cart_service.clear_cart(cart_id).await {
                        tracing::warn!(%cart_id, error = %e, "failed to clear cart after order commit");
                    }
                });

                metrics::counter!("orders_created_total").increment(1);
                metrics::histogram!("order_creation_duration_seconds")
                    .record(start.elapsed().as_secs_f64());
                tracing::info!(order_id = %order.id, grand_total = %order.grand_total, "order created");
                Ok(order)
            }
            Err(e) => {
                release_reservation(&self.inventory, &token).await;
                metrics::counter!("order_creation_failures_total").increment(1);
                Err(e)
            }
        }
    }

    /// Resolves the order's client and seller from the actor's role.
    async fn resolve_parties(
        &self,
        request: &CreateOrderRequest,
        cart: &Cart,
    ) -> (ClientId, Option<SellerId>) {
        match request.actor_role {
            ActorRole::Seller => {
                // A seller-role actor sells to the cart's client.
                let seller = request
                    .seller_id
                    .unwrap_or_else(|| SellerId::from_uuid(request.actor_id.as_uuid()));
                (cart.client_id, Some(seller))
            }
            ActorRole::Client => {
                let client = request.owner_id;
                let seller = match request.seller_id {
                    Some(seller) => Some(seller),
                    // No pre-assigned seller; ask the catalog. Absence
                    // is not an error.
                    None => match self.catalog.assigned_seller(client).await {
                        Ok(seller) => seller,
                        Err(e) => {
                            tracing::warn!(client_id = %client, error = %e, "assigned-seller lookup failed");
                            None
                        }
                    },
                };
                (client, seller)
            }
        }
    }

    async fn price_and_persist(
        &self,
        request: &CreateOrderRequest,
        cart: &Cart,
        client_id: ClientId,
        seller_id: Option<SellerId>,
        token: &str,
    ) -> Result<Order> {
        let order_id = OrderId::new();

        // 4. Resolve a price for every line. Lookups run sequentially
        // to keep the load on the catalog collaborator bounded.
        let mut priced = Vec::with_capacity(cart.lines.len());
        for cart_line in &cart.lines {
            priced.push(self.price_line(order_id, cart_line, client_id).await?);
        }

        // A promotion showing no realized discount is suspect; re-check
        // it with the catalog before persisting. Lines with an actual
        // discount were validated when added to the cart and are
        // trusted as-is.
        for (line, quote) in &priced {
            let Some(quote) = quote else { continue };
            if line.has_realized_discount() {
                continue;
            }
            match self
                .pricing
                .revalidate_promotion(quote.campaign_id, line.product_id)
                .await
            {
                Ok(true) => {}
                Ok(false) => {
                    return Err(SagaError::ExpiredPromotion {
                        campaign_id: quote.campaign_id,
                        product_id: line.product_id,
                    });
                }
                Err(e) => {
                    tracing::warn!(
                        campaign_id = %quote.campaign_id,
                        error = %e,
                        "promotion re-validation unavailable, trusting cart line"
                    );
                }
            }
        }

        let promotions: Vec<AppliedPromotion> = priced
            .iter()
            .filter_map(|(line, quote)| {
                let quote = quote.as_ref()?;
                if line.final_price <= line.list_price {
                    Some(AppliedPromotion {
                        order_id,
                        order_line_id: line.id,
                        campaign_id: quote.campaign_id,
                        discount_type: quote.discount_type.clone(),
                        discount_value: quote.discount_value,
                        applied_amount: line.discount(),
                    })
                } else {
                    None
                }
            })
            .collect();

        let lines: Vec<OrderLine> = priced.into_iter().map(|(line, _)| line).collect();

        // 5. Totals are computed once, here, and never recomputed.
        let totals = OrderTotals::compute(&lines, request.order_discount);

        // 6. Delivery location, best effort; absence is not an error.
        let delivery_point = self.resolve_delivery_point(request, client_id).await;

        let now = Utc::now();
        let order = Order {
            id: order_id,
            client_id,
            seller_id,
            branch_id: request.branch_id,
            payment_method: request.payment_method.clone(),
            delivery_date: request.delivery_date,
            origin: request.origin.clone(),
            subtotal: totals.subtotal,
            discount_total: totals.discount_total,
            tax_total: totals.tax_total,
            grand_total: totals.grand_total,
            delivery_point,
            notes: request.notes.clone(),
            status: OrderStatus::Pendiente,
            reservation_token: Some(token.to_string()),
            created_at: now,
            updated_at: now,
        };

        // 7-8. Persist the whole graph in one transaction.
        self.store.insert_order(&order, &lines, &promotions).await?;

        Ok(order)
    }

    /// Resolves the price for one cart line: best promotion first,
    /// then the minimum of the active price list.
    async fn price_line(
        &self,
        order_id: OrderId,
        cart_line: &CartLine,
        client_id: ClientId,
    ) -> Result<(OrderLine, Option<PromotionQuote>)> {
        let quote = match self
            .pricing
            .best_promotion(cart_line.product_id, client_id)
            .await
        {
            Ok(quote) => quote,
            Err(e) => {
                tracing::warn!(
                    product_id = %cart_line.product_id,
                    error = %e,
                    "best-promotion lookup failed, falling back to price list"
                );
                None
            }
        };

        if let Some(quote) = quote {
            let line = OrderLine {
                id: LineId::new(),
                order_id,
                product_id: cart_line.product_id,
                sku: cart_line.sku.clone(),
                name: cart_line.name.clone(),
                quantity: cart_line.quantity,
                unit: cart_line.unit.clone(),
                list_price: quote.list_price,
                final_price: quote.final_price,
                campaign_id: Some(quote.campaign_id),
                discount_reason: Some(quote.discount_type.clone()),
            };
            return Ok((line, Some(quote)));
        }

        let prices = self
            .pricing
            .all_prices(cart_line.product_id)
            .await
            .map_err(|e| {
                tracing::warn!(product_id = %cart_line.product_id, error = %e, "price-list lookup failed");
                SagaError::PricingUnavailable(cart_line.product_id)
            })?;

        let unit_price = prices
            .into_iter()
            .min()
            .ok_or(SagaError::PricingUnavailable(cart_line.product_id))?;

        let line = OrderLine {
            id: LineId::new(),
            order_id,
            product_id: cart_line.product_id,
            sku: cart_line.sku.clone(),
            name: cart_line.name.clone(),
            quantity: cart_line.quantity,
            unit: cart_line.unit.clone(),
            list_price: unit_price,
            final_price: unit_price,
            campaign_id: None,
            discount_reason: None,
        };
        Ok((line, None))
    }

    /// Resolves the delivery location: explicit coordinates first,
    /// then branch, then client.
    async fn resolve_delivery_point(
        &self,
        request: &CreateOrderRequest,
        client_id: ClientId,
    ) -> Option<GeoPoint> {
        if let Some(point) = request.delivery_point {
            return Some(point);
        }

        if let Some(branch_id) = request.branch_id {
            match self.catalog.branch_location(branch_id).await {
                Ok(Some(point)) => return Some(point),
                Ok(None) => {}
                Err(e) => {
                    tracing::warn!(%branch_id, error = %e, "branch location lookup failed");
                }
            }
        }

        match self.catalog.client_location(client_id).await {
            Ok(point) => point,
            Err(e) => {
                tracing::warn!(%client_id, error = %e, "client location lookup failed");
                None
            }
        }
    }
}
