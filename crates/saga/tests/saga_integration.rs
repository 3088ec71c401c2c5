//! Integration tests for order creation and status transitions.

use std::time::Duration;

use common::{CampaignId, CartId, ClientId, ProductId, UserId};
use domain::{Money, OrderStatus};
use order_store::{InMemoryOrderStore, OrderStore};
use saga::{
    ActorRole, Cart, CartLine, CreateOrderRequest, InMemoryCartService, InMemoryCatalogService,
    InMemoryInventoryService, InMemoryPricingService, OrderOrchestrator, PromotionQuote,
    SagaError, StatusMachine,
};

type TestOrchestrator = OrderOrchestrator<
    InMemoryOrderStore,
    InMemoryInventoryService,
    InMemoryPricingService,
    InMemoryCatalogService,
    InMemoryCartService,
>;

struct TestHarness {
    orchestrator: TestOrchestrator,
    status: StatusMachine<InMemoryOrderStore, InMemoryInventoryService>,
    store: InMemoryOrderStore,
    inventory: InMemoryInventoryService,
    pricing: InMemoryPricingService,
    cart: InMemoryCartService,
}

impl TestHarness {
    fn new() -> Self {
        let store = InMemoryOrderStore::new();
        let inventory = InMemoryInventoryService::new();
        let pricing = InMemoryPricingService::new();
        let catalog = InMemoryCatalogService::new();
        let cart = InMemoryCartService::new();

        let orchestrator = OrderOrchestrator::new(
            store.clone(),
            inventory.clone(),
            pricing.clone(),
            catalog.clone(),
            cart.clone(),
        );
        let status = StatusMachine::new(store.clone(), inventory.clone());

        Self {
            orchestrator,
            status,
            store,
            inventory,
            pricing,
            cart,
        }
    }

    fn put_cart(&self, owner_id: ClientId, product_id: ProductId, quantity: u32) -> CartId {
        let cart = Cart {
            id: CartId::new(),
            client_id: owner_id,
            lines: vec![CartLine {
                product_id,
                sku: Some("SKU-001".to_string()),
                name: Some("Widget".to_string()),
                quantity,
                unit: "unit".to_string(),
            }],
        };
        let cart_id = cart.id;
        self.cart.put_cart(owner_id, None, cart);
        cart_id
    }

    fn request(&self, owner_id: ClientId) -> CreateOrderRequest {
        CreateOrderRequest::new(UserId::new(), owner_id, ActorRole::Client, "cash")
    }
}

/// Polls until `check` passes or the timeout elapses, for asserting on
/// work that runs on a spawned task.
async fn wait_for(check: impl Fn() -> bool) -> bool {
    for _ in 0..100 {
        if check() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    check()
}

#[tokio::test]
async fn test_creation_without_promotion() {
    // One line, quantity 2, unit price $10, no promotion.
    let h = TestHarness::new();
    let owner_id = ClientId::new();
    let product_id = ProductId::new();
    let cart_id = h.put_cart(owner_id, product_id, 2);
    h.pricing.set_prices(product_id, vec![Money::from_cents(1000)]);

    let order = h.orchestrator.create_from_cart(h.request(owner_id)).await.unwrap();

    assert_eq!(order.subtotal, Money::from_cents(2000));
    assert_eq!(order.discount_total, Money::zero());
    assert_eq!(order.tax_total, Money::from_cents(240));
    assert_eq!(order.grand_total, Money::from_cents(2240));
    assert_eq!(order.status, OrderStatus::Pendiente);

    let lines = h.store.get_lines(order.id).await.unwrap();
    assert_eq!(lines.len(), 1);
    assert_eq!(lines[0].final_price, Money::from_cents(1000));
    assert!(lines[0].campaign_id.is_none());

    assert!(h.store.get_applied_promotions(order.id).await.unwrap().is_empty());

    // The exact cart used for creation is cleared, off the request path.
    assert!(wait_for(|| h.cart.cleared_carts() == vec![cart_id]).await);
}

#[tokio::test]
async fn test_creation_with_promotion() {
    // One line with a promotion dropping $10 to $8, quantity 3.
    let h = TestHarness::new();
    let owner_id = ClientId::new();
    let product_id = ProductId::new();
    let campaign_id = CampaignId::new();
    h.put_cart(owner_id, product_id, 3);
    h.pricing.set_promotion(
        product_id,
        PromotionQuote {
            list_price: Money::from_cents(1000),
            final_price: Money::from_cents(800),
            campaign_id,
            discount_type: "percentage".to_string(),
            discount_value: Money::from_cents(20),
        },
    );

    let order = h.orchestrator.create_from_cart(h.request(owner_id)).await.unwrap();

    assert_eq!(order.subtotal, Money::from_cents(2400));
    assert_eq!(order.discount_total, Money::from_cents(600));
    assert_eq!(order.tax_total, Money::from_cents(216));
    assert_eq!(order.grand_total, Money::from_cents(2616));

    let promotions = h.store.get_applied_promotions(order.id).await.unwrap();
    assert_eq!(promotions.len(), 1);
    assert_eq!(promotions[0].campaign_id, campaign_id);
    assert_eq!(promotions[0].applied_amount, Money::from_cents(600));

    // The discount was realized, so no re-validation call was made.
    assert_eq!(h.pricing.revalidation_call_count(), 0);
}

#[tokio::test]
async fn test_pricing_failure_after_reservation_compensates() {
    // Reservation succeeds, then the only line has no price anywhere.
    let h = TestHarness::new();
    let owner_id = ClientId::new();
    let product_id = ProductId::new();
    h.put_cart(owner_id, product_id, 1);

    let result = h.orchestrator.create_from_cart(h.request(owner_id)).await;

    assert!(matches!(result, Err(SagaError::PricingUnavailable(p)) if p == product_id));
    assert_eq!(h.store.order_count().await, 0);
    assert_eq!(h.inventory.release_call_count(), 1);
    assert_eq!(h.inventory.reservation_count(), 0);
}

#[tokio::test]
async fn test_expired_promotion_aborts_and_compensates() {
    // The promotion carries no realized discount and fails re-validation.
    let h = TestHarness::new();
    let owner_id = ClientId::new();
    let product_id = ProductId::new();
    let campaign_id = CampaignId::new();
    h.put_cart(owner_id, product_id, 2);
    h.pricing.set_promotion(
        product_id,
        PromotionQuote {
            list_price: Money::from_cents(1000),
            final_price: Money::from_cents(1000),
            campaign_id,
            discount_type: "percentage".to_string(),
            discount_value: Money::zero(),
        },
    );
    h.pricing.invalidate_campaign(campaign_id);

    let result = h.orchestrator.create_from_cart(h.request(owner_id)).await;

    assert!(matches!(
        result,
        Err(SagaError::ExpiredPromotion { campaign_id: c, product_id: p })
            if c == campaign_id && p == product_id
    ));
    assert_eq!(h.pricing.revalidation_call_count(), 1);
    assert_eq!(h.store.order_count().await, 0);
    assert_eq!(h.inventory.release_call_count(), 1);
}

#[tokio::test]
async fn test_revalidation_transport_failure_trusts_the_line() {
    let h = TestHarness::new();
    let owner_id = ClientId::new();
    let product_id = ProductId::new();
    h.put_cart(owner_id, product_id, 2);
    h.pricing.set_promotion(
        product_id,
        PromotionQuote {
            list_price: Money::from_cents(1000),
            final_price: Money::from_cents(1000),
            campaign_id: CampaignId::new(),
            discount_type: "percentage".to_string(),
            discount_value: Money::zero(),
        },
    );
    h.pricing.set_fail_on_revalidate(true);

    let order = h.orchestrator.create_from_cart(h.request(owner_id)).await.unwrap();

    assert_eq!(order.status, OrderStatus::Pendiente);
    assert_eq!(h.store.order_count().await, 1);
    assert_eq!(h.inventory.release_call_count(), 0);
}

#[tokio::test]
async fn test_promotion_transport_failure_falls_back_to_price_list() {
    let h = TestHarness::new();
    let owner_id = ClientId::new();
    let product_id = ProductId::new();
    h.put_cart(owner_id, product_id, 1);
    h.pricing.set_fail_on_best_promotion(true);
    h.pricing.set_prices(product_id, vec![Money::from_cents(700)]);

    let order = h.orchestrator.create_from_cart(h.request(owner_id)).await.unwrap();

    assert_eq!(order.subtotal, Money::from_cents(700));
}

#[tokio::test]
async fn test_cart_clear_failure_leaves_order_intact() {
    let h = TestHarness::new();
    let owner_id = ClientId::new();
    let product_id = ProductId::new();
    h.put_cart(owner_id, product_id, 1);
    h.pricing.set_prices(product_id, vec![Money::from_cents(500)]);
    h.cart.set_fail_on_clear(true);

    let order = h.orchestrator.create_from_cart(h.request(owner_id)).await.unwrap();

    // Give the spawned clear a chance to run and fail.
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert!(h.cart.cleared_carts().is_empty());
    assert!(h.store.get_order(order.id).await.unwrap().is_some());
}

#[tokio::test]
async fn test_forward_walk_reaches_delivery() {
    let h = TestHarness::new();
    let owner_id = ClientId::new();
    let product_id = ProductId::new();
    h.put_cart(owner_id, product_id, 1);
    h.pricing.set_prices(product_id, vec![Money::from_cents(500)]);

    let order = h.orchestrator.create_from_cart(h.request(owner_id)).await.unwrap();

    for next in [
        OrderStatus::Aprobado,
        OrderStatus::Preparado,
        OrderStatus::EnRuta,
        OrderStatus::Entregado,
    ] {
        h.status.change_status(order.id, next, None, None).await.unwrap();
    }

    let final_order = h.store.get_order(order.id).await.unwrap().unwrap();
    assert_eq!(final_order.status, OrderStatus::Entregado);

    // History is a walk through the transition graph, in commit order.
    let history = h.store.get_history(order.id).await.unwrap();
    let walk: Vec<(OrderStatus, OrderStatus)> = history
        .iter()
        .map(|row| (row.previous_status, row.new_status))
        .collect();
    assert_eq!(
        walk,
        vec![
            (OrderStatus::Pendiente, OrderStatus::Aprobado),
            (OrderStatus::Aprobado, OrderStatus::Preparado),
            (OrderStatus::Preparado, OrderStatus::EnRuta),
            (OrderStatus::EnRuta, OrderStatus::Entregado),
        ]
    );
}

#[tokio::test]
async fn test_en_ruta_guard() {
    let h = TestHarness::new();
    let owner_id = ClientId::new();
    let product_id = ProductId::new();
    h.put_cart(owner_id, product_id, 1);
    h.pricing.set_prices(product_id, vec![Money::from_cents(500)]);

    let order = h.orchestrator.create_from_cart(h.request(owner_id)).await.unwrap();

    // PENDIENTE cannot skip directly to EN_RUTA.
    let result = h
        .status
        .change_status(order.id, OrderStatus::EnRuta, None, None)
        .await;
    assert!(matches!(result, Err(SagaError::IllegalTransition { .. })));
    assert!(h.store.get_history(order.id).await.unwrap().is_empty());

    // From PREPARADO the same request succeeds.
    h.status
        .change_status(order.id, OrderStatus::Preparado, None, None)
        .await
        .unwrap();
    let updated = h
        .status
        .change_status(order.id, OrderStatus::EnRuta, None, None)
        .await
        .unwrap();
    assert_eq!(updated.status, OrderStatus::EnRuta);
}

#[tokio::test]
async fn test_cancel_from_aprobado_releases_reservation() {
    let h = TestHarness::new();
    let owner_id = ClientId::new();
    let product_id = ProductId::new();
    h.put_cart(owner_id, product_id, 1);
    h.pricing.set_prices(product_id, vec![Money::from_cents(500)]);

    let order = h.orchestrator.create_from_cart(h.request(owner_id)).await.unwrap();
    h.status
        .change_status(order.id, OrderStatus::Aprobado, None, None)
        .await
        .unwrap();
    let history_before = h.store.get_history(order.id).await.unwrap().len();

    let cancelled = h
        .status
        .cancel_order(order.id, None, Some("client asked".to_string()))
        .await
        .unwrap();

    assert_eq!(cancelled.status, OrderStatus::Anulado);
    let history = h.store.get_history(order.id).await.unwrap();
    assert_eq!(history.len(), history_before + 1);
    assert_eq!(history.last().unwrap().comment, "client asked");
    assert_eq!(h.inventory.release_call_count(), 1);
    assert_eq!(h.inventory.reservation_count(), 0);
}

#[tokio::test]
async fn test_cancel_after_preparation_is_rejected() {
    let h = TestHarness::new();
    let owner_id = ClientId::new();
    let product_id = ProductId::new();
    h.put_cart(owner_id, product_id, 1);
    h.pricing.set_prices(product_id, vec![Money::from_cents(500)]);

    let order = h.orchestrator.create_from_cart(h.request(owner_id)).await.unwrap();
    for next in [OrderStatus::Aprobado, OrderStatus::Preparado] {
        h.status.change_status(order.id, next, None, None).await.unwrap();
    }
    let history_before = h.store.get_history(order.id).await.unwrap().len();

    let result = h.status.cancel_order(order.id, None, None).await;

    assert!(matches!(
        result,
        Err(SagaError::NotCancellable {
            current: OrderStatus::Preparado,
        })
    ));
    let order_after = h.store.get_order(order.id).await.unwrap().unwrap();
    assert_eq!(order_after.status, OrderStatus::Preparado);
    assert_eq!(h.store.get_history(order.id).await.unwrap().len(), history_before);
    assert_eq!(h.inventory.release_call_count(), 0);
}

#[tokio::test]
async fn test_repeated_transition_writes_one_history_row() {
    let h = TestHarness::new();
    let owner_id = ClientId::new();
    let product_id = ProductId::new();
    h.put_cart(owner_id, product_id, 1);
    h.pricing.set_prices(product_id, vec![Money::from_cents(500)]);

    let order = h.orchestrator.create_from_cart(h.request(owner_id)).await.unwrap();
    h.status
        .change_status(order.id, OrderStatus::Aprobado, None, None)
        .await
        .unwrap();

    // Re-entering the current status is a legal no-op.
    h.status
        .change_status(order.id, OrderStatus::Preparado, None, None)
        .await
        .unwrap();
    h.status
        .change_status(order.id, OrderStatus::Preparado, None, None)
        .await
        .unwrap();

    let history = h.store.get_history(order.id).await.unwrap();
    let prepared_rows = history
        .iter()
        .filter(|row| row.new_status == OrderStatus::Preparado)
        .count();
    assert_eq!(prepared_rows, 1);
}
