//! Pricing and promotion resolver contract and in-memory fake.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use common::{CampaignId, ClientId, ProductId};
use domain::Money;

use crate::error::CollaboratorError;

/// The best eligible promotion for a product/client pair.
#[derive(Debug, Clone)]
pub struct PromotionQuote {
    /// Catalog list price.
    pub list_price: Money,
    /// Price after the promotion is applied.
    pub final_price: Money,
    /// The campaign granting the discount.
    pub campaign_id: CampaignId,
    /// Discount type as reported by the catalog (e.g. "percentage").
    pub discount_type: String,
    /// Discount value in the catalog's own terms.
    pub discount_value: Money,
}

/// External pricing/promotion resolver.
#[async_trait]
pub trait PricingService: Send + Sync {
    /// Returns the best current promotion for the product and client,
    /// if any.
    async fn best_promotion(
        &self,
        product_id: ProductId,
        client_id: ClientId,
    ) -> Result<Option<PromotionQuote>, CollaboratorError>;

    /// Returns all active prices for the product. Empty when the
    /// product has no price list entry.
    async fn all_prices(&self, product_id: ProductId) -> Result<Vec<Money>, CollaboratorError>;

    /// Re-checks whether a campaign is still valid for a product.
    async fn revalidate_promotion(
        &self,
        campaign_id: CampaignId,
        product_id: ProductId,
    ) -> Result<bool, CollaboratorError>;
}

#[derive(Debug, Default)]
struct InMemoryPricingState {
    promotions: HashMap<ProductId, PromotionQuote>,
    prices: HashMap<ProductId, Vec<Money>>,
    invalid_campaigns: HashSet<CampaignId>,
    revalidation_calls: usize,
    fail_on_best_promotion: bool,
    fail_on_all_prices: bool,
    fail_on_revalidate: bool,
}

/// In-memory pricing service for testing.
#[derive(Debug, Clone, Default)]
pub struct InMemoryPricingService {
    state: Arc<RwLock<InMemoryPricingState>>,
}

impl InMemoryPricingService {
    /// Creates a new in-memory pricing service.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers the promotion returned for a product.
    pub fn set_promotion(&self, product_id: ProductId, quote: PromotionQuote) {
        self.state
            .write()
            .unwrap()
            .promotions
            .insert(product_id, quote);
    }

    /// Registers the active price list for a product.
    pub fn set_prices(&self, product_id: ProductId, prices: Vec<Money>) {
        self.state.write().unwrap().prices.insert(product_id, prices);
    }

    /// Marks a campaign as no longer valid for re-validation.
    pub fn invalidate_campaign(&self, campaign_id: CampaignId) {
        self.state
            .write()
            .unwrap()
            .invalid_campaigns
            .insert(campaign_id);
    }

    /// Configures best-promotion lookups to fail with a transport error.
    pub fn set_fail_on_best_promotion(&self, fail: bool) {
        self.state.write().unwrap().fail_on_best_promotion = fail;
    }

    /// Configures price-list lookups to fail with a transport error.
    pub fn set_fail_on_all_prices(&self, fail: bool) {
        self.state.write().unwrap().fail_on_all_prices = fail;
    }

    /// Configures re-validation to fail with a transport error.
    pub fn set_fail_on_revalidate(&self, fail: bool) {
        self.state.write().unwrap().fail_on_revalidate = fail;
    }

    /// Returns how many re-validation calls were made.
    pub fn revalidation_call_count(&self) -> usize {
        self.state.read().unwrap().revalidation_calls
    }
}

#[async_trait]
impl PricingService for InMemoryPricingService {
    async fn best_promotion(
        &self,
        product_id: ProductId,
        _client_id: ClientId,
    ) -> Result<Option<PromotionQuote>, CollaboratorError> {
        let state = self.state.read().unwrap();
        if state.fail_on_best_promotion {
            return Err(CollaboratorError::Transport(
                "catalog service unreachable".to_string(),
            ));
        }
        Ok(state.promotions.get(&product_id).cloned())
    }

    async fn all_prices(&self, product_id: ProductId) -> Result<Vec<Money>, CollaboratorError> {
        let state = self.state.read().unwrap();
        if state.fail_on_all_prices {
            return Err(CollaboratorError::Transport(
                "catalog service unreachable".to_string(),
            ));
        }
        Ok(state.prices.get(&product_id).cloned().unwrap_or_default())
    }

    async fn revalidate_promotion(
        &self,
        campaign_id: CampaignId,
        _product_id: ProductId,
    ) -> Result<bool, CollaboratorError> {
        let mut state = self.state.write().unwrap();
        state.revalidation_calls += 1;

        if state.fail_on_revalidate {
            return Err(CollaboratorError::Transport(
                "catalog service unreachable".to_string(),
            ));
        }
        Ok(!state.invalid_campaigns.contains(&campaign_id))
    }
}
