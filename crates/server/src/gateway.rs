use std::sync::Arc;

use async_trait::async_trait;

use procura_agent::tools::ToolGateway;
use procura_core::domain::cart::CartSnapshot;
use procura_core::domain::catalog::{CatalogItem, ItemId, NewCatalogItem};
use procura_core::domain::conversation::UserId;
use procura_core::domain::purchase::PurchaseRequestSnapshot;
use procura_core::errors::ToolError;

use crate::services::{CartService, CatalogService, CheckoutService};

/// Thin adapter exposing the domain services through the agent's tool
/// surface. It forwards; the services decide.
pub struct DomainToolGateway {
    catalog: Arc<CatalogService>,
    cart: Arc<CartService>,
    checkout: Arc<CheckoutService>,
}

impl DomainToolGateway {
    pub fn new(
        catalog: Arc<CatalogService>,
        cart: Arc<CartService>,
        checkout: Arc<CheckoutService>,
    ) -> Self {
        Self { catalog, cart, checkout }
    }
}

#[async_trait]
impl ToolGateway for DomainToolGateway {
    async fn search_catalog(
        &self,
        keyword: Option<&str>,
        limit: u32,
    ) -> Result<Vec<CatalogItem>, ToolError> {
        self.catalog.search(keyword, limit).await
    }

    async fn register_item(&self, item: NewCatalogItem) -> Result<CatalogItem, ToolError> {
        self.catalog.register(item).await
    }

    async fn add_to_cart(
        &self,
        user_id: &UserId,
        item_id: &ItemId,
        quantity: u32,
    ) -> Result<CartSnapshot, ToolError> {
        self.cart.add_item(user_id, item_id, quantity).await
    }

    async fn view_cart(&self, user_id: &UserId) -> Result<CartSnapshot, ToolError> {
        self.cart.snapshot(user_id).await
    }

    async fn checkout(
        &self,
        user_id: &UserId,
        notes: Option<&str>,
    ) -> Result<PurchaseRequestSnapshot, ToolError> {
        self.checkout.checkout(user_id, notes).await
    }
}
