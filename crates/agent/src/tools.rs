use async_trait::async_trait;

use procura_core::domain::cart::CartSnapshot;
use procura_core::domain::catalog::{CatalogItem, ItemId, NewCatalogItem};
use procura_core::domain::conversation::UserId;
use procura_core::domain::purchase::PurchaseRequestSnapshot;
use procura_core::errors::ToolError;

/// The agent's only route to side effects. Implementations are pure
/// adapters over the domain services: they validate, execute, and report,
/// but make no conversational decisions.
#[async_trait]
pub trait ToolGateway: Send + Sync {
    async fn search_catalog(
        &self,
        keyword: Option<&str>,
        limit: u32,
    ) -> Result<Vec<CatalogItem>, ToolError>;

    async fn register_item(&self, item: NewCatalogItem) -> Result<CatalogItem, ToolError>;

    async fn add_to_cart(
        &self,
        user_id: &UserId,
        item_id: &ItemId,
        quantity: u32,
    ) -> Result<CartSnapshot, ToolError>;

    async fn view_cart(&self, user_id: &UserId) -> Result<CartSnapshot, ToolError>;

    async fn checkout(
        &self,
        user_id: &UserId,
        notes: Option<&str>,
    ) -> Result<PurchaseRequestSnapshot, ToolError>;
}

/// Default number of catalog rows returned when the directive omits a
/// limit.
pub const DEFAULT_SEARCH_LIMIT: u32 = 10;

/// Hard ceiling regardless of what the directive asks for.
pub const MAX_SEARCH_LIMIT: u32 = 50;

pub fn clamp_search_limit(requested: Option<u32>) -> u32 {
    requested.unwrap_or(DEFAULT_SEARCH_LIMIT).clamp(1, MAX_SEARCH_LIMIT)
}
