//! Domain services behind both the REST surface and the agent's tool
//! gateway. All catalog, cart, and checkout rules live here so the two
//! entry points cannot drift apart.

use std::sync::Arc;

use tracing::info;

use procura_core::domain::cart::{validate_quantity, CartSnapshot};
use procura_core::domain::catalog::{CatalogItem, ItemId, NewCatalogItem};
use procura_core::domain::conversation::UserId;
use procura_core::domain::purchase::PurchaseRequestSnapshot;
use procura_core::errors::ToolError;
use procura_db::repositories::{
    CartRepository, CatalogRepository, PurchaseRequestRepository, RepositoryError,
};

fn repo_error(err: RepositoryError) -> ToolError {
    ToolError::ProviderUnavailable(err.to_string())
}

pub struct CatalogService {
    catalog: Arc<dyn CatalogRepository>,
}

impl CatalogService {
    pub fn new(catalog: Arc<dyn CatalogRepository>) -> Self {
        Self { catalog }
    }

    pub async fn search(
        &self,
        keyword: Option<&str>,
        limit: u32,
    ) -> Result<Vec<CatalogItem>, ToolError> {
        self.catalog.search(keyword, limit).await.map_err(repo_error)
    }

    pub async fn find(&self, item_id: &ItemId) -> Result<Option<CatalogItem>, ToolError> {
        self.catalog.find_by_id(item_id).await.map_err(repo_error)
    }

    /// Validates the draft and refuses a case-insensitive name
    /// collision; the caller decides whether to retry under a more
    /// specific name.
    pub async fn register(&self, draft: NewCatalogItem) -> Result<CatalogItem, ToolError> {
        draft.validate()?;
        if let Some(existing) =
            self.catalog.find_by_name(&draft.name).await.map_err(repo_error)?
        {
            return Err(ToolError::DuplicateSuspected { name: existing.name });
        }
        let item = draft.into_item();
        self.catalog.insert(item.clone()).await.map_err(repo_error)?;
        info!(item_id = %item.id.0, name = %item.name, "catalog item registered");
        Ok(item)
    }
}

pub struct CartService {
    catalog: Arc<dyn CatalogRepository>,
    cart: Arc<dyn CartRepository>,
}

impl CartService {
    pub fn new(catalog: Arc<dyn CatalogRepository>, cart: Arc<dyn CartRepository>) -> Self {
        Self { catalog, cart }
    }

    pub async fn add_item(
        &self,
        user_id: &UserId,
        item_id: &ItemId,
        quantity: u32,
    ) -> Result<CartSnapshot, ToolError> {
        validate_quantity(quantity)?;
        self.catalog
            .find_by_id(item_id)
            .await
            .map_err(repo_error)?
            .ok_or_else(|| ToolError::ItemNotFound { item_id: item_id.0.clone() })?;
        self.cart.upsert_line(user_id, item_id, quantity).await.map_err(repo_error)?;
        self.snapshot(user_id).await
    }

    pub async fn snapshot(&self, user_id: &UserId) -> Result<CartSnapshot, ToolError> {
        let lines = self.cart.fetch_cart(user_id).await.map_err(repo_error)?;
        Ok(CartSnapshot::from_lines(user_id.clone(), lines))
    }
}

pub struct CheckoutService {
    cart: Arc<dyn CartRepository>,
    purchases: Arc<dyn PurchaseRequestRepository>,
}

impl CheckoutService {
    pub fn new(
        cart: Arc<dyn CartRepository>,
        purchases: Arc<dyn PurchaseRequestRepository>,
    ) -> Self {
        Self { cart, purchases }
    }

    /// Freezes the cart into a purchase request, persists it, and only
    /// then clears the cart. An empty cart is refused.
    pub async fn checkout(
        &self,
        user_id: &UserId,
        notes: Option<&str>,
    ) -> Result<PurchaseRequestSnapshot, ToolError> {
        let lines = self.cart.fetch_cart(user_id).await.map_err(repo_error)?;
        let cart = CartSnapshot::from_lines(user_id.clone(), lines);
        if cart.is_empty() {
            return Err(ToolError::EmptyCart);
        }

        let request = PurchaseRequestSnapshot::from_cart(cart, notes.map(str::to_string));
        self.purchases.insert(request.clone()).await.map_err(repo_error)?;
        self.cart.clear(user_id).await.map_err(repo_error)?;
        info!(
            request_id = %request.id.0,
            user_id = %user_id.0,
            total = %request.estimated_total,
            "purchase request submitted"
        );
        Ok(request)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use rust_decimal::Decimal;

    use procura_core::domain::catalog::{ItemId, NewCatalogItem};
    use procura_core::domain::conversation::UserId;
    use procura_core::errors::ToolError;
    use procura_db::repositories::{
        InMemoryCartRepository, InMemoryCatalogRepository, InMemoryPurchaseRequestRepository,
        PurchaseRequestRepository,
    };

    use super::{CartService, CatalogService, CheckoutService};

    fn draft(name: &str) -> NewCatalogItem {
        NewCatalogItem {
            name: name.to_string(),
            category: "office".to_string(),
            description: String::new(),
            estimated_price: Decimal::new(1999, 2),
            created_by: None,
        }
    }

    fn services() -> (
        CatalogService,
        CartService,
        CheckoutService,
        Arc<InMemoryPurchaseRequestRepository>,
    ) {
        let catalog_repo = Arc::new(InMemoryCatalogRepository::default());
        let cart_repo = Arc::new(InMemoryCartRepository::new(catalog_repo.clone()));
        let purchases = Arc::new(InMemoryPurchaseRequestRepository::default());
        (
            CatalogService::new(catalog_repo.clone()),
            CartService::new(catalog_repo, cart_repo.clone()),
            CheckoutService::new(cart_repo, purchases.clone()),
            purchases,
        )
    }

    #[tokio::test]
    async fn duplicate_names_are_refused_case_insensitively() {
        let (catalog, _, _, _) = services();
        catalog.register(draft("Standing Desk")).await.expect("first registration");

        let err = catalog.register(draft("standing desk")).await.expect_err("duplicate");
        assert!(matches!(err, ToolError::DuplicateSuspected { .. }));
    }

    #[tokio::test]
    async fn adding_an_unknown_item_fails_without_touching_the_cart() {
        let (_, cart, _, _) = services();
        let user = UserId("u-1".to_string());

        let err = cart
            .add_item(&user, &ItemId("ghost".to_string()), 1)
            .await
            .expect_err("unknown item");
        assert!(matches!(err, ToolError::ItemNotFound { .. }));
        assert!(cart.snapshot(&user).await.expect("snapshot").is_empty());
    }

    #[tokio::test]
    async fn out_of_range_quantity_is_a_validation_error() {
        let (catalog, cart, _, _) = services();
        let item = catalog.register(draft("Stapler")).await.expect("register");
        let user = UserId("u-1".to_string());

        let err = cart.add_item(&user, &item.id, 0).await.expect_err("zero quantity");
        assert!(matches!(err, ToolError::Validation(_)));
        let err = cart.add_item(&user, &item.id, 1000).await.expect_err("huge quantity");
        assert!(matches!(err, ToolError::Validation(_)));
    }

    #[tokio::test]
    async fn checkout_freezes_the_cart_and_clears_it() {
        let (catalog, cart, checkout, purchases) = services();
        let item = catalog.register(draft("Stapler")).await.expect("register");
        let user = UserId("u-1".to_string());
        cart.add_item(&user, &item.id, 3).await.expect("add");

        let request = checkout.checkout(&user, Some("for the ops team")).await.expect("checkout");

        assert_eq!(request.lines.len(), 1);
        assert_eq!(request.lines[0].quantity, 3);
        assert_eq!(request.estimated_total, Decimal::new(5997, 2));
        assert_eq!(request.notes.as_deref(), Some("for the ops team"));
        assert!(cart.snapshot(&user).await.expect("snapshot").is_empty());

        let stored =
            purchases.find_by_id(&request.id).await.expect("lookup").expect("persisted");
        assert_eq!(stored.estimated_total, request.estimated_total);
    }

    #[tokio::test]
    async fn empty_cart_checkout_is_refused() {
        let (_, _, checkout, _) = services();
        let err = checkout
            .checkout(&UserId("u-1".to_string()), None)
            .await
            .expect_err("empty cart");
        assert!(matches!(err, ToolError::EmptyCart));
    }
}
