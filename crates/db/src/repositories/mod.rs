use async_trait::async_trait;
use thiserror::Error;

use procura_core::domain::cart::CartLine;
use procura_core::domain::catalog::{CatalogItem, ItemId};
use procura_core::domain::conversation::{
    Conversation, ConversationId, ConversationStatus, ConversationSummary, Message, UserId,
};
use procura_core::domain::purchase::{PurchaseRequestId, PurchaseRequestSnapshot};

pub mod cart;
pub mod catalog;
pub mod conversation;
pub mod memory;
pub mod purchase;

pub use cart::SqlCartRepository;
pub use catalog::SqlCatalogRepository;
pub use conversation::SqlConversationStore;
pub use memory::{
    InMemoryCartRepository, InMemoryCatalogRepository, InMemoryConversationStore,
    InMemoryPurchaseRequestRepository,
};
pub use purchase::SqlPurchaseRequestRepository;

#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("decode error: {0}")]
    Decode(String),
    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: String },
}

impl RepositoryError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}

/// Durable conversation persistence. The only shared mutable resource in
/// the system; all appends to one conversation go through here and keep
/// arrival order.
#[async_trait]
pub trait ConversationStore: Send + Sync {
    async fn create(&self, user_id: Option<UserId>) -> Result<Conversation, RepositoryError>;

    /// When a user id is supplied, only that user's conversation is
    /// returned; anonymous lookups see only anonymous conversations.
    async fn find(
        &self,
        id: &ConversationId,
        user_id: Option<&UserId>,
    ) -> Result<Option<Conversation>, RepositoryError>;

    /// Atomic append. Fails with `NotFound` if the conversation does not
    /// exist. Returns the updated conversation.
    async fn append_message(
        &self,
        id: &ConversationId,
        message: Message,
    ) -> Result<Conversation, RepositoryError>;

    async fn list_recent(
        &self,
        user_id: &UserId,
        limit: u32,
    ) -> Result<Vec<ConversationSummary>, RepositoryError>;

    /// Refreshes preview and updated-at without appending a message.
    async fn touch(&self, id: &ConversationId, preview: &str) -> Result<(), RepositoryError>;

    async fn set_status(
        &self,
        id: &ConversationId,
        status: ConversationStatus,
    ) -> Result<(), RepositoryError>;
}

#[async_trait]
pub trait CatalogRepository: Send + Sync {
    async fn search(
        &self,
        keyword: Option<&str>,
        limit: u32,
    ) -> Result<Vec<CatalogItem>, RepositoryError>;

    async fn insert(&self, item: CatalogItem) -> Result<(), RepositoryError>;

    async fn find_by_id(&self, id: &ItemId) -> Result<Option<CatalogItem>, RepositoryError>;

    /// Case-insensitive exact name lookup, used for duplicate suspicion.
    async fn find_by_name(&self, name: &str) -> Result<Option<CatalogItem>, RepositoryError>;
}

#[async_trait]
pub trait CartRepository: Send + Sync {
    /// Adds to an existing line's quantity or creates the line.
    async fn upsert_line(
        &self,
        user_id: &UserId,
        item_id: &ItemId,
        quantity: u32,
    ) -> Result<(), RepositoryError>;

    /// Lines joined with catalog data, in insertion order.
    async fn fetch_cart(&self, user_id: &UserId) -> Result<Vec<CartLine>, RepositoryError>;

    async fn clear(&self, user_id: &UserId) -> Result<(), RepositoryError>;
}

#[async_trait]
pub trait PurchaseRequestRepository: Send + Sync {
    async fn insert(&self, request: PurchaseRequestSnapshot) -> Result<(), RepositoryError>;

    async fn find_by_id(
        &self,
        id: &PurchaseRequestId,
    ) -> Result<Option<PurchaseRequestSnapshot>, RepositoryError>;

    async fn list_for_user(
        &self,
        user_id: &UserId,
        limit: u32,
    ) -> Result<Vec<PurchaseRequestSnapshot>, RepositoryError>;
}
