use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::RwLock;

use procura_core::domain::cart::CartLine;
use procura_core::domain::catalog::{CatalogItem, ItemId};
use procura_core::domain::conversation::{
    Conversation, ConversationId, ConversationStatus, ConversationSummary, Message, UserId,
};
use procura_core::domain::purchase::{PurchaseRequestId, PurchaseRequestSnapshot};

use super::{
    CartRepository, CatalogRepository, ConversationStore, PurchaseRequestRepository,
    RepositoryError,
};

#[derive(Default)]
pub struct InMemoryConversationStore {
    conversations: RwLock<HashMap<String, Conversation>>,
}

#[async_trait::async_trait]
impl ConversationStore for InMemoryConversationStore {
    async fn create(&self, user_id: Option<UserId>) -> Result<Conversation, RepositoryError> {
        let conversation = Conversation::new(user_id);
        let mut conversations = self.conversations.write().await;
        conversations.insert(conversation.id.0.clone(), conversation.clone());
        Ok(conversation)
    }

    async fn find(
        &self,
        id: &ConversationId,
        user_id: Option<&UserId>,
    ) -> Result<Option<Conversation>, RepositoryError> {
        let conversations = self.conversations.read().await;
        Ok(conversations.get(&id.0).cloned().filter(|conversation| match user_id {
            Some(user) => conversation.user_id.as_ref() == Some(user),
            None => conversation.user_id.is_none(),
        }))
    }

    async fn append_message(
        &self,
        id: &ConversationId,
        message: Message,
    ) -> Result<Conversation, RepositoryError> {
        let mut conversations = self.conversations.write().await;
        let conversation = conversations.get_mut(&id.0).ok_or_else(|| {
            RepositoryError::NotFound { entity: "conversation", id: id.0.clone() }
        })?;
        conversation.append(message);
        Ok(conversation.clone())
    }

    async fn list_recent(
        &self,
        user_id: &UserId,
        limit: u32,
    ) -> Result<Vec<ConversationSummary>, RepositoryError> {
        let conversations = self.conversations.read().await;
        let mut summaries: Vec<ConversationSummary> = conversations
            .values()
            .filter(|conversation| conversation.user_id.as_ref() == Some(user_id))
            .map(Conversation::summary)
            .collect();
        summaries.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
        summaries.truncate(limit.max(1) as usize);
        Ok(summaries)
    }

    async fn touch(&self, id: &ConversationId, preview: &str) -> Result<(), RepositoryError> {
        let mut conversations = self.conversations.write().await;
        let conversation = conversations.get_mut(&id.0).ok_or_else(|| {
            RepositoryError::NotFound { entity: "conversation", id: id.0.clone() }
        })?;
        conversation.last_message_preview =
            procura_core::domain::conversation::preview_of(preview);
        conversation.updated_at = chrono::Utc::now();
        Ok(())
    }

    async fn set_status(
        &self,
        id: &ConversationId,
        status: ConversationStatus,
    ) -> Result<(), RepositoryError> {
        let mut conversations = self.conversations.write().await;
        let conversation = conversations.get_mut(&id.0).ok_or_else(|| {
            RepositoryError::NotFound { entity: "conversation", id: id.0.clone() }
        })?;
        conversation.status = status;
        conversation.updated_at = chrono::Utc::now();
        Ok(())
    }
}

#[derive(Default)]
pub struct InMemoryCatalogRepository {
    items: RwLock<Vec<CatalogItem>>,
}

#[async_trait::async_trait]
impl CatalogRepository for InMemoryCatalogRepository {
    async fn search(
        &self,
        keyword: Option<&str>,
        limit: u32,
    ) -> Result<Vec<CatalogItem>, RepositoryError> {
        let items = self.items.read().await;
        let needle = keyword.map(|keyword| keyword.trim().to_lowercase());
        let mut matches: Vec<CatalogItem> = items
            .iter()
            .filter(|item| match needle.as_deref() {
                Some("") | None => true,
                Some(needle) => {
                    item.name.to_lowercase().contains(needle)
                        || item.category.to_lowercase().contains(needle)
                        || item.description.to_lowercase().contains(needle)
                }
            })
            .cloned()
            .collect();
        matches.sort_by(|a, b| a.name.cmp(&b.name));
        matches.truncate(limit.max(1) as usize);
        Ok(matches)
    }

    async fn insert(&self, item: CatalogItem) -> Result<(), RepositoryError> {
        let mut items = self.items.write().await;
        items.push(item);
        Ok(())
    }

    async fn find_by_id(&self, id: &ItemId) -> Result<Option<CatalogItem>, RepositoryError> {
        let items = self.items.read().await;
        Ok(items.iter().find(|item| &item.id == id).cloned())
    }

    async fn find_by_name(&self, name: &str) -> Result<Option<CatalogItem>, RepositoryError> {
        let items = self.items.read().await;
        let needle = name.trim().to_lowercase();
        Ok(items.iter().find(|item| item.name.to_lowercase() == needle).cloned())
    }
}

pub struct InMemoryCartRepository {
    catalog: Arc<InMemoryCatalogRepository>,
    lines: RwLock<HashMap<String, Vec<(ItemId, u32)>>>,
}

impl InMemoryCartRepository {
    pub fn new(catalog: Arc<InMemoryCatalogRepository>) -> Self {
        Self { catalog, lines: RwLock::default() }
    }
}

#[async_trait::async_trait]
impl CartRepository for InMemoryCartRepository {
    async fn upsert_line(
        &self,
        user_id: &UserId,
        item_id: &ItemId,
        quantity: u32,
    ) -> Result<(), RepositoryError> {
        let mut lines = self.lines.write().await;
        let user_lines = lines.entry(user_id.0.clone()).or_default();
        match user_lines.iter_mut().find(|(id, _)| id == item_id) {
            Some((_, existing)) => *existing += quantity,
            None => user_lines.push((item_id.clone(), quantity)),
        }
        Ok(())
    }

    async fn fetch_cart(&self, user_id: &UserId) -> Result<Vec<CartLine>, RepositoryError> {
        let lines = self.lines.read().await;
        let Some(user_lines) = lines.get(&user_id.0) else {
            return Ok(Vec::new());
        };

        let mut cart_lines = Vec::with_capacity(user_lines.len());
        for (item_id, quantity) in user_lines {
            let item = self.catalog.find_by_id(item_id).await?.ok_or_else(|| {
                RepositoryError::NotFound { entity: "catalog item", id: item_id.0.clone() }
            })?;
            cart_lines.push(CartLine {
                item_id: item.id,
                item_name: item.name,
                quantity: *quantity,
                unit_estimate: item.estimated_price,
            });
        }
        Ok(cart_lines)
    }

    async fn clear(&self, user_id: &UserId) -> Result<(), RepositoryError> {
        let mut lines = self.lines.write().await;
        lines.remove(&user_id.0);
        Ok(())
    }
}

#[derive(Default)]
pub struct InMemoryPurchaseRequestRepository {
    requests: RwLock<Vec<PurchaseRequestSnapshot>>,
}

#[async_trait::async_trait]
impl PurchaseRequestRepository for InMemoryPurchaseRequestRepository {
    async fn insert(&self, request: PurchaseRequestSnapshot) -> Result<(), RepositoryError> {
        let mut requests = self.requests.write().await;
        requests.push(request);
        Ok(())
    }

    async fn find_by_id(
        &self,
        id: &PurchaseRequestId,
    ) -> Result<Option<PurchaseRequestSnapshot>, RepositoryError> {
        let requests = self.requests.read().await;
        Ok(requests.iter().find(|request| &request.id == id).cloned())
    }

    async fn list_for_user(
        &self,
        user_id: &UserId,
        limit: u32,
    ) -> Result<Vec<PurchaseRequestSnapshot>, RepositoryError> {
        let requests = self.requests.read().await;
        let mut matches: Vec<PurchaseRequestSnapshot> = requests
            .iter()
            .filter(|request| &request.user_id == user_id)
            .cloned()
            .collect();
        matches.sort_by(|a, b| b.submitted_at.cmp(&a.submitted_at));
        matches.truncate(limit.max(1) as usize);
        Ok(matches)
    }
}
