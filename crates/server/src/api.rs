//! JSON API for the procurement portal.
//!
//! Endpoints:
//! - `POST /api/chat`                 — send a chat message to the agent
//! - `GET  /api/conversations`        — recent conversation summaries
//! - `GET  /api/conversations/{id}`   — full conversation transcript
//! - `GET  /api/items`                — search the catalog (`q`, `limit`)
//! - `POST /api/items`                — register a catalog item
//! - `GET  /api/cart`                 — current cart snapshot
//! - `POST /api/cart/items`           — add an item to the cart
//! - `POST /api/checkout`             — submit the cart as a purchase request
//!
//! Identity is a caller-supplied `x-user-id` header; there is no
//! authentication subsystem. Cart and checkout endpoints refuse requests
//! without it.

use std::str::FromStr;
use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::{HeaderMap, StatusCode},
    routing::{get, post},
    Json, Router,
};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::warn;

use procura_agent::runtime::AgentOrchestrator;
use procura_core::domain::cart::CartSnapshot;
use procura_core::domain::catalog::{CatalogItem, ItemId, NewCatalogItem};
use procura_core::domain::conversation::{
    Conversation, ConversationId, ConversationSummary, Message, UserId,
};
use procura_core::domain::purchase::PurchaseRequestSnapshot;
use procura_core::errors::{ChatError, ToolError};
use procura_db::repositories::ConversationStore;

use crate::services::{CartService, CatalogService, CheckoutService};

const USER_HEADER: &str = "x-user-id";
const DEFAULT_CONVERSATION_LIMIT: u32 = 20;

#[derive(Clone)]
pub struct ApiState {
    pub store: Arc<dyn ConversationStore>,
    pub catalog: Arc<CatalogService>,
    pub cart: Arc<CartService>,
    pub checkout: Arc<CheckoutService>,
    pub orchestrator: Arc<AgentOrchestrator>,
}

// ---------------------------------------------------------------------------
// Request / Response types
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    pub message: String,
    #[serde(rename = "conversationId")]
    pub conversation_id: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ChatResponse {
    #[serde(rename = "conversationId")]
    pub conversation_id: String,
    pub messages: Vec<Message>,
}

#[derive(Debug, Deserialize, Default)]
pub struct SearchQuery {
    pub q: Option<String>,
    pub limit: Option<u32>,
}

#[derive(Debug, Deserialize)]
pub struct RegisterItemRequest {
    pub name: String,
    pub category: String,
    pub description: Option<String>,
    /// Decimal carried as a string, e.g. `"499.99"`.
    #[serde(rename = "estimatedPrice")]
    pub estimated_price: String,
}

#[derive(Debug, Deserialize)]
pub struct AddCartItemRequest {
    #[serde(rename = "itemId")]
    pub item_id: String,
    pub quantity: u32,
}

#[derive(Debug, Deserialize, Default)]
pub struct CheckoutRequest {
    pub notes: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ApiError {
    pub error: String,
}

type ApiResult<T> = Result<T, (StatusCode, Json<ApiError>)>;

fn api_error(status: StatusCode, message: impl Into<String>) -> (StatusCode, Json<ApiError>) {
    (status, Json(ApiError { error: message.into() }))
}

fn chat_error(err: ChatError) -> (StatusCode, Json<ApiError>) {
    let status = match &err {
        ChatError::Validation { .. } => StatusCode::UNPROCESSABLE_ENTITY,
        ChatError::ConversationNotFound { .. } => StatusCode::NOT_FOUND,
        ChatError::Internal { message } => {
            warn!(error = %message, "chat turn failed");
            StatusCode::INTERNAL_SERVER_ERROR
        }
    };
    api_error(status, err.user_message())
}

fn tool_error(err: ToolError) -> (StatusCode, Json<ApiError>) {
    let status = match &err {
        ToolError::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
        ToolError::ItemNotFound { .. } => StatusCode::NOT_FOUND,
        ToolError::DuplicateSuspected { .. } | ToolError::EmptyCart => StatusCode::CONFLICT,
        ToolError::AuthenticationRequired => StatusCode::UNAUTHORIZED,
        ToolError::ProviderUnavailable(detail) => {
            warn!(error = %detail, "backing service unavailable");
            StatusCode::SERVICE_UNAVAILABLE
        }
    };
    api_error(status, err.user_message())
}

fn user_from_headers(headers: &HeaderMap) -> Option<UserId> {
    headers
        .get(USER_HEADER)
        .and_then(|value| value.to_str().ok())
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(|value| UserId(value.to_string()))
}

fn require_user(headers: &HeaderMap) -> ApiResult<UserId> {
    user_from_headers(headers).ok_or_else(|| tool_error(ToolError::AuthenticationRequired))
}

// ---------------------------------------------------------------------------
// Router
// ---------------------------------------------------------------------------

pub fn router(state: ApiState) -> Router {
    Router::new()
        .route("/api/chat", post(chat))
        .route("/api/conversations", get(list_conversations))
        .route("/api/conversations/{id}", get(get_conversation))
        .route("/api/items", get(search_items).post(register_item))
        .route("/api/cart", get(view_cart))
        .route("/api/cart/items", post(add_cart_item))
        .route("/api/checkout", post(checkout))
        .with_state(state)
}

// ---------------------------------------------------------------------------
// Chat handlers
// ---------------------------------------------------------------------------

pub async fn chat(
    State(state): State<ApiState>,
    headers: HeaderMap,
    Json(request): Json<ChatRequest>,
) -> ApiResult<Json<ChatResponse>> {
    let user = user_from_headers(&headers);
    let conversation_id = request.conversation_id.map(ConversationId);

    let conversation = state
        .orchestrator
        .handle_message(user, conversation_id, &request.message)
        .await
        .map_err(chat_error)?;

    Ok(Json(ChatResponse {
        conversation_id: conversation.id.0,
        messages: conversation.messages,
    }))
}

pub async fn list_conversations(
    State(state): State<ApiState>,
    headers: HeaderMap,
) -> ApiResult<Json<Vec<ConversationSummary>>> {
    let Some(user) = user_from_headers(&headers) else {
        return Ok(Json(Vec::new()));
    };

    let summaries = state
        .store
        .list_recent(&user, DEFAULT_CONVERSATION_LIMIT)
        .await
        .map_err(|err| api_error(StatusCode::INTERNAL_SERVER_ERROR, err.to_string()))?;
    Ok(Json(summaries))
}

pub async fn get_conversation(
    State(state): State<ApiState>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> ApiResult<Json<Conversation>> {
    let user = user_from_headers(&headers);
    let conversation = state
        .store
        .find(&ConversationId(id.clone()), user.as_ref())
        .await
        .map_err(|err| api_error(StatusCode::INTERNAL_SERVER_ERROR, err.to_string()))?
        .ok_or_else(|| api_error(StatusCode::NOT_FOUND, format!("conversation {id} not found")))?;
    Ok(Json(conversation))
}

// ---------------------------------------------------------------------------
// Catalog handlers
// ---------------------------------------------------------------------------

pub async fn search_items(
    State(state): State<ApiState>,
    Query(query): Query<SearchQuery>,
) -> ApiResult<Json<Vec<CatalogItem>>> {
    let limit = query.limit.unwrap_or(procura_agent::tools::DEFAULT_SEARCH_LIMIT);
    let items = state
        .catalog
        .search(query.q.as_deref(), procura_agent::tools::clamp_search_limit(Some(limit)))
        .await
        .map_err(tool_error)?;
    Ok(Json(items))
}

pub async fn register_item(
    State(state): State<ApiState>,
    headers: HeaderMap,
    Json(request): Json<RegisterItemRequest>,
) -> ApiResult<(StatusCode, Json<CatalogItem>)> {
    let estimated_price = Decimal::from_str(request.estimated_price.trim()).map_err(|_| {
        api_error(
            StatusCode::UNPROCESSABLE_ENTITY,
            format!("estimatedPrice is not a valid decimal: {}", request.estimated_price),
        )
    })?;

    let item = state
        .catalog
        .register(NewCatalogItem {
            name: request.name,
            category: request.category,
            description: request.description.unwrap_or_default(),
            estimated_price,
            created_by: user_from_headers(&headers),
        })
        .await
        .map_err(tool_error)?;
    Ok((StatusCode::CREATED, Json(item)))
}

// ---------------------------------------------------------------------------
// Cart and checkout handlers
// ---------------------------------------------------------------------------

pub async fn view_cart(
    State(state): State<ApiState>,
    headers: HeaderMap,
) -> ApiResult<Json<CartSnapshot>> {
    let user = require_user(&headers)?;
    let snapshot = state.cart.snapshot(&user).await.map_err(tool_error)?;
    Ok(Json(snapshot))
}

pub async fn add_cart_item(
    State(state): State<ApiState>,
    headers: HeaderMap,
    Json(request): Json<AddCartItemRequest>,
) -> ApiResult<Json<CartSnapshot>> {
    let user = require_user(&headers)?;
    let snapshot = state
        .cart
        .add_item(&user, &ItemId(request.item_id), request.quantity)
        .await
        .map_err(tool_error)?;
    Ok(Json(snapshot))
}

pub async fn checkout(
    State(state): State<ApiState>,
    headers: HeaderMap,
    Json(request): Json<CheckoutRequest>,
) -> ApiResult<(StatusCode, Json<PurchaseRequestSnapshot>)> {
    let user = require_user(&headers)?;
    let purchase_request = state
        .checkout
        .checkout(&user, request.notes.as_deref())
        .await
        .map_err(tool_error)?;
    Ok((StatusCode::CREATED, Json(purchase_request)))
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use async_trait::async_trait;
    use axum::extract::{Path, Query, State};
    use axum::http::{HeaderMap, StatusCode};
    use axum::Json;

    use procura_agent::executor::ToolExecutor;
    use procura_agent::intent::IntentResolver;
    use procura_agent::llm::{CompletionClient, CompletionError};
    use procura_agent::runtime::AgentOrchestrator;
    use procura_core::domain::conversation::MessageRole;
    use procura_db::repositories::{
        InMemoryCartRepository, InMemoryCatalogRepository, InMemoryConversationStore,
        InMemoryPurchaseRequestRepository,
    };

    use super::*;
    use crate::gateway::DomainToolGateway;

    /// Always answers with canned text; the chat handler tests only care
    /// about request plumbing, not intent quality.
    struct CannedClient;

    #[async_trait]
    impl CompletionClient for CannedClient {
        async fn complete(
            &self,
            _system: &str,
            _prompt: &str,
        ) -> Result<String, CompletionError> {
            Ok("Happy to help with your procurement needs.".to_string())
        }
    }

    fn state() -> ApiState {
        let store = Arc::new(InMemoryConversationStore::default());
        let catalog_repo = Arc::new(InMemoryCatalogRepository::default());
        let cart_repo = Arc::new(InMemoryCartRepository::new(catalog_repo.clone()));
        let purchase_repo = Arc::new(InMemoryPurchaseRequestRepository::default());

        let catalog = Arc::new(CatalogService::new(catalog_repo.clone()));
        let cart = Arc::new(CartService::new(catalog_repo, cart_repo.clone()));
        let checkout = Arc::new(CheckoutService::new(cart_repo, purchase_repo));

        let gateway =
            Arc::new(DomainToolGateway::new(catalog.clone(), cart.clone(), checkout.clone()));
        let orchestrator = Arc::new(AgentOrchestrator::new(
            store.clone() as Arc<dyn ConversationStore>,
            IntentResolver::new(Arc::new(CannedClient), 10),
            ToolExecutor::new(gateway),
        ));

        ApiState {
            store: store as Arc<dyn ConversationStore>,
            catalog,
            cart,
            checkout,
            orchestrator,
        }
    }

    fn user_headers(user: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(super::USER_HEADER, user.parse().expect("header value"));
        headers
    }

    fn register_request(name: &str, price: &str) -> RegisterItemRequest {
        RegisterItemRequest {
            name: name.to_string(),
            category: "office".to_string(),
            description: Some("adjustable".to_string()),
            estimated_price: price.to_string(),
        }
    }

    #[tokio::test]
    async fn chat_creates_a_conversation_and_returns_the_reply() {
        let state_value = state();

        let Json(response) = chat(
            State(state_value.clone()),
            user_headers("u-1"),
            Json(ChatRequest { message: "hello".to_string(), conversation_id: None }),
        )
        .await
        .expect("chat turn");

        assert!(!response.conversation_id.is_empty());
        assert_eq!(response.messages.len(), 2);
        assert_eq!(response.messages[0].role, MessageRole::User);
        assert_eq!(response.messages[1].role, MessageRole::Agent);

        // The conversation is listed for its owner.
        let Json(summaries) =
            list_conversations(State(state_value), user_headers("u-1")).await.expect("list");
        assert_eq!(summaries.len(), 1);
        assert_eq!(summaries[0].title, "hello");
    }

    #[tokio::test]
    async fn empty_chat_message_is_unprocessable() {
        let (status, Json(body)) = chat(
            State(state()),
            HeaderMap::new(),
            Json(ChatRequest { message: "   ".to_string(), conversation_id: None }),
        )
        .await
        .expect_err("validation error");
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert!(body.error.contains("message must not be empty"));
    }

    #[tokio::test]
    async fn unknown_conversation_is_not_found() {
        let (status, _) = chat(
            State(state()),
            user_headers("u-1"),
            Json(ChatRequest {
                message: "hello".to_string(),
                conversation_id: Some("missing".to_string()),
            }),
        )
        .await
        .expect_err("not found");
        assert_eq!(status, StatusCode::NOT_FOUND);

        let (status, _) = get_conversation(
            State(state()),
            user_headers("u-1"),
            Path("missing".to_string()),
        )
        .await
        .expect_err("not found");
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn registered_items_are_searchable() {
        let state_value = state();

        let (status, Json(item)) = register_item(
            State(state_value.clone()),
            user_headers("u-1"),
            Json(register_request("Standing desk", "499.99")),
        )
        .await
        .expect("register");
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(item.estimated_price.to_string(), "499.99");

        let Json(items) = search_items(
            State(state_value),
            Query(SearchQuery { q: Some("desk".to_string()), limit: None }),
        )
        .await
        .expect("search");
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].name, "Standing desk");
    }

    #[tokio::test]
    async fn duplicate_registration_conflicts() {
        let state_value = state();
        register_item(
            State(state_value.clone()),
            HeaderMap::new(),
            Json(register_request("Stapler", "4.50")),
        )
        .await
        .expect("first registration");

        let (status, _) = register_item(
            State(state_value),
            HeaderMap::new(),
            Json(register_request("stapler", "5.00")),
        )
        .await
        .expect_err("duplicate");
        assert_eq!(status, StatusCode::CONFLICT);
    }

    #[tokio::test]
    async fn malformed_price_is_unprocessable() {
        let (status, _) = register_item(
            State(state()),
            HeaderMap::new(),
            Json(register_request("Desk", "not-a-price")),
        )
        .await
        .expect_err("bad price");
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    }

    #[tokio::test]
    async fn cart_endpoints_require_a_user() {
        let (status, _) =
            view_cart(State(state()), HeaderMap::new()).await.expect_err("no user");
        assert_eq!(status, StatusCode::UNAUTHORIZED);

        let (status, _) = checkout(
            State(state()),
            HeaderMap::new(),
            Json(CheckoutRequest::default()),
        )
        .await
        .expect_err("no user");
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn cart_and_checkout_round_trip() {
        let state_value = state();
        let (_, Json(item)) = register_item(
            State(state_value.clone()),
            user_headers("u-1"),
            Json(register_request("Monitor", "250.00")),
        )
        .await
        .expect("register");

        let Json(snapshot) = add_cart_item(
            State(state_value.clone()),
            user_headers("u-1"),
            Json(AddCartItemRequest { item_id: item.id.0.clone(), quantity: 2 }),
        )
        .await
        .expect("add to cart");
        assert_eq!(snapshot.lines.len(), 1);
        assert_eq!(snapshot.estimated_total.to_string(), "500.00");

        let (status, Json(request)) = checkout(
            State(state_value.clone()),
            user_headers("u-1"),
            Json(CheckoutRequest { notes: Some("Q3 refresh".to_string()) }),
        )
        .await
        .expect("checkout");
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(request.notes.as_deref(), Some("Q3 refresh"));

        // Cart is empty again; a second checkout conflicts.
        let Json(snapshot) =
            view_cart(State(state_value.clone()), user_headers("u-1")).await.expect("view");
        assert!(snapshot.lines.is_empty());

        let (status, _) = checkout(
            State(state_value),
            user_headers("u-1"),
            Json(CheckoutRequest::default()),
        )
        .await
        .expect_err("empty cart");
        assert_eq!(status, StatusCode::CONFLICT);
    }

    #[tokio::test]
    async fn other_users_carts_are_isolated() {
        let state_value = state();
        let (_, Json(item)) = register_item(
            State(state_value.clone()),
            user_headers("u-1"),
            Json(register_request("Keyboard", "80.00")),
        )
        .await
        .expect("register");

        add_cart_item(
            State(state_value.clone()),
            user_headers("u-1"),
            Json(AddCartItemRequest { item_id: item.id.0, quantity: 1 }),
        )
        .await
        .expect("add");

        let Json(snapshot) =
            view_cart(State(state_value), user_headers("u-2")).await.expect("view");
        assert!(snapshot.lines.is_empty());
    }
}
