use std::sync::Arc;

use tracing::{info, warn};

use procura_core::domain::catalog::NewCatalogItem;
use procura_core::domain::conversation::{MessageAttachment, UserId};
use procura_core::domain::tool::ToolCall;
use procura_core::errors::ToolError;

use crate::tools::{clamp_search_limit, ToolGateway};

/// What the executor hands back to the composer: user-facing text plus an
/// optional structured attachment mirroring the tool's result.
#[derive(Clone, Debug)]
pub struct ToolReply {
    pub text: String,
    pub attachment: Option<MessageAttachment>,
}

impl ToolReply {
    fn text_only(text: impl Into<String>) -> Self {
        Self { text: text.into(), attachment: None }
    }
}

/// Runs an approved call against the gateway, at most once, and turns
/// every outcome into plain language. Failures never escape as errors;
/// the conversation always gets a coherent reply.
pub struct ToolExecutor {
    gateway: Arc<dyn ToolGateway>,
}

impl ToolExecutor {
    pub fn new(gateway: Arc<dyn ToolGateway>) -> Self {
        Self { gateway }
    }

    pub async fn execute(&self, user_id: Option<&UserId>, call: &ToolCall) -> ToolReply {
        match self.try_execute(user_id, call).await {
            Ok(reply) => {
                info!(tool = call.name(), "tool call succeeded");
                reply
            }
            Err(err) => {
                warn!(tool = call.name(), error = %err, "tool call failed");
                ToolReply::text_only(err.user_message())
            }
        }
    }

    async fn try_execute(
        &self,
        user_id: Option<&UserId>,
        call: &ToolCall,
    ) -> Result<ToolReply, ToolError> {
        match call {
            ToolCall::SearchCatalog { keyword, limit } => {
                let items = self
                    .gateway
                    .search_catalog(keyword.as_deref(), clamp_search_limit(*limit))
                    .await?;
                if items.is_empty() {
                    let text = match keyword {
                        Some(keyword) => format!(
                            "I couldn't find any catalog items matching \"{keyword}\". You \
                             can register a new item if it should exist."
                        ),
                        None => "The catalog is empty so far. You can register the first \
                                 item whenever you're ready."
                            .to_string(),
                    };
                    return Ok(ToolReply::text_only(text));
                }
                let text = format!(
                    "I found {} catalog item{}:",
                    items.len(),
                    if items.len() == 1 { "" } else { "s" }
                );
                Ok(ToolReply { text, attachment: Some(MessageAttachment::Items { items }) })
            }
            ToolCall::RegisterItem { name, category, description, estimated_price } => {
                let item = self
                    .gateway
                    .register_item(NewCatalogItem {
                        name: name.clone(),
                        category: category.clone(),
                        description: description.clone(),
                        estimated_price: *estimated_price,
                        created_by: user_id.cloned(),
                    })
                    .await?;
                let text = format!(
                    "Done. I registered \"{}\" under \"{}\" with an estimated price of {} \
                     (item id {}).",
                    item.name, item.category, item.estimated_price, item.id.0
                );
                Ok(ToolReply {
                    text,
                    attachment: Some(MessageAttachment::Items { items: vec![item] }),
                })
            }
            ToolCall::AddToCart { item_id, quantity } => {
                let user_id = user_id.ok_or(ToolError::AuthenticationRequired)?;
                let cart = self.gateway.add_to_cart(user_id, item_id, *quantity).await?;
                let text = format!(
                    "Added. Your cart now has {} line{} with an estimated total of {}.",
                    cart.lines.len(),
                    if cart.lines.len() == 1 { "" } else { "s" },
                    cart.estimated_total
                );
                Ok(ToolReply { text, attachment: Some(MessageAttachment::Cart { cart }) })
            }
            ToolCall::ViewCart => {
                let user_id = user_id.ok_or(ToolError::AuthenticationRequired)?;
                let cart = self.gateway.view_cart(user_id).await?;
                if cart.is_empty() {
                    return Ok(ToolReply::text_only(
                        "Your cart is empty. Search the catalog to find something to add.",
                    ));
                }
                let text = format!(
                    "Your cart has {} line{} with an estimated total of {}:",
                    cart.lines.len(),
                    if cart.lines.len() == 1 { "" } else { "s" },
                    cart.estimated_total
                );
                Ok(ToolReply { text, attachment: Some(MessageAttachment::Cart { cart }) })
            }
            ToolCall::Checkout { notes } => {
                let user_id = user_id.ok_or(ToolError::AuthenticationRequired)?;
                let request = self.gateway.checkout(user_id, notes.as_deref()).await?;
                let text = format!(
                    "Purchase request {} submitted with an estimated total of {}. It is now \
                     awaiting approval.",
                    request.id.0, request.estimated_total
                );
                Ok(ToolReply {
                    text,
                    attachment: Some(MessageAttachment::PurchaseRequest {
                        purchase_request: request,
                    }),
                })
            }
        }
    }
}
