use std::fmt::Write as _;
use std::sync::Arc;

use rust_decimal::Decimal;
use serde_json::Value;
use tracing::warn;

use procura_core::domain::catalog::ItemId;
use procura_core::domain::conversation::{Conversation, MessageRole};
use procura_core::domain::tool::ToolCall;

use crate::llm::CompletionClient;
use crate::tools::MAX_SEARCH_LIMIT;

/// Fixed reply used whenever the completion provider is unreachable. The
/// turn still completes; the proposal state of the conversation is
/// untouched.
pub const PROVIDER_UNAVAILABLE_REPLY: &str =
    "Sorry, I'm having trouble reaching my language model right now. \
     Please try again in a moment.";

const SYSTEM_INSTRUCTION: &str = r#"You are a procurement assistant. You help users search a purchasing catalog, register new catalog items, manage a shopping cart, and submit purchase requests.

You have exactly five tools:
- search_catalog: {"tool": "search_catalog", "keyword": "<text or null>", "limit": <number or null>}
- register_item: {"tool": "register_item", "name": "...", "category": "...", "description": "...", "estimated_price": <number>}
- add_to_cart: {"tool": "add_to_cart", "item_id": "...", "quantity": <number>}
- view_cart: {"tool": "view_cart"}
- checkout: {"tool": "checkout", "notes": "<text or null>"}

Rules:
- When the user's request maps to a tool, respond with ONLY the tool's JSON object on a single line. No prose before or after it.
- Never invent item ids, prices, or quantities the user did not give you. If a required parameter is missing or ambiguous, ask for it in plain text instead of calling a tool.
- register_item, add_to_cart, and checkout are proposed to the user for confirmation before they run; do not ask for confirmation yourself.
- For anything conversational, answer briefly in plain text."#;

/// What the provider's output was understood to mean. `Clarify` carries
/// the question we ask instead of guessing a missing parameter.
#[derive(Clone, Debug, PartialEq)]
pub enum ResolvedIntent {
    Reply(String),
    Clarify(String),
    ToolCall(ToolCall),
}

/// Translates the conversation's recent transcript into a
/// [`ResolvedIntent`]. The provider is a translator only: its output is
/// parsed strictly, and anything partial or malformed degrades to a
/// clarifying question.
pub struct IntentResolver {
    client: Arc<dyn CompletionClient>,
    history_window: usize,
}

impl IntentResolver {
    pub fn new(client: Arc<dyn CompletionClient>, history_window: usize) -> Self {
        Self { client, history_window: history_window.max(1) }
    }

    pub async fn resolve(&self, conversation: &Conversation) -> ResolvedIntent {
        let prompt = self.transcript(conversation);
        match self.client.complete(SYSTEM_INSTRUCTION, &prompt).await {
            Ok(raw) => parse_directive(&raw),
            Err(err) => {
                warn!(
                    conversation_id = %conversation.id.0,
                    error = %err,
                    "completion provider unavailable, degrading to apology"
                );
                ResolvedIntent::Reply(PROVIDER_UNAVAILABLE_REPLY.to_string())
            }
        }
    }

    /// Last `history_window` messages rendered as a plain transcript.
    /// System messages are skipped; the provider sees only what the user
    /// and the agent said.
    fn transcript(&self, conversation: &Conversation) -> String {
        let start = conversation.messages.len().saturating_sub(self.history_window);
        let mut prompt = String::new();
        for message in &conversation.messages[start..] {
            let speaker = match message.role {
                MessageRole::User => "User",
                MessageRole::Agent => "Assistant",
                MessageRole::System => continue,
            };
            let _ = writeln!(prompt, "{speaker}: {}", message.content);
        }
        prompt.push_str("Assistant:");
        prompt
    }
}

/// Strict parse of the provider's output. A JSON object with a `tool`
/// field becomes a [`ToolCall`]; a JSON object missing required
/// parameters becomes a clarifying question; everything else is treated
/// as a plain conversational reply.
pub fn parse_directive(raw: &str) -> ResolvedIntent {
    let trimmed = strip_code_fence(raw.trim());

    if !trimmed.starts_with('{') {
        if trimmed.is_empty() {
            return ResolvedIntent::Clarify(
                "I didn't catch that. Could you rephrase your request?".to_string(),
            );
        }
        return ResolvedIntent::Reply(trimmed.to_string());
    }

    let value: Value = match serde_json::from_str(trimmed) {
        Ok(value) => value,
        Err(_) => {
            return ResolvedIntent::Clarify(
                "I didn't fully understand that. Could you rephrase your request?".to_string(),
            )
        }
    };

    let Some(object) = value.as_object() else {
        return ResolvedIntent::Clarify(
            "I didn't fully understand that. Could you rephrase your request?".to_string(),
        );
    };

    let Some(tool) = object.get("tool").and_then(Value::as_str) else {
        return ResolvedIntent::Clarify(
            "I didn't fully understand that. Could you rephrase your request?".to_string(),
        );
    };

    match parse_tool_call(tool, object) {
        Ok(call) => ResolvedIntent::ToolCall(call),
        Err(question) => ResolvedIntent::Clarify(question),
    }
}

fn parse_tool_call(
    tool: &str,
    args: &serde_json::Map<String, Value>,
) -> Result<ToolCall, String> {
    match tool {
        "search_catalog" => {
            let keyword = non_empty_string(args.get("keyword"));
            let limit = args
                .get("limit")
                .and_then(Value::as_u64)
                .map(|limit| limit.min(u64::from(MAX_SEARCH_LIMIT)) as u32);
            Ok(ToolCall::SearchCatalog { keyword, limit })
        }
        "register_item" => {
            let name = non_empty_string(args.get("name"));
            let category = non_empty_string(args.get("category"));
            let price = args.get("estimated_price").and_then(parse_price);
            match (name, category, price) {
                (Some(name), Some(category), Some(estimated_price)) => {
                    Ok(ToolCall::RegisterItem {
                        name,
                        category,
                        description: non_empty_string(args.get("description"))
                            .unwrap_or_default(),
                        estimated_price,
                    })
                }
                _ => Err("To register an item I need its name, a category, and an \
                          estimated price. Could you provide those?"
                    .to_string()),
            }
        }
        "add_to_cart" => {
            let item_id = non_empty_string(args.get("item_id"));
            let quantity = args.get("quantity").and_then(Value::as_u64);
            match (item_id, quantity) {
                (Some(item_id), Some(quantity)) if quantity >= 1 => Ok(ToolCall::AddToCart {
                    item_id: ItemId(item_id),
                    quantity: quantity.min(u64::from(u32::MAX)) as u32,
                }),
                _ => Err("Which catalog item should I add, and how many? I need an item \
                          id and a quantity of at least 1."
                    .to_string()),
            }
        }
        "view_cart" => Ok(ToolCall::ViewCart),
        "checkout" => Ok(ToolCall::Checkout { notes: non_empty_string(args.get("notes")) }),
        other => Err(format!(
            "I don't have a \"{other}\" capability. I can search the catalog, register \
             items, manage your cart, and check out."
        )),
    }
}

/// Providers emit prices as JSON numbers or strings; accept both but
/// never a guess.
fn parse_price(value: &Value) -> Option<Decimal> {
    match value {
        Value::String(raw) => raw.trim().parse().ok(),
        Value::Number(_) => value.to_string().parse().ok(),
        _ => None,
    }
}

fn non_empty_string(value: Option<&Value>) -> Option<String> {
    value
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

fn strip_code_fence(raw: &str) -> &str {
    let Some(rest) = raw.strip_prefix("```") else {
        return raw;
    };
    // Drop the language tag on the opening fence line, if any.
    let rest = rest.split_once('\n').map_or("", |(_, body)| body);
    rest.rsplit_once("```").map_or(rest, |(body, _)| body).trim()
}
