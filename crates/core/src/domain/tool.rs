use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::domain::catalog::ItemId;

/// The five capabilities the agent may request. Exhaustive by
/// construction; adding a capability forces every dispatch site to
/// handle it.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "tool", rename_all = "snake_case")]
pub enum ToolCall {
    SearchCatalog {
        keyword: Option<String>,
        limit: Option<u32>,
    },
    RegisterItem {
        name: String,
        category: String,
        description: String,
        estimated_price: Decimal,
    },
    AddToCart {
        item_id: ItemId,
        quantity: u32,
    },
    ViewCart,
    Checkout {
        notes: Option<String>,
    },
}

impl ToolCall {
    pub fn name(&self) -> &'static str {
        match self {
            Self::SearchCatalog { .. } => "search_catalog",
            Self::RegisterItem { .. } => "register_item",
            Self::AddToCart { .. } => "add_to_cart",
            Self::ViewCart => "view_cart",
            Self::Checkout { .. } => "checkout",
        }
    }

    /// Mutating calls commit money or write to the shared catalog and
    /// must never run without an explicit user confirmation.
    pub fn is_mutating(&self) -> bool {
        matches!(self, Self::RegisterItem { .. } | Self::AddToCart { .. } | Self::Checkout { .. })
    }

    /// The description-for-confirmation shown to the user before a
    /// mutating call is allowed to run.
    pub fn confirmation_prompt(&self) -> String {
        match self {
            Self::RegisterItem { name, category, estimated_price, .. } => format!(
                "I'll register \"{name}\" in the catalog under \"{category}\" with an estimated \
                 price of {estimated_price}. Shall I go ahead?"
            ),
            Self::AddToCart { item_id, quantity } => format!(
                "I'll add {quantity} × item {} to your cart. Shall I go ahead?",
                item_id.0
            ),
            Self::Checkout { notes } => match notes {
                Some(notes) => format!(
                    "I'll check out your cart and submit a purchase request with the note \
                     \"{notes}\". Shall I go ahead?"
                ),
                None => "I'll check out your cart and submit a purchase request. Shall I go ahead?"
                    .to_string(),
            },
            Self::SearchCatalog { .. } | Self::ViewCart => String::new(),
        }
    }
}
