pub mod config;
pub mod domain;
pub mod errors;

pub use chrono;

pub use domain::cart::{CartLine, CartSnapshot};
pub use domain::catalog::{CatalogItem, ItemId};
pub use domain::conversation::{
    Conversation, ConversationId, ConversationStatus, ConversationSummary, Message,
    MessageAttachment, MessageRole, UserId,
};
pub use domain::purchase::{PurchaseRequestId, PurchaseRequestSnapshot, PurchaseRequestStatus};
pub use domain::tool::ToolCall;
pub use errors::{ChatError, ToolError};
