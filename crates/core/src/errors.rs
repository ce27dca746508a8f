use thiserror::Error;

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum DomainError {
    #[error("invalid {field}: {reason}")]
    InvalidField { field: &'static str, reason: String },
    #[error("conversation {conversation_id} is already completed")]
    ConversationAlreadyCompleted { conversation_id: String },
}

/// Normalized failures from the five tool operations. Every variant has
/// a plain-language rendering so the executor never leaks raw errors
/// into the conversation.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum ToolError {
    #[error("validation failed: {0}")]
    Validation(String),
    #[error("item not found: {item_id}")]
    ItemNotFound { item_id: String },
    #[error("likely duplicate of existing item `{name}`")]
    DuplicateSuspected { name: String },
    #[error("cart is empty")]
    EmptyCart,
    #[error("authentication required")]
    AuthenticationRequired,
    #[error("downstream service unavailable: {0}")]
    ProviderUnavailable(String),
}

impl ToolError {
    pub fn user_message(&self) -> String {
        match self {
            Self::Validation(reason) => {
                format!("I couldn't do that: {reason}. Could you adjust the request?")
            }
            Self::ItemNotFound { item_id } => format!(
                "I couldn't find an item with id {item_id}. Try searching the catalog first."
            ),
            Self::DuplicateSuspected { name } => format!(
                "An item named \"{name}\" already exists in the catalog, so I didn't register a \
                 duplicate. If this is a different item, give it a more specific name."
            ),
            Self::EmptyCart => {
                "Your cart is empty, so there is nothing to check out yet.".to_string()
            }
            Self::AuthenticationRequired => {
                "I need to know who you are for that. Please sign in and try again.".to_string()
            }
            Self::ProviderUnavailable(_) => {
                "A backing service is temporarily unavailable. Please try again in a moment."
                    .to_string()
            }
        }
    }
}

impl From<DomainError> for ToolError {
    fn from(value: DomainError) -> Self {
        match value {
            DomainError::InvalidField { field, reason } => {
                Self::Validation(format!("{field} {reason}"))
            }
            DomainError::ConversationAlreadyCompleted { conversation_id } => Self::Validation(
                format!("conversation {conversation_id} is already completed"),
            ),
        }
    }
}

/// Failures surfaced to the chat endpoint's caller. Everything the
/// resolver, gateway, or executor can throw is absorbed before this
/// boundary; only request-shape and persistence problems reach it.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum ChatError {
    #[error("invalid request: {message}")]
    Validation { message: String },
    #[error("conversation not found: {conversation_id}")]
    ConversationNotFound { conversation_id: String },
    #[error("internal error: {message}")]
    Internal { message: String },
}

impl ChatError {
    pub fn user_message(&self) -> String {
        match self {
            Self::Validation { message } => {
                format!("The request could not be processed: {message}.")
            }
            Self::ConversationNotFound { .. } => {
                "That conversation no longer exists. Start a new one and try again.".to_string()
            }
            Self::Internal { .. } => "An unexpected internal error occurred.".to_string(),
        }
    }
}
