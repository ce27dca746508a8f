use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::cart::CartSnapshot;
use crate::domain::catalog::CatalogItem;
use crate::domain::purchase::PurchaseRequestSnapshot;
use crate::domain::tool::ToolCall;
use crate::errors::DomainError;

pub const PREVIEW_MAX_CHARS: usize = 120;
pub const UNTITLED_CONVERSATION: &str = "New conversation";

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ConversationId(pub String);

impl ConversationId {
    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct UserId(pub String);

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConversationStatus {
    InProgress,
    Completed,
}

impl ConversationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::InProgress => "in_progress",
            Self::Completed => "completed",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "in_progress" => Some(Self::InProgress),
            "completed" => Some(Self::Completed),
            _ => None,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageRole {
    User,
    Agent,
    System,
}

impl MessageRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Agent => "agent",
            Self::System => "system",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "user" => Some(Self::User),
            "agent" => Some(Self::Agent),
            "system" => Some(Self::System),
            _ => None,
        }
    }
}

/// Structured payload carried alongside an agent reply.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum MessageAttachment {
    Items { items: Vec<CatalogItem> },
    Cart { cart: CartSnapshot },
    PurchaseRequest { purchase_request: PurchaseRequestSnapshot },
}

/// A single entry in a conversation log. Immutable once appended;
/// corrections are new messages, never edits.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub role: MessageRole,
    pub content: String,
    pub created_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub attachment: Option<MessageAttachment>,
    /// Set on agent messages that ask the user to confirm a mutating
    /// action. Pending-action state is derived from this field on the
    /// most recent agent message, so it survives process restarts.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub proposed_call: Option<ToolCall>,
}

impl Message {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::User,
            content: content.into(),
            created_at: Utc::now(),
            attachment: None,
            proposed_call: None,
        }
    }

    pub fn agent(content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::Agent,
            content: content.into(),
            created_at: Utc::now(),
            attachment: None,
            proposed_call: None,
        }
    }

    pub fn with_attachment(mut self, attachment: MessageAttachment) -> Self {
        self.attachment = Some(attachment);
        self
    }

    pub fn with_proposed_call(mut self, call: ToolCall) -> Self {
        self.proposed_call = Some(call);
        self
    }

    pub fn preview(&self) -> String {
        preview_of(&self.content)
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Conversation {
    pub id: ConversationId,
    pub user_id: Option<UserId>,
    pub title: String,
    pub status: ConversationStatus,
    pub last_message_preview: String,
    pub messages: Vec<Message>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Conversation {
    pub fn new(user_id: Option<UserId>) -> Self {
        let now = Utc::now();
        Self {
            id: ConversationId::generate(),
            user_id,
            title: UNTITLED_CONVERSATION.to_string(),
            status: ConversationStatus::InProgress,
            last_message_preview: String::new(),
            messages: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }

    /// Append-only mutation. The first user message also titles the
    /// conversation.
    pub fn append(&mut self, message: Message) {
        if self.title == UNTITLED_CONVERSATION && message.role == MessageRole::User {
            self.title = preview_of(&message.content);
        }
        self.last_message_preview = message.preview();
        self.updated_at = Utc::now();
        self.messages.push(message);
    }

    /// The most recent agent message, used to recover a pending
    /// confirmation after the fact.
    pub fn last_agent_message(&self) -> Option<&Message> {
        self.messages.iter().rev().find(|message| message.role == MessageRole::Agent)
    }

    pub fn complete(&mut self) -> Result<(), DomainError> {
        match self.status {
            ConversationStatus::InProgress => {
                self.status = ConversationStatus::Completed;
                self.updated_at = Utc::now();
                Ok(())
            }
            ConversationStatus::Completed => Err(DomainError::ConversationAlreadyCompleted {
                conversation_id: self.id.0.clone(),
            }),
        }
    }

    pub fn summary(&self) -> ConversationSummary {
        ConversationSummary {
            id: self.id.clone(),
            title: self.title.clone(),
            status: self.status,
            last_message_preview: self.last_message_preview.clone(),
            updated_at: self.updated_at,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ConversationSummary {
    pub id: ConversationId,
    pub title: String,
    pub status: ConversationStatus,
    pub last_message_preview: String,
    pub updated_at: DateTime<Utc>,
}

pub fn preview_of(text: &str) -> String {
    let trimmed = text.trim();
    if trimmed.chars().count() <= PREVIEW_MAX_CHARS {
        return trimmed.to_string();
    }
    let mut preview: String = trimmed.chars().take(PREVIEW_MAX_CHARS - 1).collect();
    preview.push('…');
    preview
}
