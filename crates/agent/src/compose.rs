use std::sync::Arc;

use procura_core::domain::conversation::{Conversation, ConversationId, Message};
use procura_core::domain::tool::ToolCall;
use procura_db::repositories::{ConversationStore, RepositoryError};

use crate::executor::ToolReply;

/// Builds the outgoing agent message and appends it to the conversation
/// log. All agent-authored messages go through here so the proposal
/// carried by the latest agent message stays the single source of
/// pending-action truth.
pub struct ResponseComposer {
    store: Arc<dyn ConversationStore>,
}

impl ResponseComposer {
    pub fn new(store: Arc<dyn ConversationStore>) -> Self {
        Self { store }
    }

    pub async fn reply(
        &self,
        id: &ConversationId,
        text: impl Into<String>,
    ) -> Result<Conversation, RepositoryError> {
        self.store.append_message(id, Message::agent(text)).await
    }

    /// Appends the description-for-confirmation with the proposed call
    /// attached, arming the confirmation gate for the next user turn.
    pub async fn propose(
        &self,
        id: &ConversationId,
        call: ToolCall,
    ) -> Result<Conversation, RepositoryError> {
        let prompt = call.confirmation_prompt();
        self.store.append_message(id, Message::agent(prompt).with_proposed_call(call)).await
    }

    pub async fn tool_reply(
        &self,
        id: &ConversationId,
        reply: ToolReply,
    ) -> Result<Conversation, RepositoryError> {
        let mut message = Message::agent(reply.text);
        if let Some(attachment) = reply.attachment {
            message = message.with_attachment(attachment);
        }
        self.store.append_message(id, message).await
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use procura_core::domain::tool::ToolCall;
    use procura_db::repositories::{ConversationStore, InMemoryConversationStore};

    use super::ResponseComposer;

    #[tokio::test]
    async fn proposal_is_carried_by_the_latest_agent_message() {
        let store = Arc::new(InMemoryConversationStore::default());
        let composer = ResponseComposer::new(store.clone());
        let conversation = store.create(None).await.expect("create");

        let call = ToolCall::Checkout { notes: None };
        let updated =
            composer.propose(&conversation.id, call.clone()).await.expect("propose");

        let latest = updated.last_agent_message().expect("agent message");
        assert_eq!(latest.proposed_call.as_ref(), Some(&call));
        assert!(latest.content.contains("Shall I go ahead?"));
    }

    #[tokio::test]
    async fn plain_reply_carries_no_proposal() {
        let store = Arc::new(InMemoryConversationStore::default());
        let composer = ResponseComposer::new(store.clone());
        let conversation = store.create(None).await.expect("create");

        let updated =
            composer.reply(&conversation.id, "Happy to help.").await.expect("reply");

        let latest = updated.last_agent_message().expect("agent message");
        assert!(latest.proposed_call.is_none());
        assert!(latest.attachment.is_none());
    }
}
