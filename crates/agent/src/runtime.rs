use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::Mutex;
use tracing::{debug, info};

use procura_core::domain::conversation::{Conversation, ConversationId, Message, UserId};
use procura_core::domain::tool::ToolCall;
use procura_core::errors::ChatError;
use procura_db::repositories::{ConversationStore, RepositoryError};

use crate::compose::ResponseComposer;
use crate::confirm::{ConfirmationGate, GateDecision};
use crate::executor::ToolExecutor;
use crate::intent::{IntentResolver, ResolvedIntent};

const CANCELLED_REPLY: &str = "Okay, I won't do that. Anything else I can help with?";

/// Façade sequencing one chat turn: append the user message, settle any
/// pending proposal, resolve intent, execute at most one tool, append
/// exactly one agent reply. Turns on the same conversation are
/// serialized; different conversations proceed in parallel.
pub struct AgentOrchestrator {
    store: Arc<dyn ConversationStore>,
    resolver: IntentResolver,
    gate: ConfirmationGate,
    executor: ToolExecutor,
    composer: ResponseComposer,
    turn_locks: Mutex<HashMap<String, Arc<Mutex<()>>>>,
}

impl AgentOrchestrator {
    pub fn new(
        store: Arc<dyn ConversationStore>,
        resolver: IntentResolver,
        executor: ToolExecutor,
    ) -> Self {
        Self {
            composer: ResponseComposer::new(store.clone()),
            store,
            resolver,
            gate: ConfirmationGate,
            executor,
            turn_locks: Mutex::new(HashMap::new()),
        }
    }

    /// Handles one user message end to end and returns the updated
    /// conversation, whose last message is the agent's reply. Only
    /// request-shape and persistence failures surface as errors; every
    /// resolver, gateway, or executor problem is answered in-band.
    pub async fn handle_message(
        &self,
        user_id: Option<UserId>,
        conversation_id: Option<ConversationId>,
        text: &str,
    ) -> Result<Conversation, ChatError> {
        let text = text.trim();
        if text.is_empty() {
            return Err(ChatError::Validation {
                message: "message must not be empty".to_string(),
            });
        }

        let id = match conversation_id {
            Some(id) => id,
            None => {
                self.store
                    .create(user_id.clone())
                    .await
                    .map_err(|err| store_error(err, "new"))?
                    .id
            }
        };

        let lock = self.turn_lock(&id).await;
        let guard = lock.lock().await;
        let result = self.run_turn(&id, user_id.as_ref(), text).await;
        drop(guard);
        self.release_turn_lock(&id, lock).await;
        result
    }

    async fn run_turn(
        &self,
        id: &ConversationId,
        user_id: Option<&UserId>,
        text: &str,
    ) -> Result<Conversation, ChatError> {
        // Re-read under the lock so this turn sees everything a
        // previously serialized turn appended.
        let conversation = self
            .store
            .find(id, user_id)
            .await
            .map_err(|err| store_error(err, &id.0))?
            .ok_or_else(|| ChatError::ConversationNotFound {
                conversation_id: id.0.clone(),
            })?;

        let pending = conversation
            .last_agent_message()
            .and_then(|message| message.proposed_call.clone());

        let conversation = self
            .store
            .append_message(id, Message::user(text))
            .await
            .map_err(|err| store_error(err, &id.0))?;

        if let Some(call) = pending {
            match self.gate.evaluate(text) {
                GateDecision::Approve => {
                    info!(conversation_id = %id.0, tool = call.name(), "proposal confirmed");
                    return self.run_tool(id, user_id, &call).await;
                }
                GateDecision::Cancel => {
                    info!(conversation_id = %id.0, tool = call.name(), "proposal cancelled");
                    return self
                        .composer
                        .reply(id, CANCELLED_REPLY)
                        .await
                        .map_err(|err| store_error(err, &id.0));
                }
                GateDecision::Fresh => {
                    debug!(conversation_id = %id.0, tool = call.name(), "proposal abandoned");
                }
            }
        }

        match self.resolver.resolve(&conversation).await {
            ResolvedIntent::Reply(reply) | ResolvedIntent::Clarify(reply) => self
                .composer
                .reply(id, reply)
                .await
                .map_err(|err| store_error(err, &id.0)),
            ResolvedIntent::ToolCall(call) if call.is_mutating() => {
                info!(conversation_id = %id.0, tool = call.name(), "proposing mutating call");
                self.composer.propose(id, call).await.map_err(|err| store_error(err, &id.0))
            }
            ResolvedIntent::ToolCall(call) => self.run_tool(id, user_id, &call).await,
        }
    }

    async fn run_tool(
        &self,
        id: &ConversationId,
        user_id: Option<&UserId>,
        call: &ToolCall,
    ) -> Result<Conversation, ChatError> {
        let reply = self.executor.execute(user_id, call).await;
        self.composer.tool_reply(id, reply).await.map_err(|err| store_error(err, &id.0))
    }

    async fn turn_lock(&self, id: &ConversationId) -> Arc<Mutex<()>> {
        let mut locks = self.turn_locks.lock().await;
        locks.entry(id.0.clone()).or_default().clone()
    }

    /// Drops the map entry once no other turn holds a handle to it, so
    /// the lock map stays proportional to in-flight conversations rather
    /// than every conversation ever seen.
    async fn release_turn_lock(&self, id: &ConversationId, lock: Arc<Mutex<()>>) {
        drop(lock);
        let mut locks = self.turn_locks.lock().await;
        if let Some(entry) = locks.get(&id.0) {
            if Arc::strong_count(entry) == 1 {
                locks.remove(&id.0);
            }
        }
    }
}

fn store_error(err: RepositoryError, conversation_id: &str) -> ChatError {
    if err.is_not_found() {
        ChatError::ConversationNotFound { conversation_id: conversation_id.to_string() }
    } else {
        ChatError::Internal { message: err.to_string() }
    }
}
