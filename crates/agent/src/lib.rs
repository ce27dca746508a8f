//! Agent engine - conversational orchestration over the procurement tools
//!
//! This crate is the "brain" of the procura system. It turns a user's chat
//! message into at most one tool invocation per turn:
//!
//! 1. **Intent resolution** (`intent`) - ask the completion provider to
//!    translate natural language into a structured [`ToolCall`] directive,
//!    a plain reply, or a clarifying question.
//! 2. **Confirmation gating** (`confirm`) - mutating tools never run on the
//!    turn that proposed them; a deterministic allow-list decides whether a
//!    follow-up message approves, cancels, or abandons the proposal.
//! 3. **Tool execution** (`executor`) - approved calls go through the
//!    [`ToolGateway`] exactly once; every failure is translated into plain
//!    user-facing language.
//! 4. **Response composition** (`compose`) - the outgoing agent message,
//!    with its optional structured attachment, is appended to the durable
//!    conversation log.
//!
//! # Safety principle
//!
//! The completion provider is strictly a translator. It never executes
//! tools, never fabricates tool results, and never decides whether a
//! mutating action is confirmed - those are deterministic decisions made
//! here.
//!
//! [`ToolCall`]: procura_core::domain::tool::ToolCall
//! [`ToolGateway`]: crate::tools::ToolGateway

pub mod compose;
pub mod confirm;
pub mod executor;
pub mod intent;
pub mod llm;
pub mod runtime;
pub mod tools;

#[cfg(test)]
pub(crate) mod test_support;

pub use compose::ResponseComposer;
pub use confirm::{ConfirmationGate, GateDecision};
pub use executor::{ToolExecutor, ToolReply};
pub use intent::{IntentResolver, ResolvedIntent};
pub use llm::{CompletionClient, CompletionError, HttpCompletionClient};
pub use runtime::AgentOrchestrator;
pub use tools::ToolGateway;
