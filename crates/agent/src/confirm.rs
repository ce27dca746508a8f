/// Outcome of evaluating a user message against a pending proposal.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum GateDecision {
    /// Explicit affirmation; the proposed call may run.
    Approve,
    /// Explicit negation; the proposal is dropped without a gateway call.
    Cancel,
    /// Neither; the proposal is discarded and the message is treated as a
    /// fresh turn.
    Fresh,
}

const AFFIRMATIVES: &[&str] = &[
    "yes",
    "y",
    "yeah",
    "yep",
    "yup",
    "sure",
    "ok",
    "okay",
    "confirm",
    "confirmed",
    "do it",
    "go ahead",
    "go for it",
    "please do",
    "yes please",
    "sounds good",
    "proceed",
];

const NEGATIVES: &[&str] = &[
    "no",
    "n",
    "nope",
    "nah",
    "cancel",
    "stop",
    "don't",
    "do not",
    "abort",
    "no thanks",
    "no thank you",
    "never mind",
    "nevermind",
    "forget it",
];

/// Deterministic confirmation matching. The provider is never consulted
/// here: either the message is an unambiguous allow-listed affirmation or
/// negation, or the proposal is abandoned.
#[derive(Clone, Copy, Debug, Default)]
pub struct ConfirmationGate;

impl ConfirmationGate {
    pub fn evaluate(&self, user_text: &str) -> GateDecision {
        let normalized = normalize(user_text);
        if AFFIRMATIVES.contains(&normalized.as_str()) {
            GateDecision::Approve
        } else if NEGATIVES.contains(&normalized.as_str()) {
            GateDecision::Cancel
        } else {
            GateDecision::Fresh
        }
    }
}

fn normalize(text: &str) -> String {
    text.trim()
        .trim_end_matches(['.', '!', '?', ','])
        .trim()
        .to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::{ConfirmationGate, GateDecision};

    #[test]
    fn affirmations_approve() {
        let gate = ConfirmationGate;
        for text in ["yes", "Yes!", "  go ahead  ", "OK", "sure.", "Yes please"] {
            assert_eq!(gate.evaluate(text), GateDecision::Approve, "{text:?}");
        }
    }

    #[test]
    fn negations_cancel() {
        let gate = ConfirmationGate;
        for text in ["no", "No thanks", "never mind", "CANCEL", "nope."] {
            assert_eq!(gate.evaluate(text), GateDecision::Cancel, "{text:?}");
        }
    }

    #[test]
    fn anything_else_abandons_the_proposal() {
        let gate = ConfirmationGate;
        for text in [
            "actually, search for monitors instead",
            "yes but make it 5",
            "what's in my cart?",
            "maybe",
        ] {
            assert_eq!(gate.evaluate(text), GateDecision::Fresh, "{text:?}");
        }
    }
}
