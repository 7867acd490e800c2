//! Synthesis state machine.
//!
//! ```text
//! Idle ──► Generating ──► Streaming(partial)* ──► Success | Refused | Error
//!   │                                                  ▲
//!   └──────────────────────────────────────────────────┘ (Refused / Error)
//! ```
//!
//! Transitions only move forward. `Streaming` may repeat with growing
//! text; once a terminal state is reached nothing else is accepted.

use serde::{Deserialize, Serialize};

/// Error message when the generator is not ready.
pub const NOT_AVAILABLE: &str = "not available";

/// Error message when the caller cancelled the attempt.
pub const CANCELLED: &str = "cancelled";

/// Why synthesis declined to produce a summary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RefusalReason {
    /// No retrieved evidence to ground a summary in.
    NoContent,
    /// The generator returned nothing but whitespace.
    EmptyResponse,
}

impl RefusalReason {
    pub fn as_str(self) -> &'static str {
        match self {
            RefusalReason::NoContent => "no content to synthesize",
            RefusalReason::EmptyResponse => "empty response",
        }
    }
}

impl std::fmt::Display for RefusalReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// State of a single synthesis attempt.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum SynthesisState {
    Idle,
    Generating,
    Streaming {
        partial: String,
    },
    Success {
        summary: String,
        /// `None` when the guardrail was skipped.
        guardrail_passed: Option<bool>,
    },
    Refused {
        reason: RefusalReason,
    },
    Error {
        message: String,
    },
}

impl SynthesisState {
    pub fn streaming(partial: impl Into<String>) -> Self {
        SynthesisState::Streaming {
            partial: partial.into(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        SynthesisState::Error {
            message: message.into(),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            SynthesisState::Idle => "idle",
            SynthesisState::Generating => "generating",
            SynthesisState::Streaming { .. } => "streaming",
            SynthesisState::Success { .. } => "success",
            SynthesisState::Refused { .. } => "refused",
            SynthesisState::Error { .. } => "error",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            SynthesisState::Success { .. }
                | SynthesisState::Refused { .. }
                | SynthesisState::Error { .. }
        )
    }

    /// Whether `next` may follow `self`.
    pub fn can_transition_to(&self, next: &SynthesisState) -> bool {
        use SynthesisState::*;

        match (self, next) {
            (Idle, Generating | Refused { .. } | Error { .. }) => true,
            (
                Generating | Streaming { .. },
                Streaming { .. } | Success { .. } | Refused { .. } | Error { .. },
            ) => true,
            _ => false,
        }
    }

    /// The summary text, for `Success` only.
    pub fn summary(&self) -> Option<&str> {
        match self {
            SynthesisState::Success { summary, .. } => Some(summary),
            _ => None,
        }
    }

    /// Latest text visible to the user: the partial or final summary.
    pub fn text(&self) -> Option<&str> {
        match self {
            SynthesisState::Streaming { partial } => Some(partial),
            SynthesisState::Success { summary, .. } => Some(summary),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn success() -> SynthesisState {
        SynthesisState::Success {
            summary: "ok".to_string(),
            guardrail_passed: None,
        }
    }

    #[test]
    fn forward_transitions() {
        let idle = SynthesisState::Idle;
        assert!(idle.can_transition_to(&SynthesisState::Generating));
        assert!(idle.can_transition_to(&SynthesisState::error(NOT_AVAILABLE)));
        assert!(idle.can_transition_to(&SynthesisState::Refused {
            reason: RefusalReason::NoContent
        }));
        assert!(!idle.can_transition_to(&SynthesisState::streaming("x")));
        assert!(!idle.can_transition_to(&success()));

        let generating = SynthesisState::Generating;
        assert!(generating.can_transition_to(&SynthesisState::streaming("x")));
        assert!(generating.can_transition_to(&success()));
        assert!(!generating.can_transition_to(&SynthesisState::Idle));
        assert!(!generating.can_transition_to(&SynthesisState::Generating));

        let streaming = SynthesisState::streaming("x");
        assert!(streaming.can_transition_to(&SynthesisState::streaming("xy")));
        assert!(!streaming.can_transition_to(&SynthesisState::Generating));
    }

    #[test]
    fn terminal_states_accept_nothing() {
        for terminal in [
            success(),
            SynthesisState::error(CANCELLED),
            SynthesisState::Refused {
                reason: RefusalReason::EmptyResponse,
            },
        ] {
            assert!(terminal.is_terminal());
            assert!(!terminal.can_transition_to(&SynthesisState::error("late")));
            assert!(!terminal.can_transition_to(&success()));
        }
        assert!(!SynthesisState::Idle.is_terminal());
    }

    #[test]
    fn refusal_messages() {
        assert_eq!(RefusalReason::NoContent.to_string(), "no content to synthesize");
        assert_eq!(RefusalReason::EmptyResponse.to_string(), "empty response");
    }

    #[test]
    fn serializes_with_state_tag() {
        let json = serde_json::to_value(SynthesisState::Success {
            summary: "Give ORS.".to_string(),
            guardrail_passed: Some(false),
        })
        .unwrap();
        assert_eq!(
            json,
            serde_json::json!({"state": "success", "summary": "Give ORS.", "guardrail_passed": false})
        );
    }
}
