use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Who spoke in a finalized transcript record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Model,
}

/// One finalized transcript record
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TranscriptTurn {
    pub role: Role,
    pub text: String,
    /// When the turn was finalized
    pub timestamp: DateTime<Utc>,
}

/// Folds partial transcription fragments into finalized turn records.
///
/// Two live buffers exist per in-progress turn, one per role. Completing a
/// turn trims both, emits a record for each non-empty one (user first, then
/// model, preserving causal order) and resets the buffers. No size bound is
/// enforced within a turn.
#[derive(Debug, Default)]
pub struct TranscriptAccumulator {
    input: String,
    output: String,
}

impl TranscriptAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a fragment of the user's speech transcription.
    pub fn append_input(&mut self, text: &str) {
        self.input.push_str(text);
    }

    /// Append a fragment of the model's speech transcription.
    pub fn append_output(&mut self, text: &str) {
        self.output.push_str(text);
    }

    /// Finalize the current turn.
    ///
    /// Returns zero, one or two records; an all-empty turn (post-trim)
    /// produces none.
    pub fn complete_turn(&mut self) -> Vec<TranscriptTurn> {
        let now = Utc::now();
        let mut turns = Vec::with_capacity(2);

        let user_text = self.input.trim();
        if !user_text.is_empty() {
            turns.push(TranscriptTurn {
                role: Role::User,
                text: user_text.to_string(),
                timestamp: now,
            });
        }
        let model_text = self.output.trim();
        if !model_text.is_empty() {
            turns.push(TranscriptTurn {
                role: Role::Model,
                text: model_text.to_string(),
                timestamp: now,
            });
        }

        self.input.clear();
        self.output.clear();
        turns
    }
}
