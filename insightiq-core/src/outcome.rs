//! Attempt records and the tagged ask outcome

use crate::schema::QueryResult;
use serde::{Deserialize, Serialize};

/// Why a single generation attempt failed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum AttemptFailure {
    /// The model call itself failed before any SQL was produced. The next
    /// attempt retries the same prompt.
    ModelCall { reason: String },
    /// The generated SQL was rejected by the database. The next prompt is a
    /// correction prompt built from this record.
    Execution { sql: String, error: String },
}

/// Immutable record of one failed loop iteration.
///
/// Successful iterations terminate the loop, so only failures accumulate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attempt {
    /// The prompt the model was given.
    pub prompt: String,
    /// What went wrong.
    pub failure: AttemptFailure,
}

impl Attempt {
    /// The generated SQL, if this attempt got that far.
    pub fn sql(&self) -> Option<&str> {
        match &self.failure {
            AttemptFailure::Execution { sql, .. } => Some(sql),
            AttemptFailure::ModelCall { .. } => None,
        }
    }
}

/// Terminal outcome of one question.
///
/// Callers branch on the variant; only the outermost UI flattens it to text
/// via [`AskOutcome::message`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum AskOutcome {
    /// The generated SQL executed and returned data.
    Answer(QueryResult),
    /// The model emitted the unanswerable sentinel. Terminal on first sight,
    /// never retried.
    NotUnderstood,
    /// Every attempt in the budget failed; the history says how.
    RetriesExhausted { attempts: Vec<Attempt> },
}

impl AskOutcome {
    /// The fixed user-facing message for failure variants.
    pub fn message(&self) -> Option<String> {
        match self {
            AskOutcome::Answer(_) => None,
            AskOutcome::NotUnderstood => {
                Some("AI could not understand the question.".to_string())
            }
            AskOutcome::RetriesExhausted { attempts } => Some(format!(
                "Failed to generate valid SQL after {} attempts.",
                attempts.len()
            )),
        }
    }

    pub fn is_answer(&self) -> bool {
        matches!(self, AskOutcome::Answer(_))
    }
}

// =============================================================================
// TESTS
// =============================================================================
