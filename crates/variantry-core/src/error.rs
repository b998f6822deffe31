//! Error and warning types for the variant/analysis core.
//!
//! Hard failures (bad configuration, attempts to rewrite administered
//! variants) are `ExamError`s. Data problems that can be recovered locally
//! are reported as `DataWarning`s alongside the result instead of aborting
//! the batch.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors that reject an operation before any computation happens.
#[derive(Debug, Error)]
pub enum ExamError {
    /// The generation request is invalid (variant count, seed, questions).
    #[error("invalid configuration: {0}")]
    InvalidConfiguration(String),

    /// Variants already have recorded results and must not change.
    #[error("variants {codes:?} of generation '{generation}' are read-only: {reason}")]
    ImmutableVariant {
        generation: String,
        codes: Vec<String>,
        reason: String,
    },

    /// A submission was scored against a variant it was not taken on.
    #[error("submission for variant '{submitted}' cannot be scored against variant '{expected}'")]
    VariantMismatch { expected: String, submitted: String },

    /// Storage encoding failed.
    #[error("serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl ExamError {
    /// Returns `true` if the error reflects bad caller input rather than stored state.
    pub fn is_input_error(&self) -> bool {
        matches!(
            self,
            ExamError::InvalidConfiguration(_) | ExamError::VariantMismatch { .. }
        )
    }
}

/// A recovered data inconsistency.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DataWarning {
    /// The question's correct answer text is not among its options; keyed as "A".
    CorrectAnswerNotFound {
        question_id: String,
        correct_answer: String,
    },
    /// A stored JSON column could not be decoded; a fallback was used.
    MalformedStoredData { field: String, detail: String },
    /// A stored permutation is not a bijection on the option indices.
    InvalidPermutation {
        question_id: String,
        permutation: Vec<usize>,
    },
    /// A submission referenced a question that is not on the variant.
    UnknownQuestion { question_id: String },
    /// More variants were requested than distinct arrangements exist.
    DuplicateVariantsPossible { requested: u8, achievable: u128 },
}

impl std::fmt::Display for DataWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DataWarning::CorrectAnswerNotFound {
                question_id,
                correct_answer,
            } => write!(
                f,
                "question '{question_id}': correct answer '{correct_answer}' not among options, keyed as A"
            ),
            DataWarning::MalformedStoredData { field, detail } => {
                write!(f, "stored {field} is malformed ({detail}), using fallback")
            }
            DataWarning::InvalidPermutation {
                question_id,
                permutation,
            } => write!(
                f,
                "question '{question_id}': stored permutation {permutation:?} is invalid, using identity"
            ),
            DataWarning::UnknownQuestion { question_id } => {
                write!(f, "question '{question_id}' is not part of this variant, ignored")
            }
            DataWarning::DuplicateVariantsPossible {
                requested,
                achievable,
            } => write!(
                f,
                "{requested} variants requested but only {achievable} distinct arrangements exist"
            ),
        }
    }
}
