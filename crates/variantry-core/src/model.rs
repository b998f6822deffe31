//! Core data model types for variantry.
//!
//! Questions and generation settings come in from the collaborator layer;
//! variants, submissions and scored responses flow between the generator,
//! the normalizer and the analysis passes.

use std::borrow::Cow;
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{DataWarning, ExamError};

/// Smallest number of variants per generation.
pub const MIN_VARIANTS: u8 = 1;
/// Largest number of variants per generation.
pub const MAX_VARIANTS: u8 = 10;

/// Options implied by a true/false question that carries none.
pub const TRUE_FALSE_OPTIONS: [&str; 2] = ["True", "False"];

/// Question type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum QuestionKind {
    MultipleChoice,
    TrueFalse,
}

impl fmt::Display for QuestionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            QuestionKind::MultipleChoice => write!(f, "MULTIPLE_CHOICE"),
            QuestionKind::TrueFalse => write!(f, "TRUE_FALSE"),
        }
    }
}

impl FromStr for QuestionKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_uppercase().replace(['-', ' '], "_").as_str() {
            "MULTIPLE_CHOICE" | "MCQ" => Ok(QuestionKind::MultipleChoice),
            "TRUE_FALSE" | "TF" => Ok(QuestionKind::TrueFalse),
            other => Err(format!("unknown question type: {other}")),
        }
    }
}

/// A single exam question as supplied by the collaborator layer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Question {
    /// Stable question identifier.
    pub id: String,
    /// Question stem.
    pub text: String,
    /// Question type.
    #[serde(rename = "type")]
    pub kind: QuestionKind,
    /// Options in their original order. Empty for implicit True/False.
    #[serde(default)]
    pub options: Vec<String>,
    /// Original correct answer text (not a letter).
    pub correct_answer: String,
    /// Points for a correct answer.
    pub points: f64,
    /// Penalty magnitude for a wrong answer, if any.
    #[serde(default)]
    pub negative_points: Option<f64>,
}

impl Question {
    /// The options this question is rendered with.
    pub fn effective_options(&self) -> Cow<'_, [String]> {
        if self.options.is_empty() && self.kind == QuestionKind::TrueFalse {
            Cow::Owned(TRUE_FALSE_OPTIONS.iter().map(|s| s.to_string()).collect())
        } else {
            Cow::Borrowed(&self.options)
        }
    }

    /// Index of the correct answer among the original options.
    ///
    /// Exact text first, then a trimmed case-insensitive comparison.
    pub fn correct_index(&self) -> Option<usize> {
        let options = self.effective_options();
        options
            .iter()
            .position(|o| o == &self.correct_answer)
            .or_else(|| {
                options
                    .iter()
                    .position(|o| option_text_eq(o, &self.correct_answer))
            })
    }
}

/// A named question set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Exam {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub questions: Vec<Question>,
}

impl Exam {
    /// Sum of the points of every question.
    pub fn max_score(&self) -> f64 {
        self.questions.iter().map(|q| q.points).sum()
    }

    pub fn question(&self, id: &str) -> Option<&Question> {
        self.questions.iter().find(|q| q.id == id)
    }
}

/// Compare two option texts the way scoring does.
pub fn option_text_eq(a: &str, b: &str) -> bool {
    a.trim().to_lowercase() == b.trim().to_lowercase()
}

/// Settings for one generation run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerationConfig {
    /// How many variants to produce (1–10).
    pub number_of_variants: u8,
    #[serde(default = "default_true")]
    pub randomize_question_order: bool,
    #[serde(default = "default_true")]
    pub randomize_option_order: bool,
    #[serde(default)]
    pub randomize_true_false_options: bool,
    /// Seed string; by convention the generation's identifier.
    pub seed: String,
}

fn default_true() -> bool {
    true
}

impl GenerationConfig {
    /// Config with the default flags for a generation id.
    pub fn new(seed: impl Into<String>, number_of_variants: u8) -> Self {
        Self {
            number_of_variants,
            randomize_question_order: true,
            randomize_option_order: true,
            randomize_true_false_options: false,
            seed: seed.into(),
        }
    }

    /// Reject configurations no generation may run with.
    pub fn validate(&self) -> Result<(), ExamError> {
        if !(MIN_VARIANTS..=MAX_VARIANTS).contains(&self.number_of_variants) {
            return Err(ExamError::InvalidConfiguration(format!(
                "number of variants must be between {MIN_VARIANTS} and {MAX_VARIANTS}, got {}",
                self.number_of_variants
            )));
        }
        if self.seed.trim().is_empty() {
            return Err(ExamError::InvalidConfiguration(
                "seed must not be empty".into(),
            ));
        }
        Ok(())
    }

    /// Whether this question's options get shuffled under this config.
    pub fn shuffles_options_of(&self, question: &Question) -> bool {
        let enabled = match question.kind {
            QuestionKind::MultipleChoice => self.randomize_option_order,
            QuestionKind::TrueFalse => self.randomize_true_false_options,
        };
        enabled && question.effective_options().len() > 1
    }
}

/// One answer-key line of a variant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnswerKeyEntry {
    pub question_id: String,
    /// 1-based position in this variant.
    pub question_number: usize,
    /// Letter code of the correct option in this variant's order.
    pub correct_answer: String,
    /// Original correct answer text.
    pub original_answer: String,
}

/// One randomized rendering of an exam.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Variant {
    /// 1-based variant number.
    pub variant_number: u32,
    /// Display label, e.g. "V1".
    pub variant_code: String,
    /// Display position -> original question index.
    pub question_order: Vec<usize>,
    /// Question id -> (display position -> original option index), for
    /// shuffled questions only.
    pub option_permutations: BTreeMap<String, Vec<usize>>,
    /// Answer key in display order.
    pub answer_key: Vec<AnswerKeyEntry>,
}

impl Variant {
    /// Display label for a variant number.
    pub fn code_for(variant_number: u32) -> String {
        format!("V{variant_number}")
    }

    /// Answer key line for a question.
    pub fn key_for(&self, question_id: &str) -> Option<&AnswerKeyEntry> {
        self.answer_key.iter().find(|e| e.question_id == question_id)
    }
}

/// A student's raw answer to one question, as written on the sheet.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawAnswer {
    pub question_id: String,
    /// Letter or code; `None` when left blank.
    #[serde(default)]
    pub answer: Option<String>,
}

/// One student's unscored submission.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawSubmission {
    pub student_id: String,
    pub variant_code: String,
    #[serde(default)]
    pub answers: Vec<RawAnswer>,
}

/// A scored response to one question.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ItemResponse {
    pub question_id: String,
    /// Letter/code as submitted.
    #[serde(default)]
    pub raw_answer: Option<String>,
    /// The original option text the raw code resolves to.
    #[serde(default)]
    pub selected_option: Option<String>,
    pub is_correct: bool,
    pub points_awarded: f64,
}

/// A student's scored submission.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StudentResponse {
    pub student_id: String,
    pub variant_code: String,
    #[serde(default)]
    pub responses: Vec<ItemResponse>,
    pub total_score: f64,
    pub max_possible_score: f64,
    /// Inconsistencies recovered while scoring this submission.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<DataWarning>,
}

impl StudentResponse {
    /// This student's response to a question, if present.
    pub fn response_to(&self, question_id: &str) -> Option<&ItemResponse> {
        self.responses.iter().find(|r| r.question_id == question_id)
    }
}
