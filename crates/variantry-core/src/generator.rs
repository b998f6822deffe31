//! Variant generation.
//!
//! Every variant is a pure function of the question list and the
//! `GenerationConfig`; the same seed always yields the same orders,
//! permutations and answer keys.

use std::collections::{BTreeMap, HashSet};

use serde::{Deserialize, Serialize};

use crate::error::{DataWarning, ExamError};
use crate::model::{AnswerKeyEntry, GenerationConfig, Question, StudentResponse, Variant};
use crate::prng::{invert, shuffle_with};
use crate::resolver::index_to_letter;

/// Seed discriminator for the question-order stream.
const QUESTION_ORDER_STREAM: &str = "questions";

/// Result of a generation run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationOutcome {
    /// The generation identifier (the seed).
    pub generation: String,
    /// Generated variants, numbered from 1.
    pub variants: Vec<Variant>,
    /// Number of variants produced.
    pub total_generated: usize,
    /// Distinct arrangements the config can produce (saturating).
    pub achievable_arrangements: u128,
    /// Recovered inconsistencies and feasibility notes.
    pub warnings: Vec<DataWarning>,
}

/// Generate the variants for a question list.
pub fn generate_variants(
    questions: &[Question],
    config: &GenerationConfig,
) -> Result<GenerationOutcome, ExamError> {
    config.validate()?;
    if questions.is_empty() {
        return Err(ExamError::InvalidConfiguration(
            "cannot generate variants for an exam without questions".into(),
        ));
    }
    let mut seen = HashSet::new();
    if let Some(dup) = questions.iter().find(|q| !seen.insert(q.id.as_str())) {
        return Err(ExamError::InvalidConfiguration(format!(
            "duplicate question id: {}",
            dup.id
        )));
    }

    let mut warnings = Vec::new();
    let achievable = achievable_arrangements(questions, config);
    if achievable < config.number_of_variants as u128 {
        let warning = DataWarning::DuplicateVariantsPossible {
            requested: config.number_of_variants,
            achievable,
        };
        tracing::warn!("generation '{}': {warning}", config.seed);
        warnings.push(warning);
    }

    let mut variants = Vec::with_capacity(config.number_of_variants as usize);
    for v in 0..config.number_of_variants as usize {
        variants.push(build_variant(questions, config, v, &mut warnings));
    }

    tracing::debug!(
        generation = %config.seed,
        variants = variants.len(),
        questions = questions.len(),
        "generated variants"
    );

    Ok(GenerationOutcome {
        generation: config.seed.clone(),
        total_generated: variants.len(),
        variants,
        achievable_arrangements: achievable,
        warnings,
    })
}

/// Regenerate a generation's variants, refusing if results already exist.
pub fn regenerate_variants(
    questions: &[Question],
    config: &GenerationConfig,
    existing: &[Variant],
    responses: &[StudentResponse],
) -> Result<GenerationOutcome, ExamError> {
    ensure_variants_mutable(&config.seed, existing, responses)?;
    generate_variants(questions, config)
}

/// Fail if any response was recorded against one of `existing`.
///
/// Guards both regeneration and deletion of answer keys.
pub fn ensure_variants_mutable(
    generation: &str,
    existing: &[Variant],
    responses: &[StudentResponse],
) -> Result<(), ExamError> {
    let codes: HashSet<&str> = existing.iter().map(|v| v.variant_code.as_str()).collect();
    let mut locked: Vec<String> = responses
        .iter()
        .filter(|r| codes.contains(r.variant_code.as_str()))
        .map(|r| r.variant_code.clone())
        .collect();
    locked.sort();
    locked.dedup();

    if locked.is_empty() {
        return Ok(());
    }
    Err(ExamError::ImmutableVariant {
        generation: generation.to_string(),
        reason: format!(
            "student results are recorded against {}; changing the answer keys would invalidate them",
            locked.join(", ")
        ),
        codes: locked,
    })
}

fn build_variant(
    questions: &[Question],
    config: &GenerationConfig,
    v: usize,
    warnings: &mut Vec<DataWarning>,
) -> Variant {
    let variant_index = v.to_string();
    let question_order = if config.randomize_question_order {
        shuffle_with(
            &[
                config.seed.as_str(),
                variant_index.as_str(),
                QUESTION_ORDER_STREAM,
            ],
            questions.len(),
        )
    } else {
        (0..questions.len()).collect()
    };

    let mut option_permutations = BTreeMap::new();
    let mut answer_key = Vec::with_capacity(questions.len());

    for (position, &original) in question_order.iter().enumerate() {
        let question = &questions[original];
        let option_count = question.effective_options().len();

        let permutation = if config.shuffles_options_of(question) {
            let perm = shuffle_with(
                &[
                    config.seed.as_str(),
                    variant_index.as_str(),
                    question.id.as_str(),
                ],
                option_count,
            );
            option_permutations.insert(question.id.clone(), perm.clone());
            Some(perm)
        } else {
            None
        };

        let letter = match question.correct_index() {
            Some(idx) => {
                let displayed = match &permutation {
                    Some(perm) => invert(perm)[idx],
                    None => idx,
                };
                index_to_letter(displayed)
            }
            None => {
                let warning = DataWarning::CorrectAnswerNotFound {
                    question_id: question.id.clone(),
                    correct_answer: question.correct_answer.clone(),
                };
                tracing::warn!("variant {}: {warning}", v + 1);
                if !warnings.contains(&warning) {
                    warnings.push(warning);
                }
                index_to_letter(0)
            }
        };

        answer_key.push(AnswerKeyEntry {
            question_id: question.id.clone(),
            question_number: position + 1,
            correct_answer: letter,
            original_answer: question.correct_answer.clone(),
        });
    }

    let variant_number = (v + 1) as u32;
    Variant {
        variant_number,
        variant_code: Variant::code_for(variant_number),
        question_order,
        option_permutations,
        answer_key,
    }
}

/// Number of distinct arrangements a config can produce, saturating at `u128::MAX`.
pub fn achievable_arrangements(questions: &[Question], config: &GenerationConfig) -> u128 {
    let mut total: u128 = if config.randomize_question_order {
        factorial(questions.len())
    } else {
        1
    };
    for q in questions {
        if config.shuffles_options_of(q) {
            total = total.saturating_mul(factorial(q.effective_options().len()));
        }
    }
    total
}

fn factorial(n: usize) -> u128 {
    (2..=n as u128).fold(1u128, |acc, k| acc.saturating_mul(k))
}
