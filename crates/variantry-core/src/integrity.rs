//! Response-integrity screening.
//!
//! Everything here is advisory: the report lists patterns that are unlikely
//! under independent work so a person can review them. Nothing is acted on
//! automatically.
//!
//! Comparisons use original option text, so two students on different
//! variants who picked the same underlying option count as matching even
//! though they wrote different letters.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::model::{StudentResponse, Variant};

/// Thresholds for the integrity checks.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IntegrityOptions {
    /// z-score of identical wrong answers above chance needed to flag a pair.
    pub z_threshold: f64,
    /// Minimum identical wrong answers for a pair flag.
    pub min_identical_incorrect: usize,
    /// Share of answers matching another variant's key needed to flag a student.
    pub key_match_threshold: f64,
    /// Items a comparison needs before it is considered at all.
    pub min_shared_items: usize,
}

impl Default for IntegrityOptions {
    fn default() -> Self {
        Self {
            z_threshold: 3.0,
            min_identical_incorrect: 3,
            key_match_threshold: 0.8,
            min_shared_items: 5,
        }
    }
}

/// Two students whose answers agree more than chance allows.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimilarityFlag {
    pub student_a: String,
    pub student_b: String,
    pub variant_a: String,
    pub variant_b: String,
    /// Items both students answered.
    pub shared_items: usize,
    /// Items where both picked the same option.
    pub identical_answers: usize,
    /// Items where both picked the same wrong option.
    pub identical_incorrect: usize,
    /// Chance expectation of `identical_incorrect`.
    pub expected_identical_incorrect: f64,
    pub z_score: f64,
    /// `identical_answers / shared_items`.
    pub similarity: f64,
    pub detail: String,
}

/// A student whose letters fit another variant's key better than their own.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KeyLeakFlag {
    pub student_id: String,
    pub own_variant: String,
    pub matched_variant: String,
    pub own_key_match_rate: f64,
    pub matched_key_match_rate: f64,
    pub detail: String,
}

/// Two variants that render identically.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DuplicateVariants {
    pub first: String,
    pub second: String,
}

/// Result of an integrity pass.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IntegrityReport {
    pub students_analyzed: usize,
    pub pairs_compared: usize,
    pub similarity_flags: Vec<SimilarityFlag>,
    pub key_flags: Vec<KeyLeakFlag>,
    pub duplicate_variants: Vec<DuplicateVariants>,
}

impl IntegrityReport {
    /// Returns true if nothing needs review.
    pub fn is_clean(&self) -> bool {
        self.similarity_flags.is_empty()
            && self.key_flags.is_empty()
            && self.duplicate_variants.is_empty()
    }
}

/// Screen a generation's responses.
pub fn analyze_integrity(
    variants: &[Variant],
    responses: &[StudentResponse],
    options: &IntegrityOptions,
) -> IntegrityReport {
    let wrong_match_odds = wrong_answer_match_odds(responses);

    let mut similarity_flags = Vec::new();
    let mut pairs_compared = 0usize;
    for (i, a) in responses.iter().enumerate() {
        for b in &responses[i + 1..] {
            let Some(flag) = compare_pair(a, b, &wrong_match_odds, options) else {
                continue;
            };
            pairs_compared += 1;
            if flag.identical_incorrect >= options.min_identical_incorrect
                && flag.z_score >= options.z_threshold
            {
                tracing::info!(
                    "students {} and {} share {} identical wrong answers (z = {:.2})",
                    flag.student_a,
                    flag.student_b,
                    flag.identical_incorrect,
                    flag.z_score
                );
                similarity_flags.push(flag);
            }
        }
    }
    similarity_flags.sort_by(|a, b| b.z_score.total_cmp(&a.z_score));

    let key_flags = responses
        .iter()
        .filter_map(|r| check_key_leak(r, variants, options))
        .collect();

    IntegrityReport {
        students_analyzed: responses.len(),
        pairs_compared,
        similarity_flags,
        key_flags,
        duplicate_variants: find_duplicate_variants(variants),
    }
}

fn normalized(option: &str) -> String {
    option.trim().to_lowercase()
}

/// Per question, the chance that two independent wrong answers coincide:
/// the sum of squared shares of each wrong option among all wrong answers.
fn wrong_answer_match_odds(responses: &[StudentResponse]) -> HashMap<String, f64> {
    let mut counts: HashMap<&str, HashMap<String, usize>> = HashMap::new();
    for student in responses {
        for r in &student.responses {
            if r.is_correct {
                continue;
            }
            if let Some(selected) = &r.selected_option {
                *counts
                    .entry(r.question_id.as_str())
                    .or_default()
                    .entry(normalized(selected))
                    .or_default() += 1;
            }
        }
    }

    counts
        .into_iter()
        .map(|(qid, per_option)| {
            let total: usize = per_option.values().sum();
            let odds = per_option
                .values()
                .map(|&c| (c as f64 / total as f64).powi(2))
                .sum();
            (qid.to_string(), odds)
        })
        .collect()
}

fn compare_pair(
    a: &StudentResponse,
    b: &StudentResponse,
    wrong_match_odds: &HashMap<String, f64>,
    options: &IntegrityOptions,
) -> Option<SimilarityFlag> {
    let mut shared_items = 0usize;
    let mut identical_answers = 0usize;
    let mut identical_incorrect = 0usize;
    let mut expected = 0.0;
    let mut variance = 0.0;

    for ra in &a.responses {
        let Some(rb) = b.response_to(&ra.question_id) else {
            continue;
        };
        let (Some(sa), Some(sb)) = (&ra.selected_option, &rb.selected_option) else {
            continue;
        };
        shared_items += 1;
        let same = normalized(sa) == normalized(sb);
        if same {
            identical_answers += 1;
        }
        if !ra.is_correct && !rb.is_correct {
            let p = wrong_match_odds
                .get(&ra.question_id)
                .copied()
                .unwrap_or(0.0);
            expected += p;
            variance += p * (1.0 - p);
            if same {
                identical_incorrect += 1;
            }
        }
    }

    if shared_items < options.min_shared_items {
        return None;
    }

    let z_score = if variance > f64::EPSILON {
        (identical_incorrect as f64 - expected) / variance.sqrt()
    } else {
        0.0
    };
    let similarity = identical_answers as f64 / shared_items as f64;

    Some(SimilarityFlag {
        student_a: a.student_id.clone(),
        student_b: b.student_id.clone(),
        variant_a: a.variant_code.clone(),
        variant_b: b.variant_code.clone(),
        shared_items,
        identical_answers,
        identical_incorrect,
        expected_identical_incorrect: expected,
        z_score,
        similarity,
        detail: format!(
            "{identical_incorrect} identical incorrect answers where {expected:.2} would be expected by chance; {:.0}% of {shared_items} shared answers identical",
            similarity * 100.0
        ),
    })
}

fn key_match_rate(student: &StudentResponse, variant: &Variant) -> Option<(f64, usize)> {
    let mut answered = 0usize;
    let mut matched = 0usize;
    for r in &student.responses {
        let Some(raw) = r.raw_answer.as_deref() else {
            continue;
        };
        let Some(entry) = variant.key_for(&r.question_id) else {
            continue;
        };
        answered += 1;
        if raw.trim().eq_ignore_ascii_case(&entry.correct_answer) {
            matched += 1;
        }
    }
    (answered > 0).then(|| (matched as f64 / answered as f64, answered))
}

fn check_key_leak(
    student: &StudentResponse,
    variants: &[Variant],
    options: &IntegrityOptions,
) -> Option<KeyLeakFlag> {
    let own = variants
        .iter()
        .find(|v| v.variant_code == student.variant_code)?;
    let (own_rate, answered) = key_match_rate(student, own)?;
    if answered < options.min_shared_items {
        return None;
    }

    let (best, best_rate) = variants
        .iter()
        .filter(|v| v.variant_code != student.variant_code)
        .filter_map(|v| key_match_rate(student, v).map(|(rate, _)| (v, rate)))
        .max_by(|a, b| a.1.total_cmp(&b.1))?;

    if best_rate < options.key_match_threshold || best_rate <= own_rate {
        return None;
    }

    tracing::info!(
        "student {} on {} matches the {} key at {:.0}%",
        student.student_id,
        student.variant_code,
        best.variant_code,
        best_rate * 100.0
    );

    Some(KeyLeakFlag {
        student_id: student.student_id.clone(),
        own_variant: student.variant_code.clone(),
        matched_variant: best.variant_code.clone(),
        own_key_match_rate: own_rate,
        matched_key_match_rate: best_rate,
        detail: format!(
            "letters match the {} answer key on {:.0}% of items but their own {} key on only {:.0}%",
            best.variant_code,
            best_rate * 100.0,
            student.variant_code,
            own_rate * 100.0
        ),
    })
}

fn find_duplicate_variants(variants: &[Variant]) -> Vec<DuplicateVariants> {
    let mut duplicates = Vec::new();
    for (i, a) in variants.iter().enumerate() {
        for b in &variants[i + 1..] {
            if a.question_order == b.question_order
                && a.option_permutations == b.option_permutations
            {
                duplicates.push(DuplicateVariants {
                    first: a.variant_code.clone(),
                    second: b.variant_code.clone(),
                });
            }
        }
    }
    duplicates
}
