//! Response normalization: turns variant-relative letter answers into
//! original-option answers and scores them.
//!
//! Letters mean different things on different variants, so every comparison
//! happens on option text.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::error::{DataWarning, ExamError};
use crate::model::{
    option_text_eq, ItemResponse, Question, QuestionKind, RawSubmission, StudentResponse, Variant,
};
use crate::resolver::{letter_to_index, original_index_at, resolve_correct_option};

/// One scored, variant-independent response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NormalizedResponse {
    pub question_id: String,
    /// 1-based position on the student's variant.
    pub question_number: usize,
    /// Letter/code as submitted.
    pub raw_answer: Option<String>,
    /// Original option text the answer resolves to.
    pub selected_option: Option<String>,
    /// Original correct option text.
    pub correct_option: String,
    pub is_correct: bool,
    pub points_awarded: f64,
    pub max_points: f64,
}

impl NormalizedResponse {
    fn to_item(&self) -> ItemResponse {
        ItemResponse {
            question_id: self.question_id.clone(),
            raw_answer: self.raw_answer.clone(),
            selected_option: self.selected_option.clone(),
            is_correct: self.is_correct,
            points_awarded: self.points_awarded,
        }
    }
}

/// Normalize every answer-key question of `variant` for one submission.
///
/// Questions the student skipped are reported unanswered with zero points.
/// Answers to questions that are not on the variant are dropped and
/// returned as warnings.
pub fn normalize_responses(
    variant: &Variant,
    questions: &[Question],
    submission: &RawSubmission,
) -> Result<(Vec<NormalizedResponse>, Vec<DataWarning>), ExamError> {
    if submission.variant_code != variant.variant_code {
        return Err(ExamError::VariantMismatch {
            expected: variant.variant_code.clone(),
            submitted: submission.variant_code.clone(),
        });
    }

    let by_id: HashMap<&str, &Question> = questions.iter().map(|q| (q.id.as_str(), q)).collect();
    let answers: HashMap<&str, Option<&str>> = submission
        .answers
        .iter()
        .map(|a| (a.question_id.as_str(), a.answer.as_deref()))
        .collect();

    let mut warnings = Vec::new();
    for answer in &submission.answers {
        if variant.key_for(&answer.question_id).is_none() {
            let warning = DataWarning::UnknownQuestion {
                question_id: answer.question_id.clone(),
            };
            tracing::warn!("student {}: {warning}", submission.student_id);
            warnings.push(warning);
        }
    }

    let mut normalized = Vec::with_capacity(variant.answer_key.len());
    for entry in &variant.answer_key {
        let Some(question) = by_id.get(entry.question_id.as_str()) else {
            let warning = DataWarning::UnknownQuestion {
                question_id: entry.question_id.clone(),
            };
            tracing::warn!("variant {}: answer key references {warning}", variant.variant_code);
            warnings.push(warning);
            continue;
        };

        let correct_option = resolve_correct_option(variant, question)
            .map(|r| r.text)
            .unwrap_or_else(|| entry.original_answer.clone());

        let raw_answer = answers
            .get(entry.question_id.as_str())
            .copied()
            .flatten()
            .map(str::trim)
            .filter(|a| !a.is_empty());

        let selected_option = raw_answer.and_then(|raw| decode_answer(variant, question, raw));
        let is_correct = selected_option
            .as_deref()
            .is_some_and(|selected| option_text_eq(selected, &correct_option));

        let points_awarded = if is_correct {
            question.points
        } else if raw_answer.is_some() {
            question.negative_points.map(|p| -p.abs()).unwrap_or(0.0)
        } else {
            0.0
        };

        normalized.push(NormalizedResponse {
            question_id: entry.question_id.clone(),
            question_number: entry.question_number,
            raw_answer: raw_answer.map(str::to_string),
            selected_option,
            correct_option,
            is_correct,
            points_awarded,
            max_points: question.points,
        });
    }

    Ok((normalized, warnings))
}

/// Normalize and total a submission into a `StudentResponse`.
pub fn score_submission(
    variant: &Variant,
    questions: &[Question],
    submission: &RawSubmission,
) -> Result<StudentResponse, ExamError> {
    let (normalized, warnings) = normalize_responses(variant, questions, submission)?;
    let total_score = normalized.iter().map(|r| r.points_awarded).sum();
    let max_possible_score = normalized.iter().map(|r| r.max_points).sum();

    Ok(StudentResponse {
        student_id: submission.student_id.clone(),
        variant_code: submission.variant_code.clone(),
        responses: normalized.iter().map(NormalizedResponse::to_item).collect(),
        total_score,
        max_possible_score,
        warnings,
    })
}

/// Score a batch of submissions against their variants.
///
/// Submissions for unknown variant codes are skipped with a warning so one
/// bad sheet does not discard the batch.
pub fn score_all(
    variants: &[Variant],
    questions: &[Question],
    submissions: &[RawSubmission],
) -> Vec<StudentResponse> {
    let by_code: HashMap<&str, &Variant> = variants
        .iter()
        .map(|v| (v.variant_code.as_str(), v))
        .collect();

    submissions
        .iter()
        .filter_map(|submission| {
            let Some(variant) = by_code.get(submission.variant_code.as_str()) else {
                tracing::warn!(
                    "student {}: unknown variant '{}', submission skipped",
                    submission.student_id,
                    submission.variant_code
                );
                return None;
            };
            score_submission(variant, questions, submission)
                .map_err(|e| {
                    tracing::warn!("student {}: {e}, submission skipped", submission.student_id)
                })
                .ok()
        })
        .collect()
}

/// Map a raw letter/code to the original option text it denotes on `variant`.
fn decode_answer(variant: &Variant, question: &Question, raw: &str) -> Option<String> {
    let options = question.effective_options();

    if question.kind == QuestionKind::TrueFalse {
        let literal = match raw.to_ascii_lowercase().as_str() {
            "true" | "t" => Some("True"),
            "false" | "f" => Some("False"),
            _ => None,
        };
        if let Some(literal) = literal {
            return options
                .iter()
                .find(|o| option_text_eq(o, literal))
                .cloned();
        }
    }

    let position = letter_to_index(raw)?;
    let original = original_index_at(variant, question, position)?;
    options.get(original).cloned()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::generator::generate_variants;
    use crate::model::{GenerationConfig, RawAnswer};
    use crate::resolver::displayed_options;

    fn questions() -> Vec<Question> {
        vec![
            Question {
                id: "q1".into(),
                text: "Capital of France".into(),
                kind: QuestionKind::MultipleChoice,
                options: vec!["Berlin".into(), "Paris".into(), "Rome".into(), "Madrid".into()],
                correct_answer: "Paris".into(),
                points: 2.0,
                negative_points: Some(0.5),
            },
            Question {
                id: "q2".into(),
                text: "Water is wet".into(),
                kind: QuestionKind::TrueFalse,
                options: vec![],
                correct_answer: "True".into(),
                points: 1.0,
                negative_points: None,
            },
        ]
    }

    fn submission(code: &str, answers: &[(&str, Option<&str>)]) -> RawSubmission {
        RawSubmission {
            student_id: "s1".into(),
            variant_code: code.into(),
            answers: answers
                .iter()
                .map(|(q, a)| RawAnswer {
                    question_id: q.to_string(),
                    answer: a.map(str::to_string),
                })
                .collect(),
        }
    }

    fn variants() -> Vec<Variant> {
        let mut config = GenerationConfig::new("normalizer", 4);
        config.randomize_true_false_options = true;
        generate_variants(&questions(), &config).unwrap().variants
    }

    #[test]
    fn keyed_letters_score_full_marks_on_every_variant() {
        let qs = questions();
        for variant in variants() {
            let answers: Vec<(&str, Option<&str>)> = variant
                .answer_key
                .iter()
                .map(|e| (e.question_id.as_str(), Some(e.correct_answer.as_str())))
                .collect();
            let scored =
                score_submission(&variant, &qs, &submission(&variant.variant_code, &answers))
                    .unwrap();
            assert_eq!(scored.total_score, 3.0);
            assert_eq!(scored.max_possible_score, 3.0);
            assert!(scored.responses.iter().all(|r| r.is_correct));
        }
    }

    #[test]
    fn letters_map_through_display_order() {
        let qs = questions();
        for variant in variants() {
            let shown = displayed_options(&variant, &qs[0]);
            for (pos, text) in shown.iter().enumerate() {
                let letter = crate::resolver::index_to_letter(pos);
                let (normalized, _) = normalize_responses(
                    &variant,
                    &qs,
                    &submission(&variant.variant_code, &[("q1", Some(letter.as_str()))]),
                )
                .unwrap();
                let r = normalized.iter().find(|r| r.question_id == "q1").unwrap();
                assert_eq!(r.selected_option.as_deref(), Some(text.as_str()));
                assert_eq!(r.is_correct, text == "Paris");
            }
        }
    }

    #[test]
    fn wrong_answer_applies_negative_points() {
        let qs = questions();
        let variant = &variants()[0];
        let key = variant.key_for("q1").unwrap();
        let wrong = if key.correct_answer == "A" { "B" } else { "A" };
        let scored = score_submission(
            variant,
            &qs,
            &submission(&variant.variant_code, &[("q1", Some(wrong))]),
        )
        .unwrap();
        let q1 = scored.response_to("q1").unwrap();
        assert!(!q1.is_correct);
        assert_eq!(q1.points_awarded, -0.5);
        // q2 left blank: zero, not penalized
        let q2 = scored.response_to("q2").unwrap();
        assert_eq!(q2.raw_answer, None);
        assert_eq!(q2.points_awarded, 0.0);
    }

    #[test]
    fn true_false_accepts_literal_codes() {
        let qs = questions();
        for variant in variants() {
            for code in ["True", "t", "TRUE"] {
                let (normalized, _) = normalize_responses(
                    &variant,
                    &qs,
                    &submission(&variant.variant_code, &[("q2", Some(code))]),
                )
                .unwrap();
                let r = normalized.iter().find(|r| r.question_id == "q2").unwrap();
                assert!(r.is_correct, "code {code} on {}", variant.variant_code);
            }
        }
    }

    #[test]
    fn out_of_range_letter_is_incorrect() {
        let qs = questions();
        let variant = &variants()[0];
        let (normalized, _) = normalize_responses(
            variant,
            &qs,
            &submission(&variant.variant_code, &[("q1", Some("H"))]),
        )
        .unwrap();
        let r = normalized.iter().find(|r| r.question_id == "q1").unwrap();
        assert_eq!(r.selected_option, None);
        assert!(!r.is_correct);
        assert_eq!(r.points_awarded, -0.5);
    }

    #[test]
    fn unknown_questions_are_reported_not_fatal() {
        let qs = questions();
        let variant = &variants()[0];
        let (normalized, warnings) = normalize_responses(
            variant,
            &qs,
            &submission(&variant.variant_code, &[("q99", Some("A"))]),
        )
        .unwrap();
        assert_eq!(normalized.len(), 2);
        assert_eq!(warnings.len(), 1);
    }

    #[test]
    fn scored_submission_keeps_warnings() {
        let qs = questions();
        let variant = &variants()[0];
        let scored = score_submission(
            variant,
            &qs,
            &submission(&variant.variant_code, &[("q99", Some("A"))]),
        )
        .unwrap();
        assert_eq!(
            scored.warnings,
            vec![DataWarning::UnknownQuestion {
                question_id: "q99".into()
            }]
        );

        let json = serde_json::to_string(&scored).unwrap();
        let back: StudentResponse = serde_json::from_str(&json).unwrap();
        assert_eq!(back.warnings.len(), 1);
    }

    #[test]
    fn variant_mismatch_is_rejected() {
        let qs = questions();
        let variant = &variants()[0];
        let err = normalize_responses(variant, &qs, &submission("V9", &[])).unwrap_err();
        assert!(matches!(err, ExamError::VariantMismatch { .. }));
    }

    #[test]
    fn score_all_skips_unknown_variants() {
        let qs = questions();
        let vs = variants();
        let subs = vec![submission("V1", &[]), submission("V42", &[])];
        let scored = score_all(&vs, &qs, &subs);
        assert_eq!(scored.len(), 1);
        assert_eq!(scored[0].variant_code, "V1");
    }
}
