//! Answer-key resolution from stored variant data.
//!
//! Everything here works from the persisted `answer_key` and
//! `option_permutations` alone. The seed is never consulted: once a variant
//! has been administered, the stored permutation is the contract.

use std::borrow::Cow;

use serde::{Deserialize, Serialize};

use crate::error::DataWarning;
use crate::model::{Question, Variant};
use crate::prng::is_permutation;

/// Letter code for a display position (`0 -> "A"`, `25 -> "Z"`, `26 -> "AA"`).
pub fn index_to_letter(index: usize) -> String {
    let mut n = index + 1;
    let mut out = Vec::new();
    while n > 0 {
        let rem = (n - 1) % 26;
        out.push(b'A' + rem as u8);
        n = (n - 1) / 26;
    }
    out.reverse();
    String::from_utf8(out).unwrap_or_default()
}

/// Display position for a letter code, case-insensitive.
pub fn letter_to_index(letter: &str) -> Option<usize> {
    let letter = letter.trim();
    if letter.is_empty() || !letter.chars().all(|c| c.is_ascii_alphabetic()) {
        return None;
    }
    let mut n = 0usize;
    for c in letter.to_ascii_uppercase().bytes() {
        n = n.checked_mul(26)?.checked_add((c - b'A') as usize + 1)?;
    }
    Some(n - 1)
}

/// The correct option of a question as displayed on one variant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolvedAnswer {
    pub question_id: String,
    /// Letter code on this variant.
    pub letter: String,
    /// 0-based display position.
    pub position: usize,
    /// Option text at that position.
    pub text: String,
}

/// The option permutation a variant uses for a question.
///
/// Questions without a stored permutation use the identity. A stored
/// permutation that does not fit the question's options is replaced by the
/// identity and reported.
pub fn option_permutation<'a>(
    variant: &'a Variant,
    question: &Question,
) -> (Cow<'a, [usize]>, Option<DataWarning>) {
    let option_count = question.effective_options().len();
    let identity = || Cow::Owned((0..option_count).collect::<Vec<_>>());

    match variant.option_permutations.get(&question.id) {
        None => (identity(), None),
        Some(perm) if perm.len() == option_count && is_permutation(perm) => {
            (Cow::Borrowed(perm.as_slice()), None)
        }
        Some(perm) => {
            let warning = DataWarning::InvalidPermutation {
                question_id: question.id.clone(),
                permutation: perm.clone(),
            };
            tracing::warn!("variant {}: {warning}", variant.variant_code);
            (identity(), Some(warning))
        }
    }
}

/// Options of a question in the order a variant displays them.
pub fn displayed_options(variant: &Variant, question: &Question) -> Vec<String> {
    let options = question.effective_options();
    let (perm, _) = option_permutation(variant, question);
    perm.iter().map(|&original| options[original].clone()).collect()
}

/// Original option index shown at `position` on a variant.
pub fn original_index_at(variant: &Variant, question: &Question, position: usize) -> Option<usize> {
    let (perm, _) = option_permutation(variant, question);
    perm.get(position).copied()
}

/// Resolve the correct option of `question` on `variant`.
///
/// Returns `None` if the question is not on the variant's answer key or the
/// keyed letter points outside the option list.
pub fn resolve_correct_option(variant: &Variant, question: &Question) -> Option<ResolvedAnswer> {
    let entry = variant.key_for(&question.id)?;
    let position = letter_to_index(&entry.correct_answer)?;
    let options = question.effective_options();
    let original = original_index_at(variant, question, position)?;
    let text = options.get(original)?.clone();

    Some(ResolvedAnswer {
        question_id: question.id.clone(),
        letter: entry.correct_answer.clone(),
        position,
        text,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::generator::generate_variants;
    use crate::model::{AnswerKeyEntry, GenerationConfig, QuestionKind};
    use std::collections::BTreeMap;

    fn question() -> Question {
        Question {
            id: "q1".into(),
            text: "Pick the second".into(),
            kind: QuestionKind::MultipleChoice,
            options: vec!["w".into(), "x".into(), "y".into(), "z".into()],
            correct_answer: "x".into(),
            points: 1.0,
            negative_points: None,
        }
    }

    fn variant_with(perm: Vec<usize>, letter: &str) -> Variant {
        let mut option_permutations = BTreeMap::new();
        option_permutations.insert("q1".to_string(), perm);
        Variant {
            variant_number: 1,
            variant_code: "V1".into(),
            question_order: vec![0],
            option_permutations,
            answer_key: vec![AnswerKeyEntry {
                question_id: "q1".into(),
                question_number: 1,
                correct_answer: letter.into(),
                original_answer: "x".into(),
            }],
        }
    }

    #[test]
    fn letters_round_trip() {
        assert_eq!(index_to_letter(0), "A");
        assert_eq!(index_to_letter(3), "D");
        assert_eq!(index_to_letter(25), "Z");
        assert_eq!(index_to_letter(26), "AA");
        for i in 0..60 {
            assert_eq!(letter_to_index(&index_to_letter(i)), Some(i));
        }
        assert_eq!(letter_to_index(" b "), Some(1));
        assert_eq!(letter_to_index(""), None);
        assert_eq!(letter_to_index("3"), None);
    }

    #[test]
    fn resolves_through_stored_permutation() {
        // displayed: z, x, w, y -> "x" sits at B
        let variant = variant_with(vec![3, 1, 0, 2], "B");
        let q = question();
        assert_eq!(displayed_options(&variant, &q), vec!["z", "x", "w", "y"]);
        let resolved = resolve_correct_option(&variant, &q).unwrap();
        assert_eq!(resolved.text, "x");
        assert_eq!(resolved.position, 1);
    }

    #[test]
    fn invalid_permutation_falls_back_to_identity() {
        let variant = variant_with(vec![0, 0, 1, 2], "B");
        let (perm, warning) = option_permutation(&variant, &question());
        assert_eq!(perm.as_ref(), [0, 1, 2, 3]);
        assert!(matches!(warning, Some(DataWarning::InvalidPermutation { .. })));
    }

    #[test]
    fn unknown_question_resolves_to_none() {
        let variant = variant_with(vec![0, 1, 2, 3], "B");
        let mut other = question();
        other.id = "elsewhere".into();
        assert!(resolve_correct_option(&variant, &other).is_none());
    }

    #[test]
    fn generated_keys_resolve_to_original_answers() {
        let questions = vec![
            question(),
            Question {
                id: "q2".into(),
                text: "Statement".into(),
                kind: QuestionKind::TrueFalse,
                options: vec![],
                correct_answer: "False".into(),
                points: 1.0,
                negative_points: None,
            },
        ];
        let mut config = GenerationConfig::new("resolver", 10);
        config.randomize_true_false_options = true;
        let outcome = generate_variants(&questions, &config).unwrap();
        for variant in &outcome.variants {
            for q in &questions {
                let resolved = resolve_correct_option(variant, q).unwrap();
                assert_eq!(resolved.text, q.correct_answer);
            }
        }
    }
}
