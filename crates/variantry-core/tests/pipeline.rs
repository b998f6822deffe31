//! End-to-end tests: exam file -> variants -> submissions -> scores -> analysis.

use std::path::Path;

use variantry_core::analysis::{analyze, analyze_by_variant, AnalysisOptions};
use variantry_core::generator::{generate_variants, regenerate_variants};
use variantry_core::integrity::{analyze_integrity, IntegrityOptions};
use variantry_core::model::{Exam, GenerationConfig, RawAnswer, RawSubmission, Variant};
use variantry_core::normalizer::{score_all, score_submission};
use variantry_core::parser::parse_exam_str;
use variantry_core::percentile::{filter_by_percentile, PercentileRange};
use variantry_core::resolver::{displayed_options, index_to_letter};

const EXAM: &str = r#"
[exam]
id = "midterm"
name = "Midterm"

[[questions]]
id = "q1"
text = "Which letter comes second?"
options = ["A", "B", "C", "D"]
correct_answer = "B"

[[questions]]
id = "q2"
text = "Largest planet?"
options = ["Mars", "Venus", "Jupiter", "Mercury"]
correct_answer = "Jupiter"

[[questions]]
id = "q3"
text = "2 + 2 = 4"
type = "true_false"
correct_answer = "True"

[[questions]]
id = "q4"
text = "Primary colour?"
options = ["Green", "Red", "Purple"]
correct_answer = "Red"
"#;

fn exam() -> Exam {
    parse_exam_str(EXAM, Path::new("midterm.toml")).unwrap()
}

/// A sheet answering every question, correctly for the ids in `right`.
fn sheet(student: &str, variant: &Variant, right: &[&str]) -> RawSubmission {
    let answers = variant
        .answer_key
        .iter()
        .map(|entry| {
            let letter = if right.contains(&entry.question_id.as_str()) {
                entry.correct_answer.clone()
            } else if entry.correct_answer == "A" {
                "B".to_string()
            } else {
                "A".to_string()
            };
            RawAnswer {
                question_id: entry.question_id.clone(),
                answer: Some(letter),
            }
        })
        .collect();
    RawSubmission {
        student_id: student.into(),
        variant_code: variant.variant_code.clone(),
        answers,
    }
}

#[test]
fn generation_is_deterministic_and_keeps_original_answers() {
    let exam = exam();
    let config = GenerationConfig::new("gen-1", 3);
    let first = generate_variants(&exam.questions, &config).unwrap();
    let second = generate_variants(&exam.questions, &config).unwrap();

    assert_eq!(first.variants, second.variants);
    assert_eq!(first.total_generated, 3);
    for variant in &first.variants {
        let key = variant.key_for("q1").unwrap();
        assert_eq!(key.original_answer, "B");
        let q1 = exam.question("q1").unwrap();
        let shown = displayed_options(variant, q1);
        let pos = shown.iter().position(|o| o == "B").unwrap();
        assert_eq!(key.correct_answer, index_to_letter(pos));
    }
}

#[test]
fn gen_1_answer_keys_are_pinned() {
    let exam = exam();
    let outcome = generate_variants(&exam.questions, &GenerationConfig::new("gen-1", 3)).unwrap();

    let expected: [(&[usize], &[(&str, &str)]); 3] = [
        (&[3, 0, 2, 1], &[("q4", "A"), ("q1", "B"), ("q3", "A"), ("q2", "D")]),
        (&[2, 0, 3, 1], &[("q3", "A"), ("q1", "A"), ("q4", "C"), ("q2", "C")]),
        (&[2, 0, 1, 3], &[("q3", "A"), ("q1", "C"), ("q2", "B"), ("q4", "B")]),
    ];
    for (variant, (order, key)) in outcome.variants.iter().zip(expected) {
        assert_eq!(variant.question_order, order, "{}", variant.variant_code);
        let letters: Vec<(&str, &str)> = variant
            .answer_key
            .iter()
            .map(|e| (e.question_id.as_str(), e.correct_answer.as_str()))
            .collect();
        assert_eq!(letters, key, "{}", variant.variant_code);
    }
}

#[test]
fn every_displayed_letter_maps_back_to_its_option() {
    let exam = exam();
    let outcome =
        generate_variants(&exam.questions, &GenerationConfig::new("round-trip", 5)).unwrap();

    for variant in &outcome.variants {
        for question in &exam.questions {
            for (pos, text) in displayed_options(variant, question).iter().enumerate() {
                let submission = RawSubmission {
                    student_id: "s".into(),
                    variant_code: variant.variant_code.clone(),
                    answers: vec![RawAnswer {
                        question_id: question.id.clone(),
                        answer: Some(index_to_letter(pos)),
                    }],
                };
                let scored = score_submission(variant, &exam.questions, &submission).unwrap();
                let item = scored.response_to(&question.id).unwrap();
                assert_eq!(item.selected_option.as_deref(), Some(text.as_str()));
                assert_eq!(item.is_correct, *text == question.correct_answer);
            }
        }
    }
}

#[test]
fn stored_records_score_like_the_originals() {
    let exam = exam();
    let outcome = generate_variants(&exam.questions, &GenerationConfig::new("records", 3)).unwrap();

    for variant in &outcome.variants {
        let (restored, warnings) = Variant::from_record(&variant.to_record().unwrap());
        assert!(warnings.is_empty());
        let submission = sheet("s1", variant, &["q1", "q3"]);
        assert_eq!(
            score_submission(variant, &exam.questions, &submission).unwrap(),
            score_submission(&restored, &exam.questions, &submission).unwrap()
        );
    }
}

#[test]
fn top_three_of_ten_correct_discriminates() {
    let exam = exam();
    let outcome = generate_variants(&exam.questions, &GenerationConfig::new("gen-1", 3)).unwrap();
    let all = ["q1", "q2", "q3", "q4"];

    let submissions: Vec<RawSubmission> = (0..10)
        .map(|s| {
            let variant = &outcome.variants[s % 3];
            let right: &[&str] = if s < 3 { &all } else { &[] };
            sheet(&format!("s{s}"), variant, right)
        })
        .collect();
    let scored = score_all(&outcome.variants, &exam.questions, &submissions);
    assert_eq!(scored.len(), 10);

    let result = analyze(&exam.questions, &scored, &AnalysisOptions::default());
    let q1 = result.item("q1").unwrap();
    assert_eq!(q1.difficulty_index, Some(0.3));
    assert!(q1.discrimination_index.unwrap() > 0.0);
    assert!(q1.is_reliable);

    let by_variant = analyze_by_variant(
        &outcome.variants,
        &exam.questions,
        &scored,
        &AnalysisOptions::default(),
    );
    assert_eq!(by_variant.len(), 3);
    let pooled: usize = by_variant.values().map(|r| r.summary.sample_size).sum();
    assert_eq!(pooled, 10);

    let top = filter_by_percentile(&scored, PercentileRange::new(75.0, 100.0).unwrap()).unwrap();
    assert_eq!(top.len(), 3);
    assert!(top.iter().all(|s| s.rank == 1));
}

#[test]
fn regeneration_is_refused_once_results_exist() {
    let exam = exam();
    let config = GenerationConfig::new("gen-locked", 2);
    let outcome = generate_variants(&exam.questions, &config).unwrap();
    let scored = score_all(
        &outcome.variants,
        &exam.questions,
        &[sheet("s1", &outcome.variants[1], &["q1"])],
    );

    let err = regenerate_variants(&exam.questions, &config, &outcome.variants, &scored)
        .unwrap_err();
    assert!(err.to_string().contains("V2"));
    assert!(regenerate_variants(&exam.questions, &config, &outcome.variants, &[]).is_ok());
}

#[test]
fn letters_copied_from_another_variant_are_caught() {
    let exam = exam();
    let mut config = GenerationConfig::new("leak", 2);
    config.randomize_true_false_options = true;
    let outcome = generate_variants(&exam.questions, &config).unwrap();
    let (own, other) = (&outcome.variants[0], &outcome.variants[1]);

    // Sits V1 but writes V2's key letter for letter.
    let answers = other
        .answer_key
        .iter()
        .map(|e| RawAnswer {
            question_id: e.question_id.clone(),
            answer: Some(e.correct_answer.clone()),
        })
        .collect();
    let submission = RawSubmission {
        student_id: "leaker".into(),
        variant_code: own.variant_code.clone(),
        answers,
    };
    let scored = score_all(&outcome.variants, &exam.questions, &[submission]);

    let own_matches = own
        .answer_key
        .iter()
        .filter(|e| other.key_for(&e.question_id).unwrap().correct_answer == e.correct_answer)
        .count();
    let options = IntegrityOptions {
        min_shared_items: 4,
        ..IntegrityOptions::default()
    };
    let report = analyze_integrity(&outcome.variants, &scored, &options);
    if own_matches < own.answer_key.len() {
        assert_eq!(report.key_flags.len(), 1);
        assert_eq!(report.key_flags[0].matched_variant, other.variant_code);
    } else {
        assert!(report.key_flags.is_empty());
    }
}
