//! CSV exports with fixed headers.

use std::path::Path;

use anyhow::{Context, Result};
use serde::Serialize;

use variantry_core::analysis::AnalysisResult;
use variantry_core::model::Variant;
use variantry_core::percentile::StudentScore;

pub const ITEM_STATISTICS_HEADER: &str = "question_id,type,difficulty_index,discrimination_index,point_biserial,correct_count,total_count,omitted_count,is_reliable,is_significant,flags";
pub const DISTRACTORS_HEADER: &str =
    "question_id,option,is_correct,count,rate,upper_count,lower_count,is_functional";
pub const STUDENT_SCORES_HEADER: &str =
    "student_id,variant_code,total_score,max_possible_score,percentage,rank,percentile";
pub const ANSWER_KEY_HEADER: &str =
    "variant_code,question_number,question_id,correct_answer,original_answer";

/// Quote a field if it contains a delimiter, quote or line break.
fn escape(field: &str) -> String {
    if field.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", field.replace('"', "\"\""))
    } else {
        field.to_string()
    }
}

fn opt(value: Option<f64>) -> String {
    value.map(|v| format!("{v:.4}")).unwrap_or_default()
}

/// The serialized name of a unit enum value, e.g. `too_easy`.
fn label<T: Serialize>(value: &T) -> String {
    serde_json::to_value(value)
        .ok()
        .and_then(|v| v.as_str().map(str::to_string))
        .unwrap_or_default()
}

fn row(fields: &[String]) -> String {
    let escaped: Vec<String> = fields.iter().map(|f| escape(f)).collect();
    let mut line = escaped.join(",");
    line.push('\n');
    line
}

/// One row per item.
pub fn item_statistics_csv(result: &AnalysisResult) -> String {
    let mut out = format!("{ITEM_STATISTICS_HEADER}\n");
    for item in &result.items {
        let flags: Vec<String> = item.flags.iter().map(label).collect();
        out.push_str(&row(&[
            item.question_id.clone(),
            item.kind.to_string(),
            opt(item.difficulty_index),
            opt(item.discrimination_index),
            opt(item.point_biserial),
            item.correct_count.to_string(),
            item.total_count.to_string(),
            item.omitted_count.to_string(),
            item.is_reliable.to_string(),
            item.is_significant.to_string(),
            flags.join(";"),
        ]));
    }
    out
}

/// One row per (item, option).
pub fn distractors_csv(result: &AnalysisResult) -> String {
    let mut out = format!("{DISTRACTORS_HEADER}\n");
    for item in &result.items {
        for d in &item.distractors {
            out.push_str(&row(&[
                item.question_id.clone(),
                d.option.clone(),
                d.is_correct.to_string(),
                d.count.to_string(),
                format!("{:.4}", d.rate),
                d.upper_count.to_string(),
                d.lower_count.to_string(),
                d.is_functional.to_string(),
            ]));
        }
    }
    out
}

pub fn student_scores_csv(scores: &[StudentScore]) -> String {
    let mut out = format!("{STUDENT_SCORES_HEADER}\n");
    for s in scores {
        out.push_str(&row(&[
            s.student_id.clone(),
            s.variant_code.clone(),
            s.total_score.to_string(),
            s.max_possible_score.to_string(),
            format!("{:.2}", s.percentage),
            s.rank.to_string(),
            format!("{:.2}", s.percentile),
        ]));
    }
    out
}

/// Answer keys of every variant, in display order.
pub fn answer_key_csv(variants: &[Variant]) -> String {
    let mut out = format!("{ANSWER_KEY_HEADER}\n");
    for v in variants {
        for entry in &v.answer_key {
            out.push_str(&row(&[
                v.variant_code.clone(),
                entry.question_number.to_string(),
                entry.question_id.clone(),
                entry.correct_answer.clone(),
                entry.original_answer.clone(),
            ]));
        }
    }
    out
}

/// Write CSV content to a file, creating parent directories.
pub fn write_csv(content: &str, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, content)
        .with_context(|| format!("failed to write CSV to {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use variantry_core::analysis::{analyze, AnalysisOptions, ItemFlag};
    use variantry_core::model::{
        AnswerKeyEntry, ItemResponse, Question, QuestionKind, StudentResponse,
    };
    use std::collections::BTreeMap;

    fn result() -> AnalysisResult {
        let question = Question {
            id: "q1".into(),
            text: "Pick".into(),
            kind: QuestionKind::MultipleChoice,
            options: vec!["yes".into(), "no, never".into()],
            correct_answer: "yes".into(),
            points: 1.0,
            negative_points: None,
        };
        let responses: Vec<StudentResponse> = (0..4)
            .map(|s| {
                let ok = s < 3;
                StudentResponse {
                    student_id: format!("s{s}"),
                    variant_code: "V1".into(),
                    responses: vec![ItemResponse {
                        question_id: "q1".into(),
                        raw_answer: Some("A".into()),
                        selected_option: Some(if ok { "yes" } else { "no, never" }.into()),
                        is_correct: ok,
                        points_awarded: if ok { 1.0 } else { 0.0 },
                    }],
                    total_score: if ok { 1.0 } else { 0.0 },
                    max_possible_score: 1.0,
                    warnings: Vec::new(),
                }
            })
            .collect();
        analyze(&[question], &responses, &AnalysisOptions::default())
    }

    #[test]
    fn escape_quotes_only_when_needed() {
        assert_eq!(escape("plain"), "plain");
        assert_eq!(escape("a,b"), "\"a,b\"");
        assert_eq!(escape("say \"hi\""), "\"say \"\"hi\"\"\"");
        assert_eq!(escape("two\nlines"), "\"two\nlines\"");
    }

    #[test]
    fn flag_labels_use_serialized_names() {
        assert_eq!(label(&ItemFlag::TooEasy), "too_easy");
        assert_eq!(label(&ItemFlag::InsufficientSample), "insufficient_sample");
    }

    #[test]
    fn item_csv_has_stable_header_and_rows() {
        let csv = item_statistics_csv(&result());
        let mut lines = csv.lines();
        assert_eq!(lines.next(), Some(ITEM_STATISTICS_HEADER));
        let row = lines.next().unwrap();
        assert!(row.starts_with("q1,MULTIPLE_CHOICE,0.7500,"));
        assert!(row.contains("insufficient_sample"));
        assert_eq!(lines.next(), None);
    }

    #[test]
    fn distractor_csv_escapes_option_text() {
        let csv = distractors_csv(&result());
        assert!(csv.starts_with(DISTRACTORS_HEADER));
        assert!(csv.contains("q1,\"no, never\",false,1,0.2500,"));
    }

    #[test]
    fn answer_key_rows_follow_display_order() {
        let variant = Variant {
            variant_number: 2,
            variant_code: "V2".into(),
            question_order: vec![1, 0],
            option_permutations: BTreeMap::new(),
            answer_key: vec![
                AnswerKeyEntry {
                    question_id: "q2".into(),
                    question_number: 1,
                    correct_answer: "C".into(),
                    original_answer: "Paris".into(),
                },
                AnswerKeyEntry {
                    question_id: "q1".into(),
                    question_number: 2,
                    correct_answer: "A".into(),
                    original_answer: "True".into(),
                },
            ],
        };
        let csv = answer_key_csv(&[variant]);
        let lines: Vec<&str> = csv.lines().collect();
        assert_eq!(lines[0], ANSWER_KEY_HEADER);
        assert_eq!(lines[1], "V2,1,q2,C,Paris");
        assert_eq!(lines[2], "V2,2,q1,A,True");
    }

    #[test]
    fn scores_csv_written_to_file() {
        let scores = vec![StudentScore {
            student_id: "s1".into(),
            variant_code: "V1".into(),
            total_score: 8.5,
            max_possible_score: 10.0,
            percentage: 85.0,
            rank: 1,
            percentile: 100.0,
        }];
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out").join("scores.csv");
        write_csv(&student_scores_csv(&scores), &path).unwrap();
        let content = std::fs::read_to_string(&path).unwrap();
        assert_eq!(
            content,
            format!("{STUDENT_SCORES_HEADER}\ns1,V1,8.5,10,85.00,1,100.00\n")
        );
    }
}
