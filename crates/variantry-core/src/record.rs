//! Storage form of a variant.
//!
//! Persistence layers keep the three variant columns as JSON text. Reading
//! them back never fails: a column that cannot be decoded is replaced by an
//! empty value (the identity order for `question_order`) and reported, so one
//! corrupt row does not block a whole analysis.

use std::collections::BTreeMap;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::error::{DataWarning, ExamError};
use crate::model::{AnswerKeyEntry, Variant};
use crate::prng::is_permutation;

/// Current layout of the JSON columns.
pub const VARIANT_FORMAT_VERSION: u32 = 1;

/// A variant as stored: JSON-encoded columns plus a layout version.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VariantRecord {
    pub variant_number: u32,
    pub variant_code: String,
    pub format_version: u32,
    pub question_order: String,
    pub option_permutations: String,
    pub answer_key: String,
}

impl Variant {
    /// Encode for storage.
    pub fn to_record(&self) -> Result<VariantRecord, ExamError> {
        Ok(VariantRecord {
            variant_number: self.variant_number,
            variant_code: self.variant_code.clone(),
            format_version: VARIANT_FORMAT_VERSION,
            question_order: serde_json::to_string(&self.question_order)?,
            option_permutations: serde_json::to_string(&self.option_permutations)?,
            answer_key: serde_json::to_string(&self.answer_key)?,
        })
    }

    /// Decode a stored record, substituting fallbacks for malformed columns.
    pub fn from_record(record: &VariantRecord) -> (Variant, Vec<DataWarning>) {
        let mut warnings = Vec::new();

        if record.format_version != VARIANT_FORMAT_VERSION {
            warnings.push(DataWarning::MalformedStoredData {
                field: "format_version".into(),
                detail: format!(
                    "version {} is not {VARIANT_FORMAT_VERSION}, decoding as current layout",
                    record.format_version
                ),
            });
        }

        let question_order: Vec<usize> =
            decode_column("question_order", &record.question_order, &mut warnings);
        let option_permutations: BTreeMap<String, Vec<usize>> = decode_column(
            "option_permutations",
            &record.option_permutations,
            &mut warnings,
        );
        let answer_key: Vec<AnswerKeyEntry> =
            decode_column("answer_key", &record.answer_key, &mut warnings);

        // The answer key lists one entry per displayed question.
        let question_order =
            if question_order.len() == answer_key.len() && is_permutation(&question_order) {
                question_order
            } else {
                if !question_order.is_empty() {
                    warnings.push(DataWarning::MalformedStoredData {
                        field: "question_order".into(),
                        detail: format!(
                            "{question_order:?} is not an order of {} questions, using identity",
                            answer_key.len()
                        ),
                    });
                }
                (0..answer_key.len()).collect()
            };

        for warning in &warnings {
            tracing::warn!("variant {}: {warning}", record.variant_code);
        }

        let variant = Variant {
            variant_number: record.variant_number,
            variant_code: record.variant_code.clone(),
            question_order,
            option_permutations,
            answer_key,
        };
        (variant, warnings)
    }
}

fn decode_column<T: DeserializeOwned + Default>(
    field: &str,
    raw: &str,
    warnings: &mut Vec<DataWarning>,
) -> T {
    if raw.trim().is_empty() {
        return T::default();
    }
    match serde_json::from_str(raw) {
        Ok(value) => value,
        Err(e) => {
            warnings.push(DataWarning::MalformedStoredData {
                field: field.to_string(),
                detail: e.to_string(),
            });
            T::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::generator::generate_variants;
    use crate::model::{GenerationConfig, Question, QuestionKind};

    fn variant() -> Variant {
        let questions = vec![
            Question {
                id: "q1".into(),
                text: "Pick".into(),
                kind: QuestionKind::MultipleChoice,
                options: vec!["a".into(), "b".into(), "c".into()],
                correct_answer: "b".into(),
                points: 1.0,
                negative_points: None,
            },
            Question {
                id: "q2".into(),
                text: "Other".into(),
                kind: QuestionKind::MultipleChoice,
                options: vec!["x".into(), "y".into()],
                correct_answer: "x".into(),
                points: 1.0,
                negative_points: None,
            },
        ];
        generate_variants(&questions, &GenerationConfig::new("record", 2))
            .unwrap()
            .variants
            .remove(1)
    }

    #[test]
    fn record_round_trips() {
        let v = variant();
        let record = v.to_record().unwrap();
        assert_eq!(record.format_version, VARIANT_FORMAT_VERSION);
        assert!(record.answer_key.contains("\"questionId\""));
        let (back, warnings) = Variant::from_record(&record);
        assert!(warnings.is_empty());
        assert_eq!(back, v);
    }

    #[test]
    fn malformed_column_falls_back_to_empty() {
        let mut record = variant().to_record().unwrap();
        record.option_permutations = "{not json".into();
        let (back, warnings) = Variant::from_record(&record);
        assert!(back.option_permutations.is_empty());
        assert_eq!(back.answer_key.len(), 2);
        assert!(matches!(
            &warnings[..],
            [DataWarning::MalformedStoredData { field, .. }] if field == "option_permutations"
        ));
    }

    #[test]
    fn malformed_question_order_falls_back_to_identity() {
        let mut record = variant().to_record().unwrap();
        record.question_order = "[0, oops".into();
        let (back, warnings) = Variant::from_record(&record);
        assert_eq!(back.question_order, vec![0, 1]);
        assert!(matches!(
            &warnings[..],
            [DataWarning::MalformedStoredData { field, .. }] if field == "question_order"
        ));

        record.question_order = "[1, 1]".into();
        let (back, warnings) = Variant::from_record(&record);
        assert_eq!(back.question_order, vec![0, 1]);
        assert_eq!(warnings.len(), 1);
    }

    #[test]
    fn empty_columns_decode_silently() {
        let record = VariantRecord {
            variant_number: 1,
            variant_code: "V1".into(),
            format_version: VARIANT_FORMAT_VERSION,
            question_order: String::new(),
            option_permutations: String::new(),
            answer_key: String::new(),
        };
        let (back, warnings) = Variant::from_record(&record);
        assert!(warnings.is_empty());
        assert!(back.answer_key.is_empty());
    }

    #[test]
    fn unknown_version_is_reported() {
        let mut record = variant().to_record().unwrap();
        record.format_version = 7;
        let (back, warnings) = Variant::from_record(&record);
        assert_eq!(warnings.len(), 1);
        assert_eq!(back.answer_key.len(), 2);
    }
}
