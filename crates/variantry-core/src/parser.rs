//! TOML exam file parser.
//!
//! Loads exams from TOML files and validates them.

use std::collections::HashSet;
use std::path::Path;

use anyhow::{Context, Result};
use serde::Deserialize;

use crate::model::{Exam, Question, QuestionKind};

/// Intermediate TOML structure for parsing exam files.
#[derive(Debug, Deserialize)]
struct TomlExamFile {
    exam: TomlExamHeader,
    #[serde(default)]
    questions: Vec<TomlQuestion>,
}

#[derive(Debug, Deserialize)]
struct TomlExamHeader {
    id: String,
    name: String,
    #[serde(default)]
    description: String,
    #[serde(default = "default_points")]
    default_points: f64,
}

fn default_points() -> f64 {
    1.0
}

#[derive(Debug, Deserialize)]
struct TomlQuestion {
    id: String,
    text: String,
    #[serde(rename = "type", default = "default_kind")]
    kind: String,
    #[serde(default)]
    options: Vec<String>,
    correct_answer: String,
    #[serde(default)]
    points: Option<f64>,
    #[serde(default)]
    negative_points: Option<f64>,
}

fn default_kind() -> String {
    "multiple_choice".to_string()
}

/// Parse a single TOML file into an `Exam`.
pub fn parse_exam(path: &Path) -> Result<Exam> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read exam file: {}", path.display()))?;

    parse_exam_str(&content, path)
}

/// Parse a TOML string into an `Exam`.
pub fn parse_exam_str(content: &str, source_path: &Path) -> Result<Exam> {
    let parsed: TomlExamFile = toml::from_str(content)
        .with_context(|| format!("failed to parse TOML: {}", source_path.display()))?;

    let default_points = parsed.exam.default_points;
    let questions = parsed
        .questions
        .into_iter()
        .map(|q| {
            let kind: QuestionKind = q
                .kind
                .parse()
                .map_err(|e: String| anyhow::anyhow!("question '{}': {}", q.id, e))?;
            Ok(Question {
                id: q.id,
                text: q.text,
                kind,
                options: q.options,
                correct_answer: q.correct_answer,
                points: q.points.unwrap_or(default_points),
                negative_points: q.negative_points,
            })
        })
        .collect::<Result<Vec<_>>>()?;

    Ok(Exam {
        id: parsed.exam.id,
        name: parsed.exam.name,
        description: parsed.exam.description,
        questions,
    })
}

/// Recursively load all `.toml` exam files from a directory.
pub fn load_exam_directory(dir: &Path) -> Result<Vec<Exam>> {
    let mut exams = Vec::new();

    if !dir.is_dir() {
        anyhow::bail!("not a directory: {}", dir.display());
    }

    for entry in std::fs::read_dir(dir)
        .with_context(|| format!("failed to read directory: {}", dir.display()))?
    {
        let entry = entry?;
        let path = entry.path();

        if path.is_dir() {
            exams.extend(load_exam_directory(&path)?);
        } else if path.extension().is_some_and(|ext| ext == "toml") {
            match parse_exam(&path) {
                Ok(exam) => exams.push(exam),
                Err(e) => {
                    tracing::warn!("skipping {}: {}", path.display(), e);
                }
            }
        }
    }

    Ok(exams)
}

/// A warning from exam validation.
#[derive(Debug, Clone)]
pub struct ValidationWarning {
    /// The question ID (if applicable).
    pub question_id: Option<String>,
    /// Warning message.
    pub message: String,
}

/// Validate an exam for common authoring issues.
pub fn validate_exam(exam: &Exam) -> Vec<ValidationWarning> {
    let mut warnings = Vec::new();
    let mut warn = |q: &Question, message: String| {
        warnings.push(ValidationWarning {
            question_id: Some(q.id.clone()),
            message,
        })
    };

    let mut seen_ids = HashSet::new();
    for q in &exam.questions {
        if !seen_ids.insert(q.id.as_str()) {
            warn(q, format!("duplicate question ID: {}", q.id));
        }
        if q.kind == QuestionKind::MultipleChoice && q.options.len() < 2 {
            warn(
                q,
                format!("multiple choice question has {} option(s)", q.options.len()),
            );
        }
        if q.kind == QuestionKind::TrueFalse && !q.options.is_empty() && q.options.len() != 2 {
            warn(
                q,
                format!("true/false question has {} options", q.options.len()),
            );
        }
        if q.correct_index().is_none() {
            warn(
                q,
                format!("correct answer '{}' is not among the options", q.correct_answer),
            );
        }
        if q.points <= 0.0 {
            warn(q, format!("points must be positive, got {}", q.points));
        }
        if q.text.trim().is_empty() {
            warn(q, "question text is empty".into());
        }
    }

    if exam.questions.is_empty() {
        warnings.push(ValidationWarning {
            question_id: None,
            message: "exam has no questions".into(),
        });
    }

    warnings
}
