//! The `variantry validate` command.

use std::path::PathBuf;

use anyhow::Result;

use variantry_core::generator::achievable_arrangements;
use variantry_core::parser::{load_exam_directory, parse_exam, validate_exam};

pub fn execute(exam_path: PathBuf) -> Result<()> {
    let exams = if exam_path.is_dir() {
        load_exam_directory(&exam_path)?
    } else {
        vec![parse_exam(&exam_path)?]
    };

    let config = variantry_core::config::load_config()?;
    let generation = config.generation.to_config("validate");

    let mut total_warnings = 0;

    for exam in &exams {
        println!(
            "Exam: {} ({} questions, {} points)",
            exam.name,
            exam.questions.len(),
            exam.max_score()
        );

        let warnings = validate_exam(exam);
        for w in &warnings {
            let prefix = w
                .question_id
                .as_ref()
                .map(|id| format!("  [{id}]"))
                .unwrap_or_else(|| "  ".to_string());
            println!("{prefix} WARNING: {}", w.message);
        }
        total_warnings += warnings.len();

        let achievable = achievable_arrangements(&exam.questions, &generation);
        if achievable < generation.number_of_variants as u128 {
            println!(
                "  NOTE: only {achievable} distinct arrangement(s) for {} variants",
                generation.number_of_variants
            );
        }
    }

    if total_warnings == 0 {
        println!("All exams valid.");
    } else {
        println!("\n{total_warnings} warning(s) found.");
    }

    Ok(())
}
