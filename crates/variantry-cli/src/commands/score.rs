//! The `variantry score` command.

use std::path::PathBuf;

use anyhow::Result;
use comfy_table::{Cell, Table};

use variantry_core::model::RawSubmission;
use variantry_core::normalizer::score_all;
use variantry_core::parser::parse_exam;

use crate::store;

pub fn execute(
    exam_path: PathBuf,
    variants_path: PathBuf,
    submissions_path: PathBuf,
    output: Option<PathBuf>,
) -> Result<()> {
    let exam = parse_exam(&exam_path)?;
    let (file, variants) = store::load_variants(&variants_path)?;
    if file.exam_id != exam.id {
        anyhow::bail!(
            "variants were generated for exam '{}', not '{}'",
            file.exam_id,
            exam.id
        );
    }
    let output = output.unwrap_or_else(|| store::responses_path_for(&variants_path));
    let submissions: Vec<RawSubmission> = store::read_json(&submissions_path, "submissions")?;

    let responses = score_all(&variants, &exam.questions, &submissions);
    let skipped = submissions.len() - responses.len();
    for r in &responses {
        for w in &r.warnings {
            eprintln!("Warning [{}]: {w}", r.student_id);
        }
    }

    let mut table = Table::new();
    table.set_header(vec!["Student", "Variant", "Score", "Max"]);
    for r in &responses {
        table.add_row(vec![
            Cell::new(&r.student_id),
            Cell::new(&r.variant_code),
            Cell::new(r.total_score),
            Cell::new(r.max_possible_score),
        ]);
    }
    eprintln!("\n{table}");

    store::write_json(&output, &responses)?;
    println!("Scored {} submission(s), skipped {skipped}", responses.len());
    println!("Responses written to: {}", output.display());

    Ok(())
}
