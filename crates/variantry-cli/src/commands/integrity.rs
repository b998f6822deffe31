//! The `variantry integrity` command.

use std::path::PathBuf;

use anyhow::Result;
use comfy_table::{Cell, Table};

use variantry_core::integrity::analyze_integrity;
use variantry_core::model::StudentResponse;

use crate::store;

pub fn execute(
    variants_path: PathBuf,
    responses_path: PathBuf,
    format: String,
    config_path: Option<PathBuf>,
) -> Result<()> {
    let config = variantry_core::config::load_config_from(config_path.as_deref())?;
    let (_, variants) = store::load_variants(&variants_path)?;
    let responses: Vec<StudentResponse> = store::read_json(&responses_path, "responses")?;

    let report = analyze_integrity(&variants, &responses, &config.integrity);

    if format == "json" {
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    println!(
        "Screened {} students ({} pairs compared)",
        report.students_analyzed, report.pairs_compared
    );

    if !report.similarity_flags.is_empty() {
        let mut table = Table::new();
        table.set_header(vec![
            "Student A",
            "Student B",
            "Shared",
            "Identical wrong",
            "Expected",
            "z",
        ]);
        for f in &report.similarity_flags {
            table.add_row(vec![
                Cell::new(&f.student_a),
                Cell::new(&f.student_b),
                Cell::new(f.shared_items),
                Cell::new(f.identical_incorrect),
                Cell::new(format!("{:.2}", f.expected_identical_incorrect)),
                Cell::new(format!("{:.2}", f.z_score)),
            ]);
        }
        println!("\nSuspicious answer similarity:\n{table}");
    }

    for f in &report.key_flags {
        println!("Key leak: {}", f.detail);
    }
    for d in &report.duplicate_variants {
        println!("Duplicate variants: {} and {}", d.first, d.second);
    }

    if report.is_clean() {
        println!("No integrity concerns found.");
    }

    Ok(())
}
