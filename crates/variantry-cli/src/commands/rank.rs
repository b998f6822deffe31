//! The `variantry rank` command.

use std::path::PathBuf;

use anyhow::Result;
use comfy_table::{Cell, Table};

use variantry_core::model::StudentResponse;
use variantry_core::percentile::{filter_by_percentile, PercentileRange};

use crate::store;

pub fn execute(responses_path: PathBuf, from: f64, to: f64, csv: Option<PathBuf>) -> Result<()> {
    let responses: Vec<StudentResponse> = store::read_json(&responses_path, "responses")?;
    let selected = filter_by_percentile(&responses, PercentileRange { from, to })?;

    let mut table = Table::new();
    table.set_header(vec!["Rank", "Student", "Variant", "Score", "%", "Percentile"]);
    for s in &selected {
        table.add_row(vec![
            Cell::new(s.rank),
            Cell::new(&s.student_id),
            Cell::new(&s.variant_code),
            Cell::new(format!("{} / {}", s.total_score, s.max_possible_score)),
            Cell::new(format!("{:.1}", s.percentage)),
            Cell::new(format!("{:.1}", s.percentile)),
        ]);
    }
    println!("{table}");
    println!(
        "{} of {} student(s) in percentile range [{from}, {to}]",
        selected.len(),
        responses.len()
    );

    if let Some(path) = csv {
        variantry_report::write_csv(&variantry_report::student_scores_csv(&selected), &path)?;
        println!("CSV saved to: {}", path.display());
    }

    Ok(())
}
