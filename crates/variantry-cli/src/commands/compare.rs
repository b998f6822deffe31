//! The `variantry compare` command.

use std::path::PathBuf;

use anyhow::Result;

use variantry_core::report::AnalysisReport;

pub fn execute(
    baseline_path: PathBuf,
    current_path: PathBuf,
    threshold: f64,
    fail_on_drift: bool,
    format: String,
) -> Result<()> {
    let baseline = AnalysisReport::load_json(&baseline_path)?;
    let current = AnalysisReport::load_json(&current_path)?;

    if baseline.exam.id != current.exam.id {
        tracing::warn!(
            "comparing different exams: '{}' vs '{}'",
            baseline.exam.id,
            current.exam.id
        );
    }

    let report = current.compare(&baseline, threshold);

    match format.as_str() {
        "markdown" | "md" => {
            println!("{}", report.to_markdown());
        }
        "json" => {
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
        _ => {
            println!(
                "Comparison: {} harder, {} easier, {} stable",
                report.harder.len(),
                report.easier.len(),
                report.stable
            );

            for (title, drifts) in [("Harder", &report.harder), ("Easier", &report.easier)] {
                if drifts.is_empty() {
                    continue;
                }
                println!("\n{title}:");
                for d in drifts {
                    println!(
                        "  {} {:.2} -> {:.2} ({:+.2})",
                        d.question_id, d.baseline_difficulty, d.current_difficulty, d.delta
                    );
                }
            }

            if report.new_items > 0 {
                println!("\n{} new item(s)", report.new_items);
            }
            if report.removed_items > 0 {
                println!("{} removed item(s)", report.removed_items);
            }
        }
    }

    if fail_on_drift && report.has_drift() {
        std::process::exit(1);
    }

    Ok(())
}
