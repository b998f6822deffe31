//! The `variantry analyze` command.

use std::path::PathBuf;

use anyhow::Result;
use comfy_table::{Cell, Table};

use variantry_core::model::StudentResponse;
use variantry_core::parser::parse_exam;
use variantry_core::report::AnalysisReport;

use crate::store;

fn fmt_opt(value: Option<f64>) -> String {
    value.map_or_else(|| "-".to_string(), |v| format!("{v:.2}"))
}

pub fn execute(
    exam_path: PathBuf,
    variants_path: PathBuf,
    responses_path: PathBuf,
    integrity: bool,
    output: Option<PathBuf>,
    format: String,
    config_path: Option<PathBuf>,
) -> Result<()> {
    if !matches!(
        format.as_str(),
        "json" | "html" | "markdown" | "md" | "csv" | "all"
    ) {
        anyhow::bail!("unknown format '{format}' (expected json, html, csv, markdown or all)");
    }

    let config = variantry_core::config::load_config_from(config_path.as_deref())?;
    let exam = parse_exam(&exam_path)?;
    let (_, variants) = store::load_variants(&variants_path)?;
    let responses: Vec<StudentResponse> = store::read_json(&responses_path, "responses")?;

    tracing::info!(
        "analyzing {} responses to '{}' across {} variants",
        responses.len(),
        exam.name,
        variants.len()
    );

    let report = AnalysisReport::build(
        &exam,
        &variants,
        &responses,
        &config.analysis,
        integrity.then_some(&config.integrity),
    );

    let mut table = Table::new();
    table.set_header(vec![
        "Question",
        "Difficulty",
        "Discrimination",
        "Point-biserial",
        "Omitted",
        "Flags",
    ]);
    for item in &report.overall.items {
        let flags: Vec<String> = item.flags.iter().map(|f| format!("{f:?}")).collect();
        table.add_row(vec![
            Cell::new(&item.question_id),
            Cell::new(fmt_opt(item.difficulty_index)),
            Cell::new(fmt_opt(item.discrimination_index)),
            Cell::new(fmt_opt(item.point_biserial)),
            Cell::new(item.omitted_count),
            Cell::new(flags.join(", ")),
        ]);
    }
    eprintln!("\n{table}");

    let summary = &report.overall.summary;
    eprintln!(
        "Students: {}  Mean: {}  SD: {}  Alpha: {}  Flagged items: {}",
        summary.sample_size,
        fmt_opt(summary.score_mean),
        fmt_opt(summary.score_std_dev),
        fmt_opt(summary.reliability),
        summary.flagged_items
    );
    for a in &report.anomalies {
        eprintln!("Anomaly: {} on {}: {}", a.question_id, a.variant_code, a.reason);
    }
    if let Some(integrity) = &report.integrity {
        eprintln!(
            "Integrity: {} similarity flag(s), {} key flag(s), {} duplicate variant pair(s)",
            integrity.similarity_flags.len(),
            integrity.key_flags.len(),
            integrity.duplicate_variants.len()
        );
    }

    let output_dir = output.unwrap_or(config.output_dir);
    let timestamp = chrono::Utc::now().format("%Y-%m-%dT%H%M%S");
    let all = format == "all";

    if all || format == "json" {
        let path = output_dir.join(format!("analysis-{timestamp}.json"));
        report.save_json(&path)?;
        println!("Report saved to: {}", path.display());
    }
    if all || format == "html" {
        let path = output_dir.join(format!("analysis-{timestamp}.html"));
        variantry_report::write_html_report(&report, &path)?;
        println!("HTML report saved to: {}", path.display());
    }
    if all || format == "markdown" || format == "md" {
        let path = output_dir.join(format!("analysis-{timestamp}.md"));
        std::fs::create_dir_all(&output_dir)?;
        std::fs::write(&path, report.to_markdown())?;
        println!("Markdown report saved to: {}", path.display());
    }
    if all || format == "csv" {
        let scores = variantry_core::percentile::rank_students(&responses);
        let exports = [
            (
                "items",
                variantry_report::item_statistics_csv(&report.overall),
            ),
            (
                "distractors",
                variantry_report::distractors_csv(&report.overall),
            ),
            ("scores", variantry_report::student_scores_csv(&scores)),
        ];
        for (name, content) in exports {
            let path = output_dir.join(format!("{name}-{timestamp}.csv"));
            variantry_report::write_csv(&content, &path)?;
            println!("CSV saved to: {}", path.display());
        }
    }
    Ok(())
}
