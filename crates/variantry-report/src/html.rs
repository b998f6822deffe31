//! HTML report generator.
//!
//! Produces a self-contained HTML file with all CSS/JS inlined.

use anyhow::Result;
use std::path::Path;

use variantry_core::analysis::{AnalysisResult, ItemStatistics};
use variantry_core::report::AnalysisReport;

/// Escape a string for safe HTML insertion.
fn html_escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#x27;")
}

fn fmt_opt(value: Option<f64>) -> String {
    value.map_or_else(|| "n/a".to_string(), |v| format!("{v:.2}"))
}

/// Generate an HTML report from an analysis report.
pub fn generate_html(report: &AnalysisReport) -> String {
    let mut html = String::new();

    html.push_str("<!DOCTYPE html>\n<html lang=\"en\">\n<head>\n");
    html.push_str("<meta charset=\"utf-8\">\n");
    html.push_str("<meta name=\"viewport\" content=\"width=device-width, initial-scale=1\">\n");
    html.push_str(&format!(
        "<title>variantry report: {}</title>\n",
        html_escape(&report.exam.name)
    ));
    html.push_str("<style>\n");
    html.push_str(CSS);
    html.push_str("</style>\n");
    html.push_str("</head>\n<body>\n");

    // Header
    html.push_str("<header>\n");
    html.push_str("<h1>variantry item analysis</h1>\n");
    html.push_str(&format!(
        "<p class=\"meta\">Exam: <strong>{}</strong> | {} questions | {} variants | {}</p>\n",
        html_escape(&report.exam.name),
        report.exam.question_count,
        report.exam.variant_count,
        report.created_at.format("%Y-%m-%d %H:%M:%S UTC")
    ));
    html.push_str("</header>\n");

    // Summary dashboard
    let summary = &report.overall.summary;
    html.push_str("<section class=\"dashboard\">\n");
    html.push_str("<h2>Summary</h2>\n");
    html.push_str("<table class=\"summary\">\n");
    html.push_str("<thead><tr><th>Students</th><th>Mean score</th><th>SD</th><th>Cronbach's alpha</th><th>Avg difficulty</th><th>Avg discrimination</th><th>Flagged items</th></tr></thead>\n");
    html.push_str(&format!(
        "<tbody><tr><td>{}</td><td>{} / {}</td><td>{}</td><td>{}</td><td>{}</td><td>{}</td><td>{}</td></tr></tbody></table>\n",
        summary.sample_size,
        fmt_opt(summary.score_mean),
        report.exam.max_score,
        fmt_opt(summary.score_std_dev),
        fmt_opt(summary.reliability),
        fmt_opt(summary.average_difficulty),
        fmt_opt(summary.average_discrimination),
        summary.flagged_items,
    ));

    if !report.overall.items.is_empty() {
        html.push_str(&generate_difficulty_chart(&report.overall.items));
    }
    html.push_str("</section>\n");

    // Per-item results
    html.push_str("<section class=\"results\">\n");
    html.push_str("<h2>Items</h2>\n");
    html.push_str(&item_table("items", &report.overall));
    html.push_str("</section>\n");

    // Per-variant results
    if report.by_variant.len() > 1 {
        html.push_str("<section class=\"variants\">\n");
        html.push_str("<h2>By variant</h2>\n");
        for (code, result) in &report.by_variant {
            html.push_str(&format!(
                "<details>\n<summary>{} ({} students)</summary>\n",
                html_escape(code),
                result.summary.sample_size
            ));
            html.push_str(&item_table(&format!("variant-{code}"), result));
            html.push_str("</details>\n");
        }
        html.push_str("</section>\n");
    }

    if !report.anomalies.is_empty() {
        html.push_str("<section class=\"anomalies\">\n");
        html.push_str("<h2>Variant anomalies</h2>\n");
        html.push_str("<table>\n<thead><tr><th>Variant</th><th>Question</th><th>Reason</th></tr></thead>\n<tbody>\n");
        for a in &report.anomalies {
            html.push_str(&format!(
                "<tr class=\"fail\"><td>{}</td><td>{}</td><td>{}</td></tr>\n",
                html_escape(&a.variant_code),
                html_escape(&a.question_id),
                html_escape(&a.reason)
            ));
        }
        html.push_str("</tbody></table>\n</section>\n");
    }

    if let Some(integrity) = &report.integrity {
        html.push_str("<section class=\"integrity\">\n");
        html.push_str("<h2>Integrity</h2>\n");
        html.push_str(&format!(
            "<p class=\"meta\">{} students, {} pairs compared. Flags are for review only.</p>\n",
            integrity.students_analyzed, integrity.pairs_compared
        ));
        if !integrity.similarity_flags.is_empty() {
            html.push_str("<table>\n<thead><tr><th>Student A</th><th>Student B</th><th>Identical wrong</th><th>Expected</th><th>z</th></tr></thead>\n<tbody>\n");
            for f in &integrity.similarity_flags {
                html.push_str(&format!(
                    "<tr><td>{}</td><td>{}</td><td>{}</td><td>{:.2}</td><td>{:.2}</td></tr>\n",
                    html_escape(&f.student_a),
                    html_escape(&f.student_b),
                    f.identical_incorrect,
                    f.expected_identical_incorrect,
                    f.z_score
                ));
            }
            html.push_str("</tbody></table>\n");
        }
        for f in &integrity.key_flags {
            html.push_str(&format!(
                "<p>{}: {}</p>\n",
                html_escape(&f.student_id),
                html_escape(&f.detail)
            ));
        }
        for d in &integrity.duplicate_variants {
            html.push_str(&format!(
                "<p>{} and {} are identical.</p>\n",
                html_escape(&d.first),
                html_escape(&d.second)
            ));
        }
        html.push_str("</section>\n");
    }

    // Raw JSON
    html.push_str("<section class=\"raw-data\">\n");
    html.push_str("<details>\n<summary>Raw JSON Data</summary>\n");
    html.push_str("<pre><code>");
    html.push_str(
        &serde_json::to_string_pretty(report)
            .unwrap_or_default()
            .replace('<', "&lt;")
            .replace('>', "&gt;"),
    );
    html.push_str("</code></pre>\n");
    html.push_str("</details>\n</section>\n");

    // JavaScript for sorting
    html.push_str("<script>\n");
    html.push_str(JS);
    html.push_str("</script>\n");

    html.push_str("</body>\n</html>");
    html
}

/// Write an HTML report to a file.
pub fn write_html_report(report: &AnalysisReport, path: &Path) -> Result<()> {
    let html = generate_html(report);
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, html)?;
    Ok(())
}

fn item_table(id: &str, result: &AnalysisResult) -> String {
    let mut html = format!("<table class=\"results-table\" id=\"{}\">\n", html_escape(id));
    html.push_str(&format!(
        "<thead><tr>{}</tr></thead>\n<tbody>\n",
        ["Question", "Difficulty", "Discrimination", "Point-biserial", "Significant", "Flags"]
            .iter()
            .enumerate()
            .map(|(col, name)| format!(
                "<th onclick=\"sortTable('{}', {col})\">{name}</th>",
                html_escape(id)
            ))
            .collect::<String>()
    ));

    for item in &result.items {
        let class = if item.flags.is_empty() { "pass" } else { "fail" };
        let flags: Vec<String> = item.flags.iter().map(|f| format!("{f:?}")).collect();
        html.push_str(&format!(
            "<tr class=\"{}\"><td>{}</td><td>{}</td><td>{}</td><td>{}</td><td>{}</td><td>{}</td></tr>\n",
            class,
            html_escape(&item.question_id),
            fmt_opt(item.difficulty_index),
            fmt_opt(item.discrimination_index),
            fmt_opt(item.point_biserial),
            if item.is_significant { "yes" } else { "no" },
            flags.join(", ")
        ));
    }

    html.push_str("</tbody></table>\n");
    html
}

fn generate_difficulty_chart(items: &[ItemStatistics]) -> String {
    let bar_height = 24;
    let max_width = 400;
    let padding = 8;
    let label_width = 160;

    let total_height = items.len() * (bar_height + padding) + padding;

    let mut svg = format!(
        "<svg width=\"{}\" height=\"{}\" xmlns=\"http://www.w3.org/2000/svg\">\n",
        label_width + max_width + 60,
        total_height
    );

    for (i, item) in items.iter().enumerate() {
        let y = i * (bar_height + padding) + padding;
        let difficulty = item.difficulty_index.unwrap_or(0.0);
        let width = (difficulty * max_width as f64) as usize;

        let color = if (0.3..=0.8).contains(&difficulty) {
            "#22c55e"
        } else if (0.2..=0.9).contains(&difficulty) {
            "#eab308"
        } else {
            "#ef4444"
        };

        svg.push_str(&format!(
            "  <text x=\"{}\" y=\"{}\" font-size=\"13\" fill=\"currentColor\" text-anchor=\"end\" dominant-baseline=\"middle\">{}</text>\n",
            label_width - 10,
            y + bar_height / 2,
            html_escape(&item.question_id)
        ));
        svg.push_str(&format!(
            "  <rect x=\"{}\" y=\"{}\" width=\"{}\" height=\"{}\" fill=\"{}\" rx=\"4\"/>\n",
            label_width, y, width, bar_height, color
        ));
        svg.push_str(&format!(
            "  <text x=\"{}\" y=\"{}\" font-size=\"12\" fill=\"currentColor\" dominant-baseline=\"middle\">{}</text>\n",
            label_width + width + 8,
            y + bar_height / 2,
            fmt_opt(item.difficulty_index)
        ));
    }

    svg.push_str("</svg>\n");
    svg
}

const CSS: &str = r#"
:root { --bg: #fff; --fg: #1a1a1a; --border: #e5e7eb; --pass: #dcfce7; --fail: #fde2e2; }
@media (prefers-color-scheme: dark) {
  :root { --bg: #111827; --fg: #f9fafb; --border: #374151; --pass: #064e3b; --fail: #7f1d1d; }
}
body { font-family: -apple-system, BlinkMacSystemFont, 'Segoe UI', sans-serif; margin: 0; padding: 2rem; background: var(--bg); color: var(--fg); }
h1, h2 { margin-top: 2rem; }
.meta { color: #6b7280; }
table { border-collapse: collapse; width: 100%; margin: 1rem 0; }
th, td { border: 1px solid var(--border); padding: 0.5rem 1rem; text-align: left; }
th { background: var(--border); cursor: pointer; }
.pass { background: var(--pass); }
.fail { background: var(--fail); }
pre { overflow-x: auto; padding: 1rem; background: var(--border); border-radius: 8px; }
code { font-family: 'JetBrains Mono', 'Fira Code', monospace; font-size: 0.85rem; }
details { margin: 1rem 0; }
summary { cursor: pointer; font-weight: bold; }
svg { margin: 1rem 0; }
"#;

const JS: &str = r#"
function sortTable(id, col) {
  const table = document.getElementById(id);
  const tbody = table.querySelector('tbody');
  const rows = Array.from(tbody.querySelectorAll('tr'));
  const asc = table.dataset.sortCol == col && table.dataset.sortDir == 'asc' ? false : true;
  rows.sort((a, b) => {
    const va = a.cells[col].textContent;
    const vb = b.cells[col].textContent;
    const na = parseFloat(va), nb = parseFloat(vb);
    const cmp = isNaN(na) || isNaN(nb) ? va.localeCompare(vb) : na - nb;
    return asc ? cmp : -cmp;
  });
  table.dataset.sortCol = col;
  table.dataset.sortDir = asc ? 'asc' : 'desc';
  rows.forEach(r => tbody.appendChild(r));
}
"#;

#[cfg(test)]
mod tests {
    use super::*;
    use variantry_core::analysis::AnalysisOptions;
    use variantry_core::integrity::IntegrityOptions;
    use variantry_core::model::{Exam, ItemResponse, Question, QuestionKind, StudentResponse};

    fn make_test_report() -> AnalysisReport {
        let exam = Exam {
            id: "test-exam".into(),
            name: "Test <Exam>".into(),
            description: String::new(),
            questions: vec![Question {
                id: "q-1".into(),
                text: "Pick".into(),
                kind: QuestionKind::MultipleChoice,
                options: vec!["a".into(), "b".into()],
                correct_answer: "a".into(),
                points: 1.0,
                negative_points: None,
            }],
        };
        let responses: Vec<StudentResponse> = ["V1", "V2", "V1", "V2"]
            .iter()
            .enumerate()
            .map(|(s, code)| StudentResponse {
                student_id: format!("s{s}"),
                variant_code: code.to_string(),
                responses: vec![ItemResponse {
                    question_id: "q-1".into(),
                    raw_answer: Some("A".into()),
                    selected_option: Some(if s % 2 == 0 { "a" } else { "b" }.into()),
                    is_correct: s % 2 == 0,
                    points_awarded: if s % 2 == 0 { 1.0 } else { 0.0 },
                }],
                total_score: if s % 2 == 0 { 1.0 } else { 0.0 },
                max_possible_score: 1.0,
                warnings: Vec::new(),
            })
            .collect();
        AnalysisReport::build(
            &exam,
            &[],
            &responses,
            &AnalysisOptions::default(),
            Some(&IntegrityOptions::default()),
        )
    }

    #[test]
    fn html_report_contains_required_elements() {
        let report = make_test_report();
        let html = generate_html(&report);

        assert!(html.contains("<html"));
        assert!(html.contains("</html>"));
        assert!(html.contains("q-1"));
        assert!(html.contains("Test &lt;Exam&gt;"));
        assert!(!html.contains("Test <Exam>"));
        assert!(html.contains("By variant"));
        assert!(html.contains("Integrity"));
        assert!(html.contains("<svg"));
    }

    #[test]
    fn html_report_write_to_file() {
        let report = make_test_report();
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("report.html");

        write_html_report(&report, &path).unwrap();
        assert!(path.exists());

        let content = std::fs::read_to_string(&path).unwrap();
        assert!(content.contains("<html"));
    }
}
