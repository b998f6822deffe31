//! Analysis report types with JSON persistence and item drift detection.

use std::collections::{BTreeMap, HashMap};
use std::path::Path;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::analysis::{
    analyze, analyze_by_variant, detect_variant_anomalies, AnalysisOptions, AnalysisResult,
    VariantAnomaly,
};
use crate::integrity::{analyze_integrity, IntegrityOptions, IntegrityReport};
use crate::model::{Exam, StudentResponse, Variant};

/// Difficulty gap between a variant and the pool that marks an anomaly.
pub const ANOMALY_DIFFICULTY_THRESHOLD: f64 = 0.25;

/// A complete analysis report for one administration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisReport {
    /// Unique report identifier.
    pub id: Uuid,
    /// When the report was created.
    pub created_at: DateTime<Utc>,
    /// Summary of the exam.
    pub exam: ExamSummary,
    /// Pooled analysis across all variants.
    pub overall: AnalysisResult,
    /// Analysis per variant code.
    pub by_variant: BTreeMap<String, AnalysisResult>,
    pub anomalies: Vec<VariantAnomaly>,
    #[serde(default)]
    pub integrity: Option<IntegrityReport>,
}

/// Summary of an exam (without the question bodies).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExamSummary {
    pub id: String,
    pub name: String,
    pub question_count: usize,
    pub max_score: f64,
    pub variant_count: usize,
}

impl AnalysisReport {
    /// Run every analysis pass over one administration.
    ///
    /// The integrity pass runs only when `integrity` is given.
    pub fn build(
        exam: &Exam,
        variants: &[Variant],
        responses: &[StudentResponse],
        options: &AnalysisOptions,
        integrity: Option<&IntegrityOptions>,
    ) -> Self {
        let overall = analyze(&exam.questions, responses, options);
        let by_variant = analyze_by_variant(variants, &exam.questions, responses, options);
        let anomalies =
            detect_variant_anomalies(&overall, &by_variant, ANOMALY_DIFFICULTY_THRESHOLD);
        let integrity = integrity.map(|o| analyze_integrity(variants, responses, o));

        tracing::debug!(
            exam = %exam.id,
            students = responses.len(),
            anomalies = anomalies.len(),
            "analysis report built"
        );

        Self {
            id: Uuid::new_v4(),
            created_at: Utc::now(),
            exam: ExamSummary {
                id: exam.id.clone(),
                name: exam.name.clone(),
                question_count: exam.questions.len(),
                max_score: exam.max_score(),
                variant_count: variants.len(),
            },
            overall,
            by_variant,
            anomalies,
            integrity,
        }
    }

    /// Save the report as JSON to a file.
    pub fn save_json(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self).context("failed to serialize report")?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, json)
            .with_context(|| format!("failed to write report to {}", path.display()))?;
        Ok(())
    }

    /// Load a report from a JSON file.
    pub fn load_json(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read report from {}", path.display()))?;
        let report: AnalysisReport =
            serde_json::from_str(&content).context("failed to parse report JSON")?;
        Ok(report)
    }

    /// Format the report as markdown.
    pub fn to_markdown(&self) -> String {
        let mut md = String::new();
        let summary = &self.overall.summary;

        md.push_str(&format!("## {} ({})\n\n", self.exam.name, self.exam.id));
        md.push_str(&format!(
            "**Summary:** {} students, {} items, {} variants, {} flagged items\n\n",
            summary.sample_size,
            summary.item_count,
            self.exam.variant_count,
            summary.flagged_items
        ));
        md.push_str(&format!(
            "Mean score {} of {}, SD {}, reliability (alpha) {}\n\n",
            fmt_opt(summary.score_mean),
            self.exam.max_score,
            fmt_opt(summary.score_std_dev),
            fmt_opt(summary.reliability)
        ));

        md.push_str("### Items\n\n");
        md.push_str("| Question | Difficulty | Discrimination | Point-biserial | Flags |\n");
        md.push_str("|----------|------------|----------------|----------------|-------|\n");
        for item in &self.overall.items {
            let flags: Vec<String> = item.flags.iter().map(|f| format!("{f:?}")).collect();
            md.push_str(&format!(
                "| {} | {} | {} | {} | {} |\n",
                item.question_id,
                fmt_opt(item.difficulty_index),
                fmt_opt(item.discrimination_index),
                fmt_opt(item.point_biserial),
                flags.join(", ")
            ));
        }
        md.push('\n');

        if !self.anomalies.is_empty() {
            md.push_str("### Variant anomalies\n\n");
            md.push_str("| Variant | Question | Reason |\n");
            md.push_str("|---------|----------|--------|\n");
            for a in &self.anomalies {
                md.push_str(&format!(
                    "| {} | {} | {} |\n",
                    a.variant_code, a.question_id, a.reason
                ));
            }
            md.push('\n');
        }

        if let Some(integrity) = &self.integrity {
            md.push_str("### Integrity\n\n");
            md.push_str(&format!(
                "{} students, {} pairs compared, {} similar pairs, {} key matches, {} duplicate variants\n",
                integrity.students_analyzed,
                integrity.pairs_compared,
                integrity.similarity_flags.len(),
                integrity.key_flags.len(),
                integrity.duplicate_variants.len()
            ));
        }

        md
    }

    /// Compare item difficulty against a baseline administration.
    pub fn compare(&self, baseline: &AnalysisReport, threshold: f64) -> DriftReport {
        let difficulty_map = |report: &AnalysisReport| -> HashMap<String, f64> {
            report
                .overall
                .items
                .iter()
                .filter_map(|i| i.difficulty_index.map(|d| (i.question_id.clone(), d)))
                .collect()
        };

        let baseline_difficulty = difficulty_map(baseline);
        let current_difficulty = difficulty_map(self);

        let mut easier = Vec::new();
        let mut harder = Vec::new();
        let mut stable = 0usize;
        let mut new_items = 0usize;

        for (question_id, &current) in &current_difficulty {
            let Some(&baseline_val) = baseline_difficulty.get(question_id) else {
                new_items += 1;
                continue;
            };
            let drift = ItemDrift {
                question_id: question_id.clone(),
                baseline_difficulty: baseline_val,
                current_difficulty: current,
                delta: current - baseline_val,
            };
            if drift.delta > threshold {
                easier.push(drift);
            } else if drift.delta < -threshold {
                harder.push(drift);
            } else {
                stable += 1;
            }
        }
        easier.sort_by(|a, b| a.question_id.cmp(&b.question_id));
        harder.sort_by(|a, b| a.question_id.cmp(&b.question_id));

        let removed_items = baseline_difficulty
            .keys()
            .filter(|k| !current_difficulty.contains_key(*k))
            .count();

        DriftReport {
            easier,
            harder,
            stable,
            new_items,
            removed_items,
        }
    }
}

fn fmt_opt(value: Option<f64>) -> String {
    value.map_or_else(|| "n/a".to_string(), |v| format!("{v:.2}"))
}

/// Result of comparing two administrations of an exam.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DriftReport {
    /// Items answered correctly more often than before.
    pub easier: Vec<ItemDrift>,
    /// Items answered correctly less often than before.
    pub harder: Vec<ItemDrift>,
    pub stable: usize,
    /// Items in current but not baseline.
    pub new_items: usize,
    /// Items in baseline but not current.
    pub removed_items: usize,
}

/// Difficulty change of one item.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ItemDrift {
    pub question_id: String,
    pub baseline_difficulty: f64,
    pub current_difficulty: f64,
    pub delta: f64,
}

impl DriftReport {
    /// Format the drift report as markdown.
    pub fn to_markdown(&self) -> String {
        let mut md = String::new();

        md.push_str(&format!(
            "**Summary:** {} easier, {} harder, {} stable\n\n",
            self.easier.len(),
            self.harder.len(),
            self.stable
        ));

        for (title, drifts) in [("Harder", &self.harder), ("Easier", &self.easier)] {
            if drifts.is_empty() {
                continue;
            }
            md.push_str(&format!("### {title}\n\n"));
            md.push_str("| Question | Baseline | Current | Delta |\n");
            md.push_str("|----------|----------|---------|-------|\n");
            for d in drifts {
                md.push_str(&format!(
                    "| {} | {:.2} | {:.2} | {:+.2} |\n",
                    d.question_id, d.baseline_difficulty, d.current_difficulty, d.delta
                ));
            }
            md.push('\n');
        }

        md
    }

    /// Returns true if any item moved beyond the threshold.
    pub fn has_drift(&self) -> bool {
        !self.easier.is_empty() || !self.harder.is_empty()
    }
}
