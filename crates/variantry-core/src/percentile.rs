//! Student ranking and percentile filtering.

use serde::{Deserialize, Serialize};

use crate::error::ExamError;
use crate::model::StudentResponse;

/// One student's standing within a cohort.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StudentScore {
    pub student_id: String,
    pub variant_code: String,
    pub total_score: f64,
    pub max_possible_score: f64,
    /// `total / max * 100`, or 0 when nothing was scorable.
    pub percentage: f64,
    /// Dense rank, 1 for the best score.
    pub rank: usize,
    pub percentile: f64,
}

/// Percentile window `[from, to)`. A window ending at 100 includes 100.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PercentileRange {
    pub from: f64,
    pub to: f64,
}

impl PercentileRange {
    pub fn new(from: f64, to: f64) -> Result<Self, ExamError> {
        let range = Self { from, to };
        range.validate()?;
        Ok(range)
    }

    pub fn validate(&self) -> Result<(), ExamError> {
        if !(0.0..=100.0).contains(&self.from) || !(0.0..=100.0).contains(&self.to) {
            return Err(ExamError::InvalidConfiguration(format!(
                "percentile range [{}, {}) must lie within 0..=100",
                self.from, self.to
            )));
        }
        if self.from >= self.to {
            return Err(ExamError::InvalidConfiguration(format!(
                "percentile range [{}, {}) is empty",
                self.from, self.to
            )));
        }
        Ok(())
    }

    pub fn contains(&self, percentile: f64) -> bool {
        percentile >= self.from
            && (percentile < self.to || (self.to >= 100.0 && percentile <= self.to))
    }
}

/// Rank a cohort best-first by percentage. Ties share a rank and keep input
/// order.
pub fn rank_students(students: &[StudentResponse]) -> Vec<StudentScore> {
    let mut scored: Vec<(&StudentResponse, f64)> = students
        .iter()
        .map(|s| (s, percentage(s.total_score, s.max_possible_score)))
        .collect();
    scored.sort_by(|a, b| b.1.total_cmp(&a.1));

    let mut ranks = Vec::with_capacity(scored.len());
    let mut rank = 0usize;
    let mut previous: Option<f64> = None;
    for (_, pct) in &scored {
        if previous != Some(*pct) {
            rank += 1;
            previous = Some(*pct);
        }
        ranks.push(rank);
    }
    let distinct = rank;

    scored
        .into_iter()
        .zip(ranks)
        .map(|((s, pct), rank)| StudentScore {
            student_id: s.student_id.clone(),
            variant_code: s.variant_code.clone(),
            total_score: s.total_score,
            max_possible_score: s.max_possible_score,
            percentage: pct,
            rank,
            percentile: (distinct - rank + 1) as f64 / distinct as f64 * 100.0,
        })
        .collect()
}

fn percentage(total: f64, max: f64) -> f64 {
    if max > 0.0 {
        total / max * 100.0
    } else {
        0.0
    }
}

/// Rank a cohort and keep the students whose percentile falls in `range`.
pub fn filter_by_percentile(
    students: &[StudentResponse],
    range: PercentileRange,
) -> Result<Vec<StudentScore>, ExamError> {
    range.validate()?;
    let ranked = rank_students(students);
    let kept = filter_scores(&ranked, range);
    tracing::debug!(
        "{} of {} students in percentile range [{}, {})",
        kept.len(),
        ranked.len(),
        range.from,
        range.to
    );
    Ok(kept)
}

/// Filter already-ranked scores without re-ranking.
pub fn filter_scores(scores: &[StudentScore], range: PercentileRange) -> Vec<StudentScore> {
    scores
        .iter()
        .filter(|s| range.contains(s.percentile))
        .cloned()
        .collect()
}
