//! Classical item analysis over scored responses.
//!
//! Per question: difficulty, discrimination (upper/lower groups),
//! corrected point-biserial correlation, distractor breakdown and a
//! significance flag. Per exam: means of the defined item statistics,
//! Cronbach's alpha and the score distribution.
//!
//! The point-biserial target is the total score *minus the item's own
//! points*, so an item never correlates with itself.

use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Serialize};

use crate::model::{option_text_eq, ItemResponse, Question, QuestionKind, StudentResponse, Variant};
use crate::statistics::{
    correlation_t, mean, mean_defined, pearson, population_variance, sample_variance,
    two_tailed_critical,
};

/// Share of respondents that must pick a distractor for it to count as functional.
const FUNCTIONAL_DISTRACTOR_RATE: f64 = 0.05;
const LOW_DISCRIMINATION: f64 = 0.2;
const TOO_EASY: f64 = 0.9;
const TOO_HARD: f64 = 0.2;

/// Knobs for an analysis run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisOptions {
    /// Respondents needed before a statistic counts as reliable.
    pub min_sample_size: usize,
    /// Confidence level of the significance test, in (0, 1).
    pub confidence_level: f64,
    /// Share of respondents in each of the upper and lower groups.
    pub group_fraction: f64,
    pub include_distractors: bool,
    pub include_point_biserial: bool,
    pub include_reliability: bool,
}

impl Default for AnalysisOptions {
    fn default() -> Self {
        Self {
            min_sample_size: 10,
            confidence_level: 0.95,
            group_fraction: 0.27,
            include_distractors: true,
            include_point_biserial: true,
            include_reliability: true,
        }
    }
}

impl AnalysisOptions {
    fn sanitized(&self) -> Self {
        let mut options = self.clone();
        if !(self.confidence_level > 0.0 && self.confidence_level < 1.0) {
            tracing::warn!(
                "confidence level {} out of range, using 0.95",
                self.confidence_level
            );
            options.confidence_level = 0.95;
        }
        if !(self.group_fraction > 0.0 && self.group_fraction <= 0.5) {
            tracing::warn!(
                "group fraction {} out of range, using 0.27",
                self.group_fraction
            );
            options.group_fraction = 0.27;
        }
        options
    }
}

/// A quality note attached to an item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ItemFlag {
    /// Fewer respondents than `min_sample_size`.
    InsufficientSample,
    /// Lower scorers outperform upper scorers; check the key.
    NegativeDiscrimination,
    LowDiscrimination,
    TooEasy,
    TooHard,
    /// At least one distractor is rarely chosen or attracts upper scorers.
    NonFunctionalDistractor,
}

/// Selection breakdown for one option.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DistractorStats {
    /// Original option text.
    pub option: String,
    pub is_correct: bool,
    pub count: usize,
    pub rate: f64,
    pub upper_count: usize,
    pub lower_count: usize,
    /// Distractor: chosen by enough respondents and more by the lower group.
    /// Keyed option: chosen at least as often by the upper group.
    pub is_functional: bool,
}

/// Statistics for one question.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ItemStatistics {
    pub question_id: String,
    pub kind: QuestionKind,
    pub difficulty_index: Option<f64>,
    pub discrimination_index: Option<f64>,
    pub point_biserial: Option<f64>,
    pub correct_count: usize,
    pub total_count: usize,
    /// Respondents with no resolvable answer.
    pub omitted_count: usize,
    pub distractors: Vec<DistractorStats>,
    pub is_reliable: bool,
    pub is_significant: bool,
    pub flags: Vec<ItemFlag>,
}

/// Exam-level aggregates.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisSummary {
    /// Number of students.
    pub sample_size: usize,
    pub item_count: usize,
    /// Items with at least one respondent.
    pub analysed_items: usize,
    pub average_difficulty: Option<f64>,
    pub average_discrimination: Option<f64>,
    pub average_point_biserial: Option<f64>,
    /// Cronbach's alpha.
    pub reliability: Option<f64>,
    pub score_mean: Option<f64>,
    /// Population standard deviation of total scores.
    pub score_std_dev: Option<f64>,
    pub flagged_items: usize,
}

/// Full analysis of one response pool.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisResult {
    /// Set when the pool is a single variant.
    pub variant_code: Option<String>,
    pub summary: AnalysisSummary,
    pub items: Vec<ItemStatistics>,
}

impl AnalysisResult {
    /// Statistics for a question.
    pub fn item(&self, question_id: &str) -> Option<&ItemStatistics> {
        self.items.iter().find(|i| i.question_id == question_id)
    }
}

/// Analyse all responses as one pool.
pub fn analyze(
    questions: &[Question],
    responses: &[StudentResponse],
    options: &AnalysisOptions,
) -> AnalysisResult {
    analyze_pool(questions, responses, options, None)
}

/// Analyse each variant's responses separately.
///
/// Every variant appears in the result, including ones without responses.
/// Responses for codes that are not in `variants` get their own entry.
pub fn analyze_by_variant(
    variants: &[Variant],
    questions: &[Question],
    responses: &[StudentResponse],
    options: &AnalysisOptions,
) -> BTreeMap<String, AnalysisResult> {
    let mut pools: BTreeMap<String, Vec<StudentResponse>> = variants
        .iter()
        .map(|v| (v.variant_code.clone(), Vec::new()))
        .collect();
    for r in responses {
        pools.entry(r.variant_code.clone()).or_default().push(r.clone());
    }

    pools
        .into_iter()
        .map(|(code, pool)| {
            let result = analyze_pool(questions, &pool, options, Some(code.clone()));
            (code, result)
        })
        .collect()
}

fn analyze_pool(
    questions: &[Question],
    responses: &[StudentResponse],
    options: &AnalysisOptions,
    variant_code: Option<String>,
) -> AnalysisResult {
    let options = options.sanitized();
    let critical = two_tailed_critical(options.confidence_level);

    let items: Vec<ItemStatistics> = questions
        .iter()
        .map(|q| analyze_item(q, responses, &options, critical))
        .collect();

    let reliability = if options.include_reliability {
        cronbach_alpha(questions, responses, &items)
    } else {
        None
    };

    let totals: Vec<f64> = responses.iter().map(|r| r.total_score).collect();
    let summary = AnalysisSummary {
        sample_size: responses.len(),
        item_count: items.len(),
        analysed_items: items.iter().filter(|i| i.total_count > 0).count(),
        average_difficulty: mean_defined(items.iter().map(|i| i.difficulty_index)),
        average_discrimination: mean_defined(items.iter().map(|i| i.discrimination_index)),
        average_point_biserial: mean_defined(items.iter().map(|i| i.point_biserial)),
        reliability,
        score_mean: mean(&totals),
        score_std_dev: population_variance(&totals).map(f64::sqrt),
        flagged_items: items
            .iter()
            .filter(|i| i.flags.iter().any(|f| *f != ItemFlag::InsufficientSample))
            .count(),
    };

    tracing::debug!(
        variant = variant_code.as_deref().unwrap_or("all"),
        students = summary.sample_size,
        items = summary.item_count,
        "analysis complete"
    );

    AnalysisResult {
        variant_code,
        summary,
        items,
    }
}

struct Respondent<'a> {
    total_score: f64,
    response: &'a ItemResponse,
}

fn analyze_item(
    question: &Question,
    responses: &[StudentResponse],
    options: &AnalysisOptions,
    critical: f64,
) -> ItemStatistics {
    let respondents: Vec<Respondent<'_>> = responses
        .iter()
        .filter_map(|s| {
            s.response_to(&question.id).map(|response| Respondent {
                total_score: s.total_score,
                response,
            })
        })
        .collect();

    let n = respondents.len();
    let correct_count = respondents.iter().filter(|r| r.response.is_correct).count();
    let omitted_count = respondents
        .iter()
        .filter(|r| r.response.selected_option.is_none())
        .count();
    let difficulty_index = (n > 0).then(|| correct_count as f64 / n as f64);

    // Highest totals first; ties keep input order.
    let mut ranked: Vec<&Respondent<'_>> = respondents.iter().collect();
    ranked.sort_by(|a, b| b.total_score.total_cmp(&a.total_score));
    let group_size = ((n as f64 * options.group_fraction).round() as usize)
        .max(1)
        .min(n / 2);
    let (upper, lower) = if group_size > 0 {
        (&ranked[..group_size], &ranked[n - group_size..])
    } else {
        (&ranked[..0], &ranked[..0])
    };

    let proportion_correct = |group: &[&Respondent<'_>]| {
        group.iter().filter(|r| r.response.is_correct).count() as f64 / group.len() as f64
    };
    let discrimination_index =
        (group_size > 0).then(|| proportion_correct(upper) - proportion_correct(lower));

    let point_biserial = if options.include_point_biserial {
        let xs: Vec<f64> = respondents
            .iter()
            .map(|r| if r.response.is_correct { 1.0 } else { 0.0 })
            .collect();
        let ys: Vec<f64> = respondents
            .iter()
            .map(|r| r.total_score - r.response.points_awarded)
            .collect();
        pearson(&xs, &ys)
    } else {
        None
    };

    let is_reliable = n > 0 && n >= options.min_sample_size;
    let is_significant = is_reliable
        && point_biserial
            .and_then(|r| correlation_t(r, n))
            .is_some_and(|t| t.abs() >= critical);

    let distractors = if options.include_distractors
        && question.kind == QuestionKind::MultipleChoice
    {
        distractor_breakdown(question, &respondents, upper, lower)
    } else {
        Vec::new()
    };

    let mut flags = Vec::new();
    if !is_reliable {
        flags.push(ItemFlag::InsufficientSample);
    }
    if let Some(d) = discrimination_index {
        if d < 0.0 {
            flags.push(ItemFlag::NegativeDiscrimination);
        } else if d < LOW_DISCRIMINATION {
            flags.push(ItemFlag::LowDiscrimination);
        }
    }
    if let Some(p) = difficulty_index {
        if p > TOO_EASY {
            flags.push(ItemFlag::TooEasy);
        } else if p < TOO_HARD {
            flags.push(ItemFlag::TooHard);
        }
    }
    if distractors.iter().any(|d| !d.is_correct && !d.is_functional) {
        flags.push(ItemFlag::NonFunctionalDistractor);
    }

    ItemStatistics {
        question_id: question.id.clone(),
        kind: question.kind,
        difficulty_index,
        discrimination_index,
        point_biserial,
        correct_count,
        total_count: n,
        omitted_count,
        distractors,
        is_reliable,
        is_significant,
        flags,
    }
}

fn distractor_breakdown(
    question: &Question,
    respondents: &[Respondent<'_>],
    upper: &[&Respondent<'_>],
    lower: &[&Respondent<'_>],
) -> Vec<DistractorStats> {
    let n = respondents.len();
    fn chose(response: &ItemResponse, option: &str) -> bool {
        response
            .selected_option
            .as_deref()
            .is_some_and(|s| option_text_eq(s, option))
    }

    question
        .effective_options()
        .iter()
        .map(|option| {
            let count = respondents.iter().filter(|r| chose(r.response, option)).count();
            let upper_count = upper.iter().filter(|r| chose(r.response, option)).count();
            let lower_count = lower.iter().filter(|r| chose(r.response, option)).count();
            let rate = if n > 0 { count as f64 / n as f64 } else { 0.0 };
            let is_correct = option_text_eq(option, &question.correct_answer);
            let is_functional = if is_correct {
                upper_count >= lower_count
            } else {
                rate >= FUNCTIONAL_DISTRACTOR_RATE && lower_count > upper_count
            };
            DistractorStats {
                option: option.clone(),
                is_correct,
                count,
                rate,
                upper_count,
                lower_count,
                is_functional,
            }
        })
        .collect()
}

/// Cronbach's alpha over the students who answered every analysed item.
///
/// `alpha = k/(k-1) * (1 - sum(item variances) / variance(total))`, using
/// sample variances of the awarded points. The total variance is the sum of
/// the item covariance matrix.
fn cronbach_alpha(
    questions: &[Question],
    responses: &[StudentResponse],
    items: &[ItemStatistics],
) -> Option<f64> {
    let analysed: Vec<&str> = questions
        .iter()
        .zip(items)
        .filter(|(_, stats)| stats.total_count > 0)
        .map(|(q, _)| q.id.as_str())
        .collect();
    let k = analysed.len();
    if k < 2 {
        return None;
    }

    let rows: Vec<Vec<f64>> = responses
        .iter()
        .filter_map(|s| {
            let points: HashMap<&str, f64> = s
                .responses
                .iter()
                .map(|r| (r.question_id.as_str(), r.points_awarded))
                .collect();
            analysed
                .iter()
                .map(|id| points.get(id).copied())
                .collect::<Option<Vec<f64>>>()
        })
        .collect();
    if rows.len() < 2 {
        return None;
    }

    let item_variance_sum: f64 = (0..k)
        .map(|j| {
            let column: Vec<f64> = rows.iter().map(|row| row[j]).collect();
            sample_variance(&column).unwrap_or(0.0)
        })
        .sum();
    let totals: Vec<f64> = rows.iter().map(|row| row.iter().sum()).collect();
    let total_variance = sample_variance(&totals)?;
    if total_variance <= f64::EPSILON {
        return None;
    }

    let k = k as f64;
    Some(k / (k - 1.0) * (1.0 - item_variance_sum / total_variance))
}

/// A per-variant item whose behaviour departs from the pooled analysis.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VariantAnomaly {
    pub variant_code: String,
    pub question_id: String,
    pub variant_difficulty: Option<f64>,
    pub overall_difficulty: Option<f64>,
    pub variant_discrimination: Option<f64>,
    pub overall_discrimination: Option<f64>,
    pub reason: String,
}

/// Items whose per-variant difficulty or discrimination diverges from the
/// pool, which usually means a key error on that variant only.
///
/// Only reliable per-variant statistics are compared.
pub fn detect_variant_anomalies(
    overall: &AnalysisResult,
    by_variant: &BTreeMap<String, AnalysisResult>,
    difficulty_threshold: f64,
) -> Vec<VariantAnomaly> {
    let mut anomalies = Vec::new();

    for (code, result) in by_variant {
        for item in result.items.iter().filter(|i| i.is_reliable) {
            let Some(pooled) = overall.item(&item.question_id) else {
                continue;
            };

            let mut reasons = Vec::new();
            if let (Some(v), Some(o)) = (item.difficulty_index, pooled.difficulty_index) {
                if (v - o).abs() >= difficulty_threshold {
                    reasons.push(format!("difficulty {v:.2} vs {o:.2} overall"));
                }
            }
            if let (Some(v), Some(o)) = (item.discrimination_index, pooled.discrimination_index) {
                if v < 0.0 && o > 0.0 {
                    reasons.push(format!("discrimination {v:.2} vs {o:.2} overall"));
                }
            }

            if !reasons.is_empty() {
                anomalies.push(VariantAnomaly {
                    variant_code: code.clone(),
                    question_id: item.question_id.clone(),
                    variant_difficulty: item.difficulty_index,
                    overall_difficulty: pooled.difficulty_index,
                    variant_discrimination: item.discrimination_index,
                    overall_discrimination: pooled.discrimination_index,
                    reason: reasons.join("; "),
                });
            }
        }
    }

    anomalies
}
