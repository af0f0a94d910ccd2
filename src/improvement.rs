//! Before/after measurement and trend analysis.
//!
//! The tracker re-validates both sides of every pass through the pipeline's
//! cache, so measuring a pass costs one detector run at most. Score deltas
//! accumulate per session and feed the trend analysis the optimizer uses
//! for stagnation decisions and the final report.

use serde::{Deserialize, Serialize};

use crate::models::{Content, IssueKind, ValidationResult};
use crate::pipeline::ValidationPipeline;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrendDirection {
    Improving,
    Stable,
    Stagnating,
    Declining,
}

impl TrendDirection {
    pub fn as_str(&self) -> &'static str {
        match self {
            TrendDirection::Improving => "improving",
            TrendDirection::Stable => "stable",
            TrendDirection::Stagnating => "stagnating",
            TrendDirection::Declining => "declining",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrendAnalysis {
    pub direction: TrendDirection,
    /// Mean score delta across all recorded passes.
    pub velocity: f64,
    /// Estimated passes until a perfect score at the current velocity.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub passes_to_convergence: Option<u32>,
}

/// Direction from the mean of the last three deltas; velocity from all of
/// them. Needs at least two recorded passes.
pub fn analyze_trend(deltas: &[f64], current_score: f64) -> Option<TrendAnalysis> {
    if deltas.len() < 2 {
        return None;
    }
    let recent = &deltas[deltas.len().saturating_sub(3)..];
    let recent_mean = recent.iter().sum::<f64>() / recent.len() as f64;
    let direction = if recent_mean > 5.0 {
        TrendDirection::Improving
    } else if recent_mean < -2.0 {
        TrendDirection::Declining
    } else if recent_mean < 1.0 {
        TrendDirection::Stagnating
    } else {
        TrendDirection::Stable
    };
    let velocity = deltas.iter().sum::<f64>() / deltas.len() as f64;
    let passes_to_convergence = if velocity > 0.0 {
        Some(((100.0 - current_score) / velocity).ceil() as u32)
    } else {
        None
    };
    Some(TrendAnalysis {
        direction,
        velocity,
        passes_to_convergence,
    })
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Improvements {
    pub score_improvement: f64,
    pub issues_resolved: i64,
    pub resolved_issue_kinds: Vec<IssueKind>,
    pub new_issue_kinds: Vec<IssueKind>,
    pub persistent_issue_kinds: Vec<IssueKind>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ImprovementReport {
    pub original: ValidationResult,
    pub corrected: ValidationResult,
    pub improvements: Improvements,
    pub summary: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub trends: Option<TrendAnalysis>,
}

fn kinds_of(result: &ValidationResult) -> Vec<IssueKind> {
    let mut kinds = Vec::new();
    for issue in result.all_issues() {
        if !kinds.contains(&issue.kind) {
            kinds.push(issue.kind);
        }
    }
    kinds
}

#[derive(Debug, Default)]
pub struct ImprovementTracker {
    score_deltas: Vec<f64>,
    latest_score: f64,
}

impl ImprovementTracker {
    pub fn new() -> ImprovementTracker {
        ImprovementTracker::default()
    }

    /// Re-validate both sides of a pass and measure what changed. Trend
    /// analysis appears once two passes have been measured.
    pub fn validate_and_measure(
        &mut self,
        pipeline: &ValidationPipeline,
        before: &Content,
        after: &Content,
        focus_keyword: &str,
        secondary_keywords: &[String],
        pass_number: u32,
    ) -> ImprovementReport {
        let original = pipeline.validate_only(before, focus_keyword, secondary_keywords);
        let corrected = pipeline.validate_only(after, focus_keyword, secondary_keywords);

        let before_kinds = kinds_of(&original);
        let after_kinds = kinds_of(&corrected);
        let resolved: Vec<IssueKind> = before_kinds
            .iter()
            .copied()
            .filter(|k| !after_kinds.contains(k))
            .collect();
        let new_kinds: Vec<IssueKind> = after_kinds
            .iter()
            .copied()
            .filter(|k| !before_kinds.contains(k))
            .collect();
        let persistent: Vec<IssueKind> = before_kinds
            .iter()
            .copied()
            .filter(|k| after_kinds.contains(k))
            .collect();

        let score_improvement = corrected.overall_score - original.overall_score;
        let issues_resolved = original.issue_count() as i64 - corrected.issue_count() as i64;

        self.score_deltas.push(score_improvement);
        self.latest_score = corrected.overall_score;

        let summary = format!(
            "pass {}: score {:.1} -> {:.1} ({:+.1}), {} issue(s) resolved, {} new",
            pass_number,
            original.overall_score,
            corrected.overall_score,
            score_improvement,
            resolved.len(),
            new_kinds.len(),
        );

        let trends = analyze_trend(&self.score_deltas, self.latest_score);

        ImprovementReport {
            original,
            corrected,
            improvements: Improvements {
                score_improvement,
                issues_resolved,
                resolved_issue_kinds: resolved,
                new_issue_kinds: new_kinds,
                persistent_issue_kinds: persistent,
            },
            summary,
            trends,
        }
    }

    pub fn score_deltas(&self) -> &[f64] {
        &self.score_deltas
    }
}
