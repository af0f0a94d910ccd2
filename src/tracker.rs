//! Session progress: pass records, snapshots, strategy metrics, reports.
//!
//! ```text
//!   PassRecord log      append-only, index == pass number - 1
//!   Snapshot ring       bounded FIFO, baseline (pass 0) never evicted
//!   StrategyMetrics     running aggregates, never recomputed from history
//! ```
//!
//! The tracker owns the audit trail for one optimization session. Nothing
//! here validates content; the optimizer feeds it scores and issue lists
//! and asks for the final report at the end.

use anyhow::{bail, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use uuid::Uuid;

use crate::improvement::{analyze_trend, TrendAnalysis};
use crate::models::{Content, Issue, TerminationReason};

/// One validate-correct cycle, immutable once appended.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PassRecord {
    pub pass_number: u32,
    pub before_score: f64,
    pub after_score: f64,
    pub issues_before: Vec<Issue>,
    pub issues_after: Vec<Issue>,
    pub corrections: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub strategy_used: Option<String>,
    pub improvement: f64,
}

/// Content state captured after a pass, for rollback.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Snapshot {
    pub pass_number: u32,
    pub label: String,
    pub timestamp: DateTime<Utc>,
    pub score: f64,
    pub content: Content,
    pub content_hash: String,
}

/// Bounded FIFO over snapshots. The baseline snapshot (pass 0) is the
/// rollback floor and is never evicted.
#[derive(Debug)]
struct SnapshotRing {
    capacity: usize,
    snapshots: Vec<Snapshot>,
}

impl SnapshotRing {
    fn new(capacity: usize) -> SnapshotRing {
        SnapshotRing {
            capacity: capacity.max(1),
            snapshots: Vec::new(),
        }
    }

    fn push(&mut self, snapshot: Snapshot) {
        if self.snapshots.len() >= self.capacity.max(2) {
            // Index 0 is the baseline; evict the oldest pass snapshot.
            self.snapshots.remove(1);
        }
        self.snapshots.push(snapshot);
    }

    fn find(&self, pass_number: u32) -> Option<&Snapshot> {
        self.snapshots.iter().find(|s| s.pass_number == pass_number)
    }

    fn baseline(&self) -> Option<&Snapshot> {
        self.snapshots.first()
    }

    fn latest(&self) -> Option<&Snapshot> {
        self.snapshots.last()
    }

    fn len(&self) -> usize {
        self.snapshots.len()
    }
}

/// Per-strategy running aggregates.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StrategyMetrics {
    pub name: String,
    pub times_used: u32,
    pub successes: u32,
    pub cumulative_score_improvement: f64,
    pub cumulative_issues_resolved: i64,
    pub average_score_improvement: f64,
    pub average_issues_resolved: f64,
    pub success_rate: f64,
}

impl StrategyMetrics {
    fn new(name: &str) -> StrategyMetrics {
        StrategyMetrics {
            name: name.to_string(),
            times_used: 0,
            successes: 0,
            cumulative_score_improvement: 0.0,
            cumulative_issues_resolved: 0,
            average_score_improvement: 0.0,
            average_issues_resolved: 0.0,
            success_rate: 0.0,
        }
    }

    fn record(&mut self, score_improvement: f64, issues_resolved: i64) {
        self.times_used += 1;
        if score_improvement > 0.0 {
            self.successes += 1;
        }
        self.cumulative_score_improvement += score_improvement;
        self.cumulative_issues_resolved += issues_resolved;
        self.average_score_improvement =
            self.cumulative_score_improvement / f64::from(self.times_used);
        self.average_issues_resolved =
            self.cumulative_issues_resolved as f64 / f64::from(self.times_used);
        self.success_rate = f64::from(self.successes) / f64::from(self.times_used);
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct SessionSummary {
    pub session_id: String,
    pub focus_keyword: String,
    pub started_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ended_at: Option<DateTime<Utc>>,
    pub total_passes: u32,
    pub compliance_achieved: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub termination_reason: Option<TerminationReason>,
    pub initial_score: f64,
    pub final_score: f64,
}

/// First snapshot vs. latest, plus efficiency.
#[derive(Debug, Clone, Serialize)]
pub struct ProgressComparison {
    pub initial_score: f64,
    pub final_score: f64,
    pub total_improvement: f64,
    /// Score gained per pass; zero when no passes ran.
    pub efficiency: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct SessionReport {
    pub summary: SessionSummary,
    pub pass_history: Vec<PassRecord>,
    pub strategy_effectiveness: Vec<StrategyMetrics>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub trend: Option<TrendAnalysis>,
    pub comparison: ProgressComparison,
}

pub struct ProgressTracker {
    session_id: String,
    focus_keyword: String,
    started_at: DateTime<Utc>,
    ended_at: Option<DateTime<Utc>>,
    compliance_achieved: bool,
    termination_reason: Option<TerminationReason>,
    passes: Vec<PassRecord>,
    snapshots: SnapshotRing,
    strategies: BTreeMap<String, StrategyMetrics>,
}

impl ProgressTracker {
    /// Open a session and pin the baseline snapshot.
    pub fn start_session(
        content: &Content,
        focus_keyword: &str,
        baseline_score: f64,
        snapshot_capacity: usize,
    ) -> ProgressTracker {
        let mut snapshots = SnapshotRing::new(snapshot_capacity);
        snapshots.push(Snapshot {
            pass_number: 0,
            label: "initial".to_string(),
            timestamp: Utc::now(),
            score: baseline_score,
            content: content.clone(),
            content_hash: content.content_hash(),
        });
        ProgressTracker {
            session_id: Uuid::new_v4().to_string(),
            focus_keyword: focus_keyword.to_string(),
            started_at: Utc::now(),
            ended_at: None,
            compliance_achieved: false,
            termination_reason: None,
            passes: Vec::new(),
            snapshots,
            strategies: BTreeMap::new(),
        }
    }

    #[allow(clippy::too_many_arguments)]
    pub fn record_pass(
        &mut self,
        pass_number: u32,
        after: &Content,
        before_score: f64,
        after_score: f64,
        issues_before: Vec<Issue>,
        issues_after: Vec<Issue>,
        corrections: Vec<String>,
        strategy: Option<&str>,
    ) -> Result<()> {
        let expected = self.passes.len() as u32 + 1;
        if pass_number != expected {
            bail!("pass {pass_number} recorded out of order, expected {expected}");
        }

        let improvement = after_score - before_score;
        let issues_resolved = issues_before.len() as i64 - issues_after.len() as i64;

        if let Some(name) = strategy {
            self.strategies
                .entry(name.to_string())
                .or_insert_with(|| StrategyMetrics::new(name))
                .record(improvement, issues_resolved);
        }

        self.passes.push(PassRecord {
            pass_number,
            before_score,
            after_score,
            issues_before,
            issues_after,
            corrections,
            strategy_used: strategy.map(str::to_string),
            improvement,
        });
        self.snapshots.push(Snapshot {
            pass_number,
            label: format!("pass_{pass_number}"),
            timestamp: Utc::now(),
            score: after_score,
            content: after.clone(),
            content_hash: after.content_hash(),
        });
        Ok(())
    }

    pub fn end_session(&mut self, compliance_achieved: bool, reason: TerminationReason) {
        self.ended_at = Some(Utc::now());
        self.compliance_achieved = compliance_achieved;
        self.termination_reason = Some(reason);
    }

    /// Content as it stood after `pass_number` (0 = input baseline), if the
    /// snapshot is still in the ring.
    pub fn rollback_to_pass(&self, pass_number: u32) -> Option<Content> {
        self.snapshots.find(pass_number).map(|s| s.content.clone())
    }

    pub fn pass_count(&self) -> u32 {
        self.passes.len() as u32
    }

    pub fn passes(&self) -> &[PassRecord] {
        &self.passes
    }

    pub fn snapshot_count(&self) -> usize {
        self.snapshots.len()
    }

    pub fn generate_report(&self) -> SessionReport {
        let initial_score = self.snapshots.baseline().map(|s| s.score).unwrap_or(0.0);
        let final_score = self
            .snapshots
            .latest()
            .map(|s| s.score)
            .unwrap_or(initial_score);
        let deltas: Vec<f64> = self.passes.iter().map(|p| p.improvement).collect();
        let total_improvement = final_score - initial_score;
        let efficiency = if self.passes.is_empty() {
            0.0
        } else {
            total_improvement / self.passes.len() as f64
        };

        SessionReport {
            summary: SessionSummary {
                session_id: self.session_id.clone(),
                focus_keyword: self.focus_keyword.clone(),
                started_at: self.started_at,
                ended_at: self.ended_at,
                total_passes: self.pass_count(),
                compliance_achieved: self.compliance_achieved,
                termination_reason: self.termination_reason,
                initial_score,
                final_score,
            },
            pass_history: self.passes.clone(),
            strategy_effectiveness: self.strategies.values().cloned().collect(),
            trend: analyze_trend(&deltas, final_score),
            comparison: ProgressComparison {
                initial_score,
                final_score,
                total_improvement,
                efficiency,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn content(body: &str) -> Content {
        Content {
            body: body.to_string(),
            ..Content::default()
        }
    }

    fn tracker() -> ProgressTracker {
        ProgressTracker::start_session(&content("baseline"), "rust", 40.0, 3)
    }

    #[test]
    fn test_passes_append_in_order_only() {
        let mut t = tracker();
        t.record_pass(1, &content("p1"), 40.0, 55.0, vec![], vec![], vec![], None)
            .unwrap();
        assert!(t
            .record_pass(3, &content("p3"), 55.0, 60.0, vec![], vec![], vec![], None)
            .is_err());
        assert_eq!(t.pass_count(), 1);
        assert_eq!(t.passes()[0].pass_number, 1);
        assert!((t.passes()[0].improvement - 15.0).abs() < 1e-9);
    }

    #[test]
    fn test_ring_evicts_oldest_pass_but_never_baseline() {
        let mut t = tracker();
        for n in 1..=5 {
            t.record_pass(
                n,
                &content(&format!("p{n}")),
                40.0,
                40.0 + n as f64,
                vec![],
                vec![],
                vec![],
                None,
            )
            .unwrap();
        }
        // Capacity 3: baseline + the two newest pass snapshots.
        assert_eq!(t.snapshot_count(), 3);
        assert_eq!(t.rollback_to_pass(0).unwrap().body, "baseline");
        assert!(t.rollback_to_pass(1).is_none());
        assert!(t.rollback_to_pass(3).is_none());
        assert_eq!(t.rollback_to_pass(5).unwrap().body, "p5");
    }

    #[test]
    fn test_strategy_metrics_run_incrementally() {
        let mut t = tracker();
        t.record_pass(
            1,
            &content("p1"),
            40.0,
            60.0,
            vec![
                crate::models::Issue::new(crate::models::IssueKind::TitleTooShort, "", "", ""),
                crate::models::Issue::new(crate::models::IssueKind::ImagesMissing, "", "", ""),
            ],
            vec![],
            vec!["title".to_string()],
            Some("adjust_title"),
        )
        .unwrap();
        t.record_pass(
            2,
            &content("p2"),
            60.0,
            58.0,
            vec![],
            vec![],
            vec![],
            Some("adjust_title"),
        )
        .unwrap();

        let report = t.generate_report();
        let metrics = &report.strategy_effectiveness[0];
        assert_eq!(metrics.name, "adjust_title");
        assert_eq!(metrics.times_used, 2);
        assert_eq!(metrics.successes, 1);
        assert!((metrics.cumulative_score_improvement - 18.0).abs() < 1e-9);
        assert!((metrics.average_score_improvement - 9.0).abs() < 1e-9);
        assert!((metrics.success_rate - 0.5).abs() < 1e-9);
        assert_eq!(metrics.cumulative_issues_resolved, 2);
    }

    #[test]
    fn test_report_summary_and_efficiency() {
        let mut t = tracker();
        t.record_pass(1, &content("p1"), 40.0, 60.0, vec![], vec![], vec![], None)
            .unwrap();
        t.record_pass(2, &content("p2"), 60.0, 80.0, vec![], vec![], vec![], None)
            .unwrap();
        t.end_session(false, TerminationReason::MaxIterationsReached);

        let report = t.generate_report();
        assert_eq!(report.summary.total_passes, 2);
        assert_eq!(
            report.summary.termination_reason,
            Some(TerminationReason::MaxIterationsReached)
        );
        assert!((report.comparison.initial_score - 40.0).abs() < 1e-9);
        assert!((report.comparison.final_score - 80.0).abs() < 1e-9);
        assert!((report.comparison.total_improvement - 40.0).abs() < 1e-9);
        assert!((report.comparison.efficiency - 20.0).abs() < 1e-9);
        let trend = report.trend.unwrap();
        assert!((trend.velocity - 20.0).abs() < 1e-9);
    }

    #[test]
    fn test_rollback_returns_none_when_past_the_ring() {
        let t = tracker();
        assert!(t.rollback_to_pass(7).is_none());
        assert_eq!(t.rollback_to_pass(0).unwrap().body, "baseline");
    }
}
