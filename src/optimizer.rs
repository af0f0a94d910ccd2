//! Multi-pass optimization loop.
//!
//! ```text
//!   baseline ──▶ compliant? ──▶ done (initial_compliance)
//!       │
//!       ▼
//!   pass N: retry { validate + correct } ──▶ structure check ──▶ record
//!       │                                         │
//!       │                              violated? roll back, re-score
//!       ▼
//!   terminate on: compliance, max passes, stagnation,
//!                 insufficient improvement
//!       │
//!       ▼
//!   re-validate best pass ──▶ outcome + session report
//! ```
//!
//! The optimizer never returns worse content than it was given: the best
//! scoring pass wins, and a structure violation rolls the pass back to its
//! input. Each pass runs under the retry manager, so a pass that fails to
//! improve the score is re-attempted with adapted correction parameters
//! before it counts against the stagnation budget.

use anyhow::{anyhow, Result};
use std::sync::Arc;

use crate::cache::{CacheStats, ValidationCache};
use crate::config::Config;
use crate::improvement::ImprovementTracker;
use crate::log::{LogSink, NoLog};
use crate::models::{Content, Issue, TerminationReason, ValidationResult};
use crate::pipeline::ValidationPipeline;
use crate::retry::{RetryContext, RetryManager};
use crate::store::{JsonFileStore, KvStore};
use crate::tracker::{ProgressTracker, SessionReport};
use crate::traits::{CorrectorRegistry, HeuristicPreserver, StructurePreserver};

/// Everything a caller gets back from one optimization session.
#[derive(Debug)]
pub struct OptimizationOutcome {
    /// The best content the loop produced (the input itself when nothing
    /// improved on it).
    pub content: Content,
    /// Validation of `content`, with the winning pass's corrections attached.
    pub result: ValidationResult,
    pub best_score: f64,
    pub termination_reason: TerminationReason,
    pub report: SessionReport,
    pub cache_stats: CacheStats,
}

pub struct MultiPassOptimizer {
    config: Config,
    pipeline: ValidationPipeline,
    retry: RetryManager,
    preserver: Box<dyn StructurePreserver>,
    improvement: ImprovementTracker,
    log: Arc<dyn LogSink>,
    cache: Arc<ValidationCache>,
}

impl MultiPassOptimizer {
    /// Build the full engine from a config. A `store.path` wires the same
    /// persistent store into both the cache and the retry manager's
    /// strategy learning.
    pub fn new(config: Config) -> Result<MultiPassOptimizer> {
        let (cache, retry) = match &config.store.path {
            Some(path) => {
                let store: Arc<dyn KvStore> = Arc::new(JsonFileStore::open(path)?);
                let cache = ValidationCache::with_persistent(
                    config.cache.clone(),
                    Arc::clone(&store),
                );
                let retry = RetryManager::with_store(config.retry.clone(), store)?;
                (cache, retry)
            }
            None => (
                ValidationCache::new(config.cache.clone()),
                RetryManager::new(config.retry.clone())?,
            ),
        };
        let cache = Arc::new(cache);
        let pipeline = ValidationPipeline::new(config.clone(), Arc::clone(&cache));
        Ok(MultiPassOptimizer {
            config,
            pipeline,
            retry,
            preserver: Box::new(HeuristicPreserver),
            improvement: ImprovementTracker::new(),
            log: Arc::new(NoLog),
            cache,
        })
    }

    pub fn with_log_sink(mut self, log: Arc<dyn LogSink>) -> MultiPassOptimizer {
        self.pipeline = self.pipeline.with_log_sink(Arc::clone(&log));
        self.log = log;
        self
    }

    /// Titles already published elsewhere; used for duplicate detection.
    pub fn with_known_titles(mut self, titles: Vec<String>) -> MultiPassOptimizer {
        self.pipeline = self.pipeline.with_known_titles(titles);
        self
    }

    /// Swap in a custom corrector set.
    pub fn with_correctors(mut self, correctors: CorrectorRegistry) -> MultiPassOptimizer {
        self.pipeline = self.pipeline.with_correctors(correctors);
        self
    }

    /// Swap in a custom structure guard.
    pub fn with_preserver(mut self, preserver: Box<dyn StructurePreserver>) -> MultiPassOptimizer {
        self.preserver = preserver;
        self
    }

    pub fn cache(&self) -> &ValidationCache {
        &self.cache
    }

    /// Run the loop until the content is compliant or a termination rule
    /// fires. Never panics and never returns worse content than it got.
    pub fn optimize(
        &mut self,
        content: &Content,
        focus_keyword: &str,
        secondary_keywords: &[String],
    ) -> OptimizationOutcome {
        let target = self.config.optimizer.target_compliance_score;
        let baseline = self
            .pipeline
            .validate_only(content, focus_keyword, secondary_keywords);
        let mut tracker = ProgressTracker::start_session(
            content,
            focus_keyword,
            baseline.overall_score,
            self.config.optimizer.snapshot_capacity,
        );
        self.log.info(&format!(
            "baseline score {:.1}, {} issue(s)",
            baseline.overall_score,
            baseline.issue_count()
        ));

        if baseline.is_valid || baseline.overall_score >= target {
            tracker.end_session(true, TerminationReason::InitialCompliance);
            return OptimizationOutcome {
                content: content.clone(),
                best_score: baseline.overall_score,
                result: baseline,
                termination_reason: TerminationReason::InitialCompliance,
                report: tracker.generate_report(),
                cache_stats: self.cache.stats(),
            };
        }

        let mut best_content = content.clone();
        let mut best_score = baseline.overall_score;
        let mut best_result = baseline.clone();
        let mut current = content.clone();
        let mut current_score = baseline.overall_score;
        let mut current_issues: Vec<Issue> = baseline.all_issues().cloned().collect();
        let mut stagnant_passes = 0u32;
        let mut compliance_achieved = false;
        let mut reason = TerminationReason::MaxIterationsReached;

        for pass in 1..=self.config.optimizer.max_iterations {
            let mut last_result: Option<ValidationResult> = None;
            let outcome = {
                let pipeline = &mut self.pipeline;
                let retry = &self.retry;
                let captured = &mut last_result;
                let pass_input_score = current_score;
                let ctx = RetryContext::new(focus_keyword, secondary_keywords);
                retry.execute_with_retry(
                    |input, rctx| {
                        let result = pipeline.validate_and_correct_with(
                            input,
                            &rctx.focus_keyword,
                            &rctx.secondary_keywords,
                            rctx.strategy.as_ref(),
                        );
                        let corrected = result
                            .corrected_content
                            .clone()
                            .unwrap_or_else(|| input.clone());
                        let accepted = result.is_valid
                            || result.overall_score >= target
                            || result.overall_score > pass_input_score;
                        let error = result
                            .all_issues()
                            .max_by_key(|i| i.priority)
                            .map(|i| i.description.clone())
                            .unwrap_or_else(|| "no measurable improvement".to_string());
                        *captured = Some(result);
                        if accepted {
                            Ok(corrected)
                        } else {
                            Err(anyhow!(error))
                        }
                    },
                    &current,
                    &ctx,
                )
            };

            let Some(pass_result) = last_result else {
                // The pass produced no validation result at all. Return the
                // best content seen so far rather than nothing.
                let description = outcome
                    .error
                    .unwrap_or_else(|| "validation pass produced no result".to_string());
                self.log.error(&format!("pass {pass} failed: {description}"));
                tracker.end_session(false, TerminationReason::ValidationError);
                return OptimizationOutcome {
                    content: best_content,
                    result: ValidationResult::failure(description),
                    best_score,
                    termination_reason: TerminationReason::ValidationError,
                    report: tracker.generate_report(),
                    cache_stats: self.cache.stats(),
                };
            };

            // A retry that never improved still leaves its last candidate;
            // the structure guard and best-score tracking judge it.
            let candidate = outcome.content.unwrap_or_else(|| {
                pass_result
                    .corrected_content
                    .clone()
                    .unwrap_or_else(|| current.clone())
            });

            let preserved = self.preserver.preserve_content(&current, &candidate);
            let (next_content, next_result) = if preserved.preserved {
                (preserved.content, pass_result)
            } else {
                self.log.warn(&format!(
                    "pass {pass} rolled back: {}",
                    preserved.violations.join("; ")
                ));
                let revalidated =
                    self.pipeline
                        .validate_only(&preserved.content, focus_keyword, secondary_keywords);
                (preserved.content, revalidated)
            };
            let after_score = next_result.overall_score;

            let measured = self.improvement.validate_and_measure(
                &self.pipeline,
                &current,
                &next_content,
                focus_keyword,
                secondary_keywords,
                pass,
            );
            self.log.info(&measured.summary);

            let strategy_name = outcome
                .strategy
                .unwrap_or_else(|| "auto_correction".to_string());
            let issues_after: Vec<Issue> = next_result.all_issues().cloned().collect();
            if let Err(err) = tracker.record_pass(
                pass,
                &next_content,
                current_score,
                after_score,
                std::mem::take(&mut current_issues),
                issues_after.clone(),
                next_result.corrections_made.clone(),
                Some(&strategy_name),
            ) {
                self.log.warn(&format!("pass bookkeeping failed: {err:#}"));
            }

            let improvement_over_best = after_score - best_score;
            if after_score > best_score {
                best_score = after_score;
                best_content = next_content.clone();
                best_result = next_result.clone();
            }
            let pre_pass_stagnant = stagnant_passes;
            if improvement_over_best < self.config.optimizer.min_improvement_threshold {
                stagnant_passes += 1;
            } else {
                stagnant_passes = 0;
            }

            current = next_content;
            current_score = after_score;
            current_issues = issues_after;

            if next_result.is_valid || after_score >= target {
                compliance_achieved = true;
                reason = TerminationReason::ComplianceAchieved;
                break;
            }
            if self.config.optimizer.enable_early_termination {
                if stagnant_passes >= self.config.optimizer.stagnation_threshold {
                    reason = TerminationReason::StagnationDetected;
                    break;
                }
                if pre_pass_stagnant >= 1
                    && improvement_over_best < self.config.optimizer.min_improvement_threshold
                {
                    reason = TerminationReason::InsufficientImprovement;
                    break;
                }
            }
        }

        // The reported result always reflects the returned content, not the
        // last pass.
        let mut final_result =
            self.pipeline
                .validate_only(&best_content, focus_keyword, secondary_keywords);
        if best_content != *content {
            final_result.corrected_content = Some(best_content.clone());
        }
        final_result.corrections_made = best_result.corrections_made.clone();
        final_result.step_failures = best_result.step_failures.clone();
        if final_result.is_valid || final_result.overall_score >= target {
            compliance_achieved = true;
        }

        tracker.end_session(compliance_achieved, reason);
        self.log.info(&format!(
            "session over: {} after {} pass(es), score {:.1} -> {:.1}",
            reason.as_str(),
            tracker.pass_count(),
            baseline.overall_score,
            best_score
        ));

        OptimizationOutcome {
            content: best_content,
            result: final_result,
            best_score,
            termination_reason: reason,
            report: tracker.generate_report(),
            cache_stats: self.cache.stats(),
        }
    }
}
