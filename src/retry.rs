//! Bounded retry with failure classification and strategy learning.
//!
//! ```text
//!   op fails ──▶ classify error ──▶ pick strategy ──▶ adapt params
//!                     │                  ▲                 │
//!                     │                  │ learned         ▼
//!                     │            KvStore record     sleep(backoff)
//!                     ▼                                    │
//!                 Critical? ── yes ──▶ stop          retry op ◀──┘
//! ```
//!
//! Each failed attempt maps the error text onto a named correction strategy
//! through a regex pattern table; the strategy's parameters grow more
//! aggressive with every attempt. Outcomes feed per-signature counters in
//! the persistent store so a strategy that worked on similar content is
//! preferred the next time the same kind of failure shows up.
//!
//! Backoff sleeps are plain `std::thread::sleep` calls. There is no way to
//! cancel an in-flight delay; callers that need cancellation must bound
//! `max_attempts` and the delay ceiling instead.

use anyhow::{Context, Result};
use regex::Regex;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::analysis;
use crate::config::RetryConfig;
use crate::models::Content;
use crate::store::KvStore;

/// Learned strategy records outlive any single session but should not pin
/// stale preferences forever.
const LEARNED_STRATEGY_TTL: Duration = Duration::from_secs(30 * 24 * 3600);

/// Word-count bucket width for content signatures. Two articles within the
/// same bucket are "similar" for strategy-reuse purposes.
const SIGNATURE_BUCKET_WORDS: usize = 250;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureClass {
    /// Unrecoverable; retrying cannot help.
    Critical,
    /// Transient; retry with backoff.
    Recoverable,
    /// Partial success; retry, caller may proceed with reduced output.
    Degraded,
    /// Logged only, no retry.
    Informational,
}

pub fn classify_failure(error_text: &str) -> FailureClass {
    let lower = error_text.to_lowercase();
    if ["fatal", "panic", "unrecoverable", "cannot continue"]
        .iter()
        .any(|needle| lower.contains(needle))
    {
        FailureClass::Critical
    } else if ["notice", "informational", "skipped"]
        .iter()
        .any(|needle| lower.contains(needle))
    {
        FailureClass::Informational
    } else if ["partial", "degraded", "incomplete"]
        .iter()
        .any(|needle| lower.contains(needle))
    {
        FailureClass::Degraded
    } else {
        // Timeouts, rate limits, and validation failures all land here:
        // anything not clearly hopeless is worth another attempt.
        FailureClass::Recoverable
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DegradationLevel {
    Minor,
    Moderate,
    Severe,
}

impl DegradationLevel {
    /// `ratio` is succeeded sub-operations over total sub-operations.
    pub fn from_ratio(ratio: f64) -> DegradationLevel {
        if ratio >= 0.7 {
            DegradationLevel::Minor
        } else if ratio >= 0.4 {
            DegradationLevel::Moderate
        } else {
            DegradationLevel::Severe
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            DegradationLevel::Minor => "minor",
            DegradationLevel::Moderate => "moderate",
            DegradationLevel::Severe => "severe",
        }
    }
}

/// A named bundle of correction parameters, adapted per attempt.
#[derive(Debug, Clone, PartialEq)]
pub struct CorrectionStrategy {
    pub name: String,
    pub target_length_delta: i64,
    pub reduction_pct: f64,
}

impl CorrectionStrategy {
    /// Parameters grow with the attempt number so repeated failures push
    /// correctors harder instead of repeating the losing move.
    pub fn adapted(name: &str, attempt: u32) -> CorrectionStrategy {
        CorrectionStrategy {
            name: name.to_string(),
            target_length_delta: 5 * i64::from(attempt),
            reduction_pct: (0.3 + 0.1 * f64::from(attempt)).min(0.9),
        }
    }
}

/// Context handed to the retried operation on every attempt.
#[derive(Debug, Clone)]
pub struct RetryContext {
    pub focus_keyword: String,
    pub secondary_keywords: Vec<String>,
    pub attempt: u32,
    pub strategy: Option<CorrectionStrategy>,
}

impl RetryContext {
    pub fn new(focus_keyword: &str, secondary_keywords: &[String]) -> RetryContext {
        RetryContext {
            focus_keyword: focus_keyword.to_string(),
            secondary_keywords: secondary_keywords.to_vec(),
            attempt: 0,
            strategy: None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct RetryAttempt {
    pub attempt: u32,
    pub error: Option<String>,
    pub strategy: Option<String>,
    pub delay_ms: u64,
}

#[derive(Debug, Clone)]
pub struct RetryOutcome {
    pub success: bool,
    pub content: Option<Content>,
    pub error: Option<String>,
    pub attempts: u32,
    pub total_time_ms: u64,
    pub history: Vec<RetryAttempt>,
    pub strategy: Option<String>,
    pub degradation: Option<DegradationLevel>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct LearnedStrategy {
    strategy: String,
    successes: u32,
    failures: u32,
}

pub struct RetryManager {
    config: RetryConfig,
    patterns: Vec<(Regex, &'static str)>,
    store: Option<Arc<dyn KvStore>>,
}

impl RetryManager {
    pub fn new(config: RetryConfig) -> Result<RetryManager> {
        Ok(RetryManager {
            config,
            patterns: compile_patterns()?,
            store: None,
        })
    }

    pub fn with_store(config: RetryConfig, store: Arc<dyn KvStore>) -> Result<RetryManager> {
        let mut manager = RetryManager::new(config)?;
        manager.store = Some(store);
        Ok(manager)
    }

    /// Backoff before the next attempt after attempt `attempt` failed.
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let exp = attempt.saturating_sub(1);
        let raw = self.config.base_delay_ms as f64 * self.config.backoff_multiplier.powi(exp as i32);
        let capped = raw.min(self.config.max_delay_ms as f64);
        Duration::from_millis(capped as u64)
    }

    /// Map an error onto a strategy name via the pattern table, preferring a
    /// learned strategy when this content/error signature has a winning
    /// record in the store.
    pub fn choose_strategy(&self, content: &Content, focus_keyword: &str, error_text: &str) -> String {
        let kind = self.match_pattern(error_text);
        if let Some(store) = &self.store {
            let key = learned_key(content, focus_keyword, kind);
            if let Ok(Some(raw)) = store.get(&key) {
                if let Ok(learned) = serde_json::from_str::<LearnedStrategy>(&raw) {
                    if learned.successes > learned.failures {
                        return learned.strategy;
                    }
                }
            }
        }
        kind.to_string()
    }

    fn match_pattern(&self, error_text: &str) -> &'static str {
        for (pattern, name) in &self.patterns {
            if pattern.is_match(error_text) {
                return name;
            }
        }
        "general_correction"
    }

    fn record_outcome(
        &self,
        content: &Content,
        focus_keyword: &str,
        kind: &str,
        strategy_name: &str,
        success: bool,
    ) {
        let Some(store) = &self.store else {
            return;
        };
        let key = learned_key(content, focus_keyword, kind);
        let mut learned = match store.get(&key) {
            Ok(Some(raw)) => serde_json::from_str(&raw).unwrap_or(LearnedStrategy {
                strategy: strategy_name.to_string(),
                successes: 0,
                failures: 0,
            }),
            _ => LearnedStrategy {
                strategy: strategy_name.to_string(),
                successes: 0,
                failures: 0,
            },
        };
        if success {
            // A success overrides whatever strategy the record held before.
            learned.strategy = strategy_name.to_string();
            learned.successes += 1;
        } else {
            learned.failures += 1;
        }
        if let Ok(raw) = serde_json::to_string(&learned) {
            // Learning is best-effort; a store failure never fails a retry.
            let _ = store.set(&key, &raw, LEARNED_STRATEGY_TTL);
        }
    }

    /// Run `op` until it succeeds or attempts are exhausted. Every failed
    /// attempt classifies the error, adapts a correction strategy for the
    /// next attempt, and sleeps the backoff delay. Critical and
    /// informational failures stop immediately.
    pub fn execute_with_retry<F>(
        &self,
        mut op: F,
        content: &Content,
        ctx: &RetryContext,
    ) -> RetryOutcome
    where
        F: FnMut(&Content, &RetryContext) -> Result<Content>,
    {
        let started = Instant::now();
        let mut history = Vec::new();
        let mut strategy: Option<CorrectionStrategy> = None;
        let mut last_kind: Option<&'static str> = None;
        let mut last_error = None;

        let mut attempt = 0;
        while attempt < self.config.max_attempts {
            attempt += 1;
            let attempt_ctx = RetryContext {
                focus_keyword: ctx.focus_keyword.clone(),
                secondary_keywords: ctx.secondary_keywords.clone(),
                attempt,
                strategy: strategy.clone(),
            };

            match op(content, &attempt_ctx) {
                Ok(result) => {
                    if let (Some(applied), Some(kind)) = (&strategy, last_kind) {
                        self.record_outcome(content, &ctx.focus_keyword, kind, &applied.name, true);
                    }
                    history.push(RetryAttempt {
                        attempt,
                        error: None,
                        strategy: strategy.as_ref().map(|s| s.name.clone()),
                        delay_ms: 0,
                    });
                    return RetryOutcome {
                        success: true,
                        content: Some(result),
                        error: None,
                        attempts: attempt,
                        total_time_ms: started.elapsed().as_millis() as u64,
                        history,
                        strategy: strategy.map(|s| s.name),
                        degradation: None,
                    };
                }
                Err(err) => {
                    let text = format!("{err:#}");
                    let class = classify_failure(&text);
                    let kind = self.match_pattern(&text);
                    let name = self.choose_strategy(content, &ctx.focus_keyword, &text);
                    let next = CorrectionStrategy::adapted(&name, attempt);
                    let delay = if attempt < self.config.max_attempts {
                        self.delay_for(attempt)
                    } else {
                        Duration::ZERO
                    };
                    history.push(RetryAttempt {
                        attempt,
                        error: Some(text.clone()),
                        strategy: Some(next.name.clone()),
                        delay_ms: delay.as_millis() as u64,
                    });
                    strategy = Some(next);
                    last_kind = Some(kind);
                    last_error = Some(text);

                    match class {
                        FailureClass::Critical | FailureClass::Informational => break,
                        FailureClass::Recoverable | FailureClass::Degraded => {}
                    }
                    if attempt < self.config.max_attempts && !delay.is_zero() {
                        // Blocking and uncancellable; see module docs.
                        std::thread::sleep(delay);
                    }
                }
            }
        }

        if let (Some(applied), Some(kind)) = (&strategy, last_kind) {
            self.record_outcome(content, &ctx.focus_keyword, kind, &applied.name, false);
        }
        RetryOutcome {
            success: false,
            content: None,
            error: last_error,
            attempts: attempt,
            total_time_ms: started.elapsed().as_millis() as u64,
            history,
            strategy: strategy.map(|s| s.name),
            degradation: Some(DegradationLevel::from_ratio(0.0)),
        }
    }
}

/// `strategy:{hash}` where the hash covers a coarse word-count bucket, the
/// focus keyword, and the error kind. Coarse on purpose: exact-content keys
/// would never see a second hit.
fn learned_key(content: &Content, focus_keyword: &str, kind: &str) -> String {
    let bucket = analysis::word_count(&content.body) / SIGNATURE_BUCKET_WORDS;
    let mut hasher = Sha256::new();
    hasher.update(bucket.to_le_bytes());
    hasher.update([0]);
    hasher.update(focus_keyword.as_bytes());
    hasher.update([0]);
    hasher.update(kind.as_bytes());
    format!("strategy:{}", hex::encode(&hasher.finalize()[..16]))
}

fn compile_patterns() -> Result<Vec<(Regex, &'static str)>> {
    let table: [(&str, &'static str); 5] = [
        (r"(?i)meta description", "adjust_meta_length"),
        (r"(?i)keyword (density|missing|stuffing)|density", "adjust_keyword_density"),
        (
            r"(?i)flesch|readability|sentence|paragraph|passive|transition",
            "improve_readability",
        ),
        (r"(?i)title", "adjust_title"),
        (r"(?i)image|alt text", "fix_images"),
    ];
    table
        .into_iter()
        .map(|(pattern, name)| {
            let regex = Regex::new(pattern)
                .with_context(|| format!("Invalid retry classification pattern: {pattern}"))?;
            Ok((regex, name))
        })
        .collect()
}
