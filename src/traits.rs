//! Extension traits for custom analyzers, correctors, and structure guards.
//!
//! This module provides the trait-based extension system for the engine.
//! Users can implement [`Analyzer`], [`Corrector`], and [`StructurePreserver`]
//! in Rust to replace or extend the built-in heuristics.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────┐
//! │            CorrectorRegistry             │
//! │  ┌─────────────────────┐ ┌────────────┐ │
//! │  │ Built-in            │ │  Custom    │ │
//! │  │ meta/density/read-  │ │  (Rust)    │ │
//! │  │ ability/title/image │ │            │ │
//! │  └─────────────────────┘ └────────────┘ │
//! └──────────────┬───────────────────────────┘
//!                ▼
//!    validate_and_correct() → optimization loop
//! ```
//!
//! # Usage
//!
//! ```rust
//! use seo_refinery::traits::CorrectorRegistry;
//!
//! let mut correctors = CorrectorRegistry::with_builtins();
//! // correctors.register(Box::new(MyCorrector::new()));
//! ```

use anyhow::Result;
use rand::rngs::StdRng;

use crate::analysis;
use crate::config::ThresholdsConfig;
use crate::models::{Aspect, Content, IssueKind};

// ═══════════════════════════════════════════════════════════════════════
// Analyzer Trait
// ═══════════════════════════════════════════════════════════════════════

/// A named metric over prose text.
///
/// Analyzers are the read-only half of the extension surface: each one
/// reduces a text to a single number (a percentage, a score, a length).
/// The `seo validate` report lists every registered analyzer with its
/// measured value.
///
/// # Example
///
/// ```rust
/// use seo_refinery::traits::Analyzer;
///
/// pub struct ExclamationRate;
///
/// impl Analyzer for ExclamationRate {
///     fn name(&self) -> &str { "exclamation_rate" }
///
///     fn analyze(&self, text: &str) -> f64 {
///         let total = text.chars().count().max(1);
///         let bangs = text.chars().filter(|c| *c == '!').count();
///         bangs as f64 / total as f64 * 100.0
///     }
/// }
/// ```
pub trait Analyzer: Send + Sync {
    /// Metric identifier, lowercase with underscores.
    fn name(&self) -> &str;

    /// Measure the metric over markup-stripped prose.
    fn analyze(&self, text: &str) -> f64;
}

/// Keyword density percentage for a fixed keyword.
pub struct KeywordDensityAnalyzer {
    keyword: String,
}

impl KeywordDensityAnalyzer {
    pub fn new(keyword: impl Into<String>) -> Self {
        Self {
            keyword: keyword.into(),
        }
    }
}

impl Analyzer for KeywordDensityAnalyzer {
    fn name(&self) -> &str {
        "keyword_density"
    }

    fn analyze(&self, text: &str) -> f64 {
        analysis::keyword_density(text, &self.keyword)
    }
}

/// Flesch reading ease.
pub struct FleschAnalyzer;

impl Analyzer for FleschAnalyzer {
    fn name(&self) -> &str {
        "flesch_score"
    }

    fn analyze(&self, text: &str) -> f64 {
        analysis::flesch_score(text)
    }
}

/// Percentage of sentences in passive voice.
pub struct PassiveVoiceAnalyzer;

impl Analyzer for PassiveVoiceAnalyzer {
    fn name(&self) -> &str {
        "passive_voice_pct"
    }

    fn analyze(&self, text: &str) -> f64 {
        analysis::passive_voice_pct(text)
    }
}

/// Percentage of sentences containing a transition word.
pub struct TransitionWordAnalyzer;

impl Analyzer for TransitionWordAnalyzer {
    fn name(&self) -> &str {
        "transition_word_pct"
    }

    fn analyze(&self, text: &str) -> f64 {
        analysis::transition_word_pct(text)
    }
}

/// Percentage of sentences over the word limit.
pub struct LongSentenceAnalyzer {
    max_words: usize,
}

impl LongSentenceAnalyzer {
    pub fn new(max_words: usize) -> Self {
        Self { max_words }
    }
}

impl Analyzer for LongSentenceAnalyzer {
    fn name(&self) -> &str {
        "long_sentence_pct"
    }

    fn analyze(&self, text: &str) -> f64 {
        analysis::long_sentence_pct(text, self.max_words)
    }
}

// ═══════════════════════════════════════════════════════════════════════
// Corrector Trait
// ═══════════════════════════════════════════════════════════════════════

/// Knobs a corrector receives per invocation.
///
/// The retry manager adapts these between attempts: failed corrections get
/// progressively larger `target_length_delta` and `reduction_pct` values.
#[derive(Debug, Clone)]
pub struct CorrectionOptions {
    pub thresholds: ThresholdsConfig,
    /// Issue kinds the detector raised for this aspect. Most correctors
    /// re-derive what to fix from the content; checks that need external
    /// state (title uniqueness) rely on this instead.
    pub detected: Vec<IssueKind>,
    /// Extra characters of headroom when regenerating length-bounded text.
    pub target_length_delta: i64,
    /// Fraction of excess to remove when trimming, capped at 0.9.
    pub reduction_pct: f64,
}

impl CorrectionOptions {
    pub fn new(thresholds: ThresholdsConfig) -> Self {
        Self {
            thresholds,
            detected: Vec::new(),
            target_length_delta: 0,
            reduction_pct: 0.3,
        }
    }

    pub fn with_detected(mut self, detected: Vec<IssueKind>) -> Self {
        self.detected = detected;
        self
    }
}

/// A correction capability for one aspect.
///
/// Implement this trait to replace a built-in corrector or add behavior the
/// engine does not ship. Correctors receive the content immutably and return
/// a new record; the pipeline re-validates every returned value, so a
/// corrector that makes things worse costs a pass but never corrupts state.
///
/// # Lifecycle
///
/// 1. The corrector is registered via [`CorrectorRegistry::register`].
/// 2. When validation of its aspect fails and auto-correction is enabled,
///    [`correct`](Corrector::correct) is called with the current content.
/// 3. The returned content is re-validated before being accepted.
///
/// # Example
///
/// ```rust
/// use anyhow::Result;
/// use rand::rngs::StdRng;
/// use seo_refinery::models::{Aspect, Content};
/// use seo_refinery::traits::{CorrectionOptions, Corrector};
///
/// pub struct UppercaseTitleCorrector;
///
/// impl Corrector for UppercaseTitleCorrector {
///     fn aspect(&self) -> Aspect { Aspect::Title }
///     fn name(&self) -> &str { "uppercase_title" }
///     fn description(&self) -> &str { "Capitalize the first letter of the title" }
///
///     fn correct(
///         &self,
///         content: &Content,
///         _focus_keyword: &str,
///         _secondary_keywords: &[String],
///         _opts: &CorrectionOptions,
///         _rng: &mut StdRng,
///     ) -> Result<Content> {
///         let mut fixed = content.clone();
///         let mut chars = fixed.title.chars();
///         if let Some(first) = chars.next() {
///             fixed.title = first.to_uppercase().chain(chars).collect();
///         }
///         Ok(fixed)
///     }
/// }
/// ```
pub trait Corrector: Send + Sync {
    /// The aspect this corrector repairs.
    fn aspect(&self) -> Aspect;

    /// Corrector identifier, lowercase with underscores.
    fn name(&self) -> &str;

    /// One-line description used in reports.
    fn description(&self) -> &str;

    /// Produce a corrected copy of `content`.
    ///
    /// The RNG is seeded by the session, so template and synonym choices
    /// are reproducible across runs with the same seed.
    fn correct(
        &self,
        content: &Content,
        focus_keyword: &str,
        secondary_keywords: &[String],
        opts: &CorrectionOptions,
        rng: &mut StdRng,
    ) -> Result<Content>;
}

// ═══════════════════════════════════════════════════════════════════════
// StructurePreserver Trait
// ═══════════════════════════════════════════════════════════════════════

/// Structural fingerprint of a content record, taken before a pass.
#[derive(Debug, Clone, PartialEq)]
pub struct StructureSnapshot {
    pub heading_count: usize,
    pub image_prompt_count: usize,
    pub body_word_count: usize,
}

/// Result of a structure check: either the corrected content, or the
/// pre-correction content rolled back with the violations that forced it.
#[derive(Debug, Clone)]
pub struct PreservationOutcome {
    pub preserved: bool,
    pub violations: Vec<String>,
    pub content: Content,
}

/// Guard against corrections that destroy document structure.
///
/// A corrector fixing keyword density must not drop half the article to do
/// it. Implementations compare the before/after records and either accept
/// the correction or roll back to the original.
pub trait StructurePreserver: Send + Sync {
    /// Capture the structural fingerprint of a record.
    fn snapshot(&self, content: &Content) -> StructureSnapshot;

    /// Accept `after`, or roll back to `before` and report why.
    fn preserve_content(&self, before: &Content, after: &Content) -> PreservationOutcome;
}

/// Minimum fraction of the original body word count a correction may
/// leave behind.
const BODY_SURVIVAL_RATIO: f64 = 0.5;

/// Built-in preserver: heading survival, image-prompt survival, and a
/// body-truncation guard.
pub struct HeuristicPreserver;

impl StructurePreserver for HeuristicPreserver {
    fn snapshot(&self, content: &Content) -> StructureSnapshot {
        StructureSnapshot {
            heading_count: analysis::headings(&content.body).len(),
            image_prompt_count: content.image_prompts.len(),
            body_word_count: analysis::word_count(&content.body),
        }
    }

    fn preserve_content(&self, before: &Content, after: &Content) -> PreservationOutcome {
        let was = self.snapshot(before);
        let now = self.snapshot(after);
        let mut violations = Vec::new();

        if now.heading_count < was.heading_count {
            violations.push(format!(
                "headings dropped from {} to {}",
                was.heading_count, now.heading_count
            ));
        }
        if now.image_prompt_count < was.image_prompt_count {
            violations.push(format!(
                "image prompts dropped from {} to {}",
                was.image_prompt_count, now.image_prompt_count
            ));
        }
        let floor = (was.body_word_count as f64 * BODY_SURVIVAL_RATIO) as usize;
        if now.body_word_count < floor {
            violations.push(format!(
                "body shrank from {} to {} words",
                was.body_word_count, now.body_word_count
            ));
        }

        if violations.is_empty() {
            PreservationOutcome {
                preserved: true,
                violations,
                content: after.clone(),
            }
        } else {
            PreservationOutcome {
                preserved: false,
                violations,
                content: before.clone(),
            }
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════
// Registries
// ═══════════════════════════════════════════════════════════════════════

/// Registry for correctors (built-in and custom).
///
/// Use [`CorrectorRegistry::with_builtins`] to create a registry pre-loaded
/// with one corrector per aspect, then optionally call
/// [`register`](CorrectorRegistry::register) to add or shadow entries.
/// Lookup returns the most recently registered corrector for an aspect, so
/// custom implementations override built-ins.
pub struct CorrectorRegistry {
    correctors: Vec<Box<dyn Corrector>>,
}

impl CorrectorRegistry {
    /// Create an empty corrector registry.
    pub fn new() -> Self {
        Self {
            correctors: Vec::new(),
        }
    }

    /// Create a registry pre-loaded with the built-in correctors.
    pub fn with_builtins() -> Self {
        use crate::correct::{
            ImageCorrector, KeywordDensityCorrector, MetaDescriptionCorrector,
            ReadabilityCorrector, TitleCorrector,
        };

        let mut registry = Self::new();
        registry.register(Box::new(MetaDescriptionCorrector));
        registry.register(Box::new(KeywordDensityCorrector));
        registry.register(Box::new(ReadabilityCorrector));
        registry.register(Box::new(TitleCorrector));
        registry.register(Box::new(ImageCorrector));
        registry
    }

    /// Register a corrector.
    pub fn register(&mut self, corrector: Box<dyn Corrector>) {
        self.correctors.push(corrector);
    }

    /// Find the active corrector for an aspect (last registered wins).
    pub fn find(&self, aspect: Aspect) -> Option<&dyn Corrector> {
        self.correctors
            .iter()
            .rev()
            .find(|c| c.aspect() == aspect)
            .map(|c| c.as_ref())
    }

    /// Get all registered correctors.
    pub fn correctors(&self) -> &[Box<dyn Corrector>] {
        &self.correctors
    }

    /// Check if the registry is empty.
    pub fn is_empty(&self) -> bool {
        self.correctors.is_empty()
    }

    /// Return the count of registered correctors.
    pub fn len(&self) -> usize {
        self.correctors.len()
    }
}

impl Default for CorrectorRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// Analyzers shown in the `seo validate` metric table.
pub fn builtin_analyzers(
    focus_keyword: &str,
    thresholds: &ThresholdsConfig,
) -> Vec<Box<dyn Analyzer>> {
    vec![
        Box::new(KeywordDensityAnalyzer::new(focus_keyword)),
        Box::new(FleschAnalyzer),
        Box::new(PassiveVoiceAnalyzer),
        Box::new(TransitionWordAnalyzer),
        Box::new(LongSentenceAnalyzer::new(thresholds.max_sentence_words)),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ImagePrompt;

    fn content_with(body: &str, images: usize) -> Content {
        Content {
            title: "Title".to_string(),
            body: body.to_string(),
            meta_description: String::new(),
            excerpt: String::new(),
            primary_keyword: String::new(),
            secondary_keywords: vec![],
            image_prompts: (0..images)
                .map(|i| ImagePrompt {
                    prompt: format!("image {}", i),
                    alt: String::new(),
                })
                .collect(),
            internal_links: vec![],
            external_links: vec![],
        }
    }

    #[test]
    fn test_registry_with_builtins_covers_every_aspect() {
        let registry = CorrectorRegistry::with_builtins();
        assert_eq!(registry.len(), 5);
        for aspect in Aspect::ALL {
            assert!(registry.find(aspect).is_some(), "no corrector for {aspect}");
        }
    }

    #[test]
    fn test_last_registered_corrector_wins() {
        struct NoopTitle;
        impl Corrector for NoopTitle {
            fn aspect(&self) -> Aspect {
                Aspect::Title
            }
            fn name(&self) -> &str {
                "noop_title"
            }
            fn description(&self) -> &str {
                "does nothing"
            }
            fn correct(
                &self,
                content: &Content,
                _focus_keyword: &str,
                _secondary_keywords: &[String],
                _opts: &CorrectionOptions,
                _rng: &mut StdRng,
            ) -> Result<Content> {
                Ok(content.clone())
            }
        }

        let mut registry = CorrectorRegistry::with_builtins();
        registry.register(Box::new(NoopTitle));
        assert_eq!(registry.find(Aspect::Title).unwrap().name(), "noop_title");
    }

    #[test]
    fn test_preserver_accepts_equivalent_content() {
        let preserver = HeuristicPreserver;
        let before = content_with("# H1\n\nSome body text here.", 1);
        let after = content_with("# H1\n\nSome improved body text here.", 1);
        let outcome = preserver.preserve_content(&before, &after);
        assert!(outcome.preserved);
        assert_eq!(outcome.content, after);
    }

    #[test]
    fn test_preserver_rolls_back_dropped_headings() {
        let preserver = HeuristicPreserver;
        let before = content_with("# H1\n\nBody.\n\n## H2\n\nMore.", 0);
        let after = content_with("Body.\n\nMore.", 0);
        let outcome = preserver.preserve_content(&before, &after);
        assert!(!outcome.preserved);
        assert_eq!(outcome.content, before);
        assert!(outcome.violations[0].contains("headings"));
    }

    #[test]
    fn test_preserver_rolls_back_truncated_body() {
        let preserver = HeuristicPreserver;
        let long_body = "word ".repeat(100);
        let before = content_with(&long_body, 0);
        let after = content_with("word word word.", 0);
        let outcome = preserver.preserve_content(&before, &after);
        assert!(!outcome.preserved);
        assert!(outcome.violations[0].contains("shrank"));
    }

    #[test]
    fn test_preserver_rolls_back_lost_images() {
        let preserver = HeuristicPreserver;
        let before = content_with("Body text.", 2);
        let after = content_with("Body text.", 1);
        let outcome = preserver.preserve_content(&before, &after);
        assert!(!outcome.preserved);
    }

    #[test]
    fn test_builtin_analyzers_report_metrics() {
        let analyzers = builtin_analyzers("rust", &ThresholdsConfig::default());
        let text = "Rust is fast. However, learning rust takes time.";
        let named: Vec<(String, f64)> = analyzers
            .iter()
            .map(|a| (a.name().to_string(), a.analyze(text)))
            .collect();
        let density = named
            .iter()
            .find(|(name, _)| name == "keyword_density")
            .unwrap();
        assert!(density.1 > 0.0);
        assert_eq!(named.len(), 5);
    }
}
