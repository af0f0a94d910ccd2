//! Aspect-ordered validation and correction pipeline.
//!
//! ```text
//!   for aspect in priority order:
//!       validate (cached) ──▶ issues? ──▶ correct ──▶ re-validate
//!                                             │
//!                                 worse or unchanged? drop it
//!   finally: full-detector pass over the result (cached)
//! ```
//!
//! Corrections interact: fixing keyword density can lengthen a paragraph the
//! readability step already approved. The final cross-aspect validation runs
//! the whole detector over the finished content so the reported result never
//! reflects a stale per-aspect view.

use rand::rngs::StdRng;
use rand::SeedableRng;
use std::sync::Arc;

use crate::cache::{context_hash, CacheTier, ValidationCache};
use crate::config::Config;
use crate::detector::{self, IssueDetector};
use crate::log::{LogSink, NoLog};
use crate::models::{Aspect, Content, Issue, ValidationResult};
use crate::retry::CorrectionStrategy;
use crate::traits::{CorrectionOptions, CorrectorRegistry};

fn tier_for(aspect: Aspect) -> CacheTier {
    match aspect {
        Aspect::KeywordDensity => CacheTier::KeywordAnalysis,
        Aspect::Readability => CacheTier::ReadabilityAnalysis,
        Aspect::Title => CacheTier::TitleUniqueness,
        // Meta and image checks are plain content measurements; the aspect
        // name in the cache context keeps their keys apart.
        Aspect::MetaDescription | Aspect::Images => CacheTier::ContentMetrics,
    }
}

pub struct ValidationPipeline {
    config: Config,
    detector: IssueDetector,
    correctors: CorrectorRegistry,
    cache: Arc<ValidationCache>,
    log: Arc<dyn LogSink>,
    rng: StdRng,
}

impl ValidationPipeline {
    pub fn new(config: Config, cache: Arc<ValidationCache>) -> ValidationPipeline {
        let rng = match config.optimizer.rng_seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        let detector = IssueDetector::new(config.thresholds.clone());
        ValidationPipeline {
            config,
            detector,
            correctors: CorrectorRegistry::with_builtins(),
            cache,
            log: Arc::new(NoLog),
            rng,
        }
    }

    pub fn with_log_sink(mut self, log: Arc<dyn LogSink>) -> ValidationPipeline {
        self.log = log;
        self
    }

    /// Titles already published elsewhere; used for duplicate detection.
    pub fn with_known_titles(mut self, titles: Vec<String>) -> ValidationPipeline {
        self.detector =
            IssueDetector::new(self.config.thresholds.clone()).with_known_titles(titles);
        self
    }

    /// Swap in a custom corrector set.
    pub fn with_correctors(mut self, correctors: CorrectorRegistry) -> ValidationPipeline {
        self.correctors = correctors;
        self
    }

    fn aspect_ctx(&self, aspect: Aspect, focus_keyword: &str, secondary_keywords: &[String]) -> String {
        let fingerprint = format!("{}:{}", self.config.thresholds.fingerprint(), aspect.as_str());
        context_hash(focus_keyword, secondary_keywords, &fingerprint)
    }

    /// Detect issues for one aspect, consulting the cache first. Cache
    /// failures fall through to a fresh detector run.
    fn validate_aspect(
        &self,
        aspect: Aspect,
        content: &Content,
        focus_keyword: &str,
        secondary_keywords: &[String],
    ) -> Vec<Issue> {
        let hash = content.content_hash();
        let ctx = self.aspect_ctx(aspect, focus_keyword, secondary_keywords);
        let tier = tier_for(aspect);
        if let Some(issues) = self.cache.get::<Vec<Issue>>(tier, &hash, &ctx) {
            return issues;
        }
        let issues = self
            .detector
            .detect_aspect(aspect, content, focus_keyword, secondary_keywords);
        if let Err(err) = self.cache.set(tier, &hash, &ctx, &issues) {
            self.log
                .warn(&format!("cache write failed for {}: {err:#}", aspect.as_str()));
        }
        issues
    }

    /// Validate in priority order, correcting each failing aspect when
    /// auto-correction is enabled, then run a final cross-aspect validation
    /// over whatever content survived.
    pub fn validate_and_correct(
        &mut self,
        content: &Content,
        focus_keyword: &str,
        secondary_keywords: &[String],
    ) -> ValidationResult {
        self.validate_and_correct_with(content, focus_keyword, secondary_keywords, None)
    }

    /// Like [`validate_and_correct`](Self::validate_and_correct), with
    /// correction parameters overridden by a retry strategy.
    pub fn validate_and_correct_with(
        &mut self,
        content: &Content,
        focus_keyword: &str,
        secondary_keywords: &[String],
        strategy: Option<&CorrectionStrategy>,
    ) -> ValidationResult {
        let auto = self.config.optimizer.auto_correction;
        let mut current = content.clone();
        let mut corrections_made = Vec::new();
        let mut step_failures = Vec::new();

        for aspect in self.config.aspect_order() {
            let issues = self.validate_aspect(aspect, &current, focus_keyword, secondary_keywords);
            if issues.is_empty() || !auto {
                continue;
            }
            let Some(corrector) = self.correctors.find(aspect) else {
                continue;
            };
            let detected = issues.iter().map(|i| i.kind).collect();
            let mut opts =
                CorrectionOptions::new(self.config.thresholds.clone()).with_detected(detected);
            if let Some(s) = strategy {
                opts.target_length_delta = s.target_length_delta;
                opts.reduction_pct = s.reduction_pct;
            }
            match corrector.correct(&current, focus_keyword, secondary_keywords, &opts, &mut self.rng)
            {
                Ok(candidate) => {
                    if candidate == current {
                        continue;
                    }
                    // Re-validate before trusting the corrector. A candidate
                    // that scores worse on its own aspect is discarded.
                    let after =
                        self.validate_aspect(aspect, &candidate, focus_keyword, secondary_keywords);
                    if detector::compliance_score(&after) >= detector::compliance_score(&issues) {
                        self.log.debug(&format!(
                            "corrected {}: {} -> {} issues",
                            aspect.as_str(),
                            issues.len(),
                            after.len()
                        ));
                        current = candidate;
                        corrections_made.push(aspect.as_str().to_string());
                    } else {
                        self.log.warn(&format!(
                            "correction for {} made things worse; keeping original",
                            aspect.as_str()
                        ));
                    }
                }
                Err(err) => {
                    self.log
                        .warn(&format!("corrector for {} failed: {err:#}", aspect.as_str()));
                    step_failures.push(format!("{}: {err:#}", aspect.as_str()));
                }
            }
        }

        let mut result = self.final_validation(&current, focus_keyword, secondary_keywords);
        if current != *content {
            result.corrected_content = Some(current);
        }
        result.corrections_made = corrections_made;
        result.step_failures = step_failures;
        result
    }

    /// Full-detector validation of `content`, cached under the
    /// validation-result tier. The cached value carries no per-call state.
    fn final_validation(
        &self,
        content: &Content,
        focus_keyword: &str,
        secondary_keywords: &[String],
    ) -> ValidationResult {
        let hash = content.content_hash();
        let ctx = context_hash(
            focus_keyword,
            secondary_keywords,
            &self.config.thresholds.fingerprint(),
        );
        if let Some(result) = self
            .cache
            .get::<ValidationResult>(CacheTier::ValidationResult, &hash, &ctx)
        {
            return result;
        }
        let issues = self
            .detector
            .detect_all_issues(content, focus_keyword, secondary_keywords);
        let result = detector::result_from_issues(issues, content, focus_keyword);
        if let Err(err) = self
            .cache
            .set(CacheTier::ValidationResult, &hash, &ctx, &result)
        {
            self.log
                .warn(&format!("cache write failed for final validation: {err:#}"));
        }
        result
    }

    /// Validation without any correction step, for callers that only need
    /// a score (baseline checks, re-validation of rolled-back content).
    pub fn validate_only(
        &self,
        content: &Content,
        focus_keyword: &str,
        secondary_keywords: &[String],
    ) -> ValidationResult {
        self.final_validation(content, focus_keyword, secondary_keywords)
    }

    pub fn cache(&self) -> &ValidationCache {
        &self.cache
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ImagePrompt, IssueKind};
    use crate::traits::Corrector;
    use anyhow::bail;

    fn seeded_config() -> Config {
        let mut config = Config::minimal();
        config.optimizer.rng_seed = Some(42);
        config
    }

    fn pipeline() -> ValidationPipeline {
        ValidationPipeline::new(seeded_config(), Arc::new(ValidationCache::new(Default::default())))
    }

    fn compliant_content() -> Content {
        Content {
            title: "Rust Performance Tips for Faster Builds".to_string(),
            body: "# Rust Performance Tips\n\nRust gives you speed without losing safety. However, you still need good habits. First, measure before you change anything. Then, pick the slowest part and fix it.\n\n## Measure the Hot Path\n\nProfilers show where the time goes. Also, they keep you honest. Because numbers beat guesses, start there. Next, write a small benchmark for the hot path.\n\n## Tune the Build\n\nRelease builds run much faster. Also, thin links cut build time. Therefore, check your profile settings early. Finally, cache your crates to save minutes every day.\n\nKeep your tests fast as well. Then, the loop stays tight. Slow suites hide slow code, and nobody runs them. Instead, trim them often.\n\nRust rewards this patience. Overall, small steps add up to a fast project. Ship the wins, then measure again.".to_string(),
            meta_description: "Learn practical rust performance tips that speed up your builds, cut compile times, and keep your projects fast and maintainable.".to_string(),
            excerpt: "Practical performance habits.".to_string(),
            primary_keyword: "rust".to_string(),
            secondary_keywords: vec!["performance".to_string()],
            image_prompts: vec![ImagePrompt {
                prompt: "a crab tuning a race car".to_string(),
                alt: "rust mascot tuning an engine".to_string(),
            }],
            internal_links: vec![],
            external_links: vec![],
        }
    }

    #[test]
    fn test_compliant_content_passes_without_correction() {
        let mut pipeline = pipeline();
        let result = pipeline.validate_and_correct(&compliant_content(), "rust", &[]);
        assert!(result.is_valid, "issues: {:?}", result.all_issues().collect::<Vec<_>>());
        assert_eq!(result.overall_score, 100.0);
        assert!(result.corrected_content.is_none());
        assert!(result.corrections_made.is_empty());
    }

    #[test]
    fn test_broken_meta_gets_corrected_and_recorded() {
        let mut content = compliant_content();
        content.meta_description = "Too short.".to_string();

        let mut pipeline = pipeline();
        let result = pipeline.validate_and_correct(&content, "rust", &[]);
        assert!(result.corrections_made.contains(&"meta_description".to_string()));
        let corrected = result.corrected_content.expect("content should change");
        let len = corrected.meta_description.chars().count();
        assert!((120..=156).contains(&len), "meta length {len}");
        assert!(corrected.meta_description.to_lowercase().contains("rust"));
    }

    #[test]
    fn test_auto_correction_off_only_validates() {
        let mut config = seeded_config();
        config.optimizer.auto_correction = false;
        let mut pipeline =
            ValidationPipeline::new(config, Arc::new(ValidationCache::new(Default::default())));

        let mut content = compliant_content();
        content.meta_description = "Too short.".to_string();
        let result = pipeline.validate_and_correct(&content, "rust", &[]);
        assert!(!result.is_valid);
        assert!(result.corrected_content.is_none());
        assert!(result.corrections_made.is_empty());
    }

    #[test]
    fn test_repeat_validation_hits_cache() {
        let cache = Arc::new(ValidationCache::new(Default::default()));
        let mut pipeline = ValidationPipeline::new(seeded_config(), Arc::clone(&cache));

        let content = compliant_content();
        pipeline.validate_and_correct(&content, "rust", &[]);
        let misses_after_first = cache.stats().misses;
        pipeline.validate_and_correct(&content, "rust", &[]);
        let stats = cache.stats();
        assert!(stats.hits > 0, "second run should hit: {stats:?}");
        assert_eq!(stats.misses, misses_after_first);
    }

    #[test]
    fn test_threshold_change_invalidates_cache() {
        let cache = Arc::new(ValidationCache::new(Default::default()));
        let content = compliant_content();

        let mut first = ValidationPipeline::new(seeded_config(), Arc::clone(&cache));
        first.validate_and_correct(&content, "rust", &[]);

        let mut config = seeded_config();
        config.thresholds.title_min_length = 50;
        let mut second = ValidationPipeline::new(config, Arc::clone(&cache));
        let result = second.validate_and_correct(&content, "rust", &[]);
        // 39-char title now fails; a stale cache hit would have passed it.
        assert!(result
            .corrections_made
            .contains(&"title".to_string())
            || result.all_issues().any(|i| i.kind == IssueKind::TitleTooShort));
    }

    struct BrokenCorrector;

    impl Corrector for BrokenCorrector {
        fn aspect(&self) -> Aspect {
            Aspect::MetaDescription
        }

        fn name(&self) -> &str {
            "broken"
        }

        fn description(&self) -> &str {
            "always fails"
        }

        fn correct(
            &self,
            _content: &Content,
            _focus_keyword: &str,
            _secondary_keywords: &[String],
            _opts: &CorrectionOptions,
            _rng: &mut StdRng,
        ) -> anyhow::Result<Content> {
            bail!("meta description corrector exploded")
        }
    }

    #[test]
    fn test_corrector_failure_is_captured_and_pipeline_continues() {
        let mut registry = CorrectorRegistry::with_builtins();
        registry.register(Box::new(BrokenCorrector));
        let mut pipeline = ValidationPipeline::new(
            seeded_config(),
            Arc::new(ValidationCache::new(Default::default())),
        )
        .with_correctors(registry);

        let mut content = compliant_content();
        content.meta_description = "Too short.".to_string();
        content.title = "short".to_string();

        let result = pipeline.validate_and_correct(&content, "rust", &[]);
        assert_eq!(result.step_failures.len(), 1);
        assert!(result.step_failures[0].starts_with("meta_description:"));
        // Title still got corrected despite the meta step failing.
        assert!(result.corrections_made.contains(&"title".to_string()));
    }

    #[test]
    fn test_duplicate_title_flagged_via_known_titles() {
        let mut config = seeded_config();
        config.optimizer.auto_correction = false;
        let pipeline = ValidationPipeline::new(
            config,
            Arc::new(ValidationCache::new(Default::default())),
        )
        .with_known_titles(vec!["Rust Performance Tips for Faster Builds".to_string()]);

        let result = pipeline.validate_only(&compliant_content(), "rust", &[]);
        assert!(result
            .errors
            .iter()
            .any(|i| i.kind == IssueKind::TitleDuplicate));
    }
}
