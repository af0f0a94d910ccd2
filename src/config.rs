use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};

use crate::models::Aspect;

#[derive(Debug, Deserialize, Clone, Default)]
pub struct Config {
    #[serde(default)]
    pub optimizer: OptimizerConfig,
    #[serde(default)]
    pub thresholds: ThresholdsConfig,
    #[serde(default)]
    pub retry: RetryConfig,
    #[serde(default)]
    pub cache: CacheConfig,
    #[serde(default)]
    pub store: StoreConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct OptimizerConfig {
    #[serde(default = "default_max_iterations")]
    pub max_iterations: u32,
    #[serde(default = "default_target_score")]
    pub target_compliance_score: f64,
    #[serde(default = "default_true")]
    pub enable_early_termination: bool,
    #[serde(default = "default_stagnation_threshold")]
    pub stagnation_threshold: u32,
    #[serde(default = "default_min_improvement")]
    pub min_improvement_threshold: f64,
    #[serde(default = "default_priority_order")]
    pub priority_order: Vec<String>,
    #[serde(default = "default_true")]
    pub auto_correction: bool,
    #[serde(default = "default_snapshot_capacity")]
    pub snapshot_capacity: usize,
    #[serde(default)]
    pub rng_seed: Option<u64>,
}

impl Default for OptimizerConfig {
    fn default() -> Self {
        Self {
            max_iterations: default_max_iterations(),
            target_compliance_score: default_target_score(),
            enable_early_termination: true,
            stagnation_threshold: default_stagnation_threshold(),
            min_improvement_threshold: default_min_improvement(),
            priority_order: default_priority_order(),
            auto_correction: true,
            snapshot_capacity: default_snapshot_capacity(),
            rng_seed: None,
        }
    }
}

fn default_max_iterations() -> u32 {
    5
}
fn default_target_score() -> f64 {
    100.0
}
fn default_true() -> bool {
    true
}
fn default_stagnation_threshold() -> u32 {
    2
}
fn default_min_improvement() -> f64 {
    2.0
}
fn default_priority_order() -> Vec<String> {
    Aspect::ALL.iter().map(|a| a.as_str().to_string()).collect()
}
fn default_snapshot_capacity() -> usize {
    10
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct ThresholdsConfig {
    #[serde(default = "default_meta_min")]
    pub meta_description_min_length: usize,
    #[serde(default = "default_meta_max")]
    pub meta_description_max_length: usize,
    #[serde(default = "default_density_min")]
    pub keyword_density_min: f64,
    #[serde(default = "default_density_max")]
    pub keyword_density_max: f64,
    #[serde(default = "default_flesch_min")]
    pub flesch_score_min: f64,
    #[serde(default = "default_sentence_words")]
    pub max_sentence_words: usize,
    #[serde(default = "default_long_sentence_pct")]
    pub long_sentence_pct_max: f64,
    #[serde(default = "default_paragraph_words")]
    pub max_paragraph_words: usize,
    #[serde(default = "default_passive_pct")]
    pub passive_voice_pct_max: f64,
    #[serde(default = "default_transition_pct")]
    pub transition_word_pct_min: f64,
    #[serde(default = "default_title_min")]
    pub title_min_length: usize,
    #[serde(default = "default_title_max")]
    pub title_max_length: usize,
    #[serde(default = "default_min_images")]
    pub min_image_count: usize,
}

impl ThresholdsConfig {
    /// Stable digest over every threshold. Folded into cache contexts so
    /// tuning any limit invalidates dependent entries.
    pub fn fingerprint(&self) -> String {
        let json = serde_json::to_string(self).unwrap_or_default();
        let mut hasher = Sha256::new();
        hasher.update(json.as_bytes());
        hex::encode(&hasher.finalize()[..16])
    }
}

impl Default for ThresholdsConfig {
    fn default() -> Self {
        Self {
            meta_description_min_length: default_meta_min(),
            meta_description_max_length: default_meta_max(),
            keyword_density_min: default_density_min(),
            keyword_density_max: default_density_max(),
            flesch_score_min: default_flesch_min(),
            max_sentence_words: default_sentence_words(),
            long_sentence_pct_max: default_long_sentence_pct(),
            max_paragraph_words: default_paragraph_words(),
            passive_voice_pct_max: default_passive_pct(),
            transition_word_pct_min: default_transition_pct(),
            title_min_length: default_title_min(),
            title_max_length: default_title_max(),
            min_image_count: default_min_images(),
        }
    }
}

fn default_meta_min() -> usize {
    120
}
fn default_meta_max() -> usize {
    156
}
fn default_density_min() -> f64 {
    0.5
}
fn default_density_max() -> f64 {
    2.5
}
fn default_flesch_min() -> f64 {
    60.0
}
fn default_sentence_words() -> usize {
    20
}
fn default_long_sentence_pct() -> f64 {
    25.0
}
fn default_paragraph_words() -> usize {
    150
}
fn default_passive_pct() -> f64 {
    10.0
}
fn default_transition_pct() -> f64 {
    30.0
}
fn default_title_min() -> usize {
    30
}
fn default_title_max() -> usize {
    60
}
fn default_min_images() -> usize {
    1
}

#[derive(Debug, Deserialize, Clone)]
pub struct RetryConfig {
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    #[serde(default = "default_base_delay_ms")]
    pub base_delay_ms: u64,
    #[serde(default = "default_max_delay_ms")]
    pub max_delay_ms: u64,
    #[serde(default = "default_backoff_multiplier")]
    pub backoff_multiplier: f64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            base_delay_ms: default_base_delay_ms(),
            max_delay_ms: default_max_delay_ms(),
            backoff_multiplier: default_backoff_multiplier(),
        }
    }
}

fn default_max_attempts() -> u32 {
    3
}
fn default_base_delay_ms() -> u64 {
    1000
}
fn default_max_delay_ms() -> u64 {
    30_000
}
fn default_backoff_multiplier() -> f64 {
    2.0
}

/// Per-tier TTLs in seconds. Tiers cache different work, so they age
/// at different rates.
#[derive(Debug, Deserialize, Clone)]
pub struct CacheConfig {
    #[serde(default = "default_validation_ttl")]
    pub validation_result_ttl_secs: u64,
    #[serde(default = "default_metrics_ttl")]
    pub content_metrics_ttl_secs: u64,
    #[serde(default = "default_keyword_ttl")]
    pub keyword_analysis_ttl_secs: u64,
    #[serde(default = "default_readability_ttl")]
    pub readability_analysis_ttl_secs: u64,
    #[serde(default = "default_title_ttl")]
    pub title_uniqueness_ttl_secs: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            validation_result_ttl_secs: default_validation_ttl(),
            content_metrics_ttl_secs: default_metrics_ttl(),
            keyword_analysis_ttl_secs: default_keyword_ttl(),
            readability_analysis_ttl_secs: default_readability_ttl(),
            title_uniqueness_ttl_secs: default_title_ttl(),
        }
    }
}

fn default_validation_ttl() -> u64 {
    1800
}
fn default_metrics_ttl() -> u64 {
    3600
}
fn default_keyword_ttl() -> u64 {
    3600
}
fn default_readability_ttl() -> u64 {
    5400
}
fn default_title_ttl() -> u64 {
    7200
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct StoreConfig {
    /// Path for the persistent cache/learning tier. Memory-only when unset.
    #[serde(default)]
    pub path: Option<PathBuf>,
}

impl Config {
    /// Smallest usable configuration. Tests and the CLI's no-config path
    /// start from this.
    pub fn minimal() -> Config {
        Config::default()
    }

    /// Aspect order for pipeline steps, parsed from `priority_order`.
    pub fn aspect_order(&self) -> Vec<Aspect> {
        self.optimizer
            .priority_order
            .iter()
            .filter_map(|s| Aspect::parse(s))
            .collect()
    }
}

pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    let config: Config = toml::from_str(&content).with_context(|| "Failed to parse config file")?;

    // Validate optimizer
    if config.optimizer.max_iterations == 0 {
        anyhow::bail!("optimizer.max_iterations must be >= 1");
    }

    if !(0.0..=100.0).contains(&config.optimizer.target_compliance_score) {
        anyhow::bail!("optimizer.target_compliance_score must be in [0.0, 100.0]");
    }

    if config.optimizer.min_improvement_threshold < 0.0 {
        anyhow::bail!("optimizer.min_improvement_threshold must be >= 0.0");
    }

    if config.optimizer.snapshot_capacity == 0 {
        anyhow::bail!("optimizer.snapshot_capacity must be >= 1");
    }

    let mut seen = Vec::new();
    for name in &config.optimizer.priority_order {
        let aspect = match Aspect::parse(name) {
            Some(a) => a,
            None => anyhow::bail!(
                "Unknown aspect in optimizer.priority_order: '{}'. Available: meta_description, keyword_density, readability, title, images",
                name
            ),
        };
        if seen.contains(&aspect) {
            anyhow::bail!("Duplicate aspect in optimizer.priority_order: '{}'", name);
        }
        seen.push(aspect);
    }

    // Validate thresholds
    if config.thresholds.meta_description_min_length >= config.thresholds.meta_description_max_length
    {
        anyhow::bail!("thresholds.meta_description_min_length must be < max_length");
    }

    if config.thresholds.keyword_density_min >= config.thresholds.keyword_density_max {
        anyhow::bail!("thresholds.keyword_density_min must be < keyword_density_max");
    }

    if config.thresholds.title_min_length >= config.thresholds.title_max_length {
        anyhow::bail!("thresholds.title_min_length must be < title_max_length");
    }

    // Validate retry
    if config.retry.max_attempts == 0 {
        anyhow::bail!("retry.max_attempts must be >= 1");
    }

    if config.retry.backoff_multiplier < 1.0 {
        anyhow::bail!("retry.backoff_multiplier must be >= 1.0");
    }

    if config.retry.base_delay_ms > config.retry.max_delay_ms {
        anyhow::bail!("retry.base_delay_ms must be <= retry.max_delay_ms");
    }

    Ok(config)
}
