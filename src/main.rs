//! # SEO Refinery CLI (`seo`)
//!
//! The `seo` binary is the primary interface for SEO Refinery. It validates
//! structured content records against configurable SEO and readability
//! constraints, and runs the multi-pass optimization loop that corrects
//! them.
//!
//! ## Usage
//!
//! ```bash
//! seo --config ./seo.toml <command>
//! ```
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `seo validate <record.json>` | Score a record and list detected issues |
//! | `seo optimize <record.json>` | Run the multi-pass correction loop |
//! | `seo completions <shell>` | Generate shell completion scripts |
//!
//! ## Examples
//!
//! ```bash
//! # Validate a record, keyword taken from the record itself
//! seo validate article.json
//!
//! # Validate with an explicit keyword and a duplicate-title list
//! seo validate article.json --focus-keyword rust --known-titles titles.txt
//!
//! # Optimize and write the corrected record
//! seo optimize article.json --focus-keyword rust --output fixed.json
//!
//! # Machine-readable report on stdout, logs on stderr
//! seo optimize article.json --json > report.json
//!
//! # Read the record from stdin
//! cat article.json | seo validate -
//! ```

mod analysis;
mod cache;
mod config;
mod correct;
mod detector;
mod improvement;
mod log;
mod models;
mod optimizer;
mod pipeline;
mod retry;
mod store;
mod tracker;
mod traits;

use anyhow::{bail, Context, Result};
use clap::{CommandFactory, Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::cache::ValidationCache;
use crate::config::ThresholdsConfig;
use crate::log::LogMode;
use crate::models::{Content, ValidationResult};
use crate::optimizer::{MultiPassOptimizer, OptimizationOutcome};
use crate::pipeline::ValidationPipeline;
use crate::traits::builtin_analyzers;

/// SEO Refinery CLI — a multi-pass validation and correction engine for
/// generated content.
///
/// All commands accept a `--config` flag pointing to a TOML configuration
/// file. Missing files fall back to built-in defaults.
#[derive(Parser)]
#[command(
    name = "seo",
    about = "SEO Refinery — a multi-pass validation and correction engine for generated content",
    version,
    long_about = "SEO Refinery validates structured content records (title, body, meta \
    description, keywords, image prompts) against configurable SEO and readability rules, \
    and iteratively corrects them until they comply or provably cannot improve further."
)]
struct Cli {
    /// Path to configuration file (TOML).
    ///
    /// Defaults to `./seo.toml`. Optimizer, threshold, retry, cache, and
    /// store settings are read from this file; a missing file means
    /// built-in defaults.
    #[arg(long, global = true, default_value = "./seo.toml")]
    config: PathBuf,

    /// Stderr logging: `auto` (human when stderr is a TTY), `off`, `human`,
    /// or `json`.
    #[arg(long, global = true, default_value = "auto")]
    log: String,

    #[command(subcommand)]
    command: Commands,
}

/// Top-level CLI commands.
#[derive(Subcommand)]
enum Commands {
    /// Validate a content record without changing it.
    ///
    /// Runs the full issue detector over the record and prints the
    /// compliance score, measured metrics, and every detected issue with
    /// its severity and target value.
    Validate {
        /// Path to the content record (JSON). Use `-` to read stdin.
        input: PathBuf,

        /// Focus keyword. Defaults to the record's `primary_keyword`.
        #[arg(long)]
        focus_keyword: Option<String>,

        /// Secondary keyword (repeatable). Defaults to the record's
        /// `secondary_keywords`.
        #[arg(long = "secondary")]
        secondary: Vec<String>,

        /// File of already-published titles, one per line, for duplicate
        /// detection.
        #[arg(long)]
        known_titles: Option<PathBuf>,

        /// Print the full validation result as JSON on stdout.
        #[arg(long)]
        json: bool,
    },

    /// Run the multi-pass optimization loop over a content record.
    ///
    /// Validates, corrects, and re-validates the record for up to
    /// `max_iterations` passes, then prints a session report. The returned
    /// content is always the best-scoring pass, never the last one blindly.
    Optimize {
        /// Path to the content record (JSON). Use `-` to read stdin.
        input: PathBuf,

        /// Focus keyword. Defaults to the record's `primary_keyword`.
        #[arg(long)]
        focus_keyword: Option<String>,

        /// Secondary keyword (repeatable). Defaults to the record's
        /// `secondary_keywords`.
        #[arg(long = "secondary")]
        secondary: Vec<String>,

        /// File of already-published titles, one per line, for duplicate
        /// detection.
        #[arg(long)]
        known_titles: Option<PathBuf>,

        /// Write the optimized content record (JSON) to this path.
        #[arg(long)]
        output: Option<PathBuf>,

        /// Print the full session report as JSON on stdout.
        #[arg(long)]
        json: bool,
    },

    /// Generate shell completion scripts.
    ///
    /// Prints a completion script for the given shell on stdout. Pipe it
    /// into the location your shell sources completions from.
    Completions {
        /// Target shell.
        shell: clap_complete::Shell,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Completions need no config and no content.
    if let Commands::Completions { shell } = &cli.command {
        clap_complete::generate(*shell, &mut Cli::command(), "seo", &mut std::io::stdout());
        return Ok(());
    }

    let sink = parse_log_mode(&cli.log)?.sink();
    let cfg = if cli.config.exists() {
        config::load_config(&cli.config)?
    } else {
        config::Config::minimal()
    };

    match cli.command {
        Commands::Validate {
            input,
            focus_keyword,
            secondary,
            known_titles,
            json,
        } => {
            let content = read_content(&input)?;
            let (focus, secondary) = resolve_keywords(&content, focus_keyword, secondary)?;
            let titles = read_known_titles(known_titles.as_deref())?;

            let thresholds = cfg.thresholds.clone();
            let cache = Arc::new(ValidationCache::new(cfg.cache.clone()));
            let mut pipeline = ValidationPipeline::new(cfg, cache).with_log_sink(sink);
            if !titles.is_empty() {
                pipeline = pipeline.with_known_titles(titles);
            }
            let result = pipeline.validate_only(&content, &focus, &secondary);
            if json {
                println!("{}", serde_json::to_string_pretty(&result)?);
            } else {
                print_validation(&result, &content, &focus, &thresholds);
            }
        }
        Commands::Optimize {
            input,
            focus_keyword,
            secondary,
            known_titles,
            output,
            json,
        } => {
            let content = read_content(&input)?;
            let (focus, secondary) = resolve_keywords(&content, focus_keyword, secondary)?;
            let titles = read_known_titles(known_titles.as_deref())?;

            let mut optimizer = MultiPassOptimizer::new(cfg)?.with_log_sink(sink);
            if !titles.is_empty() {
                optimizer = optimizer.with_known_titles(titles);
            }
            let outcome = optimizer.optimize(&content, &focus, &secondary);

            if let Some(path) = &output {
                std::fs::write(path, serde_json::to_string_pretty(&outcome.content)?)
                    .with_context(|| format!("Failed to write {}", path.display()))?;
            }
            if json {
                let payload = serde_json::json!({
                    "content": outcome.content,
                    "result": outcome.result,
                    "best_score": outcome.best_score,
                    "termination_reason": outcome.termination_reason,
                    "report": outcome.report,
                    "cache_stats": outcome.cache_stats,
                });
                println!("{}", serde_json::to_string_pretty(&payload)?);
            } else {
                print_optimization(&outcome);
            }
        }
        Commands::Completions { .. } => {
            // Handled above (before config loading)
            unreachable!()
        }
    }

    Ok(())
}

fn parse_log_mode(mode: &str) -> Result<LogMode> {
    match mode {
        "auto" => Ok(LogMode::default_for_tty()),
        "off" => Ok(LogMode::Off),
        "human" => Ok(LogMode::Human),
        "json" => Ok(LogMode::Json),
        other => bail!("Unknown log mode: '{other}'. Available: auto, off, human, json"),
    }
}

/// Read a content record from a JSON file, or stdin when the path is `-`.
fn read_content(path: &Path) -> Result<Content> {
    let raw = if path == Path::new("-") {
        std::io::read_to_string(std::io::stdin())
            .with_context(|| "Failed to read content record from stdin")?
    } else {
        std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read content record: {}", path.display()))?
    };
    serde_json::from_str(&raw).with_context(|| "Failed to parse content record JSON")
}

/// Explicit flags win; the record's own keyword fields are the fallback.
fn resolve_keywords(
    content: &Content,
    focus_keyword: Option<String>,
    secondary: Vec<String>,
) -> Result<(String, Vec<String>)> {
    let focus = focus_keyword.unwrap_or_else(|| content.primary_keyword.clone());
    if focus.is_empty() {
        bail!("No focus keyword: pass --focus-keyword or set primary_keyword in the record");
    }
    let secondary = if secondary.is_empty() {
        content.secondary_keywords.clone()
    } else {
        secondary
    };
    Ok((focus, secondary))
}

fn read_known_titles(path: Option<&Path>) -> Result<Vec<String>> {
    let Some(path) = path else {
        return Ok(Vec::new());
    };
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read known titles: {}", path.display()))?;
    Ok(raw
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect())
}

fn print_validation(
    result: &ValidationResult,
    content: &Content,
    focus: &str,
    thresholds: &ThresholdsConfig,
) {
    println!("SEO Refinery — Validation Report");
    println!("================================");
    println!();
    println!("  Score:       {:.1} / 100", result.overall_score);
    println!("  Compliant:   {}", if result.is_valid { "yes" } else { "no" });
    println!(
        "  Issues:      {} ({} errors, {} warnings, {} suggestions)",
        result.issue_count(),
        result.errors.len(),
        result.warnings.len(),
        result.suggestions.len()
    );
    println!();
    println!("  Words:       {}", result.metrics.word_count);
    println!("  Sentences:   {}", result.metrics.sentence_count);

    let prose = analysis::strip_markup(&content.body);
    println!();
    println!("  {:<28} {:>8}", "ANALYZER", "VALUE");
    println!("  {}", "-".repeat(38));
    for analyzer in builtin_analyzers(focus, thresholds) {
        println!("  {:<28} {:>8.2}", analyzer.name(), analyzer.analyze(&prose));
    }

    if result.issue_count() > 0 {
        println!();
        println!(
            "  {:<36} {:>8}   {:<18} {}",
            "ISSUE", "SEVERITY", "CURRENT", "TARGET"
        );
        println!("  {}", "-".repeat(76));
        for issue in result.all_issues() {
            println!(
                "  {:<36} {:>8}   {:<18} {}",
                issue.kind.as_str(),
                issue.severity.as_str(),
                issue.current_value,
                issue.target_value
            );
        }
    }
    println!();
}

fn print_optimization(outcome: &OptimizationOutcome) {
    let summary = &outcome.report.summary;
    let comparison = &outcome.report.comparison;

    println!("SEO Refinery — Optimization Report");
    println!("==================================");
    println!();
    println!("  Session:     {}", summary.session_id);
    println!("  Keyword:     {}", summary.focus_keyword);
    println!("  Passes:      {}", summary.total_passes);
    println!("  Termination: {}", outcome.termination_reason);
    println!(
        "  Score:       {:.1} -> {:.1} ({:+.1})",
        comparison.initial_score,
        outcome.best_score,
        outcome.best_score - comparison.initial_score
    );
    println!(
        "  Cache:       {} hits / {} misses ({:.0}% hit rate)",
        outcome.cache_stats.hits,
        outcome.cache_stats.misses,
        outcome.cache_stats.hit_rate() * 100.0
    );
    if let Some(trend) = &outcome.report.trend {
        println!(
            "  Trend:       {} (velocity {:+.1}/pass)",
            trend.direction.as_str(),
            trend.velocity
        );
    }

    if !outcome.report.pass_history.is_empty() {
        println!();
        println!(
            "  {:<6} {:>8} {:>8} {:>8}   {}",
            "PASS", "BEFORE", "AFTER", "DELTA", "CORRECTIONS"
        );
        println!("  {}", "-".repeat(76));
        for pass in &outcome.report.pass_history {
            let corrections = if pass.corrections.is_empty() {
                "-".to_string()
            } else {
                pass.corrections.join(", ")
            };
            println!(
                "  {:<6} {:>8.1} {:>8.1} {:>+8.1}   {}",
                pass.pass_number, pass.before_score, pass.after_score, pass.improvement, corrections
            );
        }
    }

    if !outcome.report.strategy_effectiveness.is_empty() {
        println!();
        println!(
            "  {:<28} {:>6} {:>9} {:>11}",
            "STRATEGY", "USED", "SUCCESS", "AVG DELTA"
        );
        println!("  {}", "-".repeat(60));
        for metrics in &outcome.report.strategy_effectiveness {
            println!(
                "  {:<28} {:>6} {:>8.0}% {:>+11.1}",
                metrics.name,
                metrics.times_used,
                metrics.success_rate * 100.0,
                metrics.average_score_improvement
            );
        }
    }

    println!();
}
