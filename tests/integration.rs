//! Integration tests for the `seo` command-line interface.
//!
//! These tests run the compiled binary against temporary config and record
//! files, exercising validation output, the optimization loop, JSON
//! reporting, stdin input, and error paths.

use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use tempfile::TempDir;

/// Path to the compiled `seo` binary.
fn seo_binary() -> PathBuf {
    let mut path = std::env::current_exe().expect("test binary path");
    path.pop(); // remove test binary name
    path.pop(); // remove deps/
    path.push("seo");
    path
}

const BODY: &str = "# Rust Performance Tips\n\nRust gives you speed without losing safety. However, you still need good habits. First, measure before you change anything. Then, pick the slowest part and fix it.\n\n## Measure the Hot Path\n\nProfilers show where the time goes. Also, they keep you honest. Because numbers beat guesses, start there. Next, write a small benchmark for the hot path.\n\n## Tune the Build\n\nRelease builds run much faster. Also, thin links cut build time. Therefore, check your profile settings early. Finally, cache your crates to save minutes every day.\n\nKeep your tests fast as well. Then, the loop stays tight. Slow suites hide slow code, and nobody runs them. Instead, trim them often.\n\nRust rewards this patience. Overall, small steps add up to a fast project. Ship the wins, then measure again.";

const GOOD_META: &str = "Learn practical rust performance tips that speed up \
your builds, cut compile times, and keep your projects fast and maintainable.";

fn record_json(meta_description: &str) -> String {
    serde_json::json!({
        "title": "Rust Performance Tips for Faster Builds",
        "content": BODY,
        "meta_description": meta_description,
        "excerpt": "Practical performance habits.",
        "primary_keyword": "rust",
        "secondary_keywords": ["performance"],
        "image_prompts": [
            {"prompt": "a crab tuning a race car", "alt": "rust mascot tuning an engine"}
        ]
    })
    .to_string()
}

/// Write a config plus compliant and broken record fixtures; returns the
/// temp dir (keep it alive) and the config path.
fn setup_test_env() -> (TempDir, PathBuf) {
    let dir = tempfile::tempdir().expect("create temp dir");
    let config_path = dir.path().join("seo.toml");

    std::fs::write(
        &config_path,
        "[optimizer]\n\
         rng_seed = 42\n\
         \n\
         [retry]\n\
         base_delay_ms = 0\n\
         max_delay_ms = 0\n",
    )
    .expect("write config");

    std::fs::write(dir.path().join("compliant.json"), record_json(GOOD_META))
        .expect("write compliant record");
    std::fs::write(dir.path().join("broken.json"), record_json("Too short."))
        .expect("write broken record");

    (dir, config_path)
}

/// Run `seo` with the given config and args; returns (stdout, stderr,
/// success).
fn run_seo(config_path: &Path, args: &[&str]) -> (String, String, bool) {
    let output = Command::new(seo_binary())
        .arg("--config")
        .arg(config_path)
        .args(args)
        .output()
        .expect("run seo binary");
    (
        String::from_utf8_lossy(&output.stdout).to_string(),
        String::from_utf8_lossy(&output.stderr).to_string(),
        output.status.success(),
    )
}

fn run_seo_with_stdin(config_path: &Path, args: &[&str], input: &str) -> (String, String, bool) {
    let mut child = Command::new(seo_binary())
        .arg("--config")
        .arg(config_path)
        .args(args)
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .expect("spawn seo binary");
    child
        .stdin
        .take()
        .expect("child stdin")
        .write_all(input.as_bytes())
        .expect("write stdin");
    let output = child.wait_with_output().expect("wait for seo binary");
    (
        String::from_utf8_lossy(&output.stdout).to_string(),
        String::from_utf8_lossy(&output.stderr).to_string(),
        output.status.success(),
    )
}

#[test]
fn test_validate_reports_compliant_record() {
    let (dir, config) = setup_test_env();
    let record = dir.path().join("compliant.json");
    let (stdout, stderr, success) = run_seo(&config, &["validate", record.to_str().unwrap()]);

    assert!(success, "validate failed: {}", stderr);
    assert!(stdout.contains("Validation Report"), "stdout: {}", stdout);
    assert!(stdout.contains("Compliant:   yes"), "stdout: {}", stdout);
    assert!(
        stdout.contains("Score:       100.0 / 100"),
        "stdout: {}",
        stdout
    );
}

#[test]
fn test_validate_flags_short_meta() {
    let (dir, config) = setup_test_env();
    let record = dir.path().join("broken.json");
    let (stdout, stderr, success) = run_seo(&config, &["validate", record.to_str().unwrap()]);

    // Validation reports problems; it does not fail the process.
    assert!(success, "validate failed: {}", stderr);
    assert!(stdout.contains("Compliant:   no"), "stdout: {}", stdout);
    assert!(
        stdout.contains("meta_description_too_short"),
        "stdout: {}",
        stdout
    );
}

#[test]
fn test_validate_json_is_machine_readable() {
    let (dir, config) = setup_test_env();
    let record = dir.path().join("compliant.json");
    let (stdout, stderr, success) =
        run_seo(&config, &["validate", record.to_str().unwrap(), "--json"]);

    assert!(success, "validate failed: {}", stderr);
    let result: serde_json::Value = serde_json::from_str(&stdout).expect("stdout is JSON");
    assert_eq!(result["is_valid"], serde_json::json!(true));
    assert_eq!(result["overall_score"].as_f64(), Some(100.0));
}

#[test]
fn test_optimize_writes_corrected_record() {
    let (dir, config) = setup_test_env();
    let record = dir.path().join("broken.json");
    let fixed = dir.path().join("fixed.json");
    let (stdout, stderr, success) = run_seo(
        &config,
        &[
            "optimize",
            record.to_str().unwrap(),
            "--output",
            fixed.to_str().unwrap(),
        ],
    );

    assert!(success, "optimize failed: {}", stderr);
    assert!(stdout.contains("Optimization Report"), "stdout: {}", stdout);

    let written = std::fs::read_to_string(&fixed).expect("read optimized record");
    let content: serde_json::Value = serde_json::from_str(&written).expect("output is JSON");
    let meta = content["meta_description"].as_str().expect("meta field");
    assert_ne!(meta, "Too short.");
    let len = meta.chars().count();
    assert!((120..=156).contains(&len), "meta length was {}", len);
    assert!(meta.to_lowercase().contains("rust"), "meta: {:?}", meta);
}

#[test]
fn test_optimize_json_reports_the_session() {
    let (dir, config) = setup_test_env();
    let record = dir.path().join("broken.json");
    let (stdout, stderr, success) =
        run_seo(&config, &["optimize", record.to_str().unwrap(), "--json"]);

    assert!(success, "optimize failed: {}", stderr);
    let payload: serde_json::Value = serde_json::from_str(&stdout).expect("stdout is JSON");
    assert_eq!(
        payload["termination_reason"],
        serde_json::json!("compliance_achieved")
    );
    assert_eq!(payload["result"]["is_valid"], serde_json::json!(true));
    assert!(payload["report"]["summary"]["total_passes"].as_u64() >= Some(1));
    assert!(payload["cache_stats"]["hits"].is_u64());
    assert!(payload["content"]["meta_description"].is_string());
}

#[test]
fn test_validate_reads_record_from_stdin() {
    let (_dir, config) = setup_test_env();
    let (stdout, stderr, success) =
        run_seo_with_stdin(&config, &["validate", "-"], &record_json("Too short."));

    assert!(success, "validate failed: {}", stderr);
    assert!(stdout.contains("Compliant:   no"), "stdout: {}", stdout);
}

#[test]
fn test_missing_input_file_is_an_error() {
    let (dir, config) = setup_test_env();
    let missing = dir.path().join("nope.json");
    let (_stdout, stderr, success) = run_seo(&config, &["validate", missing.to_str().unwrap()]);

    assert!(!success);
    assert!(
        stderr.contains("Failed to read content record"),
        "stderr: {}",
        stderr
    );
}

#[test]
fn test_record_without_keyword_is_an_error() {
    let (dir, config) = setup_test_env();
    let record = dir.path().join("keywordless.json");
    std::fs::write(
        &record,
        serde_json::json!({
            "title": "Untitled",
            "content": "Some body text here.",
            "meta_description": "A description."
        })
        .to_string(),
    )
    .expect("write record");
    let (_stdout, stderr, success) = run_seo(&config, &["validate", record.to_str().unwrap()]);

    assert!(!success);
    assert!(stderr.contains("No focus keyword"), "stderr: {}", stderr);
}

#[test]
fn test_unknown_log_mode_is_an_error() {
    let (dir, config) = setup_test_env();
    let record = dir.path().join("compliant.json");
    let (_stdout, stderr, success) = run_seo(
        &config,
        &["--log", "loud", "validate", record.to_str().unwrap()],
    );

    assert!(!success);
    assert!(stderr.contains("Unknown log mode"), "stderr: {}", stderr);
}

#[test]
fn test_invalid_config_is_an_error() {
    let dir = tempfile::tempdir().expect("create temp dir");
    let config_path = dir.path().join("seo.toml");
    std::fs::write(&config_path, "[optimizer]\nmax_iterations = 0\n").expect("write config");
    let record = dir.path().join("record.json");
    std::fs::write(&record, record_json(GOOD_META)).expect("write record");
    let (_stdout, stderr, success) = run_seo(&config_path, &["validate", record.to_str().unwrap()]);

    assert!(!success);
    assert!(
        stderr.contains("optimizer.max_iterations"),
        "stderr: {}",
        stderr
    );
}

#[test]
fn test_completions_emit_a_script() {
    let (_dir, config) = setup_test_env();
    let (stdout, stderr, success) = run_seo(&config, &["completions", "bash"]);

    assert!(success, "completions failed: {}", stderr);
    assert!(stdout.contains("seo"), "stdout: {}", stdout);
}

#[test]
fn test_known_titles_flag_detects_duplicates() {
    let (dir, config) = setup_test_env();
    let titles = dir.path().join("titles.txt");
    std::fs::write(&titles, "Rust Performance Tips for Faster Builds\n").expect("write titles");
    let record = dir.path().join("compliant.json");
    let (stdout, stderr, success) = run_seo(
        &config,
        &[
            "validate",
            record.to_str().unwrap(),
            "--known-titles",
            titles.to_str().unwrap(),
        ],
    );

    assert!(success, "validate failed: {}", stderr);
    assert!(stdout.contains("Compliant:   no"), "stdout: {}", stdout);
    assert!(stdout.contains("title_duplicate"), "stdout: {}", stdout);
}
