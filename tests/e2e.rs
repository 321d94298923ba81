//! End-to-end tests against the live Upstage services.
//!
//! These use a real registration PDF in `./test_cases/` and spend API
//! credits. They are gated behind `E2E_ENABLED` and `UPSTAGE_API_KEY` so
//! they never run in CI unless explicitly requested.
//!
//! Run with:
//!   E2E_ENABLED=1 UPSTAGE_API_KEY=... cargo test --test e2e -- --nocapture

use solarguard::{analyze, analyze_to_file, GuardConfig, PropertyTerms, RiskTier, Stage};
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

// ── Test helpers ─────────────────────────────────────────────────────────────

fn test_cases_dir() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("test_cases")
}

/// Skip this test unless E2E_ENABLED and UPSTAGE_API_KEY are set and the
/// PDF at `path` exists.
macro_rules! e2e_skip_unless_ready {
    ($path:expr) => {{
        if std::env::var("E2E_ENABLED").is_err() {
            println!("SKIP: set E2E_ENABLED=1 to run e2e tests");
            return;
        }
        if std::env::var("UPSTAGE_API_KEY").map_or(true, |k| k.is_empty()) {
            println!("SKIP: UPSTAGE_API_KEY is not set");
            return;
        }
        let p: PathBuf = $path;
        if !p.exists() {
            println!("SKIP: test file not found: {}", p.display());
            return;
        }
        p
    }};
}

fn live_config() -> GuardConfig {
    GuardConfig::from_env().expect("UPSTAGE_API_KEY checked by the skip macro")
}

/// Assert the narrative follows the four-section layout.
fn assert_report_layout(narrative: &str) {
    assert!(!narrative.trim().is_empty(), "report is empty");
    for heading in ["위험 등급", "부채 비율", "상세 분석", "추천 특약"] {
        assert!(
            narrative.contains(heading),
            "report is missing section {heading:?}:\n{narrative}"
        );
    }
}

// ── Live pipeline ────────────────────────────────────────────────────────────

#[tokio::test]
async fn test_reference_scenario_is_risky() {
    let path = e2e_skip_unless_ready!(test_cases_dir().join("registry.pdf"));

    let terms = PropertyTerms::new(500_000_000, 350_000_000).unwrap();
    let report = analyze(&path, terms, &live_config())
        .await
        .expect("analyze() should succeed");

    println!("{}", report.narrative);
    println!(
        "debt {}원, ratio {:.1}%, tier {:?}, {}ms",
        report.debt_total,
        report.debt_ratio_percent,
        report.stated_tier,
        report.stats.total_duration_ms
    );

    assert!(report.stats.parsed_chars > 0, "parse returned no text");
    assert!(report.debt_total > 0, "fixture has at least one claim");
    assert!(report.debt_ratio_percent > 80.0);
    assert_eq!(report.stated_tier, Some(RiskTier::Risk));
    assert_report_layout(&report.narrative);
}

#[tokio::test]
async fn test_repeated_extraction_is_stable() {
    let path = e2e_skip_unless_ready!(test_cases_dir().join("registry.pdf"));

    let config = live_config();
    let mut totals = Vec::new();
    for _ in 0..2 {
        let terms = PropertyTerms::new(500_000_000, 350_000_000).unwrap();
        totals.push(analyze(&path, terms, &config).await.unwrap().debt_total);
    }
    assert_eq!(totals[0], totals[1], "debt figure varied between runs");
}

#[tokio::test]
async fn test_progress_and_file_output() {
    struct Stages(Mutex<Vec<Stage>>);
    impl solarguard::PipelineProgressCallback for Stages {
        fn on_stage_complete(&self, stage: Stage, detail: &str) {
            println!("  ✓ {stage}: {detail}");
            self.0.lock().unwrap().push(stage);
        }
    }

    let path = e2e_skip_unless_ready!(test_cases_dir().join("registry.pdf"));
    let out_dir = tempfile::tempdir().unwrap();
    let out = out_dir.path().join("report.md");

    let stages = Arc::new(Stages(Mutex::new(Vec::new())));
    let key = std::env::var("UPSTAGE_API_KEY").unwrap();
    let config = GuardConfig::builder()
        .api_key(key)
        .progress_callback(stages.clone())
        .build()
        .unwrap();

    let terms = PropertyTerms::new(500_000_000, 350_000_000).unwrap();
    let report = analyze_to_file(&path, &out, terms, &config).await.unwrap();

    assert_eq!(*stages.0.lock().unwrap(), Stage::ALL.to_vec());
    let written = std::fs::read_to_string(&out).unwrap();
    assert_eq!(written.trim_end(), report.narrative.trim_end());
}
