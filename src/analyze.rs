//! Analysis entry points: run ingest → extract → report in order.
//!
//! Each stage is awaited under its own timeout and raced against an optional
//! cancellation future. The first failure aborts the run and comes back
//! wrapped in [`GuardError::Stage`] naming where it happened.

use crate::config::GuardConfig;
use crate::error::{GuardError, Stage};
use crate::output::{RiskReport, RunStats};
use crate::pipeline::chat::{self, resolve_chat_model};
use crate::pipeline::extract::extract_debt_total;
use crate::pipeline::ingest::{self, DocumentIngestor};
use crate::pipeline::report::{excerpt, generate_report, PropertyTerms, RiskTier};
use std::future::Future;
use std::path::Path;
use std::pin::Pin;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// Where the PDF comes from.
enum Source<'a> {
    Path(&'a Path),
    Bytes { name: &'a str, bytes: &'a [u8] },
}

/// Analyse the registration PDF at `pdf_path`.
///
/// # Errors
/// - [`GuardError::Config`] when no API key or chat provider is available
///   (raised before any network call)
/// - [`GuardError::Stage`] wrapping the first stage failure
pub async fn analyze(
    pdf_path: impl AsRef<Path>,
    terms: PropertyTerms,
    config: &GuardConfig,
) -> Result<RiskReport, GuardError> {
    run(Source::Path(pdf_path.as_ref()), terms, config, std::future::pending::<()>()).await
}

/// Like [`analyze`], but gives up with [`GuardError::Cancelled`] as soon as
/// `cancel` resolves.
///
/// The in-flight request is dropped, which aborts the HTTP call.
///
/// ```rust,no_run
/// use solarguard::{analyze_with_cancel, GuardConfig, PropertyTerms};
///
/// # #[tokio::main]
/// # async fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let config = GuardConfig::from_env()?;
/// let terms = PropertyTerms::new(500_000_000, 350_000_000)?;
/// let ctrl_c = async {
///     let _ = tokio::signal::ctrl_c().await;
/// };
/// let report = analyze_with_cancel("registry.pdf", terms, &config, ctrl_c).await?;
/// println!("{}", report.narrative);
/// # Ok(())
/// # }
/// ```
pub async fn analyze_with_cancel<C>(
    pdf_path: impl AsRef<Path>,
    terms: PropertyTerms,
    config: &GuardConfig,
    cancel: C,
) -> Result<RiskReport, GuardError>
where
    C: Future<Output = ()>,
{
    run(Source::Path(pdf_path.as_ref()), terms, config, cancel).await
}

/// Analyse PDF bytes already in memory.
///
/// Useful when the document comes from a database or an upload rather than
/// the file system.
pub async fn analyze_bytes(
    bytes: &[u8],
    terms: PropertyTerms,
    config: &GuardConfig,
) -> Result<RiskReport, GuardError> {
    let source = Source::Bytes {
        name: "document.pdf",
        bytes,
    };
    run(source, terms, config, std::future::pending::<()>()).await
}

/// Analyse a PDF and write the narrative report to `output_path`.
///
/// Uses atomic write (temp file in the target directory + rename) so a
/// failed run never leaves a half-written report behind.
pub async fn analyze_to_file(
    pdf_path: impl AsRef<Path>,
    output_path: impl AsRef<Path>,
    terms: PropertyTerms,
    config: &GuardConfig,
) -> Result<RiskReport, GuardError> {
    let report = analyze(pdf_path, terms, config).await?;
    report.save(output_path)?;
    Ok(report)
}

/// Synchronous wrapper around [`analyze`].
///
/// Creates a temporary tokio runtime internally; do not call from async code.
pub fn analyze_sync(
    pdf_path: impl AsRef<Path>,
    terms: PropertyTerms,
    config: &GuardConfig,
) -> Result<RiskReport, GuardError> {
    tokio::runtime::Runtime::new()
        .map_err(|e| GuardError::Internal(format!("Failed to create tokio runtime: {}", e)))?
        .block_on(analyze(pdf_path, terms, config))
}

// ── Internal helpers ─────────────────────────────────────────────────────

async fn run<C>(
    source: Source<'_>,
    terms: PropertyTerms,
    config: &GuardConfig,
    cancel: C,
) -> Result<RiskReport, GuardError>
where
    C: Future<Output = ()>,
{
    let total_start = Instant::now();
    tokio::pin!(cancel);

    // Configuration problems surface before anything is uploaded.
    let ingestor = DocumentIngestor::from_config(config)?;
    let model = resolve_chat_model(config)?;
    info!(
        "Starting analysis: market price {}원, deposit {}원, model {}",
        terms.market_price(),
        terms.deposit(),
        model.name()
    );

    // ── Step 1: Document ingest ──────────────────────────────────────────
    let start = Instant::now();
    let parse = async {
        match source {
            Source::Path(path) => ingestor.parse(path).await,
            Source::Bytes { name, bytes } => ingestor.parse_bytes(name, bytes.to_vec()).await,
        }
    };
    let parsed_text = run_stage(
        Stage::Ingest,
        ingest::SERVICE,
        config.parse_timeout_secs,
        config,
        &mut cancel,
        parse,
    )
    .await?;
    let ingest_duration_ms = start.elapsed().as_millis() as u64;
    let parsed_chars = parsed_text.chars().count();
    notify_complete(config, Stage::Ingest, &format!("{parsed_chars} chars"));

    // ── Step 2: Figure extraction ────────────────────────────────────────
    let start = Instant::now();
    let debt_total = run_stage(
        Stage::Extract,
        chat::SERVICE,
        config.api_timeout_secs,
        config,
        &mut cancel,
        extract_debt_total(model.as_ref(), &parsed_text),
    )
    .await?;
    let extract_duration_ms = start.elapsed().as_millis() as u64;
    notify_complete(config, Stage::Extract, &format!("{debt_total}원"));

    // ── Step 3: Report generation ────────────────────────────────────────
    let start = Instant::now();
    let summary = excerpt(&parsed_text, config.excerpt_chars);
    let narrative = run_stage(
        Stage::Report,
        chat::SERVICE,
        config.api_timeout_secs,
        config,
        &mut cancel,
        generate_report(model.as_ref(), &terms, debt_total, summary),
    )
    .await?;
    let report_duration_ms = start.elapsed().as_millis() as u64;
    notify_complete(
        config,
        Stage::Report,
        &format!("{} chars", narrative.chars().count()),
    );

    let debt_ratio_percent = terms.debt_ratio_percent(debt_total);
    let stated_tier = RiskTier::from_narrative(&narrative);
    let stats = RunStats {
        parsed_chars,
        ingest_duration_ms,
        extract_duration_ms,
        report_duration_ms,
        total_duration_ms: total_start.elapsed().as_millis() as u64,
    };

    info!(
        "Analysis complete: debt {}원, ratio {:.1}%, tier {:?}, {}ms total",
        debt_total, debt_ratio_percent, stated_tier, stats.total_duration_ms
    );

    Ok(RiskReport {
        market_price: terms.market_price(),
        deposit: terms.deposit(),
        debt_total,
        debt_ratio_percent,
        stated_tier,
        narrative,
        stats,
    })
}

/// Await one stage under a timeout, racing it against cancellation.
async fn run_stage<T, F, C>(
    stage: Stage,
    service: &str,
    timeout_secs: u64,
    config: &GuardConfig,
    cancel: &mut Pin<&mut C>,
    work: F,
) -> Result<T, GuardError>
where
    F: Future<Output = Result<T, GuardError>>,
    C: Future<Output = ()>,
{
    info!("Step {}: {}", stage.step(), stage);
    if let Some(ref cb) = config.progress_callback {
        cb.on_stage_start(stage);
    }

    let outcome = tokio::select! {
        biased;
        _ = cancel.as_mut() => Err(GuardError::Cancelled),
        res = tokio::time::timeout(Duration::from_secs(timeout_secs), work) => match res {
            Ok(inner) => inner,
            Err(_) => Err(GuardError::Timeout {
                service: service.to_string(),
                secs: timeout_secs,
            }),
        },
    };

    outcome.map_err(|e| {
        let e = e.in_stage(stage);
        warn!("Step {} failed: {}", stage.step(), e);
        if let Some(ref cb) = config.progress_callback {
            cb.on_stage_error(stage, &e.to_string());
        }
        e
    })
}

fn notify_complete(config: &GuardConfig, stage: Stage, detail: &str) {
    debug!("Step {} done: {}", stage.step(), detail);
    if let Some(ref cb) = config.progress_callback {
        cb.on_stage_complete(stage, detail);
    }
}
