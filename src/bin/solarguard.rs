//! CLI binary for solarguard.
//!
//! A thin shim over the library crate that maps CLI flags to `GuardConfig`,
//! shows stage progress on stderr, and prints the report.

use anyhow::{Context, Result};
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use solarguard::{
    analyze_with_cancel, GuardConfig, GuardError, PipelineProgressCallback, ProgressCallback,
    PropertyTerms, RiskReport, Stage,
};
use std::io::{self, Write};
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tracing_subscriber::EnvFilter;

// ── ANSI colour helpers ──────────────────────────────────────────────────────

fn green(s: &str) -> String {
    format!("\x1b[32m{s}\x1b[0m")
}
fn red(s: &str) -> String {
    format!("\x1b[31m{s}\x1b[0m")
}
fn dim(s: &str) -> String {
    format!("\x1b[2m{s}\x1b[0m")
}
fn bold(s: &str) -> String {
    format!("\x1b[1m{s}\x1b[0m")
}
fn cyan(s: &str) -> String {
    format!("\x1b[36m{s}\x1b[0m")
}

// ── CLI progress callback using indicatif ────────────────────────────────────

/// Spinner on stderr with one log line per finished stage.
struct CliProgressCallback {
    bar: ProgressBar,
    stage_started: Mutex<Option<Instant>>,
}

impl CliProgressCallback {
    fn new() -> Arc<Self> {
        let bar = ProgressBar::new_spinner();
        let style = ProgressStyle::with_template("{spinner:.cyan} {prefix:.bold}  {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"]);
        bar.set_style(style);
        bar.set_prefix("Preparing");
        bar.enable_steady_tick(Duration::from_millis(80));

        Arc::new(Self {
            bar,
            stage_started: Mutex::new(None),
        })
    }

    fn elapsed_secs(&self) -> f64 {
        self.stage_started
            .lock()
            .ok()
            .and_then(|mut t| t.take())
            .map(|t| t.elapsed().as_secs_f64())
            .unwrap_or(0.0)
    }

    fn finish(&self) {
        self.bar.finish_and_clear();
    }
}

fn stage_message(stage: Stage) -> &'static str {
    match stage {
        Stage::Ingest => "Parsing document (Document Parse)…",
        Stage::Extract => "Extracting claim ceiling total (Solar)…",
        Stage::Report => "Writing risk report (Solar)…",
    }
}

impl PipelineProgressCallback for CliProgressCallback {
    fn on_stage_start(&self, stage: Stage) {
        if let Ok(mut t) = self.stage_started.lock() {
            *t = Some(Instant::now());
        }
        self.bar.set_prefix(format!("Step {}/3", stage.step()));
        self.bar.set_message(stage_message(stage));
    }

    fn on_stage_complete(&self, stage: Stage, detail: &str) {
        let secs = self.elapsed_secs();
        self.bar.println(format!(
            "  {} Step {}/3  {:<18}  {}  {}",
            green("✓"),
            stage.step(),
            stage.to_string(),
            bold(detail),
            dim(&format!("{secs:.1}s")),
        ));
    }

    fn on_stage_error(&self, stage: Stage, error: &str) {
        let secs = self.elapsed_secs();
        // Keep the line short; the full error is printed on exit.
        let msg: String = if error.chars().count() > 80 {
            format!("{}\u{2026}", error.chars().take(79).collect::<String>())
        } else {
            error.to_string()
        };
        self.bar.println(format!(
            "  {} Step {}/3  {}  {}",
            red("✗"),
            stage.step(),
            red(&msg),
            dim(&format!("{secs:.1}s")),
        ));
    }
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # Analyse a registration PDF (amounts in KRW)
  solarguard registry.pdf --market-price 500,000,000 --deposit 350,000,000

  # Save the report and print structured JSON
  solarguard registry.pdf --market-price 500000000 --deposit 350000000 -o report.md
  solarguard registry.pdf --market-price 500000000 --deposit 350000000 --json

  # Run the model calls on another provider (document parsing stays on Upstage)
  solarguard registry.pdf --market-price 500000000 --deposit 350000000 \
      --provider openai --model gpt-4.1-mini

ENVIRONMENT VARIABLES:
  UPSTAGE_API_KEY         Upstage API key (required)
  SOLARGUARD_MODEL        Override chat model ID
  SOLARGUARD_PROVIDER     Route chat calls through an edgequake-llm provider
  OPENAI_API_KEY, …       Keys for the chosen --provider
  RUST_LOG                Log filter (overrides -v / -q)
"#;

/// Jeonse risk report from a property registration PDF.
#[derive(Parser, Debug)]
#[command(
    name = "solarguard",
    version,
    about = "Jeonse risk report from a property registration PDF",
    long_about = "Parses a Korean property registration document (등기부등본) with Upstage \
Document Parse, extracts the total registered claim ceiling (채권최고액) with a chat model, \
and writes a tenant-facing risk report from it and the amounts you supply.",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    /// Registration document (PDF).
    input: PathBuf,

    /// Market price of the property, KRW. Accepts 500,000,000 or 500_000_000.
    #[arg(long, value_parser = parse_amount)]
    market_price: u64,

    /// Tenant deposit, KRW.
    #[arg(long, value_parser = parse_amount)]
    deposit: u64,

    /// Upstage API key.
    #[arg(long, env = "UPSTAGE_API_KEY", hide_env_values = true)]
    api_key: Option<String>,

    /// Chat model ID.
    #[arg(long, env = "SOLARGUARD_MODEL", default_value = solarguard::config::DEFAULT_MODEL)]
    model: String,

    /// Chat provider (openai, anthropic, gemini, ollama, …). Default: Upstage Solar.
    #[arg(long, env = "SOLARGUARD_PROVIDER")]
    provider: Option<String>,

    /// Base URL of the OpenAI-compatible chat API.
    #[arg(long, env = "SOLARGUARD_CHAT_BASE_URL", default_value = solarguard::config::DEFAULT_CHAT_BASE_URL)]
    chat_base_url: String,

    /// Document Parse endpoint.
    #[arg(long, env = "SOLARGUARD_PARSE_URL", default_value = solarguard::config::DEFAULT_PARSE_URL)]
    parse_url: String,

    /// Characters of parsed text quoted in the report prompt.
    #[arg(long, default_value_t = solarguard::config::DEFAULT_EXCERPT_CHARS)]
    excerpt_chars: usize,

    /// Sampling temperature (0.0–2.0). Default: service default.
    #[arg(long)]
    temperature: Option<f32>,

    /// Document upload + parse timeout in seconds.
    #[arg(long, env = "SOLARGUARD_PARSE_TIMEOUT", default_value_t = 120)]
    parse_timeout: u64,

    /// Per chat call timeout in seconds.
    #[arg(long, env = "SOLARGUARD_API_TIMEOUT", default_value_t = 60)]
    api_timeout: u64,

    /// Write the report to this file instead of stdout.
    #[arg(short, long, conflicts_with = "json")]
    output: Option<PathBuf>,

    /// Print the structured result (figures + report) as JSON.
    #[arg(long)]
    json: bool,

    /// Disable the progress spinner.
    #[arg(long)]
    no_progress: bool,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long)]
    verbose: bool,

    /// Suppress all output except the report and errors.
    #[arg(short, long)]
    quiet: bool,
}

/// Parse a KRW amount, ignoring `,` and `_` digit separators.
fn parse_amount(s: &str) -> Result<u64, String> {
    let cleaned: String = s.chars().filter(|c| *c != ',' && *c != '_').collect();
    cleaned
        .trim()
        .parse::<u64>()
        .map_err(|_| format!("'{s}' is not a whole number of won"))
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    // The spinner gives all the feedback that matters; library INFO logs
    // would only interleave with it.
    let show_progress = !cli.quiet && !cli.no_progress && !cli.json;
    let filter = if cli.verbose {
        "debug"
    } else if cli.quiet || show_progress {
        "error"
    } else {
        "info"
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_writer(io::stderr)
        .init();

    let terms = PropertyTerms::new(cli.market_price, cli.deposit).context("Invalid amounts")?;

    let progress = if show_progress {
        Some(CliProgressCallback::new())
    } else {
        None
    };
    let config = build_config(&cli, progress.clone().map(|p| p as ProgressCallback))?;

    let cancel = async {
        if tokio::signal::ctrl_c().await.is_err() {
            // No signal handler available; never cancel.
            std::future::pending::<()>().await;
        }
    };

    if show_progress {
        eprintln!(
            "{} {}",
            cyan("◆"),
            bold(&format!("Analysing {}…", cli.input.display()))
        );
    }

    let started = Instant::now();
    let result = analyze_with_cancel(&cli.input, terms, &config, cancel).await;
    if let Some(ref p) = progress {
        p.finish();
    }

    let report = match result {
        Ok(report) => report,
        Err(GuardError::Cancelled) => {
            eprintln!("{} Cancelled", red("✘"));
            std::process::exit(130);
        }
        Err(e) => return Err(e).context("Analysis failed"),
    };

    if cli.json {
        let json = serde_json::to_string_pretty(&report).context("Failed to serialise report")?;
        println!("{json}");
    } else if let Some(ref path) = cli.output {
        report
            .save(path)
            .with_context(|| format!("Failed to save report to {}", path.display()))?;
    } else {
        print_report(&report).context("Failed to write to stdout")?;
    }

    if !cli.quiet && !cli.json {
        eprintln!(
            "{}  debt {}원  ratio {:.1}%  tier {}  {}ms{}",
            green("✔"),
            bold(&report.debt_total.to_string()),
            report.debt_ratio_percent,
            report
                .stated_tier
                .map(|t| t.label().to_string())
                .unwrap_or_else(|| dim("?")),
            started.elapsed().as_millis(),
            cli.output
                .as_ref()
                .map(|p| format!("  →  {}", bold(&p.display().to_string())))
                .unwrap_or_default(),
        );
    }

    Ok(())
}

/// Map CLI args to `GuardConfig`.
fn build_config(cli: &Cli, progress: Option<ProgressCallback>) -> Result<GuardConfig> {
    let mut builder = GuardConfig::builder()
        .api_key(cli.api_key.clone().unwrap_or_default())
        .model(cli.model.clone())
        .chat_base_url(cli.chat_base_url.clone())
        .parse_url(cli.parse_url.clone())
        .excerpt_chars(cli.excerpt_chars)
        .parse_timeout_secs(cli.parse_timeout)
        .api_timeout_secs(cli.api_timeout);

    if let Some(ref provider) = cli.provider {
        builder = builder.provider_name(provider.clone());
    }
    if let Some(t) = cli.temperature {
        builder = builder.temperature(t);
    }
    if let Some(cb) = progress {
        builder = builder.progress_callback(cb);
    }

    builder.build().context("Invalid configuration")
}

fn print_report(report: &RiskReport) -> io::Result<()> {
    let stdout = io::stdout();
    let mut handle = stdout.lock();
    let rule = "=".repeat(50);
    writeln!(handle, "{rule}")?;
    writeln!(handle, "{}", bold("🏠 SolarGuard 전세 안심 보고서"))?;
    writeln!(handle, "{rule}")?;
    handle.write_all(report.narrative.as_bytes())?;
    if !report.narrative.ends_with('\n') {
        handle.write_all(b"\n")?;
    }
    Ok(())
}
