//! # solarguard
//!
//! Jeonse (전세) risk reports from Korean property registration documents
//! (등기부등본), built on Upstage Document Parse and the Solar chat API.
//!
//! ## Pipeline Overview
//!
//! ```text
//! PDF + market price + deposit
//!  │
//!  ├─ 1. Ingest   upload the PDF to Document Parse, get structured text
//!  ├─ 2. Extract  ask the model for the summed 채권최고액, parse it strictly
//!  └─ 3. Report   ask the model for the four-part 전세 안심 보고서
//! ```
//!
//! The stages run strictly in sequence; each one's output feeds the next.
//! Each stage has its own timeout, the whole run can be cancelled, and the
//! first failure aborts the run with an error naming the stage.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use solarguard::{analyze, GuardConfig, PropertyTerms};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     // API key read from UPSTAGE_API_KEY
//!     let config = GuardConfig::from_env()?;
//!     let terms = PropertyTerms::new(500_000_000, 350_000_000)?;
//!     let report = analyze("registry.pdf", terms, &config).await?;
//!     println!("{}", report.narrative);
//!     eprintln!("debt {}원, ratio {:.0}%", report.debt_total, report.debt_ratio_percent);
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `solarguard` binary (clap + anyhow + tracing-subscriber + indicatif) |
//!
//! ## Testing without a model
//!
//! Both model calls go through the [`ChatModel`] trait. Put a stub on
//! [`GuardConfigBuilder::chat_model`] to drive the pipeline with canned
//! replies.

// ── Modules ──────────────────────────────────────────────────────────────

pub mod analyze;
pub mod config;
pub mod error;
pub mod output;
pub mod pipeline;
pub mod progress;
pub mod prompts;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use analyze::{analyze, analyze_bytes, analyze_sync, analyze_to_file, analyze_with_cancel};
pub use config::{GuardConfig, GuardConfigBuilder, API_KEY_ENV};
pub use error::{ErrorKind, GuardError, Stage};
pub use output::{RiskReport, RunStats};
pub use pipeline::chat::{ChatModel, Message, ProviderChat, Role, SolarChat};
pub use pipeline::ingest::DocumentIngestor;
pub use pipeline::report::{PropertyTerms, RiskTier};
pub use progress::{NoopProgressCallback, PipelineProgressCallback, ProgressCallback};
