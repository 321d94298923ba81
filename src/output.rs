//! Result types returned by the analysis entry points.

use crate::error::GuardError;
use crate::pipeline::report::RiskTier;
use serde::Serialize;
use std::io::Write;
use std::path::Path;

/// Everything a run produced.
#[derive(Debug, Clone, Serialize)]
pub struct RiskReport {
    /// Market price supplied by the caller, KRW.
    pub market_price: u64,
    /// Tenant deposit supplied by the caller, KRW.
    pub deposit: u64,
    /// Summed 채권최고액 extracted from the document, KRW.
    pub debt_total: u64,
    /// `(debt_total + deposit) / market_price × 100`, computed locally.
    pub debt_ratio_percent: f64,
    /// Tier the model stated in its report, when it followed the layout.
    pub stated_tier: Option<RiskTier>,
    /// The model's report, verbatim. Wording varies between runs.
    pub narrative: String,
    pub stats: RunStats,
}

/// Timing and size figures for a run.
#[derive(Debug, Clone, Default, Serialize)]
pub struct RunStats {
    /// Characters of text the parsing service returned.
    pub parsed_chars: usize,
    pub ingest_duration_ms: u64,
    pub extract_duration_ms: u64,
    pub report_duration_ms: u64,
    pub total_duration_ms: u64,
}

impl RiskReport {
    /// Write the narrative to `path`, replacing any existing file atomically.
    ///
    /// The text goes to a temp file in the target directory first and is
    /// renamed into place, so a failed write never leaves a partial report.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), GuardError> {
        let path = path.as_ref();
        let write_err = |source: std::io::Error| GuardError::OutputWriteFailed {
            path: path.to_path_buf(),
            source,
        };

        let parent = match path.parent() {
            Some(p) if !p.as_os_str().is_empty() => p,
            _ => Path::new("."),
        };
        std::fs::create_dir_all(parent).map_err(write_err)?;

        let mut tmp = tempfile::NamedTempFile::new_in(parent).map_err(write_err)?;
        tmp.write_all(self.narrative.as_bytes()).map_err(write_err)?;
        if !self.narrative.ends_with('\n') {
            tmp.write_all(b"\n").map_err(write_err)?;
        }
        tmp.persist(path).map_err(|e| write_err(e.error))?;
        Ok(())
    }
}
