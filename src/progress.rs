//! Progress-callback trait for per-stage pipeline events.
//!
//! Inject an [`Arc<dyn PipelineProgressCallback>`] via
//! [`crate::config::GuardConfigBuilder::progress_callback`] to hear about
//! each stage as it starts, finishes, or fails. The CLI uses this to drive
//! its spinner; library users can forward events anywhere they like.
//!
//! # Example
//!
//! ```rust
//! use solarguard::{GuardConfig, PipelineProgressCallback, Stage};
//! use std::sync::Arc;
//!
//! struct Printer;
//!
//! impl PipelineProgressCallback for Printer {
//!     fn on_stage_start(&self, stage: Stage) {
//!         eprintln!("Step {}: {}", stage.step(), stage);
//!     }
//! }
//!
//! let config = GuardConfig::builder()
//!     .api_key("up_xxx")
//!     .progress_callback(Arc::new(Printer))
//!     .build()
//!     .unwrap();
//! ```

use crate::error::Stage;
use std::sync::Arc;

/// Called by the pipeline around each of its three stages.
///
/// All methods default to no-ops so implementors override only what they need.
/// Stages run strictly in order, so calls never overlap within one run.
pub trait PipelineProgressCallback: Send + Sync {
    /// Called just before a stage issues its network request.
    fn on_stage_start(&self, stage: Stage) {
        let _ = stage;
    }

    /// Called when a stage succeeds.
    ///
    /// `detail` is a short human-readable summary of what the stage produced
    /// (character count, extracted figure, report length).
    fn on_stage_complete(&self, stage: Stage, detail: &str) {
        let _ = (stage, detail);
    }

    /// Called when a stage fails. No further stages run afterwards.
    fn on_stage_error(&self, stage: Stage, error: &str) {
        let _ = (stage, error);
    }
}

/// A no-op implementation for callers that don't need progress events.
pub struct NoopProgressCallback;

impl PipelineProgressCallback for NoopProgressCallback {}

/// Convenience alias matching the type stored in [`crate::config::GuardConfig`].
pub type ProgressCallback = Arc<dyn PipelineProgressCallback>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[derive(Default)]
    struct Recorder {
        events: Mutex<Vec<String>>,
    }

    impl PipelineProgressCallback for Recorder {
        fn on_stage_start(&self, stage: Stage) {
            self.events.lock().unwrap().push(format!("start {}", stage.step()));
        }

        fn on_stage_complete(&self, stage: Stage, detail: &str) {
            self.events
                .lock()
                .unwrap()
                .push(format!("done {} {detail}", stage.step()));
        }

        fn on_stage_error(&self, stage: Stage, _error: &str) {
            self.events.lock().unwrap().push(format!("fail {}", stage.step()));
        }
    }

    #[test]
    fn noop_callback_does_not_panic() {
        let cb = NoopProgressCallback;
        cb.on_stage_start(Stage::Ingest);
        cb.on_stage_complete(Stage::Ingest, "1200 chars");
        cb.on_stage_error(Stage::Extract, "boom");
    }

    #[test]
    fn recorder_sees_events_in_order() {
        let rec = Recorder::default();
        rec.on_stage_start(Stage::Ingest);
        rec.on_stage_complete(Stage::Ingest, "ok");
        rec.on_stage_start(Stage::Extract);
        rec.on_stage_error(Stage::Extract, "bad reply");

        let events = rec.events.lock().unwrap().clone();
        assert_eq!(events, vec!["start 1", "done 1 ok", "start 2", "fail 2"]);
    }

    #[test]
    fn arc_dyn_callback_works() {
        let cb: ProgressCallback = Arc::new(NoopProgressCallback);
        cb.on_stage_start(Stage::Report);
    }
}
