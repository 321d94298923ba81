//! Pipeline stages for the jeonse risk analysis.
//!
//! Each submodule implements exactly one step, so each can be tested on its
//! own and the model-facing steps can be driven by a stubbed [`chat::ChatModel`].
//!
//! ## Data Flow
//!
//! ```text
//! ingest ──▶ extract ──▶ report
//! (PDF→text)  (text→KRW)  (figures→narrative)
//! ```
//!
//! 1. [`ingest`]   upload the PDF to Document Parse, return its text
//! 2. [`extract`]  ask the chat model for the summed 채권최고액, parse it strictly
//! 3. [`report`]   ask the chat model for the four-part risk report
//!
//! [`chat`] holds the model seam and its implementations; [`http`] the status
//! and transport-error mapping both HTTP services share.

pub mod chat;
pub mod extract;
pub(crate) mod http;
pub mod ingest;
pub mod report;
