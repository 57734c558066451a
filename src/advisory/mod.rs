//! Advisory Pipeline
//!
//! Operators ask free-text questions; answers arrive asynchronously with a
//! reasoning trace. The engine records the question and hands a job to the
//! [`AdvisoryWorker`], which processes jobs strictly FIFO, one at a time:
//!
//! ```text
//! submit ──► engine (user message, thinking = true)
//!              │ job
//!              ▼
//!           worker ── sleep(latency) ── snapshot ── composer ──► engine
//!                                                   (response or unavailable notice)
//! ```
//!
//! The worker holds only a weak reference to the engine mailbox. Once every
//! engine handle is gone, pending jobs are dropped without delivering
//! anything.

mod composer;
mod worker;

pub use composer::{AdvisoryComposer, AdvisoryReply, TemplateComposer};
pub use worker::{AdvisoryJob, AdvisoryWorker};

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum AdvisoryError {
    #[error("Advisory request is empty")]
    EmptyRequest,

    #[error("Advisory queue is full ({0} requests pending)")]
    QueueFull(usize),

    #[error("Advisory composer failed: {0}")]
    ComposerFailed(String),
}
