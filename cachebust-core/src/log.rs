//! Logging collaborator
//!
//! The pipeline reports progress through a [`Logger`] handed to it at
//! construction. Importance decides where a line ends up, never what the
//! pipeline does.

use serde::{Deserialize, Serialize};
use std::io::Write;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Importance {
    /// Per-file detail: digests, skipped candidates
    Low,
    /// Per-file actions: copies, rewrites, deletions
    Normal,
    /// Stage summaries
    High,
}

pub trait Logger: Send + Sync {
    fn log(&self, importance: Importance, message: &str);
}

/// Discards everything
#[derive(Debug, Clone, Copy, Default)]
pub struct NullLogger;

impl Logger for NullLogger {
    fn log(&self, _importance: Importance, _message: &str) {}
}

/// Forwards to `tracing` under the `cachebust` target
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingLogger;

impl Logger for TracingLogger {
    fn log(&self, importance: Importance, message: &str) {
        match importance {
            Importance::High => tracing::info!(target: "cachebust", "{}", message),
            Importance::Normal => tracing::debug!(target: "cachebust", "{}", message),
            Importance::Low => tracing::trace!(target: "cachebust", "{}", message),
        }
    }
}

/// Writes lines at or above a threshold to stderr
#[derive(Debug, Clone, Copy)]
pub struct ConsoleLogger {
    threshold: Importance,
}

impl ConsoleLogger {
    pub fn new(threshold: Importance) -> Self {
        Self { threshold }
    }

    pub fn accepts(&self, importance: Importance) -> bool {
        importance >= self.threshold
    }
}

impl Logger for ConsoleLogger {
    fn log(&self, importance: Importance, message: &str) {
        if self.accepts(importance) {
            let _ = writeln!(std::io::stderr().lock(), "{}", message);
        }
    }
}
