//! Structured progress reporting for ingestion.
//!
//! Provides observable, incremental feedback during the extract, chunk,
//! embed and persist phases so interactive callers can show that work is
//! under way.

use std::sync::Arc;
use std::time::Instant;

/// Progress event emitted during ingestion.
#[derive(Debug, Clone)]
pub struct ProgressEvent {
    /// Phase of the operation: "extract", "chunk", "embed", "persist"
    pub phase: String,

    /// Current progress (documents extracted, chunks embedded, etc.)
    pub current: u64,

    /// Total expected work (if known)
    pub total: Option<u64>,

    /// Percentage complete (0.0 - 100.0)
    pub percentage: Option<f64>,

    /// Human-readable message
    pub message: String,

    /// Elapsed time since the reporter was created
    pub elapsed_secs: Option<f64>,
}

impl ProgressEvent {
    pub fn new(
        phase: impl Into<String>,
        current: u64,
        total: Option<u64>,
        message: impl Into<String>,
    ) -> Self {
        let percentage = total.map(|t| {
            if t > 0 {
                (current as f64 / t as f64) * 100.0
            } else {
                0.0
            }
        });

        Self {
            phase: phase.into(),
            current,
            total,
            percentage,
            message: message.into(),
            elapsed_secs: None,
        }
    }

    pub fn with_elapsed(mut self, elapsed_secs: f64) -> Self {
        self.elapsed_secs = Some(elapsed_secs);
        self
    }

    /// Format as a simple user-facing line.
    pub fn format_simple(&self) -> String {
        let progress = if let Some(total) = self.total {
            format!("{}/{}", self.current, total)
        } else {
            format!("{}", self.current)
        };

        let pct = if let Some(p) = self.percentage {
            format!(" ({:.0}%)", p)
        } else {
            String::new()
        };

        format!("[{}] {}{} - {}", self.phase, progress, pct, self.message)
    }
}

/// Callback for progress events.
pub type ProgressCallback = Arc<dyn Fn(ProgressEvent) + Send + Sync>;

/// Progress reporter that emits events through a callback.
#[derive(Clone)]
pub struct ProgressReporter {
    callback: Option<ProgressCallback>,
    start_time: Arc<Instant>,
}

impl ProgressReporter {
    pub fn new(callback: ProgressCallback) -> Self {
        Self {
            callback: Some(callback),
            start_time: Arc::new(Instant::now()),
        }
    }

    /// Create a no-op reporter (no events emitted).
    pub fn noop() -> Self {
        Self {
            callback: None,
            start_time: Arc::new(Instant::now()),
        }
    }

    pub fn emit(&self, event: ProgressEvent) {
        if let Some(callback) = &self.callback {
            let elapsed = self.start_time.elapsed().as_secs_f64();
            let event_with_time = event.with_elapsed(elapsed);

            tracing::debug!(
                phase = %event_with_time.phase,
                current = event_with_time.current,
                total = ?event_with_time.total,
                message = %event_with_time.message,
                elapsed_secs = elapsed,
                "Progress event"
            );

            callback(event_with_time);
        }
    }

    /// A document's text has been extracted.
    pub fn extract(&self, current: u64, total: u64, document: &str, pages: usize) {
        self.emit(ProgressEvent::new(
            "extract",
            current,
            Some(total),
            format!("{} ({} pages)", document, pages),
        ));
    }

    pub fn chunk(&self, current: u64, total: u64, document: &str, chunks_created: usize) {
        self.emit(ProgressEvent::new(
            "chunk",
            current,
            Some(total),
            format!("{}: {} chunks", document, chunks_created),
        ));
    }

    pub fn embed(&self, current: u64, total: u64, model: &str) {
        self.emit(ProgressEvent::new(
            "embed",
            current,
            Some(total),
            format!("model={}", model),
        ));
    }

    pub fn persist(&self, entries: u64, location: &str) {
        self.emit(ProgressEvent::new(
            "persist",
            entries,
            None,
            format!("writing to {}", location),
        ));
    }
}

impl Default for ProgressReporter {
    fn default() -> Self {
        Self::noop()
    }
}
