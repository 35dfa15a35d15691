//! Progress events emitted at phase boundaries.

use serde::Serialize;
use std::fmt;
use std::time::Duration;

/// Pipeline phase a URL has just entered or finished.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    Screening,
    Fetching,
    Validating,
    Inferring,
    Synthesizing,
    Complete,
    Skipped,
}

impl Phase {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Screening => "screening",
            Self::Fetching => "fetching",
            Self::Validating => "validating",
            Self::Inferring => "inferring",
            Self::Synthesizing => "synthesizing",
            Self::Complete => "complete",
            Self::Skipped => "skipped",
        }
    }

    /// Whether the URL is done after this phase.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Complete | Self::Skipped)
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One phase transition for one URL.
#[derive(Debug, Clone, Serialize)]
pub struct ProgressEvent {
    /// Position of the URL in the input list
    pub url_index: usize,
    pub url: String,
    pub phase: Phase,
    /// Time since the run started
    pub elapsed: Duration,
    /// Rough time left for the whole run, once at least one URL finished
    pub estimated_remaining: Option<Duration>,
}

/// Receiver of progress events.
///
/// Called synchronously from worker tasks, so implementations should return
/// quickly.
pub trait ProgressSink: Send + Sync {
    fn on_event(&self, event: &ProgressEvent);
}

impl<F> ProgressSink for F
where
    F: Fn(&ProgressEvent) + Send + Sync,
{
    fn on_event(&self, event: &ProgressEvent) {
        self(event)
    }
}

/// Sink that drops every event.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoProgress;

impl ProgressSink for NoProgress {
    fn on_event(&self, _event: &ProgressEvent) {}
}

/// Estimate time left from the average time per finished URL.
pub fn estimate_remaining(elapsed: Duration, finished: usize, total: usize) -> Option<Duration> {
    if finished == 0 || finished >= total {
        return (finished >= total && total > 0).then_some(Duration::ZERO);
    }
    let per_url = elapsed / finished as u32;
    Some(per_url * (total - finished) as u32)
}
