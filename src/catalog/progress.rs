//! Progress reporting for the scrape.
//!
//! Reporting is a capability passed into the aggregator rather than shared
//! module state, so aggregation is testable without a live sink.

use tracing::{debug, info};

/// The four sub-phases of one page-pair, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    FetchExpanded,
    FetchUnexpanded,
    ParseExpanded,
    ParseUnexpanded,
}

impl Phase {
    pub fn label(self) -> &'static str {
        match self {
            Self::FetchExpanded => "fetch-expanded",
            Self::FetchUnexpanded => "fetch-unexpanded",
            Self::ParseExpanded => "parse-expanded",
            Self::ParseUnexpanded => "parse-unexpanded",
        }
    }

    /// Fraction of the page-pair completed once this phase finishes.
    pub fn fraction(self) -> f32 {
        match self {
            Self::FetchExpanded => 0.25,
            Self::FetchUnexpanded => 0.5,
            Self::ParseExpanded => 0.75,
            Self::ParseUnexpanded => 1.0,
        }
    }
}

/// Sink for per-page-pair and overall progress events.
pub trait ProgressSink: Send + Sync {
    /// A page-pair entered `phase`.
    fn phase(&self, page: usize, phase: Phase);
    /// A page-pair finished; `completed` of `total` are done.
    fn page_complete(&self, completed: usize, total: usize);
}

/// [`ProgressSink`] that reports through tracing.
pub struct LogProgress;

impl ProgressSink for LogProgress {
    fn phase(&self, page: usize, phase: Phase) {
        debug!(
            page,
            phase = phase.label(),
            progress = phase.fraction(),
            "page phase"
        );
    }

    fn page_complete(&self, completed: usize, total: usize) {
        info!(completed, total, "page-pair complete");
    }
}

/// Silent sink.
pub struct NoProgress;

impl ProgressSink for NoProgress {
    fn phase(&self, _page: usize, _phase: Phase) {}
    fn page_complete(&self, _completed: usize, _total: usize) {}
}
