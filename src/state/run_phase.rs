/// Run phase definitions for a single collection scrape
///
/// A run moves `Init -> CountingTotal -> Planning -> FetchingConcurrent`
/// and ends in either `Completed` or `PartiallyFailed`.
use std::fmt;

/// Represents the current phase of a collection run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RunPhase {
    // ===== Active Phases =====
    /// Run created, nothing requested yet
    Init,

    /// Querying the remote total record count
    CountingTotal,

    /// Loading the checkpoint and computing pending pages
    Planning,

    /// Workers are fetching pages
    FetchingConcurrent,

    // ===== Terminal Phases =====
    /// Every pending page succeeded; checkpoint equals total pages
    Completed,

    /// At least one page failed and is listed in the run summary
    PartiallyFailed,
}

impl RunPhase {
    /// Returns true if the run has finished
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::PartiallyFailed)
    }

    /// Returns true if the run finished with every page fetched
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Completed)
    }

    /// Returns true if `next` is a legal successor of this phase
    pub fn can_transition_to(&self, next: RunPhase) -> bool {
        matches!(
            (self, next),
            (Self::Init, Self::CountingTotal)
                | (Self::CountingTotal, Self::Planning)
                | (Self::Planning, Self::FetchingConcurrent)
                | (Self::FetchingConcurrent, Self::Completed)
                | (Self::FetchingConcurrent, Self::PartiallyFailed)
        )
    }

    /// Advances to `next`, logging the transition
    ///
    /// Illegal transitions are logged and ignored; the phase only ever
    /// moves forward along the run protocol.
    pub fn advance(&mut self, next: RunPhase, collection: &str) {
        let from = *self;
        if from.can_transition_to(next) {
            if next.is_terminal() {
                tracing::info!(
                    collection,
                    %from,
                    to = %next,
                    success = next.is_success(),
                    "Run finished"
                );
            } else {
                tracing::debug!(collection, %from, to = %next, "Run phase transition");
            }
            *self = next;
        } else {
            tracing::warn!(
                collection,
                %from,
                to = %next,
                "Ignoring invalid run phase transition"
            );
        }
    }

    /// Stable lowercase name used in logs and reports
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Init => "init",
            Self::CountingTotal => "counting_total",
            Self::Planning => "planning",
            Self::FetchingConcurrent => "fetching_concurrent",
            Self::Completed => "completed",
            Self::PartiallyFailed => "partially_failed",
        }
    }
}

impl fmt::Display for RunPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
