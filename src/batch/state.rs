use std::fmt;

use serde::{Deserialize, Serialize};

/// The states of one batch run.
///
/// A batch flows through: NOT_STARTED → SEARCHING → PROGRESSING → COMPLETED,
/// or NOT_STARTED → FAILED when no site is bound.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BatchState {
    NotStarted,
    Searching,
    Progressing,
    Completed,
    Failed,
}

impl fmt::Display for BatchState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BatchState::NotStarted => write!(f, "NOT_STARTED"),
            BatchState::Searching => write!(f, "SEARCHING"),
            BatchState::Progressing => write!(f, "PROGRESSING"),
            BatchState::Completed => write!(f, "COMPLETED"),
            BatchState::Failed => write!(f, "FAILED"),
        }
    }
}

/// What happened while the batch was running.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BatchEvent {
    /// No site is configured for the job.
    SiteMissing,
    /// A site is bound; candidate issues are being looked up.
    SiteBound,
    /// The candidate issues are known.
    IssuesFound,
    /// Every candidate issue has been attempted.
    AllAttempted,
}

impl BatchState {
    /// The state reached from `self` on `event`, or `None` if the event is
    /// not valid here. `Completed` and `Failed` are terminal.
    pub fn next(self, event: BatchEvent) -> Option<BatchState> {
        match (self, event) {
            (BatchState::NotStarted, BatchEvent::SiteMissing) => Some(BatchState::Failed),
            (BatchState::NotStarted, BatchEvent::SiteBound) => Some(BatchState::Searching),
            (BatchState::Searching, BatchEvent::IssuesFound) => Some(BatchState::Progressing),
            (BatchState::Progressing, BatchEvent::AllAttempted) => Some(BatchState::Completed),
            _ => None,
        }
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, BatchState::Completed | BatchState::Failed)
    }
}
