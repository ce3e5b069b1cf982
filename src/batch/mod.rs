mod report;
mod state;

pub use report::{BatchReport, IssueReport, StepOutcome};
pub use state::{BatchEvent, BatchState};
