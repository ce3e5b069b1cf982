use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::state::{BatchEvent, BatchState};

/// Result of one step (transition or comment) for one issue.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", content = "detail", rename_all = "snake_case")]
pub enum StepOutcome {
    /// Nothing was requested for this step.
    Skipped,
    /// The remote mutation succeeded.
    Applied,
    /// No available transition has the requested name.
    NoMatch,
    /// A remote call failed; the error message is kept.
    Failed(String),
}

impl StepOutcome {
    pub fn is_failure(&self) -> bool {
        matches!(self, StepOutcome::Failed(_))
    }
}

/// What happened to one issue.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IssueReport {
    pub key: String,
    pub transition: StepOutcome,
    pub comment: StepOutcome,
}

impl IssueReport {
    pub fn new(key: &str) -> Self {
        Self {
            key: key.to_string(),
            transition: StepOutcome::Skipped,
            comment: StepOutcome::Skipped,
        }
    }

    pub fn has_failures(&self) -> bool {
        self.transition.is_failure() || self.comment.is_failure()
    }
}

/// Structured record produced by every batch run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchReport {
    pub run_id: Uuid,
    /// The JQL query, or a description of the identifier source.
    pub source: String,
    pub state: BatchState,
    pub state_history: Vec<BatchState>,
    pub issues: Vec<IssueReport>,
    /// Identifiers from the change log that the tracker does not know.
    pub unknown_keys: Vec<String>,
    pub started_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
    pub duration_ms: Option<i64>,
}

impl BatchReport {
    pub fn new(source: impl Into<String>) -> Self {
        Self {
            run_id: Uuid::new_v4(),
            source: source.into(),
            state: BatchState::NotStarted,
            state_history: Vec::new(),
            issues: Vec::new(),
            unknown_keys: Vec::new(),
            started_at: Utc::now(),
            completed_at: None,
            duration_ms: None,
        }
    }

    /// Applies `event`. Returns `false`, leaving the report untouched, when
    /// the event is not valid in the current state.
    pub fn advance(&mut self, event: BatchEvent) -> bool {
        let Some(next) = self.state.next(event) else {
            return false;
        };
        self.state_history.push(self.state);
        self.state = next;
        if next.is_terminal() {
            let now = Utc::now();
            self.completed_at = Some(now);
            self.duration_ms = Some((now - self.started_at).num_milliseconds());
        }
        true
    }

    pub fn record(&mut self, issue: IssueReport) {
        self.issues.push(issue);
    }

    /// `true` when the batch ran to completion, whatever happened to the
    /// individual issues.
    pub fn succeeded(&self) -> bool {
        self.state == BatchState::Completed
    }

    /// Number of issues with at least one failed step.
    pub fn failed_issues(&self) -> usize {
        self.issues.iter().filter(|i| i.has_failures()).count()
    }

    /// Full state sequence, current state included.
    pub fn transitions(&self) -> Vec<BatchState> {
        let mut states = self.state_history.clone();
        states.push(self.state);
        states
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_report_defaults() {
        let report = BatchReport::new("project = ABC");
        assert_eq!(report.state, BatchState::NotStarted);
        assert!(report.issues.is_empty());
        assert!(report.completed_at.is_none());
        assert!(!report.succeeded());
        assert_eq!(report.run_id.get_version_num(), 4);
    }

    #[test]
    fn completed_run_records_history_and_duration() {
        let mut report = BatchReport::new("jql");
        assert!(report.advance(BatchEvent::SiteBound));
        assert!(report.advance(BatchEvent::IssuesFound));
        assert!(report.advance(BatchEvent::AllAttempted));

        assert!(report.succeeded());
        assert!(report.completed_at.is_some());
        assert!(report.duration_ms.unwrap() >= 0);
        assert_eq!(
            report.transitions(),
            vec![
                BatchState::NotStarted,
                BatchState::Searching,
                BatchState::Progressing,
                BatchState::Completed
            ]
        );
    }

    #[test]
    fn invalid_event_is_ignored() {
        let mut report = BatchReport::new("jql");
        assert!(!report.advance(BatchEvent::AllAttempted));
        assert_eq!(report.state, BatchState::NotStarted);
        assert!(report.state_history.is_empty());
    }

    #[test]
    fn failed_issues_counts_only_failures() {
        let mut report = BatchReport::new("jql");
        let mut ok = IssueReport::new("ABC-1");
        ok.transition = StepOutcome::Applied;
        let mut no_match = IssueReport::new("ABC-2");
        no_match.transition = StepOutcome::NoMatch;
        let mut broken = IssueReport::new("ABC-3");
        broken.comment = StepOutcome::Failed("403".into());
        report.record(ok);
        report.record(no_match);
        report.record(broken);

        assert_eq!(report.failed_issues(), 1);
    }

    #[test]
    fn step_outcome_serializes_tagged() {
        let json = serde_json::to_value(StepOutcome::Failed("boom".into())).unwrap();
        assert_eq!(json, serde_json::json!({"outcome": "failed", "detail": "boom"}));
        let json = serde_json::to_value(StepOutcome::NoMatch).unwrap();
        assert_eq!(json, serde_json::json!({"outcome": "no_match"}));
    }
}
