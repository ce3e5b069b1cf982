//! In-memory [`IssueTracker`] that records every call, for tests.

use std::collections::{HashMap, HashSet};
use std::sync::Mutex;

use super::client::IssueTracker;
use super::error::TrackerError;
use super::types::{IssueRef, TransitionCandidate};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    Search(String),
    GetIssue(String),
    ListTransitions(String),
    ApplyTransition(String, u64),
    AddComment {
        key: String,
        body: String,
        group: Option<String>,
        role: Option<String>,
    },
}

#[derive(Default)]
pub struct RecordingTracker {
    issues: Vec<IssueRef>,
    transitions: Vec<TransitionCandidate>,
    transitions_by_key: HashMap<String, Vec<TransitionCandidate>>,
    failing_keys: HashSet<String>,
    failing_search: bool,
    canonical_keys: bool,
    calls: Mutex<Vec<Call>>,
}

impl RecordingTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Issues known to the tracker, returned by every search.
    pub fn with_issues(mut self, keys: &[&str]) -> Self {
        self.issues = keys.iter().map(|k| IssueRef::from_key(*k)).collect();
        self
    }

    /// Transitions offered for every issue without a specific list.
    pub fn with_transitions(mut self, transitions: Vec<TransitionCandidate>) -> Self {
        self.transitions = transitions;
        self
    }

    pub fn with_transitions_for(mut self, key: &str, transitions: Vec<TransitionCandidate>) -> Self {
        self.transitions_by_key.insert(key.to_string(), transitions);
        self
    }

    /// Every per-issue call for `key` fails with a 403.
    pub fn failing_on(mut self, key: &str) -> Self {
        self.failing_keys.insert(key.to_string());
        self
    }

    /// `get_issue` finds issues whatever the case of the key and answers
    /// with the stored key, the way Jira does.
    pub fn canonicalising_keys(mut self) -> Self {
        self.canonical_keys = true;
        self
    }

    pub fn failing_search(mut self) -> Self {
        self.failing_search = true;
        self
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    pub fn count(&self, pred: impl Fn(&Call) -> bool) -> usize {
        self.calls.lock().unwrap().iter().filter(|c| pred(*c)).count()
    }

    pub fn searches(&self) -> usize {
        self.count(|c| matches!(c, Call::Search(_)))
    }

    pub fn transition_lookups(&self) -> usize {
        self.count(|c| matches!(c, Call::ListTransitions(_)))
    }

    pub fn applied(&self) -> Vec<(String, u64)> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                Call::ApplyTransition(key, id) => Some((key, id)),
                _ => None,
            })
            .collect()
    }

    pub fn comments(&self) -> Vec<Call> {
        self.calls()
            .into_iter()
            .filter(|c| matches!(c, Call::AddComment { .. }))
            .collect()
    }

    fn record(&self, call: Call) {
        self.calls.lock().unwrap().push(call);
    }

    fn check(&self, key: &str) -> Result<(), TrackerError> {
        if self.failing_keys.contains(key) {
            return Err(TrackerError::ApiError {
                status: 403,
                message: format!("no permission on {key}"),
            });
        }
        Ok(())
    }
}

impl IssueTracker for RecordingTracker {
    async fn search_issues(&self, jql: &str) -> Result<Vec<IssueRef>, TrackerError> {
        self.record(Call::Search(jql.to_string()));
        if self.failing_search {
            return Err(TrackerError::ApiError {
                status: 400,
                message: "Error in the JQL Query".into(),
            });
        }
        Ok(self.issues.clone())
    }

    async fn get_issue(&self, key: &str) -> Result<Option<IssueRef>, TrackerError> {
        self.record(Call::GetIssue(key.to_string()));
        self.check(key)?;
        Ok(self
            .issues
            .iter()
            .find(|i| i.key == key || (self.canonical_keys && i.key.eq_ignore_ascii_case(key)))
            .cloned())
    }

    async fn available_transitions(
        &self,
        key: &str,
    ) -> Result<Vec<TransitionCandidate>, TrackerError> {
        self.record(Call::ListTransitions(key.to_string()));
        self.check(key)?;
        Ok(self
            .transitions_by_key
            .get(key)
            .unwrap_or(&self.transitions)
            .clone())
    }

    async fn apply_transition(&self, key: &str, transition_id: u64) -> Result<(), TrackerError> {
        self.record(Call::ApplyTransition(key.to_string(), transition_id));
        self.check(key)
    }

    async fn add_comment(
        &self,
        key: &str,
        body: &str,
        group: Option<&str>,
        role: Option<&str>,
    ) -> Result<(), TrackerError> {
        self.record(Call::AddComment {
            key: key.to_string(),
            body: body.to_string(),
            group: group.map(str::to_string),
            role: role.map(str::to_string),
        });
        self.check(key)
    }
}
