use std::io::Write;

use tracing::{debug, info, warn};

use crate::batch::{BatchEvent, BatchReport, IssueReport, StepOutcome};
use crate::changelog::ChangeEntry;
use crate::extract::{IssuePattern, extract_from_change_log};
use crate::jira::{IssueTracker, TrackerError};
use crate::resolve::resolve_transition;
use crate::ui::BuildLog;

/// A Jira site bound to a job: where issues live and how they are referenced.
pub struct Site<T> {
    pub url: String,
    pub tracker: T,
    pub issue_pattern: IssuePattern,
}

impl<T> Site<T> {
    pub fn new(url: impl Into<String>, tracker: T) -> Self {
        Self {
            url: url.into(),
            tracker,
            issue_pattern: IssuePattern::default(),
        }
    }

    pub fn with_issue_pattern(mut self, pattern: IssuePattern) -> Self {
        self.issue_pattern = pattern;
        self
    }
}

/// What to do to every issue of a batch.
///
/// Blank strings count as absent: a blank action means no transition, a
/// blank comment means no comment.
#[derive(Debug, Clone, Default)]
pub struct ProgressRequest {
    pub search_query: String,
    pub workflow_action: Option<String>,
    pub comment: Option<String>,
    /// Restricts the comment to a group. Takes precedence over `comment_role`.
    pub comment_group: Option<String>,
    pub comment_role: Option<String>,
}

impl ProgressRequest {
    pub fn new(search_query: impl Into<String>) -> Self {
        Self {
            search_query: search_query.into(),
            ..Default::default()
        }
    }

    pub fn with_workflow_action(mut self, action: Option<&str>) -> Self {
        self.workflow_action = action.map(str::to_string);
        self
    }

    pub fn with_comment(mut self, comment: Option<&str>) -> Self {
        self.comment = comment.map(str::to_string);
        self
    }

    pub fn workflow_action(&self) -> Option<&str> {
        non_blank(self.workflow_action.as_deref())
    }

    pub fn comment(&self) -> Option<&str> {
        non_blank(self.comment.as_deref())
    }

    /// `true` when at least one remote mutation is requested.
    pub fn has_mutations(&self) -> bool {
        self.workflow_action().is_some() || self.comment().is_some()
    }
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.filter(|v| !v.trim().is_empty())
}

/// Id of the transition named `action` currently available for `key`.
///
/// A missing or blank action returns `Ok(None)` without asking the tracker.
pub async fn action_id_for_issue(
    tracker: &impl IssueTracker,
    key: &str,
    action: Option<&str>,
) -> Result<Option<u64>, TrackerError> {
    let Some(action) = non_blank(action) else {
        return Ok(None);
    };
    let available = tracker.available_transitions(key).await?;
    Ok(resolve_transition(&available, Some(action)))
}

/// Applies one [`ProgressRequest`] to one issue.
pub struct IssueProgressor<'a, T> {
    tracker: &'a T,
}

impl<'a, T: IssueTracker> IssueProgressor<'a, T> {
    pub fn new(tracker: &'a T) -> Self {
        Self { tracker }
    }

    /// Transition first, then comment. Each step is skipped when not
    /// requested; a failure in one step is logged and does not prevent the
    /// other.
    pub async fn progress<W: Write>(
        &self,
        key: &str,
        request: &ProgressRequest,
        log: &mut BuildLog<W>,
    ) -> IssueReport {
        let mut report = IssueReport::new(key);

        if let Some(action) = request.workflow_action() {
            report.transition = self.transition(key, action, log).await;
        }

        if let Some(comment) = request.comment() {
            report.comment = self.comment(key, comment, request, log).await;
        }

        report
    }

    async fn transition<W: Write>(
        &self,
        key: &str,
        action: &str,
        log: &mut BuildLog<W>,
    ) -> StepOutcome {
        let id = match action_id_for_issue(self.tracker, key, Some(action)).await {
            Ok(Some(id)) => id,
            Ok(None) => {
                warn!(issue = %key, action, "no matching workflow action");
                log.line(format!(
                    "No workflow action named \"{action}\" is available for issue {key}; status left unchanged."
                ));
                return StepOutcome::NoMatch;
            }
            Err(e) => {
                warn!(issue = %key, error = %e, "failed to list workflow actions");
                log.line(format!(
                    "Could not read workflow actions for issue {key}: {e}"
                ));
                return StepOutcome::Failed(e.to_string());
            }
        };

        match self.tracker.apply_transition(key, id).await {
            Ok(()) => {
                debug!(issue = %key, transition_id = id, "transition applied");
                log.line(format!(
                    "Issue {key} progressed with workflow action \"{action}\"."
                ));
                StepOutcome::Applied
            }
            Err(e) => {
                warn!(issue = %key, transition_id = id, error = %e, "failed to apply transition");
                log.line(format!(
                    "Failed to apply workflow action \"{action}\" to issue {key}: {e}"
                ));
                StepOutcome::Failed(e.to_string())
            }
        }
    }

    async fn comment<W: Write>(
        &self,
        key: &str,
        body: &str,
        request: &ProgressRequest,
        log: &mut BuildLog<W>,
    ) -> StepOutcome {
        let result = self
            .tracker
            .add_comment(
                key,
                body,
                request.comment_group.as_deref(),
                request.comment_role.as_deref(),
            )
            .await;
        match result {
            Ok(()) => {
                debug!(issue = %key, "comment added");
                log.line(format!("Comment added to issue {key}."));
                StepOutcome::Applied
            }
            Err(e) => {
                warn!(issue = %key, error = %e, "failed to add comment");
                log.line(format!("Failed to add comment to issue {key}: {e}"));
                StepOutcome::Failed(e.to_string())
            }
        }
    }
}

/// Report for a referenced issue whose lookup failed: every requested step
/// is marked failed with the lookup error.
fn lookup_failure(key: &str, request: &ProgressRequest, error: &TrackerError) -> IssueReport {
    let mut report = IssueReport::new(key);
    if request.workflow_action().is_some() {
        report.transition = StepOutcome::Failed(error.to_string());
    }
    if request.comment().is_some() {
        report.comment = StepOutcome::Failed(error.to_string());
    }
    report
}

/// Drives a whole batch: candidate lookup, then one [`IssueProgressor`] run
/// per issue, in order.
pub struct BatchCoordinator<'a, T> {
    site: Option<&'a Site<T>>,
}

impl<'a, T: IssueTracker> BatchCoordinator<'a, T> {
    pub fn new(site: Option<&'a Site<T>>) -> Self {
        Self { site }
    }

    /// Progresses every issue matching `request.search_query`.
    ///
    /// Without a site the report ends `Failed` before any remote call. A
    /// failing search is returned as an error; failures on single issues
    /// only show up in the report.
    pub async fn progress_matching_issues<W: Write>(
        &self,
        request: &ProgressRequest,
        log: &mut BuildLog<W>,
    ) -> Result<BatchReport, TrackerError> {
        let mut report = BatchReport::new(request.search_query.clone());
        let Some(site) = self.bind(&mut report, log) else {
            return Ok(report);
        };

        let issues = site.tracker.search_issues(&request.search_query).await?;
        info!(site = %site.url, count = issues.len(), "issues matched query");
        log.line(format!(
            "{} issue(s) match query \"{}\".",
            issues.len(),
            request.search_query
        ));
        report.advance(BatchEvent::IssuesFound);

        let keys: Vec<&str> = issues.iter().map(|i| i.key.as_str()).collect();
        self.progress_each(site, &keys, request, &mut report, log)
            .await;
        Ok(report)
    }

    /// Progresses the issues referenced by the change log.
    ///
    /// Identifiers are extracted with the site's pattern and checked for
    /// existence first; unknown ones are listed in the report and skipped.
    /// A failed lookup is recorded against that identifier only.
    pub async fn progress_referenced_issues<W: Write>(
        &self,
        change_log: &[ChangeEntry],
        request: &ProgressRequest,
        log: &mut BuildLog<W>,
    ) -> Result<BatchReport, TrackerError> {
        let mut report = BatchReport::new(format!("change log ({} entries)", change_log.len()));
        let Some(site) = self.bind(&mut report, log) else {
            return Ok(report);
        };

        let referenced = extract_from_change_log(change_log, &site.issue_pattern);
        if referenced.is_empty() {
            log.line("No issue identifiers found in the change log.");
        }

        // The tracker may resolve differently written keys (`tr-1`, `TR-1`)
        // to the same issue; each issue is progressed once.
        let mut keys: Vec<String> = Vec::new();
        for key in &referenced {
            match site.tracker.get_issue(key).await {
                Ok(Some(issue)) => {
                    debug!(issue = %issue.key, status = ?issue.status_name(), "referenced issue found");
                    if keys.contains(&issue.key) {
                        debug!(issue = %issue.key, referenced_as = %key, "issue already queued");
                    } else {
                        keys.push(issue.key);
                    }
                }
                Ok(None) => {
                    debug!(issue = %key, "referenced issue does not exist");
                    log.line(format!("Issue {key} not found, skipping."));
                    report.unknown_keys.push(key.clone());
                }
                Err(e) => {
                    warn!(issue = %key, error = %e, "failed to look up referenced issue");
                    log.line(format!("Failed to look up issue {key}: {e}"));
                    report.record(lookup_failure(key, request, &e));
                }
            }
        }
        report.advance(BatchEvent::IssuesFound);

        let keys: Vec<&str> = keys.iter().map(String::as_str).collect();
        self.progress_each(site, &keys, request, &mut report, log)
            .await;
        Ok(report)
    }

    fn bind<W: Write>(
        &self,
        report: &mut BatchReport,
        log: &mut BuildLog<W>,
    ) -> Option<&'a Site<T>> {
        match self.site {
            Some(site) => {
                report.advance(BatchEvent::SiteBound);
                Some(site)
            }
            None => {
                warn!("no Jira site configured for this job");
                log.line("No Jira site is configured for this job.");
                report.advance(BatchEvent::SiteMissing);
                None
            }
        }
    }

    async fn progress_each<W: Write>(
        &self,
        site: &Site<T>,
        keys: &[&str],
        request: &ProgressRequest,
        report: &mut BatchReport,
        log: &mut BuildLog<W>,
    ) {
        if request.workflow_action().is_none() {
            log.line(
                "No workflow action was specified, thus no status update will be made for any of the matching issues.",
            );
        }
        if request.has_mutations() {
            let progressor = IssueProgressor::new(&site.tracker);
            for key in keys {
                report.record(progressor.progress(key, request, log).await);
            }
        } else {
            for key in keys {
                report.record(IssueReport::new(key));
            }
        }
        report.advance(BatchEvent::AllAttempted);
        info!(
            run_id = %report.run_id,
            issues = report.issues.len(),
            failed = report.failed_issues(),
            "batch completed"
        );
    }
}
