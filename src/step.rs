//! The post-build issue update step and its host contract.
//!
//! The host hands the step a [`BuildContext`] (environment, bound site,
//! change log) and a build log; the step answers with a [`BuildResult`].
//! Only a missing site fails the build. Per-issue problems are logged and
//! reported but leave the result at `Success`.

use std::collections::HashMap;
use std::io::Write;
use std::sync::LazyLock;

use regex::{Captures, Regex};
use serde::Serialize;
use tracing::info;

use crate::batch::BatchReport;
use crate::changelog::ChangeEntry;
use crate::jira::{IssueTracker, TrackerError};
use crate::progress::{BatchCoordinator, ProgressRequest, Site};
use crate::ui::BuildLog;

static ENV_VAR: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\$\{([A-Za-z_][A-Za-z0-9_]*)\}|\$([A-Za-z_][A-Za-z0-9_]*)")
        .expect("env var pattern is valid")
});

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum BuildResult {
    Success,
    Failure,
}

/// Everything the step needs from the running build.
pub struct BuildContext<T> {
    pub env: HashMap<String, String>,
    pub site: Option<Site<T>>,
    pub change_log: Vec<ChangeEntry>,
}

impl<T> BuildContext<T> {
    pub fn new(site: Option<Site<T>>) -> Self {
        Self {
            env: HashMap::new(),
            site,
            change_log: Vec::new(),
        }
    }

    pub fn with_env(mut self, env: HashMap<String, String>) -> Self {
        self.env = env;
        self
    }

    pub fn with_change_log(mut self, change_log: Vec<ChangeEntry>) -> Self {
        self.change_log = change_log;
        self
    }

    pub fn site_for_job(&self) -> Option<&Site<T>> {
        self.site.as_ref()
    }
}

/// Where the step finds the issues to update.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IssueSource {
    /// Issues matching a JQL query. `$VAR` references are expanded first.
    Query(String),
    /// Issues referenced by the build's change log.
    ChangeLog,
}

/// Post-build step: transition and/or comment a set of issues.
#[derive(Debug, Clone)]
pub struct IssueUpdateStep {
    pub source: IssueSource,
    pub workflow_action: Option<String>,
    pub comment: Option<String>,
    pub comment_group: Option<String>,
    pub comment_role: Option<String>,
}

/// Outcome of [`IssueUpdateStep::perform`].
#[derive(Debug, Clone)]
pub struct StepRun {
    pub result: BuildResult,
    pub report: BatchReport,
}

impl IssueUpdateStep {
    pub fn new(
        source: IssueSource,
        workflow_action: Option<String>,
        comment: Option<String>,
    ) -> Self {
        Self {
            source,
            workflow_action,
            comment,
            comment_group: None,
            comment_role: None,
        }
    }

    /// The request with environment references expanded.
    pub fn request(&self, env: &HashMap<String, String>) -> ProgressRequest {
        let query = match &self.source {
            IssueSource::Query(jql) => expand_vars(jql, env),
            IssueSource::ChangeLog => String::new(),
        };
        let comment = self.comment.as_deref().map(|c| expand_vars(c, env));
        let mut request = ProgressRequest::new(query)
            .with_workflow_action(self.workflow_action.as_deref())
            .with_comment(comment.as_deref());
        request.comment_group = self.comment_group.clone();
        request.comment_role = self.comment_role.clone();
        request
    }

    /// Runs the step. `Err` only when the issue search itself fails.
    pub async fn perform<T: IssueTracker, W: Write>(
        &self,
        ctx: &BuildContext<T>,
        log: &mut BuildLog<W>,
    ) -> Result<StepRun, TrackerError> {
        let request = self.request(&ctx.env);
        let coordinator = BatchCoordinator::new(ctx.site_for_job());

        let report = match &self.source {
            IssueSource::Query(_) => coordinator.progress_matching_issues(&request, log).await?,
            IssueSource::ChangeLog => {
                coordinator
                    .progress_referenced_issues(&ctx.change_log, &request, log)
                    .await?
            }
        };

        let result = if report.succeeded() {
            BuildResult::Success
        } else {
            BuildResult::Failure
        };
        info!(
            run_id = %report.run_id,
            states = ?report.transitions(),
            result = ?result,
            "issue update step finished"
        );
        Ok(StepRun { result, report })
    }
}

/// Replaces `${NAME}` and `$NAME` with values from `env`. Unknown names are
/// left as written.
pub fn expand_vars(text: &str, env: &HashMap<String, String>) -> String {
    ENV_VAR
        .replace_all(text, |caps: &Captures<'_>| {
            let name = caps
                .get(1)
                .or_else(|| caps.get(2))
                .map(|m| m.as_str())
                .unwrap_or_default();
            match env.get(name) {
                Some(value) => value.clone(),
                None => caps[0].to_string(),
            }
        })
        .into_owned()
}
