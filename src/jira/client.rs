use std::time::Duration;

use reqwest::{Client, Method, RequestBuilder, Response, Url};
use tracing::debug;

use super::error::TrackerError;
use super::types::{
    CommentRequest, ErrorBody, IssueRef, SearchResponse, TransitionCandidate, TransitionRequest,
    TransitionsResponse,
};

const DEFAULT_MAX_RESULTS: u32 = 100;
const ISSUE_FIELDS: &str = "summary,status";

/// The remote capabilities needed to progress issues.
///
/// `JiraClient` talks to a real server; tests substitute a recording double.
pub trait IssueTracker {
    /// Runs a JQL search and returns the matching issues.
    async fn search_issues(&self, jql: &str) -> Result<Vec<IssueRef>, TrackerError>;

    /// Looks up one issue by key. `Ok(None)` when the issue does not exist.
    async fn get_issue(&self, key: &str) -> Result<Option<IssueRef>, TrackerError>;

    /// Lists the workflow transitions currently available for an issue.
    async fn available_transitions(
        &self,
        key: &str,
    ) -> Result<Vec<TransitionCandidate>, TrackerError>;

    async fn apply_transition(&self, key: &str, transition_id: u64) -> Result<(), TrackerError>;

    /// Posts a comment. `group`/`role` restrict visibility; both `None` means public.
    async fn add_comment(
        &self,
        key: &str,
        body: &str,
        group: Option<&str>,
        role: Option<&str>,
    ) -> Result<(), TrackerError>;
}

/// Jira REST v2 client.
pub struct JiraClient {
    client: Client,
    base_url: Url,
    credentials: Option<(String, String)>,
    max_results: u32,
}

impl JiraClient {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, TrackerError> {
        let base_url = Url::parse(base_url.trim_end_matches('/'))
            .map_err(|e| TrackerError::InvalidBaseUrl(format!("{base_url}: {e}")))?;
        if base_url.cannot_be_a_base() {
            return Err(TrackerError::InvalidBaseUrl(base_url.to_string()));
        }
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(10))
            .timeout(timeout)
            .build()?;
        Ok(Self {
            client,
            base_url,
            credentials: None,
            max_results: DEFAULT_MAX_RESULTS,
        })
    }

    /// Attach HTTP basic credentials to every request.
    pub fn with_credentials(mut self, username: String, api_token: String) -> Self {
        self.credentials = Some((username, api_token));
        self
    }

    /// Cap the number of issues a single search returns.
    pub fn with_max_results(mut self, max_results: u32) -> Self {
        self.max_results = max_results;
        self
    }

    pub fn base_url(&self) -> &str {
        self.base_url.as_str()
    }

    // Segments are percent-encoded individually, so issue keys never escape
    // their path position.
    fn endpoint(&self, segments: &[&str]) -> Url {
        let mut url = self.base_url.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty()
                .extend(["rest", "api", "2"])
                .extend(segments);
        }
        url
    }

    fn request(&self, method: Method, url: Url) -> RequestBuilder {
        let builder = self
            .client
            .request(method, url)
            .header("accept", "application/json");
        match &self.credentials {
            Some((user, token)) => builder.basic_auth(user, Some(token)),
            None => builder,
        }
    }

    async fn send(&self, builder: RequestBuilder) -> Result<Response, TrackerError> {
        let response = builder.send().await?;
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let text = response
            .text()
            .await
            .unwrap_or_else(|_| "unknown error".to_string());
        let message = serde_json::from_str::<ErrorBody>(&text)
            .ok()
            .and_then(|body| body.summary())
            .unwrap_or(text);
        Err(TrackerError::ApiError {
            status: status.as_u16(),
            message,
        })
    }
}

impl IssueTracker for JiraClient {
    async fn search_issues(&self, jql: &str) -> Result<Vec<IssueRef>, TrackerError> {
        debug!(jql, max_results = self.max_results, "searching issues");
        let url = self.endpoint(&["search"]);
        let max_results = self.max_results.to_string();
        let builder = self.request(Method::GET, url).query(&[
            ("jql", jql),
            ("maxResults", max_results.as_str()),
            ("fields", ISSUE_FIELDS),
        ]);
        let body = self.send(builder).await?.json::<SearchResponse>().await?;
        debug!(total = ?body.total, returned = body.issues.len(), "search finished");
        Ok(body.issues)
    }

    async fn get_issue(&self, key: &str) -> Result<Option<IssueRef>, TrackerError> {
        let url = self.endpoint(&["issue", key]);
        let builder = self
            .request(Method::GET, url)
            .query(&[("fields", ISSUE_FIELDS)]);
        match self.send(builder).await {
            Ok(response) => Ok(Some(response.json::<IssueRef>().await?)),
            Err(e) if e.is_not_found() => Ok(None),
            Err(e) => Err(e),
        }
    }

    async fn available_transitions(
        &self,
        key: &str,
    ) -> Result<Vec<TransitionCandidate>, TrackerError> {
        let url = self.endpoint(&["issue", key, "transitions"]);
        let body = self
            .send(self.request(Method::GET, url))
            .await?
            .json::<TransitionsResponse>()
            .await?;
        Ok(body.transitions)
    }

    async fn apply_transition(&self, key: &str, transition_id: u64) -> Result<(), TrackerError> {
        let url = self.endpoint(&["issue", key, "transitions"]);
        let builder = self
            .request(Method::POST, url)
            .json(&TransitionRequest::new(transition_id));
        self.send(builder).await?;
        Ok(())
    }

    async fn add_comment(
        &self,
        key: &str,
        body: &str,
        group: Option<&str>,
        role: Option<&str>,
    ) -> Result<(), TrackerError> {
        let url = self.endpoint(&["issue", key, "comment"]);
        let builder = self
            .request(Method::POST, url)
            .json(&CommentRequest::new(body, group, role));
        self.send(builder).await?;
        Ok(())
    }
}
