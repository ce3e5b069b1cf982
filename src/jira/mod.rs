pub mod client;
pub mod error;
pub mod types;

#[cfg(test)]
pub mod testing;

pub use client::{IssueTracker, JiraClient};
pub use error::TrackerError;
pub use types::{IssueRef, TransitionCandidate};
