use thiserror::Error;

use crate::jira::TrackerError;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("Config error: {0}")]
    Config(String),

    #[error("Invalid issue pattern: {0}")]
    InvalidPattern(#[from] regex::Error),

    #[error("Jira error: {0}")]
    Tracker(#[from] TrackerError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tracker_errors_convert() {
        let err: AppError = TrackerError::ApiError {
            status: 401,
            message: "Unauthorized".into(),
        }
        .into();
        assert_eq!(
            err.to_string(),
            "Jira error: Jira API error (status 401): Unauthorized"
        );
    }

    #[test]
    fn config_error_display() {
        assert_eq!(
            AppError::Config("bad pattern".into()).to_string(),
            "Config error: bad pattern"
        );
    }
}
