use std::time::Duration;

use thiserror::Error;

pub type Result<T> = std::result::Result<T, AbacusError>;

#[derive(Debug, Error)]
pub enum AbacusError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("API error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Failed to start deployment (status {status}): {message}")]
    StartFailed { status: u16, message: String },

    #[error("Deployment did not become active within {0:?}")]
    DeploymentTimeout(Duration),
}

impl From<reqwest::Error> for AbacusError {
    fn from(err: reqwest::Error) -> Self {
        AbacusError::Network(err.to_string())
    }
}

impl From<serde_json::Error> for AbacusError {
    fn from(err: serde_json::Error) -> Self {
        AbacusError::Parse(err.to_string())
    }
}
