use async_trait::async_trait;
use std::time::Duration;

use crate::models::{AcquisitionError, RawPlayer, Roster, ScoreResult, ScoringError};
use crate::scoring::RuleTable;

/// What the user supplies to pull league data.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FetchRequest {
    pub clan_tag: String,
    pub api_key: String,
}

impl FetchRequest {
    pub fn new(clan_tag: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            clan_tag: clan_tag.into(),
            api_key: api_key.into(),
        }
    }

    pub fn validate(&self) -> Result<(), AcquisitionError> {
        if self.clan_tag.trim().is_empty() || self.api_key.trim().is_empty() {
            return Err(AcquisitionError::MissingInput);
        }
        Ok(())
    }
}

/// Source of raw per-player league results.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait RosterSource: Send + Sync {
    async fn fetch_roster(&self, request: &FetchRequest) -> Result<Vec<RawPlayer>, AcquisitionError>;
}

/// Turns a completed roster and a rule table into per-player totals.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ScoringService: Send + Sync {
    async fn score(&self, roster: &Roster, rules: &RuleTable) -> Result<Vec<ScoreResult>, ScoringError>;
}

/// Shared settings for the HTTP collaborators.
#[derive(Debug, Clone)]
pub struct HttpClientConfig {
    pub base_url: String,
    pub timeout: Duration,
    pub max_retries: u32,
}

pub fn build_http_client(timeout: Duration) -> reqwest::Result<reqwest::Client> {
    reqwest::Client::builder()
        .timeout(timeout)
        .user_agent(concat!("cwl-bonus/", env!("CARGO_PKG_VERSION")))
        .build()
}
