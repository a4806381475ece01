use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::info;

use super::client::{build_http_client, HttpClientConfig, ScoringService};
use super::retry::{retry_with_backoff, RetryConfig};
use crate::models::{Roster, ScoreResult, ScoringError};
use crate::scoring::RuleTable;

#[derive(Serialize)]
struct ScoringRequest<'a> {
    data: &'a Roster,
    point_system: &'a RuleTable,
}

/// Remote point calculation over HTTP.
pub struct HttpScoringClient {
    http: reqwest::Client,
    url: String,
    retry: RetryConfig,
}

impl HttpScoringClient {
    pub fn new(config: HttpClientConfig) -> Result<Self, ScoringError> {
        Ok(Self {
            http: build_http_client(config.timeout)?,
            url: config.base_url,
            retry: RetryConfig::with_retries(config.max_retries),
        })
    }

    async fn score_once(&self, roster: &Roster, rules: &RuleTable) -> Result<Vec<ScoreResult>, ScoringError> {
        let response = self
            .http
            .post(&self.url)
            .json(&ScoringRequest {
                data: roster,
                point_system: rules,
            })
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            return Err(ScoringError::Rejected {
                status: status.as_u16(),
                detail: error_detail(&body),
            });
        }

        Ok(serde_json::from_str(&body)?)
    }
}

#[async_trait]
impl ScoringService for HttpScoringClient {
    /// Transport errors and 5xx responses are retried.
    async fn score(&self, roster: &Roster, rules: &RuleTable) -> Result<Vec<ScoreResult>, ScoringError> {
        info!("Requesting scores for {} players", roster.len());
        let results = retry_with_backoff(&self.retry, "score", ScoringError::is_retryable, || {
            self.score_once(roster, rules)
        })
        .await?;
        info!("Received {} scores", results.len());
        Ok(results)
    }
}

/// The service reports failures as `{"detail": "..."}`.
fn error_detail(body: &str) -> String {
    #[derive(Deserialize)]
    struct ErrorBody {
        detail: serde_json::Value,
    }

    match serde_json::from_str::<ErrorBody>(body) {
        Ok(ErrorBody {
            detail: serde_json::Value::String(s),
        }) => s,
        Ok(ErrorBody { detail }) => detail.to_string(),
        Err(_) if body.trim().is_empty() => "unknown error".to_string(),
        Err(_) => body.trim().to_string(),
    }
}
