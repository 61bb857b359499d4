pub mod error;
pub mod retry;
pub mod types;

pub use error::{AbacusError, Result};
pub use retry::RetryPolicy;
pub use types::{
    ExecuteAgentRequest, ExecuteAgentResponse, KeywordArguments, TaxonomyLabels,
};

use std::time::{Duration, Instant};

use reqwest::StatusCode;
use tracing::{debug, error, info, warn};

use retry::is_retryable_status;

const BASE_URL: &str = "https://api.abacus.ai/api/v0";

/// Request timeout for individual HTTP calls. Agent execution on a freshly
/// started deployment can take a while.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(120);

/// Ordered lookup paths for the status field in describeDeployment
/// responses. The API has carried it at each of these locations; the first
/// non-empty match wins.
const STATUS_PATHS: [&[&str]; 3] = [
    &["deployment", "status"],
    &["result", "status"],
    &["status"],
];

pub struct AbacusClient {
    client: reqwest::Client,
    base_url: String,
    deployment_token: String,
    deployment_id: String,
    api_key: String,
    retry: RetryPolicy,
}

impl AbacusClient {
    pub fn new(deployment_token: &str, deployment_id: &str, api_key: &str) -> Self {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .expect("Failed to build HTTP client");

        Self {
            client,
            base_url: BASE_URL.to_string(),
            deployment_token: deployment_token.to_string(),
            deployment_id: deployment_id.to_string(),
            api_key: api_key.to_string(),
            retry: RetryPolicy::default(),
        }
    }

    pub fn with_base_url(mut self, url: &str) -> Self {
        self.base_url = url.trim_end_matches('/').to_string();
        self
    }

    pub fn with_retry_policy(mut self, policy: RetryPolicy) -> Self {
        self.retry = policy;
        self
    }

    /// Classify page text end-to-end: call the agent, warm the deployment
    /// back up if the call fails recoverably, retry within the budget, and
    /// extract taxonomy labels from the response.
    ///
    /// Labels come back in response order. An empty Vec means the agent
    /// answered without labels; that is a valid outcome, not an error.
    pub async fn classify_page_content(&self, text: &str) -> Result<Vec<String>> {
        let attempts = self.retry.max_retries + 1;
        let mut deployment_timed_out = false;

        for attempt in 1..=attempts {
            let failure = match self.execute_agent(text).await {
                Ok(body) => {
                    let labels = extract_taxonomy_labels(&body)?;
                    info!(attempt, count = labels.len(), "Classification succeeded");
                    return Ok(labels);
                }
                Err(e) => e,
            };

            let retryable = match &failure {
                AbacusError::Network(_) => true,
                AbacusError::Api { status, .. } => StatusCode::from_u16(*status)
                    .map(is_retryable_status)
                    .unwrap_or(false),
                _ => false,
            };

            if !retryable {
                error!(attempt, error = %failure, "Classification failed");
                return Err(failure);
            }

            if attempt == attempts {
                if deployment_timed_out {
                    error!(attempts, "Deployment never became active; giving up");
                    return Err(AbacusError::DeploymentTimeout(self.retry.readiness_timeout));
                }
                error!(attempts, error = %failure, "Retry budget exhausted");
                return Err(failure);
            }

            warn!(attempt, error = %failure, "Attempt failed, recovering before retry");

            if is_conflict(&failure) {
                // 409 means a start is already in flight; another start
                // call would conflict again.
                info!(
                    cooldown_secs = self.retry.conflict_cooldown.as_secs(),
                    "Deployment still initializing, cooling down"
                );
                tokio::time::sleep(self.retry.conflict_cooldown).await;
                deployment_timed_out = false;
            } else {
                // Warmup failures are logged and swallowed; the loop takes
                // its next scheduled attempt either way.
                match self.revive_deployment().await {
                    Ok(()) => deployment_timed_out = false,
                    Err(e) => {
                        deployment_timed_out =
                            matches!(e, AbacusError::DeploymentTimeout(_));
                        warn!(error = %e, "Deployment warmup failed, retrying anyway");
                    }
                }
            }

            let delay = self.retry.backoff_delay(attempt);
            debug!(attempt, delay_ms = delay.as_millis() as u64, "Backing off before next attempt");
            tokio::time::sleep(delay).await;
        }

        unreachable!("retry loop returns on success or final failure")
    }

    /// Issue one execute_agent call. Success returns the raw response body;
    /// the caller decides how to parse it.
    pub async fn execute_agent(&self, text: &str) -> Result<String> {
        let url = format!(
            "{}/execute_agent?deploymentToken={}&deploymentId={}",
            self.base_url, self.deployment_token, self.deployment_id
        );
        let payload = ExecuteAgentRequest::for_page_content(text);

        debug!(deployment_id = %self.deployment_id, "Sending classification request");

        let resp = self.client.post(&url).json(&payload).send().await?;

        let status = resp.status();
        if !status.is_success() {
            let message = resp.text().await.unwrap_or_default();
            return Err(AbacusError::Api {
                status: status.as_u16(),
                message,
            });
        }

        Ok(resp.text().await?)
    }

    /// Ask Abacus to start the deployment. Returns once the start request
    /// is accepted; readiness is a separate poll.
    pub async fn start_deployment(&self) -> Result<()> {
        let url = format!(
            "{}/startDeployment?deploymentId={}",
            self.base_url, self.deployment_id
        );

        info!(deployment_id = %self.deployment_id, "Starting deployment");

        let resp = self
            .client
            .get(&url)
            .header("apiKey", &self.api_key)
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            let message = resp.text().await.unwrap_or_default();
            return Err(AbacusError::StartFailed {
                status: status.as_u16(),
                message,
            });
        }

        info!(deployment_id = %self.deployment_id, "Deployment start accepted");
        Ok(())
    }

    /// Poll describeDeployment until the deployment reports active/running
    /// or `timeout` elapses. Failed polls are logged and retried; only the
    /// deadline fails the wait.
    pub async fn await_deployment_active(&self, timeout: Duration) -> Result<()> {
        let url = format!(
            "{}/describeDeployment?deploymentId={}",
            self.base_url, self.deployment_id
        );
        let deadline = Instant::now() + timeout;

        while Instant::now() < deadline {
            match self.describe_deployment(&url).await {
                Ok(Some(status)) if is_active_status(&status) => {
                    info!(deployment_id = %self.deployment_id, status, "Deployment is active");
                    return Ok(());
                }
                Ok(status) => {
                    debug!(
                        deployment_id = %self.deployment_id,
                        status = status.as_deref().unwrap_or("unknown"),
                        "Deployment not ready yet"
                    );
                    tokio::time::sleep(self.retry.poll_interval).await;
                }
                Err(e) => {
                    warn!(error = %e, "Failed to check deployment status");
                    tokio::time::sleep(self.retry.poll_retry_delay).await;
                }
            }
        }

        Err(AbacusError::DeploymentTimeout(timeout))
    }

    /// One warmup cycle: start the deployment, wait for it to report
    /// active, then settle briefly so it is actually accepting requests.
    async fn revive_deployment(&self) -> Result<()> {
        self.start_deployment().await?;
        self.await_deployment_active(self.retry.readiness_timeout)
            .await?;
        info!(
            settle_secs = self.retry.settle_delay.as_secs(),
            "Deployment active, settling before retry"
        );
        tokio::time::sleep(self.retry.settle_delay).await;
        Ok(())
    }

    /// One describeDeployment call. Returns the extracted status string, or
    /// None when the response carries no recognizable status field.
    async fn describe_deployment(&self, url: &str) -> Result<Option<String>> {
        let resp = self
            .client
            .get(url)
            .header("apiKey", &self.api_key)
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            let message = resp.text().await.unwrap_or_default();
            return Err(AbacusError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let body: serde_json::Value = resp.json().await?;
        Ok(deployment_status(&body).map(str::to_string))
    }
}

/// Extract taxonomy labels from an execute_agent response body.
///
/// The outer JSON carries `result.segments[0].segment`, itself a
/// JSON-encoded string whose object holds `taxonomy_labels`. Both parse
/// steps are strict; only a missing label list inside a well-formed segment
/// counts as "no labels".
fn extract_taxonomy_labels(body: &str) -> Result<Vec<String>> {
    let response: ExecuteAgentResponse = serde_json::from_str(body)?;
    let segment = response
        .result
        .segments
        .into_iter()
        .next()
        .ok_or_else(|| AbacusError::Parse("response contained no segments".to_string()))?;

    let labels: TaxonomyLabels = serde_json::from_str(&segment.segment)?;
    Ok(labels.labels.unwrap_or_default())
}

/// Walk the ordered status lookup paths and return the first non-empty
/// status string.
fn deployment_status(body: &serde_json::Value) -> Option<&str> {
    STATUS_PATHS.iter().find_map(|path| {
        let mut value = body;
        for key in *path {
            value = value.get(key)?;
        }
        value.as_str().filter(|s| !s.is_empty())
    })
}

/// "active" and "running" both mean the deployment accepts requests.
fn is_active_status(status: &str) -> bool {
    status.eq_ignore_ascii_case("active") || status.eq_ignore_ascii_case("running")
}

fn is_conflict(failure: &AbacusError) -> bool {
    matches!(
        failure,
        AbacusError::Api { status, .. } if *status == StatusCode::CONFLICT.as_u16()
    )
}
