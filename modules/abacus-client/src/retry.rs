use std::time::Duration;

use reqwest::StatusCode;

/// Retry and warmup tuning for classification calls.
///
/// Abacus stops idle deployments; the first call after an idle period keeps
/// failing until the deployment is restarted and polled back to "active".
/// Defaults mirror the production settings. Tests shrink everything to
/// milliseconds.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Retries beyond the first attempt.
    pub max_retries: u32,
    /// Base for the exponential backoff between attempts: retry n waits
    /// `2^n * backoff_base`.
    pub backoff_base: Duration,
    /// Wait after HTTP 409 (deployment already initializing) before the
    /// next attempt, instead of a restart cycle.
    pub conflict_cooldown: Duration,
    /// Ceiling for one deployment warmup wait.
    pub readiness_timeout: Duration,
    /// Extra delay after the deployment reports active; a deployment that
    /// just flipped to active still refuses requests for a few seconds.
    pub settle_delay: Duration,
    /// Interval between describeDeployment polls.
    pub poll_interval: Duration,
    /// Delay before re-polling after a failed describeDeployment call.
    pub poll_retry_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            backoff_base: Duration::from_secs(15),
            conflict_cooldown: Duration::from_secs(30),
            readiness_timeout: Duration::from_secs(180),
            settle_delay: Duration::from_secs(10),
            poll_interval: Duration::from_secs(10),
            poll_retry_delay: Duration::from_secs(5),
        }
    }
}

impl RetryPolicy {
    /// Backoff delay before retry `n` (1-based). Defaults give 30s, 60s,
    /// 120s across the three retries.
    pub fn backoff_delay(&self, retry: u32) -> Duration {
        self.backoff_base.saturating_mul(2u32.saturating_pow(retry))
    }
}

/// Whether an HTTP status is worth a warmup-and-retry cycle.
///
/// 503 and 424 are what a stopped deployment answers with; 409 means a
/// start is already in flight and only needs a cooldown.
pub fn is_retryable_status(status: StatusCode) -> bool {
    matches!(
        status,
        StatusCode::SERVICE_UNAVAILABLE | StatusCode::CONFLICT | StatusCode::FAILED_DEPENDENCY
    )
}
