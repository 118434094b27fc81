// crashlog-sleuth - core/executor.rs
//
// Retry/backoff policy wrapped around a single analyzer invocation.
// `Transient` failures (I/O) are retried with exponential backoff and
// jitter; `Permanent` failures (parse/logic) are not. Any final failure is
// converted to a failed `Generic` result rather than propagated, matching
// the pipeline's "never raise an exception due to a single analyzer" rule.

use std::future::Future;
use std::time::Duration;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tokio_util::sync::CancellationToken;

use super::model::AnalysisResult;
use crate::util::constants::{
    MAX_RETRY_ATTEMPTS, RETRY_BACKOFF_FACTOR, RETRY_BASE_DELAY_MS, RETRY_JITTER_FRACTION,
};
use crate::util::error::AnalyzerError;

/// Whether a failure is worth retrying.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureClass {
    /// I/O-shaped failure; likely to succeed on retry.
    Transient,
    /// Parse/logic failure; retrying would reproduce the same outcome.
    Permanent,
}

/// Classify an `AnalyzerError` for retry purposes. `ConfigurationUnavailable`
/// is treated as permanent: the caller already degrades to a default rather
/// than wanting a retry. `Cancelled` is never retried by the executor loop
/// itself (checked separately via the cancellation token).
pub fn classify(error: &AnalyzerError) -> FailureClass {
    match error {
        AnalyzerError::Failed { message, .. } => {
            let lowered = message.to_lowercase();
            if lowered.contains("i/o") || lowered.contains("io error") || lowered.contains("timed out")
            {
                FailureClass::Transient
            } else {
                FailureClass::Permanent
            }
        }
        AnalyzerError::Cancelled { .. } => FailureClass::Permanent,
        AnalyzerError::ConfigurationUnavailable { .. } => FailureClass::Permanent,
    }
}

#[derive(Debug, Clone)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub base_delay: Duration,
    pub backoff_factor: u32,
    pub jitter_fraction: f64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        RetryPolicy {
            max_attempts: MAX_RETRY_ATTEMPTS,
            base_delay: Duration::from_millis(RETRY_BASE_DELAY_MS),
            backoff_factor: RETRY_BACKOFF_FACTOR,
            jitter_fraction: RETRY_JITTER_FRACTION,
        }
    }
}

/// Wraps analyzer invocation with the retry policy above.
pub struct ResilientExecutor {
    policy: RetryPolicy,
    seed: Option<u64>,
}

impl ResilientExecutor {
    pub fn new(policy: RetryPolicy) -> Self {
        ResilientExecutor { policy, seed: None }
    }

    /// Construct an executor with a fixed PRNG seed so jitter is
    /// deterministic; used by tests.
    pub fn with_seed(policy: RetryPolicy, seed: u64) -> Self {
        ResilientExecutor {
            policy,
            seed: Some(seed),
        }
    }

    fn backoff_delay(&self, attempt_index: u32, rng: &mut StdRng) -> Duration {
        let factor = self.policy.backoff_factor.pow(attempt_index) as f64;
        let base = self.policy.base_delay.as_secs_f64() * factor;
        let jitter_span = base * self.policy.jitter_fraction;
        let jitter = rng.gen_range(-jitter_span..=jitter_span);
        Duration::from_secs_f64((base + jitter).max(0.0))
    }

    /// Run `attempt` under the retry policy, returning an `AnalysisResult`
    /// either way: the policy never propagates an error past this call.
    pub async fn execute<F, Fut>(
        &self,
        analyzer_name: &str,
        cancel: &CancellationToken,
        mut attempt: F,
    ) -> AnalysisResult
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<AnalysisResult, AnalyzerError>>,
    {
        let mut rng = match self.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };

        let max_attempts = self.policy.max_attempts.max(1);
        let mut last_message = String::from("analyzer failed with no further detail");

        for attempt_index in 0..max_attempts {
            if cancel.is_cancelled() {
                return AnalysisResult::failed(analyzer_name, "cancelled");
            }

            match attempt().await {
                Ok(result) => return result,
                Err(error) => {
                    last_message = error.to_string();
                    let is_last_attempt = attempt_index + 1 >= max_attempts;
                    if classify(&error) == FailureClass::Permanent || is_last_attempt {
                        break;
                    }

                    let delay = self.backoff_delay(attempt_index, &mut rng);
                    tokio::select! {
                        _ = tokio::time::sleep(delay) => {}
                        _ = cancel.cancelled() => break,
                    }
                }
            }
        }

        AnalysisResult::failed(analyzer_name, last_message)
    }
}

impl Default for ResilientExecutor {
    fn default() -> Self {
        ResilientExecutor::new(RetryPolicy::default())
    }
}
