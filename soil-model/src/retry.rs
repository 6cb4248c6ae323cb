//! Retry policy for Groq requests.
//!
//! The client classifies each failed attempt itself: HTTP status, transport
//! failure, and any `Retry-After` hint Groq sends with a rate limit. The loop
//! here only decides how long to wait and when to give up.

use soil_core::{Result, SoilError};
use std::{future::Future, time::Duration};

/// Exponential backoff settings. `max_retries == 0` disables retrying.
#[derive(Clone, Debug)]
pub struct RetryConfig {
    pub max_retries: u32,
    pub initial_delay: Duration,
    pub max_delay: Duration,
    pub backoff_multiplier: f32,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            initial_delay: Duration::from_millis(250),
            max_delay: Duration::from_secs(5),
            backoff_multiplier: 2.0,
        }
    }
}

impl RetryConfig {
    #[must_use]
    pub fn disabled() -> Self {
        Self { max_retries: 0, ..Self::default() }
    }

    #[must_use]
    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    #[must_use]
    pub fn with_initial_delay(mut self, initial_delay: Duration) -> Self {
        self.initial_delay = initial_delay;
        self
    }

    #[must_use]
    pub fn with_max_delay(mut self, max_delay: Duration) -> Self {
        self.max_delay = max_delay;
        self
    }

    #[must_use]
    pub fn with_backoff_multiplier(mut self, backoff_multiplier: f32) -> Self {
        self.backoff_multiplier = backoff_multiplier;
        self
    }

    /// Wait before retry number `retry` (1-based), capped at `max_delay`.
    pub fn backoff(&self, retry: u32) -> Duration {
        let factor = f64::from(self.backoff_multiplier.max(1.0));
        let exponent = i32::try_from(retry.saturating_sub(1)).unwrap_or(i32::MAX);
        let secs = self.initial_delay.as_secs_f64() * factor.powi(exponent);
        if !secs.is_finite() || secs >= self.max_delay.as_secs_f64() {
            return self.max_delay;
        }
        Duration::from_secs_f64(secs)
    }

    /// Server hints win over the computed backoff but still respect `max_delay`.
    fn delay_for(&self, retry: u32, hint: Option<Duration>) -> Duration {
        match hint {
            Some(hint) => hint.min(self.max_delay),
            None => self.backoff(retry),
        }
    }
}

/// How a single failed attempt should be handled.
#[derive(Debug)]
pub enum AttemptError {
    /// Transient failure; `retry_after` carries the server's hint, if any.
    Transient { error: SoilError, retry_after: Option<Duration> },
    /// Give up immediately.
    Fatal(SoilError),
}

impl AttemptError {
    pub fn transient(error: SoilError) -> Self {
        Self::Transient { error, retry_after: None }
    }

    pub fn into_error(self) -> SoilError {
        match self {
            Self::Transient { error, .. } | Self::Fatal(error) => error,
        }
    }
}

/// Rate limits, timeouts and upstream outages.
#[must_use]
pub fn is_retryable_status_code(status_code: u16) -> bool {
    matches!(status_code, 408 | 429 | 500 | 502 | 503 | 504)
}

/// Parse a `Retry-After` value given in seconds. Groq sends fractional
/// seconds on rate limits; HTTP dates are ignored.
#[must_use]
pub fn parse_retry_after(value: &str) -> Option<Duration> {
    let secs: f64 = value.trim().parse().ok()?;
    (secs.is_finite() && secs >= 0.0).then(|| Duration::from_secs_f64(secs))
}

/// Run `operation` until it succeeds, fails fatally, or retries run out.
pub async fn execute_with_retry<T, Op, Fut>(config: &RetryConfig, mut operation: Op) -> Result<T>
where
    Op: FnMut() -> Fut,
    Fut: Future<Output = std::result::Result<T, AttemptError>>,
{
    let mut retries: u32 = 0;

    loop {
        match operation().await {
            Ok(value) => return Ok(value),
            Err(AttemptError::Transient { error, retry_after }) if retries < config.max_retries => {
                retries += 1;
                let delay = config.delay_for(retries, retry_after);
                soil_telemetry::warn!(
                    retry = retries,
                    max_retries = config.max_retries,
                    delay_ms = delay.as_millis(),
                    server_hint = retry_after.is_some(),
                    error = %error,
                    "Groq request failed transiently; retrying"
                );
                tokio::time::sleep(delay).await;
            }
            Err(failure) => return Err(failure.into_error()),
        }
    }
}
