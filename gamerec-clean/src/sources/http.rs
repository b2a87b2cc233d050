//! Paced HTTP access shared by the provider clients
//!
//! Every request waits for a governor permit, then:
//! - **429**: wait `attempt × rate_limit_base` and retry, up to `max_attempts`;
//!   exhausting the attempts yields [`LookupError::RateLimited`]
//! - **transport error**: wait `transient_delay` and retry, same bound
//! - **404**: [`LookupError::NotFound`], no retry
//! - **other non-success**: [`LookupError::Http`], no retry

use crate::config::quota_rate;
use crate::error::LookupError;
use governor::{Quota, RateLimiter};
use reqwest::{Client, Response, StatusCode};
use std::time::Duration;
use tracing::{debug, warn};

/// Retry bounds for one provider
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub rate_limit_base: Duration,
    pub transient_delay: Duration,
}

impl RetryPolicy {
    /// Wait after the `attempt`-th rate-limited response (1-based)
    pub fn rate_limit_wait(&self, attempt: u32) -> Duration {
        self.rate_limit_base * attempt
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            rate_limit_base: Duration::from_secs(30),
            transient_delay: Duration::from_secs(5),
        }
    }
}

type DirectLimiter = RateLimiter<
    governor::state::direct::NotKeyed,
    governor::state::InMemoryState,
    governor::clock::DefaultClock,
>;

/// HTTP client with a per-provider rate limiter and retry policy
pub struct PacedClient {
    provider: &'static str,
    client: Client,
    rate_limiter: DirectLimiter,
    policy: RetryPolicy,
}

impl PacedClient {
    pub fn new(
        provider: &'static str,
        timeout: Duration,
        user_agent: &str,
        requests_per_second: u32,
        policy: RetryPolicy,
    ) -> Result<Self, LookupError> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(user_agent)
            .build()
            .map_err(|e| LookupError::Network(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            provider,
            client,
            rate_limiter: RateLimiter::direct(Quota::per_second(quota_rate(requests_per_second))),
            policy,
        })
    }

    /// GET with pacing and retries; returns only successful responses
    pub async fn get(&self, url: &str, query: &[(&str, String)]) -> Result<Response, LookupError> {
        let mut attempt = 0;

        loop {
            attempt += 1;
            self.rate_limiter.until_ready().await;

            if attempt > 1 {
                debug!(provider = self.provider, attempt, url, "Retrying request");
            }

            match self.client.get(url).query(query).send().await {
                Ok(response) => {
                    let status = response.status();
                    if status.is_success() {
                        return Ok(response);
                    }
                    if status == StatusCode::NOT_FOUND {
                        return Err(LookupError::NotFound(format!("{} {}", self.provider, url)));
                    }
                    if status != StatusCode::TOO_MANY_REQUESTS {
                        return Err(LookupError::Http {
                            status: status.as_u16(),
                        });
                    }

                    if attempt >= self.policy.max_attempts {
                        warn!(provider = self.provider, attempt, "Rate limit retries exhausted");
                        return Err(LookupError::RateLimited(self.provider.to_string()));
                    }
                    let wait = self.policy.rate_limit_wait(attempt);
                    warn!(
                        provider = self.provider,
                        attempt,
                        wait_secs = wait.as_secs(),
                        "Rate limited, backing off"
                    );
                    tokio::time::sleep(wait).await;
                }
                Err(e) => {
                    let error = LookupError::from(e);
                    if !error.is_transient() || attempt >= self.policy.max_attempts {
                        return Err(error);
                    }
                    debug!(
                        provider = self.provider,
                        attempt,
                        error = %error,
                        "Transport error, retrying after fixed delay"
                    );
                    tokio::time::sleep(self.policy.transient_delay).await;
                }
            }
        }
    }
}
