//! Bounded retry with a fixed delay between attempts.

use std::time::Duration;

use reqwest::{Client, Method, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use tracing::{debug, warn};

use crate::error::{AttemptFailure, HttpError};

/// Retry budget for one logical request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts, including the first. Always at least 1.
    pub max_attempts: u32,
    /// Pause after a failed attempt before the next one.
    pub delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            delay: Duration::from_secs(5),
        }
    }
}

/// Executes HTTP requests under a [`RetryPolicy`].
///
/// Transport errors and non-2xx statuses are retried alike. Once the budget is
/// spent the last cause is returned inside [`HttpError::RetriesExhausted`].
#[derive(Debug, Clone)]
pub struct HttpInvoker {
    client: Client,
    policy: RetryPolicy,
}

impl HttpInvoker {
    pub fn new(client: Client, policy: RetryPolicy) -> Self {
        Self { client, policy }
    }

    /// Send `method url`, letting `decorate` add headers, body and timeout.
    ///
    /// `decorate` runs once per attempt, so bodies that cannot be replayed
    /// (multipart forms) are rebuilt each time.
    pub async fn execute<F>(
        &self,
        method: Method,
        url: &str,
        decorate: F,
    ) -> Result<Response, HttpError>
    where
        F: Fn(RequestBuilder) -> RequestBuilder,
    {
        let max_attempts = self.policy.max_attempts.max(1);
        let mut attempt = 0;

        loop {
            attempt += 1;
            let request = decorate(self.client.request(method.clone(), url));

            let failure = match request.send().await {
                Ok(resp) if resp.status().is_success() => {
                    debug!(%method, url, attempt, status = %resp.status(), "Request succeeded");
                    return Ok(resp);
                }
                Ok(resp) => {
                    let status = resp.status();
                    let body = resp.text().await.unwrap_or_default();
                    AttemptFailure::Status {
                        status,
                        body: truncate(&body, 300),
                    }
                }
                Err(e) => AttemptFailure::Transport(e),
            };

            if attempt >= max_attempts {
                warn!(%method, url, attempt, error = %failure, "Request failed, retry budget exhausted");
                return Err(HttpError::RetriesExhausted {
                    method: method.to_string(),
                    url: url.to_string(),
                    attempts: attempt,
                    last_cause: failure,
                });
            }

            warn!(
                %method,
                url,
                attempt,
                max_attempts,
                error = %failure,
                "Request failed, retrying in {}ms",
                self.policy.delay.as_millis()
            );
            tokio::time::sleep(self.policy.delay).await;
        }
    }

    /// [`execute`](Self::execute) and decode the JSON response body.
    pub async fn execute_json<T, F>(
        &self,
        method: Method,
        url: &str,
        decorate: F,
    ) -> Result<T, HttpError>
    where
        T: DeserializeOwned,
        F: Fn(RequestBuilder) -> RequestBuilder,
    {
        let resp = self.execute(method, url, decorate).await?;
        resp.json::<T>().await.map_err(|e| HttpError::Body {
            url: url.to_string(),
            reason: e.to_string(),
        })
    }
}

fn truncate(s: &str, max: usize) -> String {
    if s.len() <= max {
        s.to_string()
    } else {
        let mut end = max;
        while end > 0 && !s.is_char_boundary(end) {
            end -= 1;
        }
        format!("{}...", &s[..end])
    }
}
