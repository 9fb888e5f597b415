use anyhow::Result;
use std::future::Future;
use std::time::Duration;
use tracing::debug;

/// How often a request is sent again after a transport error.
///
/// HTTP error statuses are responses, not transport errors, and are
/// returned to the caller on the first attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub retries: usize,
    pub delay: Duration,
}

impl RetryPolicy {
    pub const DEFAULT: Self = Self {
        retries: 3,
        delay: Duration::from_millis(500),
    };

    /// Runs `request` until it succeeds or the retries are used up.
    pub async fn send<F, Fut, T>(&self, what: &str, mut request: F) -> Result<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = reqwest::Result<T>>,
    {
        let mut failures = 0;
        loop {
            match request().await {
                Ok(value) => return Ok(value),
                Err(err) if failures < self.retries => {
                    failures += 1;
                    debug!(
                        request = what,
                        attempt = failures,
                        retries = self.retries,
                        error = %err,
                        "Request failed, retrying"
                    );
                    tokio::time::sleep(self.delay).await;
                }
                Err(err) => {
                    let attempts = failures + 1;
                    return Err(anyhow::Error::new(err)
                        .context(format!("{what} request failed after {attempts} attempts")));
                }
            }
        }
    }
}
