use anyhow::Result;
use async_trait::async_trait;
use index::Embedder;
use query::CompletionService;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::sleep;
use tracing::{info, warn};

use crate::config::RetryConfig;

#[derive(Debug, Clone)]
pub struct RetryPolicy {
    max_retries: usize,
    initial_backoff: Duration,
    max_backoff: Duration,
}

impl RetryPolicy {
    pub fn new(max_retries: usize, initial_backoff_ms: u64, max_backoff_ms: u64) -> Self {
        Self {
            max_retries,
            initial_backoff: Duration::from_millis(initial_backoff_ms),
            max_backoff: Duration::from_millis(max_backoff_ms),
        }
    }

    pub fn from_config(config: &RetryConfig) -> Self {
        Self::new(
            config.max_retries,
            config.initial_backoff_ms,
            config.max_backoff_ms,
        )
    }

    /// Run `f` until it succeeds or `max_retries` extra attempts have failed,
    /// doubling the pause between attempts up to `max_backoff`.
    pub async fn retry<F, Fut, T, E>(&self, operation: &str, mut f: F) -> Result<T, E>
    where
        F: FnMut() -> Fut,
        Fut: std::future::Future<Output = Result<T, E>>,
        E: std::fmt::Display,
    {
        let mut attempt = 0;
        let mut backoff = self.initial_backoff;

        loop {
            match f().await {
                Ok(value) => {
                    if attempt > 0 {
                        info!(operation, attempts = attempt + 1, "succeeded after retries");
                    }
                    return Ok(value);
                }
                Err(e) => {
                    attempt += 1;
                    if attempt > self.max_retries {
                        warn!(operation, attempts = attempt, error = %e, "giving up");
                        return Err(e);
                    }

                    warn!(
                        operation,
                        attempt,
                        max_retries = self.max_retries,
                        backoff_ms = backoff.as_millis() as u64,
                        error = %e,
                        "failed, retrying"
                    );

                    sleep(backoff).await;
                    backoff = std::cmp::min(backoff * 2, self.max_backoff);
                }
            }
        }
    }
}

/// Embedder that retries transient failures of the wrapped one
pub struct RetryingEmbedder {
    inner: Arc<dyn Embedder>,
    policy: RetryPolicy,
}

impl RetryingEmbedder {
    pub fn new(inner: Arc<dyn Embedder>, policy: RetryPolicy) -> Self {
        Self { inner, policy }
    }
}

#[async_trait]
impl Embedder for RetryingEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        self.policy.retry("embed", || self.inner.embed(text)).await
    }

    fn model_name(&self) -> &str {
        self.inner.model_name()
    }
}

pub struct RetryingLLM {
    inner: Arc<dyn CompletionService>,
    policy: RetryPolicy,
}

impl RetryingLLM {
    pub fn new(inner: Arc<dyn CompletionService>, policy: RetryPolicy) -> Self {
        Self { inner, policy }
    }
}

#[async_trait]
impl CompletionService for RetryingLLM {
    async fn complete(&self, prompt: &str) -> Result<String> {
        self.policy.retry("complete", || self.inner.complete(prompt)).await
    }

    fn model_name(&self) -> &str {
        self.inner.model_name()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Fails the first `failures` calls
    struct Flaky {
        failures: usize,
        calls: AtomicUsize,
    }

    #[async_trait]
    impl CompletionService for Flaky {
        async fn complete(&self, _prompt: &str) -> Result<String> {
            let call = self.calls.fetch_add(1, Ordering::SeqCst);
            if call < self.failures {
                anyhow::bail!("503 Service Unavailable");
            }
            Ok("ok".to_string())
        }

        fn model_name(&self) -> &str {
            "flaky"
        }
    }

    fn flaky(failures: usize) -> Arc<Flaky> {
        Arc::new(Flaky {
            failures,
            calls: AtomicUsize::new(0),
        })
    }

    #[tokio::test]
    async fn test_recovers_within_budget() {
        let inner = flaky(2);
        let llm = RetryingLLM::new(inner.clone(), RetryPolicy::new(3, 1, 4));

        assert_eq!(llm.complete("hello").await.unwrap(), "ok");
        assert_eq!(inner.calls.load(Ordering::SeqCst), 3);
        assert_eq!(llm.model_name(), "flaky");
    }

    #[tokio::test]
    async fn test_gives_up_after_max_retries() {
        let inner = flaky(10);
        let llm = RetryingLLM::new(inner.clone(), RetryPolicy::new(2, 1, 2));

        let err = llm.complete("hello").await.unwrap_err();
        assert!(err.to_string().contains("503"));
        assert_eq!(inner.calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_zero_retries_is_single_attempt() {
        let policy = RetryPolicy::new(0, 1, 1);
        let calls = AtomicUsize::new(0);

        let result: Result<(), String> = policy
            .retry("noop", || {
                calls.fetch_add(1, Ordering::SeqCst);
                async { Err("boom".to_string()) }
            })
            .await;

        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
