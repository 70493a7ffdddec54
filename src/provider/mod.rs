//! Provider adapter: the only place a remote backend's wire format
//! appears. The engine talks to providers exclusively through the
//! `Provider` trait below.

mod anthropic;
mod gateway;
mod ollama;
mod openai;

pub mod mock;

pub use anthropic::AnthropicProvider;
pub use gateway::GatewayProvider;
pub use ollama::OllamaProvider;
pub use openai::OpenAiProvider;

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;
use tokio::sync::Semaphore;

use crate::model::SamplingParams;

/// One provider call's result.
#[derive(Debug, Clone)]
pub struct Completion {
    pub text: String,
    pub tokens: Option<crate::model::TokenUsage>,
    pub latency_ms: u64,
}

/// Minimal surface every backend implements. `model` carries whatever
/// identifier the backend needs to pick a concrete model; callers never
/// need to know which backend is behind it.
#[async_trait]
pub trait Provider: Send + Sync {
    /// Provider name, for logging and error attribution.
    fn name(&self) -> &'static str;

    async fn complete(
        &self,
        model: &str,
        system: &str,
        user: &str,
        sampling: &SamplingParams,
    ) -> Result<Completion>;

    /// Release pooled connections. Default no-op; backends with their own
    /// connection pool (e.g. a dedicated reqwest::Client) may override.
    async fn close(&self) {}
}

/// Default per-request timeout.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(120);

/// Bounds in-flight provider calls regardless of how many the coordinator
/// fans out at once.
pub struct BoundedProvider<P: Provider> {
    inner: P,
    permits: Arc<Semaphore>,
    timeout: Duration,
}

impl<P: Provider> BoundedProvider<P> {
    pub fn new(inner: P, max_in_flight: usize) -> Self {
        Self {
            inner,
            permits: Arc::new(Semaphore::new(max_in_flight.max(1))),
            timeout: DEFAULT_REQUEST_TIMEOUT,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

#[async_trait]
impl<P: Provider> Provider for BoundedProvider<P> {
    fn name(&self) -> &'static str {
        self.inner.name()
    }

    async fn complete(
        &self,
        model: &str,
        system: &str,
        user: &str,
        sampling: &SamplingParams,
    ) -> Result<Completion> {
        let _permit = self
            .permits
            .acquire()
            .await
            .map_err(|e| anyhow::anyhow!("provider semaphore closed: {e}"))?;

        match tokio::time::timeout(self.timeout, self.inner.complete(model, system, user, sampling))
            .await
        {
            Ok(result) => result,
            Err(_) => Err(anyhow::anyhow!(
                "{} request timed out after {:?}",
                self.inner.name(),
                self.timeout
            )),
        }
    }

    async fn close(&self) {
        self.inner.close().await
    }
}

/// Splits a role's `model` identifier (`"<provider>:<model-name>"`) into
/// its provider tag and the bare model name the backend expects. Every
/// concrete backend calls this before building its wire request, so the
/// prefix never leaks into the request sent to the remote API.
pub fn split_model_id(model: &str) -> (&str, &str) {
    match model.split_once(':') {
        Some((provider, name)) => (provider, name),
        None => ("gateway", model),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn splits_provider_prefix_from_model_name() {
        assert_eq!(split_model_id("gateway:gpt-4o"), ("gateway", "gpt-4o"));
        assert_eq!(split_model_id("anthropic:claude-opus-4"), ("anthropic", "claude-opus-4"));
    }

    #[test]
    fn unprefixed_model_defaults_to_gateway() {
        assert_eq!(split_model_id("gpt-4o"), ("gateway", "gpt-4o"));
    }
}
