//! Anthropic Claude backend: an alternate pluggable provider alongside
//! the default `GatewayProvider`.

use std::time::Instant;

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::model::SamplingParams;

use super::{split_model_id, Completion, Provider};

pub struct AnthropicProvider {
    client: Client,
    base_url: String,
    api_key: String,
}

impl AnthropicProvider {
    pub fn new(base_url: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.into(),
            api_key: api_key.into(),
        }
    }
}

#[derive(Serialize)]
struct AnthropicRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    system: Option<&'a str>,
    messages: Vec<AnthropicMessage<'a>>,
}

#[derive(Serialize)]
struct AnthropicMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Deserialize)]
struct AnthropicResponse {
    content: Vec<AnthropicContent>,
}

#[derive(Deserialize)]
struct AnthropicContent {
    text: String,
}

#[async_trait]
impl Provider for AnthropicProvider {
    fn name(&self) -> &'static str {
        "anthropic"
    }

    async fn complete(
        &self,
        model: &str,
        system: &str,
        user: &str,
        sampling: &SamplingParams,
    ) -> Result<Completion> {
        let (_, model_name) = split_model_id(model);
        let request = AnthropicRequest {
            model: model_name,
            max_tokens: sampling.max_tokens.unwrap_or(4096),
            system: if system.is_empty() { None } else { Some(system) },
            messages: vec![AnthropicMessage {
                role: "user",
                content: user,
            }],
        };

        let url = format!("{}/messages", self.base_url);
        let started = Instant::now();
        let response: AnthropicResponse = self
            .client
            .post(&url)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", "2023-06-01")
            .json(&request)
            .send()
            .await
            .context("anthropic request failed")?
            .json()
            .await
            .context("anthropic response was not valid JSON")?;

        let text = response
            .content
            .into_iter()
            .next()
            .map(|c| c.text)
            .ok_or_else(|| anyhow::anyhow!("no response from anthropic"))?;

        Ok(Completion {
            text,
            tokens: None,
            latency_ms: started.elapsed().as_millis() as u64,
        })
    }
}
