//! Local Ollama backend: one of several pluggable providers besides the
//! default gateway, adapted to the `Provider` trait's
//! `complete(model, system, user, sampling)` shape.

use std::time::Instant;

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::model::SamplingParams;

use super::{split_model_id, Completion, Provider};

pub struct OllamaProvider {
    client: Client,
    base_url: String,
}

impl OllamaProvider {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.into(),
        }
    }
}

#[derive(Serialize)]
struct OllamaRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    system: &'a str,
    stream: bool,
}

#[derive(Deserialize)]
struct OllamaResponse {
    response: String,
}

#[async_trait]
impl Provider for OllamaProvider {
    fn name(&self) -> &'static str {
        "ollama"
    }

    async fn complete(
        &self,
        model: &str,
        system: &str,
        user: &str,
        _sampling: &SamplingParams,
    ) -> Result<Completion> {
        let (_, model_name) = split_model_id(model);
        let request = OllamaRequest {
            model: model_name,
            prompt: user,
            system,
            stream: false,
        };

        let url = format!("{}/api/generate", self.base_url);
        let started = Instant::now();
        let response: OllamaResponse = self
            .client
            .post(&url)
            .json(&request)
            .send()
            .await
            .context("ollama request failed")?
            .json()
            .await
            .context("ollama response was not valid JSON")?;

        Ok(Completion {
            text: response.response,
            tokens: None,
            latency_ms: started.elapsed().as_millis() as u64,
        })
    }
}
