//! Scripted fake provider for tests — returns canned text per
//! `(model, prompt)` instead of making a network call. Grounded in the
//! replay-style mock provider pattern used across the corpus for
//! LLM-backed test harnesses.

use std::sync::Mutex;

use anyhow::Result;
use async_trait::async_trait;

use crate::model::SamplingParams;

use super::{Completion, Provider};

struct Script {
    /// Matched against the user prompt via `contains`; the first match wins.
    prompt_contains: String,
    response: String,
}

/// A provider that never makes a network call. Responses are matched by
/// substring against the user prompt, in registration order; an
/// unmatched call returns the `default_response` (or fails, in strict mode).
pub struct MockProvider {
    scripts: Mutex<Vec<Script>>,
    default_response: Option<String>,
    strict: bool,
    calls: Mutex<Vec<(String, String)>>,
}

impl MockProvider {
    pub fn new() -> Self {
        Self {
            scripts: Mutex::new(Vec::new()),
            default_response: None,
            strict: false,
            calls: Mutex::new(Vec::new()),
        }
    }

    /// Fail instead of falling back to `default_response` when nothing matches.
    pub fn strict(mut self) -> Self {
        self.strict = true;
        self
    }

    pub fn with_default(mut self, response: impl Into<String>) -> Self {
        self.default_response = Some(response.into());
        self
    }

    /// Register a scripted response for any user prompt containing `needle`.
    pub fn on(&self, prompt_contains: impl Into<String>, response: impl Into<String>) -> &Self {
        self.scripts.lock().unwrap().push(Script {
            prompt_contains: prompt_contains.into(),
            response: response.into(),
        });
        self
    }

    /// All `(model, user_prompt)` pairs passed to `complete`, in call order.
    pub fn calls(&self) -> Vec<(String, String)> {
        self.calls.lock().unwrap().clone()
    }
}

impl Default for MockProvider {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Provider for MockProvider {
    fn name(&self) -> &'static str {
        "mock"
    }

    async fn complete(
        &self,
        model: &str,
        _system: &str,
        user: &str,
        _sampling: &SamplingParams,
    ) -> Result<Completion> {
        self.calls
            .lock()
            .unwrap()
            .push((model.to_string(), user.to_string()));

        let scripts = self.scripts.lock().unwrap();
        let matched = scripts
            .iter()
            .find(|s| user.contains(&s.prompt_contains))
            .map(|s| s.response.clone());
        drop(scripts);

        let text = match matched.or_else(|| self.default_response.clone()) {
            Some(t) => t,
            None if self.strict => {
                anyhow::bail!("MockProvider: no scripted response matched prompt: {user}")
            }
            None => String::new(),
        };

        Ok(Completion {
            text,
            tokens: None,
            latency_ms: 0,
        })
    }
}
