//! Configuration: provider endpoints, API-key resolution, concurrency and
//! deadline overrides. Loaded from TOML on disk with an `$ENV_VAR`
//! indirection for secrets, applied the same way across every provider's
//! credentials.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{CouncilError, Result};
use crate::model::SamplingParams;
use crate::provider::{AnthropicProvider, BoundedProvider, GatewayProvider, OllamaProvider, OpenAiProvider, Provider};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Which backend `build_provider` constructs.
    pub active_provider: String,

    pub gateway: GatewayConfig,
    pub ollama: OllamaConfig,
    pub openai: OpenAiConfig,
    pub anthropic: AnthropicConfig,

    pub concurrency: ConcurrencyConfig,
    pub deadlines: DeadlineConfig,

    #[serde(default)]
    pub default_sampling: SamplingParams,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayConfig {
    pub base_url: String,
    /// May be a literal token or an `$ENV_VAR` reference.
    pub api_key: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OllamaConfig {
    pub base_url: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OpenAiConfig {
    pub base_url: String,
    pub api_key: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnthropicConfig {
    pub base_url: String,
    pub api_key: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConcurrencyConfig {
    /// Max in-flight provider calls, shared across generation and review.
    pub max_in_flight: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeadlineConfig {
    pub request_timeout_secs: u64,
    pub overall_deadline_secs: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            active_provider: "gateway".to_string(),
            gateway: GatewayConfig {
                base_url: "https://api.openai.com/v1".to_string(),
                api_key: "$COUNCIL_GATEWAY_API_KEY".to_string(),
            },
            ollama: OllamaConfig {
                base_url: "http://localhost:11434".to_string(),
            },
            openai: OpenAiConfig {
                base_url: "https://api.openai.com/v1".to_string(),
                api_key: "$OPENAI_API_KEY".to_string(),
            },
            anthropic: AnthropicConfig {
                base_url: "https://api.anthropic.com/v1".to_string(),
                api_key: "$ANTHROPIC_API_KEY".to_string(),
            },
            concurrency: ConcurrencyConfig { max_in_flight: 32 },
            deadlines: DeadlineConfig {
                request_timeout_secs: 120,
                overall_deadline_secs: 600,
            },
            default_sampling: SamplingParams::default(),
        }
    }
}

impl Config {
    pub fn load(path: Option<&str>) -> Result<Self> {
        let config_path = match path {
            Some(p) => PathBuf::from(p),
            None => Self::default_path(),
        };

        if config_path.exists() {
            let content = std::fs::read_to_string(&config_path)?;
            let config: Config = toml::from_str(&content)
                .map_err(|e| CouncilError::Config(format!("invalid config at {}: {e}", config_path.display())))?;
            Ok(config)
        } else {
            let config = Config::default();
            config.save(&config_path)?;
            Ok(config)
        }
    }

    pub fn save(&self, path: &PathBuf) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)
            .map_err(|e| CouncilError::Config(format!("failed to serialize config: {e}")))?;
        std::fs::write(path, content)?;
        Ok(())
    }

    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("council-engine")
            .join("config.toml")
    }

    /// Resolves `$ENV_VAR`-style indirection; a literal value is returned
    /// as-is, an empty string resolves to `None`.
    pub fn resolve_secret(value: &str) -> Option<String> {
        if let Some(var) = value.strip_prefix('$') {
            std::env::var(var).ok()
        } else if value.is_empty() {
            None
        } else {
            Some(value.to_string())
        }
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.deadlines.request_timeout_secs)
    }

    pub fn overall_deadline(&self) -> Duration {
        Duration::from_secs(self.deadlines.overall_deadline_secs)
    }
}

/// Builds the active provider, wrapped in the shared concurrency/timeout
/// bound, per `active_provider`.
pub fn build_provider(config: &Config) -> Result<Arc<dyn Provider>> {
    let max_in_flight = config.concurrency.max_in_flight;
    let timeout = config.request_timeout();

    let provider: Arc<dyn Provider> = match config.active_provider.as_str() {
        "gateway" => {
            let key = Config::resolve_secret(&config.gateway.api_key)
                .ok_or_else(|| CouncilError::MissingApiKey("gateway".into()))?;
            let inner = GatewayProvider::new(config.gateway.base_url.clone(), key);
            Arc::new(BoundedProvider::new(inner, max_in_flight).with_timeout(timeout))
        }
        "ollama" => {
            let inner = OllamaProvider::new(config.ollama.base_url.clone());
            Arc::new(BoundedProvider::new(inner, max_in_flight).with_timeout(timeout))
        }
        "openai" => {
            let key = Config::resolve_secret(&config.openai.api_key)
                .ok_or_else(|| CouncilError::MissingApiKey("openai".into()))?;
            let inner = OpenAiProvider::new(config.openai.base_url.clone(), key);
            Arc::new(BoundedProvider::new(inner, max_in_flight).with_timeout(timeout))
        }
        "anthropic" => {
            let key = Config::resolve_secret(&config.anthropic.api_key)
                .ok_or_else(|| CouncilError::MissingApiKey("anthropic".into()))?;
            let inner = AnthropicProvider::new(config.anthropic.base_url.clone(), key);
            Arc::new(BoundedProvider::new(inner, max_in_flight).with_timeout(timeout))
        }
        other => return Err(CouncilError::Config(format!("unknown provider: {other}"))),
    };

    Ok(provider)
}
