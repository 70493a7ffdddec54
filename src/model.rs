//! Core data model: roles, tasks, answers, verdicts, and the final output.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// Sampling parameters for one provider call. Any field left unset falls
/// back to the provider's own default.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SamplingParams {
    pub temperature: Option<f32>,
    pub max_tokens: Option<u32>,
    pub top_p: Option<f32>,
    pub presence_penalty: Option<f32>,
}

/// One seat at the council.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Role {
    /// Unique within one deliberation.
    pub name: String,
    /// May be empty; the role's identity in the prompt is then the model id alone.
    #[serde(default)]
    pub system_prompt: String,
    /// `"<provider>:<model-name>"`, e.g. `"gateway:gpt-4o"`.
    pub model: String,
    #[serde(default)]
    pub sampling: SamplingParams,
    /// Informational only; no aggregator reads it. See DESIGN.md.
    #[serde(default = "default_weight")]
    pub weight: f64,
}

fn default_weight() -> f64 {
    1.0
}

/// Token usage reported by a provider call, when it supplies one.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct TokenUsage {
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
}

/// A role's response, produced exactly once per role by the generation stage.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Answer {
    pub role: String,
    pub model: String,
    pub text: String,
    pub success: bool,
    pub error: Option<String>,
    pub tokens: Option<TokenUsage>,
    pub latency_ms: u64,
}

impl Answer {
    pub fn failure(role: &str, model: &str, error: impl Into<String>) -> Self {
        Self {
            role: role.to_string(),
            model: model.to_string(),
            text: String::new(),
            success: false,
            error: Some(error.into()),
            tokens: None,
            latency_ms: 0,
        }
    }
}

/// One of the five verdict outcomes a judge can report, expressed as the
/// margin it contributes to the ordered pair `(a, b)` — positive favors `a`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Outcome {
    /// `A≫B`
    StrongA,
    /// `A>B`
    WeakA,
    /// `A=B`
    Tie,
    /// `B>A`
    WeakB,
    /// `B≫A`
    StrongB,
}

impl Outcome {
    pub fn margin(self) -> i8 {
        match self {
            Outcome::StrongA => 2,
            Outcome::WeakA => 1,
            Outcome::Tie => 0,
            Outcome::WeakB => -1,
            Outcome::StrongB => -2,
        }
    }
}

/// One parsed pairwise judgment. `a` precedes `b` in generation order
/// (unordered pairs, `i < l`); `margin` is positive when `a` is favored.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Verdict {
    pub judge: String,
    pub a: String,
    pub b: String,
    pub margin: i8,
    /// Diagnostic only; aggregators never read it.
    pub raw: String,
}

/// One method's scores over the candidate set, optionally with bootstrap
/// confidence intervals (ELO only).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AggregationScores {
    pub scores: HashMap<String, f64>,
    pub confidence_intervals: Option<HashMap<String, (f64, f64)>>,
}

/// Counts surfaced in `DeliberationMetadata` for observability.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ReviewStats {
    pub verdicts: usize,
    pub unparseable: usize,
    pub failed: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeliberationMetadata {
    pub generation_ms: u64,
    pub review_ms: u64,
    pub synthesis_ms: u64,
    pub review_stats: ReviewStats,
    /// Echoes `Options::aggregation` — the "primary" method name; all three are always computed.
    pub primary_method: String,
}

/// The deliberation result returned to the caller.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CouncilOutput {
    pub task: String,
    pub results: Vec<Answer>,
    pub aggregation_scores: HashMap<String, AggregationScores>,
    pub synthesis: Option<String>,
    pub metadata: DeliberationMetadata,
}

/// Output mode selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutputMode {
    Perspectives,
    Synthesis,
    Both,
}

impl Default for OutputMode {
    fn default() -> Self {
        OutputMode::Both
    }
}

/// The three rank-aggregation methods. The "primary" one is only a
/// metadata hint to callers — all three are always computed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AggregationMethod {
    Borda,
    BradleyTerry,
    Elo,
}

impl AggregationMethod {
    pub fn as_str(self) -> &'static str {
        match self {
            AggregationMethod::Borda => "borda",
            AggregationMethod::BradleyTerry => "bradley_terry",
            AggregationMethod::Elo => "elo",
        }
    }
}

/// Request options.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Options {
    #[serde(default)]
    pub output_mode: OutputMode,
    #[serde(default = "default_true")]
    pub anonymize: bool,
    #[serde(default = "default_true")]
    pub review: bool,
    #[serde(default)]
    pub reviewers: Option<Vec<String>>,
    #[serde(default = "default_aggregation")]
    pub aggregation: AggregationMethod,
    #[serde(default)]
    pub chairman_model: Option<String>,
}

fn default_true() -> bool {
    true
}

fn default_aggregation() -> AggregationMethod {
    AggregationMethod::Borda
}

impl Default for Options {
    fn default() -> Self {
        Self {
            output_mode: OutputMode::Both,
            anonymize: true,
            review: true,
            reviewers: None,
            aggregation: AggregationMethod::Borda,
            chairman_model: None,
        }
    }
}
