//! Top-level request handler: sequences generation, peer review,
//! aggregation, and synthesis behind one entrypoint, threading a single
//! cancellation token through every stage and enforcing an overall
//! deliberation deadline.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio_util::sync::CancellationToken;
use tracing::{info, instrument};

use crate::aggregate::{Aggregator, BordaAggregator, BradleyTerryAggregator, EloAggregator};
use crate::error::{CouncilError, Result};
use crate::generation::generate_all_for_task;
use crate::model::{
    AggregationScores, Answer, CouncilOutput, DeliberationMetadata, Options, OutputMode, Role,
};
use crate::provider::Provider;
use crate::review::run_peer_review;
use crate::synthesis::synthesize;

/// Default overall deliberation deadline, covering generation, review, and
/// synthesis combined.
pub const DEFAULT_OVERALL_DEADLINE: Duration = Duration::from_secs(600);

pub struct Coordinator {
    provider: Arc<dyn Provider>,
    overall_deadline: Duration,
    elo_seed: u64,
}

impl Coordinator {
    pub fn new(provider: Arc<dyn Provider>) -> Self {
        Self {
            provider,
            overall_deadline: DEFAULT_OVERALL_DEADLINE,
            elo_seed: crate::aggregate::DEFAULT_BOOTSTRAP_SEED,
        }
    }

    pub fn with_deadline(mut self, deadline: Duration) -> Self {
        self.overall_deadline = deadline;
        self
    }

    pub fn with_elo_seed(mut self, seed: u64) -> Self {
        self.elo_seed = seed;
        self
    }

    #[instrument(skip(self, roles, options, cancel), fields(task_len = task.len(), roles = roles.len()))]
    pub async fn deliberate(
        &self,
        task: &str,
        roles: &[Role],
        options: &Options,
        cancel: CancellationToken,
    ) -> Result<CouncilOutput> {
        validate(roles, options)?;

        let deadline_guard = cancel.clone();
        let deadline = self.overall_deadline;
        let timeout_task = tokio::spawn(async move {
            tokio::time::sleep(deadline).await;
            deadline_guard.cancel();
        });

        let result = self.run_stages(task, roles, options, &cancel).await;
        timeout_task.abort();
        result
    }

    async fn run_stages(
        &self,
        task: &str,
        roles: &[Role],
        options: &Options,
        cancel: &CancellationToken,
    ) -> Result<CouncilOutput> {
        let generation_started = Instant::now();
        let answers = generate_all_for_task(&self.provider, task, roles, cancel).await;
        let generation_ms = generation_started.elapsed().as_millis() as u64;

        let successful: Vec<Answer> = answers.iter().filter(|a| a.success).cloned().collect();
        info!(successful = successful.len(), total = answers.len(), "generation stage complete");

        if cancel.is_cancelled() && successful.len() < 2 {
            return Err(CouncilError::Cancelled);
        }

        let mut review_ms = 0u64;
        let mut verdicts = Vec::new();
        let mut review_stats = Default::default();

        if successful.len() >= 2 && options.review {
            let judges = resolve_judges(roles, &successful, options);
            let review_started = Instant::now();
            let (v, stats) = run_peer_review(&self.provider, task, &successful, &judges, options.anonymize, cancel).await;
            review_ms = review_started.elapsed().as_millis() as u64;
            verdicts = v;
            review_stats = stats;
        }

        let candidates: Vec<String> = successful.iter().map(|a| a.role.clone()).collect();
        let aggregation_scores = if !verdicts.is_empty() {
            self.run_aggregators(&verdicts, &candidates)
        } else {
            HashMap::new()
        };

        let mut synthesis_ms = 0u64;
        let synthesis = if matches!(options.output_mode, OutputMode::Synthesis | OutputMode::Both)
            && !successful.is_empty()
            && !cancel.is_cancelled()
        {
            let chairman = options
                .chairman_model
                .as_deref()
                .ok_or_else(|| CouncilError::InvalidRequest("chairman_model is required for synthesis".into()))?;
            let pairs: Vec<(&str, &AggregationScores)> = aggregation_scores
                .iter()
                .map(|(name, scores)| (name.as_str(), scores))
                .collect();
            let synthesis_started = Instant::now();
            let result = synthesize(&self.provider, chairman, task, &successful, &pairs, options.anonymize, cancel).await;
            synthesis_ms = synthesis_started.elapsed().as_millis() as u64;
            result
        } else {
            None
        };

        let metadata = DeliberationMetadata {
            generation_ms,
            review_ms,
            synthesis_ms,
            review_stats,
            primary_method: options.aggregation.as_str().to_string(),
        };

        Ok(CouncilOutput {
            task: task.to_string(),
            results: answers,
            aggregation_scores,
            synthesis,
            metadata,
        })
    }

    fn run_aggregators(&self, verdicts: &[crate::model::Verdict], candidates: &[String]) -> HashMap<String, AggregationScores> {
        let mut scores = HashMap::new();
        scores.insert("borda".to_string(), BordaAggregator.score(verdicts, candidates));
        scores.insert(
            "bradley_terry".to_string(),
            BradleyTerryAggregator.score(verdicts, candidates),
        );
        scores.insert("elo".to_string(), EloAggregator::new(self.elo_seed).score(verdicts, candidates));
        scores
    }
}

/// Judges default to the role definitions of the successful answers;
/// `options.reviewers`, when set, narrows that set to the named roles.
fn resolve_judges(roles: &[Role], successful: &[Answer], options: &Options) -> Vec<Role> {
    match &options.reviewers {
        Some(names) => roles.iter().filter(|r| names.contains(&r.name)).cloned().collect(),
        None => roles
            .iter()
            .filter(|r| successful.iter().any(|a| a.role == r.name))
            .cloned()
            .collect(),
    }
}

fn validate(roles: &[Role], options: &Options) -> Result<()> {
    if roles.len() < 2 {
        return Err(CouncilError::InvalidRequest("at least two roles are required".into()));
    }
    if roles.iter().any(|r| r.model.trim().is_empty()) {
        return Err(CouncilError::InvalidRequest("every role must have a non-empty model id".into()));
    }

    let mut seen = std::collections::HashSet::new();
    if !roles.iter().all(|r| seen.insert(r.name.as_str())) {
        return Err(CouncilError::InvalidRequest("role names must be unique".into()));
    }

    if matches!(options.output_mode, OutputMode::Synthesis | OutputMode::Both)
        && options.chairman_model.as_deref().unwrap_or("").trim().is_empty()
    {
        return Err(CouncilError::InvalidRequest(
            "chairman_model is required when synthesis is requested".into(),
        ));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::SamplingParams;
    use crate::provider::MockProvider;

    fn role(name: &str) -> Role {
        Role {
            name: name.to_string(),
            system_prompt: String::new(),
            model: "mock:m".to_string(),
            sampling: SamplingParams::default(),
            weight: 1.0,
        }
    }

    fn options() -> Options {
        Options {
            chairman_model: Some("mock:chairman".to_string()),
            ..Options::default()
        }
    }

    #[tokio::test]
    async fn rejects_fewer_than_two_roles() {
        let mock = MockProvider::new();
        let provider: Arc<dyn Provider> = Arc::new(mock);
        let coordinator = Coordinator::new(provider);
        let roles = vec![role("r1")];

        let result = coordinator.deliberate("task", &roles, &options(), CancellationToken::new()).await;

        assert!(matches!(result, Err(CouncilError::InvalidRequest(_))));
    }

    #[tokio::test]
    async fn rejects_missing_chairman_when_synthesis_requested() {
        let mock = MockProvider::new();
        let provider: Arc<dyn Provider> = Arc::new(mock);
        let coordinator = Coordinator::new(provider);
        let roles = vec![role("r1"), role("r2")];
        let mut opts = Options::default();
        opts.chairman_model = None;

        let result = coordinator.deliberate("task", &roles, &opts, CancellationToken::new()).await;

        assert!(matches!(result, Err(CouncilError::InvalidRequest(_))));
    }

    #[tokio::test]
    async fn full_deliberation_produces_answers_scores_and_synthesis() {
        let mock = MockProvider::new();
        // "===" only appears in judge/synthesis prompts; it must be
        // checked before "task", which also appears embedded in those
        // prompts and would otherwise shadow it.
        mock.on("===", "[[A>B]]");
        mock.on("task", "a generated answer");
        mock.with_default("final synthesis");
        let provider: Arc<dyn Provider> = Arc::new(mock);

        let coordinator = Coordinator::new(provider);
        let roles = vec![role("r1"), role("r2")];

        let output = coordinator
            .deliberate("task", &roles, &options(), CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(output.results.len(), 2);
        assert!(output.results.iter().all(|a| a.success));
        assert_eq!(output.aggregation_scores.len(), 3);
        assert!(output.synthesis.is_some());
    }

    /// Fails `complete` whenever the model id contains `"bad"`; otherwise
    /// delegates to an inner `MockProvider`. Lets a test force exactly one
    /// role's generation to fail, since `MockProvider` itself only
    /// discriminates on prompt content (identical across roles here).
    struct FailOnModel(MockProvider);

    #[async_trait::async_trait]
    impl Provider for FailOnModel {
        fn name(&self) -> &'static str {
            "fail-on-model"
        }

        async fn complete(
            &self,
            model: &str,
            system: &str,
            user: &str,
            sampling: &SamplingParams,
        ) -> anyhow::Result<crate::provider::Completion> {
            if model.contains("bad") {
                anyhow::bail!("simulated provider failure for {model}");
            }
            self.0.complete(model, system, user, sampling).await
        }
    }

    #[tokio::test]
    async fn generation_failure_for_one_role_still_reviews_the_rest() {
        let mock = MockProvider::new();
        mock.on("===", "[[A=B]]");
        mock.on("task", "an answer");
        mock.with_default("synthesis");
        let provider: Arc<dyn Provider> = Arc::new(FailOnModel(mock));

        let coordinator = Coordinator::new(provider);
        let mut failing = role("r1");
        failing.model = "mock:bad".to_string();
        let roles = vec![failing, role("r2"), role("r3")];

        let output = coordinator
            .deliberate("task", &roles, &options(), CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(output.results.len(), 3);
        let r1 = output.results.iter().find(|a| a.role == "r1").unwrap();
        assert!(!r1.success);

        let borda = &output.aggregation_scores["borda"];
        assert_eq!(borda.scores.len(), 2);
        assert!(!borda.scores.contains_key("r1"));
    }
}
