//! Generation stage: one provider call per role, fanned out concurrently,
//! order-preserving, tolerant of individual failures.

use std::sync::Arc;
use std::time::Instant;

use futures::future::join_all;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::model::{Answer, Role};
use crate::provider::Provider;

/// Runs one provider call per role in parallel, each given `task` as its
/// user turn. Returns exactly `roles.len()` answers, in the same order as
/// `roles`, regardless of completion order.
pub async fn generate_all_for_task(
    provider: &Arc<dyn Provider>,
    task: &str,
    roles: &[Role],
    cancel: &CancellationToken,
) -> Vec<Answer> {
    let futures = roles.iter().map(|role| {
        let provider = Arc::clone(provider);
        let cancel = cancel.clone();
        async move { generate_for_role(&provider, task, role, &cancel).await }
    });

    join_all(futures).await
}

async fn generate_for_role(
    provider: &Arc<dyn Provider>,
    task: &str,
    role: &Role,
    cancel: &CancellationToken,
) -> Answer {
    let started = Instant::now();

    if cancel.is_cancelled() {
        return Answer::failure(&role.name, &role.model, "cancelled before generation started");
    }

    let result = tokio::select! {
        result = provider.complete(&role.model, &role.system_prompt, task, &role.sampling) => result,
        _ = cancel.cancelled() => {
            return Answer::failure(&role.name, &role.model, "cancelled");
        }
    };

    match result {
        Ok(completion) if completion.text.is_empty() => {
            warn!(role = %role.name, "provider returned empty response");
            Answer::failure(&role.name, &role.model, "empty response")
        }
        Ok(completion) => {
            info!(role = %role.name, latency_ms = completion.latency_ms, "generation succeeded");
            Answer {
                role: role.name.clone(),
                model: role.model.clone(),
                text: completion.text,
                success: true,
                error: None,
                tokens: completion.tokens,
                latency_ms: completion.latency_ms,
            }
        }
        Err(e) => {
            warn!(role = %role.name, error = %e, "generation failed");
            let mut answer = Answer::failure(&role.name, &role.model, e.to_string());
            answer.latency_ms = started.elapsed().as_millis() as u64;
            answer
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::SamplingParams;
    use crate::provider::MockProvider;

    fn role(name: &str, model: &str) -> Role {
        Role {
            name: name.to_string(),
            system_prompt: String::new(),
            model: model.to_string(),
            sampling: SamplingParams::default(),
            weight: 1.0,
        }
    }

    #[tokio::test]
    async fn preserves_role_order_regardless_of_content() {
        let mock = MockProvider::new();
        mock.on("task", "an answer");
        let provider: Arc<dyn Provider> = Arc::new(mock);

        let roles = vec![role("r1", "mock:m"), role("r2", "mock:m"), role("r3", "mock:m")];
        let cancel = CancellationToken::new();

        let answers = generate_all_for_task(&provider, "task", &roles, &cancel).await;

        assert_eq!(answers.len(), 3);
        assert_eq!(answers[0].role, "r1");
        assert_eq!(answers[1].role, "r2");
        assert_eq!(answers[2].role, "r3");
        assert!(answers.iter().all(|a| a.success));
    }

    #[tokio::test]
    async fn empty_response_is_a_failure() {
        let mock = MockProvider::new(); // no scripts => empty response
        let provider: Arc<dyn Provider> = Arc::new(mock);
        let roles = vec![role("r1", "mock:m")];
        let cancel = CancellationToken::new();

        let answers = generate_all_for_task(&provider, "task", &roles, &cancel).await;

        assert!(!answers[0].success);
        assert_eq!(answers[0].error.as_deref(), Some("empty response"));
    }

    #[tokio::test]
    async fn cancellation_yields_failed_answers() {
        let mock = MockProvider::new();
        mock.on("task", "an answer");
        let provider: Arc<dyn Provider> = Arc::new(mock);
        let roles = vec![role("r1", "mock:m")];
        let cancel = CancellationToken::new();
        cancel.cancel();

        let answers = generate_all_for_task(&provider, "task", &roles, &cancel).await;

        assert!(!answers[0].success);
    }
}
