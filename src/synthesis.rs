//! Chairman synthesis: one provider call that folds every successful
//! answer, optionally anonymized, plus a compact digest of the ranking
//! tables, into a single final response.

use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::warn;

use crate::model::{AggregationScores, Answer, SamplingParams};
use crate::provider::Provider;
use crate::review::LabelMap;

const MAX_ANSWER_EXCERPT: usize = 2000;

/// Issues the chairman call and returns its text, or `None` if the call
/// fails or is cancelled — synthesis never aborts the rest of a
/// deliberation.
pub async fn synthesize(
    provider: &Arc<dyn Provider>,
    chairman_model: &str,
    task: &str,
    successful: &[Answer],
    scores: &[(&str, &AggregationScores)],
    anonymize: bool,
    cancel: &CancellationToken,
) -> Option<String> {
    if successful.is_empty() || cancel.is_cancelled() {
        return None;
    }

    let refs: Vec<&Answer> = successful.iter().collect();
    let labels = LabelMap::build(&refs);

    let answers_block = successful
        .iter()
        .map(|a| {
            let label = labels.display(&a.role, anonymize);
            format!("=== {label} ===\n{}", excerpt(&a.text, MAX_ANSWER_EXCERPT))
        })
        .collect::<Vec<_>>()
        .join("\n\n");

    let digest = render_digest(scores, &labels, anonymize);

    let system = "You are the chairman of a council of AI models. You are given the \
        original task, every council member's answer, and a ranking digest produced by \
        independent aggregation methods. Produce a single, final synthesized answer that \
        incorporates the strongest points across the answers and resolves contradictions. \
        Respond with only the synthesized answer, no meta-commentary.";

    let user = format!(
        "Task:\n{task}\n\n\
         Council answers:\n{answers_block}\n\n\
         Ranking digest:\n{digest}"
    );

    let sampling = SamplingParams::default();
    let result = tokio::select! {
        result = provider.complete(chairman_model, system, &user, &sampling) => result,
        _ = cancel.cancelled() => {
            warn!("chairman synthesis cancelled");
            return None;
        }
    };

    match result {
        Ok(completion) if !completion.text.is_empty() => Some(completion.text),
        Ok(_) => {
            warn!("chairman returned empty synthesis");
            None
        }
        Err(e) => {
            warn!(error = %e, "chairman synthesis call failed");
            None
        }
    }
}

fn excerpt(text: &str, max_len: usize) -> &str {
    if text.len() <= max_len {
        text
    } else {
        let mut end = max_len;
        while !text.is_char_boundary(end) {
            end -= 1;
        }
        &text[..end]
    }
}

fn render_digest(scores: &[(&str, &AggregationScores)], labels: &LabelMap, anonymize: bool) -> String {
    scores
        .iter()
        .map(|(method, agg)| {
            let mut ranked: Vec<(&String, &f64)> = agg.scores.iter().collect();
            ranked.sort_by(|a, b| b.1.partial_cmp(a.1).unwrap());
            let lines = ranked
                .iter()
                .map(|(role, score)| format!("  {}: {:.3}", labels.display(role, anonymize), score))
                .collect::<Vec<_>>()
                .join("\n");
            format!("{method}:\n{lines}")
        })
        .collect::<Vec<_>>()
        .join("\n\n")
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;
    use crate::provider::MockProvider;

    fn answer(role: &str, text: &str) -> Answer {
        Answer {
            role: role.to_string(),
            model: "mock:m".to_string(),
            text: text.to_string(),
            success: true,
            error: None,
            tokens: None,
            latency_ms: 1,
        }
    }

    #[tokio::test]
    async fn returns_the_chairman_reply_on_success() {
        let mock = MockProvider::new().with_default("final synthesis text");
        let provider: Arc<dyn Provider> = Arc::new(mock);
        let successful = vec![answer("r1", "alpha"), answer("r2", "beta")];
        let scores = AggregationScores {
            scores: HashMap::from([("r1".to_string(), 3.0), ("r2".to_string(), 0.0)]),
            confidence_intervals: None,
        };
        let pairs: Vec<(&str, &AggregationScores)> = vec![("borda", &scores)];
        let cancel = CancellationToken::new();

        let result = synthesize(&provider, "chairman:m", "task", &successful, &pairs, true, &cancel).await;

        assert_eq!(result.as_deref(), Some("final synthesis text"));
    }

    #[tokio::test]
    async fn returns_none_when_the_chairman_call_fails() {
        let mock = MockProvider::new().strict(); // no scripts, no default -> errors
        let provider: Arc<dyn Provider> = Arc::new(mock);
        let successful = vec![answer("r1", "alpha")];
        let cancel = CancellationToken::new();

        let result = synthesize(&provider, "chairman:m", "task", &successful, &[], true, &cancel).await;

        assert!(result.is_none());
    }

    #[tokio::test]
    async fn returns_none_when_nothing_succeeded() {
        let mock = MockProvider::new().with_default("unused");
        let provider: Arc<dyn Provider> = Arc::new(mock);
        let cancel = CancellationToken::new();

        let result = synthesize(&provider, "chairman:m", "task", &[], &[], true, &cancel).await;

        assert!(result.is_none());
    }

    #[tokio::test]
    async fn returns_none_when_already_cancelled() {
        let mock = MockProvider::new().with_default("unused");
        let provider: Arc<dyn Provider> = Arc::new(mock);
        let successful = vec![answer("r1", "alpha")];
        let cancel = CancellationToken::new();
        cancel.cancel();

        let result = synthesize(&provider, "chairman:m", "task", &successful, &[], true, &cancel).await;

        assert!(result.is_none());
    }
}
