//! Peer-review stage: every judge compares every unordered pair of
//! successful answers once; verdicts are parsed and assembled into
//! canonical order.

use std::collections::HashMap;
use std::sync::Arc;

use futures::future::join_all;
use tokio_util::sync::CancellationToken;
use tracing::warn;

use crate::model::{Answer, ReviewStats, Role, SamplingParams, Verdict};
use crate::provider::Provider;
use crate::verdict::{build_judge_prompt, parse_verdict};

/// Stable `"A1"`, `"A2"`, … labels assigned by the order of successful
/// answers. Valid only within one peer-review run.
pub struct LabelMap {
    role_to_label: HashMap<String, String>,
}

impl LabelMap {
    pub fn build(successful: &[&Answer]) -> Self {
        let role_to_label = successful
            .iter()
            .enumerate()
            .map(|(i, a)| (a.role.clone(), format!("A{}", i + 1)))
            .collect();
        Self { role_to_label }
    }

    /// The label for a role, or the role name itself when anonymization is off.
    pub fn display(&self, role: &str, anonymize: bool) -> String {
        if anonymize {
            self.role_to_label
                .get(role)
                .cloned()
                .unwrap_or_else(|| role.to_string())
        } else {
            role.to_string()
        }
    }
}

/// One (judge, pair) unit of work, indexed so verdicts can be reassembled
/// into canonical order after concurrent completion.
struct ReviewJob<'a> {
    judge_index: usize,
    pair_index: usize,
    judge: &'a Role,
    a: &'a Answer,
    b: &'a Answer,
}

/// Runs the full peer-review stage: `|judges| * k*(k-1)/2` provider calls,
/// where `k = successful.len()`. Returns verdicts in canonical
/// `(judge index, pair index)` order plus counts for metadata.
///
/// `judges` is by default the role definitions of the successful answers,
/// or whatever subset of reviewers the coordinator resolves.
pub async fn run_peer_review(
    provider: &Arc<dyn Provider>,
    task: &str,
    successful: &[Answer],
    judges: &[Role],
    anonymize: bool,
    cancel: &CancellationToken,
) -> (Vec<Verdict>, ReviewStats) {
    if successful.len() < 2 {
        return (Vec::new(), ReviewStats::default());
    }

    let refs: Vec<&Answer> = successful.iter().collect();
    let labels = LabelMap::build(&refs);

    let mut jobs = Vec::new();
    for (judge_index, judge) in judges.iter().enumerate() {
        let mut pair_index = 0;
        for i in 0..successful.len() {
            for l in (i + 1)..successful.len() {
                jobs.push(ReviewJob {
                    judge_index,
                    pair_index,
                    judge,
                    a: &successful[i],
                    b: &successful[l],
                });
                pair_index += 1;
            }
        }
    }

    let total = jobs.len();
    let futures = jobs.into_iter().map(|job| {
        let provider = Arc::clone(provider);
        let cancel = cancel.clone();
        async move { run_one_review(&provider, task, job, &labels, anonymize, &cancel).await }
    });

    let mut outcomes: Vec<(usize, usize, Option<Verdict>, bool)> = join_all(futures).await;

    // Canonical order: (judge index, pair index).
    outcomes.sort_by_key(|(j, p, _, _)| (*j, *p));

    let mut verdicts = Vec::new();
    let mut unparseable = 0usize;
    let mut failed = 0usize;
    for (_, _, verdict, call_failed) in outcomes {
        match (verdict, call_failed) {
            (Some(v), _) => verdicts.push(v),
            (None, true) => failed += 1,
            (None, false) => unparseable += 1,
        }
    }

    let stats = ReviewStats {
        verdicts: verdicts.len(),
        unparseable,
        failed,
    };
    debug_assert!(stats.verdicts + stats.unparseable + stats.failed == total);

    (verdicts, stats)
}

async fn run_one_review(
    provider: &Arc<dyn Provider>,
    task: &str,
    job: ReviewJob<'_>,
    labels: &LabelMap,
    anonymize: bool,
    cancel: &CancellationToken,
) -> (usize, usize, Option<Verdict>, bool) {
    if cancel.is_cancelled() {
        return (job.judge_index, job.pair_index, None, true);
    }

    let label_a = labels.display(&job.a.role, anonymize);
    let label_b = labels.display(&job.b.role, anonymize);
    let prompt = build_judge_prompt(task, &label_a, &job.a.text, &label_b, &job.b.text);

    let sampling = SamplingParams::default();
    let result = tokio::select! {
        result = provider.complete(&job.judge.model, &job.judge.system_prompt, &prompt, &sampling) => result,
        _ = cancel.cancelled() => return (job.judge_index, job.pair_index, None, true),
    };

    match result {
        Ok(completion) => match parse_verdict(&completion.text) {
            Some(outcome) => {
                let verdict = Verdict {
                    judge: job.judge.name.clone(),
                    a: job.a.role.clone(),
                    b: job.b.role.clone(),
                    margin: outcome.margin(),
                    raw: completion.text,
                };
                (job.judge_index, job.pair_index, Some(verdict), false)
            }
            None => (job.judge_index, job.pair_index, None, false),
        },
        Err(e) => {
            warn!(judge = %job.judge.name, a = %job.a.role, b = %job.b.role, error = %e, "judge call failed");
            (job.judge_index, job.pair_index, None, true)
        }
    }
}
