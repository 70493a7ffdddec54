//! Weighted pairwise-points scoring: `A≫B` is worth 3 points to `A` and 0 to
//! `B`, `A>B` is worth 1 and 0, `A=B` splits 0.5/0.5. No normalization —
//! the reported score is the raw sum across every verdict naming the
//! candidate.

use crate::model::{AggregationScores, Verdict};

use super::{pairwise_weights, Aggregator};

#[derive(Debug, Default, Clone, Copy)]
pub struct BordaAggregator;

impl Aggregator for BordaAggregator {
    fn score(&self, verdicts: &[Verdict], candidates: &[String]) -> AggregationScores {
        let weights = pairwise_weights(verdicts, candidates);

        let scores = candidates
            .iter()
            .enumerate()
            .map(|(i, name)| (name.clone(), weights[i].iter().sum()))
            .collect();

        AggregationScores {
            scores,
            confidence_intervals: None,
        }
    }
}
