//! Maximum-likelihood Bradley-Terry strengths, fit by Minorization-Maximization.
//!
//! Model: `P(i beats l) = s_i / (s_i + s_l)`, `s_i > 0`. Each verdict
//! contributes a weighted win count between the pair (a strong win is worth
//! 2, a narrow win 1, a tie 0.5 to each side). The MM update is the
//! standard closed form for this model; iteration stops on convergence or
//! after a fixed cap. Strengths are re-normalized so their geometric mean
//! is 1, which keeps reported scores comparable run to run regardless of
//! how many iterations were needed.

use tracing::warn;

use crate::model::{AggregationScores, Verdict};

use super::{bt_margin_weights, Aggregator};

const MAX_ITERATIONS: usize = 1000;
const CONVERGENCE_TOLERANCE: f64 = 1e-6;

#[derive(Debug, Default, Clone, Copy)]
pub struct BradleyTerryAggregator;

impl Aggregator for BradleyTerryAggregator {
    fn score(&self, verdicts: &[Verdict], candidates: &[String]) -> AggregationScores {
        let n = candidates.len();
        if n == 0 {
            return AggregationScores::default();
        }

        let index_of = |name: &str| candidates.iter().position(|c| c == name);
        let mut win_weight = vec![vec![0.0; n]; n];
        let mut contested = vec![false; n];

        for verdict in verdicts {
            let (Some(i), Some(l)) = (index_of(&verdict.a), index_of(&verdict.b)) else {
                continue;
            };
            let (wi, wl) = bt_margin_weights(verdict.margin);
            win_weight[i][l] += wi;
            win_weight[l][i] += wl;
            contested[i] = true;
            contested[l] = true;
        }

        let mut strengths = vec![1.0f64; n];

        for _ in 0..MAX_ITERATIONS {
            let mut next = vec![0.0f64; n];
            let mut max_relative_change = 0.0f64;

            for i in 0..n {
                if !contested[i] {
                    next[i] = strengths[i];
                    continue;
                }

                let numerator: f64 = (0..n).map(|l| win_weight[i][l]).sum();
                let denominator: f64 = (0..n)
                    .filter(|&l| l != i)
                    .map(|l| (win_weight[i][l] + win_weight[l][i]) / (strengths[i] + strengths[l]))
                    .sum();

                next[i] = if denominator > 0.0 {
                    numerator / denominator
                } else {
                    strengths[i]
                };

                let change = (next[i] - strengths[i]).abs() / strengths[i].max(1e-12);
                max_relative_change = max_relative_change.max(change);
            }

            strengths = next;
            if max_relative_change < CONVERGENCE_TOLERANCE {
                break;
            }
        }

        renormalize_geometric_mean(&mut strengths);

        // An uncontested candidate's strength is meaningless under the MM
        // fit; report the mean of the contested candidates instead.
        let contested_mean = {
            let (sum, count) = strengths
                .iter()
                .zip(&contested)
                .filter(|(_, &c)| c)
                .fold((0.0, 0usize), |(s, c), (&v, _)| (s + v, c + 1));
            if count > 0 {
                sum / count as f64
            } else {
                1.0
            }
        };
        for (i, name) in candidates.iter().enumerate() {
            if !contested[i] {
                warn!(candidate = %name, "no contested verdicts; reporting mean Bradley-Terry strength");
                strengths[i] = contested_mean;
            }
        }

        let scores = candidates
            .iter()
            .cloned()
            .zip(strengths)
            .collect();

        AggregationScores {
            scores,
            confidence_intervals: None,
        }
    }
}

fn renormalize_geometric_mean(strengths: &mut [f64]) {
    if strengths.is_empty() {
        return;
    }
    let mean_log = strengths.iter().map(|s| s.max(1e-12).ln()).sum::<f64>() / strengths.len() as f64;
    let scale = (-mean_log).exp();
    for s in strengths.iter_mut() {
        *s *= scale;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn verdict(a: &str, b: &str, margin: i8) -> Verdict {
        Verdict {
            judge: "j".to_string(),
            a: a.to_string(),
            b: b.to_string(),
            margin,
            raw: String::new(),
        }
    }

    #[test]
    fn dominant_role_has_the_maximum_strength() {
        let candidates = vec!["r1".to_string(), "r2".to_string(), "r3".to_string()];
        let verdicts = vec![
            verdict("r1", "r2", 2),
            verdict("r1", "r3", 2),
            verdict("r2", "r3", 0),
        ];

        let scores = BradleyTerryAggregator.score(&verdicts, &candidates);

        let max = scores.scores.values().cloned().fold(f64::MIN, f64::max);
        assert_eq!(scores.scores["r1"], max);
    }

    #[test]
    fn all_ties_yield_equal_strengths() {
        let candidates = vec!["r1".to_string(), "r2".to_string(), "r3".to_string()];
        let verdicts = vec![
            verdict("r1", "r2", 0),
            verdict("r1", "r3", 0),
            verdict("r2", "r3", 0),
        ];

        let scores = BradleyTerryAggregator.score(&verdicts, &candidates);

        let values: Vec<f64> = scores.scores.values().cloned().collect();
        let spread = values.iter().cloned().fold(f64::MIN, f64::max)
            - values.iter().cloned().fold(f64::MAX, f64::min);
        assert!(spread.abs() < 1e-4, "strengths should coincide within tolerance: {values:?}");
    }

    #[test]
    fn is_deterministic_on_fixed_verdicts() {
        let candidates = vec!["r1".to_string(), "r2".to_string()];
        let verdicts = vec![verdict("r1", "r2", 1)];

        let a = BradleyTerryAggregator.score(&verdicts, &candidates);
        let b = BradleyTerryAggregator.score(&verdicts, &candidates);

        assert_eq!(a.scores["r1"], b.scores["r1"]);
        assert_eq!(a.scores["r2"], b.scores["r2"]);
    }

    #[test]
    fn uncontested_candidate_reports_the_mean_of_the_rest() {
        let candidates = vec!["r1".to_string(), "r2".to_string(), "r3".to_string()];
        let verdicts = vec![verdict("r1", "r2", 2)];

        let scores = BradleyTerryAggregator.score(&verdicts, &candidates);

        let mean_of_contested = (scores.scores["r1"] + scores.scores["r2"]) / 2.0;
        assert!((scores.scores["r3"] - mean_of_contested).abs() < 1e-9);
    }
}
