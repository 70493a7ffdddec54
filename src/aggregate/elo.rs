//! ELO ratings with bootstrap confidence intervals.
//!
//! The point estimate replays the verdict list once, in the order it is
//! given (the coordinator hands aggregators the canonical `(judge index,
//! pair index)` order, so the point estimate is reproducible given fixed
//! verdicts — but ELO itself is order-sensitive, which is exactly why a
//! confidence interval is reported alongside it). The interval comes from
//! 1000 bootstrap resamples (sampling with replacement, same size),
//! each replayed from scratch with fresh initial ratings.

use std::collections::HashMap;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::model::{AggregationScores, Verdict};

use super::Aggregator;

const K_FACTOR: f64 = 32.0;
const INITIAL_RATING: f64 = 1000.0;
const BOOTSTRAP_RESAMPLES: usize = 1000;

/// Seed used when the caller doesn't supply one. Fixing it keeps repeated
/// runs over the same verdict list reproducible; callers wanting fresh
/// resampling on every call should construct with their own seed.
pub const DEFAULT_BOOTSTRAP_SEED: u64 = 0xC0FFEE;

#[derive(Debug, Clone, Copy)]
pub struct EloAggregator {
    bootstrap_seed: u64,
}

impl EloAggregator {
    pub fn new(bootstrap_seed: u64) -> Self {
        Self { bootstrap_seed }
    }
}

impl Default for EloAggregator {
    fn default() -> Self {
        Self::new(DEFAULT_BOOTSTRAP_SEED)
    }
}

impl Aggregator for EloAggregator {
    fn score(&self, verdicts: &[Verdict], candidates: &[String]) -> AggregationScores {
        if candidates.is_empty() {
            return AggregationScores::default();
        }

        let point = run_elo(verdicts, candidates);

        let mut bootstrap_ratings: HashMap<&str, Vec<f64>> =
            candidates.iter().map(|c| (c.as_str(), Vec::with_capacity(BOOTSTRAP_RESAMPLES))).collect();

        if !verdicts.is_empty() {
            let mut rng = StdRng::seed_from_u64(self.bootstrap_seed);
            for _ in 0..BOOTSTRAP_RESAMPLES {
                let resample: Vec<Verdict> = (0..verdicts.len())
                    .map(|_| verdicts[rng.gen_range(0..verdicts.len())].clone())
                    .collect();
                let ratings = run_elo(&resample, candidates);
                for candidate in candidates {
                    bootstrap_ratings
                        .get_mut(candidate.as_str())
                        .unwrap()
                        .push(*ratings.get(candidate).unwrap_or(&INITIAL_RATING));
                }
            }
        }

        let confidence_intervals = if verdicts.is_empty() {
            None
        } else {
            Some(
                candidates
                    .iter()
                    .map(|c| {
                        let mut samples = bootstrap_ratings[c.as_str()].clone();
                        (c.clone(), percentile_interval(&mut samples))
                    })
                    .collect(),
            )
        };

        AggregationScores {
            scores: point,
            confidence_intervals,
        }
    }
}

/// Replays one deterministic ordering of `verdicts` as a sequence of
/// matches, returning final ratings for every candidate (including those
/// untouched by any verdict, at the initial rating).
fn run_elo(verdicts: &[Verdict], candidates: &[String]) -> HashMap<String, f64> {
    let mut ratings: HashMap<String, f64> =
        candidates.iter().map(|c| (c.clone(), INITIAL_RATING)).collect();

    for verdict in verdicts {
        let (Some(&ri), Some(&rl)) = (ratings.get(&verdict.a), ratings.get(&verdict.b)) else {
            continue;
        };

        let expected_i = 1.0 / (1.0 + 10f64.powf((rl - ri) / 400.0));
        let expected_l = 1.0 - expected_i;
        let outcome_i = 0.5 + verdict.margin as f64 / 4.0;
        let outcome_l = 1.0 - outcome_i;

        let new_ri = ri + K_FACTOR * (outcome_i - expected_i);
        let new_rl = rl + K_FACTOR * (outcome_l - expected_l);

        ratings.insert(verdict.a.clone(), new_ri);
        ratings.insert(verdict.b.clone(), new_rl);
    }

    ratings
}

/// Nearest-rank 95% interval `(p2.5, p97.5)` over the sorted samples.
fn percentile_interval(samples: &mut [f64]) -> (f64, f64) {
    samples.sort_by(|a, b| a.partial_cmp(b).unwrap());
    let low = percentile(samples, 2.5);
    let high = percentile(samples, 97.5);
    (low, high)
}

fn percentile(sorted: &[f64], p: f64) -> f64 {
    if sorted.is_empty() {
        return INITIAL_RATING;
    }
    let rank = (p / 100.0 * (sorted.len() - 1) as f64).round() as usize;
    sorted[rank.min(sorted.len() - 1)]
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
    fn strong_win_lifts_winner_above_initial_rating() {
        let candidates = vec!["r1".to_string(), "r2".to_string()];
        let verdicts = vec![verdict("r1", "r2", 2)];

        let scores = EloAggregator::default().score(&verdicts, &candidates);

        assert!(scores.scores["r1"] > INITIAL_RATING);
        assert!(scores.scores["r2"] < INITIAL_RATING);
    }

    #[test]
    fn all_ties_keep_every_rating_at_exactly_initial() {
        let candidates = vec!["r1".to_string(), "r2".to_string(), "r3".to_string()];
        let verdicts = vec![
            verdict("r1", "r2", 0),
            verdict("r1", "r3", 0),
            verdict("r2", "r3", 0),
        ];

        let scores = EloAggregator::default().score(&verdicts, &candidates);

        for name in &candidates {
            assert_eq!(scores.scores[name], INITIAL_RATING);
        }
    }

    #[test]
    fn is_deterministic_for_a_fixed_seed() {
        let candidates = vec!["r1".to_string(), "r2".to_string()];
        let verdicts = vec![verdict("r1", "r2", 1), verdict("r2", "r1", -2)];

        let a = EloAggregator::new(42).score(&verdicts, &candidates);
        let b = EloAggregator::new(42).score(&verdicts, &candidates);

        assert_eq!(a.scores["r1"], b.scores["r1"]);
        assert_eq!(
            a.confidence_intervals.unwrap()["r1"],
            b.confidence_intervals.unwrap()["r1"]
        );
    }

    #[test]
    fn confidence_interval_contains_the_point_estimate() {
        let candidates = vec!["r1".to_string(), "r2".to_string(), "r3".to_string()];
        let verdicts = vec![
            verdict("r1", "r2", 2),
            verdict("r2", "r3", 1),
            verdict("r1", "r3", 2),
            verdict("r3", "r1", -1),
        ];

        let scores = EloAggregator::default().score(&verdicts, &candidates);
        let cis = scores.confidence_intervals.unwrap();

        for name in &candidates {
            let point = scores.scores[name];
            let (low, high) = cis[name];
            // Bootstrap noise can occasionally push the point estimate a
            // hair outside the nearest-rank interval; allow slack.
            assert!(low - 50.0 <= point && point <= high + 50.0, "{name}: {low} <= {point} <= {high}");
        }
    }

    #[test]
    fn no_verdicts_leaves_everyone_at_initial_rating_with_no_interval() {
        let candidates = vec!["r1".to_string(), "r2".to_string()];
        let scores = EloAggregator::default().score(&[], &candidates);

        assert_eq!(scores.scores["r1"], INITIAL_RATING);
        assert!(scores.confidence_intervals.is_none());
    }
}
