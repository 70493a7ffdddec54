//! Rank aggregation: three independent ways of turning a verdict set into
//! per-candidate scores. None of them reads judge identity — only the pair
//! and margin — so all three are stable under reordering of verdicts.

mod borda;
mod bradley_terry;
mod elo;

pub use borda::BordaAggregator;
pub use bradley_terry::BradleyTerryAggregator;
pub use elo::{EloAggregator, DEFAULT_BOOTSTRAP_SEED};

use crate::model::{AggregationScores, Verdict};

/// Common surface every rank-aggregation method implements. `candidates` is
/// the generation-order list of role names; it is passed explicitly so a
/// method can report a score of exactly zero (or the appropriate neutral
/// value) for a candidate that appears in no verdict, rather than omitting it.
pub trait Aggregator {
    fn score(&self, verdicts: &[Verdict], candidates: &[String]) -> AggregationScores;
}

/// Accumulates a pairwise weight matrix shared by Borda and Bradley-Terry:
/// `weight[i][l]` is the total weight `i` has accrued over `l` across all
/// verdicts naming that ordered pair.
pub(crate) fn pairwise_weights(verdicts: &[Verdict], candidates: &[String]) -> Vec<Vec<f64>> {
    let index_of = |name: &str| candidates.iter().position(|c| c == name);
    let n = candidates.len();
    let mut weights = vec![vec![0.0; n]; n];

    for verdict in verdicts {
        let (Some(i), Some(l)) = (index_of(&verdict.a), index_of(&verdict.b)) else {
            continue;
        };
        let (wi, wl) = margin_weights(verdict.margin);
        weights[i][l] += wi;
        weights[l][i] += wl;
    }

    weights
}

/// Splits a verdict's margin into the weight it contributes to each side of
/// the pair, per the aggregation spec: `±2 -> 3/0`, `±1 -> 1/0`, `0 -> 0.5/0.5`.
fn margin_weights(margin: i8) -> (f64, f64) {
    match margin {
        2 => (3.0, 0.0),
        1 => (1.0, 0.0),
        0 => (0.5, 0.5),
        -1 => (0.0, 1.0),
        -2 => (0.0, 3.0),
        _ => (0.0, 0.0),
    }
}

/// Bradley-Terry's win-weight split is slightly different from Borda's: a
/// strong win is worth 2, not 3 (see `bradley_terry.rs`).
pub(crate) fn bt_margin_weights(margin: i8) -> (f64, f64) {
    match margin {
        2 => (2.0, 0.0),
        1 => (1.0, 0.0),
        0 => (0.5, 0.5),
        -1 => (0.0, 1.0),
        -2 => (0.0, 2.0),
        _ => (0.0, 0.0),
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
    fn pairwise_weights_are_symmetric_for_ties() {
        let candidates = vec!["r1".to_string(), "r2".to_string()];
        let verdicts = vec![verdict("r1", "r2", 0)];
        let weights = pairwise_weights(&verdicts, &candidates);
        assert_eq!(weights[0][1], 0.5);
        assert_eq!(weights[1][0], 0.5);
    }

    #[test]
    fn strong_win_is_worth_three_points_to_borda() {
        let candidates = vec!["r1".to_string(), "r2".to_string()];
        let verdicts = vec![verdict("r1", "r2", 2)];
        let weights = pairwise_weights(&verdicts, &candidates);
        assert_eq!(weights[0][1], 3.0);
        assert_eq!(weights[1][0], 0.0);
    }
}
