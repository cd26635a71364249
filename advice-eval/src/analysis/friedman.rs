//! Friedman test for k related samples

use serde::{Deserialize, Serialize};
use statrs::distribution::{ChiSquared, ContinuousCDF};

#[derive(Debug, thiserror::Error)]
pub enum StatsError {
    #[error("Friedman test needs at least 3 groups, got {0}")]
    TooFewGroups(usize),

    #[error("Group {index} has {actual} observations, expected {expected}")]
    LengthMismatch {
        index: usize,
        expected: usize,
        actual: usize,
    },

    #[error("No complete observations to test")]
    Empty,

    #[error("Non-finite value in group {group}, row {row}")]
    NonFinite { group: usize, row: usize },

    #[error("All observations are tied within every block")]
    NoVariation,

    #[error("Distribution error: {0}")]
    Distribution(String),
}

/// Test statistic (tie-corrected chi-square) and its p-value
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FriedmanResult {
    pub statistic: f64,
    pub p_value: f64,
    pub groups: usize,
    pub blocks: usize,
    pub degrees_of_freedom: usize,
}

/// Average ranks (1-based) of `values`, plus the size of every tie group
pub fn rank_with_ties(values: &[f64]) -> (Vec<f64>, Vec<usize>) {
    let mut order: Vec<usize> = (0..values.len()).collect();
    order.sort_by(|&a, &b| values[a].partial_cmp(&values[b]).unwrap_or(std::cmp::Ordering::Equal));

    let mut ranks = vec![0.0; values.len()];
    let mut ties = Vec::new();
    let mut i = 0;
    while i < order.len() {
        let mut j = i;
        while j + 1 < order.len() && values[order[j + 1]] == values[order[i]] {
            j += 1;
        }
        let avg = (i + j) as f64 / 2.0 + 1.0;
        for &idx in &order[i..=j] {
            ranks[idx] = avg;
        }
        ties.push(j - i + 1);
        i = j + 1;
    }
    (ranks, ties)
}

/// Friedman chi-square test over aligned samples.
///
/// `samples[j][i]` is the measurement of group `j` in block `i`. Every
/// group must have the same length and contain only finite values, so
/// callers drop incomplete rows first.
pub fn friedman_test(samples: &[Vec<f64>]) -> Result<FriedmanResult, StatsError> {
    let k = samples.len();
    if k < 3 {
        return Err(StatsError::TooFewGroups(k));
    }

    let n = samples[0].len();
    for (index, group) in samples.iter().enumerate() {
        if group.len() != n {
            return Err(StatsError::LengthMismatch {
                index,
                expected: n,
                actual: group.len(),
            });
        }
        if let Some(row) = group.iter().position(|v| !v.is_finite()) {
            return Err(StatsError::NonFinite { group: index, row });
        }
    }
    if n == 0 {
        return Err(StatsError::Empty);
    }

    let mut rank_sums = vec![0.0; k];
    let mut tie_sum = 0.0;
    let mut block = vec![0.0; k];

    for i in 0..n {
        for (j, group) in samples.iter().enumerate() {
            block[j] = group[i];
        }
        let (ranks, ties) = rank_with_ties(&block);
        for (sum, r) in rank_sums.iter_mut().zip(&ranks) {
            *sum += r;
        }
        tie_sum += ties.iter().map(|&t| (t * t * t - t) as f64).sum::<f64>();
    }

    let (nf, kf) = (n as f64, k as f64);
    let ssbn: f64 = rank_sums.iter().map(|r| r * r).sum();
    let raw = 12.0 / (nf * kf * (kf + 1.0)) * ssbn - 3.0 * nf * (kf + 1.0);
    let correction = 1.0 - tie_sum / (nf * kf * (kf * kf - 1.0));

    if correction <= f64::EPSILON {
        return Err(StatsError::NoVariation);
    }

    let statistic = (raw / correction).max(0.0);
    let df = k - 1;
    let dist = ChiSquared::new(df as f64).map_err(|e| StatsError::Distribution(e.to_string()))?;
    let p_value = (1.0 - dist.cdf(statistic)).clamp(0.0, 1.0);

    Ok(FriedmanResult {
        statistic,
        p_value,
        groups: k,
        blocks: n,
        degrees_of_freedom: df,
    })
}
