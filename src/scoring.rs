//! Weighted composite scoring and proportional token allocation.
//!
//! Each eligible staker is measured on three criteria (current stake, days
//! since first stake, accrued seigniorage). Every metric is square-root scaled,
//! normalized against the largest value in the population, and combined using
//! the configured percentage weights. Tokens are then split in proportion to
//! the composite scores.

use log::debug;

use crate::constants::{NORMALIZATION_FLOOR, SECONDS_PER_DAY};
use crate::fixed_point::ray_to_f64;
use crate::summary::summarize;
use crate::types::{
    CriteriaWeights, MetricSet, SimulationConfig, SimulationResult, SimulationSummary,
    StakerRecord, StakerScore,
};

pub struct ScoringEngine;

impl ScoringEngine {
    /// Scores `records` and distributes `config.total_tokens`.
    ///
    /// `config.weights` must already be validated to sum to 100.
    pub fn score(records: &[StakerRecord], config: &SimulationConfig) -> SimulationResult {
        let eligible: Vec<&StakerRecord> = records.iter().filter(|r| is_eligible(r)).collect();
        debug!(
            "{} of {} stakers eligible for {} {}",
            eligible.len(),
            records.len(),
            config.total_tokens,
            config.token_symbol
        );

        if eligible.is_empty() {
            return SimulationResult {
                config: config.clone(),
                scores: Vec::new(),
                summary: SimulationSummary::default(),
            };
        }

        let raw: Vec<MetricSet> = eligible
            .iter()
            .map(|r| raw_metrics(r, config.snapshot_timestamp))
            .collect();
        let sqrt: Vec<MetricSet> = raw.iter().map(|m| m.map(f64::sqrt)).collect();

        let max = sqrt
            .iter()
            .fold(MetricSet::default(), |acc, m| acc.max(*m))
            .map(|v| v.max(NORMALIZATION_FLOOR));

        let mut scores: Vec<StakerScore> = eligible
            .iter()
            .zip(raw.iter().zip(sqrt.iter()))
            .map(|(record, (raw, sqrt))| {
                let normalized = MetricSet {
                    staking_amount: sqrt.staking_amount / max.staking_amount,
                    staking_duration: sqrt.staking_duration / max.staking_duration,
                    seigniorage: sqrt.seigniorage / max.seigniorage,
                };
                StakerScore {
                    address: record.address,
                    raw: *raw,
                    sqrt: *sqrt,
                    normalized,
                    composite_score: composite_score(&normalized, &config.weights),
                    allocation: 0.0,
                    allocation_pct: 0.0,
                }
            })
            .collect();

        allocate(&mut scores, config.total_tokens);

        // stable: equal allocations keep input order
        scores.sort_by(|a, b| b.allocation.total_cmp(&a.allocation));

        let summary = summarize(&scores, config.total_tokens);
        SimulationResult {
            config: config.clone(),
            scores,
            summary,
        }
    }
}

/// Nonzero current stake or nonzero accrued seigniorage.
pub fn is_eligible(record: &StakerRecord) -> bool {
    ray_to_f64(record.current_stake) > 0.0 || ray_to_f64(record.seigniorage) > 0.0
}

pub fn raw_metrics(record: &StakerRecord, snapshot_timestamp: u64) -> MetricSet {
    let elapsed = snapshot_timestamp as f64 - record.first_activity_at as f64;
    MetricSet {
        staking_amount: ray_to_f64(record.current_stake),
        staking_duration: (elapsed / SECONDS_PER_DAY).max(0.0),
        seigniorage: ray_to_f64(record.seigniorage),
    }
}

pub fn composite_score(normalized: &MetricSet, weights: &CriteriaWeights) -> f64 {
    weighted(weights.staking_amount, normalized.staking_amount)
        + weighted(weights.staking_duration, normalized.staking_duration)
        + weighted(weights.seigniorage, normalized.seigniorage)
}

fn weighted(weight: u8, value: f64) -> f64 {
    if weight == 0 {
        return 0.0;
    }
    weight as f64 / 100.0 * value
}

/// Zero total score leaves every allocation at zero.
fn allocate(scores: &mut [StakerScore], total_tokens: f64) {
    let total_score: f64 = scores.iter().map(|s| s.composite_score).sum();
    if total_score <= 0.0 {
        debug!("total composite score is zero, nothing allocated");
        return;
    }
    for score in scores.iter_mut() {
        let share = score.composite_score / total_score;
        score.allocation = share * total_tokens;
        score.allocation_pct = share * 100.0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::RAY;
    use ethers::types::{Address, U256};

    const SNAPSHOT: u64 = 1_700_000_000;

    fn staker(byte: u8, stake: u64, seigniorage: u64, first: u64) -> StakerRecord {
        let mut record = StakerRecord::new(Address::repeat_byte(byte), first);
        record.current_stake = U256::from(stake) * RAY;
        record.seigniorage = U256::from(seigniorage) * RAY;
        record
    }

    fn config(a: u8, d: u8, s: u8) -> SimulationConfig {
        SimulationConfig {
            total_tokens: 1_000_000.0,
            token_symbol: "TEST".to_string(),
            weights: CriteriaWeights::new(a, d, s).unwrap(),
            snapshot_timestamp: SNAPSHOT,
        }
    }

    #[test]
    fn duration_is_floored_at_zero() {
        let future = staker(1, 1, 0, SNAPSHOT + 86_400);
        assert_eq!(raw_metrics(&future, SNAPSHOT).staking_duration, 0.0);
        let old = staker(1, 1, 0, SNAPSHOT - 2 * 86_400);
        assert_eq!(raw_metrics(&old, SNAPSHOT).staking_duration, 2.0);
    }

    #[test]
    fn zero_weight_contributes_exactly_nothing() {
        let weights = CriteriaWeights::new(0, 0, 100).unwrap();
        let normalized = MetricSet {
            staking_amount: 1.0,
            staking_duration: 1.0,
            seigniorage: 0.0,
        };
        assert_eq!(composite_score(&normalized, &weights), 0.0);
    }

    #[test]
    fn dust_balances_are_eligible() {
        let mut record = StakerRecord::new(Address::zero(), 0);
        record.current_stake = U256::one();
        assert!(is_eligible(&record));
        record.current_stake = U256::zero();
        assert!(!is_eligible(&record));
    }

    #[test]
    fn normalized_values_stay_in_unit_range() {
        let records = vec![
            staker(1, 100, 4, SNAPSHOT - 10 * 86_400),
            staker(2, 10_000, 0, SNAPSHOT - 86_400),
            staker(3, 1, 9, SNAPSHOT),
        ];
        let result = ScoringEngine::score(&records, &config(33, 33, 34));
        for score in &result.scores {
            for v in [
                score.normalized.staking_amount,
                score.normalized.staking_duration,
                score.normalized.seigniorage,
            ] {
                assert!((0.0..=1.0).contains(&v), "{v} out of range");
            }
        }
    }

    #[test]
    fn square_root_dampens_outliers() {
        let records = vec![
            staker(1, 100, 0, SNAPSHOT),
            staker(2, 10_000, 0, SNAPSHOT),
        ];
        let result = ScoringEngine::score(&records, &config(100, 0, 0));
        let ratio = result.scores[0].allocation / result.scores[1].allocation;
        assert!((ratio - 10.0).abs() < 1e-9);
    }

    #[test]
    fn all_zero_scores_allocate_nothing() {
        // eligible through seigniorage alone, but only stake and duration are weighted
        let records = vec![staker(1, 0, 5, SNAPSHOT), staker(2, 0, 7, SNAPSHOT)];
        let result = ScoringEngine::score(&records, &config(50, 50, 0));
        assert_eq!(result.scores.len(), 2);
        assert!(result.scores.iter().all(|s| s.allocation == 0.0));
        assert_eq!(result.summary.total_distributed, 0.0);
    }
}
