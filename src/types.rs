use ethers::types::{Address, H256, U256};
use serde::{Deserialize, Serialize};

use crate::error::{AirdropError, Result};
use crate::fixed_point::ray_string;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventKind {
    Deposit,
    Withdraw,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StakingEvent {
    pub tx_hash: H256,
    pub kind: EventKind,
    #[serde(with = "ray_string")]
    pub amount: U256,
    /// Layer2 operator the stake was delegated to.
    pub counterparty_address: Address,
    pub timestamp: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StakerRecord {
    pub address: Address,
    #[serde(with = "ray_string")]
    pub period_deposited: U256,
    #[serde(with = "ray_string")]
    pub period_withdrawn: U256,
    pub deposit_count: u32,
    pub withdraw_count: u32,
    pub first_activity_at: u64,
    pub last_activity_at: u64,
    pub events: Vec<StakingEvent>,
    #[serde(with = "ray_string")]
    pub lifetime_deposited: U256,
    #[serde(with = "ray_string")]
    pub lifetime_withdrawn: U256,
    #[serde(with = "ray_string")]
    pub current_stake: U256,
    #[serde(with = "ray_string")]
    pub seigniorage: U256,
}

impl StakerRecord {
    pub fn new(address: Address, first_seen: u64) -> Self {
        Self {
            address,
            period_deposited: U256::zero(),
            period_withdrawn: U256::zero(),
            deposit_count: 0,
            withdraw_count: 0,
            first_activity_at: first_seen,
            last_activity_at: first_seen,
            events: Vec::new(),
            lifetime_deposited: U256::zero(),
            lifetime_withdrawn: U256::zero(),
            current_stake: U256::zero(),
            seigniorage: U256::zero(),
        }
    }

    /// Deposits minus withdrawals inside the query window, floored at zero.
    pub fn net_period_position(&self) -> U256 {
        self.period_deposited.saturating_sub(self.period_withdrawn)
    }
}

/// Pre-aggregated ledger totals for one address.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SnapshotTotals {
    pub address: Address,
    pub period_deposited: U256,
    pub period_withdrawn: U256,
    pub deposit_count: u32,
    pub withdraw_count: u32,
    pub first_activity_at: u64,
    pub last_activity_at: u64,
    pub lifetime_deposited: U256,
    pub lifetime_withdrawn: U256,
    pub events: Vec<StakingEvent>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CriteriaWeights {
    pub staking_amount: u8,
    pub staking_duration: u8,
    pub seigniorage: u8,
}

impl CriteriaWeights {
    pub fn new(staking_amount: u8, staking_duration: u8, seigniorage: u8) -> Result<Self> {
        let weights = Self {
            staking_amount,
            staking_duration,
            seigniorage,
        };
        weights.validate()?;
        Ok(weights)
    }

    pub fn total(&self) -> u32 {
        self.staking_amount as u32 + self.staking_duration as u32 + self.seigniorage as u32
    }

    pub fn validate(&self) -> Result<()> {
        if self.total() != 100 {
            return Err(AirdropError::InvalidWeights(self.total()));
        }
        Ok(())
    }
}

impl Default for CriteriaWeights {
    fn default() -> Self {
        use crate::constants::{
            DEFAULT_WEIGHT_AMOUNT, DEFAULT_WEIGHT_DURATION, DEFAULT_WEIGHT_SEIGNIORAGE,
        };
        Self {
            staking_amount: DEFAULT_WEIGHT_AMOUNT,
            staking_duration: DEFAULT_WEIGHT_DURATION,
            seigniorage: DEFAULT_WEIGHT_SEIGNIORAGE,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SimulationConfig {
    pub total_tokens: f64,
    pub token_symbol: String,
    pub weights: CriteriaWeights,
    pub snapshot_timestamp: u64,
}

/// One value per scoring criterion.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MetricSet {
    pub staking_amount: f64,
    pub staking_duration: f64,
    pub seigniorage: f64,
}

impl MetricSet {
    pub fn map(self, f: impl Fn(f64) -> f64) -> Self {
        Self {
            staking_amount: f(self.staking_amount),
            staking_duration: f(self.staking_duration),
            seigniorage: f(self.seigniorage),
        }
    }

    pub fn max(self, other: Self) -> Self {
        Self {
            staking_amount: self.staking_amount.max(other.staking_amount),
            staking_duration: self.staking_duration.max(other.staking_duration),
            seigniorage: self.seigniorage.max(other.seigniorage),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StakerScore {
    pub address: Address,
    pub raw: MetricSet,
    pub sqrt: MetricSet,
    pub normalized: MetricSet,
    pub composite_score: f64,
    pub allocation: f64,
    pub allocation_pct: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SimulationSummary {
    pub eligible_count: usize,
    pub total_distributed: f64,
    pub top10_pct_concentration: f64,
    pub median_allocation: f64,
    pub max_allocation: f64,
    pub min_allocation: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SimulationResult {
    pub config: SimulationConfig,
    pub scores: Vec<StakerScore>,
    pub summary: SimulationSummary,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StakerLookupSummary {
    pub unique_stakers: usize,
    /// Sum of per-staker net window positions, each floored at zero, so a
    /// net withdrawer adds nothing rather than reducing the total.
    #[serde(with = "ray_string")]
    pub total_staked_amount: U256,
    #[serde(with = "ray_string")]
    pub total_seigniorage: U256,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StakerLookupResponse {
    pub stakers: Vec<StakerRecord>,
    pub total_count: usize,
    pub summary: StakerLookupSummary,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn weights_must_sum_to_one_hundred() {
        assert!(CriteriaWeights::new(33, 33, 34).is_ok());
        assert!(CriteriaWeights::new(100, 0, 0).is_ok());
        assert!(matches!(
            CriteriaWeights::new(50, 50, 50),
            Err(AirdropError::InvalidWeights(150))
        ));
        assert!(matches!(
            CriteriaWeights::new(0, 0, 0),
            Err(AirdropError::InvalidWeights(0))
        ));
    }

    #[test]
    fn default_weights_are_valid() {
        assert!(CriteriaWeights::default().validate().is_ok());
    }

    #[test]
    fn summary_serializes_with_camel_case_names() {
        let json = serde_json::to_value(SimulationSummary::default()).unwrap();
        assert!(json.get("top10PctConcentration").is_some());
        assert!(json.get("eligibleCount").is_some());
    }

    #[test]
    fn record_amounts_serialize_as_decimal_strings() {
        let mut record = StakerRecord::new(Address::repeat_byte(0xab), 1_700_000_000);
        record.current_stake = U256::exp10(30);
        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["currentStake"], "1000000000000000000000000000000");
        assert_eq!(json["address"], "0xabababababababababababababababababababab");

        let back: StakerRecord = serde_json::from_value(json).unwrap();
        assert_eq!(back, record);
    }

    #[test]
    fn net_position_saturates() {
        let mut record = StakerRecord::new(Address::zero(), 0);
        record.period_deposited = U256::from(10);
        record.period_withdrawn = U256::from(25);
        assert_eq!(record.net_period_position(), U256::zero());
    }
}
