use anyhow::{anyhow, Result};
use async_trait::async_trait;
use ethers::types::{Address, U256};
use log::info;
use std::{collections::HashMap, fs, path::Path};

use super::{BalanceSource, StakerSource};
use crate::aggregator::StakerAggregator;
use crate::config::TimeWindow;
use crate::types::StakerRecord;

/// Offline snapshot: a JSON array of staker records, such as the `stakers` list of a saved lookup.
#[derive(Debug, Clone)]
pub struct SnapshotFile {
    records: Vec<StakerRecord>,
}

impl SnapshotFile {
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let json = fs::read_to_string(path)
            .map_err(|e| anyhow!("Failed to read snapshot {}: {}", path.display(), e))?;
        let snapshot = Self::from_json(&json)
            .map_err(|e| anyhow!("Failed to parse snapshot {}: {}", path.display(), e))?;
        info!("Loaded {} staker records from {}", snapshot.records.len(), path.display());
        Ok(snapshot)
    }

    pub fn from_json(json: &str) -> Result<Self> {
        Ok(Self::from_records(serde_json::from_str(json)?))
    }

    pub fn from_records(records: Vec<StakerRecord>) -> Self {
        Self { records }
    }

    pub fn records(&self) -> &[StakerRecord] {
        &self.records
    }
}

#[async_trait]
impl StakerSource for SnapshotFile {
    async fn fetch_all_depositors(&self) -> Result<Vec<StakerRecord>> {
        Ok(self
            .records
            .iter()
            .filter(|r| r.deposit_count > 0 || !r.lifetime_deposited.is_zero())
            .cloned()
            .collect())
    }

    /// Re-folds each record's events that fall inside `window`.
    async fn fetch_window(&self, window: TimeWindow) -> Result<Vec<StakerRecord>> {
        let mut aggregator = StakerAggregator::new();
        for record in &self.records {
            let in_window = record
                .events
                .iter()
                .filter(|e| e.timestamp >= window.from && e.timestamp <= window.to);
            for event in in_window {
                aggregator.fold_event(record.address, event.clone())?;
            }
            aggregator.apply_lifetime_totals(
                record.address,
                record.lifetime_deposited,
                record.lifetime_withdrawn,
            );
        }
        Ok(aggregator.finish())
    }
}

#[async_trait]
impl BalanceSource for SnapshotFile {
    async fn stake_of(&self, addresses: &[Address]) -> Result<HashMap<Address, U256>> {
        let stakes: HashMap<Address, U256> = self
            .records
            .iter()
            .filter(|r| !r.current_stake.is_zero())
            .map(|r| (r.address, r.current_stake))
            .collect();
        Ok(addresses
            .iter()
            .filter_map(|a| stakes.get(a).map(|stake| (*a, *stake)))
            .collect())
    }
}
