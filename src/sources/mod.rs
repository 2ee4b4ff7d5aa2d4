use anyhow::Result;
use async_trait::async_trait;
use ethers::types::{Address, U256};
use std::collections::HashMap;

#[cfg(test)]
use mockall::automock;

use crate::config::TimeWindow;
use crate::types::StakerRecord;

pub mod file;
pub mod onchain;
pub mod subgraph;

pub use file::SnapshotFile;
pub use onchain::{NoBalances, OnchainBalances};
pub use subgraph::SubgraphClient;

/// Indexed deposit/withdrawal history.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait StakerSource: Send + Sync {
    /// Every address that ever deposited, with ledger totals (snapshot form).
    async fn fetch_all_depositors(&self) -> Result<Vec<StakerRecord>>;

    /// Addresses active in `window`, aggregated from their window events.
    async fn fetch_window(&self, window: TimeWindow) -> Result<Vec<StakerRecord>>;
}

/// Point-in-time stake balances.
///
/// Addresses whose lookup failed are simply absent from the returned map.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait BalanceSource: Send + Sync {
    async fn stake_of(&self, addresses: &[Address]) -> Result<HashMap<Address, U256>>;
}
