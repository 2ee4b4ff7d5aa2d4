use anyhow::Result;
use async_trait::async_trait;
use ethers::{
    abi::Token,
    contract::{abigen, Multicall},
    providers::{Http, Provider},
    types::{Address, Bytes, U256},
};
use log::{info, warn};
use std::{collections::HashMap, sync::Arc};

use super::BalanceSource;
use crate::constants::{MULTICALL_CHUNK_SIZE, SEIG_MANAGER_PROXY};
use crate::error::AirdropError;

abigen!(
    SeigManager,
    r#"[
        function stakeOf(address account) external view returns (uint256)
    ]"#
);

/// `SeigManager.stakeOf` totals (all layer2s) batched through Multicall3.
pub struct OnchainBalances {
    provider: Arc<Provider<Http>>,
    seig_manager: Address,
    chunk_size: usize,
}

impl OnchainBalances {
    pub fn new(rpc_url: &str) -> Result<Self> {
        let provider = Provider::<Http>::try_from(rpc_url)
            .map_err(|e| AirdropError::Rpc(e.to_string()))?;
        Ok(Self {
            provider: Arc::new(provider),
            seig_manager: SEIG_MANAGER_PROXY,
            chunk_size: MULTICALL_CHUNK_SIZE,
        })
    }

    pub fn with_chunk_size(mut self, chunk_size: usize) -> Self {
        self.chunk_size = chunk_size.max(1);
        self
    }

    pub fn with_seig_manager(mut self, seig_manager: Address) -> Self {
        self.seig_manager = seig_manager;
        self
    }
}

#[async_trait]
impl BalanceSource for OnchainBalances {
    async fn stake_of(&self, addresses: &[Address]) -> Result<HashMap<Address, U256>> {
        let mut balances = HashMap::new();
        if addresses.is_empty() {
            return Ok(balances);
        }

        let contract = SeigManager::new(self.seig_manager, self.provider.clone());
        let mut multicall = Multicall::new(self.provider.clone(), None)
            .await
            .map_err(|e| AirdropError::Rpc(e.to_string()))?;

        let mut failed = 0usize;
        for chunk in addresses.chunks(self.chunk_size) {
            multicall.clear_calls();
            for address in chunk {
                // allow_failure: a revert for one account must not sink the batch
                multicall.add_call(contract.stake_of(*address), true);
            }

            let outcome = multicall.call_raw().await.map_err(|e| e.to_string());
            failed += collect_chunk(chunk, outcome, &mut balances);
        }

        if failed > 0 {
            warn!("{} of {} stakeOf lookups failed, defaulting to zero", failed, addresses.len());
        }
        info!("Fetched {} stake balances", balances.len());
        Ok(balances)
    }
}

/// Folds one multicall batch into `balances` and returns how many lookups
/// in `chunk` produced no stake. A failed batch counts every address.
fn collect_chunk(
    chunk: &[Address],
    outcome: std::result::Result<Vec<std::result::Result<Token, Bytes>>, String>,
    balances: &mut HashMap<Address, U256>,
) -> usize {
    let results = match outcome {
        Ok(results) => results,
        Err(e) => {
            warn!("stakeOf batch of {} failed: {}", chunk.len(), e);
            return chunk.len();
        }
    };

    let mut resolved = 0usize;
    for (address, result) in chunk.iter().zip(results) {
        if let Some(stake) = result.ok().and_then(|token| token.into_uint()) {
            balances.insert(*address, stake);
            resolved += 1;
        }
    }
    chunk.len() - resolved
}

/// Used when no RPC endpoint is configured.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoBalances;

#[async_trait]
impl BalanceSource for NoBalances {
    async fn stake_of(&self, addresses: &[Address]) -> Result<HashMap<Address, U256>> {
        if !addresses.is_empty() {
            warn!("No RPC configured, {} stakers default to zero stake", addresses.len());
        }
        Ok(HashMap::new())
    }
}
