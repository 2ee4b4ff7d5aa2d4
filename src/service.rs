use anyhow::Result;
use ethers::types::{Address, U256};
use log::info;

use crate::config::{SimulationRequest, StakerQuery};
use crate::error::AirdropError;
use crate::scoring::ScoringEngine;
use crate::seigniorage;
use crate::sources::{BalanceSource, StakerSource};
use crate::types::{
    EventKind, SimulationResult, StakerLookupResponse, StakerLookupSummary, StakerRecord,
};

/// The two consumer-facing operations, wired over pluggable data sources.
pub struct AirdropService<S, B> {
    stakers: S,
    balances: B,
}

impl<S: StakerSource, B: BalanceSource> AirdropService<S, B> {
    pub fn new(stakers: S, balances: B) -> Self {
        Self { stakers, balances }
    }

    /// Stakers that deposited at least `min_amount` inside `[from, to]`.
    pub async fn list_stakers(&self, query: &StakerQuery) -> Result<StakerLookupResponse> {
        let params = query.validate_all()?;

        let records: Vec<StakerRecord> = self
            .stakers
            .fetch_window(params.window)
            .await?
            .into_iter()
            .filter(|r| r.deposit_count > 0 && meets_min_deposit(r, params.min_amount))
            .collect();

        let records = self.resolve(records).await?;
        let summary = lookup_summary(&records)?;
        info!(
            "Found {} stakers between {} and {}",
            records.len(),
            params.window.from,
            params.window.to
        );

        Ok(StakerLookupResponse {
            total_count: records.len(),
            stakers: records,
            summary,
        })
    }

    /// Scores every depositor and splits `total_tokens` among them.
    pub async fn simulate_airdrop(&self, request: &SimulationRequest) -> Result<SimulationResult> {
        let params = request.validate_all()?;

        let mut records = self.stakers.fetch_all_depositors().await?;
        if !params.min_amount.is_zero() {
            records.retain(|r| r.lifetime_deposited >= params.min_amount);
        }

        let records = self.resolve(records).await?;
        let result = ScoringEngine::score(&records, &params.config);
        info!(
            "Simulated {} {} across {} eligible stakers",
            params.config.total_tokens,
            params.config.token_symbol,
            result.summary.eligible_count
        );
        Ok(result)
    }

    async fn resolve(&self, records: Vec<StakerRecord>) -> Result<Vec<StakerRecord>> {
        let addresses: Vec<Address> = records.iter().map(|r| r.address).collect();
        let balances = self.balances.stake_of(&addresses).await?;
        Ok(seigniorage::resolve(records, &balances)?)
    }
}

/// One window deposit at or above `min_amount`; records without
/// event detail fall back to their window total.
pub fn meets_min_deposit(record: &StakerRecord, min_amount: U256) -> bool {
    if record.events.is_empty() {
        return record.period_deposited >= min_amount;
    }
    record
        .events
        .iter()
        .any(|e| e.kind == EventKind::Deposit && e.amount >= min_amount)
}

pub fn lookup_summary(records: &[StakerRecord]) -> Result<StakerLookupSummary, AirdropError> {
    let mut total_staked = U256::zero();
    let mut total_seigniorage = U256::zero();
    for record in records {
        total_staked = total_staked
            .checked_add(record.net_period_position())
            .ok_or(AirdropError::Overflow("summing staked amounts"))?;
        total_seigniorage = total_seigniorage
            .checked_add(record.seigniorage)
            .ok_or(AirdropError::Overflow("summing seigniorage"))?;
    }
    Ok(StakerLookupSummary {
        unique_stakers: records.len(),
        total_staked_amount: total_staked,
        total_seigniorage,
    })
}
