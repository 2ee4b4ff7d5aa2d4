use ethers::types::{Address, U256};
use log::debug;
use std::collections::HashMap;

use crate::error::{AirdropError, Result};
use crate::types::StakerRecord;

/// `max(0, current_stake + lifetime_withdrawn - lifetime_deposited)`
pub fn compute_seigniorage(
    current_stake: U256,
    lifetime_deposited: U256,
    lifetime_withdrawn: U256,
) -> Result<U256> {
    let credited = current_stake
        .checked_add(lifetime_withdrawn)
        .ok_or(AirdropError::Overflow("computing seigniorage"))?;
    Ok(credited.saturating_sub(lifetime_deposited))
}

/// Fills in `current_stake` and `seigniorage` from a point-in-time balance map.
///
/// Addresses missing from `balances` are treated as holding zero stake; a failed
/// or skipped lookup never fails the run.
pub fn resolve(
    records: Vec<StakerRecord>,
    balances: &HashMap<Address, U256>,
) -> Result<Vec<StakerRecord>> {
    let mut missing = 0usize;
    let resolved = records
        .into_iter()
        .map(|mut record| {
            record.current_stake = match balances.get(&record.address) {
                Some(stake) => *stake,
                None => {
                    missing += 1;
                    U256::zero()
                }
            };
            record.seigniorage = compute_seigniorage(
                record.current_stake,
                record.lifetime_deposited,
                record.lifetime_withdrawn,
            )?;
            Ok(record)
        })
        .collect::<Result<Vec<_>>>()?;

    if missing > 0 {
        debug!("{} of {} stakers had no balance entry", missing, resolved.len());
    }
    Ok(resolved)
}
