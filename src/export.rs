use anyhow::Result;
use serde::Serialize;
use std::io::Write;

use crate::fixed_point::ray_to_display;
use crate::types::{SimulationResult, StakerLookupResponse};

const SCORE_HEADER: [&str; 11] = [
    "rank",
    "address",
    "staking_amount",
    "staking_duration_days",
    "seigniorage",
    "norm_staking_amount",
    "norm_staking_duration",
    "norm_seigniorage",
    "composite_score",
    "allocation",
    "allocation_pct",
];

const STAKER_HEADER: [&str; 9] = [
    "address",
    "period_deposited",
    "period_withdrawn",
    "deposit_count",
    "withdraw_count",
    "first_activity_at",
    "last_activity_at",
    "current_stake",
    "seigniorage",
];

pub fn write_json<W: Write, T: Serialize>(writer: W, value: &T) -> Result<()> {
    serde_json::to_writer_pretty(writer, value)?;
    Ok(())
}

/// One row per scored staker, in allocation order.
pub fn write_scores_csv<W: Write>(writer: W, result: &SimulationResult) -> Result<()> {
    let mut writer = csv::Writer::from_writer(writer);
    writer.write_record(SCORE_HEADER)?;
    for (rank, score) in result.scores.iter().enumerate() {
        writer.serialize((
            rank + 1,
            format!("{:?}", score.address),
            score.raw.staking_amount,
            score.raw.staking_duration,
            score.raw.seigniorage,
            score.normalized.staking_amount,
            score.normalized.staking_duration,
            score.normalized.seigniorage,
            score.composite_score,
            score.allocation,
            score.allocation_pct,
        ))?;
    }
    writer.flush()?;
    Ok(())
}

/// Amounts are written as exact decimal token values.
pub fn write_stakers_csv<W: Write>(writer: W, response: &StakerLookupResponse) -> Result<()> {
    let mut writer = csv::Writer::from_writer(writer);
    writer.write_record(STAKER_HEADER)?;
    for record in &response.stakers {
        writer.serialize((
            format!("{:?}", record.address),
            ray_to_display(record.period_deposited),
            ray_to_display(record.period_withdrawn),
            record.deposit_count,
            record.withdraw_count,
            record.first_activity_at,
            record.last_activity_at,
            ray_to_display(record.current_stake),
            ray_to_display(record.seigniorage),
        ))?;
    }
    writer.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::RAY;
    use crate::scoring::ScoringEngine;
    use crate::service::lookup_summary;
    use crate::types::{CriteriaWeights, SimulationConfig, StakerRecord};
    use ethers::types::{Address, U256};

    fn record() -> StakerRecord {
        let mut record = StakerRecord::new(Address::repeat_byte(0xaa), 1_600_000_000);
        record.current_stake = U256::from(1500) * RAY + RAY / 2;
        record.period_deposited = U256::from(1500) * RAY;
        record.deposit_count = 1;
        record
    }

    #[test]
    fn scores_csv_has_header_and_ranked_rows() {
        let config = SimulationConfig {
            total_tokens: 1000.0,
            token_symbol: "TKN".to_string(),
            weights: CriteriaWeights::default(),
            snapshot_timestamp: 1_700_000_000,
        };
        let result = ScoringEngine::score(&[record()], &config);

        let mut out = Vec::new();
        write_scores_csv(&mut out, &result).unwrap();
        let text = String::from_utf8(out).unwrap();
        let mut lines = text.lines();
        assert_eq!(lines.next().unwrap(), SCORE_HEADER.join(","));
        let row = lines.next().unwrap();
        assert!(row.starts_with("1,0xaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaa,1500.5,"));
        assert!(row.ends_with(",1000.0,100.0"));
        assert!(lines.next().is_none());
    }

    #[test]
    fn stakers_csv_writes_exact_amounts() {
        let records = vec![record()];
        let response = StakerLookupResponse {
            summary: lookup_summary(&records).unwrap(),
            total_count: 1,
            stakers: records,
        };
        let mut out = Vec::new();
        write_stakers_csv(&mut out, &response).unwrap();
        let text = String::from_utf8(out).unwrap();
        let row = text.lines().nth(1).unwrap();
        assert_eq!(
            row,
            "0xaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaa,1500,0,1,0,1600000000,1600000000,1500.5,0"
        );
    }
}
