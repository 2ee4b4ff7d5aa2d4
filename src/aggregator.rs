use ethers::types::{Address, U256};
use log::debug;
use std::collections::BTreeMap;

use crate::error::{AirdropError, Result};
use crate::types::{EventKind, SnapshotTotals, StakerRecord, StakingEvent};

/// Folds staking activity into exactly one [`StakerRecord`] per address.
///
/// The map is built per invocation and consumed by [`StakerAggregator::finish`].
/// Keys are `Address` values, so `0xABC..` and `0xabc..` land on the same record.
#[derive(Debug, Default)]
pub struct StakerAggregator {
    records: BTreeMap<Address, StakerRecord>,
    events_folded: usize,
}

impl StakerAggregator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Event-stream mode: accumulate one deposit or withdrawal.
    ///
    /// The amount counts toward both the window and the lifetime totals; a
    /// ledger snapshot applied later through [`Self::apply_lifetime_totals`]
    /// replaces the lifetime side.
    pub fn fold_event(&mut self, address: Address, event: StakingEvent) -> Result<()> {
        let record = self
            .records
            .entry(address)
            .or_insert_with(|| StakerRecord::new(address, event.timestamp));

        match event.kind {
            EventKind::Deposit => {
                record.period_deposited = checked_add(record.period_deposited, event.amount)?;
                record.lifetime_deposited = checked_add(record.lifetime_deposited, event.amount)?;
                record.deposit_count += 1;
            }
            EventKind::Withdraw => {
                record.period_withdrawn = checked_add(record.period_withdrawn, event.amount)?;
                record.lifetime_withdrawn = checked_add(record.lifetime_withdrawn, event.amount)?;
                record.withdraw_count += 1;
            }
        }

        record.first_activity_at = record.first_activity_at.min(event.timestamp);
        record.last_activity_at = record.last_activity_at.max(event.timestamp);
        record.events.push(event);
        self.events_folded += 1;
        Ok(())
    }

    /// Snapshot mode: aggregate fields arrive pre-computed and are copied in.
    pub fn fold_snapshot(&mut self, totals: SnapshotTotals) {
        let record = self
            .records
            .entry(totals.address)
            .or_insert_with(|| StakerRecord::new(totals.address, totals.first_activity_at));

        record.period_deposited = totals.period_deposited;
        record.period_withdrawn = totals.period_withdrawn;
        record.deposit_count = totals.deposit_count;
        record.withdraw_count = totals.withdraw_count;
        record.first_activity_at = totals.first_activity_at;
        record.last_activity_at = totals.last_activity_at;
        record.lifetime_deposited = totals.lifetime_deposited;
        record.lifetime_withdrawn = totals.lifetime_withdrawn;
        if !totals.events.is_empty() {
            record.events = totals.events;
        }
    }

    /// Overrides lifetime totals with ledger values for an address already seen.
    ///
    /// Lifetime totals never drop below what the window itself accumulated.
    pub fn apply_lifetime_totals(&mut self, address: Address, deposited: U256, withdrawn: U256) {
        if let Some(record) = self.records.get_mut(&address) {
            record.lifetime_deposited = deposited.max(record.period_deposited);
            record.lifetime_withdrawn = withdrawn.max(record.period_withdrawn);
        }
    }

    pub fn finish(self) -> Vec<StakerRecord> {
        debug!(
            "Aggregated {} events into {} staker records",
            self.events_folded,
            self.records.len()
        );
        self.records
            .into_values()
            .map(|mut record| {
                record.events.sort_by_key(|event| event.timestamp);
                record
            })
            .collect()
    }
}

/// Event-stream mode in one call.
pub fn aggregate_events<I>(events: I) -> Result<Vec<StakerRecord>>
where
    I: IntoIterator<Item = (Address, StakingEvent)>,
{
    let mut aggregator = StakerAggregator::new();
    for (address, event) in events {
        aggregator.fold_event(address, event)?;
    }
    Ok(aggregator.finish())
}

/// Snapshot mode in one call.
pub fn aggregate_snapshots<I>(snapshots: I) -> Vec<StakerRecord>
where
    I: IntoIterator<Item = SnapshotTotals>,
{
    let mut aggregator = StakerAggregator::new();
    for totals in snapshots {
        aggregator.fold_snapshot(totals);
    }
    aggregator.finish()
}

fn checked_add(a: U256, b: U256) -> Result<U256> {
    a.checked_add(b)
        .ok_or(AirdropError::Overflow("summing staking amounts"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::RAY;
    use ethers::types::H256;
    use std::str::FromStr;

    fn event(kind: EventKind, wton: u64, timestamp: u64) -> StakingEvent {
        StakingEvent {
            tx_hash: H256::from_low_u64_be(timestamp),
            kind,
            amount: U256::from(wton) * RAY,
            counterparty_address: Address::repeat_byte(0x22),
            timestamp,
        }
    }

    #[test]
    fn folds_events_for_the_same_address() {
        let staker = Address::repeat_byte(0x01);
        let records = aggregate_events(vec![
            (staker, event(EventKind::Deposit, 100, 300)),
            (staker, event(EventKind::Withdraw, 40, 100)),
            (staker, event(EventKind::Deposit, 50, 200)),
        ])
        .unwrap();

        assert_eq!(records.len(), 1);
        let record = &records[0];
        assert_eq!(record.period_deposited, U256::from(150) * RAY);
        assert_eq!(record.period_withdrawn, U256::from(40) * RAY);
        assert_eq!(record.deposit_count, 2);
        assert_eq!(record.withdraw_count, 1);
        assert_eq!(record.first_activity_at, 100);
        assert_eq!(record.last_activity_at, 300);
        let stamps: Vec<u64> = record.events.iter().map(|e| e.timestamp).collect();
        assert_eq!(stamps, vec![100, 200, 300]);
    }

    #[test]
    fn mixed_case_addresses_share_a_record() {
        let upper = Address::from_str("0xABCDEFABCDEFABCDEFABCDEFABCDEFABCDEFABCD").unwrap();
        let lower = Address::from_str("0xabcdefabcdefabcdefabcdefabcdefabcdefabcd").unwrap();
        let records = aggregate_events(vec![
            (upper, event(EventKind::Deposit, 1, 10)),
            (lower, event(EventKind::Deposit, 1, 20)),
        ])
        .unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].deposit_count, 2);
    }

    #[test]
    fn deposit_only_address_has_no_withdrawals() {
        let records =
            aggregate_events(vec![(Address::repeat_byte(7), event(EventKind::Deposit, 5, 1))])
                .unwrap();
        assert_eq!(records[0].period_withdrawn, U256::zero());
        assert_eq!(records[0].withdraw_count, 0);
    }

    #[test]
    fn withdraw_only_address_has_no_deposits() {
        let records =
            aggregate_events(vec![(Address::repeat_byte(7), event(EventKind::Withdraw, 5, 1))])
                .unwrap();
        assert_eq!(records[0].period_deposited, U256::zero());
        assert_eq!(records[0].deposit_count, 0);
        assert_eq!(records[0].withdraw_count, 1);
    }

    #[test]
    fn equal_timestamps_keep_fold_order() {
        let staker = Address::repeat_byte(3);
        let mut first = event(EventKind::Deposit, 1, 50);
        first.tx_hash = H256::repeat_byte(0xaa);
        let mut second = event(EventKind::Withdraw, 1, 50);
        second.tx_hash = H256::repeat_byte(0xbb);
        let records = aggregate_events(vec![(staker, first), (staker, second)]).unwrap();
        assert_eq!(records[0].events[0].tx_hash, H256::repeat_byte(0xaa));
        assert_eq!(records[0].events[1].tx_hash, H256::repeat_byte(0xbb));
    }

    #[test]
    fn overflow_is_reported() {
        let staker = Address::repeat_byte(9);
        let mut huge = event(EventKind::Deposit, 0, 1);
        huge.amount = U256::MAX;
        let result = aggregate_events(vec![(staker, huge.clone()), (staker, huge)]);
        assert!(matches!(result, Err(AirdropError::Overflow(_))));
    }

    #[test]
    fn snapshot_totals_are_copied_verbatim() {
        let address = Address::repeat_byte(4);
        let records = aggregate_snapshots(vec![SnapshotTotals {
            address,
            period_deposited: U256::from(10),
            period_withdrawn: U256::from(3),
            deposit_count: 4,
            withdraw_count: 1,
            first_activity_at: 1000,
            last_activity_at: 2000,
            lifetime_deposited: U256::from(10),
            lifetime_withdrawn: U256::from(3),
            events: vec![],
        }]);
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].deposit_count, 4);
        assert_eq!(records[0].first_activity_at, 1000);
        assert_eq!(records[0].lifetime_withdrawn, U256::from(3));
        assert!(records[0].events.is_empty());
    }

    #[test]
    fn lifetime_totals_never_fall_below_window_totals() {
        let staker = Address::repeat_byte(5);
        let mut aggregator = StakerAggregator::new();
        aggregator
            .fold_event(staker, event(EventKind::Deposit, 100, 1))
            .unwrap();
        aggregator.apply_lifetime_totals(staker, U256::from(500) * RAY, U256::zero());
        aggregator.apply_lifetime_totals(Address::repeat_byte(6), U256::one(), U256::one());
        let records = aggregator.finish();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].lifetime_deposited, U256::from(500) * RAY);

        let mut aggregator = StakerAggregator::new();
        aggregator
            .fold_event(staker, event(EventKind::Deposit, 100, 1))
            .unwrap();
        aggregator.apply_lifetime_totals(staker, U256::one(), U256::zero());
        assert_eq!(aggregator.finish()[0].lifetime_deposited, U256::from(100) * RAY);
    }

    #[test]
    fn output_order_is_stable() {
        let a = Address::repeat_byte(0x10);
        let b = Address::repeat_byte(0x01);
        let forward = aggregate_events(vec![
            (a, event(EventKind::Deposit, 1, 1)),
            (b, event(EventKind::Deposit, 1, 2)),
        ])
        .unwrap();
        let reverse = aggregate_events(vec![
            (b, event(EventKind::Deposit, 1, 2)),
            (a, event(EventKind::Deposit, 1, 1)),
        ])
        .unwrap();
        let order = |records: &[StakerRecord]| records.iter().map(|r| r.address).collect::<Vec<_>>();
        assert_eq!(order(&forward), order(&reverse));
    }
}
