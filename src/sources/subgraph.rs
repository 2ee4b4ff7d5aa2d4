use anyhow::Result;
use async_trait::async_trait;
use ethers::types::{Address, H256};
use indicatif::ProgressBar;
use indoc::indoc;
use log::{debug, info};
use serde::{de::DeserializeOwned, Deserialize};
use serde_json::{json, Value};
use std::str::FromStr;

use super::StakerSource;
use crate::aggregator::StakerAggregator;
use crate::config::TimeWindow;
use crate::constants::DEFAULT_PAGE_SIZE;
use crate::error::AirdropError;
use crate::fixed_point::parse_ray;
use crate::types::{EventKind, SnapshotTotals, StakerRecord, StakingEvent};

const DEPOSITORS_QUERY: &str = indoc! {r#"
    query GetDepositors($first: Int!, $skip: Int!) {
      stakers(
        where: { depositCount_gt: 0 }
        orderBy: id
        orderDirection: asc
        first: $first
        skip: $skip
      ) {
        id
        totalDeposited
        totalWithdrawn
        depositCount
        withdrawalCount
        firstStakedAt
        lastStakedAt
      }
    }
"#};

const WINDOW_EVENTS_QUERY: &str = indoc! {r#"
    query GetStakingEvents($from: BigInt!, $to: BigInt!, $first: Int!, $skip: Int!) {
      stakingEvents(
        where: { type_in: ["stake", "unstake"], timestamp_gte: $from, timestamp_lte: $to }
        orderBy: timestamp
        orderDirection: asc
        first: $first
        skip: $skip
      ) {
        id
        type
        amount
        layer2
        timestamp
        txHash
        staker {
          id
          totalDeposited
          totalWithdrawn
          depositCount
          withdrawalCount
          firstStakedAt
          lastStakedAt
        }
      }
    }
"#};

#[derive(Debug, Deserialize)]
struct GraphResponse<T> {
    data: Option<T>,
    errors: Option<Vec<GraphError>>,
}

#[derive(Debug, Deserialize)]
struct GraphError {
    message: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GraphStaker {
    pub id: String,
    pub total_deposited: String,
    pub total_withdrawn: String,
    pub deposit_count: u32,
    pub withdrawal_count: u32,
    pub first_staked_at: String,
    pub last_staked_at: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GraphStakingEvent {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub amount: String,
    pub layer2: String,
    pub timestamp: String,
    pub tx_hash: String,
    pub staker: GraphStaker,
}

#[derive(Debug, Deserialize)]
struct DepositorsPage {
    stakers: Vec<GraphStaker>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct EventsPage {
    staking_events: Vec<GraphStakingEvent>,
}

fn parse_address(raw: &str) -> Result<Address, AirdropError> {
    Address::from_str(raw.trim()).map_err(|_| AirdropError::MalformedAddress(raw.to_string()))
}

fn parse_seconds(raw: &str) -> Result<u64, AirdropError> {
    raw.trim()
        .parse()
        .map_err(|_| AirdropError::Subgraph(format!("bad timestamp {:?}", raw)))
}

impl GraphStaker {
    /// Ledger totals double as window totals when no window is applied.
    pub fn to_snapshot(&self) -> Result<SnapshotTotals, AirdropError> {
        let deposited = parse_ray(&self.total_deposited)?;
        let withdrawn = parse_ray(&self.total_withdrawn)?;
        Ok(SnapshotTotals {
            address: parse_address(&self.id)?,
            period_deposited: deposited,
            period_withdrawn: withdrawn,
            deposit_count: self.deposit_count,
            withdraw_count: self.withdrawal_count,
            first_activity_at: parse_seconds(&self.first_staked_at)?,
            last_activity_at: parse_seconds(&self.last_staked_at)?,
            lifetime_deposited: deposited,
            lifetime_withdrawn: withdrawn,
            events: Vec::new(),
        })
    }
}

impl GraphStakingEvent {
    pub fn to_event(&self) -> Result<(Address, StakingEvent), AirdropError> {
        let kind = match self.kind.as_str() {
            "stake" => EventKind::Deposit,
            "unstake" => EventKind::Withdraw,
            other => return Err(AirdropError::Subgraph(format!("unexpected event type {:?}", other))),
        };
        let tx_hash = H256::from_str(self.tx_hash.trim())
            .map_err(|_| AirdropError::Subgraph(format!("bad tx hash {:?}", self.tx_hash)))?;
        Ok((
            parse_address(&self.staker.id)?,
            StakingEvent {
                tx_hash,
                kind,
                amount: parse_ray(&self.amount)?,
                counterparty_address: parse_address(&self.layer2)?,
                timestamp: parse_seconds(&self.timestamp)?,
            },
        ))
    }
}

/// Event-stream aggregation of window events, then lifetime totals from each
/// event's embedded staker entity.
pub fn aggregate_window_events(events: &[GraphStakingEvent]) -> Result<Vec<StakerRecord>> {
    let mut aggregator = StakerAggregator::new();
    for event in events {
        let (address, staking_event) = event.to_event()?;
        aggregator.fold_event(address, staking_event)?;
    }
    for event in events {
        let address = parse_address(&event.staker.id)?;
        aggregator.apply_lifetime_totals(
            address,
            parse_ray(&event.staker.total_deposited)?,
            parse_ray(&event.staker.total_withdrawn)?,
        );
    }
    Ok(aggregator.finish())
}

pub fn depositors_to_records(stakers: &[GraphStaker]) -> Result<Vec<StakerRecord>> {
    let mut aggregator = StakerAggregator::new();
    for staker in stakers {
        aggregator.fold_snapshot(staker.to_snapshot()?);
    }
    Ok(aggregator.finish())
}

pub struct SubgraphClient {
    http: reqwest::Client,
    url: String,
    page_size: usize,
    show_progress: bool,
}

impl SubgraphClient {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            url: url.into(),
            page_size: DEFAULT_PAGE_SIZE,
            show_progress: false,
        }
    }

    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size.max(1);
        self
    }

    pub fn with_progress(mut self, show_progress: bool) -> Self {
        self.show_progress = show_progress;
        self
    }

    async fn request<T: DeserializeOwned>(&self, query: &str, variables: Value) -> Result<T> {
        let response: GraphResponse<T> = self
            .http
            .post(&self.url)
            .json(&json!({ "query": query, "variables": variables }))
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(|e| AirdropError::Subgraph(e.to_string()))?
            .json()
            .await
            .map_err(|e| AirdropError::Subgraph(e.to_string()))?;

        if let Some(errors) = response.errors.filter(|e| !e.is_empty()) {
            let messages: Vec<String> = errors.into_iter().map(|e| e.message).collect();
            return Err(AirdropError::Subgraph(messages.join("; ")).into());
        }
        response
            .data
            .ok_or_else(|| AirdropError::Subgraph("response carried no data".to_string()).into())
    }

    /// Sequential `first`/`skip` pagination; a short page marks the end.
    async fn paginate<P, T, F>(&self, query: &str, base: Value, label: &str, take: F) -> Result<Vec<T>>
    where
        P: DeserializeOwned,
        F: Fn(P) -> Vec<T>,
    {
        let progress = if self.show_progress {
            ProgressBar::new_spinner()
        } else {
            ProgressBar::hidden()
        };
        let mut items = Vec::new();
        let mut skip = 0usize;
        loop {
            let mut variables = base.clone();
            variables["first"] = json!(self.page_size);
            variables["skip"] = json!(skip);

            let page = take(self.request::<P>(query, variables).await?);
            let count = page.len();
            items.extend(page);
            debug!("{} page at skip={} returned {} rows", label, skip, count);
            progress.set_message(format!("{}: {} fetched", label, items.len()));
            progress.tick();

            if count < self.page_size {
                break;
            }
            skip += self.page_size;
        }
        progress.finish_and_clear();
        info!("Fetched {} {} from subgraph", items.len(), label);
        Ok(items)
    }
}

#[async_trait]
impl StakerSource for SubgraphClient {
    async fn fetch_all_depositors(&self) -> Result<Vec<StakerRecord>> {
        let stakers = self
            .paginate(DEPOSITORS_QUERY, json!({}), "depositors", |p: DepositorsPage| p.stakers)
            .await?;
        depositors_to_records(&stakers)
    }

    async fn fetch_window(&self, window: TimeWindow) -> Result<Vec<StakerRecord>> {
        let variables = json!({
            "from": window.from.to_string(),
            "to": window.to.to_string(),
        });
        let events = self
            .paginate(WINDOW_EVENTS_QUERY, variables, "staking events", |p: EventsPage| {
                p.staking_events
            })
            .await?;
        aggregate_window_events(&events)
    }
}
