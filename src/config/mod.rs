use chrono::{DateTime, NaiveDate};
use ethers::types::U256;
use serde::{Deserialize, Serialize};
use url::Url;
use validator::{Validate, ValidationError, ValidationErrors};

use crate::constants::{
    configured, Env, DEFAULT_PAGE_SIZE, DEFAULT_TOKEN_SYMBOL, DEFAULT_WEIGHT_AMOUNT,
    DEFAULT_WEIGHT_DURATION, DEFAULT_WEIGHT_SEIGNIORAGE, MULTICALL_CHUNK_SIZE,
};
use crate::error::{AirdropError, Result};
use crate::fixed_point::wton_to_ray;
use crate::types::{CriteriaWeights, SimulationConfig};

/// Inclusive `[from, to]` range in unix seconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeWindow {
    pub from: u64,
    pub to: u64,
}

impl TimeWindow {
    pub fn parse(from: &str, to: &str) -> Result<Self> {
        let window = Self {
            from: parse_timestamp("from", from)?,
            to: parse_timestamp("to", to)?,
        };
        if window.from > window.to {
            return Err(AirdropError::invalid("from", "window start is after its end"));
        }
        Ok(window)
    }
}

/// Accepts `YYYY-MM-DD` (midnight UTC), RFC3339, or raw unix seconds.
pub fn parse_timestamp(name: &'static str, raw: &str) -> Result<u64> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Err(AirdropError::MissingParameter(name));
    }
    let seconds = if let Ok(seconds) = raw.parse::<i64>() {
        seconds
    } else if let Ok(date) = NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
        date.and_hms_opt(0, 0, 0)
            .ok_or_else(|| AirdropError::invalid(name, raw))?
            .and_utc()
            .timestamp()
    } else if let Ok(datetime) = DateTime::parse_from_rfc3339(raw) {
        datetime.timestamp()
    } else {
        return Err(AirdropError::invalid(name, format!("{:?} is not a date", raw)));
    };
    u64::try_from(seconds).map_err(|_| AirdropError::invalid(name, "date is before 1970"))
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct StakerQuery {
    pub from: String,
    pub to: String,
    #[validate(custom = "validate_non_negative")]
    pub min_amount: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ValidatedStakerQuery {
    pub window: TimeWindow,
    pub min_amount: U256,
}

impl StakerQuery {
    pub fn validate_all(&self) -> Result<ValidatedStakerQuery> {
        self.validate().map_err(field_error)?;
        Ok(ValidatedStakerQuery {
            window: TimeWindow::parse(&self.from, &self.to)?,
            min_amount: wton_to_ray(self.min_amount)?,
        })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct SimulationRequest {
    pub from: String,
    pub to: String,
    #[validate(custom = "validate_non_negative")]
    pub min_amount: f64,
    #[validate(custom = "validate_positive")]
    pub total_tokens: f64,
    #[validate(length(min = 1, max = 32))]
    pub token_symbol: String,
    #[validate(range(max = 100))]
    pub w_a: u8,
    #[validate(range(max = 100))]
    pub w_d: u8,
    #[validate(range(max = 100))]
    pub w_s: u8,
}

impl SimulationRequest {
    pub fn new(from: &str, to: &str, total_tokens: f64) -> Self {
        Self {
            from: from.to_string(),
            to: to.to_string(),
            min_amount: 0.0,
            total_tokens,
            token_symbol: DEFAULT_TOKEN_SYMBOL.to_string(),
            w_a: DEFAULT_WEIGHT_AMOUNT,
            w_d: DEFAULT_WEIGHT_DURATION,
            w_s: DEFAULT_WEIGHT_SEIGNIORAGE,
        }
    }

    pub fn with_weights(mut self, w_a: u8, w_d: u8, w_s: u8) -> Self {
        self.w_a = w_a;
        self.w_d = w_d;
        self.w_s = w_s;
        self
    }

    pub fn validate_all(&self) -> Result<ValidatedSimulation> {
        self.validate().map_err(field_error)?;
        let window = TimeWindow::parse(&self.from, &self.to)?;
        let weights = CriteriaWeights::new(self.w_a, self.w_d, self.w_s)?;

        Ok(ValidatedSimulation {
            window,
            min_amount: wton_to_ray(self.min_amount)?,
            config: SimulationConfig {
                total_tokens: self.total_tokens,
                token_symbol: self.token_symbol.clone(),
                weights,
                snapshot_timestamp: window.to,
            },
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ValidatedSimulation {
    pub window: TimeWindow,
    pub min_amount: U256,
    pub config: SimulationConfig,
}

fn field_error(errors: ValidationErrors) -> AirdropError {
    let field = errors
        .field_errors()
        .keys()
        .next()
        .copied()
        .unwrap_or("request");
    AirdropError::invalid(field, errors.to_string())
}

fn validate_non_negative(value: f64) -> std::result::Result<(), ValidationError> {
    if !value.is_finite() || value < 0.0 {
        return Err(ValidationError::new("must_be_non_negative"));
    }
    Ok(())
}

fn validate_positive(value: f64) -> std::result::Result<(), ValidationError> {
    if !value.is_finite() || value <= 0.0 {
        return Err(ValidationError::new("must_be_positive"));
    }
    Ok(())
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RuntimeConfig {
    pub subgraph_url: Option<String>,
    pub rpc_url: Option<String>,
    pub page_size: usize,
    pub multicall_chunk: usize,
    pub log_level: String,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            subgraph_url: None,
            rpc_url: None,
            page_size: DEFAULT_PAGE_SIZE,
            multicall_chunk: MULTICALL_CHUNK_SIZE,
            log_level: "info".to_string(),
        }
    }
}

impl RuntimeConfig {
    pub fn from_env(env: &Env) -> Result<Self> {
        let config = Self {
            subgraph_url: configured(&env.subgraph_url),
            rpc_url: configured(&env.rpc_url),
            log_level: configured(&env.log_level).unwrap_or_else(|| "info".to_string()),
            ..Self::default()
        };
        config.validate_urls()?;
        Ok(config)
    }

    fn validate_urls(&self) -> Result<()> {
        for (name, value) in [("SUBGRAPH_URL", &self.subgraph_url), ("ETHEREUM_RPC_URL", &self.rpc_url)] {
            if let Some(raw) = value {
                let parsed = Url::parse(raw).map_err(|e| AirdropError::invalid(name, e.to_string()))?;
                if !matches!(parsed.scheme(), "http" | "https") {
                    return Err(AirdropError::invalid(name, "expected an http(s) url"));
                }
            }
        }
        Ok(())
    }
}
