use ethers::types::{Address, H160, U256};

pub static PROJECT_NAME: &str = "staker_airdrop";

/// 10^27, the fixed-point scale used for WTON amounts.
pub const RAY: U256 = U256([11_515_845_246_265_065_472, 54_210_108, 0, 0]);
pub const RAY_DECIMALS: usize = 27;

pub const SECONDS_PER_DAY: f64 = 86_400.0;

/// Denominator floor for max-normalization when every staker scores zero on a metric.
pub const NORMALIZATION_FLOOR: f64 = 1e-18;

pub const DEFAULT_PAGE_SIZE: usize = 1000;
pub const MULTICALL_CHUNK_SIZE: usize = 500;

// Tokamak SeigManager proxy on Ethereum mainnet
pub const SEIG_MANAGER_PROXY: Address = H160([
    0x0b, 0x55, 0xa0, 0xf4, 0x63, 0xb6, 0xde, 0xfb, 0x81, 0xc6, 0x06, 0x39, 0x73, 0x76, 0x39, 0x51,
    0x71, 0x2d, 0x0e, 0x5f,
]);

pub const DEFAULT_TOKEN_SYMBOL: &str = "TOKEN";
pub const DEFAULT_WEIGHT_AMOUNT: u8 = 33;
pub const DEFAULT_WEIGHT_DURATION: u8 = 33;
pub const DEFAULT_WEIGHT_SEIGNIORAGE: u8 = 34;

const PLACEHOLDER_MARKERS: &[&str] = &["YOUR_ID", "YOUR_KEY"];

pub fn get_env(key: &str) -> String {
    std::env::var(key).unwrap_or(String::from(""))
}

/// Returns the value only if it is set and is not a template placeholder.
pub fn configured(value: &str) -> Option<String> {
    let value = value.trim();
    if value.is_empty() || PLACEHOLDER_MARKERS.iter().any(|m| value.contains(m)) {
        return None;
    }
    Some(value.to_string())
}

#[derive(Debug, Clone)]
pub struct Env {
    pub subgraph_url: String,
    pub rpc_url: String,
    pub log_level: String,
}

impl Env {
    pub fn new() -> Self {
        Env {
            subgraph_url: get_env("SUBGRAPH_URL"),
            rpc_url: get_env("ETHEREUM_RPC_URL"),
            log_level: get_env("LOG_LEVEL"),
        }
    }
}

impl Default for Env {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn ray_is_ten_to_the_twenty_seventh() {
        assert_eq!(RAY, U256::exp10(27));
    }

    #[test]
    fn seig_manager_address_matches_checksum() {
        let expected = Address::from_str("0x0b55a0f463b6defb81c6063973763951712d0e5f").unwrap();
        assert_eq!(SEIG_MANAGER_PROXY, expected);
    }

    #[test]
    fn placeholders_are_not_configured() {
        assert_eq!(configured(""), None);
        assert_eq!(
            configured("https://api.studio.thegraph.com/query/YOUR_ID/x/latest"),
            None
        );
        assert_eq!(
            configured(" https://rpc.example.org "),
            Some("https://rpc.example.org".to_string())
        );
    }
}
