//! Conversions between RAY-scaled integers and the floats used by the scoring math.
//!
//! Balances stay in `U256` for every sum and difference. The only way out to a
//! float is [`ray_to_f64`], which splits the value into whole tokens and a
//! sub-token remainder so that large balances do not lose their fraction.

use ethers::types::U256;

use crate::constants::{RAY, RAY_DECIMALS};
use crate::error::{AirdropError, Result};

const TWO_POW_64: f64 = 18_446_744_073_709_551_616.0;
const RAY_F64: f64 = 1e27;

/// Lossy (rounding only) conversion of a full 256-bit integer.
pub fn u256_to_f64(value: U256) -> f64 {
    value
        .0
        .iter()
        .rev()
        .fold(0.0, |acc, limb| acc * TWO_POW_64 + *limb as f64)
}

/// Converts a nonnegative RAY-scaled amount into whole tokens as `f64`.
pub fn ray_to_f64(value: U256) -> f64 {
    let (quotient, remainder) = value.div_mod(RAY);
    // remainder < 10^27 < 2^90, so it always fits u128
    u256_to_f64(quotient) + remainder.as_u128() as f64 / RAY_F64
}

/// Parses a decimal or `0x`-prefixed hex fixed-point string.
pub fn parse_ray(raw: &str) -> Result<U256> {
    let trimmed = raw.trim();
    let parsed = match trimmed.strip_prefix("0x").or_else(|| trimmed.strip_prefix("0X")) {
        Some(hex) if !hex.is_empty() => U256::from_str_radix(hex, 16).ok(),
        Some(_) => None,
        None if !trimmed.is_empty() && trimmed.bytes().all(|b| b.is_ascii_digit()) => {
            U256::from_dec_str(trimmed).ok()
        }
        None => None,
    };
    parsed.ok_or_else(|| AirdropError::MalformedAmount(raw.to_string()))
}

/// Whole-token amount (fraction floored) scaled up to RAY.
pub fn wton_to_ray(amount: f64) -> Result<U256> {
    if !amount.is_finite() || amount < 0.0 {
        return Err(AirdropError::invalid(
            "minAmount",
            format!("{} is not a nonnegative number", amount),
        ));
    }
    let whole = amount.floor();
    if whole >= u128::MAX as f64 {
        return Err(AirdropError::Overflow("scaling token amount to RAY"));
    }
    U256::from(whole as u128)
        .checked_mul(RAY)
        .ok_or(AirdropError::Overflow("scaling token amount to RAY"))
}

/// Exact decimal rendering in whole tokens, trailing fractional zeros trimmed.
pub fn ray_to_display(value: U256) -> String {
    let (quotient, remainder) = value.div_mod(RAY);
    if remainder.is_zero() {
        return quotient.to_string();
    }
    let frac = format!("{:0>width$}", remainder.to_string(), width = RAY_DECIMALS);
    format!("{}.{}", quotient, frac.trim_end_matches('0'))
}

/// Serde adapter: `U256` as an exact decimal string.
pub mod ray_string {
    use super::parse_ray;
    use ethers::types::U256;
    use serde::{de, Deserialize, Deserializer, Serializer};

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Repr {
        Text(String),
        Number(u64),
    }

    pub fn serialize<S: Serializer>(value: &U256, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&value.to_string())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<U256, D::Error> {
        match Repr::deserialize(deserializer)? {
            Repr::Text(text) => parse_ray(&text).map_err(de::Error::custom),
            Repr::Number(n) => Ok(U256::from(n)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn wton(n: u64) -> U256 {
        U256::from(n) * RAY
    }

    #[test]
    fn zero_converts_to_zero() {
        assert_eq!(ray_to_f64(U256::zero()), 0.0);
    }

    #[test]
    fn whole_and_fractional_parts_are_kept() {
        assert_eq!(ray_to_f64(wton(1000)), 1000.0);
        let half = RAY / 2;
        assert_eq!(ray_to_f64(wton(3) + half), 3.5);
    }

    #[test]
    fn large_balances_keep_their_fraction() {
        // 10^10 tokens plus a quarter: the raw integer is ~2^113
        let value = wton(10_000_000_000) + RAY / 4;
        let converted = ray_to_f64(value);
        assert!((converted - 10_000_000_000.25).abs() < 1e-5);
    }

    #[test]
    fn quotient_wider_than_u128_converts() {
        let value = U256::MAX;
        let expected = u256_to_f64(U256::MAX) / 1e27;
        let converted = ray_to_f64(value);
        assert!((converted / expected - 1.0).abs() < 1e-12);
    }

    #[test]
    fn parse_accepts_decimal_and_hex() {
        assert_eq!(parse_ray("1000000000000000000000000000").unwrap(), RAY);
        assert_eq!(parse_ray("0x33b2e3c9fd0803ce8000000").unwrap(), RAY);
        assert_eq!(parse_ray(" 42 ").unwrap(), U256::from(42));
    }

    #[test]
    fn parse_rejects_malformed_strings() {
        for raw in ["", "-5", "1.5", "0x", "12ab", "1e27"] {
            assert!(
                matches!(parse_ray(raw), Err(AirdropError::MalformedAmount(_))),
                "{raw:?} should be rejected"
            );
        }
    }

    #[test]
    fn wton_scaling_floors_fractions() {
        assert_eq!(wton_to_ray(0.0).unwrap(), U256::zero());
        assert_eq!(wton_to_ray(12.9).unwrap(), wton(12));
        assert!(wton_to_ray(-1.0).is_err());
        assert!(wton_to_ray(f64::NAN).is_err());
    }

    #[test]
    fn display_trims_trailing_zeros() {
        assert_eq!(ray_to_display(wton(1500)), "1500");
        assert_eq!(ray_to_display(wton(2) + RAY / 4), "2.25");
        assert_eq!(ray_to_display(U256::one()), "0.000000000000000000000000001");
    }

    #[test]
    fn serde_round_trips_as_decimal_string() {
        #[derive(serde::Serialize, serde::Deserialize)]
        struct Holder {
            #[serde(with = "ray_string")]
            amount: U256,
        }

        let json = serde_json::to_string(&Holder { amount: wton(7) }).unwrap();
        assert_eq!(json, r#"{"amount":"7000000000000000000000000000"}"#);

        let parsed: Holder = serde_json::from_str(r#"{"amount":"0x2a"}"#).unwrap();
        assert_eq!(parsed.amount, U256::from(42));
        let parsed: Holder = serde_json::from_str(r#"{"amount":17}"#).unwrap();
        assert_eq!(parsed.amount, U256::from(17));
    }
}
