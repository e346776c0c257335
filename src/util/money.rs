//! Human-readable amount parsing and base-unit conversion.
//!
//! Service prices are stored as integer base units (spec.md §3), but operators
//! configure them and the discovery surface displays them in decimal form.
//! This module is the single place that scales between the two, so every
//! caller applies the same precision rules.

use alloy_primitives::U256;
use once_cell::sync::Lazy;
use regex::Regex;
use rust_decimal::Decimal;
use std::fmt;
use std::str::FromStr;

/// A price-like decimal value in human-readable form (e.g. `"0.05"`, `"$1.00"`).
#[derive(Debug, Clone, PartialEq)]
pub struct MoneyAmount(pub Decimal);

static MIN: Lazy<Decimal> = Lazy::new(|| Decimal::from_str("0.000000001").expect("valid decimal"));
static MAX: Lazy<Decimal> = Lazy::new(|| Decimal::from_str("999999999").expect("valid decimal"));
static STRIP_NON_NUMERIC: Lazy<Regex> = Lazy::new(|| Regex::new(r"[^\d.\-]+").unwrap());

#[derive(Debug, thiserror::Error)]
pub enum MoneyAmountParseError {
    #[error("invalid number format")]
    InvalidFormat,
    #[error("amount must be between {} and {}", *MIN, *MAX)]
    OutOfRange,
    #[error("negative amounts are not allowed")]
    Negative,
    #[error("amount has {money} decimal digits, token only supports {token}")]
    WrongPrecision { money: u32, token: u32 },
}

impl MoneyAmount {
    pub fn parse(input: &str) -> Result<Self, MoneyAmountParseError> {
        let cleaned = STRIP_NON_NUMERIC.replace_all(input, "").to_string();
        let parsed = Decimal::from_str(&cleaned).map_err(|_| MoneyAmountParseError::InvalidFormat)?;
        if parsed.is_sign_negative() {
            return Err(MoneyAmountParseError::Negative);
        }
        if parsed < *MIN || parsed > *MAX {
            return Err(MoneyAmountParseError::OutOfRange);
        }
        Ok(MoneyAmount(parsed))
    }

    /// Scale this amount into a token's base units, given the token's decimals.
    pub fn to_base_units(&self, token_decimals: u8) -> Result<U256, MoneyAmountParseError> {
        let scale = self.0.scale();
        let token_scale = token_decimals as u32;
        if scale > token_scale {
            return Err(MoneyAmountParseError::WrongPrecision {
                money: scale,
                token: token_scale,
            });
        }
        let scale_diff = token_scale - scale;
        let multiplier = U256::from(10).pow(U256::from(scale_diff));
        let digits = self.0.mantissa().unsigned_abs();
        Ok(U256::from(digits) * multiplier)
    }
}

impl FromStr for MoneyAmount {
    type Err = MoneyAmountParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        MoneyAmount::parse(s)
    }
}

impl fmt::Display for MoneyAmount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.normalize())
    }
}

/// Format base units back into a human-readable decimal string, e.g. for
/// display on the discovery surface.
pub fn base_units_to_decimal_string(amount: U256, token_decimals: u8) -> String {
    let divisor = U256::from(10).pow(U256::from(token_decimals as u32));
    let whole = amount / divisor;
    let frac = amount % divisor;
    if frac.is_zero() {
        return whole.to_string();
    }
    let frac_str = format!("{:0width$}", frac, width = token_decimals as usize);
    format!("{whole}.{}", frac_str.trim_end_matches('0'))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_plain_decimal_to_base_units() {
        let amount = MoneyAmount::parse("10.50").unwrap();
        assert_eq!(amount.to_base_units(6).unwrap(), U256::from(10_500_000u64));
    }

    #[test]
    fn strips_currency_symbols_and_commas() {
        let amount = MoneyAmount::parse("$1,000.25").unwrap();
        assert_eq!(amount.to_base_units(6).unwrap(), U256::from(1_000_250_000u64));
    }

    #[test]
    fn rejects_excess_precision() {
        let amount = MoneyAmount::parse("1.234").unwrap();
        let err = amount.to_base_units(2).unwrap_err();
        assert!(matches!(err, MoneyAmountParseError::WrongPrecision { .. }));
    }

    #[test]
    fn rejects_negative_amounts() {
        assert!(matches!(
            MoneyAmount::parse("-5"),
            Err(MoneyAmountParseError::Negative)
        ));
    }

    #[test]
    fn base_units_round_trip_to_decimal_string() {
        let s = base_units_to_decimal_string(U256::from(1_500_000u64), 6);
        assert_eq!(s, "1.5");
        let whole = base_units_to_decimal_string(U256::from(2_000_000u64), 6);
        assert_eq!(whole, "2");
    }
}
