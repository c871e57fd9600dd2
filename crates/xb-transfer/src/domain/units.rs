//! # Decimal Units
//!
//! Conversion between human-readable decimal amounts (`"0.3"`) and integer
//! amounts in the smallest unit.

use super::errors::TransferError;
use primitive_types::U256;

/// Decimals of native assets and of the token amounts carried by transfers.
pub const NATIVE_DECIMALS: u32 = 18;

/// Parse a decimal string into the smallest unit.
///
/// `parse_units("0.3", 18)` is `300000000000000000`. Signs, exponents and more
/// fractional digits than `decimals` are rejected.
pub fn parse_units(text: &str, decimals: u32) -> Result<U256, TransferError> {
    let text = text.trim();
    if text.is_empty() {
        return Err(TransferError::InvalidAmount("empty amount".to_string()));
    }

    let (int_part, frac_part) = match text.split_once('.') {
        Some((int_part, frac_part)) => (int_part, frac_part),
        None => (text, ""),
    };

    if int_part.is_empty() && frac_part.is_empty() {
        return Err(TransferError::InvalidAmount(format!("{text}: no digits")));
    }
    if !int_part.chars().chain(frac_part.chars()).all(|c| c.is_ascii_digit()) {
        return Err(TransferError::InvalidAmount(format!(
            "{text}: only unsigned decimal digits are accepted"
        )));
    }
    if frac_part.len() > decimals as usize {
        return Err(TransferError::InvalidAmount(format!(
            "{text}: more than {decimals} fractional digits"
        )));
    }

    let mut digits = String::with_capacity(int_part.len() + decimals as usize);
    digits.push_str(int_part);
    digits.push_str(frac_part);
    for _ in frac_part.len()..decimals as usize {
        digits.push('0');
    }

    let digits = digits.trim_start_matches('0');
    if digits.is_empty() {
        return Ok(U256::zero());
    }

    U256::from_dec_str(digits)
        .map_err(|e| TransferError::InvalidAmount(format!("{text}: {e:?}")))
}

/// Format an integer amount as a decimal string.
///
/// Keeps at least one fractional digit: `format_units(10^18, 18)` is `"1.0"`.
pub fn format_units(value: U256, decimals: u32) -> String {
    let raw = value.to_string();
    if decimals == 0 {
        return raw;
    }

    let decimals = decimals as usize;
    let padded = if raw.len() <= decimals {
        format!("{}{}", "0".repeat(decimals + 1 - raw.len()), raw)
    } else {
        raw
    };

    let (int_part, frac_part) = padded.split_at(padded.len() - decimals);
    let frac_part = frac_part.trim_end_matches('0');
    if frac_part.is_empty() {
        format!("{int_part}.0")
    } else {
        format!("{int_part}.{frac_part}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_fallback_fee() {
        let fee = parse_units("0.3", NATIVE_DECIMALS).unwrap();
        assert_eq!(fee, U256::from(300_000_000_000_000_000u64));
    }

    #[test]
    fn test_parse_whole_and_leading_dot() {
        assert_eq!(
            parse_units("2", NATIVE_DECIMALS).unwrap(),
            U256::from(2_000_000_000_000_000_000u128)
        );
        assert_eq!(parse_units(".5", 1).unwrap(), U256::from(5u64));
        assert_eq!(parse_units("0.000", 3).unwrap(), U256::zero());
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert!(parse_units("", 18).is_err());
        assert!(parse_units(".", 18).is_err());
        assert!(parse_units("-1", 18).is_err());
        assert!(parse_units("1e18", 18).is_err());
        assert!(parse_units("0.1234", 3).is_err());
    }

    #[test]
    fn test_parse_overflow() {
        let huge = "9".repeat(90);
        assert!(parse_units(&huge, 0).is_err());
    }

    #[test]
    fn test_format_units() {
        assert_eq!(format_units(U256::from(300_000_000_000_000_000u64), 18), "0.3");
        assert_eq!(format_units(U256::exp10(18), 18), "1.0");
        assert_eq!(format_units(U256::from(1u64), 18), "0.000000000000000001");
        assert_eq!(format_units(U256::from(1234u64), 0), "1234");
    }

    #[test]
    fn test_format_then_parse_preserves_value() {
        let value = U256::from(10_000_000_000_000_000u64);
        let text = format_units(value, NATIVE_DECIMALS);
        assert_eq!(text, "0.01");
        assert_eq!(parse_units(&text, NATIVE_DECIMALS).unwrap(), value);
    }
}
