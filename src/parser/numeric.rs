//! Numeric coercion for extracted field values
//!
//! Alert text carries numbers as `21.53%`, `$26.4K`, `1,274` or
//! `$0.0{4}8188`. These helpers turn them into [`Decimal`]s and never fail:
//! unusable input becomes zero or `None`.

use once_cell::sync::Lazy;
use regex::{Captures, Regex};
use rust_decimal::Decimal;
use std::str::FromStr;

static REPEAT_NOTATION: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(\d)\{(\d{1,2})\}").expect("valid repeat regex"));

/// `"21.53%"` -> `0.2153`. Missing or unparseable input is zero.
pub fn percent_to_decimal(value: Option<&str>) -> Decimal {
    let Some(value) = value else {
        return Decimal::ZERO;
    };
    let cleaned = value.replace('%', "");
    parse_scaled(&cleaned)
        .map(|v| v / Decimal::ONE_HUNDRED)
        .unwrap_or(Decimal::ZERO)
}

/// `"$26.4K"` -> `26400`. K/M/B scale by 1e3/1e6/1e9, case-insensitive.
/// Missing or unparseable input is zero.
pub fn currency_to_number(value: Option<&str>) -> Decimal {
    value.and_then(parse_scaled).unwrap_or(Decimal::ZERO)
}

/// Parse a count the way a lenient integer parse would: leading digits only,
/// thousands separators ignored. `"3319"` -> 3319, `"87 holders"` -> 87.
pub fn parse_count(value: &str) -> Option<u64> {
    let digits: String = value
        .trim()
        .chars()
        .filter(|c| *c != ',')
        .take_while(|c| c.is_ascii_digit())
        .collect();
    digits.parse().ok()
}

/// Parse the first token of `value` as a possibly suffixed amount.
/// `"17.76"` -> 17.76, `"1.8325K"` -> 1832.5.
pub fn parse_amount(value: &str) -> Option<Decimal> {
    value.split_whitespace().next().and_then(parse_scaled)
}

/// Parse a price, expanding the `0.0{4}8188` shorthand first.
pub fn parse_price(value: &str) -> Option<Decimal> {
    parse_amount(&expand_repeat_notation(value))
}

/// Expand `d{n}` into `n` copies of digit `d`: `0.0{4}8188` -> `0.00008188`.
pub fn expand_repeat_notation(value: &str) -> String {
    REPEAT_NOTATION
        .replace_all(value, |caps: &Captures| {
            let count: usize = caps[2].parse().unwrap_or(1);
            caps[1].repeat(count)
        })
        .into_owned()
}

/// Strip currency symbols, signs of inequality, separators and whitespace,
/// then apply an optional K/M/B multiplier.
fn parse_scaled(value: &str) -> Option<Decimal> {
    let cleaned: String = value
        .chars()
        .filter(|c| !c.is_whitespace() && !matches!(c, '$' | ',' | '+' | '>' | '<'))
        .collect();
    if cleaned.is_empty() {
        return None;
    }

    let (number, multiplier) = match cleaned.chars().last().map(|c| c.to_ascii_uppercase()) {
        Some('K') => (&cleaned[..cleaned.len() - 1], Decimal::from(1_000)),
        Some('M') => (&cleaned[..cleaned.len() - 1], Decimal::from(1_000_000)),
        Some('B') => (&cleaned[..cleaned.len() - 1], Decimal::from(1_000_000_000)),
        _ => (cleaned.as_str(), Decimal::ONE),
    };

    Decimal::from_str(number).ok().and_then(|n| n.checked_mul(multiplier))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_percent_to_decimal() {
        assert_eq!(percent_to_decimal(Some("21.53%")), dec!(0.2153));
        assert_eq!(percent_to_decimal(Some("-44.97%")), dec!(-0.4497));
        assert_eq!(percent_to_decimal(Some("100%%")), dec!(1));
        assert_eq!(percent_to_decimal(Some("24.1K%")), dec!(241));
        assert_eq!(percent_to_decimal(Some(">99999%")), dec!(999.99));
    }

    #[test]
    fn test_percent_to_decimal_missing() {
        assert_eq!(percent_to_decimal(None), Decimal::ZERO);
        assert_eq!(percent_to_decimal(Some("")), Decimal::ZERO);
        assert_eq!(percent_to_decimal(Some("n/a")), Decimal::ZERO);
    }

    #[test]
    fn test_currency_to_number() {
        assert_eq!(currency_to_number(Some("$26.4K")), dec!(26400));
        assert_eq!(currency_to_number(Some("$1.7M")), dec!(1700000));
        assert_eq!(currency_to_number(Some("$2.5b")), dec!(2500000000));
        assert_eq!(currency_to_number(Some(" $ 315.8k ")), dec!(315800));
        assert_eq!(currency_to_number(Some("$81880.79")), dec!(81880.79));
        assert_eq!(currency_to_number(None), Decimal::ZERO);
    }

    #[test]
    fn test_overflowing_amount_is_zero() {
        assert_eq!(currency_to_number(Some("$79228162514264337593543950335B")), Decimal::ZERO);
        assert_eq!(percent_to_decimal(Some("79228162514264337593543950335K%")), Decimal::ZERO);
        assert_eq!(parse_amount("79228162514264337593543950335M"), None);
    }

    #[test]
    fn test_parse_count() {
        assert_eq!(parse_count("3319"), Some(3319));
        assert_eq!(parse_count("1,274"), Some(1274));
        assert_eq!(parse_count("87 holders"), Some(87));
        assert_eq!(parse_count("-"), None);
    }

    #[test]
    fn test_parse_amount() {
        assert_eq!(parse_amount("17.76"), Some(dec!(17.76)));
        assert_eq!(parse_amount("1.8325K"), Some(dec!(1832.5)));
        assert_eq!(parse_amount("abc"), None);
    }

    #[test]
    fn test_expand_repeat_notation() {
        assert_eq!(expand_repeat_notation("$0.0{4}8188"), "$0.00008188");
        assert_eq!(expand_repeat_notation("0.0{5}60485 Sol"), "0.0000060485 Sol");
        assert_eq!(expand_repeat_notation("0.00223"), "0.00223");
        assert_eq!(parse_price("$0.0{4}8188    Chart"), Some(dec!(0.00008188)));
    }
}
