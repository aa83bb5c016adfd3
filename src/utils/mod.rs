//! Utility functions for formatting and parsing
//!
//! This module provides centralized formatting of money, units and
//! percentages, and the lenient date/number parsing shared by the CLI and the
//! CSV importers.

use anyhow::{anyhow, Context, Result};
use chrono::{Datelike, NaiveDate, NaiveDateTime};
use rust_decimal::Decimal;
use std::str::FromStr;

/// Currency prefix options for formatting
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CurrencySymbol<'a> {
    /// "$1,234.56"
    Dollar,
    /// ISO code prefix: "EUR 1,234.56"
    Code(&'a str),
    /// No prefix (for table cells, calculations display)
    None,
}

impl<'a> CurrencySymbol<'a> {
    /// `$` for USD, the ISO code otherwise
    pub fn for_currency(code: &'a str) -> Self {
        if code.eq_ignore_ascii_case("USD") {
            CurrencySymbol::Dollar
        } else {
            CurrencySymbol::Code(code)
        }
    }
}

/// Core formatting function with full control over output.
///
/// Rounds half away from zero to `dp` decimal places and groups the integer
/// part with `,`.
///
/// # Examples
/// ```
/// use fundnav::utils::{format_number_with_width, CurrencySymbol};
/// use rust_decimal_macros::dec;
///
/// assert_eq!(
///     format_number_with_width(dec!(1234.567), 2, 0, CurrencySymbol::Dollar),
///     "$1,234.57"
/// );
/// assert_eq!(
///     format_number_with_width(dec!(-50), 2, 12, CurrencySymbol::None),
///     "      -50.00"
/// );
/// ```
pub fn format_number_with_width(
    value: Decimal,
    dp: u32,
    width: usize,
    symbol: CurrencySymbol,
) -> String {
    let rounded = value.round_dp_with_strategy(
        dp,
        rust_decimal::RoundingStrategy::MidpointAwayFromZero,
    );
    let is_negative = rounded < Decimal::ZERO;
    let formatted = format!("{:.*}", dp as usize, rounded.abs());
    let (integer_part, fraction_part) = match formatted.split_once('.') {
        Some((i, f)) => (i.to_string(), Some(f.to_string())),
        None => (formatted.clone(), None),
    };

    let with_separators: String = integer_part
        .chars()
        .rev()
        .enumerate()
        .flat_map(|(i, c)| {
            if i > 0 && i % 3 == 0 {
                vec![',', c]
            } else {
                vec![c]
            }
        })
        .collect::<Vec<_>>()
        .into_iter()
        .rev()
        .collect();

    let sign = if is_negative { "-" } else { "" };
    let body = match fraction_part {
        Some(f) => format!("{}.{}", with_separators, f),
        None => with_separators,
    };
    let result = match symbol {
        CurrencySymbol::Dollar => format!("{}${}", sign, body),
        CurrencySymbol::Code(code) => format!("{} {}{}", code, sign, body),
        CurrencySymbol::None => format!("{}{}", sign, body),
    };

    if width > 0 && result.len() < width {
        format!("{:>width$}", result, width = width)
    } else {
        result
    }
}

// ============ Convenience functions ============

/// Format money in a fund's currency: "$1,234.56" or "EUR 1,234.56"
///
/// # Examples
/// ```
/// use fundnav::utils::format_money;
/// use rust_decimal_macros::dec;
///
/// assert_eq!(format_money(dec!(1234.5), "USD"), "$1,234.50");
/// assert_eq!(format_money(dec!(-500), "EUR"), "EUR -500.00");
/// ```
pub fn format_money(value: Decimal, currency: &str) -> String {
    format_number_with_width(value, 2, 0, CurrencySymbol::for_currency(currency))
}

/// Format a unit balance with 4 decimal places: "1,053.5903"
pub fn format_units(value: Decimal) -> String {
    format_number_with_width(value, 4, 0, CurrencySymbol::None)
}

/// Format a NAV per unit with 6 decimal places
pub fn format_nav(value: Decimal) -> String {
    format_number_with_width(value, 6, 0, CurrencySymbol::None)
}

/// Format a fraction in `[0, 1]` as a percentage: 0.6 -> "60.00%"
pub fn format_pct(fraction: Decimal) -> String {
    format!(
        "{}%",
        format_number_with_width(fraction * Decimal::from(100), 2, 0, CurrencySymbol::None)
    )
}

// ============ Parsing ============

/// Parse a decimal amount, tolerating currency symbols, thousands separators
/// and accounting-style parentheses for negatives
///
/// # Examples
/// ```
/// use fundnav::utils::parse_decimal;
/// use rust_decimal_macros::dec;
///
/// assert_eq!(parse_decimal("$1,234.50").unwrap(), dec!(1234.50));
/// assert_eq!(parse_decimal("(250)").unwrap(), dec!(-250));
/// ```
pub fn parse_decimal(s: &str) -> Result<Decimal> {
    let trimmed = s.trim();
    let (negative, inner) = match trimmed
        .strip_prefix('(')
        .and_then(|rest| rest.strip_suffix(')'))
    {
        Some(inner) => (true, inner),
        None => (false, trimmed),
    };
    let cleaned: String = inner
        .chars()
        .filter(|c| !matches!(c, '$' | ',' | ' ' | '_'))
        .collect();
    if cleaned.is_empty() {
        return Err(anyhow!("Empty amount"));
    }
    let value = Decimal::from_str(&cleaned)
        .or_else(|_| Decimal::from_scientific(&cleaned))
        .with_context(|| format!("Invalid decimal '{}'", s))?;
    Ok(if negative { -value } else { value })
}

/// Parse an exact date: YYYY-MM-DD
pub fn parse_date(s: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d")
        .with_context(|| format!("Invalid date '{}', expected YYYY-MM-DD", s))
}

/// Parse flexible date formats: YYYY-MM-DD, YYYY-MM (month end) or YYYY (Dec 31)
pub fn parse_flexible_date(s: &str) -> Result<NaiveDate> {
    let s = s.trim();

    // YYYY-MM-DD (exact date)
    if let Ok(d) = NaiveDate::parse_from_str(s, "%Y-%m-%d") {
        return Ok(d);
    }

    // YYYY-MM (last day of month)
    if let Ok(ym) = NaiveDate::parse_from_str(&format!("{}-01", s), "%Y-%m-%d") {
        let next_month = if ym.month() == 12 {
            NaiveDate::from_ymd_opt(ym.year() + 1, 1, 1)
        } else {
            NaiveDate::from_ymd_opt(ym.year(), ym.month() + 1, 1)
        };
        if let Some(last_day) = next_month.and_then(|nm| nm.pred_opt()) {
            return Ok(last_day);
        }
    }

    // YYYY (December 31)
    if let Ok(year) = s.parse::<i32>() {
        if (1900..=2100).contains(&year) {
            if let Some(d) = NaiveDate::from_ymd_opt(year, 12, 31) {
                return Ok(d);
            }
        }
    }

    Err(anyhow!(
        "Invalid date '{}'. Use YYYY-MM-DD, YYYY-MM or YYYY",
        s
    ))
}

const TIMESTAMP_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
    "%Y-%m-%dT%H:%M",
];

/// Parse an event timestamp. A bare date means midnight. A trailing `Z` or
/// UTC offset is converted to UTC, so mixed offsets still order correctly;
/// timestamps without an offset are taken as written.
pub fn parse_timestamp(s: &str) -> Result<NaiveDateTime> {
    let s = s.trim();

    if let Ok(dt) = chrono::DateTime::parse_from_rfc3339(s) {
        return Ok(dt.naive_utc());
    }
    for fmt in TIMESTAMP_FORMATS {
        if let Ok(ts) = NaiveDateTime::parse_from_str(s, fmt) {
            return Ok(ts);
        }
    }
    if let Ok(d) = NaiveDate::parse_from_str(s, "%Y-%m-%d") {
        return Ok(d.and_time(chrono::NaiveTime::MIN));
    }

    Err(anyhow!(
        "Invalid timestamp '{}'. Use YYYY-MM-DD[ HH:MM[:SS]]",
        s
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_format_money_basic() {
        assert_eq!(format_money(dec!(1234.56), "USD"), "$1,234.56");
        assert_eq!(format_money(dec!(0.99), "usd"), "$0.99");
        assert_eq!(format_money(dec!(1000000), "USD"), "$1,000,000.00");
        assert_eq!(format_money(dec!(12000), "EUR"), "EUR 12,000.00");
    }

    #[test]
    fn test_format_money_negative() {
        assert_eq!(format_money(dec!(-1234.56), "USD"), "-$1,234.56");
        assert_eq!(format_money(dec!(-0.004), "USD"), "$0.00");
    }

    #[test]
    fn test_format_rounds_half_away_from_zero() {
        assert_eq!(format_money(dec!(2.005), "USD"), "$2.01");
        assert_eq!(format_money(dec!(-2.005), "USD"), "-$2.01");
    }

    #[test]
    fn test_format_units_and_pct() {
        assert_eq!(format_units(dec!(53.59033852) + dec!(1000)), "1,053.5903");
        assert_eq!(format_pct(dec!(0.6)), "60.00%");
        assert_eq!(format_pct(Decimal::ONE), "100.00%");
        assert_eq!(format_nav(dec!(9.33004)), "9.330040");
    }

    #[test]
    fn test_format_with_width() {
        let result = format_number_with_width(dec!(100), 2, 10, CurrencySymbol::Dollar);
        assert_eq!(result, "   $100.00");
        let no_pad = format_number_with_width(dec!(1000000), 2, 5, CurrencySymbol::Dollar);
        assert_eq!(no_pad, "$1,000,000.00");
    }

    #[test]
    fn test_parse_decimal_variants() {
        assert_eq!(parse_decimal("1000").unwrap(), dec!(1000));
        assert_eq!(parse_decimal(" -500.25 ").unwrap(), dec!(-500.25));
        assert_eq!(parse_decimal("$9,330.04").unwrap(), dec!(9330.04));
        assert_eq!(parse_decimal("(1,000)").unwrap(), dec!(-1000));
        assert!(parse_decimal("abc").is_err());
        assert!(parse_decimal("").is_err());
    }

    #[test]
    fn test_parse_flexible_date() {
        assert_eq!(
            parse_flexible_date("2025-09-08").unwrap(),
            NaiveDate::from_ymd_opt(2025, 9, 8).unwrap()
        );
        assert_eq!(
            parse_flexible_date("2024-02").unwrap(),
            NaiveDate::from_ymd_opt(2024, 2, 29).unwrap()
        );
        assert_eq!(
            parse_flexible_date("2025-12").unwrap(),
            NaiveDate::from_ymd_opt(2025, 12, 31).unwrap()
        );
        assert_eq!(
            parse_flexible_date("2025").unwrap(),
            NaiveDate::from_ymd_opt(2025, 12, 31).unwrap()
        );
        assert!(parse_flexible_date("yesterday").is_err());
    }

    #[test]
    fn test_parse_timestamp_formats() {
        let expected = NaiveDate::from_ymd_opt(2025, 9, 8)
            .unwrap()
            .and_hms_opt(14, 30, 0)
            .unwrap();
        assert_eq!(parse_timestamp("2025-09-08 14:30:00").unwrap(), expected);
        assert_eq!(parse_timestamp("2025-09-08T14:30:00").unwrap(), expected);
        assert_eq!(parse_timestamp("2025-09-08 14:30").unwrap(), expected);
        assert_eq!(parse_timestamp("2025-09-08T14:30:00Z").unwrap(), expected);
        assert_eq!(
            parse_timestamp("2025-09-08").unwrap(),
            NaiveDate::from_ymd_opt(2025, 9, 8)
                .unwrap()
                .and_hms_opt(0, 0, 0)
                .unwrap()
        );
        assert!(parse_timestamp("09/08/2025").is_err());
    }

    #[test]
    fn test_parse_timestamp_offsets_become_utc() {
        let evening_in_ny = parse_timestamp("2025-09-08T23:30:00-05:00").unwrap();
        let early_utc = parse_timestamp("2025-09-09T04:00:00Z").unwrap();
        assert_eq!(
            evening_in_ny,
            NaiveDate::from_ymd_opt(2025, 9, 9)
                .unwrap()
                .and_hms_opt(4, 30, 0)
                .unwrap()
        );
        assert!(early_utc < evening_in_ny);
    }
}
