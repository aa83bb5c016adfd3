//! Daily valuation series for a fund
//!
//! A [`ValuationSeries`] maps calendar dates to the fund's end-of-day total
//! value. Missing data is an absent key. Lookups used for pricing walk back day
//! by day from the day *before* the event, so a same-day valuation (which
//! already contains the cash just moved) is never used to price that cash.

use chrono::{Days, NaiveDate};
use rust_decimal::Decimal;
use std::collections::BTreeMap;

use crate::db::models::ValuationPoint;
use crate::error::NavError;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValuationSeries {
    points: BTreeMap<NaiveDate, Decimal>,
}

impl ValuationSeries {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a series, rejecting a second value for the same date
    pub fn from_points<I>(points: I) -> Result<Self, NavError>
    where
        I: IntoIterator<Item = ValuationPoint>,
    {
        let mut series = Self::new();
        for p in points {
            if series.points.insert(p.date, p.total_value).is_some() {
                return Err(NavError::DuplicateValuation(p.date));
            }
        }
        Ok(series)
    }

    /// Insert or replace the value for a date (idempotent upsert)
    pub fn upsert(&mut self, date: NaiveDate, total_value: Decimal) -> Option<Decimal> {
        self.points.insert(date, total_value)
    }

    pub fn get(&self, date: NaiveDate) -> Option<Decimal> {
        self.points.get(&date).copied()
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn first_date(&self) -> Option<NaiveDate> {
        self.points.keys().next().copied()
    }

    pub fn last_date(&self) -> Option<NaiveDate> {
        self.points.keys().next_back().copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = ValuationPoint> + '_ {
        self.points.iter().map(|(date, value)| ValuationPoint {
            date: *date,
            total_value: *value,
        })
    }

    /// Most recent valuation strictly before `date`, at most `lookback_days` back.
    ///
    /// With a 7-day window an event on a Monday checks Sunday back to the
    /// previous Monday.
    pub fn latest_before(&self, date: NaiveDate, lookback_days: u32) -> Option<ValuationPoint> {
        let end = date.pred_opt()?;
        self.latest_in_window(end, lookback_days.saturating_sub(1))
    }

    /// Most recent valuation on or before `date`, at most `lookback_days` before it
    pub fn latest_on_or_before(
        &self,
        date: NaiveDate,
        lookback_days: u32,
    ) -> Option<ValuationPoint> {
        self.latest_in_window(date, lookback_days)
    }

    fn latest_in_window(&self, end: NaiveDate, span_days: u32) -> Option<ValuationPoint> {
        let start = end
            .checked_sub_days(Days::new(u64::from(span_days)))
            .unwrap_or(NaiveDate::MIN);
        self.points
            .range(start..=end)
            .next_back()
            .map(|(d, v)| ValuationPoint {
                date: *d,
                total_value: *v,
            })
    }

    /// Market value for a reporting date, or `MissingValuationSeries`
    pub fn value_as_of(
        &self,
        date: NaiveDate,
        lookback_days: u32,
    ) -> Result<ValuationPoint, NavError> {
        if self.is_empty() {
            return Err(NavError::MissingValuationSeries(format!(
                "{} (series is empty)",
                date
            )));
        }
        self.latest_on_or_before(date, lookback_days).ok_or_else(|| {
            NavError::MissingValuationSeries(format!(
                "{} (no valuation within {} days on or before it)",
                date, lookback_days
            ))
        })
    }

    /// Dates in `[from, to]` that have no valuation within the lookback window
    /// on or before them
    pub fn uncovered_dates(
        &self,
        from: NaiveDate,
        to: NaiveDate,
        lookback_days: u32,
    ) -> Vec<NaiveDate> {
        from.iter_days()
            .take_while(|d| *d <= to)
            .filter(|d| self.latest_on_or_before(*d, lookback_days).is_none())
            .collect()
    }

    /// Fail unless every date in `[from, to]` is covered
    pub fn ensure_covers(
        &self,
        from: NaiveDate,
        to: NaiveDate,
        lookback_days: u32,
    ) -> Result<(), NavError> {
        if self.is_empty() {
            return Err(NavError::MissingValuationSeries(format!(
                "{}..{} (series is empty)",
                from, to
            )));
        }
        let gaps = self.uncovered_dates(from, to, lookback_days);
        match (gaps.first(), gaps.last()) {
            (Some(first), Some(last)) => Err(NavError::MissingValuationSeries(format!(
                "{} uncovered day(s) between {} and {}",
                gaps.len(),
                first,
                last
            ))),
            _ => Ok(()),
        }
    }
}

impl FromIterator<(NaiveDate, Decimal)> for ValuationSeries {
    fn from_iter<T: IntoIterator<Item = (NaiveDate, Decimal)>>(iter: T) -> Self {
        Self {
            points: iter.into_iter().collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    fn weekday_series() -> ValuationSeries {
        [
            (d(2025, 9, 4), dec!(9100)),
            (d(2025, 9, 5), dec!(9330.04)),
            (d(2025, 9, 8), dec!(9457.27)),
            (d(2025, 9, 12), dec!(9600)),
        ]
        .into_iter()
        .collect()
    }

    #[test]
    fn test_latest_before_skips_same_day() {
        let series = weekday_series();
        let found = series.latest_before(d(2025, 9, 8), 7).unwrap();
        assert_eq!(found.date, d(2025, 9, 5));
        assert_eq!(found.total_value, dec!(9330.04));
    }

    #[test]
    fn test_latest_before_walks_back_over_weekend() {
        let series = weekday_series();
        let found = series.latest_before(d(2025, 9, 13), 7).unwrap();
        assert_eq!(found.date, d(2025, 9, 12));
    }

    #[test]
    fn test_lookback_boundary() {
        let series: ValuationSeries = [(d(2025, 9, 1), dec!(100))].into_iter().collect();
        // Exactly 7 days back is inside the window
        assert!(series.latest_before(d(2025, 9, 8), 7).is_some());
        // 8 days back is not
        assert!(series.latest_before(d(2025, 9, 9), 7).is_none());
    }

    #[test]
    fn test_on_or_before_includes_same_day() {
        let series = weekday_series();
        let found = series.latest_on_or_before(d(2025, 9, 8), 7).unwrap();
        assert_eq!(found.date, d(2025, 9, 8));
    }

    #[test]
    fn test_duplicate_dates_rejected() {
        let p = ValuationPoint::new(d(2025, 9, 5), dec!(1)).unwrap();
        let err = ValuationSeries::from_points(vec![p, p]).unwrap_err();
        assert_eq!(err, NavError::DuplicateValuation(d(2025, 9, 5)));
    }

    #[test]
    fn test_value_as_of_on_empty_series() {
        let series = ValuationSeries::new();
        assert!(matches!(
            series.value_as_of(d(2025, 9, 8), 7),
            Err(NavError::MissingValuationSeries(_))
        ));
    }

    #[test]
    fn test_coverage_reports_gaps() {
        let series = weekday_series();
        assert!(series.ensure_covers(d(2025, 9, 4), d(2025, 9, 14), 7).is_ok());
        assert_eq!(
            series.uncovered_dates(d(2025, 9, 1), d(2025, 9, 5), 7),
            vec![d(2025, 9, 1), d(2025, 9, 2), d(2025, 9, 3)]
        );
        assert!(series.ensure_covers(d(2025, 9, 1), d(2025, 9, 5), 7).is_err());
        assert!(ValuationSeries::new()
            .ensure_covers(d(2025, 9, 1), d(2025, 9, 5), 7)
            .is_err());
    }

    #[test]
    fn test_upsert_replaces() {
        let mut series = weekday_series();
        assert_eq!(series.upsert(d(2025, 9, 5), dec!(1)), Some(dec!(9330.04)));
        assert_eq!(series.get(d(2025, 9, 5)), Some(dec!(1)));
        assert_eq!(series.len(), 4);
    }
}
