use anyhow::{Context, Result};
use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::engine::{gain_loss_for, NavEngine};

/// Where the fund value in a report came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "source", rename_all = "snake_case")]
pub enum ValueSource {
    /// Supplied on the command line
    Override,
    /// Stored valuation on or before the report date
    Valuation { date: NaiveDate },
    /// Empty fund with no valuation in range
    Unavailable,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OwnershipRow {
    pub contributor: String,
    pub units: Decimal,
    pub ownership_pct: Decimal,
    pub net_contribution: Decimal,
    pub value: Decimal,
    pub gain_loss: Decimal,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OwnershipReport {
    pub fund: String,
    pub currency: String,
    pub as_of: NaiveDate,
    pub total_value: Decimal,
    pub value_source: ValueSource,
    pub total_units: Decimal,
    /// `total_value / total_units`, absent for an empty fund
    pub nav_per_unit: Option<Decimal>,
    pub unpriced_events: usize,
    pub rows: Vec<OwnershipRow>,
}

impl OwnershipReport {
    pub fn total_net_contribution(&self) -> Decimal {
        self.rows.iter().map(|r| r.net_contribution).sum()
    }

    pub fn total_gain_loss(&self) -> Decimal {
        self.rows.iter().map(|r| r.gain_loss).sum()
    }
}

/// Single contributor gain/loss statement
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GainLossReport {
    pub fund: String,
    pub currency: String,
    pub contributor: String,
    pub as_of: NaiveDate,
    pub units: Decimal,
    pub ownership_pct: Decimal,
    pub net_contribution: Decimal,
    pub total_value: Decimal,
    pub value_source: ValueSource,
    pub value: Decimal,
    pub gain_loss: Decimal,
}

fn resolve_value(
    engine: &NavEngine,
    as_of: NaiveDate,
    value_override: Option<Decimal>,
) -> Result<(Decimal, ValueSource)> {
    match value_override {
        Some(v) => Ok((v, ValueSource::Override)),
        None => {
            let point = engine
                .market_value(as_of)
                .with_context(|| format!("No fund value for {}; pass --value", as_of))?;
            Ok((point.total_value, ValueSource::Valuation { date: point.date }))
        }
    }
}

/// Ownership of every contributor as of `as_of`, valued at the stored
/// valuation or at `value_override`
pub fn build_ownership_report(
    fund: &str,
    currency: &str,
    engine: &NavEngine,
    as_of: NaiveDate,
    value_override: Option<Decimal>,
) -> Result<OwnershipReport> {
    let ledger = engine.ledger_as_of(as_of)?;
    let state = ledger.state();

    let unpriced_events = ledger.unpriced_entries().count();
    if unpriced_events > 0 {
        warn!(
            "{} event(s) in '{}' were issued at the bootstrap NAV for lack of a valuation",
            unpriced_events, fund
        );
    }

    let (total_value, value_source) = if state.total_units().is_zero() && value_override.is_none()
    {
        // Nothing outstanding: a missing valuation does not matter
        match engine.market_value(as_of) {
            Ok(p) => (p.total_value, ValueSource::Valuation { date: p.date }),
            Err(_) => (Decimal::ZERO, ValueSource::Unavailable),
        }
    } else {
        resolve_value(engine, as_of, value_override)?
    };

    let rows = state
        .contributors()
        .map(|c| {
            let pct = state.ownership_pct(c);
            let net = ledger.net_contribution(c, as_of);
            OwnershipRow {
                contributor: c.to_string(),
                units: state.units_of(c),
                ownership_pct: pct,
                net_contribution: net,
                value: pct * total_value,
                gain_loss: gain_loss_for(pct, total_value, net),
            }
        })
        .collect();

    let nav_per_unit = if state.total_units() > Decimal::ZERO {
        Some(total_value / state.total_units())
    } else {
        None
    };

    info!("Built ownership report for '{}' as of {}", fund, as_of);
    Ok(OwnershipReport {
        fund: fund.to_string(),
        currency: currency.to_string(),
        as_of,
        total_value,
        value_source,
        total_units: state.total_units(),
        nav_per_unit,
        unpriced_events,
        rows,
    })
}

/// Gain/loss of one contributor as of `as_of`
pub fn build_gain_loss_report(
    fund: &str,
    currency: &str,
    engine: &NavEngine,
    contributor: &str,
    as_of: NaiveDate,
    value_override: Option<Decimal>,
) -> Result<GainLossReport> {
    let ledger = engine.ledger_as_of(as_of)?;
    let state = ledger.state();
    if state.units_by_contributor().get(contributor).is_none() {
        anyhow::bail!(
            "No events for contributor '{}' in fund '{}' on or before {}",
            contributor,
            fund,
            as_of
        );
    }

    let (total_value, value_source) = resolve_value(engine, as_of, value_override)?;
    let pct = state.ownership_pct(contributor);
    let net = ledger.net_contribution(contributor, as_of);

    Ok(GainLossReport {
        fund: fund.to_string(),
        currency: currency.to_string(),
        contributor: contributor.to_string(),
        as_of,
        units: state.units_of(contributor),
        ownership_pct: pct,
        net_contribution: net,
        total_value,
        value_source,
        value: pct * total_value,
        gain_loss: gain_loss_for(pct, total_value, net),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EngineConfig;
    use crate::db::models::ContributionEvent;
    use crate::valuation::ValuationSeries;
    use rust_decimal_macros::dec;

    fn d(m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, m, day).unwrap()
    }

    fn engine() -> NavEngine {
        let at = |day: u32| d(9, day).and_hms_opt(10, 0, 0).unwrap();
        let events = vec![
            ContributionEvent::new("alice", at(1), dec!(600)).unwrap(),
            ContributionEvent::new("bob", at(2), dec!(400)).unwrap(),
        ];
        let valuations: ValuationSeries = vec![
            (d(9, 1), dec!(600)),
            (d(9, 2), dec!(1000)),
            (d(9, 30), dec!(12000)),
        ]
        .into_iter()
        .collect();
        NavEngine::new(events, valuations, EngineConfig::default())
    }

    #[test]
    fn test_ownership_report_at_market() {
        let report = build_ownership_report("club", "USD", &engine(), d(9, 30), None).unwrap();
        assert_eq!(report.total_value, dec!(12000));
        assert_eq!(report.value_source, ValueSource::Valuation { date: d(9, 30) });
        assert_eq!(report.total_units, dec!(1000));
        assert_eq!(report.nav_per_unit, Some(dec!(12)));
        assert_eq!(report.rows.len(), 2);
        assert_eq!(report.rows[0].contributor, "alice");
        assert_eq!(report.rows[0].ownership_pct, dec!(0.6));
        assert_eq!(report.rows[0].value, dec!(7200));
        assert_eq!(report.rows[0].gain_loss, dec!(6600));
        assert_eq!(report.total_gain_loss(), dec!(11000));
        assert_eq!(report.total_net_contribution(), dec!(1000));
    }

    #[test]
    fn test_value_override_skips_valuation_lookup() {
        let report =
            build_ownership_report("club", "USD", &engine(), d(9, 15), Some(dec!(2000))).unwrap();
        assert_eq!(report.value_source, ValueSource::Override);
        assert_eq!(report.rows[1].gain_loss, dec!(400));
    }

    #[test]
    fn test_missing_market_value_is_error() {
        // 9/15 is more than a week after 9/2
        assert!(build_ownership_report("club", "USD", &engine(), d(9, 15), None).is_err());
    }

    #[test]
    fn test_gain_loss_report() {
        let report =
            build_gain_loss_report("club", "USD", &engine(), "bob", d(9, 30), None).unwrap();
        assert_eq!(report.ownership_pct, dec!(0.4));
        assert_eq!(report.value, dec!(4800));
        assert_eq!(report.gain_loss, dec!(4400));

        let unknown = build_gain_loss_report("club", "USD", &engine(), "carol", d(9, 30), None);
        assert!(unknown.is_err());
    }
}
