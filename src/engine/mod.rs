//! NAV engine - unit issuance and ownership queries
//!
//! [`process_events`] turns a fund's contribution/withdrawal events and its
//! valuation series into a [`Ledger`] of unit issuance. [`NavEngine`] bundles a
//! fund's inputs and answers point-in-time ownership and gain/loss questions by
//! replaying the ledger up to the query date. Everything here is a pure
//! function of its inputs: no I/O, no clock, no caching.

pub mod ledger;
pub mod state;

pub use ledger::{process_events, Ledger, LedgerEntry, Pricing};
pub use state::{gain_loss_for, OwnershipState};

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::Serialize;

use crate::config::EngineConfig;
use crate::db::models::{ContributionEvent, ValuationPoint};
use crate::error::NavError;
use crate::valuation::ValuationSeries;

/// A contributor's position in the fund at a point in time
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Holding {
    pub contributor: String,
    pub units: Decimal,
    pub ownership_pct: Decimal,
    pub net_contribution: Decimal,
}

/// A fund's event ledger and valuation series, with the pricing policy to apply
#[derive(Debug, Clone)]
pub struct NavEngine {
    events: Vec<ContributionEvent>,
    valuations: ValuationSeries,
    config: EngineConfig,
}

impl NavEngine {
    pub fn new(
        events: Vec<ContributionEvent>,
        valuations: ValuationSeries,
        config: EngineConfig,
    ) -> Self {
        Self {
            events,
            valuations,
            config,
        }
    }

    pub fn events(&self) -> &[ContributionEvent] {
        &self.events
    }

    pub fn valuations(&self) -> &ValuationSeries {
        &self.valuations
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Ledger over every event
    pub fn ledger(&self) -> Result<Ledger, NavError> {
        process_events(&self.events, &self.valuations, &self.config)
    }

    /// Ledger over events on or before `as_of`. Problems in later events do not
    /// affect it.
    pub fn ledger_as_of(&self, as_of: NaiveDate) -> Result<Ledger, NavError> {
        let events: Vec<ContributionEvent> = self
            .events
            .iter()
            .filter(|e| e.date() <= as_of)
            .cloned()
            .collect();
        process_events(&events, &self.valuations, &self.config)
    }

    /// Contributor's fraction of the fund in `[0, 1]`, 0 when the fund is empty
    pub fn ownership_pct(&self, contributor: &str, as_of: NaiveDate) -> Result<Decimal, NavError> {
        Ok(self.ledger_as_of(as_of)?.state().ownership_pct(contributor))
    }

    /// Net cash a contributor has put in on or before `as_of`
    pub fn net_contribution(&self, contributor: &str, as_of: NaiveDate) -> Decimal {
        self.events
            .iter()
            .filter(|e| e.contributor == contributor && e.date() <= as_of)
            .map(|e| e.amount)
            .sum()
    }

    /// Every contributor seen on or before `as_of`, including those fully redeemed
    pub fn ownership_breakdown(&self, as_of: NaiveDate) -> Result<Vec<Holding>, NavError> {
        let ledger = self.ledger_as_of(as_of)?;
        let state = ledger.state();
        Ok(state
            .contributors()
            .map(|c| Holding {
                contributor: c.to_string(),
                units: state.units_of(c),
                ownership_pct: state.ownership_pct(c),
                net_contribution: ledger.net_contribution(c, as_of),
            })
            .collect())
    }

    /// `ownership_pct * current_total_value - net_contribution`
    pub fn gain_loss(
        &self,
        contributor: &str,
        as_of: NaiveDate,
        current_total_value: Decimal,
    ) -> Result<Decimal, NavError> {
        let pct = self.ownership_pct(contributor, as_of)?;
        Ok(gain_loss_for(
            pct,
            current_total_value,
            self.net_contribution(contributor, as_of),
        ))
    }

    /// Gain/loss against the fund value on or before `as_of`, within the
    /// lookback window. No such valuation is `MissingValuationSeries`.
    pub fn gain_loss_at_market(
        &self,
        contributor: &str,
        as_of: NaiveDate,
    ) -> Result<(ValuationPoint, Decimal), NavError> {
        let market = self.market_value(as_of)?;
        let gl = self.gain_loss(contributor, as_of, market.total_value)?;
        Ok((market, gl))
    }

    /// Fund value used for reporting as of a date
    pub fn market_value(&self, as_of: NaiveDate) -> Result<ValuationPoint, NavError> {
        self.valuations
            .value_as_of(as_of, self.config.lookback_days)
    }

    /// First event date, if any
    pub fn first_event_date(&self) -> Option<NaiveDate> {
        self.events.iter().map(|e| e.date()).min()
    }
}
