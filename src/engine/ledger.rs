use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::Serialize;
use tracing::{debug, info, warn};

use super::state::OwnershipState;
use crate::config::EngineConfig;
use crate::db::models::{ContributionEvent, ValuationPoint};
use crate::error::{NavError, UnitScope};
use crate::valuation::ValuationSeries;

/// Decimal places kept on issued units. Balances then add exactly, so the
/// per-contributor split always sums to the fund total.
pub const UNIT_DP: u32 = 12;

/// Where the NAV used for an event came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "source", rename_all = "snake_case")]
pub enum Pricing {
    /// No units outstanding; NAV is the bootstrap value
    Bootstrap,
    /// Latest valuation strictly before the event date
    PriorValuation {
        date: NaiveDate,
        total_value: Decimal,
    },
    /// Nothing inside the lookback window; NAV fell back to the bootstrap value
    Unpriced,
}

impl Pricing {
    pub fn as_str(&self) -> &'static str {
        match self {
            Pricing::Bootstrap => "BOOTSTRAP",
            Pricing::PriorValuation { .. } => "PRIOR_VALUATION",
            Pricing::Unpriced => "UNPRICED",
        }
    }

    pub fn valuation_date(&self) -> Option<NaiveDate> {
        match self {
            Pricing::PriorValuation { date, .. } => Some(*date),
            _ => None,
        }
    }
}

/// One processed event: the units it issued (or redeemed) and the balances after it
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LedgerEntry {
    pub sequence: usize,
    pub event: ContributionEvent,
    pub units_at_start_of_day: Decimal,
    pub pricing: Pricing,
    pub nav: Decimal,
    /// Units actually applied: `amount / nav` at [`UNIT_DP`] places, or the
    /// whole remaining balance when dust was snapped
    pub units_issued: Decimal,
    pub contributor_units_after: Decimal,
    pub total_units_after: Decimal,
}

impl LedgerEntry {
    pub fn is_unpriced(&self) -> bool {
        self.pricing == Pricing::Unpriced
    }
}

/// Authoritative result of replaying a fund's events
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Ledger {
    entries: Vec<LedgerEntry>,
    state: OwnershipState,
}

impl Ledger {
    pub fn entries(&self) -> &[LedgerEntry] {
        &self.entries
    }

    pub fn state(&self) -> &OwnershipState {
        &self.state
    }

    pub fn into_entries(self) -> Vec<LedgerEntry> {
        self.entries
    }

    pub fn unpriced_entries(&self) -> impl Iterator<Item = &LedgerEntry> {
        self.entries.iter().filter(|e| e.is_unpriced())
    }

    /// Entries for events on or before `as_of` (whole day inclusive)
    pub fn entries_as_of(&self, as_of: NaiveDate) -> &[LedgerEntry] {
        let end = self.entries.partition_point(|e| e.event.date() <= as_of);
        &self.entries[..end]
    }

    /// Ownership after every event on or before `as_of`
    pub fn state_as_of(&self, as_of: NaiveDate) -> OwnershipState {
        let mut state = OwnershipState::new();
        for entry in self.entries_as_of(as_of) {
            state.apply(&entry.event.contributor, entry.units_issued);
        }
        state
    }

    /// Sum of a contributor's signed amounts on or before `as_of`
    pub fn net_contribution(&self, contributor: &str, as_of: NaiveDate) -> Decimal {
        self.entries_as_of(as_of)
            .iter()
            .filter(|e| e.event.contributor == contributor)
            .map(|e| e.event.amount)
            .sum()
    }
}

/// Pricing inputs frozen at the first event of a calendar day
struct DayContext {
    date: NaiveDate,
    units_at_start_of_day: Decimal,
    valuation: Option<ValuationPoint>,
}

impl DayContext {
    fn open(
        date: NaiveDate,
        state: &OwnershipState,
        valuations: &ValuationSeries,
        config: &EngineConfig,
    ) -> Self {
        let valuation = valuations.latest_before(date, config.lookback_days);
        debug!(
            "Opening {}: {} units, pricing valuation {:?}",
            date,
            state.total_units(),
            valuation.map(|v| v.date)
        );
        Self {
            date,
            units_at_start_of_day: state.total_units(),
            valuation,
        }
    }
}

/// Convert events into unit issuance.
///
/// Events are stable-sorted by timestamp, so same-instant events keep the
/// caller's order. Each event is priced at `valuation / units_before_event`,
/// where the valuation is the latest one strictly before the event's calendar
/// day and is fixed for the whole day. A fund with no units prices at the
/// bootstrap NAV. A day with no valuation in the lookback window also prices
/// at the bootstrap NAV and the entry is marked [`Pricing::Unpriced`].
///
/// A withdrawal that would take the contributor or the fund below zero units
/// is refused with [`NavError::NegativeUnits`]; nothing after it is applied.
pub fn process_events(
    events: &[ContributionEvent],
    valuations: &ValuationSeries,
    config: &EngineConfig,
) -> Result<Ledger, NavError> {
    let mut ordered: Vec<&ContributionEvent> = events.iter().collect();
    ordered.sort_by_key(|e| e.timestamp);

    let mut state = OwnershipState::new();
    let mut entries = Vec::with_capacity(ordered.len());
    let mut day: Option<DayContext> = None;

    for (sequence, event) in ordered.into_iter().enumerate() {
        if event.amount.is_zero() {
            return Err(NavError::InvalidEvent(format!(
                "zero amount for '{}' at {}",
                event.contributor, event.timestamp
            )));
        }

        let event_date = event.date();
        let ctx = match day.take() {
            Some(ctx) if ctx.date == event_date => ctx,
            _ => DayContext::open(event_date, &state, valuations, config),
        };

        let units_before = state.total_units();
        let (pricing, nav) = if units_before <= Decimal::ZERO {
            (Pricing::Bootstrap, config.bootstrap_nav)
        } else if let Some(v) = ctx.valuation {
            let nav = v
                .total_value
                .checked_div(units_before)
                .ok_or_else(|| overflow(event, v.total_value))?;
            if nav <= Decimal::ZERO {
                return Err(NavError::NonPositiveNav {
                    date: v.date,
                    total_value: v.total_value,
                    total_units: units_before,
                });
            }
            (
                Pricing::PriorValuation {
                    date: v.date,
                    total_value: v.total_value,
                },
                nav,
            )
        } else if valuations.is_empty() {
            return Err(NavError::MissingValuationSeries(format!(
                "{} by '{}' at {} ({} units outstanding)",
                event.kind().as_str().to_lowercase(),
                event.contributor,
                event.timestamp,
                units_before
            )));
        } else {
            warn!(
                "No valuation within {} days before {}; pricing {} by '{}' at fallback NAV {}",
                config.lookback_days,
                event_date,
                event.amount,
                event.contributor,
                config.bootstrap_nav
            );
            (Pricing::Unpriced, config.bootstrap_nav)
        };

        let mut units_issued = event
            .amount
            .checked_div(nav)
            .ok_or_else(|| overflow(event, nav))?
            .round_dp(UNIT_DP);

        if event.is_withdrawal() {
            let held = state.units_of(&event.contributor);
            let after = held
                .checked_add(units_issued)
                .ok_or_else(|| overflow(event, nav))?;
            if after < Decimal::ZERO {
                if -after <= config.dust_tolerance {
                    debug!(
                        "Snapping {} units of dust for '{}' at {}",
                        after, event.contributor, event.timestamp
                    );
                    units_issued = -held;
                } else {
                    return Err(NavError::NegativeUnits {
                        contributor: event.contributor.clone(),
                        timestamp: event.timestamp,
                        amount: event.amount,
                        scope: UnitScope::Contributor,
                        balance_before: held,
                        balance_after: after,
                    });
                }
            }

            let fund_after = units_before
                .checked_add(units_issued)
                .ok_or_else(|| overflow(event, nav))?;
            if fund_after < Decimal::ZERO {
                return Err(NavError::NegativeUnits {
                    contributor: event.contributor.clone(),
                    timestamp: event.timestamp,
                    amount: event.amount,
                    scope: UnitScope::Fund,
                    balance_before: units_before,
                    balance_after: fund_after,
                });
            }
        }

        if units_before.checked_add(units_issued).is_none() {
            return Err(overflow(event, nav));
        }
        state.apply(&event.contributor, units_issued);
        debug_assert_eq!(state.sum_of_contributor_units(), state.total_units());

        entries.push(LedgerEntry {
            sequence,
            event: event.clone(),
            units_at_start_of_day: ctx.units_at_start_of_day,
            pricing,
            nav,
            units_issued,
            contributor_units_after: state.units_of(&event.contributor),
            total_units_after: state.total_units(),
        });

        day = Some(ctx);
    }

    let unpriced = entries.iter().filter(|e| e.is_unpriced()).count();
    info!(
        "Processed {} events into {} units ({} unpriced)",
        entries.len(),
        state.total_units(),
        unpriced
    );

    Ok(Ledger { entries, state })
}

fn overflow(event: &ContributionEvent, nav: Decimal) -> NavError {
    NavError::Overflow {
        contributor: event.contributor.clone(),
        timestamp: event.timestamp,
        amount: event.amount,
        nav,
    }
}
