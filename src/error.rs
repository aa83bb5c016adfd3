//! Error handling for fundnav
//!
//! The engine and ingestion layers return the typed [`NavError`] so callers can
//! match on data-integrity problems. Storage, import and CLI layers use the
//! anyhow-based [`Result`] alias for context chaining.

use chrono::{NaiveDate, NaiveDateTime};
use rust_decimal::Decimal;
use thiserror::Error;

/// Which balance a rejected withdrawal would have driven negative
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnitScope {
    Contributor,
    Fund,
}

impl UnitScope {
    pub fn as_str(&self) -> &'static str {
        match self {
            UnitScope::Contributor => "contributor",
            UnitScope::Fund => "fund",
        }
    }
}

/// Data-integrity errors raised while pricing and replaying a fund's events
#[derive(Error, Debug, Clone, PartialEq)]
pub enum NavError {
    #[error(
        "withdrawal of {amount} by '{contributor}' at {timestamp} would leave {} units at {balance_after} (held {balance_before})",
        .scope.as_str()
    )]
    NegativeUnits {
        contributor: String,
        timestamp: NaiveDateTime,
        amount: Decimal,
        scope: UnitScope,
        balance_before: Decimal,
        balance_after: Decimal,
    },

    #[error("duplicate {kind} of {amount} by '{contributor}' on {date} appears {occurrences} times")]
    DuplicateEvent {
        contributor: String,
        date: NaiveDate,
        amount: Decimal,
        kind: &'static str,
        occurrences: usize,
    },

    #[error("missing valuation series for {0}")]
    MissingValuationSeries(String),

    #[error("cannot price event on {date}: valuation {total_value} over {total_units} units gives non-positive NAV")]
    NonPositiveNav {
        date: NaiveDate,
        total_value: Decimal,
        total_units: Decimal,
    },

    #[error("invalid event: {0}")]
    InvalidEvent(String),

    #[error("invalid valuation on {date}: {reason}")]
    InvalidValuation { date: NaiveDate, reason: String },

    #[error("more than one valuation for {0}")]
    DuplicateValuation(NaiveDate),

    #[error("arithmetic overflow pricing {amount} by '{contributor}' at {timestamp} (NAV {nav})")]
    Overflow {
        contributor: String,
        timestamp: NaiveDateTime,
        amount: Decimal,
        nav: Decimal,
    },
}

/// Result type alias for application-level operations
pub type Result<T> = anyhow::Result<T>;
