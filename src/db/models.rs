use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

use crate::error::NavError;

/// A pooled fund whose contributors share gains and losses through units
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Fund {
    pub id: Option<i64>,
    pub name: String,
    pub base_currency: String,
    pub created_at: DateTime<Utc>,
}

/// Direction of a cash movement, derived from the sign of the amount
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum EventKind {
    Contribution,
    Withdrawal,
}

impl EventKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            EventKind::Contribution => "CONTRIBUTION",
            EventKind::Withdrawal => "WITHDRAWAL",
        }
    }

    /// Sign an absolute amount for this direction
    pub fn signed(&self, amount: Decimal) -> Decimal {
        match self {
            EventKind::Contribution => amount.abs(),
            EventKind::Withdrawal => -amount.abs(),
        }
    }
}

impl FromStr for EventKind {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "CONTRIBUTION" | "DEPOSIT" | "IN" | "C" => Ok(EventKind::Contribution),
            "WITHDRAWAL" | "WITHDRAW" | "OUT" | "W" => Ok(EventKind::Withdrawal),
            _ => Err(()),
        }
    }
}

/// Cash moved into (positive amount) or out of (negative amount) a fund
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ContributionEvent {
    pub id: Option<i64>,
    pub contributor: String,
    pub timestamp: NaiveDateTime,
    pub amount: Decimal,
    pub note: Option<String>,
}

impl ContributionEvent {
    /// Build a validated event. Zero amounts and blank contributors are rejected.
    pub fn new(
        contributor: impl Into<String>,
        timestamp: NaiveDateTime,
        amount: Decimal,
    ) -> Result<Self, NavError> {
        let contributor = contributor.into().trim().to_string();
        if contributor.is_empty() {
            return Err(NavError::InvalidEvent(format!(
                "contributor is blank for amount {} at {}",
                amount, timestamp
            )));
        }
        if amount.is_zero() {
            return Err(NavError::InvalidEvent(format!(
                "zero amount for '{}' at {}",
                contributor, timestamp
            )));
        }

        Ok(Self {
            id: None,
            contributor,
            timestamp,
            amount,
            note: None,
        })
    }

    pub fn with_note(mut self, note: impl Into<String>) -> Self {
        self.note = Some(note.into());
        self
    }

    pub fn date(&self) -> NaiveDate {
        self.timestamp.date()
    }

    pub fn kind(&self) -> EventKind {
        if self.amount < Decimal::ZERO {
            EventKind::Withdrawal
        } else {
            EventKind::Contribution
        }
    }

    pub fn is_withdrawal(&self) -> bool {
        self.kind() == EventKind::Withdrawal
    }
}

/// End-of-day total market value of a fund (positions plus cash)
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct ValuationPoint {
    pub date: NaiveDate,
    pub total_value: Decimal,
}

impl ValuationPoint {
    pub fn new(date: NaiveDate, total_value: Decimal) -> Result<Self, NavError> {
        if total_value < Decimal::ZERO {
            return Err(NavError::InvalidValuation {
                date,
                reason: format!("negative total value {}", total_value),
            });
        }
        Ok(Self { date, total_value })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn ts(y: i32, m: u32, d: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, m, d)
            .unwrap()
            .and_hms_opt(12, 0, 0)
            .unwrap()
    }

    #[test]
    fn test_kind_follows_sign() {
        let deposit = ContributionEvent::new("alice", ts(2025, 9, 7), dec!(1000)).unwrap();
        let withdrawal = ContributionEvent::new("alice", ts(2025, 9, 8), dec!(-250)).unwrap();
        assert_eq!(deposit.kind(), EventKind::Contribution);
        assert_eq!(withdrawal.kind(), EventKind::Withdrawal);
        assert!(withdrawal.is_withdrawal());
    }

    #[test]
    fn test_zero_amount_rejected() {
        let err = ContributionEvent::new("alice", ts(2025, 9, 7), Decimal::ZERO).unwrap_err();
        assert!(matches!(err, NavError::InvalidEvent(_)));
    }

    #[test]
    fn test_blank_contributor_rejected() {
        assert!(ContributionEvent::new("  ", ts(2025, 9, 7), dec!(10)).is_err());
    }

    #[test]
    fn test_event_kind_parsing_and_sign() {
        assert_eq!("deposit".parse::<EventKind>(), Ok(EventKind::Contribution));
        assert_eq!(" Withdrawal ".parse::<EventKind>(), Ok(EventKind::Withdrawal));
        assert!("transfer".parse::<EventKind>().is_err());
        assert_eq!(EventKind::Withdrawal.signed(dec!(100)), dec!(-100));
        assert_eq!(EventKind::Contribution.signed(dec!(-100)), dec!(100));
    }

    #[test]
    fn test_negative_valuation_rejected() {
        let date = NaiveDate::from_ymd_opt(2025, 9, 5).unwrap();
        assert!(ValuationPoint::new(date, dec!(-1)).is_err());
        assert!(ValuationPoint::new(date, Decimal::ZERO).is_ok());
    }
}
