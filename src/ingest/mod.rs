//! Ingestion-side data quality checks
//!
//! Events must be deduplicated before they reach the engine. Two events are
//! duplicates when contributor, calendar date, amount and direction all match;
//! the time of day is ignored because the same transfer is often recorded once
//! from a bank export and once by hand.

use chrono::NaiveDate;
use itertools::Itertools;
use rust_decimal::Decimal;
use std::collections::HashMap;
use tracing::{info, warn};

use crate::db::models::{ContributionEvent, EventKind};
use crate::error::NavError;

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DuplicateKey {
    pub contributor: String,
    pub date: NaiveDate,
    pub amount: Decimal,
    pub kind: EventKind,
}

impl DuplicateKey {
    pub fn of(event: &ContributionEvent) -> Self {
        Self {
            contributor: event.contributor.clone(),
            date: event.date(),
            // normalize() so 100 and 100.00 compare and hash alike
            amount: event.amount.normalize(),
            kind: event.kind(),
        }
    }
}

/// A set of events sharing one [`DuplicateKey`], as indices into the input
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DuplicateGroup {
    pub key: DuplicateKey,
    pub indices: Vec<usize>,
}

impl DuplicateGroup {
    pub fn to_error(&self) -> NavError {
        NavError::DuplicateEvent {
            contributor: self.key.contributor.clone(),
            date: self.key.date,
            amount: self.key.amount,
            kind: match self.key.kind {
                EventKind::Contribution => "contribution",
                EventKind::Withdrawal => "withdrawal",
            },
            occurrences: self.indices.len(),
        }
    }
}

/// Groups of two or more events with the same key, ordered by date then contributor
pub fn find_duplicates(events: &[ContributionEvent]) -> Vec<DuplicateGroup> {
    let mut groups: HashMap<DuplicateKey, Vec<usize>> = HashMap::new();
    for (idx, event) in events.iter().enumerate() {
        groups.entry(DuplicateKey::of(event)).or_default().push(idx);
    }

    groups
        .into_iter()
        .filter(|(_, indices)| indices.len() > 1)
        .map(|(key, indices)| DuplicateGroup { key, indices })
        .sorted_by(|a, b| a.key.cmp(&b.key))
        .collect()
}

/// Fail with the first duplicate found
pub fn ensure_no_duplicates(events: &[ContributionEvent]) -> Result<(), NavError> {
    match find_duplicates(events).first() {
        Some(group) => Err(group.to_error()),
        None => Ok(()),
    }
}

/// Outcome of a deduplication pass
#[derive(Debug, Clone, Default)]
pub struct DedupOutcome {
    pub kept: Vec<ContributionEvent>,
    pub removed: Vec<ContributionEvent>,
}

/// Keep the first occurrence of every key, preserving input order
pub fn dedupe(events: Vec<ContributionEvent>) -> DedupOutcome {
    let mut seen: HashMap<DuplicateKey, usize> = HashMap::new();
    let mut outcome = DedupOutcome::default();

    for event in events {
        let key = DuplicateKey::of(&event);
        let count = seen.entry(key).or_insert(0);
        *count += 1;
        if *count == 1 {
            outcome.kept.push(event);
        } else {
            warn!(
                "Dropping duplicate {} of {} by '{}' on {}",
                event.kind().as_str().to_lowercase(),
                event.amount,
                event.contributor,
                event.date()
            );
            outcome.removed.push(event);
        }
    }

    if !outcome.removed.is_empty() {
        info!(
            "Deduplication kept {} events, removed {}",
            outcome.kept.len(),
            outcome.removed.len()
        );
    }
    outcome
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDateTime;
    use rust_decimal_macros::dec;

    fn at(d: u32, h: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2025, 9, d)
            .unwrap()
            .and_hms_opt(h, 0, 0)
            .unwrap()
    }

    fn ev(who: &str, d: u32, h: u32, amount: Decimal) -> ContributionEvent {
        ContributionEvent::new(who, at(d, h), amount).unwrap()
    }

    #[test]
    fn test_same_day_same_amount_is_duplicate() {
        let events = vec![
            ev("alice", 7, 9, dec!(1000)),
            ev("bob", 7, 9, dec!(1000)),
            ev("alice", 7, 17, dec!(1000.00)),
        ];
        let groups = find_duplicates(&events);
        assert_eq!(groups.len(), 1);
        assert_eq!(groups[0].indices, vec![0, 2]);
        assert_eq!(groups[0].key.contributor, "alice");
    }

    #[test]
    fn test_direction_distinguishes_events() {
        let events = vec![ev("alice", 7, 9, dec!(100)), ev("alice", 7, 10, dec!(-100))];
        assert!(find_duplicates(&events).is_empty());
        assert!(ensure_no_duplicates(&events).is_ok());
    }

    #[test]
    fn test_ensure_reports_duplicate_error() {
        let events = vec![ev("alice", 8, 9, dec!(-50)), ev("alice", 8, 9, dec!(-50))];
        match ensure_no_duplicates(&events).unwrap_err() {
            NavError::DuplicateEvent {
                contributor,
                kind,
                occurrences,
                ..
            } => {
                assert_eq!(contributor, "alice");
                assert_eq!(kind, "withdrawal");
                assert_eq!(occurrences, 2);
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn test_dedupe_keeps_first_occurrence() {
        let first = ev("alice", 7, 9, dec!(1000)).with_note("bank export");
        let second = ev("alice", 7, 18, dec!(1000)).with_note("manual");
        let other = ev("bob", 8, 9, dec!(250));

        let outcome = dedupe(vec![first.clone(), other.clone(), second.clone()]);
        assert_eq!(outcome.kept, vec![first, other]);
        assert_eq!(outcome.removed, vec![second]);
        assert!(ensure_no_duplicates(&outcome.kept).is_ok());
    }
}
