use anyhow::{anyhow, Result};
use csv::StringRecord;
use std::path::Path;
use tracing::{info, warn};

use super::{cell, find_column, open_csv, require_column, required_cell, ParsedFile};
use crate::db::models::{ContributionEvent, EventKind};
use crate::utils::{parse_decimal, parse_timestamp};

#[derive(Debug)]
struct ContributionColumns {
    contributor: usize,
    timestamp: usize,
    amount: usize,
    kind: Option<usize>,
    note: Option<usize>,
}

/// Parse a contributions CSV into events.
///
/// When a `type` column is present it decides the sign of `amount`; otherwise
/// the sign of `amount` itself is used.
pub fn parse_contributions_csv<P: AsRef<Path>>(
    file_path: P,
) -> Result<ParsedFile<ContributionEvent>> {
    let path = file_path.as_ref();
    info!("Parsing contributions CSV: {:?}", path);

    let (mut reader, headers) = open_csv(path)?;
    let columns = find_columns(&headers)?;

    let mut events = Vec::new();
    let mut skipped = 0;
    for (idx, result) in reader.records().enumerate() {
        let row_num = idx + 2;
        let record = match result {
            Ok(r) => r,
            Err(e) => {
                warn!("Skipping row {}: {}", row_num, e);
                skipped += 1;
                continue;
            }
        };
        if record.iter().all(|f| f.trim().is_empty()) {
            continue;
        }

        match parse_row(&record, &columns) {
            Ok(event) => events.push(event),
            Err(e) => {
                warn!("Skipping row {}: {}", row_num, e);
                skipped += 1;
            }
        }
    }

    info!(
        "Parsed {} contribution events ({} rows skipped)",
        events.len(),
        skipped
    );
    Ok(ParsedFile::new(events, skipped))
}

fn find_columns(headers: &StringRecord) -> Result<ContributionColumns> {
    Ok(ContributionColumns {
        contributor: require_column(headers, &["contributor", "member", "name"])?,
        timestamp: require_column(headers, &["timestamp", "date", "datetime"])?,
        amount: require_column(headers, &["amount"])?,
        kind: find_column(headers, &["type", "kind"]),
        note: find_column(headers, &["note", "notes", "memo"]),
    })
}

fn parse_row(record: &StringRecord, columns: &ContributionColumns) -> Result<ContributionEvent> {
    let contributor = required_cell(record, columns.contributor, "contributor")?;
    let timestamp = parse_timestamp(required_cell(record, columns.timestamp, "timestamp")?)?;
    let mut amount = parse_decimal(required_cell(record, columns.amount, "amount")?)?;

    if let Some(text) = columns.kind.and_then(|i| cell(record, i)) {
        let kind: EventKind = text
            .parse()
            .map_err(|_| anyhow!("unknown event type '{}'", text))?;
        amount = kind.signed(amount);
    }

    let mut event = ContributionEvent::new(contributor, timestamp, amount)?;
    if let Some(note) = columns.note.and_then(|i| cell(record, i)) {
        event = event.with_note(note);
    }
    Ok(event)
}
