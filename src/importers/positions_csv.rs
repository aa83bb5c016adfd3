use anyhow::Result;
use chrono::NaiveDate;
use csv::StringRecord;
use rust_decimal::Decimal;
use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;
use tracing::{debug, info, warn};

use super::{cell, open_csv, require_column, required_cell, ParsedFile};
use crate::db::models::ValuationPoint;
use crate::utils::{parse_date, parse_decimal};

#[derive(Debug)]
struct PositionRow {
    date: NaiveDate,
    ticker: String,
    market_value: Decimal,
}

/// Parse a position snapshot CSV (`date,ticker,market_value`) and sum each
/// date's rows into one fund valuation. Cash is an ordinary row.
///
/// A date with any unreadable row is dropped whole, and all of its rows count
/// as skipped. A partial sum would be stored as a valid but understated value.
pub fn parse_positions_csv<P: AsRef<Path>>(file_path: P) -> Result<ParsedFile<ValuationPoint>> {
    let path = file_path.as_ref();
    info!("Parsing positions CSV: {:?}", path);

    let (mut reader, headers) = open_csv(path)?;
    let date_col = require_column(&headers, &["date"])?;
    let ticker_col = require_column(&headers, &["ticker", "symbol", "asset"])?;
    let value_col = require_column(&headers, &["market_value", "value"])?;

    // date -> (sum, rows summed)
    let mut totals: BTreeMap<NaiveDate, (Decimal, usize)> = BTreeMap::new();
    let mut incomplete: BTreeSet<NaiveDate> = BTreeSet::new();
    let mut skipped = 0;
    for (idx, result) in reader.records().enumerate() {
        let row_num = idx + 2;
        let record = match result {
            Ok(record) => record,
            Err(e) => {
                warn!("Skipping row {}: {}", row_num, e);
                skipped += 1;
                continue;
            }
        };
        match parse_row(&record, date_col, ticker_col, value_col) {
            Ok(Some(row)) => {
                debug!("{} {} = {}", row.date, row.ticker, row.market_value);
                let entry = totals.entry(row.date).or_insert((Decimal::ZERO, 0));
                entry.0 += row.market_value;
                entry.1 += 1;
            }
            Ok(None) => continue,
            Err(e) => {
                warn!("Skipping row {}: {}", row_num, e);
                skipped += 1;
                if let Some(date) = cell(&record, date_col).and_then(|d| parse_date(d).ok()) {
                    incomplete.insert(date);
                }
            }
        }
    }

    let mut points = Vec::with_capacity(totals.len());
    for (date, (total, rows)) in totals {
        if incomplete.contains(&date) {
            warn!(
                "Dropping snapshot {}: it has unreadable rows, {} readable row(s) not imported",
                date, rows
            );
            skipped += rows;
            continue;
        }
        match ValuationPoint::new(date, total) {
            Ok(point) => points.push(point),
            Err(e) => {
                warn!("Skipping snapshot {}: {}", date, e);
                skipped += rows;
            }
        }
    }

    info!(
        "Aggregated positions into {} valuations ({} rows skipped)",
        points.len(),
        skipped
    );
    Ok(ParsedFile::new(points, skipped))
}

fn parse_row(
    record: &StringRecord,
    date_col: usize,
    ticker_col: usize,
    value_col: usize,
) -> Result<Option<PositionRow>> {
    if record.iter().all(|f| f.trim().is_empty()) {
        return Ok(None);
    }
    Ok(Some(PositionRow {
        date: parse_date(required_cell(record, date_col, "date")?)?,
        ticker: required_cell(record, ticker_col, "ticker")?.to_uppercase(),
        market_value: parse_decimal(required_cell(record, value_col, "market_value")?)?,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_positions_are_summed_per_date() {
        let mut file = NamedTempFile::new().unwrap();
        write!(
            file,
            "date,ticker,market_value\n\
             2025-09-12,AAPL,5000\n\
             2025-09-12,MSFT,4000.50\n\
             2025-09-12,CASH,457.27\n\
             2025-09-15,AAPL,5100\n\
             2025-09-15,CASH,oops\n"
        )
        .unwrap();

        let parsed = parse_positions_csv(file.path()).unwrap();
        assert_eq!(parsed.records.len(), 1);
        assert_eq!(parsed.records[0].total_value, dec!(9457.77));
        // 9/15 lost its cash row, so neither of its rows is imported
        assert_eq!(parsed.skipped, 2);
        assert!(parsed
            .records
            .iter()
            .all(|p| p.date != NaiveDate::from_ymd_opt(2025, 9, 15).unwrap()));
    }

    #[test]
    fn test_unreadable_date_only_skips_that_row() {
        let mut file = NamedTempFile::new().unwrap();
        write!(
            file,
            "date,ticker,market_value\n\
             2025-09-12,AAPL,5000\n\
             2025-09-12,CASH,N/A\n\
             not-a-date,MSFT,100\n\
             2025-09-15,AAPL,5100\n\
             2025-09-15,CASH,400\n"
        )
        .unwrap();

        let parsed = parse_positions_csv(file.path()).unwrap();
        assert_eq!(parsed.records.len(), 1);
        assert_eq!(
            parsed.records[0].date,
            NaiveDate::from_ymd_opt(2025, 9, 15).unwrap()
        );
        assert_eq!(parsed.records[0].total_value, dec!(5500));
        // CASH and MSFT rows, plus AAPL dropped with its date
        assert_eq!(parsed.skipped, 3);
    }

    #[test]
    fn test_negative_snapshot_total_is_skipped() {
        let mut file = NamedTempFile::new().unwrap();
        write!(
            file,
            "date,ticker,market_value\n2025-09-12,MARGIN,-100\n2025-09-12,CASH,20\n"
        )
        .unwrap();
        let parsed = parse_positions_csv(file.path()).unwrap();
        assert!(parsed.records.is_empty());
        assert_eq!(parsed.skipped, 2);
    }
}
