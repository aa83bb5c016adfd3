use anyhow::Result;
use csv::StringRecord;
use std::path::Path;
use tracing::{info, warn};

use super::{open_csv, require_column, required_cell, ParsedFile};
use crate::db::models::ValuationPoint;
use crate::utils::{parse_date, parse_decimal};

/// Parse a `date,total_value` CSV. A date repeated later in the file
/// overrides the earlier row, the same as re-running an upsert.
pub fn parse_valuations_csv<P: AsRef<Path>>(file_path: P) -> Result<ParsedFile<ValuationPoint>> {
    let path = file_path.as_ref();
    info!("Parsing valuations CSV: {:?}", path);

    let (mut reader, headers) = open_csv(path)?;
    let date_col = require_column(&headers, &["date", "valuation_date"])?;
    let value_col = require_column(&headers, &["total_value", "value", "nav_total"])?;

    let mut points = Vec::new();
    let mut skipped = 0;
    for (idx, result) in reader.records().enumerate() {
        let row_num = idx + 2;
        let parsed = result
            .map_err(anyhow::Error::from)
            .and_then(|record| parse_row(&record, date_col, value_col));
        match parsed {
            Ok(Some(point)) => points.push(point),
            Ok(None) => continue,
            Err(e) => {
                warn!("Skipping row {}: {}", row_num, e);
                skipped += 1;
            }
        }
    }

    info!("Parsed {} valuations ({} rows skipped)", points.len(), skipped);
    Ok(ParsedFile::new(points, skipped))
}

fn parse_row(
    record: &StringRecord,
    date_col: usize,
    value_col: usize,
) -> Result<Option<ValuationPoint>> {
    if record.iter().all(|f| f.trim().is_empty()) {
        return Ok(None);
    }
    let date = parse_date(required_cell(record, date_col, "date")?)?;
    let value = parse_decimal(required_cell(record, value_col, "total_value")?)?;
    Ok(Some(ValuationPoint::new(date, value)?))
}
