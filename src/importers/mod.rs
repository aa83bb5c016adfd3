// Import module - CSV readers for contributions, valuations and position snapshots

pub mod contributions_csv;
pub mod positions_csv;
pub mod valuations_csv;

use anyhow::{anyhow, Context, Result};
use csv::{ReaderBuilder, StringRecord, Trim};
use std::fs::File;
use std::path::Path;
use tracing::debug;

pub use contributions_csv::parse_contributions_csv;
pub use positions_csv::parse_positions_csv;
pub use valuations_csv::parse_valuations_csv;

/// Rows parsed from a file plus the rows that had to be skipped
#[derive(Debug, Clone)]
pub struct ParsedFile<T> {
    pub records: Vec<T>,
    pub skipped: usize,
}

impl<T> ParsedFile<T> {
    pub fn new(records: Vec<T>, skipped: usize) -> Self {
        Self { records, skipped }
    }
}

/// Open a CSV file, sniffing `,` vs `;` from the header line
fn open_csv(path: &Path) -> Result<(csv::Reader<File>, StringRecord)> {
    let first_line = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {:?}", path))?
        .lines()
        .next()
        .unwrap_or_default()
        .to_string();
    let delimiter = if first_line.matches(';').count() > first_line.matches(',').count() {
        b';'
    } else {
        b','
    };

    let mut reader = ReaderBuilder::new()
        .delimiter(delimiter)
        .flexible(true)
        .trim(Trim::All)
        .from_path(path)
        .context("Failed to open CSV file")?;

    let headers = reader
        .headers()
        .context("Failed to read CSV headers")?
        .clone();
    debug!("CSV headers: {:?}", headers);

    Ok((reader, headers))
}

/// Index of the first header matching any alias, compared case-insensitively
fn find_column(headers: &StringRecord, aliases: &[&str]) -> Option<usize> {
    headers.iter().position(|h| {
        let text = h.trim().trim_start_matches('\u{feff}').to_lowercase();
        aliases.iter().any(|a| text == *a)
    })
}

fn require_column(headers: &StringRecord, aliases: &[&str]) -> Result<usize> {
    find_column(headers, aliases)
        .ok_or_else(|| anyhow!("Required column '{}' not found", aliases[0]))
}

/// Non-empty cell text at `idx`
fn cell(record: &StringRecord, idx: usize) -> Option<&str> {
    record.get(idx).map(str::trim).filter(|s| !s.is_empty())
}

fn required_cell<'r>(record: &'r StringRecord, idx: usize, name: &str) -> Result<&'r str> {
    cell(record, idx).ok_or_else(|| anyhow!("empty {}", name))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_find_column_aliases_and_case() {
        let headers = StringRecord::from(vec!["\u{feff}Date", "Total_Value"]);
        assert_eq!(find_column(&headers, &["date"]), Some(0));
        assert_eq!(find_column(&headers, &["total_value", "value"]), Some(1));
        assert_eq!(find_column(&headers, &["ticker"]), None);
        assert!(require_column(&headers, &["ticker"]).is_err());
    }

    #[test]
    fn test_cell_treats_blank_as_missing() {
        let record = StringRecord::from(vec!["alice", "  ", ""]);
        assert_eq!(cell(&record, 0), Some("alice"));
        assert_eq!(cell(&record, 1), None);
        assert_eq!(cell(&record, 5), None);
        assert!(required_cell(&record, 2, "amount").is_err());
    }
}
