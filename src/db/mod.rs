// Database module - SQLite connection and fund/contribution/valuation storage

pub mod models;

use anyhow::{anyhow, Context, Result};
use rusqlite::{params, Connection, OptionalExtension};
use rust_decimal::Decimal;
use std::path::PathBuf;
use std::str::FromStr;
use tracing::{debug, info};

use crate::error::NavError;
use crate::valuation::ValuationSeries;
pub use models::{ContributionEvent, EventKind, Fund, ValuationPoint};

/// Get the default database path (~/.fundnav/data.db)
pub fn get_default_db_path() -> Result<PathBuf> {
    let home = std::env::var("HOME").context("HOME environment variable not set")?;
    let fundnav_dir = PathBuf::from(home).join(".fundnav");

    // Create directory if it doesn't exist
    std::fs::create_dir_all(&fundnav_dir).context("Failed to create .fundnav directory")?;

    Ok(fundnav_dir.join("data.db"))
}

/// Open database connection
pub fn open_db(db_path: Option<PathBuf>) -> Result<Connection> {
    let path = match db_path {
        Some(p) => p,
        None => get_default_db_path()?,
    };
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create directory {:?}", parent))?;
        }
    }
    let conn = Connection::open(&path).context(format!("Failed to open database at {:?}", path))?;

    // Enable foreign keys
    conn.execute("PRAGMA foreign_keys = ON", [])
        .context("Failed to enable foreign keys")?;

    Ok(conn)
}

/// Initialize the database with schema
pub fn init_database(db_path: Option<PathBuf>) -> Result<()> {
    let path = match db_path {
        Some(p) => p,
        None => get_default_db_path()?,
    };

    info!("Initializing database at: {:?}", path);

    let conn = open_db(Some(path))?;
    conn.execute_batch(include_str!("schema.sql"))
        .context("Failed to execute schema")?;

    info!("Database initialized successfully");
    Ok(())
}

// ============ Funds ============

/// Create a fund; fails if the name is taken
pub fn insert_fund(conn: &Connection, name: &str, base_currency: &str) -> Result<i64> {
    let name = name.trim();
    if name.is_empty() {
        return Err(anyhow!("Fund name cannot be empty"));
    }
    if get_fund_by_name(conn, name)?.is_some() {
        return Err(anyhow!("Fund '{}' already exists", name));
    }

    conn.execute(
        "INSERT INTO funds (name, base_currency) VALUES (?1, ?2)",
        params![name, base_currency.trim().to_uppercase()],
    )?;
    Ok(conn.last_insert_rowid())
}

pub fn get_fund_by_name(conn: &Connection, name: &str) -> Result<Option<Fund>> {
    let mut stmt = conn.prepare(
        "SELECT id, name, base_currency, created_at FROM funds WHERE name = ?1",
    )?;
    let fund = stmt
        .query_row([name.trim()], |row| {
            Ok(Fund {
                id: Some(row.get(0)?),
                name: row.get(1)?,
                base_currency: row.get(2)?,
                created_at: row.get(3)?,
            })
        })
        .optional()?;
    Ok(fund)
}

/// Look up a fund by name, with a helpful error when it does not exist
pub fn require_fund(conn: &Connection, name: &str) -> Result<(i64, Fund)> {
    let fund = get_fund_by_name(conn, name)?.ok_or_else(|| {
        anyhow!(
            "Fund '{}' not found. Create it with: fundnav fund add {}",
            name,
            name
        )
    })?;
    let id = fund
        .id
        .ok_or_else(|| anyhow!("Fund '{}' has no id", name))?;
    Ok((id, fund))
}

pub fn list_funds(conn: &Connection) -> Result<Vec<Fund>> {
    let mut stmt =
        conn.prepare("SELECT id, name, base_currency, created_at FROM funds ORDER BY name")?;
    let funds = stmt
        .query_map([], |row| {
            Ok(Fund {
                id: Some(row.get(0)?),
                name: row.get(1)?,
                base_currency: row.get(2)?,
                created_at: row.get(3)?,
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(funds)
}

// ============ Contributions ============

/// Insert a contribution/withdrawal event and drop the fund's cached reports
pub fn insert_contribution(
    conn: &Connection,
    fund_id: i64,
    event: &ContributionEvent,
) -> Result<i64> {
    conn.execute(
        "INSERT INTO contributions (fund_id, contributor, event_timestamp, amount, note)
         VALUES (?1, ?2, ?3, ?4, ?5)",
        params![
            fund_id,
            event.contributor,
            event.timestamp,
            event.amount.normalize().to_string(),
            event.note,
        ],
    )?;
    let id = conn.last_insert_rowid();
    invalidate_cache(conn, fund_id)?;
    Ok(id)
}

/// Whether an event with the same contributor, calendar date and amount exists
pub fn contribution_exists(
    conn: &Connection,
    fund_id: i64,
    event: &ContributionEvent,
) -> Result<bool> {
    let mut stmt = conn.prepare(
        "SELECT COUNT(*) FROM contributions
         WHERE fund_id = ?1 AND contributor = ?2
           AND date(event_timestamp) = ?3 AND amount = ?4",
    )?;
    let count: i64 = stmt.query_row(
        params![
            fund_id,
            event.contributor,
            event.date(),
            event.amount.normalize().to_string()
        ],
        |row| row.get(0),
    )?;
    Ok(count > 0)
}

/// All events for a fund, ordered by timestamp then insertion order
pub fn list_contributions(conn: &Connection, fund_id: i64) -> Result<Vec<ContributionEvent>> {
    let mut stmt = conn.prepare(
        "SELECT id, contributor, event_timestamp, amount, note
         FROM contributions
         WHERE fund_id = ?1
         ORDER BY event_timestamp ASC, id ASC",
    )?;
    let events = stmt
        .query_map([fund_id], |row| {
            Ok(ContributionEvent {
                id: Some(row.get(0)?),
                contributor: row.get(1)?,
                timestamp: row.get(2)?,
                amount: get_decimal_value(row, 3)?,
                note: row.get(4)?,
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(events)
}

/// Delete events by id (used by the dedupe repair)
pub fn delete_contributions(conn: &mut Connection, fund_id: i64, ids: &[i64]) -> Result<usize> {
    let tx = conn.transaction()?;
    let mut deleted = 0;
    for id in ids {
        deleted += tx.execute(
            "DELETE FROM contributions WHERE fund_id = ?1 AND id = ?2",
            params![fund_id, id],
        )?;
    }
    tx.execute("DELETE FROM ownership_cache WHERE fund_id = ?1", [fund_id])?;
    tx.commit()?;
    debug!("Deleted {} contributions from fund {}", deleted, fund_id);
    Ok(deleted)
}

// ============ Valuations ============

/// Insert or replace the valuation for `(fund, date)`. Re-running is a no-op.
pub fn upsert_valuation(
    conn: &Connection,
    fund_id: i64,
    point: &ValuationPoint,
    source: &str,
) -> Result<()> {
    conn.execute(
        "INSERT INTO valuations (fund_id, valuation_date, total_value, source)
         VALUES (?1, ?2, ?3, ?4)
         ON CONFLICT(fund_id, valuation_date) DO UPDATE SET
            total_value = excluded.total_value,
            source = excluded.source,
            updated_at = datetime('now')",
        params![
            fund_id,
            point.date,
            point.total_value.normalize().to_string(),
            source
        ],
    )?;
    invalidate_cache(conn, fund_id)?;
    Ok(())
}

/// Load a fund's valuation series
pub fn list_valuations(conn: &Connection, fund_id: i64) -> Result<ValuationSeries> {
    let mut stmt = conn.prepare(
        "SELECT valuation_date, total_value FROM valuations
         WHERE fund_id = ?1
         ORDER BY valuation_date ASC",
    )?;
    let points = stmt
        .query_map([fund_id], |row| {
            Ok(ValuationPoint {
                date: row.get(0)?,
                total_value: get_decimal_value(row, 1)?,
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;

    ValuationSeries::from_points(points)
        .map_err(|e: NavError| anyhow!(e))
        .context("Stored valuations are inconsistent")
}

// ============ Report cache ============

/// Drop every cached report for a fund
pub fn invalidate_cache(conn: &Connection, fund_id: i64) -> Result<usize> {
    let n = conn.execute("DELETE FROM ownership_cache WHERE fund_id = ?1", [fund_id])?;
    if n > 0 {
        debug!("Invalidated {} cached reports for fund {}", n, fund_id);
    }
    Ok(n)
}

/// Helper to read Decimal from SQLite (handles INTEGER, REAL and TEXT)
pub fn get_decimal_value(row: &rusqlite::Row, idx: usize) -> Result<Decimal, rusqlite::Error> {
    use rusqlite::types::ValueRef;

    match row.get_ref(idx)? {
        ValueRef::Text(bytes) => {
            let s = std::str::from_utf8(bytes)
                .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, rusqlite::types::Type::Text, Box::new(e)))?;
            Decimal::from_str(s).map_err(|e| {
                rusqlite::Error::FromSqlConversionFailure(idx, rusqlite::types::Type::Text, Box::new(e))
            })
        }
        ValueRef::Integer(i) => Ok(Decimal::from(i)),
        ValueRef::Real(f) => Decimal::try_from(f).map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(idx, rusqlite::types::Type::Real, Box::new(e))
        }),
        _ => Err(rusqlite::Error::InvalidColumnType(
            idx,
            "decimal".to_string(),
            rusqlite::types::Type::Null,
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use rust_decimal_macros::dec;
    use tempfile::TempDir;

    fn test_db() -> (TempDir, Connection) {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("test.db");
        init_database(Some(path.clone())).unwrap();
        let conn = open_db(Some(path)).unwrap();
        (dir, conn)
    }

    fn ts(d: u32, h: u32) -> chrono::NaiveDateTime {
        NaiveDate::from_ymd_opt(2025, 9, d)
            .unwrap()
            .and_hms_opt(h, 15, 0)
            .unwrap()
    }

    #[test]
    fn test_fund_names_are_unique() {
        let (_dir, conn) = test_db();
        insert_fund(&conn, "family", "usd").unwrap();
        assert!(insert_fund(&conn, "family", "USD").is_err());
        let (_, fund) = require_fund(&conn, "family").unwrap();
        assert_eq!(fund.base_currency, "USD");
        assert!(require_fund(&conn, "other").is_err());
    }

    #[test]
    fn test_contributions_round_trip_in_order() {
        let (_dir, conn) = test_db();
        let fund_id = insert_fund(&conn, "family", "USD").unwrap();

        let later = ContributionEvent::new("bob", ts(8, 14), dec!(500)).unwrap();
        let earlier = ContributionEvent::new("alice", ts(7, 9), dec!(1000.50))
            .unwrap()
            .with_note("opening");
        insert_contribution(&conn, fund_id, &later).unwrap();
        insert_contribution(&conn, fund_id, &earlier).unwrap();

        let events = list_contributions(&conn, fund_id).unwrap();
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].contributor, "alice");
        assert_eq!(events[0].amount, dec!(1000.50));
        assert_eq!(events[0].timestamp, ts(7, 9));
        assert_eq!(events[0].note.as_deref(), Some("opening"));
        assert_eq!(events[1].contributor, "bob");
    }

    #[test]
    fn test_contribution_exists_ignores_time_of_day() {
        let (_dir, conn) = test_db();
        let fund_id = insert_fund(&conn, "family", "USD").unwrap();
        let e = ContributionEvent::new("alice", ts(7, 9), dec!(100)).unwrap();
        insert_contribution(&conn, fund_id, &e).unwrap();

        let same_day = ContributionEvent::new("alice", ts(7, 18), dec!(100.00)).unwrap();
        let next_day = ContributionEvent::new("alice", ts(8, 9), dec!(100)).unwrap();
        assert!(contribution_exists(&conn, fund_id, &same_day).unwrap());
        assert!(!contribution_exists(&conn, fund_id, &next_day).unwrap());
    }

    #[test]
    fn test_valuation_upsert_is_idempotent() {
        let (_dir, conn) = test_db();
        let fund_id = insert_fund(&conn, "family", "USD").unwrap();
        let date = NaiveDate::from_ymd_opt(2025, 9, 5).unwrap();

        upsert_valuation(&conn, fund_id, &ValuationPoint::new(date, dec!(9000)).unwrap(), "CSV").unwrap();
        upsert_valuation(&conn, fund_id, &ValuationPoint::new(date, dec!(9330.04)).unwrap(), "CSV").unwrap();

        let series = list_valuations(&conn, fund_id).unwrap();
        assert_eq!(series.len(), 1);
        assert_eq!(series.get(date), Some(dec!(9330.04)));
    }

    #[test]
    fn test_delete_contributions() {
        let (_dir, mut conn) = test_db();
        let fund_id = insert_fund(&conn, "family", "USD").unwrap();
        let e = ContributionEvent::new("alice", ts(7, 9), dec!(100)).unwrap();
        let id = insert_contribution(&conn, fund_id, &e).unwrap();
        insert_contribution(&conn, fund_id, &e).unwrap();

        assert_eq!(delete_contributions(&mut conn, fund_id, &[id]).unwrap(), 1);
        assert_eq!(list_contributions(&conn, fund_id).unwrap().len(), 1);
    }
}
