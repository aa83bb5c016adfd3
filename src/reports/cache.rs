//! Ownership report cache
//!
//! Reports are stored per `(fund, as_of_date)` alongside a fingerprint of the
//! inputs that produced them. Writes through [`crate::db`] already drop a
//! fund's rows; the fingerprint check additionally catches edits made behind
//! the application's back and engine config changes.

use anyhow::{Context, Result};
use blake3::Hasher;
use chrono::NaiveDate;
use rusqlite::{params, Connection, OptionalExtension};
use tracing::{debug, info};

use super::ownership::{build_ownership_report, OwnershipReport};
use crate::config::EngineConfig;
use crate::db::models::ContributionEvent;
use crate::engine::NavEngine;
use crate::valuation::ValuationSeries;

/// BLAKE3 digest of everything an ownership report depends on
pub fn fingerprint(
    events: &[ContributionEvent],
    valuations: &ValuationSeries,
    config: &EngineConfig,
) -> String {
    let mut hasher = Hasher::new();
    hasher.update(b"events\n");
    for e in events {
        let line = format!(
            "{}|{}|{}\n",
            e.contributor,
            e.timestamp.format("%Y-%m-%dT%H:%M:%S%.f"),
            e.amount.normalize()
        );
        hasher.update(line.as_bytes());
    }
    hasher.update(b"valuations\n");
    for p in valuations.iter() {
        hasher.update(format!("{}|{}\n", p.date, p.total_value.normalize()).as_bytes());
    }
    hasher.update(
        format!(
            "config|{}|{}|{}\n",
            config.lookback_days,
            config.bootstrap_nav.normalize(),
            config.dust_tolerance.normalize()
        )
        .as_bytes(),
    );
    hasher.finalize().to_hex().to_string()
}

/// Cached report for `(fund_id, as_of)` if its fingerprint still matches
pub fn get_cached_report(
    conn: &Connection,
    fund_id: i64,
    as_of: NaiveDate,
    fingerprint: &str,
) -> Result<Option<OwnershipReport>> {
    let row: Option<(String, String)> = conn
        .query_row(
            "SELECT fingerprint, payload FROM ownership_cache
             WHERE fund_id = ?1 AND as_of_date = ?2",
            params![fund_id, as_of],
            |row| Ok((row.get(0)?, row.get(1)?)),
        )
        .optional()?;

    match row {
        Some((stored, payload)) if stored == fingerprint => {
            let report = serde_json::from_str(&payload)
                .context("Failed to decode cached ownership report")?;
            debug!("Cache hit for fund {} as of {}", fund_id, as_of);
            Ok(Some(report))
        }
        Some(_) => {
            debug!("Stale cache row for fund {} as of {}", fund_id, as_of);
            Ok(None)
        }
        None => Ok(None),
    }
}

pub fn store_report(
    conn: &Connection,
    fund_id: i64,
    fingerprint: &str,
    report: &OwnershipReport,
) -> Result<()> {
    let payload = serde_json::to_string(report)?;
    conn.execute(
        "INSERT INTO ownership_cache (fund_id, as_of_date, fingerprint, payload)
         VALUES (?1, ?2, ?3, ?4)
         ON CONFLICT(fund_id, as_of_date) DO UPDATE SET
            fingerprint = excluded.fingerprint,
            payload = excluded.payload,
            created_at = datetime('now')",
        params![fund_id, report.as_of, fingerprint, payload],
    )?;
    Ok(())
}

/// Ownership report at the stored market value, served from the cache when
/// the inputs are unchanged. Reports against an ad-hoc value are never cached.
pub fn load_or_build_ownership(
    conn: &Connection,
    fund_id: i64,
    fund: &str,
    currency: &str,
    engine: &NavEngine,
    as_of: NaiveDate,
) -> Result<OwnershipReport> {
    let fp = fingerprint(engine.events(), engine.valuations(), engine.config());
    if let Some(report) = get_cached_report(conn, fund_id, as_of, &fp)? {
        return Ok(report);
    }

    let report = build_ownership_report(fund, currency, engine, as_of, None)?;
    store_report(conn, fund_id, &fp, &report)?;
    info!("Cached ownership report for '{}' as of {}", fund, as_of);
    Ok(report)
}
