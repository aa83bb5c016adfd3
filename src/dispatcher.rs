//! Command dispatcher that routes parsed clap commands to their handlers.
//!
//! Handlers share an [`AppContext`] carrying the loaded configuration, the
//! resolved database location and the output mode.

mod events;
mod funds;
mod imports;
mod reports;
mod valuations;

use anyhow::{Context, Result};
use chrono::NaiveDate;
use rusqlite::Connection;
use rust_decimal::Decimal;
use std::path::PathBuf;
use tracing::{debug, warn};

use crate::cli::{Cli, Commands};
use crate::config::AppConfig;
use crate::db::{self, ContributionEvent};
use crate::engine::{process_events, NavEngine};
use crate::error::NavError;
use crate::ingest;
use crate::utils::{parse_decimal, parse_flexible_date};

pub struct AppContext {
    pub config: AppConfig,
    pub db_path: Option<PathBuf>,
    pub json: bool,
}

impl AppContext {
    /// `--db` wins over the config file, which wins over the default location
    pub fn new(config: AppConfig, db_override: Option<PathBuf>, json: bool) -> Self {
        let db_path = db_override.or_else(|| config.db_path.clone());
        Self {
            config,
            db_path,
            json,
        }
    }

    /// Open the database, creating the schema on first use
    pub fn connect(&self) -> Result<Connection> {
        db::init_database(self.db_path.clone())?;
        db::open_db(self.db_path.clone())
    }

    /// Load a fund's events and valuations into an engine. Stored duplicates
    /// are refused until they are resolved with `events dedupe --apply`.
    pub fn engine_for(&self, conn: &Connection, fund_id: i64, fund: &str) -> Result<NavEngine> {
        let events = db::list_contributions(conn, fund_id)?;
        ingest::ensure_no_duplicates(&events).with_context(|| {
            format!(
                "Fund '{}' has duplicate events; review with: fundnav events dedupe {}",
                fund, fund
            )
        })?;
        let valuations = db::list_valuations(conn, fund_id)?;
        debug!(
            "Loaded {} events and {} valuations for '{}'",
            events.len(),
            valuations.len(),
            fund
        );
        Ok(NavEngine::new(events, valuations, self.config.engine.clone()))
    }

    /// Replay the fund with `new_events` added and refuse them if any balance
    /// would go negative. Events that cannot be priced yet are accepted.
    pub fn check_new_events(
        &self,
        conn: &Connection,
        fund_id: i64,
        new_events: &[ContributionEvent],
    ) -> Result<()> {
        let mut events = db::list_contributions(conn, fund_id)?;
        events.extend_from_slice(new_events);
        let valuations = db::list_valuations(conn, fund_id)?;

        match process_events(&events, &valuations, &self.config.engine) {
            Ok(_) => Ok(()),
            Err(e @ NavError::NegativeUnits { .. }) => {
                Err(anyhow::Error::new(e).context("Event refused"))
            }
            Err(e) => {
                warn!("Accepted event(s) that cannot be replayed yet: {}", e);
                Ok(())
            }
        }
    }
}

/// Report date from `--at`, today when absent
fn resolve_as_of(at: Option<&str>) -> Result<NaiveDate> {
    match at {
        Some(s) => parse_flexible_date(s),
        None => Ok(chrono::Local::now().date_naive()),
    }
}

fn resolve_value(value: Option<&str>) -> Result<Option<Decimal>> {
    value
        .map(|v| parse_decimal(v).context("Invalid --value"))
        .transpose()
}

/// Route a parsed command line to its handler
pub fn dispatch(cli: Cli) -> Result<()> {
    let config = AppConfig::load(cli.config.as_deref())?;
    let ctx = AppContext::new(config, cli.db, cli.json);

    match cli.command {
        Commands::Fund { action } => funds::dispatch_fund(&ctx, action),
        Commands::Events { action } => events::dispatch_events(&ctx, action),
        Commands::Valuations { action } => valuations::dispatch_valuations(&ctx, action),
        Commands::Import { action } => imports::dispatch_import(&ctx, action),
        Commands::Ledger { fund, at } => {
            let as_of = at.as_deref().map(parse_flexible_date).transpose()?;
            reports::dispatch_ledger(&ctx, &fund, as_of)
        }
        Commands::Ownership { fund, at, value } => {
            let as_of = resolve_as_of(at.as_deref())?;
            let value = resolve_value(value.as_deref())?;
            reports::dispatch_ownership(&ctx, &fund, as_of, value)
        }
        Commands::GainLoss {
            fund,
            contributor,
            at,
            value,
        } => {
            let as_of = resolve_as_of(at.as_deref())?;
            let value = resolve_value(value.as_deref())?;
            reports::dispatch_gain_loss(&ctx, &fund, &contributor, as_of, value)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_db_override_precedence() {
        let config = AppConfig {
            db_path: Some(PathBuf::from("/from/config.db")),
            ..AppConfig::default()
        };
        let ctx = AppContext::new(config.clone(), Some(PathBuf::from("cli.db")), false);
        assert_eq!(ctx.db_path, Some(PathBuf::from("cli.db")));

        let ctx = AppContext::new(config, None, false);
        assert_eq!(ctx.db_path, Some(PathBuf::from("/from/config.db")));
    }

    #[test]
    fn test_resolve_helpers() {
        assert_eq!(
            resolve_as_of(Some("2025-09")).unwrap(),
            NaiveDate::from_ymd_opt(2025, 9, 30).unwrap()
        );
        assert!(resolve_as_of(Some("soon")).is_err());
        assert_eq!(resolve_value(Some("12,000")).unwrap(), Some(dec!(12000)));
        assert_eq!(resolve_value(None).unwrap(), None);
    }
}
