use anyhow::Result;
use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::Serialize;

use super::AppContext;
use crate::cli::formatters::{
    format_gain_loss, format_json, format_ledger_table, format_ownership_table,
};
use crate::db;
use crate::engine::LedgerEntry;
use crate::reports::{build_gain_loss_report, build_ownership_report, load_or_build_ownership};

pub fn dispatch_ledger(ctx: &AppContext, fund: &str, as_of: Option<NaiveDate>) -> Result<()> {
    let conn = ctx.connect()?;
    let (fund_id, fund_rec) = db::require_fund(&conn, fund)?;
    let engine = ctx.engine_for(&conn, fund_id, fund)?;

    let ledger = match as_of {
        Some(date) => engine.ledger_as_of(date)?,
        None => engine.ledger()?,
    };

    if ctx.json {
        #[derive(Serialize)]
        struct LedgerJson<'a> {
            fund: &'a str,
            as_of: Option<NaiveDate>,
            total_units: Decimal,
            entries: &'a [LedgerEntry],
        }
        println!(
            "{}",
            format_json(&LedgerJson {
                fund: &fund_rec.name,
                as_of,
                total_units: ledger.state().total_units(),
                entries: ledger.entries(),
            })
        );
    } else {
        print!(
            "{}",
            format_ledger_table(ledger.entries(), &fund_rec.base_currency)
        );
    }
    Ok(())
}

pub fn dispatch_ownership(
    ctx: &AppContext,
    fund: &str,
    as_of: NaiveDate,
    value: Option<Decimal>,
) -> Result<()> {
    let conn = ctx.connect()?;
    let (fund_id, fund_rec) = db::require_fund(&conn, fund)?;
    let engine = ctx.engine_for(&conn, fund_id, fund)?;

    let report = match value {
        Some(v) => build_ownership_report(
            &fund_rec.name,
            &fund_rec.base_currency,
            &engine,
            as_of,
            Some(v),
        )?,
        None => load_or_build_ownership(
            &conn,
            fund_id,
            &fund_rec.name,
            &fund_rec.base_currency,
            &engine,
            as_of,
        )?,
    };

    if ctx.json {
        println!("{}", format_json(&report));
    } else {
        print!("{}", format_ownership_table(&report));
    }
    Ok(())
}

pub fn dispatch_gain_loss(
    ctx: &AppContext,
    fund: &str,
    contributor: &str,
    as_of: NaiveDate,
    value: Option<Decimal>,
) -> Result<()> {
    let conn = ctx.connect()?;
    let (fund_id, fund_rec) = db::require_fund(&conn, fund)?;
    let engine = ctx.engine_for(&conn, fund_id, fund)?;

    let report = build_gain_loss_report(
        &fund_rec.name,
        &fund_rec.base_currency,
        &engine,
        contributor,
        as_of,
        value,
    )?;

    if ctx.json {
        println!("{}", format_json(&report));
    } else {
        print!("{}", format_gain_loss(&report));
    }
    Ok(())
}
