use anyhow::{Context, Result};
use colored::Colorize;
use tracing::info;

use super::AppContext;
use crate::cli::formatters::{format_json, format_valuations_table};
use crate::cli::ValuationCommands;
use crate::db::{self, ValuationPoint};
use crate::utils::{format_money, parse_date, parse_decimal};

pub fn dispatch_valuations(ctx: &AppContext, action: ValuationCommands) -> Result<()> {
    let conn = ctx.connect()?;

    match action {
        ValuationCommands::Set { fund, date, value } => {
            let (fund_id, fund_rec) = db::require_fund(&conn, &fund)?;
            let date = parse_date(&date)?;
            let value = parse_decimal(&value).context("Invalid value")?;
            let point = ValuationPoint::new(date, value)?;

            db::upsert_valuation(&conn, fund_id, &point, "MANUAL")?;
            info!("Set valuation for '{}' on {} to {}", fund, date, value);

            if ctx.json {
                println!("{}", format_json(&point));
            } else {
                println!(
                    "{} {} valued at {} on {}",
                    "✓".green().bold(),
                    fund_rec.name.bold(),
                    format_money(point.total_value, &fund_rec.base_currency),
                    point.date
                );
            }
            Ok(())
        }
        ValuationCommands::List { fund } => {
            let (fund_id, fund_rec) = db::require_fund(&conn, &fund)?;
            let series = db::list_valuations(&conn, fund_id)?;
            if ctx.json {
                let points: Vec<ValuationPoint> = series.iter().collect();
                println!("{}", format_json(&points));
            } else {
                print!(
                    "{}",
                    format_valuations_table(&series, &fund_rec.base_currency)
                );

                if let (Some(first), Some(last)) = (series.first_date(), series.last_date()) {
                    let lookback = ctx.config.engine.lookback_days;
                    let gaps = series.uncovered_dates(first, last, lookback);
                    if let (Some(from), Some(to)) = (gaps.first(), gaps.last()) {
                        println!(
                            "\n{} {} day(s) between {} and {} have no valuation within {} days; events there are priced at the bootstrap NAV",
                            "⚠".yellow().bold(),
                            gaps.len(),
                            from,
                            to,
                            lookback
                        );
                    }
                }
            }
            Ok(())
        }
    }
}
