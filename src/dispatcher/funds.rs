use anyhow::Result;
use colored::Colorize;
use tracing::info;

use super::AppContext;
use crate::cli::formatters::{format_funds_table, format_json};
use crate::cli::FundCommands;
use crate::db;

pub fn dispatch_fund(ctx: &AppContext, action: FundCommands) -> Result<()> {
    let conn = ctx.connect()?;

    match action {
        FundCommands::Add { name, currency } => {
            let currency = currency.unwrap_or_else(|| ctx.config.default_currency.clone());
            let id = db::insert_fund(&conn, &name, &currency)?;
            info!("Created fund '{}' (id {})", name, id);

            if ctx.json {
                let fund = db::get_fund_by_name(&conn, &name)?;
                println!("{}", format_json(&fund));
            } else {
                println!(
                    "{} Created fund {} ({})",
                    "✓".green().bold(),
                    name.trim().bold(),
                    currency.trim().to_uppercase()
                );
            }
            Ok(())
        }
        FundCommands::List => {
            let funds = db::list_funds(&conn)?;
            if ctx.json {
                println!("{}", format_json(&funds));
            } else {
                print!("{}", format_funds_table(&funds));
            }
            Ok(())
        }
    }
}
