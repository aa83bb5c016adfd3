use anyhow::{anyhow, Context, Result};
use colored::Colorize;
use serde::Serialize;
use tracing::info;

use super::AppContext;
use crate::cli::formatters::{format_duplicates, format_events_table, format_json};
use crate::cli::EventCommands;
use crate::db::{self, ContributionEvent};
use crate::ingest::{self, DuplicateKey};
use crate::utils::{format_money, parse_decimal, parse_timestamp};

pub fn dispatch_events(ctx: &AppContext, action: EventCommands) -> Result<()> {
    match action {
        EventCommands::Add {
            fund,
            contributor,
            amount,
            timestamp,
            note,
        } => {
            let conn = ctx.connect()?;
            let (fund_id, fund_rec) = db::require_fund(&conn, &fund)?;

            let amount = parse_decimal(&amount).context("Invalid amount")?;
            let timestamp = parse_timestamp(&timestamp)?;
            let mut event = ContributionEvent::new(contributor, timestamp, amount)?;
            if let Some(n) = note {
                event = event.with_note(n);
            }

            if db::contribution_exists(&conn, fund_id, &event)? {
                let key = DuplicateKey::of(&event);
                return Err(anyhow!(
                    "An identical {} of {} by '{}' on {} is already recorded",
                    key.kind.as_str().to_lowercase(),
                    key.amount,
                    key.contributor,
                    key.date
                ));
            }

            ctx.check_new_events(&conn, fund_id, std::slice::from_ref(&event))?;
            let id = db::insert_contribution(&conn, fund_id, &event)?;
            event.id = Some(id);
            info!("Recorded event {} in '{}'", id, fund);

            if ctx.json {
                println!("{}", format_json(&event));
            } else {
                println!(
                    "{} Recorded {} of {} by {} at {}",
                    "✓".green().bold(),
                    event.kind().as_str().to_lowercase(),
                    format_money(event.amount.abs(), &fund_rec.base_currency),
                    event.contributor.bold(),
                    event.timestamp
                );
            }
            Ok(())
        }

        EventCommands::List { fund } => {
            let conn = ctx.connect()?;
            let (fund_id, fund_rec) = db::require_fund(&conn, &fund)?;
            let events = db::list_contributions(&conn, fund_id)?;
            if ctx.json {
                println!("{}", format_json(&events));
            } else {
                print!("{}", format_events_table(&events, &fund_rec.base_currency));
            }
            Ok(())
        }

        EventCommands::Dedupe { fund, apply } => {
            let mut conn = ctx.connect()?;
            let (fund_id, fund_rec) = db::require_fund(&conn, &fund)?;
            let events = db::list_contributions(&conn, fund_id)?;
            let groups = ingest::find_duplicates(&events);

            let outcome = ingest::dedupe(events);
            let ids: Vec<i64> = outcome.removed.iter().filter_map(|e| e.id).collect();
            let deleted = if apply && !ids.is_empty() {
                db::delete_contributions(&mut conn, fund_id, &ids)?
            } else {
                0
            };

            if ctx.json {
                #[derive(Serialize)]
                struct DedupeJson<'a> {
                    duplicate_groups: usize,
                    duplicates: &'a [ContributionEvent],
                    deleted: usize,
                    applied: bool,
                }
                println!(
                    "{}",
                    format_json(&DedupeJson {
                        duplicate_groups: groups.len(),
                        duplicates: &outcome.removed,
                        deleted,
                        applied: apply,
                    })
                );
                return Ok(());
            }

            print!("{}", format_duplicates(&groups, &fund_rec.base_currency));
            if groups.is_empty() {
                return Ok(());
            }
            if apply {
                println!(
                    "{} Deleted {} duplicate event(s), kept the first of each group",
                    "✓".green().bold(),
                    deleted
                );
            } else {
                println!(
                    "\n{} Re-run with --apply to delete {} duplicate(s)",
                    "ℹ".blue().bold(),
                    ids.len()
                );
            }
            Ok(())
        }
    }
}
