use anyhow::{Context, Result};
use colored::Colorize;
use serde::Serialize;
use std::path::Path;
use tracing::{info, warn};

use super::AppContext;
use crate::cli::formatters::{format_events_table, format_json, format_valuations_table};
use crate::cli::ImportCommands;
use crate::db::{self, ContributionEvent, ValuationPoint};
use crate::importers::{self, ParsedFile};
use crate::ingest;
use crate::valuation::ValuationSeries;

const PREVIEW_ROWS: usize = 10;

#[derive(Debug, Default, Serialize)]
struct ImportSummary {
    file: String,
    parsed: usize,
    skipped_rows: usize,
    duplicates_in_file: usize,
    already_recorded: usize,
    imported: usize,
    dry_run: bool,
}

impl ImportSummary {
    fn new(file: &Path, parsed: usize, skipped_rows: usize, dry_run: bool) -> Self {
        Self {
            file: file.display().to_string(),
            parsed,
            skipped_rows,
            dry_run,
            ..Self::default()
        }
    }

    fn print(&self, what: &str) {
        println!(
            "\n{} Found {} {} in {}",
            "✓".green().bold(),
            self.parsed,
            what,
            self.file
        );
        if self.skipped_rows > 0 {
            println!(
                "{} Skipped {} unreadable row(s) (run with FUNDNAV_LOG=warn for details)",
                "⚠".yellow().bold(),
                self.skipped_rows
            );
        }
        if self.duplicates_in_file > 0 {
            println!(
                "{} Dropped {} duplicate row(s) within the file",
                "⚠".yellow().bold(),
                self.duplicates_in_file
            );
        }
        if self.already_recorded > 0 {
            println!(
                "{} {} row(s) already recorded, skipped",
                "ℹ".blue().bold(),
                self.already_recorded
            );
        }
        if self.dry_run {
            println!("\n{} Dry run - no changes saved", "ℹ".blue().bold());
        } else {
            println!("{} Imported {} {}", "✓".green().bold(), self.imported, what);
        }
    }
}

pub fn dispatch_import(ctx: &AppContext, action: ImportCommands) -> Result<()> {
    match action {
        ImportCommands::Contributions {
            fund,
            file,
            dry_run,
        } => import_contributions(ctx, &fund, &file, dry_run),
        ImportCommands::Valuations {
            fund,
            file,
            dry_run,
        } => {
            let parsed = importers::parse_valuations_csv(&file)
                .with_context(|| format!("Error reading import file {}", file.display()))?;
            import_valuations(ctx, &fund, &file, parsed, "CSV", dry_run)
        }
        ImportCommands::Positions {
            fund,
            file,
            dry_run,
        } => {
            let parsed = importers::parse_positions_csv(&file)
                .with_context(|| format!("Error reading import file {}", file.display()))?;
            import_valuations(ctx, &fund, &file, parsed, "POSITIONS", dry_run)
        }
    }
}

fn import_contributions(ctx: &AppContext, fund: &str, file: &Path, dry_run: bool) -> Result<()> {
    info!("Importing contributions from: {:?}", file);
    let parsed = importers::parse_contributions_csv(file)
        .with_context(|| format!("Error reading import file {}", file.display()))?;

    let mut conn = ctx.connect()?;
    let (fund_id, fund_rec) = db::require_fund(&conn, fund)?;

    let mut summary = ImportSummary::new(file, parsed.records.len(), parsed.skipped, dry_run);
    let outcome = ingest::dedupe(parsed.records);
    summary.duplicates_in_file = outcome.removed.len();

    let mut fresh: Vec<ContributionEvent> = Vec::with_capacity(outcome.kept.len());
    for event in outcome.kept {
        if db::contribution_exists(&conn, fund_id, &event)? {
            warn!(
                "Skipping already recorded {} of {} by '{}' on {}",
                event.kind().as_str().to_lowercase(),
                event.amount,
                event.contributor,
                event.date()
            );
            summary.already_recorded += 1;
        } else {
            fresh.push(event);
        }
    }

    ctx.check_new_events(&conn, fund_id, &fresh)?;

    if !dry_run && !fresh.is_empty() {
        let tx = conn.transaction()?;
        for event in &fresh {
            db::insert_contribution(&tx, fund_id, event)?;
        }
        tx.commit()?;
        summary.imported = fresh.len();
        info!("Imported {} events into '{}'", fresh.len(), fund);
    }

    if ctx.json {
        println!("{}", format_json(&summary));
        return Ok(());
    }

    let preview: Vec<ContributionEvent> = fresh.iter().take(PREVIEW_ROWS).cloned().collect();
    if !preview.is_empty() {
        println!();
        print!("{}", format_events_table(&preview, &fund_rec.base_currency));
        if fresh.len() > PREVIEW_ROWS {
            println!("... and {} more", fresh.len() - PREVIEW_ROWS);
        }
    }
    summary.print("events");
    Ok(())
}

fn import_valuations(
    ctx: &AppContext,
    fund: &str,
    file: &Path,
    parsed: ParsedFile<ValuationPoint>,
    source: &str,
    dry_run: bool,
) -> Result<()> {
    info!("Importing valuations ({}) from: {:?}", source, file);
    let mut conn = ctx.connect()?;
    let (fund_id, fund_rec) = db::require_fund(&conn, fund)?;

    let mut summary = ImportSummary::new(file, parsed.records.len(), parsed.skipped, dry_run);
    if !dry_run && !parsed.records.is_empty() {
        let tx = conn.transaction()?;
        for point in &parsed.records {
            db::upsert_valuation(&tx, fund_id, point, source)?;
        }
        tx.commit()?;
        summary.imported = parsed.records.len();
        info!("Upserted {} valuations into '{}'", summary.imported, fund);
    }

    if ctx.json {
        println!("{}", format_json(&summary));
        return Ok(());
    }

    let preview: ValuationSeries = parsed
        .records
        .iter()
        .take(PREVIEW_ROWS)
        .map(|p| (p.date, p.total_value))
        .collect();
    if !preview.is_empty() {
        println!();
        print!("{}", format_valuations_table(&preview, &fund_rec.base_currency));
        if parsed.records.len() > PREVIEW_ROWS {
            println!("... and {} more", parsed.records.len() - PREVIEW_ROWS);
        }
    }
    summary.print("valuations");
    Ok(())
}
