//! Output formatting module for CLI display
//!
//! This module handles all terminal output formatting, separating
//! the concerns of data calculation from presentation.

use colored::Colorize;
use rust_decimal::Decimal;
use serde::Serialize;
use tabled::{
    settings::{object::Columns, Alignment, Style},
    Table, Tabled,
};

use crate::db::models::{ContributionEvent, Fund};
use crate::engine::{LedgerEntry, Pricing};
use crate::ingest::DuplicateGroup;
use crate::reports::{GainLossReport, OwnershipReport, ValueSource};
use crate::utils::{format_money, format_nav, format_pct, format_units};
use crate::valuation::ValuationSeries;

/// Pretty JSON for `--json` output
pub fn format_json<T: Serialize>(value: &T) -> String {
    serde_json::to_string_pretty(value)
        .unwrap_or_else(|e| format!(r#"{{"error": "JSON serialization failed: {}"}}"#, e))
}

fn colored_money(value: Decimal, currency: &str) -> String {
    let text = format_money(value, currency);
    if value >= Decimal::ZERO {
        text.green().to_string()
    } else {
        text.red().to_string()
    }
}

fn describe_source(source: &ValueSource) -> String {
    match source {
        ValueSource::Override => "supplied value".to_string(),
        ValueSource::Valuation { date } => format!("valuation of {}", date),
        ValueSource::Unavailable => "no valuation".to_string(),
    }
}

pub fn format_funds_table(funds: &[Fund]) -> String {
    if funds.is_empty() {
        return format!(
            "{} No funds yet\nCreate one with: {} fund add <name>\n",
            "ℹ".blue().bold(),
            "fundnav".bold()
        );
    }

    #[derive(Tabled)]
    struct FundRow {
        #[tabled(rename = "Fund")]
        name: String,
        #[tabled(rename = "Currency")]
        currency: String,
        #[tabled(rename = "Created")]
        created: String,
    }

    let rows: Vec<FundRow> = funds
        .iter()
        .map(|f| FundRow {
            name: f.name.clone(),
            currency: f.base_currency.clone(),
            created: f.created_at.format("%Y-%m-%d").to_string(),
        })
        .collect();

    let mut table = Table::new(&rows);
    table.with(Style::rounded());
    format!("{}\n", table)
}

pub fn format_events_table(events: &[ContributionEvent], currency: &str) -> String {
    if events.is_empty() {
        return format!("{} No events recorded\n", "ℹ".blue().bold());
    }

    #[derive(Tabled)]
    struct EventRow {
        #[tabled(rename = "ID")]
        id: String,
        #[tabled(rename = "Timestamp")]
        timestamp: String,
        #[tabled(rename = "Contributor")]
        contributor: String,
        #[tabled(rename = "Type")]
        kind: String,
        #[tabled(rename = "Amount")]
        amount: String,
        #[tabled(rename = "Note")]
        note: String,
    }

    let rows: Vec<EventRow> = events
        .iter()
        .map(|e| EventRow {
            id: e.id.map(|i| i.to_string()).unwrap_or_default(),
            timestamp: e.timestamp.format("%Y-%m-%d %H:%M:%S").to_string(),
            contributor: e.contributor.clone(),
            kind: e.kind().as_str().to_string(),
            amount: colored_money(e.amount, currency),
            note: e.note.clone().unwrap_or_default(),
        })
        .collect();

    let mut table = Table::new(&rows);
    table.with(Style::rounded());
    table.modify(Columns::new(4..5), Alignment::right());
    format!("{}\n", table)
}

pub fn format_valuations_table(series: &ValuationSeries, currency: &str) -> String {
    if series.is_empty() {
        return format!("{} No valuations recorded\n", "ℹ".blue().bold());
    }

    #[derive(Tabled)]
    struct ValuationRow {
        #[tabled(rename = "Date")]
        date: String,
        #[tabled(rename = "Total Value")]
        value: String,
    }

    let rows: Vec<ValuationRow> = series
        .iter()
        .map(|p| ValuationRow {
            date: p.date.to_string(),
            value: format_money(p.total_value, currency),
        })
        .collect();

    let mut table = Table::new(&rows);
    table.with(Style::rounded());
    table.modify(Columns::new(1..), Alignment::right());
    format!("{}\n", table)
}

pub fn format_ledger_table(entries: &[LedgerEntry], currency: &str) -> String {
    if entries.is_empty() {
        return format!("{} No events in range\n", "ℹ".blue().bold());
    }

    #[derive(Tabled)]
    struct LedgerRow {
        #[tabled(rename = "#")]
        seq: usize,
        #[tabled(rename = "Timestamp")]
        timestamp: String,
        #[tabled(rename = "Contributor")]
        contributor: String,
        #[tabled(rename = "Amount")]
        amount: String,
        #[tabled(rename = "Priced From")]
        pricing: String,
        #[tabled(rename = "NAV")]
        nav: String,
        #[tabled(rename = "Units")]
        units: String,
        #[tabled(rename = "Holder Units")]
        holder_units: String,
        #[tabled(rename = "Fund Units")]
        fund_units: String,
    }

    let rows: Vec<LedgerRow> = entries
        .iter()
        .map(|e| LedgerRow {
            seq: e.sequence + 1,
            timestamp: e.event.timestamp.format("%Y-%m-%d %H:%M").to_string(),
            contributor: e.event.contributor.clone(),
            amount: colored_money(e.event.amount, currency),
            pricing: match e.pricing {
                Pricing::Bootstrap => "bootstrap".to_string(),
                Pricing::PriorValuation { date, .. } => date.to_string(),
                Pricing::Unpriced => "UNPRICED".yellow().bold().to_string(),
            },
            nav: format_nav(e.nav),
            units: format_units(e.units_issued),
            holder_units: format_units(e.contributor_units_after),
            fund_units: format_units(e.total_units_after),
        })
        .collect();

    let unpriced = entries.iter().filter(|e| e.is_unpriced()).count();

    let mut table = Table::new(&rows);
    table.with(Style::modern());
    table.modify(Columns::new(3..4), Alignment::right());
    table.modify(Columns::new(5..), Alignment::right());

    let mut output = format!("{}\n", table);
    if unpriced > 0 {
        output.push_str(&format!(
            "\n{} {} event(s) had no valuation in the lookback window and used the bootstrap NAV\n",
            "⚠".yellow().bold(),
            unpriced
        ));
    }
    output
}

/// Format an ownership report for terminal table output
pub fn format_ownership_table(report: &OwnershipReport) -> String {
    let mut output = format!(
        "\n{} {} as of {}\n\n",
        "📊".cyan().bold(),
        report.fund.bold(),
        report.as_of
    );

    if report.rows.is_empty() {
        output.push_str(&format!("{} No contributors yet\n", "ℹ".blue().bold()));
        return output;
    }

    #[derive(Tabled)]
    struct HoldingRow {
        #[tabled(rename = "Contributor")]
        contributor: String,
        #[tabled(rename = "Units")]
        units: String,
        #[tabled(rename = "Ownership")]
        pct: String,
        #[tabled(rename = "Net Contributed")]
        net: String,
        #[tabled(rename = "Value")]
        value: String,
        #[tabled(rename = "Gain/Loss")]
        gain_loss: String,
    }

    let currency = report.currency.as_str();
    let rows: Vec<HoldingRow> = report
        .rows
        .iter()
        .map(|r| HoldingRow {
            contributor: r.contributor.clone(),
            units: format_units(r.units),
            pct: format_pct(r.ownership_pct),
            net: format_money(r.net_contribution, currency),
            value: format_money(r.value, currency),
            gain_loss: colored_money(r.gain_loss, currency),
        })
        .collect();

    let mut table = Table::new(&rows);
    table.with(Style::modern());
    // Right-align all columns except Contributor (0)
    table.modify(Columns::new(1..), Alignment::right());
    output.push_str(&table.to_string());

    output.push_str(&format!("\n\n{} Summary", "━".repeat(60).bright_black()));
    output.push_str(&format!(
        "\n{:<20} {} ({})",
        "Fund Value:".bold(),
        format_money(report.total_value, currency),
        describe_source(&report.value_source)
    ));
    output.push_str(&format!(
        "\n{:<20} {}",
        "Total Units:".bold(),
        format_units(report.total_units)
    ));
    if let Some(nav) = report.nav_per_unit {
        output.push_str(&format!("\n{:<20} {}", "NAV / Unit:".bold(), format_nav(nav)));
    }
    output.push_str(&format!(
        "\n{:<20} {}",
        "Net Contributed:".bold(),
        format_money(report.total_net_contribution(), currency)
    ));
    output.push_str(&format!(
        "\n{:<20} {}\n",
        "Total Gain/Loss:".bold(),
        colored_money(report.total_gain_loss(), currency)
    ));

    if report.unpriced_events > 0 {
        output.push_str(&format!(
            "\n{} {} event(s) were issued at the bootstrap NAV (see: fundnav ledger {})\n",
            "⚠".yellow().bold(),
            report.unpriced_events,
            report.fund
        ));
    }
    output
}

pub fn format_gain_loss(report: &GainLossReport) -> String {
    let currency = report.currency.as_str();
    let mut output = format!(
        "\n{} {} in {} as of {}\n",
        "💰".cyan().bold(),
        report.contributor.bold(),
        report.fund,
        report.as_of
    );
    output.push_str(&format!("\n{:<20} {}", "Units:".bold(), format_units(report.units)));
    output.push_str(&format!(
        "\n{:<20} {}",
        "Ownership:".bold(),
        format_pct(report.ownership_pct)
    ));
    output.push_str(&format!(
        "\n{:<20} {} ({})",
        "Fund Value:".bold(),
        format_money(report.total_value, currency),
        describe_source(&report.value_source)
    ));
    output.push_str(&format!(
        "\n{:<20} {}",
        "Share of Value:".bold(),
        format_money(report.value, currency)
    ));
    output.push_str(&format!(
        "\n{:<20} {}",
        "Net Contributed:".bold(),
        format_money(report.net_contribution, currency)
    ));
    output.push_str(&format!(
        "\n{:<20} {}\n",
        "Gain/Loss:".bold(),
        colored_money(report.gain_loss, currency)
    ));
    output
}

pub fn format_duplicates(groups: &[DuplicateGroup], currency: &str) -> String {
    if groups.is_empty() {
        return format!("{} No duplicate events found\n", "✓".green().bold());
    }

    #[derive(Tabled)]
    struct DuplicateRow {
        #[tabled(rename = "Date")]
        date: String,
        #[tabled(rename = "Contributor")]
        contributor: String,
        #[tabled(rename = "Amount")]
        amount: String,
        #[tabled(rename = "Copies")]
        copies: usize,
    }

    let rows: Vec<DuplicateRow> = groups
        .iter()
        .map(|g| DuplicateRow {
            date: g.key.date.to_string(),
            contributor: g.key.contributor.clone(),
            amount: format_money(g.key.amount, currency),
            copies: g.indices.len(),
        })
        .collect();

    let mut table = Table::new(&rows);
    table.with(Style::rounded());
    table.modify(Columns::new(2..), Alignment::right());
    format!(
        "{} {} duplicate group(s)\n{}\n",
        "⚠".yellow().bold(),
        groups.len(),
        table
    )
}
