use clap::{Parser, Subcommand};
use std::path::PathBuf;

pub mod formatters;

#[derive(Parser, Debug)]
#[command(name = "fundnav")]
#[command(version, about = "Unit-based NAV accounting for small pooled funds")]
#[command(
    long_about = "Track contributions and withdrawals to a shared fund, issue units at the prevailing NAV, and report each contributor's ownership and gain/loss."
)]
pub struct Cli {
    /// Disable colorized/ANSI output
    #[arg(long = "no-color", global = true)]
    pub no_color: bool,

    /// Output results in JSON format
    #[arg(long = "json", global = true)]
    pub json: bool,

    /// Path to a TOML config file
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Path to the SQLite database (default: ~/.fundnav/data.db)
    #[arg(long, global = true, value_name = "PATH")]
    pub db: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Fund management
    Fund {
        #[command(subcommand)]
        action: FundCommands,
    },

    /// Contribution and withdrawal events
    Events {
        #[command(subcommand)]
        action: EventCommands,
    },

    /// Daily fund valuations
    Valuations {
        #[command(subcommand)]
        action: ValuationCommands,
    },

    /// Import events, valuations or position snapshots from CSV
    Import {
        #[command(subcommand)]
        action: ImportCommands,
    },

    /// Show the unit issuance ledger
    Ledger {
        /// Fund name
        fund: String,

        /// Only events on or before this date (YYYY-MM-DD, YYYY-MM or YYYY)
        #[arg(long)]
        at: Option<String>,
    },

    /// Show every contributor's units, ownership and gain/loss
    Ownership {
        /// Fund name
        fund: String,

        /// Report date (YYYY-MM-DD, YYYY-MM or YYYY; default: today)
        #[arg(long)]
        at: Option<String>,

        /// Fund value to report against instead of the stored valuation
        #[arg(long)]
        value: Option<String>,
    },

    /// Show one contributor's gain or loss
    GainLoss {
        /// Fund name
        fund: String,

        /// Contributor name
        contributor: String,

        /// Report date (YYYY-MM-DD, YYYY-MM or YYYY; default: today)
        #[arg(long)]
        at: Option<String>,

        /// Fund value to report against instead of the stored valuation
        #[arg(long)]
        value: Option<String>,
    },
}

#[derive(Subcommand, Debug)]
pub enum FundCommands {
    /// Create a fund
    Add {
        /// Fund name
        name: String,

        /// Base currency (default from config, USD otherwise)
        #[arg(long)]
        currency: Option<String>,
    },

    /// List funds
    List,
}

#[derive(Subcommand, Debug)]
pub enum EventCommands {
    /// Record a contribution (positive amount) or withdrawal (negative amount)
    #[command(allow_negative_numbers = true)]
    Add {
        /// Fund name
        fund: String,

        /// Contributor name
        contributor: String,

        /// Amount in the fund currency; negative for withdrawals
        amount: String,

        /// Event time: YYYY-MM-DD[ HH:MM[:SS]]
        timestamp: String,

        /// Free-form note
        #[arg(long)]
        note: Option<String>,
    },

    /// List a fund's events
    List {
        /// Fund name
        fund: String,
    },

    /// Find duplicate events (same contributor, date, amount and direction)
    Dedupe {
        /// Fund name
        fund: String,

        /// Delete every duplicate except the first occurrence
        #[arg(long)]
        apply: bool,
    },
}

#[derive(Subcommand, Debug)]
pub enum ValuationCommands {
    /// Set (or replace) the total fund value for a date
    Set {
        /// Fund name
        fund: String,

        /// Valuation date (YYYY-MM-DD)
        date: String,

        /// Total market value of the fund
        value: String,
    },

    /// List a fund's valuations
    List {
        /// Fund name
        fund: String,
    },
}

#[derive(Subcommand, Debug)]
pub enum ImportCommands {
    /// Contributions CSV: contributor,timestamp,amount[,type][,note]
    Contributions {
        /// Fund name
        fund: String,

        /// Path to the CSV file
        file: PathBuf,

        /// Preview only, don't save to database
        #[arg(short, long)]
        dry_run: bool,
    },

    /// Valuations CSV: date,total_value
    Valuations {
        /// Fund name
        fund: String,

        /// Path to the CSV file
        file: PathBuf,

        /// Preview only, don't save to database
        #[arg(short, long)]
        dry_run: bool,
    },

    /// Position snapshot CSV: date,ticker,market_value (summed per date)
    Positions {
        /// Fund name
        fund: String,

        /// Path to the CSV file
        file: PathBuf,

        /// Preview only, don't save to database
        #[arg(short, long)]
        dry_run: bool,
    },
}
