//! fundnav - unit-based NAV accounting for small pooled funds
//!
//! Contributors pay cash into a shared fund and receive units priced at the
//! fund's net asset value per unit. This library provides the NAV engine, a
//! SQLite store for events and valuations, CSV importers, and the ownership
//! and gain/loss reports built on top of them.

pub mod cli;
pub mod config;
pub mod db;
pub mod dispatcher;
pub mod engine;
pub mod error;
pub mod importers;
pub mod ingest;
pub mod reports;
pub mod utils;
pub mod valuation;
