#![allow(dead_code)]

use anyhow::{bail, Result};
use assert_cmd::cargo;
use serde_json::Value;
use std::path::PathBuf;
use std::process::{Command, Output};
use tempfile::TempDir;

pub fn base_cmd(home: &TempDir) -> Command {
    let mut cmd = Command::new(cargo::cargo_bin!("fundnav"));
    cmd.env("HOME", home.path());
    // Point the config lookup at a file that does not exist so defaults apply
    cmd.env("FUNDNAV_CONFIG", home.path().join("config.toml"));
    cmd.env_remove("FUNDNAV_LOOKBACK_DAYS");
    cmd.env_remove("FUNDNAV_LOG");
    cmd.arg("--no-color");
    cmd
}

pub fn run_cmd(home: &TempDir, args: &[&str]) -> Result<Output> {
    let mut cmd = base_cmd(home);
    cmd.args(args);
    let output = cmd.output()?;
    if !output.status.success() {
        bail!(
            "command failed: {:?}\nstdout: {}\nstderr: {}",
            args,
            String::from_utf8_lossy(&output.stdout),
            String::from_utf8_lossy(&output.stderr)
        );
    }
    Ok(output)
}

pub fn run_cmd_json(home: &TempDir, args: &[&str]) -> Result<Value> {
    let mut full = vec!["--json"];
    full.extend_from_slice(args);
    let output = run_cmd(home, &full)?;
    let stdout = String::from_utf8(output.stdout)?;
    Ok(serde_json::from_str(&stdout)?)
}

pub fn write_file(home: &TempDir, name: &str, content: &str) -> PathBuf {
    let path = home.path().join(name);
    std::fs::write(&path, content).expect("failed to write test file");
    path
}

pub fn add_fund(home: &TempDir, name: &str) -> Result<()> {
    run_cmd(home, &["fund", "add", name])?;
    Ok(())
}

pub fn add_event(
    home: &TempDir,
    fund: &str,
    contributor: &str,
    amount: &str,
    timestamp: &str,
) -> Result<()> {
    run_cmd(home, &["events", "add", fund, contributor, amount, timestamp])?;
    Ok(())
}

pub fn set_valuation(home: &TempDir, fund: &str, date: &str, value: &str) -> Result<()> {
    run_cmd(home, &["valuations", "set", fund, date, value])?;
    Ok(())
}

pub fn events_json(home: &TempDir, fund: &str) -> Result<Vec<Value>> {
    let value = run_cmd_json(home, &["events", "list", fund])?;
    Ok(value.as_array().cloned().unwrap_or_default())
}

pub fn ledger_json(home: &TempDir, fund: &str) -> Result<Value> {
    run_cmd_json(home, &["ledger", fund])
}

pub fn ownership_json(home: &TempDir, fund: &str, extra: &[&str]) -> Result<Value> {
    let mut args = vec!["ownership", fund];
    args.extend_from_slice(extra);
    run_cmd_json(home, &args)
}

/// Decimals are serialized as strings
pub fn dec_field(value: &Value, field: &str) -> rust_decimal::Decimal {
    value[field]
        .as_str()
        .unwrap_or_else(|| panic!("field {} is not a decimal string: {}", field, value))
        .parse()
        .expect("invalid decimal")
}
