//! CLI Entry Point for slot-daq
//!
//! Builds the configured slot device and runs one command against it:
//! - `show`: print the published properties as JSON
//! - `select`: move through one or more slots, waiting for each to settle
//! - `rename`: rename slots and print the resulting names
//!
//! # Usage
//!
//! ```bash
//! slot_daq --config config/slot_daq.toml select 3 5
//! slot_daq rename 1=Luminance 2=Red
//! SLOT_DAQ_DRIVER__CONFIG__MODE=realistic slot_daq select 7
//! ```

use anyhow::{anyhow, Context, Result};
use clap::{Parser, Subcommand};
use slot_core::DEFAULT_TIMEOUT_SECS;
use slot_daq::{config::AppConfig, tracing_init, SlotApp};
use std::path::PathBuf;
use std::time::Duration;

#[derive(Parser)]
#[command(name = "slot_daq")]
#[command(about = "Discrete position control for filter wheels and turrets", long_about = None)]
struct Cli {
    /// Configuration file
    #[arg(short, long, default_value = slot_daq::config::DEFAULT_CONFIG_PATH)]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the published properties as JSON
    Show,

    /// Move to each slot in turn
    Select {
        /// Target slots
        #[arg(required = true)]
        slots: Vec<i32>,

        /// Seconds to wait for each move to settle
        #[arg(long, default_value_t = u64::from(DEFAULT_TIMEOUT_SECS))]
        timeout: u64,
    },

    /// Rename slots
    Rename {
        /// Entries of the form SLOT=NAME (slots start at 1)
        #[arg(required = true, value_parser = parse_rename_entry)]
        entries: Vec<(usize, String)>,
    },
}

fn parse_rename_entry(entry: &str) -> Result<(usize, String)> {
    let (slot, name) = entry
        .split_once('=')
        .ok_or_else(|| anyhow!("expected SLOT=NAME, got '{entry}'"))?;
    let slot = slot
        .trim()
        .parse()
        .with_context(|| format!("invalid slot number '{slot}'"))?;
    Ok((slot, name.to_string()))
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = AppConfig::load_from(&cli.config)
        .with_context(|| format!("failed to load {}", cli.config.display()))?;
    tracing_init::init_from_config(&config).map_err(|e| anyhow!(e))?;
    tracing::debug!(app = %config.application.name, config = %cli.config.display(), "Configuration loaded");

    let app = SlotApp::build(&config).await?;

    let result = match cli.command {
        Commands::Show => show(&app),
        Commands::Select { slots, timeout } => {
            select(&app, &slots, Duration::from_secs(timeout)).await
        }
        Commands::Rename { entries } => rename(&app, &entries).await,
    };

    app.shutdown();
    result
}

fn show(app: &SlotApp) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(&app.snapshot())?);
    Ok(())
}

async fn select(app: &SlotApp, slots: &[i32], wait: Duration) -> Result<()> {
    for &slot in slots {
        let reached = app.select(slot, wait).await?;
        let name = app
            .controller()
            .labels()
            .and_then(|labels| usize::try_from(reached - 1).ok().and_then(|i| labels.get(i).cloned()))
            .unwrap_or_default();
        println!("{reached}\t{name}");
    }
    Ok(())
}

async fn rename(app: &SlotApp, entries: &[(usize, String)]) -> Result<()> {
    let labels = app.rename(entries).await?;
    for (index, label) in labels.iter().enumerate() {
        println!("{}\t{label}", index + 1);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_rename_entry() {
        assert_eq!(
            parse_rename_entry("3=Hydrogen Alpha").unwrap(),
            (3, "Hydrogen Alpha".to_string())
        );
        assert_eq!(parse_rename_entry("1=").unwrap(), (1, String::new()));
        assert!(parse_rename_entry("Red").is_err());
        assert!(parse_rename_entry("x=Red").is_err());
    }

    #[test]
    fn test_cli_parses_select() {
        let cli = Cli::try_parse_from(["slot_daq", "select", "3", "5", "--timeout", "2"]).unwrap();
        match cli.command {
            Commands::Select { slots, timeout } => {
                assert_eq!(slots, vec![3, 5]);
                assert_eq!(timeout, 2);
            }
            _ => panic!("expected select"),
        }
    }
}
