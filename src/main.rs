//! `scope-cli`: query a Teledyne LeCroy oscilloscope from the command line.
//!
//! Usage:
//!   scope-cli --resource TCPIP0::192.168.1.100::INSTR identify
//!   scope-cli --model maui preamble --source C2
//!   scope-cli --config lab.toml channel 1
//!
//! Results are printed as JSON.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use figment::providers::Serialized;
use serde::Serialize;
use std::path::PathBuf;
use teledyne_scope::config::DEFAULT_CONFIG_PATH;
use teledyne_scope::{logging, ScopeConfig, ScopeModel, TeledyneOscilloscope};
use tracing::info;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Configuration file
    #[arg(short, long, default_value = DEFAULT_CONFIG_PATH)]
    config: PathBuf,

    /// VISA resource string, overrides the configuration
    #[arg(short, long)]
    resource: Option<String>,

    /// Instrument family (t3dso1204, hdo6xxx, maui), overrides the configuration
    #[arg(short, long)]
    model: Option<ScopeModel>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print the identification string
    Identify,
    /// Print the waveform preamble
    Preamble {
        /// Waveform source (1..4, C1..C4 or MATH)
        #[arg(short, long, default_value = "C1")]
        source: String,
    },
    /// Print the timebase settings
    Timebase,
    /// Print one channel's configuration
    Channel {
        /// Channel index (1..4)
        index: u8,
    },
}

#[derive(Serialize)]
struct Overrides {
    #[serde(skip_serializing_if = "Option::is_none")]
    resource: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    model: Option<ScopeModel>,
}

#[derive(Serialize)]
struct Identity {
    model: ScopeModel,
    identification: String,
}

fn load_config(args: &Args) -> Result<ScopeConfig> {
    let overrides = Overrides {
        resource: args.resource.clone(),
        model: args.model,
    };
    let config: ScopeConfig = ScopeConfig::figment(&args.config)
        .merge(Serialized::defaults(overrides))
        .extract()
        .with_context(|| format!("Failed to load {}", args.config.display()))?;
    config.validate()?;
    Ok(config)
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let config = load_config(&args)?;
    logging::init(&config.log_level);

    info!("Opening {} ({})", config.resource, config.model);
    let mut scope = TeledyneOscilloscope::from_config(&config)
        .await
        .with_context(|| format!("Failed to open {}", config.resource))?;

    match args.command {
        Command::Identify => print_json(&Identity {
            model: scope.model(),
            identification: scope.identify().await?,
        }),
        Command::Preamble { source } => {
            scope.set_waveform_source(&source)?;
            print_json(&scope.waveform_preamble().await?)
        }
        Command::Timebase => print_json(&scope.timebase().await?),
        Command::Channel { index } => {
            print_json(&scope.ch(index)?.current_configuration().await?)
        }
    }
}
