pub mod client;
pub mod commands;
pub mod utils;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use serde::{Deserialize, Serialize};

#[derive(Parser)]
#[command(name = "nwctl")]
#[command(about = "Netzwächter portal command-line tools")]
#[command(version)]
pub struct Cli {
    #[arg(long, global = true, help = "Output in human-readable text format")]
    pub text: bool,

    #[arg(long, global = true, help = "Output in JSON format")]
    pub json: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    #[command(about = "Probe a running portal's /health endpoint")]
    Status {
        #[arg(long, default_value = "http://localhost:5000", help = "Portal base URL")]
        url: String,
    },

    #[command(about = "Print a bcrypt hash for a password")]
    HashPassword {
        #[arg(help = "Plain-text password")]
        password: String,
        #[arg(long, help = "bcrypt cost (defaults to SECURITY_BCRYPT_COST)")]
        cost: Option<u32>,
    },

    #[command(about = "Classify exported objects against exported threshold settings")]
    Classify {
        #[arg(long, help = "JSON file with an array of objects")]
        objects: PathBuf,
        #[arg(long, help = "JSON file with threshold settings")]
        thresholds: PathBuf,
        #[arg(long, help = "Hours after which telemetry counts as stale")]
        stale_hours: Option<i64>,
    },

    #[command(about = "Build an embeddable Grafana panel URL")]
    GrafanaUrl(commands::grafana::GrafanaUrlArgs),

    #[command(about = "Export or import portal settings over the API")]
    Settings {
        #[command(subcommand)]
        cmd: commands::settings::SettingsCommands,
    },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum OutputFormat {
    Text,
    Json,
}

impl OutputFormat {
    pub fn from_cli(cli: &Cli) -> Self {
        if cli.json {
            OutputFormat::Json
        } else {
            OutputFormat::Text
        }
    }
}

pub async fn run(cli: Cli) -> anyhow::Result<()> {
    let output_format = OutputFormat::from_cli(&cli);

    match cli.command {
        Commands::Status { url } => commands::status::handle(&url, output_format).await,
        Commands::HashPassword { password, cost } => commands::password::handle(&password, cost, output_format).await,
        Commands::Classify { objects, thresholds, stale_hours } => {
            commands::classify::handle(&objects, &thresholds, stale_hours, output_format)
        }
        Commands::GrafanaUrl(args) => commands::grafana::handle(args, output_format),
        Commands::Settings { cmd } => commands::settings::handle(cmd, output_format).await,
    }
}
