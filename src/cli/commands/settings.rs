use std::path::PathBuf;

use anyhow::Context;
use clap::{Args, Subcommand};
use serde_json::{json, Value};

use crate::cli::client::PortalClient;
use crate::cli::utils::{output_success, read_json_file, unwrap_envelope};
use crate::cli::OutputFormat;

#[derive(Args)]
pub struct Connection {
    #[arg(long, default_value = "http://localhost:5000", help = "Portal base URL")]
    pub url: String,
    #[arg(long, env = "NWCTL_USERNAME", help = "Login user")]
    pub username: String,
    #[arg(long, env = "NWCTL_PASSWORD", hide_env_values = true, help = "Login password")]
    pub password: String,
}

impl Connection {
    async fn login(&self) -> anyhow::Result<PortalClient> {
        let client = PortalClient::new(&self.url)?;
        client.login(&self.username, &self.password).await?;
        Ok(client)
    }
}

#[derive(Subcommand)]
pub enum SettingsCommands {
    #[command(about = "Export settings to a JSON file (or stdout)")]
    Export {
        #[command(flatten)]
        connection: Connection,
        #[arg(long, help = "Only this category")]
        category: Option<String>,
        #[arg(long, short, help = "Output file")]
        output: Option<PathBuf>,
    },

    #[command(about = "Import settings from an export file")]
    Import {
        #[command(flatten)]
        connection: Connection,
        #[arg(help = "Export file to import")]
        file: PathBuf,
    },
}

/// Rows from an export document, an API envelope around one, or a bare array
fn import_rows(document: Value) -> anyhow::Result<Vec<Value>> {
    match unwrap_envelope(document) {
        Value::Array(rows) => Ok(rows),
        Value::Object(mut map) => match map.remove("settings") {
            Some(Value::Array(rows)) => Ok(rows),
            _ => Err(anyhow::anyhow!("import file has no settings array")),
        },
        _ => Err(anyhow::anyhow!("import file has no settings array")),
    }
}

pub async fn handle(cmd: SettingsCommands, output_format: OutputFormat) -> anyhow::Result<()> {
    match cmd {
        SettingsCommands::Export {
            connection,
            category,
            output,
        } => {
            let client = connection.login().await?;
            let export = client.post("/api/settings/export", &json!({ "category": category })).await?;
            let count = export["exportedCount"].as_u64().unwrap_or(0);
            let pretty = serde_json::to_string_pretty(&export)?;
            match output {
                Some(path) => {
                    std::fs::write(&path, pretty).with_context(|| format!("failed to write {}", path.display()))?;
                    output_success(
                        &output_format,
                        &format!("Exported {} settings to {}", count, path.display()),
                        Some(json!({ "exportedCount": count })),
                    )
                }
                None => {
                    println!("{}", pretty);
                    Ok(())
                }
            }
        }
        SettingsCommands::Import { connection, file } => {
            let rows = import_rows(read_json_file(&file)?)?;
            let client = connection.login().await?;
            let result = client.post("/api/settings/import", &json!({ "settings": rows })).await?;
            let count = result["importedCount"].as_u64().unwrap_or(0);
            output_success(
                &output_format,
                &format!("Imported {} settings from {}", count, file.display()),
                Some(json!({ "importedCount": count })),
            )
        }
    }
}
