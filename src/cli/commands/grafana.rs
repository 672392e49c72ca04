use clap::Args;
use serde_json::json;

use crate::cli::utils::output_error;
use crate::cli::OutputFormat;
use crate::grafana::{GrafanaConfig, PanelRequest};

#[derive(Args)]
pub struct GrafanaUrlArgs {
    #[arg(long, help = "Grafana panel id")]
    pub panel_id: String,
    #[arg(long, help = "Meter id, passed as var-id")]
    pub meter_id: Option<String>,
    #[arg(long, help = "Time range such as 7d or now-30d")]
    pub time_range: Option<String>,
    #[arg(long, help = "Dashboard path (d-solo/<uid>/<slug>)")]
    pub dashboard: Option<String>,
    #[arg(long, help = "Grafana base URL")]
    pub base_url: Option<String>,
    #[arg(long = "var", value_parser = parse_var, help = "Extra dashboard variable as name=value")]
    pub vars: Vec<(String, String)>,
}

fn parse_var(raw: &str) -> Result<(String, String), String> {
    let (name, value) = raw.split_once('=').ok_or_else(|| format!("expected name=value, got {:?}", raw))?;
    let name = name.trim();
    if name.is_empty() {
        return Err("variable name must not be empty".to_string());
    }
    let key = if name.starts_with("var-") { name.to_string() } else { format!("var-{}", name) };
    Ok((key, value.to_string()))
}

pub fn handle(args: GrafanaUrlArgs, output_format: OutputFormat) -> anyhow::Result<()> {
    let mut config = GrafanaConfig::default();
    if let Some(base_url) = args.base_url {
        config.base_url = base_url;
    }
    let request = PanelRequest {
        panel_id: args.panel_id,
        meter_id: args.meter_id,
        time_range: args.time_range,
        dashboard: args.dashboard,
        extra: args.vars,
    };

    match config.panel_url(&request) {
        Ok(url) => {
            match output_format {
                OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&json!({ "url": url }))?),
                OutputFormat::Text => println!("{}", url),
            }
            Ok(())
        }
        Err(e) => {
            output_error(&output_format, &e.to_string(), Some("INVALID_PANEL"))?;
            Err(e.into())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn vars_get_prefixed() {
        assert_eq!(parse_var("zone=north").unwrap(), ("var-zone".to_string(), "north".to_string()));
        assert_eq!(parse_var("var-id=7").unwrap(), ("var-id".to_string(), "7".to_string()));
        assert!(parse_var("novalue").is_err());
    }
}
