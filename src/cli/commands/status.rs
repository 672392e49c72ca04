use serde_json::{json, Value};

use crate::cli::utils::{output_error, output_success};
use crate::cli::OutputFormat;

pub async fn handle(url: &str, output_format: OutputFormat) -> anyhow::Result<()> {
    let health_url = format!("{}/health", url.trim_end_matches('/'));
    let response = match reqwest::get(&health_url).await {
        Ok(response) => response,
        Err(e) => {
            output_error(&output_format, &format!("{} is unreachable: {}", url, e), Some("UNREACHABLE"))?;
            return Err(anyhow::anyhow!("portal unreachable"));
        }
    };

    let status = response.status();
    let body: Value = response.json().await.unwrap_or(Value::Null);
    let database = body["data"]["database"].as_str().unwrap_or("unknown").to_string();

    if status.is_success() {
        output_success(
            &output_format,
            &format!("{} is up (database: {})", url, database),
            Some(json!({ "status": status.as_u16(), "database": database })),
        )
    } else {
        output_error(
            &output_format,
            &format!("{} is degraded ({}, database: {})", url, status, database),
            Some("DEGRADED"),
        )?;
        Err(anyhow::anyhow!("portal reported {}", status))
    }
}
