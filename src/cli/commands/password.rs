use serde_json::json;

use crate::auth::hash_password;
use crate::cli::OutputFormat;
use crate::config::config;

pub async fn handle(password: &str, cost: Option<u32>, output_format: OutputFormat) -> anyhow::Result<()> {
    let cost = cost.unwrap_or(config().security.bcrypt_cost);
    let hash = hash_password(password, cost).await?;
    match output_format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&json!({ "hash": hash, "cost": cost }))?),
        OutputFormat::Text => println!("{}", hash),
    }
    Ok(())
}
