use clap::Subcommand;
use serde_json::{json, Value};

use crate::cli::client::CatalogClient;
use crate::cli::utils::{output_record, output_success, read_json_input};
use crate::cli::OutputFormat;

#[derive(Subcommand)]
pub enum ProfileCommands {
    #[command(about = "Push a profile payload as the latest profile")]
    Update {
        #[arg(help = "Entity ID (UUID)")]
        id: String,
        #[arg(long, default_value = "-", help = "Payload JSON file, or - for stdin")]
        file: String,
        #[arg(long, help = "Profile timestamp in epoch milliseconds (defaults to now)")]
        timestamp: Option<i64>,
        #[arg(long, help = "Stale policy for this request: ignore or reject")]
        stale: Option<String>,
    },

    #[command(about = "Show the latest profile")]
    Latest {
        #[arg(help = "Entity ID (UUID)")]
        id: String,
    },

    #[command(about = "List profile history")]
    History {
        #[arg(help = "Entity ID (UUID)")]
        id: String,
        #[arg(long, help = "Inclusive lower timestamp bound")]
        start_ts: Option<i64>,
        #[arg(long, help = "Inclusive upper timestamp bound")]
        end_ts: Option<i64>,
    },

    #[command(about = "Show row, column and accuracy summary of the latest profile")]
    Summary {
        #[arg(help = "Entity ID (UUID)")]
        id: String,
    },
}

pub async fn handle(cmd: ProfileCommands, client: &CatalogClient, output_format: OutputFormat) -> anyhow::Result<()> {
    match cmd {
        ProfileCommands::Update { id, file, timestamp, stale } => {
            let payload = read_json_input(&file)?;
            if !payload.is_object() {
                anyhow::bail!("profile payload must be a JSON object");
            }
            let timestamp = timestamp.unwrap_or_else(|| chrono::Utc::now().timestamp_millis());

            let mut query = Vec::new();
            if let Some(stale) = stale {
                query.push(("stale", stale));
            }

            let response = client
                .post(
                    &format!("/entities/{}/profile", id),
                    &query,
                    &json!({ "timestamp": timestamp, "payload": payload }),
                )
                .await?;

            let version = response.entity.get("version").cloned().unwrap_or(Value::Null);
            let message = match response.outcome.as_deref() {
                Some("unchanged") => format!(
                    "Profile at {} is not newer than the latest; entity left at version {}",
                    timestamp, version
                ),
                _ => format!("Profile at {} committed; entity now at version {}", timestamp, version),
            };
            output_success(output_format, &message, &response.entity)
        }
        ProfileCommands::Latest { id } => {
            let profile = client.get(&format!("/entities/{}/profile", id), &[]).await?;
            output_record(output_format, &profile)
        }
        ProfileCommands::History { id, start_ts, end_ts } => {
            let mut query = Vec::new();
            if let Some(start) = start_ts {
                query.push(("start_ts", start.to_string()));
            }
            if let Some(end) = end_ts {
                query.push(("end_ts", end.to_string()));
            }

            let profiles = client.get(&format!("/entities/{}/profiles", id), &query).await?;
            match output_format {
                OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&profiles)?),
                OutputFormat::Text => {
                    let items = profiles.as_array().cloned().unwrap_or_default();
                    if items.is_empty() {
                        println!("No profiles in range");
                    }
                    for item in items {
                        println!("{}\t{}", item["timestamp"], item["payload"]);
                    }
                }
            }
            Ok(())
        }
        ProfileCommands::Summary { id } => {
            let summary = client.get(&format!("/entities/{}/profile/summary", id), &[]).await?;
            output_record(output_format, &summary)
        }
    }
}
