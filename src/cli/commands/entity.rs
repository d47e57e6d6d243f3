use clap::Subcommand;

use crate::cli::client::CatalogClient;
use crate::cli::utils::output_record;
use crate::cli::OutputFormat;

#[derive(Subcommand)]
pub enum EntityCommands {
    #[command(about = "Show the current entity view")]
    Get {
        #[arg(help = "Entity ID (UUID)")]
        id: String,
    },
}

pub async fn handle(cmd: EntityCommands, client: &CatalogClient, output_format: OutputFormat) -> anyhow::Result<()> {
    match cmd {
        EntityCommands::Get { id } => {
            let entity = client.get(&format!("/entities/{}", id), &[]).await?;
            output_record(output_format, &entity)
        }
    }
}
