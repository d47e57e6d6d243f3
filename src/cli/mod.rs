pub mod client;
pub mod commands;
pub mod utils;

use clap::{Parser, Subcommand};

use client::CatalogClient;

#[derive(Parser)]
#[command(name = "catalog")]
#[command(about = "Catalog CLI - read entities and push table profiles to the Catalog Profile API")]
#[command(version)]
pub struct Cli {
    #[arg(long, global = true, env = "CATALOG_URL", default_value = "http://localhost:3000", help = "Base URL of the API server")]
    pub url: String,

    #[arg(long, global = true, env = "CATALOG_TOKEN", help = "Bearer token sent with every request")]
    pub token: Option<String>,

    #[arg(long, global = true, help = "Output in JSON format")]
    pub json: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    #[command(about = "Catalog entity lookups")]
    Entity {
        #[command(subcommand)]
        cmd: commands::entity::EntityCommands,
    },

    #[command(about = "Table profile operations")]
    Profile {
        #[command(subcommand)]
        cmd: commands::profile::ProfileCommands,
    },

    #[command(about = "Token management")]
    Token {
        #[command(subcommand)]
        cmd: commands::token::TokenCommands,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
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
    let client = CatalogClient::new(&cli.url, cli.token.clone())?;

    match cli.command {
        Commands::Entity { cmd } => commands::entity::handle(cmd, &client, output_format).await,
        Commands::Profile { cmd } => commands::profile::handle(cmd, &client, output_format).await,
        Commands::Token { cmd } => commands::token::handle(cmd, output_format),
    }
}
