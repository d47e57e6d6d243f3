use clap::Subcommand;
use serde_json::json;

use crate::auth::{generate_jwt, AccessLevel, Claims};
use crate::cli::utils::output_success;
use crate::cli::OutputFormat;

#[derive(Subcommand)]
pub enum TokenCommands {
    #[command(about = "Mint a bearer token signed with the server secret")]
    Mint {
        #[arg(long, help = "Token subject (user or service name)")]
        subject: String,
        #[arg(long, default_value = "edit", help = "Access level: read, edit, full or root")]
        access: String,
        #[arg(long, default_value_t = 24, help = "Validity in hours")]
        hours: u64,
        #[arg(long, env = "SECURITY_JWT_SECRET", hide_env_values = true, help = "Signing secret")]
        secret: String,
    },
}

pub fn handle(cmd: TokenCommands, output_format: OutputFormat) -> anyhow::Result<()> {
    match cmd {
        TokenCommands::Mint { subject, access, hours, secret } => {
            let access: AccessLevel = access.parse()?;
            let token = generate_jwt(&secret, &Claims::new(subject, access, hours))?;

            match output_format {
                OutputFormat::Json => output_success(output_format, "", &json!({ "token": token })),
                OutputFormat::Text => {
                    println!("{}", token);
                    Ok(())
                }
            }
        }
    }
}
