#![warn(clippy::all, clippy::pedantic)]

use std::path::PathBuf;

use issuer_cli::commands::asset::{NewAsset, SigsRequired};
use issuer_cli::commands::issuance::{Issue, Reserve};
use issuer_cli::modules::settings::Settings;

use anyhow::Result;

use clap::{Parser, Subcommand};

use tracing_subscriber::{EnvFilter, fmt, prelude::*};

/// Command-line entrypoint for asset issuance.
#[derive(Parser, Debug)]
#[command(
    name = "issuer-cli",
    version,
    about = "Register assets and build issuance transaction templates"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
    /// Registry file [default: ISSUER_REGISTRY_PATH or registry.json]
    #[arg(long = "registry", global = true)]
    registry: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Register a multisig asset in the registry file
    NewAsset(NewAsset),
    /// Reserve an issuance and print its input and signing instructions
    Reserve(Reserve),
    /// Build a one-minute issuance transaction paying the given destinations
    Issue(Issue),
    /// Print how many signatures a redeem program requires
    SigsRequired(SigsRequired),
}

#[tokio::main]
async fn main() -> Result<()> {
    let _ = dotenvy::dotenv();

    logging_init();

    let parsed = Cli::parse();

    let mut settings = Settings::load()?;
    if let Some(registry) = parsed.registry {
        settings.registry_path = registry;
    }

    match parsed.command {
        Commands::NewAsset(new_asset) => new_asset.handle(&settings.registry_path),
        Commands::Reserve(reserve) => reserve.handle(&settings).await,
        Commands::Issue(issue) => issue.handle(&settings).await,
        Commands::SigsRequired(sigs_required) => sigs_required.handle(),
    }
}

fn logging_init() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(fmt::layer().with_target(true).with_writer(std::io::stderr))
        .with(filter)
        .init();
}
