//! Noteva Migrate - import or export a blog corpus

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use noteva_migrate::{
    config::{Config, GatewayDriver},
    gateway::create_gateway,
    models::MigrateData,
    services::MigrateService,
};

#[derive(Debug, Parser)]
#[command(name = "noteva-migrate")]
#[command(author, version, about = "Import or export a Noteva blog corpus")]
struct Cli {
    /// Configuration file
    #[arg(short, long, global = true, default_value = "config.yml")]
    config: PathBuf,

    /// Run against in-process services; nothing leaves the process
    #[arg(long, global = true)]
    dry_run: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, PartialEq, Subcommand)]
enum Commands {
    /// Import a bundle into the services and print the report
    Import {
        /// Bundle to read
        file: PathBuf,
    },
    /// Export the services' content to a bundle
    Export {
        /// Bundle to write
        file: PathBuf,
    },
}

impl Cli {
    /// A dry run starts from empty services, so there is nothing to export.
    fn validate(&self) -> Result<()> {
        if self.dry_run && matches!(self.command, Commands::Export { .. }) {
            bail!("--dry-run only applies to import: in-process services start empty");
        }
        Ok(())
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "noteva_migrate=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();
    cli.validate()?;

    // Load configuration
    let mut config = Config::load_with_env(&cli.config)
        .with_context(|| format!("Failed to load {}", cli.config.display()))?;
    if cli.dry_run {
        tracing::info!("Dry run: nothing leaves the process");
        config.gateway.driver = GatewayDriver::Memory;
    }

    let gateway = create_gateway(&config.gateway)?;
    let service = MigrateService::with_config(gateway, config.migrate);

    match cli.command {
        Commands::Import { file: path } => {
            let data = read_bundle(&path)?;
            let report = service.import(data).await.context("Import failed")?;
            if !report.comments.is_clean() {
                tracing::warn!(
                    "Some comments could not be linked: {} unknown posts, {} unknown parents",
                    report.comments.post_error.len(),
                    report.comments.parent_error.len()
                );
            }
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
        Commands::Export { file: path } => {
            let data = service.export().await.context("Export failed")?;
            let json = serde_json::to_string_pretty(&data)?;
            std::fs::write(&path, json).with_context(|| format!("Failed to write {}", path.display()))?;
            tracing::info!("Bundle written to {}", path.display());
        }
    }

    Ok(())
}

fn read_bundle(path: &Path) -> Result<MigrateData> {
    let content = std::fs::read_to_string(path).with_context(|| format!("Failed to read {}", path.display()))?;
    serde_json::from_str(&content).with_context(|| format!("{} is not a valid bundle", path.display()))
}
