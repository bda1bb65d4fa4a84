//! Canopy CLI - Database migrations.
//!
//! # Usage
//!
//! ```bash
//! # Create the orders and backorder tables
//! canopy-cli migrate storefront
//!
//! # Create the session store table
//! canopy-cli migrate sessions
//!
//! # Both
//! canopy-cli migrate all
//! ```

#![cfg_attr(not(test), forbid(unsafe_code))]

use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(name = "canopy-cli")]
#[command(author, version, about = "Canopy storefront CLI tools")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run database migrations
    Migrate {
        #[command(subcommand)]
        target: MigrateTarget,
    },
}

#[derive(Subcommand)]
enum MigrateTarget {
    /// Run storefront schema migrations (orders, backorder requests)
    Storefront,
    /// Create the `tower_sessions` schema used by the session store
    Sessions,
    /// Run all migrations
    All,
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();

    if let Err(e) = run(cli).await {
        tracing::error!("Command failed: {e}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<(), commands::migrate::MigrationError> {
    match cli.command {
        Commands::Migrate { target } => {
            let pool = commands::migrate::connect().await?;
            match target {
                MigrateTarget::Storefront => commands::migrate::storefront(&pool).await?,
                MigrateTarget::Sessions => commands::migrate::sessions(&pool).await?,
                MigrateTarget::All => {
                    commands::migrate::storefront(&pool).await?;
                    commands::migrate::sessions(&pool).await?;
                }
            }
        }
    }
    Ok(())
}
