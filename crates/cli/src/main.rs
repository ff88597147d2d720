//! GeoArt CLI - Database migrations and catalog tools.
//!
//! # Usage
//!
//! ```bash
//! # Run storefront database migrations
//! geoart-cli migrate
//!
//! # Print the retail price table
//! geoart-cli prices
//!
//! # Price a category by display name (unknown names use the default cost)
//! geoart-cli prices --category "Wall Art"
//! ```
//!
//! # Commands
//!
//! - `migrate` - Run database migrations
//! - `prices` - Show base costs, retail prices and vendor blueprints

#![cfg_attr(not(test), forbid(unsafe_code))]

use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(name = "geoart-cli")]
#[command(author, version, about = "GeoArt CLI tools")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run storefront database migrations
    Migrate,
    /// Show the catalog price table
    Prices {
        /// Price a single category by display name
        #[arg(short, long)]
        category: Option<String>,
    },
}

#[tokio::main]
async fn main() {
    // Initialize tracing
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();

    let result: Result<(), Box<dyn std::error::Error>> = run(cli).await;

    if let Err(e) = result {
        tracing::error!("Command failed: {e}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    match cli.command {
        Commands::Migrate => commands::migrate::storefront().await?,
        Commands::Prices { category } => match category {
            Some(name) => commands::prices::single(&name),
            None => commands::prices::table(),
        },
    }
    Ok(())
}
