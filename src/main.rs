//! esg-demo - exercise the ESG SDK from the command line

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use serde::Serialize;
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use esg_sdk::config::Config;
use esg_sdk::models::{CompositeFilter, FilterField, InitiativeStatus};
use esg_sdk::services::CountQuery;
use esg_sdk::EsgSdk;

#[derive(Debug, Parser)]
#[command(name = "esg-demo", version, about = "Query the ESG platform through the SDK")]
struct Args {
    /// Configuration file; ESG_* environment variables override it
    #[arg(short, long, default_value = "esg.yml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Comments of a page
    Comments { page_id: String },

    /// Every initiative
    Files,

    /// Initiatives whose field contains the key
    Search {
        /// name, description or location
        field: FilterField,
        key: String,
    },

    /// Initiatives created since 1980, optionally with a status
    Count { status: Option<InitiativeStatus> },

    /// Daily views over the last 30 days
    ViewsByDate,

    /// Views per page over the last 30 days
    ViewsByPage,

    /// Views per city and page over the last 30 days
    ViewsByCity,
}

impl Command {
    async fn run(self, sdk: &EsgSdk) -> Result<()> {
        match self {
            Self::Comments { page_id } => print(&sdk.get_comments(&page_id).await?),
            Self::Files => print(&sdk.fetch_files().await?),
            Self::Search { field, key } => {
                let filter = CompositeFilter::new(key, field);
                print(&sdk.search_files(Some(&filter)).await?)
            }
            Self::Count { status } => {
                let query = CountQuery {
                    status,
                    ..CountQuery::default()
                };
                print(&sdk.count_initiatives(&query).await?)
            }
            Self::ViewsByDate => print(&sdk.get_views_by_date().await?),
            Self::ViewsByPage => print(&sdk.get_views_by_page().await?),
            Self::ViewsByCity => print(&sdk.get_views_by_city_and_page().await?),
        }
    }
}

fn print<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "esg_sdk=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let args = Args::parse();

    let config = Config::load_with_env(&args.config)
        .with_context(|| format!("Failed to load {}", args.config.display()))?;
    let sdk = EsgSdk::new(config).context("Failed to initialize the SDK")?;

    args.command.run(&sdk).await
}
