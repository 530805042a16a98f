mod commands;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(name = "livesent-cli")]
#[command(about = "Location news sentiment command line interface")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Run a location query and print the aggregated response as JSON
    Query {
        /// Place name, e.g. "Nairobi, Kenya"
        #[arg(long)]
        location: String,

        /// ISO-8601 timestamp to file the events under
        #[arg(long)]
        timestamp: Option<String>,

        /// Look back this many days (0-30) when no timestamp is given
        #[arg(long)]
        days_ago: Option<i64>,
    },
    /// Create the vector collection and payload indexes if missing
    Setup,
    /// Classify the emotion of a piece of text
    Classify { text: String },
    /// Print the normalized form of a piece of text
    Normalize {
        text: String,

        /// Drop English stopwords
        #[arg(long)]
        stopwords: bool,

        /// Keep non-ASCII characters instead of folding them
        #[arg(long)]
        keep_unicode: bool,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let fallback_level = std::env::var("LIVESENT_LOG_LEVEL").unwrap_or_else(|_| "warn".into());
    let env_filter =
        EnvFilter::try_from_default_env().or_else(|_| EnvFilter::try_new(fallback_level))?;
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    match cli.command {
        Some(Commands::Query {
            location,
            timestamp,
            days_ago,
        }) => {
            commands::run_query(livesent_core::LocationQuery {
                location,
                timestamp,
                days_ago,
            })
            .await?;
        }
        Some(Commands::Setup) => commands::run_setup().await?,
        Some(Commands::Classify { text }) => commands::run_classify(&text).await?,
        Some(Commands::Normalize {
            text,
            stopwords,
            keep_unicode,
        }) => println!(
            "{}",
            livesent_pipeline::normalize(&text, stopwords, !keep_unicode)
        ),
        None => println!("livesent-cli: run with --help to list commands"),
    }

    Ok(())
}
