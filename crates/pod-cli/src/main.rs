use clap::{Parser, Subcommand};
use color_eyre::eyre::Result;
use tracing_subscriber::EnvFilter;
use uuid::Uuid;

mod cli;
mod commands;

#[derive(Parser)]
#[command(name = "podctl")]
#[command(about = "Podcast/YouTube ingestion pipeline: maintenance CLI and orchestrator")]
#[command(version)]
#[command(styles = cli::get_styles())]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Import subscriptions from an OPML file
    ImportOpml {
        /// Path to the OPML file
        path: String,

        /// Parse and report without writing to the database
        #[arg(long)]
        dry_run: bool,

        /// Update title/description of podcasts that already exist
        #[arg(long)]
        update_existing: bool,
    },

    /// Fetch a feed and create the podcast row (or report it already exists)
    Add {
        /// RSS/Atom feed URL
        feed_url: String,
    },

    /// Register a YouTube channel as a podcast and pull its recent uploads
    AddYoutube {
        /// YouTube channel id (starts with `UC`)
        channel_id: String,

        /// Number of recent uploads to pull
        #[arg(long, default_value_t = 50)]
        max_videos: usize,
    },

    /// Re-sync one feed, or every subscribed feed
    Sync {
        /// Sync only this podcast
        #[arg(long)]
        podcast_id: Option<Uuid>,
    },

    /// Download pending episode audio
    Download {
        /// Number of episodes to fetch in this batch
        #[arg(long)]
        limit: Option<i64>,

        /// Number of concurrent download workers
        #[arg(long)]
        concurrent: Option<usize>,

        /// Dispatch the batch and return immediately instead of waiting for it
        #[arg(long)]
        r#async: bool,
    },

    /// List podcasts with per-stage episode counts
    List {
        /// Show every podcast, ignoring `--limit`
        #[arg(long)]
        all: bool,

        /// Maximum number of podcasts to show
        #[arg(long)]
        limit: Option<i64>,
    },

    /// Show aggregate pipeline progress
    Status {
        /// Restrict to this podcast
        #[arg(long)]
        podcast_id: Option<Uuid>,
    },

    /// Delete local audio for episodes that finished post-processing
    Cleanup {
        /// Report what would be deleted without deleting it
        #[arg(long)]
        dry_run: bool,

        /// Maximum number of episodes to clean up
        #[arg(long)]
        limit: Option<i64>,
    },

    /// Run the orchestrator's main loop until SIGINT/SIGTERM
    Pipeline,
}

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt().with_env_filter(EnvFilter::from_default_env()).init();

    let cli = Cli::parse();

    match cli.command {
        Commands::ImportOpml { path, dry_run, update_existing } => {
            commands::import_opml::run(&path, dry_run, update_existing).await?;
        }
        Commands::Add { feed_url } => commands::add::run(&feed_url).await?,
        Commands::AddYoutube { channel_id, max_videos } => {
            commands::add_youtube::run(&channel_id, max_videos).await?;
        }
        Commands::Sync { podcast_id } => commands::sync::run(podcast_id).await?,
        Commands::Download { limit, concurrent, r#async } => {
            commands::download::run(limit, concurrent, r#async).await?;
        }
        Commands::List { all, limit } => commands::list::run(all, limit).await?,
        Commands::Status { podcast_id } => commands::status::run(podcast_id).await?,
        Commands::Cleanup { dry_run, limit } => commands::cleanup::run(dry_run, limit).await?,
        Commands::Pipeline => commands::pipeline::run().await?,
    }

    Ok(())
}
