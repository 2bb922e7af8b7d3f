//! `novel`: search the Z Reader backend and manage downloads from the terminal.

mod cmd;
mod config;
mod context;
mod interactive;
mod render;
mod signal;

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use novel_client::DownloadFormat;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::Config;
use crate::context::AppContext;

#[derive(Parser)]
#[command(name = "novel")]
#[command(about = "Search novels across sources and manage downloads")]
struct Cli {
    /// Backend address (overrides NOVEL_API_URL)
    #[arg(long, global = true)]
    api_url: Option<String>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Search every enabled source, streaming progress
    Search {
        keyword: String,

        /// Only search this source
        #[arg(long)]
        source: Option<u32>,

        /// Choose a result to download or read online
        #[arg(long)]
        pick: bool,
    },

    /// List configured sources
    Sources {
        /// Run a test search against every source
        #[arg(long)]
        check: bool,
    },

    /// Queue a background download
    Download {
        book_url: String,

        #[arg(long)]
        source: u32,

        /// First chapter (1-based)
        #[arg(long, default_value_t = 1)]
        start: i32,

        /// Last chapter, -1 for the final one
        #[arg(long, default_value_t = -1, allow_negative_numbers = true)]
        end: i32,

        /// txt or epub
        #[arg(long, default_value = "txt")]
        format: DownloadFormat,
    },

    /// List download tasks, newest first
    Tasks {
        /// Keep polling until every task has finished
        #[arg(long)]
        watch: bool,
    },

    /// Show one download task
    Task { id: String },

    /// Delete a download task
    TaskDelete { id: String },

    /// List finished files on the backend
    Files,

    /// Save a finished file locally
    Fetch {
        name: String,

        /// Destination directory (defaults to NOVEL_DOWNLOAD_DIR)
        #[arg(long)]
        dir: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    // Logs go to stderr so progress on stdout stays readable
    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "warn,novel_client=info,novel=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();
    let config = Config::from_env()?.with_api_url(cli.api_url);
    let ctx = AppContext::new(config)?;

    match cli.command {
        None => interactive::run(&ctx).await,
        Some(Commands::Search {
            keyword,
            source,
            pick,
        }) => cmd::search::run(&ctx, &keyword, source, pick).await,
        Some(Commands::Sources { check }) => cmd::sources::run(&ctx, check).await,
        Some(Commands::Download {
            book_url,
            source,
            start,
            end,
            format,
        }) => cmd::tasks::download(&ctx, &book_url, source, start, end, format).await,
        Some(Commands::Tasks { watch }) => cmd::tasks::list(&ctx, watch).await,
        Some(Commands::Task { id }) => cmd::tasks::show(&ctx, &id).await,
        Some(Commands::TaskDelete { id }) => cmd::tasks::delete(&ctx, &id).await,
        Some(Commands::Files) => cmd::files::list(&ctx).await,
        Some(Commands::Fetch { name, dir }) => cmd::files::fetch(&ctx, &name, dir.as_deref()).await,
    }
}
