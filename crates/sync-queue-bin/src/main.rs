//! sync-queue - inspect and drive sync queues from the command line.

mod commands;
mod replica;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use sync_config_and_utils::{init_logging, Config, Paths};

/// Sync queue command-line interface.
#[derive(Parser)]
#[command(name = "sync-queue")]
#[command(about = "Durable ordered sync queues over SQLite")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Log level (trace, debug, info, warn, error). Defaults to the configured level
    #[arg(short, long, global = true)]
    log_level: Option<String>,

    /// Base directory for config, database and logs. Defaults to ~/.sync-queue
    #[arg(long, global = true)]
    base_dir: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Append one action to a queue
    Append {
        queue: String,
        /// Action name
        action: String,
        /// Action args as JSON (defaults to [])
        args: Option<String>,
        /// User id recorded with the action
        #[arg(long)]
        user_id: Option<i64>,
    },
    /// Print the number of items in a queue
    Size { queue: String },
    /// Print every item without removing anything
    Peek { queue: String },
    /// Delete every item and release any checkout
    Reset { queue: String },
    /// Remove and print every item
    Flush { queue: String },
    /// Run one endpoint request and print the response
    Request {
        /// Method name, e.g. sync.status
        method: String,
        /// Params as JSON
        params: Option<String>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let paths = match cli.base_dir {
        Some(base) => Paths::with_base_dir(base),
        None => Paths::new()?,
    };
    paths.ensure_dirs()?;
    let config = Config::load(&paths)?;

    let level = cli.log_level.as_deref().unwrap_or(&config.log_level);
    init_logging(level, Some(&paths.log_file()))?;

    let store = commands::open_store(&config, &paths)?;

    match cli.command {
        Commands::Append {
            queue,
            action,
            args,
            user_id,
        } => commands::append(store, &queue, &action, args.as_deref(), user_id),
        Commands::Size { queue } => commands::size(store, &queue),
        Commands::Peek { queue } => commands::peek(store, &queue),
        Commands::Reset { queue } => commands::reset(store, &queue),
        Commands::Flush { queue } => commands::flush(store, &queue),
        Commands::Request { method, params } => {
            commands::request(store, &config, &method, params.as_deref()).await
        }
    }
}
