use std::path::PathBuf;

use bookmarks_kit::config::BookmarksKitConfig;
use clap::{Parser, Subcommand};
use tracing::Level;

mod commands;

use commands::list::BookmarksArgs;
use commands::sql::SqlArgs;
use commands::OutputFormat;

#[derive(Parser)]
#[clap(author, version, about, long_about = None)]
#[clap(propagate_version = true)]
struct Cli {
    /// configuration file path, by default $HOME/.bookmarks-kit/bookmarks-kit.toml is used
    #[clap(short, long)]
    config: Option<String>,

    /// Print debug information
    #[clap(long, global = true)]
    debug: bool,

    /// Output format: table, markdown, json, json-pretty, psv
    #[clap(short, long, global = true, default_value_t = OutputFormat::Table)]
    format: OutputFormat,

    /// Output as JSON (shorthand for --format json)
    #[clap(long, global = true)]
    json: bool,

    #[clap(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create or migrate the bookmark store snapshot
    Init,

    /// Run a read-only SQL statement and print the resulting rows
    Query(SqlArgs),

    /// Run a mutating SQL statement and persist the store
    Exec(SqlArgs),

    /// Write the serialized database image to a file
    Export {
        #[clap(name = "FILE")]
        file: PathBuf,
    },

    /// Replace the store contents with a database image file
    Import {
        #[clap(name = "FILE")]
        file: PathBuf,
    },

    /// Show configuration and snapshot status
    Status,

    /// List bookmarks
    Bookmarks(BookmarksArgs),

    /// List tags with bookmark counts
    Tags,
}

#[tokio::main(flavor = "current_thread")]
async fn main() {
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    if cli.debug {
        tracing_subscriber::fmt()
            // filter spans/events with level INFO or higher.
            .with_max_level(Level::INFO)
            .init();
    }

    let config = match BookmarksKitConfig::new(&cli.config) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Failed to load configuration: {}", e);
            std::process::exit(1);
        }
    };

    let format = if cli.json {
        OutputFormat::Json
    } else {
        cli.format
    };

    let res = match cli.command {
        Commands::Init => commands::init::run(&config, format).await,
        Commands::Query(args) => commands::sql::run_query(&config, args, format).await,
        Commands::Exec(args) => commands::sql::run_exec(&config, args, format).await,
        Commands::Export { file } => commands::transfer::run_export(&config, file, format).await,
        Commands::Import { file } => commands::transfer::run_import(&config, file, format).await,
        Commands::Status => commands::status::run(&config, format),
        Commands::Bookmarks(args) => commands::list::run_bookmarks(&config, args, format).await,
        Commands::Tags => commands::list::run_tags(&config, format).await,
    };

    if let Err(e) = res {
        eprintln!("{:#}", e);
        std::process::exit(1);
    }
}
