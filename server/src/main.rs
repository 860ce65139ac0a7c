//! Flexdex Entry Point
//!
//! Serves the API surface index over MCP (default) or answers one query from
//! the command line and prints the JSON result.

use clap::{Parser, Subcommand};
use flexdex_core::{EngineConfig, HashingEmbedder, SnapshotStore};
use flexdex_server::handlers::{
    GetNavigationPathParams, GetObjectApiParams, SearchByCapabilityParams, ValidateScriptParams,
};
use flexdex_server::mcp::McpServer;
use flexdex_server::watcher::{IndexWatcher, DEFAULT_DEBOUNCE_MS};
use flexdex_server::{FlexdexBackend, ServerResult};
use serde::Serialize;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "flexdex")]
#[command(about = "API surface index with capability search, navigation paths and script validation")]
#[command(version)]
struct Args {
    /// Directory of index documents
    #[arg(long, short, env = "FLEXDEX_INDEX_DIR")]
    index_dir: PathBuf,

    /// Engine configuration file (JSON)
    #[arg(long, short)]
    config: Option<PathBuf>,

    /// Enable semantic re-ranking with the built-in hashing embedder
    #[arg(long)]
    semantic: bool,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Serve MCP over stdio (default)
    Serve {
        /// Rebuild the index when documents under the index directory change
        #[arg(long)]
        watch: bool,
    },
    /// Search members and objects by capability
    Search {
        query: String,
        #[arg(long, short)]
        max_results: Option<i64>,
        #[arg(long, short)]
        tier: Option<String>,
    },
    /// Shortest navigation path between two object types
    Path { from: String, to: String },
    /// Validate a script file (`-` reads stdin)
    Validate {
        file: PathBuf,
        #[arg(long, short)]
        tier: Option<String>,
    },
    /// Show the API of one object type
    Object {
        name: String,
        #[arg(long, short)]
        tier: Option<String>,
    },
}

#[tokio::main]
async fn main() {
    let args = Args::parse();

    // Logs go to stderr; stdout carries protocol messages and CLI output
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "flexdex_server=info,flexdex_core=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    match run(args).await {
        Ok(code) => std::process::exit(code),
        Err(e) => {
            tracing::error!("{}", e);
            std::process::exit(1);
        }
    }
}

async fn run(args: Args) -> ServerResult<i32> {
    let config = match &args.config {
        Some(path) => EngineConfig::from_file(path)?,
        None => EngineConfig::default(),
    };

    let mut backend = FlexdexBackend::new(Arc::new(SnapshotStore::empty()), config)
        .with_index_dir(&args.index_dir);
    if args.semantic {
        backend = backend.with_embedder(Arc::new(HashingEmbedder::default()));
    }
    let backend = Arc::new(backend);

    tracing::info!("Loading index from {:?}", args.index_dir);
    let loader = Arc::clone(&backend);
    tokio::task::spawn_blocking(move || loader.reload())
        .await
        .map_err(|e| std::io::Error::new(std::io::ErrorKind::Other, e))??;

    match args.command.unwrap_or(Command::Serve { watch: false }) {
        Command::Serve { watch } => {
            let _watcher = if watch {
                Some(IndexWatcher::start(
                    Arc::clone(&backend),
                    Duration::from_millis(DEFAULT_DEBOUNCE_MS),
                )?)
            } else {
                None
            };
            tracing::info!("Starting flexdex MCP server");
            McpServer::new(backend).run().await?;
            Ok(0)
        }
        Command::Search {
            query,
            max_results,
            tier,
        } => {
            let response = backend.handle_search_by_capability(SearchByCapabilityParams {
                query,
                max_results,
                tier,
            })?;
            print_json(&response)?;
            Ok(0)
        }
        Command::Path { from, to } => {
            let response = backend.handle_get_navigation_path(GetNavigationPathParams {
                from_object: from,
                to_object: to,
            })?;
            print_json(&response)?;
            Ok(0)
        }
        Command::Validate { file, tier } => {
            let script = if file.as_os_str() == "-" {
                std::io::read_to_string(std::io::stdin())?
            } else {
                std::fs::read_to_string(&file)?
            };
            let response = backend.handle_validate_script(ValidateScriptParams { script, tier })?;
            print_json(&response)?;
            Ok(if response.valid { 0 } else { 2 })
        }
        Command::Object { name, tier } => {
            let response = backend.handle_get_object_api(GetObjectApiParams {
                object_type: name,
                tier,
                include_capabilities: true,
            })?;
            print_json(&response)?;
            Ok(if response.found { 0 } else { 1 })
        }
    }
}

fn print_json<T: Serialize>(value: &T) -> ServerResult<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
