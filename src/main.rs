/// Version injected at compile time via GCP_GRAPH_VERSION env var (set by CI/CD),
/// or "dev" for local builds.
pub const VERSION: &str = match option_env!("GCP_GRAPH_VERSION") {
    Some(v) => v,
    None => "dev",
};

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use gcp_graph::adapter::sink::{query_channel, QueryEvent, QueryStream};
use gcp_graph::adapter::{build_adapters, Adapter, ResourceAdapter};
use gcp_graph::config::Config;
use gcp_graph::gcp::auth::GcpCredentials;
use gcp_graph::gcp::client::GcpClient;
use gcp_graph::item::split_key;
use gcp_graph::resource::get_all_resource_keys;
use gcp_graph::{Item, ResultCache};
use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::Level;
use tracing_subscriber::fmt::writer::MakeWriterExt;

/// Discover GCP resources as a linked graph
#[derive(Parser, Debug)]
#[command(name = "gcp-graph", version = VERSION, about, long_about = None)]
struct Args {
    /// GCP project to use
    #[arg(short, long, global = true)]
    project: Option<String>,

    /// Zone to discover (repeatable)
    #[arg(short, long, global = true)]
    zone: Vec<String>,

    /// Bypass the result cache for point lookups
    #[arg(long, global = true)]
    no_cache: bool,

    /// Log level for debugging
    #[arg(long, value_enum, default_value = "off", global = true)]
    log_level: LogLevel,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List the resource types that can be queried
    Types,
    /// Fetch one resource
    Get {
        item_type: String,
        scope: String,
        /// Key parts joined with '|'
        query: String,
    },
    /// List every resource of a type in a scope ('*' for all)
    List { item_type: String, scope: String },
    /// List resources under a parent
    Search {
        item_type: String,
        scope: String,
        /// Parent key parts joined with '|'
        query: String,
    },
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum LogLevel {
    Off,
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    fn to_tracing_level(self) -> Option<Level> {
        match self {
            LogLevel::Off => None,
            LogLevel::Error => Some(Level::ERROR),
            LogLevel::Warn => Some(Level::WARN),
            LogLevel::Info => Some(Level::INFO),
            LogLevel::Debug => Some(Level::DEBUG),
            LogLevel::Trace => Some(Level::TRACE),
        }
    }
}

fn setup_logging(level: LogLevel) -> Result<Option<tracing_appender::non_blocking::WorkerGuard>> {
    let Some(tracing_level) = level.to_tracing_level() else {
        return Ok(None);
    };

    let log_path = get_log_path();
    if let Some(parent) = log_path.parent() {
        let _ = std::fs::create_dir_all(parent);
    }

    let file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(&log_path)
        .with_context(|| format!("Failed to open log file {}", log_path.display()))?;

    let (non_blocking, guard) = tracing_appender::non_blocking(file);

    tracing_subscriber::fmt()
        .with_max_level(tracing_level)
        .with_writer(non_blocking.with_max_level(tracing_level))
        .with_ansi(false)
        .with_target(true)
        .with_thread_ids(false)
        .with_file(true)
        .with_line_number(true)
        .init();

    tracing::info!("gcp-graph {} started with log level: {:?}", VERSION, level);
    tracing::info!("Log file: {:?}", log_path);

    Ok(Some(guard))
}

fn get_log_path() -> PathBuf {
    if let Some(config_dir) = dirs::config_dir() {
        return config_dir.join("gcp-graph").join("gcp-graph.log");
    }
    if let Some(home) = dirs::home_dir() {
        return home.join(".gcp-graph").join("gcp-graph.log");
    }
    PathBuf::from("gcp-graph.log")
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let _log_guard = setup_logging(args.log_level)?;

    if let Command::Types = args.command {
        for key in get_all_resource_keys() {
            println!("{}", key);
        }
        return Ok(());
    }

    let mut config = Config::load();
    if args.project.is_some() {
        config.project_id = args.project.clone();
    }
    if !args.zone.is_empty() {
        config.zones = args.zone.clone();
    }
    if args.no_cache {
        config.use_cache = false;
    }

    let scopes = config.scopes();
    if scopes.is_empty() {
        bail!("No project configured. Pass --project or run 'gcloud config set project <id>'");
    }
    tracing::info!("Configured scopes: {:?}", scopes.iter().map(|s| s.to_string()).collect::<Vec<_>>());

    let cancel = CancellationToken::new();
    let on_interrupt = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("Interrupted, cancelling queries");
            on_interrupt.cancel();
        }
    });

    let credentials = match std::env::var("GCP_ACCESS_TOKEN") {
        Ok(token) if !token.is_empty() => GcpCredentials::fixed(token),
        _ => GcpCredentials::new().await?,
    };
    let client = Arc::new(GcpClient::with_credentials(credentials)?);
    let cache = Arc::new(ResultCache::new(Duration::from_secs(config.cache_ttl_secs)));
    let adapters = build_adapters(client, &scopes, cache, config.adapter_options(cancel))?;

    run(&args.command, &adapters).await
}

fn find_adapter<'a>(adapters: &'a [ResourceAdapter], item_type: &str) -> Result<&'a ResourceAdapter> {
    match adapters.iter().find(|a| a.item_type() == item_type) {
        Some(adapter) => Ok(adapter),
        None if get_all_resource_keys().iter().any(|k| *k == item_type) => {
            bail!("No configured scope serves {}", item_type)
        }
        None => bail!("Unknown resource type '{}'. Run 'gcp-graph types' for the list", item_type),
    }
}

async fn run(command: &Command, adapters: &[ResourceAdapter]) -> Result<()> {
    match command {
        Command::Types => Ok(()),
        Command::Get {
            item_type,
            scope,
            query,
        } => {
            let adapter = find_adapter(adapters, item_type)?;
            let item = adapter.get(scope, &split_key(query)).await?;
            print_item(&item)
        }
        Command::List { item_type, scope } => {
            let adapter = find_adapter(adapters, item_type)?;
            let (sink, stream) = query_channel();
            let produce = async move {
                adapter.list_stream(scope, &sink).await;
            };
            let (_, errors) = tokio::join!(produce, print_stream(stream));
            finish(errors?)
        }
        Command::Search {
            item_type,
            scope,
            query,
        } => {
            let adapter = find_adapter(adapters, item_type)?;
            let parts = split_key(query);
            let (sink, stream) = query_channel();
            let produce = async move {
                adapter.search_stream(scope, &parts, &sink).await;
            };
            let (_, errors) = tokio::join!(produce, print_stream(stream));
            finish(errors?)
        }
    }
}

fn print_item(item: &Item) -> Result<()> {
    let line = serde_json::to_string(item)?;
    let mut stdout = std::io::stdout().lock();
    writeln!(stdout, "{}", line)?;
    Ok(())
}

/// Print items as they arrive and errors to stderr; returns the error count
async fn print_stream(mut stream: QueryStream) -> Result<usize> {
    let mut errors = 0;
    while let Some(event) = stream.next().await {
        match event {
            QueryEvent::Item(item) => print_item(&item)?,
            QueryEvent::Error(e) => {
                errors += 1;
                eprintln!("Error: {}", e);
            }
        }
    }
    Ok(errors)
}

fn finish(errors: usize) -> Result<()> {
    if errors > 0 {
        bail!("{} error(s) while querying", errors);
    }
    Ok(())
}
