//! table-query-mcp: MCP server exposing a tabular data source to AI agents
//!
//! Loads a table from disk and serves `query_table` and `describe_schema`
//! over JSON-RPC on a single HTTP endpoint.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;
use tracing::{error, info, warn, Level};
use tracing_subscriber::EnvFilter;

use table_query_mcp::config::{self, Config};
use table_query_mcp::error::ServeError;
use table_query_mcp::mcp::{self, McpServer};
use table_query_mcp::source::MemoryTable;

/// MCP server exposing a tabular data source to AI agents.
///
/// Serves filtered, paginated queries over JSON-RPC 2.0 on one HTTP endpoint.
#[derive(Parser, Debug)]
#[command(name = "table-query-mcp")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to configuration file
    #[arg(value_name = "CONFIG_FILE")]
    config: Option<PathBuf>,

    /// Address to listen on, overriding `server.bind`
    #[arg(short, long, value_name = "ADDR")]
    bind: Option<SocketAddr>,

    /// Increase logging verbosity (-v for info, -vv for debug, -vvv for trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Decrease logging verbosity (only show errors)
    #[arg(short, long)]
    quiet: bool,
}

/// Determines the log level from CLI arguments.
#[allow(clippy::match_same_arms)] // Explicit "warn" arm for clarity
fn get_log_level(verbose: u8, quiet: bool, config_level: &str) -> Level {
    if quiet {
        return Level::ERROR;
    }

    match verbose {
        0 => match config_level.to_lowercase().as_str() {
            "trace" => Level::TRACE,
            "debug" => Level::DEBUG,
            "info" => Level::INFO,
            "warn" => Level::WARN,
            "error" => Level::ERROR,
            _ => Level::WARN, // Default to warn for unknown levels
        },
        1 => Level::INFO,
        2 => Level::DEBUG,
        _ => Level::TRACE,
    }
}

/// Initialises the tracing subscriber for logging.
fn init_tracing(level: Level) {
    let filter = EnvFilter::from_default_env().add_directive(level.into());

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

/// Loads the table and serves it until shutdown.
async fn run(cfg: Config, addr: SocketAddr) -> Result<(), ServeError> {
    let table = MemoryTable::load(&cfg.table.data_path)
        .await?
        .with_facets(cfg.table.facets);

    let name = cfg.table.name.as_deref().unwrap_or("<unnamed>");
    if table.is_empty() {
        warn!(table = name, path = %cfg.table.data_path.display(), "Table has no rows");
    }
    info!(
        table = name,
        rows = table.len(),
        columns = table.columns().count(),
        filters = cfg.schema.len(),
        "Table loaded"
    );

    let mut server = McpServer::new(cfg.schema, Arc::new(table));
    if let Some(description) = cfg.table.description {
        server = server.with_description(description);
    }

    mcp::http::serve(Arc::new(server), addr, &cfg.server.path).await?;
    Ok(())
}

/// Entry point for the table-query-mcp server.
fn main() -> ExitCode {
    let args = Args::parse();

    // Load configuration
    let config_path = args.config.as_deref();
    let cfg = match config::load_config(config_path) {
        Ok(cfg) => cfg,
        Err(e) => {
            eprintln!("Configuration error: {e}");
            if config_path.is_none() {
                if let Some(default_path) = config::default_config_path() {
                    eprintln!("\nExpected config at: {}", default_path.display());
                    eprintln!("Create one based on config/example-config.json");
                }
            }
            return ExitCode::FAILURE;
        }
    };

    // Initialise logging
    let log_level = get_log_level(args.verbose, args.quiet, &cfg.logging.level);
    init_tracing(log_level);

    info!(
        version = env!("CARGO_PKG_VERSION"),
        "Starting table-query-mcp server"
    );

    let addr = match args.bind {
        Some(addr) => addr,
        None => match cfg.server.socket_addr() {
            Ok(addr) => addr,
            Err(e) => {
                error!(error = %e, "Invalid bind address");
                return ExitCode::FAILURE;
            }
        },
    };

    let runtime = match tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(e) => {
            error!(error = %e, "Failed to create Tokio runtime");
            return ExitCode::FAILURE;
        }
    };

    match runtime.block_on(run(cfg, addr)) {
        Ok(()) => {
            info!("Server shut down gracefully");
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!(error = %e, "Server error");
            ExitCode::FAILURE
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn verify_cli() {
        use clap::CommandFactory;
        Args::command().debug_assert();
    }

    #[test]
    fn quiet_overrides_everything() {
        assert_eq!(get_log_level(3, true, "trace"), Level::ERROR);
    }

    #[test]
    fn verbosity_overrides_config_level() {
        assert_eq!(get_log_level(1, false, "error"), Level::INFO);
        assert_eq!(get_log_level(2, false, "error"), Level::DEBUG);
        assert_eq!(get_log_level(5, false, "error"), Level::TRACE);
    }

    #[test]
    fn config_level_used_without_flags() {
        assert_eq!(get_log_level(0, false, "DEBUG"), Level::DEBUG);
        assert_eq!(get_log_level(0, false, "loud"), Level::WARN);
    }
}
