//! userbase MCP server
//!
//! Run with: userbase-server

use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use userbase::catalog::{build_registry, server_info};
use userbase::error::Result;
use userbase::mcp::McpServer;
use userbase::storage::UserStore;

#[derive(Parser, Debug)]
#[command(name = "userbase-server")]
#[command(about = "MCP server exposing a JSON user database")]
#[command(version)]
struct Args {
    /// User database path (JSON array)
    #[arg(
        long,
        env = "USERBASE_DATA_PATH",
        default_value = "~/.local/share/userbase/users.json"
    )]
    data_path: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging to stderr (stdout is for MCP protocol)
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_ansi(false),
        )
        .with(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let args = Args::parse();

    // Expand ~ in path
    let data_path = shellexpand::tilde(&args.data_path).to_string();
    let store = UserStore::open(data_path);
    tracing::info!("User store at {}", store.path().display());

    let registry = build_registry(store)?;
    let server = McpServer::new(registry, server_info());

    tracing::info!("userbase MCP server starting...");
    server.run().await?;
    tracing::info!("Client disconnected, shutting down");

    Ok(())
}
