//! userbase MCP client
//!
//! Spawns the server, discovers its catalog and drives it interactively.
//! Requires GEMINI_API_KEY (a `.env` file is honored).

use std::sync::Arc;

use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use userbase::console::{DialoguerOperator, MessageReducer, Operator, SamplingResponder, Session};
use userbase::error::{Result, UserbaseError};
use userbase::genai::{GeminiClient, TextGenerator, DEFAULT_MODEL};
use userbase::mcp::protocol::Implementation;
use userbase::mcp::McpClient;

#[derive(Parser, Debug)]
#[command(name = "userbase-client")]
#[command(about = "Interactive MCP client with Gemini sampling")]
#[command(version)]
struct Cli {
    /// Server executable to spawn
    #[arg(long, env = "USERBASE_SERVER_COMMAND", default_value = "userbase-server")]
    server_command: String,

    /// Extra arguments passed to the server
    #[arg(last = true)]
    server_args: Vec<String>,

    /// Gemini model used for queries and sampling
    #[arg(long, env = "GEMINI_MODEL", default_value = DEFAULT_MODEL)]
    model: String,

    /// Gemini API base URL
    #[arg(long, env = "GEMINI_API_BASE")]
    api_base: Option<String>,

    /// Gemini API key
    #[arg(long, env = "GEMINI_API_KEY", hide_env_values = true)]
    api_key: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();

    // stdout belongs to the console
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();

    let api_key = cli
        .api_key
        .ok_or_else(|| UserbaseError::Config("GEMINI_API_KEY is required".to_string()))?;
    let generator: Arc<dyn TextGenerator> =
        Arc::new(GeminiClient::with_config(api_key, cli.api_base, Some(cli.model)));
    let operator: Arc<dyn Operator> = Arc::new(DialoguerOperator);
    let reducer = Arc::new(MessageReducer::new(generator, operator));

    let responder = Arc::new(SamplingResponder::new(Arc::clone(&reducer)));
    let client = McpClient::spawn(&cli.server_command, &cli.server_args, responder).await?;

    client
        .initialize(Implementation {
            name: "userbase-client".to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        })
        .await?;
    let catalog = client.discover().await?;
    tracing::info!(
        tools = catalog.tools.len(),
        prompts = catalog.prompts.len(),
        resources = catalog.resources.len(),
        templates = catalog.resource_templates.len(),
        "Catalog loaded"
    );

    println!("You are connected!");
    Session::new(client, catalog, reducer).run().await?;
    println!("Goodbye!");

    Ok(())
}
