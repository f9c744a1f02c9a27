//! Label Studio MCP Server - Rust Implementation
//!
//! A Model Context Protocol (MCP) server for Label Studio.
//! Exposes tools for managing projects, tasks, annotations and predictions.

use clap::{Parser, Subcommand};

use label_studio_mcp::config::Config;
use label_studio_mcp::error::Result;
use label_studio_mcp::label_studio;
use label_studio_mcp::mcp::server::McpServer;
use label_studio_mcp::mcp::tools::ToolRegistry;

/// Label Studio MCP Server
#[derive(Parser)]
#[command(name = "label-studio-mcp")]
#[command(author, version, about = "Label Studio MCP Server - A Model Context Protocol server for Label Studio")]
struct Cli {
    /// Label Studio base URL (overrides LABEL_STUDIO_URL)
    #[arg(long)]
    url: Option<String>,

    /// Label Studio API key (overrides LABEL_STUDIO_API_KEY)
    #[arg(long)]
    api_key: Option<String>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the tool catalogue as JSON and exit
    Tools,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging; stdout is reserved for the protocol
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    // Load configuration
    let mut config = Config::from_env()?;
    if let Some(url) = cli.url {
        config = config.with_base_url(url);
    }
    if let Some(api_key) = cli.api_key {
        config = config.with_api_key(api_key);
    }

    match cli.command {
        Some(Commands::Tools) => {
            let registry = ToolRegistry::new(config, None);
            println!("{}", serde_json::to_string_pretty(&registry.list_tools())?);
        }
        None => {
            run_server(config).await?;
        }
    }

    Ok(())
}

async fn run_server(config: Config) -> Result<()> {
    // A missing connection is not fatal: every tool reports it instead
    let client = label_studio::connect(&config);

    let registry = ToolRegistry::new(config, client);
    let mut server = McpServer::new(registry);
    server.run_stdio().await?;

    Ok(())
}
