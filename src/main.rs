//! EVM MCP Server - Entry point

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use rmcp::service::ServiceExt;
use std::io;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use evm_mcp::{
    chains::ChainRegistry,
    clients::ClientManager,
    config::{Config, ProcessEnv},
    snippet::{self, RpcProvider, SnippetRequest},
    tools::chain::chains_json,
    EvmMcpHandler,
};

/// EVM MCP Server - Model Context Protocol server for Ethereum-compatible chains
#[derive(Parser, Debug)]
#[command(name = "evm-mcp")]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Serve MCP over stdio (default)
    Serve,

    /// Print installer snippets for Claude Code and Cursor
    Snippet {
        /// Networks to configure (names, aliases or ids)
        #[arg(short, long, value_delimiter = ',', default_value = "mainnet")]
        networks: Vec<String>,

        /// Hosted RPC provider
        #[arg(short, long, value_enum)]
        provider: Option<RpcProvider>,

        /// API key for the provider
        #[arg(long, env = "EVM_MCP_API_KEY", hide_env_values = true)]
        api_key: Option<String>,

        /// Chain id used when a tool call does not name a chain
        #[arg(long)]
        default_chain_id: Option<u64>,

        /// Name the server is registered under
        #[arg(long, default_value = "evm")]
        server_name: String,
    },

    /// List the chains the server knows about
    Chains,
}

fn init_tracing() {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "evm_mcp=info".into());

    // stdout carries the MCP protocol
    let fmt_layer = tracing_subscriber::fmt::layer()
        .with_writer(io::stderr)
        .with_ansi(false);

    if tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt_layer)
        .try_init()
        .is_err()
    {
        eprintln!("Failed to initialize tracing subscriber");
    }
}

fn build_registry() -> Arc<ChainRegistry> {
    let registry = ChainRegistry::with_builtin_chains(Arc::new(ProcessEnv));
    let custom = registry.load_from_environment();
    if custom > 0 {
        tracing::info!(count = custom, "registered custom chains");
    }
    Arc::new(registry)
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing();

    match cli.command.unwrap_or(Command::Serve) {
        Command::Serve => serve().await,
        Command::Snippet {
            networks,
            provider,
            api_key,
            default_chain_id,
            server_name,
        } => {
            let request = SnippetRequest {
                server_name,
                networks,
                provider,
                api_key,
                default_chain_id,
                ..SnippetRequest::default()
            };
            let snippets = snippet::render(&build_registry(), &request)?;
            println!("# Claude Code\n{}\n", snippets.claude_command);
            println!(
                "# Cursor (~/.cursor/mcp.json)\n{}",
                serde_json::to_string_pretty(&snippets.cursor_config)?
            );
            Ok(())
        }
        Command::Chains => {
            let config = Config::from_process_env();
            let chains = chains_json(&build_registry(), config.default_chain_id, true);
            println!("{}", serde_json::to_string_pretty(&chains)?);
            Ok(())
        }
    }
}

async fn serve() -> Result<()> {
    let config = Config::from_process_env();
    let registry = build_registry();

    log_config_status(&config, &registry);

    let clients = Arc::new(ClientManager::new(registry, &config));
    let handler = EvmMcpHandler::new(clients);

    // Serve using stdio transport
    let stdin = tokio::io::stdin();
    let stdout = tokio::io::stdout();

    let service = handler
        .serve((stdin, stdout))
        .await
        .context("failed to start MCP service")?;
    service.waiting().await?;

    Ok(())
}

/// Log the effective configuration to stderr.
fn log_config_status(config: &Config, registry: &ChainRegistry) {
    match registry.resolve_by_id(config.default_chain_id) {
        Some(chain) => tracing::info!(
            chain_id = chain.id,
            name = %chain.name,
            "default chain"
        ),
        None => tracing::warn!(
            chain_id = config.default_chain_id,
            "default chain is not registered; calls without a chain will fail"
        ),
    }
    tracing::info!(
        rpc_provider = %registry.rpc_provider(),
        dynamic_chains = config.dynamic_chains,
        chains = registry.chains().len(),
        "configuration loaded"
    );
}
