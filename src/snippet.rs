//! Installer snippets for MCP hosts
//!
//! Renders a `claude mcp add` command and a Cursor `mcpServers` block for a set of
//! networks, optionally wired to an RPC provider with an API key. The environment
//! variables emitted are the ones [`crate::config`] and the registry read back.

use serde_json::{json, Map, Value};
use std::sync::Arc;
use thiserror::Error;

use crate::chains::{env_case, ChainDescriptor, ChainRegistry};
use crate::config::{DEFAULT_CHAIN_ID_VAR, RPC_PROVIDER_VAR};

/// Hosted RPC providers with per-chain URL templates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum RpcProvider {
    Alchemy,
    Infura,
}

impl RpcProvider {
    pub fn id(&self) -> &'static str {
        match self {
            Self::Alchemy => "alchemy",
            Self::Infura => "infura",
        }
    }

    fn subdomain(&self, chain_id: u64) -> Option<&'static str> {
        let table: &[(u64, &str)] = match self {
            Self::Alchemy => ALCHEMY_NETWORKS,
            Self::Infura => INFURA_NETWORKS,
        };
        table
            .iter()
            .find(|(id, _)| *id == chain_id)
            .map(|(_, subdomain)| *subdomain)
    }

    /// Endpoint URL for `chain_id`, if the provider serves it.
    pub fn rpc_url(&self, chain_id: u64, api_key: &str) -> Option<String> {
        let subdomain = self.subdomain(chain_id)?;
        Some(match self {
            Self::Alchemy => format!("https://{subdomain}.g.alchemy.com/v2/{api_key}"),
            Self::Infura => format!("https://{subdomain}.infura.io/v3/{api_key}"),
        })
    }
}

const ALCHEMY_NETWORKS: &[(u64, &str)] = &[
    (1, "eth-mainnet"),
    (11155111, "eth-sepolia"),
    (17000, "eth-holesky"),
    (10, "opt-mainnet"),
    (11155420, "opt-sepolia"),
    (42161, "arb-mainnet"),
    (421614, "arb-sepolia"),
    (8453, "base-mainnet"),
    (84532, "base-sepolia"),
    (137, "polygon-mainnet"),
    (80002, "polygon-amoy"),
    (56, "bnb-mainnet"),
    (43114, "avax-mainnet"),
    (100, "gnosis-mainnet"),
    (324, "zksync-mainnet"),
    (59144, "linea-mainnet"),
    (534352, "scroll-mainnet"),
    (42220, "celo-mainnet"),
    (81457, "blast-mainnet"),
    (5000, "mantle-mainnet"),
];

const INFURA_NETWORKS: &[(u64, &str)] = &[
    (1, "mainnet"),
    (11155111, "sepolia"),
    (17000, "holesky"),
    (10, "optimism-mainnet"),
    (11155420, "optimism-sepolia"),
    (42161, "arbitrum-mainnet"),
    (421614, "arbitrum-sepolia"),
    (8453, "base-mainnet"),
    (84532, "base-sepolia"),
    (137, "polygon-mainnet"),
    (80002, "polygon-amoy"),
    (56, "bsc-mainnet"),
    (43114, "avalanche-mainnet"),
    (324, "zksync-mainnet"),
    (59144, "linea-mainnet"),
    (534352, "scroll-mainnet"),
    (42220, "celo-mainnet"),
    (81457, "blast-mainnet"),
    (5000, "mantle-mainnet"),
];

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SnippetError {
    #[error("unknown network '{0}'")]
    UnknownNetwork(String),

    #[error("{provider} does not serve {network} ({chain_id})")]
    UnsupportedNetwork {
        provider: &'static str,
        network: String,
        chain_id: u64,
    },

    #[error("an API key is required for {0}")]
    MissingApiKey(&'static str),
}

/// What to put in the snippets.
#[derive(Debug, Clone)]
pub struct SnippetRequest {
    /// Name the server is registered under in the host.
    pub server_name: String,
    /// Executable the host launches.
    pub command: String,
    pub networks: Vec<String>,
    pub provider: Option<RpcProvider>,
    pub api_key: Option<String>,
    pub default_chain_id: Option<u64>,
}

impl Default for SnippetRequest {
    fn default() -> Self {
        Self {
            server_name: "evm".to_string(),
            command: "evm-mcp".to_string(),
            networks: Vec::new(),
            provider: None,
            api_key: None,
            default_chain_id: None,
        }
    }
}

/// Rendered snippets.
#[derive(Debug, Clone, PartialEq)]
pub struct Snippets {
    /// Ordered environment for the server process.
    pub env: Vec<(String, String)>,
    pub claude_command: String,
    pub cursor_config: Value,
}

/// `<NETWORK>_RPC_URL_<PROVIDER>` for a chain.
pub fn rpc_env_var(chain: &ChainDescriptor, provider: RpcProvider) -> String {
    format!(
        "{}_RPC_URL_{}",
        env_case(&chain.name),
        provider.id().to_uppercase()
    )
}

fn resolve_network(
    registry: &ChainRegistry,
    network: &str,
) -> Result<Arc<ChainDescriptor>, SnippetError> {
    registry
        .resolve_by_name(network)
        .or_else(|| network.parse().ok().and_then(|id| registry.resolve_by_id(id)))
        .ok_or_else(|| SnippetError::UnknownNetwork(network.to_string()))
}

/// Environment variables for the request, in emission order.
pub fn build_env(
    registry: &ChainRegistry,
    request: &SnippetRequest,
) -> Result<Vec<(String, String)>, SnippetError> {
    let mut env = Vec::new();

    if let Some(provider) = request.provider {
        let api_key = request
            .api_key
            .as_deref()
            .map(str::trim)
            .filter(|k| !k.is_empty())
            .ok_or(SnippetError::MissingApiKey(provider.id()))?;

        env.push((RPC_PROVIDER_VAR.to_string(), provider.id().to_string()));
        if let Some(id) = request.default_chain_id {
            env.push((DEFAULT_CHAIN_ID_VAR.to_string(), id.to_string()));
        }

        let mut seen = Vec::new();
        for network in &request.networks {
            let chain = resolve_network(registry, network)?;
            if seen.contains(&chain.id) {
                continue;
            }
            seen.push(chain.id);
            let url = provider
                .rpc_url(chain.id, api_key)
                .ok_or_else(|| SnippetError::UnsupportedNetwork {
                    provider: provider.id(),
                    network: chain.name.clone(),
                    chain_id: chain.id,
                })?;
            env.push((rpc_env_var(&chain, provider), url));
        }
    } else {
        for network in &request.networks {
            resolve_network(registry, network)?;
        }
        if let Some(id) = request.default_chain_id {
            env.push((DEFAULT_CHAIN_ID_VAR.to_string(), id.to_string()));
        }
    }

    Ok(env)
}

fn shell_quote(value: &str) -> String {
    let safe = value
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || "-_./:=@,+".contains(c));
    if safe && !value.is_empty() {
        value.to_string()
    } else {
        format!("'{}'", value.replace('\'', r"'\''"))
    }
}

/// One-line `claude mcp add` installer.
pub fn claude_command(server_name: &str, command: &str, env: &[(String, String)]) -> String {
    let mut parts = vec!["claude mcp add".to_string(), shell_quote(server_name)];
    for (key, value) in env {
        parts.push(format!("-e {}", shell_quote(&format!("{key}={value}"))));
    }
    parts.push("--".to_string());
    parts.push(shell_quote(command));
    parts.join(" ")
}

/// Cursor `mcpServers` configuration block.
pub fn cursor_config(server_name: &str, command: &str, env: &[(String, String)]) -> Value {
    let env: Map<String, Value> = env
        .iter()
        .map(|(k, v)| (k.clone(), Value::String(v.clone())))
        .collect();
    json!({
        "mcpServers": {
            server_name: {
                "command": command,
                "args": [],
                "env": env,
            }
        }
    })
}

pub fn render(
    registry: &ChainRegistry,
    request: &SnippetRequest,
) -> Result<Snippets, SnippetError> {
    let env = build_env(registry, request)?;
    Ok(Snippets {
        claude_command: claude_command(&request.server_name, &request.command, &env),
        cursor_config: cursor_config(&request.server_name, &request.command, &env),
        env,
    })
}
