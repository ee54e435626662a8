//! Chain identity and registry listing

use alloy::providers::Provider;
use anyhow::Result;
use schemars::JsonSchema;
use serde::Deserialize;
use serde_json::{json, Value};

use crate::chains::ChainRegistry;
use crate::clients::endpoint_origin;
use crate::handlers::{ToolContext, ToolOutput};

#[derive(Debug, Deserialize, JsonSchema)]
pub struct GetChainIdArgs {
    /// Chain name, alias or id. Defaults to the configured default chain
    #[serde(default)]
    pub chain: Option<String>,
}

#[derive(Debug, Default, Deserialize, JsonSchema)]
pub struct ListChainsArgs {
    /// Include testnets (default true)
    #[serde(default)]
    pub include_testnets: Option<bool>,
}

pub async fn get_chain_id(ctx: &ToolContext, args: GetChainIdArgs) -> Result<ToolOutput> {
    let client = ctx.client(args.chain.as_deref())?;
    let reported = client.provider().get_chain_id().await?;

    if reported != client.chain_id() {
        tracing::warn!(
            expected = client.chain_id(),
            reported,
            endpoint = %endpoint_origin(client.rpc_url()),
            "endpoint reports a different chain id"
        );
    }

    ToolOutput::json(json!({
        "chainId": reported.to_string(),
        "expectedChainId": client.chain_id().to_string(),
        "name": client.chain().name,
        "matches": reported == client.chain_id(),
        "endpoint": endpoint_origin(client.rpc_url()),
        "customRpc": client.is_custom_rpc(),
    }))
}

/// Registry listing shared by the `list_supported_chains` tool and the chains resource.
pub fn chains_json(
    registry: &ChainRegistry,
    default_chain_id: u64,
    include_testnets: bool,
) -> Value {
    let chains: Vec<Value> = registry
        .chains()
        .into_iter()
        .filter(|chain| include_testnets || !chain.testnet)
        .map(|chain| {
            json!({
                "id": chain.id.to_string(),
                "name": chain.name,
                "nativeCurrency": chain.native_currency.symbol,
                "aliases": registry.aliases_for(chain.id),
                "testnet": chain.testnet,
                "explorer": chain.explorer,
                "default": chain.id == default_chain_id,
            })
        })
        .collect();
    Value::Array(chains)
}

pub fn list_supported_chains(ctx: &ToolContext, args: ListChainsArgs) -> Result<ToolOutput> {
    let default_chain_id = ctx.clients().default_chain_id();
    let chains = chains_json(
        ctx.registry(),
        default_chain_id,
        args.include_testnets.unwrap_or(true),
    );
    ToolOutput::json(json!({
        "defaultChainId": default_chain_id.to_string(),
        "chains": chains,
    }))
}
