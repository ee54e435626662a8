//! Block reads

use alloy::providers::Provider;
use anyhow::{anyhow, Result};
use schemars::JsonSchema;
use serde::Deserialize;
use serde_json::json;

use crate::handlers::{ToolContext, ToolOutput};
use crate::inputs::parse_block_id;
use crate::render::{chain_summary, to_json};

#[derive(Debug, Deserialize, JsonSchema)]
pub struct GetBlockArgs {
    /// Block number, tag (latest, safe, finalized, earliest, pending) or block hash. Defaults to latest
    #[serde(default)]
    pub block: Option<String>,
    /// Include full transaction objects instead of hashes
    #[serde(default)]
    pub full_transactions: bool,
    /// Chain name, alias or id. Defaults to the configured default chain
    #[serde(default)]
    pub chain: Option<String>,
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct GetBlockNumberArgs {
    /// Chain name, alias or id. Defaults to the configured default chain
    #[serde(default)]
    pub chain: Option<String>,
}

pub async fn get_block(ctx: &ToolContext, args: GetBlockArgs) -> Result<ToolOutput> {
    let block_id = parse_block_id("block", args.block.as_deref())?;
    let client = ctx.client(args.chain.as_deref())?;

    let request = client.provider().get_block(block_id);
    let block = if args.full_transactions {
        request.full().await?
    } else {
        request.await?
    };
    let block = block.ok_or_else(|| anyhow!("block {block_id} not found"))?;

    Ok(ToolOutput::Json(to_json(&block)?))
}

pub async fn get_block_number(ctx: &ToolContext, args: GetBlockNumberArgs) -> Result<ToolOutput> {
    let client = ctx.client(args.chain.as_deref())?;
    let number = client.provider().get_block_number().await?;
    ToolOutput::json(json!({
        "chain": chain_summary(client.chain()),
        "blockNumber": number.to_string(),
    }))
}
