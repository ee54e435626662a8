//! Balance and account state

use alloy::providers::Provider;
use anyhow::Result;
use schemars::JsonSchema;
use serde::Deserialize;
use serde_json::json;
use std::future::IntoFuture;

use crate::conversion::format_amount;
use crate::handlers::{ToolContext, ToolOutput};
use crate::inputs::{parse_address, parse_block_id};
use crate::render::chain_summary;

#[derive(Debug, Deserialize, JsonSchema)]
pub struct GetBalanceArgs {
    /// Account address (0x-prefixed, 20 bytes)
    pub address: String,
    /// Block number, tag (latest, safe, finalized, earliest, pending) or block hash. Defaults to latest
    #[serde(default)]
    pub block: Option<String>,
    /// Chain name, alias or id (e.g. "mainnet", "base", "42161"). Defaults to the configured default chain
    #[serde(default)]
    pub chain: Option<String>,
}

pub type GetAccountInfoArgs = GetBalanceArgs;

pub async fn get_balance(ctx: &ToolContext, args: GetBalanceArgs) -> Result<ToolOutput> {
    let address = parse_address("address", &args.address)?;
    let block = parse_block_id("block", args.block.as_deref())?;
    let client = ctx.client(args.chain.as_deref())?;

    let wei = client.provider().get_balance(address).block_id(block).await?;
    let currency = &client.chain().native_currency;

    ToolOutput::json(json!({
        "address": address.to_checksum(None),
        "chain": chain_summary(client.chain()),
        "wei": wei.to_string(),
        "formatted": format_amount(wei, currency.decimals)?,
        "symbol": currency.symbol,
    }))
}

pub async fn get_account_info(ctx: &ToolContext, args: GetAccountInfoArgs) -> Result<ToolOutput> {
    let address = parse_address("address", &args.address)?;
    let block = parse_block_id("block", args.block.as_deref())?;
    let client = ctx.client(args.chain.as_deref())?;
    let provider = client.provider();

    let (balance, nonce, code) = tokio::try_join!(
        provider.get_balance(address).block_id(block).into_future(),
        provider
            .get_transaction_count(address)
            .block_id(block)
            .into_future(),
        provider.get_code_at(address).block_id(block).into_future(),
    )?;
    let currency = &client.chain().native_currency;

    ToolOutput::json(json!({
        "address": address.to_checksum(None),
        "chain": chain_summary(client.chain()),
        "balance": {
            "wei": balance.to_string(),
            "formatted": format_amount(balance, currency.decimals)?,
            "symbol": currency.symbol,
        },
        "nonce": nonce.to_string(),
        "isContract": !code.is_empty(),
        "codeSize": code.len(),
    }))
}
