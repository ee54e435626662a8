//! ENS tools
//!
//! ENS lives on mainnet, so these tools default to `mainnet` rather than the
//! configured default chain.

use anyhow::Result;
use schemars::JsonSchema;
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;

use crate::clients::ChainClient;
use crate::ens;
use crate::handlers::{ToolContext, ToolOutput};
use crate::inputs::{parse_address, require};

const ENS_CHAIN: &str = "mainnet";

#[derive(Debug, Deserialize, JsonSchema)]
pub struct ResolveNameArgs {
    /// ENS name, e.g. vitalik.eth
    pub name: String,
    /// Chain holding the ENS registry. Defaults to mainnet
    #[serde(default)]
    pub chain: Option<String>,
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct LookupAddressArgs {
    /// Address to reverse-resolve
    pub address: String,
    /// Chain holding the ENS registry. Defaults to mainnet
    #[serde(default)]
    pub chain: Option<String>,
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct GetTextArgs {
    /// ENS name, e.g. vitalik.eth
    pub name: String,
    /// Text record key, e.g. url, avatar, description, com.twitter, com.github
    pub key: String,
    /// Chain holding the ENS registry. Defaults to mainnet
    #[serde(default)]
    pub chain: Option<String>,
}

fn ens_client(ctx: &ToolContext, chain: Option<&str>) -> Result<Arc<ChainClient>> {
    ctx.client(Some(chain.unwrap_or(ENS_CHAIN)))
}

pub async fn resolve_ens_name(ctx: &ToolContext, args: ResolveNameArgs) -> Result<ToolOutput> {
    let name = ens::normalize_name(&args.name)?;
    let client = ens_client(ctx, args.chain.as_deref())?;

    let address = ens::resolve_name(client.provider(), &name).await?;
    ToolOutput::json(json!({
        "name": name,
        "address": address.map(|a| a.to_checksum(None)),
    }))
}

pub async fn lookup_ens_address(ctx: &ToolContext, args: LookupAddressArgs) -> Result<ToolOutput> {
    let address = parse_address("address", &args.address)?;
    let client = ens_client(ctx, args.chain.as_deref())?;

    let name = ens::lookup_address(client.provider(), address).await?;
    ToolOutput::json(json!({
        "address": address.to_checksum(None),
        "name": name,
    }))
}

pub async fn get_ens_resolver(ctx: &ToolContext, args: ResolveNameArgs) -> Result<ToolOutput> {
    let name = ens::normalize_name(&args.name)?;
    let client = ens_client(ctx, args.chain.as_deref())?;

    let resolver = ens::resolver(client.provider(), &name).await?;
    ToolOutput::json(json!({
        "name": name,
        "resolver": resolver.map(|a| a.to_checksum(None)),
    }))
}

pub async fn get_ens_text(ctx: &ToolContext, args: GetTextArgs) -> Result<ToolOutput> {
    let name = ens::normalize_name(&args.name)?;
    let key = require("key", Some(&args.key))?;
    let client = ens_client(ctx, args.chain.as_deref())?;

    let value = ens::text(client.provider(), &name, key).await?;
    ToolOutput::json(json!({
        "name": name,
        "key": key,
        "value": value,
    }))
}

pub async fn get_ens_avatar(ctx: &ToolContext, args: ResolveNameArgs) -> Result<ToolOutput> {
    let name = ens::normalize_name(&args.name)?;
    let client = ens_client(ctx, args.chain.as_deref())?;

    let avatar = ens::avatar(client.provider(), &name).await?;
    ToolOutput::json(json!({
        "name": name,
        "avatar": avatar,
    }))
}
