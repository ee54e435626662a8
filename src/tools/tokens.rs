//! ERC-20 reads

use alloy::dyn_abi::DynSolValue;
use alloy::eips::{BlockId, BlockNumberOrTag};
use alloy::network::Ethereum;
use alloy::primitives::{Address, U256};
use alloy::providers::DynProvider;
use anyhow::{anyhow, Context, Result};
use schemars::JsonSchema;
use serde::Deserialize;
use serde_json::json;

use crate::abi::call_function;
use crate::conversion::format_amount;
use crate::handlers::{ToolContext, ToolOutput};
use crate::inputs::parse_address;
use crate::render::chain_summary;

#[derive(Debug, Deserialize, JsonSchema)]
pub struct TokenArgs {
    /// ERC-20 token contract address
    pub token: String,
    /// Chain name, alias or id. Defaults to the configured default chain
    #[serde(default)]
    pub chain: Option<String>,
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct TokenBalanceArgs {
    /// ERC-20 token contract address
    pub token: String,
    /// Holder address
    pub owner: String,
    /// Chain name, alias or id. Defaults to the configured default chain
    #[serde(default)]
    pub chain: Option<String>,
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct TokenAllowanceArgs {
    /// ERC-20 token contract address
    pub token: String,
    /// Address that granted the allowance
    pub owner: String,
    /// Address allowed to spend
    pub spender: String,
    /// Chain name, alias or id. Defaults to the configured default chain
    #[serde(default)]
    pub chain: Option<String>,
}

fn latest() -> BlockId {
    BlockId::Number(BlockNumberOrTag::Latest)
}

async fn read_uint(
    provider: &DynProvider<Ethereum>,
    token: Address,
    signature: &str,
    args: Vec<DynSolValue>,
) -> Result<U256> {
    let values = call_function(provider, token, signature, args, latest()).await?;
    values
        .first()
        .and_then(DynSolValue::as_uint)
        .map(|(value, _)| value)
        .ok_or_else(|| anyhow!("{signature} returned no integer"))
}

async fn read_string(
    provider: &DynProvider<Ethereum>,
    token: Address,
    signature: &str,
) -> Result<String> {
    let values = call_function(provider, token, signature, vec![], latest()).await?;
    values
        .first()
        .and_then(DynSolValue::as_str)
        .map(str::to_string)
        .ok_or_else(|| anyhow!("{signature} returned no string"))
}

async fn read_decimals(provider: &DynProvider<Ethereum>, token: Address) -> Result<u8> {
    let decimals = read_uint(provider, token, "decimals() returns (uint8)", vec![])
        .await
        .with_context(|| format!("{token} does not look like an ERC-20 token"))?;
    u8::try_from(decimals).map_err(|_| anyhow!("decimals() returned {decimals}"))
}

pub async fn get_erc20_metadata(ctx: &ToolContext, args: TokenArgs) -> Result<ToolOutput> {
    let token = parse_address("token", &args.token)?;
    let client = ctx.client(args.chain.as_deref())?;
    let provider = client.provider();

    let (name, symbol, decimals, total_supply) = tokio::join!(
        read_string(provider, token, "name() returns (string)"),
        read_string(provider, token, "symbol() returns (string)"),
        read_decimals(provider, token),
        read_uint(provider, token, "totalSupply() returns (uint256)", vec![]),
    );
    let decimals = decimals?;
    let total_supply = total_supply?;

    ToolOutput::json(json!({
        "address": token.to_checksum(None),
        "chain": chain_summary(client.chain()),
        "name": name.ok(),
        "symbol": symbol.ok(),
        "decimals": decimals,
        "totalSupply": total_supply.to_string(),
        "totalSupplyFormatted": format_amount(total_supply, decimals)?,
    }))
}

pub async fn get_erc20_balance(ctx: &ToolContext, args: TokenBalanceArgs) -> Result<ToolOutput> {
    let token = parse_address("token", &args.token)?;
    let owner = parse_address("owner", &args.owner)?;
    let client = ctx.client(args.chain.as_deref())?;
    let provider = client.provider();

    let (balance, decimals, symbol) = tokio::join!(
        read_uint(
            provider,
            token,
            "balanceOf(address) returns (uint256)",
            vec![DynSolValue::Address(owner)],
        ),
        read_decimals(provider, token),
        read_string(provider, token, "symbol() returns (string)"),
    );
    let balance = balance?;
    let decimals = decimals?;

    ToolOutput::json(json!({
        "token": token.to_checksum(None),
        "owner": owner.to_checksum(None),
        "chain": chain_summary(client.chain()),
        "balance": balance.to_string(),
        "formatted": format_amount(balance, decimals)?,
        "decimals": decimals,
        "symbol": symbol.ok(),
    }))
}

pub async fn get_erc20_allowance(
    ctx: &ToolContext,
    args: TokenAllowanceArgs,
) -> Result<ToolOutput> {
    let token = parse_address("token", &args.token)?;
    let owner = parse_address("owner", &args.owner)?;
    let spender = parse_address("spender", &args.spender)?;
    let client = ctx.client(args.chain.as_deref())?;
    let provider = client.provider();

    let (allowance, decimals) = tokio::join!(
        read_uint(
            provider,
            token,
            "allowance(address,address) returns (uint256)",
            vec![DynSolValue::Address(owner), DynSolValue::Address(spender)],
        ),
        read_decimals(provider, token),
    );
    let allowance = allowance?;
    let decimals = decimals?;

    ToolOutput::json(json!({
        "token": token.to_checksum(None),
        "owner": owner.to_checksum(None),
        "spender": spender.to_checksum(None),
        "chain": chain_summary(client.chain()),
        "allowance": allowance.to_string(),
        "formatted": format_amount(allowance, decimals)?,
        "unlimited": allowance == U256::MAX,
    }))
}
