//! Transactions, receipts and transaction-request filling
//!
//! Nothing here signs or broadcasts. `prepare_transaction_request` only fills in the
//! fields a wallet would need.

use alloy::eips::{BlockId, BlockNumberOrTag};
use alloy::network::TransactionBuilder;
use alloy::providers::Provider;
use alloy::rpc::types::TransactionRequest;
use anyhow::{anyhow, Result};
use schemars::JsonSchema;
use serde::Deserialize;
use serde_json::{json, Value};
use std::future::IntoFuture;

use crate::handlers::{ToolContext, ToolOutput};
use crate::inputs::{
    parse_address, parse_block_id, parse_hash, parse_hex_bytes, parse_u256, parse_u64,
};
use crate::render::{chain_summary, to_json};
use crate::tools::fees::{suggest_fees, FeeSuggestion};

#[derive(Debug, Deserialize, JsonSchema)]
pub struct GetTransactionArgs {
    /// Transaction hash (0x-prefixed, 32 bytes)
    pub hash: String,
    /// Also fetch the receipt (status, gas used, logs)
    #[serde(default)]
    pub include_receipt: bool,
    /// Chain name, alias or id. Defaults to the configured default chain
    #[serde(default)]
    pub chain: Option<String>,
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct GetTransactionReceiptArgs {
    /// Transaction hash (0x-prefixed, 32 bytes)
    pub hash: String,
    /// Chain name, alias or id. Defaults to the configured default chain
    #[serde(default)]
    pub chain: Option<String>,
}

/// Fields of a transaction request.
#[derive(Debug, Default, Deserialize, JsonSchema)]
pub struct TransactionFields {
    /// Recipient address. Omit for contract creation
    #[serde(default)]
    pub to: Option<String>,
    /// Sender address
    #[serde(default)]
    pub from: Option<String>,
    /// Value in wei (decimal or 0x hex)
    #[serde(default)]
    pub value: Option<String>,
    /// Calldata or creation bytecode (0x hex)
    #[serde(default)]
    pub data: Option<String>,
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct EstimateGasArgs {
    #[serde(flatten)]
    pub tx: TransactionFields,
    /// Block to estimate against. Defaults to latest
    #[serde(default)]
    pub block: Option<String>,
    /// Chain name, alias or id. Defaults to the configured default chain
    #[serde(default)]
    pub chain: Option<String>,
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct PrepareTransactionArgs {
    #[serde(flatten)]
    pub tx: TransactionFields,
    /// Nonce to use. Defaults to the sender's pending nonce when `from` is given
    #[serde(default)]
    pub nonce: Option<String>,
    /// Gas limit to use. Estimated when omitted
    #[serde(default)]
    pub gas: Option<String>,
    /// Chain name, alias or id. Defaults to the configured default chain
    #[serde(default)]
    pub chain: Option<String>,
}

impl TransactionFields {
    /// Build the request. Addresses and amounts are validated here.
    pub fn to_request(&self) -> Result<TransactionRequest> {
        let mut request = TransactionRequest::default();
        if let Some(to) = self.to.as_deref() {
            request = request.with_to(parse_address("to", to)?);
        }
        if let Some(from) = self.from.as_deref() {
            request = request.with_from(parse_address("from", from)?);
        }
        if let Some(value) = self.value.as_deref() {
            request = request.with_value(parse_u256("value", value)?);
        }
        if let Some(data) = self.data.as_deref() {
            request = request.with_input(parse_hex_bytes("data", data)?);
        }
        Ok(request)
    }
}

pub async fn get_transaction(ctx: &ToolContext, args: GetTransactionArgs) -> Result<ToolOutput> {
    let hash = parse_hash("hash", &args.hash)?;
    let client = ctx.client(args.chain.as_deref())?;
    let provider = client.provider();

    let (transaction, receipt) = if args.include_receipt {
        let (transaction, receipt) = tokio::try_join!(
            provider.get_transaction_by_hash(hash).into_future(),
            provider.get_transaction_receipt(hash).into_future(),
        )?;
        (transaction, Some(receipt))
    } else {
        (provider.get_transaction_by_hash(hash).await?, None)
    };

    let transaction = transaction.ok_or_else(|| anyhow!("transaction {hash} not found"))?;
    let mut output = to_json(&transaction)?;
    if let (Some(receipt), Value::Object(map)) = (receipt, &mut output) {
        let receipt = match receipt {
            Some(receipt) => to_json(&receipt)?,
            None => Value::Null,
        };
        map.insert("receipt".to_string(), receipt);
    }
    Ok(ToolOutput::Json(output))
}

pub async fn get_transaction_receipt(
    ctx: &ToolContext,
    args: GetTransactionReceiptArgs,
) -> Result<ToolOutput> {
    let hash = parse_hash("hash", &args.hash)?;
    let client = ctx.client(args.chain.as_deref())?;

    let receipt = client
        .provider()
        .get_transaction_receipt(hash)
        .await?
        .ok_or_else(|| {
            anyhow!("receipt for {hash} not found; the transaction may be pending or unknown")
        })?;

    Ok(ToolOutput::Json(to_json(&receipt)?))
}

pub async fn estimate_gas(ctx: &ToolContext, args: EstimateGasArgs) -> Result<ToolOutput> {
    let request = args.tx.to_request()?;
    let block = parse_block_id("block", args.block.as_deref())?;
    let client = ctx.client(args.chain.as_deref())?;

    let gas = client.provider().estimate_gas(request).block(block).await?;

    ToolOutput::json(json!({
        "chain": chain_summary(client.chain()),
        "gas": gas.to_string(),
    }))
}

pub async fn prepare_transaction_request(
    ctx: &ToolContext,
    args: PrepareTransactionArgs,
) -> Result<ToolOutput> {
    let mut request = args.tx.to_request()?;
    let nonce = args.nonce.as_deref().map(|n| parse_u64("nonce", n)).transpose()?;
    let gas = args.gas.as_deref().map(|g| parse_u64("gas", g)).transpose()?;
    let client = ctx.client(args.chain.as_deref())?;
    let provider = client.provider();

    request = request.with_chain_id(client.chain_id());

    match (nonce, request.from) {
        (Some(nonce), _) => request = request.with_nonce(nonce),
        (None, Some(from)) => {
            let pending = provider
                .get_transaction_count(from)
                .block_id(BlockId::Number(BlockNumberOrTag::Pending))
                .await?;
            request = request.with_nonce(pending);
        }
        (None, None) => {}
    }

    let gas_limit = match gas {
        Some(gas) => gas,
        None => provider.estimate_gas(request.clone()).await?,
    };
    request = request.with_gas_limit(gas_limit);

    request = match suggest_fees(provider).await? {
        FeeSuggestion::Eip1559 {
            max_fee_per_gas,
            max_priority_fee_per_gas,
            ..
        } => request
            .with_max_fee_per_gas(max_fee_per_gas)
            .with_max_priority_fee_per_gas(max_priority_fee_per_gas),
        FeeSuggestion::Legacy { gas_price } => request.with_gas_price(gas_price),
    };

    Ok(ToolOutput::Json(to_json(&request)?))
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy::primitives::{address, U256};

    #[test]
    fn test_transaction_fields_to_request() {
        let fields = TransactionFields {
            to: Some("0xd8da6bf26964af9d7eed9e03e53415d37aa96045".to_string()),
            from: None,
            value: Some("0x10".to_string()),
            data: Some("0xdeadbeef".to_string()),
        };
        let request = fields.to_request().unwrap();
        assert_eq!(
            request.to.and_then(|kind| kind.to().copied()),
            Some(address!("d8da6bf26964af9d7eed9e03e53415d37aa96045"))
        );
        assert_eq!(request.value, Some(U256::from(16u64)));
        assert_eq!(request.input.input().map(|b| b.len()), Some(4));
    }

    #[test]
    fn test_transaction_fields_validation_names_field() {
        let fields = TransactionFields {
            from: Some("0xnope".to_string()),
            ..TransactionFields::default()
        };
        let err = fields.to_request().unwrap_err();
        assert!(err.to_string().contains("invalid from"));
    }

    #[test]
    fn test_flattened_args_deserialize() {
        let args: PrepareTransactionArgs = serde_json::from_value(json!({
            "to": "0xd8da6bf26964af9d7eed9e03e53415d37aa96045",
            "value": "1",
            "nonce": "7",
            "chain": "base",
        }))
        .unwrap();
        assert_eq!(args.tx.value.as_deref(), Some("1"));
        assert_eq!(args.nonce.as_deref(), Some("7"));
        assert_eq!(args.chain.as_deref(), Some("base"));
    }
}
