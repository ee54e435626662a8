//! Contract inspection, ABI encoding and contract calls

use alloy::dyn_abi::DynSolValue;
use alloy::json_abi::Function;
use alloy::network::TransactionBuilder;
use alloy::primitives::{hex, B256};
use alloy::providers::Provider;
use alloy::rpc::types::TransactionRequest;
use anyhow::Result;
use schemars::JsonSchema;
use serde::Deserialize;
use serde_json::{json, Value};

use crate::abi;
use crate::handlers::{ToolContext, ToolOutput};
use crate::inputs::{parse_address, parse_block_id, parse_hex_bytes, parse_u256};
use crate::render::chain_summary;

#[derive(Debug, Deserialize, JsonSchema)]
pub struct GetCodeArgs {
    /// Contract address
    pub address: String,
    /// Block number, tag or hash. Defaults to latest
    #[serde(default)]
    pub block: Option<String>,
    /// Chain name, alias or id. Defaults to the configured default chain
    #[serde(default)]
    pub chain: Option<String>,
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct GetStorageAtArgs {
    /// Contract address
    pub address: String,
    /// Storage slot (decimal or 0x hex, at most 32 bytes)
    pub slot: String,
    /// Block number, tag or hash. Defaults to latest
    #[serde(default)]
    pub block: Option<String>,
    /// Chain name, alias or id. Defaults to the configured default chain
    #[serde(default)]
    pub chain: Option<String>,
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct EncodeFunctionDataArgs {
    /// Function signature, e.g. "transfer(address,uint256)", or a function name when `abi` is given
    pub function: String,
    /// Positional arguments. Pass large integers as strings; tuples and arrays as JSON arrays
    #[serde(default)]
    pub args: Vec<Value>,
    /// JSON ABI (array or its string encoding) to look the function up in
    #[serde(default)]
    pub abi: Option<Value>,
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct EncodeDeployDataArgs {
    /// Contract creation bytecode (0x hex)
    pub bytecode: String,
    /// Constructor parameter types, e.g. ["string", "uint256"]
    #[serde(default)]
    pub constructor_types: Vec<String>,
    /// Constructor arguments, one per type
    #[serde(default)]
    pub args: Vec<Value>,
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct DecodeFunctionResultArgs {
    /// Function signature with a returns clause, e.g. "balanceOf(address) returns (uint256)", or a function name when `abi` is given
    pub function: String,
    /// Return data (0x hex)
    pub data: String,
    /// JSON ABI (array or its string encoding) to look the function up in
    #[serde(default)]
    pub abi: Option<Value>,
    /// Number of inputs, used to pick an overload from `abi`
    #[serde(default)]
    pub arg_count: Option<usize>,
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct ContractCallArgs {
    /// Contract address
    pub address: String,
    /// Function signature with a returns clause, e.g. "balanceOf(address) returns (uint256)", or a function name when `abi` is given
    pub function: String,
    /// Positional arguments. Pass large integers as strings; tuples and arrays as JSON arrays
    #[serde(default)]
    pub args: Vec<Value>,
    /// JSON ABI (array or its string encoding) to look the function up in
    #[serde(default)]
    pub abi: Option<Value>,
    /// Caller address
    #[serde(default)]
    pub from: Option<String>,
    /// Value in wei sent with the call (decimal or 0x hex)
    #[serde(default)]
    pub value: Option<String>,
    /// Block number, tag or hash. Defaults to latest
    #[serde(default)]
    pub block: Option<String>,
    /// Chain name, alias or id. Defaults to the configured default chain
    #[serde(default)]
    pub chain: Option<String>,
}

/// A contract call resolved to a function and a transaction request.
struct PreparedCall {
    function: Function,
    request: TransactionRequest,
}

impl ContractCallArgs {
    fn prepare(&self) -> Result<PreparedCall> {
        let address = parse_address("address", &self.address)?;
        let function = abi::resolve_function(&self.function, self.abi.as_ref(), self.args.len())?;
        let values = abi::coerce_args(&function, &self.args)?;
        let data = abi::encode_function_data(&function, &values)?;

        let mut request = TransactionRequest::default()
            .with_to(address)
            .with_input(data);
        if let Some(from) = self.from.as_deref() {
            request = request.with_from(parse_address("from", from)?);
        }
        if let Some(value) = self.value.as_deref() {
            request = request.with_value(parse_u256("value", value)?);
        }
        Ok(PreparedCall { function, request })
    }
}

pub async fn get_code(ctx: &ToolContext, args: GetCodeArgs) -> Result<ToolOutput> {
    let address = parse_address("address", &args.address)?;
    let block = parse_block_id("block", args.block.as_deref())?;
    let client = ctx.client(args.chain.as_deref())?;

    let code = client.provider().get_code_at(address).block_id(block).await?;
    ToolOutput::json(json!({
        "address": address.to_checksum(None),
        "chain": chain_summary(client.chain()),
        "isContract": !code.is_empty(),
        "size": code.len(),
        "bytecode": hex::encode_prefixed(&code),
    }))
}

pub async fn get_storage_at(ctx: &ToolContext, args: GetStorageAtArgs) -> Result<ToolOutput> {
    let address = parse_address("address", &args.address)?;
    let slot = parse_u256("slot", &args.slot)?;
    let block = parse_block_id("block", args.block.as_deref())?;
    let client = ctx.client(args.chain.as_deref())?;

    let value = client
        .provider()
        .get_storage_at(address, slot)
        .block_id(block)
        .await?;
    ToolOutput::json(json!({
        "address": address.to_checksum(None),
        "slot": B256::from(slot.to_be_bytes::<32>()).to_string(),
        "value": B256::from(value.to_be_bytes::<32>()).to_string(),
        "decimal": value.to_string(),
    }))
}

pub fn encode_function_data(args: EncodeFunctionDataArgs) -> Result<ToolOutput> {
    let function = abi::resolve_function(&args.function, args.abi.as_ref(), args.args.len())?;
    let values = abi::coerce_args(&function, &args.args)?;
    let data = abi::encode_function_data(&function, &values)?;
    ToolOutput::json(json!({
        "signature": function.signature(),
        "selector": function.selector().to_string(),
        "data": hex::encode_prefixed(&data),
    }))
}

pub fn encode_deploy_data(args: EncodeDeployDataArgs) -> Result<ToolOutput> {
    let bytecode = parse_hex_bytes("bytecode", &args.bytecode)?;
    let values = abi::coerce_args_for_types(&args.constructor_types, &args.args)?;
    let data = abi::encode_deploy_data(&bytecode, values);
    ToolOutput::json(json!({
        "data": hex::encode_prefixed(&data),
    }))
}

pub fn decode_function_result(args: DecodeFunctionResultArgs) -> Result<ToolOutput> {
    let arg_count = args.arg_count.unwrap_or_default();
    let function = abi::resolve_function(&args.function, args.abi.as_ref(), arg_count)?;
    let data = parse_hex_bytes("data", &args.data)?;
    let values = abi::decode_function_result(&function, &data)?;
    ToolOutput::json(json!({
        "function": function.signature(),
        "result": abi::outputs_to_json(&function, &values),
    }))
}

fn decoded_result(function: &Function, values: &[DynSolValue]) -> Value {
    json!({
        "function": function.signature(),
        "result": abi::outputs_to_json(function, values),
    })
}

pub async fn read_contract(ctx: &ToolContext, args: ContractCallArgs) -> Result<ToolOutput> {
    let call = args.prepare()?;
    let block = parse_block_id("block", args.block.as_deref())?;
    let client = ctx.client(args.chain.as_deref())?;

    let output = client.provider().call(call.request).block(block).await?;
    let values = abi::decode_function_result(&call.function, &output)?;
    Ok(ToolOutput::Json(decoded_result(&call.function, &values)))
}

pub async fn simulate_contract(ctx: &ToolContext, args: ContractCallArgs) -> Result<ToolOutput> {
    let call = args.prepare()?;
    let block = parse_block_id("block", args.block.as_deref())?;
    let client = ctx.client(args.chain.as_deref())?;

    let output = client.provider().call(call.request).block(block).await?;
    let mut result = decoded_result(&call.function, &[]);
    result["result"] = match abi::decode_function_result(&call.function, &output) {
        Ok(values) => abi::outputs_to_json(&call.function, &values),
        Err(e) if call.function.outputs.is_empty() => {
            tracing::debug!(error = %e, "no outputs declared; returning raw data");
            Value::Null
        }
        Err(e) => return Err(e),
    };
    result["returnData"] = json!(hex::encode_prefixed(&output));
    result["chain"] = chain_summary(client.chain());
    Ok(ToolOutput::Json(result))
}

pub async fn estimate_contract_gas(
    ctx: &ToolContext,
    args: ContractCallArgs,
) -> Result<ToolOutput> {
    let call = args.prepare()?;
    let block = parse_block_id("block", args.block.as_deref())?;
    let client = ctx.client(args.chain.as_deref())?;

    let gas = client
        .provider()
        .estimate_gas(call.request)
        .block(block)
        .await?;
    ToolOutput::json(json!({
        "function": call.function.signature(),
        "chain": chain_summary(client.chain()),
        "gas": gas.to_string(),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_function_data_tool() {
        let output = encode_function_data(EncodeFunctionDataArgs {
            function: "balanceOf(address)".to_string(),
            args: vec![json!("0xd8da6bf26964af9d7eed9e03e53415d37aa96045")],
            abi: None,
        })
        .unwrap();
        let ToolOutput::Json(value) = output else {
            panic!("expected json");
        };
        assert_eq!(value["selector"], "0x70a08231");
        assert_eq!(
            value["data"],
            "0x70a08231000000000000000000000000d8da6bf26964af9d7eed9e03e53415d37aa96045"
        );
    }

    #[test]
    fn test_decode_function_result_tool() {
        let output = decode_function_result(DecodeFunctionResultArgs {
            function: "decimals() returns (uint8)".to_string(),
            data: format!("0x{}12", "00".repeat(31)),
            abi: None,
            arg_count: None,
        })
        .unwrap();
        let ToolOutput::Json(value) = output else {
            panic!("expected json");
        };
        assert_eq!(value["result"], "18");
    }

    #[test]
    fn test_encode_deploy_data_tool() {
        let output = encode_deploy_data(EncodeDeployDataArgs {
            bytecode: "0x6080".to_string(),
            constructor_types: vec!["bool".to_string()],
            args: vec![json!(true)],
        })
        .unwrap();
        let ToolOutput::Json(value) = output else {
            panic!("expected json");
        };
        assert_eq!(value["data"], format!("0x6080{}01", "00".repeat(31)));
    }

    #[test]
    fn test_contract_call_prepare() {
        let args: ContractCallArgs = serde_json::from_value(json!({
            "address": "0xd8da6bf26964af9d7eed9e03e53415d37aa96045",
            "function": "allowance(address,address) returns (uint256)",
            "args": [
                "0xd8da6bf26964af9d7eed9e03e53415d37aa96045",
                "0x0000000000000000000000000000000000000001"
            ],
            "value": "0",
        }))
        .unwrap();
        let call = args.prepare().unwrap();
        assert_eq!(call.function.outputs.len(), 1);
        assert_eq!(call.request.input.input().map(|b| b.len()), Some(4 + 64));
    }

    #[test]
    fn test_contract_call_prepare_rejects_bad_args() {
        let args: ContractCallArgs = serde_json::from_value(json!({
            "address": "0xd8da6bf26964af9d7eed9e03e53415d37aa96045",
            "function": "balanceOf(address)",
            "args": ["not-an-address"],
        }))
        .unwrap();
        assert!(args.prepare().is_err());
    }
}
