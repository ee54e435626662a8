//! Dynamic ABI helpers
//!
//! Functions are described either by a human-readable signature
//! (`balanceOf(address) returns (uint256)`) or by name within a JSON ABI. Arguments
//! arrive as JSON and are coerced to the declared Solidity types.

use alloy::dyn_abi::{DynSolType, DynSolValue, FunctionExt, JsonAbiExt, Specifier};
use alloy::eips::BlockId;
use alloy::json_abi::{Function, JsonAbi};
use alloy::network::{Ethereum, TransactionBuilder};
use alloy::primitives::{hex, Address, Bytes};
use alloy::providers::{DynProvider, Provider};
use alloy::rpc::types::TransactionRequest;
use anyhow::{anyhow, bail, Context, Result};
use serde_json::{Map, Value};

use crate::error::InputError;

/// Parse a human-readable function signature. The `function` keyword and a
/// `returns (...)` clause are both optional.
pub fn parse_signature(signature: &str) -> Result<Function, InputError> {
    Function::parse(signature.trim())
        .map_err(|e| InputError::invalid("function", format!("'{signature}': {e}")))
}

/// Look a function up by name in a JSON ABI (array form or its string encoding).
/// Overloads are disambiguated by argument count.
pub fn find_function(abi: &Value, name: &str, arg_count: usize) -> Result<Function> {
    let abi: JsonAbi = match abi {
        Value::String(raw) => serde_json::from_str(raw),
        other => serde_json::from_value(other.clone()),
    }
    .map_err(|e| InputError::invalid("abi", e.to_string()))?;

    let overloads = abi
        .function(name)
        .ok_or_else(|| anyhow!("function '{name}' not found in ABI"))?;

    overloads
        .iter()
        .find(|f| f.inputs.len() == arg_count)
        .or_else(|| overloads.first())
        .cloned()
        .ok_or_else(|| anyhow!("function '{name}' not found in ABI"))
}

/// Resolve `function` either against `abi` (by name) or as a signature.
pub fn resolve_function(function: &str, abi: Option<&Value>, arg_count: usize) -> Result<Function> {
    match abi {
        Some(abi) => {
            let name = function.split('(').next().unwrap_or(function).trim();
            let name = name.strip_prefix("function ").unwrap_or(name).trim();
            find_function(abi, name, arg_count)
        }
        None => Ok(parse_signature(function)?),
    }
}

/// Coerce a JSON value to `ty`. Strings go through the Solidity literal parser;
/// arrays map onto arrays and tuples.
pub fn coerce_value(ty: &DynSolType, value: &Value) -> Result<DynSolValue> {
    match (ty, value) {
        (DynSolType::Array(inner), Value::Array(items)) => Ok(DynSolValue::Array(
            items
                .iter()
                .map(|item| coerce_value(inner, item))
                .collect::<Result<_>>()?,
        )),
        (DynSolType::FixedArray(inner, len), Value::Array(items)) => {
            if items.len() != *len {
                bail!(
                    "expected {len} elements for {}, got {}",
                    ty.sol_type_name(),
                    items.len()
                );
            }
            Ok(DynSolValue::FixedArray(
                items
                    .iter()
                    .map(|item| coerce_value(inner, item))
                    .collect::<Result<_>>()?,
            ))
        }
        (DynSolType::Tuple(types), Value::Array(items)) => {
            if items.len() != types.len() {
                bail!(
                    "expected {} tuple fields for {}, got {}",
                    types.len(),
                    ty.sol_type_name(),
                    items.len()
                );
            }
            Ok(DynSolValue::Tuple(
                types
                    .iter()
                    .zip(items)
                    .map(|(t, item)| coerce_value(t, item))
                    .collect::<Result<_>>()?,
            ))
        }
        (_, Value::String(s)) => Ok(ty.coerce_str(s)?),
        (_, Value::Number(n)) => Ok(ty.coerce_str(&n.to_string())?),
        (_, Value::Bool(b)) => Ok(ty.coerce_str(if *b { "true" } else { "false" })?),
        _ => bail!("cannot convert {value} to {}", ty.sol_type_name()),
    }
}

/// Coerce positional arguments against a list of Solidity type strings.
pub fn coerce_args_for_types(types: &[String], args: &[Value]) -> Result<Vec<DynSolValue>> {
    if types.len() != args.len() {
        bail!("expected {} arguments, got {}", types.len(), args.len());
    }
    types
        .iter()
        .zip(args)
        .enumerate()
        .map(|(i, (ty, arg))| {
            let ty = DynSolType::parse(ty).with_context(|| format!("invalid type '{ty}'"))?;
            coerce_value(&ty, arg).with_context(|| format!("argument {i}"))
        })
        .collect()
}

/// Coerce positional arguments against a function's inputs.
pub fn coerce_args(function: &Function, args: &[Value]) -> Result<Vec<DynSolValue>> {
    if function.inputs.len() != args.len() {
        bail!(
            "{} expects {} arguments, got {}",
            function.signature(),
            function.inputs.len(),
            args.len()
        );
    }
    function
        .inputs
        .iter()
        .zip(args)
        .enumerate()
        .map(|(i, (param, arg))| {
            let ty = param.resolve()?;
            coerce_value(&ty, arg).with_context(|| match param.name.as_str() {
                "" => format!("argument {i}"),
                name => format!("argument {i} ({name})"),
            })
        })
        .collect()
}

/// Selector followed by the encoded arguments.
pub fn encode_function_data(function: &Function, values: &[DynSolValue]) -> Result<Bytes> {
    Ok(function.abi_encode_input(values)?.into())
}

/// Creation bytecode followed by the encoded constructor arguments.
pub fn encode_deploy_data(bytecode: &[u8], args: Vec<DynSolValue>) -> Bytes {
    let mut data = bytecode.to_vec();
    if !args.is_empty() {
        data.extend(DynSolValue::Tuple(args).abi_encode_params());
    }
    data.into()
}

pub fn decode_function_result(function: &Function, data: &[u8]) -> Result<Vec<DynSolValue>> {
    if data.is_empty() && !function.outputs.is_empty() {
        bail!("empty return data; the address may not be a contract or the call reverted");
    }
    function
        .abi_decode_output(data)
        .with_context(|| format!("failed to decode output of {}", function.signature()))
}

/// JSON rendering of a decoded value. Integers become decimal strings and
/// addresses are checksummed.
pub fn value_to_json(value: &DynSolValue) -> Value {
    match value {
        DynSolValue::Bool(b) => Value::Bool(*b),
        DynSolValue::Int(i, _) => Value::String(i.to_string()),
        DynSolValue::Uint(u, _) => Value::String(u.to_string()),
        DynSolValue::FixedBytes(word, size) => Value::String(hex::encode_prefixed(&word[..*size])),
        DynSolValue::Address(a) => Value::String(a.to_checksum(None)),
        DynSolValue::Function(f) => Value::String(hex::encode_prefixed(f)),
        DynSolValue::Bytes(b) => Value::String(hex::encode_prefixed(b)),
        DynSolValue::String(s) => Value::String(s.clone()),
        DynSolValue::Array(items) | DynSolValue::FixedArray(items) | DynSolValue::Tuple(items) => {
            Value::Array(items.iter().map(value_to_json).collect())
        }
        #[allow(unreachable_patterns)]
        other => other
            .as_fixed_seq()
            .map(|items| Value::Array(items.iter().map(value_to_json).collect()))
            .unwrap_or(Value::Null),
    }
}

/// Decoded outputs as JSON: a lone output is returned bare, several become an
/// object keyed by output name (or position when unnamed).
pub fn outputs_to_json(function: &Function, values: &[DynSolValue]) -> Value {
    match values {
        [] => Value::Null,
        [single] => value_to_json(single),
        many => {
            let mut object = Map::new();
            for (i, value) in many.iter().enumerate() {
                let key = function
                    .outputs
                    .get(i)
                    .map(|p| p.name.clone())
                    .filter(|n| !n.is_empty())
                    .unwrap_or_else(|| i.to_string());
                object.insert(key, value_to_json(value));
            }
            Value::Object(object)
        }
    }
}

/// `eth_call` returning the raw bytes.
pub async fn call_raw(
    provider: &DynProvider<Ethereum>,
    to: Address,
    data: Bytes,
    block: BlockId,
) -> Result<Bytes> {
    let request = TransactionRequest::default().with_to(to).with_input(data);
    Ok(provider.call(request).block(block).await?)
}

/// `eth_call` of `signature` on `to`, decoding the result.
pub async fn call_function(
    provider: &DynProvider<Ethereum>,
    to: Address,
    signature: &str,
    args: Vec<DynSolValue>,
    block: BlockId,
) -> Result<Vec<DynSolValue>> {
    let function = parse_signature(signature)?;
    let data = encode_function_data(&function, &args)?;
    let output = call_raw(provider, to, data, block).await?;
    decode_function_result(&function, &output)
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy::primitives::{address, U256};
    use serde_json::json;

    #[test]
    fn test_parse_signature_variants() {
        let plain = parse_signature("balanceOf(address)").unwrap();
        assert_eq!(plain.name, "balanceOf");
        assert!(plain.outputs.is_empty());

        let full =
            parse_signature("function balanceOf(address owner) view returns (uint256)").unwrap();
        assert_eq!(full.inputs.len(), 1);
        assert_eq!(full.outputs.len(), 1);
        assert_eq!(full.signature(), "balanceOf(address)");

        assert!(parse_signature("not a signature").is_err());
    }

    #[test]
    fn test_transfer_selector_and_encoding() {
        let function = parse_signature("transfer(address,uint256)").unwrap();
        let values = coerce_args(
            &function,
            &[json!("0xd8da6bf26964af9d7eed9e03e53415d37aa96045"), json!("1000")],
        )
        .unwrap();
        let data = encode_function_data(&function, &values).unwrap();
        assert_eq!(hex::encode(&data[..4]), "a9059cbb");
        assert_eq!(data.len(), 4 + 64);

        let decoded = DynSolType::Tuple(vec![DynSolType::Address, DynSolType::Uint(256)])
            .abi_decode_params(&data[4..])
            .unwrap();
        assert_eq!(
            decoded,
            DynSolValue::Tuple(vec![
                DynSolValue::Address(address!("d8da6bf26964af9d7eed9e03e53415d37aa96045")),
                DynSolValue::Uint(U256::from(1000u64), 256),
            ])
        );
    }

    #[test]
    fn test_encode_then_decode_uint_address_bool() {
        let function =
            parse_signature("f(uint256,address,bool) returns (uint256,address,bool)").unwrap();
        let values = coerce_args(
            &function,
            &[
                json!(U256::MAX.to_string()),
                json!("0xd8da6bf26964af9d7eed9e03e53415d37aa96045"),
                json!(true),
            ],
        )
        .unwrap();

        let data = encode_function_data(&function, &values).unwrap();
        assert_eq!(data.len(), 4 + 3 * 32);

        let decoded = decode_function_result(&function, &data[4..]).unwrap();
        assert_eq!(
            decoded,
            vec![
                DynSolValue::Uint(U256::MAX, 256),
                DynSolValue::Address(address!("d8da6bf26964af9d7eed9e03e53415d37aa96045")),
                DynSolValue::Bool(true),
            ]
        );
        assert_eq!(
            outputs_to_json(&function, &decoded),
            json!({
                "0": U256::MAX.to_string(),
                "1": "0xd8dA6BF26964aF9D7eEd9e03E53415D37aA96045",
                "2": true,
            })
        );
    }

    #[test]
    fn test_argument_count_mismatch() {
        let function = parse_signature("transfer(address,uint256)").unwrap();
        let err = coerce_args(&function, &[json!("0x00")]).unwrap_err();
        assert!(err.to_string().contains("expects 2 arguments"));
    }

    #[test]
    fn test_coerce_nested_values() {
        let ty = DynSolType::parse("(uint256,bool)[]").unwrap();
        let value = coerce_value(&ty, &json!([["1", true], [2, false]])).unwrap();
        assert_eq!(
            value_to_json(&value),
            json!([["1", true], ["2", false]])
        );
    }

    #[test]
    fn test_decode_function_result_values() {
        let function = parse_signature("balanceOf(address) returns (uint256)").unwrap();
        let data = DynSolValue::Tuple(vec![DynSolValue::Uint(U256::from(42u64), 256)])
            .abi_encode_params();
        let values = decode_function_result(&function, &data).unwrap();
        assert_eq!(outputs_to_json(&function, &values), json!("42"));

        let function = parse_signature("owner() returns (address)").unwrap();
        let data = DynSolValue::Tuple(vec![DynSolValue::Address(address!(
            "d8da6bf26964af9d7eed9e03e53415d37aa96045"
        ))])
        .abi_encode_params();
        let values = decode_function_result(&function, &data).unwrap();
        assert_eq!(
            outputs_to_json(&function, &values),
            json!("0xd8dA6BF26964aF9D7eEd9e03E53415D37aA96045")
        );
    }

    #[test]
    fn test_multiple_outputs_keyed_by_name() {
        let function =
            parse_signature("getReserves() returns (uint112 reserve0, uint112 reserve1, uint32)")
                .unwrap();
        let data = DynSolValue::Tuple(vec![
            DynSolValue::Uint(U256::from(5u64), 112),
            DynSolValue::Uint(U256::from(7u64), 112),
            DynSolValue::Uint(U256::from(9u64), 32),
        ])
        .abi_encode_params();
        let values = decode_function_result(&function, &data).unwrap();
        assert_eq!(
            outputs_to_json(&function, &values),
            json!({"reserve0": "5", "reserve1": "7", "2": "9"})
        );
    }

    #[test]
    fn test_empty_return_data_is_reported() {
        let function = parse_signature("decimals() returns (uint8)").unwrap();
        let err = decode_function_result(&function, &[]).unwrap_err();
        assert!(err.to_string().contains("empty return data"));
    }

    #[test]
    fn test_find_function_in_json_abi() {
        let abi = json!([
            {"type": "function", "name": "approve", "stateMutability": "nonpayable",
             "inputs": [{"name": "spender", "type": "address"}, {"name": "amount", "type": "uint256"}],
             "outputs": [{"name": "", "type": "bool"}]}
        ]);
        let function = resolve_function("approve", Some(&abi), 2).unwrap();
        assert_eq!(function.signature(), "approve(address,uint256)");

        let as_string = Value::String(abi.to_string());
        assert!(resolve_function("approve(address,uint256)", Some(&as_string), 2).is_ok());
        assert!(resolve_function("transfer", Some(&abi), 2).is_err());
    }

    #[test]
    fn test_encode_deploy_data_appends_constructor_args() {
        let bytecode = [0x60u8, 0x80, 0x60, 0x40];
        let args = coerce_args_for_types(&["uint256".to_string()], &[json!("1")]).unwrap();
        let data = encode_deploy_data(&bytecode, args);
        assert_eq!(data.len(), 4 + 32);
        assert_eq!(&data[..4], &bytecode);
        assert_eq!(data[35], 1);

        assert_eq!(encode_deploy_data(&bytecode, vec![]).len(), 4);
    }
}
