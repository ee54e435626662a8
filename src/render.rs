//! JSON rendering for tool results
//!
//! Node responses carry quantities as 0x-prefixed hex. Tool output renders them as
//! decimal strings so large integers survive JSON consumers that parse numbers as
//! doubles.

use alloy::primitives::U256;
use serde::Serialize;
use serde_json::{json, Map, Value};

use crate::chains::ChainDescriptor;

/// Object keys whose values are hex quantities in node responses.
const QUANTITY_KEYS: &[&str] = &[
    "amount",
    "baseFeePerBlobGas",
    "baseFeePerGas",
    "blobGasPrice",
    "blobGasUsed",
    "blockNumber",
    "blockTimestamp",
    "chainId",
    "cumulativeGasUsed",
    "difficulty",
    "effectiveGasPrice",
    "excessBlobGas",
    "gas",
    "gasLimit",
    "gasPrice",
    "gasUsed",
    "index",
    "logIndex",
    "maxFeePerBlobGas",
    "maxFeePerGas",
    "maxPriorityFeePerGas",
    "nonce",
    "number",
    "oldestBlock",
    "reward",
    "size",
    "timestamp",
    "totalDifficulty",
    "transactionIndex",
    "type",
    "validatorIndex",
    "value",
    "yParity",
];

/// Decimal rendering of a hex quantity, or `None` if `raw` is not one.
pub fn hex_quantity_to_decimal(raw: &str) -> Option<String> {
    let digits = raw.strip_prefix("0x")?;
    if digits.is_empty() || digits.len() > 64 || !digits.chars().all(|c| c.is_ascii_hexdigit()) {
        return None;
    }
    U256::from_str_radix(digits, 16).ok().map(|v| v.to_string())
}

fn decimalize_quantity(value: Value) -> Value {
    match value {
        Value::String(s) => match hex_quantity_to_decimal(&s) {
            Some(decimal) => Value::String(decimal),
            None => Value::String(s),
        },
        Value::Number(n) => Value::String(n.to_string()),
        Value::Array(items) => Value::Array(items.into_iter().map(decimalize_quantity).collect()),
        other => decimalize(other),
    }
}

/// Rewrite every known quantity field in `value` to a decimal string.
pub fn decimalize(value: Value) -> Value {
    match value {
        Value::Object(map) => Value::Object(
            map.into_iter()
                .map(|(key, v)| {
                    if QUANTITY_KEYS.contains(&key.as_str()) {
                        (key, decimalize_quantity(v))
                    } else {
                        (key, decimalize(v))
                    }
                })
                .collect::<Map<String, Value>>(),
        ),
        Value::Array(items) => Value::Array(items.into_iter().map(decimalize).collect()),
        other => other,
    }
}

/// Serialize a node response and decimalize its quantities.
pub fn to_json<T: Serialize>(value: &T) -> anyhow::Result<Value> {
    Ok(decimalize(serde_json::to_value(value)?))
}

/// Compact chain reference embedded in tool results.
pub fn chain_summary(chain: &ChainDescriptor) -> Value {
    json!({
        "id": chain.id.to_string(),
        "name": chain.name,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hex_quantity_to_decimal() {
        assert_eq!(hex_quantity_to_decimal("0x0").as_deref(), Some("0"));
        assert_eq!(hex_quantity_to_decimal("0x3e8").as_deref(), Some("1000"));
        assert_eq!(hex_quantity_to_decimal("1000"), None);
        assert_eq!(hex_quantity_to_decimal("0x"), None);
        assert_eq!(hex_quantity_to_decimal("0xnothex"), None);
    }

    #[test]
    fn test_decimalize_only_touches_quantity_keys() {
        let block = json!({
            "number": "0x10",
            "hash": "0x0000000000000000000000000000000000000000000000000000000000000010",
            "baseFeePerGas": "0x3b9aca00",
            "transactions": [
                {"value": "0xde0b6b3a7640000", "input": "0x10", "nonce": "0x1"}
            ]
        });
        let rendered = decimalize(block);
        assert_eq!(rendered["number"], "16");
        assert_eq!(rendered["baseFeePerGas"], "1000000000");
        assert!(rendered["hash"].as_str().unwrap().starts_with("0x"));
        assert_eq!(rendered["transactions"][0]["value"], "1000000000000000000");
        assert_eq!(rendered["transactions"][0]["input"], "0x10");
        assert_eq!(rendered["transactions"][0]["nonce"], "1");
    }

    #[test]
    fn test_decimalize_nested_quantity_arrays() {
        let history = json!({
            "oldestBlock": "0x64",
            "baseFeePerGas": ["0x1", "0x2"],
            "gasUsedRatio": [0.5, 0.25],
            "reward": [["0xa", "0xb"]]
        });
        let rendered = decimalize(history);
        assert_eq!(rendered["oldestBlock"], "100");
        assert_eq!(rendered["baseFeePerGas"], json!(["1", "2"]));
        assert_eq!(rendered["gasUsedRatio"], json!([0.5, 0.25]));
        assert_eq!(rendered["reward"], json!([["10", "11"]]));
    }

    #[test]
    fn test_log_timestamps_are_decimal() {
        let log: alloy::rpc::types::Log = alloy::rpc::types::Log {
            block_number: Some(16),
            block_timestamp: Some(0x69),
            log_index: Some(2),
            ..Default::default()
        };
        let rendered = to_json(&vec![log]).unwrap();
        assert_eq!(rendered[0]["blockNumber"], "16");
        assert_eq!(rendered[0]["blockTimestamp"], "105");
        assert_eq!(rendered[0]["logIndex"], "2");
    }

    #[test]
    fn test_numeric_quantities_become_strings() {
        let rendered = decimalize(json!({"oldestBlock": 100, "gasUsedRatio": 0.5}));
        assert_eq!(rendered["oldestBlock"], "100");
        assert_eq!(rendered["gasUsedRatio"], 0.5);
    }
}
