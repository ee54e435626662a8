//! Parsers for tool arguments
//!
//! Every parser names the field it was validating so the resulting error tells the
//! caller which argument was wrong.

use alloy::eips::{BlockId, BlockNumberOrTag};
use alloy::primitives::{hex, Address, Bytes, B256, U256};
use std::str::FromStr;

use crate::error::InputError;

fn strip_hex_prefix(value: &str) -> Option<&str> {
    value
        .strip_prefix("0x")
        .or_else(|| value.strip_prefix("0X"))
}

/// Parse a 20-byte address. Mixed-case input must carry a valid EIP-55 checksum.
pub fn parse_address(field: &str, value: &str) -> Result<Address, InputError> {
    let value = value.trim();
    let digits = strip_hex_prefix(value)
        .ok_or_else(|| InputError::invalid(field, format!("'{value}' must start with 0x")))?;

    if digits.len() != 40 || !digits.chars().all(|c| c.is_ascii_hexdigit()) {
        return Err(InputError::invalid(
            field,
            format!("'{value}' is not a 20-byte hex address"),
        ));
    }

    let has_lower = digits.chars().any(|c| c.is_ascii_lowercase());
    let has_upper = digits.chars().any(|c| c.is_ascii_uppercase());
    if has_lower && has_upper {
        return Address::parse_checksummed(format!("0x{digits}"), None)
            .map_err(|_| InputError::invalid(field, format!("'{value}' has an invalid checksum")));
    }

    Address::from_str(digits).map_err(|e| InputError::invalid(field, e.to_string()))
}

/// Parse a 32-byte hash (transaction or block hash).
pub fn parse_hash(field: &str, value: &str) -> Result<B256, InputError> {
    let value = value.trim();
    let digits = strip_hex_prefix(value)
        .ok_or_else(|| InputError::invalid(field, format!("'{value}' must start with 0x")))?;
    if digits.len() != 64 {
        return Err(InputError::invalid(
            field,
            format!("expected 32 bytes (64 hex characters), got {}", digits.len()),
        ));
    }
    B256::from_str(digits).map_err(|e| InputError::invalid(field, e.to_string()))
}

/// Parse an unsigned 256-bit integer given in decimal or 0x-prefixed hex.
pub fn parse_u256(field: &str, value: &str) -> Result<U256, InputError> {
    let value = value.trim();
    if value.is_empty() {
        return Err(InputError::invalid(field, "empty number"));
    }
    if value.starts_with('-') {
        return Err(InputError::invalid(field, "negative values are not allowed"));
    }
    U256::from_str(value).map_err(|e| InputError::invalid(field, format!("'{value}': {e}")))
}

/// Parse a 64-bit quantity given in decimal or 0x-prefixed hex.
pub fn parse_u64(field: &str, value: &str) -> Result<u64, InputError> {
    let value = value.trim();
    let parsed = match strip_hex_prefix(value) {
        Some(digits) => u64::from_str_radix(digits, 16),
        None => value.parse::<u64>(),
    };
    parsed.map_err(|e| InputError::invalid(field, format!("'{value}': {e}")))
}

/// Parse hex-encoded bytes. `0x` alone is the empty byte string.
pub fn parse_hex_bytes(field: &str, value: &str) -> Result<Bytes, InputError> {
    let value = value.trim();
    if strip_hex_prefix(value).is_none() {
        return Err(InputError::invalid(field, "hex data must start with 0x"));
    }
    hex::decode(value)
        .map(Bytes::from)
        .map_err(|e| InputError::invalid(field, e.to_string()))
}

/// Parse a block tag or number. `None` means `latest`.
pub fn parse_block_tag(field: &str, value: Option<&str>) -> Result<BlockNumberOrTag, InputError> {
    let Some(value) = value.map(str::trim).filter(|v| !v.is_empty()) else {
        return Ok(BlockNumberOrTag::Latest);
    };

    match value.to_ascii_lowercase().as_str() {
        "latest" => Ok(BlockNumberOrTag::Latest),
        "pending" => Ok(BlockNumberOrTag::Pending),
        "earliest" => Ok(BlockNumberOrTag::Earliest),
        "safe" => Ok(BlockNumberOrTag::Safe),
        "finalized" => Ok(BlockNumberOrTag::Finalized),
        _ => parse_u64(field, value).map(BlockNumberOrTag::Number).map_err(|_| {
            InputError::invalid(
                field,
                format!(
                    "'{value}' is not a block number or tag \
                     (latest, pending, earliest, safe, finalized)"
                ),
            )
        }),
    }
}

/// Parse a block reference: tag, number, or 32-byte block hash. `None` means `latest`.
pub fn parse_block_id(field: &str, value: Option<&str>) -> Result<BlockId, InputError> {
    match value.map(str::trim) {
        Some(v) if strip_hex_prefix(v).is_some_and(|d| d.len() == 64) => {
            parse_hash(field, v).map(|hash| BlockId::Hash(hash.into()))
        }
        other => parse_block_tag(field, other).map(BlockId::Number),
    }
}

/// Require a non-empty string argument.
pub fn require<'a>(field: &str, value: Option<&'a str>) -> Result<&'a str, InputError> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .ok_or_else(|| InputError::missing(field))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_address_lowercase() {
        let addr = parse_address("address", "0xd8da6bf26964af9d7eed9e03e53415d37aa96045").unwrap();
        assert_eq!(
            addr.to_checksum(None),
            "0xd8dA6BF26964aF9D7eEd9e03E53415D37aA96045"
        );
    }

    #[test]
    fn test_parse_address_checksummed() {
        assert!(parse_address("address", "0xd8dA6BF26964aF9D7eEd9e03E53415D37aA96045").is_ok());
    }

    #[test]
    fn test_parse_address_bad_checksum() {
        let err = parse_address("owner", "0xD8dA6BF26964aF9D7eEd9e03E53415D37aA96045").unwrap_err();
        assert!(err.to_string().starts_with("invalid owner"));
        assert!(err.to_string().contains("checksum"));
    }

    #[test]
    fn test_parse_address_rejects_bad_shapes() {
        assert!(parse_address("address", "d8da6bf26964af9d7eed9e03e53415d37aa96045").is_err());
        assert!(parse_address("address", "0x1234").is_err());
        assert!(parse_address("address", "0xzzda6bf26964af9d7eed9e03e53415d37aa96045").is_err());
    }

    #[test]
    fn test_parse_hash() {
        let hash = format!("0x{}", "ab".repeat(32));
        assert!(parse_hash("hash", &hash).is_ok());
        let err = parse_hash("hash", "0xabcd").unwrap_err();
        assert!(err.to_string().contains("64 hex characters"));
    }

    #[test]
    fn test_parse_u256_decimal_and_hex() {
        assert_eq!(parse_u256("value", "1000").unwrap(), U256::from(1000u64));
        assert_eq!(parse_u256("value", "0x3e8").unwrap(), U256::from(1000u64));
        assert!(parse_u256("value", "-1").is_err());
        assert!(parse_u256("value", "ten").is_err());
        assert!(parse_u256("value", "").is_err());
    }

    #[test]
    fn test_parse_u64() {
        assert_eq!(parse_u64("n", "0x10").unwrap(), 16);
        assert_eq!(parse_u64("n", "16").unwrap(), 16);
        assert!(parse_u64("n", "0xzz").is_err());
    }

    #[test]
    fn test_parse_hex_bytes() {
        assert_eq!(parse_hex_bytes("data", "0x").unwrap().len(), 0);
        assert_eq!(parse_hex_bytes("data", "0xdeadbeef").unwrap().len(), 4);
        assert!(parse_hex_bytes("data", "deadbeef").is_err());
        assert!(parse_hex_bytes("data", "0xabc").is_err());
    }

    #[test]
    fn test_parse_block_tag() {
        assert_eq!(parse_block_tag("block", None).unwrap(), BlockNumberOrTag::Latest);
        assert_eq!(
            parse_block_tag("block", Some("Finalized")).unwrap(),
            BlockNumberOrTag::Finalized
        );
        assert_eq!(
            parse_block_tag("block", Some("19000000")).unwrap(),
            BlockNumberOrTag::Number(19_000_000)
        );
        assert_eq!(
            parse_block_tag("block", Some("0x10")).unwrap(),
            BlockNumberOrTag::Number(16)
        );
        let err = parse_block_tag("from_block", Some("yesterday")).unwrap_err();
        assert!(err.to_string().contains("from_block"));
    }

    #[test]
    fn test_parse_block_id_hash() {
        let hash = format!("0x{}", "11".repeat(32));
        match parse_block_id("block", Some(&hash)).unwrap() {
            BlockId::Hash(h) => assert_eq!(h.block_hash, B256::repeat_byte(0x11)),
            other => panic!("expected hash, got {other:?}"),
        }
        assert_eq!(
            parse_block_id("block", Some("safe")).unwrap(),
            BlockId::Number(BlockNumberOrTag::Safe)
        );
    }

    #[test]
    fn test_require() {
        assert_eq!(require("name", Some(" vitalik.eth ")).unwrap(), "vitalik.eth");
        assert_eq!(
            require("name", Some("  ")).unwrap_err(),
            InputError::missing("name")
        );
    }
}
