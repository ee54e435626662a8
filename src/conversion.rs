//! Unified conversion tool
//!
//! Offline unit, hashing, hex and address conversions exposed as a single `convert`
//! tool.

use alloy::primitives::utils::{format_units, parse_units};
use alloy::primitives::{hex, keccak256, U256};
use anyhow::{bail, Context, Result};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::inputs::{parse_address, parse_hex_bytes, parse_u256};

/// All supported conversion types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "kebab-case")]
pub enum ConversionType {
    // Unit conversions
    FormatUnits,
    ParseUnits,
    ToWei,
    FromWei,

    // Hashing
    Keccak256,

    // Address operations
    ToChecksumAddress,
    ValidateAddress,

    // Number conversions
    ToHex,
    ToDec,

    // Text/binary conversions
    FromUtf8,
    ToUtf8,
}

impl ConversionType {
    /// Get a human-readable description of this conversion
    pub fn description(&self) -> &'static str {
        match self {
            Self::FormatUnits => "Convert an integer amount to a decimal string with `unit` decimals",
            Self::ParseUnits => "Convert a decimal string to an integer amount with `unit` decimals",
            Self::ToWei => "Convert an amount in `unit` (default ether) to wei",
            Self::FromWei => "Convert wei to an amount in `unit` (default ether)",
            Self::Keccak256 => "Keccak-256 hash of UTF-8 text, or of hex bytes when encoding is \"hex\"",
            Self::ToChecksumAddress => "Convert address to EIP-55 checksummed format",
            Self::ValidateAddress => "Check whether a string is a valid address",
            Self::ToHex => "Convert decimal number to hexadecimal",
            Self::ToDec => "Convert hexadecimal number to decimal",
            Self::FromUtf8 => "Convert UTF-8 text to hex",
            Self::ToUtf8 => "Convert hex to UTF-8 string",
        }
    }

    pub const ALL: [ConversionType; 11] = [
        Self::FormatUnits,
        Self::ParseUnits,
        Self::ToWei,
        Self::FromWei,
        Self::Keccak256,
        Self::ToChecksumAddress,
        Self::ValidateAddress,
        Self::ToHex,
        Self::ToDec,
        Self::FromUtf8,
        Self::ToUtf8,
    ];
}

/// Parameters for conversion operations
#[derive(Debug, Deserialize, JsonSchema)]
pub struct ConvertArgs {
    /// The type of conversion to perform
    pub conversion_type: ConversionType,

    /// Input value
    pub value: String,

    /// Decimals (0-77) or unit name: wei, kwei, mwei, gwei, szabo, finney, ether
    #[serde(default)]
    pub unit: Option<String>,

    /// Input encoding for keccak256: "text" (default) or "hex"
    #[serde(default)]
    pub encoding: Option<String>,
}

/// Tool description listing every conversion type.
pub fn tool_description() -> String {
    let mut description = String::from(
        "Offline conversions between units, number bases, text and hex, plus keccak256 \
         hashing and address checksumming. Supported conversion types:",
    );
    for kind in ConversionType::ALL {
        let name = serde_json::to_value(kind)
            .ok()
            .and_then(|v| v.as_str().map(str::to_string))
            .unwrap_or_default();
        description.push_str(&format!("\n- {name}: {}", kind.description()));
    }
    description
}

/// Number of decimals for a unit name or a literal decimal count.
pub fn unit_decimals(unit: &str) -> Result<u8> {
    let unit = unit.trim().to_lowercase();
    let decimals = match unit.as_str() {
        "wei" => 0,
        "kwei" | "babbage" => 3,
        "mwei" | "lovelace" => 6,
        "gwei" | "shannon" => 9,
        "szabo" | "microether" => 12,
        "finney" | "milliether" => 15,
        "ether" | "eth" => 18,
        other => other
            .parse::<u8>()
            .with_context(|| format!("unknown unit '{other}'"))?,
    };
    if decimals > 77 {
        bail!("at most 77 decimals are supported, got {decimals}");
    }
    Ok(decimals)
}

/// Drop trailing fractional zeros: `1.500` becomes `1.5`, `2.000` becomes `2`.
fn trim_fraction(formatted: String) -> String {
    if !formatted.contains('.') {
        return formatted;
    }
    formatted
        .trim_end_matches('0')
        .trim_end_matches('.')
        .to_string()
}

/// Format an integer amount with `decimals` decimals.
pub fn format_amount(amount: U256, decimals: u8) -> Result<String> {
    Ok(trim_fraction(format_units(amount, decimals)?))
}

/// Parse a decimal amount into its integer representation with `decimals` decimals.
pub fn parse_amount(amount: &str, decimals: u8) -> Result<U256> {
    let amount = amount.trim();
    if amount.starts_with('-') {
        bail!("negative amounts are not supported");
    }
    Ok(parse_units(amount, decimals)
        .with_context(|| format!("invalid amount '{amount}'"))?
        .get_absolute())
}

/// Execute a conversion
pub fn convert(args: &ConvertArgs) -> Result<Value> {
    let value = args.value.trim();
    let result = match args.conversion_type {
        ConversionType::FormatUnits => {
            let decimals = unit_decimals(args.unit.as_deref().unwrap_or("18"))?;
            format_amount(parse_u256("value", value)?, decimals)?
        }
        ConversionType::ParseUnits => {
            let decimals = unit_decimals(args.unit.as_deref().unwrap_or("18"))?;
            parse_amount(value, decimals)?.to_string()
        }
        ConversionType::ToWei => {
            let decimals = unit_decimals(args.unit.as_deref().unwrap_or("ether"))?;
            parse_amount(value, decimals)?.to_string()
        }
        ConversionType::FromWei => {
            let decimals = unit_decimals(args.unit.as_deref().unwrap_or("ether"))?;
            format_amount(parse_u256("value", value)?, decimals)?
        }
        ConversionType::Keccak256 => match args.encoding.as_deref().unwrap_or("text") {
            "text" | "utf8" => keccak256(value.as_bytes()).to_string(),
            "hex" => keccak256(parse_hex_bytes("value", value)?).to_string(),
            other => bail!("unknown encoding '{other}', expected \"text\" or \"hex\""),
        },
        ConversionType::ToChecksumAddress => parse_address("value", value)?.to_checksum(None),
        ConversionType::ValidateAddress => {
            return Ok(match parse_address("value", value) {
                Ok(address) => json!({
                    "valid": true,
                    "checksumAddress": address.to_checksum(None),
                }),
                Err(e) => json!({
                    "valid": false,
                    "reason": e.to_string(),
                }),
            })
        }
        ConversionType::ToHex => format!("{:#x}", parse_u256("value", value)?),
        ConversionType::ToDec => {
            if !value.starts_with("0x") {
                bail!("'{value}' is not 0x-prefixed hex");
            }
            parse_u256("value", value)?.to_string()
        }
        ConversionType::FromUtf8 => hex::encode_prefixed(value.as_bytes()),
        ConversionType::ToUtf8 => {
            let bytes = parse_hex_bytes("value", value)?;
            String::from_utf8(bytes.to_vec()).context("bytes are not valid UTF-8")?
        }
    };
    Ok(Value::String(result))
}
