//! ENS resolution against the on-chain registry
//!
//! Only direct resolution is supported: the registry is asked for the name's
//! resolver, which is then queried. Wildcard (ENSIP-10) and offchain (CCIP-read)
//! resolvers are not followed.

use alloy::dyn_abi::DynSolValue;
use alloy::eips::{BlockId, BlockNumberOrTag};
use alloy::network::Ethereum;
use alloy::primitives::{address, hex, keccak256, Address, B256};
use alloy::providers::DynProvider;
use anyhow::Result;

use crate::abi;
use crate::error::InputError;

/// ENS registry, deployed at the same address on mainnet and its testnets.
pub const ENS_REGISTRY: Address = address!("00000000000c2e074ec69a0dfb2997ba6c7d2e1e");

const RESOLVER_SIG: &str = "resolver(bytes32 node) returns (address)";
const ADDR_SIG: &str = "addr(bytes32 node) returns (address)";
const NAME_SIG: &str = "name(bytes32 node) returns (string)";
const TEXT_SIG: &str = "text(bytes32 node, string key) returns (string)";

/// Lowercase and validate a dotted ENS name.
pub fn normalize_name(name: &str) -> Result<String, InputError> {
    let name = name.trim().to_lowercase();
    if name.is_empty() {
        return Err(InputError::missing("name"));
    }
    if !name.contains('.') || name.split('.').any(str::is_empty) {
        return Err(InputError::invalid(
            "name",
            format!("'{name}' is not a dotted ENS name such as vitalik.eth"),
        ));
    }
    Ok(name)
}

/// EIP-137 namehash.
pub fn namehash(name: &str) -> B256 {
    let mut node = B256::ZERO;
    if name.is_empty() {
        return node;
    }
    for label in name.rsplit('.') {
        let label_hash = keccak256(label.as_bytes());
        let mut buf = [0u8; 64];
        buf[..32].copy_from_slice(node.as_slice());
        buf[32..].copy_from_slice(label_hash.as_slice());
        node = keccak256(buf);
    }
    node
}

/// Node of `<address>.addr.reverse`.
pub fn reverse_node(address: Address) -> B256 {
    namehash(&format!("{}.addr.reverse", hex::encode(address)))
}

fn latest() -> BlockId {
    BlockId::Number(BlockNumberOrTag::Latest)
}

fn as_address(values: &[DynSolValue]) -> Option<Address> {
    values
        .first()
        .and_then(DynSolValue::as_address)
        .filter(|a| !a.is_zero())
}

fn as_string(values: &[DynSolValue]) -> Option<String> {
    values
        .first()
        .and_then(DynSolValue::as_str)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

async fn resolver_for_node(
    provider: &DynProvider<Ethereum>,
    node: B256,
) -> Result<Option<Address>> {
    let values = abi::call_function(
        provider,
        ENS_REGISTRY,
        RESOLVER_SIG,
        vec![DynSolValue::FixedBytes(node, 32)],
        latest(),
    )
    .await?;
    Ok(as_address(&values))
}

/// Resolver contract of `name`, if one is set.
pub async fn resolver(provider: &DynProvider<Ethereum>, name: &str) -> Result<Option<Address>> {
    resolver_for_node(provider, namehash(name)).await
}

/// Address record of `name`.
pub async fn resolve_name(provider: &DynProvider<Ethereum>, name: &str) -> Result<Option<Address>> {
    let node = namehash(name);
    let Some(resolver) = resolver_for_node(provider, node).await? else {
        return Ok(None);
    };
    let values = abi::call_function(
        provider,
        resolver,
        ADDR_SIG,
        vec![DynSolValue::FixedBytes(node, 32)],
        latest(),
    )
    .await?;
    Ok(as_address(&values))
}

/// Primary name of `address`. The reverse record only counts when the name
/// resolves back to the same address.
pub async fn lookup_address(
    provider: &DynProvider<Ethereum>,
    address: Address,
) -> Result<Option<String>> {
    let node = reverse_node(address);
    let Some(resolver) = resolver_for_node(provider, node).await? else {
        return Ok(None);
    };
    let values = abi::call_function(
        provider,
        resolver,
        NAME_SIG,
        vec![DynSolValue::FixedBytes(node, 32)],
        latest(),
    )
    .await?;
    let Some(name) = as_string(&values) else {
        return Ok(None);
    };

    match resolve_name(provider, &name).await? {
        Some(forward) if forward == address => Ok(Some(name)),
        forward => {
            tracing::debug!(%address, %name, ?forward, "reverse record does not resolve back");
            Ok(None)
        }
    }
}

/// Text record `key` of `name`.
pub async fn text(
    provider: &DynProvider<Ethereum>,
    name: &str,
    key: &str,
) -> Result<Option<String>> {
    let node = namehash(name);
    let Some(resolver) = resolver_for_node(provider, node).await? else {
        return Ok(None);
    };
    let values = abi::call_function(
        provider,
        resolver,
        TEXT_SIG,
        vec![
            DynSolValue::FixedBytes(node, 32),
            DynSolValue::String(key.to_string()),
        ],
        latest(),
    )
    .await?;
    Ok(as_string(&values))
}

/// Avatar text record of `name`, with `ipfs://` URIs mapped to a public gateway.
pub async fn avatar(provider: &DynProvider<Ethereum>, name: &str) -> Result<Option<String>> {
    Ok(text(provider, name, "avatar").await?.map(|uri| gateway_uri(&uri)))
}

fn gateway_uri(uri: &str) -> String {
    match uri.strip_prefix("ipfs://") {
        Some(path) => format!("https://ipfs.io/ipfs/{}", path.trim_start_matches("ipfs/")),
        None => uri.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy::primitives::b256;

    #[test]
    fn test_namehash_vectors() {
        assert_eq!(namehash(""), B256::ZERO);
        assert_eq!(
            namehash("eth"),
            b256!("93cdeb708b7545dc668eb9280176169d1c33cfd8ed6f04690a0bcc88a93fc4ae")
        );
        assert_eq!(
            namehash("foo.eth"),
            b256!("de9b09fd7c5f901e23a3f19fecc54828e9c848539801e86591bd9801b019f84f")
        );
    }

    #[test]
    fn test_reverse_node_uses_lowercase_hex() {
        let address = address!("d8da6bf26964af9d7eed9e03e53415d37aa96045");
        assert_eq!(
            reverse_node(address),
            namehash("d8da6bf26964af9d7eed9e03e53415d37aa96045.addr.reverse")
        );
    }

    #[test]
    fn test_normalize_name() {
        assert_eq!(normalize_name(" Vitalik.ETH ").unwrap(), "vitalik.eth");
        assert!(normalize_name("vitalik").is_err());
        assert!(normalize_name("vitalik..eth").is_err());
        assert_eq!(normalize_name("").unwrap_err(), InputError::missing("name"));
    }

    #[test]
    fn test_gateway_uri() {
        assert_eq!(gateway_uri("ipfs://QmHash"), "https://ipfs.io/ipfs/QmHash");
        assert_eq!(gateway_uri("ipfs://ipfs/QmHash"), "https://ipfs.io/ipfs/QmHash");
        assert_eq!(gateway_uri("https://example.com/a.png"), "https://example.com/a.png");
    }
}
