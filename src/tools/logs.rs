//! Event log queries

use alloy::json_abi::Event;
use alloy::providers::Provider;
use alloy::rpc::types::Filter;
use anyhow::{bail, Result};
use schemars::JsonSchema;
use serde::Deserialize;
use serde_json::json;

use crate::handlers::{ToolContext, ToolOutput};
use crate::inputs::{parse_address, parse_block_tag, parse_hash};
use crate::render::{chain_summary, to_json};

const DEFAULT_LOG_LIMIT: usize = 1000;

#[derive(Debug, Deserialize, JsonSchema)]
pub struct GetLogsArgs {
    /// Emitting contract address
    #[serde(default)]
    pub address: Option<String>,
    /// Event signature, e.g. "Transfer(address indexed from, address indexed to, uint256 value)"
    #[serde(default)]
    pub event: Option<String>,
    /// Indexed topics after the event signature (topic1..topic3); null matches anything
    #[serde(default)]
    pub topics: Vec<Option<String>>,
    /// First block of the range (number or tag). Defaults to latest
    #[serde(default)]
    pub from_block: Option<String>,
    /// Last block of the range (number or tag). Defaults to latest
    #[serde(default)]
    pub to_block: Option<String>,
    /// Restrict to a single block by hash (excludes from_block/to_block)
    #[serde(default)]
    pub block_hash: Option<String>,
    /// Maximum number of logs returned (default 1000)
    #[serde(default)]
    pub limit: Option<usize>,
    /// Chain name, alias or id. Defaults to the configured default chain
    #[serde(default)]
    pub chain: Option<String>,
}

impl GetLogsArgs {
    /// Build the filter. Fails on invalid input before any network traffic.
    pub fn to_filter(&self) -> Result<Filter> {
        let mut filter = Filter::new();

        if let Some(address) = self.address.as_deref() {
            filter = filter.address(parse_address("address", address)?);
        }

        match self.block_hash.as_deref() {
            Some(hash) => {
                if self.from_block.is_some() || self.to_block.is_some() {
                    bail!("block_hash cannot be combined with from_block or to_block");
                }
                filter = filter.at_block_hash(parse_hash("block_hash", hash)?);
            }
            None => {
                filter = filter
                    .from_block(parse_block_tag("from_block", self.from_block.as_deref())?)
                    .to_block(parse_block_tag("to_block", self.to_block.as_deref())?);
            }
        }

        if let Some(signature) = self.event.as_deref() {
            let event = Event::parse(signature.trim())
                .map_err(|e| crate::error::InputError::invalid("event", e.to_string()))?;
            filter = filter.event_signature(event.selector());
        }

        if self.topics.len() > 3 {
            bail!("at most 3 indexed topics can follow the event signature");
        }
        for (i, topic) in self.topics.iter().enumerate() {
            let Some(topic) = topic.as_deref() else {
                continue;
            };
            let topic = parse_hash(&format!("topics[{i}]"), topic)?;
            filter = match i {
                0 => filter.topic1(topic),
                1 => filter.topic2(topic),
                _ => filter.topic3(topic),
            };
        }

        Ok(filter)
    }
}

pub async fn get_logs(ctx: &ToolContext, args: GetLogsArgs) -> Result<ToolOutput> {
    let filter = args.to_filter()?;
    let limit = args.limit.unwrap_or(DEFAULT_LOG_LIMIT);
    let client = ctx.client(args.chain.as_deref())?;

    let logs = client.provider().get_logs(&filter).await?;
    let total = logs.len();
    let returned: Vec<_> = logs.into_iter().take(limit).collect();

    ToolOutput::json(json!({
        "chain": chain_summary(client.chain()),
        "total": total,
        "truncated": total > returned.len(),
        "logs": to_json(&returned)?,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy::primitives::{b256, B256};

    fn args(value: serde_json::Value) -> GetLogsArgs {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn test_event_signature_topic() {
        let filter = args(json!({
            "event": "Transfer(address indexed from, address indexed to, uint256 value)",
        }))
        .to_filter()
        .unwrap();
        assert!(filter.topics[0].matches(&b256!(
            "ddf252ad1be2c89b69c2b068fc378daa952ba7f163c4a11628f55a4df523b3ef"
        )));
    }

    #[test]
    fn test_topics_and_hash() {
        let topic = format!("0x{}", "11".repeat(32));
        let filter = args(json!({
            "topics": [null, topic],
            "block_hash": format!("0x{}", "22".repeat(32)),
        }))
        .to_filter()
        .unwrap();
        assert!(filter.topics[1].is_empty());
        assert!(filter.topics[2].matches(&B256::repeat_byte(0x11)));
        assert_eq!(filter.get_block_hash(), Some(B256::repeat_byte(0x22)));
    }

    #[test]
    fn test_invalid_filters() {
        assert!(args(json!({"topics": [null, null, null, null]})).to_filter().is_err());
        assert!(args(json!({"event": "not an event"})).to_filter().is_err());
        assert!(args(json!({"from_block": "1", "block_hash": format!("0x{}", "22".repeat(32))}))
            .to_filter()
            .is_err());
        let err = args(json!({"address": "0x12"})).to_filter().unwrap_err();
        assert!(err.to_string().contains("invalid address"));
    }
}
