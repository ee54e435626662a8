//! Chainlist.org reference table
//!
//! Used for late discovery: when a live connection reports a chain id the registry
//! does not know, the descriptor is looked up here and registered.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::sync::Arc;
use tokio::sync::OnceCell;

use crate::chains::{ChainDescriptor, NativeCurrency};

/// Location of the chainlist.org RPC dump.
pub const CHAINLIST_URL: &str = "https://chainlist.org/rpcs.json";

/// One entry of a chain's `rpc` list: a bare URL or a URL with privacy metadata.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum RpcEntry {
    Url(String),
    Detailed {
        url: String,
        #[serde(default)]
        tracking: Option<String>,
        #[serde(rename = "isOpenSource", default)]
        is_open_source: Option<bool>,
    },
}

impl RpcEntry {
    pub fn url(&self) -> &str {
        match self {
            Self::Url(url) | Self::Detailed { url, .. } => url,
        }
    }

    /// Sort key: open-source endpoints first, then by how much they track.
    fn rank(&self) -> (bool, u8) {
        match self {
            Self::Url(_) => (true, 2),
            Self::Detailed {
                tracking,
                is_open_source,
                ..
            } => {
                let tracking = match tracking.as_deref() {
                    Some("none") => 0,
                    Some("limited") => 1,
                    _ => 2,
                };
                (!is_open_source.unwrap_or(false), tracking)
            }
        }
    }

    /// Plain HTTP(S) endpoint without `${API_KEY}` style placeholders.
    fn is_usable_http(&self) -> bool {
        let url = self.url();
        (url.starts_with("https://") || url.starts_with("http://")) && !url.contains("${")
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ExplorerEntry {
    pub url: String,
}

/// A chain as listed by chainlist.org. Fields the server has no use for are ignored.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChainInfo {
    pub name: String,
    pub chain_id: u64,
    #[serde(default)]
    pub short_name: String,
    #[serde(default)]
    pub rpc: Vec<RpcEntry>,
    #[serde(default)]
    pub native_currency: Option<NativeCurrency>,
    #[serde(default)]
    pub explorers: Vec<ExplorerEntry>,
    #[serde(default)]
    pub testnet: Option<bool>,
    #[serde(default)]
    pub is_testnet: Option<bool>,
}

impl ChainInfo {
    /// Convert to a registry descriptor, keeping only HTTP endpoints and preferring
    /// open-source, non-tracking ones.
    pub fn to_descriptor(&self) -> ChainDescriptor {
        ChainDescriptor {
            id: self.chain_id,
            name: self.name.clone(),
            native_currency: self
                .native_currency
                .clone()
                .unwrap_or_else(NativeCurrency::ether),
            rpc_urls: ranked_http_urls(&self.rpc),
            explorer: self.explorers.first().map(|e| e.url.clone()),
            testnet: self.testnet.or(self.is_testnet).unwrap_or(false),
        }
    }
}

/// Usable HTTP endpoints, best ranked first. Ties keep list order.
pub fn ranked_http_urls(rpcs: &[RpcEntry]) -> Vec<String> {
    let mut usable: Vec<&RpcEntry> = rpcs.iter().filter(|r| r.is_usable_http()).collect();
    usable.sort_by_key(|r| r.rank());
    usable.into_iter().map(|r| r.url().to_string()).collect()
}

/// Download and parse the chainlist.org table.
pub async fn fetch_chainlist(url: &str) -> Result<Vec<ChainInfo>> {
    let client = reqwest::Client::builder()
        .timeout(std::time::Duration::from_secs(30))
        .user_agent("evm-mcp")
        .build()?;

    let text = client
        .get(url)
        .send()
        .await?
        .error_for_status()?
        .text()
        .await?;

    serde_json::from_str(&text).context("chainlist.org returned an unexpected table format")
}

/// Lazily fetched, process-lifetime copy of the chainlist table.
pub struct ChainlistReference {
    url: String,
    chains: OnceCell<Arc<Vec<ChainInfo>>>,
}

impl Default for ChainlistReference {
    fn default() -> Self {
        Self::new(CHAINLIST_URL)
    }
}

impl ChainlistReference {
    pub fn new(url: &str) -> Self {
        Self {
            url: url.to_string(),
            chains: OnceCell::new(),
        }
    }

    /// A reference table that never touches the network.
    pub fn from_chains(chains: Vec<ChainInfo>) -> Self {
        Self {
            url: String::new(),
            chains: OnceCell::new_with(Some(Arc::new(chains))),
        }
    }

    /// The table, fetched on first use. A failed fetch is retried on the next call.
    pub async fn chains(&self) -> Result<Arc<Vec<ChainInfo>>> {
        self.chains
            .get_or_try_init(|| async {
                tracing::debug!(url = %self.url, "fetching chainlist reference table");
                fetch_chainlist(&self.url).await.map(Arc::new)
            })
            .await
            .cloned()
    }

    pub async fn find_by_id(&self, chain_id: u64) -> Result<Option<ChainInfo>> {
        let chains = self.chains().await?;
        Ok(chains.iter().find(|c| c.chain_id == chain_id).cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"[
        {
            "name": "Example Chain",
            "chain": "EXC",
            "chainId": 424242,
            "shortName": "exc",
            "nativeCurrency": {"name": "Example", "symbol": "EXC", "decimals": 18},
            "rpc": [
                {"url": "https://tracked.example", "tracking": "yes"},
                "wss://ws.example",
                {"url": "https://rpc.example/${API_KEY}"},
                {"url": "https://open.example", "tracking": "none", "isOpenSource": true}
            ],
            "explorers": [{"name": "exscan", "url": "https://scan.example", "standard": "EIP3091"}],
            "tvl": 12.5
        }
    ]"#;

    fn sample() -> Vec<ChainInfo> {
        serde_json::from_str(SAMPLE).unwrap()
    }

    #[test]
    fn test_chain_info_deserialization() {
        let chains = sample();
        assert_eq!(chains.len(), 1);
        assert_eq!(chains[0].chain_id, 424242);
        assert_eq!(chains[0].short_name, "exc");
        assert_eq!(chains[0].rpc.len(), 4);
        assert_eq!(chains[0].explorers[0].url, "https://scan.example");
    }

    #[test]
    fn test_rpc_entry_rank() {
        let open = RpcEntry::Detailed {
            url: "https://x".to_string(),
            tracking: Some("none".to_string()),
            is_open_source: Some(true),
        };
        let limited = RpcEntry::Detailed {
            url: "https://y".to_string(),
            tracking: Some("limited".to_string()),
            is_open_source: None,
        };
        let plain = RpcEntry::Url("https://z".to_string());

        assert_eq!(plain.url(), "https://z");
        assert!(open.rank() < limited.rank());
        assert!(limited.rank() < plain.rank());
        assert_eq!(
            ranked_http_urls(&[plain, limited, open]),
            vec!["https://x", "https://y", "https://z"]
        );
    }

    #[test]
    fn test_to_descriptor_keeps_usable_http_endpoints_in_preference_order() {
        let descriptor = sample()[0].to_descriptor();
        assert_eq!(descriptor.id, 424242);
        assert_eq!(descriptor.native_currency.symbol, "EXC");
        assert_eq!(
            descriptor.rpc_urls,
            vec![
                "https://open.example".to_string(),
                "https://tracked.example".to_string()
            ]
        );
        assert_eq!(descriptor.explorer.as_deref(), Some("https://scan.example"));
        assert!(!descriptor.testnet);
    }

    #[tokio::test]
    async fn test_preloaded_reference_lookup() {
        let reference = ChainlistReference::from_chains(sample());
        assert!(reference.find_by_id(424242).await.unwrap().is_some());
        assert!(reference.find_by_id(1).await.unwrap().is_none());
    }
}
