//! Client manager
//!
//! Resolves a chain name to a descriptor, picks the RPC endpoint (environment
//! override or the descriptor's public default) and hands out one memoized
//! connection per chain id. Entries live for the whole process; there is no
//! eviction and no health checking.

use alloy::network::Ethereum;
use alloy::providers::{DynProvider, Provider, ProviderBuilder};
use anyhow::Result;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use crate::chainlist::ChainlistReference;
use crate::chains::{ChainDescriptor, ChainRegistry};
use crate::config::Config;
use crate::error::ChainError;

/// A live read-only connection bound to one chain and one RPC URL.
pub struct ChainClient {
    chain: Arc<ChainDescriptor>,
    rpc_url: String,
    custom_rpc: bool,
    provider: DynProvider<Ethereum>,
}

impl std::fmt::Debug for ChainClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChainClient")
            .field("chain_id", &self.chain.id)
            .field("endpoint", &endpoint_origin(&self.rpc_url))
            .field("custom_rpc", &self.custom_rpc)
            .finish()
    }
}

impl ChainClient {
    /// Build an HTTP connection. No network traffic happens here.
    pub fn connect(
        chain: Arc<ChainDescriptor>,
        rpc_url: &str,
        custom_rpc: bool,
    ) -> Result<Self, ChainError> {
        let url = reqwest::Url::parse(rpc_url).map_err(|e| ChainError::InvalidRpcUrl {
            url: endpoint_origin(rpc_url),
            reason: e.to_string(),
        })?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(ChainError::InvalidRpcUrl {
                url: endpoint_origin(rpc_url),
                reason: "only http and https endpoints are supported".to_string(),
            });
        }

        let provider = ProviderBuilder::new().connect_http(url).erased();

        Ok(Self {
            chain,
            rpc_url: rpc_url.to_string(),
            custom_rpc,
            provider,
        })
    }

    pub fn chain(&self) -> &Arc<ChainDescriptor> {
        &self.chain
    }

    pub fn chain_id(&self) -> u64 {
        self.chain.id
    }

    pub fn rpc_url(&self) -> &str {
        &self.rpc_url
    }

    /// Whether the endpoint came from a `<CHAIN>_RPC_URL*` override.
    pub fn is_custom_rpc(&self) -> bool {
        self.custom_rpc
    }

    pub fn provider(&self) -> &DynProvider<Ethereum> {
        &self.provider
    }
}

/// `scheme://host[:port]` of an endpoint; paths and queries often carry API keys.
pub fn endpoint_origin(url: &str) -> String {
    match reqwest::Url::parse(url) {
        Ok(parsed) => match (parsed.host_str(), parsed.port()) {
            (Some(host), Some(port)) => format!("{}://{}:{}", parsed.scheme(), host, port),
            (Some(host), None) => format!("{}://{}", parsed.scheme(), host),
            (None, _) => format!("{}://", parsed.scheme()),
        },
        Err(_) => "<unparseable>".to_string(),
    }
}

/// Outcome of comparing a connection's live chain id with the expected one.
#[derive(Debug, Clone, PartialEq)]
pub enum Reconciliation {
    /// The endpoint serves the chain it was opened for.
    Confirmed,
    /// The endpoint serves a different chain the registry already knows.
    KnownMismatch { expected: u64, actual: u64 },
    /// The reported chain was unknown and has been registered from the reference table.
    Discovered(Arc<ChainDescriptor>),
    /// The reported chain is unknown to both the registry and the reference table.
    Unknown { actual: u64 },
}

/// Decide what a live chain id means for the registry, registering it if possible.
pub async fn reconcile_chain_id(
    registry: &ChainRegistry,
    reference: &ChainlistReference,
    expected: u64,
    actual: u64,
) -> Result<Reconciliation> {
    if registry.resolve_by_id(actual).is_some() {
        return Ok(if actual == expected {
            Reconciliation::Confirmed
        } else {
            Reconciliation::KnownMismatch { expected, actual }
        });
    }

    match reference.find_by_id(actual).await? {
        Some(info) => {
            let aliases = Some(info.short_name.as_str()).filter(|a| !a.trim().is_empty());
            let descriptor = registry.register_vacant(info.to_descriptor(), aliases);
            Ok(Reconciliation::Discovered(descriptor))
        }
        None => Ok(Reconciliation::Unknown { actual }),
    }
}

/// Hands out cached [`ChainClient`]s keyed by chain id.
pub struct ClientManager {
    registry: Arc<ChainRegistry>,
    reference: Option<Arc<ChainlistReference>>,
    default_chain_id: u64,
    clients: Mutex<HashMap<u64, Arc<ChainClient>>>,
}

impl ClientManager {
    /// Create a manager. Reconciliation against chainlist.org is enabled when
    /// `config.dynamic_chains` is set.
    pub fn new(registry: Arc<ChainRegistry>, config: &Config) -> Self {
        Self {
            registry,
            reference: config
                .dynamic_chains
                .then(|| Arc::new(ChainlistReference::default())),
            default_chain_id: config.default_chain_id,
            clients: Mutex::new(HashMap::new()),
        }
    }

    /// Replace the reference table used for reconciliation; `None` disables it.
    pub fn with_reference(mut self, reference: Option<Arc<ChainlistReference>>) -> Self {
        self.reference = reference;
        self
    }

    pub fn registry(&self) -> &Arc<ChainRegistry> {
        &self.registry
    }

    pub fn default_chain_id(&self) -> u64 {
        self.default_chain_id
    }

    /// Resolve an optional chain name (or decimal id) to a registered descriptor.
    pub fn resolve_chain(&self, chain: Option<&str>) -> Result<Arc<ChainDescriptor>, ChainError> {
        match chain.map(str::trim).filter(|s| !s.is_empty()) {
            None => self
                .registry
                .resolve_by_id(self.default_chain_id)
                .ok_or_else(|| ChainError::UnsupportedChain {
                    name: self.default_chain_id.to_string(),
                }),
            Some(name) => self
                .registry
                .resolve_by_name(name)
                .or_else(|| {
                    name.parse::<u64>()
                        .ok()
                        .and_then(|id| self.registry.resolve_by_id(id))
                })
                .ok_or_else(|| ChainError::UnsupportedChain {
                    name: name.to_string(),
                }),
        }
    }

    /// Return the connection for `chain`, creating and caching it on first use.
    ///
    /// Construction happens under the cache lock, so concurrent callers on a cold
    /// entry share one connection. A failed construction caches nothing.
    pub fn get_client(&self, chain: Option<&str>) -> Result<Arc<ChainClient>, ChainError> {
        let descriptor = self.resolve_chain(chain)?;

        let mut clients = self.clients.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(existing) = clients.get(&descriptor.id) {
            return Ok(existing.clone());
        }

        let requested = chain.map(str::trim).filter(|s| !s.is_empty());
        let client = Arc::new(self.connect(&descriptor, requested)?);
        clients.insert(descriptor.id, client.clone());
        drop(clients);

        self.spawn_reconciliation(client.clone());
        Ok(client)
    }

    /// Chain ids with a live cache entry.
    pub fn cached_chain_ids(&self) -> Vec<u64> {
        let clients = self.clients.lock().unwrap_or_else(PoisonError::into_inner);
        let mut ids: Vec<u64> = clients.keys().copied().collect();
        ids.sort_unstable();
        ids
    }

    fn connect(
        &self,
        descriptor: &Arc<ChainDescriptor>,
        requested: Option<&str>,
    ) -> Result<ChainClient, ChainError> {
        let mut candidates: Vec<String> = requested.map(str::to_string).into_iter().collect();
        candidates.extend(self.registry.aliases_for(descriptor.id));
        candidates.push(descriptor.name.clone());

        if let Some(url) = candidates
            .iter()
            .find_map(|name| self.registry.resolve_rpc_url(name))
        {
            tracing::info!(
                chain_id = descriptor.id,
                endpoint = %endpoint_origin(&url),
                "using custom RPC endpoint"
            );
            return ChainClient::connect(descriptor.clone(), &url, true);
        }

        let url = descriptor
            .rpc_urls
            .first()
            .ok_or_else(|| ChainError::NoRpcEndpoint {
                chain_id: descriptor.id,
                name: descriptor.name.clone(),
            })?;
        ChainClient::connect(descriptor.clone(), url, false)
    }

    /// Probe the live chain id in the background. Outcomes and failures end up in the
    /// log and never reach the caller.
    fn spawn_reconciliation(&self, client: Arc<ChainClient>) {
        let Some(reference) = self.reference.clone() else {
            return;
        };
        let Ok(runtime) = tokio::runtime::Handle::try_current() else {
            return;
        };
        let registry = self.registry.clone();

        runtime.spawn(async move {
            let expected = client.chain_id();
            let outcome: Result<Reconciliation> = async {
                let actual = client.provider().get_chain_id().await?;
                reconcile_chain_id(&registry, &reference, expected, actual).await
            }
            .await;

            match outcome {
                Ok(Reconciliation::Confirmed) => {
                    tracing::debug!(chain_id = expected, "chain id confirmed");
                }
                Ok(Reconciliation::KnownMismatch { expected, actual }) => {
                    tracing::warn!(
                        expected,
                        actual,
                        endpoint = %endpoint_origin(client.rpc_url()),
                        "RPC endpoint serves a different chain than requested"
                    );
                }
                Ok(Reconciliation::Discovered(descriptor)) => {
                    tracing::info!(
                        chain_id = descriptor.id,
                        name = %descriptor.name,
                        "registered chain discovered from live endpoint"
                    );
                }
                Ok(Reconciliation::Unknown { actual }) => {
                    tracing::warn!(expected, actual, "RPC endpoint reports an unknown chain id");
                }
                Err(e) => {
                    tracing::warn!(
                        chain_id = expected,
                        error = %e,
                        "chain id reconciliation failed"
                    );
                }
            }
        });
    }
}
