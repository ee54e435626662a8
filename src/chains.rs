//! Chain registry
//!
//! Maps case-insensitive aliases ("mainnet", "eth", "arbitrum-one", ...) to shared
//! [`ChainDescriptor`]s and resolves per-chain RPC endpoint overrides from the
//! environment. Descriptors are immutable once registered; every alias of a chain
//! points at the same `Arc`.

use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, PoisonError, RwLock};

use crate::config::{self, EnvSource, CUSTOM_CHAINS_VAR};

/// Native currency of a chain.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NativeCurrency {
    pub name: String,
    pub symbol: String,
    pub decimals: u8,
}

impl NativeCurrency {
    pub fn new(name: &str, symbol: &str, decimals: u8) -> Self {
        Self {
            name: name.to_string(),
            symbol: symbol.to_string(),
            decimals,
        }
    }

    pub fn ether() -> Self {
        Self::new("Ether", "ETH", 18)
    }
}

/// Static metadata identifying one blockchain network.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChainDescriptor {
    pub id: u64,
    pub name: String,
    pub native_currency: NativeCurrency,
    #[serde(default)]
    pub rpc_urls: Vec<String>,
    #[serde(default)]
    pub explorer: Option<String>,
    #[serde(default)]
    pub testnet: bool,
}

impl ChainDescriptor {
    pub fn new(id: u64, name: &str, native_currency: NativeCurrency) -> Self {
        Self {
            id,
            name: name.to_string(),
            native_currency,
            rpc_urls: Vec::new(),
            explorer: None,
            testnet: false,
        }
    }

    pub fn with_rpc_urls<I, S>(mut self, urls: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.rpc_urls = urls.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_explorer(mut self, explorer: &str) -> Self {
        self.explorer = Some(explorer.to_string());
        self
    }

    pub fn testnet(mut self) -> Self {
        self.testnet = true;
        self
    }
}

fn eth_chain(id: u64, name: &str, rpc: &str, explorer: &str) -> ChainDescriptor {
    ChainDescriptor::new(id, name, NativeCurrency::ether())
        .with_rpc_urls([rpc])
        .with_explorer(explorer)
}

/// Chains registered at startup, with their hand-picked short aliases.
static BUILTIN_CHAINS: Lazy<Vec<(ChainDescriptor, &'static [&'static str])>> = Lazy::new(|| {
    vec![
        (
            ChainDescriptor::new(1, "Ethereum", NativeCurrency::ether())
                .with_rpc_urls([
                    "https://eth.llamarpc.com",
                    "https://ethereum-rpc.publicnode.com",
                ])
                .with_explorer("https://etherscan.io"),
            &["mainnet", "eth", "ethereum"],
        ),
        (
            eth_chain(
                11155111,
                "Sepolia",
                "https://ethereum-sepolia-rpc.publicnode.com",
                "https://sepolia.etherscan.io",
            )
            .testnet(),
            &["sepolia"],
        ),
        (
            eth_chain(
                17000,
                "Holesky",
                "https://ethereum-holesky-rpc.publicnode.com",
                "https://holesky.etherscan.io",
            )
            .testnet(),
            &["holesky"],
        ),
        (
            eth_chain(
                10,
                "OP Mainnet",
                "https://mainnet.optimism.io",
                "https://optimistic.etherscan.io",
            ),
            &["optimism", "op"],
        ),
        (
            eth_chain(
                11155420,
                "OP Sepolia",
                "https://sepolia.optimism.io",
                "https://sepolia-optimism.etherscan.io",
            )
            .testnet(),
            &["optimism-sepolia"],
        ),
        (
            eth_chain(
                42161,
                "Arbitrum One",
                "https://arb1.arbitrum.io/rpc",
                "https://arbiscan.io",
            ),
            &["arbitrum", "arb"],
        ),
        (
            eth_chain(
                421614,
                "Arbitrum Sepolia",
                "https://sepolia-rollup.arbitrum.io/rpc",
                "https://sepolia.arbiscan.io",
            )
            .testnet(),
            &["arb-sepolia"],
        ),
        (
            eth_chain(8453, "Base", "https://mainnet.base.org", "https://basescan.org"),
            &["base"],
        ),
        (
            eth_chain(
                84532,
                "Base Sepolia",
                "https://sepolia.base.org",
                "https://sepolia.basescan.org",
            )
            .testnet(),
            &[],
        ),
        (
            ChainDescriptor::new(137, "Polygon", NativeCurrency::new("POL", "POL", 18))
                .with_rpc_urls(["https://polygon-rpc.com"])
                .with_explorer("https://polygonscan.com"),
            &["polygon", "matic"],
        ),
        (
            ChainDescriptor::new(80002, "Polygon Amoy", NativeCurrency::new("POL", "POL", 18))
                .with_rpc_urls(["https://rpc-amoy.polygon.technology"])
                .with_explorer("https://amoy.polygonscan.com")
                .testnet(),
            &["amoy"],
        ),
        (
            ChainDescriptor::new(56, "BNB Smart Chain", NativeCurrency::new("BNB", "BNB", 18))
                .with_rpc_urls(["https://bsc-dataseed.bnbchain.org"])
                .with_explorer("https://bscscan.com"),
            &["bsc", "bnb"],
        ),
        (
            ChainDescriptor::new(
                43114,
                "Avalanche C-Chain",
                NativeCurrency::new("Avalanche", "AVAX", 18),
            )
            .with_rpc_urls(["https://api.avax.network/ext/bc/C/rpc"])
            .with_explorer("https://snowtrace.io"),
            &["avalanche", "avax"],
        ),
        (
            ChainDescriptor::new(100, "Gnosis", NativeCurrency::new("xDAI", "XDAI", 18))
                .with_rpc_urls(["https://rpc.gnosischain.com"])
                .with_explorer("https://gnosisscan.io"),
            &["gnosis", "xdai"],
        ),
        (
            eth_chain(
                324,
                "zkSync Era",
                "https://mainnet.era.zksync.io",
                "https://explorer.zksync.io",
            ),
            &["zksync"],
        ),
        (
            eth_chain(59144, "Linea", "https://rpc.linea.build", "https://lineascan.build"),
            &["linea"],
        ),
        (
            eth_chain(534352, "Scroll", "https://rpc.scroll.io", "https://scrollscan.com"),
            &["scroll"],
        ),
        (
            ChainDescriptor::new(42220, "Celo", NativeCurrency::new("Celo", "CELO", 18))
                .with_rpc_urls(["https://forno.celo.org"])
                .with_explorer("https://celoscan.io"),
            &["celo"],
        ),
        (
            eth_chain(81457, "Blast", "https://rpc.blast.io", "https://blastscan.io"),
            &["blast"],
        ),
        (
            ChainDescriptor::new(5000, "Mantle", NativeCurrency::new("Mantle", "MNT", 18))
                .with_rpc_urls(["https://rpc.mantle.xyz"])
                .with_explorer("https://mantlescan.xyz"),
            &["mantle"],
        ),
    ]
});

/// Lowercase, dash-separated form of a display name ("Arbitrum One" -> "arbitrum-one").
///
/// Camel-case boundaries are split as well, so "zkSync Era" becomes "zk-sync-era".
pub fn kebab_case(name: &str) -> String {
    let mut out = String::with_capacity(name.len() + 4);
    let mut prev_lower = false;

    for c in name.trim().chars() {
        if c.is_whitespace() || c == '_' || c == '-' {
            if !out.is_empty() && !out.ends_with('-') {
                out.push('-');
            }
            prev_lower = false;
        } else if c.is_uppercase() {
            if prev_lower && !out.ends_with('-') {
                out.push('-');
            }
            out.extend(c.to_lowercase());
            prev_lower = false;
        } else {
            out.push(c);
            prev_lower = c.is_lowercase() || c.is_ascii_digit();
        }
    }

    out.trim_end_matches('-').to_string()
}

/// Upper-case, underscore-separated form used in environment variable names.
pub fn env_case(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    for c in name.trim().chars() {
        if c.is_ascii_alphanumeric() {
            out.push(c.to_ascii_uppercase());
        } else if !out.is_empty() && !out.ends_with('_') {
            out.push('_');
        }
    }
    out.trim_end_matches('_').to_string()
}

/// Case-folding variants of a chain name tried when looking up RPC overrides.
fn env_name_variants(name: &str) -> Vec<String> {
    let snake = env_case(name);
    let compact: String = snake.chars().filter(|c| *c != '_').collect();
    let raw = name.trim().to_string();

    let mut variants: Vec<String> = Vec::with_capacity(3);
    for variant in [snake, compact, raw] {
        if !variant.is_empty() && !variants.contains(&variant) {
            variants.push(variant);
        }
    }
    variants
}

/// A custom chain entry as accepted in `CUSTOM_CHAINS`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CustomChain {
    id: u64,
    name: String,
    #[serde(default)]
    native_currency: Option<NativeCurrency>,
    #[serde(default)]
    symbol: Option<String>,
    #[serde(default)]
    rpc_urls: Vec<String>,
    #[serde(default)]
    aliases: Vec<String>,
    #[serde(default)]
    explorer: Option<String>,
    #[serde(default)]
    testnet: bool,
}

impl CustomChain {
    fn into_parts(self) -> (ChainDescriptor, Vec<String>) {
        let currency = match (self.native_currency, self.symbol) {
            (Some(currency), _) => currency,
            (None, Some(symbol)) => NativeCurrency::new(&symbol, &symbol, 18),
            (None, None) => NativeCurrency::ether(),
        };
        let descriptor = ChainDescriptor {
            id: self.id,
            name: self.name,
            native_currency: currency,
            rpc_urls: self.rpc_urls,
            explorer: self.explorer,
            testnet: self.testnet,
        };
        (descriptor, self.aliases)
    }
}

#[derive(Default)]
struct RegistryState {
    by_id: BTreeMap<u64, Arc<ChainDescriptor>>,
    by_alias: HashMap<String, Arc<ChainDescriptor>>,
    aliases_by_id: BTreeMap<u64, Vec<String>>,
}

/// Name/alias → descriptor registry.
///
/// Lookups never fail loudly: an unknown name yields `None` and the caller decides
/// how to report it.
pub struct ChainRegistry {
    state: RwLock<RegistryState>,
    env: Arc<dyn EnvSource>,
}

impl ChainRegistry {
    /// Create an empty registry reading overrides from `env`.
    pub fn new(env: Arc<dyn EnvSource>) -> Self {
        Self {
            state: RwLock::new(RegistryState::default()),
            env,
        }
    }

    /// Create a registry pre-populated with the built-in chain table.
    pub fn with_builtin_chains(env: Arc<dyn EnvSource>) -> Self {
        let registry = Self::new(env);
        for (descriptor, aliases) in BUILTIN_CHAINS.iter() {
            registry.register(descriptor.clone(), aliases.iter().copied());
        }
        registry
    }

    /// Register a descriptor under its canonical name, lowercase and kebab-case forms
    /// and every supplied alias.
    ///
    /// An alias already in use is silently reassigned. Registering an id that is
    /// already known replaces the descriptor behind all of that id's aliases, so a
    /// lookup by id never sees two descriptors.
    pub fn register<I, S>(&self, descriptor: ChainDescriptor, aliases: I) -> Arc<ChainDescriptor>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.insert(descriptor, aliases, true)
    }

    /// Like [`register`](Self::register), but keys already bound to a different
    /// chain id keep their current descriptor.
    pub fn register_vacant<I, S>(
        &self,
        descriptor: ChainDescriptor,
        aliases: I,
    ) -> Arc<ChainDescriptor>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.insert(descriptor, aliases, false)
    }

    fn insert<I, S>(
        &self,
        descriptor: ChainDescriptor,
        aliases: I,
        reassign: bool,
    ) -> Arc<ChainDescriptor>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let descriptor = Arc::new(descriptor);
        let id = descriptor.id;

        let mut keys = vec![
            descriptor.name.clone(),
            descriptor.name.to_lowercase(),
            kebab_case(&descriptor.name),
        ];
        for alias in aliases {
            let alias = alias.as_ref().trim();
            if alias.is_empty() {
                continue;
            }
            keys.push(alias.to_string());
            keys.push(alias.to_lowercase());
        }

        let mut state = self.state.write().unwrap_or_else(PoisonError::into_inner);

        for slot in state.by_alias.values_mut() {
            if slot.id == id {
                *slot = descriptor.clone();
            }
        }
        state.by_id.insert(id, descriptor.clone());

        for key in keys.into_iter().filter(|k| !k.is_empty()) {
            let taken = [key.as_str(), key.to_lowercase().as_str()]
                .iter()
                .any(|k| state.by_alias.get(*k).is_some_and(|bound| bound.id != id));
            if !reassign && taken {
                tracing::debug!(chain_id = id, alias = %key, "alias already taken; skipping");
                continue;
            }
            if let Some(previous) = state.by_alias.insert(key.clone(), descriptor.clone()) {
                if previous.id != id {
                    if let Some(list) = state.aliases_by_id.get_mut(&previous.id) {
                        list.retain(|k| k != &key);
                    }
                }
            }
            let list = state.aliases_by_id.entry(id).or_default();
            if !list.contains(&key) {
                list.push(key);
            }
        }

        tracing::debug!(chain_id = id, name = %descriptor.name, "registered chain");
        descriptor
    }

    /// Resolve a free-form chain name: exact match first, then lowercased.
    pub fn resolve_by_name(&self, name: &str) -> Option<Arc<ChainDescriptor>> {
        let state = self.state.read().unwrap_or_else(PoisonError::into_inner);
        state
            .by_alias
            .get(name)
            .or_else(|| state.by_alias.get(&name.to_lowercase()))
            .cloned()
    }

    /// Find a registered descriptor by numeric chain id.
    pub fn resolve_by_id(&self, id: u64) -> Option<Arc<ChainDescriptor>> {
        let state = self.state.read().unwrap_or_else(PoisonError::into_inner);
        state.by_id.get(&id).cloned()
    }

    /// All keys currently mapping to `id`, in registration order.
    pub fn aliases_for(&self, id: u64) -> Vec<String> {
        let state = self.state.read().unwrap_or_else(PoisonError::into_inner);
        state.aliases_by_id.get(&id).cloned().unwrap_or_default()
    }

    /// All registered descriptors, ordered by chain id.
    pub fn chains(&self) -> Vec<Arc<ChainDescriptor>> {
        let state = self.state.read().unwrap_or_else(PoisonError::into_inner);
        state.by_id.values().cloned().collect()
    }

    /// Provider id currently used for `<NAME>_RPC_URL_<PROVIDER>` lookups.
    pub fn rpc_provider(&self) -> String {
        config::rpc_provider(self.env.as_ref())
    }

    /// Look up an RPC endpoint override for `chain_name`.
    ///
    /// Tries `<NAME>_RPC_URL_<PROVIDER>` for every case-folding variant of the name,
    /// then `<NAME>_RPC_URL`. The environment is read on every call.
    pub fn resolve_rpc_url(&self, chain_name: &str) -> Option<String> {
        let provider = env_case(&self.rpc_provider());
        let variants = env_name_variants(chain_name);

        let provider_specific = variants
            .iter()
            .map(|v| format!("{v}_RPC_URL_{provider}"));
        let generic = variants.iter().map(|v| format!("{v}_RPC_URL"));

        provider_specific
            .chain(generic)
            .find_map(|key| self.env.var(&key))
            .map(|url| url.trim().to_string())
    }

    /// Register chains from the `CUSTOM_CHAINS` JSON array.
    ///
    /// Returns the number of chains registered. A missing variable, malformed JSON
    /// or invalid elements never fail startup; they are logged and skipped.
    pub fn load_from_environment(&self) -> usize {
        match self.env.var(CUSTOM_CHAINS_VAR) {
            Some(raw) => self.load_custom_chains(&raw),
            None => 0,
        }
    }

    /// Register chains from a JSON array of custom chain entries.
    pub fn load_custom_chains(&self, raw: &str) -> usize {
        let entries: Vec<Value> = match serde_json::from_str(raw) {
            Ok(entries) => entries,
            Err(e) => {
                tracing::warn!(error = %e, "{CUSTOM_CHAINS_VAR} is not a JSON array; ignoring it");
                return 0;
            }
        };

        let mut registered = 0;
        for (index, entry) in entries.into_iter().enumerate() {
            match serde_json::from_value::<CustomChain>(entry) {
                Ok(custom) if custom.name.trim().is_empty() => {
                    tracing::warn!(index, "skipping custom chain with empty name");
                }
                Ok(custom) => {
                    let (descriptor, aliases) = custom.into_parts();
                    tracing::info!(
                        chain_id = descriptor.id,
                        name = %descriptor.name,
                        "registering custom chain"
                    );
                    self.register(descriptor, aliases);
                    registered += 1;
                }
                Err(e) => {
                    tracing::warn!(index, error = %e, "skipping invalid custom chain entry");
                }
            }
        }
        registered
    }
}
