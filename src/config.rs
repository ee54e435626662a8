//! Configuration management for the EVM MCP server
//!
//! All serving behaviour is controlled through environment variables. Reads go
//! through the [`EnvSource`] trait so that registries and client managers can be
//! built against an isolated environment in tests.

use std::collections::HashMap;

/// Environment variable holding the chain id used when a tool call omits `chain`.
pub const DEFAULT_CHAIN_ID_VAR: &str = "DEFAULT_CHAIN_ID";

/// Environment variable selecting the provider-specific RPC URL variant.
pub const RPC_PROVIDER_VAR: &str = "RPC_PROVIDER";

/// Environment variable holding a JSON array of additional chain descriptors.
pub const CUSTOM_CHAINS_VAR: &str = "CUSTOM_CHAINS";

/// Environment variable that turns off live chain-id reconciliation.
pub const DISABLE_DYNAMIC_CHAINS_VAR: &str = "DISABLE_DYNAMIC_CHAINS";

/// Provider id used when `RPC_PROVIDER` is not set.
pub const DEFAULT_RPC_PROVIDER: &str = "alchemy";

/// Chain id used when neither the tool call nor `DEFAULT_CHAIN_ID` names one.
pub const MAINNET_CHAIN_ID: u64 = 1;

/// Source of environment variables.
pub trait EnvSource: Send + Sync {
    /// Returns the value of `key`, or `None` when unset or blank.
    fn var(&self, key: &str) -> Option<String>;
}

/// The real process environment.
#[derive(Debug, Clone, Copy, Default)]
pub struct ProcessEnv;

impl EnvSource for ProcessEnv {
    fn var(&self, key: &str) -> Option<String> {
        std::env::var(key).ok().filter(|v| !v.trim().is_empty())
    }
}

impl EnvSource for HashMap<String, String> {
    fn var(&self, key: &str) -> Option<String> {
        self.get(key).filter(|v| !v.trim().is_empty()).cloned()
    }
}

/// Configuration for the EVM MCP server
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// Chain id used when a tool call does not name a chain
    pub default_chain_id: u64,

    /// Whether live chain-id reconciliation and chainlist discovery run
    pub dynamic_chains: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            default_chain_id: MAINNET_CHAIN_ID,
            dynamic_chains: true,
        }
    }
}

impl Config {
    /// Build configuration from an environment source.
    ///
    /// Invalid values are logged and replaced by their defaults; loading never fails.
    pub fn from_env(env: &dyn EnvSource) -> Self {
        let mut config = Self::default();

        if let Some(raw) = env.var(DEFAULT_CHAIN_ID_VAR) {
            match raw.trim().parse::<u64>() {
                Ok(id) => config.default_chain_id = id,
                Err(e) => tracing::warn!(
                    value = %raw,
                    error = %e,
                    "ignoring non-numeric {DEFAULT_CHAIN_ID_VAR}"
                ),
            }
        }

        if let Some(flag) = env.var(DISABLE_DYNAMIC_CHAINS_VAR) {
            config.dynamic_chains = !is_truthy(&flag);
        }

        config
    }

    /// Build configuration from the process environment.
    pub fn from_process_env() -> Self {
        Self::from_env(&ProcessEnv)
    }
}

/// Provider id appended to `<CHAIN>_RPC_URL_` lookups. Read on every call so the
/// registry follows the live environment.
pub fn rpc_provider(env: &dyn EnvSource) -> String {
    env.var(RPC_PROVIDER_VAR)
        .map(|p| p.trim().to_string())
        .unwrap_or_else(|| DEFAULT_RPC_PROVIDER.to_string())
}

/// Interpret a boolean-ish flag value.
pub fn is_truthy(value: &str) -> bool {
    matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn env(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.default_chain_id, 1);
        assert!(config.dynamic_chains);
    }

    #[test]
    fn test_from_empty_env_matches_default() {
        let config = Config::from_env(&HashMap::new());
        assert_eq!(config, Config::default());
    }

    #[test]
    fn test_from_env_reads_all_values() {
        let config = Config::from_env(&env(&[
            ("DEFAULT_CHAIN_ID", "8453"),
            ("RPC_PROVIDER", "infura"),
            ("DISABLE_DYNAMIC_CHAINS", "true"),
        ]));
        assert_eq!(config.default_chain_id, 8453);
        assert!(!config.dynamic_chains);
    }

    #[test]
    fn test_rpc_provider() {
        assert_eq!(rpc_provider(&HashMap::new()), "alchemy");
        assert_eq!(rpc_provider(&env(&[("RPC_PROVIDER", " infura ")])), "infura");
    }

    #[test]
    fn test_invalid_default_chain_id_is_ignored() {
        let config = Config::from_env(&env(&[("DEFAULT_CHAIN_ID", "base")]));
        assert_eq!(config.default_chain_id, 1);
    }

    #[test]
    fn test_blank_values_count_as_unset() {
        let source = env(&[("RPC_PROVIDER", "   ")]);
        assert_eq!(source.var("RPC_PROVIDER"), None);
        assert_eq!(rpc_provider(&source), "alchemy");
    }

    #[test]
    fn test_is_truthy() {
        assert!(is_truthy("1"));
        assert!(is_truthy("TRUE"));
        assert!(is_truthy(" yes "));
        assert!(!is_truthy("0"));
        assert!(!is_truthy("false"));
        assert!(!is_truthy("nope"));
    }
}
