//! Error types shared by the chain registry, client manager and tool handlers

use thiserror::Error;

/// Failures resolving a chain or building a connection for it.
#[derive(Debug, Error)]
pub enum ChainError {
    #[error(
        "Unsupported chain: '{name}'. Use the list_supported_chains tool to see available networks."
    )]
    UnsupportedChain { name: String },

    #[error("no RPC endpoint configured for chain {name} ({chain_id})")]
    NoRpcEndpoint { chain_id: u64, name: String },

    #[error("invalid RPC URL '{url}': {reason}")]
    InvalidRpcUrl { url: String, reason: String },
}

/// A tool argument that failed validation.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum InputError {
    #[error("invalid {field}: {reason}")]
    Invalid { field: String, reason: String },

    #[error("missing required field: {field}")]
    Missing { field: String },
}

impl InputError {
    pub fn invalid(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Invalid {
            field: field.into(),
            reason: reason.into(),
        }
    }

    pub fn missing(field: impl Into<String>) -> Self {
        Self::Missing {
            field: field.into(),
        }
    }
}
