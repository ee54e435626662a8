//! EVM MCP Server
//!
//! A Model Context Protocol (MCP) server exposing read-only Ethereum and EVM chain
//! operations (balances, blocks, transactions, contract reads, ENS, ERC-20 tokens,
//! gas and fees, logs, ABI encoding) as tools. Chains are resolved by name, alias or
//! id through a [`chains::ChainRegistry`], and one connection per chain id is cached
//! by a [`clients::ClientManager`].

pub mod abi;
pub mod chainlist;
pub mod chains;
pub mod clients;
pub mod config;
pub mod conversion;
pub mod ens;
pub mod error;
pub mod handlers;
pub mod inputs;
pub mod prompts;
pub mod render;
pub mod schema;
pub mod server;
pub mod snippet;
pub mod tools;

pub use server::EvmMcpHandler;
