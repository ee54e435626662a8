//! Tool implementations, one module per tool family
//!
//! Each tool takes `&ToolContext` plus its argument struct. Argument structs derive
//! `JsonSchema`; their doc comments become the field descriptions clients see.

pub mod accounts;
pub mod blocks;
pub mod chain;
pub mod contracts;
pub mod ens;
pub mod fees;
pub mod logs;
pub mod tokens;
pub mod transactions;
