//! Tool catalogue and dispatch
//!
//! Every tool takes a typed argument struct (its JSON schema is derived from the
//! struct) and returns a [`ToolOutput`]. Errors are returned as `anyhow::Error` and
//! turned into `Error: ...` text results by the server.

use anyhow::{anyhow, Result};
use rmcp::model::{CallToolResult, Content, Tool};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{Map, Value};
use std::future::Future;
use std::sync::Arc;

use crate::chains::ChainRegistry;
use crate::clients::{ChainClient, ClientManager};
use crate::conversion::{self, ConvertArgs};
use crate::schema::tool;
use crate::tools::{accounts, blocks, chain, contracts, ens, fees, logs, tokens, transactions};

/// Shared state handed to every tool.
#[derive(Clone)]
pub struct ToolContext {
    clients: Arc<ClientManager>,
}

impl ToolContext {
    pub fn new(clients: Arc<ClientManager>) -> Self {
        Self { clients }
    }

    pub fn clients(&self) -> &Arc<ClientManager> {
        &self.clients
    }

    pub fn registry(&self) -> &Arc<ChainRegistry> {
        self.clients.registry()
    }

    /// Connection for `chain`, or for the default chain when omitted.
    pub fn client(&self, chain: Option<&str>) -> Result<Arc<ChainClient>> {
        Ok(self.clients.get_client(chain)?)
    }
}

/// Result of a successful tool call.
#[derive(Debug, Clone, PartialEq)]
pub enum ToolOutput {
    Text(String),
    Json(Value),
}

impl ToolOutput {
    pub fn json<T: Serialize>(value: T) -> Result<Self> {
        Ok(Self::Json(serde_json::to_value(value)?))
    }

    /// Text form sent to the client. JSON payloads are pretty-printed.
    pub fn into_text(self) -> String {
        match self {
            Self::Text(text) => text,
            Self::Json(Value::String(text)) => text,
            Self::Json(value) => {
                serde_json::to_string_pretty(&value).unwrap_or_else(|_| value.to_string())
            }
        }
    }

    pub fn into_call_result(self) -> CallToolResult {
        CallToolResult::success(vec![Content::text(self.into_text())])
    }
}

/// Text result for a failed tool call.
pub fn error_result(error: &anyhow::Error) -> CallToolResult {
    CallToolResult::error(vec![Content::text(format!("Error: {error:#}"))])
}

/// Every tool this server exposes.
pub fn tool_definitions() -> Vec<Tool> {
    vec![
        // Accounts
        tool::<accounts::GetBalanceArgs>(
            "get_balance",
            "Get the native token balance of an address, in wei and formatted in the chain's currency",
        ),
        tool::<accounts::GetAccountInfoArgs>(
            "get_account_info",
            "Get balance, nonce and whether an address is a contract (with its code size)",
        ),
        // Blocks
        tool::<blocks::GetBlockArgs>(
            "get_block",
            "Get a block by number, tag (latest, safe, finalized, earliest, pending) or hash",
        ),
        tool::<blocks::GetBlockNumberArgs>("get_block_number", "Get the latest block number"),
        // Transactions
        tool::<transactions::GetTransactionArgs>(
            "get_transaction",
            "Get a transaction by hash, optionally together with its receipt and logs",
        ),
        tool::<transactions::GetTransactionReceiptArgs>(
            "get_transaction_receipt",
            "Get a transaction receipt (status, gas used, logs) by transaction hash",
        ),
        tool::<transactions::EstimateGasArgs>(
            "estimate_gas",
            "Estimate the gas a transaction request would use",
        ),
        tool::<transactions::PrepareTransactionArgs>(
            "prepare_transaction_request",
            "Fill a transaction request with chain id, nonce, gas limit and EIP-1559 fees. The request is returned unsigned and never sent",
        ),
        // Fees
        tool::<fees::GetGasPriceArgs>(
            "get_gas_price",
            "Get the current gas price, priority fee and a suggested EIP-1559 max fee",
        ),
        tool::<fees::GetFeeHistoryArgs>(
            "get_fee_history",
            "Get base fees, gas usage ratios and priority fee percentiles for recent blocks",
        ),
        // ENS
        tool::<ens::ResolveNameArgs>(
            "resolve_ens_name",
            "Resolve an ENS name (e.g. vitalik.eth) to an address. Defaults to mainnet",
        ),
        tool::<ens::LookupAddressArgs>(
            "lookup_ens_address",
            "Look up the primary ENS name of an address (reverse resolution, verified forward)",
        ),
        tool::<ens::ResolveNameArgs>(
            "get_ens_resolver",
            "Get the resolver contract address of an ENS name",
        ),
        tool::<ens::GetTextArgs>(
            "get_ens_text",
            "Get a text record (e.g. url, com.twitter, description) of an ENS name",
        ),
        tool::<ens::ResolveNameArgs>("get_ens_avatar", "Get the avatar URI of an ENS name"),
        // Tokens
        tool::<tokens::TokenArgs>(
            "get_erc20_metadata",
            "Get name, symbol, decimals and total supply of an ERC-20 token",
        ),
        tool::<tokens::TokenBalanceArgs>(
            "get_erc20_balance",
            "Get the ERC-20 token balance of an owner, raw and formatted",
        ),
        tool::<tokens::TokenAllowanceArgs>(
            "get_erc20_allowance",
            "Get the ERC-20 allowance an owner granted to a spender",
        ),
        // Contracts
        tool::<contracts::GetCodeArgs>("get_code", "Get the deployed bytecode at an address"),
        tool::<contracts::GetStorageAtArgs>(
            "get_storage_at",
            "Read a raw 32-byte storage slot of a contract",
        ),
        tool::<contracts::EncodeFunctionDataArgs>(
            "encode_function_data",
            "ABI-encode calldata for a function given its signature (or a JSON ABI and name) and arguments",
        ),
        tool::<contracts::EncodeDeployDataArgs>(
            "encode_deploy_data",
            "Append ABI-encoded constructor arguments to contract creation bytecode",
        ),
        tool::<contracts::DecodeFunctionResultArgs>(
            "decode_function_result",
            "Decode return data of a function call given its signature with a returns clause (or a JSON ABI and name)",
        ),
        tool::<contracts::ContractCallArgs>(
            "read_contract",
            "Call a view/pure contract function and decode the result",
        ),
        tool::<contracts::ContractCallArgs>(
            "simulate_contract",
            "Simulate a contract call (any function, with optional sender and value) without sending a transaction",
        ),
        tool::<contracts::ContractCallArgs>(
            "estimate_contract_gas",
            "Estimate the gas of a contract function call",
        ),
        // Logs
        tool::<logs::GetLogsArgs>(
            "get_logs",
            "Query event logs by address, event signature, topics and block range",
        ),
        // Chains
        tool::<chain::GetChainIdArgs>(
            "get_chain_id",
            "Get the chain id reported by the RPC endpoint of a chain",
        ),
        tool::<chain::ListChainsArgs>(
            "list_supported_chains",
            "List every supported chain with its id, aliases and native currency",
        ),
        // Utilities
        tool::<ConvertArgs>("convert", &conversion::tool_description()),
    ]
}

async fn run<T, F, Fut>(args: Map<String, Value>, handler: F) -> Result<ToolOutput>
where
    T: DeserializeOwned,
    F: FnOnce(T) -> Fut,
    Fut: Future<Output = Result<ToolOutput>>,
{
    let parsed = serde_json::from_value(Value::Object(args))
        .map_err(|e| anyhow!("invalid arguments: {e}"))?;
    handler(parsed).await
}

/// Run the tool called `name`. Returns `None` for unknown tools.
pub async fn call_tool(
    ctx: &ToolContext,
    name: &str,
    args: Map<String, Value>,
) -> Option<Result<ToolOutput>> {
    let result = match name {
        "get_balance" => run(args, |a| accounts::get_balance(ctx, a)).await,
        "get_account_info" => run(args, |a| accounts::get_account_info(ctx, a)).await,
        "get_block" => run(args, |a| blocks::get_block(ctx, a)).await,
        "get_block_number" => run(args, |a| blocks::get_block_number(ctx, a)).await,
        "get_transaction" => run(args, |a| transactions::get_transaction(ctx, a)).await,
        "get_transaction_receipt" => {
            run(args, |a| transactions::get_transaction_receipt(ctx, a)).await
        }
        "estimate_gas" => run(args, |a| transactions::estimate_gas(ctx, a)).await,
        "prepare_transaction_request" => {
            run(args, |a| transactions::prepare_transaction_request(ctx, a)).await
        }
        "get_gas_price" => run(args, |a| fees::get_gas_price(ctx, a)).await,
        "get_fee_history" => run(args, |a| fees::get_fee_history(ctx, a)).await,
        "resolve_ens_name" => run(args, |a| ens::resolve_ens_name(ctx, a)).await,
        "lookup_ens_address" => run(args, |a| ens::lookup_ens_address(ctx, a)).await,
        "get_ens_resolver" => run(args, |a| ens::get_ens_resolver(ctx, a)).await,
        "get_ens_text" => run(args, |a| ens::get_ens_text(ctx, a)).await,
        "get_ens_avatar" => run(args, |a| ens::get_ens_avatar(ctx, a)).await,
        "get_erc20_metadata" => run(args, |a| tokens::get_erc20_metadata(ctx, a)).await,
        "get_erc20_balance" => run(args, |a| tokens::get_erc20_balance(ctx, a)).await,
        "get_erc20_allowance" => run(args, |a| tokens::get_erc20_allowance(ctx, a)).await,
        "get_code" => run(args, |a| contracts::get_code(ctx, a)).await,
        "get_storage_at" => run(args, |a| contracts::get_storage_at(ctx, a)).await,
        "encode_function_data" => {
            run(args, |a| async move { contracts::encode_function_data(a) }).await
        }
        "encode_deploy_data" => {
            run(args, |a| async move { contracts::encode_deploy_data(a) }).await
        }
        "decode_function_result" => {
            run(args, |a| async move { contracts::decode_function_result(a) }).await
        }
        "read_contract" => run(args, |a| contracts::read_contract(ctx, a)).await,
        "simulate_contract" => run(args, |a| contracts::simulate_contract(ctx, a)).await,
        "estimate_contract_gas" => run(args, |a| contracts::estimate_contract_gas(ctx, a)).await,
        "get_logs" => run(args, |a| logs::get_logs(ctx, a)).await,
        "get_chain_id" => run(args, |a| chain::get_chain_id(ctx, a)).await,
        "list_supported_chains" => {
            run(args, |a| async move { chain::list_supported_chains(ctx, a) }).await
        }
        "convert" => {
            run(args, |a: ConvertArgs| async move {
                conversion::convert(&a).map(ToolOutput::Json)
            })
            .await
        }
        _ => return None,
    };
    Some(result)
}
