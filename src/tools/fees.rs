//! Gas price and fee history

use alloy::network::Ethereum;
use alloy::providers::{DynProvider, Provider};
use anyhow::{bail, Result};
use schemars::JsonSchema;
use serde::Deserialize;
use serde_json::json;

use crate::conversion::format_amount;
use crate::handlers::{ToolContext, ToolOutput};
use crate::inputs::parse_block_tag;
use crate::render::{chain_summary, to_json};

/// Largest block range a node is required to serve for `eth_feeHistory`.
const MAX_FEE_HISTORY_BLOCKS: u64 = 1024;

#[derive(Debug, Deserialize, JsonSchema)]
pub struct GetGasPriceArgs {
    /// Chain name, alias or id. Defaults to the configured default chain
    #[serde(default)]
    pub chain: Option<String>,
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct GetFeeHistoryArgs {
    /// Number of blocks (1-1024)
    #[serde(default = "default_block_count")]
    pub block_count: u64,
    /// Newest block of the range (number or tag). Defaults to latest
    #[serde(default)]
    pub newest_block: Option<String>,
    /// Ascending priority fee percentiles (0-100), e.g. [25, 50, 75]
    #[serde(default)]
    pub reward_percentiles: Vec<f64>,
    /// Chain name, alias or id. Defaults to the configured default chain
    #[serde(default)]
    pub chain: Option<String>,
}

fn default_block_count() -> u64 {
    10
}

/// Fee parameters for a new transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeeSuggestion {
    Eip1559 {
        base_fee_per_gas: u128,
        max_fee_per_gas: u128,
        max_priority_fee_per_gas: u128,
    },
    Legacy {
        gas_price: u128,
    },
}

impl FeeSuggestion {
    /// Max fee is twice the base fee plus the tip.
    pub fn from_base_fee(base_fee_per_gas: u128, max_priority_fee_per_gas: u128) -> Self {
        Self::Eip1559 {
            base_fee_per_gas,
            max_fee_per_gas: base_fee_per_gas
                .saturating_mul(2)
                .saturating_add(max_priority_fee_per_gas),
            max_priority_fee_per_gas,
        }
    }
}

/// EIP-1559 fees when the chain reports a base fee, otherwise the legacy gas price.
pub async fn suggest_fees(provider: &DynProvider<Ethereum>) -> Result<FeeSuggestion> {
    let history = provider
        .get_fee_history(1, alloy::eips::BlockNumberOrTag::Latest, &[])
        .await?;
    match history.base_fee_per_gas.last().copied().filter(|fee| *fee > 0) {
        Some(base_fee) => {
            let tip = provider.get_max_priority_fee_per_gas().await?;
            Ok(FeeSuggestion::from_base_fee(base_fee, tip))
        }
        None => Ok(FeeSuggestion::Legacy {
            gas_price: provider.get_gas_price().await?,
        }),
    }
}

fn gwei(wei: u128) -> Result<String> {
    format_amount(alloy::primitives::U256::from(wei), 9)
}

pub async fn get_gas_price(ctx: &ToolContext, args: GetGasPriceArgs) -> Result<ToolOutput> {
    let client = ctx.client(args.chain.as_deref())?;
    let provider = client.provider();

    let (gas_price, suggestion) = tokio::try_join!(
        async { anyhow::Ok(provider.get_gas_price().await?) },
        suggest_fees(provider),
    )?;

    let mut output = json!({
        "chain": chain_summary(client.chain()),
        "gasPrice": gas_price.to_string(),
        "gasPriceGwei": gwei(gas_price)?,
    });
    if let FeeSuggestion::Eip1559 {
        base_fee_per_gas,
        max_fee_per_gas,
        max_priority_fee_per_gas,
    } = suggestion
    {
        output["baseFeePerGas"] = json!(base_fee_per_gas.to_string());
        output["maxPriorityFeePerGas"] = json!(max_priority_fee_per_gas.to_string());
        output["maxFeePerGas"] = json!(max_fee_per_gas.to_string());
        output["maxFeePerGasGwei"] = json!(gwei(max_fee_per_gas)?);
    }
    Ok(ToolOutput::Json(output))
}

fn validate_percentiles(percentiles: &[f64]) -> Result<()> {
    if percentiles.iter().any(|p| !(0.0..=100.0).contains(p)) {
        bail!("reward percentiles must be between 0 and 100");
    }
    if percentiles.windows(2).any(|w| w[0] > w[1]) {
        bail!("reward percentiles must be in ascending order");
    }
    Ok(())
}

pub async fn get_fee_history(ctx: &ToolContext, args: GetFeeHistoryArgs) -> Result<ToolOutput> {
    if !(1..=MAX_FEE_HISTORY_BLOCKS).contains(&args.block_count) {
        bail!("block_count must be between 1 and {MAX_FEE_HISTORY_BLOCKS}");
    }
    validate_percentiles(&args.reward_percentiles)?;
    let newest = parse_block_tag("newest_block", args.newest_block.as_deref())?;
    let client = ctx.client(args.chain.as_deref())?;

    let history = client
        .provider()
        .get_fee_history(args.block_count, newest, &args.reward_percentiles)
        .await?;

    Ok(ToolOutput::Json(to_json(&history)?))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fee_suggestion_from_base_fee() {
        assert_eq!(
            FeeSuggestion::from_base_fee(10, 2),
            FeeSuggestion::Eip1559 {
                base_fee_per_gas: 10,
                max_fee_per_gas: 22,
                max_priority_fee_per_gas: 2,
            }
        );
        match FeeSuggestion::from_base_fee(u128::MAX, 1) {
            FeeSuggestion::Eip1559 {
                max_fee_per_gas, ..
            } => assert_eq!(max_fee_per_gas, u128::MAX),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_validate_percentiles() {
        assert!(validate_percentiles(&[]).is_ok());
        assert!(validate_percentiles(&[25.0, 50.0, 75.0]).is_ok());
        assert!(validate_percentiles(&[50.0, 25.0]).is_err());
        assert!(validate_percentiles(&[101.0]).is_err());
    }

    #[test]
    fn test_gwei_formatting() {
        assert_eq!(gwei(1_500_000_000).unwrap(), "1.5");
        assert_eq!(gwei(0).unwrap(), "0");
    }

    #[test]
    fn test_fee_history_defaults() {
        let args: GetFeeHistoryArgs = serde_json::from_value(json!({})).unwrap();
        assert_eq!(args.block_count, 10);
        assert!(args.reward_percentiles.is_empty());
    }
}
