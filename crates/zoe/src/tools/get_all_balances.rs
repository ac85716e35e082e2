use std::collections::HashMap;

use schemars::{JsonSchema, schema_for};
use serde::Deserialize;
use serde_json::{Value, json};
use zoe_core::tool::{Tool, ToolResult};

use super::check_address;
use crate::chain::{Balance, Chain};
use crate::coins::{format_base_amount, normalize};

#[derive(Deserialize, JsonSchema)]
pub struct GetAllBalancesParameters {
    #[schemars(description = "The Sui address to get balances for")]
    address: String,
}

/// Lists every coin balance of an address.
pub struct GetAllBalancesTool {
    chain: Chain,
    parameter_schema: Value,
}

impl GetAllBalancesTool {
    /// Creates a new balance tool.
    #[inline]
    pub fn new(chain: Chain) -> Self {
        Self {
            chain,
            parameter_schema: schema_for!(GetAllBalancesParameters).to_value(),
        }
    }
}

fn format_balance(balance: &Balance, decimals: Option<u8>) -> ToolResult {
    let total = balance.total()?;
    Ok(json!({
        "coinType": balance.coin_type,
        "coinObjectCount": balance.coin_object_count,
        "totalBalance": balance.total_balance,
        "decimals": decimals,
        "normalizedBalance": decimals.map(|d| normalize(total, d)),
        "displayBalance": decimals.map(|d| format_base_amount(total, d)),
    }))
}

impl Tool for GetAllBalancesTool {
    type Input = GetAllBalancesParameters;

    fn key(&self) -> &str {
        "getAllBalances"
    }

    fn display_name(&self) -> &str {
        "All balances"
    }

    fn description(&self) -> &str {
        "Get all coin balances for a given address on the Sui blockchain"
    }

    fn parameter_schema(&self) -> &Value {
        &self.parameter_schema
    }

    #[allow(clippy::manual_async_fn)]
    fn execute(
        &self,
        input: GetAllBalancesParameters,
    ) -> impl Future<Output = ToolResult> + Send + 'static {
        let chain = self.chain.clone();
        async move {
            check_address("address", &input.address)?;
            let balances = chain.rpc().get_all_balances(&input.address).await?;

            let mut decimals = HashMap::new();
            for balance in &balances {
                if decimals.contains_key(&balance.coin_type) {
                    continue;
                }
                // Coins without published metadata are listed unscaled.
                let metadata =
                    chain.rpc().get_coin_metadata(&balance.coin_type).await?;
                decimals.insert(
                    balance.coin_type.clone(),
                    metadata.map(|m| m.decimals),
                );
            }

            let balances = balances
                .iter()
                .map(|b| format_balance(b, decimals.get(&b.coin_type).copied().flatten()))
                .collect::<Result<Vec<_>, _>>()?;
            Ok(json!({ "balances": balances }))
        }
    }
}
