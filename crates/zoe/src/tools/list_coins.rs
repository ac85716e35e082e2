use schemars::{JsonSchema, schema_for};
use serde::Deserialize;
use serde_json::{Value, json};
use zoe_core::tool::{Tool, ToolResult};

use crate::coins::SUPPORTED_COINS;

#[derive(Deserialize, JsonSchema)]
pub struct ListCoinsParameters {}

/// Lists the coins the swap router supports.
pub struct ListCoinsTool {
    parameter_schema: Value,
}

impl ListCoinsTool {
    /// Creates a new coin list tool.
    #[inline]
    pub fn new() -> Self {
        Self {
            parameter_schema: schema_for!(ListCoinsParameters).to_value(),
        }
    }
}

impl Default for ListCoinsTool {
    #[inline]
    fn default() -> Self {
        Self::new()
    }
}

impl Tool for ListCoinsTool {
    type Input = ListCoinsParameters;

    fn key(&self) -> &str {
        "listCoins"
    }

    fn display_name(&self) -> &str {
        "Supported coins"
    }

    fn description(&self) -> &str {
        "Get a list of all supported coins that can be traded through Aftermath DEX"
    }

    fn parameter_schema(&self) -> &Value {
        &self.parameter_schema
    }

    #[allow(clippy::manual_async_fn)]
    fn execute(
        &self,
        _input: ListCoinsParameters,
    ) -> impl Future<Output = ToolResult> + Send + 'static {
        async move { Ok(json!({ "supportedCoins": SUPPORTED_COINS })) }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_list_coins() {
        let result = ListCoinsTool::new()
            .execute(ListCoinsParameters {})
            .await
            .unwrap();
        let coins = result["supportedCoins"].as_array().unwrap();
        assert_eq!(coins.len(), SUPPORTED_COINS.len());
        assert_eq!(coins[0], "0x2::sui::SUI");
    }
}
