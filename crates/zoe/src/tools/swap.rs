use schemars::{JsonSchema, schema_for};
use serde::Deserialize;
use serde_json::{Value, json};
use zoe_core::tool::{Error as ToolError, Tool, ToolResult};

use super::{check_slippage, parse_amount, precondition};
use crate::chain::Chain;
use crate::coins::{self, SUPPORTED_COINS};

#[allow(dead_code)]
#[derive(JsonSchema)]
#[schemars(inline, rename_all = "camelCase")]
enum SwapActionName {
    GetQuote,
    ExecuteSwap,
}

#[derive(Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct SwapParameters {
    #[schemars(with = "SwapActionName", description = "Action to perform")]
    action: String,
    #[schemars(description = "Input coin type (e.g. \"0x2::sui::SUI\")")]
    coin_in_type: String,
    #[schemars(description = "Output coin type")]
    coin_out_type: String,
    #[schemars(description = "Amount to swap in base units")]
    amount: String,
    #[schemars(
        description = "Slippage tolerance (e.g. 0.01 for 1%), required for executeSwap"
    )]
    slippage: Option<f64>,
}

/// The coins and amount of a trade.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TradeRequest {
    /// Coin sold.
    pub coin_in_type: String,
    /// Coin bought.
    pub coin_out_type: String,
    /// Amount sold, in base units.
    pub amount: u64,
}

/// A decoded swap request.
#[derive(Clone, Debug, PartialEq)]
pub enum SwapAction {
    /// Preview the best route.
    GetQuote(TradeRequest),
    /// Execute the best route.
    ExecuteSwap {
        /// The trade.
        trade: TradeRequest,
        /// Accepted slippage as a fraction.
        slippage: f64,
    },
}

fn check_coin_type(field: &str, coin_type: &str) -> Result<(), ToolError> {
    if coins::is_supported(coin_type) {
        return Ok(());
    }
    Err(precondition(format!(
        "`{field}` is not a supported coin: {coin_type}; call listCoins for the supported ones"
    )))
}

impl TryFrom<SwapParameters> for SwapAction {
    type Error = ToolError;

    fn try_from(params: SwapParameters) -> Result<Self, Self::Error> {
        let action = params.action.as_str();
        if !matches!(action, "getQuote" | "executeSwap") {
            return Err(ToolError::unknown_action()
                .with_reason(format!("unknown swap action `{action}`")));
        }

        check_coin_type("coinInType", &params.coin_in_type)?;
        check_coin_type("coinOutType", &params.coin_out_type)?;
        if coins::normalize_coin_type(&params.coin_in_type)
            == coins::normalize_coin_type(&params.coin_out_type)
        {
            return Err(precondition("cannot swap a coin for itself"));
        }
        let trade = TradeRequest {
            amount: parse_amount("amount", &params.amount)?,
            coin_in_type: params.coin_in_type,
            coin_out_type: params.coin_out_type,
        };

        if action == "getQuote" {
            return Ok(SwapAction::GetQuote(trade));
        }
        match params.slippage {
            Some(slippage) => Ok(SwapAction::ExecuteSwap {
                trade,
                slippage: check_slippage(slippage)?,
            }),
            None => Err(precondition(
                "Slippage parameter is required for swap execution",
            )),
        }
    }
}

/// Quotes and executes trades through the Aftermath router.
pub struct SwapTool {
    chain: Chain,
    parameter_schema: Value,
    description: String,
}

impl SwapTool {
    /// Creates a new swap tool.
    pub fn new(chain: Chain) -> Self {
        let description = format!(
            "Execute swaps and get quotes for trades using Aftermath DEX. First get a quote using action='getQuote' to preview the swap, then execute with action='executeSwap'. For coinInType and coinOutType, use one of these supported addresses: {}. After getting a quote, confirm you want to proceed before executing the swap. The response will show the input and output amounts.",
            SUPPORTED_COINS.join(", ")
        );
        Self {
            chain,
            parameter_schema: schema_for!(SwapParameters).to_value(),
            description,
        }
    }
}

impl Tool for SwapTool {
    type Input = SwapParameters;

    fn key(&self) -> &str {
        "swap"
    }

    fn display_name(&self) -> &str {
        "Swap"
    }

    fn description(&self) -> &str {
        &self.description
    }

    fn parameter_schema(&self) -> &Value {
        &self.parameter_schema
    }

    #[allow(clippy::manual_async_fn)]
    fn execute(
        &self,
        input: SwapParameters,
    ) -> impl Future<Output = ToolResult> + Send + 'static {
        let chain = self.chain.clone();
        async move {
            let action = SwapAction::try_from(input)?;
            let trade = match &action {
                SwapAction::GetQuote(trade)
                | SwapAction::ExecuteSwap { trade, .. } => trade,
            };
            let route = chain
                .aftermath()
                .trade_route(
                    &trade.coin_in_type,
                    &trade.coin_out_type,
                    trade.amount,
                    chain.address(),
                )
                .await?;

            let SwapAction::ExecuteSwap { slippage, .. } = action else {
                return Ok(json!({ "route": route }));
            };
            let tx_bytes = chain
                .aftermath()
                .trade_transaction(chain.address(), &route, slippage)
                .await?;
            let signature = chain.signer().sign(&tx_bytes).await?;
            let resp = chain
                .rpc()
                .execute_transaction_block(&tx_bytes, &signature)
                .await?;
            Ok(json!({
                "success": true,
                "transactionId": resp.digest,
                "balanceChanges": resp.balance_changes,
                "route": route,
            }))
        }
    }
}
