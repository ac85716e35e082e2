use schemars::{JsonSchema, schema_for};
use serde::Deserialize;
use serde_json::{Map, Value, json};
use zoe_core::tool::{Error as ToolError, Tool, ToolResult};

use super::precondition;
use crate::chain::Chain;
use crate::coins;

#[allow(dead_code)]
#[derive(JsonSchema)]
#[schemars(inline, rename_all = "camelCase")]
enum PriceActionName {
    SingleCoin,
    MultipleCoins,
}

#[derive(Deserialize, JsonSchema)]
pub struct GetPricesParameters {
    #[schemars(
        with = "PriceActionName",
        description = "Whether to fetch price for a single coin or multiple coins"
    )]
    action: String,
    #[schemars(
        length(min = 1),
        description = "Array of coin types to get prices for (e.g. [\"0x2::sui::SUI\"])"
    )]
    coins: Vec<String>,
    #[serde(default)]
    #[schemars(
        description = "If true, includes 24h price changes and additional market data"
    )]
    detailed: bool,
}

/// A decoded price request.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PriceQuery {
    /// The price of one coin.
    SingleCoin {
        /// The coin type.
        coin: String,
        /// Whether to include market data.
        detailed: bool,
    },
    /// The prices of several coins.
    MultipleCoins {
        /// The coin types.
        coins: Vec<String>,
        /// Whether to include market data.
        detailed: bool,
    },
}

impl TryFrom<GetPricesParameters> for PriceQuery {
    type Error = ToolError;

    fn try_from(params: GetPricesParameters) -> Result<Self, Self::Error> {
        // Unsupported coins are left out rather than failing the call.
        let coins: Vec<String> = params
            .coins
            .into_iter()
            .filter(|coin| coins::is_supported(coin))
            .collect();
        let detailed = params.detailed;
        match params.action.as_str() {
            "singleCoin" => match coins.into_iter().next() {
                Some(coin) => Ok(PriceQuery::SingleCoin { coin, detailed }),
                None => Err(precondition("none of the requested coins is supported")),
            },
            "multipleCoins" if coins.is_empty() => {
                Err(precondition("none of the requested coins is supported"))
            }
            "multipleCoins" => Ok(PriceQuery::MultipleCoins { coins, detailed }),
            other => Err(ToolError::unknown_action()
                .with_reason(format!("unknown price action `{other}`"))),
        }
    }
}

impl PriceQuery {
    fn coins(&self) -> Vec<String> {
        match self {
            PriceQuery::SingleCoin { coin, .. } => vec![coin.clone()],
            PriceQuery::MultipleCoins { coins, .. } => coins.clone(),
        }
    }

    /// Shapes the price info map returned by the API into the payload.
    fn payload(&self, info: Value) -> Value {
        let detailed = match self {
            PriceQuery::SingleCoin { detailed, .. }
            | PriceQuery::MultipleCoins { detailed, .. } => *detailed,
        };
        let pick = |entry: &Value| {
            if detailed {
                entry.clone()
            } else {
                entry.get("price").cloned().unwrap_or(Value::Null)
            }
        };
        match self {
            PriceQuery::SingleCoin { coin, .. } => {
                let entry = info.get(coin).map(pick).unwrap_or(Value::Null);
                let key = if detailed { "priceInfo" } else { "price" };
                json!({ key: entry })
            }
            PriceQuery::MultipleCoins { coins, .. } => {
                let entries: Map<String, Value> = coins
                    .iter()
                    .map(|coin| {
                        let entry =
                            info.get(coin).map(pick).unwrap_or(Value::Null);
                        (coin.clone(), entry)
                    })
                    .collect();
                let key = if detailed { "priceInfos" } else { "prices" };
                json!({ key: entries })
            }
        }
    }
}

/// Reads coin prices from Aftermath.
pub struct GetPricesTool {
    chain: Chain,
    parameter_schema: Value,
}

impl GetPricesTool {
    /// Creates a new price tool.
    #[inline]
    pub fn new(chain: Chain) -> Self {
        Self {
            chain,
            parameter_schema: schema_for!(GetPricesParameters).to_value(),
        }
    }
}

impl Tool for GetPricesTool {
    type Input = GetPricesParameters;

    fn key(&self) -> &str {
        "getPrices"
    }

    fn display_name(&self) -> &str {
        "Coin prices"
    }

    fn description(&self) -> &str {
        "Retrieve current prices and optional 24-hour price changes for cryptocurrencies on the Sui network. Can query either a single coin or multiple coins simultaneously."
    }

    fn parameter_schema(&self) -> &Value {
        &self.parameter_schema
    }

    #[allow(clippy::manual_async_fn)]
    fn execute(
        &self,
        input: GetPricesParameters,
    ) -> impl Future<Output = ToolResult> + Send + 'static {
        let chain = self.chain.clone();
        async move {
            let query = PriceQuery::try_from(input)?;
            let info = chain.aftermath().price_info(&query.coins()).await?;
            Ok(query.payload(info))
        }
    }
}

#[cfg(test)]
mod tests {
    use zoe_core::tool::ErrorKind;

    use super::*;

    fn params(action: &str, coins: &[&str], detailed: bool) -> GetPricesParameters {
        GetPricesParameters {
            action: action.to_owned(),
            coins: coins.iter().map(|c| c.to_string()).collect(),
            detailed,
        }
    }

    #[test]
    fn test_decode_query() {
        let query =
            PriceQuery::try_from(params("singleCoin", &["0x2::fake::F", "0x2::sui::SUI"], false))
                .unwrap();
        assert_eq!(
            query,
            PriceQuery::SingleCoin {
                coin: "0x2::sui::SUI".to_owned(),
                detailed: false,
            }
        );

        let err = PriceQuery::try_from(params("multipleCoins", &["0x2::fake::F"], true))
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Precondition);

        let err = PriceQuery::try_from(params("allCoins", &["0x2::sui::SUI"], true))
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::UnknownAction);
    }

    #[test]
    fn test_payload_keys() {
        let info = json!({
            "0x2::sui::SUI": { "price": 3.5, "priceChange24HoursPercentage": 0.02 }
        });

        let query = PriceQuery::SingleCoin {
            coin: "0x2::sui::SUI".to_owned(),
            detailed: false,
        };
        assert_eq!(query.payload(info.clone()), json!({ "price": 3.5 }));

        let query = PriceQuery::MultipleCoins {
            coins: vec!["0x2::sui::SUI".to_owned()],
            detailed: true,
        };
        assert_eq!(
            query.payload(info)["priceInfos"]["0x2::sui::SUI"]["price"],
            3.5
        );
    }

    #[test]
    fn test_schema_enumerates_actions() {
        let schema = schema_for!(GetPricesParameters).to_value();
        let action = &schema["properties"]["action"];
        let names = serde_json::to_string(action).unwrap();
        assert!(names.contains("singleCoin") && names.contains("multipleCoins"));
        assert_eq!(schema["properties"]["coins"]["minItems"], 1);
    }
}
