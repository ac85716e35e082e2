use schemars::{JsonSchema, schema_for};
use serde::Deserialize;
use serde_json::{Value, json};
use zoe_core::tool::{Error as ToolError, Tool, ToolResult};

use super::clmm::{self, PoolState};
use super::{check_slippage, payment_coins, precondition, take_coin};
use crate::chain::{Chain, Ptb, object};
use crate::config::BluefinConfig;

const CLOCK: &str = "0x6";
const NO_ARGS: [&str; 0] = [];

#[derive(Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct BluefinParameters {
    #[schemars(description = "The ID of the pool to trade on")]
    pool_id: String,
    #[schemars(description = "Amount to swap")]
    amount: f64,
    #[schemars(
        description = "If true, swap first token for second token, if false then reverse"
    )]
    a_to_b: bool,
    #[schemars(description = "If true, amount is input amount, if false then output amount")]
    by_amount_in: bool,
    #[schemars(description = "Slippage tolerance between 0 and 1 (e.g. 0.1 for 10%)")]
    slippage: f64,
}

/// A spot swap against one Bluefin pool.
#[derive(Clone, Debug, PartialEq)]
pub struct SpotSwap {
    /// The pool object id.
    pub pool_id: String,
    /// Amount in whole coins of the fixed side.
    pub amount: f64,
    /// Pays coin A for coin B when set.
    pub a_to_b: bool,
    /// `amount` is what is paid when set, otherwise what is received.
    pub by_amount_in: bool,
    /// Accepted slippage as a fraction.
    pub slippage: f64,
}

impl SpotSwap {
    /// Returns `true` if `amount` counts coin A.
    #[inline]
    fn amount_in_a(&self) -> bool {
        self.by_amount_in == self.a_to_b
    }

    fn payload(&self) -> Value {
        json!({
            "poolId": self.pool_id,
            "amount": self.amount,
            "aToB": self.a_to_b,
            "byAmountIn": self.by_amount_in,
            "slippage": self.slippage,
        })
    }
}

impl TryFrom<BluefinParameters> for SpotSwap {
    type Error = ToolError;

    fn try_from(params: BluefinParameters) -> Result<Self, Self::Error> {
        let pool_id = params.pool_id.trim();
        if pool_id.is_empty() {
            return Err(precondition("Pool ID required"));
        }
        if !params.amount.is_finite() || params.amount <= 0.0 {
            return Err(precondition(format!(
                "`amount` must be a positive number, got {}",
                params.amount
            )));
        }
        Ok(SpotSwap {
            pool_id: pool_id.to_owned(),
            amount: params.amount,
            a_to_b: params.a_to_b,
            by_amount_in: params.by_amount_in,
            slippage: check_slippage(params.slippage)?,
        })
    }
}

/// The base-unit amounts of a swap.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
struct Quote {
    /// The fixed side.
    amount: u64,
    /// The least to receive or the most to pay, whichever side is not fixed.
    limit: u64,
    /// The most that leaves the wallet.
    max_in: u64,
}

fn quote(pool: &PoolState, swap: &SpotSwap, amount: u64) -> Quote {
    if swap.by_amount_in {
        let estimate = clmm::estimate_out(pool, swap.a_to_b, amount);
        Quote {
            amount,
            limit: clmm::amount_limit(estimate, swap.slippage, true),
            max_in: amount,
        }
    } else {
        let estimate = clmm::estimate_in(pool, swap.a_to_b, amount);
        let limit = clmm::amount_limit(estimate, swap.slippage, false);
        Quote {
            amount,
            limit,
            max_in: limit,
        }
    }
}

/// Scales whole coins to base units.
fn base_units(amount: f64, decimals: u8) -> Result<u64, ToolError> {
    let scaled = (amount * 10_f64.powi(decimals.into())).round();
    if scaled < 1.0 || scaled >= u64::MAX as f64 {
        return Err(precondition(format!(
            "{amount} is not a tradable amount of a coin with {decimals} decimals"
        )));
    }
    Ok(scaled as u64)
}

fn swap_ptb(
    config: &BluefinConfig,
    pool: &PoolState,
    swap: &SpotSwap,
    quote: &Quote,
    owned_in: &[String],
) -> Ptb {
    let (coin_in, coin_other) = if swap.a_to_b {
        (&pool.coin_type_a, &pool.coin_type_b)
    } else {
        (&pool.coin_type_b, &pool.coin_type_a)
    };
    let (coin_a, coin_b) = if swap.a_to_b {
        ("coin_in", "coin_zero")
    } else {
        ("coin_zero", "coin_in")
    };
    take_coin(Ptb::new(), coin_in, owned_in, quote.max_in, "coin_in")
        .move_call("0x2::coin::zero", &[coin_other.as_str()], &NO_ARGS)
        .assign("coin_zero")
        .move_call(
            &format!("{}::gateway::swap_assets", config.package),
            &[pool.coin_type_a.as_str(), pool.coin_type_b.as_str()],
            &[
                object(CLOCK),
                object(&config.global_config),
                object(&pool.id),
                coin_a.to_owned(),
                coin_b.to_owned(),
                swap.a_to_b.to_string(),
                swap.by_amount_in.to_string(),
                format!("{}u64", quote.amount),
                format!("{}u64", quote.limit),
                format!("{}u128", clmm::sqrt_price_limit(swap.a_to_b)),
            ],
        )
}

async fn run(chain: Chain, config: Option<BluefinConfig>, swap: SpotSwap) -> ToolResult {
    let config = config.ok_or_else(|| precondition("Bluefin spot is not configured"))?;
    let object = chain.rpc().get_object(&swap.pool_id).await?;
    let pool = PoolState::from_object(&object)?;

    let amount_coin = if swap.amount_in_a() {
        &pool.coin_type_a
    } else {
        &pool.coin_type_b
    };
    let metadata = chain
        .rpc()
        .get_coin_metadata(amount_coin)
        .await?
        .ok_or_else(|| {
            ToolError::external_service()
                .with_reason(format!("no metadata for coin `{amount_coin}`"))
        })?;
    let quote = quote(&pool, &swap, base_units(swap.amount, metadata.decimals)?);

    let coin_in = if swap.a_to_b {
        &pool.coin_type_a
    } else {
        &pool.coin_type_b
    };
    let owned_in = payment_coins(&chain, coin_in, quote.max_in).await?;
    let ptb = swap_ptb(&config, &pool, &swap, &quote, &owned_in);
    debug!(
        "bluefin swap on {}: {} fixed, {} limit",
        pool.id, quote.amount, quote.limit
    );
    let resp = chain.signer().execute(&ptb).await?;
    Ok(json!({
        "success": true,
        "transactionId": resp.digest,
        "params": swap.payload(),
    }))
}

/// Swaps on the Bluefin spot exchange.
pub struct BluefinTool {
    chain: Chain,
    config: Option<BluefinConfig>,
    parameter_schema: Value,
}

impl BluefinTool {
    /// Creates a new Bluefin tool.
    pub fn new(chain: Chain, config: Option<BluefinConfig>) -> Self {
        Self {
            chain,
            config,
            parameter_schema: schema_for!(BluefinParameters).to_value(),
        }
    }
}

impl Tool for BluefinTool {
    type Input = BluefinParameters;

    fn key(&self) -> &str {
        "bluefin"
    }

    fn display_name(&self) -> &str {
        "Bluefin"
    }

    fn description(&self) -> &str {
        "Execute spot trades on Bluefin DEX. Supports swapping assets with configurable \
         slippage. The amount is in whole coins of the side it fixes."
    }

    fn parameter_schema(&self) -> &Value {
        &self.parameter_schema
    }

    #[allow(clippy::manual_async_fn)]
    fn execute(
        &self,
        input: BluefinParameters,
    ) -> impl Future<Output = ToolResult> + Send + 'static {
        let chain = self.chain.clone();
        let config = self.config.clone();
        async move {
            let swap = SpotSwap::try_from(input)?;
            run(chain, config, swap).await
        }
    }
}

#[cfg(test)]
mod tests {
    use zoe_core::tool::ErrorKind;

    use super::*;
    use crate::chain::tests::offline_chain;
    use crate::tools::clmm::tests::pool;

    fn config() -> BluefinConfig {
        BluefinConfig {
            package: "0xb1ue".to_owned(),
            global_config: "0xc0nf".to_owned(),
        }
    }

    fn params(amount: f64, slippage: f64) -> BluefinParameters {
        BluefinParameters {
            pool_id: "0xp001".to_owned(),
            amount,
            a_to_b: true,
            by_amount_in: true,
            slippage,
        }
    }

    fn swap(a_to_b: bool, by_amount_in: bool) -> SpotSwap {
        SpotSwap {
            pool_id: "0xp001".to_owned(),
            amount: 1.0,
            a_to_b,
            by_amount_in,
            slippage: 0.01,
        }
    }

    #[test]
    fn test_decode_swap() {
        let swap = SpotSwap::try_from(params(1.5, 0.1)).unwrap();
        assert_eq!(swap.amount, 1.5);
        assert_eq!(swap.payload()["aToB"], true);

        for (amount, slippage) in [(0.0, 0.1), (-2.0, 0.1), (f64::NAN, 0.1), (1.0, 0.0), (1.0, 1.5)] {
            let err = SpotSwap::try_from(params(amount, slippage)).unwrap_err();
            assert_eq!(err.kind(), ErrorKind::Precondition, "{amount} {slippage}");
        }

        let err = SpotSwap::try_from(BluefinParameters {
            pool_id: " ".to_owned(),
            ..params(1.0, 0.1)
        })
        .unwrap_err();
        assert_eq!(err.reason(), "Pool ID required");
    }

    #[test]
    fn test_amount_side() {
        assert!(swap(true, true).amount_in_a());
        assert!(swap(false, false).amount_in_a());
        assert!(!swap(true, false).amount_in_a());
        assert!(!swap(false, true).amount_in_a());
    }

    #[test]
    fn test_quote() {
        // One A is worth four B.
        let pool = pool(1 << 65);
        let exact_in = quote(&pool, &swap(true, true), 1000);
        assert_eq!(
            exact_in,
            Quote {
                amount: 1000,
                limit: 3960,
                max_in: 1000
            }
        );
        let exact_out = quote(&pool, &swap(true, false), 4000);
        assert_eq!(exact_out.limit, 1010);
        assert_eq!(exact_out.max_in, 1010);
        assert_eq!(quote(&pool, &swap(false, true), 1000).limit, 247);
    }

    #[test]
    fn test_base_units() {
        assert_eq!(base_units(1.5, 9).unwrap(), 1_500_000_000);
        assert_eq!(base_units(0.1, 6).unwrap(), 100_000);
        let err = base_units(0.0000001, 6).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Precondition);
    }

    #[test]
    fn test_swap_ptb() {
        let pool = pool(1 << 65);
        let swap = swap(false, true);
        let quote = quote(&pool, &swap, 1000);
        let owned = ["0xb1".to_owned(), "0xb2".to_owned()];
        let ptb = swap_ptb(&config(), &pool, &swap, &quote, &owned);
        assert_eq!(
            ptb.args(),
            [
                "--merge-coins",
                "@0xb1",
                "[@0xb2]",
                "--split-coins",
                "@0xb1",
                "[1000]",
                "--assign",
                "coin_in",
                "--move-call",
                "0x2::coin::zero",
                "<0x2::sui::SUI>",
                "--assign",
                "coin_zero",
                "--move-call",
                "0xb1ue::gateway::swap_assets",
                "<0x2::sui::SUI, 0xdba3::usdc::USDC>",
                "@0x6",
                "@0xc0nf",
                "@0xp001",
                "coin_zero",
                "coin_in",
                "false",
                "true",
                "1000u64",
                "247u64",
                "79226673515401279992447579055u128",
            ]
        );
    }

    #[tokio::test]
    async fn test_unconfigured_exchange() {
        let tool = BluefinTool::new(offline_chain(), None);
        let err = tool.execute(params(1.0, 0.1)).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Precondition);
        assert!(err.reason().contains("not configured"));
    }

    #[test]
    fn test_schema() {
        let tool = BluefinTool::new(offline_chain(), None);
        let schema = tool.parameter_schema();
        let required = schema["required"].as_array().unwrap();
        assert_eq!(required.len(), 5);
        assert!(schema["properties"]["aToB"].is_object());
        assert!(schema["properties"]["byAmountIn"].is_object());
    }
}
