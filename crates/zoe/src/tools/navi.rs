use schemars::{JsonSchema, schema_for};
use serde::Deserialize;
use serde_json::Value;
use zoe_core::tool::{Error as ToolError, Tool, ToolResult};

use super::{
    parse_amount, payment_coins, precondition, take_coin, transaction_payload,
};
use crate::chain::{Chain, Ptb, object};
use crate::config::{NaviConfig, NaviMarket};

const CLOCK: &str = "0x6";

#[allow(dead_code)]
#[derive(JsonSchema)]
#[schemars(inline, rename_all = "camelCase")]
enum NaviActionName {
    Supply,
    Withdraw,
    Borrow,
    Repay,
    Claim,
}

#[allow(dead_code, clippy::upper_case_acronyms)]
#[derive(JsonSchema)]
#[schemars(inline)]
enum NaviCoinName {
    Sui,
    NAVX,
    #[schemars(rename = "vSui")]
    VSui,
    USDT,
    USDC,
    WETH,
    CETUS,
    #[schemars(rename = "haSui")]
    HaSui,
    WBTC,
    AUSD,
}

#[derive(Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct NaviParameters {
    #[schemars(with = "NaviActionName", description = "Action to perform")]
    action: String,
    #[schemars(
        with = "Option<NaviCoinName>",
        description = "Coin to supply, withdraw, borrow or repay"
    )]
    coin_type: Option<String>,
    #[schemars(description = "Amount in base units of the coin")]
    amount: Option<String>,
}

/// The market and amount of a lending operation.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LendingRequest {
    /// Symbol of the market, as configured.
    pub symbol: String,
    /// Amount in base units.
    pub amount: u64,
}

/// A decoded NAVI request.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum NaviAction {
    /// Deposit coins as collateral.
    Supply(LendingRequest),
    /// Take deposited coins back.
    Withdraw(LendingRequest),
    /// Borrow against the collateral.
    Borrow(LendingRequest),
    /// Pay back borrowed coins.
    Repay(LendingRequest),
    /// Claim every configured reward.
    Claim,
}

impl NaviAction {
    fn name(&self) -> &'static str {
        match self {
            NaviAction::Supply(_) => "supply",
            NaviAction::Withdraw(_) => "withdraw",
            NaviAction::Borrow(_) => "borrow",
            NaviAction::Repay(_) => "repay",
            NaviAction::Claim => "claim",
        }
    }
}

impl TryFrom<NaviParameters> for NaviAction {
    type Error = ToolError;

    fn try_from(params: NaviParameters) -> Result<Self, Self::Error> {
        let constructor: fn(LendingRequest) -> NaviAction =
            match params.action.as_str() {
                "claim" => return Ok(NaviAction::Claim),
                "supply" => NaviAction::Supply,
                "withdraw" => NaviAction::Withdraw,
                "borrow" => NaviAction::Borrow,
                "repay" => NaviAction::Repay,
                other => {
                    return Err(ToolError::unknown_action()
                        .with_reason(format!("unknown NAVI action `{other}`")));
                }
            };
        let Some(symbol) = params.coin_type.filter(|s| !s.trim().is_empty())
        else {
            return Err(precondition(format!(
                "Coin type is required for {} action",
                params.action
            )));
        };
        let Some(amount) = params.amount else {
            return Err(precondition(format!(
                "Amount is required for {} action",
                params.action
            )));
        };
        Ok(constructor(LendingRequest {
            symbol,
            amount: parse_amount("amount", &amount)?,
        }))
    }
}

fn market<'a>(
    config: &'a NaviConfig,
    symbol: &str,
) -> Result<&'a NaviMarket, ToolError> {
    config
        .markets
        .iter()
        .find(|(name, _)| name.eq_ignore_ascii_case(symbol))
        .map(|(_, market)| market)
        .ok_or_else(|| {
            precondition(format!("NAVI has no configured market for `{symbol}`"))
        })
}

/// Builds the transaction of an action. `owned` are the sender's coin
/// objects of the market, used when the coin is not SUI.
fn build_ptb(
    config: &NaviConfig,
    action: &NaviAction,
    owned: &[String],
) -> Result<Ptb, ToolError> {
    let (function, req, takes_coin) = match action {
        NaviAction::Supply(req) => ("entry_deposit", req, true),
        NaviAction::Repay(req) => ("entry_repay", req, true),
        NaviAction::Withdraw(req) => ("entry_withdraw", req, false),
        NaviAction::Borrow(req) => ("entry_borrow", req, false),
        NaviAction::Claim => return claim_ptb(config),
    };
    let market = market(config, &req.symbol)?;

    let mut ptb = Ptb::new();
    let mut args = vec![object(CLOCK)];
    // Deposits are the only calls that skip the oracle.
    if !matches!(action, NaviAction::Supply(_)) {
        args.push(object(&config.oracle));
    }
    args.push(object(&config.storage));
    args.push(object(&market.pool));
    args.push(format!("{}u8", market.asset_id));
    if takes_coin {
        ptb = take_coin(ptb, &market.coin_type, owned, req.amount, "coin");
        args.push("coin".to_owned());
    }
    args.push(format!("{}u64", req.amount));
    args.push(object(&config.incentive_v2));
    args.push(object(&config.incentive_v3));

    Ok(ptb.move_call(
        &format!("{}::incentive_v3::{function}", config.package),
        &[market.coin_type.as_str()],
        &args,
    ))
}

fn claim_ptb(config: &NaviConfig) -> Result<Ptb, ToolError> {
    if config.rewards.is_empty() {
        return Err(precondition("no NAVI reward funds are configured"));
    }
    let target = format!("{}::incentive_v3::claim_reward_entry", config.package);
    let ptb = config.rewards.iter().fold(Ptb::new(), |ptb, reward| {
        let assets: Vec<String> = reward
            .asset_coin_types
            .iter()
            .map(|coin_type| format!("\"{coin_type}\""))
            .collect();
        let rules: Vec<String> = reward.rule_ids.iter().map(|id| object(id)).collect();
        ptb.move_call(
            &target,
            &[reward.coin_type.as_str()],
            &[
                object(CLOCK),
                object(&config.incentive_v3),
                object(&config.storage),
                object(&reward.fund),
                format!("[{}]", assets.join(", ")),
                format!("[{}]", rules.join(", ")),
            ],
        )
    });
    Ok(ptb)
}

/// Lends and borrows through the NAVI protocol.
pub struct NaviTool {
    chain: Chain,
    config: Option<NaviConfig>,
    parameter_schema: Value,
}

impl NaviTool {
    /// Creates a new NAVI tool. Without a configuration every call fails.
    #[inline]
    pub fn new(chain: Chain, config: Option<NaviConfig>) -> Self {
        Self {
            chain,
            config,
            parameter_schema: schema_for!(NaviParameters).to_value(),
        }
    }
}

impl Tool for NaviTool {
    type Input = NaviParameters;

    fn key(&self) -> &str {
        "navi"
    }

    fn display_name(&self) -> &str {
        "NAVI"
    }

    fn description(&self) -> &str {
        "Interact with NAVI protocol to supply tokens, withdraw tokens, borrow, repay or claim rewards"
    }

    fn parameter_schema(&self) -> &Value {
        &self.parameter_schema
    }

    #[allow(clippy::manual_async_fn)]
    fn execute(
        &self,
        input: NaviParameters,
    ) -> impl Future<Output = ToolResult> + Send + 'static {
        let chain = self.chain.clone();
        let config = self.config.clone();
        async move {
            let action = NaviAction::try_from(input)?;
            let Some(config) = config else {
                return Err(precondition("NAVI protocol is not configured"));
            };

            let mut owned = vec![];
            if let NaviAction::Supply(req) | NaviAction::Repay(req) = &action {
                let market = market(&config, &req.symbol)?;
                owned = payment_coins(&chain, &market.coin_type, req.amount).await?;
            }

            let ptb = build_ptb(&config, &action, &owned)?;
            debug!("navi {}: {} ptb args", action.name(), ptb.args().len());
            let resp = chain.signer().execute(&ptb).await?;
            Ok(transaction_payload(&resp, action.name()))
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use zoe_core::tool::ErrorKind;

    use super::*;
    use crate::chain::tests::offline_chain;
    use crate::config::NaviReward;

    fn config() -> NaviConfig {
        let mut markets = BTreeMap::new();
        markets.insert(
            "Sui".to_owned(),
            NaviMarket {
                coin_type: "0x2::sui::SUI".to_owned(),
                pool: "0x5001".to_owned(),
                asset_id: 0,
            },
        );
        markets.insert(
            "USDC".to_owned(),
            NaviMarket {
                coin_type: "0xdba3::usdc::USDC".to_owned(),
                pool: "0x5002".to_owned(),
                asset_id: 10,
            },
        );
        NaviConfig {
            package: "0xpkg".to_owned(),
            storage: "0x57".to_owned(),
            oracle: "0x0c".to_owned(),
            incentive_v2: "0x12".to_owned(),
            incentive_v3: "0x13".to_owned(),
            markets,
            rewards: vec![],
        }
    }

    fn params(action: &str, coin: Option<&str>, amount: Option<&str>) -> NaviParameters {
        NaviParameters {
            action: action.to_owned(),
            coin_type: coin.map(str::to_owned),
            amount: amount.map(str::to_owned),
        }
    }

    #[test]
    fn test_decode_action() {
        let action = NaviAction::try_from(params("supply", Some("Sui"), Some("100"))).unwrap();
        assert_eq!(
            action,
            NaviAction::Supply(LendingRequest {
                symbol: "Sui".to_owned(),
                amount: 100,
            })
        );
        assert_eq!(
            NaviAction::try_from(params("claim", None, None)).unwrap(),
            NaviAction::Claim
        );

        let err = NaviAction::try_from(params("borrow", None, Some("1"))).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Precondition);
        assert!(err.reason().contains("Coin type is required"));

        let err = NaviAction::try_from(params("repay", Some("USDC"), None)).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Precondition);

        let err = NaviAction::try_from(params("liquidate", None, None)).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::UnknownAction);
    }

    #[test]
    fn test_supply_sui_splits_gas() {
        let action = NaviAction::Supply(LendingRequest {
            symbol: "sui".to_owned(),
            amount: 100,
        });
        let ptb = build_ptb(&config(), &action, &[]).unwrap();
        assert_eq!(
            ptb.args(),
            [
                "--split-coins",
                "gas",
                "[100]",
                "--assign",
                "coin",
                "--move-call",
                "0xpkg::incentive_v3::entry_deposit",
                "<0x2::sui::SUI>",
                "@0x6",
                "@0x57",
                "@0x5001",
                "0u8",
                "coin",
                "100u64",
                "@0x12",
                "@0x13",
            ]
        );
    }

    #[test]
    fn test_repay_merges_owned_coins() {
        let action = NaviAction::Repay(LendingRequest {
            symbol: "USDC".to_owned(),
            amount: 7,
        });
        let owned = ["0xc1".to_owned(), "0xc2".to_owned()];
        let ptb = build_ptb(&config(), &action, &owned).unwrap();
        let args = ptb.args();
        assert_eq!(&args[..3], ["--merge-coins", "@0xc1", "[@0xc2]"]);
        assert!(args.contains(&"0xpkg::incentive_v3::entry_repay".to_owned()));
        assert!(args.contains(&"@0x0c".to_owned()));
    }

    #[test]
    fn test_withdraw_and_unknown_market() {
        let action = NaviAction::Withdraw(LendingRequest {
            symbol: "USDC".to_owned(),
            amount: 7,
        });
        let ptb = build_ptb(&config(), &action, &[]).unwrap();
        assert_eq!(ptb.args()[0], "--move-call");
        assert_eq!(ptb.args()[1], "0xpkg::incentive_v3::entry_withdraw");

        let action = NaviAction::Borrow(LendingRequest {
            symbol: "WBTC".to_owned(),
            amount: 7,
        });
        let err = build_ptb(&config(), &action, &[]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Precondition);
    }

    #[test]
    fn test_claim_rewards() {
        let err = build_ptb(&config(), &NaviAction::Claim, &[]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Precondition);

        let mut config = config();
        config.rewards.push(NaviReward {
            coin_type: "0x2::sui::SUI".to_owned(),
            fund: "0xf0".to_owned(),
            asset_coin_types: vec!["0x2::sui::SUI".to_owned()],
            rule_ids: vec!["0xr1".to_owned()],
        });
        let ptb = build_ptb(&config, &NaviAction::Claim, &[]).unwrap();
        assert_eq!(
            &ptb.args()[7..],
            ["[\"0x2::sui::SUI\"]", "[@0xr1]"]
        );
    }

    #[tokio::test]
    async fn test_unconfigured_protocol() {
        let tool = NaviTool::new(offline_chain(), None);
        let err = tool
            .execute(params("claim", None, None))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Precondition);
        assert!(err.reason().contains("not configured"));
    }

    #[test]
    fn test_schema_lists_symbols() {
        let schema = schema_for!(NaviParameters).to_value();
        let coin = serde_json::to_string(&schema["properties"]["coinType"]).unwrap();
        assert!(coin.contains("vSui") && coin.contains("NAVX"));
        assert_eq!(schema["required"], serde_json::json!(["action"]));
    }
}
