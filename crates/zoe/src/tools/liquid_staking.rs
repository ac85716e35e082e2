use schemars::{JsonSchema, schema_for};
use serde::Deserialize;
use serde_json::Value;
use zoe_core::tool::{Error as ToolError, Tool, ToolResult};

use super::{owned_coins, precondition, split_from, transaction_payload};
use crate::chain::{Chain, Ptb, object};
use crate::config::SpringSuiConfig;

const SUI_SYSTEM_STATE: &str = "0x5";

#[allow(dead_code)]
#[derive(JsonSchema)]
#[schemars(inline, rename_all = "camelCase")]
enum StakingActionName {
    Mint,
    Redeem,
}

#[derive(Deserialize, JsonSchema)]
pub struct LiquidStakingParameters {
    #[schemars(
        with = "StakingActionName",
        description = "mint to stake SUI for sSUI, redeem to turn sSUI back into SUI"
    )]
    action: String,
    #[schemars(description = "Amount in MIST (1 SUI = 1,000,000,000 MIST)")]
    amount: u64,
}

/// A decoded liquid staking request, amounts in MIST.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StakingAction {
    /// Stake SUI and receive sSUI.
    Mint(u64),
    /// Burn sSUI and receive SUI.
    Redeem(u64),
}

impl TryFrom<LiquidStakingParameters> for StakingAction {
    type Error = ToolError;

    fn try_from(params: LiquidStakingParameters) -> Result<Self, Self::Error> {
        if params.amount == 0 {
            return Err(precondition("`amount` must be greater than zero"));
        }
        match params.action.as_str() {
            "mint" => Ok(StakingAction::Mint(params.amount)),
            "redeem" => Ok(StakingAction::Redeem(params.amount)),
            other => Err(ToolError::unknown_action()
                .with_reason(format!("unknown staking action `{other}`"))),
        }
    }
}

impl StakingAction {
    fn name(self) -> &'static str {
        match self {
            StakingAction::Mint(_) => "mint",
            StakingAction::Redeem(_) => "redeem",
        }
    }
}

/// Builds the transaction. `lst_coins` are the sender's sSUI coins and are
/// only read when redeeming.
fn build_ptb(
    package: &str,
    config: &SpringSuiConfig,
    action: StakingAction,
    lst_coins: &[String],
    sender: &str,
) -> Ptb {
    let type_args = [config.coin_type.as_str()];
    let ptb = match action {
        StakingAction::Mint(amount) => Ptb::new()
            .split_coins("gas", &[amount])
            .assign("sui")
            .move_call(
                &format!("{package}::liquid_staking::mint"),
                &type_args,
                &[
                    object(&config.lst_info),
                    object(SUI_SYSTEM_STATE),
                    "sui".to_owned(),
                ],
            ),
        StakingAction::Redeem(amount) => split_from(Ptb::new(), lst_coins, amount, "lst")
            .move_call(
                &format!("{package}::liquid_staking::redeem"),
                &type_args,
                &[
                    object(&config.lst_info),
                    "lst".to_owned(),
                    object(SUI_SYSTEM_STATE),
                ],
            ),
    };
    ptb.assign("out").transfer_objects(&["out"], sender)
}

/// Mints and redeems sSUI through SpringSui.
pub struct LiquidStakingTool {
    chain: Chain,
    config: SpringSuiConfig,
    parameter_schema: Value,
}

impl LiquidStakingTool {
    /// Creates a new liquid staking tool.
    #[inline]
    pub fn new(chain: Chain, config: SpringSuiConfig) -> Self {
        Self {
            chain,
            config,
            parameter_schema: schema_for!(LiquidStakingParameters).to_value(),
        }
    }
}

impl Tool for LiquidStakingTool {
    type Input = LiquidStakingParameters;

    fn key(&self) -> &str {
        "liquidStaking"
    }

    fn display_name(&self) -> &str {
        "Liquid staking"
    }

    fn description(&self) -> &str {
        "Mint or redeem sSUI tokens using Spring protocol"
    }

    fn parameter_schema(&self) -> &Value {
        &self.parameter_schema
    }

    #[allow(clippy::manual_async_fn)]
    fn execute(
        &self,
        input: LiquidStakingParameters,
    ) -> impl Future<Output = ToolResult> + Send + 'static {
        let chain = self.chain.clone();
        let config = self.config.clone();
        async move {
            let action = StakingAction::try_from(input)?;
            let Some(package) = config.package.as_deref() else {
                return Err(precondition("SpringSui package is not configured"));
            };

            let lst_coins = match action {
                StakingAction::Redeem(amount) => {
                    owned_coins(&chain, &config.coin_type, amount).await?
                }
                StakingAction::Mint(_) => vec![],
            };
            let ptb = build_ptb(package, &config, action, &lst_coins, chain.address());
            let resp = chain.signer().execute(&ptb).await?;
            Ok(transaction_payload(&resp, action.name()))
        }
    }
}

#[cfg(test)]
mod tests {
    use zoe_core::tool::ErrorKind;

    use super::*;
    use crate::chain::tests::offline_chain;

    fn params(action: &str, amount: u64) -> LiquidStakingParameters {
        LiquidStakingParameters {
            action: action.to_owned(),
            amount,
        }
    }

    #[test]
    fn test_decode_action() {
        assert_eq!(
            StakingAction::try_from(params("mint", 5)).unwrap(),
            StakingAction::Mint(5)
        );
        let err = StakingAction::try_from(params("redeem", 0)).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Precondition);
        let err = StakingAction::try_from(params("stake", 5)).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::UnknownAction);
    }

    #[test]
    fn test_mint_ptb() {
        let config = SpringSuiConfig::default();
        let ptb = build_ptb("0xpkg", &config, StakingAction::Mint(10), &[], "0xa11ce");
        let args = ptb.args();
        assert_eq!(&args[..5], ["--split-coins", "gas", "[10]", "--assign", "sui"]);
        assert_eq!(args[6], "0xpkg::liquid_staking::mint");
        assert_eq!(args[7], format!("<{}>", config.coin_type));
        assert_eq!(args[8], format!("@{}", config.lst_info));
        assert_eq!(&args[args.len() - 3..], ["--transfer-objects", "[out]", "@0xa11ce"]);
    }

    #[test]
    fn test_redeem_ptb() {
        let config = SpringSuiConfig::default();
        let coins = ["0xs1".to_owned(), "0xs2".to_owned()];
        let ptb = build_ptb("0xpkg", &config, StakingAction::Redeem(3), &coins, "0xa11ce");
        let args = ptb.args();
        assert_eq!(&args[..3], ["--merge-coins", "@0xs1", "[@0xs2]"]);
        assert!(args.contains(&"0xpkg::liquid_staking::redeem".to_owned()));
    }

    #[tokio::test]
    async fn test_unconfigured_package() {
        let tool = LiquidStakingTool::new(offline_chain(), SpringSuiConfig::default());
        let err = tool.execute(params("mint", 10)).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Precondition);
        assert!(err.reason().contains("not configured"));
    }
}
