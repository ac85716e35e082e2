//! The wallet tools offered to the model.

mod bluefin;
mod cetus;
mod clmm;
mod get_all_balances;
mod get_prices;
mod liquid_staking;
mod list_coins;
mod navi;
mod query_blockchain;
mod send_sui;
mod swap;

pub use bluefin::{BluefinTool, SpotSwap};
pub use cetus::{CetusAction, CetusTool};
pub use get_all_balances::GetAllBalancesTool;
pub use get_prices::{GetPricesTool, PriceQuery};
pub use liquid_staking::{LiquidStakingTool, StakingAction};
pub use list_coins::ListCoinsTool;
pub use navi::{NaviAction, NaviTool};
pub use query_blockchain::{ChainQuery, QueryBlockchainTool};
pub use send_sui::SendSuiTool;
pub use swap::{SwapAction, SwapTool};

use serde_json::{Value, json};
use zoe_core::tool::{Error as ToolError, Registry, RegistryError};

use crate::chain::{Chain, Ptb, TransactionResponse, object};
use crate::coins::{self, AmountError};
use crate::config::Config;

/// Builds the registry of every tool, in the order they are presented.
pub fn registry(chain: &Chain, config: &Config) -> Result<Registry, RegistryError> {
    Registry::builder()
        .with_tool(NaviTool::new(chain.clone(), config.navi.clone()))
        .with_tool(SendSuiTool::new(chain.clone()))
        .with_tool(LiquidStakingTool::new(
            chain.clone(),
            config.spring_sui.clone(),
        ))
        .with_tool(QueryBlockchainTool::new(chain.clone()))
        .with_tool(ListCoinsTool::new())
        .with_tool(SwapTool::new(chain.clone()))
        .with_tool(GetAllBalancesTool::new(chain.clone()))
        .with_tool(GetPricesTool::new(chain.clone()))
        .with_tool(CetusTool::new(chain.clone(), config.cetus.clone()))
        .with_tool(BluefinTool::new(chain.clone(), config.bluefin.clone()))
        .build()
}

#[inline]
fn precondition(reason: impl Into<String>) -> ToolError {
    ToolError::precondition().with_reason(reason)
}

/// The wallet cannot cover a transaction.
fn insufficient_funds(reason: impl Into<String>) -> ToolError {
    ToolError::external_service().with_reason(reason)
}

fn check_address(field: &str, address: &str) -> Result<(), ToolError> {
    if coins::is_valid_address(address) {
        Ok(())
    } else {
        Err(precondition(format!(
            "`{field}` is not a valid Sui address: {address}"
        )))
    }
}

fn check_slippage(slippage: f64) -> Result<f64, ToolError> {
    if slippage > 0.0 && slippage <= 1.0 {
        Ok(slippage)
    } else {
        Err(precondition(format!(
            "slippage must be between 0 and 1, got {slippage}"
        )))
    }
}

fn is_sui(coin_type: &str) -> bool {
    coins::normalize_coin_type(coin_type).as_deref() == Some(coins::SUI_COIN_TYPE)
}

fn parse_amount(field: &str, amount: &str) -> Result<u64, ToolError> {
    coins::parse_base_amount(amount).map_err(|err| match err {
        AmountError::Empty => precondition(format!("`{field}` is empty")),
        err => precondition(format!("`{field}`: {err}")),
    })
}

/// Collects the sender's coins of a type holding at least `amount`.
async fn owned_coins(
    chain: &Chain,
    coin_type: &str,
    amount: u64,
) -> Result<Vec<String>, ToolError> {
    let coins = chain
        .rpc()
        .get_all_coins(chain.address(), coin_type)
        .await?;
    let total: u128 = coins
        .iter()
        .filter_map(|coin| coin.balance.parse::<u128>().ok())
        .sum();
    if total < u128::from(amount) {
        return Err(insufficient_funds(format!(
            "insufficient {coin_type} balance: {total} available, {amount} requested"
        )));
    }
    Ok(coins.into_iter().map(|coin| coin.coin_object_id).collect())
}

/// The sender's coins to pay `amount` of a type from. SUI is paid from the
/// gas coin and needs none.
async fn payment_coins(
    chain: &Chain,
    coin_type: &str,
    amount: u64,
) -> Result<Vec<String>, ToolError> {
    if is_sui(coin_type) {
        Ok(vec![])
    } else {
        owned_coins(chain, coin_type, amount).await
    }
}

/// Takes `amount` of a coin type as the result named `name`, from the gas
/// coin for SUI and from `owned` otherwise.
fn take_coin(ptb: Ptb, coin_type: &str, owned: &[String], amount: u64, name: &str) -> Ptb {
    if is_sui(coin_type) {
        ptb.split_coins("gas", &[amount]).assign(name)
    } else {
        split_from(ptb, owned, amount, name)
    }
}

/// Merges `coins` and splits `amount` off them as the result named `name`.
fn split_from(ptb: Ptb, coins: &[String], amount: u64, name: &str) -> Ptb {
    let coins: Vec<String> = coins.iter().map(|id| object(id)).collect();
    let Some((primary, rest)) = coins.split_first() else {
        return ptb;
    };
    let ptb = if rest.is_empty() {
        ptb
    } else {
        ptb.merge_coins(primary, rest)
    };
    ptb.split_coins(primary, &[amount]).assign(name)
}

/// The payload reported for a successful transaction.
fn transaction_payload(resp: &TransactionResponse, action: &str) -> Value {
    json!({
        "success": true,
        "transactionId": resp.digest,
        "action": action,
    })
}

#[cfg(test)]
mod tests {
    use zoe_core::tool::ErrorKind;

    use super::*;
    use crate::chain::tests::{offline_chain, stub_node_chain};

    #[test]
    fn test_registry_order() {
        let registry = registry(&offline_chain(), &Config::default()).unwrap();
        assert_eq!(
            registry.list(),
            [
                "navi",
                "sendSui",
                "liquidStaking",
                "queryBlockchain",
                "listCoins",
                "swap",
                "getAllBalances",
                "getPrices",
                "cetus",
                "bluefin",
            ]
        );
        for key in registry.list() {
            let schema = registry.get(key).unwrap().parameter_schema();
            assert_eq!(schema["type"], "object", "{key}");
        }
    }

    #[test]
    fn test_resolve_selection() {
        let registry = registry(&offline_chain(), &Config::default()).unwrap();
        let selected = registry.resolve(["getAllBalances", "bogus", "sendSui"]);
        assert_eq!(selected.keys(), ["sendSui", "getAllBalances"]);
    }

    #[test]
    fn test_split_from_many_coins() {
        let ptb = split_from(
            Ptb::new(),
            &["0x1".to_owned(), "0x2".to_owned()],
            5,
            "coin",
        );
        assert_eq!(
            ptb.args(),
            [
                "--merge-coins",
                "@0x1",
                "[@0x2]",
                "--split-coins",
                "@0x1",
                "[5]",
                "--assign",
                "coin",
            ]
        );

        let ptb = split_from(Ptb::new(), &["0x1".to_owned()], 5, "coin");
        assert_eq!(ptb.args()[0], "--split-coins");
    }

    #[test]
    fn test_take_coin() {
        let ptb = take_coin(Ptb::new(), "0x0000000000000000000000000000000000000000000000000000000000000002::sui::SUI", &[], 9, "coin");
        assert_eq!(ptb.args(), ["--split-coins", "gas", "[9]", "--assign", "coin"]);

        let ptb = take_coin(Ptb::new(), "0xdba3::usdc::USDC", &["0xc1".to_owned()], 9, "coin");
        assert_eq!(ptb.args(), ["--split-coins", "@0xc1", "[9]", "--assign", "coin"]);

        assert!(check_slippage(0.05).is_ok());
        assert_eq!(check_slippage(0.0).unwrap_err().kind(), ErrorKind::Precondition);
        assert_eq!(check_slippage(1.5).unwrap_err().kind(), ErrorKind::Precondition);
    }

    #[test]
    fn test_parse_amount() {
        assert_eq!(parse_amount("amount", "10").unwrap(), 10);
        let err = parse_amount("amount", "0").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Precondition);
        assert!(err.reason().contains("greater than zero"));
    }

    #[tokio::test]
    async fn test_owned_coins_short_of_amount() {
        let usdc = "0xdba3::usdc::USDC";
        let chain = stub_node_chain(json!({
            "data": [
                { "coinType": usdc, "coinObjectId": "0xc1", "balance": "300" },
                { "coinType": usdc, "coinObjectId": "0xc2", "balance": "200" }
            ],
            "nextCursor": null,
            "hasNextPage": false
        }))
        .await;

        let coins = owned_coins(&chain, usdc, 500).await.unwrap();
        assert_eq!(coins, ["0xc1", "0xc2"]);

        let err = owned_coins(&chain, usdc, 501).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ExternalService);
        assert!(err.reason().contains("500 available"), "{}", err.reason());
    }
}
