use schemars::{JsonSchema, schema_for};
use serde::Deserialize;
use serde_json::{Value, json};
use zoe_core::tool::{Error as ToolError, Tool, ToolResult};

use super::clmm::{self, PoolState, tick_arg};
use super::{
    check_address, check_slippage, insufficient_funds, parse_amount,
    payment_coins, precondition, take_coin, transaction_payload,
};
use crate::chain::{Chain, ObjectData, Ptb, object};
use crate::coins::{self, SUPPORTED_COINS};
use crate::config::CetusConfig;

const CLOCK: &str = "0x6";

#[allow(dead_code)]
#[derive(JsonSchema)]
#[schemars(inline, rename_all = "camelCase")]
enum CetusActionName {
    GetPool,
    GetPositions,
    AddLiquidity,
    RemoveLiquidity,
    Swap,
    CreatePool,
}

#[derive(Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct CetusParameters {
    #[schemars(with = "CetusActionName", description = "Action to perform on Cetus")]
    action: String,
    #[schemars(description = "Pool ID for the operation")]
    pool_id: Option<String>,
    #[schemars(description = "Position ID for removing liquidity")]
    position_id: Option<String>,
    #[schemars(
        description = "Amount in base units for a swap or liquidity operation. For removeLiquidity this is the liquidity to remove"
    )]
    amount: Option<String>,
    #[schemars(description = "Slippage tolerance (e.g. 0.01 for 1%)")]
    slippage: Option<f64>,
    #[schemars(description = "Address to query positions for")]
    address: Option<String>,
    #[schemars(description = "First coin type for pool creation")]
    coin_type_a: Option<String>,
    #[schemars(description = "Second coin type for pool creation")]
    coin_type_b: Option<String>,
    #[schemars(description = "Tick spacing for pool creation")]
    tick_spacing: Option<u32>,
    #[schemars(description = "Initial price of A in B for pool creation")]
    initial_price: Option<String>,
}

/// A trade against one pool.
#[derive(Clone, Debug, PartialEq)]
pub struct PoolTrade {
    /// The pool object id.
    pub pool_id: String,
    /// Amount of coin A in base units.
    pub amount: u64,
    /// Accepted slippage as a fraction.
    pub slippage: f64,
}

/// The parameters of a new pool.
#[derive(Clone, Debug, PartialEq)]
pub struct NewPool {
    /// Type of the first coin.
    pub coin_type_a: String,
    /// Type of the second coin.
    pub coin_type_b: String,
    /// Distance between initializable ticks.
    pub tick_spacing: u32,
    /// Starting price of A in B.
    pub initial_price: f64,
}

/// A decoded Cetus request.
#[derive(Clone, Debug, PartialEq)]
pub enum CetusAction {
    /// Read a pool.
    GetPool(String),
    /// List the positions an address holds, optionally in one pool.
    GetPositions {
        /// The position owner.
        owner: String,
        /// Only positions of this pool.
        pool_id: Option<String>,
    },
    /// Open a position around the current price, fixing the A side.
    AddLiquidity(PoolTrade),
    /// Take liquidity out of a position.
    RemoveLiquidity {
        /// The position object id.
        position_id: String,
        /// Liquidity to remove.
        liquidity: u64,
        /// Accepted slippage as a fraction.
        slippage: f64,
    },
    /// Swap coin A for coin B.
    Swap(PoolTrade),
    /// Create an empty pool.
    CreatePool(NewPool),
}

impl CetusAction {
    fn name(&self) -> &'static str {
        match self {
            CetusAction::GetPool(_) => "getPool",
            CetusAction::GetPositions { .. } => "getPositions",
            CetusAction::AddLiquidity(_) => "addLiquidity",
            CetusAction::RemoveLiquidity { .. } => "removeLiquidity",
            CetusAction::Swap(_) => "swap",
            CetusAction::CreatePool(_) => "createPool",
        }
    }
}

fn given(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

impl TryFrom<CetusParameters> for CetusAction {
    type Error = ToolError;

    fn try_from(params: CetusParameters) -> Result<Self, Self::Error> {
        match params.action.as_str() {
            "getPool" => {
                let pool_id = given(params.pool_id)
                    .ok_or_else(|| precondition("Pool ID required"))?;
                Ok(CetusAction::GetPool(pool_id))
            }
            "getPositions" => {
                let owner = given(params.address)
                    .ok_or_else(|| precondition("Address required"))?;
                check_address("address", &owner)?;
                Ok(CetusAction::GetPositions {
                    owner,
                    pool_id: given(params.pool_id),
                })
            }
            "addLiquidity" | "swap" => {
                let (Some(pool_id), Some(amount), Some(slippage)) =
                    (given(params.pool_id), given(params.amount), params.slippage)
                else {
                    return Err(precondition("Pool ID, amount and slippage required"));
                };
                let trade = PoolTrade {
                    pool_id,
                    amount: parse_amount("amount", &amount)?,
                    slippage: check_slippage(slippage)?,
                };
                if params.action == "swap" {
                    Ok(CetusAction::Swap(trade))
                } else {
                    Ok(CetusAction::AddLiquidity(trade))
                }
            }
            "removeLiquidity" => {
                let (Some(position_id), Some(amount), Some(slippage)) = (
                    given(params.position_id),
                    given(params.amount),
                    params.slippage,
                ) else {
                    return Err(precondition(
                        "Position ID, amount and slippage required",
                    ));
                };
                Ok(CetusAction::RemoveLiquidity {
                    position_id,
                    liquidity: parse_amount("amount", &amount)?,
                    slippage: check_slippage(slippage)?,
                })
            }
            "createPool" => {
                let (Some(coin_type_a), Some(coin_type_b), Some(tick_spacing), Some(price)) = (
                    given(params.coin_type_a),
                    given(params.coin_type_b),
                    params.tick_spacing.filter(|spacing| *spacing > 0),
                    given(params.initial_price),
                ) else {
                    return Err(precondition(
                        "Coin types, tick spacing and initial price required for pool creation",
                    ));
                };
                for coin_type in [&coin_type_a, &coin_type_b] {
                    if coins::normalize_coin_type(coin_type).is_none() {
                        return Err(precondition(format!(
                            "`{coin_type}` is not a coin type"
                        )));
                    }
                }
                if coins::normalize_coin_type(&coin_type_a)
                    == coins::normalize_coin_type(&coin_type_b)
                {
                    return Err(precondition("a pool needs two different coins"));
                }
                let initial_price = price
                    .trim()
                    .parse::<f64>()
                    .ok()
                    .filter(|p| clmm::sqrt_price_x64_of(*p).is_some())
                    .ok_or_else(|| {
                        precondition(format!("`initialPrice` is not a valid price: {price}"))
                    })?;
                Ok(CetusAction::CreatePool(NewPool {
                    coin_type_a,
                    coin_type_b,
                    tick_spacing,
                    initial_price,
                }))
            }
            other => Err(ToolError::unknown_action()
                .with_reason(format!("unknown Cetus action `{other}`"))),
        }
    }
}

/// A liquidity position NFT.
#[derive(Clone, Debug, PartialEq, Eq)]
struct Position {
    id: String,
    pool: String,
    liquidity: u128,
    tick_lower: i32,
    tick_upper: i32,
}

impl Position {
    fn from_object(object: &ObjectData) -> Result<Self, ToolError> {
        let invalid = || {
            ToolError::external_service().with_reason(format!(
                "object {} is not a Cetus position",
                object.object_id
            ))
        };
        let pool = object
            .field("pool")
            .and_then(Value::as_str)
            .ok_or_else(invalid)?;
        let liquidity = object
            .field("liquidity")
            .and_then(clmm::u128_value)
            .ok_or_else(invalid)?;
        let tick_lower = object
            .field("tick_lower_index")
            .and_then(clmm::tick_value)
            .ok_or_else(invalid)?;
        let tick_upper = object
            .field("tick_upper_index")
            .and_then(clmm::tick_value)
            .ok_or_else(invalid)?;
        Ok(Self {
            id: object.object_id.clone(),
            pool: pool.to_owned(),
            liquidity,
            tick_lower,
            tick_upper,
        })
    }

    fn payload(&self) -> Value {
        json!({
            "positionId": self.id,
            "pool": self.pool,
            "liquidity": self.liquidity.to_string(),
            "tickLower": self.tick_lower,
            "tickUpper": self.tick_upper,
        })
    }
}

fn pool_payload(pool: &PoolState, object: &ObjectData) -> Value {
    json!({
        "poolId": pool.id,
        "coinTypeA": pool.coin_type_a,
        "coinTypeB": pool.coin_type_b,
        "currentSqrtPrice": pool.sqrt_price_x64.to_string(),
        "currentTick": pool.current_tick(),
        "price": pool.price(),
        "tickSpacing": pool.tick_spacing,
        "fields": object.content.as_ref().and_then(|c| c.get("fields")),
    })
}

fn integrate(config: &CetusConfig, function: &str) -> String {
    format!("{}::{function}", config.integrate_package)
}

fn swap_ptb(
    config: &CetusConfig,
    pool: &PoolState,
    trade: &PoolTrade,
    owned_a: &[String],
) -> Ptb {
    let estimate = clmm::estimate_out(pool, true, trade.amount);
    let amount_limit = clmm::amount_limit(estimate, trade.slippage, true);
    take_coin(Ptb::new(), &pool.coin_type_a, owned_a, trade.amount, "coin_a").move_call(
        &integrate(config, "pool_script::swap_a2b"),
        &[pool.coin_type_a.as_str(), pool.coin_type_b.as_str()],
        &[
            object(&config.global_config),
            object(&pool.id),
            "[coin_a]".to_owned(),
            "true".to_owned(),
            format!("{}u64", trade.amount),
            format!("{amount_limit}u64"),
            format!("{}u128", clmm::sqrt_price_limit(true)),
            object(CLOCK),
        ],
    )
}

/// The tick range of a new position around the current price, and the most
/// of coin B it may take next to `trade.amount` of A.
fn liquidity_plan(pool: &PoolState, trade: &PoolTrade) -> Result<(i32, i32, u64), ToolError> {
    let spacing = pool.tick_spacing.ok_or_else(|| {
        ToolError::external_service()
            .with_reason(format!("pool {} has no tick spacing", pool.id))
    })?;
    let (lower, upper) = clmm::tick_range(pool.current_tick(), spacing);
    let amount_b = clmm::amount_b_for_a(trade.amount, pool.sqrt_price(), lower, upper);
    Ok((lower, upper, clmm::amount_limit(amount_b, trade.slippage, false)))
}

fn add_liquidity_ptb(
    config: &CetusConfig,
    pool: &PoolState,
    trade: &PoolTrade,
    owned_a: &[String],
    owned_b: &[String],
) -> Result<Ptb, ToolError> {
    let (lower, upper, max_b) = liquidity_plan(pool, trade)?;
    let ptb = take_coin(Ptb::new(), &pool.coin_type_a, owned_a, trade.amount, "coin_a");
    let ptb = take_coin(ptb, &pool.coin_type_b, owned_b, max_b, "coin_b");
    Ok(ptb.move_call(
        &integrate(config, "pool_script_v2::open_position_with_liquidity_by_fix_coin"),
        &[pool.coin_type_a.as_str(), pool.coin_type_b.as_str()],
        &[
            object(&config.global_config),
            object(&pool.id),
            tick_arg(lower),
            tick_arg(upper),
            "coin_a".to_owned(),
            "coin_b".to_owned(),
            format!("{}u64", trade.amount),
            format!("{max_b}u64"),
            "true".to_owned(),
            object(CLOCK),
        ],
    ))
}

fn remove_liquidity_ptb(
    config: &CetusConfig,
    pool: &PoolState,
    position: &Position,
    liquidity: u64,
    slippage: f64,
) -> Ptb {
    let (amount_a, amount_b) = clmm::amounts_for_liquidity(
        liquidity.into(),
        pool.sqrt_price(),
        position.tick_lower,
        position.tick_upper,
    );
    Ptb::new().move_call(
        &integrate(config, "pool_script::remove_liquidity"),
        &[pool.coin_type_a.as_str(), pool.coin_type_b.as_str()],
        &[
            object(&config.global_config),
            object(&pool.id),
            object(&position.id),
            format!("{liquidity}u128"),
            format!("{}u64", clmm::amount_limit(amount_a, slippage, true)),
            format!("{}u64", clmm::amount_limit(amount_b, slippage, true)),
            object(CLOCK),
        ],
    )
}

fn create_pool_ptb(config: &CetusConfig, new_pool: &NewPool) -> Result<Ptb, ToolError> {
    let sqrt_price = clmm::sqrt_price_x64_of(new_pool.initial_price).ok_or_else(|| {
        precondition(format!("no pool can start at price {}", new_pool.initial_price))
    })?;
    Ok(Ptb::new().move_call(
        &integrate(config, "pool_script::create_pool"),
        &[new_pool.coin_type_a.as_str(), new_pool.coin_type_b.as_str()],
        &[
            object(&config.global_config),
            object(&config.pools),
            format!("{}u32", new_pool.tick_spacing),
            format!("{sqrt_price}u128"),
            "\"\"".to_owned(),
            object(CLOCK),
        ],
    ))
}

async fn load_pool(chain: &Chain, pool_id: &str) -> Result<PoolState, ToolError> {
    let object = chain.rpc().get_object(pool_id).await?;
    PoolState::from_object(&object)
}

async fn run(
    chain: Chain,
    config: Option<CetusConfig>,
    action: CetusAction,
) -> ToolResult {
    let configured = || {
        config
            .as_ref()
            .ok_or_else(|| precondition("Cetus protocol is not configured"))
    };

    let (config, ptb) = match &action {
        CetusAction::GetPool(pool_id) => {
            let object = chain.rpc().get_object(pool_id).await?;
            let pool = PoolState::from_object(&object)?;
            return Ok(json!({ "pool": pool_payload(&pool, &object) }));
        }
        CetusAction::GetPositions { owner, pool_id } => {
            let config = configured()?;
            let struct_type = format!("{}::position::Position", config.clmm_package);
            let objects = chain.rpc().get_owned_objects(owner, &struct_type).await?;
            let mut positions = vec![];
            for object in &objects {
                let position = Position::from_object(object)?;
                if pool_id.as_ref().is_none_or(|pool_id| position.pool == *pool_id) {
                    positions.push(position.payload());
                }
            }
            return Ok(json!({ "positions": positions }));
        }
        CetusAction::Swap(trade) => {
            let config = configured()?;
            let pool = load_pool(&chain, &trade.pool_id).await?;
            let owned_a = payment_coins(&chain, &pool.coin_type_a, trade.amount).await?;
            (config, swap_ptb(config, &pool, trade, &owned_a))
        }
        CetusAction::AddLiquidity(trade) => {
            let config = configured()?;
            let pool = load_pool(&chain, &trade.pool_id).await?;
            let (_, _, max_b) = liquidity_plan(&pool, trade)?;
            let owned_a = payment_coins(&chain, &pool.coin_type_a, trade.amount).await?;
            let owned_b = payment_coins(&chain, &pool.coin_type_b, max_b).await?;
            (config, add_liquidity_ptb(config, &pool, trade, &owned_a, &owned_b)?)
        }
        CetusAction::RemoveLiquidity {
            position_id,
            liquidity,
            slippage,
        } => {
            let config = configured()?;
            let object = chain.rpc().get_object(position_id).await?;
            let position = Position::from_object(&object)?;
            if u128::from(*liquidity) > position.liquidity {
                return Err(insufficient_funds(format!(
                    "position {position_id} holds {} liquidity, {liquidity} requested",
                    position.liquidity
                )));
            }
            let pool = load_pool(&chain, &position.pool).await?;
            (
                config,
                remove_liquidity_ptb(config, &pool, &position, *liquidity, *slippage),
            )
        }
        CetusAction::CreatePool(new_pool) => {
            let config = configured()?;
            (config, create_pool_ptb(config, new_pool)?)
        }
    };

    debug!(
        "cetus {} through {}: {} ptb args",
        action.name(),
        config.integrate_package,
        ptb.args().len()
    );
    let resp = chain.signer().execute(&ptb).await?;
    let mut payload = transaction_payload(&resp, action.name());
    if let CetusAction::CreatePool(_) = action {
        payload["poolId"] = json!(resp.created_object("::pool::Pool<"));
    }
    Ok(payload)
}

/// Trades and provides liquidity on the Cetus CLMM exchange.
pub struct CetusTool {
    chain: Chain,
    config: Option<CetusConfig>,
    description: String,
    parameter_schema: Value,
}

impl CetusTool {
    /// Creates a new Cetus tool. Without a configuration only pools can be
    /// read.
    pub fn new(chain: Chain, config: Option<CetusConfig>) -> Self {
        let description = format!(
            "Interact with Cetus DEX protocol for swaps, liquidity provision, and pool information. \
             For coinTypeA and coinTypeB, use one of these supported addresses: {}. \
             If someone asks for a swap make sure they want to use Cetus and not another DEX, \
             and ask for the parameters an action needs before performing it.",
            SUPPORTED_COINS.join(", ")
        );
        Self {
            chain,
            config,
            description,
            parameter_schema: schema_for!(CetusParameters).to_value(),
        }
    }
}

impl Tool for CetusTool {
    type Input = CetusParameters;

    fn key(&self) -> &str {
        "cetus"
    }

    fn display_name(&self) -> &str {
        "Cetus"
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
        input: CetusParameters,
    ) -> impl Future<Output = ToolResult> + Send + 'static {
        let chain = self.chain.clone();
        let config = self.config.clone();
        async move {
            let action = CetusAction::try_from(input)?;
            run(chain, config, action).await
        }
    }
}

#[cfg(test)]
mod tests {
    use zoe_core::tool::ErrorKind;

    use super::*;
    use crate::chain::tests::{offline_chain, stub_node_chain};
    use crate::tools::clmm::tests::pool;

    fn config() -> CetusConfig {
        CetusConfig {
            clmm_package: "0xc1mm".to_owned(),
            integrate_package: "0x1n7e".to_owned(),
            global_config: "0xc0nf".to_owned(),
            pools: "0xp001s".to_owned(),
        }
    }

    fn params(action: &str) -> CetusParameters {
        CetusParameters {
            action: action.to_owned(),
            pool_id: None,
            position_id: None,
            amount: None,
            slippage: None,
            address: None,
            coin_type_a: None,
            coin_type_b: None,
            tick_spacing: None,
            initial_price: None,
        }
    }

    fn trade(amount: u64) -> PoolTrade {
        PoolTrade {
            pool_id: "0xp001".to_owned(),
            amount,
            slippage: 0.01,
        }
    }

    #[test]
    fn test_decode_action() {
        let err = CetusAction::try_from(params("getPool")).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Precondition);
        assert_eq!(err.reason(), "Pool ID required");

        let err = CetusAction::try_from(params("getPositions")).unwrap_err();
        assert_eq!(err.reason(), "Address required");

        let err = CetusAction::try_from(CetusParameters {
            pool_id: Some("0xp001".to_owned()),
            amount: Some("1000".to_owned()),
            ..params("swap")
        })
        .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Precondition);
        assert_eq!(err.reason(), "Pool ID, amount and slippage required");

        let action = CetusAction::try_from(CetusParameters {
            pool_id: Some("0xp001".to_owned()),
            amount: Some("1000".to_owned()),
            slippage: Some(0.01),
            ..params("addLiquidity")
        })
        .unwrap();
        assert_eq!(action, CetusAction::AddLiquidity(trade(1000)));

        let err = CetusAction::try_from(CetusParameters {
            position_id: Some("0xp05".to_owned()),
            slippage: Some(0.01),
            ..params("removeLiquidity")
        })
        .unwrap_err();
        assert_eq!(err.reason(), "Position ID, amount and slippage required");

        let err = CetusAction::try_from(params("farm")).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::UnknownAction);
    }

    #[test]
    fn test_decode_create_pool() {
        let create = |price: &str| CetusParameters {
            coin_type_a: Some("0x2::sui::SUI".to_owned()),
            coin_type_b: Some("0xdba3::usdc::USDC".to_owned()),
            tick_spacing: Some(60),
            initial_price: Some(price.to_owned()),
            ..params("createPool")
        };
        let action = CetusAction::try_from(create("2.5")).unwrap();
        assert!(matches!(action, CetusAction::CreatePool(NewPool { tick_spacing: 60, .. })));

        let err = CetusAction::try_from(create("-1")).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Precondition);

        let err = CetusAction::try_from(CetusParameters {
            tick_spacing: None,
            ..create("2.5")
        })
        .unwrap_err();
        assert!(err.reason().starts_with("Coin types, tick spacing"));

        let err = CetusAction::try_from(CetusParameters {
            coin_type_b: Some("0x0000000000000000000000000000000000000000000000000000000000000002::sui::SUI".to_owned()),
            ..create("2.5")
        })
        .unwrap_err();
        assert!(err.reason().contains("two different coins"));
    }

    #[test]
    fn test_swap_ptb() {
        // One SUI is worth four base units of USDC.
        let ptb = swap_ptb(&config(), &pool(1 << 65), &trade(1000), &[]);
        assert_eq!(
            ptb.args(),
            [
                "--split-coins",
                "gas",
                "[1000]",
                "--assign",
                "coin_a",
                "--move-call",
                "0x1n7e::pool_script::swap_a2b",
                "<0x2::sui::SUI, 0xdba3::usdc::USDC>",
                "@0xc0nf",
                "@0xp001",
                "[coin_a]",
                "true",
                "1000u64",
                "3960u64",
                "4295048016u128",
                "@0x6",
            ]
        );
    }

    #[test]
    fn test_add_liquidity_ptb() {
        let owned_b = ["0xb1".to_owned()];
        let ptb = add_liquidity_ptb(&config(), &pool(1 << 64), &trade(1_000_000), &[], &owned_b)
            .unwrap();
        let args = ptb.args();
        assert_eq!(&args[..5], ["--split-coins", "gas", "[1000000]", "--assign", "coin_a"]);
        assert_eq!(&args[5..7], ["--split-coins", "@0xb1"]);
        assert_eq!(
            args[11],
            "0x1n7e::pool_script_v2::open_position_with_liquidity_by_fix_coin"
        );
        // The price sits on tick 0, so the range is [0, 60).
        assert_eq!(&args[15..17], ["0u32", "60u32"]);
        assert_eq!(args[args.len() - 2], "true");

        let err = add_liquidity_ptb(
            &config(),
            &PoolState {
                tick_spacing: None,
                ..pool(1 << 64)
            },
            &trade(1),
            &[],
            &[],
        )
        .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ExternalService);
    }

    #[test]
    fn test_remove_liquidity_ptb() {
        let object = ObjectData {
            object_id: "0xp05".to_owned(),
            object_type: Some("0xc1mm::position::Position".to_owned()),
            content: Some(json!({
                "fields": {
                    "pool": "0xp001",
                    "liquidity": "5000000",
                    "tick_lower_index": { "type": "0xc1mm::i32::I32", "fields": { "bits": 4294967236_u64 } },
                    "tick_upper_index": { "type": "0xc1mm::i32::I32", "fields": { "bits": 60 } }
                }
            })),
        };
        let position = Position::from_object(&object).unwrap();
        assert_eq!(position.tick_lower, -60);
        assert_eq!(position.liquidity, 5_000_000);
        assert_eq!(position.payload()["liquidity"], "5000000");

        let ptb = remove_liquidity_ptb(&config(), &pool(1 << 64), &position, 1_000_000, 0.05);
        let args = ptb.args();
        assert_eq!(args[1], "0x1n7e::pool_script::remove_liquidity");
        assert_eq!(&args[3..7], ["@0xc0nf", "@0xp001", "@0xp05", "1000000u128"]);
        // Both sides are held at the current price and bounded below.
        let min_a: u64 = args[7].trim_end_matches("u64").parse().unwrap();
        let min_b: u64 = args[8].trim_end_matches("u64").parse().unwrap();
        assert!(min_a > 0 && min_b > 0);
    }

    #[test]
    fn test_create_pool_ptb() {
        let ptb = create_pool_ptb(
            &config(),
            &NewPool {
                coin_type_a: "0x2::sui::SUI".to_owned(),
                coin_type_b: "0xdba3::usdc::USDC".to_owned(),
                tick_spacing: 60,
                initial_price: 4.0,
            },
        )
        .unwrap();
        assert_eq!(
            &ptb.args()[3..],
            ["@0xc0nf", "@0xp001s", "60u32", "36893488147419103232u128", "\"\"", "@0x6"]
        );
    }

    #[tokio::test]
    async fn test_get_pool() {
        let chain = stub_node_chain(json!({
            "data": {
                "objectId": "0xp001",
                "type": "0xc1mm::pool::Pool<0x2::sui::SUI, 0xdba3::usdc::USDC>",
                "content": {
                    "dataType": "moveObject",
                    "fields": { "current_sqrt_price": "18446744073709551616", "tick_spacing": 60 }
                }
            }
        }))
        .await;
        // Reading a pool works without the protocol ids.
        let tool = CetusTool::new(chain, None);
        let payload = tool
            .execute(CetusParameters {
                pool_id: Some("0xp001".to_owned()),
                ..params("getPool")
            })
            .await
            .unwrap();
        assert_eq!(payload["pool"]["coinTypeB"], "0xdba3::usdc::USDC");
        assert_eq!(payload["pool"]["currentTick"], 0);
        assert_eq!(payload["pool"]["fields"]["tick_spacing"], 60);
    }

    #[tokio::test]
    async fn test_get_positions_in_pool() {
        let position = |id: &str, pool: &str| {
            json!({
                "data": {
                    "objectId": id,
                    "type": "0xc1mm::position::Position",
                    "content": {
                        "fields": {
                            "pool": pool,
                            "liquidity": "10",
                            "tick_lower_index": { "fields": { "bits": 0 } },
                            "tick_upper_index": { "fields": { "bits": 60 } }
                        }
                    }
                }
            })
        };
        let chain = stub_node_chain(json!({
            "data": [position("0xp05", "0xp001"), position("0xp06", "0xp002")],
            "nextCursor": null,
            "hasNextPage": false
        }))
        .await;
        let tool = CetusTool::new(chain, Some(config()));
        let payload = tool
            .execute(CetusParameters {
                address: Some("0xa11ce".to_owned()),
                pool_id: Some("0xp002".to_owned()),
                ..params("getPositions")
            })
            .await
            .unwrap();
        let positions = payload["positions"].as_array().unwrap();
        assert_eq!(positions.len(), 1);
        assert_eq!(positions[0]["positionId"], "0xp06");
    }

    #[tokio::test]
    async fn test_unconfigured_protocol() {
        let tool = CetusTool::new(offline_chain(), None);
        let err = tool
            .execute(CetusParameters {
                address: Some("0xa11ce".to_owned()),
                ..params("getPositions")
            })
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Precondition);
        assert!(err.reason().contains("not configured"));
    }

    #[test]
    fn test_schema() {
        let tool = CetusTool::new(offline_chain(), None);
        let schema = tool.parameter_schema();
        assert_eq!(schema["required"], json!(["action"]));
        let action = serde_json::to_string(&schema["properties"]["action"]).unwrap();
        assert!(action.contains("removeLiquidity") && action.contains("createPool"));
        assert!(schema["properties"]["coinTypeA"].is_object());
        assert!(tool.description().contains("0x2::sui::SUI"));
    }
}
