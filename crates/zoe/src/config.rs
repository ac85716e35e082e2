//! Runtime configuration.
//!
//! Secrets and the wallet identity come from the environment. Endpoints and
//! protocol object ids may be overridden with a TOML file whose path is
//! given by `ZOE_CONFIG`.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::{env, fs, io};

use serde::Deserialize;
use thiserror::Error;

/// Errors raised while assembling the configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A required environment variable is unset or empty.
    #[error("{0} environment variable is not set")]
    MissingVar(&'static str),
    /// The configuration file could not be read.
    #[error("failed to read {}: {source}", path.display())]
    Read {
        /// Path of the file.
        path: PathBuf,
        /// The underlying error.
        source: io::Error,
    },
    /// The configuration file is not valid.
    #[error("failed to parse {}: {source}", path.display())]
    Parse {
        /// Path of the file.
        path: PathBuf,
        /// The underlying error.
        source: toml::de::Error,
    },
}

/// Sui network endpoints and the local CLI.
#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(default)]
pub struct SuiConfig {
    /// JSON-RPC endpoint of a full node.
    pub rpc_url: String,
    /// GraphQL endpoint.
    pub graphql_url: String,
    /// The `sui` binary used to sign and execute transactions.
    pub binary: String,
    /// Gas budget of every transaction, in MIST.
    pub gas_budget: u64,
    /// Timeout of each HTTP request, in seconds.
    pub request_timeout_secs: u64,
}

impl Default for SuiConfig {
    fn default() -> Self {
        Self {
            rpc_url: "https://fullnode.mainnet.sui.io:443".into(),
            graphql_url: "https://sui-mainnet.mystenlabs.com/graphql".into(),
            binary: "sui".into(),
            gas_budget: 50_000_000,
            request_timeout_secs: 20,
        }
    }
}

/// Aftermath endpoints, used for prices and swap routes.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct AftermathConfig {
    /// Base URL of the Aftermath API.
    pub base_url: String,
}

impl Default for AftermathConfig {
    fn default() -> Self {
        Self {
            base_url: "https://aftermath.finance".into(),
        }
    }
}

/// A NAVI lending market.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
pub struct NaviMarket {
    /// Full Move type of the coin.
    pub coin_type: String,
    /// The pool object of the coin.
    pub pool: String,
    /// Asset index of the coin in the storage object.
    pub asset_id: u8,
}

/// A NAVI reward fund that can be claimed from.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
pub struct NaviReward {
    /// Full Move type of the reward coin.
    pub coin_type: String,
    /// The reward fund object.
    pub fund: String,
    /// Coin types of the assets the rewards accrue on.
    pub asset_coin_types: Vec<String>,
    /// Incentive rule ids.
    pub rule_ids: Vec<String>,
}

/// Object ids of the NAVI lending protocol.
///
/// NAVI is unavailable unless this section is configured.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
pub struct NaviConfig {
    /// The current protocol package.
    pub package: String,
    /// The shared storage object.
    pub storage: String,
    /// The price oracle object.
    pub oracle: String,
    /// The v2 incentive object.
    pub incentive_v2: String,
    /// The v3 incentive object.
    pub incentive_v3: String,
    /// Markets keyed by the coin symbol offered to the model.
    #[serde(default)]
    pub markets: BTreeMap<String, NaviMarket>,
    /// Reward funds claimed by the `claim` action.
    #[serde(default)]
    pub rewards: Vec<NaviReward>,
}

/// Object ids of the SpringSui liquid staking protocol.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct SpringSuiConfig {
    /// The protocol package. Staking is unavailable until it is set.
    pub package: Option<String>,
    /// The liquid staking info object.
    pub lst_info: String,
    /// The sSUI coin type.
    pub coin_type: String,
}

impl Default for SpringSuiConfig {
    fn default() -> Self {
        Self {
            package: None,
            lst_info: "0x15eda7330c8f99c30e430b4d82fd7ab2af3ead4ae17046fcb224aa9bad394f6b".into(),
            coin_type: "0x83556891f4a0f233ce7b05cfe7f957d4020492a34f5405b2cb9377d060bef4bf::spring_sui::SPRING_SUI".into(),
        }
    }
}

/// Object ids of the Cetus concentrated liquidity protocol.
///
/// Pools can be read without it, every other Cetus action needs it.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
pub struct CetusConfig {
    /// The CLMM package that defines pools and positions.
    pub clmm_package: String,
    /// The integrate package holding the entry functions.
    pub integrate_package: String,
    /// The shared global config object.
    pub global_config: String,
    /// The shared pool registry object.
    pub pools: String,
}

/// Object ids of the Bluefin spot exchange.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
pub struct BluefinConfig {
    /// The spot package.
    pub package: String,
    /// The shared global config object.
    pub global_config: String,
}

/// Settings of the orchestration loop.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct AgentConfig {
    /// Maximum number of model calls per round.
    pub step_budget: usize,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            step_budget: zoe_core::DEFAULT_STEP_BUDGET,
        }
    }
}

/// The full configuration.
#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct Config {
    /// The wallet address, always taken from `SUI_ADDRESS`.
    #[serde(skip)]
    pub address: String,
    /// Sui endpoints.
    pub sui: SuiConfig,
    /// Aftermath endpoints.
    pub aftermath: AftermathConfig,
    /// NAVI object ids.
    pub navi: Option<NaviConfig>,
    /// SpringSui object ids.
    pub spring_sui: SpringSuiConfig,
    /// Cetus object ids.
    pub cetus: Option<CetusConfig>,
    /// Bluefin object ids.
    pub bluefin: Option<BluefinConfig>,
    /// Orchestration settings.
    pub agent: AgentConfig,
}

impl Config {
    /// Parses a TOML document.
    pub fn from_toml(path: &Path, text: &str) -> Result<Self, ConfigError> {
        toml::from_str(text).map_err(|source| ConfigError::Parse {
            path: path.to_owned(),
            source,
        })
    }

    /// Loads the configuration from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::load(|name| env::var(name).ok())
    }

    /// Loads the configuration, reading variables through `var`.
    pub fn load(
        var: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, ConfigError> {
        let var = |name: &str| var(name).filter(|v| !v.trim().is_empty());

        let mut config = match var("ZOE_CONFIG") {
            Some(path) => {
                let path = PathBuf::from(path);
                debug!("loading configuration from {}", path.display());
                let text = fs::read_to_string(&path).map_err(|source| {
                    ConfigError::Read {
                        path: path.clone(),
                        source,
                    }
                })?;
                Self::from_toml(&path, &text)?
            }
            None => Self::default(),
        };

        config.address =
            var("SUI_ADDRESS").ok_or(ConfigError::MissingVar("SUI_ADDRESS"))?;
        if let Some(url) = var("SUI_RPC_URL") {
            config.sui.rpc_url = url;
        }
        if let Some(url) = var("SUI_GRAPHQL_URL") {
            config.sui.graphql_url = url;
        }
        if let Some(binary) = var("SUI_BINARY") {
            config.sui.binary = binary;
        }
        Ok(config)
    }
}

/// Reads a provider credential from the environment.
pub fn api_key(var: &'static str) -> Result<String, ConfigError> {
    env::var(var)
        .ok()
        .filter(|key| !key.trim().is_empty())
        .ok_or(ConfigError::MissingVar(var))
}
