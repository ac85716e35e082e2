//! Assembling a session from the configuration and the startup choices.

use std::sync::Arc;

use thiserror::Error;
use zoe_core::tool::{Registry, RegistryError};

use crate::chain::{Chain, ChainError};
use crate::config::{Config, ConfigError};
use crate::prompt::Mode;
use crate::provider::ProviderKind;
use crate::session::SessionBuilder;
use crate::tools;
use crate::wallet::Wallet;

/// Errors that stop the program before any session starts.
#[derive(Debug, Error)]
pub enum StartupError {
    /// The configuration is missing or invalid.
    #[error(transparent)]
    Config(#[from] ConfigError),
    /// The chain clients could not be created.
    #[error("failed to set up the Sui clients: {0}")]
    Chain(#[from] ChainError),
    /// The tool registry is inconsistent.
    #[error(transparent)]
    Registry(#[from] RegistryError),
}

/// Everything created before the user picks a mode, a model and tools.
pub struct Startup {
    config: Config,
    chain: Chain,
    registry: Registry,
}

impl Startup {
    /// Creates the chain clients and the tool registry.
    pub fn new(config: Config) -> Result<Self, StartupError> {
        let chain = Chain::new(&config)?;
        let registry = tools::registry(&chain, &config)?;
        info!(
            "wallet {} on {}, {} tools available",
            config.address,
            config.sui.rpc_url,
            registry.list().len()
        );
        Ok(Self {
            config,
            chain,
            registry,
        })
    }

    /// Returns the configuration.
    #[inline]
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Returns the tool registry.
    #[inline]
    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Prepares a session with the chosen provider and tools. The caller
    /// may still attach an event callback before building it.
    pub fn session_builder<I>(
        &self,
        provider: ProviderKind,
        api_key: String,
        mode: Mode,
        tool_keys: I,
    ) -> SessionBuilder
    where
        I: IntoIterator,
        I::Item: AsRef<str>,
    {
        provider
            .session_builder(api_key)
            .with_mode(mode)
            .with_tools(self.registry.resolve(tool_keys))
            .with_account(Arc::new(Wallet::new(self.chain.clone())))
            .with_step_budget(self.config.agent.step_budget)
    }
}
