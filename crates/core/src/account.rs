//! The wallet account the agent acts for.

use std::error::Error;

use async_trait::async_trait;

/// Error returned while reading the account state.
pub type AccountError = Box<dyn Error + Send + Sync>;

/// Provides the wallet identity and balance shown in the system prompt.
#[async_trait]
pub trait AccountContext: Send + Sync {
    /// Returns the wallet address.
    fn current_address(&self) -> String;

    /// Returns the native balance in whole coins (not base units).
    async fn current_balance(&self) -> Result<f64, AccountError>;
}

/// The account state captured at the start of a round.
#[derive(Clone, Debug, PartialEq)]
pub struct AccountSnapshot {
    /// The wallet address.
    pub address: String,
    /// The native balance in whole coins.
    pub balance: f64,
}

impl AccountSnapshot {
    /// Reads a fresh snapshot from the account.
    pub async fn capture(
        account: &dyn AccountContext,
    ) -> Result<Self, AccountError> {
        let balance = account.current_balance().await?;
        Ok(Self {
            address: account.current_address(),
            balance,
        })
    }
}
