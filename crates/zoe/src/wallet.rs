//! The wallet the agent acts for.

use async_trait::async_trait;
use zoe_core::{AccountContext, AccountError};

use crate::chain::Chain;
use crate::coins::mist_to_sui;

/// Reads the wallet state from the chain.
pub struct Wallet {
    chain: Chain,
}

impl Wallet {
    /// Creates a wallet over the chain clients.
    #[inline]
    pub fn new(chain: Chain) -> Self {
        Self { chain }
    }
}

#[async_trait]
impl AccountContext for Wallet {
    fn current_address(&self) -> String {
        self.chain.address().to_owned()
    }

    async fn current_balance(&self) -> Result<f64, AccountError> {
        let balance = self.chain.rpc().get_balance(self.chain.address(), None).await?;
        Ok(mist_to_sui(balance.total()?))
    }
}
