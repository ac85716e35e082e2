use schemars::{JsonSchema, schema_for};
use serde::Deserialize;
use serde_json::{Value, json};
use zoe_core::tool::{Tool, ToolResult};

use super::{check_address, insufficient_funds, precondition};
use crate::chain::{Chain, Ptb};
use crate::coins::mist_to_sui;

#[derive(Deserialize, JsonSchema)]
pub struct SendSuiParameters {
    #[schemars(description = "The recipient Sui address to send tokens to")]
    to: String,
    #[schemars(description = "The amount to send in MIST units")]
    amount: u64,
}

/// Transfers SUI from the wallet.
pub struct SendSuiTool {
    chain: Chain,
    parameter_schema: Value,
}

impl SendSuiTool {
    /// Creates a new transfer tool.
    #[inline]
    pub fn new(chain: Chain) -> Self {
        Self {
            chain,
            parameter_schema: schema_for!(SendSuiParameters).to_value(),
        }
    }
}

impl Tool for SendSuiTool {
    type Input = SendSuiParameters;

    fn key(&self) -> &str {
        "sendSui"
    }

    fn display_name(&self) -> &str {
        "Send SUI"
    }

    fn description(&self) -> &str {
        "Send SUI tokens to another address on the Sui blockchain. This tool allows transferring SUI from your wallet to any recipient address. The amount should be specified in MIST units (1 SUI = 1,000,000,000 MIST)."
    }

    fn parameter_schema(&self) -> &Value {
        &self.parameter_schema
    }

    #[allow(clippy::manual_async_fn)]
    fn execute(
        &self,
        input: SendSuiParameters,
    ) -> impl Future<Output = ToolResult> + Send + 'static {
        let chain = self.chain.clone();
        async move {
            check_address("to", &input.to)?;
            if input.amount == 0 {
                return Err(precondition("`amount` must be greater than zero"));
            }

            let sender = chain.address();
            let rpc = chain.rpc();
            let initial = rpc.get_balance(sender, None).await?.total()?;
            if u128::from(input.amount) >= initial {
                return Err(insufficient_funds(format!(
                    "insufficient balance: {} SUI available, {} SUI requested plus gas",
                    mist_to_sui(initial),
                    mist_to_sui(input.amount.into()),
                )));
            }

            let ptb = Ptb::new()
                .split_coins("gas", &[input.amount])
                .assign("coin")
                .transfer_objects(&["coin"], &input.to);
            let resp = chain.signer().execute(&ptb).await?;

            let sender_final = rpc.get_balance(sender, None).await?.total()?;
            let recipient = rpc.get_balance(&input.to, None).await?.total()?;
            Ok(json!({
                "digest": resp.digest,
                "senderInitialBalance": mist_to_sui(initial),
                "senderFinalBalance": mist_to_sui(sender_final),
                "recipientBalance": mist_to_sui(recipient),
                "recipientAddress": input.to,
            }))
        }
    }
}
