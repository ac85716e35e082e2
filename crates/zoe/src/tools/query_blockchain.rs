use schemars::{JsonSchema, schema_for};
use serde::Deserialize;
use serde_json::{Value, json};
use zoe_core::tool::{Error as ToolError, Tool, ToolResult};

use super::{check_address, precondition};
use crate::chain::Chain;

const CHAIN_IDENTIFIER: &str = "query { chainIdentifier }";

const ADDRESS_INFO: &str = r#"
query getAddressInfo($address: SuiAddress!) {
  address(address: $address) {
    defaultSuinsName
  }
}"#;

const TRANSACTION_INFO: &str = r#"
query getTransactionInfo($digest: String!) {
  transactionBlock(digest: $digest) {
    gasInput {
      gasSponsor { address }
      gasPrice
      gasBudget
    }
    effects {
      status
      timestamp
      checkpoint { sequenceNumber }
      epoch { epochId referenceGasPrice }
    }
  }
}"#;

const RECENT_TRANSACTIONS: &str = r#"
query {
  transactionBlocks(last: 10, filter: { kind: PROGRAMMABLE_TX }) {
    nodes {
      digest
      kind { __typename }
    }
  }
}"#;

#[allow(dead_code)]
#[derive(JsonSchema)]
#[schemars(inline, rename_all = "camelCase")]
enum QueryTypeName {
    ChainIdentifier,
    AddressInfo,
    TransactionInfo,
    RecentTransactions,
}

#[derive(Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct QueryBlockchainParameters {
    #[schemars(with = "QueryTypeName", description = "Type of query to execute")]
    query_type: String,
    #[schemars(description = "Address to query information for (required for addressInfo)")]
    address: Option<String>,
    #[schemars(description = "Transaction digest to query (required for transactionInfo)")]
    transaction_digest: Option<String>,
}

/// A decoded chain query.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ChainQuery {
    /// The identifier of the connected chain.
    ChainIdentifier,
    /// The default SuiNS name of an address.
    AddressInfo(String),
    /// Gas and effects of a transaction.
    TransactionInfo(String),
    /// The latest programmable transactions.
    RecentTransactions,
}

impl TryFrom<QueryBlockchainParameters> for ChainQuery {
    type Error = ToolError;

    fn try_from(params: QueryBlockchainParameters) -> Result<Self, Self::Error> {
        match params.query_type.as_str() {
            "chainIdentifier" => Ok(ChainQuery::ChainIdentifier),
            "addressInfo" => match params.address {
                Some(address) => {
                    check_address("address", &address)?;
                    Ok(ChainQuery::AddressInfo(address))
                }
                None => Err(precondition("Address is required for addressInfo query")),
            },
            "transactionInfo" => match params.transaction_digest {
                Some(digest) if !digest.trim().is_empty() => {
                    Ok(ChainQuery::TransactionInfo(digest))
                }
                _ => Err(precondition("Transaction digest is required")),
            },
            "recentTransactions" => Ok(ChainQuery::RecentTransactions),
            other => Err(ToolError::unknown_action()
                .with_reason(format!("unknown query type `{other}`"))),
        }
    }
}

impl ChainQuery {
    fn document(&self) -> (&'static str, Value) {
        match self {
            ChainQuery::ChainIdentifier => (CHAIN_IDENTIFIER, json!({})),
            ChainQuery::AddressInfo(address) => {
                (ADDRESS_INFO, json!({ "address": address }))
            }
            ChainQuery::TransactionInfo(digest) => {
                (TRANSACTION_INFO, json!({ "digest": digest }))
            }
            ChainQuery::RecentTransactions => (RECENT_TRANSACTIONS, json!({})),
        }
    }

    /// Picks the part of the response reported to the model.
    fn payload(&self, data: &Value) -> Value {
        match self {
            ChainQuery::ChainIdentifier => {
                json!({ "chainIdentifier": data["chainIdentifier"] })
            }
            ChainQuery::AddressInfo(_) => {
                json!({ "defaultSuinsName": data["address"]["defaultSuinsName"] })
            }
            ChainQuery::TransactionInfo(_) => data["transactionBlock"].clone(),
            ChainQuery::RecentTransactions => {
                data["transactionBlocks"]["nodes"].clone()
            }
        }
    }
}

/// Reads chain information over GraphQL.
pub struct QueryBlockchainTool {
    chain: Chain,
    parameter_schema: Value,
}

impl QueryBlockchainTool {
    /// Creates a new query tool.
    #[inline]
    pub fn new(chain: Chain) -> Self {
        Self {
            chain,
            parameter_schema: schema_for!(QueryBlockchainParameters).to_value(),
        }
    }
}

impl Tool for QueryBlockchainTool {
    type Input = QueryBlockchainParameters;

    fn key(&self) -> &str {
        "queryBlockchain"
    }

    fn display_name(&self) -> &str {
        "Query blockchain"
    }

    fn description(&self) -> &str {
        "Query the Sui blockchain using GraphQL to get various information about epochs, transactions, and addresses, you should try display key information that is received not just talk about it, balance for sui native token is already in the context so don't try query it."
    }

    fn parameter_schema(&self) -> &Value {
        &self.parameter_schema
    }

    #[allow(clippy::manual_async_fn)]
    fn execute(
        &self,
        input: QueryBlockchainParameters,
    ) -> impl Future<Output = ToolResult> + Send + 'static {
        let chain = self.chain.clone();
        async move {
            let query = ChainQuery::try_from(input)?;
            let (document, variables) = query.document();
            let data = chain.graphql().query(document, variables).await?;
            Ok(query.payload(&data))
        }
    }
}
