//! Clients of the Sui network and the services around it.
//!
//! Reads go to the full node over JSON-RPC or GraphQL. Writes are signed by
//! the local Sui CLI, which owns the keystore, see [`Signer`].

mod aftermath;
mod graphql;
mod ptb;
mod rpc;
mod signer;

use std::io;
use std::sync::Arc;
use std::time::Duration;

use reqwest::Client;
use thiserror::Error;
use zoe_core::tool::Error as ToolError;

pub use aftermath::AftermathClient;
pub use graphql::GraphQlClient;
pub use ptb::{Ptb, object};
pub use rpc::{
    Balance, Coin, CoinMetadata, CoinPage, ExecutionStatus, ObjectChange,
    ObjectData, RpcClient, TransactionResponse,
};
pub use signer::Signer;

use crate::config::Config;

/// Errors raised while talking to the chain.
#[derive(Debug, Error)]
pub enum ChainError {
    /// The HTTP client could not be built.
    #[error("failed to build http client: {0}")]
    Client(#[source] reqwest::Error),
    /// The request did not complete.
    #[error("request to {endpoint} failed: {source}")]
    Http {
        /// The endpoint or method called.
        endpoint: String,
        /// The underlying error.
        source: reqwest::Error,
    },
    /// The node answered with a JSON-RPC error.
    #[error("rpc error {code}: {message}")]
    Rpc {
        /// JSON-RPC error code.
        code: i64,
        /// Error message from the node.
        message: String,
    },
    /// The GraphQL service answered with errors.
    #[error("graphql error: {0}")]
    GraphQl(String),
    /// The response did not have the expected shape.
    #[error("unexpected response: {0}")]
    Decode(String),
    /// The Sui CLI could not be started.
    #[error("failed to run `{program}`: {source}")]
    Spawn {
        /// The binary.
        program: String,
        /// The underlying error.
        source: io::Error,
    },
    /// The Sui CLI exited unsuccessfully.
    #[error("`{program}` failed: {stderr}")]
    Cli {
        /// The binary.
        program: String,
        /// What the binary printed on stderr.
        stderr: String,
    },
    /// The transaction was executed but aborted.
    #[error("transaction {digest} failed: {reason}")]
    TransactionFailed {
        /// The transaction digest.
        digest: String,
        /// The abort reason.
        reason: String,
    },
}

impl From<ChainError> for ToolError {
    fn from(err: ChainError) -> Self {
        ToolError::external_service().with_reason(err.to_string())
    }
}

struct ChainInner {
    address: String,
    rpc: RpcClient,
    graphql: GraphQlClient,
    aftermath: AftermathClient,
    signer: Signer,
}

/// Every client a tool may need, bound to the wallet address.
///
/// Cloning is cheap.
#[derive(Clone)]
pub struct Chain {
    inner: Arc<ChainInner>,
}

impl Chain {
    /// Creates the clients from the configuration.
    pub fn new(config: &Config) -> Result<Self, ChainError> {
        let http = Client::builder()
            .timeout(Duration::from_secs(config.sui.request_timeout_secs))
            .build()
            .map_err(ChainError::Client)?;
        let inner = ChainInner {
            address: config.address.clone(),
            rpc: RpcClient::new(http.clone(), &config.sui.rpc_url),
            graphql: GraphQlClient::new(http.clone(), &config.sui.graphql_url),
            aftermath: AftermathClient::new(http, &config.aftermath.base_url),
            signer: Signer::new(
                &config.sui.binary,
                &config.address,
                config.sui.gas_budget,
            ),
        };
        Ok(Self {
            inner: Arc::new(inner),
        })
    }

    /// Returns the wallet address.
    #[inline]
    pub fn address(&self) -> &str {
        &self.inner.address
    }

    /// Returns the JSON-RPC client.
    #[inline]
    pub fn rpc(&self) -> &RpcClient {
        &self.inner.rpc
    }

    /// Returns the GraphQL client.
    #[inline]
    pub fn graphql(&self) -> &GraphQlClient {
        &self.inner.graphql
    }

    /// Returns the Aftermath client.
    #[inline]
    pub fn aftermath(&self) -> &AftermathClient {
        &self.inner.aftermath
    }

    /// Returns the transaction signer.
    #[inline]
    pub fn signer(&self) -> &Signer {
        &self.inner.signer
    }
}
