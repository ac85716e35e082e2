use std::sync::atomic::{AtomicU64, Ordering};

use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

use super::ChainError;

// ------------------------------
// Types received from the server
// ------------------------------

/// Total balance of one coin type.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Balance {
    /// The coin type.
    pub coin_type: String,
    /// Number of coin objects holding the balance.
    pub coin_object_count: u64,
    /// The balance in base units, as a decimal string.
    pub total_balance: String,
}

impl Balance {
    /// Parses the total balance.
    pub fn total(&self) -> Result<u128, ChainError> {
        self.total_balance.parse().map_err(|_| {
            ChainError::Decode(format!(
                "invalid balance `{}` for {}",
                self.total_balance, self.coin_type
            ))
        })
    }
}

/// A coin object.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Coin {
    /// The coin type.
    pub coin_type: String,
    /// The object id.
    pub coin_object_id: String,
    /// The balance in base units, as a decimal string.
    pub balance: String,
}

/// A page of coin objects.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CoinPage {
    /// Coins of this page.
    pub data: Vec<Coin>,
    /// Cursor of the next page.
    pub next_cursor: Option<String>,
    /// Whether there are more pages.
    pub has_next_page: bool,
}

/// Display metadata of a coin type.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CoinMetadata {
    /// Number of decimals.
    pub decimals: u8,
    /// Coin symbol.
    pub symbol: String,
    /// Coin name.
    #[serde(default)]
    pub name: String,
}

/// An object with its Move type and content.
#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ObjectData {
    /// The object id.
    pub object_id: String,
    /// Full Move type of the object.
    #[serde(rename = "type")]
    pub object_type: Option<String>,
    /// The parsed content, `fields` holding the struct fields.
    pub content: Option<Value>,
}

impl ObjectData {
    /// Returns a struct field of the content.
    pub fn field(&self, name: &str) -> Option<&Value> {
        self.content.as_ref()?.get("fields")?.get(name)
    }
}

#[derive(Deserialize)]
struct ObjectResponse {
    data: Option<ObjectData>,
    error: Option<Value>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ObjectPage {
    data: Vec<ObjectResponse>,
    next_cursor: Option<String>,
    has_next_page: bool,
}

/// Whether an executed transaction succeeded.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
pub struct ExecutionStatus {
    /// `success` or `failure`.
    pub status: String,
    /// The abort reason on failure.
    pub error: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Deserialize)]
struct Effects {
    status: ExecutionStatus,
}

/// The outcome of an executed transaction.
#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionResponse {
    /// The transaction digest.
    pub digest: String,
    effects: Option<Effects>,
    /// Balance changes caused by the transaction.
    #[serde(default)]
    pub balance_changes: Option<Value>,
    /// Objects created, mutated or deleted by the transaction.
    #[serde(default)]
    pub object_changes: Vec<ObjectChange>,
}

/// One entry of a transaction's object changes.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ObjectChange {
    /// `created`, `mutated`, `deleted` and so on.
    #[serde(rename = "type")]
    pub kind: String,
    /// Full Move type of the object.
    pub object_type: Option<String>,
    /// The object id.
    pub object_id: Option<String>,
}

impl TransactionResponse {
    /// Returns the id of the first created object whose type contains
    /// `type_part`.
    pub fn created_object(&self, type_part: &str) -> Option<&str> {
        self.object_changes
            .iter()
            .filter(|change| change.kind == "created")
            .find(|change| {
                change
                    .object_type
                    .as_deref()
                    .is_some_and(|ty| ty.contains(type_part))
            })
            .and_then(|change| change.object_id.as_deref())
    }

    /// Returns the execution status, if the node reported effects.
    pub fn status(&self) -> Option<&ExecutionStatus> {
        self.effects.as_ref().map(|e| &e.status)
    }

    /// Turns an aborted transaction into an error.
    pub fn into_success(self) -> Result<Self, ChainError> {
        match self.status() {
            Some(status) if status.status != "success" => {
                Err(ChainError::TransactionFailed {
                    digest: self.digest.clone(),
                    reason: status
                        .error
                        .clone()
                        .unwrap_or_else(|| status.status.clone()),
                })
            }
            _ => Ok(self),
        }
    }
}

fn object_data(id: &str, resp: ObjectResponse) -> Result<ObjectData, ChainError> {
    match (resp.data, resp.error) {
        (Some(data), _) => Ok(data),
        (None, Some(error)) => {
            Err(ChainError::Decode(format!("object {id}: {error}")))
        }
        (None, None) => Err(ChainError::Decode(format!("object {id} not found"))),
    }
}

#[derive(Deserialize)]
struct RpcErrorObject {
    code: i64,
    message: String,
}

#[derive(Deserialize)]
struct RpcResponse<T> {
    result: Option<T>,
    error: Option<RpcErrorObject>,
}

// ------------------------
// Types sent to the server
// ------------------------

#[derive(Serialize)]
struct RpcRequest<'a> {
    jsonrpc: &'static str,
    id: u64,
    method: &'a str,
    params: Value,
}

fn parse_response<T: DeserializeOwned>(
    method: &str,
    body: &[u8],
) -> Result<T, ChainError> {
    let resp: RpcResponse<T> = serde_json::from_slice(body)
        .map_err(|err| ChainError::Decode(format!("{method}: {err}")))?;
    if let Some(err) = resp.error {
        return Err(ChainError::Rpc {
            code: err.code,
            message: err.message,
        });
    }
    resp.result
        .ok_or_else(|| ChainError::Decode(format!("{method}: missing result")))
}

/// A JSON-RPC client of a Sui full node.
pub struct RpcClient {
    http: Client,
    url: String,
    next_id: AtomicU64,
}

impl RpcClient {
    /// Creates a client of the given endpoint.
    pub fn new(http: Client, url: &str) -> Self {
        Self {
            http,
            url: url.to_owned(),
            next_id: AtomicU64::new(1),
        }
    }

    async fn call<T: DeserializeOwned>(
        &self,
        method: &str,
        params: Value,
    ) -> Result<T, ChainError> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        trace!("rpc call #{id}: {method} {params}");
        let http_err = |source| ChainError::Http {
            endpoint: method.to_owned(),
            source,
        };
        let body = self
            .http
            .post(&self.url)
            .json(&RpcRequest {
                jsonrpc: "2.0",
                id,
                method,
                params,
            })
            .send()
            .await
            .and_then(reqwest::Response::error_for_status)
            .map_err(http_err)?
            .bytes()
            .await
            .map_err(http_err)?;
        parse_response(method, &body)
    }

    /// Returns the balance of one coin type, SUI if none is given.
    pub async fn get_balance(
        &self,
        owner: &str,
        coin_type: Option<&str>,
    ) -> Result<Balance, ChainError> {
        self.call("suix_getBalance", json!([owner, coin_type])).await
    }

    /// Returns the balances of every coin type the owner holds.
    pub async fn get_all_balances(
        &self,
        owner: &str,
    ) -> Result<Vec<Balance>, ChainError> {
        self.call("suix_getAllBalances", json!([owner])).await
    }

    /// Returns a page of the owner's coins of one type.
    pub async fn get_coins(
        &self,
        owner: &str,
        coin_type: &str,
        cursor: Option<&str>,
    ) -> Result<CoinPage, ChainError> {
        self.call("suix_getCoins", json!([owner, coin_type, cursor, 50]))
            .await
    }

    /// Returns every coin object of one type, following pagination.
    pub async fn get_all_coins(
        &self,
        owner: &str,
        coin_type: &str,
    ) -> Result<Vec<Coin>, ChainError> {
        let mut coins = vec![];
        let mut cursor = None;
        loop {
            let page =
                self.get_coins(owner, coin_type, cursor.as_deref()).await?;
            coins.extend(page.data);
            match page.next_cursor {
                Some(next) if page.has_next_page => cursor = Some(next),
                _ => return Ok(coins),
            }
        }
    }

    /// Returns the metadata of a coin type, if published.
    pub async fn get_coin_metadata(
        &self,
        coin_type: &str,
    ) -> Result<Option<CoinMetadata>, ChainError> {
        // A missing object is a `null` result rather than an error.
        let value: Value = match self
            .call("suix_getCoinMetadata", json!([coin_type]))
            .await
        {
            Ok(value) => value,
            Err(ChainError::Decode(msg)) if msg.ends_with("missing result") => {
                return Ok(None);
            }
            Err(err) => return Err(err),
        };
        serde_json::from_value(value)
            .map(Some)
            .map_err(|err| ChainError::Decode(format!("coin metadata: {err}")))
    }

    /// Returns an object with its type and content.
    pub async fn get_object(&self, id: &str) -> Result<ObjectData, ChainError> {
        let resp: ObjectResponse = self
            .call(
                "sui_getObject",
                json!([id, { "showType": true, "showContent": true }]),
            )
            .await?;
        object_data(id, resp)
    }

    /// Returns every object of a struct type owned by `owner`, following
    /// pagination.
    pub async fn get_owned_objects(
        &self,
        owner: &str,
        struct_type: &str,
    ) -> Result<Vec<ObjectData>, ChainError> {
        let query = json!({
            "filter": { "StructType": struct_type },
            "options": { "showType": true, "showContent": true }
        });
        let mut objects = vec![];
        let mut cursor = None;
        loop {
            let page: ObjectPage = self
                .call(
                    "suix_getOwnedObjects",
                    json!([owner, query, cursor, 50]),
                )
                .await?;
            objects.extend(page.data.into_iter().filter_map(|resp| resp.data));
            match page.next_cursor {
                Some(next) if page.has_next_page => cursor = Some(next),
                _ => return Ok(objects),
            }
        }
    }

    /// Submits a signed transaction and waits for local execution.
    pub async fn execute_transaction_block(
        &self,
        tx_bytes: &str,
        signature: &str,
    ) -> Result<TransactionResponse, ChainError> {
        let resp: TransactionResponse = self
            .call(
                "sui_executeTransactionBlock",
                json!([
                    tx_bytes,
                    [signature],
                    {
                        "showEffects": true,
                        "showBalanceChanges": true,
                        "showObjectChanges": true
                    },
                    "WaitForLocalExecution"
                ]),
            )
            .await?;
        resp.into_success()
    }
}
