use reqwest::Client;
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::{Value, json};

use super::ChainError;

/// A client of the Aftermath price and router API.
pub struct AftermathClient {
    http: Client,
    base_url: String,
}

impl AftermathClient {
    /// Creates a client of the given base URL.
    pub fn new(http: Client, base_url: &str) -> Self {
        Self {
            http,
            base_url: base_url.trim_end_matches('/').to_owned(),
        }
    }

    async fn post<B: Serialize, T: DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T, ChainError> {
        let url = format!("{}{path}", self.base_url);
        let http_err = |source| ChainError::Http {
            endpoint: url.clone(),
            source,
        };
        let body = self
            .http
            .post(&url)
            .json(body)
            .send()
            .await
            .and_then(reqwest::Response::error_for_status)
            .map_err(http_err)?
            .bytes()
            .await
            .map_err(http_err)?;
        serde_json::from_slice(&body)
            .map_err(|err| ChainError::Decode(format!("{path}: {err}")))
    }

    /// Returns the price and 24 hour change of each coin, keyed by coin
    /// type.
    pub async fn price_info(
        &self,
        coins: &[String],
    ) -> Result<Value, ChainError> {
        self.post("/api/price-info", &json!({ "coins": coins })).await
    }

    /// Finds the best route to trade an exact input amount.
    pub async fn trade_route(
        &self,
        coin_in_type: &str,
        coin_out_type: &str,
        coin_in_amount: u64,
        referrer: &str,
    ) -> Result<Value, ChainError> {
        self.post(
            "/api/router/trade-route",
            &json!({
                "coinInType": coin_in_type,
                "coinOutType": coin_out_type,
                "coinInAmount": coin_in_amount.to_string(),
                "referrer": referrer,
            }),
        )
        .await
    }

    /// Builds the transaction executing a route, returned as base64 bytes.
    pub async fn trade_transaction(
        &self,
        wallet_address: &str,
        route: &Value,
        slippage: f64,
    ) -> Result<String, ChainError> {
        let resp: Value = self
            .post(
                "/api/router/transactions/trade",
                &json!({
                    "walletAddress": wallet_address,
                    "completeRoute": route,
                    "slippage": slippage,
                }),
            )
            .await?;
        transaction_bytes(resp)
    }
}

fn transaction_bytes(resp: Value) -> Result<String, ChainError> {
    match resp {
        Value::String(bytes) => Ok(bytes),
        Value::Object(mut map) => match map.remove("txBytes") {
            Some(Value::String(bytes)) => Ok(bytes),
            _ => Err(ChainError::Decode(
                "trade transaction without `txBytes`".to_owned(),
            )),
        },
        other => Err(ChainError::Decode(format!(
            "unexpected trade transaction: {other}"
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transaction_bytes() {
        assert_eq!(transaction_bytes(json!("AAEC")).unwrap(), "AAEC");
        assert_eq!(
            transaction_bytes(json!({ "txBytes": "AAEC" })).unwrap(),
            "AAEC"
        );
        assert!(transaction_bytes(json!({ "tx": 1 })).is_err());
        assert!(transaction_bytes(json!(42)).is_err());
    }
}
