use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::ChainError;

#[derive(Serialize)]
struct GraphQlRequest<'a> {
    query: &'a str,
    variables: Value,
}

#[derive(Deserialize)]
struct GraphQlErrorObject {
    message: String,
}

#[derive(Deserialize)]
struct GraphQlResponse {
    data: Option<Value>,
    #[serde(default)]
    errors: Vec<GraphQlErrorObject>,
}

fn parse_response(body: &[u8]) -> Result<Value, ChainError> {
    let resp: GraphQlResponse = serde_json::from_slice(body)
        .map_err(|err| ChainError::Decode(format!("graphql: {err}")))?;
    if !resp.errors.is_empty() {
        let messages: Vec<_> =
            resp.errors.into_iter().map(|e| e.message).collect();
        return Err(ChainError::GraphQl(messages.join("; ")));
    }
    Ok(resp.data.unwrap_or(Value::Null))
}

/// A client of the Sui GraphQL service.
pub struct GraphQlClient {
    http: Client,
    url: String,
}

impl GraphQlClient {
    /// Creates a client of the given endpoint.
    pub fn new(http: Client, url: &str) -> Self {
        Self {
            http,
            url: url.to_owned(),
        }
    }

    /// Runs a query and returns its `data` member.
    pub async fn query(
        &self,
        query: &str,
        variables: Value,
    ) -> Result<Value, ChainError> {
        let http_err = |source| ChainError::Http {
            endpoint: self.url.clone(),
            source,
        };
        let body = self
            .http
            .post(&self.url)
            .json(&GraphQlRequest { query, variables })
            .send()
            .await
            .and_then(reqwest::Response::error_for_status)
            .map_err(http_err)?
            .bytes()
            .await
            .map_err(http_err)?;
        parse_response(&body)
    }
}
