//! A model provider for the Anthropic Messages API.
//!
//! Requests are sent without streaming. The complete reply is replayed
//! as response events in block order.

#[macro_use]
extern crate tracing;

mod config;
mod proto;
mod response;

use std::error::Error as StdError;
use std::fmt::{self, Display};
use std::sync::Arc;

use reqwest::{Client, StatusCode, header};
use zoe_model::{
    ErrorKind, ModelCapabilities, ModelProvider, ModelProviderError,
    ModelRequest,
};

pub use config::{AnthropicConfig, AnthropicConfigBuilder};
use proto::{ErrorResponse, MessagesResponse};
pub use response::AnthropicResponse;

const ANTHROPIC_VERSION: &str = "2023-06-01";

/// Error type for [`AnthropicProvider`].
#[derive(Debug)]
pub struct Error {
    message: String,
    kind: ErrorKind,
}

impl Error {
    fn new(message: impl Into<String>, kind: ErrorKind) -> Self {
        Self {
            message: message.into(),
            kind,
        }
    }

    /// Returns the error message.
    #[inline]
    pub fn message(&self) -> &str {
        &self.message
    }
}

impl Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl StdError for Error {}

impl ModelProviderError for Error {
    #[inline]
    fn kind(&self) -> ErrorKind {
        self.kind
    }
}

fn json_error(err: serde_json::Error) -> Error {
    let message = format!("{err}");
    let kind = if message.contains("number out of range")
        || message.contains("invalid number")
    {
        ErrorKind::InvalidNumber
    } else {
        ErrorKind::Other
    };
    Error::new(message, kind)
}

fn transport_error(err: reqwest::Error) -> Error {
    Error::new(format!("{err}"), ErrorKind::Other)
}

// 529 is returned while the API is overloaded and clears up like a rate
// limit does.
fn status_error(status: StatusCode, body: &[u8]) -> Error {
    let kind = match status.as_u16() {
        429 | 529 => ErrorKind::RateLimitExceeded,
        _ => ErrorKind::Other,
    };
    let message = match serde_json::from_slice::<ErrorResponse>(body) {
        Ok(resp) => format!(
            "{status}: {} ({})",
            resp.error.message, resp.error.r#type
        ),
        Err(_) => format!("{status}: {}", String::from_utf8_lossy(body)),
    };
    Error::new(message, kind)
}

/// Anthropic model provider.
#[derive(Clone, Debug)]
pub struct AnthropicProvider {
    client: Client,
    config: Arc<AnthropicConfig>,
}

impl AnthropicProvider {
    /// Creates a new `AnthropicProvider` with the given configuration.
    #[inline]
    pub fn new(config: AnthropicConfig) -> Self {
        Self {
            client: Client::new(),
            config: Arc::new(config),
        }
    }
}

impl ModelProvider for AnthropicProvider {
    type Error = Error;
    type Response = AnthropicResponse;

    fn capabilities(&self) -> ModelCapabilities {
        ModelCapabilities {
            streaming: false,
            tool_calls: true,
        }
    }

    fn send_request(
        &self,
        req: &ModelRequest,
    ) -> impl Future<Output = Result<Self::Response, Self::Error>> + Send + 'static
    {
        let anthropic_req = proto::create_request(req, &self.config);
        let resp_fut = self
            .client
            .post(format!("{}/v1/messages", self.config.base_url))
            .header("x-api-key", &self.config.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .header(header::CONTENT_TYPE, "application/json")
            .json(&anthropic_req)
            .send();

        async move {
            let resp = resp_fut.await.map_err(transport_error)?;
            let status = resp.status();
            let body = resp.bytes().await.map_err(transport_error)?;
            if !status.is_success() {
                let err = status_error(status, &body);
                warn!("anthropic request failed: {err}");
                return Err(err);
            }

            let message: MessagesResponse =
                serde_json::from_slice(&body).map_err(json_error)?;
            debug!("message stopped: {:?}", message.stop_reason);
            Ok(AnthropicResponse::from_message(message))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_error_kind() {
        let body = br#"{"type":"error","error":{"type":"rate_limit_error","message":"slow down"}}"#;
        let err = status_error(StatusCode::TOO_MANY_REQUESTS, body);
        assert_eq!(err.kind(), ErrorKind::RateLimitExceeded);
        assert!(err.message().contains("slow down"));

        let err = status_error(StatusCode::from_u16(529).unwrap(), b"");
        assert_eq!(err.kind(), ErrorKind::RateLimitExceeded);

        let err = status_error(StatusCode::BAD_REQUEST, b"not json");
        assert_eq!(err.kind(), ErrorKind::Other);
        assert!(err.message().contains("not json"));
    }

    #[test]
    fn test_huge_number_in_reply() {
        let err = serde_json::from_slice::<MessagesResponse>(
            br#"{"content":[{"type":"tool_use","id":"t","name":"sendSui","input":{"amount":1e999}}],"stop_reason":"tool_use"}"#,
        )
        .map_err(json_error)
        .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidNumber);
    }

    #[test]
    fn test_config_debug_hides_key() {
        let config = AnthropicConfigBuilder::with_api_key("sk-ant-secret")
            .with_base_url("https://example.com/")
            .build();
        assert_eq!(config.model(), "claude-3-haiku-20240307");
        assert_eq!(config.base_url, "https://example.com");
        assert!(!format!("{config:?}").contains("sk-ant-secret"));
    }
}
