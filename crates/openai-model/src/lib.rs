//! A model provider for OpenAI-compatible APIs.
//!
//! Besides OpenAI itself this also drives hosts that only implement the
//! plain completion endpoint (no streaming, no function calling), see
//! [`OpenAIConfigBuilder::with_streaming`] and
//! [`OpenAIConfigBuilder::with_native_tools`].

#[macro_use]
extern crate tracing;

mod config;
mod io;
mod proto;
mod response;

use std::error::Error as StdError;
use std::fmt::{self, Display};
use std::sync::Arc;

use mime::Mime;
use reqwest::{Client, Response, StatusCode, header};
use zoe_model::{
    ErrorKind, ModelCapabilities, ModelProvider, ModelProviderError,
    ModelRequest,
};

pub use config::{OpenAIConfig, OpenAIConfigBuilder};
use io::{Chunks, Sse};
use proto::ChatCompletion;
use response::OpenAIResponse;

/// Error type for [`OpenAIProvider`].
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

// Numbers that don't fit are reported separately, the session survives
// them.
pub(crate) fn json_error(err: serde_json::Error) -> Error {
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

fn status_error(err: reqwest::Error) -> Error {
    let kind = match err.status() {
        Some(StatusCode::TOO_MANY_REQUESTS) => ErrorKind::RateLimitExceeded,
        _ => ErrorKind::Other,
    };
    Error::new(format!("{err}"), kind)
}

fn has_content_type(resp: &Response, subtype: &str) -> bool {
    resp.headers()
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.parse().ok())
        .map(|m: Mime| m.subtype().as_str() == subtype)
        .unwrap_or(false)
}

/// OpenAI-compatible model provider.
#[derive(Clone, Debug)]
pub struct OpenAIProvider {
    client: Client,
    config: Arc<OpenAIConfig>,
}

impl OpenAIProvider {
    /// Creates a new `OpenAIProvider` with the given configuration.
    #[inline]
    pub fn new(config: OpenAIConfig) -> Self {
        Self {
            client: Client::new(),
            config: Arc::new(config),
        }
    }
}

impl ModelProvider for OpenAIProvider {
    type Error = Error;
    type Response = OpenAIResponse;

    fn capabilities(&self) -> ModelCapabilities {
        ModelCapabilities {
            streaming: self.config.streaming,
            tool_calls: self.config.native_tools,
        }
    }

    fn send_request(
        &self,
        req: &ModelRequest,
    ) -> impl Future<Output = Result<Self::Response, Self::Error>> + Send + 'static
    {
        let streaming = self.config.streaming;
        let openai_req = proto::create_request(req, &self.config);
        let resp_fut = self
            .client
            .post(format!("{}{}", self.config.base_url, "/chat/completions"))
            .header(
                header::AUTHORIZATION,
                format!("Bearer {}", self.config.api_key),
            )
            .header(header::CONTENT_TYPE, "application/json")
            .header(
                header::ACCEPT,
                if streaming {
                    "text/event-stream"
                } else {
                    "application/json"
                },
            )
            .json(&openai_req)
            .send();

        async move {
            let resp = resp_fut
                .await
                .and_then(Response::error_for_status)
                .map_err(status_error)?;

            if !streaming {
                let body = resp.bytes().await.map_err(status_error)?;
                let completion: ChatCompletion =
                    serde_json::from_slice(&body).map_err(json_error)?;
                return OpenAIResponse::from_completion(completion);
            }

            if !has_content_type(&resp, "event-stream") {
                return Err(Error::new(
                    format!(
                        "Unexpected content type: {:?}",
                        resp.headers().get(header::CONTENT_TYPE)
                    ),
                    ErrorKind::Other,
                ));
            }

            // Here we got a successful response.
            let chunks = Chunks::from_response(resp);
            let sse = Sse::new(chunks);
            Ok(OpenAIResponse::from_sse(sse))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_json_error_kind() {
        let err = serde_json::from_str::<serde_json::Value>("[1e400]")
            .map_err(json_error)
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidNumber);

        let err = serde_json::from_str::<serde_json::Value>("{")
            .map_err(json_error)
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Other);
    }

    #[test]
    fn test_capabilities_follow_config() {
        let provider = OpenAIProvider::new(
            OpenAIConfigBuilder::with_api_key("xxx")
                .with_base_url("https://api.atoma.network/v1")
                .with_streaming(false)
                .with_native_tools(false)
                .build(),
        );
        assert_eq!(
            provider.capabilities(),
            ModelCapabilities {
                streaming: false,
                tool_calls: false,
            }
        );
    }
}
