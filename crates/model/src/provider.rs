use std::error::Error;

use crate::error::ErrorKind;
use crate::request::ModelRequest;
use crate::response::ModelResponse;

/// The error type for a model provider.
pub trait ModelProviderError: Error + Send + Sync + 'static {
    /// Returns the kind of this error.
    fn kind(&self) -> ErrorKind;
}

/// What a model provider is able to do.
///
/// The orchestration loop adapts to these flags instead of having one
/// code path per provider.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ModelCapabilities {
    /// Whether text arrives incrementally. Providers without streaming
    /// deliver the whole answer as a single delta.
    pub streaming: bool,
    /// Whether the provider understands tool definitions and emits
    /// structured tool calls.
    pub tool_calls: bool,
}

impl Default for ModelCapabilities {
    fn default() -> Self {
        Self {
            streaming: true,
            tool_calls: true,
        }
    }
}

/// A type that represents a model provider, which is an entry for
/// sampling requests.
///
/// Once the provider is created, it should behave like a stateless object.
/// It can still have internal state, but callers should not rely on it,
/// and the provider should be prepared for being dropped anytime.
pub trait ModelProvider: Send + Sync {
    /// The error type that may be returned by the provider.
    type Error: ModelProviderError;

    /// The response type for this provider.
    type Response: ModelResponse<Error = Self::Error>;

    /// Returns the capabilities of this provider.
    fn capabilities(&self) -> ModelCapabilities {
        ModelCapabilities::default()
    }

    /// Sends a request to the model.
    fn send_request(
        &self,
        req: &ModelRequest,
    ) -> impl Future<Output = Result<Self::Response, Self::Error>> + Send + 'static;
}
