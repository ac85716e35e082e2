use std::fmt::{self, Debug};
use std::future::poll_fn;
use std::pin::{Pin, pin};
use std::sync::Arc;
use std::time::Duration;

use backoff::ExponentialBackoffBuilder;
use tracing::Instrument;
use zoe_model::{
    ErrorKind, ModelCapabilities, ModelFinishReason, ModelProvider,
    ModelProviderError, ModelRequest, ModelResponse, ModelResponseEvent,
    ToolCallRequest,
};

type SendRequestResult = Result<ModelClientResponse, ModelClientError>;
type BoxedSendRequestFuture =
    Pin<Box<dyn Future<Output = SendRequestResult> + Send>>;
#[rustfmt::skip]
type HandlerFn = Arc<
    dyn Fn(ModelRequest, Box<dyn Fn(String) + Send + 'static>)
        -> BoxedSendRequestFuture + Send + Sync
>;

/// A wrapper around a model provider that maintains an execution
/// environment for the provider and provides a type-erased interface
/// for the other modules.
#[derive(Clone)]
pub struct ModelClient {
    handler_fn: HandlerFn,
    capabilities: ModelCapabilities,
}

impl ModelClient {
    #[inline]
    pub fn new<P: ModelProvider + 'static>(provider: P) -> Self {
        let capabilities = provider.capabilities();
        let provider = Arc::new(provider);
        // We have to erase the type `P`, since `ModelClient` doesn't have a
        // generic parameter and we don't want it either.
        let handler_fn: HandlerFn = Arc::new(move |req, on_transcript| {
            let provider = Arc::clone(&provider);
            Box::pin(
                async move {
                    trace!("got a request: {:?}", req);
                    let resp_or_err = send_with_retry(&*provider, &req).await;
                    handle_response::<P>(resp_or_err, on_transcript).await
                }
                .instrument(trace_span!("model client req")),
            )
        });
        Self {
            handler_fn,
            capabilities,
        }
    }

    /// Returns the capabilities of the wrapped provider.
    #[inline]
    pub fn capabilities(&self) -> ModelCapabilities {
        self.capabilities
    }

    /// Sends a request and returns the response.
    ///
    /// # Cancel safety
    ///
    /// This method is cancel safe. The response stops streaming further
    /// events when this operation is cancelled.
    #[inline]
    pub async fn send_request(
        &self,
        req: ModelRequest,
        on_transcript: impl Fn(String) + Send + 'static,
    ) -> SendRequestResult {
        (self.handler_fn)(req, Box::new(on_transcript)).await
    }
}

/// A completely received response from the model client.
#[derive(Clone, Debug)]
pub struct ModelClientResponse {
    pub transcript: String,
    /// Tool calls requested by the model.
    pub tool_calls: Vec<ToolCallRequest>,
    /// The reason the model finished generating.
    pub finish_reason: Option<ModelFinishReason>,
}

/// A failed request, with whatever text streamed before the failure.
pub struct ModelClientError {
    pub error: Box<dyn ModelProviderError>,
    pub partial_transcript: String,
}

impl Debug for ModelClientError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ModelClientError")
            .field("error", &self.error)
            .field("partial_transcript", &self.partial_transcript)
            .finish()
    }
}

// Only rate limits are worth waiting for, and only before any event has
// been consumed, so a retry never duplicates streamed text.
async fn send_with_retry<P: ModelProvider>(
    provider: &P,
    req: &ModelRequest,
) -> Result<P::Response, P::Error> {
    let policy = ExponentialBackoffBuilder::new()
        .with_initial_interval(Duration::from_millis(500))
        .with_max_elapsed_time(Some(Duration::from_secs(60)))
        .build();
    backoff::future::retry(policy, || {
        let fut = provider.send_request(req);
        async move {
            fut.await.map_err(|err| {
                if err.kind() == ErrorKind::RateLimitExceeded {
                    warn!("rate limited, retrying: {err}");
                    backoff::Error::transient(err)
                } else {
                    backoff::Error::permanent(err)
                }
            })
        }
    })
    .await
}

async fn handle_response<P: ModelProvider + 'static>(
    resp_or_err: Result<P::Response, P::Error>,
    on_transcript: Box<dyn Fn(String) + Send + 'static>,
) -> SendRequestResult {
    let resp = match resp_or_err {
        Ok(resp) => resp,
        Err(err) => {
            error!("got an error: {err:?}");
            return Err(ModelClientError {
                error: Box::new(err),
                partial_transcript: String::new(),
            });
        }
    };

    let mut transcript = String::new();
    let mut tool_calls = Vec::new();
    let mut finish_reason = None;

    trace!("start receiving events");

    let mut pinned_resp = pin!(resp);
    loop {
        let event_or_err =
            poll_fn(|cx| pinned_resp.as_mut().poll_next_event(cx)).await;
        let event = match event_or_err {
            Ok(event) => event,
            Err(err) => {
                error!("got an error: {err:?}");
                return Err(ModelClientError {
                    error: Box::new(err),
                    partial_transcript: transcript,
                });
            }
        };

        let Some(event) = event else {
            break;
        };
        trace!("got an event: {event:?}");

        match event {
            ModelResponseEvent::MessageDelta(msg) => {
                transcript.push_str(&msg);
                on_transcript(msg);
            }
            ModelResponseEvent::ToolCall(req) => {
                tool_calls.push(req);
            }
            ModelResponseEvent::Completed(reason) => {
                finish_reason = Some(reason);
            }
        }
    }

    trace!("finished a request");

    Ok(ModelClientResponse {
        transcript,
        tool_calls,
        finish_reason,
    })
}
