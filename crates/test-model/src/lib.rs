//! A local scripted model for testing purpose.

mod preset;

use std::error::Error as StdError;
use std::fmt::{self, Debug, Display, Formatter};
use std::future::ready;
use std::pin::Pin;
use std::sync::{Arc, Mutex, PoisonError};
use std::task::{Context, Poll, ready};
use std::time::Duration;

use tokio::time::{Sleep, sleep};
use zoe_model::{
    ErrorKind, ModelCapabilities, ModelFinishReason, ModelProvider,
    ModelProviderError, ModelRequest, ModelResponse, ModelResponseEvent,
};

pub use preset::*;

#[derive(Debug)]
pub struct Error {
    #[allow(dead_code)]
    message: &'static str,
    kind: ErrorKind,
}

impl Display for Error {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        Debug::fmt(self, f)
    }
}

impl StdError for Error {}

impl ModelProviderError for Error {
    #[inline]
    fn kind(&self) -> ErrorKind {
        self.kind
    }
}

pub struct TestModelResponse {
    preset: PresetResponse,
    event_idx: usize,
    delay: Duration,
    sleep: Option<Pin<Box<Sleep>>>,
}

impl ModelResponse for TestModelResponse {
    type Error = crate::Error;

    fn poll_next_event(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
    ) -> Poll<Result<Option<ModelResponseEvent>, Self::Error>> {
        // SAFETY: This type does not require to be pinned.
        let this = unsafe { self.get_unchecked_mut() };

        if let Some(sleep) = &mut this.sleep {
            ready!(sleep.as_mut().poll(cx));
            this.sleep = None;

            let preset_events = &this.preset.events;
            if this.event_idx < preset_events.len() {
                let event = match &preset_events[this.event_idx] {
                    PresetEvent::MessageDelta(msg) => {
                        ModelResponseEvent::MessageDelta(msg.clone())
                    }
                    PresetEvent::ToolCall(req) => {
                        ModelResponseEvent::ToolCall(req.clone())
                    }
                    PresetEvent::Error(kind) => {
                        // Errors are terminal.
                        this.event_idx = usize::MAX;
                        return Poll::Ready(Err(Error {
                            message: "preset error",
                            kind: *kind,
                        }));
                    }
                };
                this.event_idx += 1;
                return Poll::Ready(Ok(Some(event)));
            } else if this.event_idx == preset_events.len() {
                this.event_idx += 1;
                return Poll::Ready(Ok(Some(ModelResponseEvent::Completed(
                    if this.preset.has_tool_call() {
                        ModelFinishReason::ToolCalls
                    } else {
                        ModelFinishReason::Stop
                    },
                ))));
            } else {
                // In case this method is called after completion.
                return Poll::Ready(Ok(None));
            }
        }
        this.sleep = Some(Box::pin(sleep(this.delay)));
        Pin::new(this).poll_next_event(cx)
    }
}

#[derive(Default)]
struct ScriptState {
    next_step: usize,
    failed_attempts: u64,
    requests: Vec<ModelRequest>,
}

/// A local scripted model for testing purpose.
///
/// Before sending requests, you need to setup the script, which is how the
/// model should respond to each request in call order. A step only advances
/// when its request succeeds, so injected failures are retried against the
/// same step. If there are no enough steps in the script, an error will be
/// returned, unless [`TestModelProvider::repeat_last_step`] is enabled.
///
/// Clones share the same script position and request log.
///
/// # Note
///
/// This type is not optimized for production use, there are heavy memory
/// copies involved. You should only use it for testing.
#[derive(Clone, Default)]
pub struct TestModelProvider {
    script: Vec<PresetResponse>,
    repeat_last: bool,
    delay: Option<Duration>,
    capabilities: ModelCapabilities,
    state: Arc<Mutex<ScriptState>>,
}

impl TestModelProvider {
    #[inline]
    pub fn add_assistant_response_step(&mut self, preset: PresetResponse) {
        self.script.push(preset);
    }

    /// Keeps answering with the last step once the script runs out.
    #[inline]
    pub fn repeat_last_step(&mut self) {
        self.repeat_last = true;
    }

    #[inline]
    pub fn set_delay(&mut self, duration: Duration) {
        self.delay = Some(duration);
    }

    #[inline]
    pub fn set_capabilities(&mut self, capabilities: ModelCapabilities) {
        self.capabilities = capabilities;
    }

    /// Returns every request received so far, including failed attempts.
    pub fn requests(&self) -> Vec<ModelRequest> {
        self.lock_state().requests.clone()
    }

    /// Returns the number of requests received so far.
    pub fn request_count(&self) -> usize {
        self.lock_state().requests.len()
    }

    fn lock_state(&self) -> std::sync::MutexGuard<'_, ScriptState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn next_response(
        &self,
        req: &ModelRequest,
    ) -> Result<TestModelResponse, Error> {
        let mut state = self.lock_state();
        state.requests.push(req.clone());

        let step_idx = if state.next_step < self.script.len() {
            state.next_step
        } else if self.repeat_last && !self.script.is_empty() {
            self.script.len() - 1
        } else {
            return Err(Error {
                message: "no enough steps",
                kind: ErrorKind::Other,
            });
        };
        let preset = &self.script[step_idx];

        if let Some(failures) = preset.failures {
            if failures == 0 || state.failed_attempts < failures {
                state.failed_attempts += 1;
                return Err(Error {
                    message: "injected failure",
                    kind: ErrorKind::RateLimitExceeded,
                });
            }
        }
        state.failed_attempts = 0;
        state.next_step += 1;

        Ok(TestModelResponse {
            preset: preset.clone(),
            event_idx: 0,
            delay: self.delay.unwrap_or(Duration::from_millis(1)),
            sleep: None,
        })
    }
}

impl ModelProvider for TestModelProvider {
    type Error = crate::Error;
    type Response = TestModelResponse;

    fn capabilities(&self) -> ModelCapabilities {
        self.capabilities
    }

    fn send_request(
        &self,
        req: &ModelRequest,
    ) -> impl Future<Output = Result<Self::Response, Self::Error>> + Send + 'static
    {
        ready(self.next_response(req))
    }
}
