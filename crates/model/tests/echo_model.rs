use std::collections::VecDeque;
use std::error::Error;
use std::fmt::{self, Display, Formatter};
use std::future::{poll_fn, ready};
use std::pin::Pin;
use std::task::{self, Poll, ready};
use std::time::Duration;

use serde_json::json;
use tokio::time::{Sleep, sleep};
use zoe_model::{
    ErrorKind, ModelCapabilities, ModelFinishReason, ModelMessage,
    ModelProvider, ModelProviderError, ModelRequest, ModelResponse,
    ModelResponseEvent, ToolCallRequest,
};

#[derive(Debug)]
struct EchoError(ErrorKind);

impl Display for EchoError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{self:?}")
    }
}

impl Error for EchoError {}

impl ModelProviderError for EchoError {
    fn kind(&self) -> ErrorKind {
        self.0
    }
}

/// Echoes the last user message word by word, or asks for the balance
/// tool when the user mentions a balance.
#[derive(Debug)]
struct EchoResponse {
    events: VecDeque<ModelResponseEvent>,
    sleep: Option<Pin<Box<Sleep>>>,
}

impl EchoResponse {
    fn new(input: &str, tools: bool) -> Self {
        let mut events = VecDeque::new();
        if tools && input.contains("balance") {
            events.push_back(ModelResponseEvent::ToolCall(ToolCallRequest {
                id: "call_0".to_owned(),
                name: "getAllBalances".to_owned(),
                arguments: json!({ "address": "0x1" }),
            }));
            events.push_back(ModelResponseEvent::Completed(
                ModelFinishReason::ToolCalls,
            ));
        } else {
            let words: Vec<_> = format!("You said {input}")
                .split(' ')
                .map(ToString::to_string)
                .collect();
            let last = words.len().saturating_sub(1);
            for (idx, mut word) in words.into_iter().enumerate() {
                if idx != last {
                    word.push(' ');
                }
                events.push_back(ModelResponseEvent::MessageDelta(word));
            }
            events.push_back(ModelResponseEvent::Completed(
                ModelFinishReason::Stop,
            ));
        }
        Self {
            events,
            sleep: None,
        }
    }
}

impl ModelResponse for EchoResponse {
    type Error = EchoError;

    fn poll_next_event(
        self: Pin<&mut Self>,
        cx: &mut task::Context<'_>,
    ) -> Poll<Result<Option<ModelResponseEvent>, Self::Error>> {
        // SAFETY: This type does not require to be pinned.
        let this = unsafe { self.get_unchecked_mut() };
        if let Some(sleep) = &mut this.sleep {
            ready!(sleep.as_mut().poll(cx));
            this.sleep = None;
            return Poll::Ready(Ok(this.events.pop_front()));
        }
        this.sleep = Some(Box::pin(sleep(Duration::from_millis(1))));
        Pin::new(this).poll_next_event(cx)
    }
}

struct EchoProvider {
    tool_calls: bool,
}

impl ModelProvider for EchoProvider {
    type Error = EchoError;
    type Response = EchoResponse;

    fn capabilities(&self) -> ModelCapabilities {
        ModelCapabilities {
            streaming: true,
            tool_calls: self.tool_calls,
        }
    }

    fn send_request(
        &self,
        req: &ModelRequest,
    ) -> impl Future<Output = Result<Self::Response, Self::Error>> + Send + 'static
    {
        let last_user = req.messages.iter().rev().find_map(|msg| match msg {
            ModelMessage::User(text) => Some(text.as_str()),
            _ => None,
        });
        let result = match last_user {
            Some(text) => Ok(EchoResponse::new(text, self.tool_calls)),
            None => Err(EchoError(ErrorKind::Other)),
        };
        ready(result)
    }
}

async fn drain(
    mut resp: EchoResponse,
) -> (String, Vec<ToolCallRequest>, Option<ModelFinishReason>) {
    let mut text = String::new();
    let mut calls = vec![];
    let mut reason = None;
    loop {
        let event = poll_fn(|cx| Pin::new(&mut resp).poll_next_event(cx))
            .await
            .unwrap();
        match event {
            Some(ModelResponseEvent::MessageDelta(delta)) => {
                text.push_str(&delta)
            }
            Some(ModelResponseEvent::ToolCall(call)) => calls.push(call),
            Some(ModelResponseEvent::Completed(r)) => reason = Some(r),
            None => break,
        }
    }
    (text, calls, reason)
}

#[tokio::test]
async fn test_streamed_text() {
    let provider = EchoProvider { tool_calls: true };
    let req = ModelRequest {
        messages: vec![
            ModelMessage::System("You are ZOE".to_owned()),
            ModelMessage::User("gm".to_owned()),
        ],
        tools: vec![],
    };
    assert_eq!(req.system_prompt(), Some("You are ZOE"));

    let resp = provider.send_request(&req).await.unwrap();
    let (text, calls, reason) = drain(resp).await;
    assert_eq!(text, "You said gm");
    assert!(calls.is_empty());
    assert_eq!(reason, Some(ModelFinishReason::Stop));
}

#[tokio::test]
async fn test_tool_call_requested() {
    let provider = EchoProvider { tool_calls: true };
    let req = ModelRequest {
        messages: vec![ModelMessage::User("what's my balance?".to_owned())],
        tools: vec![],
    };
    let resp = provider.send_request(&req).await.unwrap();
    let (text, calls, reason) = drain(resp).await;
    assert!(text.is_empty());
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].name, "getAllBalances");
    assert_eq!(calls[0].arguments["address"], "0x1");
    assert_eq!(reason, Some(ModelFinishReason::ToolCalls));
}

#[tokio::test]
async fn test_capabilities_without_tools() {
    let provider = EchoProvider { tool_calls: false };
    assert!(!provider.capabilities().tool_calls);

    let req = ModelRequest {
        messages: vec![ModelMessage::User("what's my balance?".to_owned())],
        tools: vec![],
    };
    let resp = provider.send_request(&req).await.unwrap();
    let (text, calls, _) = drain(resp).await;
    assert_eq!(text, "You said what's my balance?");
    assert!(calls.is_empty());
}

#[tokio::test]
async fn test_error() {
    let provider = EchoProvider { tool_calls: true };
    let req = ModelRequest {
        messages: vec![],
        tools: vec![],
    };
    let err = provider.send_request(&req).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Other);
}
