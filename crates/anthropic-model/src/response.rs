use std::collections::VecDeque;
use std::pin::Pin;
use std::task::{Context, Poll};

use zoe_model::{
    ModelFinishReason, ModelResponse, ModelResponseEvent, ToolCallRequest,
};

use crate::Error;
use crate::proto::{MessagesResponse, ResponseBlock};

/// A complete Messages API reply, replayed as response events.
#[derive(Debug)]
pub struct AnthropicResponse {
    events: VecDeque<ModelResponseEvent>,
}

impl AnthropicResponse {
    pub(crate) fn from_message(message: MessagesResponse) -> Self {
        let mut events = VecDeque::new();
        let mut text = String::new();
        let mut tool_calls = vec![];
        for block in message.content {
            match block {
                ResponseBlock::Text { text: fragment } => text.push_str(&fragment),
                ResponseBlock::ToolUse { id, name, input } => {
                    tool_calls.push(ToolCallRequest {
                        id,
                        name,
                        arguments: input,
                    })
                }
                ResponseBlock::Unknown => {
                    trace!("skipping unsupported content block");
                }
            }
        }

        if !text.is_empty() {
            events.push_back(ModelResponseEvent::MessageDelta(text));
        }
        let reason = match message.stop_reason.as_deref() {
            Some("tool_use") => ModelFinishReason::ToolCalls,
            Some(_) => ModelFinishReason::Stop,
            None if tool_calls.is_empty() => ModelFinishReason::Stop,
            None => ModelFinishReason::ToolCalls,
        };
        events.extend(tool_calls.into_iter().map(ModelResponseEvent::ToolCall));
        events.push_back(ModelResponseEvent::Completed(reason));
        Self { events }
    }
}

impl ModelResponse for AnthropicResponse {
    type Error = Error;

    fn poll_next_event(
        self: Pin<&mut Self>,
        _cx: &mut Context<'_>,
    ) -> Poll<Result<Option<ModelResponseEvent>, Self::Error>> {
        Poll::Ready(Ok(self.get_mut().events.pop_front()))
    }
}
