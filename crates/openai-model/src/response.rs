use std::collections::VecDeque;
use std::pin::Pin;
use std::task::{Context, Poll, ready};

use pin_project_lite::pin_project;
use serde_json::Value;
use zoe_model::{
    ErrorKind, ModelFinishReason, ModelProviderError, ModelResponse,
    ModelResponseEvent, ToolCallRequest,
};

use crate::io::Sse;
use crate::proto::{ChatCompletion, ChatCompletionChunk, ToolCall};
use crate::{Error, json_error};

struct PartialState {
    sse: Sse,
    id: Option<String>,
    tool_calls: Vec<ToolCall>,
    // This field records the index of the tool calls that are generated but not
    // yet sent to the model user. When calling `poll_next_event`, the response
    // will return the pending tool calls.
    pending_tool_call_idx: VecDeque<usize>,
    // This field will be cleared after the response returns the complete event.
    pending_finish_reason: Option<ModelFinishReason>,
}

type PinnedFuture<T> = Pin<Box<dyn Future<Output = T> + Send>>;
type NextEvent = Result<(Option<ModelResponseEvent>, PartialState), Error>;

pin_project! {
    pub struct OpenAIResponse {
        next_event_fut: Option<PinnedFuture<NextEvent>>,
        // Events that are already known, used by non-streamed completions.
        buffered: VecDeque<ModelResponseEvent>,
    }
}

impl OpenAIResponse {
    #[inline]
    pub fn from_sse(sse: Sse) -> Self {
        let partial_state = PartialState {
            sse,
            id: None,
            tool_calls: Default::default(),
            pending_tool_call_idx: Default::default(),
            pending_finish_reason: Default::default(),
        };
        let next_event_fut = async move { next_event(partial_state).await };
        Self {
            next_event_fut: Some(Box::pin(next_event_fut)),
            buffered: VecDeque::new(),
        }
    }

    /// Replays a complete response as events: the whole text as a single
    /// delta, then the tool calls, then completion.
    pub fn from_completion(completion: ChatCompletion) -> Result<Self, Error> {
        let mut buffered = VecDeque::new();
        let response_id = completion.id;
        if let Some(choice) = completion.choices.into_iter().next() {
            if let Some(content) = choice.message.content {
                if !content.is_empty() {
                    buffered.push_back(ModelResponseEvent::MessageDelta(content));
                }
            }
            let tool_calls = choice.message.tool_calls.unwrap_or_default();
            let has_tool_calls = !tool_calls.is_empty();
            for (position, tool_call) in tool_calls.iter().enumerate() {
                buffered.push_back(ModelResponseEvent::ToolCall(
                    tool_call_request(tool_call, &response_id, position)?,
                ));
            }
            let reason = finish_reason(choice.finish_reason.as_deref())
                .unwrap_or(if has_tool_calls {
                    ModelFinishReason::ToolCalls
                } else {
                    ModelFinishReason::Stop
                });
            buffered.push_back(ModelResponseEvent::Completed(reason));
        }
        Ok(Self {
            next_event_fut: None,
            buffered,
        })
    }
}

impl ModelResponse for OpenAIResponse {
    type Error = crate::Error;

    fn poll_next_event(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
    ) -> Poll<Result<Option<ModelResponseEvent>, Self::Error>> {
        let this = self.project();
        if let Some(event) = this.buffered.pop_front() {
            return Poll::Ready(Ok(Some(event)));
        }
        let Some(next_event_fut) = this.next_event_fut else {
            return Poll::Ready(Ok(None));
        };
        let (event, partial_state) =
            match ready!(next_event_fut.as_mut().poll(cx)) {
                Ok((Some(event), partial_state)) => (event, partial_state),
                Ok((None, _)) => {
                    *this.next_event_fut = None;
                    return Poll::Ready(Ok(None));
                }
                Err(err) => {
                    *this.next_event_fut = None;
                    return Poll::Ready(Err(err));
                }
            };

        // The stream may still have more data to pull, create a new future for
        // the next event.
        let next_event_fut = async move { next_event(partial_state).await };
        *this.next_event_fut = Some(Box::pin(next_event_fut));

        Poll::Ready(Ok(Some(event)))
    }
}

fn finish_reason(reason: Option<&str>) -> Option<ModelFinishReason> {
    match reason? {
        "tool_calls" | "function_call" => Some(ModelFinishReason::ToolCalls),
        _ => Some(ModelFinishReason::Stop),
    }
}

fn tool_call_request(
    tool_call: &ToolCall,
    response_id: &str,
    position: usize,
) -> Result<ToolCallRequest, Error> {
    // Some servers omit the id, the response id keeps the fallback unique.
    let id = match tool_call.id.as_deref() {
        Some(id) if !id.is_empty() => id.to_owned(),
        _ => {
            let index = tool_call.index.map_or(position, |index| index as usize);
            format!("{response_id}_call_{index}")
        }
    };
    let function = tool_call.function.as_ref();
    let name = function.and_then(|f| f.name.clone()).unwrap_or_default();
    let raw_args = function
        .and_then(|f| f.arguments.as_deref())
        .unwrap_or_default();
    let arguments = if raw_args.trim().is_empty() {
        Value::Object(Default::default())
    } else {
        match serde_json::from_str::<Value>(raw_args) {
            Ok(arguments) => arguments,
            Err(err) => {
                let err = json_error(err);
                if err.kind() == ErrorKind::InvalidNumber {
                    return Err(err);
                }
                // Malformed JSON is passed on as a string, the validator
                // reports it back to the model.
                Value::String(raw_args.to_owned())
            }
        }
    };
    Ok(ToolCallRequest {
        id,
        name,
        arguments,
    })
}

async fn next_event(
    mut partial_state: PartialState,
) -> Result<(Option<ModelResponseEvent>, PartialState), Error> {
    let sse = &mut partial_state.sse;
    let mut message_delta = None;

    loop {
        let sse_event = match sse.next_event().await {
            Ok(Some(event)) => event,
            Ok(None) => break,
            Err(err) => {
                return Err(Error::new(format!("{err:?}"), ErrorKind::Other));
            }
        };
        trace!("got sse event: {sse_event}");
        if sse_event == "[DONE]" {
            break;
        }

        let mut chunk = serde_json::from_str::<ChatCompletionChunk>(&sse_event)
            .map_err(json_error)?;
        if partial_state.id.get_or_insert_with(|| chunk.id.clone()) != &chunk.id
        {
            return Err(Error::new("chunk id mismatch", ErrorKind::Other));
        };

        // The usage chunk carries no choice.
        let Some(choice) = chunk.choices.pop() else {
            continue;
        };

        if let Some(content) = choice.delta.content {
            if !content.is_empty() {
                message_delta = Some(content);
            }
        }
        if let Some(tool_calls) = choice.delta.tool_calls {
            for tool_call in tool_calls {
                let Some(partial_tool_call) = partial_state
                    .tool_calls
                    .iter_mut()
                    .find(|t| t.index == tool_call.index)
                else {
                    partial_state
                        .pending_tool_call_idx
                        .push_back(partial_state.tool_calls.len());
                    partial_state.tool_calls.push(tool_call);
                    continue;
                };
                // Patch the partial tool call.
                if partial_tool_call.id.is_none() {
                    partial_tool_call.id = tool_call.id;
                }
                if let Some(function) = tool_call.function {
                    match partial_tool_call.function {
                        Some(ref mut partial_func) => {
                            if partial_func.name.is_none() {
                                partial_func.name = function.name;
                            }
                            if let Some(arguments) = function.arguments {
                                partial_func
                                    .arguments
                                    .get_or_insert_default()
                                    .push_str(&arguments);
                            }
                        }
                        None => partial_tool_call.function = Some(function),
                    }
                }
            }
        }

        if let Some(reason) = finish_reason(choice.finish_reason.as_deref()) {
            partial_state.pending_finish_reason = Some(reason);
            break;
        }

        if message_delta.is_some() {
            break;
        }
    }

    // The order of events are important. Always emit message delta first, then
    // emit pending tool calls, and finally emit pending finish reason if any.
    // Tool calls are only complete once the finish reason arrived or the
    // stream ended.

    if let Some(message_delta) = message_delta {
        return Ok((
            Some(ModelResponseEvent::MessageDelta(message_delta)),
            partial_state,
        ));
    }

    if let Some(idx) = partial_state.pending_tool_call_idx.pop_front() {
        let response_id = partial_state.id.as_deref().unwrap_or_default();
        let tool_call =
            tool_call_request(&partial_state.tool_calls[idx], response_id, idx)?;
        return Ok((Some(ModelResponseEvent::ToolCall(tool_call)), partial_state));
    }

    if let Some(finish_reason) = partial_state.pending_finish_reason.take() {
        return Ok((
            Some(ModelResponseEvent::Completed(finish_reason)),
            partial_state,
        ));
    }

    Ok((None, partial_state))
}

#[cfg(test)]
mod tests {
    use std::future::poll_fn;
    use std::pin::pin;

    use bytes::Bytes;
    use serde_json::json;

    use super::*;
    use crate::io::Chunks;

    async fn collect(
        resp: OpenAIResponse,
    ) -> Result<(String, Vec<ToolCallRequest>, Option<ModelFinishReason>), Error>
    {
        let mut resp = pin!(resp);
        let mut text = String::new();
        let mut calls = vec![];
        let mut reason = None;
        while let Some(event) =
            poll_fn(|cx| resp.as_mut().poll_next_event(cx)).await?
        {
            match event {
                ModelResponseEvent::MessageDelta(delta) => text.push_str(&delta),
                ModelResponseEvent::ToolCall(call) => calls.push(call),
                ModelResponseEvent::Completed(r) => reason = Some(r),
            }
        }
        Ok((text, calls, reason))
    }

    fn fixture(bytes: &'static [u8]) -> OpenAIResponse {
        let chunks = Chunks::from_vec_deque(vec![Bytes::from_static(bytes)].into());
        OpenAIResponse::from_sse(Sse::new(chunks))
    }

    #[tokio::test]
    async fn test_streamed_tool_calls() {
        let resp = fixture(include_bytes!("../fixtures/tool_calls.txt"));
        let (text, calls, reason) = collect(resp).await.unwrap();

        assert_eq!(text, "Let me check your wallet.");
        assert_eq!(reason, Some(ModelFinishReason::ToolCalls));
        assert_eq!(calls.len(), 2);
        assert_eq!(calls[0].id, "call_a");
        assert_eq!(calls[0].name, "getAllBalances");
        assert_eq!(calls[0].arguments, json!({ "address": "0xa11ce" }));
        assert_eq!(calls[1].name, "listCoins");
        assert_eq!(calls[1].arguments, json!({}));
    }

    #[tokio::test]
    async fn test_streamed_text() {
        let resp = fixture(include_bytes!("../fixtures/text.txt"));
        let (text, calls, reason) = collect(resp).await.unwrap();
        assert_eq!(text, "You hold 12.5 SUI.");
        assert!(calls.is_empty());
        assert_eq!(reason, Some(ModelFinishReason::Stop));
    }

    #[tokio::test]
    async fn test_number_out_of_range() {
        let resp = fixture(include_bytes!("../fixtures/huge_number.txt"));
        let err = collect(resp).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidNumber);
    }

    #[tokio::test]
    async fn test_completion_replay() {
        let completion: ChatCompletion = serde_json::from_value(json!({
            "id": "cmpl",
            "choices": [{
                "index": 0,
                "message": { "role": "assistant", "content": "Done, 1 SUI sent." },
                "finish_reason": "stop"
            }]
        }))
        .unwrap();
        let resp = OpenAIResponse::from_completion(completion).unwrap();
        let (text, calls, reason) = collect(resp).await.unwrap();
        assert_eq!(text, "Done, 1 SUI sent.");
        assert!(calls.is_empty());
        assert_eq!(reason, Some(ModelFinishReason::Stop));
    }

    #[test]
    fn test_malformed_arguments_are_kept() {
        let call = tool_call_request(&ToolCall {
            index: Some(0),
            id: Some("call".to_owned()),
            r#type: None,
            function: Some(crate::proto::FunctionToolCall {
                name: Some("sendSui".to_owned()),
                arguments: Some("{\"to\": ".to_owned()),
            }),
        }, "chatcmpl-1", 0)
        .unwrap();
        assert_eq!(call.id, "call");
        assert_eq!(call.arguments, Value::String("{\"to\": ".to_owned()));
    }

    #[tokio::test]
    async fn test_missing_tool_call_ids_are_filled_in() {
        let completion: ChatCompletion = serde_json::from_value(json!({
            "id": "cmpl-7",
            "choices": [{
                "index": 0,
                "message": {
                    "role": "assistant",
                    "content": null,
                    "tool_calls": [
                        { "type": "function", "function": { "name": "listCoins", "arguments": "{}" } },
                        { "id": "", "type": "function", "function": { "name": "getPrices", "arguments": "{}" } }
                    ]
                },
                "finish_reason": "tool_calls"
            }]
        }))
        .unwrap();
        let resp = OpenAIResponse::from_completion(completion).unwrap();
        let (_, calls, reason) = collect(resp).await.unwrap();
        assert_eq!(reason, Some(ModelFinishReason::ToolCalls));
        let ids: Vec<_> = calls.iter().map(|c| c.id.as_str()).collect();
        assert_eq!(ids, ["cmpl-7_call_0", "cmpl-7_call_1"]);

        let chunks = Chunks::from_vec_deque(
            vec![Bytes::from_static(
                b"data: {\"id\":\"chunk-9\",\"choices\":[{\"delta\":{\"tool_calls\":[{\"index\":0,\"function\":{\"name\":\"listCoins\",\"arguments\":\"{}\"}}]},\"finish_reason\":null}]}\n\n\
data: {\"id\":\"chunk-9\",\"choices\":[{\"delta\":{},\"finish_reason\":\"tool_calls\"}]}\n\n\
data: [DONE]\n\n",
            )]
            .into(),
        );
        let (_, calls, _) = collect(OpenAIResponse::from_sse(Sse::new(chunks)))
            .await
            .unwrap();
        assert_eq!(calls[0].id, "chunk-9_call_0");
    }
}
