use serde::{Deserialize, Serialize};
use serde_json::Value;
use zoe_model::{ModelMessage, ModelRequest, ModelTool, ToolCallRequest};

use crate::OpenAIConfig;

// ------------------------------
// Types received from the server
// ------------------------------

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FunctionToolCall {
    pub name: Option<String>,
    pub arguments: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ToolCall {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub index: Option<u32>,
    pub id: Option<String>,
    pub r#type: Option<String>,
    pub function: Option<FunctionToolCall>,
}

#[derive(Clone, Debug, PartialEq, Eq, Hash, Deserialize)]
pub struct ChatCompletionChunk {
    pub id: String,
    pub choices: Vec<Choice>,
}

#[derive(Clone, Debug, PartialEq, Eq, Hash, Deserialize)]
pub struct Choice {
    pub delta: Delta,
    pub finish_reason: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Eq, Hash, Deserialize)]
pub struct Delta {
    pub content: Option<String>,
    pub tool_calls: Option<Vec<ToolCall>>,
    pub reasoning_content: Option<String>,
}

/// A complete, non-streamed completion.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Deserialize)]
pub struct ChatCompletion {
    #[serde(default)]
    pub id: String,
    pub choices: Vec<CompletionChoice>,
}

#[derive(Clone, Debug, PartialEq, Eq, Hash, Deserialize)]
pub struct CompletionChoice {
    pub message: CompletionMessage,
    pub finish_reason: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Eq, Hash, Deserialize)]
pub struct CompletionMessage {
    pub content: Option<String>,
    pub tool_calls: Option<Vec<ToolCall>>,
}

// ------------------------
// Types sent to the server
// ------------------------

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize)]
struct FunctionTool {
    name: String,
    description: String,
    parameters: Value,
}

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize)]
struct Tool {
    r#type: &'static str,
    function: FunctionTool,
}

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(tag = "role", rename_all = "lowercase")]
pub enum Message {
    System {
        content: String,
    },
    User {
        content: String,
    },
    Assistant {
        content: Option<String>,
        #[serde(skip_serializing_if = "Option::is_none")]
        tool_calls: Option<Vec<ToolCall>>,
    },
    Tool {
        tool_call_id: String,
        content: String,
    },
}

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize)]
pub struct ChatCompletionRequest {
    model: String,
    messages: Vec<Message>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    tools: Vec<Tool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    stream_options: Option<StreamOptions>,
    stream: bool,
}

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize)]
struct StreamOptions {
    include_usage: bool,
}

// -----------
// Conversions
// -----------

pub fn create_request(
    req: &ModelRequest,
    config: &OpenAIConfig,
) -> ChatCompletionRequest {
    let mut messages: Vec<Message> = Vec::with_capacity(req.messages.len());
    for msg in &req.messages {
        if config.native_tools {
            push_native(&mut messages, msg);
        } else {
            push_folded(&mut messages, msg);
        }
    }

    ChatCompletionRequest {
        model: config.model.clone(),
        messages,
        tools: if config.native_tools {
            req.tools.iter().map(create_tool).collect()
        } else {
            vec![]
        },
        stream_options: config.streaming.then_some(StreamOptions {
            include_usage: true,
        }),
        stream: config.streaming,
    }
}

fn push_native(messages: &mut Vec<Message>, msg: &ModelMessage) {
    let converted = match msg {
        ModelMessage::System(content) => Message::System {
            content: content.clone(),
        },
        ModelMessage::User(content) => Message::User {
            content: content.clone(),
        },
        ModelMessage::Assistant(content) => Message::Assistant {
            content: Some(content.clone()),
            tool_calls: None,
        },
        ModelMessage::ToolCall(call) => {
            // Calls of one step share a single assistant message, which may
            // also carry the text produced right before them.
            if let Some(Message::Assistant { tool_calls, .. }) =
                messages.last_mut()
            {
                tool_calls.get_or_insert_default().push(create_tool_call(call));
                return;
            }
            Message::Assistant {
                content: None,
                tool_calls: Some(vec![create_tool_call(call)]),
            }
        }
        ModelMessage::Tool(result) => Message::Tool {
            tool_call_id: result.id.clone(),
            content: result.content.clone(),
        },
    };
    messages.push(converted);
}

fn push_folded(messages: &mut Vec<Message>, msg: &ModelMessage) {
    let content = match msg {
        ModelMessage::System(content) => {
            messages.push(Message::System {
                content: content.clone(),
            });
            return;
        }
        ModelMessage::User(content) => {
            messages.push(Message::User {
                content: content.clone(),
            });
            return;
        }
        ModelMessage::Assistant(content) => content.clone(),
        ModelMessage::ToolCall(call) => {
            format!("Calling tool `{}` with {}", call.name, call.arguments)
        }
        ModelMessage::Tool(result) => result.content.clone(),
    };
    messages.push(Message::Assistant {
        content: Some(content),
        tool_calls: None,
    });
}

fn create_tool_call(call: &ToolCallRequest) -> ToolCall {
    ToolCall {
        index: None,
        id: Some(call.id.clone()),
        r#type: Some("function".to_owned()),
        function: Some(FunctionToolCall {
            name: Some(call.name.clone()),
            arguments: Some(call.arguments.to_string()),
        }),
    }
}

#[inline]
fn create_tool(tool: &ModelTool) -> Tool {
    Tool {
        r#type: "function",
        function: FunctionTool {
            name: tool.name.clone(),
            description: tool.description.clone(),
            parameters: tool.parameters.clone(),
        },
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;
    use zoe_model::ToolCallResult;

    use super::*;
    use crate::OpenAIConfigBuilder;

    fn balance_tool() -> ModelTool {
        ModelTool {
            name: "getAllBalances".to_owned(),
            description: "Get all balances of an address.".to_owned(),
            parameters: json!({
                "type": "object",
                "properties": { "address": { "type": "string" } },
                "required": ["address"]
            }),
        }
    }

    fn history() -> ModelRequest {
        ModelRequest {
            messages: vec![
                ModelMessage::System("I'm ZOE.".to_owned()),
                ModelMessage::User("Balance?".to_owned()),
                ModelMessage::Assistant("Checking.".to_owned()),
                ModelMessage::ToolCall(ToolCallRequest {
                    id: "call_0".to_owned(),
                    name: "getAllBalances".to_owned(),
                    arguments: json!({ "address": "0x1" }),
                }),
                ModelMessage::ToolCall(ToolCallRequest {
                    id: "call_1".to_owned(),
                    name: "listCoins".to_owned(),
                    arguments: json!({}),
                }),
                ModelMessage::Tool(ToolCallResult {
                    id: "call_0".to_owned(),
                    content: "[]".to_owned(),
                    is_error: false,
                }),
            ],
            tools: vec![balance_tool()],
        }
    }

    #[test]
    fn test_create_request() {
        let request = ModelRequest {
            messages: vec![
                ModelMessage::System("I'm ZOE.".to_owned()),
                ModelMessage::User("Hello".to_owned()),
            ],
            tools: vec![balance_tool()],
        };
        let config = OpenAIConfigBuilder::with_api_key("xxx")
            .with_model("custom")
            .build();
        let expected = ChatCompletionRequest {
            model: "custom".to_owned(),
            messages: vec![
                Message::System {
                    content: "I'm ZOE.".to_owned(),
                },
                Message::User {
                    content: "Hello".to_owned(),
                },
            ],
            tools: vec![Tool {
                r#type: "function",
                function: FunctionTool {
                    name: "getAllBalances".to_owned(),
                    description: "Get all balances of an address.".to_owned(),
                    parameters: balance_tool().parameters,
                },
            }],
            stream_options: Some(StreamOptions {
                include_usage: true,
            }),
            stream: true,
        };
        assert_eq!(create_request(&request, &config), expected);
    }

    #[test]
    fn test_tool_calls_are_grouped() {
        let config = OpenAIConfigBuilder::with_api_key("xxx").build();
        let req = create_request(&history(), &config);
        let body = serde_json::to_value(&req).unwrap();

        let messages = body["messages"].as_array().unwrap();
        assert_eq!(messages.len(), 4);
        assert_eq!(messages[2]["role"], "assistant");
        assert_eq!(messages[2]["content"], "Checking.");
        assert_eq!(messages[2]["tool_calls"][1]["id"], "call_1");
        assert_eq!(
            messages[2]["tool_calls"][0]["function"]["arguments"],
            r#"{"address":"0x1"}"#
        );
        assert_eq!(messages[3]["role"], "tool");
        assert_eq!(messages[3]["tool_call_id"], "call_0");
    }

    #[test]
    fn test_folded_history_without_native_tools() {
        let config = OpenAIConfigBuilder::with_api_key("xxx")
            .with_streaming(false)
            .with_native_tools(false)
            .build();
        let req = create_request(&history(), &config);
        let body = serde_json::to_value(&req).unwrap();

        assert_eq!(body["stream"], false);
        assert!(body.get("stream_options").is_none());
        assert!(body.get("tools").is_none());
        let messages = body["messages"].as_array().unwrap();
        assert_eq!(messages.len(), 6);
        assert!(messages[2..].iter().all(|m| m["role"] == "assistant"));
        assert!(messages.iter().all(|m| m.get("tool_calls").is_none()));
    }
}
