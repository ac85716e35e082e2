use serde::{Deserialize, Serialize};
use serde_json::Value;
use zoe_model::{ModelMessage, ModelRequest, ModelTool};

use crate::AnthropicConfig;

// ------------------------------
// Types received from the server
// ------------------------------

#[derive(Clone, Debug, PartialEq, Deserialize)]
pub struct MessagesResponse {
    pub content: Vec<ResponseBlock>,
    pub stop_reason: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ResponseBlock {
    Text {
        text: String,
    },
    ToolUse {
        id: String,
        name: String,
        input: Value,
    },
    #[serde(other)]
    Unknown,
}

#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
pub struct ErrorResponse {
    pub error: ErrorDetail,
}

#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
pub struct ErrorDetail {
    pub r#type: String,
    pub message: String,
}

// ------------------------
// Types sent to the server
// ------------------------

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContentBlock {
    Text {
        text: String,
    },
    ToolUse {
        id: String,
        name: String,
        input: Value,
    },
    ToolResult {
        tool_use_id: String,
        content: String,
        #[serde(skip_serializing_if = "std::ops::Not::not")]
        is_error: bool,
    },
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Message {
    pub role: Role,
    pub content: Vec<ContentBlock>,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
struct Tool {
    name: String,
    description: String,
    input_schema: Value,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct MessagesRequest {
    model: String,
    max_tokens: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    system: Option<String>,
    messages: Vec<Message>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    tools: Vec<Tool>,
}

// -----------
// Conversions
// -----------

pub fn create_request(
    req: &ModelRequest,
    config: &AnthropicConfig,
) -> MessagesRequest {
    let mut messages: Vec<Message> = Vec::with_capacity(req.messages.len());
    for msg in &req.messages {
        let (role, block) = match msg {
            // The system prompt travels in its own field.
            ModelMessage::System(_) => continue,
            ModelMessage::User(text) => {
                (Role::User, ContentBlock::Text { text: text.clone() })
            }
            ModelMessage::Assistant(text) => {
                (Role::Assistant, ContentBlock::Text { text: text.clone() })
            }
            ModelMessage::ToolCall(call) => (
                Role::Assistant,
                ContentBlock::ToolUse {
                    id: call.id.clone(),
                    name: call.name.clone(),
                    input: call.arguments.clone(),
                },
            ),
            ModelMessage::Tool(result) => (
                Role::User,
                ContentBlock::ToolResult {
                    tool_use_id: result.id.clone(),
                    content: result.content.clone(),
                    is_error: result.is_error,
                },
            ),
        };
        // Roles must alternate, so consecutive blocks of one role share a
        // message.
        match messages.last_mut() {
            Some(last) if last.role == role => last.content.push(block),
            _ => messages.push(Message {
                role,
                content: vec![block],
            }),
        }
    }

    MessagesRequest {
        model: config.model.clone(),
        max_tokens: config.max_tokens,
        system: req.system_prompt().map(str::to_owned),
        messages,
        tools: req.tools.iter().map(create_tool).collect(),
    }
}

#[inline]
fn create_tool(tool: &ModelTool) -> Tool {
    Tool {
        name: tool.name.clone(),
        description: tool.description.clone(),
        input_schema: tool.parameters.clone(),
    }
}
