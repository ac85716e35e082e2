use serde_json::Value;

use crate::response::ToolCallRequest;

/// A request to be sent to the model provider.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct ModelRequest {
    /// The input messages, the system prompt comes first.
    pub messages: Vec<ModelMessage>,
    /// Tools that are available to the model.
    pub tools: Vec<ModelTool>,
}

impl ModelRequest {
    /// Returns the system prompt of this request, if any.
    pub fn system_prompt(&self) -> Option<&str> {
        self.messages.iter().find_map(|msg| match msg {
            ModelMessage::System(text) => Some(text.as_str()),
            _ => None,
        })
    }
}

/// A complete message.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum ModelMessage {
    /// The system instructions.
    System(String),
    /// A user input text.
    User(String),
    /// An assistant text.
    Assistant(String),
    /// A tool call previously requested by the assistant.
    ///
    /// Consecutive tool calls belong to the same assistant step.
    ToolCall(ToolCallRequest),
    /// A tool call result.
    Tool(ToolCallResult),
}

/// The result of calling a tool.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct ToolCallResult {
    /// The unique identifier for the tool call request.
    pub id: String,
    /// The result of the tool call, usually a JSON document.
    pub content: String,
    /// Whether the tool call failed.
    pub is_error: bool,
}

/// Describes a tool that can be used by the model.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct ModelTool {
    /// Name of the tool.
    pub name: String,
    /// Description of the tool.
    pub description: String,
    /// Parameters definition of the tool.
    ///
    /// For most model providers, the parameters should typically be
    /// defined by a [JSON schema](https://json-schema.org/).
    pub parameters: Value,
}
