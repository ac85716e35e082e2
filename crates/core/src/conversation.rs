//! Conversation-related types.

use serde_json::Value;
use zoe_model::{ModelMessage, ToolCallRequest, ToolCallResult};

use crate::tool::ToolOutcome;

/// One entry of a conversation.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Turn {
    /// Text typed by the user, or the autonomous prompt.
    User {
        /// The input text.
        text: String,
    },
    /// Text produced by the model.
    Assistant {
        /// The output text.
        text: String,
    },
    /// A tool call requested by the model.
    ToolCall {
        /// Key of the requested tool.
        tool_key: String,
        /// Identifier pairing the call with its result.
        call_id: String,
        /// Raw arguments as produced by the model.
        arguments: Value,
    },
    /// The result of a previous tool call.
    ToolResult {
        /// Identifier of the call this result answers.
        call_id: String,
        /// What the tool returned.
        outcome: ToolOutcome,
    },
}

impl Turn {
    /// Creates a user turn.
    #[inline]
    pub fn user(text: impl Into<String>) -> Self {
        Turn::User { text: text.into() }
    }

    /// Creates an assistant turn.
    #[inline]
    pub fn assistant(text: impl Into<String>) -> Self {
        Turn::Assistant { text: text.into() }
    }
}

/// An append-only conversation.
///
/// There is no way to remove or rewrite turns: the history grows for as
/// long as the session lives.
#[derive(Clone, Default, Debug)]
pub struct Conversation {
    turns: Vec<Turn>,
}

impl Conversation {
    /// Appends a turn.
    #[inline]
    pub fn append(&mut self, turn: Turn) {
        self.turns.push(turn);
    }

    /// Returns a copy of all turns in order.
    #[inline]
    pub fn snapshot(&self) -> Vec<Turn> {
        self.turns.clone()
    }

    /// Returns the text of the latest assistant turn.
    pub fn last_assistant_text(&self) -> Option<&str> {
        self.turns.iter().rev().find_map(|turn| match turn {
            Turn::Assistant { text } => Some(text.as_str()),
            _ => None,
        })
    }

    /// Iterates over the entries in order.
    #[inline]
    pub fn iter(&self) -> impl Iterator<Item = &Turn> {
        self.turns.iter()
    }

    /// Returns the number of entries.
    #[inline]
    pub fn len(&self) -> usize {
        self.turns.len()
    }

    /// Returns `true` if there are no entries.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }

    pub(crate) fn to_model_messages(
        &self,
        system_prompt: &str,
    ) -> Vec<ModelMessage> {
        let mut messages = Vec::with_capacity(self.turns.len() + 1);
        messages.push(ModelMessage::System(system_prompt.to_owned()));
        messages.extend(self.turns.iter().map(|turn| match turn {
            Turn::User { text } => ModelMessage::User(text.clone()),
            Turn::Assistant { text } => ModelMessage::Assistant(text.clone()),
            Turn::ToolCall {
                tool_key,
                call_id,
                arguments,
            } => ModelMessage::ToolCall(ToolCallRequest {
                id: call_id.clone(),
                name: tool_key.clone(),
                arguments: arguments.clone(),
            }),
            Turn::ToolResult { call_id, outcome } => {
                ModelMessage::Tool(ToolCallResult {
                    id: call_id.clone(),
                    content: outcome.to_content(),
                    is_error: !outcome.is_success(),
                })
            }
        }));
        messages
    }
}
