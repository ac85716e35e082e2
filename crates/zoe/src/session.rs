use std::sync::Arc;

use zoe_core::conversation::{Conversation, Turn};
use zoe_core::tool::ToolSet;
use zoe_core::{
    AccountContext, Agent, AgentBuilder, AgentEvent, RoundError, RoundOutcome,
};
use zoe_model::ModelProvider;

use crate::prompt::{self, Mode};

/// A session builder.
///
/// See [`Session`].
pub struct SessionBuilder {
    agent_builder: AgentBuilder,
    mode: Mode,
}

impl SessionBuilder {
    /// Creates a session builder with a specified model provider.
    pub fn with_model_provider<M: ModelProvider + 'static>(
        provider: M,
    ) -> Self {
        let agent_builder = AgentBuilder::with_model_provider(provider);
        Self {
            agent_builder,
            mode: Mode::Interactive,
        }
    }

    /// Sets how the session is driven, which shapes the system prompt.
    #[inline]
    pub fn with_mode(mut self, mode: Mode) -> Self {
        self.mode = mode;
        self
    }

    /// Sets the tools the model may call.
    #[inline]
    pub fn with_tools(mut self, tools: ToolSet) -> Self {
        self.agent_builder = self.agent_builder.with_tools(tools);
        self
    }

    /// Sets the wallet shown in the system prompt.
    #[inline]
    pub fn with_account(mut self, account: Arc<dyn AccountContext>) -> Self {
        self.agent_builder = self.agent_builder.with_account(account);
        self
    }

    /// Sets the maximum number of model calls per message.
    #[inline]
    pub fn with_step_budget(mut self, step_budget: usize) -> Self {
        self.agent_builder = self.agent_builder.with_step_budget(step_budget);
        self
    }

    /// Attaches a callback to observe streamed text and tool calls.
    #[inline]
    pub fn on_event(
        mut self,
        on_event: impl Fn(AgentEvent) + Send + Sync + 'static,
    ) -> Self {
        self.agent_builder = self.agent_builder.on_event(on_event);
        self
    }

    /// Builds a new session.
    pub fn build(self) -> Session {
        let mode = self.mode;
        let agent = self
            .agent_builder
            .with_system_prompt(move |account| prompt::render(mode, account))
            .build();

        Session {
            agent,
            conversation: Conversation::default(),
        }
    }
}

/// A chat session: the agent plus the transcript it has produced so far.
///
/// The conversation grows with every message and lives as long as the
/// session.
pub struct Session {
    agent: Agent,
    conversation: Conversation,
}

impl Session {
    /// Sends a message and runs a round over it.
    ///
    /// Text streamed during the round reaches the `on_event` callback; the
    /// returned outcome carries all of it.
    pub async fn send_message(
        &mut self,
        message: &str,
    ) -> Result<RoundOutcome, RoundError> {
        self.conversation.append(Turn::user(message));
        self.agent.run_round(&mut self.conversation).await
    }

    /// Returns the transcript.
    #[inline]
    pub fn conversation(&self) -> &Conversation {
        &self.conversation
    }

    /// Returns the tools offered to the model.
    #[inline]
    pub fn tools(&self) -> &ToolSet {
        self.agent.tools()
    }
}
