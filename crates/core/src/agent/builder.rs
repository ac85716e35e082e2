use std::sync::Arc;

use zoe_model::ModelProvider;

use super::{Agent, AgentEvent, DEFAULT_STEP_BUDGET, EventFn, PromptFn};
use crate::account::{AccountContext, AccountSnapshot};
use crate::model_client::ModelClient;
use crate::tool::ToolSet;

/// [`Agent`] builder.
pub struct AgentBuilder {
    model_client: ModelClient,
    tools: ToolSet,
    account: Option<Arc<dyn AccountContext>>,
    system_prompt: Option<PromptFn>,
    step_budget: usize,
    on_event: Option<EventFn>,
}

impl AgentBuilder {
    /// Creates a new builder with the specified model provider.
    #[inline]
    pub fn with_model_provider<P: ModelProvider + 'static>(
        provider: P,
    ) -> Self {
        Self {
            model_client: ModelClient::new(provider),
            tools: ToolSet::default(),
            account: None,
            system_prompt: None,
            step_budget: DEFAULT_STEP_BUDGET,
            on_event: None,
        }
    }

    /// Sets the tools offered to the model.
    #[inline]
    pub fn with_tools(mut self, tools: ToolSet) -> Self {
        self.tools = tools;
        self
    }

    /// Sets the account whose state is injected into the system prompt.
    #[inline]
    pub fn with_account(mut self, account: Arc<dyn AccountContext>) -> Self {
        self.account = Some(account);
        self
    }

    /// Sets the system prompt composer, called once per round.
    #[inline]
    pub fn with_system_prompt(
        mut self,
        compose: impl Fn(&AccountSnapshot) -> String + Send + Sync + 'static,
    ) -> Self {
        self.system_prompt = Some(Box::new(compose));
        self
    }

    /// Sets the maximum number of model calls per round.
    ///
    /// Values below 1 are raised to 1.
    #[inline]
    pub fn with_step_budget(mut self, step_budget: usize) -> Self {
        self.step_budget = step_budget.max(1);
        self
    }

    /// Attaches a callback to observe the progress of rounds.
    #[inline]
    pub fn on_event(
        mut self,
        on_event: impl Fn(AgentEvent) + Send + Sync + 'static,
    ) -> Self {
        self.on_event = Some(Arc::new(on_event));
        self
    }

    /// Builds the agent.
    ///
    /// Without an account the prompt sees an empty address and a zero
    /// balance.
    pub fn build(self) -> Agent {
        let Self {
            model_client,
            tools,
            account,
            system_prompt,
            step_budget,
            on_event,
        } = self;

        Agent {
            model_client,
            tools,
            account: account.unwrap_or_else(|| Arc::new(NoAccount)),
            system_prompt: system_prompt
                .unwrap_or_else(|| Box::new(|_: &AccountSnapshot| String::new())),
            step_budget,
            on_event,
        }
    }
}

struct NoAccount;

#[async_trait::async_trait]
impl AccountContext for NoAccount {
    fn current_address(&self) -> String {
        String::new()
    }

    async fn current_balance(&self) -> Result<f64, crate::AccountError> {
        Ok(0.0)
    }
}
