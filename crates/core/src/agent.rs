mod builder;
mod state;

use std::sync::Arc;

use thiserror::Error;
use zoe_model::{ErrorKind, ModelProviderError, ModelRequest};

use crate::account::{AccountError, AccountSnapshot};
use crate::conversation::{Conversation, Turn};
use crate::model_client::ModelClient;
use crate::tool::{ToolOutcome, ToolSet, dispatch};
pub use builder::AgentBuilder;
use state::RoundStage;
pub use state::{RoundEnd, RoundOutcome};

/// The number of model calls a round may make unless configured otherwise.
pub const DEFAULT_STEP_BUDGET: usize = 5;

type PromptFn = Box<dyn Fn(&AccountSnapshot) -> String + Send + Sync>;
type EventFn = Arc<dyn Fn(AgentEvent) + Send + Sync>;

/// Progress notifications emitted while a round runs.
#[derive(Clone, Debug, PartialEq)]
pub enum AgentEvent {
    /// A fragment of model text arrived.
    TextDelta(String),
    /// A tool call is about to run.
    ToolCallStarted {
        /// Key of the requested tool.
        tool_key: String,
        /// Identifier of the call.
        call_id: String,
    },
    /// A tool call finished, successfully or not.
    ToolCallFinished {
        /// Identifier of the call.
        call_id: String,
        /// What the tool returned.
        outcome: ToolOutcome,
    },
}

/// A round ended with an error that the session driver has to handle.
#[derive(Debug, Error)]
pub enum RoundError {
    /// The account state could not be refreshed.
    #[error("failed to refresh the account: {0}")]
    Account(#[source] AccountError),
    /// The model request failed or its output could not be consumed.
    #[error("model request failed: {error}")]
    Model {
        /// The provider's classification of the failure.
        kind: ErrorKind,
        /// Text received before the failure.
        partial_text: String,
        /// The provider error.
        error: Box<dyn ModelProviderError>,
    },
}

impl RoundError {
    /// Returns `true` for numeric conversion or range faults in the
    /// model output, which drivers report without ending the session.
    #[inline]
    pub fn is_invalid_number(&self) -> bool {
        matches!(
            self,
            RoundError::Model {
                kind: ErrorKind::InvalidNumber,
                ..
            }
        )
    }

    /// Returns the text the model produced before failing.
    pub fn partial_text(&self) -> &str {
        match self {
            RoundError::Account(_) => "",
            RoundError::Model { partial_text, .. } => partial_text,
        }
    }
}

/// Drives the model and the selected tools through bounded rounds.
///
/// An agent holds no conversation itself: the session owns it and lends
/// it to [`Agent::run_round`] for the duration of one round.
pub struct Agent {
    model_client: ModelClient,
    tools: ToolSet,
    account: Arc<dyn crate::AccountContext>,
    system_prompt: PromptFn,
    step_budget: usize,
    on_event: Option<EventFn>,
}

impl Agent {
    /// Returns the tools offered to the model.
    #[inline]
    pub fn tools(&self) -> &ToolSet {
        &self.tools
    }

    /// Returns the step budget of each round.
    #[inline]
    pub fn step_budget(&self) -> usize {
        self.step_budget
    }

    /// Runs one round over the conversation.
    ///
    /// The caller appends the user turn first. Every turn produced by the
    /// round is appended before this returns, including on error, and each
    /// tool call is always followed by its result.
    pub async fn run_round(
        &self,
        conversation: &mut Conversation,
    ) -> Result<RoundOutcome, RoundError> {
        let account = AccountSnapshot::capture(&*self.account)
            .await
            .map_err(RoundError::Account)?;
        debug!("round started for {} ({} SUI)", account.address, account.balance);
        let system_prompt = (self.system_prompt)(&account);

        let capabilities = self.model_client.capabilities();
        // Providers without tool support get a single plain call.
        let (advertised, budget) = if capabilities.tool_calls {
            (self.tools.definitions(), self.step_budget)
        } else {
            (vec![], 1)
        };

        let mut round_text = String::new();
        let mut model_calls = 0;
        let mut stage = RoundStage::AwaitingModel { step: 1 };
        loop {
            trace!("round stage: {stage:?}");
            stage = match stage {
                RoundStage::AwaitingModel { step } => {
                    let req = ModelRequest {
                        messages: conversation.to_model_messages(&system_prompt),
                        tools: advertised.clone(),
                    };
                    model_calls += 1;
                    let resp = match self
                        .model_client
                        .send_request(req, self.text_observer())
                        .await
                    {
                        Ok(resp) => resp,
                        Err(err) => {
                            let partial = err.partial_transcript;
                            if !partial.is_empty() {
                                conversation.append(Turn::assistant(&partial));
                            }
                            round_text.push_str(&partial);
                            return Err(RoundError::Model {
                                kind: err.error.kind(),
                                partial_text: round_text,
                                error: err.error,
                            });
                        }
                    };
                    trace!("step {step} finished: {:?}", resp.finish_reason);

                    round_text.push_str(&resp.transcript);
                    if !resp.transcript.is_empty() {
                        conversation.append(Turn::assistant(resp.transcript));
                    }
                    if resp.tool_calls.is_empty() || !capabilities.tool_calls {
                        RoundStage::Done(RoundEnd::Answered)
                    } else {
                        RoundStage::ExecutingTools {
                            step,
                            calls: resp.tool_calls,
                        }
                    }
                }
                RoundStage::ExecutingTools { step, calls } => {
                    // Later calls may depend on earlier ones, so they run
                    // one after another.
                    for call in calls {
                        conversation.append(Turn::ToolCall {
                            tool_key: call.name.clone(),
                            call_id: call.id.clone(),
                            arguments: call.arguments.clone(),
                        });
                        self.emit(AgentEvent::ToolCallStarted {
                            tool_key: call.name.clone(),
                            call_id: call.id.clone(),
                        });

                        let outcome = dispatch(&self.tools, &call).await;

                        self.emit(AgentEvent::ToolCallFinished {
                            call_id: call.id.clone(),
                            outcome: outcome.clone(),
                        });
                        conversation.append(Turn::ToolResult {
                            call_id: call.id,
                            outcome,
                        });
                    }

                    if step >= budget {
                        warn!("step budget of {budget} exhausted");
                        RoundStage::Done(RoundEnd::BudgetExhausted)
                    } else {
                        RoundStage::AwaitingModel { step: step + 1 }
                    }
                }
                RoundStage::Done(end) => {
                    return Ok(RoundOutcome {
                        text: round_text,
                        end,
                        model_calls,
                    });
                }
            };
        }
    }

    fn emit(&self, event: AgentEvent) {
        if let Some(on_event) = &self.on_event {
            on_event(event);
        }
    }

    fn text_observer(&self) -> impl Fn(String) + Send + 'static {
        let on_event = self.on_event.clone();
        move |delta| {
            if let Some(on_event) = &on_event {
                on_event(AgentEvent::TextDelta(delta));
            }
        }
    }
}
