use zoe_model::ToolCallRequest;

/// Where a round currently is.
#[derive(Debug)]
pub(crate) enum RoundStage {
    /// Waiting for the `step`-th model response of this round.
    AwaitingModel { step: usize },
    /// Running the tool calls the `step`-th response asked for.
    ExecutingTools {
        step: usize,
        calls: Vec<ToolCallRequest>,
    },
    Done(RoundEnd),
}

/// Why a round ended.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RoundEnd {
    /// The model answered with text only.
    Answered,
    /// The step budget ran out while the model still wanted tools.
    BudgetExhausted,
}

/// The result of a finished round.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RoundOutcome {
    /// Every piece of text the model produced in this round, in order.
    pub text: String,
    /// Why the round ended.
    pub end: RoundEnd,
    /// How many model calls the round made.
    pub model_calls: usize,
}
