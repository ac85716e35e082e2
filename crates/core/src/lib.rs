//! Core logic of the wallet agent: the tool registry and dispatch, the
//! conversation transcript, and the bounded orchestration loop that ties
//! the model to the tools.

#![deny(missing_docs)]
#![deny(clippy::missing_safety_doc)]

#[macro_use]
extern crate tracing;

pub mod account;
mod agent;
pub mod conversation;
mod model_client;
pub mod tool;

pub use account::{AccountContext, AccountError, AccountSnapshot};
pub use agent::{
    Agent, AgentBuilder, AgentEvent, DEFAULT_STEP_BUDGET, RoundEnd,
    RoundError, RoundOutcome,
};
