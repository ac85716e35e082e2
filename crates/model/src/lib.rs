//! An abstraction layer for the LLMs that drive the wallet agent.
//!
//! This crate establishes a unified protocol for the agent to talk to
//! the supported model providers (Anthropic, OpenAI and OpenAI-compatible
//! hosts), so that the orchestration loop can switch between them
//! without knowing their wire formats.
//!
//! Types in this crate don't define any behavior, instead they are the
//! constraints that the implementors should adhere to.

#![deny(missing_docs)]

mod error;
mod provider;
mod request;
mod response;

pub use error::*;
pub use provider::*;
pub use request::*;
pub use response::*;
