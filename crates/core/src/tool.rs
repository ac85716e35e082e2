//! Tool call supports.
//!
//! A [`Tool`] is registered once into a [`Registry`], a session picks a
//! [`ToolSet`] out of it, and every call the model requests goes through
//! [`validate`] and then the invoker, which always yields a
//! [`ToolOutcome`].

mod error;
mod invoker;
mod object;
mod registry;
mod validator;

use serde::de::DeserializeOwned;
use serde_json::Value;

pub use error::{Error, ErrorKind};
pub use invoker::{ToolOutcome, dispatch, invoke};
pub use registry::{Registry, RegistryBuilder, RegistryError, ToolDescriptor, ToolSet};
pub use validator::{SchemaError, SchemaViolation, ValidatedArguments, validate};

/// The result of a tool call. The payload is sent back to the model as
/// JSON.
pub type ToolResult = Result<Value, Error>;

/// A tool that can be called by the model.
///
/// Implementations of this trait should be stateless, and may not maintain any
/// internal state.
///
/// The tool can be context-aware, meaning it can access additional information
/// about the current execution context, such as the wallet it operates on or
/// the endpoints it talks to. To do this, make the context an immutable state
/// of the tool, which can be set during initialization, and clone it when
/// executing.
pub trait Tool: Send + Sync + 'static {
    /// The type of input that the tool accepts.
    type Input: DeserializeOwned;

    /// Returns the unique key of the tool, which is also the name the
    /// model uses to call it.
    fn key(&self) -> &str;

    /// Returns a human readable name of the tool.
    fn display_name(&self) -> &str {
        self.key()
    }

    /// Returns the description of the tool.
    fn description(&self) -> &str;

    /// Returns the parameter schema of the tool.
    ///
    /// The schema is treated as closed: object properties that are not
    /// declared are rejected unless `additionalProperties` allows them.
    fn parameter_schema(&self) -> &Value;

    /// Executes the tool with the given input.
    ///
    /// This method must return a future that is fully independent of `self`,
    /// and the future should be cancellation safe.
    fn execute(
        &self,
        input: Self::Input,
    ) -> impl Future<Output = ToolResult> + Send + 'static;
}
