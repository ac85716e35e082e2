use std::pin::Pin;
use std::sync::Arc;

use serde_json::Value;
use tracing::Instrument;

use super::{Error, Tool, ToolResult};

pub(crate) trait ToolObject: Send + Sync + 'static {
    fn key(&self) -> &str;

    fn display_name(&self) -> &str;

    fn description(&self) -> &str;

    fn parameter_schema(&self) -> &Value;

    fn execute(
        self: Arc<Self>,
        arguments: Value,
    ) -> Pin<Box<dyn Future<Output = ToolResult> + Send>>;
}

pub(crate) struct ToolObjectImpl<T: Tool>(pub T);

impl<T: Tool> ToolObject for ToolObjectImpl<T> {
    #[inline]
    fn key(&self) -> &str {
        self.0.key()
    }

    #[inline]
    fn display_name(&self) -> &str {
        self.0.display_name()
    }

    #[inline]
    fn description(&self) -> &str {
        self.0.description()
    }

    #[inline]
    fn parameter_schema(&self) -> &Value {
        self.0.parameter_schema()
    }

    fn execute(
        self: Arc<Self>,
        arguments: Value,
    ) -> Pin<Box<dyn Future<Output = ToolResult> + Send>> {
        // The validator already checked the shape, but the typed input
        // may still be stricter (e.g. integer ranges).
        let input: T::Input = match serde_json::from_value(arguments) {
            Ok(input) => input,
            Err(err) => {
                let reason = format!("{err}");
                return Box::pin(std::future::ready(ToolResult::Err(
                    Error::schema().with_reason(reason),
                )));
            }
        };

        let key = self.0.key().to_owned();
        Box::pin(
            self.0
                .execute(input)
                .instrument(debug_span!("tool execute", tool = %key)),
        )
    }
}
