use std::sync::Arc;

use serde_json::{Value, json};
use zoe_model::ToolCallRequest;

use crate::tool::{
    Error, ErrorKind, ToolDescriptor, ToolResult, ToolSet, ValidatedArguments,
    validate,
};

/// The normalized result of one tool call.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ToolOutcome {
    /// The tool returned a payload.
    Success {
        /// JSON payload returned by the tool.
        payload: Value,
    },
    /// The call failed at any stage.
    Failure {
        /// What went wrong.
        kind: ErrorKind,
        /// Human readable explanation, shown to the model.
        message: String,
    },
}

impl ToolOutcome {
    /// Returns `true` if the call succeeded.
    #[inline]
    pub fn is_success(&self) -> bool {
        matches!(self, ToolOutcome::Success { .. })
    }

    /// Returns the failure kind, if any.
    #[inline]
    pub fn failure_kind(&self) -> Option<ErrorKind> {
        match self {
            ToolOutcome::Success { .. } => None,
            ToolOutcome::Failure { kind, .. } => Some(*kind),
        }
    }

    /// Renders the outcome as the tool message content sent to the model.
    pub fn to_content(&self) -> String {
        match self {
            ToolOutcome::Success { payload } => match payload {
                Value::String(text) => text.clone(),
                other => other.to_string(),
            },
            ToolOutcome::Failure { kind, message } => json!({
                "error": kind.as_str(),
                "message": message,
            })
            .to_string(),
        }
    }
}

impl From<ToolResult> for ToolOutcome {
    fn from(result: ToolResult) -> Self {
        match result {
            Ok(payload) => ToolOutcome::Success { payload },
            Err(err) => ToolOutcome::from(err),
        }
    }
}

impl From<Error> for ToolOutcome {
    fn from(err: Error) -> Self {
        ToolOutcome::Failure {
            kind: err.kind(),
            message: err.reason().into_owned(),
        }
    }
}

/// Runs a validated call and normalizes whatever happens into an outcome.
///
/// The tool body runs on its own task, so a panicking tool is reported
/// as an external service failure instead of tearing down the round.
/// No retries are performed.
pub async fn invoke(
    tool: &ToolDescriptor,
    arguments: ValidatedArguments,
) -> ToolOutcome {
    let fut = Arc::clone(&tool.object).execute(arguments.into_inner());
    match tokio::spawn(fut).await {
        Ok(result) => {
            if let Err(err) = &result {
                debug!("tool {} failed: {err}", tool.key());
            }
            ToolOutcome::from(result)
        }
        Err(err) => {
            error!("tool {} did not finish: {err}", tool.key());
            ToolOutcome::from(
                Error::external_service()
                    .with_reason(format!("tool did not finish: {err}")),
            )
        }
    }
}

/// Routes a model tool call through lookup, validation and invocation.
pub async fn dispatch(tools: &ToolSet, call: &ToolCallRequest) -> ToolOutcome {
    let Some(tool) = tools.get(&call.name) else {
        warn!("tool not found: {}", call.name);
        return ToolOutcome::from(
            Error::unknown_tool()
                .with_reason(format!("no tool named `{}` is available", call.name)),
        );
    };

    trace!("dispatching a tool ({}) with args: {:?}", call.id, call.arguments);
    match validate(tool, &call.arguments) {
        Ok(arguments) => invoke(tool, arguments).await,
        Err(err) => ToolOutcome::from(Error::from(err)),
    }
}

#[cfg(test)]
mod tests {
    use std::sync::LazyLock;

    use serde_json::json;

    use super::*;
    use crate::tool::{Registry, Tool};

    static SCHEMA: LazyLock<Value> = LazyLock::new(|| {
        json!({
            "type": "object",
            "properties": { "mode": { "type": "string" } },
            "required": ["mode"]
        })
    });

    struct FlakyTool;

    impl Tool for FlakyTool {
        type Input = Value;

        fn key(&self) -> &str {
            "flaky"
        }

        fn description(&self) -> &str {
            "Fails in several ways"
        }

        fn parameter_schema(&self) -> &Value {
            &SCHEMA
        }

        fn execute(
            &self,
            input: Self::Input,
        ) -> impl Future<Output = ToolResult> + Send + 'static {
            async move {
                match input["mode"].as_str() {
                    Some("ok") => Ok(json!({ "balance": 1.5 })),
                    Some("panic") => panic!("boom"),
                    _ => Err(Error::external_service()
                        .with_reason("node unreachable")),
                }
            }
        }
    }

    fn tools() -> ToolSet {
        Registry::builder()
            .with_tool(FlakyTool)
            .build()
            .unwrap()
            .all()
    }

    fn call(name: &str, arguments: Value) -> ToolCallRequest {
        ToolCallRequest {
            id: "call_1".to_owned(),
            name: name.to_owned(),
            arguments,
        }
    }

    #[tokio::test]
    async fn test_success() {
        let outcome =
            dispatch(&tools(), &call("flaky", json!({ "mode": "ok" }))).await;
        assert_eq!(
            outcome,
            ToolOutcome::Success {
                payload: json!({ "balance": 1.5 })
            }
        );
        assert_eq!(outcome.to_content(), r#"{"balance":1.5}"#);
    }

    #[tokio::test]
    async fn test_failures_are_normalized() {
        let tools = tools();

        let outcome =
            dispatch(&tools, &call("flaky", json!({ "mode": "down" }))).await;
        assert_eq!(outcome.failure_kind(), Some(ErrorKind::ExternalService));
        assert_eq!(
            outcome.to_content(),
            r#"{"error":"ExternalServiceError","message":"node unreachable"}"#
        );

        let outcome =
            dispatch(&tools, &call("flaky", json!({ "mode": "panic" }))).await;
        assert_eq!(outcome.failure_kind(), Some(ErrorKind::ExternalService));

        let outcome = dispatch(&tools, &call("flaky", json!({}))).await;
        assert_eq!(outcome.failure_kind(), Some(ErrorKind::Schema));

        let outcome = dispatch(&tools, &call("navi", json!({}))).await;
        assert_eq!(outcome.failure_kind(), Some(ErrorKind::UnknownTool));
    }
}
