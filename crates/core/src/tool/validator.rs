use std::fmt::{self, Display};
use std::ops::Deref;

use serde_json::{Map, Value};

use crate::tool::{Error, ToolDescriptor};

// Guards against self-referencing `$ref` chains.
const MAX_DEPTH: usize = 32;

/// Arguments that passed validation. They are identical to the raw input.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ValidatedArguments(Value);

impl ValidatedArguments {
    /// Returns the inner JSON value.
    #[inline]
    pub fn into_inner(self) -> Value {
        self.0
    }
}

impl Deref for ValidatedArguments {
    type Target = Value;

    #[inline]
    fn deref(&self) -> &Value {
        &self.0
    }
}

impl PartialEq<Value> for ValidatedArguments {
    fn eq(&self, other: &Value) -> bool {
        self.0 == *other
    }
}

/// A single mismatch between the arguments and the schema.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SchemaViolation {
    /// Path of the offending field, e.g. `coins[1]`. Empty for the root.
    pub path: String,
    /// What the schema expects at that path.
    pub expected: String,
}

impl Display for SchemaViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.path.is_empty() {
            write!(f, "expected {}", self.expected)
        } else {
            write!(f, "`{}`: expected {}", self.path, self.expected)
        }
    }
}

/// The arguments of a tool call do not match the declared schema.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SchemaError {
    /// Key of the tool the arguments were meant for.
    pub tool: String,
    /// Every violation found, in schema order.
    pub violations: Vec<SchemaViolation>,
}

impl SchemaError {
    /// Returns the paths of all offending fields.
    pub fn fields(&self) -> Vec<&str> {
        self.violations.iter().map(|v| v.path.as_str()).collect()
    }
}

impl Display for SchemaError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid arguments for `{}`", self.tool)?;
        for (idx, violation) in self.violations.iter().enumerate() {
            let sep = if idx == 0 { ": " } else { "; " };
            write!(f, "{sep}{violation}")?;
        }
        Ok(())
    }
}

impl std::error::Error for SchemaError {}

impl From<SchemaError> for Error {
    fn from(err: SchemaError) -> Self {
        Error::schema().with_reason(err.to_string())
    }
}

/// Validates untrusted arguments against the tool's parameter schema.
///
/// The supported subset covers what derived schemas emit: `type` (also
/// as a list), `enum`, `const`, `$ref` into `$defs`/`definitions`,
/// `anyOf`/`oneOf`/`allOf`, `properties`/`required`/
/// `additionalProperties`, `items`/`minItems`/`maxItems`,
/// `minimum`/`maximum` and `minLength`/`maxLength`. Other keywords are
/// ignored.
pub fn validate(
    tool: &ToolDescriptor,
    raw: &Value,
) -> Result<ValidatedArguments, SchemaError> {
    let schema = tool.parameter_schema();
    let mut violations = vec![];
    let checker = Checker { root: schema };
    checker.check(schema, raw, "", 0, &mut violations);

    if violations.is_empty() {
        Ok(ValidatedArguments(raw.clone()))
    } else {
        debug!("rejected arguments for {}: {violations:?}", tool.key());
        Err(SchemaError {
            tool: tool.key().to_owned(),
            violations,
        })
    }
}

struct Checker<'a> {
    root: &'a Value,
}

impl<'a> Checker<'a> {
    fn check(
        &self,
        schema: &'a Value,
        value: &Value,
        path: &str,
        depth: usize,
        out: &mut Vec<SchemaViolation>,
    ) {
        if depth > MAX_DEPTH {
            out.push(violation(path, "a schema without reference cycles"));
            return;
        }

        let schema = match schema {
            Value::Bool(true) => return,
            Value::Bool(false) => {
                out.push(violation(path, "no value"));
                return;
            }
            Value::Object(schema) => schema,
            _ => return,
        };

        if let Some(reference) = schema.get("$ref").and_then(Value::as_str) {
            match self.resolve(reference) {
                Some(target) => {
                    self.check(target, value, path, depth + 1, out)
                }
                None => out.push(violation(
                    path,
                    &format!("a resolvable reference `{reference}`"),
                )),
            }
        }

        if let Some(branches) = schema.get("allOf").and_then(Value::as_array) {
            for branch in branches {
                self.check(branch, value, path, depth + 1, out);
            }
        }
        for keyword in ["anyOf", "oneOf"] {
            if let Some(branches) =
                schema.get(keyword).and_then(Value::as_array)
            {
                self.check_alternatives(branches, value, path, depth, out);
            }
        }

        if let Some(expected) = schema.get("type") {
            if !type_matches(expected, value) {
                out.push(violation(path, &describe_type(expected)));
                // Other keywords are meaningless for the wrong type.
                return;
            }
        }

        if let Some(allowed) = schema.get("enum").and_then(Value::as_array) {
            if !allowed.contains(value) {
                out.push(violation(path, &describe_enum(allowed)));
            }
        }
        if let Some(constant) = schema.get("const") {
            if constant != value {
                out.push(violation(path, &format!("{constant}")));
            }
        }

        match value {
            Value::Object(fields) => {
                self.check_object(schema, fields, path, depth, out)
            }
            Value::Array(items) => {
                self.check_array(schema, items, path, depth, out)
            }
            Value::Number(number) => {
                if let Some(number) = number.as_f64() {
                    check_range(schema, number, path, out);
                }
            }
            Value::String(text) => check_length(schema, text, path, out),
            _ => {}
        }
    }

    fn check_alternatives(
        &self,
        branches: &'a [Value],
        value: &Value,
        path: &str,
        depth: usize,
        out: &mut Vec<SchemaViolation>,
    ) {
        let mut closest: Option<Vec<SchemaViolation>> = None;
        for branch in branches {
            let mut branch_out = vec![];
            self.check(branch, value, path, depth + 1, &mut branch_out);
            if branch_out.is_empty() {
                return;
            }
            // Reporting the branch that came closest gives the model the
            // most actionable hint.
            if closest
                .as_ref()
                .is_none_or(|best| branch_out.len() < best.len())
            {
                closest = Some(branch_out);
            }
        }
        match closest {
            Some(best) => out.extend(best),
            None => out.push(violation(path, "a value of an allowed shape")),
        }
    }

    fn check_object(
        &self,
        schema: &'a Map<String, Value>,
        fields: &Map<String, Value>,
        path: &str,
        depth: usize,
        out: &mut Vec<SchemaViolation>,
    ) {
        let properties = schema.get("properties").and_then(Value::as_object);

        if let Some(required) = schema.get("required").and_then(Value::as_array)
        {
            for name in required.iter().filter_map(Value::as_str) {
                if !fields.contains_key(name) {
                    let expected = properties
                        .and_then(|props| props.get(name))
                        .map(|prop| self.describe(prop))
                        .unwrap_or_else(|| "a value".to_owned());
                    out.push(violation(
                        &join_field(path, name),
                        &format!("required field ({expected})"),
                    ));
                }
            }
        }

        let additional = schema.get("additionalProperties");
        for (name, field_value) in fields {
            let field_path = join_field(path, name);
            if let Some(prop) = properties.and_then(|props| props.get(name)) {
                self.check(prop, field_value, &field_path, depth + 1, out);
                continue;
            }
            match additional {
                Some(Value::Bool(true)) => {}
                Some(extra @ Value::Object(_)) => {
                    self.check(extra, field_value, &field_path, depth + 1, out)
                }
                // Free-form objects declare no properties at all.
                None if properties.is_none() => {}
                _ => out.push(violation(&field_path, "no such field")),
            }
        }
    }

    fn check_array(
        &self,
        schema: &'a Map<String, Value>,
        items: &[Value],
        path: &str,
        depth: usize,
        out: &mut Vec<SchemaViolation>,
    ) {
        let len = items.len() as u64;
        if let Some(min) = schema.get("minItems").and_then(Value::as_u64) {
            if len < min {
                out.push(violation(path, &format!("at least {min} item(s)")));
            }
        }
        if let Some(max) = schema.get("maxItems").and_then(Value::as_u64) {
            if len > max {
                out.push(violation(path, &format!("at most {max} item(s)")));
            }
        }
        if let Some(item_schema) = schema.get("items") {
            for (idx, item) in items.iter().enumerate() {
                let item_path = format!("{path}[{idx}]");
                self.check(item_schema, item, &item_path, depth + 1, out);
            }
        }
    }

    fn resolve(&self, reference: &str) -> Option<&'a Value> {
        let pointer = reference.strip_prefix('#')?;
        self.root.pointer(pointer)
    }

    fn describe(&self, schema: &'a Value) -> String {
        let Some(schema) = schema.as_object() else {
            return "a value".to_owned();
        };
        if let Some(allowed) = schema.get("enum").and_then(Value::as_array) {
            return describe_enum(allowed);
        }
        if let Some(expected) = schema.get("type") {
            return describe_type(expected);
        }
        if let Some(target) = schema
            .get("$ref")
            .and_then(Value::as_str)
            .and_then(|reference| self.resolve(reference))
        {
            return self.describe(target);
        }
        "a value".to_owned()
    }
}

fn type_matches(expected: &Value, value: &Value) -> bool {
    match expected {
        Value::String(name) => primitive_matches(name, value),
        Value::Array(names) => names
            .iter()
            .filter_map(Value::as_str)
            .any(|name| primitive_matches(name, value)),
        _ => true,
    }
}

fn primitive_matches(name: &str, value: &Value) -> bool {
    match name {
        "string" => value.is_string(),
        "number" => value.is_number(),
        "integer" => match value {
            Value::Number(n) => {
                n.is_i64()
                    || n.is_u64()
                    || n.as_f64().is_some_and(|f| f.fract() == 0.0)
            }
            _ => false,
        },
        "boolean" => value.is_boolean(),
        "array" => value.is_array(),
        "object" => value.is_object(),
        "null" => value.is_null(),
        _ => true,
    }
}

fn check_range(
    schema: &Map<String, Value>,
    number: f64,
    path: &str,
    out: &mut Vec<SchemaViolation>,
) {
    if let Some(min) = schema.get("minimum").and_then(Value::as_f64) {
        if number < min {
            out.push(violation(path, &format!("a number >= {min}")));
        }
    }
    if let Some(max) = schema.get("maximum").and_then(Value::as_f64) {
        if number > max {
            out.push(violation(path, &format!("a number <= {max}")));
        }
    }
    if let Some(min) = schema.get("exclusiveMinimum").and_then(Value::as_f64) {
        if number <= min {
            out.push(violation(path, &format!("a number > {min}")));
        }
    }
    if let Some(max) = schema.get("exclusiveMaximum").and_then(Value::as_f64) {
        if number >= max {
            out.push(violation(path, &format!("a number < {max}")));
        }
    }
}

fn check_length(
    schema: &Map<String, Value>,
    text: &str,
    path: &str,
    out: &mut Vec<SchemaViolation>,
) {
    let len = text.chars().count() as u64;
    if let Some(min) = schema.get("minLength").and_then(Value::as_u64) {
        if len < min {
            out.push(violation(path, &format!("at least {min} character(s)")));
        }
    }
    if let Some(max) = schema.get("maxLength").and_then(Value::as_u64) {
        if len > max {
            out.push(violation(path, &format!("at most {max} character(s)")));
        }
    }
}

fn describe_type(expected: &Value) -> String {
    match expected {
        Value::String(name) => name.clone(),
        Value::Array(names) => names
            .iter()
            .filter_map(Value::as_str)
            .collect::<Vec<_>>()
            .join(" | "),
        _ => "a value".to_owned(),
    }
}

fn describe_enum(allowed: &[Value]) -> String {
    let allowed: Vec<_> = allowed.iter().map(Value::to_string).collect();
    format!("one of {}", allowed.join(", "))
}

fn join_field(path: &str, name: &str) -> String {
    if path.is_empty() {
        name.to_owned()
    } else {
        format!("{path}.{name}")
    }
}

#[inline]
fn violation(path: &str, expected: &str) -> SchemaViolation {
    SchemaViolation {
        path: path.to_owned(),
        expected: expected.to_owned(),
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use schemars::{JsonSchema, schema_for};
    use serde::Deserialize;
    use serde_json::json;

    use super::*;
    use crate::tool::{Registry, Tool, ToolResult, invoke};

    #[derive(Deserialize, JsonSchema)]
    #[serde(rename_all = "camelCase")]
    #[allow(dead_code)]
    struct SwapParams {
        action: SwapAction,
        coin_in_type: String,
        coin_out_type: String,
        amount: String,
        #[schemars(range(min = 0.0, max = 1.0))]
        slippage: Option<f64>,
    }

    #[derive(Deserialize, JsonSchema)]
    #[serde(rename_all = "camelCase")]
    enum SwapAction {
        GetQuote,
        ExecuteSwap,
    }

    #[derive(Deserialize, JsonSchema)]
    #[allow(dead_code)]
    struct PriceParams {
        #[schemars(length(min = 1))]
        coins: Vec<String>,
        detailed: Option<bool>,
    }

    /// Counts how many times its body runs.
    struct StubTool {
        key: &'static str,
        schema: Value,
        calls: Arc<AtomicUsize>,
    }

    impl Tool for StubTool {
        type Input = Value;

        fn key(&self) -> &str {
            self.key
        }

        fn description(&self) -> &str {
            "stub"
        }

        fn parameter_schema(&self) -> &Value {
            &self.schema
        }

        fn execute(
            &self,
            input: Self::Input,
        ) -> impl Future<Output = ToolResult> + Send + 'static {
            self.calls.fetch_add(1, Ordering::SeqCst);
            std::future::ready(Ok(input))
        }
    }

    fn descriptor(schema: Value) -> (ToolDescriptor, Arc<AtomicUsize>) {
        let calls = Arc::new(AtomicUsize::new(0));
        let registry = Registry::builder()
            .with_tool(StubTool {
                key: "stub",
                schema,
                calls: Arc::clone(&calls),
            })
            .build()
            .unwrap();
        (registry.get("stub").unwrap().clone(), calls)
    }

    fn swap_schema() -> Value {
        schema_for!(SwapParams).to_value()
    }

    #[tokio::test]
    async fn test_missing_required_field_never_invokes() {
        let (tool, calls) = descriptor(swap_schema());
        let raw = json!({
            "action": "getQuote",
            "coinInType": "0x2::sui::SUI",
            "amount": "1.5"
        });

        let err = validate(&tool, &raw).unwrap_err();
        assert_eq!(err.fields(), ["coinOutType"]);
        assert!(err.to_string().contains("coinOutType"));

        // The validated path is the only way into the invoker.
        if let Ok(args) = validate(&tool, &raw) {
            invoke(&tool, args).await;
        }
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_valid_arguments_pass_through() {
        let (tool, _) = descriptor(swap_schema());
        let raw = json!({
            "action": "executeSwap",
            "coinInType": "0x2::sui::SUI",
            "coinOutType": "0xdba3::usdc::USDC",
            "amount": "2",
            "slippage": 0.01
        });
        let args = validate(&tool, &raw).unwrap();
        assert_eq!(args, raw);

        // Optional fields may be omitted or null.
        let mut raw = raw;
        raw["slippage"] = Value::Null;
        assert_eq!(validate(&tool, &raw).unwrap(), raw);
    }

    #[test]
    fn test_enum_and_type_mismatch() {
        let (tool, _) = descriptor(swap_schema());
        let raw = json!({
            "action": "bridge",
            "coinInType": "0x2::sui::SUI",
            "coinOutType": 7,
            "amount": "2",
            "slippage": 3.0
        });
        let err = validate(&tool, &raw).unwrap_err();
        let mut fields = err.fields();
        fields.sort_unstable();
        assert_eq!(fields, ["action", "coinOutType", "slippage"]);
    }

    #[test]
    fn test_unknown_field_rejected() {
        let (tool, _) = descriptor(json!({
            "type": "object",
            "properties": { "to": { "type": "string" } },
            "required": ["to"]
        }));
        let err =
            validate(&tool, &json!({ "to": "0x1", "memo": "hi" })).unwrap_err();
        assert_eq!(err.fields(), ["memo"]);
        assert_eq!(err.violations[0].expected, "no such field");
    }

    #[test]
    fn test_arrays_and_non_objects() {
        let (tool, _) = descriptor(schema_for!(PriceParams).to_value());
        let err = validate(&tool, &json!({ "coins": [] })).unwrap_err();
        assert_eq!(err.fields(), ["coins"]);

        let err =
            validate(&tool, &json!({ "coins": ["SUI", 1] })).unwrap_err();
        assert_eq!(err.fields(), ["coins[1]"]);

        let err = validate(&tool, &json!("SUI")).unwrap_err();
        assert_eq!(err.fields(), [""]);
    }

    #[test]
    fn test_integer_bounds() {
        let (tool, _) = descriptor(json!({
            "type": "object",
            "properties": {
                "amount": { "type": "integer", "minimum": 0 }
            },
            "required": ["amount"]
        }));
        assert!(validate(&tool, &json!({ "amount": 1000 })).is_ok());
        assert!(validate(&tool, &json!({ "amount": 10.0 })).is_ok());
        assert!(validate(&tool, &json!({ "amount": 1.5 })).is_err());
        assert!(validate(&tool, &json!({ "amount": -1 })).is_err());
    }
}
