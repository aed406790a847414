//! Argument checks performed before a handler runs.

use crate::registry::ToolName;
use crate::ToolError;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use slack_sage_core::UpstreamCredential;

const TOKEN_FIELD: &str = "token";

/// Arguments that satisfied their tool's input contract. Fields outside the
/// contract are kept as given.
#[derive(Debug, Clone)]
pub struct ValidatedArguments {
    tool: ToolName,
    arguments: Map<String, Value>,
}

impl ValidatedArguments {
    pub fn tool(&self) -> ToolName {
        self.tool
    }

    pub fn credential(&self) -> Result<UpstreamCredential, ToolError> {
        let raw = self
            .arguments
            .get(TOKEN_FIELD)
            .and_then(Value::as_str)
            .ok_or_else(|| missing(TOKEN_FIELD))?;
        UpstreamCredential::new(raw)
            .map_err(|_| ToolError::InvalidArgument(format!("field '{TOKEN_FIELD}' cannot be empty")))
    }

    pub fn parse<T: DeserializeOwned>(&self) -> Result<T, ToolError> {
        serde_json::from_value(Value::Object(self.arguments.clone()))
            .map_err(|e| ToolError::InvalidArgument(e.to_string()))
    }
}

/// Resolves `tool_name` and checks every declared field: required fields
/// must be present and non-null, and any declared field that is present must
/// carry its declared primitive type.
pub fn validate(
    tool_name: &str,
    arguments: Map<String, Value>,
) -> Result<ValidatedArguments, ToolError> {
    let tool =
        ToolName::parse(tool_name).ok_or_else(|| ToolError::UnknownTool(tool_name.to_string()))?;

    for field in tool.descriptor().input_contract {
        match arguments.get(field.name) {
            None | Some(Value::Null) if field.required => return Err(missing(field.name)),
            None | Some(Value::Null) => {}
            Some(value) if !field.kind.accepts(value) => {
                return Err(ToolError::InvalidArgument(format!(
                    "field '{}' must be a {}",
                    field.name,
                    field.kind.as_str()
                )));
            }
            Some(_) => {}
        }
    }

    Ok(ValidatedArguments { tool, arguments })
}

fn missing(field: &str) -> ToolError {
    ToolError::InvalidArgument(format!("missing required field '{field}'"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn args(value: Value) -> Map<String, Value> {
        match value {
            Value::Object(map) => map,
            _ => panic!("test arguments must be an object"),
        }
    }

    #[test]
    fn accepts_complete_arguments() {
        let validated = validate(
            "search_messages",
            args(json!({"query": "deploy", "count": 5, "token": "xoxb-1"})),
        )
        .unwrap();
        assert_eq!(validated.tool(), ToolName::SearchMessages);
        assert_eq!(validated.credential().unwrap().expose(), "xoxb-1");
    }

    #[test]
    fn rejects_unknown_tool() {
        let err = validate("nope", Map::new()).unwrap_err();
        assert_eq!(err.to_string(), "Unknown tool: nope");
    }

    #[test]
    fn rejects_missing_required_field() {
        let err = validate("get_thread", args(json!({"channel": "C1", "token": "t"}))).unwrap_err();
        assert!(matches!(err, ToolError::InvalidArgument(_)));
        assert!(err.to_string().contains("threadTs"));
    }

    #[test]
    fn null_required_field_counts_as_missing() {
        let err = validate(
            "create_reminder",
            args(json!({"text": "standup", "time": null, "token": "t"})),
        )
        .unwrap_err();
        assert!(err.to_string().contains("'time'"));
    }

    #[test]
    fn rejects_wrong_primitive_type() {
        let err = validate(
            "get_channel_history",
            args(json!({"channel": "C1", "limit": "ten", "token": "t"})),
        )
        .unwrap_err();
        assert_eq!(
            err.to_string(),
            "Invalid argument: field 'limit' must be a number"
        );
    }

    #[test]
    fn tolerates_and_keeps_unknown_fields() {
        let validated = validate(
            "post_message",
            args(json!({"channel": "C1", "text": "hi", "token": "t", "unfurl": true})),
        )
        .unwrap();
        let kept: Map<String, Value> = validated.parse().unwrap();
        assert_eq!(kept["unfurl"], json!(true));
    }

    #[test]
    fn blank_token_is_invalid() {
        let validated = validate(
            "post_message",
            args(json!({"channel": "C1", "text": "hi", "token": ""})),
        )
        .unwrap();
        assert!(matches!(
            validated.credential(),
            Err(ToolError::InvalidArgument(_))
        ));
    }
}
