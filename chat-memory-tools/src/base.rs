//! Base trait for tools

use async_trait::async_trait;
use serde_json::Value;

/// Trait for tools
#[async_trait]
pub trait Tool: Send + Sync {
    /// Get the tool name
    fn name(&self) -> &str;

    /// Get the tool description
    fn description(&self) -> &str;

    /// Get the tool parameters schema (JSON Schema format)
    fn parameters(&self) -> Value;

    /// Execute the tool with arguments
    async fn execute(&self, args: Value) -> Result<String>;

    /// Check `params` is an object carrying every required field
    fn validate_params(&self, params: &Value) -> Vec<String> {
        let Some(params_obj) = params.as_object() else {
            return vec!["Parameters must be an object".to_string()];
        };

        let schema = self.parameters();
        let Some(required) = schema.get("required").and_then(|r| r.as_array()) else {
            return Vec::new();
        };

        required
            .iter()
            .filter_map(|field| field.as_str())
            .filter(|field| !params_obj.contains_key(*field))
            .map(|field| format!("Missing required field: {}", field))
            .collect()
    }

    /// Convert tool to OpenAI function schema format
    fn to_schema(&self) -> Value {
        serde_json::json!({
            "type": "function",
            "function": {
                "name": self.name(),
                "description": self.description(),
                "parameters": self.parameters(),
            }
        })
    }
}

/// Read a required string argument
pub fn string_arg<'a>(args: &'a Value, key: &str) -> Result<&'a str> {
    args.get(key)
        .and_then(|v| v.as_str())
        .ok_or_else(|| ToolError::InvalidParams(format!("Missing '{}' parameter", key)))
}

/// Tool errors
#[derive(Debug, thiserror::Error)]
pub enum ToolError {
    #[error("Invalid parameters: {0}")]
    InvalidParams(String),

    #[error("Execution failed: {0}")]
    ExecutionFailed(String),
}

pub type Result<T> = std::result::Result<T, ToolError>;

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    struct EchoTool;

    #[async_trait]
    impl Tool for EchoTool {
        fn name(&self) -> &str {
            "echo"
        }

        fn description(&self) -> &str {
            "Repeat the text"
        }

        fn parameters(&self) -> Value {
            json!({
                "type": "object",
                "properties": {"text": {"type": "string"}},
                "required": ["text"]
            })
        }

        async fn execute(&self, args: Value) -> Result<String> {
            Ok(string_arg(&args, "text")?.to_string())
        }
    }

    #[test]
    fn test_validate_params() {
        assert!(EchoTool.validate_params(&json!({"text": "hi"})).is_empty());
        assert_eq!(
            EchoTool.validate_params(&json!({})),
            vec!["Missing required field: text"]
        );
        assert_eq!(
            EchoTool.validate_params(&json!("text")),
            vec!["Parameters must be an object"]
        );
    }

    #[test]
    fn test_schema_shape() {
        let schema = EchoTool.to_schema();
        assert_eq!(schema["type"], "function");
        assert_eq!(schema["function"]["name"], "echo");
        assert_eq!(schema["function"]["parameters"]["required"][0], "text");
    }

    #[tokio::test]
    async fn test_string_arg_type_mismatch() {
        let err = EchoTool.execute(json!({"text": 5})).await.unwrap_err();
        assert!(matches!(err, ToolError::InvalidParams(_)));
    }
}
