//! Current local date and time

use crate::base::{Result, Tool};
use async_trait::async_trait;
use serde_json::{json, Value};

/// Reports the local wall-clock time
pub struct CurrentTimeTool;

#[async_trait]
impl Tool for CurrentTimeTool {
    fn name(&self) -> &str {
        "get_current_time"
    }

    fn description(&self) -> &str {
        "Get the current date and time"
    }

    fn parameters(&self) -> Value {
        json!({"type": "object", "properties": {}, "required": []})
    }

    async fn execute(&self, _args: Value) -> Result<String> {
        let now = chrono::Local::now();
        Ok(format!("Current time: {}", now.format("%Y-%m-%d %H:%M:%S")))
    }
}
