//! Offline stand-in for a web search

use crate::base::{string_arg, Result, Tool};
use async_trait::async_trait;
use serde_json::{json, Value};

/// Canned answers, checked in order against the lowercased query
const CANNED_RESULTS: &[(&str, &str)] = &[
    ("weather", "Today's weather: Sunny, 25°C with light breeze"),
    ("news", "Latest news: Technology sector shows growth in Q4"),
    (
        "python",
        "Python is a high-level programming language known for simplicity",
    ),
    ("ai", "AI developments continue to advance with new LLM models"),
    (
        "stock",
        "Stock market: Mixed performance with tech stocks leading",
    ),
];

/// Answers searches from a fixed keyword table without touching the network
pub struct SearchSimulatorTool;

#[async_trait]
impl Tool for SearchSimulatorTool {
    fn name(&self) -> &str {
        "web_search_simulator"
    }

    fn description(&self) -> &str {
        "Simulate a web search. Knows a little about weather, news, python, ai and stocks."
    }

    fn parameters(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "query": {
                    "type": "string",
                    "description": "What to search for"
                }
            },
            "required": ["query"]
        })
    }

    async fn execute(&self, args: Value) -> Result<String> {
        let query = string_arg(&args, "query")?;
        let lowered = query.to_lowercase();
        let result = CANNED_RESULTS
            .iter()
            .find(|(keyword, _)| lowered.contains(keyword))
            .map(|(_, result)| *result)
            .unwrap_or("No specific information found in simulation");
        Ok(format!("Search result for '{}': {}", query, result))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn search(query: &str) -> String {
        SearchSimulatorTool
            .execute(json!({ "query": query }))
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_keyword_match_is_case_insensitive() {
        assert_eq!(
            search("Python programming").await,
            "Search result for 'Python programming': \
             Python is a high-level programming language known for simplicity"
        );
        assert!(search("WEATHER today").await.contains("Sunny, 25°C"));
    }

    #[tokio::test]
    async fn test_first_keyword_in_table_order_wins() {
        // "news" precedes "ai" in the table
        assert!(search("ai news").await.contains("Technology sector"));
    }

    #[tokio::test]
    async fn test_unknown_query() {
        assert_eq!(
            search("quantum gardening").await,
            "Search result for 'quantum gardening': No specific information found in simulation"
        );
    }
}
