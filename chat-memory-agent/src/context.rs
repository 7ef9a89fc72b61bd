//! Context builder for assembling prompts

use chat_memory_core::session::ChatMessage;
use chat_memory_providers::Message;

const SYSTEM_PROMPT: &str = "You are a helpful assistant with memory of the current conversation. \
Use the recent context and memory summary you are given to keep your answers consistent.";

/// Builds the context for LLM requests
#[derive(Debug, Clone)]
pub struct ContextBuilder {
    system_prompt: String,
}

impl ContextBuilder {
    /// Create a new context builder with the default system prompt
    pub fn new() -> Self {
        Self {
            system_prompt: SYSTEM_PROMPT.to_string(),
        }
    }

    /// Create a new context builder with a custom system prompt
    pub fn with_system_prompt(system_prompt: impl Into<String>) -> Self {
        Self {
            system_prompt: system_prompt.into(),
        }
    }

    pub fn system_prompt(&self) -> &str {
        &self.system_prompt
    }

    /// Render prior messages, the current input and the memory summary into
    /// a single user prompt. `recent` must not contain the current input.
    pub fn build_prompt(
        &self,
        recent: &[ChatMessage],
        current_input: &str,
        summary: &str,
    ) -> String {
        let mut lines = Vec::new();

        if !recent.is_empty() {
            lines.push("Recent conversation context:".to_string());
            for msg in recent {
                lines.push(format!("{}: {}", msg.role, msg.content));
            }
            lines.push(String::new());
        }

        lines.push(format!("Current user input: {}", current_input));
        lines.push(format!("Memory summary: {}", summary));
        lines.push(String::new());
        lines.push("Please respond naturally, considering the conversation context.".to_string());

        lines.join("\n")
    }

    /// Build the complete message list for an LLM call
    pub fn build_messages(
        &self,
        recent: &[ChatMessage],
        current_input: &str,
        summary: &str,
    ) -> Vec<Message> {
        vec![
            Message::system(self.system_prompt.clone()),
            Message::user(self.build_prompt(recent, current_input, summary)),
        ]
    }
}

impl Default for ContextBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chat_memory_core::session::{Role, EMPTY_SUMMARY};

    #[test]
    fn test_prompt_without_context() {
        let builder = ContextBuilder::new();
        let prompt = builder.build_prompt(&[], "Hello", EMPTY_SUMMARY);
        assert_eq!(
            prompt,
            "Current user input: Hello\n\
             Memory summary: New conversation started.\n\
             \n\
             Please respond naturally, considering the conversation context."
        );
    }

    #[test]
    fn test_prompt_with_context() {
        let builder = ContextBuilder::new();
        let recent = vec![
            ChatMessage::new(Role::User, "My name is Ada"),
            ChatMessage::new(Role::Assistant, "Nice to meet you, Ada"),
        ];
        let prompt = builder.build_prompt(&recent, "What is my name?", "summary");

        assert!(prompt.starts_with(
            "Recent conversation context:\n\
             user: My name is Ada\n\
             assistant: Nice to meet you, Ada\n\
             \n\
             Current user input: What is my name?\n"
        ));
        assert!(prompt.contains("Memory summary: summary\n"));
    }

    #[test]
    fn test_build_messages() {
        let builder = ContextBuilder::with_system_prompt("be brief");
        let messages = builder.build_messages(&[], "Hello", EMPTY_SUMMARY);
        assert_eq!(messages.len(), 2); // system + user
        assert_eq!(messages[0].role, "system");
        assert_eq!(messages[0].content, "be brief");
        assert_eq!(messages[1].role, "user");
        assert!(messages[1].content.contains("Current user input: Hello"));
    }
}
