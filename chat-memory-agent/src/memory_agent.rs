//! Memory agent: one conversation turn against a session store

use chat_memory_core::config::Config;
use chat_memory_core::session::{Role, SessionStore};
use chat_memory_core::utils::truncate;
use chat_memory_core::{Error, Result};
use chat_memory_providers::{LLMProvider, LLMResponse, Message};
use chat_memory_tools::ToolRegistry;
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::context::ContextBuilder;
use crate::retry::RetryPolicy;

const DEFAULT_RECENT_WINDOW: usize = 5;
const DEFAULT_MAX_TOKENS: u32 = 1024;
const DEFAULT_TEMPERATURE: f32 = 0.7;

/// Result of a single [`MemoryAgent::process`] call
#[derive(Debug, Clone, PartialEq)]
pub struct TurnOutcome {
    /// The assistant message recorded for this turn
    pub reply: String,
    /// Memory summary the prompt was built with
    pub summary: String,
    /// Retained messages in the session after the turn
    pub history_len: usize,
    /// Model calls made, including retries
    pub attempts: u32,
    /// Every attempt failed and `reply` carries the error text
    pub failed: bool,
    /// Tools run for the reply, rendered as `name(arguments)`
    pub tools_used: Vec<String>,
}

/// What one successful model exchange produced
struct Reply {
    text: String,
    tools_used: Vec<String>,
}

/// Records conversation turns in a [`SessionStore`] and answers them with an
/// [`LLMProvider`], feeding recent history back into each prompt.
pub struct MemoryAgent {
    store: Arc<dyn SessionStore>,
    provider: Arc<dyn LLMProvider>,
    context: ContextBuilder,
    retry: RetryPolicy,
    model: String,
    max_tokens: u32,
    temperature: f32,
    recent_window: usize,
    tools: Option<Arc<ToolRegistry>>,
}

impl MemoryAgent {
    /// Create a new agent with default generation and retry settings
    pub fn new(store: Arc<dyn SessionStore>, provider: Arc<dyn LLMProvider>) -> Self {
        let model = provider.get_default_model();
        Self {
            store,
            provider,
            context: ContextBuilder::new(),
            retry: RetryPolicy::default(),
            model,
            max_tokens: DEFAULT_MAX_TOKENS,
            temperature: DEFAULT_TEMPERATURE,
            recent_window: DEFAULT_RECENT_WINDOW,
            tools: None,
        }
    }

    /// Create a new agent configured from the `provider`, `agent` and
    /// `memory` sections. The built-in tools are offered unless
    /// `agent.enable_tools` is off.
    pub fn from_config(
        store: Arc<dyn SessionStore>,
        provider: Arc<dyn LLMProvider>,
        config: &Config,
    ) -> Self {
        let agent = Self::new(store, provider)
            .with_model(config.provider.model.clone())
            .with_generation(config.provider.max_tokens, config.provider.temperature)
            .with_retry(RetryPolicy::from(&config.agent))
            .with_recent_window(config.memory.recent_window);

        if config.agent.enable_tools {
            agent.with_tools(Arc::new(ToolRegistry::with_builtins()))
        } else {
            agent
        }
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    pub fn with_generation(mut self, max_tokens: u32, temperature: f32) -> Self {
        self.max_tokens = max_tokens;
        self.temperature = temperature;
        self
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Number of messages, including the current input, read back for context
    pub fn with_recent_window(mut self, recent_window: usize) -> Self {
        self.recent_window = recent_window.max(1);
        self
    }

    pub fn with_context(mut self, context: ContextBuilder) -> Self {
        self.context = context;
        self
    }

    /// Offer `tools` to the model on the first call of each turn
    pub fn with_tools(mut self, tools: Arc<ToolRegistry>) -> Self {
        self.tools = Some(tools).filter(|tools| !tools.is_empty());
        self
    }

    pub fn tools(&self) -> Option<&Arc<ToolRegistry>> {
        self.tools.as_ref()
    }

    /// The store this agent records turns in
    pub fn store(&self) -> &Arc<dyn SessionStore> {
        &self.store
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    /// Process one user input for `session_id`.
    ///
    /// The input is recorded before the model is called. A model failure that
    /// survives every retry is recorded as an `"Error: ..."` assistant message
    /// and reported through [`TurnOutcome::failed`]; only store failures are
    /// returned as `Err`. Tool calls and their results are not recorded,
    /// only the final answer is.
    pub async fn process(&self, session_id: &str, input: &str) -> Result<TurnOutcome> {
        info!(
            "Processing message for session {}: {}",
            session_id,
            truncate(input, 80)
        );

        self.store.append(session_id, Role::User, input)?;

        let mut recent = self.store.recent(session_id, self.recent_window)?;
        // Drop the input just recorded; it is rendered separately
        recent.pop();
        let summary = self.store.summarize(session_id)?;

        let messages = self.context.build_messages(&recent, input, &summary);
        let (result, attempts) = self.invoke_with_retry(messages).await;

        let (reply, tools_used, failed) = match result {
            Ok(Reply { text, tools_used }) => (text, tools_used, false),
            Err(e) => {
                warn!(
                    "Model call for session {} failed after {} attempts: {}",
                    session_id, attempts, e
                );
                (failure_reply(&e), Vec::new(), true)
            }
        };

        self.store.append(session_id, Role::Assistant, &reply)?;
        let history_len = self.store.history(session_id)?.len();

        info!(
            "Response to session {}: {}",
            session_id,
            truncate(&reply, 120)
        );

        Ok(TurnOutcome {
            reply,
            summary,
            history_len,
            attempts,
            failed,
            tools_used,
        })
    }

    async fn invoke_with_retry(&self, messages: Vec<Message>) -> (Result<Reply>, u32) {
        let mut attempt = 1;
        loop {
            debug!("Model attempt {}/{}", attempt, self.retry.max_retries);
            let result = self.invoke(messages.clone()).await;

            match result {
                Ok(reply) => return (Ok(reply), attempt),
                Err(e) if self.retry.should_retry(attempt) => {
                    let delay = self.retry.delay_for(attempt);
                    warn!(
                        "Model attempt {} failed: {}; retrying in {:?}",
                        attempt, e, delay
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(e) => return (Err(e), attempt),
            }
        }
    }

    /// One exchange: a call offering the tools, then, if the model asked for
    /// any, a single round of tool execution and a final call without tools.
    async fn invoke(&self, mut messages: Vec<Message>) -> Result<Reply> {
        let definitions = self.tools.as_ref().map(|tools| tools.get_definitions());
        let response = self.chat(messages.clone(), definitions).await?;

        let tools_used = match &self.tools {
            Some(tools) if response.has_tool_calls() => {
                messages.push(Message::assistant_tool_calls(
                    response.content.clone(),
                    response.tool_calls.clone(),
                ));

                let mut tools_used = Vec::with_capacity(response.tool_calls.len());
                for call in &response.tool_calls {
                    let args = call.arguments_value();
                    debug!("Executing tool {} with arguments {}", call.name, args);
                    tools_used.push(format!("{}({})", call.name, args));
                    let result = tools.execute(&call.name, args).await;
                    messages.push(Message::tool(result, call.id.clone()));
                }
                tools_used
            }
            _ => {
                return Ok(Reply {
                    text: non_empty(response.content, &response.finish_reason)?,
                    tools_used: Vec::new(),
                });
            }
        };

        info!("Tools used: {}", tools_used.join(", "));
        let response = self.chat(messages, None).await?;
        Ok(Reply {
            text: non_empty(response.content, &response.finish_reason)?,
            tools_used,
        })
    }

    async fn chat(
        &self,
        messages: Vec<Message>,
        tools: Option<Vec<serde_json::Value>>,
    ) -> Result<LLMResponse> {
        self.provider
            .chat(
                messages,
                tools,
                Some(self.model.clone()),
                self.max_tokens,
                self.temperature,
            )
            .await
            .map_err(|e| Error::Provider(e.to_string()))
    }
}

fn non_empty(content: Option<String>, finish_reason: &str) -> Result<String> {
    match content {
        Some(content) if !content.trim().is_empty() => Ok(content),
        _ => Err(Error::Provider(format!(
            "empty response (finish_reason: {})",
            finish_reason
        ))),
    }
}

fn failure_reply(err: &Error) -> String {
    match err {
        Error::Provider(reason) => format!("Error: {}", reason),
        other => format!("Error: {}", other),
    }
}
