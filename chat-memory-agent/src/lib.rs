//! Agent logic for chat-memory
//!
//! This crate wires a [`SessionStore`](chat_memory_core::session::SessionStore)
//! to an [`LLMProvider`](chat_memory_providers::LLMProvider): it records each
//! turn, builds a context prompt from recent history, runs one round of
//! built-in tools when the model asks for them and retries failed model calls
//! with exponential backoff.

pub mod context;
pub mod memory_agent;
pub mod retry;

pub use context::ContextBuilder;
pub use memory_agent::{MemoryAgent, TurnOutcome};
pub use retry::RetryPolicy;
