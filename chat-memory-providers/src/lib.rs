//! LLM provider integration for chat-memory
//!
//! The session store never calls a model itself. Callers build a prompt from
//! stored history and hand it to an [`LLMProvider`].

pub mod base;
pub mod openai;

pub use base::{
    LLMProvider, LLMResponse, Message, ProviderError, ProviderResult, ToolCallRequest,
};
pub use openai::{OpenAICompatClient, GEMINI_OPENAI_BASE};
