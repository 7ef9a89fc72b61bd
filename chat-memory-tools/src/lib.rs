//! Built-in tools for chat-memory
//!
//! Tools are offered to the model as OpenAI function schemas. The agent runs
//! whatever the model asks for through a [`ToolRegistry`] and feeds the text
//! results back before the final answer.

pub mod base;
pub mod calculator;
pub mod clock;
pub mod registry;
pub mod search;

pub use base::{Tool, ToolError};
pub use calculator::CalculatorTool;
pub use clock::CurrentTimeTool;
pub use registry::ToolRegistry;
pub use search::SearchSimulatorTool;
