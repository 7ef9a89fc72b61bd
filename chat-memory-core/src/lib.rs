//! Core types for chat-memory
//!
//! This crate provides the session memory store (volatile and durable
//! variants), configuration loading, error types and logging setup
//! shared by the other chat-memory crates.

pub mod config;
pub mod error;
pub mod logging;
pub mod session;
pub mod utils;

pub use error::{Error, Result};
