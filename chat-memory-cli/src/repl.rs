//! Interactive chat loop dispatcher

use anyhow::Result;
use chat_memory_agent::MemoryAgent;
use chat_memory_core::session::SessionStore;
use console::style;
use std::io::Write;
use std::sync::Arc;
use tracing::{error, info};

use crate::commands::{ReplCommand, HELP};

/// What the caller should do after a line was handled
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Exit,
}

/// Generate a fresh session id from the local time
pub fn generate_session_id() -> String {
    chrono::Local::now()
        .format("session_%Y%m%d_%H%M%S")
        .to_string()
}

/// Runs [`ReplCommand`]s against the agent's store. Store failures are
/// printed and the session carries on; only output errors are returned.
pub struct Repl<W: Write> {
    agent: MemoryAgent,
    current: String,
    out: W,
}

impl<W: Write> Repl<W> {
    /// Create a dispatcher positioned on `session` (or a generated id)
    pub fn new(agent: MemoryAgent, session: Option<String>, out: W) -> Result<Self> {
        let current = session.unwrap_or_else(generate_session_id);
        agent.store().switch(&current)?;
        Ok(Self {
            agent,
            current,
            out,
        })
    }

    pub fn current_session(&self) -> &str {
        &self.current
    }

    pub fn prompt(&self) -> String {
        format!("[{}] You: ", self.current)
    }

    pub fn print_help(&mut self) -> Result<()> {
        writeln!(self.out, "{}", HELP)?;
        Ok(())
    }

    /// Handle one input line
    pub async fn handle_line(&mut self, line: &str) -> Result<Flow> {
        let command = ReplCommand::parse(line);
        let outcome = match command {
            ReplCommand::Empty => Ok(()),
            ReplCommand::Exit => return Ok(Flow::Exit),
            ReplCommand::Help => {
                self.print_help()?;
                Ok(())
            }
            ReplCommand::NewSession(name) => self.new_session(name),
            ReplCommand::Switch(name) => self.switch(name),
            ReplCommand::Sessions => self.sessions(),
            ReplCommand::Clear => self.clear(),
            ReplCommand::Stats => self.stats(),
            ReplCommand::Chat(text) => self.chat(&text).await,
        };

        if let Err(e) = outcome {
            match e.downcast::<chat_memory_core::Error>() {
                Ok(store_err) => {
                    error!("Session {} operation failed: {}", self.current, store_err);
                    writeln!(self.out, "{} {}", style("✗").red(), store_err)?;
                }
                Err(other) => return Err(other),
            }
        }
        Ok(Flow::Continue)
    }

    fn store(&self) -> &Arc<dyn SessionStore> {
        self.agent.store()
    }

    fn new_session(&mut self, name: Option<String>) -> Result<()> {
        let id = name.unwrap_or_else(generate_session_id);
        self.store().switch(&id)?;
        info!("Started session {}", id);
        self.current = id;
        writeln!(self.out, "New session started: {}", style(&self.current).cyan())?;
        Ok(())
    }

    fn switch(&mut self, name: Option<String>) -> Result<()> {
        let sessions: Vec<String> = self
            .store()
            .list_sessions()?
            .into_iter()
            .map(|s| s.id)
            .collect();

        match name.filter(|n| sessions.contains(n)) {
            Some(id) => {
                self.store().switch(&id)?;
                self.current = id;
                writeln!(self.out, "Switched to session: {}", style(&self.current).cyan())?;
            }
            None => {
                writeln!(
                    self.out,
                    "{} Session not found. Available sessions: {}",
                    style("✗").red(),
                    sessions.join(", ")
                )?;
            }
        }
        Ok(())
    }

    fn sessions(&mut self) -> Result<()> {
        let sessions = self.store().list_sessions()?;
        if sessions.is_empty() {
            writeln!(self.out, "No sessions yet.")?;
            return Ok(());
        }

        writeln!(self.out, "{}", style("Available sessions:").bold())?;
        for session in sessions {
            let summary = self.store().summarize(&session.id)?;
            let marker = if session.id == self.current { "*" } else { " " };
            writeln!(self.out, " {} {}: {}", marker, session.id, summary)?;
        }
        Ok(())
    }

    fn clear(&mut self) -> Result<()> {
        self.store().clear(&self.current)?;
        writeln!(self.out, "Session {} cleared", self.current)?;
        Ok(())
    }

    fn stats(&mut self) -> Result<()> {
        let stats = self.store().stats()?;
        writeln!(self.out, "{}", style("Memory Statistics:").bold())?;
        writeln!(self.out, "  Total sessions: {}", stats.total_sessions)?;
        writeln!(self.out, "  Total messages: {}", stats.total_messages)?;
        writeln!(
            self.out,
            "  Active sessions: {}",
            stats.active_sessions.join(", ")
        )?;
        Ok(())
    }

    async fn chat(&mut self, text: &str) -> Result<()> {
        let outcome = self.agent.process(&self.current, text).await?;

        let label = if outcome.failed {
            style("Assistant:").red().bold()
        } else {
            style("Assistant:").green().bold()
        };
        writeln!(self.out, "{} {}", label, outcome.reply)?;
        if !outcome.tools_used.is_empty() {
            writeln!(self.out, "Tools used: {}", outcome.tools_used.join(", "))?;
        }
        writeln!(self.out, "{}", style(&outcome.summary).dim())?;
        writeln!(self.out, "Messages in session: {}", outcome.history_len)?;
        Ok(())
    }
}
