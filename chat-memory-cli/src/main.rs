//! CLI entry point for chat-memory

mod commands;
mod repl;

use anyhow::Result;
use chat_memory_agent::MemoryAgent;
use chat_memory_core::config::{Config, ConfigLoader, MemoryBackend};
use chat_memory_core::logging::init_logging;
use chat_memory_core::session::{open_store, SessionStore};
use chat_memory_core::utils::expand_tilde;
use chat_memory_providers::OpenAICompatClient;
use clap::{Parser, Subcommand};
use console::style;
use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{info, warn};

use crate::repl::{Flow, Repl};

#[derive(Parser)]
#[command(name = "chat-memory")]
#[command(about = "Chat with a model that remembers each session")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Configuration directory
    #[arg(short, long, global = true)]
    config_dir: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Write a default configuration file
    Init {
        /// Replace an existing configuration file
        #[arg(long)]
        force: bool,
    },
    /// Start an interactive chat (default)
    Chat {
        /// Session to start in
        #[arg(short, long)]
        session: Option<String>,
        /// Memory backend (volatile or durable)
        #[arg(short, long)]
        backend: Option<MemoryBackend>,
    },
    /// Send a single message; the turn is kept in durable memory
    Ask {
        /// Message to send
        #[arg(short, long)]
        message: String,
        /// Session key for conversation continuity
        #[arg(short, long, default_value = "default")]
        session: String,
    },
    /// List durable sessions
    Sessions,
    /// Remove every message from a durable session
    Clear {
        #[arg(short, long)]
        session: String,
    },
    /// Delete a durable session
    Delete {
        #[arg(short, long)]
        session: String,
    },
    /// Show status information
    Status,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();

    let cli = Cli::parse();

    let config_loader = if let Some(dir) = cli.config_dir {
        ConfigLoader::with_dir(dir)
    } else {
        ConfigLoader::new()
    };

    // Runs before loading so a broken config file can be replaced
    if let Some(Commands::Init { force }) = cli.command {
        return run_init(&config_loader, force);
    }

    let config = config_loader.load()?;
    let _log_guard = init_logging(&config.logging);

    match cli.command.unwrap_or(Commands::Chat {
        session: None,
        backend: None,
    }) {
        Commands::Chat { session, backend } => {
            info!("Starting interactive chat");
            run_chat(config, session, backend).await?;
        }
        Commands::Ask { message, session } => {
            info!("Processing single message for session {}", session);
            run_ask(config, &message, &session).await?;
        }
        Commands::Sessions => run_sessions(&config)?,
        Commands::Clear { session } => run_clear(&config, &session)?,
        Commands::Delete { session } => run_delete(&config, &session)?,
        Commands::Status => run_status(&config_loader, &config)?,
        // Handled before the config is loaded
        Commands::Init { .. } => {}
    }

    Ok(())
}

fn run_init(loader: &ConfigLoader, force: bool) -> Result<()> {
    let config_path = loader.config_path();
    if config_path.exists() && !force {
        println!(
            "{} Configuration already exists at {} (use --force to overwrite)",
            style("✗").red(),
            config_path.display()
        );
        return Ok(());
    }

    let config = Config::default();
    loader.save(&config)?;

    println!(
        "{} Configuration saved to {}",
        style("✓").green().bold(),
        config_path.display()
    );
    println!("Set GEMINI_API_KEY or provider.api_key, then run:");
    println!("  {} - Start chatting", style("chat-memory chat").cyan());
    Ok(())
}

fn build_provider(config: &Config) -> Result<OpenAICompatClient> {
    let api_key = Some(config.provider.api_key.clone()).filter(|key| !key.trim().is_empty());
    if api_key.is_none() {
        warn!("No API key configured; set GEMINI_API_KEY or provider.api_key");
    }
    let extra_headers = config
        .provider
        .extra_headers
        .clone()
        .filter(|headers| !headers.is_empty());

    Ok(OpenAICompatClient::new(
        api_key,
        config.provider.api_base.clone(),
        config.provider.model.clone(),
        extra_headers,
        Duration::from_secs(config.provider.timeout_secs),
    )?)
}

fn durable_store(config: &Config) -> Result<Arc<dyn SessionStore>> {
    let mut memory = config.memory.clone();
    memory.backend = MemoryBackend::Durable;
    Ok(open_store(&memory)?)
}

fn build_agent(config: &Config, store: Arc<dyn SessionStore>) -> Result<MemoryAgent> {
    let provider = Arc::new(build_provider(config)?);
    Ok(MemoryAgent::from_config(store, provider, config))
}

async fn run_chat(
    mut config: Config,
    session: Option<String>,
    backend: Option<MemoryBackend>,
) -> Result<()> {
    if let Some(backend) = backend {
        config.memory.backend = backend;
    }
    let store = open_store(&config.memory)?;
    let agent = build_agent(&config, store)?;
    let mut repl = Repl::new(agent, session, std::io::stdout())?;

    println!("{}", style("chat-memory").bold().cyan());
    println!(
        "Memory: {} (max {} messages per session), model: {}",
        config.memory.backend, config.memory.max_history, config.provider.model
    );
    repl.print_help()?;
    println!("Current session: {}", style(repl.current_session()).cyan());

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        print!("{}", repl.prompt());
        std::io::stdout().flush()?;

        let Some(line) = lines.next_line().await? else {
            println!();
            break;
        };
        if repl.handle_line(&line).await? == Flow::Exit {
            break;
        }
    }

    println!("{}", style("Goodbye!").green());
    Ok(())
}

async fn run_ask(config: Config, message: &str, session: &str) -> Result<()> {
    let store = durable_store(&config)?;
    let agent = build_agent(&config, store)?;

    println!("{}", style("Processing...").cyan());
    let outcome = agent.process(session, message).await?;

    println!("\n{}", style("Response:").bold());
    println!("{}", outcome.reply);
    if !outcome.tools_used.is_empty() {
        println!("Tools used: {}", outcome.tools_used.join(", "));
    }
    println!("{}", style(&outcome.summary).dim());
    println!("Messages in session: {}", outcome.history_len);

    if outcome.failed {
        anyhow::bail!("Model call failed after {} attempts", outcome.attempts);
    }
    Ok(())
}

fn run_sessions(config: &Config) -> Result<()> {
    let store = durable_store(config)?;
    let sessions = store.list_sessions()?;

    println!("{}", style("Sessions").bold().cyan());
    if sessions.is_empty() {
        println!("  No sessions found.");
        return Ok(());
    }
    for session in sessions {
        println!(
            "  {} ({} messages, last active {})",
            style(&session.id).bold(),
            session.message_count,
            session.last_active_at.format("%Y-%m-%d %H:%M:%S")
        );
        println!("    {}", store.summarize(&session.id)?);
    }
    Ok(())
}

fn run_clear(config: &Config, session: &str) -> Result<()> {
    let store = durable_store(config)?;
    store.clear(session)?;
    println!("{} Cleared session {}", style("✓").green().bold(), session);
    Ok(())
}

fn run_delete(config: &Config, session: &str) -> Result<()> {
    let store = durable_store(config)?;
    if store.delete(session)? {
        println!("{} Deleted session {}", style("✓").green().bold(), session);
    } else {
        println!("{} Session {} not found", style("✗").red(), session);
    }
    Ok(())
}

fn run_status(loader: &ConfigLoader, config: &Config) -> Result<()> {
    println!("{}", style("chat-memory Status").bold().cyan());
    println!("Version: {}\n", env!("CARGO_PKG_VERSION"));

    println!("{}", style("Configuration:").bold());
    println!("  Config directory: {}", loader.config_dir().display());
    println!(
        "  Storage directory: {}",
        expand_tilde(&config.memory.storage_dir).display()
    );
    println!("  Memory backend: {}", config.memory.backend);
    println!("  Max history: {}", config.memory.max_history);
    println!();

    println!("{}", style("Provider:").bold());
    println!("  Model: {}", config.provider.model);
    let status = if config.provider.api_key.trim().is_empty() {
        style("not configured").red()
    } else {
        style("configured").green()
    };
    println!("  API key: {}", status);
    println!(
        "  Tools: {}",
        if config.agent.enable_tools {
            "enabled"
        } else {
            "disabled"
        }
    );

    Ok(())
}
