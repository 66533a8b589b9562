//! Polymarket Agent — command-line entry point.
//!
//! Loads configuration, initialises structured logging, and either answers a
//! single question (optionally streamed), prints the capability record, or
//! runs the HTTP server.

use std::io::Write;
use std::sync::Arc;

use anyhow::Result;
use clap::{Parser, Subcommand};
use futures::StreamExt;
use tracing::info;

use polymarket_agent::agent::PolymarketAgent;
use polymarket_agent::config::AppConfig;
use polymarket_agent::server;
use polymarket_agent::types::StreamEvent;

#[derive(Debug, Parser)]
#[command(name = "polymarket-agent", version, about = "Ask questions about Polymarket prediction markets")]
struct Cli {
    /// Path to the TOML configuration file.
    #[arg(long, env = "POLYMARKET_AGENT_CONFIG", default_value = "config.toml")]
    config: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Answer one question.
    Ask {
        /// The question, e.g. "what are the odds for the next Fed cut?"
        #[arg(required = true, trailing_var_arg = true)]
        query: Vec<String>,

        /// Print content and tool activity as it happens.
        #[arg(long)]
        stream: bool,

        /// Reuse a conversation so follow-up questions see earlier answers.
        #[arg(long)]
        conversation_id: Option<String>,
    },
    /// Print the agent's capability record as JSON.
    Capabilities,
    /// Serve the agent over HTTP.
    Serve {
        /// Overrides `server.port` from the config file.
        #[arg(long)]
        port: Option<u16>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present (non-fatal if missing)
    let _ = dotenv::dotenv();

    let cli = Cli::parse();
    init_logging();

    match cli.command {
        Command::Capabilities => {
            let caps = PolymarketAgent::capabilities();
            println!("{}", serde_json::to_string_pretty(&caps)?);
        }
        Command::Ask { query, stream, conversation_id } => {
            let (_, agent) = build_agent(&cli.config)?;
            let query = query.join(" ");
            if stream {
                let conversation_id =
                    conversation_id.unwrap_or_else(|| uuid::Uuid::new_v4().to_string());
                let task_id = uuid::Uuid::new_v4().to_string();
                print_stream(&agent, query, conversation_id, task_id).await?;
            } else {
                println!("{}", agent.run(&query).await);
            }
        }
        Command::Serve { port } => {
            let (cfg, agent) = build_agent(&cli.config)?;
            let port = port.unwrap_or(cfg.server.port);
            server::serve(Arc::new(agent), port).await?;
        }
    }

    Ok(())
}

/// Load configuration and construct the agent.
fn build_agent(config_path: &str) -> Result<(AppConfig, PolymarketAgent)> {
    let cfg = AppConfig::load_or_default(config_path)?;
    info!(
        agent_name = %cfg.agent.name,
        model = %cfg.llm.model,
        gamma = %cfg.polymarket.gamma_base_url,
        "Polymarket agent starting up"
    );

    let agent = PolymarketAgent::from_config(&cfg)?;
    Ok((cfg, agent))
}

/// Render a stream to the terminal: answer text on stdout, tool activity on stderr.
async fn print_stream(
    agent: &PolymarketAgent,
    query: String,
    conversation_id: String,
    task_id: String,
) -> Result<()> {
    let events = agent.stream(query, conversation_id, task_id);
    futures::pin_mut!(events);

    let mut stdout = std::io::stdout();
    while let Some(event) = events.next().await {
        match event {
            StreamEvent::MessageChunk { content } => {
                write!(stdout, "{content}")?;
                stdout.flush()?;
            }
            StreamEvent::ToolCallStarted { tool_name, .. } => {
                eprintln!("[tool] {tool_name} ...");
            }
            StreamEvent::ToolCallCompleted { tool_name, result, .. } => {
                eprintln!("[tool] {tool_name} done ({} bytes)", result.len());
            }
            StreamEvent::Done => writeln!(stdout)?,
            StreamEvent::Error { content } => eprintln!("{content}"),
        }
    }

    Ok(())
}

/// Initialise the `tracing` subscriber. Logs go to stderr so answers on
/// stdout stay clean.
fn init_logging() {
    use tracing_subscriber::{fmt, EnvFilter};

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("polymarket_agent=info"));

    let json_logging = std::env::var("POLYMARKET_AGENT_LOG_JSON").is_ok();

    if json_logging {
        fmt()
            .json()
            .with_env_filter(env_filter)
            .with_target(true)
            .with_writer(std::io::stderr)
            .init();
    } else {
        fmt()
            .with_env_filter(env_filter)
            .with_target(true)
            .with_writer(std::io::stderr)
            .init();
    }
}
