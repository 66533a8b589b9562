//! The Polymarket agent.
//!
//! Wraps an `AgentRuntime`, registers the three market tools as its only
//! tools, and translates the runtime's events into the caller-facing
//! `StreamEvent` protocol. Neither entry point raises: `run` folds failures
//! into its text answer, `stream` ends with a single `Error` event.

pub mod prompts;
pub mod tools;

use std::sync::Arc;

use async_stream::stream;
use futures::{Stream, StreamExt};
use tracing::{debug, error, info};

use crate::config::AppConfig;
use crate::llm::openrouter::OpenRouterRuntime;
use crate::llm::{AgentRuntime, AgentSpec, RunEvent, RunOptions};
use crate::platforms::polymarket::MarketQueryClient;
use crate::types::{Capabilities, StreamEvent};

use prompts::AGENT_INSTRUCTIONS;
use tools::MarketTools;

/// Longest query prefix written to the logs.
const QUERY_LOG_CHARS: usize = 100;

pub struct PolymarketAgent {
    runtime: Arc<dyn AgentRuntime>,
    spec: AgentSpec,
}

impl PolymarketAgent {
    pub fn new(
        runtime: Arc<dyn AgentRuntime>,
        client: MarketQueryClient,
        model: impl Into<String>,
        add_datetime_to_context: bool,
    ) -> Self {
        let spec = AgentSpec {
            model: model.into(),
            tools: MarketTools::new(client).into_tools(),
            instructions: AGENT_INSTRUCTIONS.to_string(),
            add_datetime_to_context,
        };
        info!(model = %spec.model, tools = ?spec.tool_names(), "PolymarketAgent initialized with tools");

        Self { runtime, spec }
    }

    /// Wire up the OpenRouter runtime and Gamma client from configuration.
    pub fn from_config(cfg: &AppConfig) -> anyhow::Result<Self> {
        let runtime = OpenRouterRuntime::new(cfg.llm_api_key()?, &cfg.llm)?;
        let client = MarketQueryClient::from_config(&cfg.polymarket)?;

        Ok(Self::new(
            Arc::new(runtime),
            client,
            cfg.llm.model.clone(),
            cfg.agent.add_datetime_to_context,
        ))
    }

    pub fn spec(&self) -> &AgentSpec {
        &self.spec
    }

    /// Answer `query` in one shot.
    pub async fn run(&self, query: &str) -> String {
        info!(query = %preview(query), "Running polymarket agent");

        match self.runtime.run(&self.spec, query, RunOptions::default()).await {
            Ok(response) => {
                info!("Polymarket agent query completed successfully");
                response.content
            }
            Err(e) => {
                error!(error = %e, "Error in PolymarketAgent run");
                error!(details = ?e, "Full error details");
                format!("Error processing query: {e}")
            }
        }
    }

    /// Stream the agent's progress on `query`.
    ///
    /// Content and tool events are forwarded in the order the runtime emits
    /// them, followed by one `Done`. Any runtime failure yields a single
    /// `Error` event and ends the stream.
    pub fn stream(
        &self,
        query: impl Into<String>,
        conversation_id: impl Into<String>,
        task_id: impl Into<String>,
    ) -> impl Stream<Item = StreamEvent> + Send + '_ {
        let query = query.into();
        let conversation_id = conversation_id.into();
        let task_id = task_id.into();

        stream! {
            info!(
                query = %preview(&query),
                conversation_id = %conversation_id,
                task_id = %task_id,
                "Processing polymarket query"
            );

            let options = RunOptions {
                session_id: Some(conversation_id.clone()),
                stream_intermediate_steps: true,
            };

            let mut events = match self.runtime.run_stream(&self.spec, &query, options).await {
                Ok(events) => events,
                Err(e) => {
                    error!(error = %e, "Error processing polymarket query");
                    yield error_event(&e);
                    return;
                }
            };

            while let Some(event) = events.next().await {
                match event {
                    Ok(RunEvent::RunContent { content }) => {
                        yield StreamEvent::MessageChunk { content };
                    }
                    Ok(RunEvent::ToolCallStarted { tool }) => {
                        yield StreamEvent::ToolCallStarted {
                            tool_call_id: tool.tool_call_id,
                            tool_name: tool.tool_name,
                        };
                    }
                    Ok(RunEvent::ToolCallCompleted { tool }) => {
                        yield StreamEvent::ToolCallCompleted {
                            result: tool.result.unwrap_or_default(),
                            tool_call_id: tool.tool_call_id,
                            tool_name: tool.tool_name,
                        };
                    }
                    // Its text already went out as message chunks.
                    Ok(RunEvent::RunCompleted { .. }) => {
                        debug!(conversation_id = %conversation_id, "Run completed");
                    }
                    Ok(RunEvent::Other { kind }) => {
                        debug!(kind = %kind, "Skipping unrecognized run event");
                    }
                    Err(e) => {
                        error!(error = %e, "Error processing polymarket query");
                        yield error_event(&e);
                        return;
                    }
                }
            }

            yield StreamEvent::Done;
            info!(conversation_id = %conversation_id, "Polymarket query processed successfully");
        }
    }

    /// Discovery record for hosts.
    pub fn capabilities() -> Capabilities {
        Capabilities {
            name: "Polymarket Agent".to_string(),
            description: "Agent for searching and analyzing Polymarket prediction markets"
                .to_string(),
            tools: MarketTools::descriptors(),
            supported_queries: vec![
                "Search for election markets".to_string(),
                "What are the trending markets?".to_string(),
                "Get details for market ID...".to_string(),
            ],
        }
    }
}

fn error_event(e: &anyhow::Error) -> StreamEvent {
    StreamEvent::Error {
        content: format!("Error processing query: {e}"),
    }
}

/// Query text trimmed for logging.
fn preview(query: &str) -> String {
    let mut chars = query.chars();
    let head: String = chars.by_ref().take(QUERY_LOG_CHARS).collect();
    if chars.next().is_some() {
        format!("{head}...")
    } else {
        head
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
