//! LLM agent runtime integration.
//!
//! Defines the `Tool` and `AgentRuntime` traits the agent is built on, the
//! runtime's internal event vocabulary, and an OpenRouter-backed runtime.

pub mod openrouter;

use std::fmt;
use std::sync::Arc;

use anyhow::{bail, Result};
use async_trait::async_trait;
use futures::stream::BoxStream;
use futures::StreamExt;
use serde_json::Value;
use tracing::debug;

// ---------------------------------------------------------------------------
// Tools
// ---------------------------------------------------------------------------

/// A callable operation the model may invoke during a run.
///
/// `call` never fails: any problem is reported in the returned text so the
/// model can read it and carry on.
#[async_trait]
pub trait Tool: Send + Sync {
    fn name(&self) -> &str;

    fn description(&self) -> &str;

    /// JSON schema of the arguments object.
    fn parameters(&self) -> Value;

    async fn call(&self, args: Value) -> String;
}

/// Agent configuration handed to the runtime on every invocation.
#[derive(Clone)]
pub struct AgentSpec {
    pub model: String,
    pub tools: Vec<Arc<dyn Tool>>,
    pub instructions: String,
    pub add_datetime_to_context: bool,
}

impl AgentSpec {
    pub fn find_tool(&self, name: &str) -> Option<&Arc<dyn Tool>> {
        self.tools.iter().find(|t| t.name() == name)
    }

    pub fn tool_names(&self) -> Vec<&str> {
        self.tools.iter().map(|t| t.name()).collect()
    }
}

impl fmt::Debug for AgentSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AgentSpec")
            .field("model", &self.model)
            .field("tools", &self.tool_names())
            .field("add_datetime_to_context", &self.add_datetime_to_context)
            .finish()
    }
}

// ---------------------------------------------------------------------------
// Runtime events
// ---------------------------------------------------------------------------

/// A tool invocation as seen by the runtime.
#[derive(Debug, Clone, PartialEq)]
pub struct ToolExecution {
    pub tool_call_id: String,
    pub tool_name: String,
    pub args: Value,
    /// Set once the call has completed.
    pub result: Option<String>,
}

/// Events produced while a run is in progress.
#[derive(Debug, Clone, PartialEq)]
pub enum RunEvent {
    RunContent { content: String },
    ToolCallStarted { tool: ToolExecution },
    ToolCallCompleted { tool: ToolExecution },
    /// The model's final answer; always the last event of a successful run.
    /// `content` may repeat text already sent as `RunContent`.
    RunCompleted { content: String },
    /// Anything else the runtime reports (run started, reasoning steps, ...).
    Other { kind: String },
}

impl RunEvent {
    pub fn kind(&self) -> &str {
        match self {
            RunEvent::RunContent { .. } => "RunContent",
            RunEvent::ToolCallStarted { .. } => "ToolCallStarted",
            RunEvent::ToolCallCompleted { .. } => "ToolCallCompleted",
            RunEvent::RunCompleted { .. } => "RunCompleted",
            RunEvent::Other { kind } => kind,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct RunOptions {
    /// Conversation key; runs sharing a session see each other's history.
    pub session_id: Option<String>,
    /// Report tool calls as they happen, not only the final content.
    pub stream_intermediate_steps: bool,
}

/// Final outcome of a non-streaming run.
#[derive(Debug, Clone, PartialEq)]
pub struct RunResponse {
    pub content: String,
}

pub type RunEventStream = BoxStream<'static, Result<RunEvent>>;

// ---------------------------------------------------------------------------
// Runtime
// ---------------------------------------------------------------------------

/// The orchestration engine that drives a model and its tools.
#[async_trait]
pub trait AgentRuntime: Send + Sync {
    /// Start a run and return its event stream. An `Err` here means the run
    /// never started; an `Err` item means it failed part-way.
    async fn run_stream(
        &self,
        spec: &AgentSpec,
        query: &str,
        options: RunOptions,
    ) -> Result<RunEventStream>;

    /// Run to completion and return the final answer carried by
    /// `RunCompleted`. Interim content is never returned in its place.
    async fn run(&self, spec: &AgentSpec, query: &str, options: RunOptions) -> Result<RunResponse> {
        let mut events = self.run_stream(spec, query, options).await?;
        let mut answer: Option<String> = None;

        while let Some(event) = events.next().await {
            match event? {
                RunEvent::RunCompleted { content } => answer = Some(content),
                other => debug!(kind = other.kind(), "Run event"),
            }
        }

        match answer {
            Some(content) if !content.trim().is_empty() => Ok(RunResponse { content }),
            Some(_) => bail!("Model returned an empty final answer"),
            None => bail!("Run finished without a final answer"),
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
