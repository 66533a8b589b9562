//! Test doubles shared by the integration tests.
//!
//! `StaticTransport` stands in for the Gamma API and `ScriptedRuntime` for
//! the LLM runtime. Both are deterministic and in-memory.

#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use futures::StreamExt;
use serde_json::{json, Value};

use polymarket_agent::llm::{
    AgentRuntime, AgentSpec, RunEvent, RunEventStream, RunOptions, ToolExecution,
};
use polymarket_agent::platforms::{GammaTransport, MarketQueryError};

// ---------------------------------------------------------------------------
// Transport
// ---------------------------------------------------------------------------

/// A Gamma API double that answers every request with one canned outcome
/// and records what was asked.
pub struct StaticTransport {
    response: Result<Value, String>,
    requests: Arc<Mutex<Vec<(String, Vec<(String, String)>)>>>,
}

impl StaticTransport {
    pub fn ok(body: Value) -> Self {
        Self {
            response: Ok(body),
            requests: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Every request fails as if the network dropped.
    pub fn failing(message: &str) -> Self {
        Self {
            response: Err(message.to_string()),
            requests: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn requests(&self) -> Arc<Mutex<Vec<(String, Vec<(String, String)>)>>> {
        Arc::clone(&self.requests)
    }
}

#[async_trait]
impl GammaTransport for StaticTransport {
    async fn get_json(
        &self,
        path: &str,
        query: &[(String, String)],
    ) -> Result<Value, MarketQueryError> {
        self.requests
            .lock()
            .unwrap()
            .push((path.to_string(), query.to_vec()));

        match &self.response {
            Ok(body) => Ok(body.clone()),
            Err(msg) => Err(MarketQueryError::Transport(msg.clone())),
        }
    }
}

/// Three markets with every rendered field present.
pub fn sample_markets() -> Value {
    json!([
        {
            "id": "601",
            "question": "Will the Fed cut rates in December?",
            "outcomes": "[\"Yes\", \"No\"]",
            "outcomePrices": "[\"0.72\", \"0.28\"]",
            "volume": "1520000.5",
            "endDate": "2026-12-17T00:00:00Z"
        },
        {
            "id": "602",
            "question": "Will BTC close above $150k this year?",
            "outcomes": "[\"Yes\", \"No\"]",
            "outcomePrices": "[\"0.18\", \"0.82\"]",
            "volume": "980000",
            "endDate": "2026-12-31T23:59:59Z"
        },
        {
            "id": "603",
            "question": "Will turnout exceed 65%?",
            "outcomes": "[\"Yes\", \"No\"]",
            "outcomePrices": "[\"0.40\", \"0.60\"]",
            "volume": 45000.25,
            "endDate": "2026-11-04T12:00:00Z"
        }
    ])
}

// ---------------------------------------------------------------------------
// Runtime
// ---------------------------------------------------------------------------

/// One step of a scripted run.
#[derive(Clone)]
pub enum Step {
    Emit(RunEvent),
    /// Call the named tool from the spec with these arguments and report it.
    CallTool { id: String, name: String, args: Value },
    /// Fail the run at this point.
    Fail(String),
}

/// An `AgentRuntime` that replays a fixed script.
pub struct ScriptedRuntime {
    steps: Vec<Step>,
    fail_on_start: Option<String>,
    seen: Arc<Mutex<Vec<(String, RunOptions)>>>,
}

impl ScriptedRuntime {
    pub fn new(steps: Vec<Step>) -> Self {
        Self {
            steps,
            fail_on_start: None,
            seen: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// A runtime whose run never starts.
    pub fn failing_on_start(message: &str) -> Self {
        Self {
            steps: Vec::new(),
            fail_on_start: Some(message.to_string()),
            seen: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Queries and options received so far.
    pub fn seen(&self) -> Arc<Mutex<Vec<(String, RunOptions)>>> {
        Arc::clone(&self.seen)
    }
}

pub fn content(text: &str) -> Step {
    Step::Emit(RunEvent::RunContent { content: text.to_string() })
}

/// The run's final answer.
pub fn finish(text: &str) -> Step {
    Step::Emit(RunEvent::RunCompleted { content: text.to_string() })
}

pub fn call_tool(id: &str, name: &str, args: Value) -> Step {
    Step::CallTool {
        id: id.to_string(),
        name: name.to_string(),
        args,
    }
}

#[async_trait]
impl AgentRuntime for ScriptedRuntime {
    async fn run_stream(
        &self,
        spec: &AgentSpec,
        query: &str,
        options: RunOptions,
    ) -> Result<RunEventStream> {
        self.seen.lock().unwrap().push((query.to_string(), options));

        if let Some(msg) = &self.fail_on_start {
            return Err(anyhow!("{msg}"));
        }

        let steps = self.steps.clone();
        let spec = spec.clone();

        let events = async_stream::stream! {
            for step in steps {
                match step {
                    Step::Emit(event) => {
                        yield Ok(event);
                    }
                    Step::CallTool { id, name, args } => {
                        let mut tool = ToolExecution {
                            tool_call_id: id,
                            tool_name: name.clone(),
                            args: args.clone(),
                            result: None,
                        };
                        yield Ok(RunEvent::ToolCallStarted { tool: tool.clone() });

                        let result = match spec.find_tool(&name) {
                            Some(t) => t.call(args).await,
                            None => format!("Error: unknown tool '{name}'"),
                        };
                        tool.result = Some(result);
                        yield Ok(RunEvent::ToolCallCompleted { tool });
                    }
                    Step::Fail(msg) => {
                        yield Err(anyhow!("{msg}"));
                        return;
                    }
                }
            }
        };

        Ok(events.boxed())
    }
}
