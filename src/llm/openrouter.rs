//! OpenRouter agent runtime.
//!
//! Drives a tool-calling conversation through OpenRouter's OpenAI-compatible
//! chat completions API. Each model turn either answers in text or asks for
//! tool calls; tool results are fed back until the model answers without
//! requesting tools.
//!
//! Conversation history is kept in memory per session id (user queries and
//! final answers only, not tool chatter), bounded in both the number of
//! sessions and the messages per session.

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use anyhow::{anyhow, Context, Result};
use async_stream::try_stream;
use async_trait::async_trait;
use futures::{Stream, StreamExt};
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use super::{AgentRuntime, AgentSpec, RunEvent, RunEventStream, RunOptions, ToolExecution};
use crate::config::LlmConfig;

// ---------------------------------------------------------------------------
// API types (OpenAI-compatible)
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    messages: &'a [ChatMessage],
    #[serde(skip_serializing_if = "Vec::is_empty")]
    tools: Vec<ToolDefinition>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: String,
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_calls: Option<Vec<ToolCall>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_call_id: Option<String>,
}

impl ChatMessage {
    fn text(role: &str, content: impl Into<String>) -> Self {
        Self {
            role: role.to_string(),
            content: Some(content.into()),
            tool_calls: None,
            tool_call_id: None,
        }
    }

    fn tool_result(tool_call_id: &str, content: impl Into<String>) -> Self {
        Self {
            role: "tool".to_string(),
            content: Some(content.into()),
            tool_calls: None,
            tool_call_id: Some(tool_call_id.to_string()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolCall {
    pub id: String,
    #[serde(rename = "type", default = "function_type")]
    pub call_type: String,
    pub function: FunctionCall,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FunctionCall {
    pub name: String,
    /// JSON-encoded arguments object, as produced by the model.
    #[serde(default)]
    pub arguments: String,
}

fn function_type() -> String {
    "function".to_string()
}

#[derive(Debug, Clone, Serialize)]
struct ToolDefinition {
    #[serde(rename = "type")]
    tool_type: &'static str,
    function: FunctionDefinition,
}

#[derive(Debug, Clone, Serialize)]
struct FunctionDefinition {
    name: String,
    description: String,
    parameters: Value,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<Choice>,
    #[serde(default)]
    usage: Option<ChatUsage>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    #[serde(default)]
    message: Option<ChatMessage>,
}

#[derive(Debug, Deserialize)]
struct ChatUsage {
    #[serde(default)]
    prompt_tokens: u32,
    #[serde(default)]
    completion_tokens: u32,
}

// ---------------------------------------------------------------------------
// Session history
// ---------------------------------------------------------------------------

/// Bounded per-session conversation history.
///
/// Holds at most `max_sessions` conversations, evicting the least recently
/// used, and at most `max_messages` messages per conversation, dropping the
/// oldest exchanges first.
struct SessionStore {
    max_sessions: usize,
    max_messages: usize,
    /// Least recently used first.
    order: VecDeque<String>,
    histories: HashMap<String, Vec<ChatMessage>>,
}

impl SessionStore {
    fn new(max_sessions: usize, max_messages: usize) -> Self {
        Self {
            max_sessions,
            max_messages,
            order: VecDeque::new(),
            histories: HashMap::new(),
        }
    }

    fn get(&self, session_id: &str) -> Option<&Vec<ChatMessage>> {
        self.histories.get(session_id)
    }

    fn len(&self) -> usize {
        self.histories.len()
    }

    /// Append one completed exchange to a session.
    fn record(&mut self, session_id: &str, query: &str, answer: &str) {
        if self.max_sessions == 0 || self.max_messages == 0 {
            return;
        }

        if self.histories.contains_key(session_id) {
            self.order.retain(|id| id != session_id);
        } else {
            while self.histories.len() >= self.max_sessions {
                let Some(oldest) = self.order.pop_front() else { break };
                debug!(session_id = %oldest, "Evicting session history");
                self.histories.remove(&oldest);
            }
        }
        self.order.push_back(session_id.to_string());

        let history = self.histories.entry(session_id.to_string()).or_default();
        history.push(ChatMessage::text("user", query));
        history.push(ChatMessage::text("assistant", answer));

        if history.len() > self.max_messages {
            // Trim whole exchanges so history never opens on an answer.
            let excess = history.len() - self.max_messages;
            let excess = (excess + excess % 2).min(history.len());
            history.drain(..excess);
        }
    }
}

// ---------------------------------------------------------------------------
// Runtime
// ---------------------------------------------------------------------------

/// Cheap to clone; clones share the HTTP pool and session history.
#[derive(Clone)]
pub struct OpenRouterRuntime {
    inner: Arc<Inner>,
}

struct Inner {
    http: Client,
    api_key: SecretString,
    api_url: String,
    max_tokens: u32,
    max_tool_rounds: u32,
    sessions: Mutex<SessionStore>,
    total_calls: AtomicU64,
}

impl OpenRouterRuntime {
    pub fn new(api_key: SecretString, cfg: &LlmConfig) -> Result<Self> {
        let http = Client::builder()
            .timeout(std::time::Duration::from_secs(120))
            .build()
            .context("Failed to build OpenRouter HTTP client")?;

        Ok(Self::with_client(http, api_key, cfg))
    }

    /// Build on an existing HTTP client.
    pub fn with_client(http: Client, api_key: SecretString, cfg: &LlmConfig) -> Self {
        Self {
            inner: Arc::new(Inner {
                http,
                api_key,
                api_url: cfg.api_url.clone(),
                max_tokens: cfg.max_tokens,
                max_tool_rounds: cfg.max_tool_rounds,
                sessions: Mutex::new(SessionStore::new(
                    cfg.max_sessions,
                    cfg.max_history_messages,
                )),
                total_calls: AtomicU64::new(0),
            }),
        }
    }

    /// Total number of completion calls made.
    pub fn total_calls(&self) -> u64 {
        self.inner.total_calls.load(Ordering::Relaxed)
    }

    /// Stored history for a session (empty if unknown).
    pub async fn session_history(&self, session_id: &str) -> Vec<ChatMessage> {
        self.inner
            .sessions
            .lock()
            .await
            .get(session_id)
            .cloned()
            .unwrap_or_default()
    }

    /// Number of conversations currently held in memory.
    pub async fn session_count(&self) -> usize {
        self.inner.sessions.lock().await.len()
    }
}

impl Inner {
    async fn initial_messages(
        &self,
        spec: &AgentSpec,
        query: &str,
        session_id: Option<&str>,
    ) -> Vec<ChatMessage> {
        let mut messages = vec![ChatMessage::text("system", system_prompt(spec))];

        if let Some(id) = session_id {
            if let Some(history) = self.sessions.lock().await.get(id) {
                messages.extend(history.iter().cloned());
            }
        }

        messages.push(ChatMessage::text("user", query));
        messages
    }

    async fn remember(&self, session_id: Option<&str>, query: &str, answer: &str) {
        let Some(id) = session_id else { return };
        self.sessions.lock().await.record(id, query, answer);
    }

    /// One chat completion round-trip. Returns the assistant message.
    async fn complete(&self, spec: &AgentSpec, messages: &[ChatMessage]) -> Result<ChatMessage> {
        let request = ChatRequest {
            model: &spec.model,
            max_tokens: self.max_tokens,
            messages,
            tools: tool_definitions(spec),
        };

        let response = self
            .http
            .post(&self.api_url)
            .bearer_auth(self.api_key.expose_secret())
            .header("Content-Type", "application/json")
            .header("X-Title", "Polymarket Agent")
            .json(&request)
            .send()
            .await
            .context("OpenRouter request failed")?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            anyhow::bail!(
                "OpenRouter API error {status} (model={}): {error_text}",
                spec.model
            );
        }

        let body: ChatResponse = response
            .json()
            .await
            .context("Failed to parse OpenRouter response")?;

        self.total_calls.fetch_add(1, Ordering::Relaxed);
        if let Some(usage) = &body.usage {
            debug!(
                model = %spec.model,
                prompt_tokens = usage.prompt_tokens,
                completion_tokens = usage.completion_tokens,
                "OpenRouter completion"
            );
        }

        body.choices
            .into_iter()
            .next()
            .and_then(|c| c.message)
            .ok_or_else(|| anyhow!("OpenRouter response contained no message"))
    }
}

#[async_trait]
impl AgentRuntime for OpenRouterRuntime {
    async fn run_stream(
        &self,
        spec: &AgentSpec,
        query: &str,
        options: RunOptions,
    ) -> Result<RunEventStream> {
        let events = drive(
            Arc::clone(&self.inner),
            spec.clone(),
            query.to_string(),
            options,
        );
        Ok(events.boxed())
    }
}

/// The tool-calling loop for one run.
fn drive(
    inner: Arc<Inner>,
    spec: AgentSpec,
    query: String,
    options: RunOptions,
) -> impl Stream<Item = Result<RunEvent>> + Send + 'static {
    let session_id = options.session_id;
    let intermediate = options.stream_intermediate_steps;

    try_stream! {
        let mut messages = inner
            .initial_messages(&spec, &query, session_id.as_deref())
            .await;
        let mut rounds = 0u32;

        loop {
            let reply = inner.complete(&spec, &messages).await?;
            let calls = reply.tool_calls.clone().unwrap_or_default();

            if let Some(text) = reply.content.as_deref().filter(|t| !t.trim().is_empty()) {
                yield RunEvent::RunContent { content: text.to_string() };
            }

            if calls.is_empty() {
                let answer = reply.content.unwrap_or_default();
                if !answer.trim().is_empty() {
                    inner.remember(session_id.as_deref(), &query, &answer).await;
                }
                yield RunEvent::RunCompleted { content: answer };
                break;
            }

            rounds += 1;
            if rounds > inner.max_tool_rounds {
                Err::<(), _>(anyhow!(
                    "Model still requesting tools after {} rounds",
                    inner.max_tool_rounds
                ))?;
            }

            messages.push(reply);

            for call in calls {
                let mut execution = ToolExecution {
                    tool_call_id: call.id.clone(),
                    tool_name: call.function.name.clone(),
                    args: parse_tool_arguments(&call.function.arguments),
                    result: None,
                };

                if intermediate {
                    yield RunEvent::ToolCallStarted { tool: execution.clone() };
                }

                let result = match spec.find_tool(&execution.tool_name) {
                    Some(tool) => tool.call(execution.args.clone()).await,
                    None => {
                        warn!(tool = %execution.tool_name, "Model requested unknown tool");
                        format!("Error: unknown tool '{}'", execution.tool_name)
                    }
                };
                info!(
                    tool = %execution.tool_name,
                    result_len = result.len(),
                    "Tool call completed"
                );

                messages.push(ChatMessage::tool_result(&call.id, result.clone()));
                execution.result = Some(result);

                if intermediate {
                    yield RunEvent::ToolCallCompleted { tool: execution };
                }
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Instructions, optionally prefixed with the current UTC date/time.
fn system_prompt(spec: &AgentSpec) -> String {
    if spec.add_datetime_to_context {
        format!(
            "The current date and time is {} UTC.\n\n{}",
            chrono::Utc::now().format("%Y-%m-%d %H:%M:%S"),
            spec.instructions
        )
    } else {
        spec.instructions.clone()
    }
}

fn tool_definitions(spec: &AgentSpec) -> Vec<ToolDefinition> {
    spec.tools
        .iter()
        .map(|t| ToolDefinition {
            tool_type: "function",
            function: FunctionDefinition {
                name: t.name().to_string(),
                description: t.description().to_string(),
                parameters: t.parameters(),
            },
        })
        .collect()
}

/// Decode the model's argument string. Empty means "no arguments"; anything
/// unparseable is passed through as a string for the tool to reject.
fn parse_tool_arguments(raw: &str) -> Value {
    if raw.trim().is_empty() {
        return json!({});
    }
    serde_json::from_str(raw).unwrap_or_else(|_| Value::String(raw.to_string()))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
