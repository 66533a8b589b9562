//! Shared types for the Polymarket agent.
//!
//! Upstream market records, tool arguments, the caller-facing stream
//! protocol, and the capability descriptor. Kept free of I/O so every
//! other module can depend on them.

use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::borrow::Cow;

/// Rendered in place of any field the upstream payload omits.
pub const PLACEHOLDER: &str = "N/A";

/// Default number of markets requested per listing call.
pub const DEFAULT_LIMIT: u32 = 10;

// ---------------------------------------------------------------------------
// Market
// ---------------------------------------------------------------------------

/// A market record as returned by the Gamma API.
///
/// Fields are kept as raw JSON: the API mixes strings, numbers and
/// JSON-encoded arrays (`outcomes` is `"[\"Yes\", \"No\"]"`), and we render
/// whatever arrives without reinterpreting it.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct GammaMarket {
    #[serde(default)]
    pub id: Option<Value>,
    #[serde(default)]
    pub question: Option<Value>,
    #[serde(default)]
    pub description: Option<Value>,
    #[serde(default)]
    pub category: Option<Value>,
    #[serde(default)]
    pub outcomes: Option<Value>,
    #[serde(default, rename = "outcomePrices")]
    pub outcome_prices: Option<Value>,
    #[serde(default)]
    pub volume: Option<Value>,
    #[serde(default)]
    pub liquidity: Option<Value>,
    #[serde(default, rename = "startDate")]
    pub start_date: Option<Value>,
    #[serde(default, rename = "endDate")]
    pub end_date: Option<Value>,
    #[serde(default)]
    pub active: Option<Value>,
    #[serde(default)]
    pub closed: Option<Value>,
}

/// Render a raw field for display. Strings are shown without quotes,
/// `null` and missing values become [`PLACEHOLDER`].
pub fn display_field(value: &Option<Value>) -> Cow<'_, str> {
    match value {
        None | Some(Value::Null) => Cow::Borrowed(PLACEHOLDER),
        Some(Value::String(s)) => Cow::Borrowed(s.as_str()),
        Some(other) => Cow::Owned(other.to_string()),
    }
}

impl GammaMarket {
    /// Compact block used by search and trending listings.
    pub fn summary_block(&self) -> String {
        format!(
            "ID: {}\n\
             Question: {}\n\
             Outcomes: {}\n\
             Outcome Prices: {}\n\
             Volume: ${}\n\
             End Date: {}\n",
            display_field(&self.id),
            display_field(&self.question),
            display_field(&self.outcomes),
            display_field(&self.outcome_prices),
            display_field(&self.volume),
            display_field(&self.end_date),
        )
    }

    /// Full block used by the single-market detail view.
    pub fn detail_block(&self) -> String {
        format!(
            "ID: {}\n\
             Question: {}\n\
             Description: {}\n\
             Category: {}\n\
             Outcomes: {}\n\
             Outcome Prices: {}\n\
             Volume: ${}\n\
             Liquidity: ${}\n\
             Start Date: {}\n\
             End Date: {}\n\
             Active: {}\n\
             Closed: {}\n",
            display_field(&self.id),
            display_field(&self.question),
            display_field(&self.description),
            display_field(&self.category),
            display_field(&self.outcomes),
            display_field(&self.outcome_prices),
            display_field(&self.volume),
            display_field(&self.liquidity),
            display_field(&self.start_date),
            display_field(&self.end_date),
            display_field(&self.active),
            display_field(&self.closed),
        )
    }
}

// ---------------------------------------------------------------------------
// Tool arguments
// ---------------------------------------------------------------------------

/// Arguments for a keyword search.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SearchRequest {
    pub query: String,
    #[serde(default, deserialize_with = "lenient_limit")]
    pub limit: Option<u32>,
}

/// Arguments for the trending listing.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct TrendingRequest {
    #[serde(default, deserialize_with = "lenient_limit")]
    pub limit: Option<u32>,
}

/// Arguments for the single-market lookup.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DetailsRequest {
    pub market_id: String,
}

/// Models send limits as `5`, `5.0` or `"5"`; all mean the same thing.
fn lenient_limit<'de, D>(deserializer: D) -> Result<Option<u32>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    let parsed = match &value {
        None | Some(Value::Null) => return Ok(None),
        Some(Value::Number(n)) => n.as_u64().or_else(|| n.as_f64().and_then(whole_number)),
        Some(Value::String(s)) => {
            let s = s.trim();
            s.parse::<u64>()
                .ok()
                .or_else(|| s.parse::<f64>().ok().and_then(whole_number))
        }
        Some(_) => None,
    };

    match parsed.and_then(|n| u32::try_from(n).ok()) {
        Some(n) => Ok(Some(n)),
        None => Err(D::Error::custom(format!(
            "invalid limit {}, expected a non-negative whole number",
            value.unwrap_or(Value::Null)
        ))),
    }
}

fn whole_number(f: f64) -> Option<u64> {
    (f.is_finite() && f >= 0.0 && f.fract() == 0.0 && f <= u64::MAX as f64).then(|| f as u64)
}

/// Resolve an optional caller-supplied limit. Zero means "use the default".
pub fn effective_limit(limit: Option<u32>) -> u32 {
    match limit {
        Some(0) | None => DEFAULT_LIMIT,
        Some(n) => n,
    }
}

// ---------------------------------------------------------------------------
// Stream protocol
// ---------------------------------------------------------------------------

/// One unit of the agent's caller-facing output.
///
/// A successful stream ends with exactly one `Done`. A failed stream ends
/// with a single `Error` and nothing after it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StreamEvent {
    MessageChunk {
        content: String,
    },
    ToolCallStarted {
        tool_call_id: String,
        tool_name: String,
    },
    ToolCallCompleted {
        result: String,
        tool_call_id: String,
        tool_name: String,
    },
    Done,
    Error {
        content: String,
    },
}

impl StreamEvent {
    /// Whether this event ends the stream.
    pub fn is_terminal(&self) -> bool {
        matches!(self, StreamEvent::Done | StreamEvent::Error { .. })
    }
}

// ---------------------------------------------------------------------------
// Capabilities
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolDescriptor {
    pub name: String,
    pub description: String,
}

/// Discovery record for whatever hosts the agent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Capabilities {
    pub name: String,
    pub description: String,
    pub tools: Vec<ToolDescriptor>,
    pub supported_queries: Vec<String>,
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
