//! Market queries exposed as agent tools.
//!
//! This is where typed `MarketQueryError`s become plain text: the model
//! reads tool output as prose, so every failure is logged and rendered as
//! `"Error <doing X>: <message>"` instead of being raised.

use std::sync::Arc;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde_json::{json, Value};
use tracing::error;

use crate::llm::Tool;
use crate::platforms::polymarket::MarketQueryClient;
use crate::types::{effective_limit, DetailsRequest, SearchRequest, ToolDescriptor, TrendingRequest};

pub const SEARCH_MARKETS: &str = "search_markets";
pub const GET_MARKET_DETAILS: &str = "get_market_details";
pub const GET_TRENDING_MARKETS: &str = "get_trending_markets";

const SEARCH_DESCRIPTION: &str = "Search for active Polymarket markets by keyword. \
     Returns ID, question, outcomes, outcome prices, volume and end date for each match.";
const DETAILS_DESCRIPTION: &str = "Get detailed information about one Polymarket market by its ID, \
     including description, category, liquidity, dates and status.";
const TRENDING_DESCRIPTION: &str = "Get the currently trending Polymarket markets, ordered by trading volume.";

/// Flattening wrapper around `MarketQueryClient`. Every method returns text.
#[derive(Clone)]
pub struct MarketTools {
    client: MarketQueryClient,
}

impl MarketTools {
    pub fn new(client: MarketQueryClient) -> Self {
        Self { client }
    }

    pub async fn search_markets(&self, query: &str, limit: Option<u32>) -> String {
        match self.client.search(query, effective_limit(limit)).await {
            Ok(text) => text,
            Err(e) => {
                error!(error = %e, query, "Error searching Polymarket");
                format!("Error searching markets: {e}")
            }
        }
    }

    pub async fn get_market_details(&self, market_id: &str) -> String {
        match self.client.get_details(market_id).await {
            Ok(text) => text,
            Err(e) => {
                error!(error = %e, market_id, "Error getting Polymarket details");
                format!("Error getting market details: {e}")
            }
        }
    }

    pub async fn get_trending_markets(&self, limit: Option<u32>) -> String {
        match self.client.get_trending(effective_limit(limit)).await {
            Ok(text) => text,
            Err(e) => {
                error!(error = %e, "Error fetching trending markets");
                format!("Error fetching trending markets: {e}")
            }
        }
    }

    /// The three tools, in the order they are advertised to the model.
    pub fn into_tools(self) -> Vec<Arc<dyn Tool>> {
        vec![
            Arc::new(SearchMarkets(self.clone())),
            Arc::new(GetMarketDetails(self.clone())),
            Arc::new(GetTrendingMarkets(self)),
        ]
    }

    pub fn descriptors() -> Vec<ToolDescriptor> {
        [
            (SEARCH_MARKETS, "Search for markets by keyword"),
            (GET_MARKET_DETAILS, "Get detailed info about a specific market"),
            (GET_TRENDING_MARKETS, "Get trending markets by volume"),
        ]
        .into_iter()
        .map(|(name, description)| ToolDescriptor {
            name: name.to_string(),
            description: description.to_string(),
        })
        .collect()
    }
}

fn parse_args<T: DeserializeOwned>(args: Value) -> Result<T, serde_json::Error> {
    serde_json::from_value(args)
}

fn limit_schema() -> Value {
    json!({
        "type": "integer",
        "minimum": 1,
        "default": crate::types::DEFAULT_LIMIT,
        "description": "Maximum number of markets to return"
    })
}

// ---------------------------------------------------------------------------
// Tool implementations
// ---------------------------------------------------------------------------

pub struct SearchMarkets(MarketTools);

#[async_trait]
impl Tool for SearchMarkets {
    fn name(&self) -> &str {
        SEARCH_MARKETS
    }

    fn description(&self) -> &str {
        SEARCH_DESCRIPTION
    }

    fn parameters(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "query": { "type": "string", "description": "Search keywords" },
                "limit": limit_schema()
            },
            "required": ["query"]
        })
    }

    async fn call(&self, args: Value) -> String {
        match parse_args::<SearchRequest>(args) {
            Ok(req) => self.0.search_markets(&req.query, req.limit).await,
            Err(e) => format!("Error searching markets: invalid arguments: {e}"),
        }
    }
}

pub struct GetMarketDetails(MarketTools);

#[async_trait]
impl Tool for GetMarketDetails {
    fn name(&self) -> &str {
        GET_MARKET_DETAILS
    }

    fn description(&self) -> &str {
        DETAILS_DESCRIPTION
    }

    fn parameters(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "market_id": { "type": "string", "description": "Polymarket market ID" }
            },
            "required": ["market_id"]
        })
    }

    async fn call(&self, args: Value) -> String {
        match parse_args::<DetailsRequest>(args) {
            Ok(req) => self.0.get_market_details(&req.market_id).await,
            Err(e) => format!("Error getting market details: invalid arguments: {e}"),
        }
    }
}

pub struct GetTrendingMarkets(MarketTools);

#[async_trait]
impl Tool for GetTrendingMarkets {
    fn name(&self) -> &str {
        GET_TRENDING_MARKETS
    }

    fn description(&self) -> &str {
        TRENDING_DESCRIPTION
    }

    fn parameters(&self) -> Value {
        json!({
            "type": "object",
            "properties": { "limit": limit_schema() }
        })
    }

    async fn call(&self, args: Value) -> String {
        match parse_args::<TrendingRequest>(args) {
            Ok(req) => self.0.get_trending_markets(req.limit).await,
            Err(e) => format!("Error fetching trending markets: invalid arguments: {e}"),
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
