//! Polymarket market queries.
//!
//! Uses the Gamma API for market discovery (no auth required). Each query is
//! a single GET; the JSON response is rendered into the plain-text blocks the
//! agent hands to the language model.
//!
//! Gamma API: https://gamma-api.polymarket.com

use std::sync::Arc;
use std::time::Duration;

use serde_json::{Map, Value};
use tracing::{debug, info};

use super::{GammaTransport, HttpTransport, MarketQueryError};
use crate::config::PolymarketConfig;
use crate::types::GammaMarket;

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

/// Returned by `search` when nothing matches.
pub const NO_SEARCH_RESULTS: &str = "No markets found matching the query.";

/// Returned by `get_trending` when the listing is empty.
pub const NO_TRENDING_RESULTS: &str = "No trending markets found.";

/// Line placed between rendered market blocks.
pub const RECORD_SEPARATOR: &str = "\n---\n";

// ---------------------------------------------------------------------------
// Client
// ---------------------------------------------------------------------------

/// Fetch-and-format client for the three market queries.
#[derive(Clone)]
pub struct MarketQueryClient {
    transport: Arc<dyn GammaTransport>,
}

impl MarketQueryClient {
    pub fn new(transport: Arc<dyn GammaTransport>) -> Self {
        Self { transport }
    }

    /// Build a client with an HTTP transport pointed at the configured endpoint.
    pub fn from_config(cfg: &PolymarketConfig) -> anyhow::Result<Self> {
        let timeout = cfg.request_timeout_secs.map(Duration::from_secs);
        let transport = HttpTransport::new(&cfg.gamma_base_url, timeout)?;
        Ok(Self::new(Arc::new(transport)))
    }

    /// Search active, open markets by free text.
    pub async fn search(&self, query: &str, limit: u32) -> Result<String, MarketQueryError> {
        let params = vec![
            ("limit".to_string(), limit.to_string()),
            ("active".to_string(), "true".to_string()),
            ("closed".to_string(), "false".to_string()),
            ("q".to_string(), query.to_string()),
        ];

        let markets = self.fetch_list(&params).await?;
        info!(count = markets.len(), query, "Market search complete");
        Ok(render_listing(&markets, NO_SEARCH_RESULTS))
    }

    /// Fetch one market by identifier and render the full detail view.
    pub async fn get_details(&self, market_id: &str) -> Result<String, MarketQueryError> {
        let path = format!("/markets/{}", urlencoding::encode(market_id));
        let body = self.transport.get_json(&path, &[]).await?;
        let market = decode_market(serde_json::from_value(body)?)?;

        debug!(market_id, "Fetched market details");
        Ok(market.detail_block())
    }

    /// Active, open markets ordered by volume, highest first.
    pub async fn get_trending(&self, limit: u32) -> Result<String, MarketQueryError> {
        let params = vec![
            ("limit".to_string(), limit.to_string()),
            ("active".to_string(), "true".to_string()),
            ("closed".to_string(), "false".to_string()),
            ("order".to_string(), "volume".to_string()),
            ("ascending".to_string(), "false".to_string()),
        ];

        let markets = self.fetch_list(&params).await?;
        info!(count = markets.len(), "Trending markets fetched");
        Ok(render_listing(&markets, NO_TRENDING_RESULTS))
    }

    async fn fetch_list(
        &self,
        params: &[(String, String)],
    ) -> Result<Vec<GammaMarket>, MarketQueryError> {
        let body: Value = self.transport.get_json("/markets", params).await?;
        let records: Vec<Map<String, Value>> = serde_json::from_value(body)?;
        records.into_iter().map(decode_market).collect()
    }
}

/// Market records must be JSON objects; serde would otherwise accept an
/// array and fill the fields by position.
fn decode_market(record: Map<String, Value>) -> Result<GammaMarket, MarketQueryError> {
    Ok(serde_json::from_value(Value::Object(record))?)
}

/// Render a market listing, or `empty` when there is nothing to show.
pub fn render_listing(markets: &[GammaMarket], empty: &str) -> String {
    if markets.is_empty() {
        return empty.to_string();
    }

    markets
        .iter()
        .map(GammaMarket::summary_block)
        .collect::<Vec<_>>()
        .join(RECORD_SEPARATOR)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::platforms::MockGammaTransport;
    use serde_json::json;

    fn has_param(query: &[(String, String)], key: &str, value: &str) -> bool {
        query.iter().any(|(k, v)| k == key && v == value)
    }

    fn has_key(query: &[(String, String)], key: &str) -> bool {
        query.iter().any(|(k, _)| k == key)
    }

    fn client_with(mock: MockGammaTransport) -> MarketQueryClient {
        MarketQueryClient::new(Arc::new(mock))
    }

    fn sample_markets() -> Value {
        json!([
            {
                "id": "501",
                "question": "Will candidate A win?",
                "outcomes": "[\"Yes\", \"No\"]",
                "outcomePrices": "[\"0.61\", \"0.39\"]",
                "volume": "250000.75",
                "endDate": "2026-11-03T12:00:00Z"
            },
            {
                "id": "502",
                "question": "Will turnout exceed 60%?",
                "outcomes": "[\"Yes\", \"No\"]",
                "outcomePrices": "[\"0.44\", \"0.56\"]",
                "volume": 1200,
                "endDate": "2026-11-04T12:00:00Z"
            }
        ])
    }

    #[tokio::test]
    async fn test_search_sends_filters_and_renders_blocks() {
        let mut mock = MockGammaTransport::new();
        mock.expect_get_json()
            .withf(|path, query| {
                path.starts_with("/markets")
                    && path.len() == "/markets".len()
                    && has_param(query, "limit", "5")
                    && has_param(query, "active", "true")
                    && has_param(query, "closed", "false")
                    && has_param(query, "q", "election")
                    && !has_key(query, "order")
            })
            .times(1)
            .returning(|_, _| Ok(sample_markets()));

        let out = client_with(mock).search("election", 5).await.unwrap();

        let blocks: Vec<&str> = out.split(RECORD_SEPARATOR).collect();
        assert_eq!(blocks.len(), 2);
        assert!(blocks[0].starts_with("ID: 501\n"));
        assert!(blocks[0].contains("Question: Will candidate A win?\n"));
        assert!(blocks[0].contains("Outcomes: [\"Yes\", \"No\"]\n"));
        assert!(blocks[0].contains("Outcome Prices: [\"0.61\", \"0.39\"]\n"));
        assert!(blocks[0].contains("Volume: $250000.75\n"));
        assert!(blocks[0].contains("End Date: 2026-11-03T12:00:00Z\n"));
        assert!(blocks[1].contains("Volume: $1200\n"));
    }

    #[tokio::test]
    async fn test_search_empty_returns_sentinel() {
        let mut mock = MockGammaTransport::new();
        mock.expect_get_json().returning(|_, _| Ok(json!([])));

        let out = client_with(mock).search("nothing", 10).await.unwrap();
        assert_eq!(out, NO_SEARCH_RESULTS);
        assert!(!out.contains("---"));
    }

    #[tokio::test]
    async fn test_trending_orders_by_volume() {
        let mut mock = MockGammaTransport::new();
        mock.expect_get_json()
            .withf(|_, query| {
                has_param(query, "order", "volume")
                    && has_param(query, "ascending", "false")
                    && has_param(query, "limit", "10")
                    && !has_key(query, "q")
            })
            .times(1)
            .returning(|_, _| Ok(sample_markets()));

        let out = client_with(mock).get_trending(10).await.unwrap();
        assert_eq!(out.matches(RECORD_SEPARATOR).count(), 1);
        assert!(out.contains("ID: 502\n"));
        assert!(out.contains("End Date: 2026-11-04T12:00:00Z\n"));
    }

    #[tokio::test]
    async fn test_trending_empty_returns_sentinel() {
        let mut mock = MockGammaTransport::new();
        mock.expect_get_json().returning(|_, _| Ok(json!([])));

        let out = client_with(mock).get_trending(10).await.unwrap();
        assert_eq!(out, NO_TRENDING_RESULTS);
    }

    #[tokio::test]
    async fn test_details_partial_record() {
        let mut mock = MockGammaTransport::new();
        mock.expect_get_json()
            .withf(|path, query| path.ends_with("/markets/0x123") && query.is_empty())
            .times(1)
            .returning(|_, _| {
                Ok(json!({ "id": "0x123", "question": "Will X happen?", "liquidity": "500" }))
            });

        let out = client_with(mock).get_details("0x123").await.unwrap();
        assert!(out.contains("ID: 0x123"));
        assert!(out.contains("Question: Will X happen?"));
        assert!(out.contains("Liquidity: $500"));
        assert!(out.contains("Description: N/A"));
        assert!(out.contains("Start Date: N/A"));
        assert!(out.contains("End Date: N/A"));
    }

    #[tokio::test]
    async fn test_details_encodes_market_id() {
        let mut mock = MockGammaTransport::new();
        mock.expect_get_json()
            .withf(|path, _| path.ends_with("/markets/a%2Fb%20c"))
            .times(1)
            .returning(|_, _| Ok(json!({ "id": "a/b c" })));

        let out = client_with(mock).get_details("a/b c").await.unwrap();
        assert!(out.starts_with("ID: a/b c\n"));
    }

    #[tokio::test]
    async fn test_transport_error_propagates() {
        let mut mock = MockGammaTransport::new();
        mock.expect_get_json()
            .returning(|_, _| Err(MarketQueryError::Transport("connection reset".into())));

        let err = client_with(mock).search("x", 10).await.unwrap_err();
        assert!(err.to_string().contains("connection reset"));
    }

    #[tokio::test]
    async fn test_not_found_status_propagates() {
        let mut mock = MockGammaTransport::new();
        mock.expect_get_json().returning(|_, _| {
            Err(MarketQueryError::Status { status: 404, body: "not found".into() })
        });

        let err = client_with(mock).get_details("missing").await.unwrap_err();
        assert!(matches!(err, MarketQueryError::Status { status: 404, .. }));
    }

    #[tokio::test]
    async fn test_listing_with_wrong_shape_is_decode_error() {
        let mut mock = MockGammaTransport::new();
        mock.expect_get_json()
            .returning(|_, _| Ok(json!({ "error": "unexpected" })));

        let err = client_with(mock).get_trending(3).await.unwrap_err();
        assert!(matches!(err, MarketQueryError::Decode(_)));
    }

    #[tokio::test]
    async fn test_details_rejects_array_body() {
        let mut mock = MockGammaTransport::new();
        mock.expect_get_json().returning(|_, _| {
            Ok(json!([{ "id": "1", "question": "A?" }, { "id": "2", "question": "B?" }]))
        });

        let err = client_with(mock).get_details("").await.unwrap_err();
        assert!(matches!(err, MarketQueryError::Decode(_)));
    }

    #[tokio::test]
    async fn test_listing_rejects_non_object_records() {
        let mut mock = MockGammaTransport::new();
        mock.expect_get_json()
            .returning(|_, _| Ok(json!([["601", "Will X happen?"]])));

        let err = client_with(mock).search("x", 10).await.unwrap_err();
        assert!(matches!(err, MarketQueryError::Decode(_)));
    }

    #[test]
    fn test_render_listing_single_record_has_no_separator() {
        let market = GammaMarket {
            id: Some(json!("1")),
            ..Default::default()
        };
        let out = render_listing(&[market], NO_SEARCH_RESULTS);
        assert!(!out.contains(RECORD_SEPARATOR));
        assert!(out.starts_with("ID: 1\n"));
    }
}
