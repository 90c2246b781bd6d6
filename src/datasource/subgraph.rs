//! Native-asset USD price from a Uniswap-style subgraph `bundle` entity.

use super::http::post_json;
use super::{DataSourceError, PriceSource};
use crate::domain::Network;
use async_trait::async_trait;
use reqwest::Client;
use rust_decimal::Decimal;
use std::collections::HashMap;
use std::str::FromStr;
use tracing::debug;

const BUNDLE_QUERY: &str = r#"query bundle { bundle(id: "1") { ethPriceUSD } }"#;

/// Price source backed by one GraphQL endpoint per network.
///
/// Networks without a configured endpoint report no live price.
#[derive(Debug, Clone, Default)]
pub struct SubgraphPriceSource {
    client: Client,
    endpoints: HashMap<Network, String>,
}

impl SubgraphPriceSource {
    pub fn new(endpoints: HashMap<Network, String>) -> Self {
        Self {
            client: Client::new(),
            endpoints,
        }
    }

    pub fn has_endpoint(&self, network: Network) -> bool {
        self.endpoints.contains_key(&network)
    }
}

#[async_trait]
impl PriceSource for SubgraphPriceSource {
    async fn fetch_native_price(&self, network: Network) -> Result<Option<Decimal>, DataSourceError> {
        let Some(url) = self.endpoints.get(&network) else {
            debug!(%network, "No subgraph configured, skipping native price");
            return Ok(None);
        };

        let payload = serde_json::json!({ "query": BUNDLE_QUERY });
        let response = post_json(&self.client, url, &payload).await?;
        parse_bundle_price(&response)
    }
}

/// Extract `data.bundle.ethPriceUSD`. A missing bundle means no price; a
/// GraphQL `errors` array is a parse error.
fn parse_bundle_price(response: &serde_json::Value) -> Result<Option<Decimal>, DataSourceError> {
    if let Some(errors) = response.get("errors").and_then(|e| e.as_array()) {
        if !errors.is_empty() {
            return Err(DataSourceError::ParseError(format!(
                "Subgraph returned errors: {}",
                serde_json::Value::Array(errors.clone())
            )));
        }
    }

    let Some(raw) = response
        .pointer("/data/bundle/ethPriceUSD")
        .and_then(|v| v.as_str())
    else {
        return Ok(None);
    };

    Decimal::from_str(raw)
        .or_else(|_| Decimal::from_scientific(raw))
        .map(Some)
        .map_err(|e| DataSourceError::ParseError(format!("Invalid ethPriceUSD: {}", e)))
}
