use crate::domain::{Address, GlobalCurrency, Network};
use crate::engine::AggregationSettings;
use std::collections::HashMap;
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;
use tracing::warn;

const DEFAULT_NETWORKS: &str = "1,10,42161";

#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    pub positions_api_url: String,
    /// Networks to aggregate, in display order, without duplicates.
    pub networks: Vec<Network>,
    pub subgraph_urls: HashMap<Network, String>,
    pub global_currency: GlobalCurrency,
    pub filter_closed: bool,
    pub tracked_addresses: Vec<Address>,
    pub token_registry_file: Option<String>,
    pub refresh_interval: Duration,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingEnv(String),
    #[error("Invalid value for {0}: {1}")]
    InvalidValue(String, String),
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_env_map(std::env::vars().collect())
    }

    pub fn from_env_map(env_map: HashMap<String, String>) -> Result<Self, ConfigError> {
        let port = env_map
            .get("PORT")
            .map(|s| s.as_str())
            .unwrap_or("8080")
            .parse::<u16>()
            .map_err(|_| {
                ConfigError::InvalidValue("PORT".to_string(), "must be a valid u16".to_string())
            })?;

        let positions_api_url = env_map
            .get("POSITIONS_API_URL")
            .cloned()
            .ok_or_else(|| ConfigError::MissingEnv("POSITIONS_API_URL".to_string()))?;

        let networks = parse_networks(
            env_map
                .get("NETWORKS")
                .map(|s| s.as_str())
                .unwrap_or(DEFAULT_NETWORKS),
        )?;

        let subgraph_urls = networks
            .iter()
            .filter_map(|network| {
                env_map
                    .get(&format!("SUBGRAPH_URL_{}", network.chain_id()))
                    .filter(|url| !url.trim().is_empty())
                    .map(|url| (*network, url.trim().to_string()))
            })
            .collect();

        let global_currency = env_map
            .get("GLOBAL_CURRENCY")
            .map(|s| s.as_str())
            .unwrap_or("usd")
            .parse::<GlobalCurrency>()
            .map_err(|e| ConfigError::InvalidValue("GLOBAL_CURRENCY".to_string(), e))?;

        let filter_closed = match env_map
            .get("FILTER_CLOSED")
            .map(|s| s.as_str())
            .unwrap_or("false")
        {
            "true" | "1" => true,
            "false" | "0" => false,
            other => {
                return Err(ConfigError::InvalidValue(
                    "FILTER_CLOSED".to_string(),
                    format!("must be true or false, got {}", other),
                ))
            }
        };

        let tracked_addresses = parse_tracked_addresses_from_map(&env_map)?;

        let token_registry_file = env_map
            .get("TOKEN_REGISTRY_FILE")
            .filter(|s| !s.trim().is_empty())
            .cloned();

        let refresh_secs = env_map
            .get("REFRESH_INTERVAL_SECS")
            .map(|s| s.as_str())
            .unwrap_or("60")
            .parse::<u64>()
            .ok()
            .filter(|secs| *secs > 0)
            .ok_or_else(|| {
                ConfigError::InvalidValue(
                    "REFRESH_INTERVAL_SECS".to_string(),
                    "must be a positive integer".to_string(),
                )
            })?;

        Ok(Config {
            port,
            positions_api_url,
            networks,
            subgraph_urls,
            global_currency,
            filter_closed,
            tracked_addresses,
            token_registry_file,
            refresh_interval: Duration::from_secs(refresh_secs),
        })
    }

    /// Default aggregation preferences; API callers may override them per request.
    pub fn settings(&self) -> AggregationSettings {
        AggregationSettings {
            global_currency: self.global_currency,
            filter_closed: self.filter_closed,
        }
    }
}

/// Comma-separated chain ids. Unknown ids fall back to the baseline network.
fn parse_networks(raw: &str) -> Result<Vec<Network>, ConfigError> {
    let mut networks = Vec::new();
    for part in raw.split(',').map(str::trim).filter(|s| !s.is_empty()) {
        let chain_id = part.parse::<u64>().map_err(|_| {
            ConfigError::InvalidValue(
                "NETWORKS".to_string(),
                format!("invalid chain id {}", part),
            )
        })?;
        let network = Network::from_chain_id_or_default(chain_id);
        if networks.contains(&network) {
            warn!(chain_id, %network, "Duplicate network in NETWORKS, ignoring");
            continue;
        }
        networks.push(network);
    }

    if networks.is_empty() {
        return Err(ConfigError::InvalidValue(
            "NETWORKS".to_string(),
            "at least one chain id is required".to_string(),
        ));
    }
    Ok(networks)
}

fn parse_address_list<'a>(
    key: &str,
    items: impl Iterator<Item = &'a str>,
) -> Result<Vec<Address>, ConfigError> {
    items
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| {
            Address::from_str(s).map_err(|e| ConfigError::InvalidValue(key.to_string(), e.to_string()))
        })
        .collect()
}

fn parse_tracked_addresses_from_map(
    env_map: &HashMap<String, String>,
) -> Result<Vec<Address>, ConfigError> {
    if let Some(addresses) = env_map.get("TRACKED_ADDRESSES") {
        parse_address_list("TRACKED_ADDRESSES", addresses.split(','))
    } else if let Some(file_path) = env_map.get("TRACKED_ADDRESSES_FILE") {
        let content = std::fs::read_to_string(file_path).map_err(|_| {
            ConfigError::InvalidValue(
                "TRACKED_ADDRESSES_FILE".to_string(),
                "file not found or unreadable".to_string(),
            )
        })?;
        parse_address_list("TRACKED_ADDRESSES_FILE", content.lines())
    } else {
        Ok(Vec::new())
    }
}
