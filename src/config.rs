use crate::domain::Address;
use crate::engine::EndedEventPolicy;
use std::collections::HashMap;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Clone)]
pub struct Config {
    /// Ride contract, the target of parameter-change proposals.
    pub ride_contract: Address,
    pub mapbox_api_url: String,
    pub mapbox_access_token: String,
    pub tx_policy: TxPolicy,
    pub ride_gas_limit: u64,
    pub signup_gas_limit: u64,
    pub ended_event_policy: EndedEventPolicy,
    pub vote_reason: String,
}

/// Timeout and retry rules for submitted transactions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TxPolicy {
    /// Give up waiting for confirmation after this long. `None` waits forever.
    pub timeout: Option<Duration>,
    /// Extra attempts after a transient (network) failure.
    pub max_retries: u32,
    /// Initial delay between attempts; doubles each retry.
    pub retry_backoff: Duration,
}

impl Default for TxPolicy {
    fn default() -> Self {
        Self {
            timeout: Some(Duration::from_millis(120_000)),
            max_retries: 0,
            retry_backoff: Duration::from_millis(500),
        }
    }
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
        let ride_contract = env_map
            .get("LITERIDE_CONTRACT_ADDRESS")
            .map(|s| Address::new(s.as_str()))
            .ok_or_else(|| ConfigError::MissingEnv("LITERIDE_CONTRACT_ADDRESS".to_string()))?;
        if ride_contract.is_zero() || !ride_contract.as_str().starts_with("0x") {
            return Err(ConfigError::InvalidValue(
                "LITERIDE_CONTRACT_ADDRESS".to_string(),
                "must be a non-zero 0x address".to_string(),
            ));
        }

        let mapbox_api_url = env_map
            .get("MAPBOX_API_URL")
            .cloned()
            .unwrap_or_else(|| "https://api.mapbox.com".to_string());

        let mapbox_access_token = env_map.get("MAPBOX_ACCESS").cloned().unwrap_or_default();

        let timeout_ms = parse_u64(&env_map, "TX_TIMEOUT_MS", 120_000)?;
        let max_retries = env_map
            .get("TX_MAX_RETRIES")
            .map(|s| s.as_str())
            .unwrap_or("0")
            .parse::<u32>()
            .map_err(|_| {
                ConfigError::InvalidValue(
                    "TX_MAX_RETRIES".to_string(),
                    "must be a valid u32".to_string(),
                )
            })?;
        let retry_backoff_ms = parse_u64(&env_map, "TX_RETRY_BACKOFF_MS", 500)?;

        let tx_policy = TxPolicy {
            timeout: if timeout_ms == 0 {
                None
            } else {
                Some(Duration::from_millis(timeout_ms))
            },
            max_retries,
            retry_backoff: Duration::from_millis(retry_backoff_ms),
        };

        let ride_gas_limit = parse_u64(&env_map, "RIDE_GAS_LIMIT", 1_000_000)?;
        let signup_gas_limit = parse_u64(&env_map, "SIGNUP_GAS_LIMIT", 60_000)?;

        let ended_event_policy = match env_map
            .get("ENDED_EVENT_POLICY")
            .map(|s| s.as_str())
            .unwrap_or("observed")
        {
            "observed" => EndedEventPolicy::Observed,
            "strict" => EndedEventPolicy::Strict,
            other => {
                return Err(ConfigError::InvalidValue(
                    "ENDED_EVENT_POLICY".to_string(),
                    format!("must be observed or strict, got {}", other),
                ))
            }
        };

        let vote_reason = env_map
            .get("VOTE_REASON")
            .cloned()
            .unwrap_or_else(|| "default".to_string());

        Ok(Config {
            ride_contract,
            mapbox_api_url,
            mapbox_access_token,
            tx_policy,
            ride_gas_limit,
            signup_gas_limit,
            ended_event_policy,
            vote_reason,
        })
    }
}

fn parse_u64(
    env_map: &HashMap<String, String>,
    key: &str,
    default: u64,
) -> Result<u64, ConfigError> {
    match env_map.get(key) {
        Some(value) => value.trim().parse::<u64>().map_err(|_| {
            ConfigError::InvalidValue(key.to_string(), "must be a valid u64".to_string())
        }),
        None => Ok(default),
    }
}
