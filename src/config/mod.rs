//! Environment configuration
//!
//! Every setting comes from an environment variable (a `.env` file is loaded
//! by the binary first). Values are parsed, then checked with `validator`.

use std::fmt::Display;
use std::str::FromStr;
use std::time::Duration;

use thiserror::Error;
use validator::Validate;

use crate::models::oracle::FlightStatus;
use crate::models::Address;

pub mod contracts;

pub use contracts::ContractsConfig;

const DEFAULT_RPC_URL: &str = "http://127.0.0.1:8545";
const DEFAULT_POOL_SIZE: usize = 10;
const DEFAULT_ACCOUNT_OFFSET: usize = 10;
const DEFAULT_GAS: u64 = 4_712_388;
const DEFAULT_POLL_INTERVAL_MS: u64 = 2_000;
const DEFAULT_PORT: u16 = 3001;
const DEFAULT_CORS_ORIGINS: &str = "http://localhost:3000";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required environment variable {0}")]
    Missing(&'static str),
    #[error("invalid value for {key}: {reason}")]
    Invalid { key: &'static str, reason: String },
    #[error("configuration validation failed: {0}")]
    Validation(#[from] validator::ValidationErrors),
    #[error("{available} oracle addresses available but pool size is {pool_size}")]
    NotEnoughOracleAddresses { available: usize, pool_size: usize },
}

#[derive(Debug, Clone, Validate)]
pub struct Config {
    #[validate(url)]
    pub rpc_url: String,
    pub contracts: ContractsConfig,
    #[validate(range(min = 1))]
    pub pool_size: usize,
    /// Addresses reserved for the simulated oracles. When unset the node's
    /// accounts starting at `account_offset` are used instead.
    pub oracle_addresses: Option<Vec<Address>>,
    pub account_offset: usize,
    #[validate(range(min = 21000))]
    pub gas: u64,
    pub fixed_status: Option<FlightStatus>,
    #[validate(range(min = 100))]
    pub poll_interval_ms: u64,
    pub port: u16,
    pub cors_allowed_origins: Vec<String>,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let oracle_addresses = lookup("ORACLE_ADDRESSES")
            .map(|raw| parse_list(&raw, "ORACLE_ADDRESSES"))
            .transpose()?;

        let fixed_status = parse_var::<u8, _>(&lookup, "ORACLE_FIXED_STATUS")?
            .map(|code| {
                FlightStatus::try_from(code).map_err(|err| ConfigError::Invalid {
                    key: "ORACLE_FIXED_STATUS",
                    reason: err.to_string(),
                })
            })
            .transpose()?;

        let config = Self {
            rpc_url: lookup("ETH_RPC_URL").unwrap_or_else(|| DEFAULT_RPC_URL.to_string()),
            contracts: ContractsConfig::from_lookup(&lookup)?,
            pool_size: parse_var(&lookup, "ORACLE_POOL_SIZE")?.unwrap_or(DEFAULT_POOL_SIZE),
            oracle_addresses,
            account_offset: parse_var(&lookup, "ORACLE_ACCOUNT_OFFSET")?
                .unwrap_or(DEFAULT_ACCOUNT_OFFSET),
            gas: parse_var(&lookup, "ORACLE_GAS")?.unwrap_or(DEFAULT_GAS),
            fixed_status,
            poll_interval_ms: parse_var(&lookup, "LOG_POLL_INTERVAL_MS")?
                .unwrap_or(DEFAULT_POLL_INTERVAL_MS),
            port: parse_var(&lookup, "PORT")?.unwrap_or(DEFAULT_PORT),
            cors_allowed_origins: lookup("CORS_ALLOWED_ORIGINS")
                .unwrap_or_else(|| DEFAULT_CORS_ORIGINS.to_string())
                .split(',')
                .map(str::trim)
                .filter(|origin| !origin.is_empty())
                .map(ToString::to_string)
                .collect(),
        };

        config.validate()?;
        if let Some(addresses) = &config.oracle_addresses {
            select_oracle_candidates(config.pool_size, addresses)?;
        }

        Ok(config)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}

/// First `pool_size` addresses of `available`, or an error when there are
/// not enough of them.
pub fn select_oracle_candidates(
    pool_size: usize,
    available: &[Address],
) -> Result<Vec<Address>, ConfigError> {
    if available.len() < pool_size {
        return Err(ConfigError::NotEnoughOracleAddresses {
            available: available.len(),
            pool_size,
        });
    }
    Ok(available[..pool_size].to_vec())
}

pub(crate) fn parse_var<T, F>(lookup: &F, key: &'static str) -> Result<Option<T>, ConfigError>
where
    T: FromStr,
    T::Err: Display,
    F: Fn(&str) -> Option<String>,
{
    lookup(key)
        .map(|raw| raw.trim().to_string())
        .filter(|raw| !raw.is_empty())
        .map(|raw| {
            raw.parse::<T>().map_err(|err| ConfigError::Invalid {
                key,
                reason: err.to_string(),
            })
        })
        .transpose()
}

fn parse_list<T>(raw: &str, key: &'static str) -> Result<Vec<T>, ConfigError>
where
    T: FromStr,
    T::Err: Display,
{
    raw.split(',')
        .map(str::trim)
        .filter(|item| !item.is_empty())
        .map(|item| {
            item.parse::<T>().map_err(|err| ConfigError::Invalid {
                key,
                reason: format!("{item}: {err}"),
            })
        })
        .collect()
}
