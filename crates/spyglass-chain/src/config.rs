//! Configuration for the chain connection.
//!
//! Supplied by the embedding process (environment in production,
//! [`ChainConfig::default`] plus field overrides in tests); the access
//! layer itself never reads configuration from anywhere else.

use std::time::Duration;

use anyhow::{Context, Result};

/// Connection settings for one remote consensus node.
#[derive(Debug, Clone)]
pub struct ChainConfig {
    /// JSON-RPC endpoint of the node.
    pub rpc_endpoint: String,
    /// Chain identifier, also the fallback network name in normalized
    /// and synthetic status payloads.
    pub chain_id: String,
    /// Human-readable account address prefix (bech32-style).
    pub address_prefix: String,
    /// Upper bound on a single RPC round-trip.
    pub call_timeout: Duration,
    /// Supervisor health-check and reconnect interval.
    pub probe_interval: Duration,
}

impl Default for ChainConfig {
    fn default() -> Self {
        Self {
            rpc_endpoint: "http://127.0.0.1:26657".to_string(),
            chain_id: "spyglass-devnet".to_string(),
            address_prefix: "cosmos".to_string(),
            call_timeout: Duration::from_secs(10),
            probe_interval: Duration::from_secs(30),
        }
    }
}

impl ChainConfig {
    /// Load connection settings from environment variables, falling back
    /// to devnet defaults for anything unset.
    pub fn from_env() -> Result<Self> {
        let defaults = Self::default();

        let call_timeout_secs: u64 = std::env::var("RPC_TIMEOUT_SECS")
            .unwrap_or_else(|_| "10".to_string())
            .parse()
            .context("RPC_TIMEOUT_SECS must be a positive integer")?;

        let probe_interval_secs: u64 = std::env::var("RECONNECT_INTERVAL_SECS")
            .unwrap_or_else(|_| "30".to_string())
            .parse()
            .context("RECONNECT_INTERVAL_SECS must be a positive integer")?;

        Ok(Self {
            rpc_endpoint: std::env::var("RPC_ENDPOINT").unwrap_or(defaults.rpc_endpoint),
            chain_id: std::env::var("CHAIN_ID").unwrap_or(defaults.chain_id),
            address_prefix: std::env::var("ADDRESS_PREFIX").unwrap_or(defaults.address_prefix),
            call_timeout: Duration::from_secs(call_timeout_secs),
            probe_interval: Duration::from_secs(probe_interval_secs),
        })
    }
}
