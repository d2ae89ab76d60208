//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the gateway.
//! All types derive Serde traits for deserialization from config files.

use serde::{Deserialize, Serialize};

/// Root configuration for the certification gateway.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct GatewayConfig {
    /// Listener configuration (bind address).
    pub listener: ListenerConfig,

    /// Chain RPC settings.
    pub chain: ChainConfig,

    /// Certification contract settings.
    pub contract: ContractConfig,

    /// Block scan policies for confirmed endpoints.
    pub confirmation: ConfirmationConfig,

    /// Fee estimation settings.
    pub pricing: PricingConfig,

    /// Timeout configuration.
    pub timeouts: TimeoutConfig,

    /// Request limits.
    pub security: SecurityConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "0.0.0.0:3000").
    pub bind_address: String,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:3000".to_string(),
        }
    }
}

/// Chain RPC configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ChainConfig {
    /// Node HTTP endpoint. Overridden by `EOS_URL`.
    pub rpc_url: String,

    /// Failover node endpoints, tried in order for reads.
    pub failover_urls: Vec<String>,

    /// RPC request timeout in seconds.
    pub rpc_timeout_secs: u64,

    /// Distance behind head of the TAPOS reference block.
    pub blocks_behind: u32,

    /// Transaction lifetime in seconds.
    pub expire_seconds: u32,

    /// Blocks behind head used for co-signed certificate signing.
    pub signing_blocks_behind: u32,

    /// Stake delegated to new accounts, for both net and cpu.
    pub new_account_stake: String,
}

impl Default for ChainConfig {
    fn default() -> Self {
        Self {
            rpc_url: "http://127.0.0.1:8888".to_string(),
            failover_urls: Vec::new(),
            rpc_timeout_secs: 10,
            blocks_behind: 3,
            expire_seconds: 30,
            signing_blocks_behind: 30,
            new_account_stake: "0.0001 EOS".to_string(),
        }
    }
}

/// Which contract variant the deployment talks to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    /// `certify`: institutions, named certificates, account participants.
    #[default]
    Institution,
    /// `cerify`: corporates, certificate templates, numeric assignees.
    Corporate,
}

/// Certification contract configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ContractConfig {
    /// Contract account, also the operator account. Overridden by `EOS_CONTRACT`.
    pub account: String,

    /// Contract variant for the shared certificate endpoints.
    pub entity_kind: EntityKind,
}

impl Default for ContractConfig {
    fn default() -> Self {
        Self {
            account: "certify".to_string(),
            entity_kind: EntityKind::Institution,
        }
    }
}

/// Block scan policies.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ConfirmationConfig {
    /// Blocks scanned for single-purpose flows (account creation).
    pub single_max_blocks: u32,

    /// Delay between block fetches for single-purpose flows.
    pub single_delay_ms: u64,

    /// Blocks scanned for composite flows.
    pub composite_max_blocks: u32,

    /// Delay between block fetches for composite flows.
    pub composite_delay_ms: u64,
}

impl Default for ConfirmationConfig {
    fn default() -> Self {
        Self {
            single_max_blocks: 20,
            single_delay_ms: 500,
            composite_max_blocks: 40,
            composite_delay_ms: 100,
        }
    }
}

/// Fee estimation configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct PricingConfig {
    /// Base URL of a CoinGecko-compatible API.
    pub feed_url: String,

    /// Asset id on the feed.
    pub asset_id: String,

    /// Fiat currency code on the feed.
    pub fiat_currency: String,

    /// Symbol used in the human-readable estimate message.
    pub fiat_symbol: String,

    /// Feed request timeout in seconds.
    pub feed_timeout_secs: u64,
}

impl Default for PricingConfig {
    fn default() -> Self {
        Self {
            feed_url: "https://api.coingecko.com/api/v3".to_string(),
            asset_id: "eos".to_string(),
            fiat_currency: "gbp".to_string(),
            fiat_symbol: "£".to_string(),
            feed_timeout_secs: 10,
        }
    }
}

/// Timeout configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TimeoutConfig {
    /// Request timeout in seconds. Must cover the longest block scan.
    pub request_secs: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self { request_secs: 60 }
    }
}

/// Request limits.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct SecurityConfig {
    /// Maximum body size in bytes.
    pub max_body_size: usize,
}

impl Default for SecurityConfig {
    fn default() -> Self {
        Self {
            max_body_size: 256 * 1024,
        }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            metrics_enabled: false,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}
