//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate addresses, URLs, names and asset strings
//! - Validate value ranges (timeouts > 0, scans fit in the request timeout)
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: GatewayConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::net::SocketAddr;

use crate::chain::types::{Asset, Name};
use crate::config::schema::GatewayConfig;

/// A single semantic problem in the configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    pub field: &'static str,
    pub message: String,
}

impl ValidationError {
    fn new(field: &'static str, message: impl Into<String>) -> Self {
        Self {
            field,
            message: message.into(),
        }
    }
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

const LOG_LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error"];

fn check_http_url(field: &'static str, raw: &str, errors: &mut Vec<ValidationError>) {
    match raw.parse::<url::Url>() {
        Ok(url) if url.scheme() == "http" || url.scheme() == "https" => {}
        Ok(url) => errors.push(ValidationError::new(
            field,
            format!("unsupported scheme '{}'", url.scheme()),
        )),
        Err(e) => errors.push(ValidationError::new(field, format!("invalid URL '{}': {}", raw, e))),
    }
}

pub fn validate_config(config: &GatewayConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.listener.bind_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::new(
            "listener.bind_address",
            format!("invalid socket address '{}'", config.listener.bind_address),
        ));
    }

    check_http_url("chain.rpc_url", &config.chain.rpc_url, &mut errors);
    for url in &config.chain.failover_urls {
        check_http_url("chain.failover_urls", url, &mut errors);
    }
    if config.chain.rpc_timeout_secs == 0 {
        errors.push(ValidationError::new("chain.rpc_timeout_secs", "must be greater than 0"));
    }
    if config.chain.expire_seconds == 0 {
        errors.push(ValidationError::new("chain.expire_seconds", "must be greater than 0"));
    }
    if config.chain.new_account_stake.parse::<Asset>().is_err() {
        errors.push(ValidationError::new(
            "chain.new_account_stake",
            format!("invalid asset '{}'", config.chain.new_account_stake),
        ));
    }

    if config.contract.account.parse::<Name>().is_err() {
        errors.push(ValidationError::new(
            "contract.account",
            format!("invalid account name '{}'", config.contract.account),
        ));
    }

    check_http_url("pricing.feed_url", &config.pricing.feed_url, &mut errors);
    if config.pricing.asset_id.is_empty() {
        errors.push(ValidationError::new("pricing.asset_id", "must not be empty"));
    }
    if config.pricing.fiat_currency.is_empty() {
        errors.push(ValidationError::new("pricing.fiat_currency", "must not be empty"));
    }

    if config.timeouts.request_secs == 0 {
        errors.push(ValidationError::new("timeouts.request_secs", "must be greater than 0"));
    } else {
        let budget_ms = config.timeouts.request_secs.saturating_mul(1000);
        let c = &config.confirmation;
        let longest_scan = (c.single_max_blocks as u64 * c.single_delay_ms)
            .max(c.composite_max_blocks as u64 * c.composite_delay_ms);
        if longest_scan >= budget_ms {
            errors.push(ValidationError::new(
                "timeouts.request_secs",
                format!("shorter than the longest confirmation scan ({} ms)", longest_scan),
            ));
        }
        if config.chain.rpc_timeout_secs >= config.timeouts.request_secs {
            errors.push(ValidationError::new(
                "timeouts.request_secs",
                "must be longer than chain.rpc_timeout_secs",
            ));
        }
    }

    if config.security.max_body_size == 0 {
        errors.push(ValidationError::new("security.max_body_size", "must be greater than 0"));
    }

    if !LOG_LEVELS.contains(&config.observability.log_level.to_lowercase().as_str()) {
        errors.push(ValidationError::new(
            "observability.log_level",
            format!("unknown level '{}'", config.observability.log_level),
        ));
    }
    if config.observability.metrics_enabled
        && config.observability.metrics_address.parse::<SocketAddr>().is_err()
    {
        errors.push(ValidationError::new(
            "observability.metrics_address",
            format!("invalid socket address '{}'", config.observability.metrics_address),
        ));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
