//! Startup orchestration.
//!
//! Subsystems initialize in dependency order: chain client, chain session,
//! price feed, then the shared handler state. Any error here is fatal.

use std::sync::Arc;

use thiserror::Error;

use crate::chain::client::{HttpChainClient, SharedChainRpc};
use crate::chain::keys::SignerSet;
use crate::chain::types::{ChainError, Name};
use crate::chain::ChainSession;
use crate::config::loader::ConfigError;
use crate::config::schema::GatewayConfig;
use crate::http::server::AppState;
use crate::pricing::{CoinGeckoFeed, PriceEstimator, PricingError};

#[derive(Debug, Error)]
pub enum StartupError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Chain setup failed: {0}")]
    Chain(#[from] ChainError),

    #[error("Price feed setup failed: {0}")]
    Pricing(#[from] PricingError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Build handler state against an already constructed chain client.
pub fn build_state_with_client(
    config: &GatewayConfig,
    client: SharedChainRpc,
    signer: SignerSet,
) -> Result<AppState, StartupError> {
    let contract: Name = config.contract.account.parse()?;
    let session = ChainSession::new(client.clone(), contract, signer);
    tracing::info!(
        contract = %contract,
        entity_kind = ?config.contract.entity_kind,
        "Chain session ready"
    );

    let feed = Arc::new(CoinGeckoFeed::new(&config.pricing)?);
    let pricing = Arc::new(PriceEstimator::new(
        client,
        feed,
        config.pricing.fiat_currency.clone(),
        config.pricing.fiat_symbol.clone(),
    ));

    Ok(AppState::new(config, session, pricing)?)
}

/// Build handler state from configuration and the operator key.
pub fn build_state(config: &GatewayConfig, signer: SignerSet) -> Result<AppState, StartupError> {
    let client: SharedChainRpc = Arc::new(HttpChainClient::new(config.chain.clone())?);
    build_state_with_client(config, client, signer)
}
