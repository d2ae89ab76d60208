//! Certification gateway.
//!
//! ```text
//!     Client request
//!     ──────▶ http (router, middleware) ──▶ handlers
//!                                             │
//!              ┌──────────────┬───────────────┼───────────────┬──────────────┐
//!              ▼              ▼               ▼               ▼              ▼
//!          certify         chain         confirmation       query         pricing
//!         (builder)   (session, sign,     (block scan)   (table rows)  (RAM + feed)
//!                       serialize, RPC)
//!                             │
//!                             ▼
//!                        EOSIO node
//! ```

use std::path::PathBuf;

use clap::Parser;
use tokio::net::TcpListener;

use certify_gateway::chain::keys::SignerSet;
use certify_gateway::config::load_config;
use certify_gateway::lifecycle::signals::spawn_signal_listener;
use certify_gateway::lifecycle::{build_state, Shutdown};
use certify_gateway::observability::{logging, metrics};
use certify_gateway::HttpServer;

#[derive(Parser)]
#[command(name = "certify-gateway")]
#[command(about = "REST gateway for the EOSIO certification contract", long_about = None)]
struct Args {
    /// TOML configuration file. Defaults apply when omitted.
    #[arg(short, long, env = "CERTIFY_CONFIG")]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    let config = load_config(args.config.as_deref())?;
    logging::init_logging(&config.observability.log_level);

    tracing::info!("certify-gateway v{} starting", env!("CARGO_PKG_VERSION"));
    tracing::info!(
        bind_address = %config.listener.bind_address,
        rpc_url = %config.chain.rpc_url,
        contract = %config.contract.account,
        request_timeout_secs = config.timeouts.request_secs,
        "Configuration loaded"
    );

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse() {
            Ok(addr) => metrics::init_metrics(addr),
            Err(_) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            ),
        }
    }

    let signer = SignerSet::from_env()?;
    let state = build_state(&config, signer)?;

    let listener = TcpListener::bind(&config.listener.bind_address).await?;
    tracing::info!(address = %listener.local_addr()?, "Listening for connections");

    let shutdown = Shutdown::new();
    let signals = spawn_signal_listener(shutdown.clone());

    let server = HttpServer::new(&config, state);
    server.run(listener, shutdown.subscribe()).await?;

    signals.abort();
    tracing::info!("Shutdown complete");
    Ok(())
}
