//! x402 gateway HTTP entrypoint.
//!
//! This binary launches an Axum-based server that fronts a catalog of
//! pay-per-call services, gated by on-chain x402 settlement.
//!
//! This server includes:
//! - structured `tracing` output, `RUST_LOG`-controlled
//! - CORS support for cross-origin clients
//! - a request timeout and tracing layer from `tower-http`
//!
//! Environment: `.env` values loaded at startup; see `config` for the full
//! list of required/optional variables.

use axum::Router;
use axum::http::Method;
use dotenvy::dotenv;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tower_http::cors;
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

use x402_gateway::chain::ChainClient;
use x402_gateway::chain::contracts::Erc20;
use x402_gateway::config::Config;
use x402_gateway::handlers::{self, AppState, TokenInfo};
use x402_gateway::sig_down::SigDown;
use x402_gateway::store::Store;
use x402_gateway::telemetry;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenv().ok();
    telemetry::init();

    let config = Config::load()?;
    tracing::info!(chain_id = config.chain_id, "configuration loaded");

    let chain = ChainClient::connect(&config).await?;
    tracing::info!(
        relayer = %chain.default_signer_address(),
        chain_id = chain.chain_id(),
        "connected to chain"
    );

    for (label, address) in [
        ("PaymentProcessor", config.payment_processor_address),
        ("Escrow", config.escrow_address),
        ("ServiceRegistry", config.service_registry_address),
        ("Token", config.token_address),
    ] {
        chain.assert_contract_deployed(address).await.unwrap_or_else(|e| {
            tracing::error!(contract = label, %address, error = %e, "startup contract check failed");
            std::process::exit(1);
        });
    }

    let token = Erc20::new(config.token_address, chain.provider());
    let token_info = TokenInfo {
        name: token.name().call().await?,
        symbol: token.symbol().call().await?,
        decimals: token.decimals().call().await?,
    };
    tracing::info!(name = %token_info.name, symbol = %token_info.symbol, decimals = token_info.decimals, "resolved settlement token");

    let store = Store::connect(&config.database_url).await?;
    tracing::info!("connected to database and applied pending migrations");

    let state = Arc::new(AppState {
        config: Arc::new(config.clone()),
        chain,
        store,
        http_client: reqwest::Client::new(),
        token_info,
    });

    let app = Router::new()
        .merge(handlers::routes())
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(TimeoutLayer::new(REQUEST_TIMEOUT))
        .layer(
            cors::CorsLayer::new()
                .allow_origin(cors::Any)
                .allow_methods([Method::GET, Method::POST])
                .allow_headers(cors::Any),
        );

    let addr = SocketAddr::new(config.host, config.port);
    tracing::info!("starting server at http://{addr}");

    let listener = tokio::net::TcpListener::bind(addr).await.unwrap_or_else(|e| {
        tracing::error!(%addr, error = %e, "failed to bind listener");
        std::process::exit(1);
    });

    let sig_down = SigDown::try_new()?;
    let cancellation_token = sig_down.cancellation_token();
    axum::serve(listener, app)
        .with_graceful_shutdown(async move { cancellation_token.cancelled().await })
        .await?;

    Ok(())
}
