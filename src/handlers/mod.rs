//! HTTP surface (spec §4.1/§6): discovery, the protected gateway, the
//! agent execute/verify delegation endpoints, claims, and revenue.

pub mod agent;
pub mod claim;
pub mod discovery;
pub mod gateway;
pub mod revenue;
pub mod verify_payment;

use axum::Router;
use axum::routing::{get, post};
use std::sync::Arc;

use crate::chain::ChainClient;
use crate::config::Config;
use crate::store::Store;

/// Token metadata fetched once at startup; it never changes at runtime.
#[derive(Debug, Clone)]
pub struct TokenInfo {
    pub name: String,
    pub symbol: String,
    pub decimals: u8,
}

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub chain: ChainClient,
    pub store: Store,
    pub http_client: reqwest::Client,
    pub token_info: TokenInfo,
}

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/", get(discovery::root))
        .route("/health", get(discovery::health))
        .route("/.well-known/ai-plugin.json", get(discovery::ai_plugin_manifest))
        .route("/services", get(discovery::list_services))
        .route("/services/{id}", get(discovery::get_service))
        .route("/agent/services", get(discovery::agent_list_services))
        .route("/agent/services/{id}", get(discovery::agent_get_service))
        .route("/agent/execute", post(agent::execute))
        .route("/gateway/{service_id}", get(gateway::handle).post(gateway::handle))
        .route("/verify-payment", post(verify_payment::verify_payment))
        .route("/claim", post(claim::claim))
        .route("/revenue/wallet", get(revenue::by_wallet))
        .route("/revenue/{provider_id}", get(revenue::by_provider))
}
