//! Discovery surface (spec §4.9): the free catalog endpoints, plus the
//! agent-shaped variants that also carry the EIP-712 domain/types needed to
//! sign, and the `.well-known/ai-plugin.json` manifest.

use axum::Json;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;
use uuid::Uuid;

use crate::handlers::{AppState, TokenInfo};
use crate::protocol::requirements::{PaymentRequirements, RequirementsExtra};
use crate::store::error::StoreError;
use crate::store::models::{ServiceKind, ServiceRecord};
use crate::util::money::base_units_to_decimal_string;

/// Builds the structured payment requirements block for a service, per the
/// canonical shape in spec §6. `payTo` is always the escrow contract, never
/// the provider's own wallet (spec §4.2).
pub fn to_payment_requirements(
    service: &ServiceRecord,
    token: &TokenInfo,
    state: &AppState,
) -> PaymentRequirements {
    PaymentRequirements {
        scheme: "exact".to_string(),
        network: format!("eip155:{}", state.config.chain_id),
        max_amount_required: service.price_base_units.to_string(),
        resource: format!("/gateway/{}", service.id),
        description: service.name.clone(),
        pay_to: state.config.escrow_address,
        max_timeout_seconds: 300,
        asset: state.config.token_address,
        extra: RequirementsExtra {
            symbol: token.symbol.clone(),
            decimals: token.decimals,
            token_name: token.name.clone(),
        },
    }
}

#[derive(Serialize)]
struct CatalogEntry {
    id: Uuid,
    name: String,
    description: String,
    kind: ServiceKind,
    tag: Option<String>,
    price_decimal: String,
    #[serde(rename = "paymentRequirements")]
    payment_requirements: PaymentRequirements,
}

fn to_catalog_entry(service: &ServiceRecord, token: &TokenInfo, state: &AppState) -> CatalogEntry {
    let price_decimal = base_units_to_decimal_string(
        alloy_primitives::U256::from_str_radix(&service.price_base_units.to_string(), 10).unwrap_or_default(),
        token.decimals,
    );
    CatalogEntry {
        id: service.id,
        name: service.name.clone(),
        description: service.description.clone(),
        kind: service.kind,
        tag: service.tag.clone(),
        price_decimal,
        payment_requirements: to_payment_requirements(service, token, state),
    }
}

#[derive(Deserialize)]
pub struct ListQuery {
    pub tag: Option<String>,
    pub search: Option<String>,
}

pub async fn list_services(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ListQuery>,
) -> Result<Json<Vec<CatalogEntry>>, (StatusCode, Json<serde_json::Value>)> {
    let services = state
        .store
        .list_services(query.tag.as_deref(), query.search.as_deref())
        .await
        .map_err(store_error_response)?;
    let entries = services
        .iter()
        .map(|s| to_catalog_entry(s, &state.token_info, &state))
        .collect();
    Ok(Json(entries))
}

pub async fn get_service(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<Json<CatalogEntry>, (StatusCode, Json<serde_json::Value>)> {
    let service = state.store.find_service(id).await.map_err(store_error_response)?;
    Ok(Json(to_catalog_entry(&service, &state.token_info, &state)))
}

#[derive(Serialize)]
struct AgentCatalogEntry {
    #[serde(flatten)]
    entry: CatalogEntry,
    #[serde(rename = "signingInfo")]
    signing_info: SigningInfo,
    #[serde(rename = "executeEndpoint")]
    execute_endpoint: String,
}

#[derive(Serialize)]
struct SigningInfo {
    domain: SigningDomain,
    #[serde(rename = "primaryType")]
    primary_type: &'static str,
    types: serde_json::Value,
}

#[derive(Serialize)]
struct SigningDomain {
    name: String,
    version: &'static str,
    #[serde(rename = "chainId")]
    chain_id: u64,
    #[serde(rename = "verifyingContract")]
    verifying_contract: alloy_primitives::Address,
}

fn signing_info(state: &AppState) -> SigningInfo {
    SigningInfo {
        domain: SigningDomain {
            name: state.token_info.name.clone(),
            version: "1",
            chain_id: state.config.chain_id,
            verifying_contract: state.config.token_address,
        },
        primary_type: "ReceiveWithAuthorization",
        types: json!({
            "ReceiveWithAuthorization": [
                { "name": "from", "type": "address" },
                { "name": "to", "type": "address" },
                { "name": "value", "type": "uint256" },
                { "name": "validAfter", "type": "uint256" },
                { "name": "validBefore", "type": "uint256" },
                { "name": "nonce", "type": "bytes32" },
            ]
        }),
    }
}

pub async fn agent_list_services(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ListQuery>,
) -> Result<Json<Vec<AgentCatalogEntry>>, (StatusCode, Json<serde_json::Value>)> {
    let services = state
        .store
        .list_services(query.tag.as_deref(), query.search.as_deref())
        .await
        .map_err(store_error_response)?;
    let entries = services
        .iter()
        .map(|s| AgentCatalogEntry {
            entry: to_catalog_entry(s, &state.token_info, &state),
            signing_info: signing_info(&state),
            execute_endpoint: "/agent/execute".to_string(),
        })
        .collect();
    Ok(Json(entries))
}

pub async fn agent_get_service(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<Json<AgentCatalogEntry>, (StatusCode, Json<serde_json::Value>)> {
    let service = state.store.find_service(id).await.map_err(store_error_response)?;
    Ok(Json(AgentCatalogEntry {
        entry: to_catalog_entry(&service, &state.token_info, &state),
        signing_info: signing_info(&state),
        execute_endpoint: "/agent/execute".to_string(),
    }))
}

pub async fn ai_plugin_manifest(State(state): State<Arc<AppState>>) -> Json<serde_json::Value> {
    Json(json!({
        "schema_version": "v1",
        "name_for_model": "x402_gateway",
        "name_for_human": "x402 Pay-Per-Call Gateway",
        "description_for_model": "Discover and pay for services over the x402 protocol, then call them.",
        "description_for_human": "Pay-per-call API marketplace gated by on-chain micropayments.",
        "api": {
            "type": "openapi",
            "catalog_endpoint": "/agent/services",
            "execute_endpoint": "/agent/execute",
        },
        "chain_id": state.config.chain_id,
    }))
}

pub async fn root() -> Json<serde_json::Value> {
    Json(json!({ "name": "x402-gateway", "status": "ok" }))
}

pub async fn health() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok" }))
}

pub fn store_error_response(err: StoreError) -> (StatusCode, Json<serde_json::Value>) {
    match err {
        StoreError::ServiceNotFound(_) | StoreError::ProviderNotFound(_) => {
            (StatusCode::NOT_FOUND, Json(json!({ "error": err.to_string() })))
        }
        StoreError::Database(_) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({ "error": "internal storage error" })),
        ),
    }
}
