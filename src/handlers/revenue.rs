//! Revenue reporting (spec §4.7): the ledger mirror records history, but the
//! claimable balance itself is always read from `escrow.providerBalances`
//! directly — the mirror can drift (legacy settlements, missed events), and
//! a provider should never be told they can claim more than the contract
//! will actually pay out.

use alloy_primitives::Address;
use axum::Json;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;
use std::str::FromStr;
use uuid::Uuid;

use crate::chain::contracts::Escrow;
use crate::handlers::AppState;
use crate::handlers::discovery::store_error_response;
use crate::util::money::base_units_to_decimal_string;

#[derive(Debug, Deserialize)]
pub struct WalletQuery {
    pub address: String,
}

/// `GET /revenue/wallet?address=W`: a pure on-chain read, usable even for a
/// wallet the ledger mirror has never heard of.
pub async fn by_wallet(State(state): State<Arc<AppState>>, Query(query): Query<WalletQuery>) -> Response {
    let address = match Address::from_str(&query.address) {
        Ok(address) => address,
        Err(_) => {
            return (
                StatusCode::BAD_REQUEST,
                Json(json!({ "error": "INVALID_REQUEST", "message": "address is not a valid EVM address" })),
            )
                .into_response();
        }
    };

    let escrow = Escrow::new(state.config.escrow_address, state.chain.provider());
    let raw_balance = match escrow.providerBalances(address).call().await {
        Ok(balance) => balance,
        Err(e) => {
            return (
                StatusCode::BAD_GATEWAY,
                Json(json!({ "error": "UPSTREAM_FAILED", "message": e.to_string() })),
            )
                .into_response();
        }
    };
    let claimable_balance = base_units_to_decimal_string(raw_balance, state.token_info.decimals);

    Json(json!({
        "claimable_balance": claimable_balance,
        "raw_balance": raw_balance.to_string(),
        "source": "on-chain",
    }))
    .into_response()
}

/// `GET /revenue/{provider_id}`: the mirrored earn/claim history, with the
/// claimable figure overridden by the live on-chain balance.
pub async fn by_provider(State(state): State<Arc<AppState>>, Path(provider_id): Path<Uuid>) -> Response {
    let provider = match state.store.find_provider(provider_id).await {
        Ok(provider) => provider,
        Err(e) => return store_error_response(e).into_response(),
    };
    let wallet = match Address::from_str(&provider.wallet_address) {
        Ok(wallet) => wallet,
        Err(_) => {
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "error": "INTERNAL", "message": "stored wallet_address is not a valid address" })),
            )
                .into_response();
        }
    };

    let escrow = Escrow::new(state.config.escrow_address, state.chain.provider());
    let raw_balance = match escrow.providerBalances(wallet).call().await {
        Ok(balance) => balance,
        Err(e) => {
            return (
                StatusCode::BAD_GATEWAY,
                Json(json!({ "error": "UPSTREAM_FAILED", "message": e.to_string() })),
            )
                .into_response();
        }
    };
    let claimable_balance = base_units_to_decimal_string(raw_balance, state.token_info.decimals);

    Json(json!({
        "provider_id": provider.id,
        "wallet_address": provider.wallet_address,
        "total_earned": provider.total_earned.to_string(),
        "total_claimed": provider.total_claimed.to_string(),
        "claimable_balance": claimable_balance,
        "raw_balance": raw_balance.to_string(),
        "source": "on-chain",
    }))
    .into_response()
}
