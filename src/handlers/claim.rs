//! `POST /claim` (spec §4.7/§9): provider-initiated withdrawal. Always goes
//! through `escrow.withdraw`, never `escrow.claim` — the relayer pays gas on
//! the provider's behalf, which is the whole point of exposing this as an
//! HTTP endpoint instead of asking providers to call the contract directly.

use alloy_network::TransactionBuilder;
use alloy_primitives::Address;
use alloy_rpc_types_eth::TransactionRequest;
use alloy_sol_types::SolCall;
use axum::Json;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use rust_decimal::Decimal;
use serde::Deserialize;
use serde_json::json;
use std::str::FromStr;
use std::sync::Arc;
use uuid::Uuid;

use crate::chain::contracts::Escrow;
use crate::handlers::AppState;
use crate::handlers::discovery::store_error_response;
use crate::protocol::error::ProtocolError;
use crate::util::money::MoneyAmount;

const WITHDRAW_GAS_LIMIT: u64 = 150_000;

#[derive(Debug, Deserialize)]
pub struct ClaimRequest {
    pub wallet_address: Option<Address>,
    pub provider_id: Option<Uuid>,
    pub amount: String,
}

/// Resolves the claim target: an explicit `wallet_address` wins; otherwise
/// `provider_id` is looked up in the ledger mirror.
async fn resolve_wallet(state: &AppState, request: &ClaimRequest) -> Result<Address, Response> {
    if let Some(wallet) = request.wallet_address {
        return Ok(wallet);
    }
    let Some(provider_id) = request.provider_id else {
        return Err((
            StatusCode::BAD_REQUEST,
            Json(json!({ "error": "INVALID_REQUEST", "message": "wallet_address or provider_id is required" })),
        )
            .into_response());
    };
    let provider = state
        .store
        .find_provider(provider_id)
        .await
        .map_err(|e| store_error_response(e).into_response())?;
    Address::from_str(&provider.wallet_address)
        .map_err(|_| ProtocolError::Internal("stored wallet_address is not a valid address".to_string()).into_response())
}

pub async fn claim(State(state): State<Arc<AppState>>, Json(request): Json<ClaimRequest>) -> Response {
    let wallet = match resolve_wallet(&state, &request).await {
        Ok(wallet) => wallet,
        Err(response) => return response,
    };

    let amount = match MoneyAmount::parse(&request.amount).and_then(|a| a.to_base_units(state.token_info.decimals)) {
        Ok(amount) => amount,
        Err(e) => {
            return (
                StatusCode::BAD_REQUEST,
                Json(json!({ "error": "INVALID_REQUEST", "message": e.to_string() })),
            )
                .into_response();
        }
    };

    let call = Escrow::withdrawCall { provider: wallet, amount };
    let tx = TransactionRequest::default()
        .to(state.config.escrow_address)
        .input(call.abi_encode().into())
        .gas_limit(WITHDRAW_GAS_LIMIT);

    let receipt = match state.chain.send_transaction(tx).await {
        Ok(receipt) => receipt,
        Err(e) => return ProtocolError::SettlementFailed(e.to_string()).into_response(),
    };
    if !receipt.status() {
        return ProtocolError::SettlementFailed("withdraw reverted on chain".to_string()).into_response();
    }

    let tx_hash = receipt.transaction_hash.to_string();
    if let Some(provider_id) = request.provider_id {
        let decimal_amount = Decimal::from_str(&amount.to_string()).unwrap_or_default();
        if let Err(e) = state.store.record_claim(provider_id, decimal_amount, &tx_hash).await {
            tracing::error!(error = %e, "failed to record claim in ledger mirror");
        }
    }

    Json(json!({ "tx_hash": tx_hash, "wallet_address": wallet, "amount": amount.to_string() })).into_response()
}
