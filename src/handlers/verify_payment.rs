//! `POST /verify-payment` (spec §4.1/§9): lets an external service delegate
//! verify+settle to this gateway instead of running its own chain client.
//! When `service_id` resolves to a known active service, the preferred
//! processor path runs and the provider ledger is credited normally.
//! Otherwise this falls back to the legacy direct-`receiveWithAuthorization`
//! path (§9's documented source ambiguity): it settles on chain but, having
//! no service to attach an access-log row to, only ever logs the credit —
//! it never touches the ledger mirror.

use axum::Json;
use axum::extract::State;
use axum::response::{IntoResponse, Response};
use rust_decimal::Decimal;
use rust_decimal::prelude::FromPrimitive;
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;
use tokio::task::JoinSet;
use uuid::Uuid;

use crate::chain::contracts::Erc20;
use crate::handlers::AppState;
use crate::handlers::discovery::to_payment_requirements;
use crate::handlers::gateway;
use crate::protocol::codec;
use crate::protocol::error::ProtocolError;
use crate::protocol::requirements::{PaymentRequirements, RequirementsExtra};
use crate::protocol::verifier::{self, VerifyContext};
use crate::relayer::settlement::{self, ConfirmationPolicy};
use crate::timestamp::UnixTimestamp;

#[derive(Debug, Deserialize)]
pub struct VerifyPaymentRequest {
    pub payment_signature: String,
    pub service_id: Option<Uuid>,
    #[allow(dead_code)]
    pub provider_id: Option<Uuid>,
    pub amount: Option<String>,
}

pub async fn verify_payment(
    State(state): State<Arc<AppState>>,
    Json(request): Json<VerifyPaymentRequest>,
) -> Response {
    let decoded = match codec::decode_payment_header(&request.payment_signature) {
        Ok(decoded) => decoded,
        Err(err) => return err.into_response(),
    };
    let signature = decoded.signature;

    if let Some(service_id) = request.service_id {
        match state.store.find_service(service_id).await {
            Ok(service) if !service.active => {
                return ProtocolError::ServiceInactive { known: true }.into_response();
            }
            Ok(service) => {
                let requirements = to_payment_requirements(&service, &state.token_info, &state);
                return match gateway::settle_signature(&state, &service, &requirements, signature.clone()).await {
                    Ok(summary) => Json(json!({
                        "valid": true,
                        "tx_hash": summary.tx_hash,
                        "payer": signature.from,
                        "platform_fee": summary.platform_fee.to_string(),
                        "provider_revenue": summary.provider_share.to_string(),
                    }))
                    .into_response(),
                    Err(err) => err.into_response(),
                };
            }
            Err(_) => {} // no such service; fall through to the legacy path below
        }
    }

    settle_legacy_path(&state, signature).await
}

/// Verifies and settles directly against the token, with no processor or
/// service binding. `max_amount_required` is synthesized from the
/// signature's own authorized value, since there is no service price to
/// compare against.
async fn settle_legacy_path(state: &AppState, signature: crate::protocol::codec::SignaturePayload) -> Response {
    let requirements = PaymentRequirements {
        scheme: "exact".to_string(),
        network: format!("eip155:{}", state.config.chain_id),
        max_amount_required: signature.value.to_string(),
        resource: "/verify-payment".to_string(),
        description: "legacy direct settlement".to_string(),
        pay_to: state.config.escrow_address,
        max_timeout_seconds: crate::protocol::requirements::MAX_TIMEOUT_SECONDS,
        asset: state.config.token_address,
        extra: RequirementsExtra {
            symbol: state.token_info.symbol.clone(),
            decimals: state.token_info.decimals,
            token_name: state.token_info.name.clone(),
        },
    };

    let token = Erc20::new(state.config.token_address, state.chain.provider());
    let nonce_already_used = match token.authorizationState(signature.from, signature.nonce).call().await {
        Ok(used) => used,
        Err(e) => return ProtocolError::Internal(format!("failed to probe authorization state: {e}")).into_response(),
    };

    let ctx = VerifyContext {
        escrow_address: state.config.escrow_address,
        token_name: &state.token_info.name,
        chain_id: state.config.chain_id,
        token_address: state.config.token_address,
        now: match UnixTimestamp::try_now() {
            Ok(now) => now,
            Err(e) => return ProtocolError::Internal(e.to_string()).into_response(),
        },
        nonce_already_used,
    };
    if let Err(err) = verifier::verify(&signature, &requirements, &ctx) {
        return err.into_response();
    }

    let policy = ConfirmationPolicy::from_config(state.config.optimistic_settlement);
    let mut background_tasks = JoinSet::new();
    let outcome = match settlement::settle_legacy(
        &state.chain,
        state.config.token_address,
        state.config.escrow_address,
        &signature,
        &mut background_tasks,
        policy,
    )
    .await
    {
        Ok(outcome) => outcome,
        Err(err) => return err.into_response(),
    };
    background_tasks.detach_all();

    let fee_percent = state.config.platform_fee_percent;
    let amount = Decimal::from_u128(u128::try_from(signature.value).unwrap_or(u128::MAX)).unwrap_or_default();
    let platform_fee = (amount * fee_percent).round();
    let provider_revenue = amount - platform_fee;

    Json(json!({
        "valid": true,
        "tx_hash": outcome.tx_hash.to_string(),
        "payer": signature.from,
        "platform_fee": platform_fee.to_string(),
        "provider_revenue": provider_revenue.to_string(),
    }))
    .into_response()
}
