//! The protected gateway entry point (spec §4.1) and the shared
//! challenge/verify/settle/proxy pipeline every payment-gated path runs.

use alloy_primitives::B256;
use axum::body::Bytes;
use axum::extract::{Path, State};
use axum::http::{HeaderMap, Method, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use rust_decimal::Decimal;
use rust_decimal::prelude::FromPrimitive;
use serde_json::{Value, json};
use std::str::FromStr;
use std::sync::Arc;
use tokio::task::JoinSet;
use uuid::Uuid;

use crate::chain::contracts::PaymentProcessor;
use crate::handlers::AppState;
use crate::handlers::discovery::to_payment_requirements;
use crate::protocol::codec::{self, SignaturePayload};
use crate::protocol::error::ProtocolError;
use crate::protocol::requirements::PaymentRequirements;
use crate::protocol::verifier::{self, VerifyContext};
use crate::proxy::{self, ProxyRequest};
use crate::relayer::settlement::{self, ConfirmationPolicy};
use crate::store::models::{ServiceKind, ServiceRecord};
use crate::timestamp::UnixTimestamp;

pub const PAYMENT_HEADER: &str = "payment-signature";

/// `GET|POST /gateway/{service_id}`. No payment header means a 402
/// challenge; otherwise runs the full settle-then-proxy pipeline.
pub async fn handle(
    State(state): State<Arc<AppState>>,
    Path(service_id): Path<Uuid>,
    method: Method,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let service = match state.store.find_service(service_id).await {
        Ok(service) => service,
        Err(_) => return ProtocolError::ServiceInactive { known: false }.into_response(),
    };
    if service.kind == ServiceKind::Native {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({
                "error": "INVALID_REQUEST",
                "message": "this service is NATIVE; call its own endpoint directly",
                "endpoint": service.endpoint,
            })),
        )
            .into_response();
    }
    if !service.active {
        return ProtocolError::ServiceInactive { known: true }.into_response();
    }

    let requirements = to_payment_requirements(&service, &state.token_info, &state);

    let header_value = headers
        .get(PAYMENT_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);
    let Some(header_value) = header_value else {
        return ProtocolError::MissingPayment { accepts: vec![requirements] }.into_response();
    };

    let request_body: Option<Value> = if body.is_empty() {
        None
    } else {
        serde_json::from_slice(&body).ok()
    };

    match settle_and_fulfill(&state, &service, &requirements, &header_value, &method, request_body).await {
        Ok(response) => response.into_response(),
        Err(err) => err.into_response(),
    }
}

pub struct FulfillmentResponse {
    pub tx_hash: String,
    pub body: Value,
}

impl IntoResponse for FulfillmentResponse {
    fn into_response(self) -> Response {
        let mut body = self.body;
        if let Value::Object(ref mut map) = body {
            map.insert("txHash".to_string(), Value::String(self.tx_hash));
        }
        (StatusCode::OK, Json(body)).into_response()
    }
}

/// The shared pipeline: decode -> validate echo -> verify -> settle ->
/// fulfill. Reused by `/gateway/{id}`, `/agent/execute`, and (minus the
/// fulfill step) `/verify-payment`.
pub async fn settle_and_fulfill(
    state: &AppState,
    service: &ServiceRecord,
    requirements: &PaymentRequirements,
    header_value: &str,
    method: &Method,
    request_body: Option<Value>,
) -> Result<FulfillmentResponse, ProtocolError> {
    let (signature, tx_hash, _legacy) = settle(state, service, requirements, header_value).await?;

    let body = proxy::fulfill(
        &state.http_client,
        service.kind,
        service.hosted_content.as_deref(),
        ProxyRequest {
            method: method.clone(),
            endpoint: &service.endpoint,
            payer: &signature.from.to_string(),
            tx_hash: &tx_hash,
            body: request_body,
        },
    )
    .await;

    match body {
        Ok(body) => Ok(FulfillmentResponse { tx_hash, body }),
        Err(err) => Err(ProtocolError::UpstreamFailed {
            tx_hash,
            message: err.to_string(),
        }),
    }
}

/// Decodes, verifies, and settles a payment for a service, returning the
/// decoded signature and the resulting transaction hash. Does not fulfill
/// the request; callers that only need settlement (`/verify-payment`) stop
/// here.
pub async fn settle(
    state: &AppState,
    service: &ServiceRecord,
    requirements: &PaymentRequirements,
    header_value: &str,
) -> Result<(SignaturePayload, String, bool), ProtocolError> {
    let decoded = codec::decode_payment_header(header_value)?;
    codec::validate_echo(&decoded, requirements)?;
    let summary = settle_signature(state, service, requirements, decoded.signature.clone()).await?;
    Ok((decoded.signature, summary.tx_hash, summary.legacy))
}

/// The fee split and settlement evidence produced by [`settle_signature`].
pub struct SettlementSummary {
    pub tx_hash: String,
    pub legacy: bool,
    pub amount: Decimal,
    pub platform_fee: Decimal,
    pub provider_share: Decimal,
}

/// Verifies and settles an already-decoded signature against `service`.
/// This is the part of the pipeline shared by every caller that has a
/// [`SignaturePayload`] in hand, whether it arrived inside a
/// `payment-signature` header (`/gateway/{id}`) or directly as a JSON body
/// field (`/agent/execute`, `/verify-payment`).
pub async fn settle_signature(
    state: &AppState,
    service: &ServiceRecord,
    requirements: &PaymentRequirements,
    signature: SignaturePayload,
) -> Result<SettlementSummary, ProtocolError> {
    let service_id_hash = B256::from_str(&service.service_id_hash)
        .map_err(|_| ProtocolError::Internal("stored service_id_hash is not valid hex".to_string()))?;

    let processor = PaymentProcessor::new(state.config.payment_processor_address, state.chain.provider());
    let nonce_already_used = processor
        .usedNonces(signature.nonce)
        .call()
        .await
        .map_err(|e| ProtocolError::Internal(format!("failed to probe nonce: {e}")))?;

    let ctx = VerifyContext {
        escrow_address: state.config.escrow_address,
        token_name: &state.token_info.name,
        chain_id: state.config.chain_id,
        token_address: state.config.token_address,
        now: UnixTimestamp::try_now().map_err(|e| ProtocolError::Internal(e.to_string()))?,
        nonce_already_used,
    };
    verifier::verify(&signature, requirements, &ctx)?;

    let policy = ConfirmationPolicy::from_config(state.config.optimistic_settlement);
    let mut background_tasks = JoinSet::new();
    let outcome = settlement::settle_via_processor(
        &state.chain,
        state.config.payment_processor_address,
        service_id_hash,
        &signature,
        &mut background_tasks,
        policy,
    )
    .await?;
    background_tasks.detach_all();

    let fee_percent = state.config.platform_fee_percent;
    let amount = Decimal::from_u128(u128::try_from(signature.value).unwrap_or(u128::MAX)).unwrap_or_default();
    // amount is whole base units; the fee split must stay whole too, or the
    // NUMERIC(78,0) ledger columns truncate it silently and the three
    // amounts no longer sum.
    let platform_fee = (amount * fee_percent).round();
    let provider_share = amount - platform_fee;

    if let Err(e) = state
        .store
        .record_settlement(
            service.id,
            service.provider_id,
            &signature.from.to_string(),
            &outcome.tx_hash.to_string(),
            amount,
            platform_fee,
            provider_share,
            outcome.legacy,
        )
        .await
    {
        tracing::error!(error = %e, "failed to record settlement in ledger mirror");
    }

    Ok(SettlementSummary {
        tx_hash: outcome.tx_hash.to_string(),
        legacy: outcome.legacy,
        amount,
        platform_fee,
        provider_share,
    })
}
