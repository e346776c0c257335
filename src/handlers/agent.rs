//! `POST /agent/execute` (spec §4.9): the single-shot endpoint agent
//! clients use instead of the challenge/retry dance — the signature is
//! supplied up front, already signed against the catalog's EIP-712 domain.

use alloy_primitives::{Address, B256, U256};
use axum::Json;
use axum::extract::State;
use axum::http::Method;
use axum::response::{IntoResponse, Response};
use serde::Deserialize;
use serde_json::{Value, json};
use std::sync::Arc;
use uuid::Uuid;

use crate::handlers::AppState;
use crate::handlers::discovery::to_payment_requirements;
use crate::handlers::gateway::{self, FulfillmentResponse};
use crate::protocol::codec::SignaturePayload;
use crate::protocol::error::ProtocolError;
use crate::proxy::{self, ProxyRequest};
use crate::store::models::ServiceKind;
use crate::timestamp::UnixTimestamp;

#[derive(Debug, Deserialize)]
pub struct ExecuteSignature {
    pub from: Address,
    pub to: Address,
    #[serde(with = "crate::protocol::codec::u256_decimal_string")]
    pub value: U256,
    pub valid_after: UnixTimestamp,
    pub valid_before: UnixTimestamp,
    pub nonce: B256,
    pub v: u8,
    pub r: B256,
    pub s: B256,
}

impl From<ExecuteSignature> for SignaturePayload {
    fn from(s: ExecuteSignature) -> Self {
        SignaturePayload {
            from: s.from,
            to: s.to,
            value: s.value,
            valid_after: s.valid_after,
            valid_before: s.valid_before,
            nonce: s.nonce,
            v: s.v,
            r: s.r,
            s: s.s,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct ExecuteRequest {
    pub service_id: Uuid,
    #[allow(dead_code)]
    pub wallet_address: Option<Address>,
    pub signature: ExecuteSignature,
    pub request_body: Option<Value>,
}

/// `POST /agent/execute`: settle and fulfill a service call in one request.
pub async fn execute(State(state): State<Arc<AppState>>, Json(request): Json<ExecuteRequest>) -> Response {
    let service = match state.store.find_service(request.service_id).await {
        Ok(service) => service,
        Err(_) => return ProtocolError::ServiceInactive { known: false }.into_response(),
    };
    if !service.active {
        return ProtocolError::ServiceInactive { known: true }.into_response();
    }

    let requirements = to_payment_requirements(&service, &state.token_info, &state);
    let signature: SignaturePayload = request.signature.into();

    let summary = match gateway::settle_signature(&state, &service, &requirements, signature.clone()).await {
        Ok(summary) => summary,
        Err(err) => return err.into_response(),
    };

    let fulfillment = if service.kind == ServiceKind::Native {
        json!({ "note": "NATIVE service; caller must invoke its endpoint directly" })
    } else {
        match proxy::fulfill(
            &state.http_client,
            service.kind,
            service.hosted_content.as_deref(),
            ProxyRequest {
                method: Method::POST,
                endpoint: &service.endpoint,
                payer: &signature.from.to_string(),
                tx_hash: &summary.tx_hash,
                body: request.request_body,
            },
        )
        .await
        {
            Ok(body) => body,
            Err(err) => {
                return ProtocolError::UpstreamFailed {
                    tx_hash: summary.tx_hash,
                    message: err.to_string(),
                }
                .into_response();
            }
        }
    };

    FulfillmentResponse {
        tx_hash: summary.tx_hash.clone(),
        body: json!({
            "payment": {
                "txHash": summary.tx_hash,
                "payer": signature.from,
                "amount": signature.value.to_string(),
                "receiver": requirements.pay_to,
            },
            "service": {
                "id": service.id,
                "name": service.name,
                "endpoint": service.endpoint,
            },
            "response": fulfillment,
        }),
    }
    .into_response()
}
