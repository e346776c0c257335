//! The error taxonomy from spec §7, and how each kind maps onto an HTTP
//! response. Every fallible path in the gateway terminates in one of these
//! variants — nothing is silently swallowed.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use serde_json::json;

use crate::protocol::requirements::PaymentRequirements;

#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    #[error("payment required")]
    MissingPayment { accepts: Vec<PaymentRequirements> },

    #[error("invalid payload: {0}")]
    InvalidPayload(String),

    #[error("echoed payment requirements do not match the server-issued challenge")]
    BadRequirementsEcho,

    #[error("payment destination must be the escrow contract")]
    BadDestination,

    #[error("authorized value is less than the service price")]
    InsufficientValue,

    #[error("authorization window does not cover the current time")]
    OutOfWindow,

    #[error("nonce has already been used")]
    NonceUsed,

    #[error("recovered signer does not match the authorization's from address")]
    BadSignature,

    #[error("service is inactive or unknown")]
    ServiceInactive { known: bool },

    #[error("settlement failed: {0}")]
    SettlementFailed(String),

    #[error("upstream call failed after payment was settled")]
    UpstreamFailed { tx_hash: String, message: String },

    #[error("confirmation wait timed out; transaction may still mine")]
    TimedOut { tx_hash: String },

    #[error("internal error: {0}")]
    Internal(String),
}

#[derive(Serialize)]
struct ChallengeBody {
    error: &'static str,
    accepts: Vec<PaymentRequirements>,
}

impl IntoResponse for ProtocolError {
    fn into_response(self) -> Response {
        match self {
            ProtocolError::MissingPayment { accepts } => (
                StatusCode::PAYMENT_REQUIRED,
                Json(ChallengeBody {
                    error: "Payment Required",
                    accepts,
                }),
            )
                .into_response(),
            ProtocolError::InvalidPayload(msg) => {
                (StatusCode::BAD_REQUEST, Json(json!({ "error": "INVALID_PAYLOAD", "message": msg }))).into_response()
            }
            ProtocolError::BadRequirementsEcho => (
                StatusCode::BAD_REQUEST,
                Json(json!({ "error": "BAD_REQUIREMENTS_ECHO" })),
            )
                .into_response(),
            ProtocolError::BadDestination => (
                StatusCode::BAD_REQUEST,
                Json(json!({ "error": "BAD_DESTINATION" })),
            )
                .into_response(),
            ProtocolError::InsufficientValue => (
                StatusCode::BAD_REQUEST,
                Json(json!({ "error": "INSUFFICIENT_VALUE" })),
            )
                .into_response(),
            ProtocolError::OutOfWindow => (
                StatusCode::PAYMENT_REQUIRED,
                Json(json!({ "error": "OUT_OF_WINDOW" })),
            )
                .into_response(),
            ProtocolError::NonceUsed => (
                StatusCode::PAYMENT_REQUIRED,
                Json(json!({ "error": "NONCE_USED" })),
            )
                .into_response(),
            ProtocolError::BadSignature => (
                StatusCode::PAYMENT_REQUIRED,
                Json(json!({ "error": "BAD_SIGNATURE" })),
            )
                .into_response(),
            ProtocolError::ServiceInactive { known } => {
                let status = if known { StatusCode::GONE } else { StatusCode::NOT_FOUND };
                (status, Json(json!({ "error": "SERVICE_INACTIVE" }))).into_response()
            }
            ProtocolError::SettlementFailed(message) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "error": "SETTLEMENT_FAILED", "message": message })),
            )
                .into_response(),
            ProtocolError::UpstreamFailed { tx_hash, message } => (
                StatusCode::OK,
                Json(json!({
                    "response": { "error": message },
                    "payment": { "txHash": tx_hash },
                })),
            )
                .into_response(),
            ProtocolError::TimedOut { tx_hash } => (
                StatusCode::ACCEPTED,
                Json(json!({ "error": "TIMED_OUT", "txHash": tx_hash })),
            )
                .into_response(),
            ProtocolError::Internal(message) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "error": "INTERNAL", "message": message })),
            )
                .into_response(),
        }
    }
}
