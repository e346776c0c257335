//! Payload codec (spec §4.3): decodes an inbound `payment-signature` header,
//! which arrives either as a direct signature object or as a base64 tunnel
//! envelope wrapping one.

use alloy_primitives::{Address, B256, U256};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::protocol::error::ProtocolError;
use crate::protocol::requirements::PaymentRequirements;
use crate::timestamp::UnixTimestamp;
use crate::util::b64;

/// The (v, r, s) ECDSA components plus the EIP-3009 authorization fields,
/// in the shape a client submits them.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignaturePayload {
    pub from: Address,
    pub to: Address,
    #[serde(with = "u256_decimal_string")]
    pub value: U256,
    pub valid_after: UnixTimestamp,
    pub valid_before: UnixTimestamp,
    pub nonce: B256,
    pub v: u8,
    pub r: B256,
    pub s: B256,
}

pub mod u256_decimal_string {
    use alloy_primitives::U256;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &U256, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&value.to_string())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<U256, D::Error> {
        let s = String::deserialize(deserializer)?;
        U256::from_str_radix(&s, 10).map_err(serde::de::Error::custom)
    }
}

#[derive(Debug, Deserialize)]
struct TunnelEnvelope {
    #[allow(dead_code)]
    x402_version: Option<u32>,
    accepted: Option<Value>,
    proof: Option<String>,
}

/// The result of decoding a `payment-signature` header: the signature
/// payload, and the echoed requirements block if one was present (tunnel
/// mode always carries one; a direct signature never does).
pub struct DecodedPayment {
    pub signature: SignaturePayload,
    pub echoed_requirements: Option<Value>,
}

/// Decodes a `payment-signature` header value per spec §4.3:
///
/// 1. Base64-decode the outer token, parse as JSON.
/// 2. If a `proof` field is present as a base64 string, decode+parse it as
///    the inner signature and keep `accepted` as the echoed block.
/// 3. Otherwise, treat the outer JSON object as the signature directly.
pub fn decode_payment_header(header_value: &str) -> Result<DecodedPayment, ProtocolError> {
    let outer_json = b64::decode_to_string(header_value)
        .map_err(|e| ProtocolError::InvalidPayload(format!("outer payload is not valid base64: {e}")))?;

    let envelope: Result<TunnelEnvelope, _> = serde_json::from_str(&outer_json);
    match envelope {
        Ok(envelope) if envelope.proof.is_some() => {
            let proof_b64 = envelope.proof.expect("checked above");
            let inner_json = b64::decode_to_string(&proof_b64).map_err(|e| {
                ProtocolError::InvalidPayload(format!("proof payload is not valid base64: {e}"))
            })?;
            let signature: SignaturePayload = serde_json::from_str(&inner_json)
                .map_err(|e| ProtocolError::InvalidPayload(format!("invalid signature proof: {e}")))?;
            Ok(DecodedPayment {
                signature,
                echoed_requirements: envelope.accepted,
            })
        }
        _ => {
            let signature: SignaturePayload = serde_json::from_str(&outer_json)
                .map_err(|e| ProtocolError::InvalidPayload(format!("invalid signature payload: {e}")))?;
            Ok(DecodedPayment {
                signature,
                echoed_requirements: None,
            })
        }
    }
}

/// Validates an echoed `accepted` block against the server-issued
/// requirements, if one was present in the decoded envelope.
pub fn validate_echo(
    decoded: &DecodedPayment,
    requirements: &PaymentRequirements,
) -> Result<(), ProtocolError> {
    match &decoded.echoed_requirements {
        Some(echoed) if !requirements.matches_echoed(echoed) => Err(ProtocolError::BadRequirementsEcho),
        _ => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::requirements::RequirementsExtra;
    use alloy_primitives::address;

    fn sample_requirements() -> PaymentRequirements {
        PaymentRequirements {
            scheme: "exact".to_string(),
            network: "eip155:84532".to_string(),
            max_amount_required: "1000000".to_string(),
            resource: "/gateway/svc-1".to_string(),
            description: "Weather API".to_string(),
            pay_to: address!("0x0000000000000000000000000000000000000009"),
            max_timeout_seconds: 300,
            asset: address!("0x0000000000000000000000000000000000000010"),
            extra: RequirementsExtra {
                symbol: "USDC".to_string(),
                decimals: 6,
                token_name: "USD Coin".to_string(),
            },
        }
    }

    fn sample_signature() -> SignaturePayload {
        SignaturePayload {
            from: address!("0x0000000000000000000000000000000000000001"),
            to: address!("0x0000000000000000000000000000000000000009"),
            value: U256::from(1_000_000u64),
            valid_after: UnixTimestamp(1_000),
            valid_before: UnixTimestamp(2_000),
            nonce: B256::repeat_byte(7),
            v: 27,
            r: B256::repeat_byte(1),
            s: B256::repeat_byte(2),
        }
    }

    #[test]
    fn decodes_a_direct_signature_payload() {
        let sig = sample_signature();
        let json = serde_json::to_string(&sig).unwrap();
        let header = b64::encode_str(&json);
        let decoded = decode_payment_header(&header).unwrap();
        assert_eq!(decoded.signature.from, sig.from);
        assert!(decoded.echoed_requirements.is_none());
    }

    #[test]
    fn decodes_a_tunnel_mode_envelope() {
        let sig = sample_signature();
        let requirements = sample_requirements();
        let proof = b64::encode_str(serde_json::to_string(&sig).unwrap());
        let envelope = serde_json::json!({
            "x402Version": 2,
            "accepted": requirements,
            "proof": proof,
        });
        let header = b64::encode_str(envelope.to_string());
        let decoded = decode_payment_header(&header).unwrap();
        assert_eq!(decoded.signature.nonce, sig.nonce);
        assert!(decoded.echoed_requirements.is_some());
        validate_echo(&decoded, &requirements).unwrap();
    }

    #[test]
    fn rejects_tampered_echo() {
        let sig = sample_signature();
        let requirements = sample_requirements();
        let proof = b64::encode_str(serde_json::to_string(&sig).unwrap());
        let mut echoed = serde_json::to_value(&requirements).unwrap();
        echoed["maxAmountRequired"] = serde_json::Value::String("1".to_string());
        let envelope = serde_json::json!({ "x402Version": 2, "accepted": echoed, "proof": proof });
        let header = b64::encode_str(envelope.to_string());
        let decoded = decode_payment_header(&header).unwrap();
        assert!(matches!(
            validate_echo(&decoded, &requirements),
            Err(ProtocolError::BadRequirementsEcho)
        ));
    }

    #[test]
    fn rejects_malformed_base64() {
        assert!(decode_payment_header("not-base64!!").is_err());
    }
}
