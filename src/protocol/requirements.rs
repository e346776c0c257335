//! The 402 challenge body and the structured payment requirements block
//! (spec §3/§6). `PaymentRequirements` is also the thing a client must echo
//! back byte-for-byte inside the tunnel-mode envelope.

use alloy_primitives::Address;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// How a service is fulfilled once payment settles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ServiceKind {
    /// The gateway itself holds and returns the content.
    Hosted,
    /// The gateway forwards the request to the provider's endpoint.
    Proxy,
    /// The provider serves the request directly; the gateway only discovers it.
    Native,
}

/// The structured payment requirements block sent in a 402 challenge and
/// echoed back by the client inside the tunnel envelope's `accepted` field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaymentRequirements {
    pub scheme: String,
    pub network: String,
    #[serde(rename = "maxAmountRequired")]
    pub max_amount_required: String,
    pub resource: String,
    pub description: String,
    #[serde(rename = "payTo")]
    pub pay_to: Address,
    #[serde(rename = "maxTimeoutSeconds")]
    pub max_timeout_seconds: u64,
    pub asset: Address,
    pub extra: RequirementsExtra,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RequirementsExtra {
    pub symbol: String,
    pub decimals: u8,
    #[serde(rename = "tokenName")]
    pub token_name: String,
}

impl PaymentRequirements {
    /// Deep equality over the fields recognized by this gateway, used to
    /// validate the `accepted` block echoed back by a client (spec §4.3).
    /// Compares via the same JSON shape the client actually saw, so
    /// unrecognized-but-present extra fields don't break equality.
    pub fn matches_echoed(&self, echoed: &Value) -> bool {
        let canonical = serde_json::to_value(self).expect("requirements always serialize");
        canonical == *echoed
    }
}

pub const MAX_TIMEOUT_SECONDS: u64 = 300;

#[cfg(test)]
mod tests {
    use super::*;
    use alloy_primitives::address;

    fn sample() -> PaymentRequirements {
        PaymentRequirements {
            scheme: "exact".to_string(),
            network: "eip155:84532".to_string(),
            max_amount_required: "1000000".to_string(),
            resource: "/gateway/svc-1".to_string(),
            description: "Weather API".to_string(),
            pay_to: address!("0x0000000000000000000000000000000000000009"),
            max_timeout_seconds: MAX_TIMEOUT_SECONDS,
            asset: address!("0x0000000000000000000000000000000000000010"),
            extra: RequirementsExtra {
                symbol: "USDC".to_string(),
                decimals: 6,
                token_name: "USD Coin".to_string(),
            },
        }
    }

    #[test]
    fn identical_json_matches() {
        let req = sample();
        let echoed = serde_json::to_value(&req).unwrap();
        assert!(req.matches_echoed(&echoed));
    }

    #[test]
    fn tampered_amount_does_not_match() {
        let req = sample();
        let mut echoed = serde_json::to_value(&req).unwrap();
        echoed["maxAmountRequired"] = Value::String("1".to_string());
        assert!(!req.matches_echoed(&echoed));
    }
}
