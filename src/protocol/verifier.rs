//! Signature verifier (spec §4.4): a pure, idempotent function with no
//! side effects beyond the two chain reads it needs (nonce freshness,
//! token name for the EIP-712 domain) — callers supply those as arguments
//! so this module stays testable without a live chain.

use alloy_primitives::{Address, U256};

use crate::chain::eip712::{self, Authorization};
use crate::protocol::codec::SignaturePayload;
use crate::protocol::error::ProtocolError;
use crate::protocol::requirements::PaymentRequirements;
use crate::timestamp::UnixTimestamp;

/// Context the verifier needs beyond the signature and requirements
/// themselves: the things a caller must have already fetched from chain or
/// computed locally.
pub struct VerifyContext<'a> {
    pub escrow_address: Address,
    pub token_name: &'a str,
    pub chain_id: u64,
    pub token_address: Address,
    pub now: UnixTimestamp,
    pub nonce_already_used: bool,
}

/// Runs the five ordered checks from spec §4.4 and returns the resolved
/// EIP-712 signing hash's recovered signer on success, or the first
/// violated check as a [`ProtocolError`].
pub fn verify(
    signature: &SignaturePayload,
    requirements: &PaymentRequirements,
    ctx: &VerifyContext,
) -> Result<Address, ProtocolError> {
    // 1. Destination match.
    if signature.to != ctx.escrow_address {
        return Err(ProtocolError::BadDestination);
    }

    // 2. Value match.
    let required: U256 = requirements
        .max_amount_required
        .parse()
        .map_err(|_| ProtocolError::Internal("requirements carry a non-numeric amount".to_string()))?;
    if signature.value < required {
        return Err(ProtocolError::InsufficientValue);
    }

    // 3. Time window.
    if ctx.now.seconds_since_epoch() <= signature.valid_after.seconds_since_epoch()
        || ctx.now.seconds_since_epoch() >= signature.valid_before.seconds_since_epoch()
    {
        return Err(ProtocolError::OutOfWindow);
    }

    // 4. Nonce freshness.
    if ctx.nonce_already_used {
        return Err(ProtocolError::NonceUsed);
    }

    // 5. Signature recovery.
    let domain = eip712::domain(ctx.token_name, ctx.chain_id, ctx.token_address);
    let authorization = Authorization {
        from: signature.from,
        to: signature.to,
        value: signature.value,
        valid_after: signature.valid_after,
        valid_before: signature.valid_before,
        nonce: signature.nonce,
    };
    let digest = eip712::signing_hash(&authorization, &domain);
    let recovered = recover_signer(signature, digest.into())?;
    if recovered != signature.from {
        return Err(ProtocolError::BadSignature);
    }

    Ok(recovered)
}

fn recover_signer(signature: &SignaturePayload, digest: alloy_primitives::B256) -> Result<Address, ProtocolError> {
    let normalized_v = if signature.v >= 27 { signature.v - 27 } else { signature.v };
    let odd_y_parity = normalized_v == 1;
    let sig = alloy_primitives::Signature::new(
        U256::from_be_bytes(signature.r.0),
        U256::from_be_bytes(signature.s.0),
        odd_y_parity,
    );
    sig.recover_address_from_prehash(&digest)
        .map_err(|_| ProtocolError::BadSignature)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::requirements::RequirementsExtra;
    use alloy_primitives::{B256, address};
    use alloy_signer::SignerSync;
    use alloy_signer_local::PrivateKeySigner;

    fn requirements(escrow: Address, token: Address) -> PaymentRequirements {
        PaymentRequirements {
            scheme: "exact".to_string(),
            network: "eip155:84532".to_string(),
            max_amount_required: "1000000".to_string(),
            resource: "/gateway/svc-1".to_string(),
            description: "Weather API".to_string(),
            pay_to: escrow,
            max_timeout_seconds: 300,
            asset: token,
            extra: RequirementsExtra {
                symbol: "USDC".to_string(),
                decimals: 6,
                token_name: "USD Coin".to_string(),
            },
        }
    }

    fn signed_payload(signer: &PrivateKeySigner, escrow: Address, token: Address, chain_id: u64) -> SignaturePayload {
        let from = signer.address();
        let value = U256::from(1_000_000u64);
        let valid_after = UnixTimestamp(1_000);
        let valid_before = UnixTimestamp(9_000_000_000);
        let nonce = B256::repeat_byte(3);
        let domain = eip712::domain("USD Coin", chain_id, token);
        let authorization = Authorization { from, to: escrow, value, valid_after, valid_before, nonce };
        let digest = eip712::signing_hash(&authorization, &domain);
        let sig = signer.sign_hash_sync(&digest).unwrap();
        SignaturePayload {
            from,
            to: escrow,
            value,
            valid_after,
            valid_before,
            nonce,
            v: sig.v() as u8 + 27,
            r: B256::from(sig.r().to_be_bytes()),
            s: B256::from(sig.s().to_be_bytes()),
        }
    }

    #[test]
    fn accepts_a_correctly_signed_authorization() {
        let signer = PrivateKeySigner::random();
        let escrow = address!("0x0000000000000000000000000000000000000009");
        let token = address!("0x0000000000000000000000000000000000000010");
        let chain_id = 84532;
        let payload = signed_payload(&signer, escrow, token, chain_id);
        let req = requirements(escrow, token);
        let ctx = VerifyContext {
            escrow_address: escrow,
            token_name: "USD Coin",
            chain_id,
            token_address: token,
            now: UnixTimestamp(5_000),
            nonce_already_used: false,
        };
        let recovered = verify(&payload, &req, &ctx).unwrap();
        assert_eq!(recovered, signer.address());
    }

    #[test]
    fn rejects_wrong_destination() {
        let signer = PrivateKeySigner::random();
        let escrow = address!("0x0000000000000000000000000000000000000009");
        let token = address!("0x0000000000000000000000000000000000000010");
        let mut payload = signed_payload(&signer, escrow, token, 84532);
        payload.to = address!("0x00000000000000000000000000000000000dead");
        let req = requirements(escrow, token);
        let ctx = VerifyContext {
            escrow_address: escrow,
            token_name: "USD Coin",
            chain_id: 84532,
            token_address: token,
            now: UnixTimestamp(5_000),
            nonce_already_used: false,
        };
        assert!(matches!(verify(&payload, &req, &ctx), Err(ProtocolError::BadDestination)));
    }

    #[test]
    fn rejects_out_of_window() {
        let signer = PrivateKeySigner::random();
        let escrow = address!("0x0000000000000000000000000000000000000009");
        let token = address!("0x0000000000000000000000000000000000000010");
        let payload = signed_payload(&signer, escrow, token, 84532);
        let req = requirements(escrow, token);
        let ctx = VerifyContext {
            escrow_address: escrow,
            token_name: "USD Coin",
            chain_id: 84532,
            token_address: token,
            now: UnixTimestamp(1),
            nonce_already_used: false,
        };
        assert!(matches!(verify(&payload, &req, &ctx), Err(ProtocolError::OutOfWindow)));
    }

    #[test]
    fn rejects_already_used_nonce() {
        let signer = PrivateKeySigner::random();
        let escrow = address!("0x0000000000000000000000000000000000000009");
        let token = address!("0x0000000000000000000000000000000000000010");
        let payload = signed_payload(&signer, escrow, token, 84532);
        let req = requirements(escrow, token);
        let ctx = VerifyContext {
            escrow_address: escrow,
            token_name: "USD Coin",
            chain_id: 84532,
            token_address: token,
            now: UnixTimestamp(5_000),
            nonce_already_used: true,
        };
        assert!(matches!(verify(&payload, &req, &ctx), Err(ProtocolError::NonceUsed)));
    }

    #[test]
    fn rejects_tampered_value_after_signing() {
        let signer = PrivateKeySigner::random();
        let escrow = address!("0x0000000000000000000000000000000000000009");
        let token = address!("0x0000000000000000000000000000000000000010");
        let mut payload = signed_payload(&signer, escrow, token, 84532);
        payload.value = U256::from(1u64);
        let req = requirements(escrow, token);
        let ctx = VerifyContext {
            escrow_address: escrow,
            token_name: "USD Coin",
            chain_id: 84532,
            token_address: token,
            now: UnixTimestamp(5_000),
            nonce_already_used: false,
        };
        // Value check (2) runs before signature recovery (5); a tampered
        // value under the required price is always caught first.
        assert!(matches!(verify(&payload, &req, &ctx), Err(ProtocolError::InsufficientValue)));
    }
}
