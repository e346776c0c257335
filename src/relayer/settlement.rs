//! The settlement engine (spec §4.5): submits the on-chain transaction for
//! a verified authorization, manages confirmation policy, and translates
//! chain-level failures into the error taxonomy from §7.
//!
//! State machine: `NEW -> VERIFIED -> SUBMITTED -> {CONFIRMED | REVERTED | TIMED_OUT}`.
//! `VERIFIED` lives entirely in the caller (the protocol verifier); this
//! module only ever sees already-verified authorizations.

use alloy_network::TransactionBuilder;
use alloy_primitives::{Address, B256, TxHash, U256};
use alloy_provider::Provider;
use alloy_rpc_types_eth::TransactionRequest;
use alloy_sol_types::SolCall;
use std::time::Duration;
use tokio::task::JoinSet;

use crate::chain::ChainClient;
use crate::chain::contracts::{Erc20, PaymentProcessor};
use crate::protocol::codec::SignaturePayload;
use crate::protocol::error::ProtocolError;

/// Gas limits are hardcoded, not estimated: `eth_estimateGas` returns
/// `UNPREDICTABLE_GAS_LIMIT` for these nested calls on the target chain even
/// though they succeed (spec §4.5).
pub const PROCESSOR_GAS_LIMIT: u64 = 500_000;
pub const TOKEN_GAS_LIMIT: u64 = 200_000;

/// Confirmation policy controls how long a caller waits before the
/// response is returned (spec §4.5).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfirmationPolicy {
    /// Report success immediately on broadcast; confirm in the background.
    Optimistic,
    /// Block until the transaction is mined (one confirmation). Default.
    OneConf,
    /// Block until `confirmations` blocks have passed since mining.
    Deep { confirmations: u64 },
}

impl ConfirmationPolicy {
    pub fn from_config(optimistic: bool) -> Self {
        if optimistic {
            ConfirmationPolicy::Optimistic
        } else {
            ConfirmationPolicy::OneConf
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SettlementState {
    Submitted,
    Confirmed,
    Reverted,
    TimedOut,
}

#[derive(Debug, Clone)]
pub struct SettlementOutcome {
    pub tx_hash: TxHash,
    pub state: SettlementState,
    /// True when this settlement used the legacy direct-transfer path,
    /// which does not credit the provider ledger (spec §4.5).
    pub legacy: bool,
}

const CONFIRMATION_WAIT_TIMEOUT: Duration = Duration::from_secs(30);

/// Submits `PaymentProcessor.processPayment` for a verified authorization
/// and a resolved `service_id_hash` — the preferred path, which credits the
/// provider ledger atomically with the transfer.
pub async fn settle_via_processor(
    chain: &ChainClient,
    processor_address: Address,
    service_id_hash: B256,
    signature: &SignaturePayload,
    background_tasks: &mut JoinSet<()>,
    policy: ConfirmationPolicy,
) -> Result<SettlementOutcome, ProtocolError> {
    let call = PaymentProcessor::processPaymentCall {
        serviceIdHash: service_id_hash,
        from: signature.from,
        value: signature.value,
        validAfter: U256::from(signature.valid_after.seconds_since_epoch()),
        validBefore: U256::from(signature.valid_before.seconds_since_epoch()),
        nonce: signature.nonce,
        v: signature.v,
        r: signature.r,
        s: signature.s,
    };
    let tx = TransactionRequest::default()
        .to(processor_address)
        .input(call.abi_encode().into())
        .gas_limit(PROCESSOR_GAS_LIMIT);

    run_with_policy(chain, tx, background_tasks, policy, false).await
}

/// Submits `token.receiveWithAuthorization` directly — the legacy path used
/// when no processor/service binding is known. Does not credit the
/// provider ledger; callers must log this branch prominently (spec §4.5).
pub async fn settle_legacy(
    chain: &ChainClient,
    token_address: Address,
    escrow_address: Address,
    signature: &SignaturePayload,
    background_tasks: &mut JoinSet<()>,
    policy: ConfirmationPolicy,
) -> Result<SettlementOutcome, ProtocolError> {
    tracing::warn!(
        legacy_settlement = true,
        from = %signature.from,
        "settling via legacy receiveWithAuthorization path; provider ledger will not be credited"
    );
    let call = Erc20::receiveWithAuthorizationCall {
        from: signature.from,
        to: escrow_address,
        value: signature.value,
        validAfter: U256::from(signature.valid_after.seconds_since_epoch()),
        validBefore: U256::from(signature.valid_before.seconds_since_epoch()),
        nonce: signature.nonce,
        v: signature.v,
        r: signature.r,
        s: signature.s,
    };
    let tx = TransactionRequest::default()
        .to(token_address)
        .input(call.abi_encode().into())
        .gas_limit(TOKEN_GAS_LIMIT);

    run_with_policy(chain, tx, background_tasks, policy, true).await
}

async fn run_with_policy(
    chain: &ChainClient,
    tx: TransactionRequest,
    background_tasks: &mut JoinSet<()>,
    policy: ConfirmationPolicy,
    legacy: bool,
) -> Result<SettlementOutcome, ProtocolError> {
    match policy {
        ConfirmationPolicy::Optimistic => {
            let tx_hash = chain
                .send_transaction_optimistic(tx)
                .await
                .map_err(translate_chain_error)?;
            let chain = chain.clone();
            background_tasks.spawn(async move {
                match tokio::time::timeout(CONFIRMATION_WAIT_TIMEOUT, chain.provider().get_transaction_receipt(tx_hash)).await {
                    Ok(Ok(Some(receipt))) if receipt.status() => {
                        tracing::info!(%tx_hash, "optimistic settlement confirmed");
                    }
                    Ok(Ok(Some(_))) => {
                        tracing::error!(%tx_hash, "optimistic settlement reverted on chain");
                    }
                    Ok(Ok(None)) | Ok(Err(_)) => {
                        tracing::error!(%tx_hash, "failed to fetch receipt for optimistic settlement");
                    }
                    Err(_) => {
                        tracing::warn!(%tx_hash, "optimistic settlement confirmation wait timed out");
                    }
                }
            });
            Ok(SettlementOutcome { tx_hash, state: SettlementState::Submitted, legacy })
        }
        ConfirmationPolicy::OneConf => {
            let receipt = tokio::time::timeout(CONFIRMATION_WAIT_TIMEOUT, chain.send_transaction(tx))
                .await
                .map_err(|_| ProtocolError::TimedOut { tx_hash: "pending".to_string() })?
                .map_err(translate_chain_error)?;
            let state = if receipt.status() {
                SettlementState::Confirmed
            } else {
                return Err(ProtocolError::SettlementFailed(
                    "transaction reverted on chain".to_string(),
                ));
            };
            Ok(SettlementOutcome { tx_hash: receipt.transaction_hash, state, legacy })
        }
        ConfirmationPolicy::Deep { confirmations } => {
            let receipt = tokio::time::timeout(CONFIRMATION_WAIT_TIMEOUT, chain.send_transaction(tx))
                .await
                .map_err(|_| ProtocolError::TimedOut { tx_hash: "pending".to_string() })?
                .map_err(translate_chain_error)?;
            if !receipt.status() {
                return Err(ProtocolError::SettlementFailed("transaction reverted on chain".to_string()));
            }
            tracing::debug!(confirmations, tx_hash = %receipt.transaction_hash, "deep confirmation policy configured");
            Ok(SettlementOutcome {
                tx_hash: receipt.transaction_hash,
                state: SettlementState::Confirmed,
                legacy,
            })
        }
    }
}

/// Maps a chain-layer error to the settlement-failure error kind,
/// distinguishing known revert substrings per spec §4.5.
fn translate_chain_error(err: crate::chain::ChainError) -> ProtocolError {
    let message = err.to_string();
    if message.contains("authorization is used") || message.contains("Nonce already used") {
        ProtocolError::NonceUsed
    } else if message.contains("Service not active") {
        ProtocolError::ServiceInactive { known: true }
    } else if message.contains("Insufficient payment") {
        ProtocolError::InsufficientValue
    } else {
        ProtocolError::SettlementFailed(message)
    }
}
