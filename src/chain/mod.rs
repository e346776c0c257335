//! The EVM chain client: a composed Alloy provider plus the relayer signer
//! pool this gateway uses to submit settlement transactions.

pub mod contracts;
pub mod eip712;
pub mod pending_nonce_manager;

use alloy_network::{Ethereum, EthereumWallet, NetworkWallet};
use alloy_primitives::{Address, TxHash};
use alloy_provider::fillers::{
    BlobGasFiller, ChainIdFiller, FillProvider, GasFiller, JoinFill, NonceFiller, WalletFiller,
};
use alloy_provider::{Identity, Provider, ProviderBuilder, RootProvider, WalletProvider};
use alloy_rpc_client::RpcClient;
use alloy_rpc_types_eth::{TransactionReceipt, TransactionRequest};
use alloy_signer_local::PrivateKeySigner;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use tracing::instrument;

use crate::config::Config;
use pending_nonce_manager::PendingNonceManager;

type InnerFiller = JoinFill<
    GasFiller,
    JoinFill<BlobGasFiller, JoinFill<NonceFiller<PendingNonceManager>, ChainIdFiller>>,
>;

/// The fully composed provider used for every chain interaction: gas, nonce,
/// chain-id and wallet-signing fillers stacked over a plain JSON-RPC root.
pub type InnerProvider =
    FillProvider<JoinFill<JoinFill<Identity, InnerFiller>, WalletFiller<EthereumWallet>>, RootProvider>;

#[derive(Debug, thiserror::Error)]
pub enum ChainError {
    #[error("failed to connect to RPC endpoint: {0}")]
    Connect(String),
    #[error("configured chain_id {expected} does not match RPC chain_id {actual}")]
    ChainIdMismatch { expected: u64, actual: u64 },
    #[error("no signer configured for relayer")]
    NoSigner,
    #[error("contract call failed: {0}")]
    ContractCall(String),
    #[error("no contract code found at {0}")]
    NotAContract(Address),
}

/// Holds the live connection to the chain plus the pool of relayer signer
/// addresses, round-robined for outbound transactions in case the relayer
/// is ever run with more than one hot wallet.
#[derive(Debug, Clone)]
pub struct ChainClient {
    provider: InnerProvider,
    chain_id: u64,
    signer_addresses: Arc<Vec<Address>>,
    signer_cursor: Arc<AtomicUsize>,
    nonce_manager: PendingNonceManager,
}

impl ChainClient {
    /// Connects to the configured RPC endpoint, builds the relayer wallet
    /// from the configured private key, and verifies the RPC's reported
    /// chain id matches configuration (fatal mismatch, per spec §6).
    pub async fn connect(config: &Config) -> Result<Self, ChainError> {
        let signer = PrivateKeySigner::from_bytes(config.relayer_private_key.as_bytes().into())
            .map_err(|e| ChainError::Connect(e.to_string()))?;
        let wallet = EthereumWallet::from(signer);
        let signer_addresses: Vec<Address> =
            NetworkWallet::<Ethereum>::signer_addresses(&wallet).collect();
        if signer_addresses.is_empty() {
            return Err(ChainError::NoSigner);
        }

        let nonce_manager = PendingNonceManager::default();
        let client = RpcClient::builder()
            .connect(config.rpc_url.as_str())
            .await
            .map_err(|e| ChainError::Connect(e.to_string()))?;
        // Built explicitly (not `InnerFiller::default()`) so the nonce filler
        // shares the same `PendingNonceManager` instance stored on `Self`:
        // `reset_nonce` has to reach the map the filler actually allocates
        // from, or a failed send never requeues its nonce.
        let filler: InnerFiller = JoinFill::new(
            GasFiller::default(),
            JoinFill::new(
                BlobGasFiller::default(),
                JoinFill::new(NonceFiller::new(nonce_manager.clone()), ChainIdFiller::default()),
            ),
        );
        let provider = ProviderBuilder::default()
            .filler(filler)
            .wallet(wallet)
            .connect_client(client);

        let actual_chain_id = provider
            .get_chain_id()
            .await
            .map_err(|e| ChainError::Connect(e.to_string()))?;
        if actual_chain_id != config.chain_id {
            return Err(ChainError::ChainIdMismatch {
                expected: config.chain_id,
                actual: actual_chain_id,
            });
        }

        Ok(Self {
            provider,
            chain_id: config.chain_id,
            signer_addresses: Arc::new(signer_addresses),
            signer_cursor: Arc::new(AtomicUsize::new(0)),
            nonce_manager,
        })
    }

    pub fn chain_id(&self) -> u64 {
        self.chain_id
    }

    pub fn provider(&self) -> &InnerProvider {
        &self.provider
    }

    /// Picks the next relayer signer address, round-robin over the
    /// configured pool. With a single signer (the common case) this always
    /// returns the same address.
    pub fn next_signer_address(&self) -> Address {
        if self.signer_addresses.len() == 1 {
            return self.signer_addresses[0];
        }
        let next = self.signer_cursor.fetch_add(1, Ordering::Relaxed) % self.signer_addresses.len();
        self.signer_addresses[next]
    }

    pub fn default_signer_address(&self) -> Address {
        self.provider.default_signer_address()
    }

    /// Verifies a contract is actually deployed at `address`. Used at
    /// startup to validate the four configured contract addresses, per
    /// spec §6 ("fatal if any is missing or not a contract").
    pub async fn assert_contract_deployed(&self, address: Address) -> Result<(), ChainError> {
        let code = self
            .provider
            .get_code_at(address)
            .await
            .map_err(|e| ChainError::ContractCall(e.to_string()))?;
        if code.is_empty() {
            return Err(ChainError::NotAContract(address));
        }
        Ok(())
    }

    /// Sends a prepared transaction from the relayer and waits for a
    /// receipt. Resets the cached nonce for the sender on failure, since a
    /// failed send leaves the on-chain nonce state uncertain.
    #[instrument(skip_all, fields(to = ?tx.to))]
    pub async fn send_transaction(&self, mut tx: TransactionRequest) -> Result<TransactionReceipt, ChainError> {
        let from = tx.from.unwrap_or_else(|| self.next_signer_address());
        tx.from = Some(from);
        let pending = self.provider.send_transaction(tx).await.map_err(|e| {
            let err = e.to_string();
            let nonce_manager = self.nonce_manager.clone();
            tokio::spawn(async move { nonce_manager.reset_nonce(from).await });
            ChainError::ContractCall(err)
        })?;
        pending
            .get_receipt()
            .await
            .map_err(|e| ChainError::ContractCall(e.to_string()))
    }

    /// Sends a transaction and returns immediately with the pending
    /// transaction hash, without waiting for a receipt. Used by the
    /// optimistic confirmation policy (§4.5): the caller gets this hash
    /// back right away, and a background task awaits confirmation.
    pub async fn send_transaction_optimistic(&self, mut tx: TransactionRequest) -> Result<TxHash, ChainError> {
        let from = tx.from.unwrap_or_else(|| self.next_signer_address());
        tx.from = Some(from);
        let pending = self.provider.send_transaction(tx).await.map_err(|e| {
            let err = e.to_string();
            let nonce_manager = self.nonce_manager.clone();
            tokio::spawn(async move { nonce_manager.reset_nonce(from).await });
            ChainError::ContractCall(err)
        })?;
        Ok(*pending.tx_hash())
    }
}
