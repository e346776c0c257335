//! An x402 payment gateway: a pay-per-call HTTP front door for a catalog of
//! services, settled on an EVM chain via EIP-3009 `receiveWithAuthorization`.
//!
//! # Overview
//!
//! A protected endpoint answers unpaid requests with `402 Payment Required`
//! and a structured payment requirements block. A client signs an EIP-712
//! authorization and resubmits it; the gateway verifies the signature,
//! submits it on chain through `PaymentProcessor`, and — once settled —
//! proxies the request to the service's own fulfillment surface.
//!
//! # Modules
//!
//! - [`chain`] — the Alloy provider, contract bindings, and EIP-712 domain
//!   used to verify and submit payments.
//! - [`config`] — environment-driven gateway configuration.
//! - [`protocol`] — the payload codec, signature verifier, and error
//!   taxonomy that make up the x402 exchange itself.
//! - [`relayer`] — the settlement engine that submits and confirms
//!   transactions on behalf of the gateway's hot wallet.
//! - [`store`] — the Postgres-backed catalog and ledger mirror.
//! - [`proxy`] — upstream invocation for HOSTED/PROXY services.
//! - [`handlers`] — the HTTP surface wiring everything above into routes.
//! - [`timestamp`] — the Unix timestamp type used in authorization windows.
//! - [`util`] — small shared helpers (base64, money amounts).
//! - [`sig_down`] — graceful shutdown on SIGTERM/SIGINT.
//! - [`telemetry`] — structured logging setup.

pub mod chain;
pub mod config;
pub mod handlers;
pub mod protocol;
pub mod proxy;
pub mod relayer;
pub mod sig_down;
pub mod store;
pub mod telemetry;
pub mod timestamp;
pub mod util;
