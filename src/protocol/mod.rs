//! The x402 wire protocol: challenge shape, payload codec, and signature
//! verification. Deliberately chain-agnostic where possible — the relayer
//! module is what actually talks to a provider.

pub mod codec;
pub mod error;
pub mod requirements;
pub mod verifier;
