//! `alloy::sol!` bindings for the three on-chain contracts this gateway
//! depends on (§4.6): the ERC-20/EIP-3009 token, `Escrow`, and
//! `PaymentProcessor`, plus `ServiceRegistry` for on-chain catalog reads.

use alloy_sol_types::sol;

sol!(
    #[allow(missing_docs)]
    #[derive(Debug)]
    #[sol(rpc)]
    Erc20,
    "abi/Erc20.json"
);

sol!(
    #[allow(missing_docs)]
    #[derive(Debug)]
    #[sol(rpc)]
    Escrow,
    "abi/Escrow.json"
);

sol!(
    #[allow(missing_docs)]
    #[allow(clippy::too_many_arguments)]
    #[derive(Debug)]
    #[sol(rpc)]
    PaymentProcessor,
    "abi/PaymentProcessor.json"
);

sol!(
    #[allow(missing_docs)]
    #[derive(Debug)]
    #[sol(rpc)]
    ServiceRegistry,
    "abi/ServiceRegistry.json"
);
