//! Configuration for the x402 gateway.
//!
//! Every setting is resolved from the environment at startup (see
//! `.env.example`). There is no config file: a single EVM chain and a single
//! relayer identity are all this gateway ever targets, so a multi-chain
//! config map would only add indirection here.

use alloy_primitives::{Address, B256};
use rust_decimal::Decimal;
use std::env;
use std::str::FromStr;
use url::Url;

/// Resolved, validated gateway configuration.
#[derive(Debug, Clone)]
pub struct Config {
    pub rpc_url: Url,
    pub chain_id: u64,
    pub relayer_private_key: EvmPrivateKey,
    pub payment_processor_address: Address,
    pub escrow_address: Address,
    pub service_registry_address: Address,
    pub token_address: Address,
    pub platform_fee_percent: Decimal,
    pub optimistic_settlement: bool,
    pub database_url: String,
    pub base_url: Url,
    pub port: u16,
    pub host: std::net::IpAddr,
}

/// A validated EVM private key (32 bytes).
#[derive(Clone, Copy)]
pub struct EvmPrivateKey(B256);

impl EvmPrivateKey {
    pub fn as_bytes(&self) -> &[u8; 32] {
        self.0.as_ref()
    }
}

impl std::fmt::Debug for EvmPrivateKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "EvmPrivateKey(..)")
    }
}

impl FromStr for EvmPrivateKey {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        B256::from_str(s)
            .map(Self)
            .map_err(|e| ConfigError::InvalidValue("relayer_private_key", e.to_string()))
    }
}

/// Resolves `$VAR` / `${VAR}` references inside a literal config string.
///
/// Lets an operator write either `RELAYER_PRIVATE_KEY=0xabc...` directly, or
/// `RELAYER_PRIVATE_KEY=$SECRET_MANAGER_KEY` to pull the real value from a
/// variable injected by a secrets manager at deploy time.
fn resolve_env_refs(raw: &str) -> Result<String, ConfigError> {
    let var_name = if let Some(inner) = raw.strip_prefix("${").and_then(|s| s.strip_suffix('}')) {
        Some(inner)
    } else if let Some(inner) = raw.strip_prefix('$') {
        Some(inner)
    } else {
        None
    };
    match var_name {
        Some(name) => env::var(name)
            .map_err(|_| ConfigError::MissingEnv(name.to_string())),
        None => Ok(raw.to_string()),
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("missing required environment variable: {0}")]
    Missing(&'static str),
    #[error("environment variable referenced but not set: {0}")]
    MissingEnv(String),
    #[error("invalid value for {0}: {1}")]
    InvalidValue(&'static str, String),
}

fn required(key: &'static str) -> Result<String, ConfigError> {
    let raw = env::var(key).map_err(|_| ConfigError::Missing(key))?;
    resolve_env_refs(&raw)
}

fn required_parsed<T: FromStr>(key: &'static str) -> Result<T, ConfigError>
where
    T::Err: std::fmt::Display,
{
    let raw = required(key)?;
    raw.parse()
        .map_err(|e: T::Err| ConfigError::InvalidValue(key, e.to_string()))
}

fn optional_bool(key: &'static str, default: bool) -> bool {
    env::var(key)
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(default)
}

fn optional_decimal(key: &'static str, default: &str) -> Decimal {
    env::var(key)
        .ok()
        .and_then(|s| Decimal::from_str(&s).ok())
        .unwrap_or_else(|| Decimal::from_str(default).expect("valid default decimal"))
}

impl Config {
    /// Loads and validates configuration from the process environment.
    ///
    /// Any missing or malformed required value is a fatal startup error;
    /// there is no partial-config mode.
    pub fn load() -> Result<Self, ConfigError> {
        let rpc_url: Url = required_parsed("RPC_URL")?;
        let chain_id: u64 = required_parsed("CHAIN_ID")?;
        let relayer_private_key: EvmPrivateKey = required_parsed("RELAYER_PRIVATE_KEY")?;
        let payment_processor_address: Address = required_parsed("PAYMENT_PROCESSOR_ADDRESS")?;
        let escrow_address: Address = required_parsed("ESCROW_ADDRESS")?;
        let service_registry_address: Address = required_parsed("SERVICE_REGISTRY_ADDRESS")?;
        let token_address: Address = required_parsed("TOKEN_ADDRESS")?;
        let database_url = required("DATABASE_URL")?;
        let base_url: Url = required_parsed("BASE_URL")?;

        let platform_fee_percent = optional_decimal("PLATFORM_FEE_PERCENT", "0.05");
        let optimistic_settlement = optional_bool("OPTIMISTIC_SETTLEMENT", false);
        let port: u16 = env::var("PORT").ok().and_then(|s| s.parse().ok()).unwrap_or(8080);
        let host = env::var("HOST")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(std::net::IpAddr::V4(std::net::Ipv4Addr::UNSPECIFIED));

        Ok(Config {
            rpc_url,
            chain_id,
            relayer_private_key,
            payment_processor_address,
            escrow_address,
            service_registry_address,
            token_address,
            platform_fee_percent,
            optimistic_settlement,
            database_url,
            base_url,
            port,
            host,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    static ENV_LOCK: Mutex<()> = Mutex::new(());

    fn set_required_env() {
        unsafe {
            env::set_var("RPC_URL", "http://localhost:8545");
            env::set_var("CHAIN_ID", "84532");
            env::set_var(
                "RELAYER_PRIVATE_KEY",
                "0xcafe000000000000000000000000000000000000000000000000000000000001",
            );
            env::set_var(
                "PAYMENT_PROCESSOR_ADDRESS",
                "0x0000000000000000000000000000000000000001",
            );
            env::set_var("ESCROW_ADDRESS", "0x0000000000000000000000000000000000000002");
            env::set_var(
                "SERVICE_REGISTRY_ADDRESS",
                "0x0000000000000000000000000000000000000003",
            );
            env::set_var("TOKEN_ADDRESS", "0x0000000000000000000000000000000000000004");
            env::set_var("DATABASE_URL", "postgres://localhost/x402");
            env::set_var("BASE_URL", "http://localhost:8080");
        }
    }

    #[test]
    fn loads_from_complete_environment() {
        let _guard = ENV_LOCK.lock().unwrap();
        set_required_env();
        unsafe {
            env::remove_var("PLATFORM_FEE_PERCENT");
            env::remove_var("OPTIMISTIC_SETTLEMENT");
        }
        let config = Config::load().unwrap();
        assert_eq!(config.chain_id, 84532);
        assert_eq!(config.platform_fee_percent, Decimal::from_str("0.05").unwrap());
        assert!(!config.optimistic_settlement);
    }

    #[test]
    fn resolves_env_var_reference_for_private_key() {
        let _guard = ENV_LOCK.lock().unwrap();
        set_required_env();
        let key = "0xbeef000000000000000000000000000000000000000000000000000000000002";
        unsafe {
            env::set_var("SECRET_RELAYER_KEY", key);
            env::set_var("RELAYER_PRIVATE_KEY", "$SECRET_RELAYER_KEY");
        }
        let config = Config::load().unwrap();
        let expected: EvmPrivateKey = key.parse().unwrap();
        assert_eq!(
            config.relayer_private_key.as_bytes(),
            expected.as_bytes()
        );
    }

    #[test]
    fn missing_required_key_is_fatal() {
        let _guard = ENV_LOCK.lock().unwrap();
        set_required_env();
        unsafe {
            env::remove_var("RPC_URL");
        }
        assert!(matches!(Config::load(), Err(ConfigError::Missing("RPC_URL"))));
        unsafe {
            env::set_var("RPC_URL", "http://localhost:8545");
        }
    }
}
