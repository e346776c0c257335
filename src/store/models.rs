//! Row types for the ledger mirror (spec §3/§4.7). These are a reporting
//! mirror only — on-chain `Escrow.providerBalances` is the source of truth
//! for claimable amounts.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use uuid::Uuid;

#[derive(Debug, Clone, sqlx::FromRow, Serialize)]
pub struct ProviderRecord {
    pub id: Uuid,
    pub wallet_address: String,
    pub name: String,
    pub total_earned: Decimal,
    pub total_claimed: Decimal,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, sqlx::Type, Serialize, serde::Deserialize)]
#[sqlx(type_name = "text", rename_all = "UPPERCASE")]
#[serde(rename_all = "UPPERCASE")]
pub enum ServiceKind {
    Hosted,
    Proxy,
    Native,
}

#[derive(Debug, Clone, sqlx::FromRow, Serialize)]
pub struct ServiceRecord {
    pub id: Uuid,
    pub service_id_hash: String,
    pub provider_id: Uuid,
    pub name: String,
    pub description: String,
    pub kind: ServiceKind,
    pub endpoint: String,
    pub hosted_content: Option<String>,
    pub price_base_units: Decimal,
    pub tag: Option<String>,
    pub active: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, sqlx::FromRow, Serialize)]
pub struct AccessLogEntry {
    pub id: Uuid,
    pub service_id: Uuid,
    pub payer_address: String,
    pub tx_hash: String,
    pub amount: Decimal,
    pub platform_fee: Decimal,
    pub provider_share: Decimal,
    pub legacy_settlement: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, sqlx::FromRow, Serialize)]
pub struct ClaimRecord {
    pub id: Uuid,
    pub provider_id: Uuid,
    pub amount: Decimal,
    pub tx_hash: String,
    pub created_at: DateTime<Utc>,
}
