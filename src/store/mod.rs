//! The persistence layer: a Postgres-backed mirror of the service catalog,
//! access logs, and claim history. On-chain state remains authoritative for
//! balances (spec §4.7) — this store exists for discovery and reporting.

pub mod error;
pub mod models;

use rust_decimal::Decimal;
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use uuid::Uuid;

use error::StoreError;
use models::{AccessLogEntry, ClaimRecord, ProviderRecord, ServiceRecord};

#[derive(Debug, Clone)]
pub struct Store {
    pool: PgPool,
}

impl Store {
    /// Connects to the configured database and runs pending migrations.
    pub async fn connect(database_url: &str) -> Result<Self, StoreError> {
        let pool = PgPoolOptions::new()
            .max_connections(10)
            .connect(database_url)
            .await?;
        sqlx::migrate!("./migrations").run(&pool).await.map_err(|e| {
            StoreError::Database(sqlx::Error::Migrate(Box::new(e)))
        })?;
        Ok(Self { pool })
    }

    pub async fn list_services(
        &self,
        tag: Option<&str>,
        search: Option<&str>,
    ) -> Result<Vec<ServiceRecord>, StoreError> {
        let rows = sqlx::query_as::<_, ServiceRecord>(
            r#"
            SELECT id, service_id_hash, provider_id, name, description, kind,
                   endpoint, hosted_content, price_base_units, tag, active, created_at
            FROM services
            WHERE active = true
              AND ($1::text IS NULL OR tag = $1)
              AND ($2::text IS NULL OR name ILIKE '%' || $2 || '%' OR description ILIKE '%' || $2 || '%')
            ORDER BY created_at DESC
            "#,
        )
        .bind(tag)
        .bind(search)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    pub async fn find_service(&self, id: Uuid) -> Result<ServiceRecord, StoreError> {
        sqlx::query_as::<_, ServiceRecord>(
            r#"
            SELECT id, service_id_hash, provider_id, name, description, kind,
                   endpoint, hosted_content, price_base_units, tag, active, created_at
            FROM services WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| StoreError::ServiceNotFound(id.to_string()))
    }

    pub async fn find_service_by_hash(&self, service_id_hash: &str) -> Result<ServiceRecord, StoreError> {
        sqlx::query_as::<_, ServiceRecord>(
            r#"
            SELECT id, service_id_hash, provider_id, name, description, kind,
                   endpoint, hosted_content, price_base_units, tag, active, created_at
            FROM services WHERE service_id_hash = $1
            "#,
        )
        .bind(service_id_hash)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| StoreError::ServiceNotFound(service_id_hash.to_string()))
    }

    pub async fn find_provider(&self, id: Uuid) -> Result<ProviderRecord, StoreError> {
        sqlx::query_as::<_, ProviderRecord>(
            "SELECT id, wallet_address, name, total_earned, total_claimed, created_at FROM providers WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| StoreError::ProviderNotFound(id.to_string()))
    }

    pub async fn find_provider_by_wallet(&self, wallet_address: &str) -> Result<ProviderRecord, StoreError> {
        sqlx::query_as::<_, ProviderRecord>(
            "SELECT id, wallet_address, name, total_earned, total_claimed, created_at FROM providers WHERE wallet_address = $1",
        )
        .bind(wallet_address)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| StoreError::ProviderNotFound(wallet_address.to_string()))
    }

    /// Appends an access-log entry and bumps the provider's mirrored
    /// `total_earned`. Only called on CONFIRMED (or SUBMITTED-in-optimistic)
    /// settlement, per spec §4.5.
    pub async fn record_settlement(
        &self,
        service_id: Uuid,
        provider_id: Uuid,
        payer_address: &str,
        tx_hash: &str,
        amount: Decimal,
        platform_fee: Decimal,
        provider_share: Decimal,
        legacy_settlement: bool,
    ) -> Result<AccessLogEntry, StoreError> {
        let mut tx = self.pool.begin().await?;
        let entry = sqlx::query_as::<_, AccessLogEntry>(
            r#"
            INSERT INTO access_logs (service_id, payer_address, tx_hash, amount, platform_fee, provider_share, legacy_settlement)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING id, service_id, payer_address, tx_hash, amount, platform_fee, provider_share, legacy_settlement, created_at
            "#,
        )
        .bind(service_id)
        .bind(payer_address)
        .bind(tx_hash)
        .bind(amount)
        .bind(platform_fee)
        .bind(provider_share)
        .bind(legacy_settlement)
        .fetch_one(&mut *tx)
        .await?;

        if !legacy_settlement {
            sqlx::query("UPDATE providers SET total_earned = total_earned + $1 WHERE id = $2")
                .bind(provider_share)
                .bind(provider_id)
                .execute(&mut *tx)
                .await?;
        }
        tx.commit().await?;
        Ok(entry)
    }

    pub async fn record_claim(&self, provider_id: Uuid, amount: Decimal, tx_hash: &str) -> Result<ClaimRecord, StoreError> {
        let mut tx = self.pool.begin().await?;
        let claim = sqlx::query_as::<_, ClaimRecord>(
            r#"
            INSERT INTO claims (provider_id, amount, tx_hash)
            VALUES ($1, $2, $3)
            RETURNING id, provider_id, amount, tx_hash, created_at
            "#,
        )
        .bind(provider_id)
        .bind(amount)
        .bind(tx_hash)
        .fetch_one(&mut *tx)
        .await?;
        sqlx::query("UPDATE providers SET total_claimed = total_claimed + $1 WHERE id = $2")
            .bind(amount)
            .bind(provider_id)
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;
        Ok(claim)
    }
}
