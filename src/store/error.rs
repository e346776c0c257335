#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("service not found: {0}")]
    ServiceNotFound(String),
    #[error("provider not found: {0}")]
    ProviderNotFound(String),
}
