use thiserror::Error;

use crate::storage::StoreError;

#[derive(Debug, Error)]
pub enum ServiceError {
    /// Input rejected before any write (400).
    #[error("{0}")]
    Validation(String),
    /// Id already taken (409).
    #[error("{0}")]
    Conflict(String),
    #[error("{0}")]
    NotFound(String),
    /// Delete blocked by records that still reference the target (400).
    #[error("{message}")]
    Integrity { message: String, linked: usize },
    #[error(transparent)]
    Model(#[from] models::ModelError),
    #[error("store error: {0}")]
    Store(#[from] StoreError),
}

impl ServiceError {
    pub fn customer_not_found() -> Self { Self::NotFound("Cliente não encontrado".into()) }
    pub fn city_not_found() -> Self { Self::NotFound("Cidade não encontrada".into()) }

    /// Stable short name for logs and metrics labels.
    pub fn kind(&self) -> &'static str {
        match self {
            ServiceError::Validation(_) | ServiceError::Model(_) => "validation",
            ServiceError::Conflict(_) => "conflict",
            ServiceError::NotFound(_) => "not_found",
            ServiceError::Integrity { .. } => "integrity",
            ServiceError::Store(_) => "internal",
        }
    }
}
