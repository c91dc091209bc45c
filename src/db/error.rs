use sea_orm::DbErr;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CmdbError {
    #[error("Field not found: {0}")]
    FieldNotFound(String),
    #[error("Host field registry is inconsistent: {0}")]
    RegistryMismatch(String),
    #[error("Invalid sort spec: {0}")]
    InvalidSortSpec(String),
    #[error("Invalid order '{0}'. Must be either [asc|desc]")]
    InvalidOrder(String),
    #[error("Invalid value for field {field}: {value}")]
    InvalidValue { field: String, value: String },
    #[error("Host not found: {0}")]
    NotFound(i32),
    #[error("Free pool set not found for application {0}")]
    PoolNotFound(i32),
    #[error("Free pool module not found for application {application_id} (set {set_id})")]
    ModuleNotFound { application_id: i32, set_id: i32 },
    #[error("Storage failure: {0}")]
    StorageFailure(#[from] DbErr),
}

pub type CmdbResult<T> = Result<T, CmdbError>;
