use crate::domain::model::ProductId;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CartError {
    #[error("API request failed: {0}")]
    ApiError(#[from] reqwest::Error),

    #[error("Invalid URL: {0}")]
    UrlError(#[from] url::ParseError),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("{resource} {id} not found")]
    NotFound { resource: String, id: ProductId },

    #[error("Configuration error: {message}")]
    ConfigError { message: String },

    #[error("Invalid value for '{field}' ({value}): {reason}")]
    InvalidConfigValueError {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Storage error: {message}")]
    StorageError { message: String },

    #[error("Validation error: {message}")]
    ValidationError { message: String },
}

impl CartError {
    pub fn not_found(resource: &str, id: ProductId) -> Self {
        CartError::NotFound {
            resource: resource.to_string(),
            id,
        }
    }
}

pub type Result<T> = std::result::Result<T, CartError>;

/// Why a cart operation was rejected.
///
/// The `Display` text is the user-facing notification for that failure.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum CartFailure {
    #[error("requested quantity out of stock")]
    StockExceeded,

    #[error("error removing product")]
    ProductNotFound,

    #[error("error adding product")]
    AddFailed,

    #[error("error changing product quantity")]
    UpdateFailed,
}
