use thiserror::Error;

use crate::auth::storage::{ScopeKind, StorageError};

#[derive(Error, Debug)]
pub enum Error {
    #[error("Invalid argument: {0}")]
    TypeValidation(String),

    #[error("Cannot hydrate from {scope} scope: field `{field}` is missing or not a string")]
    Hydration {
        scope: ScopeKind,
        field: &'static str,
    },

    #[error("Response body is not valid JSON (status {status}): {source}")]
    Parse {
        status: u16,
        #[source]
        source: serde_json::Error,
    },

    #[error("Password hashing failed: {0}")]
    Hash(String),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("HTTP client error: {0}")]
    Client(#[from] reqwest::Error),
}

pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    pub(crate) fn invalid(message: impl Into<String>) -> Self {
        Error::TypeValidation(message.into())
    }

    pub fn is_type_validation(&self) -> bool {
        matches!(self, Error::TypeValidation(_))
    }
}
