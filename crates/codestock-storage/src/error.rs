use thiserror::Error;
use uuid::Uuid;

use codestock_core::error::CoreError;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("store configuration error: {0}")]
    Config(String),

    #[error("snippet not found: {id}")]
    NotFound { id: Uuid },

    /// `size` is known when the Gateway rejected the body itself, and absent
    /// when the store or an intermediary refused it.
    #[error("write payload exceeds the 1 MiB limit")]
    PayloadTooLarge { size: Option<usize> },

    #[error("invalid snippet: {0}")]
    Invalid(#[from] CoreError),

    #[error("store returned {status}: {body}")]
    Upstream { status: u16, body: String },

    #[error("malformed store response: {0}")]
    MalformedResponse(String),

    #[error("store request timed out")]
    Timeout,

    #[error("store transport error: {0}")]
    Transport(String),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}
