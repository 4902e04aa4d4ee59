use std::path::PathBuf;
use thiserror::Error;

/// Failure classes of the archive pipeline.
///
/// Vault write failures live in `gpt_gulp_vault::VaultError`. Row decode
/// problems never surface; the store substitutes defaults.
#[derive(Debug, Error)]
pub enum GulpError {
    #[error("invalid configuration at {path}: {source}")]
    Config {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("conversation store error: {0}")]
    Store(#[from] rusqlite::Error),

    #[error("failed to encode conversation field: {0}")]
    Encode(#[from] serde_json::Error),

    #[error("failed to process conversation {id}: {reason}")]
    Extraction { id: String, reason: String },
}
