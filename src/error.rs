use thiserror::Error;

use crate::models::LanguageCode;

/// Main error type for Cuttle operations
#[derive(Error, Debug)]
pub enum CuttleError {
    #[error("no such language: {0}")]
    NoSuchLanguage(LanguageCode),

    #[error("invalid language code: {0:?}")]
    InvalidLanguageCode(String),

    #[error("commit failed for language {language}: {source}")]
    CommitFailed {
        language: LanguageCode,
        #[source]
        source: std::io::Error,
    },

    #[error("taxonomy commit failed: {0}")]
    TaxonomyCommitFailed(#[source] std::io::Error),

    #[error("snapshot already released")]
    DoubleRelease,

    #[error("use after release")]
    UseAfterRelease,

    #[error("language tracker already retired")]
    TrackerRetired,

    #[error("internal error: {0}")]
    Internal(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias for Cuttle operations
pub type Result<T> = std::result::Result<T, CuttleError>;

impl CuttleError {
    /// Check if this error is a caller contract violation (a bug signal,
    /// never retried) rather than a recoverable fault.
    pub fn is_contract_violation(&self) -> bool {
        matches!(
            self,
            CuttleError::DoubleRelease | CuttleError::UseAfterRelease
        )
    }

    /// Check if this error is recoverable by the caller: a missing language
    /// maps to an empty result set, and a failed commit may be retried by
    /// the indexing pipeline.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            CuttleError::NoSuchLanguage(_)
                | CuttleError::CommitFailed { .. }
                | CuttleError::TaxonomyCommitFailed(_)
        )
    }
}
