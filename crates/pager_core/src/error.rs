use thiserror::Error;

use crate::LoadType;

/// Errors produced while assembling the paged window.
///
/// Source and mediator failures are recorded as [`crate::LoadState::Error`]
/// and surface through page events; the remaining variants are contract
/// violations by the surrounding integration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PagingError {
    #[error("source load failed: {0}")]
    SourceLoad(String),
    #[error("remote mediator failed: {0}")]
    RemoteMediator(String),
    #[error(
        "the same key {key} was returned by two sequential {load_type} pages; \
         key reuse must be explicitly enabled on the source"
    )]
    KeyReuse { load_type: LoadType, key: String },
    #[error("page events can only be collected once per snapshot")]
    AlreadyCollected,
    #[error("page events must be collected inside a tokio runtime")]
    NoRuntime,
    #[error("cannot retry {0} load without a viewport hint")]
    MissingRetryHint(LoadType),
    #[error("jump_threshold is set but the source does not support jumping")]
    JumpingUnsupported,
    #[error("invalid paging config: {0}")]
    InvalidConfig(String),
    #[error("invariant violated: {0}")]
    InvariantViolation(String),
}

impl PagingError {
    pub fn source_load(message: impl Into<String>) -> Self {
        Self::SourceLoad(message.into())
    }

    pub fn remote_mediator(message: impl Into<String>) -> Self {
        Self::RemoteMediator(message.into())
    }

    pub fn invariant(message: impl Into<String>) -> Self {
        Self::InvariantViolation(message.into())
    }

    /// Usage errors and invariant violations stop the snapshot; load failures do not.
    pub fn is_fatal(&self) -> bool {
        !matches!(
            self,
            Self::SourceLoad(_) | Self::RemoteMediator(_) | Self::KeyReuse { .. }
        )
    }
}
