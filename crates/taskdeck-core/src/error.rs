use std::io;

use thiserror::Error;

/// Failure taxonomy for core operations.
///
/// Mutations addressed at an unknown id are not errors: they come back as
/// zero-change results so a stale reference never aborts the session.
/// `NotFound` is reserved for lookups where the caller demanded a specific
/// record and there is nothing sensible to show without it.
#[derive(Debug, Error)]
pub enum Error {
    #[error("{0}")]
    Validation(String),

    #[error("no such {kind}: {key}")]
    NotFound { kind: &'static str, key: String },

    #[error("{context}: {source}")]
    Io {
        context: String,
        #[source]
        source: io::Error,
    },
}

impl Error {
    pub fn validation(message: impl Into<String>) -> Self {
        Error::Validation(message.into())
    }

    pub fn not_found(kind: &'static str, key: impl Into<String>) -> Self {
        Error::NotFound {
            kind,
            key: key.into(),
        }
    }

    pub fn io(context: impl Into<String>, source: io::Error) -> Self {
        Error::Io {
            context: context.into(),
            source,
        }
    }

    pub fn is_validation(&self) -> bool {
        matches!(self, Error::Validation(_))
    }
}
