use std::io;
use std::path::PathBuf;

/// An error returned by [`convert`](crate::convert::convert) and friends.
///
/// Nothing is recovered locally: every variant aborts the conversion and is
/// handed back to the caller.
#[derive(Debug, thiserror::Error)]
pub enum ConvertError {
    #[error("Source file {path:?} does not exist")]
    NotFound { path: PathBuf },

    #[error("Failed to parse {path:?} as JSON")]
    Parse {
        path: PathBuf,
        source: serde_json::Error,
    },

    #[error("{path:?} has no '{key}' key at the top level")]
    Schema { path: PathBuf, key: &'static str },

    #[error("{context}")]
    Io { context: String, source: io::Error },

    #[error("Payload cannot be encoded as MessagePack")]
    Encode(#[from] rmp_serde::encode::Error),

    /// An integer literal outside both the i64 and u64 ranges.
    #[error("'{key}' holds the integer {literal}, which does not fit in 64 bits")]
    IntegerOverflow { key: &'static str, literal: String },

    #[error("Payload is not valid MessagePack")]
    Decode(#[from] rmp_serde::decode::Error),

    #[error("{extra} unexpected bytes after the MessagePack value")]
    TrailingBytes { extra: usize },

    #[error("{path:?} does not hold the payload of its source document")]
    Mismatch { path: PathBuf },
}

/// Attach a context string to io-like errors, `anyhow` style, while keeping
/// the typed [`ConvertError::Io`] variant.
pub(crate) trait ErrContext<T> {
    fn context(self, context: String) -> Result<T, ConvertError>;
}

impl<T, E: Into<io::Error>> ErrContext<T> for Result<T, E> {
    fn context(self, context: String) -> Result<T, ConvertError> {
        self.map_err(|err| ConvertError::Io {
            context,
            source: err.into(),
        })
    }
}
