//! Error types for extraction.
//!
//! Every failure aborts the extraction. Errors that concern a particular
//! archive entry carry its path so that the caller can report it.
//!
//! - **Decoding**: [`Stream`], anything the archive reader rejects
//! - **Entry semantics**: [`InvalidEntry`], a well-formed header describing
//!   something that cannot be extracted
//! - **Path safety**: [`UnsafePath`], rejected by the [`PathValidator`]
//! - **Filesystem**: [`Io`], with the path being operated on
//!
//! [`Stream`]: ExtractError::Stream
//! [`InvalidEntry`]: ExtractError::InvalidEntry
//! [`UnsafePath`]: ExtractError::UnsafePath
//! [`Io`]: ExtractError::Io
//! [`PathValidator`]: crate::sanitize::PathValidator

use std::path::{Path, PathBuf};

use tar_header::stream::StreamError;

/// Result type alias for operations that may return an [`ExtractError`].
pub type Result<T> = std::result::Result<T, ExtractError>;

/// Error types for extraction.
#[derive(Debug, thiserror::Error)]
pub enum ExtractError {
    /// The archive stream could not be decoded.
    #[error(transparent)]
    Stream(#[from] StreamError),

    /// The entry's header fields are inconsistent.
    #[error("invalid entry {path:?}: {reason}")]
    InvalidEntry {
        /// Entry path, lossily decoded.
        path: String,
        /// Which field combination was rejected.
        reason: String,
    },

    /// The path validator refused the entry.
    #[error("unsafe path {path:?} (link {link:?}): {reason}")]
    UnsafePath {
        /// Entry path, lossily decoded.
        path: String,
        /// Link target, lossily decoded; empty for non-symlinks.
        link: String,
        /// Reason given by the validator.
        reason: String,
    },

    /// A filesystem operation failed.
    #[error("{}: {source}", path.display())]
    Io {
        /// The path being created, removed or modified.
        path: PathBuf,
        /// The underlying error.
        #[source]
        source: std::io::Error,
    },
}

impl ExtractError {
    /// Error mapper for `map_err`; the path is copied only on failure.
    pub(crate) fn io(path: &Path) -> impl FnOnce(std::io::Error) -> Self + '_ {
        move |source| Self::Io {
            path: path.to_path_buf(),
            source,
        }
    }
}

#[cfg(test)]
mod tests {
    use std::io;

    use super::*;

    #[test]
    fn test_io_error_carries_path() {
        let path = Path::new("/srv/root/etc/hostname");
        let ok: io::Result<()> = Ok(());
        ok.map_err(ExtractError::io(path)).unwrap();

        let err = Err::<(), _>(io::Error::from(io::ErrorKind::PermissionDenied))
            .map_err(ExtractError::io(path))
            .unwrap_err();
        match &err {
            ExtractError::Io { path: got, source } => {
                assert_eq!(got, path);
                assert_eq!(source.kind(), io::ErrorKind::PermissionDenied);
            }
            other => panic!("unexpected error {other:?}"),
        }
        assert!(err.to_string().starts_with("/srv/root/etc/hostname: "));
    }
}
