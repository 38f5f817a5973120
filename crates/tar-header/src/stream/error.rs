//! Error types for tar stream parsing.

use thiserror::Error;

use crate::{HeaderError, PaxError};

/// Errors that can occur during tar stream parsing.
///
/// All of them are fatal: after an error the stream position is unreliable
/// and the parser must not be used further.
#[derive(Debug, Error)]
pub enum StreamError {
    /// I/O error from the underlying reader or the content writer.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Header decoding error (checksum, format, invalid octal, etc.).
    #[error("header error: {0}")]
    Header(#[from] HeaderError),

    /// PAX extension record parsing error.
    #[error("PAX error: {0}")]
    Pax(#[from] PaxError),

    /// The stream ended in the middle of a header record.
    #[error("incomplete trailing block: {len} of 512 bytes at position {pos}")]
    IncompleteBlock {
        /// Position of the start of the incomplete block.
        pos: u64,
        /// Number of bytes that were available.
        len: usize,
    },

    /// The stream ended in the middle of an entry's content.
    #[error("unexpected EOF at position {pos}")]
    UnexpectedEof {
        /// Position in the stream where EOF occurred.
        pos: u64,
    },

    /// An extension header was not followed by an entry.
    #[error("premature end of tar file")]
    PrematureEnd,

    /// A PAX `size` record is not a decimal integer.
    #[error("invalid PAX size value: {0:?}")]
    InvalidPaxSize(String),

    /// Entry size is invalid (overflow when computing the padded size).
    #[error("invalid entry size: {0}")]
    InvalidSize(u64),

    /// Path or link target exceeds the configured maximum length.
    #[error("path exceeds limit: {len} bytes > {limit} bytes")]
    PathTooLong {
        /// Actual length.
        len: usize,
        /// Configured limit.
        limit: usize,
    },

    /// PAX payload exceeds the configured maximum size.
    #[error("PAX header exceeds limit: {size} bytes > {limit} bytes")]
    PaxTooLarge {
        /// Declared PAX payload size.
        size: u64,
        /// Configured limit.
        limit: u64,
    },

    /// Too many consecutive extension headers.
    #[error("too many pending extension headers: {count} > {limit}")]
    TooManyPendingEntries {
        /// Number of consecutive extension headers seen.
        count: usize,
        /// Configured limit.
        limit: usize,
    },
}

/// Result type for stream parsing operations.
pub type Result<T> = std::result::Result<T, StreamError>;
