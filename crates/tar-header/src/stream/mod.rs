//! Streaming ustar reader with transparent PAX extension handling.
//!
//! [`TarStreamParser`] reads an archive strictly front to back and yields one
//! [`Entry`] per file system object. PAX extended headers (types `'x'` and
//! `'g'`) never surface: their `path`, `linkpath` and `size` records are
//! folded into the entry that follows them.
//!
//! # Buffering
//!
//! The parser owns one scratch buffer of [`HEADER_SIZE`] bytes that every
//! read goes through. It grows while a PAX payload is read and is restored to
//! its canonical size before the next header read, so memory use is bounded
//! by [`Limits::max_pax_size`] regardless of archive length.
//!
//! # Security
//!
//! Every decoding problem is an error, never a skipped record. [`Limits`]
//! bound PAX payload sizes and runs of consecutive extension headers, and
//! can cap path lengths.
//!
//! # Example
//!
//! ```no_run
//! use std::fs::File;
//! use std::io::BufReader;
//! use tar_header::stream::{Limits, TarStreamParser};
//!
//! let file = File::open("archive.tar").unwrap();
//! let mut parser = TarStreamParser::new(BufReader::new(file), Limits::default());
//!
//! while let Some(entry) = parser.next_entry().unwrap() {
//!     println!("{} ({} bytes)", entry.path_lossy(), entry.size);
//!     // Content must be consumed before the next header.
//!     parser.skip_content(entry.size).unwrap();
//! }
//! ```
//!
//! [`HEADER_SIZE`]: crate::HEADER_SIZE

mod entry;
mod error;
mod limits;
mod parser;

pub use entry::{Entry, EntryKind};
pub use error::{Result, StreamError};
pub use limits::Limits;
pub use parser::TarStreamParser;
