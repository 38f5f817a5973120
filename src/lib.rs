//! Safe extraction of ustar/PAX archives.
//!
//! Archives are read front to back by [`tar_header::stream::TarStreamParser`]
//! and written below a root directory by [`Extractor`]. Nothing outside the
//! root is ever touched: every entry passes a [`PathValidator`] before the
//! filesystem is consulted, and conflicting objects inside the root are
//! replaced rather than followed.
//!
//! ```no_run
//! let archive = std::fs::File::open("rootfs.tar")?;
//! let stats = tarx::extract(archive, "/tmp/rootfs")?;
//! println!("{} files, {} bytes", stats.files, stats.bytes);
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```
//!
//! [`PathValidator`]: sanitize::PathValidator

#![forbid(unsafe_code)]

pub mod error;
pub mod extract;
pub mod sanitize;

mod util;

pub use error::{ExtractError, Result};
pub use extract::{extract, ExtractOptions, ExtractStats, Extractor};
pub use tar_header::stream::Limits;
