//! Streaming ustar parser with PAX extension support.

use std::io::{self, Read, Write};

use log::{debug, trace};

use crate::{parse_pax_records, Header, HEADER_SIZE, PAX_LINKPATH, PAX_PATH, PAX_SIZE};

use super::entry::{Entry, EntryKind};
use super::error::{Result, StreamError};
use super::limits::Limits;

/// Overrides collected from extension headers, waiting for the next entry.
#[derive(Debug, Default)]
struct PendingOverrides {
    path: Option<Vec<u8>>,
    link: Option<Vec<u8>>,
    size: Option<u64>,
    /// Number of extension headers seen since the last entry.
    count: usize,
}

/// Streaming tar parser that folds PAX extension headers into entries.
///
/// After [`next_entry`] returns an entry, its content has not been read.
/// Call [`copy_content`] or [`skip_content`] with `entry.size` before asking
/// for the next entry.
///
/// ```no_run
/// use std::io::Cursor;
/// use tar_header::stream::TarStreamParser;
///
/// # let archive: Vec<u8> = Vec::new();
/// let mut parser = TarStreamParser::with_defaults(Cursor::new(archive));
/// while let Some(entry) = parser.next_entry().unwrap() {
///     let mut content = Vec::new();
///     parser.copy_content(entry.size, &mut content).unwrap();
/// }
/// ```
///
/// [`next_entry`]: TarStreamParser::next_entry
/// [`copy_content`]: TarStreamParser::copy_content
/// [`skip_content`]: TarStreamParser::skip_content
#[derive(Debug)]
pub struct TarStreamParser<R> {
    reader: R,
    limits: Limits,
    /// Scratch buffer lent to every read; `HEADER_SIZE` long between calls.
    buf: Vec<u8>,
    /// Current position in the stream (for error messages)
    pos: u64,
    /// Whether we've seen EOF or the end-of-archive marker
    done: bool,
}

impl<R: Read> TarStreamParser<R> {
    /// Create a new tar stream parser with the given reader and limits.
    pub fn new(reader: R, limits: Limits) -> Self {
        Self {
            reader,
            limits,
            buf: vec![0u8; HEADER_SIZE],
            pos: 0,
            done: false,
        }
    }

    /// Create a new tar stream parser with default limits.
    pub fn with_defaults(reader: R) -> Self {
        Self::new(reader, Limits::default())
    }

    /// Get the current position in the stream.
    #[must_use]
    pub fn position(&self) -> u64 {
        self.pos
    }

    /// Get the next entry, consuming any extension headers before it.
    ///
    /// Returns `Ok(None)` at the end of the archive: an all-zero block, or
    /// EOF exactly on a block boundary.
    ///
    /// # Errors
    ///
    /// Any malformed header or extension record, an extension header with no
    /// entry after it ([`StreamError::PrematureEnd`]), or exceeded [`Limits`].
    pub fn next_entry(&mut self) -> Result<Option<Entry>> {
        if self.done {
            return Ok(None);
        }

        let mut pending = PendingOverrides::default();
        loop {
            let Some(header) = self.read_header()? else {
                self.done = true;
                if pending.count > 0 {
                    return Err(StreamError::PrematureEnd);
                }
                return Ok(None);
            };

            let size = header.entry_size()?;
            match EntryKind::try_from(header.entry_type()) {
                Ok(kind) => {
                    let entry = self.resolve_entry(&header, kind, size, pending)?;
                    debug!(
                        "entry {:?} type {:?} mode {:04o} size {}",
                        entry.path_lossy(),
                        entry.kind,
                        entry.mode,
                        entry.size
                    );
                    return Ok(Some(entry));
                }
                Err(ext) => {
                    pending.count += 1;
                    if pending.count > self.limits.max_pending_entries {
                        return Err(StreamError::TooManyPendingEntries {
                            count: pending.count,
                            limit: self.limits.max_pending_entries,
                        });
                    }
                    trace!("extension header {ext:?} with {size} bytes of records");
                    self.read_extensions(size, &mut pending)?;
                }
            }
        }
    }

    /// Copy exactly `size` content bytes to `writer`, consuming the padding
    /// up to the next block boundary.
    ///
    /// # Errors
    ///
    /// [`StreamError::UnexpectedEof`] if the stream ends before the last
    /// content block is complete; I/O errors from either side.
    pub fn copy_content(&mut self, size: u64, writer: &mut impl Write) -> Result<()> {
        debug_assert_eq!(self.buf.len(), HEADER_SIZE);
        let mut remaining = size;
        while remaining > 0 {
            let filled = read_full(&mut self.reader, &mut self.buf)?;
            self.pos += filled as u64;
            if filled < HEADER_SIZE {
                return Err(StreamError::UnexpectedEof { pos: self.pos });
            }
            let n = remaining.min(HEADER_SIZE as u64) as usize;
            writer.write_all(&self.buf[..n])?;
            remaining -= n as u64;
        }
        Ok(())
    }

    /// Skip `size` content bytes and their padding.
    ///
    /// # Errors
    ///
    /// Same as [`copy_content`](Self::copy_content).
    pub fn skip_content(&mut self, size: u64) -> Result<()> {
        self.copy_content(size, &mut io::sink())
    }

    // =========================================================================
    // Internal helpers
    // =========================================================================

    /// Read and validate one header record. `None` marks the end of the
    /// archive.
    fn read_header(&mut self) -> Result<Option<Header>> {
        debug_assert_eq!(self.buf.len(), HEADER_SIZE);
        let start = self.pos;
        let filled = read_full(&mut self.reader, &mut self.buf)?;
        self.pos += filled as u64;

        if filled < HEADER_SIZE {
            if self.buf[..filled].iter().all(|&b| b == 0) {
                return Ok(None);
            }
            return Err(StreamError::IncompleteBlock {
                pos: start,
                len: filled,
            });
        }

        let header = *Header::from_bytes(&self.buf)?;
        if header.is_empty() {
            return Ok(None);
        }
        header.validate()?;
        Ok(Some(header))
    }

    /// Read a PAX payload of `size` bytes and fold its records into
    /// `pending`. The scratch buffer is restored afterwards, even on error.
    fn read_extensions(&mut self, size: u64, pending: &mut PendingOverrides) -> Result<()> {
        if size > self.limits.max_pax_size {
            return Err(StreamError::PaxTooLarge {
                size,
                limit: self.limits.max_pax_size,
            });
        }
        let padded = size
            .checked_next_multiple_of(HEADER_SIZE as u64)
            .and_then(|p| usize::try_from(p).ok())
            .ok_or(StreamError::InvalidSize(size))?;

        self.buf.resize(padded, 0);
        let result = self.fold_extensions(size as usize, pending);
        self.buf.resize(HEADER_SIZE, 0);
        result
    }

    fn fold_extensions(&mut self, size: usize, pending: &mut PendingOverrides) -> Result<()> {
        let filled = read_full(&mut self.reader, &mut self.buf)?;
        self.pos += filled as u64;
        if filled < self.buf.len() {
            return Err(StreamError::UnexpectedEof { pos: self.pos });
        }

        for ext in parse_pax_records(&self.buf[..size])? {
            match ext.key_bytes() {
                key if key == PAX_PATH.as_bytes() => {
                    pending.path = Some(ext.value_bytes().to_vec());
                }
                key if key == PAX_LINKPATH.as_bytes() => {
                    pending.link = Some(ext.value_bytes().to_vec());
                }
                key if key == PAX_SIZE.as_bytes() => {
                    pending.size = Some(parse_decimal(ext.value_bytes())?);
                }
                key => trace!("ignoring PAX key {:?}", String::from_utf8_lossy(key)),
            }
        }
        Ok(())
    }

    fn resolve_entry(
        &self,
        header: &Header,
        kind: EntryKind,
        size: u64,
        pending: PendingOverrides,
    ) -> Result<Entry> {
        let path = pending.path.unwrap_or_else(|| header.path().into_owned());
        let link = pending
            .link
            .unwrap_or_else(|| header.link_name_bytes().to_vec());

        for len in [path.len(), link.len()] {
            if len > self.limits.max_path_len {
                return Err(StreamError::PathTooLong {
                    len,
                    limit: self.limits.max_path_len,
                });
            }
        }

        Ok(Entry {
            path,
            link,
            mode: header.mode()?,
            size: pending.size.unwrap_or(size),
            kind,
        })
    }

    #[cfg(test)]
    pub(super) fn scratch_len(&self) -> usize {
        self.buf.len()
    }
}

/// Parse a PAX decimal value. Signs, spaces and empty values are rejected.
fn parse_decimal(value: &[u8]) -> Result<u64> {
    let invalid = || StreamError::InvalidPaxSize(String::from_utf8_lossy(value).into_owned());
    if value.is_empty() {
        return Err(invalid());
    }
    value.iter().try_fold(0u64, |acc, &b| {
        if !b.is_ascii_digit() {
            return Err(invalid());
        }
        acc.checked_mul(10)
            .and_then(|v| v.checked_add(u64::from(b - b'0')))
            .ok_or_else(invalid)
    })
}

/// Fill `buf` from `reader`, stopping early only at EOF. Returns the number
/// of bytes read.
fn read_full<R: Read>(reader: &mut R, buf: &mut [u8]) -> io::Result<usize> {
    let mut total = 0;
    while total < buf.len() {
        match reader.read(&mut buf[total..]) {
            Ok(0) => break,
            Ok(n) => total += n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        }
    }
    Ok(total)
}
