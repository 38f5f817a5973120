//! Zerocopy-based decoding of ustar tar headers and PAX extension records.
//!
//! This crate decodes the POSIX ustar archive format: fixed 512-byte header
//! records, optionally preceded by PAX extended headers that carry
//! `key=value` overrides. Older pre-POSIX headers and GNU extensions (long
//! name/link entries, the `"ustar "` magic, sparse files) are rejected.
//!
//! # Header Field Layout
//!
//! | Offset | Size | Field     | Encoding                                   |
//! |--------|------|-----------|--------------------------------------------|
//! | 0      | 100  | name      | NUL-terminated if shorter than the field   |
//! | 100    | 8    | mode      | octal ASCII                                |
//! | 108    | 8    | uid       | octal ASCII                                |
//! | 116    | 8    | gid       | octal ASCII                                |
//! | 124    | 12   | size      | octal ASCII, or base-256 if the high bit of the first byte is set |
//! | 136    | 12   | mtime     | octal ASCII                                |
//! | 148    | 8    | checksum  | octal ASCII, computed with this field as spaces |
//! | 156    | 1    | typeflag  | ASCII, see [`EntryType`]                   |
//! | 157    | 100  | linkname  | symlink target                             |
//! | 257    | 6    | magic     | `"ustar\0"`                                |
//! | 263    | 2    | version   | `"00"`                                     |
//! | 265    | 32   | uname     |                                            |
//! | 297    | 32   | gname     |                                            |
//! | 329    | 8    | devmajor  |                                            |
//! | 337    | 8    | devminor  |                                            |
//! | 345    | 155  | prefix    | prepended to `name` with a `/`             |
//!
//! # Example
//!
//! ```
//! use tar_header::{EntryType, Header};
//!
//! let mut header = Header::new_ustar();
//! header.set_path(b"etc/hostname").unwrap();
//! header.set_mode(0o644);
//! header.set_size(9);
//! header.set_entry_type(EntryType::Regular);
//! header.set_checksum();
//!
//! header.validate().unwrap();
//! assert_eq!(header.path().as_ref(), b"etc/hostname");
//! assert_eq!(header.entry_size().unwrap(), 9);
//! ```
//!
//! # Streaming Reader
//!
//! For reading complete archives, with PAX headers folded into the entries
//! that follow them, see the [`stream`] module.

pub mod stream;

use std::borrow::Cow;
use std::fmt;

use thiserror::Error;
use zerocopy::{FromBytes, Immutable, IntoBytes, KnownLayout};

/// Size of a tar record in bytes.
pub const HEADER_SIZE: usize = 512;

/// Magic field of ustar headers, compared after truncation at the first NUL.
pub const USTAR_MAGIC: &[u8; 6] = b"ustar\0";

/// Version field of ustar headers.
pub const USTAR_VERSION: &[u8; 2] = b"00";

/// PAX key overriding the entry path.
pub const PAX_PATH: &str = "path";
/// PAX key overriding the symlink target.
pub const PAX_LINKPATH: &str = "linkpath";
/// PAX key overriding the payload size.
pub const PAX_SIZE: &str = "size";

/// Errors that can occur when decoding a header record.
#[derive(Debug, Error)]
pub enum HeaderError {
    /// The provided data is too short to contain a header.
    #[error("insufficient data: expected {HEADER_SIZE} bytes, got {0}")]
    InsufficientData(usize),

    /// A numeric field contains invalid characters or does not fit in 64 bits.
    #[error("invalid octal digit in field {0:?}")]
    InvalidOctal(Vec<u8>),

    /// The header checksum does not match the computed value.
    #[error("incorrect header checksum: stored {expected}, computed {computed}")]
    ChecksumMismatch {
        /// The checksum value stored in the header.
        expected: u64,
        /// The checksum computed from the header bytes.
        computed: u64,
    },

    /// The magic or version field is not the ustar one.
    #[error("unsupported archive format: magic {magic:?}, version {version:?}")]
    UnsupportedFormat {
        /// The magic field, truncated at the first NUL.
        magic: Vec<u8>,
        /// The version field, truncated at the first NUL.
        version: Vec<u8>,
    },

    /// The type flag is not an ASCII character.
    #[error("invalid block type indicator {0:#04x}")]
    InvalidTypeFlag(u8),

    /// A value does not fit in the header field it is written to.
    #[error("{field} does not fit in the header: {len} > {limit}")]
    FieldTooLong {
        /// Name of the header field.
        field: &'static str,
        /// Length of the value.
        len: usize,
        /// Capacity of the field.
        limit: usize,
    },
}

/// Result type for header decoding operations.
pub type Result<T> = std::result::Result<T, HeaderError>;

/// Raw 512-byte tar record.
#[derive(Clone, Copy, FromBytes, IntoBytes, Immutable, KnownLayout)]
#[repr(C)]
pub struct RawHeader {
    /// The raw header bytes.
    pub bytes: [u8; 512],
}

impl Default for RawHeader {
    fn default() -> Self {
        Self { bytes: [0u8; 512] }
    }
}

impl fmt::Debug for RawHeader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RawHeader")
            .field("name", &truncate_null(&self.bytes[0..100]))
            .finish_non_exhaustive()
    }
}

/// Ustar header with named fields. See the module documentation for the
/// layout.
#[derive(Clone, Copy, FromBytes, IntoBytes, Immutable, KnownLayout)]
#[repr(C)]
pub struct UstarHeader {
    /// File path name (NUL-terminated if shorter than 100 bytes).
    pub name: [u8; 100],
    /// File mode in octal ASCII.
    pub mode: [u8; 8],
    /// Owner user ID in octal ASCII.
    pub uid: [u8; 8],
    /// Owner group ID in octal ASCII.
    pub gid: [u8; 8],
    /// Payload size in octal ASCII or base-256.
    pub size: [u8; 12],
    /// Modification time as Unix timestamp in octal ASCII.
    pub mtime: [u8; 12],
    /// Header checksum in octal ASCII.
    pub checksum: [u8; 8],
    /// Entry type flag.
    pub typeflag: u8,
    /// Symlink target.
    pub linkname: [u8; 100],
    /// Magic string identifying the format.
    pub magic: [u8; 6],
    /// Format version.
    pub version: [u8; 2],
    /// Owner user name.
    pub uname: [u8; 32],
    /// Owner group name.
    pub gname: [u8; 32],
    /// Device major number.
    pub devmajor: [u8; 8],
    /// Device minor number.
    pub devminor: [u8; 8],
    /// Path prefix for names longer than 100 bytes.
    pub prefix: [u8; 155],
    /// Padding to fill the 512-byte block.
    pub pad: [u8; 12],
}

impl fmt::Debug for UstarHeader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UstarHeader")
            .field("name", &String::from_utf8_lossy(truncate_null(&self.name)))
            .field("mode", &String::from_utf8_lossy(truncate_null(&self.mode)))
            .field("typeflag", &self.typeflag)
            .field("magic", &self.magic)
            .finish_non_exhaustive()
    }
}

// ============================================================================
// Entry Type
// ============================================================================

/// Type flag of a header record.
///
/// Only regular files, symlinks and directories are extractable. The two PAX
/// types carry metadata for the record that follows and never describe a
/// file system object themselves.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum EntryType {
    /// Regular file (type '0').
    Regular,
    /// Symbolic link (type '2').
    Symlink,
    /// Directory (type '5').
    Directory,
    /// PAX extended header for the next entry (type 'x').
    XHeader,
    /// PAX global extended header (type 'g').
    XGlobalHeader,
    /// Any other ASCII type flag.
    Other(u8),
}

impl EntryType {
    /// Parse an entry type from a raw byte value.
    #[must_use]
    pub fn from_byte(byte: u8) -> Self {
        match byte {
            b'0' => EntryType::Regular,
            b'2' => EntryType::Symlink,
            b'5' => EntryType::Directory,
            b'x' => EntryType::XHeader,
            b'g' => EntryType::XGlobalHeader,
            other => EntryType::Other(other),
        }
    }

    /// Convert an entry type to its raw byte representation.
    #[must_use]
    pub fn to_byte(self) -> u8 {
        match self {
            EntryType::Regular => b'0',
            EntryType::Symlink => b'2',
            EntryType::Directory => b'5',
            EntryType::XHeader => b'x',
            EntryType::XGlobalHeader => b'g',
            EntryType::Other(b) => b,
        }
    }

    /// Returns true for the PAX metadata types.
    #[must_use]
    pub fn is_extension(self) -> bool {
        matches!(self, EntryType::XHeader | EntryType::XGlobalHeader)
    }
}

// ============================================================================
// Header Wrapper
// ============================================================================

/// A 512-byte header record with accessors for the ustar fields.
///
/// Accessors decode lazily; [`Header::validate`] checks the parts of the
/// record that every accessor relies on (checksum, magic and type flag).
#[derive(Clone, Copy, FromBytes, Immutable, KnownLayout)]
#[repr(transparent)]
pub struct Header {
    raw: RawHeader,
}

impl Header {
    /// Create an empty header with the ustar magic and version set.
    #[must_use]
    pub fn new_ustar() -> Self {
        let mut header = Self {
            raw: RawHeader::default(),
        };
        header.raw.bytes[257..263].copy_from_slice(USTAR_MAGIC);
        header.raw.bytes[263..265].copy_from_slice(USTAR_VERSION);
        header
    }

    /// Get a reference to the underlying bytes.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8; 512] {
        &self.raw.bytes
    }

    /// Get a mutable reference to the underlying bytes.
    pub fn as_mut_bytes(&mut self) -> &mut [u8; 512] {
        &mut self.raw.bytes
    }

    /// View a byte slice as a header.
    ///
    /// # Errors
    ///
    /// Returns [`HeaderError::InsufficientData`] if the slice is too short.
    pub fn from_bytes(bytes: &[u8]) -> Result<&Header> {
        if bytes.len() < HEADER_SIZE {
            return Err(HeaderError::InsufficientData(bytes.len()));
        }
        let raw = RawHeader::ref_from_bytes(&bytes[..HEADER_SIZE])
            .map_err(|_| HeaderError::InsufficientData(bytes.len()))?;
        Ok(zerocopy::transmute_ref!(raw))
    }

    /// View exactly 512 bytes as a header.
    #[must_use]
    pub fn from_bytes_exact(bytes: &[u8; 512]) -> &Header {
        let raw = RawHeader::ref_from_bytes(bytes).expect("size is correct");
        zerocopy::transmute_ref!(raw)
    }

    /// View this header with named ustar fields.
    #[must_use]
    pub fn as_ustar(&self) -> &UstarHeader {
        UstarHeader::ref_from_bytes(&self.raw.bytes).expect("size is correct")
    }

    /// Check if the magic and version fields identify a ustar header.
    #[must_use]
    pub fn is_ustar(&self) -> bool {
        let ustar = self.as_ustar();
        truncate_null(&ustar.magic) == b"ustar" && truncate_null(&ustar.version) == USTAR_VERSION
    }

    /// Validate the checksum, the format and the type flag, in that order.
    ///
    /// # Errors
    ///
    /// Returns [`HeaderError::ChecksumMismatch`], [`HeaderError::UnsupportedFormat`]
    /// or [`HeaderError::InvalidTypeFlag`].
    pub fn validate(&self) -> Result<()> {
        self.verify_checksum()?;
        if !self.is_ustar() {
            let ustar = self.as_ustar();
            return Err(HeaderError::UnsupportedFormat {
                magic: truncate_null(&ustar.magic).to_vec(),
                version: truncate_null(&ustar.version).to_vec(),
            });
        }
        parse_ascii(self.raw.bytes[156])?;
        Ok(())
    }

    /// Get the entry type.
    #[must_use]
    pub fn entry_type(&self) -> EntryType {
        EntryType::from_byte(self.raw.bytes[156])
    }

    /// Get the payload size in bytes.
    ///
    /// # Errors
    ///
    /// Returns [`HeaderError::InvalidOctal`] if the size field is not valid.
    pub fn entry_size(&self) -> Result<u64> {
        parse_numeric(&self.raw.bytes[124..136])
    }

    /// Get the permission bits.
    ///
    /// # Errors
    ///
    /// Returns [`HeaderError::InvalidOctal`] if the mode field is not valid.
    pub fn mode(&self) -> Result<u32> {
        parse_octal(&self.raw.bytes[100..108]).map(|v| (v & 0o7777) as u32)
    }

    /// Get the raw name field, without the prefix.
    #[must_use]
    pub fn name_bytes(&self) -> &[u8] {
        truncate_null(&self.raw.bytes[0..100])
    }

    /// Get the prefix field.
    #[must_use]
    pub fn prefix_bytes(&self) -> &[u8] {
        truncate_null(&self.raw.bytes[345..500])
    }

    /// Get the full entry path: `prefix/name`, or `name` alone when the
    /// prefix is empty.
    #[must_use]
    pub fn path(&self) -> Cow<'_, [u8]> {
        let prefix = self.prefix_bytes();
        if prefix.is_empty() {
            return Cow::Borrowed(self.name_bytes());
        }
        let mut full = Vec::with_capacity(prefix.len() + 1 + self.name_bytes().len());
        full.extend_from_slice(prefix);
        full.push(b'/');
        full.extend_from_slice(self.name_bytes());
        Cow::Owned(full)
    }

    /// Get the raw link name bytes.
    #[must_use]
    pub fn link_name_bytes(&self) -> &[u8] {
        truncate_null(&self.raw.bytes[157..257])
    }

    /// Verify the header checksum.
    ///
    /// # Errors
    ///
    /// Returns [`HeaderError::ChecksumMismatch`] if the checksum is invalid,
    /// or [`HeaderError::InvalidOctal`] if the stored checksum cannot be parsed.
    pub fn verify_checksum(&self) -> Result<()> {
        let expected = parse_octal(&self.raw.bytes[148..156])?;
        let computed = self.compute_checksum();
        if expected == computed {
            Ok(())
        } else {
            Err(HeaderError::ChecksumMismatch { expected, computed })
        }
    }

    /// Compute the unsigned sum of all header bytes, treating the checksum
    /// field (bytes 148..156) as spaces.
    #[must_use]
    pub fn compute_checksum(&self) -> u64 {
        let mut sum: u64 = 0;
        for (i, &byte) in self.raw.bytes.iter().enumerate() {
            if (148..156).contains(&i) {
                sum += u64::from(b' ');
            } else {
                sum += u64::from(byte);
            }
        }
        sum
    }

    /// Check if this header is an all-zero block.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.raw.bytes.iter().all(|&b| b == 0)
    }

    // ------------------------------------------------------------------------
    // Setters, used to build records for tests and tooling.
    // ------------------------------------------------------------------------

    /// Store a path, splitting it across `prefix` and `name` when it is
    /// longer than 100 bytes.
    ///
    /// # Errors
    ///
    /// Returns [`HeaderError::FieldTooLong`] if no `/` splits the path into
    /// a prefix of at most 155 bytes and a non-empty name of at most 100.
    pub fn set_path(&mut self, path: &[u8]) -> Result<()> {
        let (prefix, name) = split_ustar_path(path).ok_or(HeaderError::FieldTooLong {
            field: "path",
            len: path.len(),
            limit: 255,
        })?;
        let bytes = &mut self.raw.bytes;
        bytes[0..100].fill(0);
        bytes[..name.len()].copy_from_slice(name);
        bytes[345..500].fill(0);
        bytes[345..345 + prefix.len()].copy_from_slice(prefix);
        Ok(())
    }

    /// Store a symlink target.
    ///
    /// # Errors
    ///
    /// Returns [`HeaderError::FieldTooLong`] for targets over 100 bytes.
    pub fn set_link_name(&mut self, link: &[u8]) -> Result<()> {
        if link.len() > 100 {
            return Err(HeaderError::FieldTooLong {
                field: "linkname",
                len: link.len(),
                limit: 100,
            });
        }
        let field = &mut self.raw.bytes[157..257];
        field.fill(0);
        field[..link.len()].copy_from_slice(link);
        Ok(())
    }

    /// Store the permission bits.
    pub fn set_mode(&mut self, mode: u32) {
        format_octal(&mut self.raw.bytes[100..108], u64::from(mode & 0o7777));
    }

    /// Store the payload size, switching to base-256 when it does not fit
    /// in 11 octal digits.
    pub fn set_size(&mut self, size: u64) {
        let field = &mut self.raw.bytes[124..136];
        if size < 8u64.pow(11) {
            format_octal(field, size);
        } else {
            field.fill(0);
            field[4..].copy_from_slice(&size.to_be_bytes());
            field[0] = 0x80;
        }
    }

    /// Store the type flag.
    pub fn set_entry_type(&mut self, entry_type: EntryType) {
        self.raw.bytes[156] = entry_type.to_byte();
    }

    /// Recompute and store the checksum. Call this after all other setters.
    pub fn set_checksum(&mut self) {
        let sum = self.compute_checksum();
        let field = &mut self.raw.bytes[148..156];
        format_octal(&mut field[..7], sum);
        field[7] = b' ';
    }
}

impl Default for Header {
    fn default() -> Self {
        Self::new_ustar()
    }
}

impl fmt::Debug for Header {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Header")
            .field("path", &String::from_utf8_lossy(&self.path()))
            .field("entry_type", &self.entry_type())
            .field("size", &self.entry_size().ok())
            .field("mode", &self.mode().ok().map(|m| format!("{m:04o}")))
            .field("is_ustar", &self.is_ustar())
            .finish()
    }
}

/// Find where a path splits into a ustar prefix and name.
fn split_ustar_path(path: &[u8]) -> Option<(&[u8], &[u8])> {
    if path.len() <= 100 {
        return Some((&[], path));
    }
    // Prefer the longest name that fits, so the prefix stays short.
    path.iter()
        .enumerate()
        .filter(|&(_, &b)| b == b'/')
        .map(|(i, _)| (&path[..i], &path[i + 1..]))
        .find(|(prefix, name)| prefix.len() <= 155 && !name.is_empty() && name.len() <= 100)
}

/// Write `value` as zero-padded octal followed by a NUL terminator.
///
/// Callers guarantee the value fits in `field.len() - 1` digits.
fn format_octal(field: &mut [u8], value: u64) {
    let digits = field.len() - 1;
    let text = format!("{value:0digits$o}");
    debug_assert_eq!(text.len(), digits);
    field[..digits].copy_from_slice(&text.as_bytes()[text.len() - digits..]);
    field[digits] = 0;
}

// ============================================================================
// Field Decoders
// ============================================================================

/// Parse an octal ASCII field into a u64.
///
/// Leading spaces are skipped; the digits end at the first space or NUL, or
/// at the end of the field. For example:
/// - `"0000644\0"` -> 420
/// - `"     123 "` -> 83
///
/// # Errors
///
/// Returns [`HeaderError::InvalidOctal`] if a digit is outside `0..=7` or the
/// value overflows.
pub fn parse_octal(bytes: &[u8]) -> Result<u64> {
    let start = bytes.iter().position(|&b| b != b' ').unwrap_or(bytes.len());
    let end = bytes[start..]
        .iter()
        .position(|&b| b == b' ' || b == b'\0')
        .map_or(bytes.len(), |i| start + i);

    let mut value: u64 = 0;
    for &byte in &bytes[start..end] {
        if !(b'0'..=b'7').contains(&byte) {
            return Err(HeaderError::InvalidOctal(bytes.to_vec()));
        }
        value = value
            .checked_mul(8)
            .and_then(|v| v.checked_add(u64::from(byte - b'0')))
            .ok_or_else(|| HeaderError::InvalidOctal(bytes.to_vec()))?;
    }

    Ok(value)
}

/// Parse a numeric field that may be octal ASCII or GNU base-256 encoded.
///
/// When the high bit of the first byte is set, the remaining bits of the
/// field are a big-endian unsigned integer. Otherwise the field is octal.
///
/// # Errors
///
/// Returns [`HeaderError::InvalidOctal`] if octal parsing fails or the
/// base-256 value does not fit in a u64.
pub fn parse_numeric(bytes: &[u8]) -> Result<u64> {
    match bytes.first() {
        Some(&first) if first & 0x80 != 0 => {
            let mut value: u64 = 0;
            for (i, &byte) in bytes.iter().enumerate() {
                let b = if i == 0 { byte & 0x7f } else { byte };
                value = value
                    .checked_mul(256)
                    .and_then(|v| v.checked_add(u64::from(b)))
                    .ok_or_else(|| HeaderError::InvalidOctal(bytes.to_vec()))?;
            }
            Ok(value)
        }
        _ => parse_octal(bytes),
    }
}

/// Check that a single-byte field is ASCII.
///
/// # Errors
///
/// Returns [`HeaderError::InvalidTypeFlag`] for bytes above 0x7f.
pub fn parse_ascii(byte: u8) -> Result<u8> {
    if byte.is_ascii() {
        Ok(byte)
    } else {
        Err(HeaderError::InvalidTypeFlag(byte))
    }
}

/// Truncate a byte slice at the first NUL byte.
///
/// ```
/// use tar_header::truncate_null;
///
/// assert_eq!(truncate_null(b"hello\0world"), b"hello");
/// assert_eq!(truncate_null(b"no null here"), b"no null here");
/// assert_eq!(truncate_null(b"\0empty"), b"");
/// ```
#[must_use]
pub fn truncate_null(bytes: &[u8]) -> &[u8] {
    match bytes.iter().position(|&b| b == 0) {
        Some(pos) => &bytes[..pos],
        None => bytes,
    }
}

// ============================================================================
// PAX Extended Headers
// ============================================================================

/// Error parsing a PAX extension record.
#[derive(Debug, Error)]
pub enum PaxError {
    /// The decimal length prefix overflows.
    #[error("extended header record size too large")]
    RecordTooLarge,
    /// The record does not follow `"<len> <key>=<value>\n"`.
    #[error("malformed extended header metadata")]
    Malformed,
}

/// A single PAX extended header key/value pair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaxExtension<'a> {
    key: &'a [u8],
    value: &'a [u8],
}

impl<'a> PaxExtension<'a> {
    /// Returns the key as a string.
    ///
    /// # Errors
    ///
    /// Returns an error if the key is not valid UTF-8.
    pub fn key(&self) -> std::result::Result<&'a str, std::str::Utf8Error> {
        std::str::from_utf8(self.key)
    }

    /// Returns the raw key bytes.
    #[must_use]
    pub fn key_bytes(&self) -> &'a [u8] {
        self.key
    }

    /// Returns the value as a string.
    ///
    /// # Errors
    ///
    /// Returns an error if the value is not valid UTF-8.
    pub fn value(&self) -> std::result::Result<&'a str, std::str::Utf8Error> {
        std::str::from_utf8(self.value)
    }

    /// Returns the raw value bytes.
    #[must_use]
    pub fn value_bytes(&self) -> &'a [u8] {
        self.value
    }
}

/// Iterator over PAX extended header records.
///
/// Records have the form `<length> <key>=<value>\n`, where `<length>` is the
/// decimal byte length of the whole record including the length itself.
/// The input must be the exact payload: once a record is malformed, or the
/// last record does not end exactly at the end of the input, the iterator
/// yields one error and then stops.
///
/// ```
/// use tar_header::PaxExtensions;
///
/// let data = b"20 path=foo/bar.txt\n";
/// let mut iter = PaxExtensions::new(data);
/// let ext = iter.next().unwrap().unwrap();
/// assert_eq!(ext.key().unwrap(), "path");
/// assert_eq!(ext.value().unwrap(), "foo/bar.txt");
/// assert!(iter.next().is_none());
/// ```
#[derive(Debug)]
pub struct PaxExtensions<'a> {
    data: &'a [u8],
}

impl<'a> PaxExtensions<'a> {
    /// Create a new iterator over PAX extension records.
    #[must_use]
    pub fn new(data: &'a [u8]) -> Self {
        Self { data }
    }

    fn parse_record(&self) -> std::result::Result<(PaxExtension<'a>, usize), PaxError> {
        let data = self.data;

        let mut len: usize = 0;
        let mut digits = 0;
        for &b in data {
            if b == b' ' {
                break;
            }
            if !b.is_ascii_digit() {
                return Err(PaxError::Malformed);
            }
            len = len
                .checked_mul(10)
                .and_then(|v| v.checked_add(usize::from(b - b'0')))
                .ok_or(PaxError::RecordTooLarge)?;
            digits += 1;
        }

        // Need at least "<digits> =\n", and the record must fit.
        if digits == 0 || len < digits + 3 || len > data.len() {
            return Err(PaxError::Malformed);
        }
        if data[len - 1] != b'\n' {
            return Err(PaxError::Malformed);
        }

        let kv = &data[digits + 1..len - 1];
        let eq = kv
            .iter()
            .position(|&b| b == b'=')
            .ok_or(PaxError::Malformed)?;
        Ok((
            PaxExtension {
                key: &kv[..eq],
                value: &kv[eq + 1..],
            },
            len,
        ))
    }
}

impl<'a> Iterator for PaxExtensions<'a> {
    type Item = std::result::Result<PaxExtension<'a>, PaxError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.data.is_empty() {
            return None;
        }
        match self.parse_record() {
            Ok((ext, len)) => {
                self.data = &self.data[len..];
                Some(Ok(ext))
            }
            Err(e) => {
                self.data = &[];
                Some(Err(e))
            }
        }
    }
}

/// Parse a complete PAX payload into its ordered key/value pairs.
///
/// # Errors
///
/// Returns the first [`PaxError`] encountered.
pub fn parse_pax_records(data: &[u8]) -> std::result::Result<Vec<PaxExtension<'_>>, PaxError> {
    PaxExtensions::new(data).collect()
}
