//! Resolved tar entry with extensions applied.

use std::borrow::Cow;

use crate::EntryType;

/// Kind of a resolved entry.
///
/// Unlike [`EntryType`], this cannot name a PAX extension header: those are
/// consumed by the parser and never reach callers.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum EntryKind {
    /// Regular file (type '0').
    Regular,
    /// Symbolic link (type '2').
    Symlink,
    /// Directory (type '5').
    Directory,
    /// Any other type flag; not extractable.
    Other(u8),
}

impl EntryKind {
    /// The type flag byte this kind was decoded from.
    #[must_use]
    pub fn to_byte(self) -> u8 {
        match self {
            EntryKind::Regular => b'0',
            EntryKind::Symlink => b'2',
            EntryKind::Directory => b'5',
            EntryKind::Other(b) => b,
        }
    }
}

impl TryFrom<EntryType> for EntryKind {
    type Error = EntryType;

    /// Fails with the original type for extension headers.
    fn try_from(entry_type: EntryType) -> Result<Self, Self::Error> {
        if entry_type.is_extension() {
            return Err(entry_type);
        }
        Ok(match entry_type {
            EntryType::Regular => EntryKind::Regular,
            EntryType::Symlink => EntryKind::Symlink,
            EntryType::Directory => EntryKind::Directory,
            other => EntryKind::Other(other.to_byte()),
        })
    }
}

/// A tar entry with all pending PAX overrides applied.
///
/// The content bytes (if any) follow in the stream and have not been read
/// yet when the entry is returned.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entry {
    /// Entry path. PAX `path` overrides the header's `prefix/name`.
    pub path: Vec<u8>,

    /// Link target. PAX `linkpath` overrides the header's `linkname`.
    /// Empty when the header has none.
    pub link: Vec<u8>,

    /// Permission bits (the low 12 bits of the mode field).
    pub mode: u32,

    /// Content size in bytes. PAX `size` overrides the header.
    pub size: u64,

    /// Entry kind.
    pub kind: EntryKind,
}

impl Entry {
    /// Get the path as a lossy UTF-8 string.
    #[must_use]
    pub fn path_lossy(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.path)
    }

    /// Get the link target as a lossy UTF-8 string.
    #[must_use]
    pub fn link_lossy(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.link)
    }

    /// Check if this is a directory entry.
    #[must_use]
    pub fn is_dir(&self) -> bool {
        self.kind == EntryKind::Directory
    }

    /// Check if this is a symbolic link entry.
    #[must_use]
    pub fn is_symlink(&self) -> bool {
        self.kind == EntryKind::Symlink
    }
}
