//! Configurable resource limits for tar stream parsing.

/// Configurable resource limits for tar stream parsing.
///
/// These protect against archives crafted to exhaust memory through huge
/// PAX payloads or endless runs of extension headers.
///
/// # Example
///
/// ```
/// use tar_header::stream::Limits;
///
/// let limits = Limits {
///     max_path_len: 1024,
///     ..Default::default()
/// };
/// assert_eq!(limits.max_pax_size, Limits::default().max_pax_size);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Limits {
    /// Maximum length in bytes of entry paths and link targets.
    ///
    /// Default: unlimited. PAX paths may be any length, and are already
    /// bounded by `max_pax_size`.
    pub max_path_len: usize,

    /// Maximum payload size of a single PAX extension header.
    ///
    /// The payload is held in memory while it is parsed, so this bounds the
    /// scratch buffer.
    ///
    /// Default: 1 MiB.
    pub max_pax_size: u64,

    /// Maximum number of consecutive extension headers before an entry.
    ///
    /// Default: 16.
    pub max_pending_entries: usize,
}

impl Default for Limits {
    fn default() -> Self {
        Self {
            max_path_len: usize::MAX,
            max_pax_size: 1024 * 1024,
            max_pending_entries: 16,
        }
    }
}

impl Limits {
    /// Conservative limits for untrusted archives.
    #[must_use]
    pub fn strict() -> Self {
        Self {
            max_path_len: 1024,
            max_pax_size: 64 * 1024,
            max_pending_entries: 4,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_limits() {
        let limits = Limits::default();
        assert_eq!(limits.max_path_len, usize::MAX);
        assert_eq!(limits.max_pax_size, 1024 * 1024);
        assert_eq!(limits.max_pending_entries, 16);
    }

    #[test]
    fn test_presets_are_ordered() {
        let (strict, default) = (Limits::strict(), Limits::default());
        assert!(strict.max_path_len < default.max_path_len);
        assert!(strict.max_pax_size < default.max_pax_size);
        assert!(strict.max_pending_entries < default.max_pending_entries);
    }
}
