//! Deciding whether an entry may be written below the extraction root.
//!
//! The extractor consults a [`PathValidator`] with the raw path and link
//! target of every entry before touching the filesystem. [`SafePaths`] is
//! the default; any `Fn(&[u8], &[u8]) -> Result<(), String>` closure works
//! as well.

/// Decides whether an entry is safe to extract.
pub trait PathValidator {
    /// Accept or reject an entry. `link` is empty for non-symlinks.
    ///
    /// # Errors
    ///
    /// A human-readable reason for the rejection.
    fn validate(&self, path: &[u8], link: &[u8]) -> Result<(), String>;
}

impl<F> PathValidator for F
where
    F: Fn(&[u8], &[u8]) -> Result<(), String>,
{
    fn validate(&self, path: &[u8], link: &[u8]) -> Result<(), String> {
        self(path, link)
    }
}

/// Rejects anything that could place or point outside the extraction root.
///
/// Refused:
/// - empty paths and paths containing NUL bytes
/// - absolute paths, and paths with a `..` component
/// - absolute link targets
/// - relative link targets that climb above the root, counted from the
///   directory containing the link
///
/// ```
/// use tarx::sanitize::{PathValidator, SafePaths};
///
/// assert!(SafePaths.validate(b"a/b/link", b"../c").is_ok());
/// assert!(SafePaths.validate(b"a/link", b"../../etc").is_err());
/// assert!(SafePaths.validate(b"/etc/passwd", b"").is_err());
/// ```
#[derive(Debug, Default, Clone, Copy)]
pub struct SafePaths;

impl PathValidator for SafePaths {
    fn validate(&self, path: &[u8], link: &[u8]) -> Result<(), String> {
        if path.is_empty() {
            return Err("empty path".into());
        }
        if path.contains(&0) || link.contains(&0) {
            return Err("embedded NUL byte".into());
        }
        if path.starts_with(b"/") {
            return Err("absolute path".into());
        }
        if components(path).any(|c| c == b"..") {
            return Err("path contains a '..' component".into());
        }

        if link.is_empty() {
            return Ok(());
        }
        if link.starts_with(b"/") {
            return Err("absolute link target".into());
        }

        // Depth of the directory holding the link, then walk the target.
        let mut depth = components(path).count().saturating_sub(1);
        for component in components(link) {
            if component == b".." {
                depth = depth
                    .checked_sub(1)
                    .ok_or_else(|| "link target escapes the extraction root".to_string())?;
            } else {
                depth += 1;
            }
        }
        Ok(())
    }
}

/// Non-empty components other than `.`.
fn components(path: &[u8]) -> impl Iterator<Item = &[u8]> {
    path.split(|&b| b == b'/')
        .filter(|c| !c.is_empty() && *c != b".")
}
