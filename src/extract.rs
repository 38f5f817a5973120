//! Materializing archive entries below a root directory.
//!
//! Each entry goes through the same steps before anything is written:
//! semantic validation of its header fields, the [`PathValidator`], and
//! resolution of its path to a location under the root. Pre-existing objects
//! that conflict with an entry are replaced, so the final tree reflects the
//! last entry written at every path.

use std::{
    ffi::OsStr,
    fs::{self, File},
    io::{self, Read},
    os::unix::ffi::OsStrExt,
    path::{Path, PathBuf},
};

use log::{debug, trace};
use tar_header::stream::{Entry, EntryKind, Limits, TarStreamParser};

use crate::{
    error::{ExtractError, Result},
    sanitize::{PathValidator, SafePaths},
    util::{set_file_mode, set_link_mode, set_mode},
};

/// Options controlling extraction.
#[derive(Debug, Clone)]
pub struct ExtractOptions {
    /// Resource bounds for the archive reader.
    pub limits: Limits,
    /// Apply the mode bits stored in the archive. When false, objects keep
    /// the permissions they were created with (subject to the umask).
    pub preserve_permissions: bool,
}

impl Default for ExtractOptions {
    fn default() -> Self {
        Self {
            limits: Limits::default(),
            preserve_permissions: true,
        }
    }
}

/// Counts of what an extraction wrote.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ExtractStats {
    /// Regular files created.
    pub files: u64,
    /// Directory entries processed, including ones that already existed.
    pub dirs: u64,
    /// Symlinks created.
    pub symlinks: u64,
    /// Regular file content bytes written.
    pub bytes: u64,
}

/// Extracts an archive stream into a directory.
///
/// ```no_run
/// use tarx::extract::{ExtractOptions, Extractor};
///
/// let archive = std::fs::File::open("layer.tar").unwrap();
/// let stats = Extractor::new("/tmp/out")
///     .with_options(ExtractOptions {
///         preserve_permissions: false,
///         ..Default::default()
///     })
///     .extract(archive)
///     .unwrap();
/// println!("{} files", stats.files);
/// ```
#[derive(Debug)]
pub struct Extractor<V = SafePaths> {
    root: PathBuf,
    validator: V,
    options: ExtractOptions,
}

impl Extractor<SafePaths> {
    /// Create an extractor for `root` using [`SafePaths`].
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self::with_validator(root, SafePaths)
    }
}

impl<V: PathValidator> Extractor<V> {
    /// Create an extractor for `root` with a custom path validator.
    pub fn with_validator(root: impl Into<PathBuf>, validator: V) -> Self {
        Self {
            root: root.into(),
            validator,
            options: ExtractOptions::default(),
        }
    }

    /// Replace the extraction options.
    #[must_use]
    pub fn with_options(mut self, options: ExtractOptions) -> Self {
        self.options = options;
        self
    }

    /// Extract every entry of `reader` below the root, creating the root if
    /// necessary.
    ///
    /// Extraction stops at the first error. Entries completed before it
    /// remain on disk.
    ///
    /// # Errors
    ///
    /// See [`ExtractError`].
    pub fn extract(&self, reader: impl Read) -> Result<ExtractStats> {
        fs::create_dir_all(&self.root).map_err(ExtractError::io(&self.root))?;

        let mut parser = TarStreamParser::new(reader, self.options.limits.clone());
        let mut stats = ExtractStats::default();
        while let Some(entry) = parser.next_entry()? {
            self.extract_entry(&mut parser, &entry, &mut stats)?;
        }

        debug!(
            "extracted {} files, {} directories, {} symlinks ({} bytes) into {}",
            stats.files,
            stats.dirs,
            stats.symlinks,
            stats.bytes,
            self.root.display()
        );
        Ok(stats)
    }

    fn extract_entry<R: Read>(
        &self,
        parser: &mut TarStreamParser<R>,
        entry: &Entry,
        stats: &mut ExtractStats,
    ) -> Result<()> {
        check_entry(entry)?;
        self.validator
            .validate(&entry.path, &entry.link)
            .map_err(|reason| ExtractError::UnsafePath {
                path: entry.path_lossy().into_owned(),
                link: entry.link_lossy().into_owned(),
                reason,
            })?;

        let components = resolve(entry)?;
        let target = components
            .iter()
            .fold(self.root.clone(), |path, c| path.join(c));
        debug!("{:?} -> {}", entry.path_lossy(), target.display());

        match entry.kind {
            EntryKind::Directory => {
                self.ensure_dirs(&components)?;
                if self.options.preserve_permissions {
                    set_mode(&target, entry.mode).map_err(ExtractError::io(&target))?;
                }
                stats.dirs += 1;
            }
            EntryKind::Regular => {
                self.prepare_target(&components, &target)?;
                let mut file = File::options()
                    .write(true)
                    .create_new(true)
                    .open(&target)
                    .map_err(ExtractError::io(&target))?;
                parser.copy_content(entry.size, &mut file)?;
                if self.options.preserve_permissions {
                    set_file_mode(&file, entry.mode).map_err(ExtractError::io(&target))?;
                }
                stats.files += 1;
                stats.bytes += entry.size;
            }
            EntryKind::Symlink => {
                self.prepare_target(&components, &target)?;
                let link = OsStr::from_bytes(&entry.link);
                std::os::unix::fs::symlink(link, &target).map_err(ExtractError::io(&target))?;
                if self.options.preserve_permissions {
                    set_link_mode(&target, entry.mode).map_err(ExtractError::io(&target))?;
                }
                stats.symlinks += 1;
            }
            EntryKind::Other(byte) => return Err(unsupported(entry, byte)),
        }
        Ok(())
    }

    /// Make every component a directory, replacing whatever non-directory
    /// is in the way. Existing directories are kept along with their
    /// contents.
    fn ensure_dirs(&self, components: &[&OsStr]) -> Result<()> {
        let mut path = self.root.clone();
        for component in components {
            path.push(component);
            match fs::symlink_metadata(&path) {
                Ok(meta) if meta.is_dir() => continue,
                Ok(_) => {
                    trace!("replacing non-directory {} with a directory", path.display());
                    fs::remove_file(&path).map_err(ExtractError::io(&path))?;
                }
                Err(e) if e.kind() == io::ErrorKind::NotFound => {}
                Err(e) => return Err(ExtractError::io(&path)(e)),
            }
            fs::create_dir(&path).map_err(ExtractError::io(&path))?;
        }
        Ok(())
    }

    /// Ensure the parent chain of a non-directory exists and nothing
    /// occupies the target itself.
    fn prepare_target(&self, components: &[&OsStr], target: &Path) -> Result<()> {
        if let Some((_, parents)) = components.split_last() {
            self.ensure_dirs(parents)?;
        }
        match fs::symlink_metadata(target) {
            Ok(meta) if meta.is_dir() => {
                trace!("removing directory {} in the way", target.display());
                fs::remove_dir_all(target).map_err(ExtractError::io(target))
            }
            Ok(_) => {
                trace!("removing {} in the way", target.display());
                fs::remove_file(target).map_err(ExtractError::io(target))
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(ExtractError::io(target)(e)),
        }
    }
}

/// Extract `reader` into `dest` with default options and [`SafePaths`].
///
/// # Errors
///
/// See [`ExtractError`].
pub fn extract(reader: impl Read, dest: impl AsRef<Path>) -> Result<ExtractStats> {
    Extractor::new(dest.as_ref()).extract(reader)
}

/// Reject header field combinations that cannot be extracted.
fn check_entry(entry: &Entry) -> Result<()> {
    let invalid = |reason: String| {
        Err(ExtractError::InvalidEntry {
            path: entry.path_lossy().into_owned(),
            reason,
        })
    };

    if let EntryKind::Other(byte) = entry.kind {
        return Err(unsupported(entry, byte));
    }
    if entry.path == b"." && !entry.is_dir() {
        return invalid(format!("'.' must be a directory, not {:?}", entry.kind));
    }
    if !entry.is_symlink() && !entry.link.is_empty() {
        return invalid(format!(
            "{:?} entry has link target {:?}",
            entry.kind,
            entry.link_lossy()
        ));
    }
    if (entry.is_symlink() || entry.is_dir()) && entry.size != 0 {
        return invalid(format!("{:?} entry has size {}", entry.kind, entry.size));
    }
    if !entry.is_dir() && entry.path.ends_with(b"/") {
        return invalid(format!("{:?} entry path ends with '/'", entry.kind));
    }
    Ok(())
}

fn unsupported(entry: &Entry, byte: u8) -> ExtractError {
    ExtractError::InvalidEntry {
        path: entry.path_lossy().into_owned(),
        reason: format!("unsupported entry type {:?}", char::from(byte)),
    }
}

/// Split an entry path into the components to push onto the root. Empty
/// and `.` segments are dropped, so `"."` and `"./"` resolve to the root.
fn resolve(entry: &Entry) -> Result<Vec<&OsStr>> {
    let path = entry.path.strip_suffix(b"/").unwrap_or(&entry.path);
    let components: Vec<&OsStr> = path
        .split(|&b| b == b'/')
        .filter(|c| !c.is_empty() && *c != b".")
        .map(OsStr::from_bytes)
        .collect();

    if components.iter().any(|c| c.as_bytes() == b"..") {
        return Err(ExtractError::UnsafePath {
            path: entry.path_lossy().into_owned(),
            link: entry.link_lossy().into_owned(),
            reason: "'..' component".into(),
        });
    }
    if components.is_empty() && !entry.is_dir() {
        return Err(ExtractError::InvalidEntry {
            path: entry.path_lossy().into_owned(),
            reason: format!("{:?} entry resolves to the extraction root", entry.kind),
        });
    }
    Ok(components)
}
