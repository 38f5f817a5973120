use std::{io::Result, os::fd::AsFd, path::Path};

use log::warn;
use rustix::{
    fs::{chmodat, fchmod, AtFlags, Mode, CWD},
    io::Errno,
};

/// Set the permission bits of an open file.
pub(crate) fn set_file_mode(fd: impl AsFd, mode: u32) -> Result<()> {
    fchmod(fd, Mode::from_raw_mode(mode & 0o7777))?;
    Ok(())
}

/// Set the permission bits of the object at `path`, following symlinks.
pub(crate) fn set_mode(path: &Path, mode: u32) -> Result<()> {
    chmodat(CWD, path, Mode::from_raw_mode(mode & 0o7777), AtFlags::empty())?;
    Ok(())
}

/// Set the permission bits of a symlink itself.
///
/// Linux has no link permissions, and most filesystems refuse the call. That
/// refusal is not an error.
pub(crate) fn set_link_mode(path: &Path, mode: u32) -> Result<()> {
    match chmodat(
        CWD,
        path,
        Mode::from_raw_mode(mode & 0o7777),
        AtFlags::SYMLINK_NOFOLLOW,
    ) {
        Ok(()) => Ok(()),
        Err(Errno::OPNOTSUPP | Errno::NOSYS) => {
            warn!("{}: symlink permissions not supported", path.display());
            Ok(())
        }
        Err(e) => Err(e.into()),
    }
}
