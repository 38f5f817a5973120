//! tarx - extract and list ustar/PAX archives.

use std::{
    fs::File,
    io::{self, BufReader, BufWriter, Read, Write},
    path::{Path, PathBuf},
};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};

use tar_header::stream::{EntryKind, Limits, TarStreamParser};
use tarx::{ExtractOptions, Extractor};

/// Extract and list ustar/PAX archives.
#[derive(Parser, Debug)]
#[command(name = "tarx", version, about)]
struct Cli {
    /// Use conservative resource limits for untrusted archives.
    #[arg(long, global = true)]
    strict: bool,

    /// The subcommand to run.
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Extract an archive into a directory.
    Extract {
        /// Archive to read, or `-` for stdin.
        archive: PathBuf,
        /// Destination directory, created if missing.
        #[arg(short = 'C', long, default_value = ".")]
        directory: PathBuf,
        /// Do not apply the permission bits stored in the archive.
        #[arg(long)]
        no_same_permissions: bool,
    },
    /// List the entries of an archive.
    List {
        /// Archive to read, or `-` for stdin.
        archive: PathBuf,
    },
}

fn open_archive(path: &Path) -> Result<Box<dyn Read>> {
    if path == Path::new("-") {
        return Ok(Box::new(io::stdin().lock()));
    }
    let file = File::open(path).with_context(|| format!("opening {}", path.display()))?;
    Ok(Box::new(BufReader::new(file)))
}

fn kind_char(kind: EntryKind) -> char {
    match kind {
        EntryKind::Regular => '-',
        EntryKind::Directory => 'd',
        EntryKind::Symlink => 'l',
        EntryKind::Other(_) => '?',
    }
}

fn cmd_list(archive: &Path, limits: Limits) -> Result<()> {
    let mut parser = TarStreamParser::new(open_archive(archive)?, limits);
    let mut out = BufWriter::new(io::stdout().lock());

    while let Some(entry) = parser
        .next_entry()
        .with_context(|| format!("reading {}", archive.display()))?
    {
        write!(
            out,
            "{}{:04o} {:>12} {}",
            kind_char(entry.kind),
            entry.mode,
            entry.size,
            entry.path_lossy()
        )?;
        if entry.is_symlink() {
            write!(out, " -> {}", entry.link_lossy())?;
        }
        writeln!(out)?;
        parser.skip_content(entry.size)?;
    }
    out.flush()?;
    Ok(())
}

fn cmd_extract(
    archive: &Path,
    directory: &Path,
    limits: Limits,
    preserve_permissions: bool,
) -> Result<()> {
    let options = ExtractOptions {
        limits,
        preserve_permissions,
    };
    let stats = Extractor::new(directory)
        .with_options(options)
        .extract(open_archive(archive)?)
        .with_context(|| {
            format!(
                "extracting {} into {}",
                archive.display(),
                directory.display()
            )
        })?;
    log::info!(
        "{} files ({} bytes), {} directories, {} symlinks",
        stats.files,
        stats.bytes,
        stats.dirs,
        stats.symlinks
    );
    Ok(())
}

fn main() -> Result<()> {
    env_logger::init();

    let cli = Cli::parse();
    let limits = if cli.strict {
        Limits::strict()
    } else {
        Limits::default()
    };

    match cli.command {
        Command::Extract {
            ref archive,
            ref directory,
            no_same_permissions,
        } => cmd_extract(archive, directory, limits, !no_same_permissions),
        Command::List { ref archive } => cmd_list(archive, limits),
    }
}
