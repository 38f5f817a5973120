//! Extraction tests against real directories.

use std::{
    fs,
    os::unix::fs::PermissionsExt,
    path::{Path, PathBuf},
};

use similar_asserts::assert_eq;
use tar_header::{stream::StreamError, EntryType, Header, HEADER_SIZE};
use tarx::{extract, ExtractError, ExtractOptions, ExtractStats, Extractor};
use tempfile::TempDir;

#[derive(Default)]
struct Archive {
    data: Vec<u8>,
}

impl Archive {
    fn entry(&mut self, path: &str, kind: EntryType, mode: u32, link: &str, content: &[u8]) {
        self.header(path, kind, mode, content.len() as u64, link);
        self.data.extend_from_slice(content);
        self.pad();
    }

    fn header(&mut self, path: &str, kind: EntryType, mode: u32, size: u64, link: &str) {
        let mut header = Header::new_ustar();
        header.set_path(path.as_bytes()).unwrap();
        header.set_mode(mode);
        header.set_size(size);
        header.set_entry_type(kind);
        header.set_link_name(link.as_bytes()).unwrap();
        header.set_checksum();
        self.data.extend_from_slice(header.as_bytes());
    }

    fn pad(&mut self) {
        self.data
            .resize(self.data.len().next_multiple_of(HEADER_SIZE), 0);
    }

    fn file(mut self, path: &str, mode: u32, content: &[u8]) -> Self {
        self.entry(path, EntryType::Regular, mode, "", content);
        self
    }

    fn dir(mut self, path: &str, mode: u32) -> Self {
        self.entry(path, EntryType::Directory, mode, "", b"");
        self
    }

    fn symlink(mut self, path: &str, target: &str) -> Self {
        self.entry(path, EntryType::Symlink, 0o777, target, b"");
        self
    }

    fn pax_path(mut self, path: &str) -> Self {
        let len = path.len() + " path=\n".len();
        let mut len_digits = len.to_string().len();
        while (len + len_digits).to_string().len() != len_digits {
            len_digits += 1;
        }
        let record = format!("{} path={path}\n", len + len_digits);
        self.entry("././@PaxHeader", EntryType::XHeader, 0o644, "", record.as_bytes());
        self
    }

    fn finish(mut self) -> Vec<u8> {
        self.data.extend_from_slice(&[0u8; 2 * HEADER_SIZE]);
        self.data
    }
}

fn scratch() -> (TempDir, PathBuf) {
    let tmp = tempfile::tempdir().unwrap();
    let root = tmp.path().join("root");
    (tmp, root)
}

fn mode_of(path: &Path) -> u32 {
    fs::symlink_metadata(path).unwrap().permissions().mode() & 0o7777
}

/// Sorted listing of the tree below `root`, one line per object.
fn tree(root: &Path) -> Vec<String> {
    fn walk(root: &Path, dir: &Path, out: &mut Vec<String>) {
        for entry in fs::read_dir(dir).unwrap() {
            let path = entry.unwrap().path();
            let rel = path.strip_prefix(root).unwrap().display().to_string();
            let meta = fs::symlink_metadata(&path).unwrap();
            if meta.file_type().is_symlink() {
                let target = fs::read_link(&path).unwrap();
                out.push(format!("{rel} -> {}", target.display()));
            } else if meta.is_dir() {
                out.push(format!("{rel}/"));
                walk(root, &path, out);
            } else {
                let content = fs::read(&path).unwrap();
                out.push(format!("{rel} = {}", String::from_utf8_lossy(&content)));
            }
        }
    }
    let mut out = Vec::new();
    walk(root, root, &mut out);
    out.sort();
    out
}

#[test]
fn test_basic_tree() {
    let (_tmp, root) = scratch();
    let data = Archive::default()
        .dir("etc/", 0o755)
        .file("etc/hostname", 0o644, b"box\n")
        .dir("usr/bin", 0o750)
        .file("usr/bin/tool", 0o755, &[b'x'; 700])
        .symlink("bin", "usr/bin")
        .finish();

    let stats = extract(data.as_slice(), &root).unwrap();
    assert_eq!(
        stats,
        ExtractStats {
            files: 2,
            dirs: 2,
            symlinks: 1,
            bytes: 704,
        }
    );

    assert_eq!(fs::read(root.join("etc/hostname")).unwrap(), b"box\n");
    assert_eq!(fs::read(root.join("usr/bin/tool")).unwrap().len(), 700);
    assert_eq!(fs::read_link(root.join("bin")).unwrap(), Path::new("usr/bin"));
    assert_eq!(mode_of(&root.join("usr/bin")), 0o750);
    assert_eq!(mode_of(&root.join("usr/bin/tool")), 0o755);
    assert_eq!(mode_of(&root.join("etc/hostname")), 0o644);
}

#[test]
fn test_missing_parents_are_created() {
    let (_tmp, root) = scratch();
    let data = Archive::default().file("a/b/c/file", 0o600, b"deep").finish();
    extract(data.as_slice(), &root).unwrap();
    assert_eq!(
        tree(&root),
        vec!["a/", "a/b/", "a/b/c/", "a/b/c/file = deep"]
    );
    assert_eq!(mode_of(&root.join("a/b/c/file")), 0o600);
}

#[test]
fn test_dot_is_root() {
    let (_tmp, root) = scratch();
    let data = Archive::default()
        .dir("./", 0o700)
        .file("./x", 0o644, b"1")
        .finish();
    let stats = extract(data.as_slice(), &root).unwrap();
    assert_eq!(stats.dirs, 1);
    assert_eq!(mode_of(&root), 0o700);
    assert_eq!(tree(&root), vec!["x = 1"]);
}

#[test]
fn test_dot_must_be_directory() {
    let (_tmp, root) = scratch();
    for data in [
        Archive::default().file(".", 0o644, b"").finish(),
        Archive::default().symlink(".", "x").finish(),
    ] {
        let err = extract(data.as_slice(), &root).unwrap_err();
        assert!(matches!(err, ExtractError::InvalidEntry { .. }), "{err:?}");
    }
}

#[test]
fn test_zero_first_block() {
    let (_tmp, root) = scratch();
    let stats = extract(&[0u8; 1024][..], &root).unwrap();
    assert_eq!(stats, ExtractStats::default());
    assert!(root.is_dir());
    assert!(tree(&root).is_empty());
}

#[test]
fn test_empty_input() {
    let (_tmp, root) = scratch();
    let stats = extract(std::io::empty(), &root).unwrap();
    assert_eq!(stats, ExtractStats::default());
}

#[test]
fn test_file_replaces_directory() {
    let (_tmp, root) = scratch();
    let data = Archive::default()
        .dir("thing", 0o755)
        .file("thing/inner", 0o644, b"gone")
        .file("thing", 0o644, b"now a file")
        .finish();
    extract(data.as_slice(), &root).unwrap();
    assert_eq!(tree(&root), vec!["thing = now a file"]);
}

#[test]
fn test_directory_replaces_file() {
    let (_tmp, root) = scratch();
    let data = Archive::default()
        .file("thing", 0o644, b"was a file")
        .dir("thing/", 0o755)
        .file("thing/inner", 0o644, b"here")
        .finish();
    extract(data.as_slice(), &root).unwrap();
    assert_eq!(tree(&root), vec!["thing/", "thing/inner = here"]);
}

#[test]
fn test_file_in_parent_chain_is_replaced() {
    let (_tmp, root) = scratch();
    let data = Archive::default()
        .file("a", 0o644, b"blocker")
        .file("a/b/c", 0o644, b"leaf")
        .finish();
    extract(data.as_slice(), &root).unwrap();
    assert_eq!(tree(&root), vec!["a/", "a/b/", "a/b/c = leaf"]);
}

#[test]
fn test_existing_directory_kept() {
    let (_tmp, root) = scratch();
    fs::create_dir_all(root.join("keep")).unwrap();
    fs::write(root.join("keep/old"), b"old").unwrap();

    let data = Archive::default()
        .dir("keep", 0o755)
        .file("keep/new", 0o644, b"new")
        .finish();
    extract(data.as_slice(), &root).unwrap();
    assert_eq!(tree(&root), vec!["keep/", "keep/new = new", "keep/old = old"]);
}

#[test]
fn test_last_entry_wins() {
    let (_tmp, root) = scratch();
    let data = Archive::default()
        .file("f", 0o644, b"first")
        .symlink("f", "elsewhere")
        .file("f", 0o600, b"third")
        .finish();
    extract(data.as_slice(), &root).unwrap();
    assert_eq!(tree(&root), vec!["f = third"]);
    assert_eq!(mode_of(&root.join("f")), 0o600);
}

#[test]
fn test_symlink_replaces_directory() {
    let (_tmp, root) = scratch();
    let data = Archive::default()
        .file("d/inner", 0o644, b"x")
        .symlink("d", "target")
        .finish();
    extract(data.as_slice(), &root).unwrap();
    assert_eq!(tree(&root), vec!["d -> target"]);
}

#[test]
fn test_symlinked_parent_is_not_followed() {
    let (tmp, root) = scratch();
    let outside = tmp.path().join("outside");
    fs::create_dir(&outside).unwrap();

    // Let everything through the validator; resolution must still stay
    // inside the root.
    let allow_all = |_: &[u8], _: &[u8]| Ok::<(), String>(());
    let data = Archive::default()
        .symlink("escape", outside.to_str().unwrap())
        .file("escape/pwned", 0o644, b"oops")
        .finish();
    Extractor::with_validator(&root, allow_all)
        .extract(data.as_slice())
        .unwrap();

    assert!(fs::read_dir(&outside).unwrap().next().is_none());
    assert_eq!(tree(&root), vec!["escape/", "escape/pwned = oops"]);
}

#[test]
fn test_pax_long_path() {
    let (_tmp, root) = scratch();
    let long = format!("{}/file", "d".repeat(200));
    let data = Archive::default()
        .pax_path(&long)
        .file("placeholder", 0o644, b"long")
        .finish();
    extract(data.as_slice(), &root).unwrap();
    assert_eq!(fs::read(root.join(&long)).unwrap(), b"long");
    assert!(!root.join("placeholder").exists());
}

#[test]
fn test_invalid_combinations() {
    let cases: Vec<(&str, Vec<u8>)> = vec![
        ("directory with size", {
            let mut a = Archive::default();
            a.entry("d", EntryType::Directory, 0o755, "", b"data");
            a.finish()
        }),
        ("symlink with size", {
            let mut a = Archive::default();
            a.entry("l", EntryType::Symlink, 0o777, "t", b"data");
            a.finish()
        }),
        ("regular file with link", {
            let mut a = Archive::default();
            a.entry("f", EntryType::Regular, 0o644, "t", b"");
            a.finish()
        }),
        ("regular file with trailing slash", {
            let mut a = Archive::default();
            a.entry("f/", EntryType::Regular, 0o644, "", b"");
            a.finish()
        }),
        ("hard link", {
            let mut a = Archive::default();
            a.entry("h", EntryType::Other(b'1'), 0o644, "f", b"");
            a.finish()
        }),
    ];

    for (name, data) in cases {
        let (_tmp, root) = scratch();
        let err = extract(data.as_slice(), &root).unwrap_err();
        assert!(
            matches!(err, ExtractError::InvalidEntry { .. }),
            "{name}: {err:?}"
        );
        assert!(tree(&root).is_empty(), "{name}");
    }
}

#[test]
fn test_unsafe_paths() {
    for data in [
        Archive::default().file("../evil", 0o644, b"").finish(),
        Archive::default().file("/etc/evil", 0o644, b"").finish(),
        Archive::default().file("a/../../evil", 0o644, b"").finish(),
        Archive::default().symlink("link", "/etc/passwd").finish(),
        Archive::default().symlink("a/link", "../../etc").finish(),
    ] {
        let (tmp, root) = scratch();
        let err = extract(data.as_slice(), &root).unwrap_err();
        assert!(matches!(err, ExtractError::UnsafePath { .. }), "{err:?}");
        assert!(tree(&root).is_empty());
        assert!(!tmp.path().join("evil").exists());
    }
}

#[test]
fn test_stops_at_first_error() {
    let (_tmp, root) = scratch();
    let data = Archive::default()
        .file("ok", 0o644, b"written")
        .file("../bad", 0o644, b"")
        .file("never", 0o644, b"")
        .finish();
    let err = extract(data.as_slice(), &root).unwrap_err();
    match err {
        ExtractError::UnsafePath { path, .. } => assert_eq!(path, "../bad"),
        other => panic!("unexpected error {other:?}"),
    }
    assert_eq!(tree(&root), vec!["ok = written"]);
}

#[test]
fn test_custom_validator() {
    let (_tmp, root) = scratch();
    let no_secrets = |path: &[u8], _: &[u8]| {
        if path.ends_with(b".key") {
            Err("key material".to_string())
        } else {
            Ok(())
        }
    };
    let data = Archive::default()
        .file("public.txt", 0o644, b"hi")
        .file("private.key", 0o600, b"secret")
        .finish();
    let err = Extractor::with_validator(&root, no_secrets)
        .extract(data.as_slice())
        .unwrap_err();
    match err {
        ExtractError::UnsafePath { path, reason, .. } => {
            assert_eq!(path, "private.key");
            assert_eq!(reason, "key material");
        }
        other => panic!("unexpected error {other:?}"),
    }
}

#[test]
fn test_truncated_payload() {
    let (_tmp, root) = scratch();
    let mut a = Archive::default();
    a.header("big", EntryType::Regular, 0o644, 4096, "");
    a.data.extend_from_slice(&[1u8; 1000]);

    let err = extract(a.data.as_slice(), &root).unwrap_err();
    assert!(
        matches!(err, ExtractError::Stream(StreamError::UnexpectedEof { .. })),
        "{err:?}"
    );
}

#[test]
fn test_corrupt_header() {
    let (_tmp, root) = scratch();
    let mut data = Archive::default().file("f", 0o644, b"x").finish();
    data[100] = b'9';
    let err = extract(data.as_slice(), &root).unwrap_err();
    assert!(matches!(err, ExtractError::Stream(StreamError::Header(_))), "{err:?}");
}

#[test]
fn test_without_permissions() {
    let (_tmp, root) = scratch();
    let data = Archive::default()
        .file("script", 0o755, b"#!/bin/sh\n")
        .finish();
    let options = ExtractOptions {
        preserve_permissions: false,
        ..Default::default()
    };
    Extractor::new(&root)
        .with_options(options)
        .extract(data.as_slice())
        .unwrap();
    // Created files never get execute bits on their own.
    assert_eq!(mode_of(&root.join("script")) & 0o111, 0);
}

#[test]
fn test_strict_limits() {
    let (_tmp, root) = scratch();
    let long = "p/".repeat(600) + "f";
    let data = Archive::default()
        .pax_path(&long)
        .file("f", 0o644, b"")
        .finish();
    let options = ExtractOptions {
        limits: tarx::Limits::strict(),
        ..Default::default()
    };
    let err = Extractor::new(&root)
        .with_options(options)
        .extract(data.as_slice())
        .unwrap_err();
    assert!(
        matches!(err, ExtractError::Stream(StreamError::PathTooLong { .. })),
        "{err:?}"
    );
}
