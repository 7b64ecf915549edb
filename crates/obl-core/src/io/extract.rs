//! Zip extraction with a path-traversal guard.
//!
//! Entries whose stored name would land outside the destination (absolute
//! paths, drive prefixes, `..` that climbs past the root) are skipped and
//! reported; the rest of the archive still extracts.

use std::fs::{self, File};
use std::io::{self, BufWriter, Write};
use std::path::{Component, Path, PathBuf};

use thiserror::Error;
use tracing::{debug, warn};
use zip::ZipArchive;
use zip::result::ZipError;

/// Failure that stops extraction of one archive.
#[derive(Error, Debug)]
pub enum ExtractError {
    /// Filesystem operation failed.
    #[error("IO error at {}: {source}", path.display())]
    Io {
        /// Path being created or written.
        path: PathBuf,
        /// Underlying error.
        #[source]
        source: io::Error,
    },

    /// The zip container or an entry is corrupt.
    #[error("Archive error: {0}")]
    Archive(#[from] ZipError),
}

impl ExtractError {
    fn io(path: &Path, source: io::Error) -> Self {
        Self::Io {
            path: path.to_path_buf(),
            source,
        }
    }
}

/// What one extraction run wrote.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExtractSummary {
    /// Regular files written.
    pub files: usize,
    /// Directory entries created.
    pub dirs: usize,
    /// Stored names rejected by the traversal guard.
    pub skipped: Vec<String>,
}

/// Resolve a stored entry name under `dest_dir`.
///
/// Returns `None` unless the result is strictly inside `dest_dir`. The check
/// is lexical: `a/../b` is accepted; `../b`, absolute paths, drive prefixes
/// and a name that collapses to the root itself are not.
pub fn entry_destination(dest_dir: &Path, stored_name: &str) -> Option<PathBuf> {
    if stored_name.contains('\0') {
        return None;
    }

    let mut parts: Vec<&std::ffi::OsStr> = Vec::new();
    for component in Path::new(stored_name).components() {
        match component {
            Component::CurDir => {}
            Component::Normal(part) => parts.push(part),
            Component::ParentDir => {
                parts.pop()?;
            }
            Component::RootDir | Component::Prefix(_) => return None,
        }
    }

    if parts.is_empty() {
        return None;
    }

    let relative: PathBuf = parts.iter().collect();
    Some(dest_dir.join(relative))
}

/// Extract every safe entry of the zip at `archive_path` into `dest_dir`.
///
/// Directory entries are created with their stored permission bits. File
/// entries get their parent directories, are stream-copied, and are synced
/// before the handle is dropped so deferred write errors surface here.
/// `on_entry(done, total)` is called after each entry.
///
/// # Errors
///
/// Returns [`ExtractError`] on the first IO or archive error; entries written
/// before the error stay on disk.
pub fn extract_zip(
    archive_path: &Path,
    dest_dir: &Path,
    mut on_entry: impl FnMut(u64, u64),
) -> Result<ExtractSummary, ExtractError> {
    let file = File::open(archive_path).map_err(|e| ExtractError::io(archive_path, e))?;
    let mut archive = ZipArchive::new(file)?;

    fs::create_dir_all(dest_dir).map_err(|e| ExtractError::io(dest_dir, e))?;

    let total = archive.len() as u64;
    let mut summary = ExtractSummary::default();

    for i in 0..archive.len() {
        let mut entry = archive.by_index(i)?;
        let stored_name = entry.name().to_string();

        let Some(target) = entry_destination(dest_dir, &stored_name) else {
            warn!(
                archive = %archive_path.display(),
                entry = %stored_name,
                "illegal path in archive, skipped"
            );
            summary.skipped.push(stored_name);
            on_entry(i as u64 + 1, total);
            continue;
        };

        if entry.is_dir() {
            fs::create_dir_all(&target).map_err(|e| ExtractError::io(&target, e))?;
            apply_mode(&target, entry.unix_mode())?;
            summary.dirs += 1;
        } else {
            if let Some(parent) = target.parent() {
                fs::create_dir_all(parent).map_err(|e| ExtractError::io(parent, e))?;
            }

            let outfile = File::create(&target).map_err(|e| ExtractError::io(&target, e))?;
            let mut writer = BufWriter::new(outfile);
            io::copy(&mut entry, &mut writer).map_err(|e| ExtractError::io(&target, e))?;
            writer.flush().map_err(|e| ExtractError::io(&target, e))?;
            let outfile = writer
                .into_inner()
                .map_err(|e| ExtractError::io(&target, e.into_error()))?;
            outfile
                .sync_all()
                .map_err(|e| ExtractError::io(&target, e))?;
            drop(outfile);

            apply_mode(&target, entry.unix_mode())?;
            summary.files += 1;
        }

        on_entry(i as u64 + 1, total);
    }

    debug!(
        archive = %archive_path.display(),
        dest = %dest_dir.display(),
        files = summary.files,
        dirs = summary.dirs,
        skipped = summary.skipped.len(),
        "extraction complete"
    );

    Ok(summary)
}

#[cfg(unix)]
fn apply_mode(path: &Path, mode: Option<u32>) -> Result<(), ExtractError> {
    use std::os::unix::fs::PermissionsExt;

    if let Some(mode) = mode {
        fs::set_permissions(path, fs::Permissions::from_mode(mode & 0o7777))
            .map_err(|e| ExtractError::io(path, e))?;
    }
    Ok(())
}

#[cfg(not(unix))]
#[allow(clippy::unnecessary_wraps)]
fn apply_mode(_path: &Path, _mode: Option<u32>) -> Result<(), ExtractError> {
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;
    use zip::write::SimpleFileOptions;

    fn build_zip(path: &Path, entries: &[(&str, Option<&str>)]) {
        let file = File::create(path).unwrap();
        let mut zip = zip::ZipWriter::new(file);
        let options = SimpleFileOptions::default();
        for (name, body) in entries {
            match body {
                Some(body) => {
                    zip.start_file(*name, options).unwrap();
                    zip.write_all(body.as_bytes()).unwrap();
                }
                None => zip.add_directory(*name, options).unwrap(),
            }
        }
        zip.finish().unwrap();
    }

    #[test]
    fn test_entry_destination_accepts_nested() {
        let dest = Path::new("/install/root");
        assert_eq!(
            entry_destination(dest, "content/sounds/ouch.ogg"),
            Some(PathBuf::from("/install/root/content/sounds/ouch.ogg"))
        );
        assert_eq!(
            entry_destination(dest, "./a/../b.txt"),
            Some(PathBuf::from("/install/root/b.txt"))
        );
    }

    #[test]
    fn test_entry_destination_rejects_escapes() {
        let dest = Path::new("/install/root");
        assert_eq!(entry_destination(dest, "../../evil.txt"), None);
        assert_eq!(entry_destination(dest, "a/../../evil.txt"), None);
        assert_eq!(entry_destination(dest, "/etc/passwd"), None);
        assert_eq!(entry_destination(dest, "a/.."), None);
        assert_eq!(entry_destination(dest, ""), None);
        assert_eq!(entry_destination(dest, "bad\0name"), None);
    }

    #[test]
    fn test_extract_files_and_dirs() {
        let temp = TempDir::new().unwrap();
        let archive = temp.path().join("content-sounds.zip");
        build_zip(
            &archive,
            &[
                ("sfx/", None),
                ("sfx/ouch.ogg", Some("ouch")),
                ("music/theme.ogg", Some("la la")),
            ],
        );

        let dest = temp.path().join("out");
        let mut calls = Vec::new();
        let summary = extract_zip(&archive, &dest, |done, total| calls.push((done, total))).unwrap();

        assert_eq!(summary.files, 2);
        assert_eq!(summary.dirs, 1);
        assert!(summary.skipped.is_empty());
        assert_eq!(fs::read(dest.join("sfx/ouch.ogg")).unwrap(), b"ouch");
        assert_eq!(fs::read(dest.join("music/theme.ogg")).unwrap(), b"la la");
        assert_eq!(calls, vec![(1, 3), (2, 3), (3, 3)]);
    }

    #[test]
    fn test_zip_slip_entry_skipped_siblings_extracted() {
        let temp = TempDir::new().unwrap();
        let archive = temp.path().join("evil.zip");
        build_zip(
            &archive,
            &[
                ("good-before.txt", Some("1")),
                ("../../evil.txt", Some("pwned")),
                ("nested/good-after.txt", Some("2")),
            ],
        );

        let dest = temp.path().join("a").join("b").join("out");
        let summary = extract_zip(&archive, &dest, |_, _| {}).unwrap();

        assert_eq!(summary.files, 2);
        assert_eq!(summary.skipped, vec!["../../evil.txt".to_string()]);
        assert!(dest.join("good-before.txt").exists());
        assert!(dest.join("nested/good-after.txt").exists());
        assert!(!temp.path().join("a").join("evil.txt").exists());
        assert!(!temp.path().join("evil.txt").exists());
    }

    #[test]
    fn test_corrupt_archive_is_error() {
        let temp = TempDir::new().unwrap();
        let archive = temp.path().join("broken.zip");
        fs::write(&archive, b"this is not a zip").unwrap();

        let err = extract_zip(&archive, &temp.path().join("out"), |_, _| {}).unwrap_err();
        assert!(matches!(err, ExtractError::Archive(_)));
    }

    #[cfg(unix)]
    #[test]
    fn test_stored_permissions_applied() {
        use std::os::unix::fs::PermissionsExt;

        let temp = TempDir::new().unwrap();
        let archive = temp.path().join("bin.zip");
        {
            let file = File::create(&archive).unwrap();
            let mut zip = zip::ZipWriter::new(file);
            let exec = SimpleFileOptions::default().unix_permissions(0o755);
            zip.start_file("tool.sh", exec).unwrap();
            zip.write_all(b"#!/bin/sh\n").unwrap();
            zip.finish().unwrap();
        }

        let dest = temp.path().join("out");
        extract_zip(&archive, &dest, |_, _| {}).unwrap();

        let mode = fs::metadata(dest.join("tool.sh")).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o755);
    }
}
