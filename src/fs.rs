//! Filesystem collaborator: the only place mdref touches the disk.
//!
//! Every path crossing this boundary is root-relative and normalized
//! (see `paths::normalize`). `""` names the root itself.

use std::path::{Path, PathBuf};

use walkdir::WalkDir;

use crate::error::Error;

/// UTF-8 byte order mark, stripped before decoding.
const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";

/// One entry of a single-level directory listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirEntry {
    /// `true` if the entry is a directory.
    pub is_directory: bool,
    /// Bare file or directory name.
    pub name: String,
}

/// Minimal filesystem contract consumed by the index, the ignore matcher,
/// and the checker.
pub trait FileSystem {
    /// Whether a regular file exists at `relative_path`.
    fn file_exists(&self, relative_path: &str) -> bool;

    /// Whether a directory exists at `relative_path`.
    fn is_directory(&self, relative_path: &str) -> bool;

    /// List one directory level, sorted by name.
    ///
    /// # Errors
    ///
    /// Returns `Error::ReadFailed` if the directory cannot be listed.
    fn list_files(&self, relative_dir: &str) -> Result<Vec<DirEntry>, Error>;

    /// Read a whole file as text.
    ///
    /// # Errors
    ///
    /// Returns `Error::ReadFailed` if the file cannot be opened or decoded.
    fn read_file(&self, relative_path: &str) -> Result<String, Error>;
}

/// `FileSystem` backed by a real directory.
#[derive(Debug, Clone)]
pub struct DiskFileSystem {
    /// Absolute or caller-relative root directory.
    root: PathBuf,
}

impl DiskFileSystem {
    /// Map a root-relative path onto the disk.
    fn absolute(&self, relative_path: &str) -> PathBuf {
        if relative_path.is_empty() {
            return self.root.clone();
        }
        return self.root.join(relative_path);
    }

    /// Open a root directory, refusing anything that is not an existing directory.
    ///
    /// # Errors
    ///
    /// Returns `Error::RootNotFound` or `Error::RootNotDirectory`.
    pub fn open(root: &Path) -> Result<Self, Error> {
        if !root.exists() {
            return Err(Error::RootNotFound { path: root.to_path_buf() });
        }
        if !root.is_dir() {
            return Err(Error::RootNotDirectory { path: root.to_path_buf() });
        }
        return Ok(Self { root: root.to_path_buf() });
    }

    /// The directory this filesystem is rooted at.
    pub fn root(&self) -> &Path {
        return &self.root;
    }
}

impl FileSystem for DiskFileSystem {
    fn file_exists(&self, relative_path: &str) -> bool {
        return self.absolute(relative_path).is_file();
    }

    fn is_directory(&self, relative_path: &str) -> bool {
        return self.absolute(relative_path).is_dir();
    }

    fn list_files(&self, relative_dir: &str) -> Result<Vec<DirEntry>, Error> {
        let dir = self.absolute(relative_dir);
        let mut entries = Vec::new();

        for entry in WalkDir::new(&dir).min_depth(1).max_depth(1).sort_by_file_name() {
            let entry = entry.map_err(|e| {
                return Error::ReadFailed {
                    path: relative_dir.to_string(),
                    reason: e.to_string(),
                };
            })?;
            let Some(name) = entry.file_name().to_str() else {
                tracing::debug!(dir = relative_dir, "skipping non-UTF-8 file name");
                continue;
            };
            // Symlinked directories are not followed, so they must not be
            // listed as files either.
            if entry.path_is_symlink() && entry.path().is_dir() {
                tracing::debug!(dir = relative_dir, name, "skipping symlinked directory");
                continue;
            }
            entries.push(DirEntry {
                is_directory: entry.file_type().is_dir(),
                name: name.to_string(),
            });
        }

        return Ok(entries);
    }

    fn read_file(&self, relative_path: &str) -> Result<String, Error> {
        let bytes = std::fs::read(self.absolute(relative_path)).map_err(|e| {
            return Error::ReadFailed {
                path: relative_path.to_string(),
                reason: e.to_string(),
            };
        })?;
        return Ok(decode_text(relative_path, bytes));
    }
}

/// Decode file bytes as UTF-8, falling back once to ISO-8859-1.
/// The fallback maps every byte to a char, so decoding itself never fails.
fn decode_text(relative_path: &str, mut bytes: Vec<u8>) -> String {
    if bytes.starts_with(UTF8_BOM) {
        bytes.drain(..UTF8_BOM.len());
    }
    return match String::from_utf8(bytes) {
        Ok(text) => text,
        Err(e) => {
            tracing::debug!(path = relative_path, "not UTF-8, decoding as ISO-8859-1");
            e.into_bytes().into_iter().map(char::from).collect()
        },
    };
}
