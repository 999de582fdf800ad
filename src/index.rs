//! One-pass directory walk producing the set of known files and a fuzzy
//! lookup table over them.

use std::collections::HashMap;

use crate::fs::FileSystem;
use crate::ignore::IgnoreMatcher;
use crate::paths;
use crate::types::{FileKind, FileRecord, Warning};

/// Extension appended to extensionless link targets.
pub const DEFAULT_DOCUMENT_EXTENSION: &str = "md";

/// Extensions that mark a file as a document.
pub const DOCUMENT_EXTENSIONS: &[&str] = &["md", "markdown"];

/// Extensions that mark a file as an image, in the order embeds try them.
pub const IMAGE_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "gif", "svg", "webp", "bmp"];

/// Classify a path by its extension, case-insensitively.
pub fn classify(path: &str) -> FileKind {
    let Some(ext) = paths::extension(path) else {
        return FileKind::Other;
    };
    let ext = ext.to_ascii_lowercase();
    if DOCUMENT_EXTENSIONS.contains(&ext.as_str()) {
        return FileKind::Document;
    }
    if IMAGE_EXTENSIONS.contains(&ext.as_str()) {
        return FileKind::Image;
    }
    return FileKind::Other;
}

/// Multi-key table from candidate identifier to file ids. Each list is
/// deduplicated and keeps insertion order, so the first entry for an
/// ambiguous key is always the file met first in the walk.
#[derive(Debug, Default)]
struct LookupIndex {
    /// Identifier to ids into the record arena.
    keys: HashMap<String, Vec<usize>>,
}

impl LookupIndex {
    /// Drop every key.
    fn clear(&mut self) {
        self.keys.clear();
    }

    /// Ids registered under `key`, in walk order.
    fn get(&self, key: &str) -> &[usize] {
        return self.keys.get(key).map_or(&[], Vec::as_slice);
    }

    /// Register `id` under `key` unless it is already there.
    fn insert(&mut self, key: String, id: usize) {
        let ids = self.keys.entry(key).or_default();
        if !ids.contains(&id) {
            ids.push(id);
        }
    }
}

/// The known files of one tree. State is rebuilt from empty by every
/// `scan()`; nothing carries over between scans.
pub struct FileIndex<'a> {
    /// Asset directory convention name.
    asset_dir: String,
    /// Path to id into `records`.
    by_path: HashMap<String, usize>,
    /// Filesystem collaborator.
    fs: &'a dyn FileSystem,
    /// Exclusion rules consulted for every directory and file.
    ignore: &'a IgnoreMatcher,
    /// Identifier lookup table.
    lookup: LookupIndex,
    /// Arena of every known file in walk order.
    records: Vec<FileRecord>,
    /// Problems met during the last scan.
    warnings: Vec<Warning>,
}

impl<'a> FileIndex<'a> {
    /// Asset directory convention name.
    pub fn asset_dir(&self) -> &str {
        return &self.asset_dir;
    }

    /// Whether `path` is a known (non-ignored) file.
    pub fn contains(&self, path: &str) -> bool {
        return self.by_path.contains_key(path);
    }

    /// Documents in walk order.
    pub fn documents(&self) -> impl Iterator<Item = &FileRecord> {
        return self.records.iter().filter(|r| return r.kind == FileKind::Document);
    }

    /// Every known file in walk order: within a directory, files sorted by
    /// name first, then each subdirectory in sorted order.
    pub fn files(&self) -> &[FileRecord] {
        return &self.records;
    }

    /// Images in walk order.
    pub fn images(&self) -> impl Iterator<Item = &FileRecord> {
        return self.records.iter().filter(|r| return r.kind == FileKind::Image);
    }

    /// Files that could satisfy `identifier` under any indexing key, in walk order.
    pub fn lookup(&self, identifier: &str) -> Vec<&FileRecord> {
        return self
            .lookup
            .get(identifier)
            .iter()
            .filter_map(|&id| return self.records.get(id))
            .collect();
    }

    /// Create an empty index. Call `scan()` to populate it.
    pub fn new(fs: &'a dyn FileSystem, ignore: &'a IgnoreMatcher, asset_dir: &str) -> Self {
        return Self {
            asset_dir: asset_dir.to_string(),
            by_path: HashMap::new(),
            fs,
            ignore,
            lookup: LookupIndex::default(),
            records: Vec::new(),
            warnings: Vec::new(),
        };
    }

    /// The record for a known path.
    pub fn record(&self, path: &str) -> Option<&FileRecord> {
        return self.by_path.get(path).and_then(|&id| return self.records.get(id));
    }

    /// Add one file to the arena and register its lookup keys.
    fn register(&mut self, path: String) {
        if self.by_path.contains_key(&path) {
            return;
        }

        let id = self.records.len();
        let name = paths::file_name(&path).to_string();
        let stem = paths::strip_extension(&name).to_string();

        self.lookup.insert(path.clone(), id);
        self.lookup.insert(paths::strip_extension(&path).to_string(), id);
        self.lookup.insert(name.clone(), id);
        self.lookup.insert(stem.clone(), id);
        if paths::file_name(paths::parent(&path)) == self.asset_dir {
            self.lookup.insert(format!("{}/{name}", self.asset_dir), id);
        }

        self.by_path.insert(path.clone(), id);
        self.records.push(FileRecord {
            kind: classify(&path),
            path,
            stem,
        });
        return;
    }

    /// Walk the root and rebuild every derived set and map. Ignored
    /// directories are skipped as whole subtrees; unreadable directories are
    /// skipped with a warning.
    pub fn scan(&mut self) {
        self.by_path.clear();
        self.lookup.clear();
        self.records.clear();
        self.warnings.clear();

        let mut pending: Vec<String> = vec![String::new()];
        while let Some(dir) = pending.pop() {
            let entries = match self.fs.list_files(&dir) {
                Ok(entries) => entries,
                Err(e) => {
                    self.warnings.push(Warning::new(&dir, format!("directory skipped: {e}")));
                    continue;
                },
            };

            for entry in entries.iter().filter(|e| return !e.is_directory) {
                let path = paths::join(&dir, &entry.name);
                if !self.ignore.should_ignore(&path) {
                    self.register(path);
                }
            }

            // Reverse so the stack pops subdirectories in sorted order.
            for entry in entries.iter().rev().filter(|e| return e.is_directory) {
                let path = paths::join(&dir, &entry.name);
                if !self.ignore.should_ignore(&path) {
                    pending.push(path);
                }
            }
        }

        tracing::info!(
            files = self.records.len(),
            documents = self.documents().count(),
            images = self.images().count(),
            "scan complete"
        );
        return;
    }

    /// Problems met during the last scan.
    pub fn warnings(&self) -> &[Warning] {
        return &self.warnings;
    }
}
