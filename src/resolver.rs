//! Turn a raw reference target into a concrete indexed file.
//!
//! Strategies run in a fixed order and stop at the first hit:
//!
//! 1. exact normalized path (relative to the document, or to the root for a
//!    leading `/`)
//! 2. extensionless target with the default document extension (links) or
//!    each image extension (embeds) appended
//! 3. bare file name, with and without extension
//! 4. embeds only: bare file name under the asset directory
//! 5. targets without a `/`: tree-wide file name search in walk order

use std::borrow::Cow;

use crate::ignore::IgnoreMatcher;
use crate::index::{DEFAULT_DOCUMENT_EXTENSION, FileIndex, IMAGE_EXTENSIONS};
use crate::paths;
use crate::types::{FileKind, FileRecord, Reference, ResolvedReference};

/// Which strategy produced a match. Only used for trace logging.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Strategy {
    /// Asset directory convention.
    AssetDir,
    /// Bare file name lookup.
    Basename,
    /// Exact normalized path.
    Exact,
    /// Default extension appended.
    Extension,
    /// Tree-wide file name search.
    TreeSearch,
}

/// Resolves references against one scanned `FileIndex`.
pub struct PathResolver<'a> {
    /// Exclusion rules; an ignored result is never valid.
    ignore: &'a IgnoreMatcher,
    /// Known files and lookup keys.
    index: &'a FileIndex<'a>,
}

impl<'a> PathResolver<'a> {
    /// Pick the best record among `candidates`: links prefer documents,
    /// embeds prefer images, otherwise the first in walk order.
    fn choose<'r>(candidates: &[&'r FileRecord], is_embed: bool) -> Option<&'r FileRecord> {
        let preferred = if is_embed { FileKind::Image } else { FileKind::Document };
        return candidates
            .iter()
            .find(|r| return r.kind == preferred)
            .or_else(|| return candidates.first())
            .copied();
    }

    /// Look `key` up and choose among the candidates.
    fn lookup(&self, key: &str, is_embed: bool) -> Option<&'a FileRecord> {
        if key.is_empty() {
            return None;
        }
        return Self::choose(&self.index.lookup(key), is_embed);
    }

    /// Create a resolver over a scanned index.
    pub const fn new(index: &'a FileIndex<'a>, ignore: &'a IgnoreMatcher) -> Self {
        return Self { ignore, index };
    }

    /// Resolve one reference. Never fails: an unresolvable target yields a
    /// `ResolvedReference` without a path.
    ///
    /// The anchor (`#...`) is stripped first. If that fails and the target
    /// contains `#`, the whole target is tried again in case the `#` is part
    /// of a file name.
    pub fn resolve(&self, reference: &Reference) -> ResolvedReference {
        let raw = reference.target.as_str();
        let without_anchor = strip_anchor(raw);

        let mut found = self.resolve_target(reference, without_anchor);
        if found.is_none() && without_anchor != raw {
            found = self.resolve_target(reference, raw);
        }

        let resolved_path = match found {
            Some((record, strategy)) if self.index.contains(&record.path) && !self.ignore.should_ignore(&record.path) => {
                tracing::trace!(
                    source = %reference.source,
                    target = raw,
                    resolved = %record.path,
                    ?strategy,
                    "reference resolved"
                );
                Some(record.path.clone())
            },
            Some((record, _)) => {
                tracing::debug!(source = %reference.source, target = raw, path = %record.path, "resolved to ignored file");
                None
            },
            None => {
                tracing::debug!(source = %reference.source, target = raw, line = reference.line, "unresolved reference");
                None
            },
        };

        return ResolvedReference {
            reference: reference.clone(),
            resolved_path,
        };
    }

    /// Run every strategy for one candidate spelling of the target.
    fn resolve_target(&self, reference: &Reference, target: &str) -> Option<(&'a FileRecord, Strategy)> {
        let decoded = decode(target.trim());
        if decoded.is_empty() {
            return None;
        }
        let is_embed = reference.is_embed;

        let candidate = match decoded.strip_prefix('/') {
            Some(from_root) => paths::normalize(from_root),
            None => paths::join(paths::parent(&reference.source), &decoded),
        };
        let from_root = paths::normalize(&decoded);

        // 1. Exact path, relative to the document first, then to the root.
        for key in [&candidate, &from_root] {
            if let Some(record) = self.lookup(key, is_embed) {
                return Some((record, Strategy::Exact));
            }
        }

        // 2. Default extensions.
        if paths::extension(&candidate).is_none() {
            let extensions: &[&str] = if is_embed { IMAGE_EXTENSIONS } else { &[DEFAULT_DOCUMENT_EXTENSION] };
            for ext in extensions {
                if let Some(record) = self.lookup(&format!("{candidate}.{ext}"), is_embed) {
                    return Some((record, Strategy::Extension));
                }
            }
        }

        // 3. Bare file name, with and without extension.
        let name = paths::file_name(&candidate);
        for key in [name, paths::strip_extension(name)] {
            if let Some(record) = self.lookup(key, is_embed) {
                return Some((record, Strategy::Basename));
            }
        }

        // 4. Asset directory convention.
        if is_embed {
            let key = format!("{}/{name}", self.index.asset_dir());
            if let Some(record) = self.lookup(&key, is_embed) {
                return Some((record, Strategy::AssetDir));
            }
        }

        // 5. Tree-wide search for bare names.
        if !decoded.contains('/') {
            return self.tree_search(name, is_embed).map(|record| return (record, Strategy::TreeSearch));
        }

        return None;
    }

    /// Scan every known file in walk order for a file name equal to `name`
    /// or equal to `name` plus some extension.
    fn tree_search(&self, name: &str, is_embed: bool) -> Option<&'a FileRecord> {
        if name.is_empty() {
            return None;
        }
        let dotted = format!("{name}.");
        let matches: Vec<&FileRecord> = self
            .index
            .files()
            .iter()
            .filter(|record| {
                let file_name = paths::file_name(&record.path);
                return file_name == name || file_name.starts_with(&dotted);
            })
            .collect();
        return Self::choose(&matches, is_embed);
    }
}

/// Percent-decode a target. Malformed escapes leave the target untouched.
fn decode(target: &str) -> Cow<'_, str> {
    if !target.contains('%') {
        return Cow::Borrowed(target);
    }
    return urlencoding::decode(target).unwrap_or(Cow::Borrowed(target));
}

/// The target without its `#anchor` suffix.
pub fn strip_anchor(target: &str) -> &str {
    return target.split('#').next().unwrap_or(target);
}

#[cfg(test)]
#[allow(clippy::missing_panics_doc, reason = "tests")]
mod tests {
    use std::path::Path;

    use super::*;
    use crate::fs::DiskFileSystem;

    fn write(root: &Path, relative: &str) {
        let path = root.join(relative);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).unwrap();
        }
        std::fs::write(path, "").unwrap();
    }

    fn reference(source: &str, target: &str, is_embed: bool) -> Reference {
        Reference {
            column: 1,
            is_embed,
            line: 1,
            line_text: String::new(),
            source: source.to_string(),
            target: target.to_string(),
        }
    }

    /// Build a tree, scan it, and resolve each `(source, target, is_embed)`.
    fn resolve_all(files: &[&str], overrides: &[&str], refs: &[(&str, &str, bool)]) -> Vec<Option<String>> {
        let dir = tempfile::tempdir().unwrap();
        for file in files {
            write(dir.path(), file);
        }
        let fs = DiskFileSystem::open(dir.path()).unwrap();
        let overrides: Vec<String> = overrides.iter().map(ToString::to_string).collect();
        let ignore = IgnoreMatcher::load(&fs, &overrides).unwrap();
        let mut index = FileIndex::new(&fs, &ignore, "assets");
        index.scan();
        let resolver = PathResolver::new(&index, &ignore);
        refs.iter()
            .map(|&(source, target, is_embed)| resolver.resolve(&reference(source, target, is_embed)).resolved_path)
            .collect()
    }

    fn some(path: &str) -> Option<String> {
        Some(path.to_string())
    }

    #[test]
    fn relative_and_root_relative_paths() {
        let got = resolve_all(
            &["notes/a.md", "notes/sub/b.md", "top.md"],
            &[],
            &[
                ("notes/a.md", "sub/b.md", false),
                ("notes/sub/b.md", "../a.md", false),
                ("notes/sub/b.md", "/top.md", false),
                ("notes/a.md", "./sub/../a.md", false),
            ],
        );
        assert_eq!(got, [some("notes/sub/b.md"), some("notes/a.md"), some("top.md"), some("notes/a.md")]);
    }

    #[test]
    fn extensionless_targets_get_default_extensions() {
        let got = resolve_all(
            &["docs/guide.md", "docs/chart.webp"],
            &[],
            &[("docs/guide.md", "chart", true), ("docs/guide.md", "guide", false)],
        );
        assert_eq!(got, [some("docs/chart.webp"), some("docs/guide.md")]);
    }

    #[test]
    fn bare_names_resolve_anywhere_in_the_tree() {
        let got = resolve_all(
            &["a/deep/target.md", "b/source.md"],
            &[],
            &[("b/source.md", "target", false), ("b/source.md", "target.md", false)],
        );
        assert_eq!(got, [some("a/deep/target.md"), some("a/deep/target.md")]);
    }

    #[test]
    fn links_prefer_documents_and_embeds_prefer_images() {
        let got = resolve_all(
            &["a/topic.png", "b/topic.md", "src.md"],
            &[],
            &[("src.md", "topic", false), ("src.md", "topic", true)],
        );
        assert_eq!(got, [some("b/topic.md"), some("a/topic.png")]);
    }

    #[test]
    fn ambiguity_resolves_to_first_in_walk_order() {
        let got = resolve_all(&["z/dup.md", "m/dup.md", "src.md"], &[], &[("src.md", "dup", false)]);
        assert_eq!(got, [some("m/dup.md")]);
    }

    #[test]
    fn embeds_use_the_asset_directory_convention() {
        let got = resolve_all(
            &["notes/n.md", "notes/assets/shot.png"],
            &[],
            &[("notes/n.md", "assets/shot.png", true), ("notes/n.md", "other/shot.png", true)],
        );
        assert_eq!(got, [some("notes/assets/shot.png"), some("notes/assets/shot.png")]);
    }

    #[test]
    fn tree_search_matches_names_with_any_extension() {
        let got = resolve_all(&["x/report.final.md", "s.md"], &[], &[("s.md", "report", false)]);
        assert_eq!(got, [some("x/report.final.md")]);
    }

    #[test]
    fn anchors_are_stripped_and_hash_file_names_still_resolve() {
        let got = resolve_all(
            &["page.md", "c#-notes.md", "s.md"],
            &[],
            &[("s.md", "page#Heading", false), ("s.md", "page.md#x", false), ("s.md", "c#-notes", false)],
        );
        assert_eq!(got, [some("page.md"), some("page.md"), some("c#-notes.md")]);
    }

    #[test]
    fn percent_encoded_targets_are_decoded() {
        let got = resolve_all(&["My Note.md", "s.md"], &[], &[("s.md", "My%20Note.md", false)]);
        assert_eq!(got, [some("My Note.md")]);
    }

    #[test]
    fn missing_and_ignored_targets_are_unresolved() {
        let got = resolve_all(
            &["s.md", "private/secret.md"],
            &["private/"],
            &[("s.md", "missing", false), ("s.md", "private/secret.md", false), ("s.md", "secret", false)],
        );
        assert_eq!(got, [None, None, None]);
    }

    #[test]
    fn strip_anchor_keeps_the_path() {
        assert_eq!(strip_anchor("a.md#b#c"), "a.md");
        assert_eq!(strip_anchor("a.md"), "a.md");
        assert_eq!(strip_anchor("#only"), "");
    }
}
