//! One check cycle: scan, parse every document, resolve every reference,
//! and fold the results into a fresh `CheckReport`.

use std::collections::{BTreeMap, BTreeSet};

use serde::Serialize;

use crate::config::Config;
use crate::error::Error;
use crate::fs::FileSystem;
use crate::ignore::IgnoreMatcher;
use crate::index::FileIndex;
use crate::parser::ReferenceParser;
use crate::resolver::PathResolver;
use crate::types::{BrokenReference, FileKind, Warning};

/// Everything one `check_all()` produced. Built from empty on every call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CheckReport {
    /// Unresolved references, documents in walk order, each in source order.
    pub broken: Vec<BrokenReference>,
    /// Per-document link counts, in walk order.
    pub documents: Vec<DocumentStats>,
    /// Document adjacency and image usage.
    pub graph: ReferenceGraph,
    /// Aggregate counts.
    pub summary: Summary,
    /// Links with no link back, sorted by source then target.
    pub unidirectional: Vec<UnidirectionalLink>,
    /// Indexed images that nothing uses, in walk order.
    pub unused_images: Vec<String>,
    /// Recoverable problems from this cycle.
    pub warnings: Vec<Warning>,
}

impl CheckReport {
    /// Whether any reference failed to resolve.
    pub const fn has_broken(&self) -> bool {
        return !self.broken.is_empty();
    }

    /// Whether any image is unused.
    pub const fn has_unused_images(&self) -> bool {
        return !self.unused_images.is_empty();
    }
}

/// Drives parser and resolver over a whole tree.
pub struct Checker<'a> {
    /// Effective configuration, overrides already applied.
    config: &'a Config,
    /// Filesystem collaborator.
    fs: &'a dyn FileSystem,
    /// Compiled reference patterns, reused across documents.
    parser: ReferenceParser,
}

impl<'a> Checker<'a> {
    /// Run one full check cycle. Ignore rules and the index are rebuilt, so
    /// calling this again after the tree changes picks up every change.
    ///
    /// # Errors
    ///
    /// Returns `Error::InvalidPattern` if a configured ignore pattern is not a
    /// valid glob. Unreadable documents and ignore files become warnings.
    pub fn check_all(&self) -> Result<CheckReport, Error> {
        let ignore = IgnoreMatcher::load(self.fs, &self.config.ignore)?;
        let mut index = FileIndex::new(self.fs, &ignore, &self.config.asset_dir);
        index.scan();
        let resolver = PathResolver::new(&index, &ignore);

        let mut warnings: Vec<Warning> = ignore.warnings().to_vec();
        warnings.extend_from_slice(index.warnings());
        let mut graph = ReferenceGraph::default();
        let mut broken: Vec<BrokenReference> = Vec::new();

        for document in index.documents() {
            let content = match self.fs.read_file(&document.path) {
                Ok(content) => content,
                Err(e) => {
                    warnings.push(Warning::new(&document.path, format!("document skipped: {e}")));
                    continue;
                },
            };

            for reference in self.parser.parse(&document.path, &content) {
                let resolved = resolver.resolve(&reference);
                if !resolved.is_valid() {
                    broken.push(BrokenReference::from(resolved.reference));
                    continue;
                }
                let Some(target) = resolved.resolved_path.as_deref().and_then(|path| return index.record(path)) else {
                    continue;
                };

                match target.kind {
                    FileKind::Image if reference.is_embed || !self.config.strict_image_refs => {
                        graph.used_images.insert(target.path.clone());
                    },
                    FileKind::Document if !reference.is_embed => {
                        graph.add_edge(&document.path, target.path.clone());
                    },
                    FileKind::Document | FileKind::Image | FileKind::Other => {},
                }
            }
        }
        graph.derive_incoming();

        let unused_images: Vec<String> = index
            .images()
            .filter(|image| return !graph.used_images.contains(&image.path))
            .map(|image| return image.path.clone())
            .collect();
        let unidirectional = graph.unidirectional_links();
        let documents: Vec<DocumentStats> = index
            .documents()
            .map(|document| {
                return DocumentStats {
                    incoming: graph.incoming.get(&document.path).map_or(0, BTreeSet::len),
                    outgoing: graph.outgoing.get(&document.path).map_or(0, BTreeSet::len),
                    path: document.path.clone(),
                };
            })
            .collect();

        let summary = Summary {
            broken_references: broken.len(),
            total_documents: documents.len(),
            total_files: index.files().len(),
            total_images: index.images().count(),
            unidirectional_links: unidirectional.len(),
            unused_images: unused_images.len(),
        };
        tracing::info!(
            broken = summary.broken_references,
            unused_images = summary.unused_images,
            unidirectional = summary.unidirectional_links,
            "check complete"
        );

        return Ok(CheckReport {
            broken,
            documents,
            graph,
            summary,
            unidirectional,
            unused_images,
            warnings,
        });
    }

    /// Create a checker over `fs` with an effective configuration.
    pub fn new(fs: &'a dyn FileSystem, config: &'a Config) -> Self {
        return Self {
            config,
            fs,
            parser: ReferenceParser::new(),
        };
    }
}

/// Link counts for one document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DocumentStats {
    /// Distinct documents linking here.
    pub incoming: usize,
    /// Distinct documents linked from here.
    pub outgoing: usize,
    /// Document path.
    pub path: String,
}

/// Document-to-document adjacency plus used images.
///
/// `incoming[b]` contains `a` exactly when `outgoing[a]` contains `b`. Image
/// edges never appear in either map.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ReferenceGraph {
    /// Transpose of `outgoing`.
    pub incoming: BTreeMap<String, BTreeSet<String>>,
    /// Source document to linked documents.
    pub outgoing: BTreeMap<String, BTreeSet<String>>,
    /// Images referenced under the active usage policy.
    pub used_images: BTreeSet<String>,
}

impl ReferenceGraph {
    /// Record a link edge.
    fn add_edge(&mut self, source: &str, target: String) {
        self.outgoing.entry(source.to_string()).or_default().insert(target);
        return;
    }

    /// Rebuild `incoming` from `outgoing`.
    fn derive_incoming(&mut self) {
        self.incoming.clear();
        for (source, targets) in &self.outgoing {
            for target in targets {
                self.incoming.entry(target.clone()).or_default().insert(source.clone());
            }
        }
        return;
    }

    /// Every edge `(a, b)` where `b` does not link back to `a`. One pass over
    /// the edges, each checked against the opposite adjacency set.
    pub fn unidirectional_links(&self) -> Vec<UnidirectionalLink> {
        let mut links = Vec::new();
        for (source, targets) in &self.outgoing {
            for target in targets {
                let links_back = self.outgoing.get(target).is_some_and(|back| return back.contains(source));
                if !links_back {
                    links.push(UnidirectionalLink {
                        source: source.clone(),
                        target: target.clone(),
                    });
                }
            }
        }
        return links;
    }
}

/// Aggregate counts for the report footer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Summary {
    /// Number of unresolved references.
    pub broken_references: usize,
    /// Indexed documents.
    pub total_documents: usize,
    /// Indexed files of any kind.
    pub total_files: usize,
    /// Indexed images.
    pub total_images: usize,
    /// Links without a link back.
    pub unidirectional_links: usize,
    /// Images nothing uses.
    pub unused_images: usize,
}

/// A link from `source` to `target` with no link from `target` to `source`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UnidirectionalLink {
    /// Linking document.
    pub source: String,
    /// Linked document.
    pub target: String,
}

#[cfg(test)]
#[allow(clippy::missing_panics_doc, reason = "tests")]
mod tests {
    use super::*;
    use crate::fs::DirEntry;

    /// In-memory tree. A `None` body marks a file that exists but cannot be read.
    #[derive(Default)]
    struct MemoryFileSystem {
        files: BTreeMap<String, Option<String>>,
    }

    impl MemoryFileSystem {
        fn with(files: &[(&str, &str)]) -> Self {
            let mut fs = Self::default();
            for (path, body) in files {
                fs.files.insert((*path).to_string(), Some((*body).to_string()));
            }
            fs
        }

        fn unreadable(mut self, path: &str) -> Self {
            self.files.insert(path.to_string(), None);
            self
        }
    }

    impl FileSystem for MemoryFileSystem {
        fn file_exists(&self, relative_path: &str) -> bool {
            self.files.contains_key(relative_path)
        }

        fn is_directory(&self, relative_path: &str) -> bool {
            let prefix = format!("{relative_path}/");
            relative_path.is_empty() || self.files.keys().any(|k| k.starts_with(&prefix))
        }

        fn list_files(&self, relative_dir: &str) -> Result<Vec<DirEntry>, Error> {
            let prefix = if relative_dir.is_empty() { String::new() } else { format!("{relative_dir}/") };
            let mut entries: BTreeMap<String, bool> = BTreeMap::new();
            for key in self.files.keys() {
                if let Some(rest) = key.strip_prefix(&prefix) {
                    match rest.split_once('/') {
                        Some((dir, _)) => {
                            entries.insert(dir.to_string(), true);
                        },
                        None => {
                            entries.entry(rest.to_string()).or_insert(false);
                        },
                    }
                }
            }
            Ok(entries.into_iter().map(|(name, is_directory)| DirEntry { is_directory, name }).collect())
        }

        fn read_file(&self, relative_path: &str) -> Result<String, Error> {
            match self.files.get(relative_path) {
                Some(Some(body)) => Ok(body.clone()),
                _ => Err(Error::ReadFailed {
                    path: relative_path.to_string(),
                    reason: "unreadable".to_string(),
                }),
            }
        }
    }

    fn check(fs: &MemoryFileSystem) -> CheckReport {
        check_with(fs, &Config::default())
    }

    fn check_with(fs: &MemoryFileSystem, config: &Config) -> CheckReport {
        Checker::new(fs, config).check_all().unwrap()
    }

    fn pairs(report: &CheckReport) -> Vec<(&str, &str)> {
        report.unidirectional.iter().map(|l| (l.source.as_str(), l.target.as_str())).collect()
    }

    #[test]
    fn mutual_links_are_clean() {
        let fs = MemoryFileSystem::with(&[("a.md", "[[b]]"), ("b.md", "[back](a.md)")]);
        let report = check(&fs);
        assert!(report.broken.is_empty());
        assert!(report.unidirectional.is_empty());
        assert_eq!(report.graph.incoming.get("a.md").map(|s| s.len()), Some(1));
        assert_eq!(report.summary.total_documents, 2);
    }

    #[test]
    fn broken_reference_keeps_raw_target_and_position() {
        let fs = MemoryFileSystem::with(&[("a.md", "intro\nsee [[missing#part|Alias]] here")]);
        let report = check(&fs);
        assert_eq!(report.broken.len(), 1);
        let broken = report.broken.first().unwrap();
        assert_eq!((broken.source.as_str(), broken.target.as_str()), ("a.md", "missing#part"));
        assert_eq!((broken.line, broken.column), (2, 5));
        assert_eq!(broken.line_text, "see [[missing#part|Alias]] here");
        assert!(report.has_broken());
    }

    #[test]
    fn only_embeds_use_images_in_strict_mode() {
        let fs = MemoryFileSystem::with(&[
            ("a.md", "![[shown.png]] [link](linked.png)"),
            ("shown.png", ""),
            ("linked.png", ""),
            ("assets/orphan.jpg", ""),
        ]);
        let report = check(&fs);
        assert_eq!(report.unused_images, ["linked.png", "assets/orphan.jpg"]);
        assert_eq!(report.summary.total_images, 3);

        let loose = Config::default().with_overrides(&[], true);
        let report = check_with(&fs, &loose);
        assert_eq!(report.unused_images, ["assets/orphan.jpg"]);
    }

    #[test]
    fn one_way_links_are_reported_once_per_edge() {
        let fs = MemoryFileSystem::with(&[
            ("a.md", "[[b]] [[c]] [[b]]"),
            ("b.md", "[[a]]"),
            ("c.md", "nothing"),
            ("d.md", "[[c]] ![[pic.png]]"),
            ("pic.png", ""),
        ]);
        let report = check(&fs);
        assert_eq!(pairs(&report), [("a.md", "c.md"), ("d.md", "c.md")]);
        assert!(report.graph.outgoing.values().flatten().all(|t| t.ends_with(".md")));
    }

    #[test]
    fn incoming_is_the_transpose_of_outgoing() {
        let fs = MemoryFileSystem::with(&[
            ("a.md", "[[b]] [[c]]"),
            ("b.md", "[[c]]"),
            ("c.md", "[[a]]"),
        ]);
        let graph = check(&fs).graph;
        for (source, targets) in &graph.outgoing {
            for target in targets {
                assert!(graph.incoming.get(target).unwrap().contains(source));
            }
        }
        for (target, sources) in &graph.incoming {
            for source in sources {
                assert!(graph.outgoing.get(source).unwrap().contains(target));
            }
        }
    }

    #[test]
    fn linked_badge_counts_as_link_and_embed() {
        let fs = MemoryFileSystem::with(&[("a.md", "[![badge](b.png)](c.md)"), ("b.png", ""), ("c.md", "[[a]]")]);
        let report = check(&fs);
        assert!(report.unidirectional.is_empty(), "{:?}", report.unidirectional);
        assert!(report.graph.outgoing.get("a.md").unwrap().contains("c.md"));
        assert!(report.unused_images.is_empty());
    }

    #[test]
    fn fenced_code_produces_no_references() {
        let fs = MemoryFileSystem::with(&[("a.md", "```\n[[ghost]]\n![[ghost.png]]\n```\n")]);
        let report = check(&fs);
        assert!(report.broken.is_empty());
        assert!(report.graph.outgoing.is_empty());
    }

    #[test]
    fn unreadable_document_is_a_warning() {
        let fs = MemoryFileSystem::with(&[("good.md", "[[nope]]")]).unreadable("bad.md");
        let report = check(&fs);
        assert_eq!(report.broken.len(), 1);
        assert_eq!(report.warnings.len(), 1);
        assert_eq!(report.warnings.first().map(|w| w.path.as_str()), Some("bad.md"));
    }

    #[test]
    fn ignored_targets_are_broken_and_not_indexed() {
        let fs = MemoryFileSystem::with(&[
            (".gitignore", "drafts/\n"),
            ("a.md", "[[drafts/wip]]"),
            ("drafts/wip.md", "[[also-missing]]"),
        ]);
        let report = check(&fs);
        let targets: Vec<&str> = report.broken.iter().map(|b| b.target.as_str()).collect();
        assert_eq!(targets, ["drafts/wip"]);
        assert_eq!(report.summary.total_documents, 1);
    }

    #[test]
    fn repeated_checks_are_identical() {
        let fs = MemoryFileSystem::with(&[("a.md", "[[b]] [[x]]"), ("b.md", "![[i.png]]"), ("i.png", "")]);
        let config = Config::default();
        let checker = Checker::new(&fs, &config);
        assert_eq!(checker.check_all().unwrap(), checker.check_all().unwrap());
    }

    #[test]
    fn per_document_stats_count_distinct_neighbors() {
        let fs = MemoryFileSystem::with(&[("a.md", "[[b]] [[b]] [[c]]"), ("b.md", "[[a]]"), ("c.md", "")]);
        let report = check(&fs);
        let stats: Vec<(&str, usize, usize)> =
            report.documents.iter().map(|d| (d.path.as_str(), d.incoming, d.outgoing)).collect();
        assert_eq!(stats, [("a.md", 1, 2), ("b.md", 1, 1), ("c.md", 1, 0)]);
    }
}
