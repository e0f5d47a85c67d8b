//! Project-wide structural index: FQN → TypeRecord.
//!
//! The authoritative state is the per-file map of extracted records, keyed by
//! relative path. The FQN and simple-name lookups are derived from it by
//! walking the files in path order, so a full build and an incremental update
//! that end in the same file set always produce the same lookup maps.

use std::collections::btree_map::Entry;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;
use std::time::Instant;

use chrono::{DateTime, Utc};
use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::error::{IndexError, IndexResult, ParseFailure};
use crate::index::file_walker::SourceWalker;
use crate::index::java_parser::JavaFileIndex;
use crate::index::types::TypeRecord;

static POM_PARENT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)<parent>.*?</parent>").unwrap());
static POM_GROUP_ID: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"<groupId>\s*([^<\s]+)\s*</groupId>").unwrap());
static GRADLE_GROUP: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"(?m)^\s*group\s*=\s*['"]([^'"]+)['"]"#).unwrap());

/// Two files declaring the same FQN. The smaller relative path wins.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DuplicateType {
    pub fqn: String,
    pub kept: PathBuf,
    pub ignored: PathBuf,
}

/// Outcome of a build or update.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BuildReport {
    /// Files parsed in this pass
    pub parsed: usize,
    /// Files skipped because they could not be parsed
    pub skipped: Vec<ParseFailure>,
    pub duplicates: Vec<DuplicateType>,
    /// Loaded from the on-disk cache instead of parsing
    #[serde(default)]
    pub from_cache: bool,
    pub elapsed_ms: u64,
}

/// Immutable snapshot of a project's declared types.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProjectIndex {
    root: PathBuf,
    extensions: Vec<String>,
    /// Relative path → records declared in that file
    files: BTreeMap<PathBuf, Vec<TypeRecord>>,
    group_id: Option<String>,
    built_at: DateTime<Utc>,

    #[serde(skip)]
    types: BTreeMap<String, TypeRecord>,
    #[serde(skip)]
    by_simple_name: BTreeMap<String, Vec<String>>,
    #[serde(skip)]
    duplicates: Vec<DuplicateType>,
}

impl ProjectIndex {
    /// Parse every source file under `root` with one of `extensions`.
    ///
    /// Unparseable files are skipped and reported; only a missing root fails
    /// the build.
    pub fn build(root: impl AsRef<Path>, extensions: &[String]) -> IndexResult<(Self, BuildReport)> {
        let start = Instant::now();
        let root = root.as_ref().to_path_buf();
        if !root.is_dir() {
            return Err(IndexError::RootNotFound { path: root });
        }

        let walker = SourceWalker::new(&root, extensions);
        let mut files = BTreeMap::new();
        let mut report = BuildReport::default();

        for path in walker.source_files() {
            match JavaFileIndex::from_path(&root, &path) {
                Ok(parsed) => {
                    report.parsed += 1;
                    files.insert(parsed.file, parsed.types);
                }
                Err(failure) => {
                    warn!(file = %failure.file.display(), reason = %failure.reason, "Skipping unparseable source file");
                    report.skipped.push(failure);
                }
            }
        }

        let mut index = Self {
            group_id: detect_group_id(&root),
            root,
            extensions: extensions.to_vec(),
            files,
            built_at: Utc::now(),
            types: BTreeMap::new(),
            by_simple_name: BTreeMap::new(),
            duplicates: Vec::new(),
        };
        index.rebuild_lookup();

        report.duplicates = index.duplicates.clone();
        report.elapsed_ms = start.elapsed().as_millis() as u64;

        info!(
            root = %index.root.display(),
            files = index.files.len(),
            types = index.types.len(),
            skipped = report.skipped.len(),
            elapsed_ms = report.elapsed_ms,
            "Built project index"
        );

        Ok((index, report))
    }

    /// Re-parse only `changed` and return a new index; `self` is untouched.
    ///
    /// Paths may be absolute or relative to the root. A path that a full
    /// build would not pick up (deleted, wrong extension, hidden or
    /// gitignored) drops its previous records, as does one that now fails
    /// to parse.
    pub fn update(&self, changed: &[PathBuf]) -> IndexResult<(Self, BuildReport)> {
        let start = Instant::now();
        if !self.root.is_dir() {
            return Err(IndexError::RootNotFound {
                path: self.root.clone(),
            });
        }

        let walker = SourceWalker::new(&self.root, &self.extensions);
        let mut next = self.clone();
        let mut report = BuildReport::default();

        for path in changed {
            let relative = path.strip_prefix(&self.root).unwrap_or(path).to_path_buf();
            let absolute = self.root.join(&relative);

            if !absolute.is_file() || !walker.accepts(&absolute) {
                if next.files.remove(&relative).is_some() {
                    debug!(file = %relative.display(), "Removed file no longer in the source set");
                }
                continue;
            }

            match JavaFileIndex::from_path(&self.root, &absolute) {
                Ok(parsed) => {
                    report.parsed += 1;
                    next.files.insert(parsed.file, parsed.types);
                }
                Err(failure) => {
                    warn!(file = %failure.file.display(), reason = %failure.reason, "Dropping file that no longer parses");
                    next.files.remove(&relative);
                    report.skipped.push(failure);
                }
            }
        }

        next.group_id = detect_group_id(&next.root);
        next.built_at = Utc::now();
        next.rebuild_lookup();

        report.duplicates = next.duplicates.clone();
        report.elapsed_ms = start.elapsed().as_millis() as u64;

        info!(
            changed = changed.len(),
            types = next.types.len(),
            elapsed_ms = report.elapsed_ms,
            "Updated project index"
        );

        Ok((next, report))
    }

    /// Derive the FQN and simple-name maps from the per-file records.
    pub(crate) fn rebuild_lookup(&mut self) {
        self.types.clear();
        self.by_simple_name.clear();
        self.duplicates.clear();

        for (path, records) in &self.files {
            for record in records {
                match self.types.entry(record.fqn.clone()) {
                    Entry::Vacant(slot) => {
                        self.by_simple_name
                            .entry(record.simple_name.clone())
                            .or_default()
                            .push(record.fqn.clone());
                        slot.insert(record.clone());
                    }
                    Entry::Occupied(existing) => {
                        warn!(fqn = %record.fqn, kept = %existing.get().file.display(), ignored = %path.display(), "Duplicate type declaration");
                        self.duplicates.push(DuplicateType {
                            fqn: record.fqn.clone(),
                            kept: existing.get().file.clone(),
                            ignored: path.clone(),
                        });
                    }
                }
            }
        }
    }

    /// Exact fully-qualified lookup.
    pub fn resolve(&self, fqn: &str) -> IndexResult<&TypeRecord> {
        self.types.get(fqn).ok_or_else(|| IndexError::not_found(fqn))
    }

    /// All types with this simple name, closest to `near_package` first.
    ///
    /// Proximity is the number of leading package segments shared with
    /// `near_package`; ties fall back to FQN order.
    pub fn resolve_simple(&self, simple_name: &str, near_package: Option<&str>) -> Vec<&TypeRecord> {
        let mut candidates: Vec<&TypeRecord> = self
            .by_simple_name
            .get(simple_name)
            .into_iter()
            .flatten()
            .filter_map(|fqn| self.types.get(fqn))
            .collect();

        let near = near_package.unwrap_or("");
        candidates.sort_by(|a, b| {
            package_proximity(&b.package, near)
                .cmp(&package_proximity(&a.package, near))
                .then_with(|| a.fqn.cmp(&b.fqn))
        });
        candidates
    }

    /// Best match for a type reference as written in source: exact FQN
    /// first, then the simple name nearest to `near_package`.
    pub fn lookup(&self, name: &str, near_package: Option<&str>) -> Option<&TypeRecord> {
        if let Ok(record) = self.resolve(name) {
            return Some(record);
        }
        let simple = name.rsplit('.').next().unwrap_or(name);
        self.resolve_simple(simple, near_package).into_iter().next()
    }

    /// A symbol is local iff its simple name matches an indexed type.
    pub fn is_local(&self, simple_name: &str) -> bool {
        self.by_simple_name.contains_key(simple_name)
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn extensions(&self) -> &[String] {
        &self.extensions
    }

    pub fn group_id(&self) -> Option<&str> {
        self.group_id.as_deref()
    }

    pub fn built_at(&self) -> DateTime<Utc> {
        self.built_at
    }

    pub fn type_count(&self) -> usize {
        self.types.len()
    }

    pub fn file_count(&self) -> usize {
        self.files.len()
    }

    pub fn duplicates(&self) -> &[DuplicateType] {
        &self.duplicates
    }

    /// All records in FQN order.
    pub fn records(&self) -> impl Iterator<Item = &TypeRecord> {
        self.types.values()
    }
}

/// Shared leading segments of two dotted package names.
pub fn package_proximity(a: &str, b: &str) -> usize {
    if a.is_empty() || b.is_empty() {
        return 0;
    }
    a.split('.')
        .zip(b.split('.'))
        .take_while(|(x, y)| x == y)
        .count()
}

/// Read the project group id from `pom.xml` or a Gradle build script.
pub fn detect_group_id(root: &Path) -> Option<String> {
    if let Ok(pom) = std::fs::read_to_string(root.join("pom.xml")) {
        let without_parent = POM_PARENT.replace(&pom, "");
        if let Some(caps) = POM_GROUP_ID.captures(&without_parent) {
            return Some(caps[1].to_string());
        }
        if let Some(caps) = POM_GROUP_ID.captures(&pom) {
            return Some(caps[1].to_string());
        }
    }

    for script in ["build.gradle", "build.gradle.kts"] {
        if let Ok(text) = std::fs::read_to_string(root.join(script)) {
            if let Some(caps) = GRADLE_GROUP.captures(&text) {
                return Some(caps[1].to_string());
            }
        }
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn java() -> Vec<String> {
        vec!["java".to_string()]
    }

    fn write(root: &Path, rel: &str, content: &str) {
        let path = root.join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, content).unwrap();
    }

    #[test]
    fn test_build_and_resolve() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "src/a/Repo.java", "package com.a;\npublic interface Repo {}\n");
        write(dir.path(), "src/a/Service.java", "package com.a;\npublic class Service { private Repo repo; }\n");

        let (index, report) = ProjectIndex::build(dir.path(), &java()).unwrap();

        assert_eq!(report.parsed, 2);
        assert!(report.skipped.is_empty());
        assert_eq!(index.resolve("com.a.Repo").unwrap().simple_name, "Repo");
        assert!(index.is_local("Service"));
        assert!(!index.is_local("Clock"));
        assert!(matches!(
            index.resolve("com.a.Missing"),
            Err(IndexError::NotFound { .. })
        ));
    }

    #[test]
    fn test_missing_root_fails() {
        let result = ProjectIndex::build("/definitely/not/here", &java());
        assert!(matches!(result, Err(IndexError::RootNotFound { .. })));
    }

    #[test]
    fn test_parse_failure_is_isolated() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "Good.java", "class Good {}");
        write(dir.path(), "Bad.java", "class Bad { void x( }");

        let (index, report) = ProjectIndex::build(dir.path(), &java()).unwrap();

        assert_eq!(index.type_count(), 1);
        assert_eq!(report.skipped.len(), 1);
        assert_eq!(report.skipped[0].file, PathBuf::from("Bad.java"));
    }

    #[test]
    fn test_duplicate_fqn_keeps_smallest_path() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "b/Dup.java", "package x;\nclass Dup { int second; }");
        write(dir.path(), "a/Dup.java", "package x;\nclass Dup { int first; }");

        let (index, report) = ProjectIndex::build(dir.path(), &java()).unwrap();

        let dup = index.resolve("x.Dup").unwrap();
        assert_eq!(dup.fields[0].name, "first");
        assert_eq!(report.duplicates.len(), 1);
        assert_eq!(report.duplicates[0].ignored, PathBuf::from("b/Dup.java"));
    }

    #[test]
    fn test_resolve_simple_orders_by_proximity() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "1/Item.java", "package com.shop.catalog;\nclass Item {}");
        write(dir.path(), "2/Item.java", "package com.shop.billing;\nclass Item {}");
        write(dir.path(), "3/Item.java", "package org.other;\nclass Item {}");

        let (index, _) = ProjectIndex::build(dir.path(), &java()).unwrap();

        let near: Vec<&str> = index
            .resolve_simple("Item", Some("com.shop.billing.api"))
            .iter()
            .map(|r| r.fqn.as_str())
            .collect();
        assert_eq!(
            near,
            vec!["com.shop.billing.Item", "com.shop.catalog.Item", "org.other.Item"]
        );

        let lookup = index.lookup("Item", Some("org.other")).unwrap();
        assert_eq!(lookup.fqn, "org.other.Item");
    }

    #[test]
    fn test_update_removes_deleted_file() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "A.java", "class A {}");
        write(dir.path(), "B.java", "class B {}");
        let (index, _) = ProjectIndex::build(dir.path(), &java()).unwrap();

        fs::remove_file(dir.path().join("B.java")).unwrap();
        let (updated, _) = index.update(&[PathBuf::from("B.java")]).unwrap();

        assert!(updated.resolve("B").is_err());
        assert!(index.resolve("B").is_ok());
    }

    #[test]
    fn test_package_proximity() {
        assert_eq!(package_proximity("com.a.b", "com.a.c"), 2);
        assert_eq!(package_proximity("com.a", "org.a"), 0);
        assert_eq!(package_proximity("", "com"), 0);
    }

    #[test]
    fn test_group_id_from_pom_skips_parent() {
        let dir = tempfile::tempdir().unwrap();
        write(
            dir.path(),
            "pom.xml",
            "<project><parent><groupId>org.springframework.boot</groupId></parent>\n<groupId>com.acme</groupId></project>",
        );
        assert_eq!(detect_group_id(dir.path()).as_deref(), Some("com.acme"));
    }

    #[test]
    fn test_group_id_from_gradle() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "build.gradle", "plugins {}\ngroup = 'io.acme'\nversion = '1.0'\n");
        assert_eq!(detect_group_id(dir.path()).as_deref(), Some("io.acme"));
    }
}
