//! Source discovery that respects .gitignore, using the `ignore` crate

use ignore::gitignore::{Gitignore, GitignoreBuilder};
use ignore::{Match, WalkBuilder};
use std::collections::BTreeSet;
use std::path::{Component, Path, PathBuf};
use tracing::debug;

const GITIGNORE: &str = ".gitignore";

/// Walks a project tree for source files with a configured set of extensions.
pub struct SourceWalker {
    root: PathBuf,
    extensions: BTreeSet<String>,
}

impl SourceWalker {
    /// Extensions are matched without the leading dot and case-insensitively.
    pub fn new(root: impl AsRef<Path>, extensions: &[String]) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
            extensions: extensions
                .iter()
                .map(|e| e.trim_start_matches('.').to_ascii_lowercase())
                .collect(),
        }
    }

    /// Does `path` carry one of the configured extensions?
    fn matches(&self, path: &Path) -> bool {
        path.extension()
            .and_then(|e| e.to_str())
            .map(|e| self.extensions.contains(&e.to_ascii_lowercase()))
            .unwrap_or(false)
    }

    /// Would a full walk pick up `path`?
    ///
    /// Same rules as `source_files`: matching extension, no hidden component
    /// below the root, not excluded by a `.gitignore` at or below the root.
    /// Paths outside the root are never accepted.
    pub fn accepts(&self, path: &Path) -> bool {
        if !self.matches(path) {
            return false;
        }
        let Ok(relative) = path.strip_prefix(&self.root) else {
            return false;
        };
        !self.is_excluded(relative)
    }

    /// Checks every level from the root down, as a walk would: once a
    /// directory is excluded nothing below it comes back. At each level the
    /// deepest `.gitignore` with an opinion decides, and a hidden name with
    /// no matching rule is excluded.
    fn is_excluded(&self, relative: &Path) -> bool {
        let mut rules: Vec<Gitignore> = Vec::new();
        let mut dir = self.root.clone();
        let mut components = relative.components().peekable();

        while let Some(component) = components.next() {
            rules.extend(load_gitignore(&dir));
            dir.push(component);
            let is_dir = components.peek().is_some();

            let verdict = rules.iter().rev().find_map(|r| match r.matched(&dir, is_dir) {
                Match::Ignore(_) => Some(true),
                Match::Whitelist(_) => Some(false),
                Match::None => None,
            });
            let excluded = verdict.unwrap_or_else(|| is_hidden(component));
            if excluded {
                return true;
            }
        }
        false
    }

    /// All matching files under root, absolute and sorted.
    pub fn source_files(&self) -> Vec<PathBuf> {
        let mut files = Vec::new();
        // Only .gitignore files inside the tree count, whether or not it is a
        // git checkout; `accepts` applies the same rules to a single path.
        let walker = WalkBuilder::new(&self.root)
            .hidden(true)
            .git_ignore(true)
            .require_git(false)
            .parents(false)
            .ignore(false)
            .git_global(false)
            .git_exclude(false)
            .build();

        for entry in walker.flatten() {
            let path = entry.path();
            if path.is_file() && self.matches(path) {
                files.push(path.to_path_buf());
            }
        }

        files.sort();
        files
    }
}

fn load_gitignore(dir: &Path) -> Option<Gitignore> {
    let file = dir.join(GITIGNORE);
    if !file.is_file() {
        return None;
    }
    let mut builder = GitignoreBuilder::new(dir);
    if let Some(e) = builder.add(&file) {
        debug!(file = %file.display(), error = %e, "Skipping unreadable .gitignore");
        return None;
    }
    builder.build().ok()
}

fn is_hidden(component: Component<'_>) -> bool {
    match component {
        Component::Normal(name) => name.to_str().is_some_and(|n| n.starts_with('.')),
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn test_source_files_filters_by_extension() {
        let dir = tempfile::tempdir().unwrap();
        let src = dir.path().join("src/main/java/com/example");
        fs::create_dir_all(&src).unwrap();
        fs::write(src.join("Foo.java"), "class Foo {}").unwrap();
        fs::write(src.join("Bar.JAVA"), "class Bar {}").unwrap();
        fs::write(src.join("notes.txt"), "not java").unwrap();

        let walker = SourceWalker::new(dir.path(), &["java".to_string()]);
        let files = walker.source_files();

        assert_eq!(files.len(), 2);
        assert!(files[0].ends_with("Bar.JAVA"));
        assert!(files[1].ends_with("Foo.java"));
    }

    #[test]
    fn test_hidden_directories_skipped() {
        let dir = tempfile::tempdir().unwrap();
        let hidden = dir.path().join(".cache");
        fs::create_dir_all(&hidden).unwrap();
        fs::write(hidden.join("Gen.java"), "class Gen {}").unwrap();

        let walker = SourceWalker::new(dir.path(), &[".java".to_string()]);
        assert!(walker.source_files().is_empty());
    }

    #[test]
    fn test_accepts_agrees_with_walk() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        for rel in [
            "src/A.java",
            ".generated/Gen.java",
            "src/.hidden/H.java",
            "target/classes/T.java",
            "src/gen/Skip.java",
            "src/gen/Keep.java",
        ] {
            let path = root.join(rel);
            fs::create_dir_all(path.parent().unwrap()).unwrap();
            fs::write(path, "class X {}").unwrap();
        }
        fs::write(root.join(".gitignore"), "target/\nsrc/gen/\n").unwrap();
        fs::write(root.join("src/.gitignore"), "!gen/Keep.java\n").unwrap();

        let walker = SourceWalker::new(root, &["java".to_string()]);
        let walked = walker.source_files();
        assert_eq!(walked, vec![root.join("src/A.java")]);

        // an excluded directory cannot be re-included from below
        for rel in [
            ".generated/Gen.java",
            "src/.hidden/H.java",
            "target/classes/T.java",
            "src/gen/Skip.java",
            "src/gen/Keep.java",
        ] {
            assert!(!walker.accepts(&root.join(rel)), "{rel} should be rejected");
        }
        assert!(walker.accepts(&root.join("src/A.java")));
        assert!(!walker.accepts(Path::new("/elsewhere/A.java")));
    }

    #[test]
    fn test_multiple_extensions() {
        let walker = SourceWalker::new("/tmp", &["java".to_string(), "kt".to_string()]);
        assert!(walker.matches(Path::new("A.kt")));
        assert!(walker.matches(Path::new("B.java")));
        assert!(!walker.matches(Path::new("C.rs")));
        assert!(!walker.matches(Path::new("Makefile")));
    }
}
