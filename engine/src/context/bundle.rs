//! Ordered, deduplicated collection of context items for one session.

use serde::{Deserialize, Serialize};

use crate::context::item::{ContextItem, ContextKind};
use crate::index::types::package_of;

/// Context for one target method, grown in place across repair rounds.
///
/// Items keep insertion order. An item whose (kind, symbol) key is already
/// present is dropped; the first insertion is authoritative.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContextBundle {
    target_type: String,
    target_method: String,
    items: Vec<ContextItem>,
}

impl ContextBundle {
    pub fn new(target_type: impl Into<String>, target_method: impl Into<String>) -> Self {
        Self {
            target_type: target_type.into(),
            target_method: target_method.into(),
            items: Vec::new(),
        }
    }

    /// Insert unless the key is taken. Returns whether the item was added.
    pub fn insert(&mut self, item: ContextItem) -> bool {
        if self.contains(item.kind, &item.symbol) {
            return false;
        }
        self.items.push(item);
        true
    }

    pub fn contains(&self, kind: ContextKind, symbol: &str) -> bool {
        self.items.iter().any(|i| i.matches_key(kind, symbol))
    }

    pub fn get(&self, kind: ContextKind, symbol: &str) -> Option<&ContextItem> {
        self.items.iter().find(|i| i.matches_key(kind, symbol))
    }

    pub fn items(&self) -> &[ContextItem] {
        &self.items
    }

    pub fn items_of_kind(&self, kind: ContextKind) -> impl Iterator<Item = &ContextItem> {
        self.items.iter().filter(move |i| i.kind == kind)
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// FQN of the type under test
    pub fn target_type(&self) -> &str {
        &self.target_type
    }

    pub fn target_method(&self) -> &str {
        &self.target_method
    }

    pub fn target_package(&self) -> &str {
        package_of(&self.target_type)
    }

    /// Items grouped under their kind heading, in first-appearance order of
    /// each kind and insertion order within a kind.
    pub fn render(&self) -> String {
        let mut kinds: Vec<ContextKind> = Vec::new();
        for item in &self.items {
            if !kinds.contains(&item.kind) {
                kinds.push(item.kind);
            }
        }

        let mut out = String::new();
        for kind in kinds {
            out.push_str("## ");
            out.push_str(kind.heading());
            out.push('\n');
            for item in self.items_of_kind(kind) {
                out.push_str(item.content.trim_end());
                out.push_str("\n\n");
            }
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::item::ContextOrigin;

    fn item(kind: ContextKind, symbol: &str, content: &str) -> ContextItem {
        ContextItem::new(kind, symbol, content, ContextOrigin::Dependency, 0.5)
    }

    #[test]
    fn test_first_insertion_wins() {
        let mut bundle = ContextBundle::new("com.a.Service", "run");
        assert!(bundle.insert(item(ContextKind::ClassSummary, "com.a.Repo", "first")));
        assert!(!bundle.insert(item(ContextKind::ClassSummary, "com.a.Repo", "second")));

        assert_eq!(bundle.len(), 1);
        assert_eq!(bundle.items()[0].content, "first");
    }

    #[test]
    fn test_same_symbol_different_kind_kept() {
        let mut bundle = ContextBundle::new("com.a.Service", "run");
        bundle.insert(item(ContextKind::ClassSummary, "Repo", "summary"));
        bundle.insert(item(ContextKind::ImportSuggestion, "Repo", "import"));
        assert_eq!(bundle.len(), 2);
    }

    #[test]
    fn test_render_groups_by_kind() {
        let mut bundle = ContextBundle::new("com.a.Service", "run");
        bundle.insert(item(ContextKind::MethodBody, "m", "void run() {}"));
        bundle.insert(item(ContextKind::ClassSummary, "A", "class A"));
        bundle.insert(item(ContextKind::TestDoubleNote, "Clock", "mock Clock"));
        bundle.insert(item(ContextKind::ClassSummary, "B", "class B"));

        let rendered = bundle.render();
        let method = rendered.find("## Method under test").unwrap();
        let a = rendered.find("class A").unwrap();
        let b = rendered.find("class B").unwrap();
        let clock = rendered.find("mock Clock").unwrap();
        assert!(method < a && a < b && b < clock);
        assert_eq!(rendered.matches("## Project types").count(), 1);
    }

    #[test]
    fn test_target_package() {
        let bundle = ContextBundle::new("com.a.Service", "run");
        assert_eq!(bundle.target_package(), "com.a");
    }
}
