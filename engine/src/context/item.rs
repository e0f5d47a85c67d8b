//! Context items and their dedup key

use serde::{Deserialize, Serialize};

/// What a context item describes. Part of the dedup key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContextKind {
    /// Target method signature and body
    MethodBody,
    /// Constructors and fields of the enclosing type
    TypeMembers,
    /// Compact constructors + public methods of a project type
    ClassSummary,
    /// An external collaborator that must be mocked or faked
    TestDoubleNote,
    /// Import line for an unresolved external symbol
    ImportSuggestion,
    /// Configure an explicit stub return instead of a default null
    StubHint,
    /// How to avoid a failure seen in an earlier attempt
    FailureNote,
}

impl ContextKind {
    /// Section heading used when rendering a prompt.
    pub fn heading(&self) -> &'static str {
        match self {
            Self::MethodBody => "Method under test",
            Self::TypeMembers => "Enclosing type members",
            Self::ClassSummary => "Project types",
            Self::TestDoubleNote => "External collaborators",
            Self::ImportSuggestion => "Imports",
            Self::StubHint => "Stubbing",
            Self::FailureNote => "Known failures",
        }
    }
}

impl std::fmt::Display for ContextKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::MethodBody => write!(f, "method_body"),
            Self::TypeMembers => write!(f, "type_members"),
            Self::ClassSummary => write!(f, "class_summary"),
            Self::TestDoubleNote => write!(f, "test_double_note"),
            Self::ImportSuggestion => write!(f, "import_suggestion"),
            Self::StubHint => write!(f, "stub_hint"),
            Self::FailureNote => write!(f, "failure_note"),
        }
    }
}

/// Where an item came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContextOrigin {
    TargetMethod,
    EnclosingType,
    /// Field, parameter or constructor dependency of the target
    Dependency,
    CompileDiagnostic,
    RuntimeDiagnostic,
}

impl std::fmt::Display for ContextOrigin {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::TargetMethod => write!(f, "target_method"),
            Self::EnclosingType => write!(f, "enclosing_type"),
            Self::Dependency => write!(f, "dependency"),
            Self::CompileDiagnostic => write!(f, "compile_diagnostic"),
            Self::RuntimeDiagnostic => write!(f, "runtime_diagnostic"),
        }
    }
}

/// Key under which a bundle deduplicates items.
pub type DedupKey = (ContextKind, String);

/// One unit of context handed to the generation prompt.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContextItem {
    pub kind: ContextKind,
    /// FQN, simple name or `Type#method(..)` depending on kind
    pub symbol: String,
    pub content: String,
    pub origin: ContextOrigin,
    /// Relevance in `0.0..=1.0`
    pub weight: f32,
}

impl ContextItem {
    pub fn new(
        kind: ContextKind,
        symbol: impl Into<String>,
        content: impl Into<String>,
        origin: ContextOrigin,
        weight: f32,
    ) -> Self {
        Self {
            kind,
            symbol: symbol.into(),
            content: content.into(),
            origin,
            weight: weight.clamp(0.0, 1.0),
        }
    }

    pub fn key(&self) -> DedupKey {
        (self.kind, self.symbol.clone())
    }

    pub fn matches_key(&self, kind: ContextKind, symbol: &str) -> bool {
        self.kind == kind && self.symbol == symbol
    }
}
