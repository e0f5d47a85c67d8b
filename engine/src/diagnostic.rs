//! Compiler and runtime diagnostics and the symbols extracted from them

use serde::{Deserialize, Serialize};

/// Which verification phase produced a diagnostic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DiagnosticKind {
    Compile,
    Runtime,
}

impl std::fmt::Display for DiagnosticKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Compile => write!(f, "compile"),
            Self::Runtime => write!(f, "runtime"),
        }
    }
}

/// Semantic category of an extracted symbol. Independent of message language.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SymbolRole {
    MissingType,
    MissingMethod,
    IllegalNullAssignment,
    RuntimeExceptionType,
}

impl std::fmt::Display for SymbolRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::MissingType => write!(f, "missing_type"),
            Self::MissingMethod => write!(f, "missing_method"),
            Self::IllegalNullAssignment => write!(f, "illegal_null_assignment"),
            Self::RuntimeExceptionType => write!(f, "runtime_exception_type"),
        }
    }
}

/// Whether a symbol names a type declared in the indexed project.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SymbolLocality {
    Local,
    External,
}

/// Language of the tool output a rule was written for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageLocale {
    En,
    Zh,
    /// JVM class names and stack-trace markers, identical in every locale
    Neutral,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtractedSymbol {
    /// Type or method name as it appeared
    pub name: String,
    pub role: SymbolRole,
    pub locality: SymbolLocality,
    /// Declaring type of a missing or null-returning method, if reported
    #[serde(default)]
    pub owner: Option<String>,
    /// Fully-qualified path when the text carried one
    #[serde(default)]
    pub qualified: Option<String>,
    /// Null came from stubbing a void method
    #[serde(default)]
    pub void_method: bool,
    pub locale: MessageLocale,
}

impl ExtractedSymbol {
    /// Simple name of the owning type, if any.
    pub fn owner_simple_name(&self) -> Option<&str> {
        self.owner
            .as_deref()
            .map(|o| o.rsplit(['.', '$']).next().unwrap_or(o))
    }
}

/// Output of one failed verification, with the symbols it mentions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Diagnostic {
    pub kind: DiagnosticKind,
    pub raw: String,
    pub symbols: Vec<ExtractedSymbol>,
}

impl Diagnostic {
    /// A diagnostic with no extracted symbols yet.
    pub fn new(kind: DiagnosticKind, raw: impl Into<String>) -> Self {
        Self {
            kind,
            raw: raw.into(),
            symbols: Vec::new(),
        }
    }

    pub fn symbols_with_role(&self, role: SymbolRole) -> impl Iterator<Item = &ExtractedSymbol> {
        self.symbols.iter().filter(move |s| s.role == role)
    }

    /// Distinct roles present, in role order.
    pub fn roles(&self) -> Vec<SymbolRole> {
        let mut roles: Vec<SymbolRole> = self.symbols.iter().map(|s| s.role).collect();
        roles.sort();
        roles.dedup();
        roles
    }

    /// First non-empty lines of the raw text, for logs and reports.
    pub fn headline(&self, max_lines: usize) -> String {
        self.raw
            .lines()
            .map(str::trim_end)
            .filter(|l| !l.trim().is_empty())
            .take(max_lines)
            .collect::<Vec<_>>()
            .join("\n")
    }
}
