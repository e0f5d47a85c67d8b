//! Structural records produced by the Java indexer.
//!
//! All type text (parameter types, return types, supertypes) is kept exactly
//! as written in the source. Generic arguments are never resolved.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Kind of a declared type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TypeKind {
    Class,
    /// Interfaces and annotation types
    Interface,
    /// Java records
    ValueType,
    Enum,
}

impl std::fmt::Display for TypeKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Class => write!(f, "class"),
            Self::Interface => write!(f, "interface"),
            Self::ValueType => write!(f, "record"),
            Self::Enum => write!(f, "enum"),
        }
    }
}

/// Byte and line range of a declaration inside its file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceSpan {
    pub start_byte: usize,
    pub end_byte: usize,
    /// 1-indexed
    pub start_line: usize,
    /// 1-indexed, inclusive
    pub end_line: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Parameter {
    pub name: String,
    /// Raw type text, e.g. `List<Order>` or `String...`
    pub type_name: String,
}

impl std::fmt::Display for Parameter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {}", self.type_name, self.name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldRecord {
    pub name: String,
    pub type_name: String,
    /// Keywords and annotations, as written
    pub modifiers: Vec<String>,
}

impl FieldRecord {
    pub fn is_static(&self) -> bool {
        has_modifier(&self.modifiers, "static")
    }

    pub fn is_final(&self) -> bool {
        has_modifier(&self.modifiers, "final")
    }

    pub fn is_private(&self) -> bool {
        has_modifier(&self.modifiers, "private")
    }

    /// `private final Repo repo`
    pub fn declaration(&self) -> String {
        let keywords: Vec<&str> = self
            .modifiers
            .iter()
            .filter(|m| !m.starts_with('@'))
            .map(String::as_str)
            .collect();
        if keywords.is_empty() {
            format!("{} {}", self.type_name, self.name)
        } else {
            format!("{} {} {}", keywords.join(" "), self.type_name, self.name)
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConstructorRecord {
    pub parameters: Vec<Parameter>,
    pub throws: Vec<String>,
    pub modifiers: Vec<String>,
    /// Implied by Lombok, a record header or a missing explicit constructor
    #[serde(default)]
    pub synthesized: bool,
}

impl ConstructorRecord {
    pub fn is_private(&self) -> bool {
        has_modifier(&self.modifiers, "private")
    }

    /// `public Service(Repo repo) throws IOException`
    pub fn signature(&self, simple_name: &str) -> String {
        let mut sig = String::new();
        for keyword in self.modifiers.iter().filter(|m| !m.starts_with('@')) {
            sig.push_str(keyword);
            sig.push(' ');
        }
        sig.push_str(simple_name);
        sig.push('(');
        sig.push_str(&join_params(&self.parameters));
        sig.push(')');
        if !self.throws.is_empty() {
            sig.push_str(" throws ");
            sig.push_str(&self.throws.join(", "));
        }
        if self.synthesized {
            sig.push_str(" // generated");
        }
        sig
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MethodRecord {
    pub name: String,
    pub parameters: Vec<Parameter>,
    pub return_type: String,
    pub throws: Vec<String>,
    pub modifiers: Vec<String>,
    pub span: SourceSpan,
    /// Full declaration text covered by `span` (signature and body)
    pub source: String,
}

impl MethodRecord {
    pub fn is_public(&self) -> bool {
        has_modifier(&self.modifiers, "public")
    }

    pub fn is_private(&self) -> bool {
        has_modifier(&self.modifiers, "private")
    }

    pub fn is_static(&self) -> bool {
        has_modifier(&self.modifiers, "static")
    }

    /// `public Order find(String id) throws NotFoundException`
    pub fn signature(&self) -> String {
        let mut sig = String::new();
        for keyword in self.modifiers.iter().filter(|m| !m.starts_with('@')) {
            sig.push_str(keyword);
            sig.push(' ');
        }
        sig.push_str(&self.return_type);
        sig.push(' ');
        sig.push_str(&self.name);
        sig.push('(');
        sig.push_str(&join_params(&self.parameters));
        sig.push(')');
        if !self.throws.is_empty() {
            sig.push_str(" throws ");
            sig.push_str(&self.throws.join(", "));
        }
        sig
    }
}

/// Structural metadata for one declared type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TypeRecord {
    /// Unique key within a snapshot, e.g. `com.example.billing.Invoice`
    pub fqn: String,
    pub simple_name: String,
    /// Empty for the default package
    pub package: String,
    pub kind: TypeKind,
    /// Path relative to the project root
    pub file: PathBuf,
    pub modifiers: Vec<String>,
    /// `extends` and `implements` targets, raw text
    pub supertypes: Vec<String>,
    /// Import declarations of the enclosing file, without `import` and `;`
    pub imports: Vec<String>,
    pub fields: Vec<FieldRecord>,
    pub constructors: Vec<ConstructorRecord>,
    pub methods: Vec<MethodRecord>,
    /// FQNs of directly nested types
    pub nested: Vec<String>,
}

impl TypeRecord {
    pub fn methods_named<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a MethodRecord> + 'a {
        self.methods.iter().filter(move |m| m.name == name)
    }

    pub fn has_annotation(&self, name: &str) -> bool {
        self.modifiers.iter().any(|m| {
            m.strip_prefix('@')
                .map(|a| a.split('(').next().unwrap_or(a).trim() == name)
                .unwrap_or(false)
        })
    }

    /// Methods callable from a test in another class.
    ///
    /// Interface members are implicitly public unless marked private.
    pub fn public_methods(&self) -> impl Iterator<Item = &MethodRecord> {
        let implicit = self.kind == TypeKind::Interface;
        self.methods
            .iter()
            .filter(move |m| m.is_public() || (implicit && !m.is_private()))
    }
}

pub(crate) fn has_modifier(modifiers: &[String], keyword: &str) -> bool {
    modifiers.iter().any(|m| m == keyword)
}

fn join_params(params: &[Parameter]) -> String {
    params
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Simple name of a possibly qualified or generic type reference.
///
/// `java.util.List<Order>` → `List`, `Outer.Inner` → `Inner`, `int[]` → `int`.
pub fn simple_name_of(type_text: &str) -> &str {
    let base = type_text.split('<').next().unwrap_or(type_text);
    let base = base.trim_end_matches("...").trim_end_matches("[]").trim();
    base.rsplit('.').next().unwrap_or(base).trim()
}

/// Package part of a fully-qualified name (`a.b.C` → `a.b`).
pub fn package_of(fqn: &str) -> &str {
    fqn.rsplit_once('.').map(|(pkg, _)| pkg).unwrap_or("")
}
