//! Compact text renderings of indexed types, plus type-reference helpers.

use crate::context::item::{ContextItem, ContextKind, ContextOrigin};
use crate::index::types::{TypeKind, TypeRecord};

const PRIMITIVES: &[&str] = &[
    "void", "boolean", "byte", "char", "short", "int", "long", "float", "double", "var",
];

/// `java.lang` types that never need context.
const JAVA_LANG_VALUES: &[&str] = &[
    "String", "Object", "Boolean", "Byte", "Character", "Short", "Integer", "Long", "Float",
    "Double", "Number", "Void", "CharSequence", "StringBuilder", "Class", "Iterable",
    "Exception", "RuntimeException", "Throwable", "Error",
];

/// JDK containers and value types that tests construct directly.
const JDK_VALUES: &[&str] = &[
    "List", "ArrayList", "LinkedList", "Map", "HashMap", "LinkedHashMap", "TreeMap", "Set",
    "HashSet", "LinkedHashSet", "TreeSet", "Collection", "Optional", "Iterator", "Stream",
    "BigDecimal", "BigInteger", "UUID", "LocalDate", "LocalDateTime", "LocalTime", "Instant",
    "Duration", "ZonedDateTime", "OffsetDateTime", "Date",
];

/// Skipped outright: primitives and `java.lang` values.
pub fn is_builtin(simple_name: &str) -> bool {
    PRIMITIVES.contains(&simple_name) || JAVA_LANG_VALUES.contains(&simple_name)
}

/// JDK types a test can instantiate; no test double note needed.
pub fn is_jdk_value(simple_name: &str) -> bool {
    JDK_VALUES.contains(&simple_name)
}

/// Type names referenced by a type expression, outermost first.
///
/// Generic arguments and array element types are unwrapped; wildcards,
/// bounds keywords and single-letter type variables are dropped.
/// `Map<String, List<? extends Order>>[]` → `Map`, `String`, `List`, `Order`.
pub fn referenced_types(type_text: &str) -> Vec<String> {
    let mut names = Vec::new();
    for token in type_text.split(|c: char| !(c.is_alphanumeric() || c == '_' || c == '.' || c == '$')) {
        let token = token.trim_matches('.');
        if token.is_empty() || matches!(token, "extends" | "super" | "final") {
            continue;
        }
        // Type variables
        let simple = token.rsplit('.').next().unwrap_or(token);
        if simple.len() == 1 && simple.chars().all(|c| c.is_ascii_uppercase()) {
            continue;
        }
        if !names.iter().any(|n| n == token) {
            names.push(token.to_string());
        }
    }
    names
}

/// Constructors and public methods of a project type.
pub fn class_summary(record: &TypeRecord) -> String {
    let mut out = format!("{} {}", record.kind, record.fqn);
    if !record.supertypes.is_empty() {
        out.push_str(" : ");
        out.push_str(&record.supertypes.join(", "));
    }
    out.push('\n');

    if record.kind == TypeKind::Enum {
        let constants: Vec<&str> = record
            .fields
            .iter()
            .filter(|f| f.type_name == record.simple_name && f.is_static())
            .map(|f| f.name.as_str())
            .collect();
        if !constants.is_empty() {
            out.push_str(&format!("  constants: {}\n", constants.join(", ")));
        }
    }

    let constructors: Vec<String> = record
        .constructors
        .iter()
        .filter(|c| !c.is_private())
        .map(|c| c.signature(&record.simple_name))
        .collect();
    if !constructors.is_empty() {
        out.push_str("  constructors:\n");
        for sig in constructors {
            out.push_str(&format!("    {sig}\n"));
        }
    }

    let methods: Vec<String> = record.public_methods().map(|m| m.signature()).collect();
    if !methods.is_empty() {
        out.push_str("  public methods:\n");
        for sig in methods {
            out.push_str(&format!("    {sig}\n"));
        }
    }
    out
}

/// Class-summary item keyed by FQN. Shared by the assembler and enhancer so
/// both produce the same key for the same type.
pub fn class_summary_item(record: &TypeRecord, origin: ContextOrigin, weight: f32) -> ContextItem {
    ContextItem::new(
        ContextKind::ClassSummary,
        record.fqn.clone(),
        class_summary(record),
        origin,
        weight,
    )
}

/// Constructors and fields of the type under test.
pub fn type_members(record: &TypeRecord) -> String {
    let mut out = format!("{} {}\n", record.kind, record.fqn);

    if !record.constructors.is_empty() {
        out.push_str("  constructors:\n");
        for ctor in &record.constructors {
            out.push_str(&format!("    {}\n", ctor.signature(&record.simple_name)));
        }
    }
    if !record.fields.is_empty() {
        out.push_str("  fields:\n");
        for field in &record.fields {
            out.push_str(&format!("    {}\n", field.declaration()));
        }
    }
    let annotations: Vec<&str> = record
        .modifiers
        .iter()
        .filter(|m| m.starts_with('@'))
        .map(String::as_str)
        .collect();
    if !annotations.is_empty() {
        out.push_str(&format!("  annotations: {}\n", annotations.join(" ")));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::index::java_parser::JavaFileIndex;

    #[test]
    fn test_referenced_types_unwraps_generics() {
        assert_eq!(
            referenced_types("Map<String, List<? extends Order>>[]"),
            vec!["Map", "String", "List", "Order"]
        );
        assert_eq!(referenced_types("Repository<T, Long>"), vec!["Repository", "Long"]);
        assert_eq!(referenced_types("com.a.Clock"), vec!["com.a.Clock"]);
        assert_eq!(referenced_types("int"), vec!["int"]);
    }

    #[test]
    fn test_builtin_and_jdk_values() {
        assert!(is_builtin("int"));
        assert!(is_builtin("String"));
        assert!(!is_builtin("List"));
        assert!(is_jdk_value("List"));
        assert!(!is_jdk_value("PaymentGateway"));
    }

    #[test]
    fn test_class_summary_hides_private_members() {
        let source = r#"
package com.a;
public class Bar {
    public Bar(int seed) {}
    private Bar() {}
    public int total() { return 0; }
    private void helper() {}
}
"#;
        let index = JavaFileIndex::parse("Bar.java", source).unwrap();
        let summary = class_summary(&index.types[0]);

        assert!(summary.starts_with("class com.a.Bar\n"));
        assert!(summary.contains("public Bar(int seed)"));
        assert!(summary.contains("public int total()"));
        assert!(!summary.contains("helper"));
        assert!(!summary.contains("private Bar()"));
    }

    #[test]
    fn test_type_members_lists_fields() {
        let source = "package com.a;\n@Service\npublic class S { private final Repo repo; public S(Repo repo) { this.repo = repo; } }";
        let index = JavaFileIndex::parse("S.java", source).unwrap();
        let members = type_members(&index.types[0]);

        assert!(members.contains("public S(Repo repo)"));
        assert!(members.contains("private final Repo repo"));
        assert!(members.contains("annotations: @Service"));
    }
}
