//! Java structural extraction with tree-sitter-java.
//!
//! Parses one source file and produces a `TypeRecord` per declared type
//! (top-level and nested): package, imports, supertypes, fields,
//! constructors and methods with their raw type text and source spans.
//!
//! The extraction is purely syntactic. A file whose syntax tree contains
//! error or missing nodes is rejected as a whole so the index never holds a
//! half-understood type.

use std::path::{Path, PathBuf};

use tree_sitter::{Node, Parser};

use crate::error::ParseFailure;
use crate::index::types::{
    ConstructorRecord, FieldRecord, MethodRecord, Parameter, SourceSpan, TypeKind, TypeRecord,
};

/// Lombok annotations that imply generated constructors.
const LOMBOK_NO_ARGS: &str = "NoArgsConstructor";
const LOMBOK_REQUIRED_ARGS: &str = "RequiredArgsConstructor";
const LOMBOK_ALL_ARGS: &str = "AllArgsConstructor";
const LOMBOK_DATA: &str = "Data";
const LOMBOK_VALUE: &str = "Value";
const LOMBOK_UTILITY: &str = "UtilityClass";

/// All types declared in a single Java file.
#[derive(Debug, Clone, Default)]
pub struct JavaFileIndex {
    /// Path relative to the project root
    pub file: PathBuf,
    pub package: String,
    pub imports: Vec<String>,
    /// Outer types precede the types nested in them
    pub types: Vec<TypeRecord>,
}

impl JavaFileIndex {
    /// Parse a Java source file and extract every declared type.
    pub fn parse(file: impl Into<PathBuf>, source: &str) -> Result<Self, ParseFailure> {
        let file = file.into();

        let mut parser = Parser::new();
        parser
            .set_language(&tree_sitter_java::LANGUAGE.into())
            .map_err(|e| ParseFailure::new(&file, format!("failed to load Java grammar: {e}")))?;

        let tree = parser
            .parse(source, None)
            .ok_or_else(|| ParseFailure::new(&file, "parser returned no syntax tree"))?;

        let root = tree.root_node();
        if root.has_error() {
            let line = first_error_line(root).unwrap_or(1);
            return Err(ParseFailure::new(
                &file,
                format!("syntax error near line {line}"),
            ));
        }

        let src = source.as_bytes();
        let mut package = String::new();
        let mut imports = Vec::new();

        let mut cursor = root.walk();
        for child in root.named_children(&mut cursor) {
            match child.kind() {
                "package_declaration" => {
                    package = package_name(child, src);
                }
                "import_declaration" => {
                    if let Some(import) = import_path(child, src) {
                        imports.push(import);
                    }
                }
                _ => {}
            }
        }

        let extractor = Extractor {
            file: &file,
            package: &package,
            imports: &imports,
            src,
        };

        let mut types = Vec::new();
        for child in root.named_children(&mut cursor) {
            if is_type_declaration(child.kind()) {
                extractor.extract_type(child, None, &mut types);
            }
        }

        Ok(Self {
            file,
            package,
            imports,
            types,
        })
    }

    /// Read and parse a file below `root`. IO and encoding problems become
    /// parse failures for that file only.
    pub fn from_path(root: &Path, path: &Path) -> Result<Self, ParseFailure> {
        let relative = path.strip_prefix(root).unwrap_or(path).to_path_buf();
        let bytes = std::fs::read(path).map_err(|e| ParseFailure::new(&relative, e.to_string()))?;
        let source = String::from_utf8(bytes)
            .map_err(|_| ParseFailure::new(&relative, "file is not valid UTF-8"))?;
        Self::parse(relative, &source)
    }

    /// Find a type declared in this file by simple name.
    pub fn find_by_name(&self, simple_name: &str) -> Option<&TypeRecord> {
        self.types.iter().find(|t| t.simple_name == simple_name)
    }
}

fn is_type_declaration(kind: &str) -> bool {
    matches!(
        kind,
        "class_declaration"
            | "interface_declaration"
            | "enum_declaration"
            | "record_declaration"
            | "annotation_type_declaration"
    )
}

/// Per-file state shared by the recursive extraction.
struct Extractor<'a> {
    file: &'a Path,
    package: &'a str,
    imports: &'a [String],
    src: &'a [u8],
}

impl Extractor<'_> {
    /// Extract a type declaration and everything nested in it.
    ///
    /// Returns the FQN of the extracted type.
    fn extract_type(&self, node: Node, outer: Option<&str>, out: &mut Vec<TypeRecord>) -> Option<String> {
        let name = node
            .child_by_field_name("name")
            .map(|n| text(n, self.src))?;

        let fqn = match outer {
            Some(outer) => format!("{outer}.{name}"),
            None if self.package.is_empty() => name.clone(),
            None => format!("{}.{}", self.package, name),
        };

        let kind = match node.kind() {
            "interface_declaration" | "annotation_type_declaration" => TypeKind::Interface,
            "enum_declaration" => TypeKind::Enum,
            "record_declaration" => TypeKind::ValueType,
            _ => TypeKind::Class,
        };

        let mut record = TypeRecord {
            fqn: fqn.clone(),
            simple_name: name,
            package: self.package.to_string(),
            kind,
            file: self.file.to_path_buf(),
            modifiers: modifiers_of(node, self.src),
            supertypes: supertypes_of(node, self.src),
            imports: self.imports.to_vec(),
            fields: Vec::new(),
            constructors: Vec::new(),
            methods: Vec::new(),
            nested: Vec::new(),
        };

        // Record components become private final fields plus the canonical constructor.
        if kind == TypeKind::ValueType {
            if let Some(params) = node.child_by_field_name("parameters") {
                let components = parameters_of(params, self.src);
                for component in &components {
                    record.fields.push(FieldRecord {
                        name: component.name.clone(),
                        type_name: component.type_name.clone(),
                        modifiers: vec!["private".into(), "final".into()],
                    });
                }
                record.constructors.push(ConstructorRecord {
                    parameters: components,
                    throws: Vec::new(),
                    modifiers: vec!["public".into()],
                    synthesized: true,
                });
            }
        }

        let mut nested_records = Vec::new();
        if let Some(body) = node.child_by_field_name("body") {
            self.extract_members(body, &mut record, &mut nested_records);
        }

        synthesize_constructors(&mut record);

        out.push(record);
        out.extend(nested_records);
        Some(fqn)
    }

    fn extract_members(&self, body: Node, record: &mut TypeRecord, nested_out: &mut Vec<TypeRecord>) {
        let mut cursor = body.walk();
        for member in body.named_children(&mut cursor) {
            match member.kind() {
                "field_declaration" | "constant_declaration" => {
                    record.fields.extend(self.extract_fields(member));
                }
                "method_declaration" => {
                    if let Some(method) = self.extract_method(member) {
                        record.methods.push(method);
                    }
                }
                "constructor_declaration" => {
                    record.constructors.push(ConstructorRecord {
                        parameters: member
                            .child_by_field_name("parameters")
                            .map(|p| parameters_of(p, self.src))
                            .unwrap_or_default(),
                        throws: throws_of(member, self.src),
                        modifiers: modifiers_of(member, self.src),
                        synthesized: false,
                    });
                }
                "enum_constant" => {
                    if let Some(name) = member.child_by_field_name("name") {
                        record.fields.push(FieldRecord {
                            name: text(name, self.src),
                            type_name: record.simple_name.clone(),
                            modifiers: vec!["public".into(), "static".into(), "final".into()],
                        });
                    }
                }
                "enum_body_declarations" => {
                    self.extract_members(member, record, nested_out);
                }
                kind if is_type_declaration(kind) => {
                    let outer = record.fqn.clone();
                    if let Some(nested) = self.extract_type(member, Some(&outer), nested_out) {
                        record.nested.push(nested);
                    }
                }
                _ => {}
            }
        }
    }

    fn extract_fields(&self, node: Node) -> Vec<FieldRecord> {
        let Some(type_node) = node.child_by_field_name("type") else {
            return Vec::new();
        };
        let type_name = type_text(type_node, self.src);
        let modifiers = modifiers_of(node, self.src);

        let mut cursor = node.walk();
        node.children_by_field_name("declarator", &mut cursor)
            .filter_map(|declarator| declarator.child_by_field_name("name"))
            .map(|name| FieldRecord {
                name: text(name, self.src),
                type_name: type_name.clone(),
                modifiers: modifiers.clone(),
            })
            .collect()
    }

    fn extract_method(&self, node: Node) -> Option<MethodRecord> {
        let name = node.child_by_field_name("name").map(|n| text(n, self.src))?;
        let return_type = node
            .child_by_field_name("type")
            .map(|t| type_text(t, self.src))
            .unwrap_or_else(|| "void".to_string());

        Some(MethodRecord {
            name,
            parameters: node
                .child_by_field_name("parameters")
                .map(|p| parameters_of(p, self.src))
                .unwrap_or_default(),
            return_type,
            throws: throws_of(node, self.src),
            modifiers: modifiers_of(node, self.src),
            span: span_of(node),
            source: node.utf8_text(self.src).unwrap_or("").to_string(),
        })
    }
}

/// Add constructors implied by Lombok annotations or by the absence of any
/// explicit constructor.
fn synthesize_constructors(record: &mut TypeRecord) {
    if record.kind != TypeKind::Class {
        return;
    }

    let explicit = !record.constructors.is_empty();
    let instance_fields: Vec<&FieldRecord> = record.fields.iter().filter(|f| !f.is_static()).collect();

    let mut generated: Vec<Vec<Parameter>> = Vec::new();
    if record.has_annotation(LOMBOK_NO_ARGS) {
        generated.push(Vec::new());
    }
    if record.has_annotation(LOMBOK_REQUIRED_ARGS) || (record.has_annotation(LOMBOK_DATA) && !explicit) {
        generated.push(
            instance_fields
                .iter()
                .filter(|f| f.is_final())
                .map(|f| field_param(f))
                .collect(),
        );
    }
    if record.has_annotation(LOMBOK_ALL_ARGS) || (record.has_annotation(LOMBOK_VALUE) && !explicit) {
        generated.push(instance_fields.iter().map(|f| field_param(f)).collect());
    }

    for parameters in generated {
        let duplicate = record.constructors.iter().any(|c| c.parameters == parameters);
        if !duplicate {
            record.constructors.push(ConstructorRecord {
                parameters,
                throws: Vec::new(),
                modifiers: vec!["public".into()],
                synthesized: true,
            });
        }
    }

    if record.constructors.is_empty() && !record.has_annotation(LOMBOK_UTILITY) {
        record.constructors.push(ConstructorRecord {
            parameters: Vec::new(),
            throws: Vec::new(),
            modifiers: vec!["public".into()],
            synthesized: true,
        });
    }
}

fn field_param(field: &FieldRecord) -> Parameter {
    Parameter {
        name: field.name.clone(),
        type_name: field.type_name.clone(),
    }
}

fn package_name(node: Node, src: &[u8]) -> String {
    let mut cursor = node.walk();
    let found = node
        .named_children(&mut cursor)
        .find(|c| matches!(c.kind(), "scoped_identifier" | "identifier"))
        .map(|c| text(c, src))
        .unwrap_or_default();
    found
}

/// `import static org.junit.Assert.*;` → `static org.junit.Assert.*`
fn import_path(node: Node, src: &[u8]) -> Option<String> {
    let raw = node.utf8_text(src).ok()?;
    let path = raw
        .trim()
        .strip_prefix("import")?
        .trim()
        .trim_end_matches(';')
        .trim();
    if path.is_empty() {
        None
    } else {
        Some(collapse_whitespace(path))
    }
}

/// Keywords and annotations from a declaration's `modifiers` child.
fn modifiers_of(node: Node, src: &[u8]) -> Vec<String> {
    let mut cursor = node.walk();
    let Some(modifiers) = node.children(&mut cursor).find(|c| c.kind() == "modifiers") else {
        return Vec::new();
    };

    let mut inner = modifiers.walk();
    let found = modifiers
        .children(&mut inner)
        .map(|m| collapse_whitespace(&text(m, src)))
        .filter(|m| !m.is_empty())
        .collect();
    found
}

/// Targets of `extends` and `implements`, in declaration order.
fn supertypes_of(node: Node, src: &[u8]) -> Vec<String> {
    let mut supertypes = Vec::new();
    let mut cursor = node.walk();
    for child in node.children(&mut cursor) {
        match child.kind() {
            "superclass" => {
                if let Some(ty) = child.named_child(0) {
                    supertypes.push(type_text(ty, src));
                }
            }
            "super_interfaces" | "extends_interfaces" => {
                let mut inner = child.walk();
                for list in child.named_children(&mut inner).filter(|c| c.kind() == "type_list") {
                    let mut list_cursor = list.walk();
                    for ty in list.named_children(&mut list_cursor) {
                        supertypes.push(type_text(ty, src));
                    }
                }
            }
            _ => {}
        }
    }
    supertypes
}

fn parameters_of(node: Node, src: &[u8]) -> Vec<Parameter> {
    let mut params = Vec::new();
    let mut cursor = node.walk();
    for param in node.named_children(&mut cursor) {
        match param.kind() {
            "formal_parameter" => {
                let type_name = param.child_by_field_name("type").map(|t| type_text(t, src));
                let name = param.child_by_field_name("name").map(|n| text(n, src));
                if let (Some(type_name), Some(name)) = (type_name, name) {
                    params.push(Parameter { name, type_name });
                }
            }
            "spread_parameter" => {
                let mut inner = param.walk();
                let mut type_name = None;
                let mut name = None;
                for part in param.named_children(&mut inner) {
                    match part.kind() {
                        "modifiers" => {}
                        "variable_declarator" => {
                            name = part.child_by_field_name("name").map(|n| text(n, src));
                        }
                        _ if type_name.is_none() => type_name = Some(type_text(part, src)),
                        _ => {}
                    }
                }
                if let (Some(type_name), Some(name)) = (type_name, name) {
                    params.push(Parameter {
                        name,
                        type_name: format!("{type_name}..."),
                    });
                }
            }
            _ => {}
        }
    }
    params
}

fn throws_of(node: Node, src: &[u8]) -> Vec<String> {
    let mut cursor = node.walk();
    let Some(throws) = node.children(&mut cursor).find(|c| c.kind() == "throws") else {
        return Vec::new();
    };
    let mut inner = throws.walk();
    let found = throws
        .named_children(&mut inner)
        .map(|t| type_text(t, src))
        .collect();
    found
}

fn span_of(node: Node) -> SourceSpan {
    SourceSpan {
        start_byte: node.start_byte(),
        end_byte: node.end_byte(),
        start_line: node.start_position().row + 1,
        end_line: node.end_position().row + 1,
    }
}

/// 1-indexed line of the first error or missing node, depth-first.
fn first_error_line(node: Node) -> Option<usize> {
    if node.is_error() || node.is_missing() {
        return Some(node.start_position().row + 1);
    }
    let mut cursor = node.walk();
    for child in node.children(&mut cursor) {
        if child.has_error() || child.is_missing() {
            if let Some(line) = first_error_line(child) {
                return Some(line);
            }
        }
    }
    None
}

fn text(node: Node, src: &[u8]) -> String {
    node.utf8_text(src).unwrap_or("").to_string()
}

fn type_text(node: Node, src: &[u8]) -> String {
    collapse_whitespace(&text(node, src))
}

fn collapse_whitespace(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    const ORDER_SERVICE: &str = r#"
package com.example.orders;

import java.util.List;
import java.util.Optional;
import static org.junit.jupiter.api.Assertions.*;

/**
 * Coordinates order lookups.
 */
@Service
public class OrderService extends BaseService implements Auditable, Closeable {
    private static final int LIMIT = 10;
    private final OrderRepository repository;
    private final PriceCalculator calculator, fallback;

    public OrderService(OrderRepository repository, PriceCalculator calculator) {
        this.repository = repository;
        this.calculator = calculator;
        this.fallback = calculator;
    }

    public Optional<Order> find(String id) throws NotFoundException {
        return repository.findById(id);
    }

    @Override
    public List<Order> recent(int days, String... tags) {
        return repository.recent(days);
    }

    private void audit(Order order) {}

    public static class Summary {
        private final int count;
        public int count() { return count; }
    }

    public enum Status { OPEN, CLOSED }
}
"#;

    #[test]
    fn test_parse_extracts_package_and_imports() {
        let index = JavaFileIndex::parse("src/OrderService.java", ORDER_SERVICE).unwrap();

        assert_eq!(index.package, "com.example.orders");
        assert_eq!(
            index.imports,
            vec![
                "java.util.List",
                "java.util.Optional",
                "static org.junit.jupiter.api.Assertions.*"
            ]
        );
    }

    #[test]
    fn test_parse_extracts_type_structure() {
        let index = JavaFileIndex::parse("src/OrderService.java", ORDER_SERVICE).unwrap();
        let service = index.find_by_name("OrderService").unwrap();

        assert_eq!(service.fqn, "com.example.orders.OrderService");
        assert_eq!(service.kind, TypeKind::Class);
        assert_eq!(service.supertypes, vec!["BaseService", "Auditable", "Closeable"]);
        assert!(service.has_annotation("Service"));
        assert!(service.modifiers.contains(&"public".to_string()));

        let field_names: Vec<&str> = service.fields.iter().map(|f| f.name.as_str()).collect();
        assert_eq!(field_names, vec!["LIMIT", "repository", "calculator", "fallback"]);
        assert_eq!(service.fields[3].type_name, "PriceCalculator");

        assert_eq!(service.constructors.len(), 1);
        assert!(!service.constructors[0].synthesized);
        assert_eq!(service.constructors[0].parameters.len(), 2);

        let method_names: Vec<&str> = service.methods.iter().map(|m| m.name.as_str()).collect();
        assert_eq!(method_names, vec!["find", "recent", "audit"]);
    }

    #[test]
    fn test_method_details() {
        let index = JavaFileIndex::parse("src/OrderService.java", ORDER_SERVICE).unwrap();
        let service = index.find_by_name("OrderService").unwrap();

        let find = service.methods_named("find").next().unwrap();
        assert_eq!(find.return_type, "Optional<Order>");
        assert_eq!(find.throws, vec!["NotFoundException"]);
        assert!(find.source.contains("repository.findById(id)"));
        assert!(find.span.end_line > find.span.start_line);

        let recent = service.methods_named("recent").next().unwrap();
        assert_eq!(recent.parameters[1].type_name, "String...");
        assert!(recent.modifiers.contains(&"@Override".to_string()));
        assert_eq!(
            recent.signature(),
            "public List<Order> recent(int days, String... tags)"
        );
    }

    #[test]
    fn test_nested_types_are_indexed() {
        let index = JavaFileIndex::parse("src/OrderService.java", ORDER_SERVICE).unwrap();
        let service = index.find_by_name("OrderService").unwrap();

        assert_eq!(
            service.nested,
            vec![
                "com.example.orders.OrderService.Summary",
                "com.example.orders.OrderService.Status"
            ]
        );

        let status = index.find_by_name("Status").unwrap();
        assert_eq!(status.kind, TypeKind::Enum);
        assert_eq!(status.fields.len(), 2);

        // No explicit constructor: implicit default one is recorded
        let summary = index.find_by_name("Summary").unwrap();
        assert_eq!(summary.constructors.len(), 1);
        assert!(summary.constructors[0].synthesized);
    }

    #[test]
    fn test_lombok_constructors() {
        let source = r#"
package com.example;

@RequiredArgsConstructor
@NoArgsConstructor
public class Handler {
    private final Gateway gateway;
    private final Clock clock;
    private String label;
    private static final String NAME = "h";
}
"#;
        let index = JavaFileIndex::parse("Handler.java", source).unwrap();
        let handler = index.find_by_name("Handler").unwrap();

        let arities: Vec<usize> = handler
            .constructors
            .iter()
            .map(|c| c.parameters.len())
            .collect();
        assert_eq!(arities, vec![0, 2]);
        assert!(handler.constructors.iter().all(|c| c.synthesized));
        assert_eq!(
            handler.constructors[1].signature("Handler"),
            "public Handler(Gateway gateway, Clock clock) // generated"
        );
    }

    #[test]
    fn test_record_components() {
        let source = "package com.example;\npublic record Money(long cents, String currency) {}\n";
        let index = JavaFileIndex::parse("Money.java", source).unwrap();
        let money = index.find_by_name("Money").unwrap();

        assert_eq!(money.kind, TypeKind::ValueType);
        assert_eq!(money.fields.len(), 2);
        assert_eq!(money.constructors[0].parameters[1].type_name, "String");
    }

    #[test]
    fn test_interface_methods() {
        let source = r#"
package com.example;
public interface Gateway extends AutoCloseable {
    String send(Message message) throws GatewayException;
}
"#;
        let index = JavaFileIndex::parse("Gateway.java", source).unwrap();
        let gateway = index.find_by_name("Gateway").unwrap();

        assert_eq!(gateway.kind, TypeKind::Interface);
        assert_eq!(gateway.supertypes, vec!["AutoCloseable"]);
        assert!(gateway.constructors.is_empty());
        assert_eq!(gateway.public_methods().count(), 1);
    }

    #[test]
    fn test_default_package() {
        let index = JavaFileIndex::parse("Main.java", "class Main {}").unwrap();
        assert_eq!(index.types[0].fqn, "Main");
        assert_eq!(index.types[0].package, "");
    }

    #[test]
    fn test_syntax_error_rejects_file() {
        let source = "package a;\npublic class Broken {\n  void run( {\n}\n";
        let failure = JavaFileIndex::parse("Broken.java", source).unwrap_err();
        assert_eq!(failure.file, PathBuf::from("Broken.java"));
        assert!(failure.reason.contains("syntax error"));
    }

    #[test]
    fn test_empty_source() {
        let index = JavaFileIndex::parse("Empty.java", "").unwrap();
        assert!(index.types.is_empty());
    }
}
