//! Error enhancer against a real indexed project.
//!
//! Tests verify:
//! - English and Chinese tool output produce the same symbols and context
//! - Local types get a summary (and an import across packages)
//! - Unknown external types get exactly one generic import suggestion
//! - Enhancing twice with the same diagnostic adds nothing

use std::fs;
use std::path::Path;
use std::sync::Arc;

use unitforge_engine::context::{ContextAssembler, ContextBundle, ContextKind};
use unitforge_engine::diagnostic::{Diagnostic, DiagnosticKind, SymbolLocality, SymbolRole};
use unitforge_engine::enhancer::ErrorEnhancer;
use unitforge_engine::index::ProjectIndex;

fn write(root: &Path, rel: &str, content: &str) {
    let path = root.join(rel);
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, content).unwrap();
}

fn project() -> (tempfile::TempDir, Arc<ProjectIndex>) {
    let dir = tempfile::tempdir().unwrap();
    let root = dir.path();
    write(
        root,
        "src/main/java/com/shop/OrderService.java",
        r#"package com.shop;

public class OrderService {
    private final OrderRepository repository;

    public OrderService(OrderRepository repository) {
        this.repository = repository;
    }

    public long total(String id) {
        return repository.find(id).total();
    }
}
"#,
    );
    write(
        root,
        "src/main/java/com/shop/OrderRepository.java",
        "package com.shop;\n\npublic interface OrderRepository {\n    Order find(String id);\n    void save(Order order);\n}\n",
    );
    write(
        root,
        "src/main/java/com/shop/Order.java",
        "package com.shop;\n\npublic class Order {\n    public long total() { return 0L; }\n}\n",
    );
    write(
        root,
        "src/main/java/com/shop/model/Bar.java",
        "package com.shop.model;\n\npublic class Bar {\n    public Bar(String label) {}\n    public String label() { return \"\"; }\n}\n",
    );

    let (index, report) = ProjectIndex::build(root, &["java".to_string()]).unwrap();
    assert!(report.skipped.is_empty());
    (dir, Arc::new(index))
}

fn initial_bundle(index: &Arc<ProjectIndex>) -> ContextBundle {
    ContextAssembler::new(Arc::clone(index))
        .initial("com.shop.OrderService", "total")
        .unwrap()
}

type SymbolShape = (SymbolRole, String, Option<String>, SymbolLocality);

fn shape(diagnostic: &Diagnostic) -> Vec<SymbolShape> {
    diagnostic
        .symbols
        .iter()
        .map(|s| (s.role, s.name.clone(), s.owner.clone(), s.locality))
        .collect()
}

const LOCALIZED_PAIRS: &[(DiagnosticKind, &str, &str)] = &[
    (
        DiagnosticKind::Compile,
        "OrderServiceTest.java:[12,9] cannot find symbol\n  symbol:   class Foo\n  location: class com.shop.OrderServiceTest",
        "OrderServiceTest.java:[12,9] 找不到符号\n  符号:   类 Foo\n  位置: 类 com.shop.OrderServiceTest",
    ),
    (
        DiagnosticKind::Compile,
        "OrderServiceTest.java:[20,19] cannot find symbol\n  symbol:   method totalOf(long)\n  location: variable repository of type OrderRepository",
        "OrderServiceTest.java:[20,19] 找不到符号\n  符号:   方法 totalOf(long)\n  位置: 类型为OrderRepository的变量 repository",
    ),
    (
        DiagnosticKind::Runtime,
        r#"java.lang.NullPointerException: Cannot invoke "com.shop.Order.total()" because the return value of "com.shop.OrderRepository.find(String)" is null"#,
        r#"java.lang.NullPointerException: 无法调用 "com.shop.Order.total()"，因为 "com.shop.OrderRepository.find(String)" 的返回值为 null"#,
    ),
    (
        DiagnosticKind::Runtime,
        r#"Exception in thread "main" java.lang.IllegalStateException: closed"#,
        r#"线程 "main" 中的异常 java.lang.IllegalStateException: closed"#,
    ),
];

#[test]
fn test_english_and_chinese_output_are_equivalent() {
    let (_dir, index) = project();
    let enhancer = ErrorEnhancer::new(Arc::clone(&index));
    let bundle = initial_bundle(&index);

    for (kind, en, zh) in LOCALIZED_PAIRS {
        let en_diag = enhancer.diagnose(*kind, en);
        let zh_diag = enhancer.diagnose(*kind, zh);

        assert!(!en_diag.symbols.is_empty(), "nothing extracted from: {en}");
        assert_eq!(shape(&en_diag), shape(&zh_diag), "symbols differ for: {en}");
        assert_eq!(
            enhancer.enhance(bundle.clone(), &en_diag),
            enhancer.enhance(bundle.clone(), &zh_diag),
            "context differs for: {en}"
        );
    }
}

#[test]
fn test_each_category_is_recognised() {
    let (_dir, index) = project();
    let enhancer = ErrorEnhancer::new(index);

    let roles: Vec<Vec<SymbolRole>> = LOCALIZED_PAIRS
        .iter()
        .map(|(kind, en, _)| enhancer.diagnose(*kind, en).roles())
        .collect();

    assert_eq!(roles[0], vec![SymbolRole::MissingType]);
    assert_eq!(roles[1], vec![SymbolRole::MissingMethod]);
    assert!(roles[2].contains(&SymbolRole::IllegalNullAssignment));
    assert_eq!(roles[3], vec![SymbolRole::RuntimeExceptionType]);
}

#[test]
fn test_local_type_in_other_package_gets_summary_and_import() {
    let (_dir, index) = project();
    let enhancer = ErrorEnhancer::new(Arc::clone(&index));
    let mut bundle = initial_bundle(&index);

    let diagnostic = enhancer.diagnose(
        DiagnosticKind::Compile,
        "OrderServiceTest.java:[8,5] cannot find symbol\n  symbol:   class Bar\n  location: class OrderServiceTest",
    );
    assert_eq!(diagnostic.symbols[0].locality, SymbolLocality::Local);

    let added = enhancer.enhance_in_place(&mut bundle, &diagnostic);

    assert_eq!(added, 2);
    let summary = bundle.get(ContextKind::ClassSummary, "com.shop.model.Bar").unwrap();
    assert!(summary.content.contains("Bar(String label)"));
    let import = bundle.get(ContextKind::ImportSuggestion, "Bar").unwrap();
    assert_eq!(import.content, "import com.shop.model.Bar;");
}

#[test]
fn test_unknown_external_type_gets_one_generic_import() {
    let (_dir, index) = project();
    let enhancer = ErrorEnhancer::new(Arc::clone(&index));
    let bundle = initial_bundle(&index);
    let before = bundle.len();

    let diagnostic = enhancer.diagnose(DiagnosticKind::Compile, "  symbol:   class Foo");
    assert_eq!(diagnostic.symbols[0].locality, SymbolLocality::External);

    let enhanced = enhancer.enhance(bundle, &diagnostic);

    assert_eq!(enhanced.len(), before + 1);
    let imports: Vec<_> = enhanced.items_of_kind(ContextKind::ImportSuggestion).collect();
    assert_eq!(imports.len(), 1);
    assert_eq!(imports[0].symbol, "Foo");
    assert!(imports[0].content.contains("Add an import for Foo"));
}

#[test]
fn test_static_assertion_helper_gets_static_import() {
    let (_dir, index) = project();
    let enhancer = ErrorEnhancer::new(Arc::clone(&index));
    let mut bundle = initial_bundle(&index);

    let diagnostic = enhancer.diagnose(
        DiagnosticKind::Compile,
        "  symbol:   method assertEquals(long,long)\n  location: class com.shop.OrderServiceTest",
    );
    enhancer.enhance_in_place(&mut bundle, &diagnostic);

    let import = bundle
        .get(ContextKind::ImportSuggestion, "org.junit.jupiter.api.Assertions.*")
        .unwrap();
    assert_eq!(import.content, "import static org.junit.jupiter.api.Assertions.*;");
}

#[test]
fn test_null_return_gets_stub_hint_for_local_owner() {
    let (_dir, index) = project();
    let enhancer = ErrorEnhancer::new(Arc::clone(&index));
    let mut bundle = initial_bundle(&index);

    let (kind, en, _) = LOCALIZED_PAIRS[2];
    let diagnostic = enhancer.diagnose(kind, en);
    enhancer.enhance_in_place(&mut bundle, &diagnostic);

    let hint = bundle.get(ContextKind::StubHint, "OrderRepository.find").unwrap();
    assert!(hint.content.contains("thenReturn"));
    assert!(bundle.contains(ContextKind::FailureNote, "NullPointerException"));
}

#[test]
fn test_enhancement_is_idempotent() {
    let (_dir, index) = project();
    let enhancer = ErrorEnhancer::new(Arc::clone(&index));
    let mut bundle = initial_bundle(&index);

    for (kind, en, _) in LOCALIZED_PAIRS {
        let diagnostic = enhancer.diagnose(*kind, en);
        enhancer.enhance_in_place(&mut bundle, &diagnostic);
        let snapshot = bundle.clone();

        assert_eq!(enhancer.enhance_in_place(&mut bundle, &diagnostic), 0);
        assert_eq!(bundle, snapshot);
    }
}
