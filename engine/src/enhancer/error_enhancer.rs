//! Diagnostic-driven context synthesis.
//!
//! Every extracted symbol becomes zero or more context items keyed exactly
//! like the assembler's, so feeding the same diagnostic twice adds nothing.

use std::sync::Arc;

use tracing::debug;

use crate::context::bundle::ContextBundle;
use crate::context::item::{ContextItem, ContextKind, ContextOrigin};
use crate::context::summary::{class_summary_item, is_builtin};
use crate::diagnostic::{Diagnostic, DiagnosticKind, ExtractedSymbol, SymbolLocality, SymbolRole};
use crate::enhancer::imports::{known_type, static_helper};
use crate::enhancer::rules::{self, RuleMatch};
use crate::index::project::ProjectIndex;
use crate::index::types::TypeRecord;

pub const WEIGHT_DIAGNOSTIC_SUMMARY: f32 = 0.8;
pub const WEIGHT_CONCRETE_IMPORT: f32 = 0.9;
pub const WEIGHT_GENERIC_IMPORT: f32 = 0.4;
pub const WEIGHT_STUB_HINT: f32 = 0.85;
pub const WEIGHT_FAILURE_NOTE: f32 = 0.6;

/// Turns failed-verification output into extra context for the next round.
pub struct ErrorEnhancer {
    index: Arc<ProjectIndex>,
}

impl ErrorEnhancer {
    pub fn new(index: Arc<ProjectIndex>) -> Self {
        Self { index }
    }

    /// Run the rule table over `raw` and classify each hit against the index.
    pub fn diagnose(&self, kind: DiagnosticKind, raw: &str) -> Diagnostic {
        let symbols = rules::apply(raw)
            .into_iter()
            .map(|hit| self.classify(hit))
            .collect();
        Diagnostic {
            kind,
            raw: raw.to_string(),
            symbols,
        }
    }

    fn classify(&self, hit: RuleMatch) -> ExtractedSymbol {
        let mut qualified = hit.qualified;

        let subject: Option<String> = match hit.role {
            SymbolRole::MissingType | SymbolRole::RuntimeExceptionType => Some(hit.name.clone()),
            SymbolRole::MissingMethod => {
                if let Some(class) = static_helper(&hit.name) {
                    qualified = Some(format!("{class}.{}", hit.name));
                    None
                } else {
                    hit.owner.as_deref().map(simple_of)
                }
            }
            SymbolRole::IllegalNullAssignment => hit.owner.as_deref().map(simple_of),
        };

        let locality = match subject {
            Some(ref name) if self.index.is_local(name) => SymbolLocality::Local,
            _ => SymbolLocality::External,
        };

        ExtractedSymbol {
            name: hit.name,
            role: hit.role,
            locality,
            owner: hit.owner,
            qualified,
            void_method: hit.void_method,
            locale: hit.locale,
        }
    }

    /// Add items for every symbol in `diagnostic`. Returns how many were new.
    pub fn enhance_in_place(&self, bundle: &mut ContextBundle, diagnostic: &Diagnostic) -> usize {
        let origin = match diagnostic.kind {
            DiagnosticKind::Compile => ContextOrigin::CompileDiagnostic,
            DiagnosticKind::Runtime => ContextOrigin::RuntimeDiagnostic,
        };
        let near = bundle.target_package().to_string();

        let mut added = 0;
        for symbol in &diagnostic.symbols {
            for item in self.items_for(symbol, &near, origin) {
                if bundle.insert(item) {
                    added += 1;
                }
            }
        }

        debug!(kind = %diagnostic.kind, symbols = diagnostic.symbols.len(), added, "Enhanced context from diagnostic");
        added
    }

    /// Owned variant of [`Self::enhance_in_place`].
    pub fn enhance(&self, mut bundle: ContextBundle, diagnostic: &Diagnostic) -> ContextBundle {
        self.enhance_in_place(&mut bundle, diagnostic);
        bundle
    }

    fn items_for(&self, symbol: &ExtractedSymbol, near: &str, origin: ContextOrigin) -> Vec<ContextItem> {
        match symbol.role {
            SymbolRole::MissingType => self.missing_type(symbol, near, origin),
            SymbolRole::MissingMethod => self.missing_method(symbol, near, origin),
            SymbolRole::IllegalNullAssignment => self.illegal_null(symbol, near, origin),
            SymbolRole::RuntimeExceptionType => self.runtime_exception(symbol, near, origin),
        }
    }

    fn local_type(&self, name: &str, near: &str) -> Option<&TypeRecord> {
        self.index.lookup(name, Some(near))
    }

    fn missing_type(&self, symbol: &ExtractedSymbol, near: &str, origin: ContextOrigin) -> Vec<ContextItem> {
        let mut items = Vec::new();

        if symbol.locality == SymbolLocality::Local {
            let lookup_name = symbol.qualified.as_deref().unwrap_or(&symbol.name);
            if let Some(record) = self.local_type(lookup_name, near) {
                items.push(class_summary_item(record, origin, WEIGHT_DIAGNOSTIC_SUMMARY));
                if !record.package.is_empty() && record.package != near {
                    items.push(import_item(&symbol.name, &record.fqn, origin, WEIGHT_CONCRETE_IMPORT));
                }
                return items;
            }
        }

        match symbol.qualified.as_deref().or_else(|| known_type(&symbol.name)) {
            Some(path) => items.push(import_item(&symbol.name, path, origin, WEIGHT_CONCRETE_IMPORT)),
            None => items.push(ContextItem::new(
                ContextKind::ImportSuggestion,
                symbol.name.clone(),
                format!(
                    "// {name} could not be resolved. Add an import for {name}, or use a type that \
                     exists in the project or its declared dependencies.",
                    name = symbol.name
                ),
                origin,
                WEIGHT_GENERIC_IMPORT,
            )),
        }
        items
    }

    fn missing_method(&self, symbol: &ExtractedSymbol, near: &str, origin: ContextOrigin) -> Vec<ContextItem> {
        if let Some(class) = static_helper(&symbol.name) {
            let path = format!("{class}.*");
            return vec![ContextItem::new(
                ContextKind::ImportSuggestion,
                path.clone(),
                format!("import static {path};"),
                origin,
                WEIGHT_CONCRETE_IMPORT,
            )];
        }

        let owner = symbol.owner_simple_name().unwrap_or("the receiver");
        let mut items = Vec::new();

        if symbol.locality == SymbolLocality::Local {
            if let Some(record) = symbol.owner.as_deref().and_then(|o| self.local_type(o, near)) {
                items.push(class_summary_item(record, origin, WEIGHT_DIAGNOSTIC_SUMMARY));
            }
        }

        items.push(ContextItem::new(
            ContextKind::FailureNote,
            format!("{owner}#{}", symbol.name),
            format!(
                "{owner} does not declare a method named {name}. Call only methods that appear \
                 in the signatures above; do not invent helpers.",
                name = symbol.name
            ),
            origin,
            WEIGHT_FAILURE_NOTE,
        ));
        items
    }

    fn illegal_null(&self, symbol: &ExtractedSymbol, near: &str, origin: ContextOrigin) -> Vec<ContextItem> {
        let mut items = Vec::new();
        let name = &symbol.name;
        let target = match symbol.owner_simple_name() {
            Some(owner) => format!("{owner}.{name}"),
            None => name.clone(),
        };

        let content = if symbol.void_method {
            if name == "void" {
                "A void method was used as a value, most likely inside when(...). Stub void \
                 collaborator methods with doNothing().when(mock).method(..) or \
                 doThrow(..).when(mock).method(..)."
                    .to_string()
            } else {
                format!(
                    "{name}(..) returns void and cannot be used inside when(...). Stub it with \
                     doNothing().when(mock).{name}(..) or doThrow(..).when(mock).{name}(..)."
                )
            }
        } else if is_builtin(name) && name.chars().all(|c| c.is_ascii_lowercase()) {
            format!(
                "null was used where a {name} is required. Stub collaborator methods returning \
                 {name} with a concrete value instead of null."
            )
        } else {
            format!(
                "{target}(..) returned null during the test. Configure an explicit stub such as \
                 when(mock.{name}(any())).thenReturn(<non-null value>) instead of relying on the \
                 default null of an unconfigured mock."
            )
        };

        items.push(ContextItem::new(
            ContextKind::StubHint,
            target,
            content,
            origin,
            WEIGHT_STUB_HINT,
        ));

        if symbol.locality == SymbolLocality::Local {
            if let Some(record) = symbol.owner.as_deref().and_then(|o| self.local_type(o, near)) {
                items.push(class_summary_item(record, origin, WEIGHT_DIAGNOSTIC_SUMMARY));
            }
        }
        items
    }

    fn runtime_exception(&self, symbol: &ExtractedSymbol, near: &str, origin: ContextOrigin) -> Vec<ContextItem> {
        let mut items = Vec::new();
        let name = &symbol.name;
        let qualified = symbol.qualified.as_deref().unwrap_or(name);

        if symbol.locality == SymbolLocality::Local {
            if let Some(record) = self.local_type(qualified, near) {
                items.push(class_summary_item(record, origin, WEIGHT_DIAGNOSTIC_SUMMARY));
            }
        }

        let content = if is_assertion_failure(name) {
            "An assertion failed. Derive expected values from the method body shown above \
             instead of guessing them, and assert only behaviour the method actually has."
                .to_string()
        } else {
            format!(
                "The test raised {qualified}. If the method under test is expected to throw it, \
                 assert it with assertThrows({name}.class, ..); otherwise fix the arrange step \
                 (stubs, constructor arguments, fixture data) that triggers it."
            )
        };
        items.push(ContextItem::new(
            ContextKind::FailureNote,
            name.clone(),
            content,
            origin,
            WEIGHT_FAILURE_NOTE,
        ));

        let needs_import = symbol.locality == SymbolLocality::External
            && !qualified.starts_with("java.lang.")
            && qualified.contains('.')
            && !is_assertion_failure(name);
        if needs_import {
            items.push(import_item(name, qualified, origin, WEIGHT_CONCRETE_IMPORT));
        }
        items
    }
}

fn is_assertion_failure(name: &str) -> bool {
    name.contains("AssertionFailed") || name == "AssertionError" || name == "ComparisonFailure"
}

fn import_item(simple: &str, path: &str, origin: ContextOrigin, weight: f32) -> ContextItem {
    ContextItem::new(
        ContextKind::ImportSuggestion,
        simple.to_string(),
        format!("import {path};"),
        origin,
        weight,
    )
}

fn simple_of(name: &str) -> String {
    name.rsplit(['.', '$']).next().unwrap_or(name).to_string()
}
