//! Initial context for a target method.
//!
//! Insertion order encodes relevance: the method itself, then the type that
//! declares it, then one item per collaborator type reachable from its
//! fields, the method's parameters and the constructors.

use std::sync::Arc;

use tracing::debug;

use crate::context::bundle::ContextBundle;
use crate::context::item::{ContextItem, ContextKind, ContextOrigin};
use crate::context::summary::{
    class_summary_item, is_builtin, is_jdk_value, referenced_types, type_members,
};
use crate::error::{IndexError, IndexResult};
use crate::index::project::ProjectIndex;
use crate::index::types::{simple_name_of, MethodRecord, TypeRecord};

pub const WEIGHT_METHOD_BODY: f32 = 1.0;
pub const WEIGHT_TYPE_MEMBERS: f32 = 0.9;
pub const WEIGHT_DEPENDENCY_SUMMARY: f32 = 0.7;
pub const WEIGHT_TEST_DOUBLE: f32 = 0.5;

/// Builds the starting bundle for a session from one index snapshot.
pub struct ContextAssembler {
    index: Arc<ProjectIndex>,
}

impl ContextAssembler {
    pub fn new(index: Arc<ProjectIndex>) -> Self {
        Self { index }
    }

    pub fn index(&self) -> &ProjectIndex {
        &self.index
    }

    /// Resolve the target and assemble its initial bundle.
    ///
    /// `target_type` may be an FQN or a simple name. All overloads named
    /// `target_method` are included.
    pub fn initial(&self, target_type: &str, target_method: &str) -> IndexResult<ContextBundle> {
        let record = self
            .index
            .lookup(target_type, None)
            .ok_or_else(|| IndexError::not_found(target_type))?;

        let overloads: Vec<&MethodRecord> = record.methods_named(target_method).collect();
        if overloads.is_empty() {
            return Err(IndexError::method_not_found(&record.fqn, target_method));
        }

        let mut bundle = ContextBundle::new(&record.fqn, target_method);

        for method in &overloads {
            bundle.insert(method_item(record, method));
        }

        bundle.insert(ContextItem::new(
            ContextKind::TypeMembers,
            record.fqn.clone(),
            type_members(record),
            ContextOrigin::EnclosingType,
            WEIGHT_TYPE_MEMBERS,
        ));

        for type_text in dependency_types(record, &overloads) {
            for name in referenced_types(&type_text) {
                if let Some(item) = self.dependency_item(record, &name) {
                    bundle.insert(item);
                }
            }
        }

        debug!(class = %record.fqn, method = target_method, items = bundle.len(), "Assembled initial context");
        Ok(bundle)
    }

    /// Summary for a local type, test-double note for an external one.
    fn dependency_item(&self, target: &TypeRecord, name: &str) -> Option<ContextItem> {
        let simple = simple_name_of(name);
        if is_builtin(simple) || simple == target.simple_name {
            return None;
        }

        if let Some(local) = self.index.lookup(name, Some(&target.package)) {
            if local.fqn == target.fqn {
                return None;
            }
            return Some(class_summary_item(
                local,
                ContextOrigin::Dependency,
                WEIGHT_DEPENDENCY_SUMMARY,
            ));
        }

        if is_jdk_value(simple) {
            return None;
        }

        Some(ContextItem::new(
            ContextKind::TestDoubleNote,
            simple,
            format!(
                "{simple} is not declared in this project. Replace it with a Mockito mock (@Mock) \
                 or a hand-written fake; do not construct the real implementation."
            ),
            ContextOrigin::Dependency,
            WEIGHT_TEST_DOUBLE,
        ))
    }
}

fn method_item(record: &TypeRecord, method: &MethodRecord) -> ContextItem {
    let param_types: Vec<&str> = method.parameters.iter().map(|p| p.type_name.as_str()).collect();
    let symbol = format!("{}#{}({})", record.fqn, method.name, param_types.join(","));
    let content = format!(
        "// {} ({}, lines {}-{})\n{}",
        record.fqn,
        record.file.display(),
        method.span.start_line,
        method.span.end_line,
        method.source
    );
    ContextItem::new(
        ContextKind::MethodBody,
        symbol,
        content,
        ContextOrigin::TargetMethod,
        WEIGHT_METHOD_BODY,
    )
}

/// Field types, then target parameter types, then constructor parameter types.
fn dependency_types(record: &TypeRecord, overloads: &[&MethodRecord]) -> Vec<String> {
    let fields = record.fields.iter().filter(|f| !f.is_static()).map(|f| f.type_name.clone());
    let params = overloads
        .iter()
        .flat_map(|m| m.parameters.iter().map(|p| p.type_name.clone()));
    let ctor_params = record
        .constructors
        .iter()
        .flat_map(|c| c.parameters.iter().map(|p| p.type_name.clone()));
    fields.chain(params).chain(ctor_params).collect()
}
