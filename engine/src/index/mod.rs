//! Structural Indexer
//!
//! Syntactic map from fully-qualified Java type name to its declared
//! members, built with tree-sitter and shared through an [`IndexHandle`].

pub mod cache;
pub mod file_walker;
pub mod handle;
pub mod java_parser;
pub mod project;
pub mod types;

pub use cache::IndexCache;
pub use handle::{IndexHandle, IndexOptions, SharedIndex};
pub use java_parser::JavaFileIndex;
pub use project::{BuildReport, DuplicateType, ProjectIndex};
pub use types::{
    ConstructorRecord, FieldRecord, MethodRecord, Parameter, SourceSpan, TypeKind, TypeRecord,
};
