//! Context Assembler
//!
//! Ordered, deduplicated context bundles for generation prompts.

pub mod assembler;
pub mod bundle;
pub mod item;
pub mod summary;

pub use assembler::ContextAssembler;
pub use bundle::ContextBundle;
pub use item::{ContextItem, ContextKind, ContextOrigin, DedupKey};
