//! Error Enhancer
//!
//! Reads javac and JVM output in English or Simplified Chinese, extracts the
//! symbols it complains about, and adds context that addresses them.

pub mod error_enhancer;
pub mod imports;
pub mod rules;

pub use error_enhancer::ErrorEnhancer;
pub use rules::{DiagnosticRule, RuleMatch, RULES};
