//! Generation and build/execution backends
//!
//! The repair loop only sees these two traits. Concrete transports:
//! - [`ollama::OllamaBackend`]: text completion over the Ollama HTTP API
//! - [`command::CommandBuildBackend`]: writes the test and runs build tool commands

pub mod command;
pub mod ollama;

use std::path::PathBuf;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::BackendError;

pub use command::{BuildCommands, BuildSystem, CommandBuildBackend};
pub use ollama::{extract_code, OllamaBackend, OllamaConfig};

/// Language-model text completion.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait GenerationBackend: Send + Sync {
    /// Short name used in logs and errors
    fn name(&self) -> &str;

    /// Complete `prompt` into Java test source.
    async fn generate(&self, prompt: &str) -> Result<String, BackendError>;
}

/// Compiles and runs generated tests.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait BuildBackend: Send + Sync {
    /// Short name used in logs and errors
    fn name(&self) -> &str;

    /// Verify `request.code` in the requested phase.
    ///
    /// Compile and test failures are `Ok` responses carrying diagnostic
    /// text; `Err` is reserved for the backend itself failing.
    async fn verify(&self, request: &BuildRequest) -> Result<BuildResponse, BackendError>;

    /// Called once when a session for `module` ends, however it ended.
    ///
    /// `keep` is true only for a verified test. Backends that touch the
    /// project put it back the way they found it otherwise.
    async fn finish(&self, _module: &ModuleContext, _keep: bool) -> Result<(), BackendError> {
        Ok(())
    }
}

/// Where the generated test lives inside the project.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModuleContext {
    pub project_root: PathBuf,
    /// Package of the test class (same as the type under test)
    pub package: String,
    /// Simple name of the test class, e.g. `OrderServiceTest`
    pub test_class: String,
    pub test_method: Option<String>,
    /// Test source root relative to the project, e.g. `src/test/java`
    pub test_source_root: PathBuf,
}

impl ModuleContext {
    /// Relative path of the test source file.
    pub fn test_file(&self) -> PathBuf {
        let mut path = self.test_source_root.clone();
        for segment in self.package.split('.').filter(|s| !s.is_empty()) {
            path.push(segment);
        }
        path.push(format!("{}.java", self.test_class));
        path
    }

    /// FQN of the test class.
    pub fn test_fqn(&self) -> String {
        if self.package.is_empty() {
            self.test_class.clone()
        } else {
            format!("{}.{}", self.package, self.test_class)
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BuildPhase {
    /// Compile only
    Compile,
    /// Compile and execute the test
    Run,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildRequest {
    pub code: String,
    pub module: ModuleContext,
    pub phase: BuildPhase,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BuildStatus {
    Success,
    CompileError,
    RuntimeError,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildResponse {
    pub status: BuildStatus,
    /// Compiler or test output; empty on success
    pub diagnostic_text: String,
}

impl BuildResponse {
    pub fn success() -> Self {
        Self {
            status: BuildStatus::Success,
            diagnostic_text: String::new(),
        }
    }

    pub fn compile_error(text: impl Into<String>) -> Self {
        Self {
            status: BuildStatus::CompileError,
            diagnostic_text: text.into(),
        }
    }

    pub fn runtime_error(text: impl Into<String>) -> Self {
        Self {
            status: BuildStatus::RuntimeError,
            diagnostic_text: text.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_module_test_file() {
        let module = ModuleContext {
            project_root: PathBuf::from("/work/shop"),
            package: "com.shop.orders".into(),
            test_class: "OrderServiceTest".into(),
            test_method: None,
            test_source_root: PathBuf::from("src/test/java"),
        };
        assert_eq!(
            module.test_file(),
            PathBuf::from("src/test/java/com/shop/orders/OrderServiceTest.java")
        );
        assert_eq!(module.test_fqn(), "com.shop.orders.OrderServiceTest");
    }

    #[test]
    fn test_default_package_test_file() {
        let module = ModuleContext {
            project_root: PathBuf::from("/work"),
            package: String::new(),
            test_class: "MainTest".into(),
            test_method: Some("runs".into()),
            test_source_root: PathBuf::from("test"),
        };
        assert_eq!(module.test_file(), PathBuf::from("test/MainTest.java"));
        assert_eq!(module.test_fqn(), "MainTest");
    }
}
