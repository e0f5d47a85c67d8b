//! Build backend that shells out to the project's build tool.
//!
//! The generated test is written under the test source root, then a compile
//! or run command template is expanded and executed in the project root.
//! A test file that already existed is backed up on the first write and put
//! back by [`BuildBackend::finish`]; a generated file is only left behind
//! when its session succeeded and nothing was there before.
//!
//! Supported placeholders:
//!
//! | Placeholder       | Value                                  |
//! |-------------------|----------------------------------------|
//! | `{test_class}`    | simple test class name                 |
//! | `{test_method}`   | test method name, or empty             |
//! | `{test_selector}` | `Class` or `Class#method`              |
//! | `{test_fqn}`      | fully-qualified test class name        |
//! | `{test_file}`     | test source path relative to the root  |

use std::collections::HashMap;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::sync::{LazyLock, Mutex, MutexGuard};
use std::time::{Duration, Instant};

use async_trait::async_trait;
use regex::Regex;
use serde::{Deserialize, Serialize};
use tokio::process::Command;
use tracing::{debug, info, warn};

use crate::backend::{BuildBackend, BuildPhase, BuildRequest, BuildResponse, ModuleContext};
use crate::error::BackendError;

const BACKEND: &str = "build";

/// Output of a run phase that actually failed while compiling.
static COMPILE_FAILURE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)COMPILATION ERROR|\.java:\d+:\s*(?:error|错误)|\.java:\[\d+,\d+\]|编译错误").unwrap()
});

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(180);

/// Build tool driving a project, told apart by its build file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BuildSystem {
    Maven,
    Gradle,
}

impl BuildSystem {
    /// `build.gradle(.kts)` wins over `pom.xml`; `None` when neither exists.
    pub fn detect(project_root: &Path) -> Option<Self> {
        if ["build.gradle", "build.gradle.kts"]
            .iter()
            .any(|f| project_root.join(f).is_file())
        {
            Some(Self::Gradle)
        } else if project_root.join("pom.xml").is_file() {
            Some(Self::Maven)
        } else {
            None
        }
    }

    /// Default compile and run templates. Gradle goes through the wrapper
    /// when the project ships one.
    pub fn commands(self, project_root: &Path) -> (String, String) {
        match self {
            Self::Maven => (
                "mvn -q test-compile -Dcheckstyle.skip=true".to_string(),
                "mvn -q test -Dtest={test_selector} -DfailIfNoTests=false -Dcheckstyle.skip=true".to_string(),
            ),
            Self::Gradle => {
                let gradle = if project_root.join("gradlew").is_file() {
                    "./gradlew"
                } else {
                    "gradle"
                };
                (
                    format!("{gradle} -q testClasses"),
                    format!("{gradle} -q test --tests {{test_fqn}}"),
                )
            }
        }
    }
}

impl std::fmt::Display for BuildSystem {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Maven => write!(f, "maven"),
            Self::Gradle => write!(f, "gradle"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct BuildCommands {
    /// e.g. `mvn -q test-compile`
    pub compile: String,
    /// e.g. `mvn -q test -Dtest={test_selector}`
    pub run: String,
    /// Applied to each command separately
    pub timeout: Duration,
}

impl BuildCommands {
    pub fn for_system(system: BuildSystem, project_root: &Path) -> Self {
        let (compile, run) = system.commands(project_root);
        Self {
            compile,
            run,
            timeout: DEFAULT_TIMEOUT,
        }
    }
}

impl Default for BuildCommands {
    fn default() -> Self {
        Self::for_system(BuildSystem::Maven, Path::new("."))
    }
}

/// Writes generated tests into the project and runs build commands on them.
pub struct CommandBuildBackend {
    commands: BuildCommands,
    /// Test files written this session → their previous content, if any
    placed: Mutex<HashMap<PathBuf, Option<Vec<u8>>>>,
}

impl CommandBuildBackend {
    pub fn new(commands: BuildCommands) -> Self {
        Self {
            commands,
            placed: Mutex::new(HashMap::new()),
        }
    }

    fn placed(&self) -> MutexGuard<'_, HashMap<PathBuf, Option<Vec<u8>>>> {
        self.placed.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Remember what was at `path` before the first write of a session.
    async fn back_up(&self, path: &Path) -> Result<(), BackendError> {
        if self.placed().contains_key(path) {
            return Ok(());
        }
        let original = match tokio::fs::read(path).await {
            Ok(bytes) => {
                info!(file = %path.display(), "Backing up existing test file");
                Some(bytes)
            }
            Err(e) if e.kind() == ErrorKind::NotFound => None,
            Err(e) => {
                return Err(BackendError::unavailable(
                    BACKEND,
                    format!("cannot read {}: {e}", path.display()),
                ))
            }
        };
        self.placed().entry(path.to_path_buf()).or_insert(original);
        Ok(())
    }

    async fn write_test(&self, request: &BuildRequest) -> Result<(), BackendError> {
        let path = request.module.project_root.join(request.module.test_file());
        self.back_up(&path).await?;
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| BackendError::unavailable(BACKEND, format!("cannot create {}: {e}", parent.display())))?;
        }
        tokio::fs::write(&path, &request.code)
            .await
            .map_err(|e| BackendError::unavailable(BACKEND, format!("cannot write {}: {e}", path.display())))?;
        debug!(file = %path.display(), "Wrote generated test");
        Ok(())
    }

    /// Run one command; `Ok((success, combined output))`.
    async fn execute(&self, template: &str, module: &ModuleContext) -> Result<(bool, String), BackendError> {
        let args = expand_template(template, module)?;
        let (program, rest) = args
            .split_first()
            .ok_or_else(|| BackendError::unavailable(BACKEND, "empty build command"))?;

        let start = Instant::now();
        let mut command = Command::new(program);
        command
            .args(rest)
            .current_dir(&module.project_root)
            .stdin(Stdio::null())
            .kill_on_drop(true);

        let output = tokio::time::timeout(self.commands.timeout, command.output())
            .await
            .map_err(|_| BackendError::timeout(BACKEND, self.commands.timeout))?
            .map_err(|e| {
                if e.kind() == std::io::ErrorKind::NotFound {
                    BackendError::unavailable(BACKEND, format!("executable not found: {program}"))
                } else {
                    BackendError::unavailable(BACKEND, format!("failed to run {program}: {e}"))
                }
            })?;

        let mut text = String::from_utf8_lossy(&output.stdout).into_owned();
        let stderr = String::from_utf8_lossy(&output.stderr);
        if !stderr.trim().is_empty() {
            if !text.is_empty() && !text.ends_with('\n') {
                text.push('\n');
            }
            text.push_str(&stderr);
        }

        info!(
            command = %args.join(" "),
            success = output.status.success(),
            elapsed_ms = start.elapsed().as_millis() as u64,
            "Build command finished"
        );
        Ok((output.status.success(), text))
    }
}

#[async_trait]
impl BuildBackend for CommandBuildBackend {
    fn name(&self) -> &str {
        BACKEND
    }

    async fn finish(&self, module: &ModuleContext, keep: bool) -> Result<(), BackendError> {
        let path = module.project_root.join(module.test_file());
        let original = self.placed().remove(&path);
        let Some(original) = original else {
            return Ok(());
        };

        match original {
            Some(bytes) => {
                tokio::fs::write(&path, bytes)
                    .await
                    .map_err(|e| BackendError::unavailable(BACKEND, format!("cannot restore {}: {e}", path.display())))?;
                info!(file = %path.display(), "Restored existing test file");
            }
            None if keep => {
                info!(file = %path.display(), "Keeping verified test file");
            }
            None => match tokio::fs::remove_file(&path).await {
                Ok(()) => debug!(file = %path.display(), "Removed generated test file"),
                Err(e) if e.kind() == ErrorKind::NotFound => {}
                Err(e) => {
                    warn!(file = %path.display(), error = %e, "Could not remove generated test file");
                    return Err(BackendError::unavailable(
                        BACKEND,
                        format!("cannot remove {}: {e}", path.display()),
                    ));
                }
            },
        }
        Ok(())
    }

    async fn verify(&self, request: &BuildRequest) -> Result<BuildResponse, BackendError> {
        self.write_test(request).await?;

        match request.phase {
            BuildPhase::Compile => {
                let (ok, output) = self.execute(&self.commands.compile, &request.module).await?;
                Ok(if ok {
                    BuildResponse::success()
                } else {
                    BuildResponse::compile_error(output)
                })
            }
            BuildPhase::Run => {
                let (ok, output) = self.execute(&self.commands.run, &request.module).await?;
                Ok(if ok {
                    BuildResponse::success()
                } else if is_compile_failure(&output) {
                    BuildResponse::compile_error(output)
                } else {
                    BuildResponse::runtime_error(output)
                })
            }
        }
    }
}

/// Does build output describe a compilation failure?
pub fn is_compile_failure(output: &str) -> bool {
    COMPILE_FAILURE.is_match(output)
}

/// Split a command template with shell quoting rules and fill placeholders.
pub fn expand_template(template: &str, module: &ModuleContext) -> Result<Vec<String>, BackendError> {
    let parts = shlex::split(template)
        .ok_or_else(|| BackendError::unavailable(BACKEND, format!("unbalanced quotes in command: {template}")))?;

    let method = module.test_method.clone().unwrap_or_default();
    let selector = match &module.test_method {
        Some(m) => format!("{}#{}", module.test_class, m),
        None => module.test_class.clone(),
    };
    let file = module.test_file().to_string_lossy().into_owned();
    let fqn = module.test_fqn();

    Ok(parts
        .into_iter()
        .map(|part| {
            part.replace("{test_selector}", &selector)
                .replace("{test_class}", &module.test_class)
                .replace("{test_method}", &method)
                .replace("{test_fqn}", &fqn)
                .replace("{test_file}", &file)
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn module(root: &Path) -> ModuleContext {
        ModuleContext {
            project_root: root.to_path_buf(),
            package: "com.shop".into(),
            test_class: "OrderServiceTest".into(),
            test_method: Some("placesOrder".into()),
            test_source_root: PathBuf::from("src/test/java"),
        }
    }

    fn backend(compile: &str, run: &str, timeout: Duration) -> CommandBuildBackend {
        CommandBuildBackend::new(BuildCommands {
            compile: compile.to_string(),
            run: run.to_string(),
            timeout,
        })
    }

    fn request(root: &Path, phase: BuildPhase) -> BuildRequest {
        BuildRequest {
            code: "class OrderServiceTest {}".into(),
            module: module(root),
            phase,
        }
    }

    #[test]
    fn test_expand_template() {
        let module = module(Path::new("/p"));
        let args = expand_template("mvn -q test \"-Dtest={test_selector}\" -Dfile={test_file}", &module).unwrap();
        assert_eq!(
            args,
            vec![
                "mvn",
                "-q",
                "test",
                "-Dtest=OrderServiceTest#placesOrder",
                "-Dfile=src/test/java/com/shop/OrderServiceTest.java"
            ]
        );
    }

    #[test]
    fn test_unbalanced_quotes_rejected() {
        let module = module(Path::new("/p"));
        assert!(expand_template("mvn \"test", &module).is_err());
    }

    #[test]
    fn test_compile_failure_detection() {
        assert!(is_compile_failure("[ERROR] COMPILATION ERROR :"));
        assert!(is_compile_failure("FooTest.java:12: error: cannot find symbol"));
        assert!(is_compile_failure("[ERROR] /p/FooTest.java:[12,5] cannot find symbol"));
        assert!(!is_compile_failure("Tests run: 1, Failures: 1"));
    }

    #[tokio::test]
    async fn test_compile_success_writes_file() {
        let dir = tempfile::tempdir().unwrap();
        let backend = backend("true", "true", Duration::from_secs(10));

        let response = backend.verify(&request(dir.path(), BuildPhase::Compile)).await.unwrap();

        assert_eq!(response, BuildResponse::success());
        let written = dir.path().join("src/test/java/com/shop/OrderServiceTest.java");
        assert_eq!(std::fs::read_to_string(written).unwrap(), "class OrderServiceTest {}");
    }

    #[tokio::test]
    async fn test_existing_test_file_is_restored() {
        let dir = tempfile::tempdir().unwrap();
        let existing = dir.path().join("src/test/java/com/shop/OrderServiceTest.java");
        fs::create_dir_all(existing.parent().unwrap()).unwrap();
        fs::write(&existing, "// hand-written").unwrap();

        let backend = backend("true", "true", Duration::from_secs(10));
        let module = module(dir.path());
        backend.verify(&request(dir.path(), BuildPhase::Compile)).await.unwrap();
        backend.verify(&request(dir.path(), BuildPhase::Run)).await.unwrap();
        assert_eq!(fs::read_to_string(&existing).unwrap(), "class OrderServiceTest {}");

        // kept only when nothing was overwritten
        backend.finish(&module, true).await.unwrap();
        assert_eq!(fs::read_to_string(&existing).unwrap(), "// hand-written");
    }

    #[tokio::test]
    async fn test_failed_session_removes_generated_file() {
        let dir = tempfile::tempdir().unwrap();
        let backend = backend("false", "true", Duration::from_secs(10));
        let module = module(dir.path());
        let written = dir.path().join(module.test_file());

        let response = backend.verify(&request(dir.path(), BuildPhase::Compile)).await.unwrap();
        assert_eq!(response.status, crate::backend::BuildStatus::CompileError);
        assert!(written.exists());

        backend.finish(&module, false).await.unwrap();
        assert!(!written.exists());

        // nothing left to clean up
        backend.finish(&module, false).await.unwrap();
    }

    #[tokio::test]
    async fn test_successful_session_keeps_new_file() {
        let dir = tempfile::tempdir().unwrap();
        let backend = backend("true", "true", Duration::from_secs(10));
        let module = module(dir.path());

        backend.verify(&request(dir.path(), BuildPhase::Compile)).await.unwrap();
        backend.finish(&module, true).await.unwrap();

        let written = dir.path().join(module.test_file());
        assert_eq!(fs::read_to_string(written).unwrap(), "class OrderServiceTest {}");
    }

    #[test]
    fn test_detect_build_system() {
        let dir = tempfile::tempdir().unwrap();
        assert_eq!(BuildSystem::detect(dir.path()), None);

        fs::write(dir.path().join("pom.xml"), "<project/>").unwrap();
        assert_eq!(BuildSystem::detect(dir.path()), Some(BuildSystem::Maven));

        fs::write(dir.path().join("build.gradle"), "group = 'com.shop'").unwrap();
        assert_eq!(BuildSystem::detect(dir.path()), Some(BuildSystem::Gradle));
    }

    #[test]
    fn test_gradle_commands_prefer_wrapper() {
        let dir = tempfile::tempdir().unwrap();
        let (compile, run) = BuildSystem::Gradle.commands(dir.path());
        assert_eq!(compile, "gradle -q testClasses");
        assert_eq!(run, "gradle -q test --tests {test_fqn}");

        fs::write(dir.path().join("gradlew"), "#!/bin/sh").unwrap();
        let commands = BuildCommands::for_system(BuildSystem::Gradle, dir.path());
        assert_eq!(commands.compile, "./gradlew -q testClasses");

        let args = expand_template(&commands.run, &module(dir.path())).unwrap();
        assert_eq!(args, vec!["./gradlew", "-q", "test", "--tests", "com.shop.OrderServiceTest"]);
    }

    #[tokio::test]
    async fn test_run_failure_classified() {
        let dir = tempfile::tempdir().unwrap();
        let backend = backend(
            "true",
            "sh -c 'echo \"java.lang.IllegalStateException: boom\"; exit 1'",
            Duration::from_secs(10),
        );

        let response = backend.verify(&request(dir.path(), BuildPhase::Run)).await.unwrap();

        assert_eq!(response.status, crate::backend::BuildStatus::RuntimeError);
        assert!(response.diagnostic_text.contains("IllegalStateException"));
    }

    #[tokio::test]
    async fn test_missing_executable_is_unavailable() {
        let dir = tempfile::tempdir().unwrap();
        let backend = backend("no-such-build-tool-4711", "true", Duration::from_secs(10));

        let err = backend.verify(&request(dir.path(), BuildPhase::Compile)).await.unwrap_err();
        assert!(matches!(err, BackendError::Unavailable { .. }));
    }

    #[tokio::test]
    async fn test_command_timeout() {
        let dir = tempfile::tempdir().unwrap();
        let backend = backend("sleep 5", "true", Duration::from_millis(100));

        let err = backend.verify(&request(dir.path(), BuildPhase::Compile)).await.unwrap_err();
        assert!(matches!(err, BackendError::Timeout { .. }));
    }
}
