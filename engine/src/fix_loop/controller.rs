//! Bounded generate → verify → enhance → regenerate loop.
//!
//! One session targets one method. The controller awaits each backend call
//! in turn; the only shared state it touches is the immutable index
//! snapshot it was given.

use std::path::PathBuf;
use std::str::FromStr;
use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use uuid::Uuid;

use crate::backend::{BuildBackend, BuildPhase, BuildRequest, BuildStatus, GenerationBackend, ModuleContext};
use crate::context::assembler::ContextAssembler;
use crate::context::bundle::ContextBundle;
use crate::diagnostic::{Diagnostic, DiagnosticKind};
use crate::enhancer::ErrorEnhancer;
use crate::error::{ConfigError, DiagnosticError, SessionError};
use crate::fix_loop::prompt::{build_prompt, PromptInput, PROMPT_VERSION};
use crate::fix_loop::state::{LoopState, StateMachine, TransitionRecord};
use crate::index::project::ProjectIndex;

/// Upper bound accepted for `max_attempts`.
pub const MAX_ATTEMPT_LIMIT: u32 = 20;

/// Which verification phases a generated test must pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RepairStrategy {
    /// Success once the test compiles
    CompileOnly,
    /// Success once the test runs green; compile failures are still repaired
    RuntimeOnly,
    /// Compile, then run
    Both,
}

impl RepairStrategy {
    pub fn runs_tests(self) -> bool {
        !matches!(self, Self::CompileOnly)
    }
}

impl std::fmt::Display for RepairStrategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::CompileOnly => write!(f, "compile-only"),
            Self::RuntimeOnly => write!(f, "runtime-only"),
            Self::Both => write!(f, "both"),
        }
    }
}

impl FromStr for RepairStrategy {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace('_', "-").as_str() {
            "compile-only" | "compile" => Ok(Self::CompileOnly),
            "runtime-only" | "runtime" => Ok(Self::RuntimeOnly),
            "both" => Ok(Self::Both),
            _ => Err(ConfigError::InvalidStrategy {
                value: s.to_string(),
            }),
        }
    }
}

/// Per-session parameters, fixed at session start.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    pub max_attempts: u32,
    pub strategy: RepairStrategy,
    /// Abort the whole session after this long, whatever state it is in
    pub session_timeout: Option<Duration>,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            strategy: RepairStrategy::Both,
            session_timeout: None,
        }
    }
}

impl SessionConfig {
    pub fn new(max_attempts: u32, strategy: RepairStrategy) -> Result<Self, ConfigError> {
        let config = Self {
            max_attempts,
            strategy,
            session_timeout: None,
        };
        config.validate()?;
        Ok(config)
    }

    pub fn with_timeout(mut self, limit: Duration) -> Self {
        self.session_timeout = Some(limit);
        self
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_attempts == 0 || self.max_attempts > MAX_ATTEMPT_LIMIT {
            return Err(ConfigError::InvalidAttemptLimit {
                value: self.max_attempts,
                max: MAX_ATTEMPT_LIMIT,
            });
        }
        if self.session_timeout == Some(Duration::ZERO) {
            return Err(ConfigError::invalid_value("session_timeout", "must be greater than zero"));
        }
        Ok(())
    }
}

/// What to generate a test for and where it goes.
#[derive(Debug, Clone)]
pub struct SessionTarget {
    /// FQN or simple name of the type under test
    pub target_type: String,
    pub target_method: String,
    /// Name for the generated test method, if the caller wants one
    pub test_method: Option<String>,
    /// Relative to the project root
    pub test_source_root: PathBuf,
}

impl SessionTarget {
    pub fn new(target_type: impl Into<String>, target_method: impl Into<String>) -> Self {
        Self {
            target_type: target_type.into(),
            target_method: target_method.into(),
            test_method: None,
            test_source_root: PathBuf::from("src/test/java"),
        }
    }

    fn module(&self, index: &ProjectIndex, bundle: &ContextBundle) -> Result<ModuleContext, SessionError> {
        let record = index.resolve(bundle.target_type())?;
        Ok(ModuleContext {
            project_root: index.root().to_path_buf(),
            package: record.package.clone(),
            test_class: format!("{}Test", record.simple_name),
            test_method: self.test_method.clone(),
            test_source_root: self.test_source_root.clone(),
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AttemptOutcome {
    Passed,
    CompileFailure,
    RuntimeFailure,
}

/// One generate + verify round.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FixAttempt {
    /// Starts at 1, strictly increasing, never above the attempt limit
    pub sequence: u32,
    pub code: String,
    pub diagnostic: Option<Diagnostic>,
    pub outcome: AttemptOutcome,
    pub timestamp: DateTime<Utc>,
}

/// Everything a finished session hands back to the caller.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionReport {
    pub session_id: Uuid,
    pub target_type: String,
    pub target_method: String,
    pub strategy: RepairStrategy,
    pub max_attempts: u32,
    pub final_state: LoopState,
    /// Verified test source; set only on success
    pub code: Option<String>,
    pub attempts: Vec<FixAttempt>,
    pub last_diagnostic: Option<Diagnostic>,
    pub transitions: Vec<TransitionRecord>,
    /// Context items in the bundle when the session ended
    pub context_items: usize,
    pub prompt_version: String,
    pub wall_time_ms: u64,
}

impl SessionReport {
    pub fn is_success(&self) -> bool {
        self.final_state == LoopState::Success
    }

    /// Verified code, or the diagnostic that survived every attempt.
    pub fn into_result(self) -> Result<String, DiagnosticError> {
        if let (LoopState::Success, Some(code)) = (self.final_state, self.code) {
            return Ok(code);
        }

        let attempts = self.attempts.len() as u32;
        match self.last_diagnostic {
            Some(diag) if diag.kind == DiagnosticKind::Runtime => Err(DiagnosticError::RuntimeFailure {
                attempts,
                message: diag.headline(5),
            }),
            Some(diag) => Err(DiagnosticError::CompileFailure {
                attempts,
                message: diag.headline(5),
            }),
            None => Err(DiagnosticError::CompileFailure {
                attempts,
                message: "no diagnostic recorded".to_string(),
            }),
        }
    }
}

/// Drives repair sessions against a pair of backends.
pub struct FixLoopController {
    generator: Arc<dyn GenerationBackend>,
    builder: Arc<dyn BuildBackend>,
    config: SessionConfig,
}

impl FixLoopController {
    pub fn new(
        generator: Arc<dyn GenerationBackend>,
        builder: Arc<dyn BuildBackend>,
        config: SessionConfig,
    ) -> Self {
        Self {
            generator,
            builder,
            config,
        }
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// Run one session to SUCCESS or FAILED.
    ///
    /// Exhausted attempts are an `Ok` report in state FAILED; backend
    /// failures and an elapsed session timeout are `Err`. Once the target is
    /// resolved the build backend's `finish` runs on every exit path.
    pub async fn run(&self, index: Arc<ProjectIndex>, target: &SessionTarget) -> Result<SessionReport, SessionError> {
        self.config.validate()?;
        let start = Instant::now();

        let bundle = ContextAssembler::new(Arc::clone(&index)).initial(&target.target_type, &target.target_method)?;
        let module = target.module(&index, &bundle)?;

        let session = self.run_session(&index, bundle, &module, start);
        let outcome = match self.config.session_timeout {
            Some(limit) => tokio::time::timeout(limit, session)
                .await
                .map_err(|_| {
                    warn!(class = %target.target_type, method = %target.target_method, "Session exceeded its wall-clock limit");
                    SessionError::WallClockExceeded { limit }
                })
                .and_then(|result| result),
            None => session.await,
        };

        let keep = matches!(&outcome, Ok(report) if report.is_success());
        if let Err(e) = self.builder.finish(&module, keep).await {
            warn!(backend = self.builder.name(), error = %e, "Build backend could not clean up after the session");
        }
        outcome
    }

    async fn run_session(
        &self,
        index: &Arc<ProjectIndex>,
        mut bundle: ContextBundle,
        module: &ModuleContext,
        start: Instant,
    ) -> Result<SessionReport, SessionError> {
        let session_id = Uuid::new_v4();
        let enhancer = ErrorEnhancer::new(Arc::clone(index));

        info!(
            session = %session_id,
            class = %bundle.target_type(),
            method = %bundle.target_method(),
            strategy = %self.config.strategy,
            max_attempts = self.config.max_attempts,
            context_items = bundle.len(),
            "Repair session started"
        );

        let mut machine = StateMachine::new();
        let mut attempts: Vec<FixAttempt> = Vec::new();
        let mut history: Vec<Diagnostic> = Vec::new();
        let mut previous_code: Option<String> = None;

        loop {
            let sequence = machine.attempt();

            let prompt = build_prompt(&PromptInput {
                bundle: &bundle,
                module,
                previous_code: previous_code.as_deref(),
                diagnostics: &history,
                group_id: index.group_id(),
            });

            let code = match self.generator.generate(&prompt).await {
                Ok(code) => code,
                Err(e) => {
                    machine.fail(&e.to_string())?;
                    warn!(session = %session_id, attempt = sequence, backend = self.generator.name(), error = %e, "Generation backend failed; aborting session");
                    return Err(e.into());
                }
            };
            machine.advance(LoopState::Generated, None)?;

            machine.advance(LoopState::CompileCheck, None)?;
            let (status, text) = self.check(&code, module, BuildPhase::Compile, &mut machine).await?;
            let failure = match status {
                BuildStatus::Success if !self.config.strategy.runs_tests() => None,
                BuildStatus::Success => {
                    machine.advance(LoopState::RuntimeCheck, None)?;
                    let (status, text) = self.check(&code, module, BuildPhase::Run, &mut machine).await?;
                    match status {
                        BuildStatus::Success => None,
                        BuildStatus::CompileError => Some((DiagnosticKind::Compile, text)),
                        BuildStatus::RuntimeError => Some((DiagnosticKind::Runtime, text)),
                    }
                }
                BuildStatus::CompileError | BuildStatus::RuntimeError => Some((DiagnosticKind::Compile, text)),
            };

            let Some((kind, text)) = failure else {
                attempts.push(FixAttempt {
                    sequence,
                    code: code.clone(),
                    diagnostic: None,
                    outcome: AttemptOutcome::Passed,
                    timestamp: Utc::now(),
                });
                machine.advance(LoopState::Success, Some("verified"))?;
                info!(session = %session_id, attempts = sequence, elapsed_ms = machine.elapsed_ms(), "{}", machine.summary());
                return Ok(self.report(session_id, &bundle, machine, attempts, Some(code), None, start));
            };

            let diagnostic = enhancer.diagnose(kind, &text);
            attempts.push(FixAttempt {
                sequence,
                code: code.clone(),
                diagnostic: Some(diagnostic.clone()),
                outcome: match kind {
                    DiagnosticKind::Compile => AttemptOutcome::CompileFailure,
                    DiagnosticKind::Runtime => AttemptOutcome::RuntimeFailure,
                },
                timestamp: Utc::now(),
            });

            if sequence >= self.config.max_attempts {
                machine.fail("attempts exhausted")?;
                info!(session = %session_id, attempts = sequence, last = %kind, elapsed_ms = machine.elapsed_ms(), "{}", machine.summary());
                return Ok(self.report(session_id, &bundle, machine, attempts, None, Some(diagnostic), start));
            }

            let added = enhancer.enhance_in_place(&mut bundle, &diagnostic);
            info!(
                session = %session_id,
                attempt = sequence,
                kind = %kind,
                symbols = diagnostic.symbols.len(),
                added_context = added,
                "Verification failed; retrying with enhanced context"
            );
            history.push(diagnostic);
            previous_code = Some(code);
            machine.advance(LoopState::Init, Some(&format!("{kind} failure")))?;
        }
    }

    #[allow(clippy::too_many_arguments)]
    fn report(
        &self,
        session_id: Uuid,
        bundle: &ContextBundle,
        machine: StateMachine,
        attempts: Vec<FixAttempt>,
        code: Option<String>,
        last_diagnostic: Option<Diagnostic>,
        start: Instant,
    ) -> SessionReport {
        SessionReport {
            session_id,
            target_type: bundle.target_type().to_string(),
            target_method: bundle.target_method().to_string(),
            strategy: self.config.strategy,
            max_attempts: self.config.max_attempts,
            final_state: machine.current(),
            code,
            attempts,
            last_diagnostic,
            transitions: machine.into_transitions(),
            context_items: bundle.len(),
            prompt_version: PROMPT_VERSION.to_string(),
            wall_time_ms: start.elapsed().as_millis() as u64,
        }
    }

    /// Submit `code` for one phase. Backend errors fail the machine.
    async fn check(
        &self,
        code: &str,
        module: &ModuleContext,
        phase: BuildPhase,
        machine: &mut StateMachine,
    ) -> Result<(BuildStatus, String), SessionError> {
        let request = BuildRequest {
            code: code.to_string(),
            module: module.clone(),
            phase,
        };
        match self.builder.verify(&request).await {
            Ok(response) => Ok((response.status, response.diagnostic_text)),
            Err(e) => {
                machine.fail(&e.to_string())?;
                warn!(phase = ?phase, backend = self.builder.name(), error = %e, "Build backend failed; aborting session");
                Err(e.into())
            }
        }
    }
}
