//! Repair loop state machine with explicit legal transitions.
//!
//! Every session starts at `Init` and ends at `Success` or `Failed`. The
//! controller moves between states only through `advance()`, which rejects
//! edges outside the table and records each accepted one.

use std::fmt;
use std::time::Instant;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LoopState {
    /// Building the prompt for the next attempt
    Init,
    /// Generation backend returned code
    Generated,
    /// Waiting on the build backend to compile
    CompileCheck,
    /// Waiting on the build backend to run the test
    RuntimeCheck,
    /// Terminal: test compiled (and ran, if required)
    Success,
    /// Terminal: attempts exhausted or a backend failed
    Failed,
}

impl LoopState {
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Success | Self::Failed)
    }
}

impl fmt::Display for LoopState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Init => write!(f, "INIT"),
            Self::Generated => write!(f, "GENERATED"),
            Self::CompileCheck => write!(f, "COMPILE_CHECK"),
            Self::RuntimeCheck => write!(f, "RUNTIME_CHECK"),
            Self::Success => write!(f, "SUCCESS"),
            Self::Failed => write!(f, "FAILED"),
        }
    }
}

/// Legal edges:
/// ```text
/// Init         → Generated
/// Generated    → CompileCheck
/// CompileCheck → RuntimeCheck | Success | Init
/// RuntimeCheck → Success | Init
/// (non-terminal) → Failed
/// ```
fn is_legal_transition(from: LoopState, to: LoopState) -> bool {
    use LoopState::*;

    if to == Failed && !from.is_terminal() {
        return true;
    }

    matches!(
        (from, to),
        (Init, Generated)
            | (Generated, CompileCheck)
            | (CompileCheck, RuntimeCheck)
            | (CompileCheck, Success)
            | (CompileCheck, Init)
            | (RuntimeCheck, Success)
            | (RuntimeCheck, Init)
    )
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransitionRecord {
    pub from: LoopState,
    pub to: LoopState,
    /// Attempt number at the time of transition, starting at 1
    pub attempt: u32,
    /// Milliseconds since the session started
    pub elapsed_ms: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IllegalTransition {
    pub from: LoopState,
    pub to: LoopState,
}

impl fmt::Display for IllegalTransition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Illegal state transition: {} → {}", self.from, self.to)
    }
}

impl std::error::Error for IllegalTransition {}

pub struct StateMachine {
    current: LoopState,
    attempt: u32,
    created_at: Instant,
    transitions: Vec<TransitionRecord>,
}

impl StateMachine {
    pub fn new() -> Self {
        Self {
            current: LoopState::Init,
            attempt: 1,
            created_at: Instant::now(),
            transitions: Vec::new(),
        }
    }

    pub fn current(&self) -> LoopState {
        self.current
    }

    pub fn attempt(&self) -> u32 {
        self.attempt
    }

    /// Move to `to` if the edge is legal and log it.
    ///
    /// Re-entering `Init` starts the next attempt.
    pub fn advance(&mut self, to: LoopState, reason: Option<&str>) -> Result<(), IllegalTransition> {
        if !is_legal_transition(self.current, to) {
            return Err(IllegalTransition {
                from: self.current,
                to,
            });
        }

        if to == LoopState::Init {
            self.attempt += 1;
        }

        let record = TransitionRecord {
            from: self.current,
            to,
            attempt: self.attempt,
            elapsed_ms: self.created_at.elapsed().as_millis() as u64,
            reason: reason.map(String::from),
        };

        tracing::debug!(
            from = %self.current,
            to = %to,
            attempt = self.attempt,
            "State transition"
        );

        self.transitions.push(record);
        self.current = to;
        Ok(())
    }

    pub fn fail(&mut self, reason: &str) -> Result<(), IllegalTransition> {
        self.advance(LoopState::Failed, Some(reason))
    }

    pub fn is_terminal(&self) -> bool {
        self.current.is_terminal()
    }

    pub fn into_transitions(self) -> Vec<TransitionRecord> {
        self.transitions
    }

    pub fn elapsed_ms(&self) -> u64 {
        self.created_at.elapsed().as_millis() as u64
    }

    /// `INIT → GENERATED → … (N transitions)`
    pub fn summary(&self) -> String {
        let mut path = vec![LoopState::Init.to_string()];
        path.extend(self.transitions.iter().map(|t| t.to.to_string()));
        format!("{} ({} transitions)", path.join(" → "), self.transitions.len())
    }
}

impl Default for StateMachine {
    fn default() -> Self {
        Self::new()
    }
}
