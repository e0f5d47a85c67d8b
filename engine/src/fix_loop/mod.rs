//! Bounded generate → verify → enhance → regenerate loop
//!
//! - `state`: explicit state machine with a legal-transition table
//! - `prompt`: versioned prompt rendering from a context bundle
//! - `controller`: drives one session against the two backends

pub mod controller;
pub mod prompt;
pub mod state;

pub use controller::{
    AttemptOutcome, FixAttempt, FixLoopController, RepairStrategy, SessionConfig, SessionReport, SessionTarget,
    MAX_ATTEMPT_LIMIT,
};
pub use prompt::{build_prompt, PromptInput, PROMPT_VERSION};
pub use state::{IllegalTransition, LoopState, StateMachine, TransitionRecord};
