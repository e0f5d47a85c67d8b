//! UnitForge engine
//!
//! This library provides:
//! - A structural index of a Java project, built with tree-sitter
//! - Context assembly for a single method under test
//! - Compiler and runtime diagnostic enhancement (English and Chinese output)
//! - A bounded generate → verify → repair loop over pluggable backends
//!
//! # Usage
//!
//! ```no_run
//! use std::sync::Arc;
//! use unitforge_engine::backend::{CommandBuildBackend, OllamaBackend};
//! use unitforge_engine::config::ForgeConfig;
//! use unitforge_engine::fix_loop::{FixLoopController, SessionTarget};
//! use unitforge_engine::index::IndexHandle;
//!
//! # async fn demo() -> Result<(), Box<dyn std::error::Error>> {
//! let root = std::path::Path::new("/work/shop");
//! let config = ForgeConfig::load(root)?;
//!
//! let handle = IndexHandle::new();
//! handle.init(config.index_options(root), false)?;
//!
//! let controller = FixLoopController::new(
//!     Arc::new(OllamaBackend::new(config.ollama_config())?),
//!     Arc::new(CommandBuildBackend::new(config.build_commands())),
//!     config.session_config()?,
//! );
//! let report = controller
//!     .run(handle.snapshot()?, &SessionTarget::new("com.shop.OrderService", "place"))
//!     .await?;
//! println!("{}", report.final_state);
//! # Ok(())
//! # }
//! ```

pub mod backend;
pub mod config;
pub mod context;
pub mod diagnostic;
pub mod enhancer;
pub mod error;
pub mod fix_loop;
pub mod index;

pub use config::ForgeConfig;
pub use error::{BackendError, ConfigError, DiagnosticError, IndexError, ParseFailure, SessionError};
