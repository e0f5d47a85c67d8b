use std::path::PathBuf;

use clap::{Parser, Subcommand};
use unitforge_engine::fix_loop::RepairStrategy;

/// LLM unit test generation for Java projects with a bounded repair loop
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Build (or load from cache) the structural index and print statistics
    Index {
        /// Project root
        root: PathBuf,

        /// Ignore the cache and re-parse every file
        #[arg(long, default_value_t = false)]
        force: bool,
    },

    /// Generate a verified test for one method
    Generate {
        /// Project root
        root: PathBuf,

        /// Type under test, fully-qualified or simple name
        #[arg(long = "class")]
        class: String,

        /// Method under test
        #[arg(long)]
        method: String,

        /// Name for the generated test method
        #[arg(long)]
        test_method: Option<String>,

        /// Attempts before giving up (overrides UNITFORGE_MAX_ATTEMPTS)
        #[arg(long)]
        max_attempts: Option<u32>,

        /// compile-only, runtime-only or both (overrides UNITFORGE_STRATEGY)
        #[arg(long)]
        strategy: Option<RepairStrategy>,

        /// Abort the session after this many seconds
        #[arg(long)]
        timeout_secs: Option<u64>,

        /// Rebuild the index instead of loading it from cache
        #[arg(long, default_value_t = false)]
        force_reindex: bool,

        /// Write the verified test here instead of stdout
        #[arg(long)]
        output: Option<PathBuf>,

        /// Write the session report as JSON
        #[arg(long)]
        report: Option<PathBuf>,
    },
}
