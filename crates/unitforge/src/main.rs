mod cli;

use std::path::Path;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{info, warn};
use unitforge_engine::backend::{CommandBuildBackend, OllamaBackend};
use unitforge_engine::config::ForgeConfig;
use unitforge_engine::fix_loop::{FixLoopController, SessionTarget};
use unitforge_engine::index::IndexHandle;

use cli::{Args, Command};

#[tokio::main]
async fn main() -> Result<ExitCode> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    match args.command {
        Command::Index { root, force } => index(&root, force),
        Command::Generate {
            root,
            class,
            method,
            test_method,
            max_attempts,
            strategy,
            timeout_secs,
            force_reindex,
            output,
            report,
        } => {
            let mut config = ForgeConfig::load(&root).context("Invalid configuration")?;
            if let Some(n) = max_attempts {
                config.max_attempts = n;
            }
            if let Some(s) = strategy {
                config.strategy = s.to_string();
            }
            if let Some(secs) = timeout_secs {
                config.session_timeout_secs = Some(secs);
            }
            config.validate().context("Invalid command-line options")?;

            let mut target = SessionTarget::new(class, method);
            target.test_method = test_method;
            target.test_source_root = config.test_source_root.clone();

            generate(&root, &config, &target, force_reindex, output.as_deref(), report.as_deref()).await
        }
    }
}

fn index(root: &Path, force: bool) -> Result<ExitCode> {
    let config = ForgeConfig::load(root).context("Invalid configuration")?;
    let handle = IndexHandle::new();
    let report = handle
        .init(config.index_options(root), force)
        .with_context(|| format!("Failed to index {}", root.display()))?;
    let snapshot = handle.snapshot()?;

    for failure in &report.skipped {
        warn!(file = %failure.file.display(), reason = %failure.reason, "Skipped");
    }
    for dup in snapshot.duplicates() {
        warn!(fqn = %dup.fqn, kept = %dup.kept.display(), ignored = %dup.ignored.display(), "Duplicate type");
    }

    println!("root:       {}", snapshot.root().display());
    println!("files:      {}", snapshot.file_count());
    println!("types:      {}", snapshot.type_count());
    println!("skipped:    {}", report.skipped.len());
    println!("duplicates: {}", snapshot.duplicates().len());
    println!("group id:   {}", snapshot.group_id().unwrap_or("-"));
    println!("built at:   {}", snapshot.built_at().to_rfc3339());
    println!(
        "source:     {} ({} ms)",
        if report.from_cache { "cache" } else { "parsed" },
        report.elapsed_ms
    );
    Ok(ExitCode::SUCCESS)
}

async fn generate(
    root: &Path,
    config: &ForgeConfig,
    target: &SessionTarget,
    force_reindex: bool,
    output: Option<&Path>,
    report_path: Option<&Path>,
) -> Result<ExitCode> {
    let handle = IndexHandle::new();
    let build = handle
        .init(config.index_options(root), force_reindex)
        .with_context(|| format!("Failed to index {}", root.display()))?;
    info!(
        parsed = build.parsed,
        skipped = build.skipped.len(),
        from_cache = build.from_cache,
        "Index ready"
    );

    let generator = OllamaBackend::new(config.ollama_config()).context("Failed to create generation backend")?;
    let builder = CommandBuildBackend::new(config.build_commands());
    let controller = FixLoopController::new(Arc::new(generator), Arc::new(builder), config.session_config()?);

    let report = controller.run(handle.snapshot()?, target).await?;
    handle.teardown();

    if let Some(path) = report_path {
        let json = serde_json::to_string_pretty(&report)?;
        std::fs::write(path, json).with_context(|| format!("Failed to write report to {}", path.display()))?;
    }

    info!(
        session = %report.session_id,
        state = %report.final_state,
        attempts = report.attempts.len(),
        wall_time = ?Duration::from_millis(report.wall_time_ms),
        "Session finished"
    );

    match report.into_result() {
        Ok(code) => {
            match output {
                Some(path) => std::fs::write(path, &code)
                    .with_context(|| format!("Failed to write test to {}", path.display()))?,
                None => println!("{code}"),
            }
            Ok(ExitCode::SUCCESS)
        }
        Err(e) => {
            eprintln!("{e}");
            Ok(ExitCode::FAILURE)
        }
    }
}
