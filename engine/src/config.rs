//! Loader configuration.
//!
//! Precedence, lowest first: built-in defaults, `unitforge.toml` in the
//! project root, `UNITFORGE_*` environment variables. The CLI applies its
//! flags on top of the result. Build commands left unset by all of these
//! come from the build system detected in the project root.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::backend::{BuildCommands, BuildSystem, OllamaConfig};
use crate::error::ConfigError;
use crate::fix_loop::controller::{RepairStrategy, SessionConfig};
use crate::index::cache::IndexCache;
use crate::index::handle::IndexOptions;

pub const CONFIG_FILE: &str = "unitforge.toml";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ForgeConfig {
    /// Source file extensions to index, without the dot
    pub extensions: Vec<String>,
    pub max_attempts: u32,
    /// compile-only, runtime-only or both
    pub strategy: String,
    pub session_timeout_secs: Option<u64>,

    pub ollama_url: String,
    pub ollama_model: String,
    pub ollama_timeout_secs: u64,
    pub temperature: f32,

    /// Unset: chosen by `load` from the project's build file
    pub compile_command: Option<String>,
    pub run_command: Option<String>,
    pub build_timeout_secs: u64,

    /// Index cache directory; relative paths resolve against the project root
    pub cache_dir: Option<PathBuf>,
    pub test_source_root: PathBuf,
}

impl Default for ForgeConfig {
    fn default() -> Self {
        let ollama = OllamaConfig::default();
        let build = BuildCommands::default();
        Self {
            extensions: vec!["java".to_string()],
            max_attempts: 3,
            strategy: RepairStrategy::Both.to_string(),
            session_timeout_secs: None,
            ollama_url: ollama.base_url,
            ollama_model: ollama.model,
            ollama_timeout_secs: ollama.timeout.as_secs(),
            temperature: ollama.temperature,
            compile_command: None,
            run_command: None,
            build_timeout_secs: build.timeout.as_secs(),
            cache_dir: Some(PathBuf::from(".unitforge/cache")),
            test_source_root: PathBuf::from("src/test/java"),
        }
    }
}

impl ForgeConfig {
    /// Defaults, then `<root>/unitforge.toml` if present, then the environment.
    pub fn load(project_root: &Path) -> Result<Self, ConfigError> {
        let file = project_root.join(CONFIG_FILE);
        let mut config = if file.is_file() {
            Self::from_file(&file)?
        } else {
            Self::default()
        };
        config.apply_overrides(|key| std::env::var(key).ok())?;
        config.fill_build_commands(project_root);
        config.validate()?;
        Ok(config)
    }

    /// Fill unset build commands for the project's build system; Maven when
    /// no build file is found.
    pub fn fill_build_commands(&mut self, project_root: &Path) {
        if self.compile_command.is_some() && self.run_command.is_some() {
            return;
        }
        let system = BuildSystem::detect(project_root).unwrap_or_else(|| {
            debug!(root = %project_root.display(), "No build file found; assuming maven");
            BuildSystem::Maven
        });
        let (compile, run) = system.commands(project_root);
        debug!(build_system = %system, "Using default build commands");
        self.compile_command.get_or_insert(compile);
        self.run_command.get_or_insert(run);
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let config = toml::from_str(&text).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        debug!(path = %path.display(), "Loaded config file");
        Ok(config)
    }

    /// Apply `UNITFORGE_*` overrides from `lookup`.
    pub fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) -> Result<(), ConfigError> {
        if let Some(v) = lookup("UNITFORGE_EXTENSIONS") {
            self.extensions = v
                .split(',')
                .map(|e| e.trim().to_string())
                .filter(|e| !e.is_empty())
                .collect();
        }
        if let Some(v) = lookup("UNITFORGE_MAX_ATTEMPTS") {
            self.max_attempts = parse_number("UNITFORGE_MAX_ATTEMPTS", &v)?;
        }
        if let Some(v) = lookup("UNITFORGE_STRATEGY") {
            self.strategy = v;
        }
        if let Some(v) = lookup("UNITFORGE_SESSION_TIMEOUT_SECS") {
            self.session_timeout_secs = Some(parse_number("UNITFORGE_SESSION_TIMEOUT_SECS", &v)?);
        }
        if let Some(v) = lookup("UNITFORGE_OLLAMA_URL") {
            self.ollama_url = v;
        }
        if let Some(v) = lookup("UNITFORGE_MODEL") {
            self.ollama_model = v;
        }
        if let Some(v) = lookup("UNITFORGE_OLLAMA_TIMEOUT_SECS") {
            self.ollama_timeout_secs = parse_number("UNITFORGE_OLLAMA_TIMEOUT_SECS", &v)?;
        }
        if let Some(v) = lookup("UNITFORGE_COMPILE_COMMAND") {
            self.compile_command = Some(v);
        }
        if let Some(v) = lookup("UNITFORGE_RUN_COMMAND") {
            self.run_command = Some(v);
        }
        if let Some(v) = lookup("UNITFORGE_BUILD_TIMEOUT_SECS") {
            self.build_timeout_secs = parse_number("UNITFORGE_BUILD_TIMEOUT_SECS", &v)?;
        }
        if let Some(v) = lookup("UNITFORGE_CACHE_DIR") {
            self.cache_dir = if v.is_empty() { None } else { Some(PathBuf::from(v)) };
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.session_config()?;
        if self.extensions.is_empty() {
            return Err(ConfigError::invalid_value("extensions", "at least one extension is required"));
        }
        if self.compile_command.as_deref().is_some_and(|c| c.trim().is_empty()) {
            return Err(ConfigError::invalid_value("compile_command", "must not be empty"));
        }
        if self.run_command.as_deref().is_some_and(|c| c.trim().is_empty()) {
            return Err(ConfigError::invalid_value("run_command", "must not be empty"));
        }
        if self.ollama_timeout_secs == 0 || self.build_timeout_secs == 0 {
            return Err(ConfigError::invalid_value("timeout", "backend timeouts must be greater than zero"));
        }
        Ok(())
    }

    pub fn strategy(&self) -> Result<RepairStrategy, ConfigError> {
        self.strategy.parse()
    }

    pub fn session_config(&self) -> Result<SessionConfig, ConfigError> {
        let mut config = SessionConfig::new(self.max_attempts, self.strategy()?)?;
        if let Some(secs) = self.session_timeout_secs {
            config = config.with_timeout(Duration::from_secs(secs));
            config.validate()?;
        }
        Ok(config)
    }

    pub fn ollama_config(&self) -> OllamaConfig {
        OllamaConfig {
            base_url: self.ollama_url.clone(),
            model: self.ollama_model.clone(),
            timeout: Duration::from_secs(self.ollama_timeout_secs),
            temperature: self.temperature,
        }
    }

    /// Unset commands fall back to the Maven defaults.
    pub fn build_commands(&self) -> BuildCommands {
        let defaults = BuildCommands::default();
        BuildCommands {
            compile: self.compile_command.clone().unwrap_or(defaults.compile),
            run: self.run_command.clone().unwrap_or(defaults.run),
            timeout: Duration::from_secs(self.build_timeout_secs),
        }
    }

    pub fn index_options(&self, project_root: &Path) -> IndexOptions {
        let options = IndexOptions::new(project_root, self.extensions.clone());
        match &self.cache_dir {
            Some(dir) => options.with_cache(IndexCache::new(project_root.join(dir))),
            None => options,
        }
    }
}

fn parse_number<T: std::str::FromStr>(key: &str, value: &str) -> Result<T, ConfigError> {
    value
        .trim()
        .parse()
        .map_err(|_| ConfigError::invalid_value(key, format!("expected a number, got '{value}'")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect()
    }

    #[test]
    fn test_defaults_are_valid() {
        let config = ForgeConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.session_config().unwrap().max_attempts, 3);
        assert_eq!(config.strategy().unwrap(), RepairStrategy::Both);
    }

    #[test]
    fn test_file_then_env_precedence() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(CONFIG_FILE);
        std::fs::write(
            &path,
            "max_attempts = 5\nstrategy = \"compile-only\"\nollama_model = \"codellama\"\n",
        )
        .unwrap();

        let mut config = ForgeConfig::from_file(&path).unwrap();
        assert_eq!(config.max_attempts, 5);
        assert_eq!(config.ollama_model, "codellama");
        assert_eq!(config.extensions, vec!["java"]);

        let vars = env(&[("UNITFORGE_MAX_ATTEMPTS", "7"), ("UNITFORGE_CACHE_DIR", "")]);
        config.apply_overrides(|k| vars.get(k).cloned()).unwrap();
        assert_eq!(config.max_attempts, 7);
        assert_eq!(config.strategy().unwrap(), RepairStrategy::CompileOnly);
        assert!(config.cache_dir.is_none());
    }

    #[test]
    fn test_invalid_values_rejected() {
        let config = ForgeConfig {
            max_attempts: 0,
            ..ForgeConfig::default()
        };
        assert!(matches!(config.validate(), Err(ConfigError::InvalidAttemptLimit { .. })));

        let config = ForgeConfig {
            strategy: "sometimes".into(),
            ..ForgeConfig::default()
        };
        assert!(matches!(config.validate(), Err(ConfigError::InvalidStrategy { .. })));

        let config = ForgeConfig {
            extensions: vec![],
            ..ForgeConfig::default()
        };
        assert!(matches!(config.validate(), Err(ConfigError::InvalidValue { .. })));

        let mut config = ForgeConfig::default();
        let vars = env(&[("UNITFORGE_BUILD_TIMEOUT_SECS", "soon")]);
        assert!(config.apply_overrides(|k| vars.get(k).cloned()).is_err());
    }

    #[test]
    fn test_build_commands_follow_build_file() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("build.gradle"), "group = 'com.shop'\n").unwrap();

        let mut config = ForgeConfig::default();
        config.fill_build_commands(dir.path());
        let commands = config.build_commands();
        assert_eq!(commands.compile, "gradle -q testClasses");
        assert_eq!(commands.run, "gradle -q test --tests {test_fqn}");

        // a configured command is left alone
        let mut config = ForgeConfig {
            compile_command: Some("make tests".into()),
            ..ForgeConfig::default()
        };
        config.fill_build_commands(dir.path());
        assert_eq!(config.compile_command.as_deref(), Some("make tests"));
        assert_eq!(config.run_command.as_deref(), Some("gradle -q test --tests {test_fqn}"));
    }

    #[test]
    fn test_maven_is_the_fallback() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = ForgeConfig::default();
        config.fill_build_commands(dir.path());
        assert!(config.build_commands().compile.starts_with("mvn "));

        let config = ForgeConfig {
            run_command: Some("  ".into()),
            ..ForgeConfig::default()
        };
        assert!(matches!(config.validate(), Err(ConfigError::InvalidValue { .. })));
    }

    #[test]
    fn test_malformed_file_is_parse_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(CONFIG_FILE);
        std::fs::write(&path, "max_attempts = \"three\"").unwrap();
        assert!(matches!(ForgeConfig::from_file(&path), Err(ConfigError::Parse { .. })));
    }

    #[test]
    fn test_index_options_resolve_cache_dir() {
        let options = ForgeConfig::default().index_options(Path::new("/work/shop"));
        assert_eq!(options.root, PathBuf::from("/work/shop"));
        assert_eq!(
            options.cache.unwrap().dir(),
            Path::new("/work/shop/.unitforge/cache")
        );
    }
}
