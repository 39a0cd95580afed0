//! Configuration loader for fusion-jobs
//!
//! This module provides the `ConfigLoader` struct that handles loading
//! configuration from multiple sources with proper precedence.

use std::path::{Path, PathBuf};

use config::{Config, ConfigBuilder, Environment, File, FileFormat, builder::DefaultState};

use crate::config::environment::Environment as AppEnvironment;
use crate::config::error::ConfigError;
use crate::config::settings::Settings;

/// Environment variable for configuration directory
const CONFIG_DIR_ENV: &str = "FUSION_CONFIG_DIR";

/// Environment variable for specific configuration file
const CONFIG_FILE_ENV: &str = "FUSION_CONFIG_FILE";

/// Default configuration directory
const DEFAULT_CONFIG_DIR: &str = "config";

/// Environment variable prefix for configuration overrides
const ENV_PREFIX: &str = "FUSION";

/// Separator for nested configuration keys in environment variables
const ENV_SEPARATOR: &str = "__";

/// Configuration loader that handles layered configuration loading
///
/// The loader supports the following configuration sources (in order of priority):
/// 1. `default.toml` - Base default configuration (required)
/// 2. `{environment}.toml` - Environment-specific configuration (optional)
/// 3. `local.toml` - Local development overrides (optional)
/// 4. `FUSION_*` environment variables (highest priority)
#[derive(Debug)]
pub struct ConfigLoader {
    config_dir: PathBuf,
    /// Specific configuration file path (if set, skips layered loading)
    config_file: Option<PathBuf>,
    environment: AppEnvironment,
}

impl ConfigLoader {
    /// Create a new configuration loader
    ///
    /// This reads environment variables to determine:
    /// - Configuration directory (`FUSION_CONFIG_DIR`)
    /// - Specific configuration file (`FUSION_CONFIG_FILE`)
    /// - Application environment (`FUSION_APP_ENV`)
    ///
    /// # Errors
    ///
    /// Returns an error if both `FUSION_CONFIG_DIR` and `FUSION_CONFIG_FILE` are set,
    /// as they are mutually exclusive.
    pub fn new() -> Result<Self, ConfigError> {
        let config_dir = std::env::var(CONFIG_DIR_ENV)
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from(DEFAULT_CONFIG_DIR));

        let config_file = std::env::var(CONFIG_FILE_ENV).ok().map(PathBuf::from);

        if config_file.is_some() && std::env::var(CONFIG_DIR_ENV).is_ok() {
            return Err(ConfigError::ConflictingSources);
        }

        Ok(Self {
            config_dir,
            config_file,
            environment: AppEnvironment::from_env(),
        })
    }

    /// Load exactly this file instead of the layered directory
    pub fn with_config_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.config_file = Some(path.into());
        self
    }

    /// Select the `{environment}.toml` layer explicitly
    pub fn with_environment(mut self, environment: AppEnvironment) -> Self {
        self.environment = environment;
        self
    }

    pub fn environment(&self) -> AppEnvironment {
        self.environment
    }

    pub fn config_dir(&self) -> &Path {
        &self.config_dir
    }

    pub fn config_file(&self) -> Option<&Path> {
        self.config_file.as_deref()
    }

    /// Load and validate configuration from all sources
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - `default.toml` is not found (when using layered loading)
    /// - Configuration parsing fails
    /// - Configuration validation fails
    pub fn load(&self) -> Result<Settings, ConfigError> {
        let config = self.build_config()?;
        let settings: Settings = config.try_deserialize().map_err(|e| {
            ConfigError::Parse(format!("Failed to deserialize configuration: {e}"))
        })?;

        settings.validate()?;

        Ok(settings)
    }

    fn build_config(&self) -> Result<Config, ConfigError> {
        let builder = Config::builder();

        let builder = match &self.config_file {
            Some(config_file) => add_file_source(builder, config_file, true)?,
            None => self.build_layered_config(builder)?,
        };

        // FUSION_JOBS__ENABLED -> jobs.enabled
        let builder = builder.add_source(
            Environment::with_prefix(ENV_PREFIX)
                .prefix_separator("_")
                .separator(ENV_SEPARATOR)
                .ignore_empty(true)
                .try_parsing(true),
        );

        builder.build().map_err(ConfigError::from)
    }

    fn build_layered_config(
        &self,
        builder: ConfigBuilder<DefaultState>,
    ) -> Result<ConfigBuilder<DefaultState>, ConfigError> {
        let default_path = self.config_dir.join("default.toml");
        let builder = add_file_source(builder, &default_path, true)?;

        let env_path = self.config_dir.join(self.environment.layer_file());
        let builder = add_file_source(builder, &env_path, false)?;

        let local_path = self.config_dir.join("local.toml");
        add_file_source(builder, &local_path, false)
    }
}

/// Serializes tests that read or write process environment variables.
#[cfg(test)]
pub(crate) fn lock_env() -> std::sync::MutexGuard<'static, ()> {
    static ENV_MUTEX: std::sync::Mutex<()> = std::sync::Mutex::new(());
    ENV_MUTEX
        .lock()
        .unwrap_or_else(std::sync::PoisonError::into_inner)
}

fn add_file_source(
    builder: ConfigBuilder<DefaultState>,
    path: &Path,
    required: bool,
) -> Result<ConfigBuilder<DefaultState>, ConfigError> {
    if required && !path.exists() {
        return Err(ConfigError::MissingFile {
            path: path.to_path_buf(),
        });
    }

    let name = path.to_str().ok_or_else(|| {
        ConfigError::Parse(format!("Configuration path is not UTF-8: {}", path.display()))
    })?;
    Ok(builder.add_source(File::new(name, FileFormat::Toml).required(required)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::settings::LockBackend;
    use crate::jobs::ExecutionMode;
    use std::fs;
    use tempfile::TempDir;

    const DEFAULT_CONFIG: &str = r#"
[application]
name = "test-app"
version = "1.0.0"

[logger]
level = "info"

[logger.console]
enabled = true
colored = true

[logger.file]
enabled = false

[jobs]
enabled = true
shutdown_timeout_ms = 30000

[lock]
backend = "memory"
"#;

    fn setup_config_dir(files: &[(&str, &str)]) -> TempDir {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        for (name, content) in files {
            fs::write(temp_dir.path().join(name), content).expect("Failed to write config file");
        }
        temp_dir
    }

    /// Sets environment variables and restores them on drop
    struct EnvGuard {
        vars_to_restore: Vec<(String, Option<String>)>,
    }

    impl EnvGuard {
        /// Start from a clean slate for every variable the loader reads.
        fn clean() -> Self {
            let mut guard = Self {
                vars_to_restore: Vec::new(),
            };
            for key in [CONFIG_DIR_ENV, CONFIG_FILE_ENV, AppEnvironment::ENV_VAR] {
                guard.remove(key);
            }
            guard
        }

        fn set(&mut self, key: &str, value: &str) {
            self.vars_to_restore
                .push((key.to_string(), std::env::var(key).ok()));
            unsafe {
                std::env::set_var(key, value);
            }
        }

        fn remove(&mut self, key: &str) {
            self.vars_to_restore
                .push((key.to_string(), std::env::var(key).ok()));
            unsafe {
                std::env::remove_var(key);
            }
        }
    }

    impl Drop for EnvGuard {
        fn drop(&mut self) {
            for (key, original_value) in self.vars_to_restore.iter().rev() {
                unsafe {
                    match original_value {
                        Some(value) => std::env::set_var(key, value),
                        None => std::env::remove_var(key),
                    }
                }
            }
        }
    }

    #[test]
    fn test_config_loader_new_default() {
        let _guard = lock_env();
        let _env = EnvGuard::clean();

        let loader = ConfigLoader::new().expect("Should create loader");
        assert_eq!(loader.config_dir(), Path::new("config"));
        assert!(loader.config_file().is_none());
        assert_eq!(loader.environment(), AppEnvironment::Development);
    }

    #[test]
    fn test_config_loader_mutual_exclusivity_error() {
        let _guard = lock_env();
        let mut env = EnvGuard::clean();
        env.set(CONFIG_DIR_ENV, "/custom/config");
        env.set(CONFIG_FILE_ENV, "/path/to/config.toml");

        match ConfigLoader::new() {
            Err(err @ ConfigError::ConflictingSources) => {
                let msg = err.to_string();
                assert!(msg.contains("FUSION_CONFIG_DIR"));
                assert!(msg.contains("FUSION_CONFIG_FILE"));
            }
            other => panic!("Expected ConflictingSources, got {other:?}"),
        }
    }

    #[test]
    fn test_config_loader_environment_from_env() {
        let _guard = lock_env();
        let mut env = EnvGuard::clean();
        env.set(AppEnvironment::ENV_VAR, "production");

        let loader = ConfigLoader::new().expect("Should create loader");
        assert_eq!(loader.environment(), AppEnvironment::Production);

        let loader = loader.with_environment(AppEnvironment::Staging);
        assert_eq!(loader.environment(), AppEnvironment::Staging);
    }

    #[test]
    fn test_load_missing_default_toml() {
        let _guard = lock_env();
        let mut env = EnvGuard::clean();
        let temp_dir = setup_config_dir(&[]);
        env.set(CONFIG_DIR_ENV, temp_dir.path().to_str().unwrap());

        match ConfigLoader::new().unwrap().load() {
            Err(ConfigError::MissingFile { path }) => assert!(path.ends_with("default.toml")),
            other => panic!("Expected MissingFile error, got {other:?}"),
        }
    }

    #[test]
    fn test_load_default_toml_only() {
        let _guard = lock_env();
        let mut env = EnvGuard::clean();
        let temp_dir = setup_config_dir(&[("default.toml", DEFAULT_CONFIG)]);
        env.set(CONFIG_DIR_ENV, temp_dir.path().to_str().unwrap());

        let settings = ConfigLoader::new().unwrap().load().expect("Should load settings");

        assert_eq!(settings.application.name, "test-app");
        assert_eq!(settings.application.version, "1.0.0");
        assert_eq!(settings.lock.backend, LockBackend::Memory);
        assert!(settings.jobs.items.is_empty());
    }

    #[test]
    fn test_load_full_precedence_chain() {
        let _guard = lock_env();
        let mut env = EnvGuard::clean();

        let development_config = r#"
[application]
name = "dev-app"

[jobs]
shutdown_timeout_ms = 1000

[lock]
key_prefix = "dev"
"#;

        let local_config = r#"
[jobs]
shutdown_timeout_ms = 2000
"#;

        let temp_dir = setup_config_dir(&[
            ("default.toml", DEFAULT_CONFIG),
            ("development.toml", development_config),
            ("local.toml", local_config),
        ]);
        env.set(CONFIG_DIR_ENV, temp_dir.path().to_str().unwrap());
        env.set("FUSION_JOBS__ENABLED", "false");
        env.set("FUSION_LOGGER__LEVEL", "debug");

        let settings = ConfigLoader::new().unwrap().load().expect("Should load settings");

        // Environment variables have the highest priority
        assert!(!settings.jobs.enabled);
        assert_eq!(settings.logger.level, "debug");
        // local.toml overrides development.toml
        assert_eq!(settings.jobs.shutdown_timeout_ms, 2000);
        // development.toml overrides default.toml
        assert_eq!(settings.application.name, "dev-app");
        assert_eq!(settings.lock.key_prefix, "dev");
        // default.toml provides the rest
        assert_eq!(settings.application.version, "1.0.0");
        assert_eq!(settings.lock.backend, LockBackend::Memory);
    }

    #[test]
    fn test_optional_files_not_required() {
        let _guard = lock_env();
        let mut env = EnvGuard::clean();
        let temp_dir = setup_config_dir(&[("default.toml", DEFAULT_CONFIG)]);
        env.set(CONFIG_DIR_ENV, temp_dir.path().to_str().unwrap());
        env.set(AppEnvironment::ENV_VAR, "staging");

        let settings = ConfigLoader::new().unwrap().load().expect("Should load settings");
        assert_eq!(settings.application.name, "test-app");
    }

    #[test]
    fn test_load_single_file_mode_with_job_overrides() {
        let _guard = lock_env();
        let mut env = EnvGuard::clean();

        let single_config = r#"
[application]
name = "single-file-app"

[jobs]
shutdown_timeout_ms = 5000

[[jobs.items]]
id = "heartbeat"
fixed_rate_ms = 10000
mode = "ALL_NODES"

[[jobs.items]]
id = "log-cleanup"
enabled = false
"#;

        let temp_dir = setup_config_dir(&[("single.toml", single_config)]);
        env.set(
            CONFIG_FILE_ENV,
            temp_dir.path().join("single.toml").to_str().unwrap(),
        );

        let settings = ConfigLoader::new().unwrap().load().expect("Should load settings");

        assert_eq!(settings.application.name, "single-file-app");
        assert_eq!(settings.jobs.items.len(), 2);
        assert_eq!(settings.jobs.items[0].mode, Some(ExecutionMode::AllNodes));
        assert_eq!(settings.jobs.items[1].enabled, Some(false));
    }

    #[test]
    fn test_with_config_file_skips_layers() {
        let _guard = lock_env();
        let _env = EnvGuard::clean();

        let temp_dir = setup_config_dir(&[("custom.toml", "[jobs]\nenabled = false\n")]);
        let loader = ConfigLoader::new()
            .unwrap()
            .with_config_file(temp_dir.path().join("custom.toml"));

        let settings = loader.load().expect("Should load settings");
        assert!(!settings.jobs.enabled);
        assert_eq!(settings.application.name, "fusion-jobs");
    }

    #[test]
    fn test_invalid_settings_are_rejected() {
        let _guard = lock_env();
        let _env = EnvGuard::clean();

        let temp_dir = setup_config_dir(&[(
            "bad.toml",
            "[[jobs.items]]\nid = \"x\"\ncron = \"* * *\"\n",
        )]);
        let loader = ConfigLoader::new()
            .unwrap()
            .with_config_file(temp_dir.path().join("bad.toml"));

        match loader.load() {
            Err(ConfigError::InvalidOverride { index, job_id, .. }) => {
                assert_eq!(index, 0);
                assert_eq!(job_id, "x");
            }
            other => panic!("Expected InvalidOverride, got {other:?}"),
        }
    }
}
