//! Shared configuration loader for the blueprint language server.
//!
//! `defaults/blueprint.default.toml` is embedded into the binary so that docs and
//! runtime behavior stay in sync. The server layers a user file on top of those
//! defaults via [`Loader`] before deserializing into [`ServerConfig`].

use config::builder::DefaultState;
use config::{Config, ConfigBuilder, ConfigError, File, FileFormat, ValueKind};
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;

const DEFAULT_TOML: &str = include_str!("../defaults/blueprint.default.toml");

/// Top-level configuration consumed by the language server.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    pub completion: CompletionConfig,
    pub diagnostics: DiagnosticsConfig,
    pub registry: RegistryConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CompletionConfig {
    pub cursor_leeway: usize,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DiagnosticsConfig {
    pub max_number_of_problems: usize,
    pub max_available_fields: usize,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RegistryConfig {
    pub timeout_ms: u64,
}

impl RegistryConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    pub filter: String,
}

/// Helper for layering user overrides over the built-in defaults.
#[derive(Debug, Clone)]
pub struct Loader {
    builder: ConfigBuilder<DefaultState>,
}

impl Loader {
    /// Start a loader seeded with the embedded defaults.
    pub fn new() -> Self {
        let builder = Config::builder().add_source(File::from_str(DEFAULT_TOML, FileFormat::Toml));
        Self { builder }
    }

    /// Layer a configuration file. Missing files trigger an error.
    pub fn with_file(mut self, path: impl AsRef<Path>) -> Self {
        let source = File::from(path.as_ref())
            .format(FileFormat::Toml)
            .required(true);
        self.builder = self.builder.add_source(source);
        self
    }

    /// Layer an optional configuration file (ignored if the file is absent).
    pub fn with_optional_file(mut self, path: impl AsRef<Path>) -> Self {
        let source = File::from(path.as_ref())
            .format(FileFormat::Toml)
            .required(false);
        self.builder = self.builder.add_source(source);
        self
    }

    /// Apply a single key/value override (useful for CLI settings).
    pub fn set_override<I>(mut self, key: &str, value: I) -> Result<Self, ConfigError>
    where
        I: Into<ValueKind>,
    {
        self.builder = self.builder.set_override(key, value)?;
        Ok(self)
    }

    /// Finalize the builder and deserialize the resulting configuration.
    pub fn build(self) -> Result<ServerConfig, ConfigError> {
        self.builder.build()?.try_deserialize()
    }
}

impl Default for Loader {
    fn default() -> Self {
        Self::new()
    }
}

/// Convenience helper for callers that only need the defaults.
pub fn load_defaults() -> Result<ServerConfig, ConfigError> {
    Loader::new().build()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn loads_default_config() {
        let config = load_defaults().expect("defaults to deserialize");
        assert_eq!(config.completion.cursor_leeway, 2);
        assert_eq!(config.diagnostics.max_number_of_problems, 100);
        assert_eq!(config.diagnostics.max_available_fields, 8);
        assert_eq!(config.registry.timeout(), Duration::from_secs(5));
        assert_eq!(config.logging.filter, "info");
    }

    #[test]
    fn supports_overrides() {
        let config = Loader::new()
            .set_override("diagnostics.max_number_of_problems", 10)
            .expect("override to apply")
            .build()
            .expect("config to build");
        assert_eq!(config.diagnostics.max_number_of_problems, 10);
    }

    #[test]
    fn user_files_layer_over_defaults() {
        let mut file = tempfile::Builder::new()
            .suffix(".toml")
            .tempfile()
            .expect("temp file");
        writeln!(file, "[completion]\ncursor_leeway = 0").expect("write config");

        let config = Loader::new()
            .with_file(file.path())
            .build()
            .expect("config to build");
        assert_eq!(config.completion.cursor_leeway, 0);
        assert_eq!(config.registry.timeout_ms, 5000);
    }

    #[test]
    fn missing_optional_files_are_ignored() {
        let config = Loader::new()
            .with_optional_file("/nonexistent/blueprint-ls.toml")
            .build()
            .expect("config to build");
        assert_eq!(config.completion.cursor_leeway, 2);
    }
}
