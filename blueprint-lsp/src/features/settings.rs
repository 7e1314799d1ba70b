//! Per-document settings
//!
//! Every open document carries the settings that were current when it was opened or last
//! reconfigured. They start from the server configuration and are replaced by
//! `workspace/didChangeConfiguration` payloads of the form
//! `{"blueprintLanguageServer": {"maxNumberOfProblems": 50, "trace": {"server": "verbose"}}}`.
//! Keys missing from a payload keep their previous value.

use blueprint_config::ServerConfig;
use serde::Deserialize;
use serde_json::Value;
use tracing::warn;

/// Section of the client configuration read by the server.
pub const SETTINGS_SECTION: &str = "blueprintLanguageServer";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TraceLevel {
    #[default]
    Off,
    Messages,
    Verbose,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
pub struct TraceSettings {
    #[serde(default)]
    pub server: TraceLevel,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentSettings {
    /// Upper bound on the diagnostics published for one document.
    pub max_number_of_problems: usize,
    pub trace: TraceSettings,
}

impl Default for DocumentSettings {
    fn default() -> Self {
        Self {
            max_number_of_problems: 100,
            trace: TraceSettings::default(),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SettingsPatch {
    max_number_of_problems: Option<usize>,
    trace: Option<TraceSettings>,
}

impl DocumentSettings {
    pub fn from_config(config: &ServerConfig) -> Self {
        Self {
            max_number_of_problems: config.diagnostics.max_number_of_problems,
            trace: TraceSettings::default(),
        }
    }

    /// Apply a `didChangeConfiguration` payload. Returns `None` when the payload has no
    /// blueprint section or the section does not have the expected shape.
    pub fn apply_change(&self, payload: &Value) -> Option<Self> {
        let section = payload.get(SETTINGS_SECTION)?;
        let patch: SettingsPatch = match serde_json::from_value(section.clone()) {
            Ok(patch) => patch,
            Err(err) => {
                warn!(error = %err, "ignoring malformed {SETTINGS_SECTION} settings");
                return None;
            }
        };
        Some(Self {
            max_number_of_problems: patch
                .max_number_of_problems
                .unwrap_or(self.max_number_of_problems),
            trace: patch.trace.unwrap_or(self.trace),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn config_seeds_the_problem_limit() {
        let config = blueprint_config::load_defaults().unwrap();
        assert_eq!(
            DocumentSettings::from_config(&config),
            DocumentSettings::default()
        );
    }

    #[test]
    fn payloads_replace_present_keys() {
        let settings = DocumentSettings::default();
        let changed = settings
            .apply_change(&json!({
                "blueprintLanguageServer": { "maxNumberOfProblems": 3, "trace": { "server": "verbose" } }
            }))
            .unwrap();
        assert_eq!(changed.max_number_of_problems, 3);
        assert_eq!(changed.trace.server, TraceLevel::Verbose);

        let partial = changed
            .apply_change(&json!({ "blueprintLanguageServer": { "maxNumberOfProblems": 7 } }))
            .unwrap();
        assert_eq!(partial.max_number_of_problems, 7);
        assert_eq!(partial.trace.server, TraceLevel::Verbose);
    }

    #[test]
    fn foreign_or_malformed_payloads_are_ignored() {
        let settings = DocumentSettings::default();
        assert_eq!(settings.apply_change(&json!({ "editor": {} })), None);
        assert_eq!(
            settings.apply_change(&json!({ "blueprintLanguageServer": { "maxNumberOfProblems": "many" } })),
            None
        );
    }
}
