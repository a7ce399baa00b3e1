//! Configuration types for lintbridge.
//!
//! A configuration maps language identifiers (as sent by the editor in
//! `didOpen`) to an ordered list of external tool definitions. The special
//! language key [`WILDCARD`] applies to every document.
//!
//! ```yaml
//! version: 2
//! log-level: 1
//! root-markers: [.git/]
//! lint-debounce: 300ms
//!
//! languages:
//!   python:
//!     - lint-command: flake8 --stdin-display-name ${INPUT} -
//!       lint-stdin: true
//!       lint-formats: ["%f:%l:%c: %m"]
//!     - format-command: black --quiet -
//!       format-stdin: true
//! ```

use std::collections::HashMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Language key whose tools apply to every document.
pub const WILDCARD: &str = "=";

/// Errors that can occur when loading configuration
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Failed to read the configuration file
    #[error("Failed to read config file at {path}: {source}")]
    IoError { source: io::Error, path: String },

    /// Failed to parse the configuration content (YAML or JSON)
    #[error("Failed to parse config: {0}")]
    ParseError(String),
}

/// Top-level configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "kebab-case")]
pub struct Config {
    /// Configuration schema version (only version 2 is understood)
    #[serde(default)]
    pub version: u32,

    /// Verbosity tier: 0 off, 1 warn, 2 info, 3 debug, 4+ trace
    #[serde(default)]
    pub log_level: u8,

    /// Global root markers, used when a tool has none of its own
    #[serde(default)]
    pub root_markers: Vec<String>,

    /// Quiet period before a lint run starts
    #[serde(default, with = "duration_serde")]
    pub lint_debounce: Duration,

    /// Minimum interval between two format runs
    #[serde(default, with = "duration_serde")]
    pub format_debounce: Duration,

    /// Kill external commands that run longer than this
    #[serde(default, with = "duration_serde::option")]
    pub command_timeout: Option<Duration>,

    /// Tool configurations keyed by language id (or [`WILDCARD`])
    #[serde(default)]
    pub languages: HashMap<String, Vec<LanguageConfig>>,
}

/// Configuration of one external tool for one language.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case", default)]
pub struct LanguageConfig {
    /// Prepended to diagnostic messages as `[prefix] `
    pub prefix: String,

    pub lint_command: String,
    /// Error-format patterns for the lint output
    pub lint_formats: Vec<String>,
    /// Feed the document text on stdin instead of passing a file name
    pub lint_stdin: bool,
    /// Subtracted from reported line numbers
    pub lint_offset: i64,
    /// Added to reported (non-zero) columns
    pub lint_offset_columns: i64,
    /// Accept output of tools exiting with status zero
    pub lint_ignore_exit_code: bool,
    /// Maps tool-specific categories onto E/W/I/N
    pub lint_category_map: HashMap<String, String>,
    /// Diagnostic `source` tag
    pub lint_source: String,
    /// Default severity (1 error .. 4 hint), 0 means error
    pub lint_severity: u8,
    /// Output may reference files other than the linted one
    pub lint_workspace: bool,
    /// Run on `didOpen`
    pub lint_after_open: bool,
    /// Run only on `didSave`, never on `didChange`
    pub lint_on_save: bool,

    pub format_command: String,
    /// The format command understands range placeholders
    pub format_can_range: bool,
    pub format_stdin: bool,

    pub symbol_command: String,
    pub symbol_stdin: bool,
    pub symbol_formats: Vec<String>,

    pub hover_command: String,
    pub hover_stdin: bool,
    /// `markdown` or `plaintext`
    pub hover_type: String,

    /// Extra environment as `KEY=VALUE` entries
    pub env: Vec<String>,
    pub root_markers: Vec<String>,
    /// Skip this tool when none of its root markers is found
    pub require_marker: bool,
}

impl LanguageConfig {
    /// Environment overrides parsed from the `KEY=VALUE` list.
    ///
    /// Entries without `=` are ignored.
    pub fn env_pairs(&self) -> Vec<(String, String)> {
        self.env
            .iter()
            .filter_map(|entry| entry.split_once('='))
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }
}

impl Config {
    /// Load configuration from a YAML file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path).map_err(|source| ConfigError::IoError {
            source,
            path: path.display().to_string(),
        })?;
        Self::from_yaml(&content)
    }

    /// Load the configuration at `path`, or the default configuration when
    /// the file does not exist.
    pub fn load_or_default(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            log::info!("No configuration file at {}", path.display());
            return Ok(Self::default());
        }
        Self::load(path)
    }

    pub fn from_yaml(content: &str) -> Result<Self, ConfigError> {
        if content.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_yml::from_str(content).map_err(|e| ConfigError::ParseError(e.to_string()))
    }

    /// Parse the `settings` payload of `workspace/didChangeConfiguration`.
    pub fn from_json_value(value: serde_json::Value) -> Result<Self, ConfigError> {
        serde_json::from_value(value).map_err(|e| ConfigError::ParseError(e.to_string()))
    }

    pub fn to_yaml(&self) -> Result<String, ConfigError> {
        serde_yml::to_string(self).map_err(|e| ConfigError::ParseError(e.to_string()))
    }

    /// Apply a reloaded configuration on top of this one.
    ///
    /// Languages and root markers are replaced wholesale when the update
    /// carries any; scalar settings only when non-zero.
    pub fn merge_update(&mut self, update: Config) {
        if !update.languages.is_empty() {
            self.languages = update.languages;
        }
        if !update.root_markers.is_empty() {
            self.root_markers = update.root_markers;
        }
        if update.log_level > 0 {
            self.log_level = update.log_level;
        }
        if !update.lint_debounce.is_zero() {
            self.lint_debounce = update.lint_debounce;
        }
        if !update.format_debounce.is_zero() {
            self.format_debounce = update.format_debounce;
        }
        if update.command_timeout.is_some() {
            self.command_timeout = update.command_timeout;
        }
    }

    /// Configurations registered for `language_id`, followed by the
    /// wildcard configurations.
    pub fn configs_for<'a>(&'a self, language_id: &str) -> impl Iterator<Item = &'a LanguageConfig> + 'a {
        let specific = self.languages.get(language_id).into_iter().flatten();
        let wildcard = if language_id == WILDCARD {
            None
        } else {
            self.languages.get(WILDCARD)
        };
        specific.chain(wildcard.into_iter().flatten())
    }

    /// Whether any tool defines a format command.
    pub fn has_format_command(&self) -> bool {
        self.all_configs().any(|c| !c.format_command.is_empty())
    }

    /// Whether any formatting tool understands ranges.
    pub fn has_range_format_command(&self) -> bool {
        self.all_configs()
            .any(|c| !c.format_command.is_empty() && c.format_can_range)
    }

    pub fn has_hover_command(&self) -> bool {
        self.all_configs().any(|c| !c.hover_command.is_empty())
    }

    pub fn has_symbol_command(&self) -> bool {
        self.all_configs().any(|c| !c.symbol_command.is_empty())
    }

    fn all_configs(&self) -> impl Iterator<Item = &LanguageConfig> {
        self.languages.values().flatten()
    }
}

/// Default configuration file location: `<config dir>/lintbridge/config.yaml`,
/// where the config dir is `$XDG_CONFIG_HOME` (or `~/.config`) on unix and
/// `%APPDATA%` on Windows.
pub fn default_config_path() -> Option<PathBuf> {
    use etcetera::{BaseStrategy, choose_base_strategy};

    match choose_base_strategy() {
        Ok(strategy) => Some(strategy.config_dir().join("lintbridge").join("config.yaml")),
        Err(e) => {
            log::debug!("Failed to determine user config directory: {e}");
            None
        }
    }
}

/// Parse a Go-style duration string such as `300ms`, `1.5s` or `1m30s`.
pub fn parse_duration(input: &str) -> Result<Duration, String> {
    let input = input.trim();
    if input == "0" {
        return Ok(Duration::ZERO);
    }
    if input.is_empty() {
        return Err("empty duration".to_string());
    }

    let mut total = 0f64;
    let mut rest = input;
    while !rest.is_empty() {
        let number_len = rest
            .find(|c: char| !(c.is_ascii_digit() || c == '.'))
            .ok_or_else(|| format!("missing unit in duration {input:?}"))?;
        if number_len == 0 {
            return Err(format!("invalid duration {input:?}"));
        }
        let value: f64 = rest[..number_len]
            .parse()
            .map_err(|_| format!("invalid number in duration {input:?}"))?;
        rest = &rest[number_len..];

        let unit_len = rest
            .find(|c: char| c.is_ascii_digit() || c == '.')
            .unwrap_or(rest.len());
        let nanos_per_unit = match &rest[..unit_len] {
            "ns" => 1.0,
            "us" | "µs" => 1e3,
            "ms" => 1e6,
            "s" => 1e9,
            "m" => 60e9,
            "h" => 3600e9,
            unit => return Err(format!("unknown unit {unit:?} in duration {input:?}")),
        };
        total += value * nanos_per_unit;
        rest = &rest[unit_len..];
    }
    Ok(Duration::from_nanos(total as u64))
}

fn format_duration(duration: &Duration) -> String {
    if duration.is_zero() {
        return "0s".to_string();
    }
    let millis = duration.as_millis();
    if duration.subsec_nanos() % 1_000_000 == 0 {
        if millis % 1000 == 0 {
            format!("{}s", millis / 1000)
        } else {
            format!("{millis}ms")
        }
    } else {
        format!("{}ns", duration.as_nanos())
    }
}

/// Durations are read either as integer nanoseconds or as Go-style strings.
mod duration_serde {
    use super::*;

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum RawDuration {
        Nanos(u64),
        Text(String),
    }

    impl RawDuration {
        fn into_duration<E: serde::de::Error>(self) -> Result<Duration, E> {
            match self {
                RawDuration::Nanos(n) => Ok(Duration::from_nanos(n)),
                RawDuration::Text(s) => parse_duration(&s).map_err(E::custom),
            }
        }
    }

    pub fn serialize<S: Serializer>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&format_duration(duration))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        RawDuration::deserialize(deserializer)?.into_duration()
    }

    pub mod option {
        use super::*;

        pub fn serialize<S: Serializer>(duration: &Option<Duration>, serializer: S) -> Result<S::Ok, S::Error> {
            match duration {
                Some(d) => serializer.serialize_some(&format_duration(d)),
                None => serializer.serialize_none(),
            }
        }

        pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<Duration>, D::Error> {
            Option::<RawDuration>::deserialize(deserializer)?
                .map(RawDuration::into_duration)
                .transpose()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.log_level, 0);
        assert!(config.languages.is_empty());
        assert!(config.root_markers.is_empty());
        assert_eq!(config.lint_debounce, Duration::ZERO);
        assert_eq!(config.command_timeout, None);
    }

    #[test]
    fn test_deserialize_yaml() {
        let yaml = r#"
version: 2
log-level: 3
root-markers: [.git/]
lint-debounce: 300ms
format-debounce: 1000000000
command-timeout: 1m30s
languages:
  vim:
    - lint-command: vint -
      lint-stdin: true
      lint-formats: ["%f:%l:%c: %m"]
      lint-category-map:
        R: I
      env: ["FOO=bar", "BROKEN"]
  "=":
    - format-command: prettier
      format-can-range: true
"#;
        let config = Config::from_yaml(yaml).expect("Failed to parse YAML");

        assert_eq!(config.version, 2);
        assert_eq!(config.log_level, 3);
        assert_eq!(config.root_markers, vec![".git/"]);
        assert_eq!(config.lint_debounce, Duration::from_millis(300));
        assert_eq!(config.format_debounce, Duration::from_secs(1));
        assert_eq!(config.command_timeout, Some(Duration::from_secs(90)));

        let vim = &config.languages["vim"][0];
        assert_eq!(vim.lint_command, "vint -");
        assert!(vim.lint_stdin);
        assert_eq!(vim.lint_category_map.get("R").map(String::as_str), Some("I"));
        assert_eq!(vim.env_pairs(), vec![("FOO".to_string(), "bar".to_string())]);

        assert!(config.has_format_command());
        assert!(config.has_range_format_command());
        assert!(!config.has_hover_command());
    }

    #[test]
    fn test_empty_yaml_is_default() {
        assert_eq!(Config::from_yaml("  \n").unwrap(), Config::default());
    }

    #[test]
    fn test_invalid_yaml() {
        let result = Config::from_yaml("languages: [unclosed");
        assert!(matches!(result, Err(ConfigError::ParseError(_))));
    }

    #[test]
    fn test_configs_for_includes_wildcard_last() {
        let mut config = Config::default();
        config.languages.insert(
            "go".to_string(),
            vec![LanguageConfig {
                lint_command: "golint".to_string(),
                ..Default::default()
            }],
        );
        config.languages.insert(
            WILDCARD.to_string(),
            vec![LanguageConfig {
                lint_command: "misspell".to_string(),
                ..Default::default()
            }],
        );

        let commands: Vec<_> = config.configs_for("go").map(|c| c.lint_command.as_str()).collect();
        assert_eq!(commands, vec!["golint", "misspell"]);

        let commands: Vec<_> = config.configs_for("rust").map(|c| c.lint_command.as_str()).collect();
        assert_eq!(commands, vec!["misspell"]);
    }

    #[test]
    fn test_merge_update_keeps_unset_fields() {
        let mut config = Config {
            log_level: 2,
            root_markers: vec![".git/".to_string()],
            lint_debounce: Duration::from_millis(100),
            ..Default::default()
        };
        config.merge_update(Config {
            lint_debounce: Duration::from_millis(500),
            ..Default::default()
        });

        assert_eq!(config.log_level, 2);
        assert_eq!(config.root_markers, vec![".git/"]);
        assert_eq!(config.lint_debounce, Duration::from_millis(500));
    }

    #[test]
    fn test_json_settings() {
        let value = serde_json::json!({
            "languages": { "sh": [{ "lint-command": "shellcheck -f gcc -", "lint-stdin": true }] },
            "lint-debounce": "1s"
        });
        let config = Config::from_json_value(value).unwrap();
        assert_eq!(config.lint_debounce, Duration::from_secs(1));
        assert_eq!(config.languages["sh"][0].lint_command, "shellcheck -f gcc -");
    }

    #[test]
    fn test_parse_duration() {
        assert_eq!(parse_duration("0"), Ok(Duration::ZERO));
        assert_eq!(parse_duration("250ms"), Ok(Duration::from_millis(250)));
        assert_eq!(parse_duration("1.5s"), Ok(Duration::from_millis(1500)));
        assert_eq!(parse_duration("1h2m"), Ok(Duration::from_secs(3720)));
        assert!(parse_duration("10").is_err());
        assert!(parse_duration("5 parsecs").is_err());
        assert!(parse_duration("").is_err());
    }

    #[test]
    fn test_yaml_roundtrip_of_durations() {
        let config = Config {
            lint_debounce: Duration::from_millis(300),
            command_timeout: Some(Duration::from_secs(2)),
            ..Default::default()
        };
        let yaml = config.to_yaml().unwrap();
        assert!(yaml.contains("lint-debounce: 300ms"));
        assert_eq!(Config::from_yaml(&yaml).unwrap(), config);
    }
}
