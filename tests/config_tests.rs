//! Configuration file discovery and loading.

use std::fs;
use std::time::Duration;

use lintbridge_lib::config::{Config, default_config_path};
use serial_test::serial;

#[test]
#[serial]
#[cfg(unix)]
fn test_default_path_follows_xdg_config_home() {
    let temp = tempfile::tempdir().unwrap();
    let original = std::env::var_os("XDG_CONFIG_HOME");

    unsafe {
        std::env::set_var("XDG_CONFIG_HOME", temp.path());
    }
    let path = default_config_path();
    unsafe {
        match original {
            Some(value) => std::env::set_var("XDG_CONFIG_HOME", value),
            None => std::env::remove_var("XDG_CONFIG_HOME"),
        }
    }

    assert_eq!(path, Some(temp.path().join("lintbridge").join("config.yaml")));
}

#[test]
#[serial]
fn test_missing_default_file_is_empty_config() {
    let temp = tempfile::tempdir().unwrap();
    let config = Config::load_or_default(&temp.path().join("config.yaml")).unwrap();
    assert_eq!(config, Config::default());
}

#[test]
fn test_load_full_file() {
    let temp = tempfile::tempdir().unwrap();
    let path = temp.path().join("config.yaml");
    fs::write(
        &path,
        r#"version: 2
log-level: 3
root-markers:
  - .git/
lint-debounce: 1s
format-debounce: 500ms
command-timeout: 1m30s
languages:
  python:
    - lint-command: "flake8 --stdin-display-name ${INPUT} -"
      lint-stdin: true
      lint-formats:
        - "%f:%l:%c: %m"
      lint-category-map:
        F: E
      env:
        - "PYTHONIOENCODING=utf-8"
    - format-command: "black --quiet -"
      format-stdin: true
  "=":
    - lint-command: "codespell -"
      lint-ignore-exit-code: true
"#,
    )
    .unwrap();

    let config = Config::load(&path).unwrap();
    assert_eq!(config.log_level, 3);
    assert_eq!(config.root_markers, vec![".git/".to_string()]);
    assert_eq!(config.lint_debounce, Duration::from_secs(1));
    assert_eq!(config.format_debounce, Duration::from_millis(500));
    assert_eq!(config.command_timeout, Some(Duration::from_secs(90)));

    let python = &config.languages["python"];
    assert_eq!(python.len(), 2);
    assert!(python[0].lint_stdin);
    assert_eq!(python[0].lint_category_map["F"], "E");
    assert_eq!(
        python[0].env_pairs(),
        vec![("PYTHONIOENCODING".to_string(), "utf-8".to_string())]
    );
    assert_eq!(python[1].format_command, "black --quiet -");

    let tools: Vec<_> = config.configs_for("python").map(|t| t.lint_command.as_str()).collect();
    assert_eq!(tools, vec!["flake8 --stdin-display-name ${INPUT} -", "", "codespell -"]);
    assert!(config.has_format_command());
    assert!(!config.has_hover_command());
}

#[test]
fn test_load_reports_parse_errors() {
    let temp = tempfile::tempdir().unwrap();
    let path = temp.path().join("config.yaml");
    fs::write(&path, "lint-debounce: soon\n").unwrap();

    let error = Config::load(&path).unwrap_err();
    assert!(error.to_string().contains("Failed to parse config"));
}

#[test]
fn test_dump_and_reload() {
    let mut config = Config {
        lint_debounce: Duration::from_millis(250),
        ..Default::default()
    };
    config.languages.insert(
        "sh".to_string(),
        vec![lintbridge_lib::config::LanguageConfig {
            lint_command: "shellcheck -f gcc -".to_string(),
            lint_stdin: true,
            ..Default::default()
        }],
    );

    let reloaded = Config::from_yaml(&config.to_yaml().unwrap()).unwrap();
    assert_eq!(reloaded, config);
}
