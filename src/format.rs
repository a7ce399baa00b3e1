//! Running external formatters.
//!
//! Formatters run in declaration order, each on the output of the previous
//! one. The result is returned as line edits against the stored text.

use std::collections::BTreeMap;
use std::path::Path;
use std::time::{Duration, Instant};

use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;
use tower_lsp::lsp_types::{FormattingOptions, FormattingProperty, Range, TextEdit, Url};

use crate::config::{Config, LanguageConfig};
use crate::error::HandlerError;
use crate::lint::select::marker_satisfied;
use crate::process::{self, ShellCommand};
use crate::session::Session;
use crate::template::{self, OptionValue};
use crate::{diff, root, uri};

/// Rate limit for format requests.
///
/// A request arriving within `format-debounce` of the last accepted one is
/// dropped instead of queued.
#[derive(Debug, Default)]
pub struct FormatGate {
    not_before: Mutex<Option<Instant>>,
}

impl FormatGate {
    /// Whether a request may run now. Accepting it re-arms the gate.
    pub async fn try_enter(&self, debounce: Duration) -> bool {
        let mut not_before = self.not_before.lock().await;
        let now = Instant::now();
        if not_before.is_some_and(|instant| now < instant) {
            log::trace!("format debounced: {debounce:?}");
            return false;
        }
        *not_before = Some(now + debounce);
        true
    }
}

/// Format tools for a document of `language_id`.
pub fn format_configs<'a>(config: &'a Config, file: &Path, language_id: &str) -> Vec<&'a LanguageConfig> {
    config
        .configs_for(language_id)
        .filter(|tool| !tool.format_command.is_empty())
        .filter(|tool| marker_satisfied(tool, file))
        .collect()
}

/// Editor formatting options as placeholder values.
pub fn option_values(options: &FormattingOptions) -> BTreeMap<String, OptionValue> {
    let mut values = BTreeMap::from([
        ("tabSize".to_string(), OptionValue::Number(i64::from(options.tab_size))),
        ("insertSpaces".to_string(), OptionValue::Bool(options.insert_spaces)),
    ]);
    let optional = [
        ("trimTrailingWhitespace", options.trim_trailing_whitespace),
        ("insertFinalNewline", options.insert_final_newline),
        ("trimFinalNewlines", options.trim_final_newlines),
    ];
    for (key, value) in optional {
        if let Some(value) = value {
            values.insert(key.to_string(), OptionValue::Bool(value));
        }
    }
    for (key, property) in &options.properties {
        let value = match property {
            FormattingProperty::Bool(b) => OptionValue::Bool(*b),
            FormattingProperty::Number(n) => OptionValue::Number(i64::from(*n)),
            FormattingProperty::String(s) => OptionValue::String(s.clone()),
        };
        values.insert(key.clone(), value);
    }
    values
}

/// Placeholder values describing `range` within `text`.
pub fn range_values(text: &str, range: &Range) -> BTreeMap<String, OptionValue> {
    let char_start = template::row_col_to_index(text, range.start.line, range.start.character);
    let char_end = template::row_col_to_index(text, range.end.line, range.end.character);
    [
        ("charStart", char_start as i64),
        ("charEnd", char_end as i64),
        ("rowStart", i64::from(range.start.line)),
        ("colStart", i64::from(range.start.character)),
        ("rowEnd", i64::from(range.end.line)),
        ("colEnd", i64::from(range.end.character)),
    ]
    .into_iter()
    .map(|(key, value)| (key.to_string(), OptionValue::Number(value)))
    .collect()
}

/// Format `uri`, optionally limited to `range`.
///
/// Returns `Ok(None)` when no formatter is configured for the document.
pub async fn format_document(
    session: &Session,
    uri: &Url,
    range: Option<Range>,
    options: &FormattingOptions,
) -> Result<Option<Vec<TextEdit>>, HandlerError> {
    let document = session
        .documents
        .get(uri)
        .await
        .ok_or_else(|| HandlerError::DocumentNotFound(uri.clone()))?;
    let path = uri::to_file_path(uri).ok_or_else(|| HandlerError::InvalidUri(uri.clone()))?;
    let file = uri::to_slash(&path);

    let config = session.config().await;
    let tools = format_configs(&config, &path, &document.language_id);
    if tools.is_empty() {
        log::info!("format for language {:?} not supported", document.language_id);
        return Ok(None);
    }

    let session_root = session.root_path().await;
    let option_values = option_values(options);
    // never cancelled; `command-timeout` bounds the run and dropping the request
    // future kills the tool's process group
    let cancel = CancellationToken::new();
    let mut text = document.text.clone();
    let mut formatted = false;

    for tool in tools {
        let root = root::resolve_root(&path, &tool.root_markers, &config.root_markers, &session_root);
        let command = template::with_input_placeholder(&tool.format_command, !tool.format_stdin);
        let command = template::replace_file_placeholders(&command, &file, &root);
        let mut command = template::replace_option_placeholders(&command, &option_values);
        if let Some(range) = &range {
            command = template::replace_option_placeholders(&command, &range_values(&text, range));
        }
        let command = template::strip_unresolved(&command);

        let shell = ShellCommand::new(command.as_str(), root.as_path())
            .env(tool.env_pairs())
            .stdin(tool.format_stdin.then(|| text.clone()));
        let output = match process::spawn_cancellable(&shell, &cancel, config.command_timeout).await {
            Ok(output) => output,
            Err(e) => {
                log::warn!("{command}: {e}");
                continue;
            }
        };
        if !output.success {
            log::warn!("{command}: {}", output.stderr);
            continue;
        }

        log::debug!("{command}: {}", output.stdout);
        text = output.stdout.replace('\r', "");
        formatted = true;
    }

    if !formatted {
        return Err(HandlerError::FormatNotSupported(document.language_id));
    }
    log::debug!("format succeeded");
    Ok(Some(diff::compute_edits(&document.text, &text)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use tower_lsp::lsp_types::Position;

    #[tokio::test]
    async fn test_gate_drops_requests_inside_window() {
        let gate = FormatGate::default();
        assert!(gate.try_enter(Duration::from_secs(60)).await);
        assert!(!gate.try_enter(Duration::from_secs(60)).await);
    }

    #[tokio::test]
    async fn test_gate_without_debounce_never_drops() {
        let gate = FormatGate::default();
        assert!(gate.try_enter(Duration::ZERO).await);
        assert!(gate.try_enter(Duration::ZERO).await);
    }

    #[test]
    fn test_option_values() {
        let options = FormattingOptions {
            tab_size: 2,
            insert_spaces: true,
            properties: HashMap::from([("quote".to_string(), FormattingProperty::String("single".to_string()))]),
            trim_trailing_whitespace: Some(false),
            ..Default::default()
        };
        let values = option_values(&options);
        assert_eq!(values["tabSize"], OptionValue::Number(2));
        assert_eq!(values["insertSpaces"], OptionValue::Bool(true));
        assert_eq!(values["trimTrailingWhitespace"], OptionValue::Bool(false));
        assert_eq!(values["quote"], OptionValue::String("single".to_string()));
        assert!(!values.contains_key("insertFinalNewline"));
    }

    #[test]
    fn test_range_values() {
        let text = "ab\ncdef\ng";
        let range = Range::new(Position::new(1, 1), Position::new(2, 1));
        let values = range_values(text, &range);
        assert_eq!(values["charStart"], OptionValue::Number(4));
        assert_eq!(values["charEnd"], OptionValue::Number(9));
        assert_eq!(values["rowStart"], OptionValue::Number(1));
        assert_eq!(values["colEnd"], OptionValue::Number(1));
    }
}
