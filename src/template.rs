//! Command templating.
//!
//! Tool commands are shell strings with `${...}` placeholders:
//!
//! - `${INPUT}`: path of the document (forward slashes, parentheses escaped)
//! - `${FILENAME}`: path of the document in OS-native form
//! - `${FILEEXT}`: extension without the leading dot
//! - `${ROOT}`: resolved project root
//!
//! Format commands additionally understand option placeholders built from the
//! editor's formatting options and the requested range:
//!
//! - `${--flag:key}` → `--flag value`
//! - `${--flag=key}` → `--flag=value`
//! - `${--flag:!key}` / `${--flag=!key}` → `--flag` when the boolean `key` is false
//!
//! Boolean options render as the bare flag when true.

use std::collections::BTreeMap;
use std::path::Path;
use std::sync::LazyLock;

use regex::Regex;

pub const INPUT: &str = "${INPUT}";

static UNRESOLVED_PLACEHOLDER: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\$\{[^}]*\}").unwrap());

/// Value of a formatting option as sent by the editor.
#[derive(Debug, Clone, PartialEq)]
pub enum OptionValue {
    Bool(bool),
    Number(i64),
    String(String),
}

impl std::fmt::Display for OptionValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Bool(b) => write!(f, "{b}"),
            Self::Number(n) => write!(f, "{n}"),
            Self::String(s) => write!(f, "{s}"),
        }
    }
}

/// Append `${INPUT}` unless the tool reads stdin or already references it.
pub fn with_input_placeholder(command: &str, append: bool) -> String {
    if append && !command.contains(INPUT) {
        format!("{command} {INPUT}")
    } else {
        command.to_string()
    }
}

/// Substitute the file placeholders into `command`.
///
/// `file` uses forward slashes; `root` is the directory the command will run in.
pub fn replace_file_placeholders(command: &str, file: &str, root: &Path) -> String {
    let ext = Path::new(file).extension().map(|e| e.to_string_lossy().into_owned()).unwrap_or_default();
    let native = if cfg!(windows) { file.replace('/', "\\") } else { file.to_string() };
    let root = root.to_string_lossy();

    command
        .replace(INPUT, &escape_brackets(file))
        .replace("${FILEEXT}", &ext)
        .replace("${FILENAME}", &escape_brackets(&native))
        .replace("${ROOT}", &escape_brackets(&root))
}

fn escape_brackets(path: &str) -> String {
    path.replace('(', r"\(").replace(')', r"\)")
}

/// Substitute the `${flag:key}` / `${flag=key}` placeholders for every option.
pub fn replace_option_placeholders(command: &str, options: &BTreeMap<String, OptionValue>) -> String {
    let mut command = command.to_string();
    for (key, value) in options {
        let key = regex::escape(key);
        let spaced = Regex::new(&format!(r"\$\{{([^:}}]+):{key}\}}"));
        let joined = Regex::new(&format!(r"\$\{{([^=}}]+)={key}\}}"));
        let (Ok(spaced), Ok(joined)) = (spaced, joined) else {
            log::warn!("Skipping formatting option {key:?}: cannot build placeholder pattern");
            continue;
        };

        match value {
            OptionValue::Bool(true) => {
                command = spaced.replace_all(&command, "$1").into_owned();
                command = joined.replace_all(&command, "$1").into_owned();
            }
            OptionValue::Bool(false) => {
                let negated_spaced = Regex::new(&format!(r"\$\{{([^:}}]+):!{key}\}}"));
                let negated_joined = Regex::new(&format!(r"\$\{{([^=}}]+)=!{key}\}}"));
                if let (Ok(ns), Ok(nj)) = (negated_spaced, negated_joined) {
                    command = ns.replace_all(&command, "$1").into_owned();
                    command = nj.replace_all(&command, "$1").into_owned();
                }
            }
            other => {
                let value = other.to_string().replace('$', "$$");
                command = spaced.replace_all(&command, format!("${{1}} {value}")).into_owned();
                command = joined.replace_all(&command, format!("${{1}}={value}")).into_owned();
            }
        }
    }
    command
}

/// Remove every placeholder that is still unresolved.
pub fn strip_unresolved(command: &str) -> String {
    UNRESOLVED_PLACEHOLDER.replace_all(command, "").into_owned()
}

/// Flat character offset of `(row, col)` in `text`, clamping both into range.
pub fn row_col_to_index(text: &str, row: u32, col: u32) -> usize {
    let lines: Vec<&str> = text.split('\n').collect();
    let row = (row as usize).min(lines.len() - 1);
    let col = (col as usize).min(lines[row].chars().count());

    lines[..row].iter().map(|line| line.chars().count() + 1).sum::<usize>() + col
}
