//! Conversion of parsed tool output into diagnostics.

use std::collections::HashMap;
use std::path::Path;

use tower_lsp::lsp_types::{Diagnostic, DiagnosticSeverity, NumberOrString, Position, Range, Url};

use crate::config::LanguageConfig;
use crate::errorformat::Entry;
use crate::{uri, word};

/// File names tools print when they read the buffer from stdin.
pub fn is_buffer_placeholder(name: &str) -> bool {
    matches!(name, "stdin" | "-" | "<text>" | "<stdin>")
}

/// Severity for an entry of type `kind`.
///
/// The category map translates tool-specific types to `E`/`W`/`I`/`N`
/// first. Unknown types get the configured default, else error.
pub fn severity(kind: Option<char>, category_map: &HashMap<String, String>, default: u8) -> DiagnosticSeverity {
    let kind = kind.map(|k| {
        category_map
            .get(k.to_string().as_str())
            .and_then(|mapped| mapped.chars().next())
            .unwrap_or(k)
    });

    match kind.map(|k| k.to_ascii_uppercase()) {
        Some('E') => DiagnosticSeverity::ERROR,
        Some('W') => DiagnosticSeverity::WARNING,
        Some('I') => DiagnosticSeverity::INFORMATION,
        Some('N') => DiagnosticSeverity::HINT,
        _ => match default {
            2 => DiagnosticSeverity::WARNING,
            3 => DiagnosticSeverity::INFORMATION,
            4 => DiagnosticSeverity::HINT,
            _ => DiagnosticSeverity::ERROR,
        },
    }
}

/// Everything needed to map the output of one tool run.
pub struct DiagnosticMapper<'a> {
    pub tool: &'a LanguageConfig,
    /// Document being linted
    pub uri: &'a Url,
    /// Its path with forward slashes
    pub file: &'a str,
    /// Its text as handed to the tool
    pub text: &'a str,
    /// Working directory of the tool, for relative file names
    pub root: &'a Path,
}

impl DiagnosticMapper<'_> {
    /// Map one entry to the URI it targets and its diagnostic.
    ///
    /// Returns `None` for invalid entries and, unless the tool is
    /// workspace-wide, for entries about other files.
    pub fn map(&self, mut entry: Entry) -> Option<(Url, Diagnostic)> {
        if !entry.valid {
            return None;
        }

        if self.tool.lint_stdin && is_buffer_placeholder(&entry.filename) {
            entry.filename = self.file.to_string();
        } else if cfg!(windows) {
            entry.filename = entry.filename.replace('\\', "/");
        }

        // column 0 means the whole line and is never shifted
        let mut col = entry.col as i64;
        if self.tool.lint_offset_columns > 0 && col > 0 {
            col += self.tool.lint_offset_columns;
        }
        let has_col = col > 0;
        let line = entry.line.max(1) as i64;
        let col = col.max(1);

        let start_line = (line - 1 - self.tool.lint_offset).max(0) as u32;
        let start_char = (col - 1) as u32;

        let target = self.target_uri(&entry.filename)?;
        let own_document = uri::same_document(&target, self.uri);
        if !own_document && !self.tool.lint_workspace {
            return None;
        }
        let target = if own_document { self.uri.clone() } else { target };

        let end_char = if has_col && own_document {
            word::word_at(self.text, start_line, start_char)
                .map(|w| w.end.max(start_char))
                .unwrap_or(start_char)
        } else {
            start_char
        };

        let message = if self.tool.prefix.is_empty() {
            entry.message
        } else {
            format!("[{}] {}", self.tool.prefix, entry.message)
        };

        let diagnostic = Diagnostic {
            range: Range::new(Position::new(start_line, start_char), Position::new(start_line, end_char)),
            severity: Some(severity(entry.kind, &self.tool.lint_category_map, self.tool.lint_severity)),
            code: (entry.number != 0).then(|| NumberOrString::String(entry.number.to_string())),
            source: (!self.tool.lint_source.is_empty()).then(|| self.tool.lint_source.clone()),
            message,
            ..Default::default()
        };
        Some((target, diagnostic))
    }

    fn target_uri(&self, filename: &str) -> Option<Url> {
        if filename.is_empty() {
            return Some(self.uri.clone());
        }
        let path = Path::new(filename);
        let absolute = if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.root.join(path)
        };
        let target = uri::from_file_path(&absolute);
        if target.is_none() {
            log::debug!("Dropping diagnostic for unrepresentable path {}", absolute.display());
        }
        target
    }
}
