//! Hover text produced by external tools for the word under the cursor.

use tokio_util::sync::CancellationToken;
use tower_lsp::lsp_types::{Hover, HoverContents, MarkupContent, MarkupKind, Position, Range, Url};

use crate::error::HandlerError;
use crate::process::{self, ShellCommand};
use crate::session::Session;
use crate::template::INPUT;
use crate::{root, uri, word};

/// Quote `word` as a single shell argument.
fn shell_quote(word: &str) -> String {
    if cfg!(windows) {
        format!("\"{}\"", word.replace('"', "\"\""))
    } else {
        format!("'{}'", word.replace('\'', r"'\''"))
    }
}

/// Hover for the word at `position` in `uri`.
///
/// The first tool that succeeds provides the text. Returns `Ok(None)` when no
/// tool is configured or none succeeded.
pub async fn hover(session: &Session, uri: &Url, position: Position) -> Result<Option<Hover>, HandlerError> {
    let document = session
        .documents
        .get(uri)
        .await
        .ok_or_else(|| HandlerError::DocumentNotFound(uri.clone()))?;
    let path = uri::to_file_path(uri).ok_or_else(|| HandlerError::InvalidUri(uri.clone()))?;

    let word = word::word_at(&document.text, position.line, position.character).ok_or(
        HandlerError::InvalidPosition {
            line: position.line,
            character: position.character,
        },
    )?;

    let config = session.config().await;
    let session_root = session.root_path().await;
    let cancel = CancellationToken::new();
    let mut configured = false;

    for tool in config
        .configs_for(&document.language_id)
        .filter(|tool| !tool.hover_command.is_empty())
    {
        configured = true;
        let command = if tool.hover_stdin || tool.hover_command.contains(INPUT) {
            tool.hover_command.clone()
        } else {
            format!("{} {INPUT}", tool.hover_command)
        };
        let command = command.replace(INPUT, &shell_quote(&word.text));
        let root = root::resolve_root(&path, &tool.root_markers, &config.root_markers, &session_root);

        let shell = ShellCommand::new(command.as_str(), root.as_path())
            .env(tool.env_pairs())
            .stdin(tool.hover_stdin.then(|| word.text.clone()));
        let output = match process::spawn_cancellable(&shell, &cancel, config.command_timeout).await {
            Ok(output) if output.success => output,
            Ok(output) => {
                log::warn!("{command}: {}", output.stderr.trim());
                continue;
            }
            Err(e) => {
                log::warn!("{command}: {e}");
                continue;
            }
        };

        let kind = if tool.hover_type == "markdown" {
            MarkupKind::Markdown
        } else {
            MarkupKind::PlainText
        };
        return Ok(Some(Hover {
            contents: HoverContents::Markup(MarkupContent {
                kind,
                value: output.combined().trim().to_string(),
            }),
            range: Some(Range::new(
                Position::new(position.line, word.start),
                Position::new(position.line, word.end),
            )),
        }));
    }

    if !configured {
        log::info!("hover for language {:?} not supported", document.language_id);
    }
    Ok(None)
}
