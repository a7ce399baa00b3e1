//! Document symbols produced by external tools.
//!
//! Each output line is matched with the tool's `symbol-formats`; the message
//! has the form `kind!name`, e.g. `function!main`.

use tokio_util::sync::CancellationToken;
use tower_lsp::lsp_types::{Location, Position, Range, SymbolInformation, SymbolKind, Url};

use crate::error::HandlerError;
use crate::errorformat::ErrorFormat;
use crate::lint::mapper::is_buffer_placeholder;
use crate::process::{self, ShellCommand};
use crate::session::Session;
use crate::{root, template, uri};

pub const DEFAULT_SYMBOL_FORMATS: [&str; 1] = ["%f:%l:%c:%m"];

/// Symbol kind for a kind name as printed by tools, case-insensitive.
pub fn symbol_kind(name: &str) -> Option<SymbolKind> {
    let kind = match name.to_ascii_lowercase().as_str() {
        "file" => SymbolKind::FILE,
        "module" => SymbolKind::MODULE,
        "namespace" => SymbolKind::NAMESPACE,
        "package" => SymbolKind::PACKAGE,
        "class" => SymbolKind::CLASS,
        "method" => SymbolKind::METHOD,
        "property" => SymbolKind::PROPERTY,
        "field" => SymbolKind::FIELD,
        "constructor" => SymbolKind::CONSTRUCTOR,
        "enum" => SymbolKind::ENUM,
        "interface" => SymbolKind::INTERFACE,
        "function" => SymbolKind::FUNCTION,
        "variable" => SymbolKind::VARIABLE,
        "constant" => SymbolKind::CONSTANT,
        "string" => SymbolKind::STRING,
        "number" => SymbolKind::NUMBER,
        "boolean" => SymbolKind::BOOLEAN,
        "array" => SymbolKind::ARRAY,
        "object" => SymbolKind::OBJECT,
        "key" => SymbolKind::KEY,
        "null" => SymbolKind::NULL,
        "enummember" => SymbolKind::ENUM_MEMBER,
        "struct" => SymbolKind::STRUCT,
        "event" => SymbolKind::EVENT,
        "operator" => SymbolKind::OPERATOR,
        "typeparameter" => SymbolKind::TYPE_PARAMETER,
        _ => return None,
    };
    Some(kind)
}

/// Split a `kind!name` message. Messages without a kind are keys.
fn parse_symbol(message: &str) -> (SymbolKind, String) {
    match message.split_once('!') {
        Some((kind, name)) => (symbol_kind(kind).unwrap_or(SymbolKind::KEY), name.to_string()),
        None => (SymbolKind::KEY, message.to_string()),
    }
}

#[allow(deprecated)]
fn symbol(uri: &Url, kind: SymbolKind, name: String, position: Position) -> SymbolInformation {
    SymbolInformation {
        name,
        kind,
        tags: None,
        deprecated: None,
        location: Location::new(uri.clone(), Range::new(position, position)),
        container_name: None,
    }
}

/// Symbols of `uri` reported by every configured symbol tool.
pub async fn document_symbols(session: &Session, uri: &Url) -> Result<Vec<SymbolInformation>, HandlerError> {
    let document = session
        .documents
        .get(uri)
        .await
        .ok_or_else(|| HandlerError::DocumentNotFound(uri.clone()))?;
    let path = uri::to_file_path(uri).ok_or_else(|| HandlerError::InvalidUri(uri.clone()))?;
    let file = uri::to_slash(&path);

    let config = session.config().await;
    let session_root = session.root_path().await;
    let cancel = CancellationToken::new();
    let mut symbols = Vec::new();

    for tool in config
        .configs_for(&document.language_id)
        .filter(|tool| !tool.symbol_command.is_empty())
    {
        let root = root::resolve_root(&path, &tool.root_markers, &config.root_markers, &session_root);
        let command = template::with_input_placeholder(&tool.symbol_command, !tool.symbol_stdin);
        let command = template::replace_file_placeholders(&command, &file, &root);

        let formats: Vec<&str> = if tool.symbol_formats.is_empty() {
            DEFAULT_SYMBOL_FORMATS.to_vec()
        } else {
            tool.symbol_formats.iter().map(String::as_str).collect()
        };
        let errorformat = ErrorFormat::new(&formats)?;

        let shell = ShellCommand::new(command.as_str(), root.as_path())
            .env(tool.env_pairs())
            .stdin(tool.symbol_stdin.then(|| document.text.clone()));
        let output = match process::spawn_cancellable(&shell, &cancel, config.command_timeout).await {
            Ok(output) if output.success => output,
            Ok(output) => {
                log::warn!("{command}: exit status {}", output.exit_code);
                continue;
            }
            Err(e) => {
                log::warn!("{command}: {e}");
                continue;
            }
        };
        let combined = output.combined();
        log::debug!("{command}: {combined}");

        for entry in errorformat.parse(&combined).into_iter().filter(|e| e.valid) {
            let target = if tool.symbol_stdin && is_buffer_placeholder(&entry.filename) {
                path.clone()
            } else {
                root.join(&entry.filename)
            };
            let same = uri::from_file_path(&target).is_some_and(|target| uri::same_document(&target, uri));
            if !same {
                log::debug!("skipping symbol for {}", target.display());
                continue;
            }

            let (kind, name) = parse_symbol(&entry.message);
            let position = Position::new(
                entry.line.max(1) as u32 - 1,
                entry.col.max(1) as u32 - 1,
            );
            symbols.push(symbol(uri, kind, name, position));
        }
    }

    Ok(symbols)
}
