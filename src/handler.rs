//! Entry point for document events and requests, independent of transport.

use std::path::PathBuf;
use std::sync::Arc;

use tower_lsp::lsp_types::{FormattingOptions, Hover, Position, Range, SymbolInformation, TextEdit, Url};

use crate::config::Config;
use crate::error::HandlerError;
use crate::format::{self, FormatGate};
use crate::lint::{EventType, LintScheduler, Linter, Notifier};
use crate::session::Session;
use crate::{hover, symbol, uri};

/// Owns the session state and the lint scheduler.
pub struct LanguageHandler {
    session: Arc<Session>,
    scheduler: LintScheduler,
    format_gate: FormatGate,
    notifier: Arc<dyn Notifier>,
}

impl LanguageHandler {
    pub fn new(config: Config, notifier: Arc<dyn Notifier>) -> Self {
        let session = Arc::new(Session::new(config));
        let scheduler = LintScheduler::new(Linter::new(Arc::clone(&session)), Arc::clone(&notifier));
        Self {
            session,
            scheduler,
            format_gate: FormatGate::default(),
            notifier,
        }
    }

    pub fn session(&self) -> &Arc<Session> {
        &self.session
    }

    pub fn scheduler(&self) -> &LintScheduler {
        &self.scheduler
    }

    /// Record the workspace root sent by the editor.
    pub async fn set_root(&self, root_uri: &Url) -> Result<(), HandlerError> {
        let path = uri::to_file_path(root_uri).ok_or_else(|| HandlerError::InvalidUri(root_uri.clone()))?;
        self.session.set_root_path(clean(path)).await;
        Ok(())
    }

    /// Apply a configuration pushed by the editor.
    pub async fn update_configuration(&self, update: Config) {
        let config = self.session.update_config(update).await;
        if config.log_level > 0 {
            log::set_max_level(crate::log_level_filter(config.log_level));
        }
    }

    pub async fn on_open(&self, uri: &Url, language_id: &str, version: i32, text: String) {
        self.session.documents.open(uri, language_id, version, text).await;
        self.schedule_lint(uri, EventType::Open).await;
    }

    pub async fn on_change(&self, uri: &Url, text: String, version: Option<i32>) -> Result<(), HandlerError> {
        self.session.documents.update(uri, text, version).await?;
        self.schedule_lint(uri, EventType::Change).await;
        Ok(())
    }

    /// A save carrying text replaces the stored text first.
    pub async fn on_save(&self, uri: &Url, text: Option<String>) -> Result<(), HandlerError> {
        match text {
            Some(text) => self.session.documents.update(uri, text, None).await?,
            None if self.session.documents.get(uri).await.is_none() => {
                return Err(HandlerError::DocumentNotFound(uri.clone()));
            }
            None => {}
        }
        self.schedule_lint(uri, EventType::Save).await;
        Ok(())
    }

    pub async fn on_close(&self, uri: &Url) {
        self.scheduler.cancel(uri).await;
        self.session.documents.close(uri).await;
        self.notifier.publish_diagnostics(uri.clone(), Vec::new(), None).await;
    }

    async fn schedule_lint(&self, uri: &Url, event: EventType) {
        let debounce = self.session.config().await.lint_debounce;
        self.scheduler.schedule(uri, event, debounce).await;
    }

    /// Format a document, or the given range of it.
    ///
    /// Requests arriving within `format-debounce` of the previous one are
    /// answered with no edits.
    pub async fn formatting(
        &self,
        uri: &Url,
        range: Option<Range>,
        options: &FormattingOptions,
    ) -> Result<Option<Vec<TextEdit>>, HandlerError> {
        let debounce = self.session.config().await.format_debounce;
        if !self.format_gate.try_enter(debounce).await {
            return Ok(Some(Vec::new()));
        }
        format::format_document(&self.session, uri, range, options).await
    }

    pub async fn document_symbols(&self, uri: &Url) -> Result<Vec<SymbolInformation>, HandlerError> {
        symbol::document_symbols(&self.session, uri).await
    }

    pub async fn hover(&self, uri: &Url, position: Position) -> Result<Option<Hover>, HandlerError> {
        hover::hover(&self.session, uri, position).await
    }

    pub async fn shutdown(&self) {
        self.scheduler.shutdown().await;
    }
}

/// Lexically normalize a path: drop `.` components and resolve `..`.
fn clean(path: PathBuf) -> PathBuf {
    use std::path::Component;

    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                if !out.pop() {
                    out.push(component);
                }
            }
            other => out.push(other),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    #[cfg(unix)]
    fn test_clean() {
        assert_eq!(clean(PathBuf::from("/a/./b/../c")), PathBuf::from("/a/c"));
        assert_eq!(clean(PathBuf::from("/a/b/")), PathBuf::from("/a/b"));
    }
}
