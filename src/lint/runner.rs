//! One lint run over a document.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;
use tower_lsp::lsp_types::{Diagnostic, MessageType, Url};

use crate::error::HandlerError;
use crate::errorformat::ErrorFormat;
use crate::lint::mapper::DiagnosticMapper;
use crate::lint::{DEFAULT_LINT_FORMATS, EventSet, Notifier, select};
use crate::process::{self, ProcessError, ShellCommand};
use crate::session::Session;
use crate::{root, template, uri};

/// Diagnostics of a finished run, keyed by the document they belong to.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LintReport {
    /// Version of the linted document when the run started
    pub version: i32,
    pub diagnostics: HashMap<Url, Vec<Diagnostic>>,
}

/// Per language, the documents that received diagnostics from the last
/// workspace-wide run. They are sent an empty list once a later run stops
/// reporting them.
#[derive(Debug, Default)]
pub struct PublishedLedger {
    entries: Mutex<HashMap<String, HashSet<Url>>>,
}

impl PublishedLedger {
    pub async fn published(&self, language_id: &str) -> HashSet<Url> {
        self.entries.lock().await.get(language_id).cloned().unwrap_or_default()
    }

    pub async fn replace(&self, language_id: &str, uris: HashSet<Url>) {
        self.entries.lock().await.insert(language_id.to_string(), uris);
    }
}

/// Runs the configured lint tools for documents of a session.
#[derive(Debug, Clone)]
pub struct Linter {
    session: Arc<Session>,
    ledger: Arc<PublishedLedger>,
}

impl Linter {
    pub fn new(session: Arc<Session>) -> Self {
        Self {
            session,
            ledger: Arc::new(PublishedLedger::default()),
        }
    }

    pub fn session(&self) -> &Arc<Session> {
        &self.session
    }

    /// Lint `uri` with every tool that applies to one of `events`.
    ///
    /// Returns `Ok(None)` when the run was cancelled; nothing of a
    /// cancelled run may be published.
    pub async fn lint_document(
        &self,
        cancel: &CancellationToken,
        uri: &Url,
        events: impl Into<EventSet>,
        notifier: &dyn Notifier,
    ) -> Result<Option<LintReport>, HandlerError> {
        let document = self
            .session
            .documents
            .get(uri)
            .await
            .ok_or_else(|| HandlerError::DocumentNotFound(uri.clone()))?;
        let path = uri::to_file_path(uri).ok_or_else(|| HandlerError::InvalidUri(uri.clone()))?;
        let file = uri::to_slash(&path);

        let config = self.session.config().await;
        let tools = select::lint_configs(&config, &path, &document.language_id, events);
        if tools.is_empty() {
            log::info!("lint for language {:?} not supported", document.language_id);
            return Ok(Some(LintReport {
                version: document.version,
                diagnostics: HashMap::new(),
            }));
        }

        let session_root = self.session.root_path().await;
        let previous = self.ledger.published(&document.language_id).await;
        let mut diagnostics: HashMap<Url, Vec<Diagnostic>> = HashMap::from([(uri.clone(), Vec::new())]);
        let mut published = HashSet::new();
        let mut workspace_run = false;

        for tool in tools {
            if tool.lint_workspace {
                workspace_run = true;
                for stale in &previous {
                    diagnostics.entry(stale.clone()).or_default();
                }
            }

            let command =
                template::with_input_placeholder(&tool.lint_command, !tool.lint_stdin && !tool.lint_workspace);
            let root = root::resolve_root(&path, &tool.root_markers, &config.root_markers, &session_root);
            let command = template::replace_file_placeholders(&command, &file, &root);

            let formats: Vec<&str> = if tool.lint_formats.is_empty() {
                DEFAULT_LINT_FORMATS.to_vec()
            } else {
                tool.lint_formats.iter().map(String::as_str).collect()
            };
            let errorformat = ErrorFormat::new(&formats)?;

            let shell = ShellCommand::new(command.as_str(), root.as_path())
                .env(tool.env_pairs())
                .stdin(tool.lint_stdin.then(|| document.text.clone()));
            let output = match process::spawn_cancellable(&shell, cancel, config.command_timeout).await {
                Ok(output) => output,
                Err(ProcessError::Cancelled) => return Ok(None),
                Err(ProcessError::TimedOut(limit)) => {
                    let message = format!("command `{command}` timed out after {limit:?}");
                    log::warn!("{message}");
                    notifier.log_message(MessageType::WARNING, message).await;
                    continue;
                }
                Err(e) => return Err(e.into()),
            };

            // Linters report problems through a non-zero exit status. Output
            // of a successful run is usually a usage text, not diagnostics.
            if output.success && !tool.lint_ignore_exit_code {
                let message = format!(
                    "command `{command}` exit with zero. probably you forgot to specify `lint-ignore-exit-code: true`."
                );
                log::warn!("{message}");
                notifier.log_message(MessageType::ERROR, message).await;
                continue;
            }

            let combined = output.combined();
            log::debug!("{command}: {combined}");

            let mapper = DiagnosticMapper {
                tool,
                uri,
                file: &file,
                text: &document.text,
                root: &root,
            };
            for entry in errorformat.parse(&combined) {
                let Some((target, diagnostic)) = mapper.map(entry) else {
                    continue;
                };
                if tool.lint_workspace {
                    published.insert(target.clone());
                }
                diagnostics.entry(target).or_default().push(diagnostic);
            }
        }

        if cancel.is_cancelled() {
            return Ok(None);
        }
        if workspace_run {
            self.ledger.replace(&document.language_id, published).await;
        }

        Ok(Some(LintReport {
            version: document.version,
            diagnostics,
        }))
    }
}
