//! Shared helpers for the integration tests.
#![allow(dead_code)]

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use lintbridge_lib::config::{Config, LanguageConfig};
use lintbridge_lib::lint::Notifier;
use lintbridge_lib::session::Session;
use tokio::sync::Mutex;
use tower_lsp::lsp_types::{Diagnostic, MessageType, Url};

/// One `textDocument/publishDiagnostics` notification.
#[derive(Debug, Clone)]
pub struct Published {
    pub uri: Url,
    pub diagnostics: Vec<Diagnostic>,
    pub version: Option<i32>,
}

/// Notifier recording everything sent to the editor.
#[derive(Debug, Default)]
pub struct RecordingNotifier {
    pub published: Mutex<Vec<Published>>,
    pub messages: Mutex<Vec<(MessageType, String)>>,
}

impl RecordingNotifier {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub async fn published(&self) -> Vec<Published> {
        self.published.lock().await.clone()
    }

    pub async fn messages(&self) -> Vec<(MessageType, String)> {
        self.messages.lock().await.clone()
    }

    /// Wait until at least `count` notifications were published.
    pub async fn wait_for_published(&self, count: usize, timeout: Duration) -> Vec<Published> {
        let deadline = tokio::time::Instant::now() + timeout;
        loop {
            let published = self.published().await;
            if published.len() >= count || tokio::time::Instant::now() >= deadline {
                return published;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    }
}

#[tower_lsp::async_trait]
impl Notifier for RecordingNotifier {
    async fn publish_diagnostics(&self, uri: Url, diagnostics: Vec<Diagnostic>, version: Option<i32>) {
        self.published.lock().await.push(Published {
            uri,
            diagnostics,
            version,
        });
    }

    async fn log_message(&self, typ: MessageType, message: String) {
        self.messages.lock().await.push((typ, message));
    }
}

/// Config with `tools` registered for `language`.
pub fn config_with(language: &str, tools: Vec<LanguageConfig>) -> Config {
    let mut config = Config::default();
    config.languages.insert(language.to_string(), tools);
    config
}

pub fn file_uri(path: &Path) -> Url {
    Url::from_file_path(path).expect("absolute path")
}

/// Session rooted at `root` with `text` open as a `vim` document at `file`.
pub async fn session_with_document(config: Config, root: &Path, file: &Path, text: &str) -> (Arc<Session>, Url) {
    let session = Session::new(config);
    session.set_root_path(root.to_path_buf()).await;
    let uri = file_uri(file);
    session.documents.open(&uri, "vim", 1, text).await;
    (Arc::new(session), uri)
}
