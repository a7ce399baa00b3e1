//! In-memory store of the documents the editor has open.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::RwLock;
use tower_lsp::lsp_types::Url;

use crate::error::HandlerError;
use crate::uri;

/// An open document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Document {
    pub language_id: String,
    pub text: String,
    pub version: i32,
}

/// Shared map of open documents.
///
/// Cloning the store shares the underlying map. Lint runs take a snapshot
/// of a document so later edits never change the text under a running tool.
#[derive(Debug, Clone, Default)]
pub struct DocumentStore {
    documents: Arc<RwLock<HashMap<Url, Document>>>,
}

impl DocumentStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn open(&self, uri: &Url, language_id: impl Into<String>, version: i32, text: impl Into<String>) {
        let document = Document {
            language_id: language_id.into(),
            text: text.into(),
            version,
        };
        self.documents.write().await.insert(uri::normalize(uri), document);
    }

    /// Replace the text of an open document.
    ///
    /// A missing `version` keeps the current one.
    pub async fn update(&self, uri: &Url, text: impl Into<String>, version: Option<i32>) -> Result<(), HandlerError> {
        let mut documents = self.documents.write().await;
        let document = documents
            .get_mut(&uri::normalize(uri))
            .ok_or_else(|| HandlerError::DocumentNotFound(uri.clone()))?;
        document.text = text.into();
        if let Some(version) = version {
            document.version = version;
        }
        Ok(())
    }

    pub async fn close(&self, uri: &Url) -> Option<Document> {
        self.documents.write().await.remove(&uri::normalize(uri))
    }

    /// Copy of the document as it is now.
    pub async fn get(&self, uri: &Url) -> Option<Document> {
        self.documents.read().await.get(&uri::normalize(uri)).cloned()
    }

    pub async fn version(&self, uri: &Url) -> Option<i32> {
        self.documents.read().await.get(&uri::normalize(uri)).map(|d| d.version)
    }
}
