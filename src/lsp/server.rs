//! tower-lsp server wiring LSP messages to the [`LanguageHandler`].

use std::sync::Arc;

use tower_lsp::jsonrpc::Result as JsonRpcResult;
use tower_lsp::lsp_types::*;
use tower_lsp::{Client, LanguageServer};

use crate::config::Config;
use crate::handler::LanguageHandler;
use crate::lsp::types::{ClientNotifier, InitializationOptions, server_capabilities};

/// LSP server bridging documents to external tools.
pub struct LintBridgeServer {
    client: Client,
    handler: LanguageHandler,
}

impl LintBridgeServer {
    pub fn new(client: Client, config: Config) -> Self {
        let notifier = Arc::new(ClientNotifier::new(client.clone()));
        Self {
            client,
            handler: LanguageHandler::new(config, notifier),
        }
    }

    pub fn handler(&self) -> &LanguageHandler {
        &self.handler
    }
}

#[tower_lsp::async_trait]
impl LanguageServer for LintBridgeServer {
    async fn initialize(&self, params: InitializeParams) -> JsonRpcResult<InitializeResult> {
        log::info!("Initializing lintbridge Language Server");

        #[allow(deprecated)]
        let root_uri = params
            .root_uri
            .or_else(|| params.workspace_folders.as_ref()?.first().map(|f| f.uri.clone()));
        if let Some(root_uri) = root_uri {
            self.handler.set_root(&root_uri).await?;
        }

        let options = InitializationOptions::from_value(params.initialization_options);
        let config = self.handler.session().config().await;

        Ok(InitializeResult {
            capabilities: server_capabilities(&config, &options),
            server_info: Some(ServerInfo {
                name: "lintbridge".to_string(),
                version: Some(env!("CARGO_PKG_VERSION").to_string()),
            }),
        })
    }

    async fn initialized(&self, _: InitializedParams) {
        log::info!("lintbridge Language Server initialized");
    }

    async fn shutdown(&self) -> JsonRpcResult<()> {
        log::info!("Shutting down lintbridge Language Server");
        self.handler.shutdown().await;
        Ok(())
    }

    async fn did_open(&self, params: DidOpenTextDocumentParams) {
        let document = params.text_document;
        self.handler
            .on_open(&document.uri, &document.language_id, document.version, document.text)
            .await;
    }

    async fn did_change(&self, params: DidChangeTextDocumentParams) {
        let uri = params.text_document.uri;
        // full sync: the last change carries the whole text
        let Some(change) = params.content_changes.into_iter().last() else {
            return;
        };
        if let Err(e) = self
            .handler
            .on_change(&uri, change.text, Some(params.text_document.version))
            .await
        {
            log::error!("didChange: {e}");
        }
    }

    async fn did_save(&self, params: DidSaveTextDocumentParams) {
        if let Err(e) = self.handler.on_save(&params.text_document.uri, params.text).await {
            log::error!("didSave: {e}");
        }
    }

    async fn did_close(&self, params: DidCloseTextDocumentParams) {
        self.handler.on_close(&params.text_document.uri).await;
    }

    async fn did_change_configuration(&self, params: DidChangeConfigurationParams) {
        let settings = match params.settings {
            serde_json::Value::Object(mut map) if map.contains_key("settings") => {
                map.remove("settings").unwrap_or_default()
            }
            other => other,
        };
        if settings.is_null() {
            return;
        }
        match Config::from_json_value(settings) {
            Ok(update) => {
                self.handler.update_configuration(update).await;
                log::info!("Configuration updated");
            }
            Err(e) => {
                log::error!("Invalid configuration: {e}");
                self.client
                    .log_message(MessageType::ERROR, format!("lintbridge: invalid configuration: {e}"))
                    .await;
            }
        }
    }

    async fn formatting(&self, params: DocumentFormattingParams) -> JsonRpcResult<Option<Vec<TextEdit>>> {
        Ok(self
            .handler
            .formatting(&params.text_document.uri, None, &params.options)
            .await?)
    }

    async fn range_formatting(&self, params: DocumentRangeFormattingParams) -> JsonRpcResult<Option<Vec<TextEdit>>> {
        Ok(self
            .handler
            .formatting(&params.text_document.uri, Some(params.range), &params.options)
            .await?)
    }

    async fn document_symbol(&self, params: DocumentSymbolParams) -> JsonRpcResult<Option<DocumentSymbolResponse>> {
        let symbols = self.handler.document_symbols(&params.text_document.uri).await?;
        Ok(Some(DocumentSymbolResponse::Flat(symbols)))
    }

    async fn hover(&self, params: HoverParams) -> JsonRpcResult<Option<Hover>> {
        let position = params.text_document_position_params;
        Ok(self
            .handler
            .hover(&position.text_document.uri, position.position)
            .await?)
    }
}
