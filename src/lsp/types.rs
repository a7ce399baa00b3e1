//! LSP-facing types: initialization options, capabilities and the client
//! notifier.

use serde::{Deserialize, Serialize};
use tower_lsp::Client;
use tower_lsp::lsp_types::*;

use crate::config::Config;
use crate::lint::Notifier;

/// `initializationOptions` understood by the server.
///
/// Each flag forces the matching capability even when no configured tool
/// provides it, for clients that only register handlers at startup.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase", default)]
pub struct InitializationOptions {
    pub document_formatting: bool,
    pub range_formatting: bool,
    pub hover: bool,
    pub document_symbol: bool,
}

impl InitializationOptions {
    /// Read the options, ignoring a payload of the wrong shape.
    pub fn from_value(value: Option<serde_json::Value>) -> Self {
        value
            .and_then(|value| match serde_json::from_value(value) {
                Ok(options) => Some(options),
                Err(e) => {
                    log::warn!("Ignoring invalid initializationOptions: {e}");
                    None
                }
            })
            .unwrap_or_default()
    }
}

/// Capabilities advertised for `config`.
pub fn server_capabilities(config: &Config, options: &InitializationOptions) -> ServerCapabilities {
    let formatting = options.document_formatting || config.has_format_command();
    let range_formatting = options.range_formatting || config.has_range_format_command();
    let hover = options.hover || config.has_hover_command();
    let symbols = options.document_symbol || config.has_symbol_command();

    ServerCapabilities {
        text_document_sync: Some(TextDocumentSyncCapability::Kind(TextDocumentSyncKind::FULL)),
        document_formatting_provider: formatting.then_some(OneOf::Left(true)),
        document_range_formatting_provider: range_formatting.then_some(OneOf::Left(true)),
        hover_provider: hover.then_some(HoverProviderCapability::Simple(true)),
        document_symbol_provider: symbols.then_some(OneOf::Left(true)),
        ..Default::default()
    }
}

/// Sends notifications to the connected editor.
pub struct ClientNotifier {
    client: Client,
}

impl ClientNotifier {
    pub fn new(client: Client) -> Self {
        Self { client }
    }
}

#[tower_lsp::async_trait]
impl Notifier for ClientNotifier {
    async fn publish_diagnostics(&self, uri: Url, diagnostics: Vec<Diagnostic>, version: Option<i32>) {
        self.client.publish_diagnostics(uri, diagnostics, version).await;
    }

    async fn log_message(&self, typ: MessageType, message: String) {
        self.client.log_message(typ, message).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::LanguageConfig;

    #[test]
    fn test_initialization_options() {
        let options = InitializationOptions::from_value(Some(serde_json::json!({
            "documentFormatting": true,
            "hover": true
        })));
        assert!(options.document_formatting);
        assert!(options.hover);
        assert!(!options.range_formatting);

        assert_eq!(
            InitializationOptions::from_value(Some(serde_json::json!("bogus"))),
            InitializationOptions::default()
        );
        assert_eq!(InitializationOptions::from_value(None), InitializationOptions::default());
    }

    #[test]
    fn test_capabilities_follow_configuration() {
        let capabilities = server_capabilities(&Config::default(), &InitializationOptions::default());
        assert!(capabilities.document_formatting_provider.is_none());
        assert!(capabilities.hover_provider.is_none());

        let mut config = Config::default();
        config.languages.insert(
            "go".to_string(),
            vec![LanguageConfig {
                format_command: "gofmt".to_string(),
                format_can_range: true,
                symbol_command: "ctags".to_string(),
                ..Default::default()
            }],
        );
        let capabilities = server_capabilities(&config, &InitializationOptions::default());
        assert_eq!(capabilities.document_formatting_provider, Some(OneOf::Left(true)));
        assert_eq!(capabilities.document_range_formatting_provider, Some(OneOf::Left(true)));
        assert_eq!(capabilities.document_symbol_provider, Some(OneOf::Left(true)));
        assert!(capabilities.hover_provider.is_none());
    }

    #[test]
    fn test_forced_capabilities() {
        let options = InitializationOptions {
            range_formatting: true,
            ..Default::default()
        };
        let capabilities = server_capabilities(&Config::default(), &options);
        assert_eq!(capabilities.document_range_formatting_provider, Some(OneOf::Left(true)));
    }
}
