//! Errors reported by the language handler.

use tower_lsp::jsonrpc;
use tower_lsp::lsp_types::Url;

use crate::errorformat::PatternError;
use crate::process::ProcessError;

#[derive(Debug, thiserror::Error)]
pub enum HandlerError {
    #[error("document not found: {0}")]
    DocumentNotFound(Url),

    #[error("invalid uri: {0}")]
    InvalidUri(Url),

    #[error(transparent)]
    InvalidFormat(#[from] PatternError),

    #[error("format for language {0:?} not supported")]
    FormatNotSupported(String),

    #[error("invalid position: line {line}, character {character}")]
    InvalidPosition { line: u32, character: u32 },

    #[error(transparent)]
    Process(#[from] ProcessError),
}

impl From<HandlerError> for jsonrpc::Error {
    fn from(err: HandlerError) -> Self {
        let code = match err {
            HandlerError::DocumentNotFound(_)
            | HandlerError::InvalidUri(_)
            | HandlerError::InvalidFormat(_)
            | HandlerError::InvalidPosition { .. } => jsonrpc::ErrorCode::InvalidParams,
            HandlerError::FormatNotSupported(_) | HandlerError::Process(_) => jsonrpc::ErrorCode::InternalError,
        };
        jsonrpc::Error {
            code,
            message: err.to_string().into(),
            data: None,
        }
    }
}
