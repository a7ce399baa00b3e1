//! Handler for the `server` command.

use colored::*;

use lintbridge_lib::config::Config;
use lintbridge_lib::exit_codes::exit;

/// Handle the server command: start the LSP server.
pub fn handle_server(port: Option<u16>, config: Config) {
    let runtime = tokio::runtime::Runtime::new().unwrap_or_else(|e| {
        eprintln!("{}: Failed to create Tokio runtime: {}", "Error".red().bold(), e);
        exit::tool_error();
    });

    runtime.block_on(async {
        if let Some(port) = port {
            // TCP mode for debugging
            if let Err(e) = lintbridge_lib::lsp::start_tcp_server(port, config).await {
                eprintln!("Failed to start LSP server on port {port}: {e}");
                exit::tool_error();
            }
        } else if let Err(e) = lintbridge_lib::lsp::start_server(config).await {
            eprintln!("Failed to start LSP server: {e}");
            exit::tool_error();
        }
    });

    // the blocking stdin reader would keep the runtime from shutting down
    exit::success();
}
