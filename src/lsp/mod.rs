//! Language Server Protocol front end.
//!
//! The server speaks LSP over stdio, or over TCP on 127.0.0.1 for debugging
//! with `lintbridge server --port N`.

pub mod server;
pub mod types;

pub use server::LintBridgeServer;
pub use types::{ClientNotifier, InitializationOptions, server_capabilities};

use anyhow::Result;
use tokio::net::TcpListener;
use tower_lsp::{LspService, Server};

use crate::config::Config;

/// Serve LSP on stdin/stdout until the client exits.
pub async fn start_server(config: Config) -> Result<()> {
    let stdin = tokio::io::stdin();
    let stdout = tokio::io::stdout();

    let (service, socket) = LspService::new(move |client| LintBridgeServer::new(client, config));

    log::info!("Starting lintbridge Language Server Protocol server");

    Server::new(stdin, stdout, socket).serve(service).await;

    Ok(())
}

/// Serve LSP over TCP, one session per accepted connection.
pub async fn start_tcp_server(port: u16, config: Config) -> Result<()> {
    let listener = TcpListener::bind(format!("127.0.0.1:{port}")).await?;
    log::info!("lintbridge LSP server listening on 127.0.0.1:{port}");

    loop {
        let (stream, peer) = listener.accept().await?;
        log::info!("Accepted connection from {peer}");
        let config = config.clone();
        let (service, socket) = LspService::new(move |client| LintBridgeServer::new(client, config));

        tokio::spawn(async move {
            let (read, write) = tokio::io::split(stream);
            Server::new(read, write, socket).serve(service).await;
        });
    }
}
