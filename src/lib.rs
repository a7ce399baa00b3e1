//! lintbridge: a language server that runs external linters and formatters.
//!
//! Editors talk LSP to the server; for every document event the configured
//! command-line tools are run and their output is turned into diagnostics,
//! edits, symbols or hover text.

pub mod config;
pub mod diff;
pub mod document;
pub mod error;
pub mod errorformat;
pub mod exit_codes;
pub mod format;
pub mod handler;
pub mod hover;
pub mod lint;
pub mod lsp;
pub mod process;
pub mod root;
pub mod session;
pub mod symbol;
pub mod template;
pub mod uri;
pub mod word;

pub use config::{Config, LanguageConfig};
pub use error::HandlerError;
pub use handler::LanguageHandler;
pub use lint::{EventSet, EventType, Notifier};

/// Log filter for a configured verbosity tier.
///
/// 0 off, 1 warn, 2 info, 3 debug, 4 and above trace.
pub fn log_level_filter(level: u8) -> log::LevelFilter {
    match level {
        0 => log::LevelFilter::Off,
        1 => log::LevelFilter::Warn,
        2 => log::LevelFilter::Info,
        3 => log::LevelFilter::Debug,
        _ => log::LevelFilter::Trace,
    }
}
