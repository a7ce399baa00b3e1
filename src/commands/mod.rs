//! Command handlers for the lintbridge CLI.
//!
//! Each subcommand has its own module with a public handler function
//! that `main()` dispatches to.

pub mod config;
pub mod server;
pub mod version;

use std::path::PathBuf;

use colored::*;

use lintbridge_lib::config::{self as lintbridge_config, Config};
use lintbridge_lib::exit_codes::exit;

/// Load the configuration named on the command line, or the default file.
///
/// An explicit path must exist; a missing default file means an empty
/// configuration. Any error ends the process.
pub fn load_config(path: Option<&str>) -> Config {
    let result = match path {
        Some(path) => {
            let path = PathBuf::from(path);
            if !path.exists() {
                eprintln!(
                    "{}: Configuration file not found: {}",
                    "Error".red().bold(),
                    path.display()
                );
                exit::tool_error();
            }
            Config::load(&path)
        }
        None => match lintbridge_config::default_config_path() {
            Some(path) => Config::load_or_default(&path),
            None => Ok(Config::default()),
        },
    };

    result.unwrap_or_else(|e| {
        eprintln!("{}: {}", "Config error".red().bold(), e);
        exit::tool_error();
    })
}
