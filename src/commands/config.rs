//! Handler for the `config` command.

use colored::*;

use lintbridge_lib::config::Config;
use lintbridge_lib::exit_codes::exit;

/// Print the effective configuration as YAML.
pub fn handle_config(config: &Config) {
    match config.to_yaml() {
        Ok(yaml) => print!("{yaml}"),
        Err(e) => {
            eprintln!("{}: {}", "Config error".red().bold(), e);
            exit::tool_error();
        }
    }
}
