use clap::{Parser, Subcommand};

use lintbridge_lib::log_level_filter;

mod commands;

#[derive(Parser)]
#[command(author, version, about = "Language server for external linters and formatters", long_about = None)]
struct Cli {
    /// Configuration file path (default: $XDG_CONFIG_HOME/lintbridge/config.yaml)
    #[arg(short, long, global = true)]
    config: Option<String>,

    /// Log verbosity: 0 off, 1 warn, 2 info, 3 debug, 4 trace
    #[arg(long, global = true)]
    log_level: Option<u8>,

    /// Disable logging
    #[arg(short, long, global = true, default_value = "false")]
    quiet: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the language server on stdio (the default)
    Server {
        /// Listen on 127.0.0.1:<PORT> instead of stdio (for debugging)
        #[arg(long)]
        port: Option<u16>,
    },
    /// Show version information
    Version,
    /// Print the effective configuration as YAML
    Config,
}

fn init_logging(level: u8, quiet: bool) {
    let filter = if quiet { log::LevelFilter::Off } else { log_level_filter(level) };
    // stdout carries the LSP stream
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(filter.as_str()))
        .target(env_logger::Target::Stderr)
        .init();
}

/// Load the configuration and start logging; every command but `version` needs both.
fn setup(cli: &Cli) -> lintbridge_lib::config::Config {
    let config = commands::load_config(cli.config.as_deref());
    let level = cli
        .log_level
        .unwrap_or(if config.log_level == 0 { 1 } else { config.log_level });
    init_logging(level, cli.quiet);
    config
}

fn main() {
    let cli = Cli::parse();

    match cli.command {
        Some(Commands::Version) => commands::version::handle_version(),
        Some(Commands::Config) => commands::config::handle_config(&setup(&cli)),
        Some(Commands::Server { port }) => commands::server::handle_server(port, setup(&cli)),
        None => commands::server::handle_server(None, setup(&cli)),
    }
}
