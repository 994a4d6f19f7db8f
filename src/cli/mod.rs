//! CLI module for Switchyard
//!
//! # Commands
//!
//! - `serve` - Start the Switchyard server
//! - `backends` - Show configured backends
//! - `config` - Configuration utilities (init)
//! - `completions` - Generate shell completions
//!
//! # Example
//!
//! ```bash
//! # Start server with default config
//! switchyard serve
//!
//! # Configured backends as JSON
//! switchyard backends --json
//!
//! # Generate shell completions
//! switchyard completions bash > ~/.bash_completion.d/switchyard
//! ```

pub mod backends;
pub mod completions;
pub mod config;
pub mod output;
pub mod serve;

pub use backends::handle_backends;
pub use completions::handle_completions;
pub use config::handle_config_init;

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

/// Switchyard - health-aware inference router and agent job queue
#[derive(Parser, Debug)]
#[command(
    name = "switchyard",
    version,
    about = "Health-aware inference router with an agent job queue"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Start the Switchyard server
    Serve(ServeArgs),
    /// Show configured backends
    Backends(BackendsArgs),
    /// Configuration utilities
    #[command(subcommand)]
    Config(ConfigCommands),
    /// Generate shell completions
    Completions(CompletionsArgs),
}

#[derive(Args, Debug)]
pub struct ServeArgs {
    /// Path to configuration file
    #[arg(short, long, default_value = "switchyard.toml")]
    pub config: PathBuf,

    /// Override server port
    #[arg(short, long, env = "SWITCHYARD_PORT")]
    pub port: Option<u16>,

    /// Override server host
    #[arg(short = 'H', long, env = "SWITCHYARD_HOST")]
    pub host: Option<String>,

    /// Set log level (trace, debug, info, warn, error)
    #[arg(short, long, env = "SWITCHYARD_LOG_LEVEL")]
    pub log_level: Option<String>,

    /// Disable health checks
    #[arg(long)]
    pub no_health_check: bool,
}

#[derive(Args, Debug)]
pub struct BackendsArgs {
    /// Output as JSON
    #[arg(long)]
    pub json: bool,

    /// Path to configuration file
    #[arg(short, long, default_value = "switchyard.toml")]
    pub config: PathBuf,
}

#[derive(Subcommand, Debug)]
pub enum ConfigCommands {
    /// Write an annotated example configuration file
    Init(ConfigInitArgs),
}

#[derive(Args, Debug)]
pub struct ConfigInitArgs {
    /// Output file path
    #[arg(short, long, default_value = "switchyard.toml")]
    pub output: PathBuf,

    /// Overwrite existing file
    #[arg(short, long)]
    pub force: bool,
}

#[derive(Args, Debug)]
pub struct CompletionsArgs {
    /// Shell to generate completions for
    #[arg(value_enum)]
    pub shell: clap_complete::Shell,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[test]
    fn test_cli_parse_serve_defaults() {
        let cli = Cli::try_parse_from(["switchyard", "serve"]).unwrap();
        match cli.command {
            Commands::Serve(args) => {
                assert_eq!(args.config, PathBuf::from("switchyard.toml"));
                assert!(!args.no_health_check);
            }
            _ => panic!("Expected Serve command"),
        }
    }

    #[test]
    fn test_cli_parse_serve_with_overrides() {
        let cli = Cli::try_parse_from([
            "switchyard",
            "serve",
            "-c",
            "custom.toml",
            "-p",
            "9000",
            "--no-health-check",
        ])
        .unwrap();
        match cli.command {
            Commands::Serve(args) => {
                assert_eq!(args.config, PathBuf::from("custom.toml"));
                assert_eq!(args.port, Some(9000));
                assert!(args.no_health_check);
            }
            _ => panic!("Expected Serve command"),
        }
    }

    #[test]
    fn test_cli_parse_backends_json() {
        let cli = Cli::try_parse_from(["switchyard", "backends", "--json"]).unwrap();
        match cli.command {
            Commands::Backends(args) => assert!(args.json),
            _ => panic!("Expected Backends command"),
        }
    }

    #[test]
    fn test_cli_parse_config_init() {
        let cli =
            Cli::try_parse_from(["switchyard", "config", "init", "-o", "out.toml", "--force"])
                .unwrap();
        match cli.command {
            Commands::Config(ConfigCommands::Init(args)) => {
                assert_eq!(args.output, PathBuf::from("out.toml"));
                assert!(args.force);
            }
            _ => panic!("Expected Config Init command"),
        }
    }

    #[test]
    fn test_cli_rejects_unknown_command() {
        assert!(Cli::try_parse_from(["switchyard", "models"]).is_err());
    }
}
