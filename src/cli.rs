//! Command-line interface definitions using clap
//!
//! This module defines the CLI structure for funnelboard using clap's derive macros.

use clap::{Args, Parser, Subcommand};

/// Funnelboard - marketing-funnel analytics over a hosted datastore
#[derive(Parser, Debug)]
#[command(name = "funnelboard")]
#[command(version)]
#[command(about = "Read-only funnel analytics dashboard and JSON API", long_about = None)]
pub struct Cli {
    /// Configuration file path (default: config.toml)
    #[arg(long, short = 'c', global = true)]
    pub config: Option<String>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Available commands
#[derive(Subcommand, Debug, PartialEq, Eq)]
pub enum Commands {
    /// Start the HTTP server (default when no command is given)
    Serve,

    /// Print a dashboard summary to the terminal
    Report(ReportArgs),

    /// Manage configuration
    Config {
        #[command(subcommand)]
        action: ConfigCommands,
    },
}

/// `report` 的过滤参数，与 `/dashboard` 的查询参数一致
#[derive(Args, Debug, Default, PartialEq, Eq)]
pub struct ReportArgs {
    /// Start day, inclusive (YYYY-MM-DD)
    #[arg(long)]
    pub from: Option<String>,

    /// End day, inclusive (YYYY-MM-DD)
    #[arg(long)]
    pub to: Option<String>,

    /// Case-insensitive code substring
    #[arg(long)]
    pub code: Option<String>,

    /// Rows per table
    #[arg(long)]
    pub limit: Option<usize>,

    /// Output the full dashboard as JSON
    #[arg(long)]
    pub json: bool,
}

/// Configuration management commands
#[derive(Subcommand, Debug, PartialEq, Eq)]
pub enum ConfigCommands {
    /// Generate example configuration file
    Generate {
        /// Output path (default: config.example.toml)
        output_path: Option<String>,

        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_subcommand_means_serve() {
        let cli = Cli::try_parse_from(["funnelboard"]).unwrap();
        assert_eq!(cli.command, None);
        assert_eq!(cli.config, None);
    }

    #[test]
    fn test_global_config_flag() {
        let cli = Cli::try_parse_from(["funnelboard", "report", "-c", "prod.toml"]).unwrap();
        assert_eq!(cli.config.as_deref(), Some("prod.toml"));
    }

    #[test]
    fn test_report_args() {
        let cli = Cli::try_parse_from([
            "funnelboard",
            "report",
            "--from",
            "2024-01-01",
            "--code",
            "spring",
            "--json",
        ])
        .unwrap();
        assert_eq!(
            cli.command,
            Some(Commands::Report(ReportArgs {
                from: Some("2024-01-01".to_string()),
                code: Some("spring".to_string()),
                json: true,
                ..Default::default()
            }))
        );
    }

    #[test]
    fn test_config_generate() {
        let cli = Cli::try_parse_from(["funnelboard", "config", "generate", "out.toml"]).unwrap();
        assert_eq!(
            cli.command,
            Some(Commands::Config {
                action: ConfigCommands::Generate {
                    output_path: Some("out.toml".to_string()),
                    force: false,
                }
            })
        );
    }
}
