//! Command-line interface.

use clap::{Parser, ValueEnum};
use std::path::PathBuf;

/// Check configuration and status of keepalived
///
/// Validates keepalived.conf for duplicate VRRP instances, router ids,
/// virtual IPs and virtual servers, then compares the declared VIPs with
/// the addresses present on this host.
#[derive(Debug, Parser)]
#[command(name = "keepalived-check")]
#[command(version, about, long_about = None)]
#[allow(clippy::struct_excessive_bools)]
pub struct Cli {
    /// keepalived configuration file [default: /etc/keepalived/keepalived.conf]
    #[arg(long = "file", short = 'f', value_name = "PATH")]
    pub conf_path: Option<PathBuf>,

    /// Disable the configuration test
    #[arg(long = "no-config-test", short = 'c')]
    pub no_config_test: bool,

    /// Disable the VIP status test
    #[arg(long = "no-status-test", short = 's')]
    pub no_status_test: bool,

    /// Trace every definition found while parsing
    #[arg(long, short)]
    pub verbose: bool,

    /// Priority at or above which this host should currently be MASTER [default: 10]
    #[arg(
        long = "priority-master",
        short = 'p',
        visible_alias = "priority",
        value_name = "N"
    )]
    pub priority_master: Option<u32>,

    /// Settings file (YAML)
    #[arg(long, value_name = "PATH")]
    pub settings: Option<PathBuf>,

    /// Report format
    #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
    pub format: OutputFormat,
}

/// Output format of the report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Colored human-readable text
    Text,
    /// A single JSON document
    Json,
}

impl Cli {
    /// Parse command-line arguments from the process environment.
    pub fn parse_args() -> Self {
        Self::parse()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    fn cli(args: &[&str]) -> Cli {
        let mut full = vec!["keepalived-check"];
        full.extend_from_slice(args);
        Cli::try_parse_from(full).unwrap()
    }

    #[test]
    fn test_command_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_defaults() {
        let cli = cli(&[]);
        assert!(cli.conf_path.is_none());
        assert!(!cli.no_config_test);
        assert!(!cli.no_status_test);
        assert!(!cli.verbose);
        assert!(cli.priority_master.is_none());
        assert_eq!(cli.format, OutputFormat::Text);
    }

    #[test]
    fn test_short_flags() {
        let cli = cli(&["-f", "/tmp/k.conf", "-c", "-s", "-v", "-p", "50"]);
        assert_eq!(cli.conf_path, Some(PathBuf::from("/tmp/k.conf")));
        assert!(cli.no_config_test);
        assert!(cli.no_status_test);
        assert!(cli.verbose);
        assert_eq!(cli.priority_master, Some(50));
    }

    #[test]
    fn test_priority_alias_and_format() {
        let cli = cli(&["--priority", "20", "--format", "json"]);
        assert_eq!(cli.priority_master, Some(20));
        assert_eq!(cli.format, OutputFormat::Json);
    }

    #[test]
    fn test_rejects_non_numeric_priority() {
        assert!(Cli::try_parse_from(["keepalived-check", "-p", "high"]).is_err());
    }
}
