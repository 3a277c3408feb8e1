//! Command-line interface: one binary, one subcommand per node kind.

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use std::time::Duration;

use crate::config::{ControllerConfig, DstoreConfig};

#[derive(Parser, Debug)]
#[command(name = "replicated_fs")]
#[command(about = "Replicated file storage cluster", long_about = None)]
pub struct Cli {
    /// Log at DEBUG instead of INFO
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the Controller
    Controller(ControllerArgs),
    /// Run a Dstore storage node
    Dstore(DstoreArgs),
}

#[derive(Args, Debug)]
pub struct ControllerArgs {
    /// Port clients and Dstores connect to
    #[arg(long)]
    pub cport: u16,

    /// Number of Dstores each file is stored on
    #[arg(short = 'r', long)]
    pub replication: usize,

    /// Acknowledgement timeout in milliseconds
    #[arg(long)]
    pub timeout: u64,

    /// Rebalance period in seconds (accepted, currently unused)
    #[arg(long, default_value = "30")]
    pub rebalance_period: u64,

    /// Seconds between cluster stats log lines, 0 to disable
    #[arg(long, default_value = "5")]
    pub stats_interval: u64,
}

#[derive(Args, Debug)]
pub struct DstoreArgs {
    /// Port clients connect to
    #[arg(long)]
    pub port: u16,

    /// Controller port
    #[arg(long)]
    pub cport: u16,

    /// Controller host
    #[arg(long, default_value = "127.0.0.1")]
    pub chost: String,

    /// Timeout in milliseconds for receiving file data
    #[arg(long)]
    pub timeout: u64,

    /// Folder the Dstore keeps its files in
    #[arg(long)]
    pub folder: PathBuf,
}

impl TryFrom<ControllerArgs> for ControllerConfig {
    type Error = anyhow::Error;

    fn try_from(args: ControllerArgs) -> anyhow::Result<Self> {
        ControllerConfig {
            port: args.cport,
            replication_factor: args.replication,
            timeout: Duration::from_millis(args.timeout),
            rebalance_period: Duration::from_secs(args.rebalance_period),
            stats_interval: Duration::from_secs(args.stats_interval),
        }
        .validate()
    }
}

impl TryFrom<DstoreArgs> for DstoreConfig {
    type Error = anyhow::Error;

    fn try_from(args: DstoreArgs) -> anyhow::Result<Self> {
        DstoreConfig {
            port: args.port,
            controller_host: args.chost,
            controller_port: args.cport,
            timeout: Duration::from_millis(args.timeout),
            folder: args.folder,
        }
        .validate()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_controller() {
        let cli = Cli::try_parse_from([
            "replicated_fs",
            "controller",
            "--cport",
            "4000",
            "-r",
            "3",
            "--timeout",
            "1000",
            "--rebalance-period",
            "60",
        ])
        .expect("Parse failed");

        let Commands::Controller(args) = cli.command else {
            panic!("Expected controller subcommand");
        };
        let config = ControllerConfig::try_from(args).expect("Invalid config");

        assert!(!cli.verbose);
        assert_eq!(config.port, 4000);
        assert_eq!(config.replication_factor, 3);
        assert_eq!(config.timeout, Duration::from_millis(1000));
        assert_eq!(config.rebalance_period, Duration::from_secs(60));
        assert_eq!(config.stats_interval, Duration::from_secs(5));
    }

    #[test]
    fn test_parse_dstore_with_global_verbose() {
        let cli = Cli::try_parse_from([
            "replicated_fs",
            "dstore",
            "--port",
            "4001",
            "--cport",
            "4000",
            "--timeout",
            "500",
            "--folder",
            "store1",
            "--verbose",
        ])
        .expect("Parse failed");

        assert!(cli.verbose);
        let Commands::Dstore(args) = cli.command else {
            panic!("Expected dstore subcommand");
        };
        let config = DstoreConfig::try_from(args).expect("Invalid config");
        assert_eq!(config.controller_addr(), "127.0.0.1:4000");
        assert_eq!(config.folder, PathBuf::from("store1"));
    }

    #[test]
    fn test_invalid_values_are_rejected() {
        let cli = Cli::try_parse_from([
            "replicated_fs",
            "controller",
            "--cport",
            "4000",
            "-r",
            "0",
            "--timeout",
            "1000",
        ])
        .expect("Parse failed");
        let Commands::Controller(args) = cli.command else {
            panic!("Expected controller subcommand");
        };
        assert!(ControllerConfig::try_from(args).is_err());

        assert!(Cli::try_parse_from(["replicated_fs", "controller", "--cport", "4000"]).is_err());
        assert!(Cli::try_parse_from(["replicated_fs", "dstore", "--port", "x"]).is_err());
    }
}
