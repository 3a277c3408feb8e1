//! Node Configuration
//!
//! Validated settings for the two node kinds. Values arrive from the command
//! line (see `cli`) and are checked once here, before any socket is opened.

use anyhow::{Result, ensure};
use std::path::PathBuf;
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct ControllerConfig {
    /// Port clients and Dstores connect to. `0` picks an ephemeral port.
    pub port: u16,
    pub replication_factor: usize,
    /// Deadline for each STORE or REMOVE to collect its acknowledgements.
    pub timeout: Duration,
    /// Accepted for command-line compatibility; rebalancing is not performed.
    pub rebalance_period: Duration,
    /// How often cluster stats are logged. `Duration::ZERO` disables the reporter.
    pub stats_interval: Duration,
}

impl ControllerConfig {
    pub fn validate(self) -> Result<Self> {
        ensure!(
            self.replication_factor >= 1,
            "replication factor must be at least 1"
        );
        ensure!(!self.timeout.is_zero(), "timeout must be greater than zero");
        Ok(self)
    }
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            port: 0,
            replication_factor: 3,
            timeout: Duration::from_millis(1000),
            rebalance_period: Duration::from_secs(30),
            stats_interval: Duration::from_secs(5),
        }
    }
}

#[derive(Debug, Clone)]
pub struct DstoreConfig {
    /// Port clients connect to; also the identity announced in `JOIN`.
    pub port: u16,
    pub controller_host: String,
    pub controller_port: u16,
    /// Deadline for a client to deliver the bytes of a STORE.
    pub timeout: Duration,
    pub folder: PathBuf,
}

impl DstoreConfig {
    pub fn controller_addr(&self) -> String {
        format!("{}:{}", self.controller_host, self.controller_port)
    }

    pub fn validate(self) -> Result<Self> {
        ensure!(self.controller_port != 0, "controller port must be set");
        ensure!(!self.timeout.is_zero(), "timeout must be greater than zero");
        ensure!(
            !self.folder.as_os_str().is_empty(),
            "storage folder must be set"
        );
        Ok(self)
    }
}
