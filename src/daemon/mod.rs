// Daemon module - the monitoring loop

mod service;

pub use service::{MonitorService, Pressure};

use crate::config::Config;
use anyhow::Result;

/// Run the monitor until the host environment kills it. The only error
/// that returns here is an unreadable memory-stats source, and that is
/// fatal: the monitor cannot act safely without memory data.
pub fn run(config: Config) -> Result<()> {
    MonitorService::new(config).run()
}
