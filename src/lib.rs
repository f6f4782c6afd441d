// memsentry - memory pressure monitor and early-OOM daemon library

pub mod config;
pub mod monitor;
pub mod killer;
pub mod daemon;
pub mod error;

// Re-export commonly used types
pub use config::Config;
pub use monitor::{MemStats, ProcessSnapshot};
