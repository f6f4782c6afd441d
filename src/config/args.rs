// Command-line argument parsing

use clap::Parser;

/// memsentry - memory pressure monitor and early-OOM daemon
///
/// Polls system memory and swap availability, and when either drops to a
/// configured percentage, signals the most killable process before the
/// kernel OOM killer engages.
#[derive(Parser, Debug)]
#[command(name = "memsentry")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Memory pressure monitor and early-OOM daemon", long_about = None)]
pub struct Args {
    /// Memory threshold PERCENT[,KILL_PERCENT] (default: 10,5)
    /// SIGTERM at the first value, SIGKILL at the second
    /// If only one value is given, the kill threshold defaults to half of it
    #[arg(short = 'm', long = "mem", value_name = "PERCENT[,KILL_PERCENT]")]
    pub mem_threshold: Option<String>,

    /// Swap threshold PERCENT[,KILL_PERCENT] (default: 10,5)
    /// Same shape as --mem; only consulted on systems with swap configured
    #[arg(short = 's', long = "swap", value_name = "PERCENT[,KILL_PERCENT]")]
    pub swap_threshold: Option<String>,

    /// Poll interval in seconds (default: 1)
    #[arg(short = 'i', long = "interval", value_name = "SECONDS")]
    pub interval: Option<u64>,

    /// Process names never selected as victims, comma-separated,
    /// matched case-insensitively (e.g. -p 'sshd,nginx')
    #[arg(short = 'p', long = "protect", value_name = "NAME[,NAME...]")]
    pub protect: Option<String>,

    /// Rank victims by RSS memory usage instead of oom_score
    #[arg(long = "sort-by-rss")]
    pub sort_by_rss: bool,

    /// Never let swap contribute to pressure
    #[arg(long = "ignore-swap")]
    pub ignore_swap: bool,

    /// Select and report a victim but never send any signal
    #[arg(long = "dry-run")]
    pub dry_run: bool,

    /// Enable debug logging
    #[arg(short = 'd', long = "debug")]
    pub debug: bool,
}

impl Args {
    /// Parse arguments from command line
    pub fn parse_args() -> Self {
        Self::parse()
    }
}
