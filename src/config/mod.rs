// Configuration module

mod args;
mod env;

pub use args::Args;

use anyhow::{bail, Context, Result};
use std::time::Duration;

/// Parse a threshold pair "TERM" or "TERM,KILL".
/// A missing kill value defaults to half of the terminate threshold.
fn parse_threshold_pair(s: &str) -> Result<(f64, f64)> {
    let parts: Vec<&str> = s.split(',').collect();
    let term: f64 = parts[0]
        .trim()
        .parse()
        .context("invalid threshold value")?;

    let kill: f64 = if parts.len() > 1 {
        parts[1].trim().parse().context("invalid kill threshold")?
    } else {
        term / 2.0
    };

    Ok((term, kill))
}

/// Split a comma-separated protected-name list, trimming each entry and
/// dropping empty ones.
fn parse_protected_names(s: &str) -> Vec<String> {
    s.split(',')
        .map(str::trim)
        .filter(|name| !name.is_empty())
        .map(str::to_string)
        .collect()
}

/// Runtime configuration, immutable for the daemon's lifetime.
#[derive(Debug, Clone)]
pub struct Config {
    /// SIGTERM when available memory drops to this percentage
    pub mem_term_percent: f64,
    /// SIGKILL when available memory drops to this percentage
    pub mem_kill_percent: f64,
    /// SIGTERM when free swap drops to this percentage
    pub swap_term_percent: f64,
    /// SIGKILL when free swap drops to this percentage
    pub swap_kill_percent: f64,

    /// Sleep between monitoring ticks
    pub interval: Duration,

    /// Rank victims by RSS instead of oom_score
    pub sort_by_rss: bool,
    /// Skip the swap leg of every threshold check
    pub ignore_swap: bool,
    /// Select and log but never signal
    pub dry_run: bool,
    /// Debug logging requested on the command line
    pub debug: bool,

    /// Process names never selected as victims (matched case-insensitively)
    pub protected: Vec<String>,
}

impl Config {
    /// Create configuration from command-line arguments, apply
    /// MEMSENTRY_* environment overrides, and validate the result.
    pub fn from_args(args: Args) -> Result<Self> {
        let mut config = Self::default();

        if let Some(mem) = args.mem_threshold {
            (config.mem_term_percent, config.mem_kill_percent) = parse_threshold_pair(&mem)?;
        }
        if let Some(swap) = args.swap_threshold {
            (config.swap_term_percent, config.swap_kill_percent) = parse_threshold_pair(&swap)?;
        }
        if let Some(secs) = args.interval {
            config.interval = Duration::from_secs(secs);
        }
        if let Some(names) = args.protect {
            config.protected = parse_protected_names(&names);
        }

        config.sort_by_rss = args.sort_by_rss;
        config.ignore_swap = args.ignore_swap;
        config.dry_run = args.dry_run;
        config.debug = args.debug;

        let config = env::apply_env_overrides(config)?;
        config.validate()?;

        Ok(config)
    }

    /// Validate configuration values
    fn validate(&self) -> Result<()> {
        for (name, value) in [
            ("memory terminate threshold", self.mem_term_percent),
            ("memory kill threshold", self.mem_kill_percent),
            ("swap terminate threshold", self.swap_term_percent),
            ("swap kill threshold", self.swap_kill_percent),
        ] {
            if !(0.0..=100.0).contains(&value) {
                bail!("{name} must be between 0 and 100, got {value}");
            }
        }

        if self.interval.is_zero() {
            bail!("interval must be greater than zero");
        }

        // Kill at or below the terminate threshold is convention, not a
        // hard rule.
        if self.mem_kill_percent > self.mem_term_percent {
            log::warn!(
                "memory kill threshold ({}) is greater than the terminate threshold ({})",
                self.mem_kill_percent,
                self.mem_term_percent
            );
        }
        if self.swap_kill_percent > self.swap_term_percent {
            log::warn!(
                "swap kill threshold ({}) is greater than the terminate threshold ({})",
                self.swap_kill_percent,
                self.swap_term_percent
            );
        }

        Ok(())
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            mem_term_percent: 10.0,
            mem_kill_percent: 5.0,
            swap_term_percent: 10.0,
            swap_kill_percent: 5.0,
            interval: Duration::from_secs(1),
            sort_by_rss: false,
            ignore_swap: false,
            dry_run: false,
            debug: false,
            protected: Vec::new(),
        }
    }
}
