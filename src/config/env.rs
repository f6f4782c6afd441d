// Environment variable configuration support

use super::Config;
use anyhow::{Context, Result};
use std::env;
use std::time::Duration;

/// Apply MEMSENTRY_* environment overrides on top of the flag-derived
/// configuration.
pub fn apply_env_overrides(mut config: Config) -> Result<Config> {
    // Thresholds
    if let Ok(val) = env::var("MEMSENTRY_MEM_TERM") {
        config.mem_term_percent = val.parse().context("invalid MEMSENTRY_MEM_TERM")?;
    }
    if let Ok(val) = env::var("MEMSENTRY_MEM_KILL") {
        config.mem_kill_percent = val.parse().context("invalid MEMSENTRY_MEM_KILL")?;
    }
    if let Ok(val) = env::var("MEMSENTRY_SWAP_TERM") {
        config.swap_term_percent = val.parse().context("invalid MEMSENTRY_SWAP_TERM")?;
    }
    if let Ok(val) = env::var("MEMSENTRY_SWAP_KILL") {
        config.swap_kill_percent = val.parse().context("invalid MEMSENTRY_SWAP_KILL")?;
    }

    // Poll interval
    if let Ok(val) = env::var("MEMSENTRY_INTERVAL") {
        let secs: u64 = val.parse().context("invalid MEMSENTRY_INTERVAL")?;
        config.interval = Duration::from_secs(secs);
    }

    // Behavior flags
    if let Ok(val) = env::var("MEMSENTRY_SORT_BY_RSS") {
        config.sort_by_rss = parse_bool(&val)?;
    }
    if let Ok(val) = env::var("MEMSENTRY_IGNORE_SWAP") {
        config.ignore_swap = parse_bool(&val)?;
    }
    if let Ok(val) = env::var("MEMSENTRY_DRY_RUN") {
        config.dry_run = parse_bool(&val)?;
    }
    if let Ok(val) = env::var("MEMSENTRY_DEBUG") {
        config.debug = parse_bool(&val)?;
    }

    // Protected names
    if let Ok(val) = env::var("MEMSENTRY_PROTECT") {
        config.protected = super::parse_protected_names(&val);
    }

    Ok(config)
}

/// Parse boolean value from string
/// Accepts: true/false, 1/0, yes/no, on/off (case-insensitive)
fn parse_bool(s: &str) -> Result<bool> {
    match s.to_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Ok(true),
        "false" | "0" | "no" | "off" => Ok(false),
        _ => anyhow::bail!("invalid boolean value: {}", s),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_bool() {
        assert_eq!(parse_bool("true").unwrap(), true);
        assert_eq!(parse_bool("TRUE").unwrap(), true);
        assert_eq!(parse_bool("1").unwrap(), true);
        assert_eq!(parse_bool("yes").unwrap(), true);
        assert_eq!(parse_bool("on").unwrap(), true);

        assert_eq!(parse_bool("false").unwrap(), false);
        assert_eq!(parse_bool("FALSE").unwrap(), false);
        assert_eq!(parse_bool("0").unwrap(), false);
        assert_eq!(parse_bool("no").unwrap(), false);
        assert_eq!(parse_bool("off").unwrap(), false);

        assert!(parse_bool("invalid").is_err());
    }
}
