// Victim selection: filter, rank, pick exactly one

use std::collections::HashSet;

use crate::config::Config;
use crate::monitor::ProcessSnapshot;

/// Filters a tick's snapshots down to eligible victims and ranks them.
///
/// Ineligible: zombies (already dead, only awaiting reaping), pid 1, the
/// monitor itself, and protected names. Ranking is a stable descending
/// sort on a single key, so equal-keyed processes keep their enumeration
/// order and the earliest-enumerated one wins the tie.
pub struct VictimSelector {
    sort_by_rss: bool,
    protected: HashSet<String>,
    self_pid: i32,
}

impl VictimSelector {
    pub fn new(config: &Config) -> Self {
        Self {
            sort_by_rss: config.sort_by_rss,
            protected: config.protected.iter().map(|n| n.to_lowercase()).collect(),
            self_pid: std::process::id() as i32,
        }
    }

    /// Pin the monitor's own pid; tests use this to keep the self filter
    /// deterministic.
    pub fn with_self_pid(mut self, pid: i32) -> Self {
        self.self_pid = pid;
        self
    }

    /// Pick the single process to signal, or `None` when nothing is
    /// eligible.
    pub fn select(&self, snapshots: Vec<ProcessSnapshot>) -> Option<ProcessSnapshot> {
        let mut candidates: Vec<ProcessSnapshot> = snapshots
            .into_iter()
            .filter(|s| self.is_eligible(s))
            .collect();

        if candidates.is_empty() {
            log::debug!("no eligible victim after filtering");
            return None;
        }

        if self.sort_by_rss {
            candidates.sort_by(|a, b| b.rss_kib.cmp(&a.rss_kib));
        } else {
            candidates.sort_by(|a, b| b.oom_score.cmp(&a.oom_score));
        }

        if log::log_enabled!(log::Level::Debug) {
            log::debug!("top victim candidates:");
            for (i, candidate) in candidates.iter().take(5).enumerate() {
                log::debug!("  {}. {candidate}", i + 1);
            }
        }

        candidates.into_iter().next()
    }

    fn is_eligible(&self, snapshot: &ProcessSnapshot) -> bool {
        if snapshot.is_zombie {
            return false;
        }

        // Never the init process, never ourselves.
        if snapshot.pid == 1 || snapshot.pid == self.self_pid {
            return false;
        }

        if !self.protected.is_empty() && self.protected.contains(&snapshot.comm.to_lowercase()) {
            log::info!(
                "sparing protected process: pid={}, name={}",
                snapshot.pid,
                snapshot.comm
            );
            return false;
        }

        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn snapshot(pid: i32, comm: &str, rss_kib: u64, oom_score: i32) -> ProcessSnapshot {
        ProcessSnapshot {
            pid,
            oom_score,
            rss_kib,
            comm: comm.to_string(),
            cmdline: format!("/usr/bin/{comm}"),
            uid: 1000,
            is_zombie: false,
        }
    }

    fn selector(config: &Config) -> VictimSelector {
        // Pin self_pid so no test snapshot collides with the test runner.
        VictimSelector::new(config).with_self_pid(-1)
    }

    #[test]
    fn test_default_mode_picks_highest_oom_score() {
        let a = snapshot(100, "a", 100, 500);
        let b = snapshot(101, "b", 50, 900);

        let victim = selector(&Config::default()).select(vec![a, b]).unwrap();
        assert_eq!(victim.pid, 101);
    }

    #[test]
    fn test_rss_mode_picks_largest_resident_set() {
        let a = snapshot(100, "a", 100, 500);
        let b = snapshot(101, "b", 50, 900);

        let mut config = Config::default();
        config.sort_by_rss = true;
        let victim = selector(&config).select(vec![a, b]).unwrap();
        assert_eq!(victim.pid, 100);
    }

    #[test]
    fn test_zombies_are_never_selected() {
        let mut zombie = snapshot(200, "dead", 900_000, 999);
        zombie.is_zombie = true;
        let alive = snapshot(201, "alive", 100, 10);

        let victim = selector(&Config::default())
            .select(vec![zombie.clone(), alive])
            .unwrap();
        assert_eq!(victim.pid, 201);

        assert!(selector(&Config::default()).select(vec![zombie]).is_none());
    }

    #[test]
    fn test_init_and_self_are_never_selected() {
        let init = snapshot(1, "systemd", 10_000, 999);
        let me = snapshot(555, "memsentry", 2_000, 998);
        let other = snapshot(556, "other", 1_000, 10);

        let victim = VictimSelector::new(&Config::default())
            .with_self_pid(555)
            .select(vec![init, me, other])
            .unwrap();
        assert_eq!(victim.pid, 556);
    }

    #[test]
    fn test_protected_names_match_case_insensitively() {
        let mut config = Config::default();
        config.protected = vec!["sshd".to_string(), "PostgreSQL".to_string()];

        let sshd = snapshot(300, "SSHD", 5_000, 800);
        let postgres = snapshot(301, "postgresql", 50_000, 700);
        let expendable = snapshot(302, "expendable", 100, 5);

        let victim = selector(&config)
            .select(vec![sshd, postgres, expendable])
            .unwrap();
        assert_eq!(victim.pid, 302);
    }

    #[test]
    fn test_all_ineligible_yields_none() {
        let mut config = Config::default();
        config.protected = vec!["sacred".to_string()];

        let init = snapshot(1, "systemd", 10_000, 999);
        let protected = snapshot(400, "sacred", 10_000, 999);
        let mut zombie = snapshot(401, "gone", 10_000, 999);
        zombie.is_zombie = true;

        assert!(selector(&config).select(vec![init, protected, zombie]).is_none());
        assert!(selector(&config).select(Vec::new()).is_none());
    }

    #[test]
    fn test_equal_keys_keep_enumeration_order() {
        let first = snapshot(500, "first", 1_000, 42);
        let second = snapshot(501, "second", 1_000, 42);

        let victim = selector(&Config::default())
            .select(vec![first, second])
            .unwrap();
        assert_eq!(victim.pid, 500);
    }
}
