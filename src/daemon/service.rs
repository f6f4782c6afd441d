// The sample-decide-act loop

use std::thread;

use anyhow::{Context, Result};

use crate::config::Config;
use crate::killer::{self, KillMode, VictimSelector};
use crate::monitor::{self, MemStats, ProcessSnapshot};

/// Pressure verdict for one tick.
///
/// Both flags use `<=` and are evaluated independently from the same
/// sample, so an inverted threshold configuration can set `need_kill`
/// without `need_term`. The swap leg is skipped when swap checks are
/// disabled or the system has no swap configured.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pressure {
    pub need_term: bool,
    pub need_kill: bool,
}

impl Pressure {
    pub fn evaluate(stats: &MemStats, config: &Config) -> Self {
        let available = stats.available_percent();
        let swap_free = stats.swap_free_percent();
        let check_swap = !config.ignore_swap && stats.swap_total_kib > 0;

        Self {
            need_term: available <= config.mem_term_percent
                || (check_swap && swap_free <= config.swap_term_percent),
            need_kill: available <= config.mem_kill_percent
                || (check_swap && swap_free <= config.swap_kill_percent),
        }
    }

    pub const fn any(self) -> bool {
        self.need_term || self.need_kill
    }

    /// The harder threshold wins the choice of signal.
    pub const fn mode(self) -> KillMode {
        if self.need_kill {
            KillMode::Forceful
        } else {
            KillMode::Graceful
        }
    }
}

/// Owns the monitoring loop. Nothing crosses ticks except the immutable
/// configuration and the selector derived from it.
pub struct MonitorService {
    config: Config,
    selector: VictimSelector,
}

impl MonitorService {
    pub fn new(config: Config) -> Self {
        let selector = VictimSelector::new(&config);
        Self { config, selector }
    }

    /// Run ticks until the process is killed externally. Returns only
    /// when the memory stats become unreadable, which is fatal.
    pub fn run(&self) -> Result<()> {
        self.log_startup()?;

        loop {
            self.tick()?;
            // Plain sleep between ticks: they may drift late when a
            // full /proc sweep takes time, but never fire early.
            thread::sleep(self.config.interval);
        }
    }

    /// One sample-decide-act cycle.
    fn tick(&self) -> Result<()> {
        let stats = MemStats::read().context("failed to read memory stats")?;
        log::debug!("{stats}");

        let pressure = Pressure::evaluate(&stats, &self.config);
        if !pressure.any() {
            return Ok(());
        }

        let mode = pressure.mode();
        log::warn!(
            "memory pressure: {:.1}% memory available, {:.1}% swap free",
            stats.available_percent(),
            stats.swap_free_percent()
        );

        let pids = match monitor::enumerate_pids() {
            Ok(pids) => pids,
            Err(err) => {
                // Tick-recoverable: retry on the next tick.
                log::error!("failed to enumerate processes: {err}");
                return Ok(());
            }
        };

        let snapshots = monitor::collect_snapshots(&pids);
        let Some(victim) = self.selector.select(snapshots) else {
            log::warn!("no eligible victim, taking no action this tick");
            return Ok(());
        };

        log::warn!(
            "selected victim: pid={}, name={}, oom_score={}, rss={}, signal={mode}",
            victim.pid,
            victim.comm,
            victim.oom_score,
            MemStats::format_size(victim.rss_kib),
        );

        self.act(&victim, mode);
        Ok(())
    }

    /// Deliver the signal unless in dry-run mode. Delivery failures are
    /// logged and never escalate; the victim may simply have exited on
    /// its own between selection and signaling.
    fn act(&self, victim: &ProcessSnapshot, mode: KillMode) {
        if self.config.dry_run {
            log::info!("dry run: not signaling pid {}", victim.pid);
            return;
        }

        match killer::send(victim.pid, mode) {
            Ok(()) => log::info!("sent {mode} to pid {}", victim.pid),
            Err(err) => log::warn!("{err}"),
        }
    }

    fn log_startup(&self) -> Result<()> {
        let stats = MemStats::read().context("failed to read memory stats")?;

        log::info!("memsentry v{} starting", env!("CARGO_PKG_VERSION"));
        log::info!("{stats}");
        log::info!(
            "thresholds: SIGTERM at mem <= {:.1}% or swap <= {:.1}%, SIGKILL at mem <= {:.1}% or swap <= {:.1}%",
            self.config.mem_term_percent,
            self.config.swap_term_percent,
            self.config.mem_kill_percent,
            self.config.swap_kill_percent,
        );
        log::info!("poll interval: {}s", self.config.interval.as_secs());

        if self.config.ignore_swap {
            log::info!("swap checks disabled");
        }
        if self.config.sort_by_rss {
            log::info!("ranking victims by RSS instead of oom_score");
        }
        if !self.config.protected.is_empty() {
            log::info!("protected processes: {}", self.config.protected.join(", "));
        }
        if self.config.dry_run {
            log::warn!("dry run mode: no signal will be sent");
        }

        Ok(())
    }
}
