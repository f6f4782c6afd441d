// System-wide memory and swap sampling from /proc/meminfo

use anyhow::{Context, Result};
use std::fs::File;
use std::io::{BufRead, BufReader};

/// One immutable sample of system memory and swap, in KiB.
///
/// A fresh sample is taken at the start of every monitoring tick and
/// discarded once the tick's decision is made.
#[derive(Debug, Clone, Copy, Default)]
pub struct MemStats {
    /// Total physical memory in KiB
    pub total_kib: u64,
    /// Available memory in KiB (kernel estimate, more useful than "free")
    pub available_kib: u64,
    /// Total swap space in KiB
    pub swap_total_kib: u64,
    /// Free swap space in KiB
    pub swap_free_kib: u64,
}

impl MemStats {
    /// Sample memory and swap from /proc/meminfo.
    pub fn read() -> Result<Self> {
        Self::read_from_path("/proc/meminfo")
    }

    /// Sample from a specific path (for testing)
    fn read_from_path(path: &str) -> Result<Self> {
        let file = File::open(path).with_context(|| format!("failed to open {path}"))?;
        let reader = BufReader::new(file);

        let mut total = None;
        let mut available = None;
        let mut swap_total = None;
        let mut swap_free = None;

        for line in reader.lines() {
            let line = line.with_context(|| format!("failed to read {path}"))?;
            let parts: Vec<&str> = line.split_whitespace().collect();

            if parts.len() < 2 {
                continue;
            }

            let key = parts[0].trim_end_matches(':');
            let slot = match key {
                "MemTotal" => &mut total,
                "MemAvailable" => &mut available,
                "SwapTotal" => &mut swap_total,
                "SwapFree" => &mut swap_free,
                _ => continue,
            };
            *slot = Some(lenient_kib(key, parts[1]));
        }

        Ok(Self {
            total_kib: key_or_zero(total, "MemTotal"),
            available_kib: key_or_zero(available, "MemAvailable"),
            swap_total_kib: key_or_zero(swap_total, "SwapTotal"),
            swap_free_kib: key_or_zero(swap_free, "SwapFree"),
        })
    }

    /// Percentage of memory still available.
    ///
    /// The division is unguarded: a source that never reported MemTotal
    /// yields Inf/NaN here, and both compare false against every threshold.
    pub fn available_percent(&self) -> f64 {
        (self.available_kib as f64 / self.total_kib as f64) * 100.0
    }

    /// Percentage of swap still free. A system without swap reports 100%,
    /// so swap never contributes to pressure there.
    pub fn swap_free_percent(&self) -> f64 {
        if self.swap_total_kib == 0 {
            return 100.0;
        }
        (self.swap_free_kib as f64 / self.swap_total_kib as f64) * 100.0
    }

    /// Format a KiB count in human-readable units.
    pub fn format_size(kib: u64) -> String {
        const MIB: u64 = 1024;
        const GIB: u64 = MIB * 1024;
        const TIB: u64 = GIB * 1024;

        if kib >= TIB {
            format!("{:.2} TiB", kib as f64 / TIB as f64)
        } else if kib >= GIB {
            format!("{:.2} GiB", kib as f64 / GIB as f64)
        } else if kib >= MIB {
            format!("{:.2} MiB", kib as f64 / MIB as f64)
        } else {
            format!("{kib} KiB")
        }
    }
}

/// The legacy reader treats an absent required key as zero rather than an
/// error; old kernels predate MemAvailable, so only warn.
fn key_or_zero(value: Option<u64>, key: &str) -> u64 {
    value.unwrap_or_else(|| {
        log::warn!("{key} missing from meminfo, treating as 0 KiB");
        0
    })
}

fn lenient_kib(key: &str, value: &str) -> u64 {
    value.parse().unwrap_or_else(|_| {
        log::warn!("unparseable {key} value {value:?} in meminfo, treating as 0 KiB");
        0
    })
}

impl std::fmt::Display for MemStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "memory: {}/{} ({:.1}% available), swap: {}/{} ({:.1}% free)",
            Self::format_size(self.available_kib),
            Self::format_size(self.total_kib),
            self.available_percent(),
            Self::format_size(self.swap_free_kib),
            Self::format_size(self.swap_total_kib),
            self.swap_free_percent(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_meminfo(content: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_available_percent_exact() {
        let cases = [
            (16_000_000_u64, 8_000_000_u64, 50.0_f64),
            (16_000_000, 0, 0.0),
            (16_000_000, 16_000_000, 100.0),
            (3, 1, 1.0 / 3.0 * 100.0),
        ];
        for (total, available, expected) in cases {
            let stats = MemStats {
                total_kib: total,
                available_kib: available,
                ..Default::default()
            };
            let percent = stats.available_percent();
            assert!((percent - expected).abs() < 1e-9);
            assert!((0.0..=100.0).contains(&percent));
        }
    }

    #[test]
    fn test_no_swap_reads_as_fully_free() {
        let stats = MemStats {
            total_kib: 16_000_000,
            available_kib: 8_000_000,
            swap_total_kib: 0,
            swap_free_kib: 0,
        };
        assert_eq!(stats.swap_free_percent(), 100.0);
    }

    #[test]
    fn test_zero_total_never_reads_as_pressure() {
        let stats = MemStats::default();
        // Inf or NaN, either way no threshold comparison may hold.
        assert!(!(stats.available_percent() <= 100.0));
    }

    #[test]
    fn test_read_full_sample() {
        let file = write_meminfo(
            "MemTotal:       16384000 kB\n\
             MemFree:         1024000 kB\n\
             MemAvailable:    8192000 kB\n\
             Buffers:          123456 kB\n\
             SwapCached:            0 kB\n\
             SwapTotal:       4096000 kB\n\
             SwapFree:        2048000 kB\n",
        );
        let stats = MemStats::read_from_path(file.path().to_str().unwrap()).unwrap();
        assert_eq!(stats.total_kib, 16_384_000);
        assert_eq!(stats.available_kib, 8_192_000);
        assert_eq!(stats.swap_total_kib, 4_096_000);
        assert_eq!(stats.swap_free_kib, 2_048_000);
        assert_eq!(stats.available_percent(), 50.0);
        assert_eq!(stats.swap_free_percent(), 50.0);
    }

    #[test]
    fn test_missing_keys_fall_back_to_zero() {
        let file = write_meminfo("MemTotal:       16384000 kB\n");
        let stats = MemStats::read_from_path(file.path().to_str().unwrap()).unwrap();
        assert_eq!(stats.total_kib, 16_384_000);
        assert_eq!(stats.available_kib, 0);
        assert_eq!(stats.swap_total_kib, 0);
        assert_eq!(stats.swap_free_kib, 0);
    }

    #[test]
    fn test_garbage_value_falls_back_to_zero() {
        let file = write_meminfo("MemTotal:       sixteen kB\nMemAvailable:    8192000 kB\n");
        let stats = MemStats::read_from_path(file.path().to_str().unwrap()).unwrap();
        assert_eq!(stats.total_kib, 0);
        assert_eq!(stats.available_kib, 8_192_000);
    }

    #[test]
    fn test_unreadable_source_is_an_error() {
        assert!(MemStats::read_from_path("/nonexistent/meminfo").is_err());
    }

    #[test]
    fn test_format_size() {
        assert_eq!(MemStats::format_size(512), "512 KiB");
        assert_eq!(MemStats::format_size(1024), "1.00 MiB");
        assert_eq!(MemStats::format_size(1536), "1.50 MiB");
        assert_eq!(MemStats::format_size(1024 * 1024), "1.00 GiB");
        assert_eq!(MemStats::format_size(1024 * 1024 * 1024), "1.00 TiB");
    }

    #[test]
    fn test_display_summary() {
        let stats = MemStats {
            total_kib: 16_384_000,
            available_kib: 8_192_000,
            swap_total_kib: 4_096_000,
            swap_free_kib: 1_024_000,
        };
        let line = stats.to_string();
        assert!(line.contains("50.0% available"));
        assert!(line.contains("25.0% free"));
    }
}
