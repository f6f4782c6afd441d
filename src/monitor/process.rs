// Per-process accounting from the /proc tree

use std::fs;
use std::io;
use std::os::unix::fs::MetadataExt;
use std::path::Path;
use std::str::FromStr;
use std::sync::OnceLock;

use crate::error::ProcError;

/// One process observed at a point in time.
///
/// Pids may be reused by the kernel after process death, so the identity
/// only holds within the tick that produced the snapshot.
#[derive(Debug, Clone)]
pub struct ProcessSnapshot {
    pub pid: i32,
    /// Higher = more killable
    pub oom_score: i32,
    /// Resident set size in KiB
    pub rss_kib: u64,
    /// Kernel comm; may be truncated or contain unusual characters
    pub comm: String,
    /// Space-joined argv; empty for kernel threads
    pub cmdline: String,
    /// Owner of the /proc/<pid> directory entry
    pub uid: u32,
    /// Terminated but not yet reaped; never a valid victim
    pub is_zombie: bool,
}

impl ProcessSnapshot {
    /// Read a snapshot of the given pid from /proc.
    pub fn read(pid: i32) -> Result<Self, ProcError> {
        Self::read_from_dir(Path::new("/proc"), pid)
    }

    /// Read from a specific proc root (for testing).
    fn read_from_dir(proc_root: &Path, pid: i32) -> Result<Self, ProcError> {
        let dir = proc_root.join(pid.to_string());

        let oom_score = read_oom_score(&dir.join("oom_score"))?;
        let statm = StatmRecord::parse(&String::from_utf8_lossy(&fs::read(dir.join("statm"))?))?;
        let comm = String::from_utf8_lossy(&fs::read(dir.join("comm"))?)
            .trim()
            .to_string();
        let cmdline = decode_cmdline(&fs::read(dir.join("cmdline"))?);
        let stat = StatRecord::parse(&String::from_utf8_lossy(&fs::read(dir.join("stat"))?))?;
        let uid = owner_uid(&dir);

        Ok(Self {
            pid,
            oom_score,
            rss_kib: statm.resident * page_size_kib(),
            comm,
            cmdline,
            uid,
            is_zombie: stat.state == 'Z',
        })
    }
}

impl std::fmt::Display for ProcessSnapshot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "pid {} ({}): rss {} KiB, oom_score {}",
            self.pid, self.comm, self.rss_kib, self.oom_score
        )
    }
}

/// List the pids currently visible under /proc.
///
/// No ordering guarantee. The listing races with process churn; callers
/// handle vanished pids individually rather than treating the race as an
/// enumeration error.
pub fn enumerate_pids() -> io::Result<Vec<i32>> {
    enumerate_pids_in(Path::new("/proc"))
}

fn enumerate_pids_in(proc_root: &Path) -> io::Result<Vec<i32>> {
    let mut pids = Vec::new();
    for entry in fs::read_dir(proc_root)? {
        let entry = entry?;
        if let Ok(pid) = entry.file_name().to_string_lossy().parse::<i32>() {
            pids.push(pid);
        }
    }
    Ok(pids)
}

/// Read a snapshot for every pid, applying the per-process skip policy:
/// vanished or unreadable processes are dropped silently, malformed or
/// otherwise failing records are logged and dropped. The sweep never
/// aborts because of one bad pid.
pub fn collect_snapshots(pids: &[i32]) -> Vec<ProcessSnapshot> {
    collect_snapshots_in(Path::new("/proc"), pids)
}

fn collect_snapshots_in(proc_root: &Path, pids: &[i32]) -> Vec<ProcessSnapshot> {
    let mut snapshots = Vec::with_capacity(pids.len());
    for &pid in pids {
        match ProcessSnapshot::read_from_dir(proc_root, pid) {
            Ok(snapshot) => snapshots.push(snapshot),
            Err(err) if err.is_silent() => {}
            Err(err) => log::warn!("skipping pid {pid}: {err}"),
        }
    }
    snapshots
}

/// System page size in KiB, queried once; statm reports RSS in pages.
fn page_size_kib() -> u64 {
    static PAGE_KIB: OnceLock<u64> = OnceLock::new();
    *PAGE_KIB.get_or_init(|| {
        // SAFETY: sysconf takes no pointers and has no preconditions.
        #[allow(unsafe_code)]
        let bytes = unsafe { libc::sysconf(libc::_SC_PAGESIZE) };
        if bytes > 0 {
            bytes as u64 / 1024
        } else {
            4
        }
    })
}

/// The oom_score file holds a single integer; anything else means the
/// record itself is broken, not a lenient-zero subfield.
fn read_oom_score(path: &Path) -> Result<i32, ProcError> {
    let text = String::from_utf8_lossy(&fs::read(path)?).trim().to_string();
    text.parse()
        .map_err(|_| ProcError::Malformed(format!("oom_score: not an integer: {text:?}")))
}

/// argv lives NUL-separated with a trailing NUL terminator. Strip the
/// terminator(s), then join the remaining tokens with single spaces:
/// "foo\0bar\0\0" displays as "foo bar". Kernel threads have an empty
/// file and display as an empty string.
fn decode_cmdline(raw: &[u8]) -> String {
    let text = String::from_utf8_lossy(raw);
    let trimmed = text.trim_end_matches('\0');
    if trimmed.is_empty() {
        return String::new();
    }
    trimmed.split('\0').collect::<Vec<_>>().join(" ")
}

/// Ownership of the /proc/<pid> directory entry identifies the user,
/// independently of the stat record.
fn owner_uid(dir: &Path) -> u32 {
    match fs::metadata(dir) {
        Ok(meta) => meta.uid(),
        Err(err) => {
            log::debug!("cannot stat {}: {err}, treating uid as 0", dir.display());
            0
        }
    }
}

/// A numeric subfield of a structurally valid record falls back to zero.
/// Per-pid noise logs at debug so a full /proc sweep cannot flood the log.
fn lenient<T>(what: &str, field: &str) -> T
where
    T: FromStr + Default,
{
    field.parse().unwrap_or_else(|_| {
        log::debug!("unparseable {what} value {field:?}, treating as 0");
        T::default()
    })
}

/// The seven page-count fields of /proc/<pid>/statm. Only `resident`
/// feeds the snapshot; the rest are carried for completeness.
#[derive(Debug, Clone, Copy, Default)]
pub struct StatmRecord {
    pub size: u64,
    pub resident: u64,
    pub shared: u64,
    pub text: u64,
    pub lib: u64,
    pub data: u64,
    pub dt: u64,
}

impl StatmRecord {
    fn parse(input: &str) -> Result<Self, ProcError> {
        let fields: Vec<&str> = input.split_whitespace().collect();
        if fields.len() < 7 {
            return Err(ProcError::Malformed(format!(
                "statm: expected 7 fields, got {}",
                fields.len()
            )));
        }

        Ok(Self {
            size: lenient("statm size", fields[0]),
            resident: lenient("statm resident", fields[1]),
            shared: lenient("statm shared", fields[2]),
            text: lenient("statm text", fields[3]),
            lib: lenient("statm lib", fields[4]),
            data: lenient("statm data", fields[5]),
            dt: lenient("statm dt", fields[6]),
        })
    }
}

/// /proc/<pid>/stat with the process name isolated by the first `(` and
/// the *last* `)`. The comm may itself contain parentheses and
/// whitespace, so a naive split would corrupt every field after it.
///
/// Text before the first `(` is the pid; text after the last `)` must
/// split into at least 24 whitespace-separated fields, of which the
/// first carries the state code. Numeric fields are lenient-zero; the
/// delimiter structure and the field count are not.
#[derive(Debug, Clone, Default)]
pub struct StatRecord {
    pub pid: i32,
    pub comm: String,
    pub state: char,
    pub ppid: i32,
    pub pgrp: i32,
    pub session: i32,
    pub tty_nr: i32,
    pub tpgid: i32,
    pub flags: u32,
    pub minflt: u64,
    pub cminflt: u64,
    pub majflt: u64,
    pub cmajflt: u64,
    pub utime: u64,
    pub stime: u64,
    pub cutime: i64,
    pub cstime: i64,
    pub priority: i64,
    pub nice: i64,
    pub num_threads: i64,
    pub itrealvalue: i64,
    pub starttime: u64,
    pub vsize: u64,
    pub rss: i64,
}

impl StatRecord {
    fn parse(input: &str) -> Result<Self, ProcError> {
        let open = input
            .find('(')
            .ok_or_else(|| ProcError::Malformed("stat: no opening parenthesis".to_string()))?;
        let close = input
            .rfind(')')
            .ok_or_else(|| ProcError::Malformed("stat: no closing parenthesis".to_string()))?;
        if close < open {
            return Err(ProcError::Malformed(
                "stat: parenthesis pair inverted".to_string(),
            ));
        }

        let pid = lenient("stat pid", input[..open].trim());
        let comm = input[open + 1..close].to_string();

        let fields: Vec<&str> = input[close + 1..].split_whitespace().collect();
        if fields.len() < 24 {
            return Err(ProcError::Malformed(format!(
                "stat: expected at least 24 fields after the name, got {}",
                fields.len()
            )));
        }

        let state = fields[0].chars().next().unwrap_or('?');

        Ok(Self {
            pid,
            comm,
            state,
            ppid: lenient("stat ppid", fields[1]),
            pgrp: lenient("stat pgrp", fields[2]),
            session: lenient("stat session", fields[3]),
            tty_nr: lenient("stat tty_nr", fields[4]),
            tpgid: lenient("stat tpgid", fields[5]),
            flags: lenient("stat flags", fields[6]),
            minflt: lenient("stat minflt", fields[7]),
            cminflt: lenient("stat cminflt", fields[8]),
            majflt: lenient("stat majflt", fields[9]),
            cmajflt: lenient("stat cmajflt", fields[10]),
            utime: lenient("stat utime", fields[11]),
            stime: lenient("stat stime", fields[12]),
            cutime: lenient("stat cutime", fields[13]),
            cstime: lenient("stat cstime", fields[14]),
            priority: lenient("stat priority", fields[15]),
            nice: lenient("stat nice", fields[16]),
            num_threads: lenient("stat num_threads", fields[17]),
            itrealvalue: lenient("stat itrealvalue", fields[18]),
            starttime: lenient("stat starttime", fields[19]),
            vsize: lenient("stat vsize", fields[20]),
            rss: lenient("stat rss", fields[21]),
        })
    }
}
