// Memory and process sampling

mod meminfo;
mod process;

pub use meminfo::MemStats;
pub use process::{collect_snapshots, enumerate_pids, ProcessSnapshot, StatRecord, StatmRecord};
