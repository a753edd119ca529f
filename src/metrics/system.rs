use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::Mutex;
use sysinfo::{Pid, System};

const BYTES_PER_MB: u64 = 1024 * 1024;

/// Live resident-memory measurement for this process.
pub trait MemorySampler: Send + Sync {
    fn resident_mb(&self) -> u64;
}

/// Reads this process's resident set size through `sysinfo`.
pub struct ProcessMemorySampler {
    system: Mutex<System>,
    pid: Option<Pid>,
}

impl ProcessMemorySampler {
    pub fn new() -> Self {
        let pid = match sysinfo::get_current_pid() {
            Ok(pid) => Some(pid),
            Err(e) => {
                tracing::warn!(error = e, "cannot resolve own pid, memory will read as 0");
                None
            }
        };
        Self {
            system: Mutex::new(System::new()),
            pid,
        }
    }
}

impl Default for ProcessMemorySampler {
    fn default() -> Self {
        Self::new()
    }
}

impl MemorySampler for ProcessMemorySampler {
    fn resident_mb(&self) -> u64 {
        let Some(pid) = self.pid else {
            return 0;
        };
        let mut system = self.system.lock();
        if !system.refresh_process(pid) {
            return 0;
        }
        system
            .process(pid)
            .map(|p| bytes_to_mb(p.memory()))
            .unwrap_or(0)
    }
}

/// Always reports the value it was last given. Used by tests.
#[derive(Debug, Default)]
pub struct FixedMemorySampler {
    mb: AtomicU64,
}

impl FixedMemorySampler {
    pub fn new(mb: u64) -> Self {
        Self {
            mb: AtomicU64::new(mb),
        }
    }

    pub fn set(&self, mb: u64) {
        self.mb.store(mb, Ordering::SeqCst);
    }
}

impl MemorySampler for FixedMemorySampler {
    fn resident_mb(&self) -> u64 {
        self.mb.load(Ordering::SeqCst)
    }
}

/// Rounded to the nearest whole megabyte.
fn bytes_to_mb(bytes: u64) -> u64 {
    (bytes + BYTES_PER_MB / 2) / BYTES_PER_MB
}
