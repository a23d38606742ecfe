use std::time::{Duration, Instant};

use sysinfo::{Pid, ProcessRefreshKind, ProcessesToUpdate, System};
use tracing::debug;

const LOG_TARGET: &str = "engine::monitor::probe";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ProcessSnapshot {
    pub memory_bytes: u64,
    pub threads: usize,
}

/// Samples this process's resident memory and thread count. Readings are
/// reused until `min_interval` has passed, so recording stays cheap under
/// load.
pub struct ProcessProbe {
    system: System,
    pid: Option<Pid>,
    min_interval: Duration,
    last_refresh: Option<Instant>,
    snapshot: ProcessSnapshot,
}

impl ProcessProbe {
    pub fn new(min_interval: Duration) -> Self {
        let pid = sysinfo::get_current_pid().ok();
        if pid.is_none() {
            debug!(target: LOG_TARGET, "Current pid unavailable; process metrics disabled");
        }
        Self {
            system: System::new(),
            pid,
            min_interval,
            last_refresh: None,
            snapshot: ProcessSnapshot::default(),
        }
    }

    pub fn sample(&mut self, now: Instant) -> ProcessSnapshot {
        let fresh = self
            .last_refresh
            .is_some_and(|at| now.saturating_duration_since(at) < self.min_interval);
        if !fresh {
            self.refresh();
            self.last_refresh = Some(now);
        }
        self.snapshot
    }

    fn refresh(&mut self) {
        let Some(pid) = self.pid else { return };
        self.system.refresh_processes_specifics(
            ProcessesToUpdate::Some(&[pid]),
            true,
            ProcessRefreshKind::everything(),
        );
        if let Some(process) = self.system.process(pid) {
            let threads = process
                .tasks()
                .map(|tasks| tasks.len())
                .filter(|n| *n > 0)
                .unwrap_or_else(task_dir_count);
            self.snapshot = ProcessSnapshot {
                memory_bytes: process.memory(),
                threads,
            };
        }
    }
}

impl std::fmt::Debug for ProcessProbe {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProcessProbe")
            .field("pid", &self.pid)
            .field("snapshot", &self.snapshot)
            .finish()
    }
}

/// Fallback for platforms where sysinfo does not list tasks.
fn task_dir_count() -> usize {
    std::fs::read_dir("/proc/self/task")
        .map(|d| d.count())
        .unwrap_or(1)
        .max(1)
}
