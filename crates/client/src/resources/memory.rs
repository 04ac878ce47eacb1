//! Heap sampling and memory pressure detection.
//!
//! The monitor is a latch: the first sample above the threshold emits one
//! [`PressureEvent`]; later samples stay silent until usage drops back to or
//! below the threshold.

use std::sync::Mutex;

use serde::Serialize;
use sysinfo::{Pid, ProcessRefreshKind, ProcessesToUpdate, System, get_current_pid};

/// One heap reading.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HeapSample {
    pub used_bytes: u64,
    pub total_bytes: u64,
    pub limit_bytes: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct MemoryMetrics {
    pub used_bytes: u64,
    pub total_bytes: u64,
    pub limit_bytes: u64,
    pub threshold_bytes: u64,
}

#[derive(Debug, Clone, Serialize)]
pub struct PressureEvent {
    pub metrics: MemoryMetrics,
    pub at: chrono::DateTime<chrono::Utc>,
}

/// Source of heap readings plus an optional garbage-collection hint.
pub trait HeapProbe: Send + Sync {
    /// Current usage, or `None` when the platform cannot report it.
    fn sample(&self) -> Option<HeapSample>;

    /// Best-effort request to release memory.
    fn request_gc(&self) {}
}

/// Reads the current process's resident memory through `sysinfo`.
///
/// Reports nothing when the process id or the process entry is unavailable.
pub struct SystemProbe {
    system: Mutex<System>,
    pid: Option<Pid>,
}

impl SystemProbe {
    pub fn new() -> Self {
        let mut system = System::new();
        system.refresh_memory();
        Self { system: Mutex::new(system), pid: get_current_pid().ok() }
    }
}

impl Default for SystemProbe {
    fn default() -> Self {
        Self::new()
    }
}

impl HeapProbe for SystemProbe {
    fn sample(&self) -> Option<HeapSample> {
        let pid = self.pid?;
        let mut system = self.system.lock().ok()?;
        let targets = [pid];
        system.refresh_processes_specifics(
            ProcessesToUpdate::Some(&targets),
            false,
            ProcessRefreshKind::nothing().with_memory(),
        );
        system.refresh_memory();
        let limit_bytes = system.total_memory();
        let process = system.process(pid)?;
        Some(HeapSample { used_bytes: process.memory(), total_bytes: process.virtual_memory(), limit_bytes })
    }
}

#[derive(Debug)]
pub struct MemoryMonitor {
    threshold_bytes: u64,
    under_pressure: bool,
    last: Option<MemoryMetrics>,
}

impl MemoryMonitor {
    pub fn new(threshold_bytes: u64) -> Self {
        Self { threshold_bytes, under_pressure: false, last: None }
    }

    pub fn threshold_bytes(&self) -> u64 {
        self.threshold_bytes
    }

    pub fn last_metrics(&self) -> Option<MemoryMetrics> {
        self.last
    }

    pub fn under_pressure(&self) -> bool {
        self.under_pressure
    }

    /// Feed one sample; returns an event only on the upward crossing.
    pub fn observe(&mut self, sample: HeapSample) -> Option<PressureEvent> {
        let metrics = MemoryMetrics {
            used_bytes: sample.used_bytes,
            total_bytes: sample.total_bytes,
            limit_bytes: sample.limit_bytes,
            threshold_bytes: self.threshold_bytes,
        };
        self.last = Some(metrics);

        if sample.used_bytes > self.threshold_bytes {
            if self.under_pressure {
                return None;
            }
            self.under_pressure = true;
            tracing::warn!(
                used_bytes = metrics.used_bytes,
                threshold_bytes = metrics.threshold_bytes,
                "memory pressure"
            );
            return Some(PressureEvent { metrics, at: chrono::Utc::now() });
        }

        if self.under_pressure {
            tracing::info!(used_bytes = metrics.used_bytes, "memory pressure relieved");
        }
        self.under_pressure = false;
        None
    }
}
