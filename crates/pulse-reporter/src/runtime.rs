//! Process runtime gauges backed by `sysinfo`.
//!
//! Registered once per reporter and refreshed at the start of every export
//! pass, so the values are as fresh as the pass that sends them.

use std::sync::{Mutex, PoisonError};

use sysinfo::{Pid, ProcessRefreshKind, ProcessesToUpdate, System};
use tracing::debug;

use pulse_metrics::{FloatGauge, Gauge, Metric, Registry, RegistryError, RegistryResult};

pub const RESIDENT_MEMORY: &str = "runtime.memory.resident";
pub const VIRTUAL_MEMORY: &str = "runtime.memory.virtual";
pub const CPU_USAGE: &str = "runtime.cpu.usage";
pub const UPTIME: &str = "runtime.uptime";

/// Gauges describing the current process.
#[derive(Debug)]
pub struct RuntimeMetrics {
    system: Mutex<System>,
    pid: Option<Pid>,
    resident: Gauge,
    virtual_memory: Gauge,
    cpu: FloatGauge,
    uptime: Gauge,
}

impl RuntimeMetrics {
    /// Register the runtime gauges in `registry`, reusing any already there.
    /// A key held by another metric type is a [`RegistryError::Duplicate`].
    pub fn register(registry: &dyn Registry) -> RegistryResult<Self> {
        let resident = gauge(registry, RESIDENT_MEMORY)?;
        let virtual_memory = gauge(registry, VIRTUAL_MEMORY)?;
        let uptime = gauge(registry, UPTIME)?;
        let cpu = float_gauge(registry, CPU_USAGE)?;

        let pid = sysinfo::get_current_pid().ok();
        if pid.is_none() {
            debug!("current pid unavailable; runtime gauges stay at zero");
        }

        Ok(Self {
            system: Mutex::new(System::new()),
            pid,
            resident,
            virtual_memory,
            cpu,
            uptime,
        })
    }

    /// Re-read process statistics into the gauges.
    pub fn refresh(&self) {
        let Some(pid) = self.pid else {
            return;
        };
        let mut system = self.system.lock().unwrap_or_else(PoisonError::into_inner);
        system.refresh_processes_specifics(
            ProcessesToUpdate::Some(&[pid]),
            true,
            ProcessRefreshKind::nothing().with_memory().with_cpu(),
        );
        let Some(process) = system.process(pid) else {
            debug!(%pid, "process not found during refresh");
            return;
        };
        self.resident.update(saturating_i64(process.memory()));
        self.virtual_memory
            .update(saturating_i64(process.virtual_memory()));
        self.cpu.update(f64::from(process.cpu_usage()));
        self.uptime.update(saturating_i64(process.run_time()));
    }
}

/// A different metric type already under `key` is a conflict.
fn gauge(registry: &dyn Registry, key: &str) -> RegistryResult<Gauge> {
    match registry.get_or_register(key, &mut || Gauge::new().into())? {
        Metric::Gauge(g) => Ok(g),
        _ => Err(RegistryError::Duplicate(key.to_string())),
    }
}

fn float_gauge(registry: &dyn Registry, key: &str) -> RegistryResult<FloatGauge> {
    match registry.get_or_register(key, &mut || FloatGauge::new().into())? {
        Metric::FloatGauge(g) => Ok(g),
        _ => Err(RegistryError::Duplicate(key.to_string())),
    }
}

fn saturating_i64(v: u64) -> i64 {
    i64::try_from(v).unwrap_or(i64::MAX)
}
