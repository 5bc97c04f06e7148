//! Host metric sampling. The aggregator talks to a [`MetricSource`] once per
//! tick, asking only for the categories some session wants.

use std::future::Future;
use std::sync::{Arc, Mutex};
use sysinfo::{CpuRefreshKind, Disks, MemoryRefreshKind, RefreshKind, System};
use thiserror::Error;

use crate::types::{DiskVolume, MemStats, Metric, MetricSample, MetricSet};

#[derive(Debug, Error)]
pub enum SampleError {
    #[error("sampling task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
    #[error("{0} handle poisoned by an earlier panic")]
    Poisoned(&'static str),
    #[error("{0}")]
    Source(String),
}

pub trait MetricSource: Send + Sync + 'static {
    /// Sample exactly the categories in `demand`.
    fn fetch(
        &self,
        demand: MetricSet,
    ) -> impl Future<Output = Result<MetricSample, SampleError>> + Send;
}

/// Persistent sysinfo handles so CPU usage is measured against the previous
/// refresh. Refreshing blocks, so it runs off the async workers.
#[derive(Clone)]
pub struct SysinfoSource {
    sys: Arc<Mutex<System>>,
    disks: Arc<Mutex<Disks>>,
}

impl SysinfoSource {
    pub fn new() -> Self {
        let refresh_kind = RefreshKind::nothing()
            .with_cpu(CpuRefreshKind::nothing().with_cpu_usage())
            .with_memory(MemoryRefreshKind::nothing().with_ram());
        let mut sys = System::new_with_specifics(refresh_kind);
        // baseline for the first usage delta
        sys.refresh_cpu_usage();

        Self {
            sys: Arc::new(Mutex::new(sys)),
            disks: Arc::new(Mutex::new(Disks::new_with_refreshed_list())),
        }
    }
}

impl Default for SysinfoSource {
    fn default() -> Self {
        Self::new()
    }
}

impl MetricSource for SysinfoSource {
    async fn fetch(&self, demand: MetricSet) -> Result<MetricSample, SampleError> {
        let sys = self.sys.clone();
        let disks = self.disks.clone();
        tokio::task::spawn_blocking(move || sample_blocking(&sys, &disks, demand)).await?
    }
}

fn sample_blocking(
    sys: &Mutex<System>,
    disks: &Mutex<Disks>,
    demand: MetricSet,
) -> Result<MetricSample, SampleError> {
    let mut sample = MetricSample::default();

    if demand.contains(Metric::Cpu) || demand.contains(Metric::Memory) {
        let mut sys = sys.lock().map_err(|_| SampleError::Poisoned("system"))?;
        if demand.contains(Metric::Cpu) {
            sys.refresh_cpu_usage();
            sample.current_load = Some(f64::from(sys.global_cpu_usage()));
        }
        if demand.contains(Metric::Memory) {
            sys.refresh_memory();
            let total = sys.total_memory();
            sample.memory = Some(MemStats {
                active: total.saturating_sub(sys.available_memory()),
                total,
                used: sys.used_memory(),
            });
        }
    }

    if demand.contains(Metric::Disk) {
        let mut disks = disks.lock().map_err(|_| SampleError::Poisoned("disks"))?;
        disks.refresh(true);
        let volumes = disks
            .list()
            .iter()
            .filter(|d| d.total_space() > 0)
            .map(|d| {
                let total = d.total_space();
                let used = total.saturating_sub(d.available_space());
                DiskVolume {
                    name: d.name().to_string_lossy().into_owned(),
                    used,
                    total,
                    used_percent: used as f64 / total as f64 * 100.0,
                }
            })
            .collect();
        sample.disk_volumes = Some(volumes);
    }

    Ok(sample)
}
