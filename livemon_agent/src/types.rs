//! Metric categories, sampled values and the payload shapes sent to observers.
//! Keep the serialized structs stable: they define the wire format.

use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Metric {
    Cpu,
    Memory,
    Disk,
}

impl Metric {
    pub const ALL: [Metric; 3] = [Metric::Cpu, Metric::Memory, Metric::Disk];
}

impl fmt::Display for Metric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Metric::Cpu => "cpu",
            Metric::Memory => "memory",
            Metric::Disk => "disk",
        })
    }
}

/// Set of metric categories. Membership is a flag per category, so a
/// category can never be present twice.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MetricSet {
    cpu: bool,
    memory: bool,
    disk: bool,
}

impl MetricSet {
    pub const fn empty() -> Self {
        Self {
            cpu: false,
            memory: false,
            disk: false,
        }
    }

    pub fn of(metrics: &[Metric]) -> Self {
        let mut set = Self::empty();
        for m in metrics {
            set.insert(*m);
        }
        set
    }

    fn slot(&mut self, metric: Metric) -> &mut bool {
        match metric {
            Metric::Cpu => &mut self.cpu,
            Metric::Memory => &mut self.memory,
            Metric::Disk => &mut self.disk,
        }
    }

    pub fn insert(&mut self, metric: Metric) {
        *self.slot(metric) = true;
    }

    pub fn set(&mut self, metric: Metric, enabled: bool) {
        *self.slot(metric) = enabled;
    }

    pub fn contains(&self, metric: Metric) -> bool {
        match metric {
            Metric::Cpu => self.cpu,
            Metric::Memory => self.memory,
            Metric::Disk => self.disk,
        }
    }

    pub fn is_empty(&self) -> bool {
        !(self.cpu || self.memory || self.disk)
    }

    pub fn union(self, other: MetricSet) -> MetricSet {
        MetricSet {
            cpu: self.cpu || other.cpu,
            memory: self.memory || other.memory,
            disk: self.disk || other.disk,
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = Metric> + '_ {
        Metric::ALL.into_iter().filter(|m| self.contains(*m))
    }
}

impl fmt::Display for MetricSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("{")?;
        for (i, m) in self.iter().enumerate() {
            if i > 0 {
                f.write_str(",")?;
            }
            write!(f, "{m}")?;
        }
        f.write_str("}")
    }
}

// ---------- Sampled values (never stored past a tick) ----------

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MemStats {
    pub active: u64,
    pub total: u64,
    pub used: u64,
}

impl MemStats {
    /// `active / total * 100`; `None` when the sampler reported no total.
    pub fn percentage(&self) -> Option<f64> {
        if self.total == 0 {
            return None;
        }
        Some(self.active as f64 / self.total as f64 * 100.0)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct DiskVolume {
    pub name: String,
    pub used: u64,
    pub total: u64,
    pub used_percent: f64,
}

/// One point-in-time sample. Only the categories that were asked for are
/// populated, and a requested category may still come back empty.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MetricSample {
    pub current_load: Option<f64>,
    pub memory: Option<MemStats>,
    pub disk_volumes: Option<Vec<DiskVolume>>,
}

// ---------- Payload sent to observers ----------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MemoryUsage {
    pub used: u64,
    pub total: u64,
    pub percentage: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiskUsage {
    pub name: String,
    pub used: u64,
    pub total: u64,
    pub percentage: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MetricsUpdate {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cpu: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub memory: Option<MemoryUsage>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub disk: Option<Vec<DiskUsage>>,
}

impl MetricsUpdate {
    pub fn is_empty(&self) -> bool {
        self.cpu.is_none() && self.memory.is_none() && self.disk.is_none()
    }
}
