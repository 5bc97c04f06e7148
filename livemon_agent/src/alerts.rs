//! Edge-triggered threshold alerts, one slot per (session, metric).
//!
//! A slot fires once when its value rises strictly above the threshold and
//! stays quiet until the observer arms it again. Arming always clears the
//! fired flag, even when the new threshold equals the old one.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::types::MetricSample;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AlertMetric {
    Cpu,
    Memory,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AlertPhase {
    Unarmed,
    Armed,
    Fired,
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct AlertSlot {
    threshold: Option<f64>,
    fired: bool,
}

impl AlertSlot {
    pub fn phase(&self) -> AlertPhase {
        match (self.threshold, self.fired) {
            (None, _) => AlertPhase::Unarmed,
            (Some(_), false) => AlertPhase::Armed,
            (Some(_), true) => AlertPhase::Fired,
        }
    }

    pub fn threshold(&self) -> Option<f64> {
        self.threshold
    }

    /// Apply a threshold sent by the observer: `0` disarms, a positive value
    /// (re)arms. Negative and non-finite values are rejected and leave the
    /// slot untouched; returns whether the value was accepted.
    pub fn set_threshold(&mut self, value: f64) -> bool {
        if !value.is_finite() || value < 0.0 {
            return false;
        }
        if value == 0.0 {
            self.disarm();
        } else {
            self.threshold = Some(value);
            self.fired = false;
        }
        true
    }

    pub fn disarm(&mut self) {
        self.threshold = None;
        self.fired = false;
    }

    /// Returns `true` exactly on the Armed -> Fired transition.
    pub fn evaluate(&mut self, value: f64) -> bool {
        match self.threshold {
            Some(limit) if !self.fired && value > limit => {
                self.fired = true;
                true
            }
            _ => false,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AlertFired {
    pub metric: AlertMetric,
    pub value: f64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Alerts {
    pub cpu: AlertSlot,
    pub memory: AlertSlot,
}

impl Alerts {
    pub fn slot_mut(&mut self, metric: AlertMetric) -> &mut AlertSlot {
        match metric {
            AlertMetric::Cpu => &mut self.cpu,
            AlertMetric::Memory => &mut self.memory,
        }
    }

    /// Apply an optional threshold from a `subscribe-alert` message; an
    /// absent field leaves the slot as it is.
    pub fn apply(&mut self, metric: AlertMetric, threshold: Option<f64>) {
        let Some(value) = threshold else { return };
        if !self.slot_mut(metric).set_threshold(value) {
            debug!(?metric, value, "rejecting invalid alert threshold");
        }
    }

    /// Evaluate both slots against one sample. CPU uses the raw load,
    /// memory the `active / total` percentage. Categories missing from the
    /// sample are not evaluated.
    pub fn evaluate(&mut self, sample: &MetricSample) -> Vec<AlertFired> {
        let mut fired = Vec::new();
        if let Some(load) = sample.current_load {
            if self.cpu.evaluate(load) {
                fired.push(AlertFired {
                    metric: AlertMetric::Cpu,
                    value: load,
                });
            }
        }
        if let Some(pct) = sample.memory.as_ref().and_then(|m| m.percentage()) {
            if self.memory.evaluate(pct) {
                fired.push(AlertFired {
                    metric: AlertMetric::Memory,
                    value: pct,
                });
            }
        }
        fired
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::MemStats;

    fn count_fires(slot: &mut AlertSlot, values: &[f64]) -> usize {
        values.iter().filter(|v| slot.evaluate(**v)).count()
    }

    #[test]
    fn fires_once_across_sustained_breach() {
        let mut slot = AlertSlot::default();
        assert!(slot.set_threshold(80.0));
        assert_eq!(slot.phase(), AlertPhase::Armed);

        let fires: Vec<bool> = [70.0, 85.0, 90.0, 60.0, 95.0]
            .iter()
            .map(|v| slot.evaluate(*v))
            .collect();
        assert_eq!(fires, vec![false, true, false, false, false]);
        assert_eq!(slot.phase(), AlertPhase::Fired);
    }

    #[test]
    fn rearm_between_samples_allows_second_fire() {
        let mut slot = AlertSlot::default();
        slot.set_threshold(80.0);
        assert_eq!(count_fires(&mut slot, &[70.0, 85.0, 90.0]), 1);
        // same value again still clears the fired flag
        slot.set_threshold(80.0);
        assert_eq!(slot.phase(), AlertPhase::Armed);
        assert_eq!(count_fires(&mut slot, &[60.0, 95.0]), 1);
    }

    #[test]
    fn equality_does_not_fire() {
        let mut slot = AlertSlot::default();
        slot.set_threshold(50.0);
        assert!(!slot.evaluate(50.0));
        assert!(slot.evaluate(50.0001));
    }

    #[test]
    fn zero_disarms_after_fire() {
        let mut slot = AlertSlot::default();
        slot.set_threshold(10.0);
        assert!(slot.evaluate(20.0));
        slot.set_threshold(0.0);
        assert_eq!(slot.phase(), AlertPhase::Unarmed);
        assert!(!slot.evaluate(99.0));
        assert_eq!(slot.threshold(), None);
    }

    #[test]
    fn invalid_thresholds_leave_slot_alone() {
        let mut slot = AlertSlot::default();
        slot.set_threshold(40.0);
        assert!(slot.evaluate(41.0));
        assert!(!slot.set_threshold(-5.0));
        assert!(!slot.set_threshold(f64::NAN));
        assert_eq!(slot.phase(), AlertPhase::Fired);
        assert_eq!(slot.threshold(), Some(40.0));
    }

    #[test]
    fn absent_field_is_untouched() {
        let mut alerts = Alerts::default();
        alerts.apply(AlertMetric::Cpu, Some(75.0));
        alerts.apply(AlertMetric::Memory, Some(60.0));
        alerts.apply(AlertMetric::Cpu, None);
        assert_eq!(alerts.cpu.threshold(), Some(75.0));
        assert_eq!(alerts.memory.threshold(), Some(60.0));
    }

    #[test]
    fn evaluates_cpu_raw_and_memory_percentage() {
        let mut alerts = Alerts::default();
        alerts.apply(AlertMetric::Cpu, Some(50.0));
        alerts.apply(AlertMetric::Memory, Some(50.0));
        let sample = MetricSample {
            current_load: Some(55.0),
            memory: Some(MemStats {
                active: 3,
                total: 4,
                used: 1,
            }),
            disk_volumes: None,
        };
        let fired = alerts.evaluate(&sample);
        assert_eq!(
            fired,
            vec![
                AlertFired {
                    metric: AlertMetric::Cpu,
                    value: 55.0
                },
                AlertFired {
                    metric: AlertMetric::Memory,
                    value: 75.0
                },
            ]
        );
        assert!(alerts.evaluate(&sample).is_empty());
    }

    #[test]
    fn missing_category_is_not_evaluated() {
        let mut alerts = Alerts::default();
        alerts.apply(AlertMetric::Memory, Some(1.0));
        let sample = MetricSample {
            current_load: Some(99.0),
            ..Default::default()
        };
        assert!(alerts.evaluate(&sample).is_empty());
        assert_eq!(alerts.memory.phase(), AlertPhase::Armed);
    }
}
