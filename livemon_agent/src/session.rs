//! Per-connection state: what the observer subscribed to and its alert slots.

use std::sync::{Arc, Mutex, MutexGuard};
use tracing::debug;

use crate::alerts::{AlertMetric, Alerts};
use crate::proto::ClientMessage;
use crate::registry::SessionId;
use crate::types::{Metric, MetricSet};

pub type SharedSession = Arc<Mutex<Session>>;

#[derive(Debug, Clone, PartialEq)]
pub struct Session {
    pub id: SessionId,
    pub subscribed: MetricSet,
    pub alerts: Alerts,
}

impl Session {
    pub fn new(id: SessionId) -> Self {
        Self {
            id,
            subscribed: MetricSet::empty(),
            alerts: Alerts::default(),
        }
    }

    /// Apply one control message from this session's own connection.
    pub fn apply(&mut self, msg: ClientMessage) {
        debug!(session = %self.id, ?msg, "control message");
        match msg {
            ClientMessage::SubscribeCpu { enabled } => self.subscribed.set(Metric::Cpu, enabled),
            ClientMessage::SubscribeMemory { enabled } => {
                self.subscribed.set(Metric::Memory, enabled)
            }
            ClientMessage::SubscribeDisk { enabled } => self.subscribed.set(Metric::Disk, enabled),
            ClientMessage::SubscribeAlert {
                cpu_threshold,
                memory_threshold,
            } => {
                self.alerts.apply(AlertMetric::Cpu, cpu_threshold);
                self.alerts.apply(AlertMetric::Memory, memory_threshold);
            }
        }
    }
}

/// Lock a session. Every critical section is a plain field update, so a
/// poisoned lock still holds consistent state and is recovered.
pub fn lock(session: &SharedSession) -> MutexGuard<'_, Session> {
    session.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}
