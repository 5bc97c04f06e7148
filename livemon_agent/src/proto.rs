//! JSON messages exchanged with observers, discriminated by `type`.

use serde::{Deserialize, Serialize};

use crate::alerts::{AlertFired, AlertMetric};
use crate::registry::SessionId;
use crate::types::MetricsUpdate;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum ClientMessage {
    SubscribeCpu {
        enabled: bool,
    },
    SubscribeMemory {
        enabled: bool,
    },
    SubscribeDisk {
        enabled: bool,
    },
    SubscribeAlert {
        #[serde(default, rename = "cpuThreshold")]
        cpu_threshold: Option<f64>,
        #[serde(default, rename = "memoryThreshold")]
        memory_threshold: Option<f64>,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum ServerMessage {
    Welcome {
        #[serde(rename = "clientId")]
        client_id: String,
    },
    SubscribedMetricsUpdate {
        data: MetricsUpdate,
    },
    AlertTriggered {
        metric: AlertMetric,
        value: f64,
    },
}

impl ServerMessage {
    pub fn welcome(id: SessionId) -> Self {
        ServerMessage::Welcome {
            client_id: id.to_string(),
        }
    }
}

impl From<AlertFired> for ServerMessage {
    fn from(a: AlertFired) -> Self {
        ServerMessage::AlertTriggered {
            metric: a.metric,
            value: a.value,
        }
    }
}

/// Parse one inbound text frame. Anything that is not a well-formed control
/// message yields `None`; the caller drops it and keeps the connection.
pub fn decode(text: &str) -> Option<ClientMessage> {
    serde_json::from_str(text).ok()
}

pub fn encode(msg: &ServerMessage) -> Result<String, serde_json::Error> {
    serde_json::to_string(msg)
}
