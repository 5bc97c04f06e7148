//! Types that mirror the agent's JSON messages.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize)]
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
        #[serde(rename = "cpuThreshold", skip_serializing_if = "Option::is_none")]
        cpu_threshold: Option<f64>,
        #[serde(rename = "memoryThreshold", skip_serializing_if = "Option::is_none")]
        memory_threshold: Option<f64>,
    },
}

#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct Memory {
    pub used: u64,
    pub total: u64,
    pub percentage: f64,
}

#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct Disk {
    pub name: String,
    pub used: u64,
    pub total: u64,
    pub percentage: f64,
}

#[derive(Debug, Deserialize, Clone, Default, PartialEq)]
pub struct Metrics {
    pub cpu: Option<f64>,
    pub memory: Option<Memory>,
    pub disk: Option<Vec<Disk>>,
}

#[derive(Debug, Deserialize, Clone, PartialEq)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum ServerMessage {
    Welcome {
        #[serde(rename = "clientId")]
        client_id: String,
    },
    SubscribedMetricsUpdate {
        data: Metrics,
    },
    AlertTriggered {
        metric: String,
        value: f64,
    },
}
