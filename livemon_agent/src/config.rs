//! Agent settings: command line first, then environment, then defaults.

use std::net::{IpAddr, Ipv4Addr};
use std::time::Duration;
use thiserror::Error;

use crate::aggregator::DEFAULT_PERIOD;

pub const DEFAULT_PORT: u16 = 3001;

pub const USAGE: &str = "Usage: livemon_agent [--port PORT|-p PORT] [--bind ADDR] [--interval-ms MS] [--enableSSL]\n\
Environment: PORT, LIVEMON_AGENT_BIND, LIVEMON_AGENT_INTERVAL_MS, LIVEMON_ENABLE_SSL=1, RUST_LOG";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{}", USAGE)]
    Help,
    #[error("invalid value {value:?} for {name}")]
    Invalid { name: &'static str, value: String },
    #[error("missing value for {0}")]
    Missing(&'static str),
    #[error("unexpected argument {0:?}")]
    Unexpected(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AgentConfig {
    pub bind: IpAddr,
    pub port: u16,
    pub interval: Duration,
    pub enable_tls: bool,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            bind: IpAddr::V4(Ipv4Addr::UNSPECIFIED),
            port: DEFAULT_PORT,
            interval: DEFAULT_PERIOD,
            enable_tls: false,
        }
    }
}

#[derive(Default)]
struct Flags {
    port: Option<String>,
    bind: Option<String>,
    interval_ms: Option<String>,
    enable_tls: bool,
}

impl AgentConfig {
    /// `args` includes the program name; `env` looks up one variable.
    pub fn parse<I, E>(args: I, env: E) -> Result<Self, ConfigError>
    where
        I: IntoIterator<Item = String>,
        E: Fn(&str) -> Option<String>,
    {
        let mut flags = Flags::default();
        let mut it = args.into_iter();
        let _ = it.next(); // program name
        while let Some(arg) = it.next() {
            match arg.as_str() {
                "-h" | "--help" => return Err(ConfigError::Help),
                "--port" | "-p" => flags.port = Some(value_of(&mut it, "--port")?),
                "--bind" => flags.bind = Some(value_of(&mut it, "--bind")?),
                "--interval-ms" => flags.interval_ms = Some(value_of(&mut it, "--interval-ms")?),
                "--enableSSL" => flags.enable_tls = true,
                _ => {
                    if let Some((key, v)) = arg.split_once('=') {
                        match key {
                            "--port" => flags.port = Some(v.to_string()),
                            "--bind" => flags.bind = Some(v.to_string()),
                            "--interval-ms" => flags.interval_ms = Some(v.to_string()),
                            _ => return Err(ConfigError::Unexpected(arg)),
                        }
                    } else {
                        return Err(ConfigError::Unexpected(arg));
                    }
                }
            }
        }

        let mut cfg = AgentConfig::default();
        if let Some(v) = flags.port.or_else(|| env("PORT")) {
            cfg.port = parse_value("port", &v)?;
        }
        if let Some(v) = flags.bind.or_else(|| env("LIVEMON_AGENT_BIND")) {
            cfg.bind = parse_value("bind address", &v)?;
        }
        if let Some(v) = flags.interval_ms.or_else(|| env("LIVEMON_AGENT_INTERVAL_MS")) {
            let ms: u64 = parse_value("interval", &v)?;
            if ms == 0 {
                return Err(ConfigError::Invalid {
                    name: "interval",
                    value: v,
                });
            }
            cfg.interval = Duration::from_millis(ms);
        }
        cfg.enable_tls = flags.enable_tls
            || env("LIVEMON_ENABLE_SSL")
                .map(|v| v != "0" && !v.is_empty())
                .unwrap_or(false);
        Ok(cfg)
    }
}

fn value_of<I: Iterator<Item = String>>(it: &mut I, flag: &'static str) -> Result<String, ConfigError> {
    it.next().ok_or(ConfigError::Missing(flag))
}

fn parse_value<T: std::str::FromStr>(name: &'static str, v: &str) -> Result<T, ConfigError> {
    v.trim().parse().map_err(|_| ConfigError::Invalid {
        name,
        value: v.to_string(),
    })
}
