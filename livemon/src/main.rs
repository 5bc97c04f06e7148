//! Entry point for the livemon observer. Parses args, subscribes, prints.

use chrono::Local;
use std::env;

use livemon::types::{ClientMessage, Metrics, ServerMessage};
use livemon::ws::{connect, next_message, send};

const DEFAULT_URL: &str = "ws://127.0.0.1:3001/ws";

#[derive(Debug, Default, PartialEq)]
struct ParsedArgs {
    url: Option<String>,
    cpu: bool,
    memory: bool,
    disk: bool,
    cpu_alert: Option<f64>,
    memory_alert: Option<f64>,
}

fn usage(prog: &str) -> String {
    format!(
        "Usage: {prog} [--cpu] [--memory] [--disk] [--cpu-alert PCT] [--memory-alert PCT] [ws://HOST:PORT/ws]"
    )
}

fn parse_threshold(flag: &str, v: Option<String>) -> Result<f64, String> {
    let v = v.ok_or_else(|| format!("missing value for {flag}"))?;
    v.parse::<f64>()
        .ok()
        .filter(|t| t.is_finite() && *t >= 0.0)
        .ok_or_else(|| format!("invalid value {v:?} for {flag}"))
}

fn parse_args<I: IntoIterator<Item = String>>(args: I) -> Result<ParsedArgs, String> {
    let mut it = args.into_iter();
    let prog = it.next().unwrap_or_else(|| "livemon".into());
    let mut parsed = ParsedArgs::default();

    while let Some(arg) = it.next() {
        match arg.as_str() {
            "-h" | "--help" => return Err(usage(&prog)),
            "--cpu" => parsed.cpu = true,
            "--memory" => parsed.memory = true,
            "--disk" => parsed.disk = true,
            "--cpu-alert" => parsed.cpu_alert = Some(parse_threshold("--cpu-alert", it.next())?),
            "--memory-alert" => {
                parsed.memory_alert = Some(parse_threshold("--memory-alert", it.next())?)
            }
            _ if arg.starts_with('-') => {
                return Err(format!("Unexpected argument {arg}. {}", usage(&prog)))
            }
            _ => {
                if parsed.url.is_none() {
                    parsed.url = Some(arg);
                } else {
                    return Err(format!("Unexpected argument. {}", usage(&prog)));
                }
            }
        }
    }
    Ok(parsed)
}

fn describe(data: &Metrics) -> String {
    let mut parts = Vec::new();
    if let Some(cpu) = data.cpu {
        parts.push(format!("cpu {cpu:.1}%"));
    }
    if let Some(mem) = &data.memory {
        parts.push(format!(
            "mem {:.1}% ({} / {} MiB)",
            mem.percentage,
            mem.used / (1024 * 1024),
            mem.total / (1024 * 1024)
        ));
    }
    for d in data.disk.iter().flatten() {
        parts.push(format!("disk {} {:.1}%", d.name, d.percentage));
    }
    parts.join(" | ")
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let parsed = match parse_args(env::args()) {
        Ok(v) => v,
        Err(msg) => {
            eprintln!("{msg}");
            return Ok(());
        }
    };
    let url = parsed.url.clone().unwrap_or_else(|| DEFAULT_URL.to_string());
    url::Url::parse(&url)?;

    let mut ws = connect(&url).await?;
    let mut requests = vec![
        ClientMessage::SubscribeCpu {
            enabled: parsed.cpu,
        },
        ClientMessage::SubscribeMemory {
            enabled: parsed.memory,
        },
        ClientMessage::SubscribeDisk {
            enabled: parsed.disk,
        },
    ];
    if parsed.cpu_alert.is_some() || parsed.memory_alert.is_some() {
        requests.push(ClientMessage::SubscribeAlert {
            cpu_threshold: parsed.cpu_alert,
            memory_threshold: parsed.memory_alert,
        });
    }
    for req in &requests {
        send(&mut ws, req).await?;
    }
    if !(parsed.cpu || parsed.memory || parsed.disk) {
        eprintln!("not subscribed to anything; pass --cpu, --memory or --disk");
    }

    loop {
        let msg = tokio::select! {
            m = next_message(&mut ws) => m,
            _ = tokio::signal::ctrl_c() => break,
        };
        let Some(msg) = msg else {
            eprintln!("connection closed");
            break;
        };
        let ts = Local::now().format("%H:%M:%S");
        match msg {
            ServerMessage::Welcome { client_id } => println!("[{ts}] connected as {client_id}"),
            ServerMessage::SubscribedMetricsUpdate { data } => println!("[{ts}] {}", describe(&data)),
            ServerMessage::AlertTriggered { metric, value } => {
                println!("[{ts}] ALERT {metric} at {value:.1}%")
            }
        }
    }
    Ok(())
}
