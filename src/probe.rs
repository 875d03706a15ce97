use crate::config::ProbeConfig;
use log::debug;
use std::net::SocketAddr;
use std::time::{Duration, Instant};
use tokio::net::TcpStream;
use tokio::time::timeout;

/// Outcome of a connectivity probe. Decided once when a camera is
/// registered; the stored status is never reconciled afterwards.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProbeResult {
    Reachable { latency_ms: u64 },
    Unreachable { reason: String },
}

impl ProbeResult {
    pub fn is_reachable(&self) -> bool {
        matches!(self, ProbeResult::Reachable { .. })
    }
}

/// TCP-connect reachability check against the camera's streaming port.
/// One attempt, no retries.
pub async fn probe_camera(ip: &str, port: u16, config: &ProbeConfig) -> ProbeResult {
    let addr = match format!("{}:{}", ip, port).parse::<SocketAddr>() {
        Ok(addr) => addr,
        Err(e) => {
            return ProbeResult::Unreachable {
                reason: format!("invalid address: {}", e),
            }
        }
    };

    let started = Instant::now();
    match timeout(
        Duration::from_millis(config.timeout_ms),
        TcpStream::connect(addr),
    )
    .await
    {
        Ok(Ok(_stream)) => {
            let latency_ms = started.elapsed().as_millis() as u64;
            debug!("Probe {}: reachable in {}ms", addr, latency_ms);
            ProbeResult::Reachable { latency_ms }
        }
        Ok(Err(e)) => {
            debug!("Probe {}: {}", addr, e);
            ProbeResult::Unreachable {
                reason: e.to_string(),
            }
        }
        Err(_) => ProbeResult::Unreachable {
            reason: format!("timed out after {}ms", config.timeout_ms),
        },
    }
}
