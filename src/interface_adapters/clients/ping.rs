use async_trait::async_trait;
use std::time::{Duration, Instant};
use tokio::net::TcpStream;
use tokio::time::timeout;
use tracing::debug;

use crate::domain::ports::LatencyMeter;

// Latency ping that times a TCP connect to the relay's host:port.
// An ICMP echo would need raw-socket privileges; a connect round trip ranks relays the same way.
#[derive(Debug, Clone)]
pub struct TcpPing {
    timeout: Duration,
}

impl TcpPing {
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }
}

#[async_trait]
impl LatencyMeter for TcpPing {
    async fn measure(&self, address: &str) -> Option<Duration> {
        let started = Instant::now();
        match timeout(self.timeout, TcpStream::connect(address)).await {
            Ok(Ok(_stream)) => Some(started.elapsed()),
            Ok(Err(e)) => {
                debug!(%address, error = %e, "latency ping failed");
                None
            }
            Err(_) => {
                debug!(%address, timeout_ms = self.timeout.as_millis(), "latency ping timed out");
                None
            }
        }
    }
}
