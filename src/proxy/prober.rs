//! Reachability prober for single proxy candidates

use crate::proxy::models::{ProbeOutcome, ProbeResult, ProxyCandidate};
use std::io;
use std::net::{IpAddr, SocketAddr};
use std::time::{Duration, Instant};
use tokio::net::TcpStream;

/// Default timeout for a connection attempt in seconds
pub const DEFAULT_PROBE_TIMEOUT_SECS: u64 = 5;

/// Probes candidates with a raw TCP connect
///
/// A candidate counts as reachable once the handshake completes; the stream
/// is dropped straight away and no proxy protocol is spoken.
#[derive(Debug, Clone)]
pub struct Prober {
    timeout: Duration,
}

impl Prober {
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Attempt a connection and classify how it ended
    pub async fn probe(&self, candidate: &ProxyCandidate) -> ProbeOutcome {
        let addr = match socket_addr(candidate) {
            Ok(addr) => addr,
            Err(outcome) => return outcome,
        };

        match tokio::time::timeout(self.timeout, TcpStream::connect(addr)).await {
            Ok(Ok(stream)) => {
                drop(stream);
                ProbeOutcome::Reachable
            }
            Ok(Err(e)) => classify_error(&e),
            Err(_) => ProbeOutcome::TimedOut,
        }
    }

    /// Probe a candidate and measure how long the connect took
    pub async fn check(&self, candidate: ProxyCandidate) -> ProbeResult {
        let start = Instant::now();
        match self.probe(&candidate).await {
            ProbeOutcome::Reachable => {
                let elapsed = start.elapsed().as_millis() as u64;
                ProbeResult::reachable(candidate, elapsed)
            }
            outcome => ProbeResult::failed(candidate, outcome),
        }
    }
}

impl Default for Prober {
    fn default() -> Self {
        Self::new(Duration::from_secs(DEFAULT_PROBE_TIMEOUT_SECS))
    }
}

/// Probe one candidate with the given connect timeout
pub async fn probe(candidate: &ProxyCandidate, timeout: Duration) -> ProbeOutcome {
    Prober::new(timeout).probe(candidate).await
}

/// Map a transport error onto a probe outcome
pub fn classify_error(error: &io::Error) -> ProbeOutcome {
    match error.kind() {
        io::ErrorKind::ConnectionRefused => ProbeOutcome::Refused,
        io::ErrorKind::TimedOut => ProbeOutcome::TimedOut,
        _ => ProbeOutcome::OtherError(error.to_string()),
    }
}

// Listing addresses are IP literals, so there is no name resolution here.
fn socket_addr(candidate: &ProxyCandidate) -> Result<SocketAddr, ProbeOutcome> {
    if candidate.port == 0 {
        return Err(ProbeOutcome::OtherError("invalid port 0".to_string()));
    }

    let address = candidate.address.trim();
    let ip: IpAddr = address.parse().map_err(|_| {
        ProbeOutcome::OtherError(format!("invalid address '{}'", address))
    })?;

    Ok(SocketAddr::new(ip, candidate.port))
}
