//! Proxy data models

use crate::Result;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs;
use std::path::Path;

/// A proxy endpoint taken from a listing row, not yet known to be reachable
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ProxyCandidate {
    /// Host as it appeared in the listing (a literal IP address)
    pub address: String,
    pub port: u16,
    /// Short country code, e.g. "US"
    pub country_code: String,
    pub country_name: String,
}

impl ProxyCandidate {
    pub fn new(address: String, port: u16, country_code: String, country_name: String) -> Self {
        Self {
            address,
            port,
            country_code,
            country_name,
        }
    }

    /// Whether the candidate satisfies the non-empty address and 1..=65535 port rules
    pub fn is_well_formed(&self) -> bool {
        !self.address.trim().is_empty() && self.port != 0
    }

    /// Get the proxy string in IP:PORT format
    pub fn to_simple_string(&self) -> String {
        format!("{}:{}", self.address.trim(), self.port)
    }
}

impl fmt::Display for ProxyCandidate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} ({}, {})",
            self.to_simple_string(),
            self.country_code,
            self.country_name
        )
    }
}

/// Classified result of a single reachability probe
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ProbeOutcome {
    Reachable,
    Refused,
    TimedOut,
    OtherError(String),
}

impl ProbeOutcome {
    /// Stable label used in diagnostics
    pub fn kind(&self) -> &'static str {
        match self {
            ProbeOutcome::Reachable => "reachable",
            ProbeOutcome::Refused => "refused",
            ProbeOutcome::TimedOut => "timed_out",
            ProbeOutcome::OtherError(_) => "other",
        }
    }

    pub fn is_reachable(&self) -> bool {
        matches!(self, ProbeOutcome::Reachable)
    }
}

impl fmt::Display for ProbeOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProbeOutcome::Reachable => write!(f, "reachable"),
            ProbeOutcome::Refused => write!(f, "connection refused"),
            ProbeOutcome::TimedOut => write!(f, "connection timeout"),
            ProbeOutcome::OtherError(detail) => write!(f, "error: {}", detail),
        }
    }
}

/// Detailed result of a probe
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProbeResult {
    pub candidate: ProxyCandidate,
    pub outcome: ProbeOutcome,
    /// Connect latency, present only for reachable candidates
    pub elapsed_ms: Option<u64>,
}

impl ProbeResult {
    pub fn reachable(candidate: ProxyCandidate, elapsed_ms: u64) -> Self {
        Self {
            candidate,
            outcome: ProbeOutcome::Reachable,
            elapsed_ms: Some(elapsed_ms),
        }
    }

    pub fn failed(candidate: ProxyCandidate, outcome: ProbeOutcome) -> Self {
        Self {
            candidate,
            outcome,
            elapsed_ms: None,
        }
    }

    pub fn is_reachable(&self) -> bool {
        self.outcome.is_reachable()
    }
}

/// A candidate that accepted a connection
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LiveProxy {
    #[serde(flatten)]
    pub candidate: ProxyCandidate,
    pub connect_ms: u64,
}

impl LiveProxy {
    pub fn new(candidate: ProxyCandidate, connect_ms: u64) -> Self {
        Self {
            candidate,
            connect_ms,
        }
    }
}

/// The reachable subset of a candidate list, in the order probes completed
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidatedProxySet {
    entries: Vec<LiveProxy>,
    /// Number of candidates that were scheduled for probing
    probed: usize,
    checked_at: DateTime<Utc>,
}

impl ValidatedProxySet {
    pub(crate) fn new(entries: Vec<LiveProxy>, probed: usize) -> Self {
        Self {
            entries,
            probed,
            checked_at: Utc::now(),
        }
    }

    pub fn empty() -> Self {
        Self::new(Vec::new(), 0)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn probed(&self) -> usize {
        self.probed
    }

    pub fn checked_at(&self) -> DateTime<Utc> {
        self.checked_at
    }

    /// Candidates in insertion order
    pub fn iter(&self) -> impl Iterator<Item = &ProxyCandidate> {
        self.entries.iter().map(|entry| &entry.candidate)
    }

    pub fn entries(&self) -> &[LiveProxy] {
        &self.entries
    }

    /// Entries sorted by connect latency, fastest first
    pub fn ranked(&self) -> Vec<&LiveProxy> {
        let mut ranked: Vec<&LiveProxy> = self.entries.iter().collect();
        // stable sort keeps completion order among equal latencies
        ranked.sort_by_key(|entry| entry.connect_ms);
        ranked
    }

    pub fn into_candidates(self) -> Vec<ProxyCandidate> {
        self.entries
            .into_iter()
            .map(|entry| entry.candidate)
            .collect()
    }

    /// Save the ranked proxies to a file, one IP:PORT per line
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let content: String = self
            .ranked()
            .iter()
            .map(|entry| entry.candidate.to_simple_string())
            .collect::<Vec<_>>()
            .join("\n");

        fs::write(path, content)?;
        Ok(())
    }
}

impl Default for ValidatedProxySet {
    fn default() -> Self {
        Self::empty()
    }
}
