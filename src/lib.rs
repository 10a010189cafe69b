//! Ambush Proxy - live proxy discovery
//!
//! Pulls candidate proxies from public listings such as free-proxy-list.net
//! and keeps the ones that accept a TCP connection within a timeout.

pub mod proxy;

pub use proxy::*;

/// Application result type
pub type Result<T> = anyhow::Result<T>;
