//! Proxy module for discovering and validating proxies
//!
//! This module provides functionality for:
//! - Fetching proxy listings over HTTP or from disk
//! - Parsing listing tables into proxy candidates
//! - Probing candidates for TCP reachability with bounded concurrency
//! - Running the stages above as one discovery pipeline

pub mod error;
pub mod models;
pub mod parser;
pub mod pipeline;
pub mod prober;
pub mod source;
pub mod validator;

pub use error::ParseError;
pub use models::{LiveProxy, ProbeOutcome, ProbeResult, ProxyCandidate, ValidatedProxySet};
pub use parser::ListingParser;
pub use pipeline::Discovery;
pub use prober::{probe, Prober};
pub use source::{
    known_sites, FetcherConfig, FileSource, HttpSource, ListingSite, ListingSource,
    DEFAULT_LISTING_URL,
};
pub use validator::{Validator, ValidatorConfig};
