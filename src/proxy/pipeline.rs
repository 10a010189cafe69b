//! Discovery pipeline: fetch, parse, filter, validate
//!
//! Each stage is an explicit call so a caller can stop after any of them,
//! for instance to inspect candidates before probing.

use crate::proxy::models::{ProxyCandidate, ValidatedProxySet};
use crate::proxy::parser::ListingParser;
use crate::proxy::source::ListingSource;
use crate::proxy::validator::Validator;
use crate::Result;
use anyhow::anyhow;
use futures::future::join_all;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

/// Runs listings through parsing, filtering and validation
#[derive(Debug, Clone, Default)]
pub struct Discovery {
    parser: ListingParser,
    validator: Validator,
    countries: Vec<String>,
}

impl Discovery {
    pub fn new(parser: ListingParser, validator: Validator) -> Self {
        Self {
            parser,
            validator,
            countries: Vec::new(),
        }
    }

    /// Keep only candidates whose country code is one of `codes`
    pub fn with_countries(mut self, codes: Vec<String>) -> Self {
        self.countries = codes
            .into_iter()
            .map(|code| code.trim().to_uppercase())
            .filter(|code| !code.is_empty())
            .collect();
        self
    }

    pub fn validator(&self) -> &Validator {
        &self.validator
    }

    /// Fetch and parse one listing
    pub async fn candidates(&self, source: &dyn ListingSource) -> Result<Vec<ProxyCandidate>> {
        let raw = source.fetch().await?;
        let candidates = self.parser.parse(&raw)?;
        info!(
            source = source.name(),
            candidates = candidates.len(),
            "Collected proxy candidates"
        );
        Ok(self.filter(candidates))
    }

    /// Fetch and parse several listings concurrently
    ///
    /// A listing that cannot be fetched or parsed is logged and skipped; an
    /// error is returned only when none of them produced a candidate list.
    pub async fn gather(&self, sources: &[Box<dyn ListingSource>]) -> Result<Vec<ProxyCandidate>> {
        if sources.is_empty() {
            return Ok(Vec::new());
        }

        let results = join_all(
            sources
                .iter()
                .map(|source| self.candidates(source.as_ref())),
        )
        .await;

        let mut all = Vec::new();
        let mut failures = 0usize;
        let mut last_error = None;
        for (source, result) in sources.iter().zip(results) {
            match result {
                Ok(candidates) => all.extend(candidates),
                Err(e) => {
                    warn!(source = source.name(), "Skipping listing: {:#}", e);
                    failures += 1;
                    last_error = Some(e);
                }
            }
        }

        if failures == sources.len() {
            return Err(last_error.unwrap_or_else(|| anyhow!("No listing could be read")));
        }

        Ok(all)
    }

    /// Apply the country filter, keeping listing order
    pub fn filter(&self, candidates: Vec<ProxyCandidate>) -> Vec<ProxyCandidate> {
        if self.countries.is_empty() {
            return candidates;
        }

        candidates
            .into_iter()
            .filter(|candidate| {
                let code = candidate.country_code.trim().to_uppercase();
                self.countries.contains(&code)
            })
            .collect()
    }

    /// Run the whole pipeline for a single listing
    pub async fn run(
        &self,
        source: &dyn ListingSource,
        cancel: CancellationToken,
    ) -> Result<ValidatedProxySet> {
        let candidates = self.candidates(source).await?;
        Ok(self.validator.validate_until(candidates, cancel).await)
    }
}
