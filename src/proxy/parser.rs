//! Listing parser turning a proxy listing page into candidates

use crate::proxy::error::ParseError;
use crate::proxy::models::ProxyCandidate;
use once_cell::sync::Lazy;
use scraper::{ElementRef, Html, Selector};
use tracing::debug;

/// Id of the table holding the proxy rows on free-proxy-list.net and its sister sites
pub const DEFAULT_TABLE_ID: &str = "list";

static DEFAULT_TABLE_SELECTOR: Lazy<Selector> = Lazy::new(|| {
    Selector::parse(&format!("#{}", DEFAULT_TABLE_ID)).expect("Invalid listing table selector")
});

static ROW_SELECTOR: Lazy<Selector> =
    Lazy::new(|| Selector::parse("tr").expect("Invalid listing row selector"));

/// Parser for tabular proxy listings
///
/// Each row after the header is read positionally: address, port, country
/// code, country name. Cell text keeps its whitespace; only markup is removed.
/// Rows that do not yield all four fields are skipped rather than reported.
#[derive(Debug, Clone)]
pub struct ListingParser {
    table_id: String,
    table: Selector,
}

impl ListingParser {
    /// Create a parser for the default `#list` table
    pub fn new() -> Self {
        Self {
            table_id: DEFAULT_TABLE_ID.to_string(),
            table: DEFAULT_TABLE_SELECTOR.clone(),
        }
    }

    /// Create a parser for a listing whose table carries a different id
    pub fn for_table(table_id: &str) -> Result<Self, ParseError> {
        let selector = format!("#{}", table_id);
        let table = Selector::parse(&selector).map_err(|e| ParseError::Selector {
            selector: selector.clone(),
            reason: e.to_string(),
        })?;

        Ok(Self {
            table_id: table_id.to_string(),
            table,
        })
    }

    pub fn table_id(&self) -> &str {
        &self.table_id
    }

    /// Parse raw listing bytes into candidates, preserving row order
    pub fn parse(&self, raw: &[u8]) -> Result<Vec<ProxyCandidate>, ParseError> {
        // Stray non-UTF-8 bytes only degrade the cell they sit in.
        let content = String::from_utf8_lossy(raw);
        if content.trim().is_empty() {
            return Err(ParseError::EmptyDocument);
        }

        let document = Html::parse_document(&content);
        let table = document
            .select(&self.table)
            .next()
            .ok_or_else(|| ParseError::TableNotFound {
                table_id: self.table_id.clone(),
            })?;

        let candidates: Vec<ProxyCandidate> = table
            .select(&ROW_SELECTOR)
            .skip(1)
            .enumerate()
            .filter_map(|(index, row)| {
                let candidate = Self::parse_row(row);
                if candidate.is_none() {
                    debug!(row = index + 1, "Skipping incomplete listing row");
                }
                candidate
            })
            .collect();

        debug!(
            table_id = %self.table_id,
            candidates = candidates.len(),
            "Parsed proxy listing"
        );

        Ok(candidates)
    }

    /// Read the four positional fields of a row
    fn parse_row(row: ElementRef<'_>) -> Option<ProxyCandidate> {
        let mut cells = row
            .children()
            .filter_map(ElementRef::wrap)
            .map(|cell| cell.text().collect::<String>());

        let address = cells.next()?;
        let port = cells.next()?;
        let country_code = cells.next()?;
        let country_name = cells.next()?;

        if address.trim().is_empty() {
            return None;
        }

        let port: u16 = port.trim().parse().ok()?;
        if port == 0 {
            return None;
        }

        Some(ProxyCandidate::new(address, port, country_code, country_name))
    }
}

impl Default for ListingParser {
    fn default() -> Self {
        Self::new()
    }
}
