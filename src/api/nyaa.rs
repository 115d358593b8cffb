//! nyaa.si listing client
//!
//! Fetches one search results page and scrapes its table into entries.
//! One request per search, upstream ordering is kept.

use async_trait::async_trait;
use regex::{Captures, Regex};
use thiserror::Error;

use crate::models::Entry;

/// Default listing site
pub const NYAA_BASE_URL: &str = "https://nyaa.si";

/// Errors from a listing search
#[derive(Debug, Error)]
pub enum SearchError {
    #[error("Search query cannot be empty")]
    EmptyQuery,
    #[error("Failed to connect: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("Listing returned HTTP {0}")]
    Status(reqwest::StatusCode),
    #[error("No results for '{0}'")]
    NoResults(String),
    #[error("Unexpected listing layout in row {row}: missing {field}")]
    MalformedRow { row: usize, field: &'static str },
    #[error("Invalid listing pattern: {0}")]
    Pattern(#[from] regex::Error),
}

impl SearchError {
    /// Whether the listing page itself is structurally broken.
    ///
    /// Everything else is worth a retry from the search prompt.
    pub fn is_fatal(&self) -> bool {
        matches!(self, SearchError::MalformedRow { .. } | SearchError::Pattern(_))
    }
}

/// Source of search results
#[async_trait]
pub trait ListingProvider: Send + Sync {
    /// Search for `query`, returning rows in upstream order
    async fn search(&self, query: &str) -> Result<Vec<Entry>, SearchError>;
}

/// nyaa.si client
pub struct NyaaClient {
    base_url: String,
    /// Filter parameters sent with every search (without `q`)
    params: Vec<(String, String)>,
    client: reqwest::Client,
}

impl NyaaClient {
    /// Create a client for nyaa.si with the given filter parameters
    pub fn new(params: Vec<(String, String)>) -> Self {
        Self::with_base_url(NYAA_BASE_URL, params)
    }

    /// Create a client with a custom base URL (for testing)
    pub fn with_base_url(base_url: impl Into<String>, params: Vec<(String, String)>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            params,
            client: reqwest::Client::new(),
        }
    }

    /// Build the results page URL for `query`
    pub fn search_url(&self, query: &str) -> String {
        let encoded: Vec<String> = self
            .params
            .iter()
            .filter(|(key, _)| key != "q")
            .map(|(k, v)| (k.as_str(), v.as_str()))
            .chain(std::iter::once(("q", query)))
            .map(|(k, v)| format!("{}={}", urlencoding::encode(k), urlencoding::encode(v)))
            .collect();
        format!("{}/?{}", self.base_url, encoded.join("&"))
    }
}

#[async_trait]
impl ListingProvider for NyaaClient {
    async fn search(&self, query: &str) -> Result<Vec<Entry>, SearchError> {
        let query = query.trim();
        if query.is_empty() {
            return Err(SearchError::EmptyQuery);
        }

        let url = self.search_url(query);
        tracing::debug!(%url, "fetching listing");

        let response = self.client.get(&url).send().await?;

        let status = response.status();
        if !status.is_success() {
            return Err(SearchError::Status(status));
        }

        let html = response.text().await?;
        match parse_listing(&html, &self.base_url)? {
            Some(entries) => Ok(entries),
            None => Err(SearchError::NoResults(query.to_string())),
        }
    }
}

/// Scrape the results table.
///
/// Returns `None` when the page has no results table at all. Cell layout:
/// category, name, links, size, date, seeders, ...
pub fn parse_listing(html: &str, base_url: &str) -> Result<Option<Vec<Entry>>, SearchError> {
    let tbody = Regex::new(r"(?s)<tbody[^>]*>(.*?)</tbody>")?;
    let row_re = Regex::new(r"(?s)<tr[^>]*>(.*?)</tr>")?;
    let cell_re = Regex::new(r"(?s)<td[^>]*>(.*?)</td>")?;
    let anchor_re = Regex::new(r#"(?s)<a\s[^>]*?href="([^"]*)"[^>]*>(.*?)</a>"#)?;
    let tag_re = Regex::new(r"<[^>]*>")?;
    let entity_re = Regex::new(r"&(#[0-9]+|#[xX][0-9a-fA-F]+|[a-zA-Z]+);")?;

    let Some(body) = tbody.captures(html).and_then(|c| c.get(1)) else {
        return Ok(None);
    };

    let text = |fragment: &str| {
        decode_entities(&entity_re, tag_re.replace_all(fragment, "").trim())
    };

    let mut entries = Vec::new();
    for (row, caps) in row_re.captures_iter(body.as_str()).enumerate() {
        let row_html = caps.get(1).map(|m| m.as_str()).unwrap_or_default();
        let cells: Vec<&str> = cell_re
            .captures_iter(row_html)
            .filter_map(|c| c.get(1).map(|m| m.as_str()))
            .collect();
        let cell = |i: usize, field: &'static str| {
            cells
                .get(i)
                .copied()
                .ok_or(SearchError::MalformedRow { row, field })
        };

        let title_anchor = anchor_re
            .captures_iter(cell(1, "title")?)
            .last()
            .ok_or(SearchError::MalformedRow { row, field: "title" })?;
        let manifest_anchor = anchor_re
            .captures(cell(2, "manifest")?)
            .ok_or(SearchError::MalformedRow { row, field: "manifest" })?;

        let size = text(cell(3, "size")?);
        let date = text(cell(4, "date")?);
        let seeders = text(cell(5, "seeders")?)
            .parse()
            .map_err(|_| SearchError::MalformedRow { row, field: "seeders" })?;

        entries.push(Entry {
            link: absolute(base_url, &title_anchor[1]),
            title: text(&title_anchor[2]),
            manifest: absolute(base_url, &decode_entities(&entity_re, &manifest_anchor[1])),
            size: or_dash(size),
            date: or_dash(date.split(' ').next().unwrap_or_default().to_string()),
            seeders,
        });
    }

    Ok(Some(entries))
}

fn absolute(base_url: &str, href: &str) -> String {
    if href.starts_with('/') {
        format!("{}{}", base_url.trim_end_matches('/'), href)
    } else {
        href.to_string()
    }
}

fn or_dash(value: String) -> String {
    if value.is_empty() {
        "-".to_string()
    } else {
        value
    }
}

/// Decode character references in one pass, so `&amp;#34;` stays `&#34;`.
///
/// Numeric references are decoded in full; of the named ones only those an
/// HTML escaper emits are known. Anything else is left as written.
fn decode_entities(entity_re: &Regex, s: &str) -> String {
    entity_re
        .replace_all(s, |caps: &Captures| {
            let decoded = match &caps[1] {
                "amp" => Some('&'),
                "lt" => Some('<'),
                "gt" => Some('>'),
                "quot" => Some('"'),
                "apos" => Some('\''),
                "nbsp" => Some('\u{a0}'),
                reference => reference
                    .strip_prefix('#')
                    .and_then(|number| match number.strip_prefix(['x', 'X']) {
                        Some(hex) => u32::from_str_radix(hex, 16).ok(),
                        None => number.parse().ok(),
                    })
                    .and_then(char::from_u32),
            };
            decoded.map_or_else(|| caps[0].to_string(), String::from)
        })
        .into_owned()
}
