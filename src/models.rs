//! Data structures shared across nyaastream
//!
//! Organized by domain:
//! - **Listing**: search result rows scraped from the index site
//! - **Manifest**: torrent references and the files they contain
//! - **History**: persisted watch records

use std::fmt;
use thiserror::Error;

// =============================================================================
// Listing Models
// =============================================================================

/// One search result row
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entry {
    /// Detail page URL
    pub link: String,
    pub title: String,
    /// `.torrent` URL or magnet URI
    pub manifest: String,
    /// Display size, `-` when the site left it empty
    pub size: String,
    /// Upload date, `-` when the site left it empty
    pub date: String,
    pub seeders: u32,
}

impl Entry {
    /// Secondary info line shown under the title
    pub fn info(&self) -> String {
        format!(
            "size: {}, date: {}, seeders: {}",
            self.size, self.date, self.seeders
        )
    }
}

/// Drop rows nobody is seeding, keeping upstream order
pub fn retain_seeded(entries: Vec<Entry>) -> Vec<Entry> {
    entries.into_iter().filter(|e| e.seeders > 0).collect()
}

// =============================================================================
// Manifest Models
// =============================================================================

/// Suffix that marks a direct manifest download
pub const MANIFEST_SUFFIX: &str = ".torrent";

/// Scheme prefix of magnet URIs
pub const MAGNET_PREFIX: &str = "magnet:";

/// Reference that isn't a `.torrent` link nor a magnet URI
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Not a torrent or magnet link: {0}")]
pub struct InvalidReference(pub String);

/// A manifest the torrent tool can resolve into files
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ManifestRef {
    /// URL of a `.torrent` file, downloaded before use
    Direct(String),
    /// Magnet URI, passed through untouched
    Magnet(String),
}

impl ManifestRef {
    /// Classify a user or listing supplied reference
    pub fn classify(reference: &str) -> Result<Self, InvalidReference> {
        let reference = reference.trim();
        if reference.ends_with(MANIFEST_SUFFIX) {
            Ok(ManifestRef::Direct(reference.to_string()))
        } else if reference.starts_with(MAGNET_PREFIX) {
            Ok(ManifestRef::Magnet(reference.to_string()))
        } else {
            Err(InvalidReference(reference.to_string()))
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            ManifestRef::Direct(url) => url,
            ManifestRef::Magnet(uri) => uri,
        }
    }

    /// Human readable name: the magnet `dn` parameter when present,
    /// otherwise the reference itself
    pub fn display_name(&self) -> String {
        if let ManifestRef::Magnet(uri) = self {
            let params = uri.split_once('?').map(|(_, q)| q).unwrap_or("");
            for pair in params.split('&') {
                if let Some(name) = pair.strip_prefix("dn=") {
                    let name = name.replace('+', " ");
                    if let Ok(decoded) = urlencoding::decode(&name) {
                        return decoded.into_owned();
                    }
                }
            }
        }
        self.as_str().to_string()
    }
}

impl fmt::Display for ManifestRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One file inside a resolved manifest
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileEntry {
    /// Ordinal assigned by the torrent tool, used for selection
    pub index: u32,
    /// Name as printed by the tool, may contain path segments
    pub name: String,
}

impl FileEntry {
    pub fn new(index: u32, name: impl Into<String>) -> Self {
        Self {
            index,
            name: name.into(),
        }
    }

    /// Parse the torrent tool's file listing.
    ///
    /// Only lines shaped `<ordinal><whitespace><name>` are files; banners,
    /// progress output and blank lines are dropped. Order is preserved.
    pub fn parse_listing(output: &str) -> Vec<FileEntry> {
        let Some(re) = regex::Regex::new(r"^([0-9]+)\s+(.*)$").ok() else {
            return Vec::new();
        };

        output
            .lines()
            .filter_map(|line| {
                let caps = re.captures(line)?;
                let index = caps.get(1)?.as_str().parse().ok()?;
                let name = caps.get(2).map(|m| m.as_str()).unwrap_or_default();
                Some(FileEntry::new(index, name))
            })
            .collect()
    }

    /// Whether the name carries one of the recognised media extensions
    pub fn is_media(&self, formats: &[String]) -> bool {
        let name = self.name.to_lowercase();
        formats
            .iter()
            .any(|fmt| name.contains(fmt.to_lowercase().as_str()))
    }

    /// Selection descriptor persisted in history records
    pub fn descriptor(&self) -> String {
        format!("{} {}", self.index, self.name)
    }
}

// =============================================================================
// History Models
// =============================================================================

/// Field separator of the history log
pub const HISTORY_DELIMITER: &str = "||";

/// A watched selection: torrent title, manifest and chosen file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HistoryRecord {
    pub title: String,
    pub manifest: String,
    /// `"<index> <name>"` of the selected file
    pub descriptor: String,
}

impl HistoryRecord {
    pub fn new(title: impl Into<String>, manifest: impl Into<String>, file: &FileEntry) -> Self {
        Self {
            title: title.into(),
            manifest: manifest.into(),
            descriptor: file.descriptor(),
        }
    }

    /// Serialize to one log line (without the trailing newline)
    pub fn to_line(&self) -> String {
        [&self.title, &self.manifest, &self.descriptor]
            .iter()
            .map(|field| field.replace(['\n', '\r'], " "))
            .collect::<Vec<_>>()
            .join(HISTORY_DELIMITER)
    }

    /// Parse one log line; anything without exactly three fields is rejected
    pub fn parse_line(line: &str) -> Option<Self> {
        let fields: Vec<&str> = line.trim_end_matches(['\n', '\r']).split(HISTORY_DELIMITER).collect();
        match fields.as_slice() {
            [title, manifest, descriptor] if !manifest.is_empty() => Some(Self {
                title: title.to_string(),
                manifest: manifest.to_string(),
                descriptor: descriptor.to_string(),
            }),
            _ => None,
        }
    }

    /// File ordinal recorded in the descriptor
    pub fn file_index(&self) -> Option<u32> {
        self.descriptor.split(' ').next()?.parse().ok()
    }

    /// File name part of the descriptor
    pub fn file_name(&self) -> &str {
        self.descriptor
            .split_once(' ')
            .map(|(_, name)| name)
            .unwrap_or(&self.descriptor)
    }
}

// =============================================================================
// Tests
// =============================================================================
