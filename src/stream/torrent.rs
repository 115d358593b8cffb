//! Manifest resolution via webtorrent-cli
//!
//! Turns a `.torrent` link or magnet URI into the list of files it contains
//! by running `webtorrent <target> -s -o <dir>` and reading the numbered
//! lines it prints.

use async_trait::async_trait;
use std::process::Stdio;
use thiserror::Error;
use tokio::process::Command;

use crate::models::{FileEntry, InvalidReference, ManifestRef};
use crate::stream::Workspace;

/// webtorrent binary name for this platform
#[cfg(windows)]
pub const WEBTORRENT: &str = "webtorrent.cmd";
#[cfg(not(windows))]
pub const WEBTORRENT: &str = "webtorrent";

/// Errors from resolving a manifest
#[derive(Debug, Error)]
pub enum ResolveError {
    #[error(transparent)]
    InvalidReference(#[from] InvalidReference),
    #[error("Failed to download manifest: {0}")]
    Download(#[from] reqwest::Error),
    #[error("Manifest download returned HTTP {0}")]
    DownloadStatus(reqwest::StatusCode),
    #[error("Failed to save manifest: {0}")]
    Save(std::io::Error),
    #[error("webtorrent not found. Install with: npm install -g webtorrent-cli")]
    ToolNotFound,
    #[error("Failed to run webtorrent: {0}")]
    Spawn(std::io::Error),
}

/// A resolved manifest
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolution {
    /// What the player should be pointed at: the saved `.torrent` path or
    /// the magnet URI
    pub target: String,
    pub files: Vec<FileEntry>,
}

/// Lists the files inside a manifest
#[async_trait]
pub trait ManifestResolver: Send + Sync {
    async fn resolve(&self, manifest: &ManifestRef) -> Result<Resolution, ResolveError>;
}

/// webtorrent-cli backed resolver
pub struct WebtorrentResolver {
    program: String,
    workspace: Workspace,
    client: reqwest::Client,
}

impl WebtorrentResolver {
    /// Create a resolver using the webtorrent binary on PATH
    pub fn new(workspace: Workspace) -> Self {
        Self::with_program(WEBTORRENT, workspace)
    }

    /// Create with custom webtorrent path
    pub fn with_program(program: impl Into<String>, workspace: Workspace) -> Self {
        Self {
            program: program.into(),
            workspace,
            client: reqwest::Client::new(),
        }
    }

    /// Arguments of the listing invocation
    pub fn list_args(&self, target: &str) -> Vec<String> {
        vec![
            target.to_string(),
            "-s".to_string(),
            "-o".to_string(),
            self.workspace.work_dir().display().to_string(),
        ]
    }

    /// Fetch a `.torrent` into the workspace, returning its local path
    async fn download(&self, url: &str) -> Result<String, ResolveError> {
        tracing::info!(%url, "downloading manifest");
        let response = self.client.get(url).send().await?;

        let status = response.status();
        if !status.is_success() {
            return Err(ResolveError::DownloadStatus(status));
        }

        let bytes = response.bytes().await?;
        let path = self.workspace.manifest_file();
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(ResolveError::Save)?;
        }
        tokio::fs::write(path, &bytes)
            .await
            .map_err(ResolveError::Save)?;

        Ok(path.display().to_string())
    }
}

#[async_trait]
impl ManifestResolver for WebtorrentResolver {
    async fn resolve(&self, manifest: &ManifestRef) -> Result<Resolution, ResolveError> {
        let target = match manifest {
            ManifestRef::Direct(url) => self.download(url).await?,
            ManifestRef::Magnet(uri) => uri.clone(),
        };

        let args = self.list_args(&target);
        tracing::debug!(program = %self.program, ?args, "listing manifest files");

        let output = Command::new(&self.program)
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|e| {
                if e.kind() == std::io::ErrorKind::NotFound {
                    ResolveError::ToolNotFound
                } else {
                    ResolveError::Spawn(e)
                }
            })?;

        let files = FileEntry::parse_listing(&String::from_utf8_lossy(&output.stdout));
        tracing::info!(count = files.len(), "manifest resolved");

        Ok(Resolution { target, files })
    }
}
