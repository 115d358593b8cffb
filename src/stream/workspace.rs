//! Transient files shared by the resolver and the player
//!
//! The downloaded `.torrent` and webtorrent's output directory live for one
//! run and are removed on every exit path.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

/// Separator mpv expects between `--sub-file-paths` entries
#[cfg(windows)]
const SUB_PATH_SEPARATOR: &str = ";";
#[cfg(not(windows))]
const SUB_PATH_SEPARATOR: &str = ":";

/// Location of the transient manifest file and working directory
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Workspace {
    manifest_file: PathBuf,
    work_dir: PathBuf,
}

impl Workspace {
    pub fn new(manifest_file: impl Into<PathBuf>, work_dir: impl Into<PathBuf>) -> Self {
        Self {
            manifest_file: manifest_file.into(),
            work_dir: work_dir.into(),
        }
    }

    /// Fixed locations under the system temp directory
    pub fn in_temp_dir() -> Self {
        let tmp = std::env::temp_dir();
        Self::new(
            tmp.join("nyaastream.torrent"),
            tmp.join("nyaastream_webtorrent"),
        )
    }

    /// Where downloaded manifests are saved
    pub fn manifest_file(&self) -> &Path {
        &self.manifest_file
    }

    /// webtorrent's `-o` directory
    pub fn work_dir(&self) -> &Path {
        &self.work_dir
    }

    /// Remove the working directory and the manifest file.
    ///
    /// Safe to call any number of times; missing paths are not errors.
    pub fn cleanup(&self) {
        if let Err(e) = std::fs::remove_dir_all(&self.work_dir) {
            if e.kind() != std::io::ErrorKind::NotFound {
                tracing::warn!(dir = %self.work_dir.display(), error = %e, "failed to remove work dir");
            }
        }
        if let Err(e) = std::fs::remove_file(&self.manifest_file) {
            if e.kind() != std::io::ErrorKind::NotFound {
                tracing::warn!(file = %self.manifest_file.display(), error = %e, "failed to remove manifest");
            }
        }
    }

    /// Guard that cleans up when dropped
    pub fn guard(&self) -> WorkspaceGuard {
        WorkspaceGuard(self.clone())
    }

    /// Directories under the working directory that hold `.srt` files
    pub fn subtitle_dirs(&self) -> Vec<PathBuf> {
        let mut dirs = BTreeSet::new();
        collect_subtitle_dirs(&self.work_dir, &mut dirs);
        dirs.into_iter().collect()
    }

    /// `subtitle_dirs` joined for mpv's `--sub-file-paths`
    pub fn subtitle_search_path(&self) -> String {
        self.subtitle_dirs()
            .iter()
            .map(|d| d.display().to_string())
            .collect::<Vec<_>>()
            .join(SUB_PATH_SEPARATOR)
    }
}

fn collect_subtitle_dirs(dir: &Path, found: &mut BTreeSet<PathBuf>) {
    let Ok(entries) = std::fs::read_dir(dir) else {
        return;
    };

    for entry in entries.flatten() {
        let path = entry.path();
        if path.is_dir() {
            collect_subtitle_dirs(&path, found);
        } else if path
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case("srt"))
        {
            found.insert(dir.to_path_buf());
        }
    }
}

/// Runs [`Workspace::cleanup`] on drop, including unwinding and early returns
#[derive(Debug)]
pub struct WorkspaceGuard(Workspace);

impl Drop for WorkspaceGuard {
    fn drop(&mut self) {
        self.0.cleanup();
    }
}
