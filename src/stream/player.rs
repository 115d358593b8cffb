//! Playback through webtorrent-cli
//!
//! webtorrent fetches the selected file into the shared working directory
//! and hands it to a local player (mpv by default).

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::pin::Pin;
use std::process::Stdio;
use thiserror::Error;
use tokio::process::{Child, Command};

use crate::models::FileEntry;
use crate::stream::torrent::WEBTORRENT;
use crate::stream::Workspace;

/// Players webtorrent knows how to launch
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PlayerType {
    /// mpv media player (default)
    #[default]
    Mpv,
    /// VLC media player
    Vlc,
    Iina,
    Mplayer,
    Smplayer,
    Xbmc,
    Omx,
}

impl PlayerType {
    /// webtorrent flag selecting this player
    pub fn flag(&self) -> &'static str {
        match self {
            PlayerType::Mpv => "--mpv",
            PlayerType::Vlc => "--vlc",
            PlayerType::Iina => "--iina",
            PlayerType::Mplayer => "--mplayer",
            PlayerType::Smplayer => "--smplayer",
            PlayerType::Xbmc => "--xbmc",
            PlayerType::Omx => "--omx",
        }
    }

    /// Get a display name for this player
    pub fn display_name(&self) -> &'static str {
        match self {
            PlayerType::Mpv => "mpv",
            PlayerType::Vlc => "VLC",
            PlayerType::Iina => "IINA",
            PlayerType::Mplayer => "MPlayer",
            PlayerType::Smplayer => "SMPlayer",
            PlayerType::Xbmc => "Kodi",
            PlayerType::Omx => "omxplayer",
        }
    }
}

impl std::fmt::Display for PlayerType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.display_name())
    }
}

/// Whether playback starts while downloading or after
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaybackMode {
    /// Play while downloading
    Stream,
    /// Fetch fully, no player (file isn't something the player streams)
    Download,
}

impl PlaybackMode {
    /// Media files stream, anything else is downloaded
    pub fn for_file(file: &FileEntry, formats: &[String]) -> Self {
        if file.is_media(formats) {
            PlaybackMode::Stream
        } else {
            PlaybackMode::Download
        }
    }
}

/// One playback launch
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlayRequest {
    /// Saved `.torrent` path or magnet URI
    pub target: String,
    /// File to select; `None` plays the whole manifest
    pub file_index: Option<u32>,
    pub mode: PlaybackMode,
    /// Point the player at subtitle folders found in the working directory
    pub subtitles: bool,
}

impl PlayRequest {
    /// Play a single file
    pub fn file(target: impl Into<String>, index: u32, mode: PlaybackMode) -> Self {
        Self {
            target: target.into(),
            file_index: Some(index),
            mode,
            subtitles: false,
        }
    }

    /// Stream the entire manifest with subtitles
    pub fn all(target: impl Into<String>) -> Self {
        Self {
            target: target.into(),
            file_index: None,
            mode: PlaybackMode::Stream,
            subtitles: true,
        }
    }
}

/// Errors from launching playback
#[derive(Debug, Error)]
pub enum PlayError {
    #[error("webtorrent not found. Install with: npm install -g webtorrent-cli")]
    ToolNotFound,
    #[error("Failed to start webtorrent: {0}")]
    StartFailed(std::io::Error),
}

/// A running playback process
///
/// Dropping it before [`Playback::wait`] completes kills the process.
pub struct Playback {
    exit: Pin<Box<dyn Future<Output = ()> + Send>>,
}

impl Playback {
    pub fn new(mut child: Child) -> Self {
        Self::from_future(async move {
            match child.wait().await {
                Ok(status) => tracing::info!(%status, "playback exited"),
                Err(e) => tracing::warn!(error = %e, "lost track of playback process"),
            }
        })
    }

    /// Playback that ends when `exit` completes
    pub fn from_future(exit: impl Future<Output = ()> + Send + 'static) -> Self {
        Self {
            exit: Box::pin(exit),
        }
    }

    /// Playback that has already ended
    pub fn finished() -> Self {
        Self::from_future(std::future::ready(()))
    }

    /// Wait for the process to exit
    pub async fn wait(self) {
        self.exit.await
    }
}

/// Launches exactly one external process per request
#[async_trait]
pub trait PlaybackInvoker: Send + Sync {
    /// Spawn the player and hand back the running process
    async fn start(&self, request: &PlayRequest) -> Result<Playback, PlayError>;

    /// Start and block until the process exits
    async fn play(&self, request: &PlayRequest) -> Result<(), PlayError> {
        self.start(request).await?.wait().await;
        Ok(())
    }
}

/// webtorrent-cli backed player
pub struct WebtorrentPlayer {
    program: String,
    workspace: Workspace,
    player: PlayerType,
    player_args: String,
}

impl WebtorrentPlayer {
    /// `workspace` must match the resolver's so downloaded pieces are reused
    pub fn new(workspace: Workspace, player: PlayerType, player_args: impl Into<String>) -> Self {
        Self {
            program: WEBTORRENT.to_string(),
            workspace,
            player,
            player_args: player_args.into(),
        }
    }

    /// Use a custom webtorrent path
    pub fn with_program(mut self, program: impl Into<String>) -> Self {
        self.program = program.into();
        self
    }

    /// Command line for `request`, with `subtitle_paths` already joined
    pub fn args(&self, request: &PlayRequest, subtitle_paths: &str) -> Vec<String> {
        let mut args = Vec::new();
        if request.mode == PlaybackMode::Download {
            args.push("download".to_string());
        }
        args.push(request.target.clone());
        args.push("-o".to_string());
        args.push(self.workspace.work_dir().display().to_string());
        if let Some(index) = request.file_index {
            args.push("-s".to_string());
            args.push(index.to_string());
        }

        if request.mode == PlaybackMode::Stream {
            args.push(self.player.flag().to_string());

            let mut player_args = self.player_args.trim().to_string();
            if !subtitle_paths.is_empty() {
                if !player_args.is_empty() {
                    player_args.push(' ');
                }
                player_args.push_str(&format!("--sub-file-paths={}", subtitle_paths));
            }
            if !player_args.is_empty() {
                args.push(format!("--player-args={}", player_args));
            }
        }

        args
    }
}

#[async_trait]
impl PlaybackInvoker for WebtorrentPlayer {
    async fn start(&self, request: &PlayRequest) -> Result<Playback, PlayError> {
        let subtitle_paths = if request.subtitles {
            self.workspace.subtitle_search_path()
        } else {
            String::new()
        };
        let args = self.args(request, &subtitle_paths);
        tracing::info!(player = %self.player, mode = ?request.mode, file = ?request.file_index, "starting playback");
        tracing::debug!(program = %self.program, ?args, "webtorrent command");

        // Inherit the terminal so webtorrent's progress stays visible
        let child = Command::new(&self.program)
            .args(&args)
            .stdin(Stdio::inherit())
            .stdout(Stdio::inherit())
            .stderr(Stdio::inherit())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| {
                if e.kind() == std::io::ErrorKind::NotFound {
                    PlayError::ToolNotFound
                } else {
                    PlayError::StartFailed(e)
                }
            })?;

        Ok(Playback::new(child))
    }
}
