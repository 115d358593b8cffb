//! Streaming infrastructure
//!
//! - Torrent: manifest resolution through webtorrent-cli
//! - Player: playback through webtorrent-cli and a local player
//! - Workspace: transient files shared by both

pub mod player;
pub mod torrent;
pub mod workspace;

pub use player::{PlayError, PlayRequest, Playback, PlaybackInvoker, PlaybackMode, PlayerType, WebtorrentPlayer};
pub use torrent::{ManifestResolver, Resolution, ResolveError, WebtorrentResolver};
pub use workspace::{Workspace, WorkspaceGuard};
